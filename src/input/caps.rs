// ============================================================================
// src/input/caps.rs - Device Capability Descriptor
// ============================================================================
//!
//! # デバイス能力記述子
//!
//! デバイスがサポートするイベントタイプとコードのビットマップ、
//! 絶対軸パラメータを保持する。登録後は不変。

use bitflags::bitflags;

use super::bitmap::{bit_words, BitMap};
use super::codes::*;

bitflags! {
    /// サポートするイベントタイプ
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventTypes: u32 {
        const SYN = 1 << EV_SYN;
        const KEY = 1 << EV_KEY;
        const REL = 1 << EV_REL;
        const ABS = 1 << EV_ABS;
        const MSC = 1 << EV_MSC;
        const SW = 1 << EV_SW;
        const LED = 1 << EV_LED;
        const SND = 1 << EV_SND;
        const REP = 1 << EV_REP;
        const FF = 1 << EV_FF;
        const PWR = 1 << EV_PWR;
        const FF_STATUS = 1 << EV_FF_STATUS;
    }
}

impl EventTypes {
    /// イベントタイプ番号から対応するフラグを取得
    pub fn from_type(event_type: u16) -> Option<Self> {
        if event_type > EV_MAX {
            return None;
        }
        Self::from_bits(1 << event_type)
    }
}

impl Default for EventTypes {
    fn default() -> Self {
        // EV_SYN は全デバイスが暗黙にサポート
        Self::SYN
    }
}

pub type KeyBits = BitMap<{ bit_words(KEY_CNT) }>;
pub type RelBits = BitMap<{ bit_words(REL_CNT) }>;
pub type AbsBits = BitMap<{ bit_words(ABS_CNT) }>;
pub type MscBits = BitMap<{ bit_words(MSC_CNT) }>;
pub type SwBits = BitMap<{ bit_words(SW_CNT) }>;
pub type LedBits = BitMap<{ bit_words(LED_CNT) }>;
pub type SndBits = BitMap<{ bit_words(SND_CNT) }>;
pub type FfBits = BitMap<{ bit_words(FF_CNT) }>;

/// 絶対軸パラメータ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsParams {
    pub minimum: i32,
    pub maximum: i32,
    /// ジッタ抑制幅（0で無効）
    pub fuzz: i32,
    /// 中央の不感帯
    pub flat: i32,
    /// 単位あたりの分解能（units/mm または units/rad）
    pub resolution: i32,
}

impl AbsParams {
    pub const fn new(minimum: i32, maximum: i32, fuzz: i32, flat: i32) -> Self {
        Self {
            minimum,
            maximum,
            fuzz,
            flat,
            resolution: 0,
        }
    }

    /// 値域に含まれる値の個数
    pub fn span(&self) -> i64 {
        self.maximum as i64 - self.minimum as i64 + 1
    }
}

/// デバイス能力記述子
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub ev: EventTypes,
    pub key: KeyBits,
    pub rel: RelBits,
    pub abs: AbsBits,
    pub msc: MscBits,
    pub sw: SwBits,
    pub led: LedBits,
    pub snd: SndBits,
    pub ff: FfBits,
    pub absinfo: [AbsParams; ABS_CNT],
}

impl Capabilities {
    pub fn new() -> Self {
        Self {
            ev: EventTypes::default(),
            key: BitMap::new(),
            rel: BitMap::new(),
            abs: BitMap::new(),
            msc: BitMap::new(),
            sw: BitMap::new(),
            led: BitMap::new(),
            snd: BitMap::new(),
            ff: BitMap::new(),
            absinfo: [AbsParams::default(); ABS_CNT],
        }
    }

    /// イベントタイプがサポートされているか
    pub fn has_type(&self, event_type: u16) -> bool {
        EventTypes::from_type(event_type).is_some_and(|t| self.ev.contains(t))
    }

    /// 能力を宣言する（タイプビットも合わせて立てる）
    ///
    /// 未知のタイプ、またはコード空間を持たないタイプのコードは無視。
    pub fn set_capability(&mut self, event_type: u16, code: u16) {
        let code = code as usize;
        match event_type {
            EV_KEY => self.key.set(code),
            EV_REL => self.rel.set(code),
            EV_ABS => self.abs.set(code),
            EV_MSC => self.msc.set(code),
            EV_SW => self.sw.set(code),
            EV_LED => self.led.set(code),
            EV_SND => self.snd.set(code),
            EV_FF => self.ff.set(code),
            EV_SYN | EV_REP | EV_PWR | EV_FF_STATUS => {}
            _ => {
                log::warn!("input: set_capability: unknown event type {:#x}", event_type);
                return;
            }
        }
        if let Some(t) = EventTypes::from_type(event_type) {
            self.ev |= t;
        }
    }

    /// コードがタイプのビットマップで宣言されているか
    pub fn has_code(&self, event_type: u16, code: u16) -> bool {
        let code = code as usize;
        match event_type {
            EV_KEY => self.key.test(code),
            EV_REL => self.rel.test(code),
            EV_ABS => self.abs.test(code),
            EV_MSC => self.msc.test(code),
            EV_SW => self.sw.test(code),
            EV_LED => self.led.test(code),
            EV_SND => self.snd.test(code),
            EV_FF => self.ff.test(code),
            _ => false,
        }
    }

    /// 絶対軸パラメータを設定し、軸を宣言する
    pub fn set_abs_params(&mut self, axis: u16, params: AbsParams) {
        if axis > ABS_MAX {
            log::warn!("input: set_abs_params: axis {:#x} out of range", axis);
            return;
        }
        self.absinfo[axis as usize] = params;
        self.set_capability(EV_ABS, axis);
    }

    /// 軸のジッタ抑制幅
    #[inline]
    pub fn abs_fuzz(&self, axis: u16) -> i32 {
        self.absinfo
            .get(axis as usize)
            .map_or(0, |params| params.fuzz)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}
