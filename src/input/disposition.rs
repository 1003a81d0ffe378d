// ============================================================================
// src/input/disposition.rs - Disposition Classifier
// ============================================================================
//!
//! # イベント処理方針の決定
//!
//! ドライバから届いた `(type, code, value)` を、デバイス状態と能力記述子に
//! 照らして「どこへ送るか」に分類する。状態の更新（キービットの反転、
//! 絶対軸の現在値、スロット値）もここで行う。
//!
//! 呼び出し側はデバイスのイベントロックを保持していること。

use bitflags::bitflags;

use super::caps::Capabilities;
use super::codes::*;
use super::defuzz::defuzz;
use super::mt::MtState;
use super::state::DeviceState;

bitflags! {
    /// イベントの送り先
    ///
    /// 空集合は「無視」を表す。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Disposition: u8 {
        /// リスナーへ配送する
        const PASS_TO_HANDLERS = 0x01;
        /// デバイス自身（LED、ブザーなど）へ返す
        const PASS_TO_DEVICE = 0x02;
        /// 直前にスロット選択イベントを挿入する
        const SLOT = 0x04;
        /// バッファをフラッシュする
        const FLUSH = 0x08;

        const PASS_TO_ALL = Self::PASS_TO_HANDLERS.bits() | Self::PASS_TO_DEVICE.bits();
    }
}

impl Disposition {
    pub const IGNORE: Self = Self::empty();

    #[inline]
    pub fn is_ignored(&self) -> bool {
        self.is_empty()
    }
}

/// 分類結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub disposition: Disposition,
    /// 送出する値（絶対軸ではデファズ後の値）
    pub value: i32,
}

impl Classification {
    #[inline]
    const fn new(disposition: Disposition, value: i32) -> Self {
        Self { disposition, value }
    }

    #[inline]
    const fn ignore(value: i32) -> Self {
        Self::new(Disposition::IGNORE, value)
    }
}

/// 状態ビットが値と異なれば反転して `true`
#[inline]
fn transition<const W: usize>(bits: &mut super::bitmap::BitMap<W>, code: u16, value: i32) -> bool {
    let code = code as usize;
    if bits.test(code) != (value != 0) {
        bits.toggle(code);
        true
    } else {
        false
    }
}

/// イベントを分類し、必要ならデバイス状態を更新する
///
/// 未宣言のタイプやコードは無視される。
pub fn classify(
    state: &mut DeviceState,
    caps: &Capabilities,
    mt: Option<&mut MtState>,
    event_type: u16,
    code: u16,
    value: i32,
) -> Classification {
    if !caps.has_type(event_type) {
        return Classification::ignore(value);
    }

    let disposition = match event_type {
        EV_SYN => match code {
            SYN_REPORT => Disposition::PASS_TO_HANDLERS | Disposition::FLUSH,
            SYN_CONFIG => Disposition::PASS_TO_ALL,
            SYN_MT_REPORT => Disposition::PASS_TO_HANDLERS,
            _ => Disposition::IGNORE,
        },

        EV_KEY if caps.has_code(EV_KEY, code) => {
            // オートリピートのエコーは状態を変えずに常に通す
            if value == KEY_VALUE_REPEAT {
                Disposition::PASS_TO_HANDLERS
            } else if transition(&mut state.key, code, value) {
                Disposition::PASS_TO_HANDLERS
            } else {
                Disposition::IGNORE
            }
        }

        EV_SW if caps.has_code(EV_SW, code) => {
            if transition(&mut state.sw, code, value) {
                Disposition::PASS_TO_HANDLERS
            } else {
                Disposition::IGNORE
            }
        }

        EV_ABS if caps.has_code(EV_ABS, code) => {
            return classify_abs(state, caps, mt, code, value);
        }

        EV_REL if caps.has_code(EV_REL, code) && value != 0 => Disposition::PASS_TO_HANDLERS,

        EV_MSC if caps.has_code(EV_MSC, code) => Disposition::PASS_TO_ALL,

        EV_LED if caps.has_code(EV_LED, code) => {
            if transition(&mut state.led, code, value) {
                Disposition::PASS_TO_ALL
            } else {
                Disposition::IGNORE
            }
        }

        EV_SND if caps.has_code(EV_SND, code) => {
            if transition(&mut state.snd, code, value) {
                Disposition::PASS_TO_ALL
            } else {
                Disposition::IGNORE
            }
        }

        EV_REP => {
            if code <= REP_MAX && value >= 0 && state.rep[code as usize] != value {
                state.rep[code as usize] = value;
                Disposition::PASS_TO_ALL
            } else {
                Disposition::IGNORE
            }
        }

        EV_FF | EV_PWR => Disposition::PASS_TO_ALL,

        _ => Disposition::IGNORE,
    };

    Classification::new(disposition, value)
}

/// 絶対軸イベントの分類
fn classify_abs(
    state: &mut DeviceState,
    caps: &Capabilities,
    mt: Option<&mut MtState>,
    code: u16,
    value: i32,
) -> Classification {
    let fuzz = caps.abs_fuzz(code);

    if code == ABS_MT_SLOT {
        // カーソルの移動だけで、イベントは出力しない
        if let Some(mt) = mt {
            if !mt.stage_slot(value) {
                #[cfg(feature = "verbose_logging")]
                log::trace!("input: slot {} out of range, dropped", value);
            }
        }
        return Classification::ignore(value);
    }

    if is_mt_value(code) {
        // スロットを持たないデバイスではフィルタしない
        let Some(mt) = mt else {
            return Classification::new(Disposition::PASS_TO_HANDLERS, value);
        };

        mt.mark_current_used();
        let Some(stored) = mt.current_slot_mut().value_mut(code) else {
            return Classification::ignore(value);
        };
        let value = defuzz(value, *stored, fuzz);
        if *stored == value {
            return Classification::ignore(value);
        }
        *stored = value;

        if mt.slot_pending() {
            mt.mark_slot_reported();
            return Classification::new(Disposition::PASS_TO_HANDLERS | Disposition::SLOT, value);
        }
        return Classification::new(Disposition::PASS_TO_HANDLERS, value);
    }

    let stored = &mut state.abs[code as usize];
    let value = defuzz(value, *stored, fuzz);
    if *stored == value {
        return Classification::ignore(value);
    }
    *stored = value;
    Classification::new(Disposition::PASS_TO_HANDLERS, value)
}
