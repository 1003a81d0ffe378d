// ============================================================================
// src/input/state.rs - Device State
// ============================================================================
//!
//! デバイスの最終既知状態。分類器だけがデバイスのイベントロック下で変更する。

use super::bitmap::BitMap;
use super::caps::{Capabilities, KeyBits, LedBits, SndBits, SwBits};
use super::codes::{ABS_CNT, REP_CNT, REP_DELAY, REP_PERIOD};
use super::config::{DEFAULT_REP_DELAY_MS, DEFAULT_REP_PERIOD_MS};

/// デバイスの現在状態
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// 押下中のキー
    pub key: KeyBits,
    /// オンのスイッチ
    pub sw: SwBits,
    /// 点灯中のLED
    pub led: LedBits,
    /// 鳴動中のサウンド
    pub snd: SndBits,
    /// 各絶対軸の現在値
    pub abs: [i32; ABS_CNT],
    /// オートリピートパラメータ [REP_DELAY, REP_PERIOD]
    pub rep: [i32; REP_CNT],
}

impl DeviceState {
    /// 能力記述子から初期状態を作る
    ///
    /// 絶対軸の初期値は 0 を値域にクランプしたもの。
    /// `EV_REP` を宣言したデバイスにはデフォルトのリピート値を設定する。
    pub fn new(caps: &Capabilities) -> Self {
        let mut abs = [0; ABS_CNT];
        for axis in caps.abs.iter_ones() {
            let params = &caps.absinfo[axis];
            if params.minimum <= params.maximum {
                abs[axis] = 0.clamp(params.minimum, params.maximum);
            }
        }

        let mut rep = [0; REP_CNT];
        if caps.ev.contains(super::caps::EventTypes::REP) {
            rep[REP_DELAY as usize] = DEFAULT_REP_DELAY_MS;
            rep[REP_PERIOD as usize] = DEFAULT_REP_PERIOD_MS;
        }

        Self {
            key: BitMap::new(),
            sw: BitMap::new(),
            led: BitMap::new(),
            snd: BitMap::new(),
            abs,
            rep,
        }
    }

    pub fn rep_delay(&self) -> i32 {
        self.rep[REP_DELAY as usize]
    }

    pub fn rep_period(&self) -> i32 {
        self.rep[REP_PERIOD as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::caps::AbsParams;
    use crate::input::codes::*;

    #[test]
    fn test_initial_abs_clamped_into_range() {
        let mut caps = Capabilities::new();
        caps.set_abs_params(ABS_X, AbsParams::new(0, 255, 0, 0));
        caps.set_abs_params(ABS_PRESSURE, AbsParams::new(10, 100, 0, 0));
        caps.set_abs_params(ABS_TILT_X, AbsParams::new(-90, -10, 0, 0));

        let state = DeviceState::new(&caps);
        assert_eq!(state.abs[ABS_X as usize], 0);
        assert_eq!(state.abs[ABS_PRESSURE as usize], 10);
        assert_eq!(state.abs[ABS_TILT_X as usize], -10);
    }

    #[test]
    fn test_repeat_defaults() {
        let mut caps = Capabilities::new();
        assert_eq!(DeviceState::new(&caps).rep_delay(), 0);

        caps.ev |= crate::input::caps::EventTypes::REP;
        let state = DeviceState::new(&caps);
        assert_eq!(state.rep_delay(), DEFAULT_REP_DELAY_MS);
        assert_eq!(state.rep_period(), DEFAULT_REP_PERIOD_MS);
    }
}
