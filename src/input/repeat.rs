// ============================================================================
// src/input/repeat.rs - Key Autorepeat
// ============================================================================
//!
//! # キーオートリピート
//!
//! 押されたキーを `REP_DELAY` 後から `REP_PERIOD` ごとに値2で再送する。
//! タイマー本体は統合側が `RepeatTimer` として提供し、満了時に
//! `InputDevice::repeat_tick` を呼ぶ。
//!
//! `SoftRepeatTimer` はミリ秒ティックで駆動するソフトウェア実装で、
//! タイマー割り込みハンドラから `advance` を呼んで使う。

use core::sync::atomic::{AtomicU64, Ordering};

use super::caps::{Capabilities, EventTypes};
use super::dispatch::DispatchScratch;
use super::event::InputValue;
use super::state::DeviceState;

/// オートリピート用のワンショットタイマー
pub trait RepeatTimer: Send + Sync {
    /// `delay_ms` 後に満了するよう（再）設定する
    fn arm(&self, delay_ms: u32);

    /// 満了を取り消す
    fn cancel(&self);
}

/// 未設定を表すデッドライン
const DISARMED: u64 = u64::MAX;

/// ティック駆動のソフトウェアタイマー
#[derive(Debug)]
pub struct SoftRepeatTimer {
    /// 現在のティック（1ms単位）
    now: AtomicU64,
    /// 満了ティック
    deadline: AtomicU64,
}

impl SoftRepeatTimer {
    pub const fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
            deadline: AtomicU64::new(DISARMED),
        }
    }

    /// 時間を進める
    ///
    /// デッドラインに達していれば解除して `true` を返す。
    /// 呼び出し側は続けて `InputDevice::repeat_tick` を呼ぶこと。
    pub fn advance(&self, elapsed_ms: u64) -> bool {
        let now = self.now.fetch_add(elapsed_ms, Ordering::SeqCst) + elapsed_ms;
        let deadline = self.deadline.load(Ordering::SeqCst);
        deadline != DISARMED
            && now >= deadline
            && self
                .deadline
                .compare_exchange(deadline, DISARMED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.load(Ordering::SeqCst) != DISARMED
    }

    /// 満了までの残りティック
    pub fn remaining(&self) -> Option<u64> {
        let deadline = self.deadline.load(Ordering::SeqCst);
        if deadline == DISARMED {
            None
        } else {
            Some(deadline.saturating_sub(self.now.load(Ordering::SeqCst)))
        }
    }
}

impl Default for SoftRepeatTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl RepeatTimer for SoftRepeatTimer {
    fn arm(&self, delay_ms: u32) {
        let now = self.now.load(Ordering::SeqCst);
        self.deadline.store(now + delay_ms as u64, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.deadline.store(DISARMED, Ordering::SeqCst);
    }
}

/// 配送済みのバッチからオートリピートの開始・停止を判定する
///
/// フィルタに取られたキーイベントと値2（リピート自身）は対象外。
/// 押下で `repeat_key` を設定して `REP_DELAY` でタイマーを張り、
/// 解放でタイマーを止める。
pub(crate) fn update_autorepeat(
    caps: &Capabilities,
    state: &DeviceState,
    timer: Option<&dyn RepeatTimer>,
    repeat_key: &mut Option<u16>,
    values: &[InputValue],
    scratch: &DispatchScratch,
) {
    if !caps.ev.contains(EventTypes::REP | EventTypes::KEY) {
        return;
    }

    for (index, value) in values.iter().enumerate() {
        if !value.is_key() || value.value == super::codes::KEY_VALUE_REPEAT {
            continue;
        }
        if scratch.consumed(index) {
            continue;
        }

        if value.value != 0 {
            start(state, timer, repeat_key, value.code);
        } else {
            stop(timer, repeat_key);
        }
    }
}

fn start(state: &DeviceState, timer: Option<&dyn RepeatTimer>, repeat_key: &mut Option<u16>, code: u16) {
    let Some(timer) = timer else {
        return;
    };
    let delay = state.rep_delay();
    if delay <= 0 || state.rep_period() <= 0 {
        return;
    }
    *repeat_key = Some(code);
    timer.arm(delay as u32);
}

fn stop(timer: Option<&dyn RepeatTimer>, repeat_key: &mut Option<u16>) {
    if let Some(timer) = timer {
        timer.cancel();
    }
    *repeat_key = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::codes::*;
    use crate::input::config::{DEFAULT_REP_DELAY_MS, DEFAULT_REP_PERIOD_MS};

    fn keyboard(rep: bool) -> (Capabilities, DeviceState) {
        let mut caps = Capabilities::new();
        caps.set_capability(EV_KEY, KEY_A);
        caps.set_capability(EV_KEY, KEY_B);
        if rep {
            caps.ev |= EventTypes::REP;
        }
        let state = DeviceState::new(&caps);
        (caps, state)
    }

    #[test]
    fn test_soft_timer_fires_once() {
        let timer = SoftRepeatTimer::new();
        assert!(!timer.advance(1000));

        timer.arm(250);
        assert_eq!(timer.remaining(), Some(250));
        assert!(!timer.advance(249));
        assert!(timer.advance(1));
        assert!(!timer.is_armed());
        assert!(!timer.advance(1000));
    }

    #[test]
    fn test_soft_timer_cancel() {
        let timer = SoftRepeatTimer::new();
        timer.arm(10);
        timer.cancel();
        assert!(!timer.advance(100));
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_press_arms_release_cancels() {
        let (caps, state) = keyboard(true);
        let timer = SoftRepeatTimer::new();
        let scratch = DispatchScratch::with_capacity(8).unwrap();
        let mut repeat_key = None;

        let press = [InputValue::new(EV_KEY, KEY_A, 1), InputValue::sync()];
        update_autorepeat(&caps, &state, Some(&timer), &mut repeat_key, &press, &scratch);
        assert_eq!(repeat_key, Some(KEY_A));
        assert_eq!(timer.remaining(), Some(DEFAULT_REP_DELAY_MS as u64));

        // リピートエコー自身は判定に影響しない
        let echo = [InputValue::new(EV_KEY, KEY_A, 2), InputValue::sync()];
        update_autorepeat(&caps, &state, Some(&timer), &mut repeat_key, &echo, &scratch);
        assert_eq!(repeat_key, Some(KEY_A));

        let release = [InputValue::new(EV_KEY, KEY_A, 0), InputValue::sync()];
        update_autorepeat(&caps, &state, Some(&timer), &mut repeat_key, &release, &scratch);
        assert_eq!(repeat_key, None);
        assert!(!timer.is_armed());
        assert!(DEFAULT_REP_PERIOD_MS > 0);
    }

    #[test]
    fn test_requires_rep_capability_and_timer() {
        let (caps, state) = keyboard(false);
        let timer = SoftRepeatTimer::new();
        let scratch = DispatchScratch::with_capacity(8).unwrap();
        let mut repeat_key = None;
        let press = [InputValue::new(EV_KEY, KEY_A, 1)];

        update_autorepeat(&caps, &state, Some(&timer), &mut repeat_key, &press, &scratch);
        assert_eq!(repeat_key, None);

        let (caps, state) = keyboard(true);
        update_autorepeat(&caps, &state, None, &mut repeat_key, &press, &scratch);
        assert_eq!(repeat_key, None);
    }

    #[test]
    fn test_zero_delay_disables_repeat() {
        let (caps, mut state) = keyboard(true);
        state.rep[REP_DELAY as usize] = 0;
        let timer = SoftRepeatTimer::new();
        let scratch = DispatchScratch::with_capacity(8).unwrap();
        let mut repeat_key = None;

        update_autorepeat(
            &caps,
            &state,
            Some(&timer),
            &mut repeat_key,
            &[InputValue::new(EV_KEY, KEY_A, 1)],
            &scratch,
        );
        assert_eq!(repeat_key, None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_last_pressed_key_wins() {
        let (caps, state) = keyboard(true);
        let timer = SoftRepeatTimer::new();
        let scratch = DispatchScratch::with_capacity(8).unwrap();
        let mut repeat_key = None;
        let frame = [
            InputValue::new(EV_KEY, KEY_A, 1),
            InputValue::new(EV_KEY, KEY_B, 1),
            InputValue::sync(),
        ];
        update_autorepeat(&caps, &state, Some(&timer), &mut repeat_key, &frame, &scratch);
        assert_eq!(repeat_key, Some(KEY_B));
    }
}
