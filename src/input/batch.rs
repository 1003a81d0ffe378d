// ============================================================================
// src/input/batch.rs - Event Batch Buffer
// ============================================================================
//!
//! # イベントバッチバッファ
//!
//! 1フレーム（SYN_REPORT まで）のイベントを貯めて、まとめて配送する。
//! 容量は登録時に能力記述子から見積もって確保し、ホットパスでは
//! 再確保しない。
//!
//! ## フラッシュ規則
//! - `FLUSH`（SYN_REPORT）: 2件以上あれば配送し、常にリセット
//! - それ以外で長さが `capacity - BATCH_RESERVED` に達した: 合成
//!   SYN_REPORT を付加して配送し、リセット
//!
//! 操作の合間の長さは常に `capacity - BATCH_RESERVED` 未満。

use alloc::vec::Vec;

use crate::error::{InputError, InputResult};

use super::caps::{Capabilities, EventTypes};
use super::codes::{ABS_MT_POSITION_X, ABS_MT_TRACKING_ID, is_mt_axis};
use super::config::{BATCH_RESERVED, KEY_MSC_HEADROOM, MT_ESTIMATE_MAX_SLOTS, MT_ESTIMATE_MIN_SLOTS};
use super::event::InputValue;
use super::mt::MtState;

/// push 後にバッファをどう扱うか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// そのまま貯め続ける
    Keep,
    /// 配送せずに捨てる（単独の SYN_REPORT）
    Discard,
    /// 内容を配送してからリセットする
    Dispatch,
}

/// 固定容量のイベントバッファ
#[derive(Debug)]
pub struct EventBatch {
    vals: Vec<InputValue>,
    capacity: usize,
}

impl EventBatch {
    /// 容量を確保する
    ///
    /// 予約分を除いて最低2件（値 + SYN_REPORT）を格納できること。
    pub fn with_capacity(capacity: usize) -> InputResult<Self> {
        if capacity < BATCH_RESERVED + 2 {
            return Err(InputError::InvalidArgument);
        }
        let mut vals = Vec::new();
        vals.try_reserve_exact(capacity)?;
        Ok(Self { vals, capacity })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[InputValue] {
        &self.vals
    }

    #[inline]
    pub fn clear(&mut self) {
        self.vals.clear();
    }

    /// 自動フラッシュの閾値
    #[inline]
    fn high_water(&self) -> usize {
        self.capacity - BATCH_RESERVED
    }

    /// 値を追加する
    ///
    /// 不変条件により容量を超えることはないが、万一満杯なら捨てる。
    #[inline]
    pub fn push(&mut self, value: InputValue) {
        if self.vals.len() < self.capacity {
            self.vals.push(value);
        } else {
            log::warn!("input: batch full, dropping {:?}", value);
        }
    }

    /// push 直後のフラッシュ判定
    ///
    /// 満杯時は合成 SYN_REPORT をここで付加する。
    pub fn flush_action(&mut self, sync: bool) -> Flush {
        if sync {
            if self.vals.len() >= 2 {
                Flush::Dispatch
            } else {
                Flush::Discard
            }
        } else if self.vals.len() >= self.high_water() {
            self.push(InputValue::synthetic_sync());
            Flush::Dispatch
        } else {
            Flush::Keep
        }
    }
}

/// 1パケットあたりのイベント数を能力記述子から見積もる
///
/// スロット数は MT 状態、トラッキングIDの値域（[2, 32] にクランプ）、
/// ABS_MT_POSITION_X の有無（2）の順で決める。MT軸はスロット数ぶん、
/// その他の絶対軸と相対軸は1件ずつ数え、キー/MSC用の余裕を足す。
pub fn estimate_events_per_packet(caps: &Capabilities, mt: Option<&MtState>) -> usize {
    let mt_slots = if let Some(mt) = mt {
        mt.num_slots()
    } else if caps.abs.test(ABS_MT_TRACKING_ID as usize) {
        let span = caps.absinfo[ABS_MT_TRACKING_ID as usize].span();
        span.clamp(MT_ESTIMATE_MIN_SLOTS as i64, MT_ESTIMATE_MAX_SLOTS as i64) as usize
    } else if caps.abs.test(ABS_MT_POSITION_X as usize) {
        MT_ESTIMATE_MIN_SLOTS
    } else {
        0
    };

    // SYN_MT_REPORT（スロットごと）+ SYN_REPORT
    let mut events = mt_slots + 1;

    if caps.ev.contains(EventTypes::ABS) {
        for axis in caps.abs.iter_ones() {
            events += if is_mt_axis(axis as u16) { mt_slots } else { 1 };
        }
    }

    if caps.ev.contains(EventTypes::REL) {
        events += caps.rel.weight();
    }

    events + KEY_MSC_HEADROOM
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::caps::AbsParams;
    use crate::input::codes::*;
    use crate::input::mt::MtFlags;

    #[test]
    fn test_capacity_too_small() {
        assert_eq!(
            EventBatch::with_capacity(BATCH_RESERVED + 1).unwrap_err(),
            InputError::InvalidArgument
        );
        assert!(EventBatch::with_capacity(BATCH_RESERVED + 2).is_ok());
    }

    #[test]
    fn test_lone_sync_is_discarded() {
        let mut batch = EventBatch::with_capacity(10).unwrap();
        batch.push(InputValue::sync());
        assert_eq!(batch.flush_action(true), Flush::Discard);
    }

    #[test]
    fn test_sync_dispatches_frame() {
        let mut batch = EventBatch::with_capacity(10).unwrap();
        batch.push(InputValue::new(EV_KEY, KEY_A, 1));
        assert_eq!(batch.flush_action(false), Flush::Keep);
        batch.push(InputValue::sync());
        assert_eq!(batch.flush_action(true), Flush::Dispatch);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_overflow_appends_synthetic_sync() {
        let mut batch = EventBatch::with_capacity(6).unwrap();
        for i in 0..3 {
            batch.push(InputValue::new(EV_REL, REL_X, i + 1));
            assert_eq!(batch.flush_action(false), Flush::Keep);
        }
        batch.push(InputValue::new(EV_REL, REL_X, 4));
        assert_eq!(batch.flush_action(false), Flush::Dispatch);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.as_slice()[4], InputValue::synthetic_sync());
    }

    #[test]
    fn test_estimate_keyboard() {
        let mut caps = Capabilities::new();
        caps.set_capability(EV_KEY, KEY_A);
        assert_eq!(estimate_events_per_packet(&caps, None), 1 + KEY_MSC_HEADROOM);
    }

    #[test]
    fn test_estimate_mouse() {
        let mut caps = Capabilities::new();
        caps.set_capability(EV_REL, REL_X);
        caps.set_capability(EV_REL, REL_Y);
        caps.set_capability(EV_REL, REL_WHEEL);
        assert_eq!(estimate_events_per_packet(&caps, None), 1 + 3 + KEY_MSC_HEADROOM);
    }

    #[test]
    fn test_estimate_multitouch() {
        let mut caps = Capabilities::new();
        caps.set_abs_params(ABS_X, AbsParams::new(0, 255, 0, 0));
        caps.set_abs_params(ABS_MT_SLOT, AbsParams::new(0, 4, 0, 0));
        caps.set_abs_params(ABS_MT_POSITION_X, AbsParams::new(0, 255, 0, 0));
        caps.set_abs_params(ABS_MT_POSITION_Y, AbsParams::new(0, 255, 0, 0));
        let mt = MtState::new(5, MtFlags::empty()).unwrap();

        // 5 + 1 + ABS_X(1) + 3 MT軸 * 5 + 7
        assert_eq!(estimate_events_per_packet(&caps, Some(&mt)), 6 + 1 + 15 + 7);
    }

    #[test]
    fn test_estimate_slot_count_fallbacks() {
        let mut caps = Capabilities::new();
        caps.set_abs_params(ABS_MT_POSITION_X, AbsParams::new(0, 255, 0, 0));
        // 2 + 1 + 2 + 7
        assert_eq!(estimate_events_per_packet(&caps, None), 12);

        caps.set_abs_params(ABS_MT_TRACKING_ID, AbsParams::new(0, 0xffff, 0, 0));
        // 32 + 1 + 32 * 2 + 7
        assert_eq!(estimate_events_per_packet(&caps, None), 104);
    }
}
