// ============================================================================
// src/input/event.rs - Input Value
// ============================================================================

use super::codes::{ABS_MT_SLOT, EV_ABS, EV_KEY, EV_SYN, SYN_REPORT};

/// 正規化されたイベント値 `(type, code, value)`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputValue {
    /// イベントタイプ (EV_KEY, EV_ABS, ...)
    pub event_type: u16,
    /// イベントコード (キーコード、軸コード、...)
    pub code: u16,
    /// 値
    pub value: i32,
}

impl InputValue {
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// バッファ満杯時に挿入される合成SYN_REPORT
    ///
    /// ドライバ由来のSYN_REPORT（値0）と区別できるよう値は1。
    pub const fn synthetic_sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 1)
    }

    /// フレーム終端のSYN_REPORT
    pub const fn sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    /// スロット選択イベント
    pub const fn slot(slot: usize) -> Self {
        Self::new(EV_ABS, ABS_MT_SLOT, slot as i32)
    }

    pub const fn is_key(&self) -> bool {
        self.event_type == EV_KEY
    }
}
