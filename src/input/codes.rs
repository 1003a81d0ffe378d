// ============================================================================
// src/input/codes.rs - Input Event Type / Code Constants
// ============================================================================
//!
//! # イベントタイプ・コード定数
//!
//! Linux evdev 互換のイベントタイプ (`EV_*`) と各クラスのコード定数。
//! ドライバとリスナーの間でそのまま受け渡せる値を採用している。

// ============================================================================
// Event Types (EV_*)
// ============================================================================

/// 同期イベント
pub const EV_SYN: u16 = 0x00;
/// キー/ボタンイベント
pub const EV_KEY: u16 = 0x01;
/// 相対軸イベント（マウス）
pub const EV_REL: u16 = 0x02;
/// 絶対軸イベント（タッチパネル）
pub const EV_ABS: u16 = 0x03;
/// その他イベント
pub const EV_MSC: u16 = 0x04;
/// スイッチイベント
pub const EV_SW: u16 = 0x05;
/// LED制御イベント
pub const EV_LED: u16 = 0x11;
/// サウンドイベント
pub const EV_SND: u16 = 0x12;
/// オートリピート設定イベント
pub const EV_REP: u16 = 0x14;
/// フォースフィードバックイベント
pub const EV_FF: u16 = 0x15;
/// 電源イベント
pub const EV_PWR: u16 = 0x16;
/// フォースフィードバック状態
pub const EV_FF_STATUS: u16 = 0x17;
pub const EV_MAX: u16 = 0x1f;
pub const EV_CNT: usize = EV_MAX as usize + 1;

// ============================================================================
// Synchronization Codes (SYN_*)
// ============================================================================

/// フレーム（ハードウェアレポート）の区切り
pub const SYN_REPORT: u16 = 0;
/// 設定変更
pub const SYN_CONFIG: u16 = 1;
/// スロットなしマルチタッチの接触区切り
pub const SYN_MT_REPORT: u16 = 2;
/// イベント欠落
pub const SYN_DROPPED: u16 = 3;

// ============================================================================
// Key / Button Codes (KEY_* / BTN_*)
// ============================================================================

pub const KEY_RESERVED: u16 = 0;
pub const KEY_ESC: u16 = 1;
pub const KEY_1: u16 = 2;
pub const KEY_2: u16 = 3;
pub const KEY_Q: u16 = 16;
pub const KEY_W: u16 = 17;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_A: u16 = 30;
pub const KEY_S: u16 = 31;
pub const KEY_D: u16 = 32;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_Z: u16 = 44;
pub const KEY_B: u16 = 48;
pub const KEY_SPACE: u16 = 57;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_NUMLOCK: u16 = 69;
pub const KEY_SCROLLLOCK: u16 = 70;
pub const KEY_POWER: u16 = 116;

pub const BTN_MISC: u16 = 0x100;
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_TOOL_PEN: u16 = 0x140;
pub const BTN_TOOL_FINGER: u16 = 0x145;
pub const BTN_TOOL_QUINTTAP: u16 = 0x148;
pub const BTN_TOUCH: u16 = 0x14a;
pub const BTN_TOOL_DOUBLETAP: u16 = 0x14d;
pub const BTN_TOOL_TRIPLETAP: u16 = 0x14e;
pub const BTN_TOOL_QUADTAP: u16 = 0x14f;

pub const KEY_MAX: u16 = 0x2ff;
pub const KEY_CNT: usize = KEY_MAX as usize + 1;

/// オートリピートのエコー値（状態ビットを変えずに常に通過する）
pub const KEY_VALUE_REPEAT: i32 = 2;

// ============================================================================
// Relative Axes (REL_*)
// ============================================================================

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_Z: u16 = 0x02;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_DIAL: u16 = 0x07;
pub const REL_WHEEL: u16 = 0x08;
pub const REL_MISC: u16 = 0x09;
pub const REL_MAX: u16 = 0x0f;
pub const REL_CNT: usize = REL_MAX as usize + 1;

// ============================================================================
// Absolute Axes (ABS_*)
// ============================================================================

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_THROTTLE: u16 = 0x06;
pub const ABS_WHEEL: u16 = 0x08;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_DISTANCE: u16 = 0x19;
pub const ABS_TILT_X: u16 = 0x1a;
pub const ABS_TILT_Y: u16 = 0x1b;
pub const ABS_TOOL_WIDTH: u16 = 0x1c;

/// 現在のスロット選択（マルチタッチ）
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_TOUCH_MAJOR: u16 = 0x30;
pub const ABS_MT_TOUCH_MINOR: u16 = 0x31;
pub const ABS_MT_WIDTH_MAJOR: u16 = 0x32;
pub const ABS_MT_WIDTH_MINOR: u16 = 0x33;
pub const ABS_MT_ORIENTATION: u16 = 0x34;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TOOL_TYPE: u16 = 0x37;
pub const ABS_MT_BLOB_ID: u16 = 0x38;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MT_PRESSURE: u16 = 0x3a;
pub const ABS_MT_DISTANCE: u16 = 0x3b;
pub const ABS_MT_TOOL_X: u16 = 0x3c;
pub const ABS_MT_TOOL_Y: u16 = 0x3d;

/// スロット単位で保持される最初のMT軸
pub const ABS_MT_FIRST: u16 = ABS_MT_TOUCH_MAJOR;
/// スロット単位で保持される最後のMT軸
pub const ABS_MT_LAST: u16 = ABS_MT_TOOL_Y;
/// スロットあたりの軸数
pub const ABS_MT_VALUES: usize = (ABS_MT_LAST - ABS_MT_FIRST) as usize + 1;

pub const ABS_MAX: u16 = 0x3f;
pub const ABS_CNT: usize = ABS_MAX as usize + 1;

/// スロット単位で保持されるMT軸か
#[inline]
pub const fn is_mt_value(axis: u16) -> bool {
    axis >= ABS_MT_FIRST && axis <= ABS_MT_LAST
}

/// スロット選択を含むMT軸か
#[inline]
pub const fn is_mt_axis(axis: u16) -> bool {
    axis == ABS_MT_SLOT || is_mt_value(axis)
}

// ============================================================================
// MT Tool Types (MT_TOOL_*)
// ============================================================================

pub const MT_TOOL_FINGER: i32 = 0;
pub const MT_TOOL_PEN: i32 = 1;
pub const MT_TOOL_PALM: i32 = 2;

// ============================================================================
// Misc / Switch / LED / Sound / Repeat / FF
// ============================================================================

pub const MSC_SERIAL: u16 = 0x00;
pub const MSC_GESTURE: u16 = 0x02;
pub const MSC_RAW: u16 = 0x03;
pub const MSC_SCAN: u16 = 0x04;
pub const MSC_TIMESTAMP: u16 = 0x05;
pub const MSC_MAX: u16 = 0x07;
pub const MSC_CNT: usize = MSC_MAX as usize + 1;

pub const SW_LID: u16 = 0x00;
pub const SW_TABLET_MODE: u16 = 0x01;
pub const SW_HEADPHONE_INSERT: u16 = 0x02;
pub const SW_MAX: u16 = 0x10;
pub const SW_CNT: usize = SW_MAX as usize + 1;

pub const LED_NUML: u16 = 0x00;
pub const LED_CAPSL: u16 = 0x01;
pub const LED_SCROLLL: u16 = 0x02;
pub const LED_MAX: u16 = 0x0f;
pub const LED_CNT: usize = LED_MAX as usize + 1;

pub const SND_CLICK: u16 = 0x00;
pub const SND_BELL: u16 = 0x01;
pub const SND_TONE: u16 = 0x02;
pub const SND_MAX: u16 = 0x07;
pub const SND_CNT: usize = SND_MAX as usize + 1;

/// 初回リピートまでの遅延 (ms)
pub const REP_DELAY: u16 = 0x00;
/// リピート周期 (ms)
pub const REP_PERIOD: u16 = 0x01;
pub const REP_MAX: u16 = 0x01;
pub const REP_CNT: usize = REP_MAX as usize + 1;

pub const FF_RUMBLE: u16 = 0x50;
pub const FF_GAIN: u16 = 0x60;
pub const FF_MAX: u16 = 0x7f;
pub const FF_CNT: usize = FF_MAX as usize + 1;
