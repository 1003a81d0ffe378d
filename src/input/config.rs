// ============================================================================
// src/input/config.rs - Input Core Configuration
// ============================================================================
//!
//! 入力コアのコンパイル時設定値。
//! デバイス単位の設定は `InputDeviceBuilder` で行う。

/// オートリピート: 初回リピートまでのデフォルト遅延 (ms)
pub const DEFAULT_REP_DELAY_MS: i32 = 250;

/// オートリピート: デフォルトのリピート周期 (ms)
pub const DEFAULT_REP_PERIOD_MS: i32 = 33;

/// 1レポート中のキー/MSCイベント用の余裕
pub const KEY_MSC_HEADROOM: usize = 7;

/// フラッシュ前にスロット選択を1つ挿入するための予約
pub const SLOT_INJECTION_EVENTS: usize = 1;

/// バッファ満杯フラッシュ時に終端SYN_REPORTを付加するための予約
pub const SYNC_EVENTS: usize = 1;

/// バッチバッファ末尾の予約数
///
/// 1回の push で最大 `SLOT_INJECTION_EVENTS + 1` 個が追加され、
/// 満杯フラッシュで `SYNC_EVENTS` 個が付加される。容量の見積もり式を
/// 変える場合もこの値から導出すること。
pub const BATCH_RESERVED: usize = SLOT_INJECTION_EVENTS + SYNC_EVENTS;

/// トラッキングIDのマスク（16ビットで折り返す）
pub const TRKID_MAX: i32 = 0xffff;

/// トラッキングIDの符号ビット（折り返しを考慮した新旧比較用）
pub const TRKID_SGN: i32 = (TRKID_MAX + 1) >> 1;

/// スロット数を宣言しないMTデバイスの見積もり用スロット数の範囲
pub const MT_ESTIMATE_MIN_SLOTS: usize = 2;
pub const MT_ESTIMATE_MAX_SLOTS: usize = 32;

/// 登録可能なスロット数の上限
pub const MAX_MT_SLOTS: usize = 1024;

const _: () = assert!(BATCH_RESERVED == 2, "flush margin must cover slot + sync");
