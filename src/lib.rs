// ============================================================================
// src/lib.rs - ExoRust Input Core
// ============================================================================
//!
//! # ExoRust 入力コア
//!
//! デバイスドライバが報告する `(type, code, value)` の三つ組を受け取り、
//! 重複排除・マルチタッチスロット管理・フレーム単位のバッファリングを経て
//! リスナーへ正規化されたイベントストリームを配送する。
//!
//! ## モジュール構成
//! - `error` - 統一エラー型
//! - `sync` - 割り込み安全なロック
//! - `input` - 分類器、デファザー、スロットトラッカー、バッチ、ディスパッチャ

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod input;
pub mod sync;

pub use error::{InputError, InputResult};
pub use input::{
    AbsParams, Capabilities, DeviceEcho, EventTypes, InputDevice, InputDeviceBuilder,
    InputHandle, InputListener, InputValue, ListenerKind, MtFlags, MtPos, RepeatTimer,
    SoftRepeatTimer,
};
