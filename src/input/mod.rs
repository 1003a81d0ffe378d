// ============================================================================
// src/input/mod.rs - Input Event Core
// ============================================================================
//!
//! # 入力イベントコア
//!
//! ドライバが報告する生のイベントを、重複排除・ジッタ抑制・マルチタッチの
//! スロット管理を経てフレーム単位でリスナーへ配送する。
//!
//! ## 構成
//! - `disposition` - イベントの処理方針の決定と状態更新
//! - `defuzz` - 絶対軸のヒステリシスフィルタ
//! - `mt` - マルチタッチスロットトラッカーと接触点の割り当て
//! - `batch` - フレームバッファとフラッシュ規則
//! - `dispatch` / `handler` - リスナーへの配送、グラブ
//! - `repeat` - キーオートリピート
//! - `device` - 上記をまとめたデバイス本体
//!
//! ## 使用例
//! ```ignore
//! let device = InputDeviceBuilder::new("keyboard")
//!     .capability(EV_KEY, KEY_A)
//!     .build()?;
//! let handle = device.register_listener(listener)?;
//! handle.open();
//!
//! device.report_key(KEY_A, true);
//! device.sync();
//! ```

pub mod batch;
pub mod bitmap;
pub mod caps;
pub mod codes;
pub mod config;
pub mod defuzz;
pub mod device;
pub mod dispatch;
pub mod disposition;
pub mod event;
pub mod handler;
pub mod mt;
pub mod repeat;
pub mod resolution;
pub mod state;
pub mod stats;

pub use batch::{estimate_events_per_packet, EventBatch};
pub use caps::{AbsParams, Capabilities, EventTypes};
pub use device::{DeviceEcho, InputDevice, InputDeviceBuilder};
pub use disposition::{classify, Classification, Disposition};
pub use event::InputValue;
pub use handler::{InputHandle, InputListener, ListenerKind};
pub use mt::{MtFlags, MtPos, MtSlot, MtState};
pub use repeat::{RepeatTimer, SoftRepeatTimer};
pub use resolution::{calc_abs_res, HidExtents};
pub use state::DeviceState;
pub use stats::StatsSnapshot;
