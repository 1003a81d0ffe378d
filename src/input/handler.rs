// ============================================================================
// src/input/handler.rs - Listener Interface
// ============================================================================
//!
//! # リスナー
//!
//! デバイスからのイベントを受け取る側のインターフェース。
//! リスナーは `ListenerKind` で受け取り方（フィルタ、1件ずつ、バッチ）を
//! 宣言し、デバイスに登録されると `InputHandle` に包まれる。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::event::InputValue;

/// リスナーの受信形態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// フィルタのみ（配送は受けない）
    FilterOnly,
    /// 1件ずつ `event` で受け取る
    PerEvent,
    /// フレーム単位で `events` で受け取る
    Batch,
    /// フィルタ後に1件ずつ受け取る
    FilteredPerEvent,
    /// フィルタ後にフレーム単位で受け取る
    FilteredBatch,
}

impl ListenerKind {
    /// `filter` を呼ぶか
    #[inline]
    pub const fn has_filter(self) -> bool {
        matches!(
            self,
            Self::FilterOnly | Self::FilteredPerEvent | Self::FilteredBatch
        )
    }

    /// イベントの配送を受けるか
    #[inline]
    pub const fn receives_events(self) -> bool {
        !matches!(self, Self::FilterOnly)
    }

    /// バッチ単位で配送するか
    #[inline]
    pub const fn wants_batch(self) -> bool {
        matches!(self, Self::Batch | Self::FilteredBatch)
    }
}

/// 入力リスナートレイト
///
/// コールバックはデバイスのイベントロック下（割り込み禁止）で呼ばれる。
/// 同じデバイスへの再入（登録・報告）は行わないこと。
pub trait InputListener: Send + Sync {
    /// リスナー名
    fn name(&self) -> &'static str;

    /// 受信形態
    fn kind(&self) -> ListenerKind;

    /// `true` を返したイベントはこのリスナーへの配送から除かれる
    fn filter(&self, _value: &InputValue) -> bool {
        false
    }

    /// 1件ずつの配送
    fn event(&self, _value: &InputValue) {}

    /// バッチ配送
    fn events(&self, values: &[InputValue]) {
        for value in values {
            self.event(value);
        }
    }
}

/// デバイスとリスナーの結び付き
pub struct InputHandle {
    id: usize,
    listener: Arc<dyn InputListener>,
    /// open() の参照カウント
    open: AtomicUsize,
}

impl InputHandle {
    pub(crate) fn new(id: usize, listener: Arc<dyn InputListener>) -> Self {
        Self {
            id,
            listener,
            open: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.listener.name()
    }

    #[inline]
    pub fn listener(&self) -> &Arc<dyn InputListener> {
        &self.listener
    }

    /// 配送を開始する（参照カウント）
    pub fn open(&self) {
        self.open.fetch_add(1, Ordering::AcqRel);
    }

    /// 配送を停止する
    ///
    /// 開いていないハンドルへの close は何もしない。
    pub fn close(&self) {
        let _ = self
            .open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) > 0
    }
}

impl core::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputHandle")
            .field("id", &self.id)
            .field("listener", &self.listener.name())
            .field("open", &self.open.load(Ordering::Relaxed))
            .finish()
    }
}
