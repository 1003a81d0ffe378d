// ============================================================================
// src/input/dispatch.rs - Dispatcher
// ============================================================================
//!
//! # ディスパッチャ
//!
//! フラッシュされたバッチをリスナーへ配る。
//!
//! - グラブ中はグラブしたハンドルだけに配る
//! - それ以外は開いているハンドルへ登録順に配る
//! - フィルタを持つハンドルには、フィルタが取ったイベントを除いた
//!   そのハンドル専用のコピーを渡す
//!
//! どのフィルタにも取られなかったイベントは `DispatchScratch` に記録され、
//! オートリピートの判定に使われる。
//!
//! ハンドル一覧とグラブは `spin::RwLock` で保護する。配送は読み取り側、
//! 登録・解除は書き込み側を取るため、解除は進行中の配送の完了を待つ。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::RwLock;

use crate::error::{InputError, InputResult};

use super::event::InputValue;
use super::handler::{InputHandle, InputListener};

/// 配送用の作業領域
///
/// バッチ容量に合わせて登録時に確保する。
#[derive(Debug)]
pub struct DispatchScratch {
    /// フィルタ後のハンドル専用コピー
    local: Vec<InputValue>,
    /// フィルタに取られたイベント
    consumed: Vec<bool>,
}

impl DispatchScratch {
    pub fn with_capacity(capacity: usize) -> InputResult<Self> {
        let mut local = Vec::new();
        local.try_reserve_exact(capacity)?;
        let mut consumed = Vec::new();
        consumed.try_reserve_exact(capacity)?;
        consumed.resize(capacity, false);
        Ok(Self { local, consumed })
    }

    /// 直前の配送で i 番目のイベントがフィルタに取られたか
    #[inline]
    pub fn consumed(&self, index: usize) -> bool {
        self.consumed.get(index).copied().unwrap_or(false)
    }
}

/// リスナー一覧とグラブを管理する
pub struct Dispatcher {
    handles: RwLock<Vec<Arc<InputHandle>>>,
    grab: RwLock<Option<Arc<InputHandle>>>,
    next_id: AtomicUsize,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self {
            handles: RwLock::new(Vec::new()),
            grab: RwLock::new(None),
            next_id: AtomicUsize::new(1),
        }
    }

    /// リスナーを登録してハンドルを返す
    ///
    /// ハンドルは閉じた状態で作られる。
    pub fn register(&self, listener: Arc<dyn InputListener>) -> InputResult<Arc<InputHandle>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(InputHandle::new(id, listener));

        let mut handles = self.handles.write();
        handles.try_reserve(1)?;
        handles.push(handle.clone());
        Ok(handle)
    }

    /// ハンドルを解除する
    ///
    /// 書き込みロックを取るため、進行中の配送が終わるまで待つ。
    /// グラブ中なら解放する。
    pub fn unregister(&self, handle: &Arc<InputHandle>) -> InputResult<()> {
        self.release_grab(handle);

        let mut handles = self.handles.write();
        let index = handles
            .iter()
            .position(|h| Arc::ptr_eq(h, handle))
            .ok_or(InputError::NotFound)?;
        handles.remove(index);
        Ok(())
    }

    fn contains(&self, handle: &Arc<InputHandle>) -> bool {
        self.handles.read().iter().any(|h| Arc::ptr_eq(h, handle))
    }

    /// デバイスを独占する
    pub fn grab(&self, handle: &Arc<InputHandle>) -> InputResult<()> {
        if !self.contains(handle) {
            return Err(InputError::NotFound);
        }

        let mut grab = self.grab.write();
        if grab.is_some() {
            return Err(InputError::Busy);
        }
        *grab = Some(handle.clone());
        Ok(())
    }

    /// グラブを解放する（保持していなければ何もしない）
    pub fn release_grab(&self, handle: &Arc<InputHandle>) -> bool {
        let mut grab = self.grab.write();
        match grab.as_ref() {
            Some(current) if Arc::ptr_eq(current, handle) => {
                *grab = None;
                true
            }
            _ => false,
        }
    }

    /// `handle` からのイベント注入を受け付けるか
    pub fn accepts_from(&self, handle: &Arc<InputHandle>) -> bool {
        match self.grab.read().as_ref() {
            Some(current) => Arc::ptr_eq(current, handle),
            None => true,
        }
    }

    pub fn grabbed_by(&self) -> Option<Arc<InputHandle>> {
        self.grab.read().clone()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.read().len()
    }

    /// 全ハンドルとグラブを破棄する
    pub fn clear(&self) {
        *self.grab.write() = None;
        self.handles.write().clear();
    }

    /// バッチを配送する
    ///
    /// 返り値は配送先のハンドル数。
    pub fn dispatch(&self, values: &[InputValue], scratch: &mut DispatchScratch) -> usize {
        let count = values.len().min(scratch.consumed.len());
        let values = &values[..count];
        scratch.consumed[..count].fill(false);

        let grab = self.grab.read();
        if let Some(handle) = grab.as_ref() {
            deliver(handle, values, scratch);
            return 1;
        }

        let handles = self.handles.read();
        let mut delivered = 0;
        for handle in handles.iter().filter(|h| h.is_open()) {
            deliver(handle, values, scratch);
            delivered += 1;
        }
        delivered
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 1つのハンドルへ配送する
fn deliver(handle: &InputHandle, values: &[InputValue], scratch: &mut DispatchScratch) {
    let listener = handle.listener();
    let kind = listener.kind();

    let values = if kind.has_filter() {
        scratch.local.clear();
        for (index, value) in values.iter().enumerate() {
            if listener.filter(value) {
                scratch.consumed[index] = true;
            } else {
                scratch.local.push(*value);
            }
        }
        scratch.local.as_slice()
    } else {
        values
    };

    if !kind.receives_events() || values.is_empty() {
        return;
    }

    if kind.wants_batch() {
        listener.events(values);
    } else {
        for value in values {
            listener.event(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::codes::*;
    use crate::input::handler::ListenerKind;
    use spin::Mutex;

    struct Recorder {
        kind: ListenerKind,
        drop_code: Option<u16>,
        seen: Mutex<Vec<InputValue>>,
        batches: AtomicUsize,
    }

    impl Recorder {
        fn new(kind: ListenerKind, drop_code: Option<u16>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                drop_code,
                seen: Mutex::new(Vec::new()),
                batches: AtomicUsize::new(0),
            })
        }

        fn seen(&self) -> Vec<InputValue> {
            self.seen.lock().clone()
        }
    }

    impl InputListener for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn kind(&self) -> ListenerKind {
            self.kind
        }

        fn filter(&self, value: &InputValue) -> bool {
            Some(value.code) == self.drop_code && value.event_type == EV_KEY
        }

        fn event(&self, value: &InputValue) {
            self.seen.lock().push(*value);
        }

        fn events(&self, values: &[InputValue]) {
            self.batches.fetch_add(1, Ordering::Relaxed);
            self.seen.lock().extend_from_slice(values);
        }
    }

    fn frame() -> [InputValue; 3] {
        [
            InputValue::new(EV_KEY, KEY_A, 1),
            InputValue::new(EV_KEY, KEY_B, 1),
            InputValue::sync(),
        ]
    }

    #[test]
    fn test_only_open_handles_receive() {
        let dispatcher = Dispatcher::new();
        let mut scratch = DispatchScratch::with_capacity(8).unwrap();
        let a = Recorder::new(ListenerKind::PerEvent, None);
        let b = Recorder::new(ListenerKind::Batch, None);
        let ha = dispatcher.register(a.clone()).unwrap();
        let _hb = dispatcher.register(b.clone()).unwrap();
        ha.open();

        assert_eq!(dispatcher.dispatch(&frame(), &mut scratch), 1);
        assert_eq!(a.seen(), frame().to_vec());
        assert!(b.seen().is_empty());
    }

    #[test]
    fn test_batch_vs_per_event_delivery() {
        let dispatcher = Dispatcher::new();
        let mut scratch = DispatchScratch::with_capacity(8).unwrap();
        let batch = Recorder::new(ListenerKind::Batch, None);
        let single = Recorder::new(ListenerKind::PerEvent, None);
        dispatcher.register(batch.clone()).unwrap().open();
        dispatcher.register(single.clone()).unwrap().open();

        dispatcher.dispatch(&frame(), &mut scratch);
        assert_eq!(batch.batches.load(Ordering::Relaxed), 1);
        assert_eq!(single.batches.load(Ordering::Relaxed), 0);
        assert_eq!(batch.seen(), single.seen());
    }

    #[test]
    fn test_filter_affects_only_its_own_copy() {
        let dispatcher = Dispatcher::new();
        let mut scratch = DispatchScratch::with_capacity(8).unwrap();
        let filtered = Recorder::new(ListenerKind::FilteredBatch, Some(KEY_A));
        let plain = Recorder::new(ListenerKind::Batch, None);
        let filter_only = Recorder::new(ListenerKind::FilterOnly, Some(KEY_B));
        dispatcher.register(filtered.clone()).unwrap().open();
        dispatcher.register(plain.clone()).unwrap().open();
        dispatcher.register(filter_only.clone()).unwrap().open();

        dispatcher.dispatch(&frame(), &mut scratch);
        assert_eq!(
            filtered.seen(),
            vec![InputValue::new(EV_KEY, KEY_B, 1), InputValue::sync()]
        );
        assert_eq!(plain.seen(), frame().to_vec());
        assert!(filter_only.seen().is_empty());

        assert!(scratch.consumed(0));
        assert!(scratch.consumed(1));
        assert!(!scratch.consumed(2));
    }

    #[test]
    fn test_grab_is_exclusive() {
        let dispatcher = Dispatcher::new();
        let mut scratch = DispatchScratch::with_capacity(8).unwrap();
        let a = Recorder::new(ListenerKind::PerEvent, None);
        let b = Recorder::new(ListenerKind::PerEvent, None);
        let ha = dispatcher.register(a.clone()).unwrap();
        let hb = dispatcher.register(b.clone()).unwrap();
        ha.open();
        hb.open();

        dispatcher.grab(&hb).unwrap();
        assert_eq!(dispatcher.grab(&ha), Err(InputError::Busy));
        assert!(!dispatcher.accepts_from(&ha));
        assert!(dispatcher.accepts_from(&hb));

        dispatcher.dispatch(&frame(), &mut scratch);
        assert!(a.seen().is_empty());
        assert_eq!(b.seen().len(), 3);

        // 保持者以外の解放は無視
        assert!(!dispatcher.release_grab(&ha));
        assert!(dispatcher.release_grab(&hb));
        dispatcher.dispatch(&frame(), &mut scratch);
        assert_eq!(a.seen().len(), 3);
    }

    #[test]
    fn test_unregister() {
        let dispatcher = Dispatcher::new();
        let a = Recorder::new(ListenerKind::PerEvent, None);
        let ha = dispatcher.register(a).unwrap();
        dispatcher.grab(&ha).unwrap();

        dispatcher.unregister(&ha).unwrap();
        assert!(dispatcher.grabbed_by().is_none());
        assert_eq!(dispatcher.handle_count(), 0);
        assert_eq!(dispatcher.unregister(&ha), Err(InputError::NotFound));
        assert_eq!(dispatcher.grab(&ha), Err(InputError::NotFound));
    }

    #[test]
    fn test_handle_ids_are_unique() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.register(Recorder::new(ListenerKind::Batch, None)).unwrap();
        let b = dispatcher.register(Recorder::new(ListenerKind::Batch, None)).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
