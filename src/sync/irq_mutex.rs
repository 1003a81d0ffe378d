// ============================================================================
// src/sync/irq_mutex.rs - 割り込み禁止Mutex
//
// 問題: spin::Mutex はロック中でも割り込みを許可する
// → 割り込みハンドラ（入力ドライバのIRQ）が同じデバイスのイベントロックを
//   取ろうとするとデッドロック
//
// 解決: ロック取得時にローカル割り込みを禁止し、解放時に元の状態へ復元
//
// 参考: Linux の spin_lock_irqsave / spin_unlock_irqrestore
// ============================================================================

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// 割り込みフラグを保存して割り込みを禁止
///
/// # Returns
/// 元の割り込み有効状態 (true = 有効だった)
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
fn save_and_disable_interrupts() -> bool {
    let was_enabled = x86_64::instructions::interrupts::are_enabled();
    x86_64::instructions::interrupts::disable();
    was_enabled
}

/// ホスト環境（ユーザー空間）では割り込みフラグに触れない
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
#[inline]
fn save_and_disable_interrupts() -> bool {
    false
}

/// 割り込みを復元（元々有効だった場合のみ有効化）
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
fn restore_interrupts(was_enabled: bool) {
    if was_enabled {
        x86_64::instructions::interrupts::enable();
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
#[inline]
fn restore_interrupts(_was_enabled: bool) {}

/// 割り込み禁止Mutex
///
/// ロック取得時に自動的に割り込みを禁止し、
/// ロック解放時に元の状態に復元する。
///
/// 入力デバイスのイベントロックとして使用され、分類 → バッファ → フラッシュの
/// 一連の処理を同一デバイスの他のプロデューサーに対してアトミックにする。
///
/// # Usage
/// ```ignore
/// let inner = IrqMutex::new(DeviceInner::new(..));
///
/// fn report(inner: &IrqMutex<DeviceInner>) {
///     let mut guard = inner.lock();
///     guard.batch.push(..);
///     // guard がドロップされると割り込みが復元される
/// }
/// ```
pub struct IrqMutex<T: ?Sized> {
    /// スピンロック本体
    locked: AtomicBool,
    /// 保護されるデータ
    data: UnsafeCell<T>,
}

// SAFETY: IrqMutex は排他的アクセスを保証する
unsafe impl<T: ?Sized + Send> Sync for IrqMutex<T> {}
unsafe impl<T: ?Sized + Send> Send for IrqMutex<T> {}

impl<T> IrqMutex<T> {
    /// 新しい IrqMutex を作成
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> IrqMutex<T> {
    /// ロックを取得
    ///
    /// 割り込みを禁止してからスピンロックを取得する。
    /// ガードがドロップされると自動的に割り込みが復元される。
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        // 1. 割り込みを禁止（現在の状態を保存）
        let irq_was_enabled = save_and_disable_interrupts();

        // 2. スピンロックを取得
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }

        IrqMutexGuard {
            lock: self,
            irq_was_enabled,
        }
    }
}

/// IrqMutex のガード
///
/// ドロップ時にロックを解放し、割り込み状態を復元する。
pub struct IrqMutexGuard<'a, T: ?Sized> {
    lock: &'a IrqMutex<T>,
    irq_was_enabled: bool,
}

impl<T: ?Sized> Deref for IrqMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ロックを保持しているので安全にアクセス可能
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: ロックを保持しているので安全にアクセス可能
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for IrqMutexGuard<'_, T> {
    fn drop(&mut self) {
        // 1. スピンロックを解放
        self.lock.locked.store(false, Ordering::Release);

        // 2. 割り込み状態を復元
        restore_interrupts(self.irq_was_enabled);
    }
}
