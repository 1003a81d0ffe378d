// ============================================================================
// src/input/stats.rs - Per-Device Statistics
// ============================================================================
//!
//! デバイスごとのイベントカウンタ。`stats` フィーチャー無効時は
//! 加算が空になり、スナップショットは常に0を返す。

use core::sync::atomic::{AtomicU64, Ordering};

/// 統計カウンタ
#[derive(Debug, Default)]
pub struct InputStats {
    reported: AtomicU64,
    ignored: AtomicU64,
    flushes: AtomicU64,
    overflow_flushes: AtomicU64,
    dispatched: AtomicU64,
}

/// ある時点のカウンタ値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// ドライバから報告されたイベント数
    pub reported: u64,
    /// 分類器で捨てられたイベント数
    pub ignored: u64,
    /// 配送されたバッチ数
    pub flushes: u64,
    /// うちバッファ満杯による配送
    pub overflow_flushes: u64,
    /// 配送されたイベント数
    pub dispatched: u64,
}

#[inline(always)]
#[allow(unused_variables)]
fn add(counter: &AtomicU64, n: u64) {
    #[cfg(feature = "stats")]
    counter.fetch_add(n, Ordering::Relaxed);
}

impl InputStats {
    pub const fn new() -> Self {
        Self {
            reported: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            overflow_flushes: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_reported(&self) {
        add(&self.reported, 1);
    }

    #[inline]
    pub fn record_ignored(&self) {
        add(&self.ignored, 1);
    }

    /// バッチ配送を記録
    #[inline]
    pub fn record_flush(&self, events: usize, overflow: bool) {
        add(&self.flushes, 1);
        add(&self.dispatched, events as u64);
        if overflow {
            add(&self.overflow_flushes, 1);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reported: self.reported.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            overflow_flushes: self.overflow_flushes.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
        }
    }
}
