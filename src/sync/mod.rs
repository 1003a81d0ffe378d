// ============================================================================
// src/sync/mod.rs - 同期プリミティブ
// 入力コア用の割り込み安全なロック機構
// ============================================================================

pub mod irq_mutex;

pub use irq_mutex::{IrqMutex, IrqMutexGuard};
