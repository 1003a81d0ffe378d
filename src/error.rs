//! 統一エラーハンドリングモジュール
//!
//! 入力コアで使用されるエラー型を定義します。
//!
//! 入力コアはI/Oを行わない状態遷移エンジンなので、実行時の範囲外イベントは
//! エラーではなく無視・クランプで処理されます。エラーとして返るのは
//! 登録・設定・ハンドル操作のような制御パスのみです。

use core::fmt;

/// 入力コアの統一エラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// メモリ不足（登録時のバッファ・スロット確保失敗）
    OutOfMemory,
    /// 無効な引数
    InvalidArgument,
    /// サポートされていない操作
    NotSupported,
    /// 他のハンドルがデバイスをグラブ中
    Busy,
    /// ハンドルが見つからない
    NotFound,
    /// デバイスは既に登録解除済み
    Unregistered,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::OutOfMemory => write!(f, "out of memory"),
            InputError::InvalidArgument => write!(f, "invalid argument"),
            InputError::NotSupported => write!(f, "not supported"),
            InputError::Busy => write!(f, "device busy"),
            InputError::NotFound => write!(f, "handle not found"),
            InputError::Unregistered => write!(f, "device unregistered"),
        }
    }
}

impl From<alloc::collections::TryReserveError> for InputError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        InputError::OutOfMemory
    }
}

// ===== Result type alias =====

/// 入力コアの結果型エイリアス
pub type InputResult<T> = Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec::Vec;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", InputError::OutOfMemory), "out of memory");
        assert_eq!(format!("{}", InputError::Busy), "device busy");
    }

    #[test]
    fn test_try_reserve_conversion() {
        let mut v: Vec<u64> = Vec::new();
        let err: InputError = v.try_reserve_exact(usize::MAX).unwrap_err().into();
        assert_eq!(err, InputError::OutOfMemory);
    }
}
