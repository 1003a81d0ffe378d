// ============================================================================
// src/input/defuzz.rs - Absolute-Axis Defuzzer
// ============================================================================
//!
//! # 絶対軸デファザー
//!
//! センサーのジッタを抑えるための3段階ヒステリシスフィルタ。
//!
//! | 旧値からの距離 | 出力 |
//! |---|---|
//! | `< fuzz/2` | 旧値（完全抑制） |
//! | `< fuzz` | 旧値75% + 新値25% |
//! | `< fuzz*2` | 旧値50% + 新値50% |
//! | それ以上 | 新値そのまま |
//!
//! `fuzz == 0` でフィルタ無効。

/// 新しい値を旧値に対してフィルタする
pub fn defuzz(value: i32, old: i32, fuzz: i32) -> i32 {
    if fuzz == 0 {
        return value;
    }

    // i64 で計算してオーバーフローを避ける
    let value = value as i64;
    let old = old as i64;
    let fuzz = fuzz as i64;

    let filtered = if value > old - fuzz / 2 && value < old + fuzz / 2 {
        old
    } else if value > old - fuzz && value < old + fuzz {
        (old * 3 + value) / 4
    } else if value > old - fuzz * 2 && value < old + fuzz * 2 {
        (old + value) / 2
    } else {
        value
    };

    filtered as i32
}
