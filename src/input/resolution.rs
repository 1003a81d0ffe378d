// ============================================================================
// src/input/resolution.rs - Absolute Axis Resolution from HID Units
// ============================================================================
//!
//! # 絶対軸の分解能計算
//!
//! HIDレポートフィールドの論理範囲・物理範囲・単位から、絶対軸の分解能を
//! 求める（HID 1.11 6.2.2.7 Global Items）。
//!
//! ```text
//!                      (logical_maximum - logical_minimum)
//! resolution = -------------------------------------------------------
//!              (physical_maximum - physical_minimum) * 10 ^ unit_exponent
//! ```
//!
//! 長さの軸は units/mm（センチメートルとインチを換算）、角度の軸は
//! units/rad（度を換算）。計算できない場合は0。

use super::codes::*;

/// HIDフィールドの範囲と単位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HidExtents {
    pub logical_minimum: i32,
    pub logical_maximum: i32,
    pub physical_minimum: i32,
    pub physical_maximum: i32,
    /// HID単位コード（下位ニブル = 系、次のニブル = 長さの指数）
    pub unit: u32,
    pub unit_exponent: i32,
}

/// 単位系: SI直線（センチメートル）
const UNIT_SYSTEM_CM: u32 = 0x1;
/// 単位系: 英国直線（インチ）
const UNIT_SYSTEM_INCH: u32 = 0x3;
/// SI回転（ラジアン）
const UNIT_RADIANS: u32 = 0x12;
/// 英国回転（度）
const UNIT_DEGREES: u32 = 0x14;

/// `bits` ビットの符号付き値を i32 へ符号拡張する
fn sign_extend(value: u32, bits: u32) -> i32 {
    match bits {
        8 => value as u8 as i8 as i32,
        16 => value as u16 as i16 as i32,
        32 => value as i32,
        _ => {
            let shift = 32 - bits;
            ((value << shift) as i32) >> shift
        }
    }
}

/// 最も近い整数への丸め付き除算（正の値のみ）
fn div_round_closest(n: i32, d: i32) -> i32 {
    ((n as i64 + d as i64 / 2) / d as i64) as i32
}

/// 軸の分解能を計算する
pub fn calc_abs_res(extents: &HidExtents, code: u16) -> i32 {
    let mut unit_exponent = extents.unit_exponent;
    let Some(mut logical) = extents.logical_maximum.checked_sub(extents.logical_minimum) else {
        return 0;
    };
    let Some(mut physical) = extents.physical_maximum.checked_sub(extents.physical_minimum) else {
        return 0;
    };

    if logical <= 0 || physical <= 0 {
        return 0;
    }

    match code {
        ABS_X | ABS_Y | ABS_Z | ABS_MT_POSITION_X | ABS_MT_POSITION_Y | ABS_MT_TOOL_X
        | ABS_MT_TOOL_Y | ABS_MT_TOUCH_MAJOR | ABS_MT_TOUCH_MINOR => {
            // 長さ以外
            if extents.unit & 0xffff_ff00 != 0 {
                return 0;
            }
            unit_exponent += sign_extend(extents.unit >> 4, 4) - 1;
            match extents.unit & 0xf {
                UNIT_SYSTEM_CM => unit_exponent += 1,
                UNIT_SYSTEM_INCH => {
                    let Some(mm) = physical.checked_mul(254) else {
                        return 0;
                    };
                    physical = mm;
                    unit_exponent -= 1;
                }
                _ => return 0,
            }
        }

        ABS_RX | ABS_RY | ABS_RZ | ABS_TILT_X | ABS_TILT_Y => {
            if extents.unit == UNIT_DEGREES {
                // 1 rad ≒ 57.3°
                let Some(rad) = logical.checked_mul(573) else {
                    return 0;
                };
                logical = rad;
                unit_exponent += 1;
            } else if extents.unit != UNIT_RADIANS {
                return 0;
            }
        }

        _ => return 0,
    }

    while unit_exponent < 0 {
        let Some(scaled) = logical.checked_mul(10) else {
            return 0;
        };
        logical = scaled;
        unit_exponent += 1;
    }
    while unit_exponent > 0 {
        let Some(scaled) = physical.checked_mul(10) else {
            return 0;
        };
        physical = scaled;
        unit_exponent -= 1;
    }

    div_round_closest(logical, physical)
}
