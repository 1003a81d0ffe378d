// ============================================================================
// src/input/mt/assign.rs - Contact-to-Slot Assignment
// ============================================================================
//!
//! # 接触点のスロット割り当て
//!
//! 新しいフレームの接触座標を、直前フレームのアクティブなスロットへ
//! 二乗ユークリッド距離の総和が最小になるよう割り当てる。
//!
//! ハンガリアン法（Kuhn–Munkres, ポテンシャル付き最短増加路）で
//! `O(n^3)` の厳密解を求める。行 = 接触点、列 = スロット数ぶんの列
//! （先頭がアクティブなスロット、残りがダミー）。ダミー列と `dmax` を
//! 超える組は同じ大きなコスト `UNMATCHED` を持ち、解いた後に
//! 未割り当てとして扱う。
//!
//! 比較は常に厳密な `<` で、同コストの候補は小さい列（スロット）が勝つ。

use alloc::vec::Vec;

use crate::error::{InputError, InputResult};
use crate::input::codes::{ABS_MT_POSITION_X, ABS_MT_POSITION_Y};

use super::{MtFlags, MtState};

/// 接触点の座標
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MtPos {
    pub x: i16,
    pub y: i16,
}

impl MtPos {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// 未割り当て（ダミー列・距離超過）のコスト
///
/// 対応付け可能な組のコストは `UNMATCHED - 1` で頭打ちにする。
/// 最大スロット数ぶん加算しても i64 に収まる。
const UNMATCHED: i64 = 1 << 40;

/// 二乗距離（飽和演算）
fn squared_distance(x: i32, y: i32, pos: &MtPos) -> i64 {
    let dx = x as i64 - pos.x as i64;
    let dy = y as i64 - pos.y as i64;
    dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
}

/// ポテンシャル計算用の無限大
const INF: i64 = i64::MAX / 4;

/// 割り当て用スクラッチ
///
/// 登録時に `num_slots` から確保し、以後は再確保しない。
/// 配列は1始まりで、添字0は番兵。
#[derive(Debug)]
pub struct AssignScratch {
    /// 行優先の `rows x cols` コスト行列
    cost: Vec<i64>,
    /// 行ポテンシャル
    u: Vec<i64>,
    /// 列ポテンシャル
    v: Vec<i64>,
    /// 列に割り当てられた行（0 = なし）
    p: Vec<usize>,
    /// 増加路の前の列
    way: Vec<usize>,
    minv: Vec<i64>,
    used: Vec<bool>,
    /// 列番号 → アクティブなスロット番号
    active: Vec<usize>,
}

fn zeroed<T: Clone>(len: usize, value: T) -> InputResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

impl AssignScratch {
    pub fn new(num_slots: usize) -> InputResult<Self> {
        let cells = num_slots
            .checked_mul(num_slots)
            .ok_or(InputError::InvalidArgument)?;
        Ok(Self {
            cost: zeroed(cells, 0)?,
            u: zeroed(num_slots + 1, 0)?,
            v: zeroed(num_slots + 1, 0)?,
            p: zeroed(num_slots + 1, 0)?,
            way: zeroed(num_slots + 1, 0)?,
            minv: zeroed(num_slots + 1, 0)?,
            used: zeroed(num_slots + 1, false)?,
            active: zeroed(num_slots, 0)?,
        })
    }

    /// 最小コストの完全割り当てを求める
    ///
    /// `rows <= cols` であること。結果は `p[col] = row`（どちらも1始まり）。
    fn solve(&mut self, rows: usize, cols: usize) {
        let Self {
            cost,
            u,
            v,
            p,
            way,
            minv,
            used,
            ..
        } = self;

        u[..=rows].fill(0);
        v[..=cols].fill(0);
        p[..=cols].fill(0);
        way[..=cols].fill(0);

        for i in 1..=rows {
            p[0] = i;
            let mut j0 = 0;
            minv[..=cols].fill(INF);
            used[..=cols].fill(false);

            loop {
                used[j0] = true;
                let i0 = p[j0];
                let mut delta = INF;
                let mut j1 = 0;

                for j in 1..=cols {
                    if used[j] {
                        continue;
                    }
                    let cur = cost[(i0 - 1) * cols + (j - 1)] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }

                for j in 0..=cols {
                    if used[j] {
                        u[p[j]] += delta;
                        v[j] -= delta;
                    } else {
                        minv[j] -= delta;
                    }
                }

                j0 = j1;
                if p[j0] == 0 {
                    break;
                }
            }

            // 増加路に沿って割り当てを反転
            loop {
                let j1 = way[j0];
                p[j0] = p[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }
    }
}

impl MtState {
    /// 接触座標をスロットへ割り当てる
    ///
    /// `slots_out[i]` に `positions[i]` のスロット番号を書き込む。
    /// アクティブなスロットへ最小二乗距離で対応付け、余った接触点には
    /// 非アクティブなスロットを昇順に割り当てる。空きが無ければ `None`。
    /// `dmax > 0` のとき、距離が `dmax` を超える組は対応付けない。
    ///
    /// 同じ入力に対して常に同じ結果を返す。
    pub fn assign_slots(
        &mut self,
        positions: &[MtPos],
        slots_out: &mut [Option<usize>],
        dmax: i32,
    ) -> InputResult<()> {
        if !self.flags.contains(MtFlags::TRACK) {
            return Err(InputError::NotSupported);
        }
        let num_slots = self.slots.len();
        if positions.len() > num_slots || slots_out.len() < positions.len() {
            return Err(InputError::InvalidArgument);
        }
        let scratch = self.scratch.as_mut().ok_or(InputError::NotSupported)?;

        let rows = positions.len();
        if rows == 0 {
            return Ok(());
        }

        let mut num_active = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.is_active() {
                scratch.active[num_active] = index;
                num_active += 1;
            }
        }

        let cols = num_slots;
        let limit = if dmax > 0 {
            Some(dmax as i64 * dmax as i64)
        } else {
            None
        };

        for (row, pos) in positions.iter().enumerate() {
            for col in 0..cols {
                let cell = &mut scratch.cost[row * cols + col];
                *cell = if col < num_active {
                    let slot = &self.slots[scratch.active[col]];
                    let dist = squared_distance(
                        slot.get_value(ABS_MT_POSITION_X),
                        slot.get_value(ABS_MT_POSITION_Y),
                        pos,
                    );
                    match limit {
                        Some(limit) if dist > limit => UNMATCHED,
                        _ => dist.min(UNMATCHED - 1),
                    }
                } else {
                    UNMATCHED
                };
            }
        }

        scratch.solve(rows, cols);

        slots_out[..rows].fill(None);
        for col in 1..=num_active {
            let row = scratch.p[col];
            if row != 0 && scratch.cost[(row - 1) * cols + (col - 1)] < UNMATCHED {
                slots_out[row - 1] = Some(scratch.active[col - 1]);
            }
        }

        // 未割り当ての接触点に空きスロットを昇順で配る
        let mut free = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_active())
            .map(|(index, _)| index);
        for out in slots_out[..rows].iter_mut() {
            if out.is_none() {
                *out = free.next();
            }
        }

        Ok(())
    }
}
