// ============================================================================
// src/input/mt/mod.rs - Multitouch Slot Tracker
// ============================================================================
//!
//! # マルチタッチスロットトラッカー
//!
//! 同時接触点ごとの状態を固定長のスロット配列で保持する。
//! ワイヤ上のエンコーディング（現在スロット + 軸ごとの値）と
//! スロット単位の状態保存を分離する。
//!
//! ## 不変条件
//! - カーソル `slot` は常に `[0, num_slots)` の範囲
//! - `slots[i].frame == frame` ⇔ スロットiは現在のフレームで報告された
//! - スロット配列と割り当て用スクラッチは登録時に確保され、以後再確保しない

pub mod assign;

use alloc::vec::Vec;
use bitflags::bitflags;

use crate::error::{InputError, InputResult};

use super::codes::{ABS_MT_FIRST, ABS_MT_TRACKING_ID, ABS_MT_VALUES, is_mt_value};
use super::config::{MAX_MT_SLOTS, TRKID_MAX};

pub use assign::{AssignScratch, MtPos};

bitflags! {
    /// マルチタッチ動作フラグ
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MtFlags: u32 {
        /// ポインタデバイス（トラックパッド）
        const POINTER = 0x0001;
        /// 直接入力デバイス（タッチスクリーン）
        const DIRECT = 0x0002;
        /// フレーム内で報告されなかった接触を落とす
        const DROP_UNUSED = 0x0004;
        /// コア内での接触追跡（assign_slots）を使う
        const TRACK = 0x0008;
        /// 指の本数をドライバが手動で報告するセミMT
        const SEMI_MT = 0x0010;
    }
}

/// 1つの接触点の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtSlot {
    /// ABS_MT_FIRST..=ABS_MT_LAST の現在値
    abs: [i32; ABS_MT_VALUES],
    /// 最後に報告されたフレーム
    frame: u32,
    /// ドライバが付与する相関キー
    key: u32,
}

impl MtSlot {
    /// 非アクティブなスロット（トラッキングID = -1）
    pub const fn inactive() -> Self {
        let mut abs = [0; ABS_MT_VALUES];
        abs[(ABS_MT_TRACKING_ID - ABS_MT_FIRST) as usize] = -1;
        Self {
            abs,
            frame: 0,
            key: 0,
        }
    }

    /// MT軸の値を設定（スロット軸以外は無視）
    #[inline]
    pub fn set_value(&mut self, axis: u16, value: i32) {
        if is_mt_value(axis) {
            self.abs[(axis - ABS_MT_FIRST) as usize] = value;
        }
    }

    /// MT軸の値を取得（スロット軸以外は0）
    #[inline]
    pub fn get_value(&self, axis: u16) -> i32 {
        if is_mt_value(axis) {
            self.abs[(axis - ABS_MT_FIRST) as usize]
        } else {
            0
        }
    }

    /// 値の格納先への可変参照（分類器のデファズ用）
    #[inline]
    pub(crate) fn value_mut(&mut self, axis: u16) -> Option<&mut i32> {
        if is_mt_value(axis) {
            Some(&mut self.abs[(axis - ABS_MT_FIRST) as usize])
        } else {
            None
        }
    }

    /// 接触中か（トラッキングID >= 0）
    #[inline]
    pub fn is_active(&self) -> bool {
        self.get_value(ABS_MT_TRACKING_ID) >= 0
    }

    pub fn key(&self) -> u32 {
        self.key
    }
}

/// マルチタッチ状態
#[derive(Debug)]
pub struct MtState {
    slots: Vec<MtSlot>,
    /// 現在のスロットカーソル
    slot: usize,
    /// 最後にリスナーへ送出したスロット選択
    reported_slot: Option<usize>,
    /// 次に払い出すトラッキングID（下位16ビットを使用）
    trkid: u32,
    /// sync_frame ごとに進むフレームカウンタ
    frame: u32,
    flags: MtFlags,
    /// TRACK 指定時のみ確保される割り当て用スクラッチ
    scratch: Option<AssignScratch>,
}

impl MtState {
    /// スロット配列を確保する
    ///
    /// 確保に失敗した場合は `OutOfMemory` を返し、部分的な状態は残さない。
    pub fn new(num_slots: usize, flags: MtFlags) -> InputResult<Self> {
        if num_slots == 0 || num_slots > MAX_MT_SLOTS {
            return Err(InputError::InvalidArgument);
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(num_slots)?;
        slots.resize(num_slots, MtSlot::inactive());

        let scratch = if flags.contains(MtFlags::TRACK) {
            Some(AssignScratch::new(num_slots)?)
        } else {
            None
        };

        Ok(Self {
            slots,
            slot: 0,
            reported_slot: None,
            trkid: 0,
            // スロットのframe(0)と区別するため1から開始
            frame: 1,
            flags,
            scratch,
        })
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn flags(&self) -> MtFlags {
        self.flags
    }

    /// 現在のスロットカーソル
    #[inline]
    pub fn cursor(&self) -> usize {
        self.slot
    }

    pub fn slot(&self, index: usize) -> Option<&MtSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[MtSlot] {
        &self.slots
    }

    pub(crate) fn current_slot_mut(&mut self) -> &mut MtSlot {
        &mut self.slots[self.slot]
    }

    /// スロット選択をステージする
    ///
    /// 範囲外の値は捨て、カーソルは変更しない。
    pub fn stage_slot(&mut self, value: i32) -> bool {
        if value >= 0 && (value as usize) < self.slots.len() {
            self.slot = value as usize;
            true
        } else {
            false
        }
    }

    /// 最後に送出したスロット選択とカーソルが異なるか
    #[inline]
    pub(crate) fn slot_pending(&self) -> bool {
        self.reported_slot != Some(self.slot)
    }

    #[inline]
    pub(crate) fn mark_slot_reported(&mut self) {
        self.reported_slot = Some(self.slot);
    }

    /// スロットが現在のフレームで報告済みか
    #[inline]
    pub fn is_used(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.frame == self.frame)
    }

    /// 現在のスロットを今フレームで使用済みにする
    #[inline]
    pub(crate) fn mark_current_used(&mut self) {
        let frame = self.frame;
        self.slots[self.slot].frame = frame;
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// 新しいトラッキングIDを払い出す（16ビットで折り返す）
    #[inline]
    pub fn new_tracking_id(&mut self) -> i32 {
        let id = (self.trkid & TRKID_MAX as u32) as i32;
        self.trkid = self.trkid.wrapping_add(1);
        id
    }

    /// 次に払い出されるトラッキングID（ポインタエミュレーションの新旧比較用）
    #[inline]
    pub(crate) fn next_tracking_id(&self) -> i32 {
        (self.trkid & TRKID_MAX as u32) as i32
    }

    /// ドライバ指定のキーからスロットを引く
    ///
    /// 1. キーを持つアクティブなスロット
    /// 2. 今フレーム未使用の非アクティブなスロット（キーを割り当てる）
    ///
    /// どちらも無ければ `None`。
    pub fn get_slot_by_key(&mut self, key: u32) -> Option<usize> {
        if let Some(index) = self
            .slots
            .iter()
            .position(|s| s.is_active() && s.key == key)
        {
            return Some(index);
        }

        let frame = self.frame;
        let index = self
            .slots
            .iter()
            .position(|s| !s.is_active() && s.frame != frame)?;
        self.slots[index].key = key;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::codes::*;

    #[test]
    fn test_new_rejects_bad_slot_count() {
        assert_eq!(
            MtState::new(0, MtFlags::empty()).unwrap_err(),
            InputError::InvalidArgument
        );
        assert_eq!(
            MtState::new(MAX_MT_SLOTS + 1, MtFlags::empty()).unwrap_err(),
            InputError::InvalidArgument
        );
    }

    #[test]
    fn test_slots_start_inactive_and_unused() {
        let mt = MtState::new(4, MtFlags::empty()).unwrap();
        assert_eq!(mt.num_slots(), 4);
        for i in 0..4 {
            assert!(!mt.slot(i).unwrap().is_active());
            assert!(!mt.is_used(i));
        }
        assert_eq!(mt.cursor(), 0);
    }

    #[test]
    fn test_slot_values() {
        let mut slot = MtSlot::inactive();
        slot.set_value(ABS_MT_POSITION_X, 120);
        slot.set_value(ABS_MT_TRACKING_ID, 7);
        assert_eq!(slot.get_value(ABS_MT_POSITION_X), 120);
        assert!(slot.is_active());

        // スロット軸以外は保持しない
        slot.set_value(ABS_X, 5);
        assert_eq!(slot.get_value(ABS_X), 0);
        assert_eq!(slot.get_value(ABS_MT_SLOT), 0);
    }

    #[test]
    fn test_stage_slot_keeps_cursor_in_range() {
        let mut mt = MtState::new(2, MtFlags::empty()).unwrap();
        assert!(mt.stage_slot(1));
        assert_eq!(mt.cursor(), 1);
        assert!(!mt.stage_slot(2));
        assert!(!mt.stage_slot(-1));
        assert_eq!(mt.cursor(), 1);
    }

    #[test]
    fn test_slot_pending_until_reported() {
        let mut mt = MtState::new(2, MtFlags::empty()).unwrap();
        assert!(mt.slot_pending());
        mt.mark_slot_reported();
        assert!(!mt.slot_pending());
        mt.stage_slot(1);
        assert!(mt.slot_pending());
    }

    #[test]
    fn test_tracking_id_wraps_after_65536() {
        let mut mt = MtState::new(1, MtFlags::empty()).unwrap();
        let first = mt.new_tracking_id();
        let mut prev = first;
        for _ in 1..65536 {
            let id = mt.new_tracking_id();
            assert_eq!(id, (prev + 1) & TRKID_MAX);
            prev = id;
        }
        assert_eq!(prev, TRKID_MAX);
        assert_eq!(mt.new_tracking_id(), first);
    }

    #[test]
    fn test_used_tracks_frame() {
        let mut mt = MtState::new(2, MtFlags::empty()).unwrap();
        mt.stage_slot(1);
        mt.mark_current_used();
        assert!(mt.is_used(1));
        assert!(!mt.is_used(0));
        mt.advance_frame();
        assert!(!mt.is_used(1));
    }

    #[test]
    fn test_get_slot_by_key() {
        let mut mt = MtState::new(3, MtFlags::empty()).unwrap();

        // 空きスロットを昇順に割り当てる
        assert_eq!(mt.get_slot_by_key(42), Some(0));
        mt.slots[0].set_value(ABS_MT_TRACKING_ID, 0);
        assert_eq!(mt.get_slot_by_key(42), Some(0));

        // スロット1は今フレームで使用済み → スキップ
        mt.stage_slot(1);
        mt.mark_current_used();
        assert_eq!(mt.get_slot_by_key(7), Some(2));
        mt.slots[2].set_value(ABS_MT_TRACKING_ID, 1);

        // 空きが無い
        assert_eq!(mt.get_slot_by_key(9), None);

        mt.advance_frame();
        assert_eq!(mt.get_slot_by_key(9), Some(1));
        assert_eq!(mt.slot(1).unwrap().key(), 9);
    }
}
