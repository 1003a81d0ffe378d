// ============================================================================
// src/input/device.rs - Input Device
// ============================================================================
//!
//! # 入力デバイス
//!
//! ドライバとリスナーをつなぐデバイス本体。
//!
//! ```text
//! driver ──report_event──▶ classify ──▶ EventBatch ──flush──▶ Dispatcher ──▶ listeners
//!                             │                                  │
//!                             └──▶ DeviceEcho (LED/ブザー)        └──▶ autorepeat
//! ```
//!
//! 分類・バッファリング・フラッシュはすべて `IrqMutex<DeviceInner>` の
//! 下で行う。バッファ、配送用スクラッチ、スロット配列は登録時に確保し、
//! イベント処理中はアロケーションしない。

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{InputError, InputResult};
use crate::sync::IrqMutex;

use super::batch::{estimate_events_per_packet, EventBatch, Flush};
use super::caps::{AbsParams, Capabilities, EventTypes};
use super::codes::*;
use super::config::{BATCH_RESERVED, MAX_MT_SLOTS, TRKID_MAX, TRKID_SGN};
use super::disposition::{classify, Disposition};
use super::dispatch::{DispatchScratch, Dispatcher};
use super::event::InputValue;
use super::handler::{InputHandle, InputListener};
use super::mt::{MtFlags, MtPos, MtState};
use super::repeat::{update_autorepeat, RepeatTimer};
use super::resolution::{calc_abs_res, HidExtents};
use super::state::DeviceState;
use super::stats::{InputStats, StatsSnapshot};

/// デバイス自身へのイベント返送（LED点灯、ブザー、フォースフィードバック）
pub trait DeviceEcho: Send + Sync {
    /// デバイスのイベントロック下で呼ばれる
    fn event(&self, event_type: u16, code: u16, value: i32);
}

/// イベントロックで保護される可変部分
struct DeviceInner {
    state: DeviceState,
    mt: Option<MtState>,
    batch: EventBatch,
    scratch: DispatchScratch,
    /// オートリピート中のキー
    repeat_key: Option<u16>,
}

/// 入力デバイス
pub struct InputDevice {
    name: String,
    caps: Capabilities,
    inner: IrqMutex<DeviceInner>,
    dispatcher: Dispatcher,
    echo: Option<Arc<dyn DeviceEcho>>,
    timer: Option<Arc<dyn RepeatTimer>>,
    registered: AtomicBool,
    stats: InputStats,
}

// ============================================================================
// Builder
// ============================================================================

/// デバイスの能力を宣言して登録する
pub struct InputDeviceBuilder {
    name: String,
    caps: Capabilities,
    mt: Option<(usize, MtFlags)>,
    hint_events_per_packet: usize,
    echo: Option<Arc<dyn DeviceEcho>>,
    timer: Option<Arc<dyn RepeatTimer>>,
}

impl InputDeviceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            caps: Capabilities::new(),
            mt: None,
            hint_events_per_packet: 0,
            echo: None,
            timer: None,
        }
    }

    /// イベントタイプとコードを宣言
    pub fn capability(mut self, event_type: u16, code: u16) -> Self {
        self.caps.set_capability(event_type, code);
        self
    }

    /// オートリピートを有効にする
    pub fn autorepeat(mut self) -> Self {
        self.caps.set_capability(EV_REP, 0);
        self
    }

    /// 絶対軸を宣言
    pub fn abs_params(mut self, axis: u16, params: AbsParams) -> Self {
        self.caps.set_abs_params(axis, params);
        self
    }

    /// HIDフィールドから絶対軸を宣言（分解能を単位から計算）
    pub fn hid_axis(mut self, axis: u16, extents: &HidExtents, fuzz: i32, flat: i32) -> Self {
        let mut params = AbsParams::new(extents.logical_minimum, extents.logical_maximum, fuzz, flat);
        params.resolution = calc_abs_res(extents, axis);
        self.caps.set_abs_params(axis, params);
        self
    }

    /// マルチタッチスロットを持たせる
    ///
    /// 他の軸の宣言を終えてから `build` 時に適用される。
    pub fn mt_slots(mut self, num_slots: usize, flags: MtFlags) -> Self {
        self.mt = Some((num_slots, flags));
        self
    }

    /// 1パケットあたりのイベント数のヒント（見積もりより大きければ採用）
    pub fn events_per_packet(mut self, hint: usize) -> Self {
        self.hint_events_per_packet = hint;
        self
    }

    pub fn echo(mut self, echo: Arc<dyn DeviceEcho>) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn repeat_timer(mut self, timer: Arc<dyn RepeatTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// スロット関連の能力を設定する
    fn init_mt_caps(caps: &mut Capabilities, num_slots: usize, flags: MtFlags) {
        caps.set_abs_params(ABS_MT_SLOT, AbsParams::new(0, num_slots as i32 - 1, 0, 0));
        caps.set_abs_params(ABS_MT_TRACKING_ID, AbsParams::new(0, TRKID_MAX, 0, 0));

        if flags.intersects(MtFlags::POINTER | MtFlags::DIRECT) {
            caps.set_capability(EV_KEY, BTN_TOUCH);
            for (src, dst) in [
                (ABS_MT_POSITION_X, ABS_X),
                (ABS_MT_POSITION_Y, ABS_Y),
                (ABS_MT_PRESSURE, ABS_PRESSURE),
            ] {
                if caps.abs.test(src as usize) {
                    let params = caps.absinfo[src as usize];
                    caps.set_abs_params(dst, params);
                }
            }
        }

        if flags.contains(MtFlags::POINTER) {
            caps.set_capability(EV_KEY, BTN_TOOL_FINGER);
            caps.set_capability(EV_KEY, BTN_TOOL_DOUBLETAP);
            for (min_slots, tool) in [
                (3, BTN_TOOL_TRIPLETAP),
                (4, BTN_TOOL_QUADTAP),
                (5, BTN_TOOL_QUINTTAP),
            ] {
                if num_slots >= min_slots {
                    caps.set_capability(EV_KEY, tool);
                }
            }
        }
    }

    /// デバイスを登録する
    ///
    /// 失敗した場合はデバイスは作られない。
    pub fn build(self) -> InputResult<Arc<InputDevice>> {
        let mut caps = self.caps;
        caps.ev |= EventTypes::SYN;
        caps.key.clear(KEY_RESERVED as usize);

        let mt = match self.mt {
            Some((num_slots, flags)) => {
                if num_slots == 0 || num_slots > MAX_MT_SLOTS {
                    log::warn!("input: '{}': invalid slot count {}", self.name, num_slots);
                    return Err(InputError::InvalidArgument);
                }
                Self::init_mt_caps(&mut caps, num_slots, flags);
                Some(MtState::new(num_slots, flags)?)
            }
            None => None,
        };

        let packet = estimate_events_per_packet(&caps, mt.as_ref()).max(self.hint_events_per_packet);
        let capacity = packet + BATCH_RESERVED;
        let batch = EventBatch::with_capacity(capacity)?;
        let scratch = DispatchScratch::with_capacity(capacity)?;
        let state = DeviceState::new(&caps);

        if caps.ev.contains(EventTypes::REP) && self.timer.is_none() {
            log::debug!("input: '{}': EV_REP without repeat timer, autorepeat disabled", self.name);
        }

        log::info!(
            "input: registered '{}' ({} events/packet, {} slots)",
            self.name,
            packet,
            mt.as_ref().map_or(0, MtState::num_slots)
        );

        Ok(Arc::new(InputDevice {
            name: self.name,
            caps,
            inner: IrqMutex::new(DeviceInner {
                state,
                mt,
                batch,
                scratch,
                repeat_key: None,
            }),
            dispatcher: Dispatcher::new(),
            echo: self.echo,
            timer: self.timer,
            registered: AtomicBool::new(true),
            stats: InputStats::new(),
        }))
    }
}

// ============================================================================
// Event path
// ============================================================================

impl InputDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// バッチの容量（見積もり + 予約分）
    pub fn batch_capacity(&self) -> usize {
        self.inner.lock().batch.capacity()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// ドライバからのイベント報告
    ///
    /// 登録解除後、または未宣言のタイプのイベントは無視される。
    pub fn report_event(&self, event_type: u16, code: u16, value: i32) {
        if !self.is_registered() || !self.caps.has_type(event_type) {
            return;
        }
        let mut inner = self.inner.lock();
        self.handle_event_locked(&mut inner, event_type, code, value);
    }

    /// フレームの終端
    #[inline]
    pub fn sync(&self) {
        self.report_event(EV_SYN, SYN_REPORT, 0);
    }

    #[inline]
    pub fn report_key(&self, code: u16, pressed: bool) {
        self.report_event(EV_KEY, code, pressed as i32);
    }

    #[inline]
    pub fn report_rel(&self, code: u16, value: i32) {
        self.report_event(EV_REL, code, value);
    }

    #[inline]
    pub fn report_abs(&self, code: u16, value: i32) {
        self.report_event(EV_ABS, code, value);
    }

    #[inline]
    pub fn report_switch(&self, code: u16, on: bool) {
        self.report_event(EV_SW, code, on as i32);
    }

    /// 1イベントの分類・バッファリング・フラッシュ
    fn handle_event_locked(&self, inner: &mut DeviceInner, event_type: u16, code: u16, value: i32) {
        self.stats.record_reported();

        let DeviceInner {
            state,
            mt,
            batch,
            scratch,
            repeat_key,
        } = inner;

        let c = classify(state, &self.caps, mt.as_mut(), event_type, code, value);
        let disposition = c.disposition;

        #[cfg(feature = "verbose_logging")]
        log::trace!(
            "input: '{}': ({:#x}, {:#x}, {}) -> {:?}",
            self.name,
            event_type,
            code,
            value,
            disposition
        );

        if disposition.is_ignored() {
            self.stats.record_ignored();
            return;
        }

        if disposition.contains(Disposition::PASS_TO_DEVICE) {
            if let Some(echo) = &self.echo {
                echo.event(event_type, code, c.value);
            }
        }

        if disposition.contains(Disposition::PASS_TO_HANDLERS) {
            if disposition.contains(Disposition::SLOT) {
                if let Some(mt) = mt.as_ref() {
                    batch.push(InputValue::slot(mt.cursor()));
                }
            }
            batch.push(InputValue::new(event_type, code, c.value));
        }

        let sync = disposition.contains(Disposition::FLUSH);
        match batch.flush_action(sync) {
            Flush::Keep => {}
            Flush::Discard => batch.clear(),
            Flush::Dispatch => {
                if !sync {
                    log::debug!(
                        "input: '{}': batch full ({} events), flushing",
                        self.name,
                        batch.len()
                    );
                }
                self.stats.record_flush(batch.len(), !sync);
                self.pass_values(batch.as_slice(), scratch, state, repeat_key);
                batch.clear();
            }
        }
    }

    /// 配送とオートリピートの判定
    fn pass_values(
        &self,
        values: &[InputValue],
        scratch: &mut DispatchScratch,
        state: &DeviceState,
        repeat_key: &mut Option<u16>,
    ) {
        self.dispatcher.dispatch(values, scratch);
        update_autorepeat(
            &self.caps,
            state,
            self.timer.as_deref(),
            repeat_key,
            values,
            scratch,
        );
    }

    /// リピートタイマー満了時に呼ぶ
    ///
    /// リピート中のキーがまだ押されていれば値2を配送し、
    /// `REP_PERIOD` で再設定する。
    pub fn repeat_tick(&self) {
        if !self.is_registered() {
            return;
        }

        let mut inner = self.inner.lock();
        let DeviceInner {
            state,
            scratch,
            repeat_key,
            ..
        } = &mut *inner;

        let Some(code) = *repeat_key else {
            return;
        };
        if !state.key.test(code as usize) || !self.caps.has_code(EV_KEY, code) {
            return;
        }

        let values = [InputValue::new(EV_KEY, code, KEY_VALUE_REPEAT), InputValue::sync()];
        self.stats.record_flush(values.len(), false);
        self.pass_values(&values, scratch, state, repeat_key);

        let period = state.rep_period();
        if period > 0 {
            if let Some(timer) = &self.timer {
                timer.arm(period as u32);
            }
        }
    }
}

// ============================================================================
// Listener management
// ============================================================================

impl InputDevice {
    /// リスナーを登録する（ハンドルは閉じた状態で返る）
    pub fn register_listener(&self, listener: Arc<dyn InputListener>) -> InputResult<Arc<InputHandle>> {
        if !self.is_registered() {
            return Err(InputError::Unregistered);
        }
        let handle = self.dispatcher.register(listener)?;
        log::info!(
            "input: '{}': listener '{}' connected (handle {})",
            self.name,
            handle.name(),
            handle.id()
        );
        Ok(handle)
    }

    /// リスナーを解除する
    ///
    /// 進行中の配送の完了を待つ。戻った後はコールバックは呼ばれない。
    pub fn unregister_listener(&self, handle: &Arc<InputHandle>) -> InputResult<()> {
        self.dispatcher.unregister(handle)?;
        log::info!(
            "input: '{}': listener '{}' disconnected",
            self.name,
            handle.name()
        );
        Ok(())
    }

    /// デバイスを独占する
    pub fn grab(&self, handle: &Arc<InputHandle>) -> InputResult<()> {
        if !self.is_registered() {
            return Err(InputError::Unregistered);
        }
        self.dispatcher.grab(handle)?;
        log::debug!("input: '{}': grabbed by '{}'", self.name, handle.name());
        Ok(())
    }

    /// グラブを解放する
    pub fn release_grab(&self, handle: &Arc<InputHandle>) {
        if self.dispatcher.release_grab(handle) {
            log::debug!("input: '{}': released by '{}'", self.name, handle.name());
        }
    }

    pub fn grabbed_by(&self) -> Option<Arc<InputHandle>> {
        self.dispatcher.grabbed_by()
    }

    /// ハンドルからのイベント注入
    ///
    /// 他のハンドルがグラブしている間は無視される。
    pub fn inject_event(&self, handle: &Arc<InputHandle>, event_type: u16, code: u16, value: i32) {
        if !self.is_registered() || !self.caps.has_type(event_type) {
            return;
        }
        let mut inner = self.inner.lock();
        if self.dispatcher.accepts_from(handle) {
            self.handle_event_locked(&mut inner, event_type, code, value);
        }
    }

    /// デバイスを破棄する
    ///
    /// 押下中のキーの解放を配送してから、以後の報告を無視し、
    /// オートリピートを止め、グラブと全ハンドルを破棄する。
    pub fn shutdown(&self) {
        if !self.registered.swap(false, Ordering::AcqRel) {
            return;
        }

        {
            let mut inner = self.inner.lock();
            let mut released = false;
            loop {
                let next = inner.state.key.iter_ones().next();
                let Some(code) = next else {
                    break;
                };
                self.handle_event_locked(&mut inner, EV_KEY, code as u16, 0);
                inner.state.key.clear(code);
                released = true;
            }
            if released {
                self.handle_event_locked(&mut inner, EV_SYN, SYN_REPORT, 0);
            }

            if let Some(timer) = &self.timer {
                timer.cancel();
            }
            inner.repeat_key = None;
            inner.batch.clear();
        }

        self.dispatcher.clear();
        log::info!("input: unregistered '{}'", self.name);
    }
}

// ============================================================================
// State queries
// ============================================================================

impl InputDevice {
    /// 絶対軸の現在値
    pub fn abs_value(&self, axis: u16) -> Option<i32> {
        if !self.caps.has_code(EV_ABS, axis) {
            return None;
        }
        Some(self.inner.lock().state.abs[axis as usize])
    }

    /// キーが押下中か
    pub fn key_pressed(&self, code: u16) -> bool {
        self.inner.lock().state.key.test(code as usize)
    }

    /// オートリピートパラメータ (delay, period)
    pub fn repeat_params(&self) -> (i32, i32) {
        let inner = self.inner.lock();
        (inner.state.rep_delay(), inner.state.rep_period())
    }

    /// スロットのMT軸の値
    pub fn mt_slot_value(&self, slot: usize, axis: u16) -> Option<i32> {
        let inner = self.inner.lock();
        inner.mt.as_ref()?.slot(slot).map(|s| s.get_value(axis))
    }

    pub fn mt_num_slots(&self) -> usize {
        self.inner.lock().mt.as_ref().map_or(0, MtState::num_slots)
    }
}

// ============================================================================
// Multitouch reporting
// ============================================================================

impl InputDevice {
    /// スロットを選択
    #[inline]
    pub fn mt_slot(&self, slot: usize) {
        self.report_event(EV_ABS, ABS_MT_SLOT, slot as i32);
    }

    /// 現在のスロットの接触状態を報告する
    ///
    /// 接触中ならトラッキングID（無ければ新規発行）とツール種別を送り
    /// `true` を返す。非接触ならトラッキングID -1 を送る。
    pub fn mt_report_slot_state(&self, tool_type: i32, active: bool) -> bool {
        if !self.is_registered() {
            return false;
        }
        let mut inner = self.inner.lock();
        let Some(mt) = inner.mt.as_mut() else {
            return false;
        };
        mt.mark_current_used();

        if !active {
            self.handle_event_locked(&mut inner, EV_ABS, ABS_MT_TRACKING_ID, -1);
            return false;
        }

        let current = mt
            .slot(mt.cursor())
            .map_or(-1, |s| s.get_value(ABS_MT_TRACKING_ID));
        let id = if current < 0 { mt.new_tracking_id() } else { current };

        self.handle_event_locked(&mut inner, EV_ABS, ABS_MT_TRACKING_ID, id);
        self.handle_event_locked(&mut inner, EV_ABS, ABS_MT_TOOL_TYPE, tool_type);
        true
    }

    /// 指の本数を BTN_TOOL_* で報告する
    pub fn mt_report_finger_count(&self, count: usize) {
        if !self.is_registered() {
            return;
        }
        let mut inner = self.inner.lock();
        self.report_finger_count_locked(&mut inner, count);
    }

    fn report_finger_count_locked(&self, inner: &mut DeviceInner, count: usize) {
        for (n, tool) in [
            (1, BTN_TOOL_FINGER),
            (2, BTN_TOOL_DOUBLETAP),
            (3, BTN_TOOL_TRIPLETAP),
            (4, BTN_TOOL_QUADTAP),
            (5, BTN_TOOL_QUINTTAP),
        ] {
            self.handle_event_locked(inner, EV_KEY, tool, (count == n) as i32);
        }
    }

    /// 最も古い接触からシングルタッチの軸とボタンを作る
    pub fn mt_report_pointer_emulation(&self, use_count: bool) {
        if !self.is_registered() {
            return;
        }
        let mut inner = self.inner.lock();
        self.report_pointer_emulation_locked(&mut inner, use_count);
    }

    fn report_pointer_emulation_locked(&self, inner: &mut DeviceInner, use_count: bool) {
        let Some(mt) = inner.mt.as_ref() else {
            return;
        };

        let mut oldest = None;
        let mut oldid = mt.next_tracking_id();
        let mut count = 0;
        for slot in mt.slots() {
            let id = slot.get_value(ABS_MT_TRACKING_ID);
            if id < 0 {
                continue;
            }
            // 16ビットで折り返すIDの新旧比較
            if (id - oldid) & TRKID_SGN != 0 {
                oldest = Some((
                    slot.get_value(ABS_MT_POSITION_X),
                    slot.get_value(ABS_MT_POSITION_Y),
                    slot.get_value(ABS_MT_PRESSURE),
                ));
                oldid = id;
            }
            count += 1;
        }

        self.handle_event_locked(inner, EV_KEY, BTN_TOUCH, (count > 0) as i32);

        if use_count {
            // 全体のホバー距離だけを報告するデバイスの近接
            if count == 0
                && !self.caps.abs.test(ABS_MT_DISTANCE as usize)
                && self.caps.abs.test(ABS_DISTANCE as usize)
                && inner.state.abs[ABS_DISTANCE as usize] != 0
            {
                count = 1;
            }
            self.report_finger_count_locked(inner, count);
        }

        let has_pressure = self.caps.abs.test(ABS_MT_PRESSURE as usize);
        match oldest {
            Some((x, y, pressure)) => {
                self.handle_event_locked(inner, EV_ABS, ABS_X, x);
                self.handle_event_locked(inner, EV_ABS, ABS_Y, y);
                if has_pressure {
                    self.handle_event_locked(inner, EV_ABS, ABS_PRESSURE, pressure);
                }
            }
            None => {
                if has_pressure {
                    self.handle_event_locked(inner, EV_ABS, ABS_PRESSURE, 0);
                }
            }
        }
    }

    /// 今フレームで報告されなかった接触を離す
    pub fn mt_drop_unused(&self) {
        if !self.is_registered() {
            return;
        }
        let mut inner = self.inner.lock();
        self.drop_unused_locked(&mut inner);
        if let Some(mt) = inner.mt.as_mut() {
            mt.advance_frame();
        }
    }

    fn drop_unused_locked(&self, inner: &mut DeviceInner) {
        let Some(mt) = inner.mt.as_ref() else {
            return;
        };
        let cursor = mt.cursor();
        let num_slots = mt.num_slots();

        for index in 0..num_slots {
            let stale = inner
                .mt
                .as_ref()
                .and_then(|mt| mt.slot(index).map(|s| s.is_active() && !mt.is_used(index)))
                .unwrap_or(false);
            if stale {
                self.handle_event_locked(inner, EV_ABS, ABS_MT_SLOT, index as i32);
                self.handle_event_locked(inner, EV_ABS, ABS_MT_TRACKING_ID, -1);
            }
        }
        self.handle_event_locked(inner, EV_ABS, ABS_MT_SLOT, cursor as i32);
    }

    /// フレームを締める
    ///
    /// `DROP_UNUSED` なら未報告の接触を離し、ポインタエミュレーションを
    /// 行ってフレームを進める。SYN_REPORT はドライバが続けて送る。
    pub fn mt_sync_frame(&self) {
        if !self.is_registered() {
            return;
        }
        let mut inner = self.inner.lock();
        let Some(flags) = inner.mt.as_ref().map(MtState::flags) else {
            return;
        };

        if flags.contains(MtFlags::DROP_UNUSED) {
            self.drop_unused_locked(&mut inner);
        }

        let use_count = flags.contains(MtFlags::POINTER) && !flags.contains(MtFlags::SEMI_MT);
        self.report_pointer_emulation_locked(&mut inner, use_count);

        if let Some(mt) = inner.mt.as_mut() {
            mt.advance_frame();
        }
    }

    /// 接触座標をスロットへ割り当てる（`MtState::assign_slots`）
    pub fn mt_assign_slots(
        &self,
        positions: &[MtPos],
        slots_out: &mut [Option<usize>],
        dmax: i32,
    ) -> InputResult<()> {
        let mut inner = self.inner.lock();
        inner
            .mt
            .as_mut()
            .ok_or(InputError::NotSupported)?
            .assign_slots(positions, slots_out, dmax)
    }

    /// キーからスロットを引く（`MtState::get_slot_by_key`）
    pub fn mt_get_slot_by_key(&self, key: u32) -> Option<usize> {
        self.inner.lock().mt.as_mut()?.get_slot_by_key(key)
    }
}

impl core::fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputDevice")
            .field("name", &self.name)
            .field("ev", &self.caps.ev)
            .field("registered", &self.is_registered())
            .finish()
    }
}
