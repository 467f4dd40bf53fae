//! The sequencer façade.
//!
//! [`Sequencer`] owns the driver, the transport state and every queue. The
//! interactive side calls it from any thread; the scheduling loop calls
//! [`Sequencer::step`]. Bulk state sits behind one reentrant lock, held for a
//! whole loop iteration and for each public call. Transport requests, the
//! async queues and the position report have their own short-lived locks or
//! atomics, so `transport_change`, `transport_jump` and
//! `is_transport_sync_complete` never wait on the engine lock.

mod scheduler;
mod state;

pub use scheduler::StepOutcome;

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use cadenza_core::{
    AudioFileId, DeviceId, EventFilter, InstrumentId, MappedEvent, MappedEventList, RealTime,
};
use parking_lot::ReentrantMutex;

use crate::queues::AsyncQueues;
use crate::record::{RecordSink, RecordSinks, SinkId};
use crate::routing::{Route, RoutingSnapshot, RoutingTable};
use crate::source::EventSource;
use crate::studio::{Device, DeviceKind, Instrument, InstrumentKind, MappedObject, MappedValue, Studio};
use crate::transport::{
    LoopRange, RecordMode, TransportQueue, TransportRequestKind, TransportStatus, TransportToken,
};
use crate::{DriverError, DriverStatus, LatencyCache, Result, SequencerConfig, SoundDriver, StudioError};

use state::{EngineState, PositionReport};

pub struct Sequencer {
    state: ReentrantMutex<RefCell<EngineState>>,
    requests: TransportQueue,
    queues: AsyncQueues,
    source: EventSource,
    studio: Studio,
    latency: LatencyCache,
    sinks: RecordSinks,
    routing: Arc<ArcSwap<RoutingSnapshot>>,
    report: PositionReport,
}

impl Sequencer {
    /// Build an engine around `driver`. A driver that fails to initialise
    /// is kept; [`Sequencer::sound_driver_status`] then reports no
    /// capabilities.
    pub fn new(mut driver: Box<dyn SoundDriver>, config: SequencerConfig) -> Result<Self> {
        config.validate()?;

        match driver.initialise() {
            Ok(()) => tracing::info!(
                "Initialised sound driver '{}' ({}, {} Hz)",
                driver.name(),
                driver.status(),
                driver.sample_rate()
            ),
            Err(e) => tracing::warn!("Sound driver '{}' failed to initialise: {}", driver.name(), e),
        }

        let state = EngineState::new(driver, config);
        let routing = state.routing.snapshot_arc();

        Ok(Self {
            state: ReentrantMutex::new(RefCell::new(state)),
            requests: TransportQueue::new(),
            queues: AsyncQueues::new(),
            source: EventSource::new(),
            studio: Studio::new(),
            latency: LatencyCache::new(),
            sinks: RecordSinks::new(),
            routing,
            report: PositionReport::new(),
        })
    }

    /// Run `f` with the engine lock held, so several calls apply without a
    /// loop iteration in between.
    pub fn atomically<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.state.lock();
        f(self)
    }

    // ---- transport ----------------------------------------------------

    /// Request playback from `time`.
    pub fn play(&self, time: RealTime) -> TransportToken {
        self.transport_jump(TransportRequestKind::StartAtTime, time)
    }

    /// Request recording from `time`.
    pub fn record(&self, time: RealTime, mode: RecordMode) -> TransportToken {
        self.requests
            .push(TransportRequestKind::Record, Some(time), mode)
    }

    /// Leave recording but keep playing. `false` unless recording.
    pub fn punch_out(&self) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let punched = self.punch_out_locked(&mut st);
        self.publish(&st);
        punched
    }

    /// Move any active state to `Stopping`. `auto_stop` marks a stop caused
    /// by reaching the end of the composition.
    pub fn stop(&self, auto_stop: bool) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let stopped = self.stop_locked(&mut st, auto_stop);
        self.publish(&st);
        stopped
    }

    /// Set the loop range. A range narrower than
    /// [`LoopRange::MIN_WIDTH_MS`] (including `start >= end`) deactivates
    /// looping. With
    /// `jump_to_loop`, a position outside the loop jumps to its start.
    /// Returns whether a loop is active afterwards.
    pub fn set_loop(&self, start: RealTime, end: RealTime, jump_to_loop: bool) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let active = self.set_loop_locked(&mut st, start, end, jump_to_loop);
        self.publish(&st);
        active
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.state.lock().borrow().loop_range
    }

    /// Reposition. Negative times are rejected; with an active loop, times
    /// at or past its end are folded back into it.
    pub fn jump_to(&self, time: RealTime) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let jumped = self.jump_locked(&mut st, time);
        self.publish(&st);
        jumped
    }

    /// Stop everything and let the scheduling loop exit.
    pub fn quit(&self) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        if st.status == TransportStatus::Quit {
            return;
        }
        if st.status.is_rolling() || st.status == TransportStatus::Stopping {
            st.driver.stop_playback();
            self.sinks.close_all(st.song_position);
        }
        st.status = TransportStatus::Quit;
        let dropped = self.requests.drain();
        if let Some(token) = st.deferred_token.take() {
            self.requests.complete(token);
        }
        self.publish(&st);
        tracing::debug!("Sequencer quit ({} pending requests dropped)", dropped);
    }

    /// Enqueue a transport request without a time. Safe from a driver
    /// callback.
    pub fn transport_change(&self, kind: TransportRequestKind) -> TransportToken {
        self.requests.push(kind, None, RecordMode::default())
    }

    /// Enqueue a transport request carrying a time. Safe from a driver
    /// callback.
    pub fn transport_jump(&self, kind: TransportRequestKind, time: RealTime) -> TransportToken {
        self.requests.push(kind, Some(time), RecordMode::default())
    }

    /// Non-blocking, idempotent. Safe from a driver callback.
    pub fn is_transport_sync_complete(&self, token: TransportToken) -> bool {
        self.requests.is_complete(token)
    }

    #[inline]
    pub fn status(&self) -> TransportStatus {
        self.report.status()
    }

    #[inline]
    pub fn position(&self) -> RealTime {
        self.report.position()
    }

    /// Whether the last stop was caused by the end of the composition.
    #[inline]
    pub fn auto_stopped(&self) -> bool {
        self.report.auto_stopped()
    }

    /// Optional song time past which playback stops by itself (unless
    /// looping).
    pub fn set_end_of_composition(&self, end: Option<RealTime>) {
        self.state.lock().borrow_mut().end_of_composition = end;
    }

    // ---- live events --------------------------------------------------

    /// Send an event to the driver as soon as the transport allows.
    pub fn process_mapped_event(&self, event: MappedEvent) {
        self.queues.push_out(event);
    }

    /// Drain live events captured while not recording.
    pub fn pull_asynchronous_midi_queue(&self) -> MappedEventList {
        self.queues.drain_in()
    }

    /// Drop events whose type is in `filter`, and (when
    /// `filter_control_device`) events from the control-surface device.
    /// Survivor order is preserved.
    pub fn apply_filtering(&self, list: &mut MappedEventList, filter: EventFilter, filter_control_device: bool) {
        let studio = &self.studio;
        list.retain(|ev| {
            filter.accepts(ev) && !(filter_control_device && studio.is_control_device(ev.recorded_device()))
        });
    }

    /// Resolve each captured event's destination instrument. Events without
    /// a route are removed from `list`. When `recording`, every captured
    /// event is also delivered to matching open record sinks, shifted
    /// earlier by its instrument's record latency.
    pub fn route_events(&self, list: &mut MappedEventList, recording: bool) {
        let routing = self.routing.load();
        list.retain_mut(|ev| {
            if ev.recorded_device() == cadenza_core::NO_DEVICE {
                return true;
            }
            let destination = routing.resolve(ev.recorded_device(), ev.recorded_channel());
            if let Some(instrument) = destination {
                *ev = ev.with_instrument(instrument);
            }
            if recording {
                let shift = self.latency.record_latency(ev.instrument());
                self.sinks.deliver(ev.shifted(-shift));
            }
            if destination.is_none() {
                tracing::debug!(
                    "No route for device {} channel {}",
                    ev.recorded_device(),
                    ev.recorded_channel()
                );
            }
            destination.is_some()
        });
    }

    /// Delay each event by its instrument's play compensation. Events that
    /// were already compensated are left alone.
    pub fn apply_latency_compensation(&self, list: &mut MappedEventList) {
        let include_audio = self.state.lock().borrow().config.compensate_audio_latency;
        self.compensate(list, include_audio);
    }

    /// Window fetch that follows the active loop: a window crossing the
    /// loop end continues from the loop start, re-timed by the loop width.
    pub fn fetch_events(&self, list: &mut MappedEventList, start: RealTime, end: RealTime, first_fetch: bool) {
        let loop_range = self.state.lock().borrow().loop_range;
        self.fetch_window(loop_range, list, start, end, first_fetch);
    }

    pub fn set_midi_thru(&self, enabled: bool) {
        self.state.lock().borrow_mut().config.midi_thru = enabled;
    }

    pub fn set_record_filter(&self, filter: EventFilter) {
        self.state.lock().borrow_mut().config.record_filter = filter;
    }

    pub fn set_thru_filter(&self, filter: EventFilter) {
        self.state.lock().borrow_mut().config.thru_filter = filter;
    }

    pub fn set_filter_control_device(&self, enabled: bool) {
        self.state.lock().borrow_mut().config.filter_control_device = enabled;
    }

    pub fn config(&self) -> SequencerConfig {
        self.state.lock().borrow().config.clone()
    }

    pub fn sleep_interval(&self) -> Duration {
        self.state.lock().borrow().config.sleep_interval
    }

    // ---- buffers, routes, sinks ---------------------------------------

    pub fn event_source(&self) -> &EventSource {
        &self.source
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    pub fn add_route(&self, route: Route) {
        self.routing_mut(|table| {
            table.add(route);
        });
    }

    pub fn set_fallback_instrument(&self, instrument: Option<InstrumentId>) {
        self.routing_mut(|table| {
            match instrument {
                Some(id) => table.fallback(id),
                None => table.clear_fallback(),
            };
        });
    }

    /// Edit the routing table; changes are committed when `f` returns.
    pub fn routing_mut<R>(&self, f: impl FnOnce(&mut RoutingTable) -> R) -> R {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let result = f(&mut st.routing);
        st.routing.commit();
        result
    }

    pub fn add_record_sink(&self, device: Option<DeviceId>, channel: Option<u8>) -> Arc<RecordSink> {
        let sink = self.sinks.add(device, channel);
        if self.report.status().is_recording() {
            sink.open();
        }
        sink
    }

    pub fn remove_record_sink(&self, id: SinkId) -> bool {
        self.sinks.remove(id)
    }

    pub fn take_recorded(&self, id: SinkId) -> Option<MappedEventList> {
        self.sinks.get(id).map(|sink| sink.take_recorded())
    }

    // ---- driver and studio --------------------------------------------

    pub fn sound_driver_status(&self) -> DriverStatus {
        self.state.lock().borrow().driver.status()
    }

    pub fn add_device(&self, id: DeviceId, kind: DeviceKind, name: &str) -> std::result::Result<(), StudioError> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        if self.studio.has_device(id) {
            return Err(StudioError::DuplicateDevice(id));
        }
        st.driver.add_device(id, kind)?;
        if let Err(e) = st.driver.rename_device(id, name) {
            let _ = st.driver.remove_device(id);
            return Err(e.into());
        }
        self.studio.add_device(Device {
            id,
            name: name.to_string(),
            kind,
            connection: None,
        })?;
        self.latency.mark_dirty();
        tracing::debug!("Added {} device {}: {}", kind.name(), id, name);
        Ok(())
    }

    pub fn remove_device(&self, id: DeviceId) -> std::result::Result<(), StudioError> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        if !self.studio.has_device(id) {
            return Err(StudioError::UnknownDevice(id));
        }
        st.driver.remove_device(id)?;
        self.studio.remove_device(id)?;
        st.routing.remove_device(id);
        st.routing.commit();
        self.latency.mark_dirty();
        tracing::debug!("Removed device {}", id);
        Ok(())
    }

    pub fn rename_device(&self, id: DeviceId, name: &str) -> std::result::Result<(), StudioError> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        if !self.studio.has_device(id) {
            return Err(StudioError::UnknownDevice(id));
        }
        st.driver.rename_device(id, name)?;
        self.studio.rename_device(id, name)
    }

    /// Connect a device to one of the driver's connections. An empty name
    /// disconnects.
    pub fn set_connection(&self, id: DeviceId, connection: &str) -> std::result::Result<(), StudioError> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let device = self.studio.device(id).ok_or(StudioError::UnknownDevice(id))?;
        if !device.kind.accepts_connection() {
            return Err(StudioError::ConnectionNotSupported(id));
        }
        st.driver.set_connection(id, connection)?;
        self.studio.set_connection(id, connection)?;
        self.latency.mark_dirty();
        tracing::debug!("Device {} connection set to '{}'", id, connection);
        Ok(())
    }

    pub fn connections(&self, kind: DeviceKind) -> Vec<String> {
        self.state.lock().borrow().driver.connections(kind)
    }

    pub fn set_control_device(&self, device: Option<DeviceId>) -> std::result::Result<(), StudioError> {
        if let Some(id) = device {
            if !self.studio.has_device(id) {
                return Err(StudioError::UnknownDevice(id));
            }
        }
        self.studio.set_control_device(device);
        Ok(())
    }

    /// Create or replace an instrument on a device.
    pub fn set_mapped_instrument(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
        device: DeviceId,
        channel: u8,
    ) -> std::result::Result<(), StudioError> {
        let _guard = self.state.lock();
        self.studio.set_instrument(Instrument {
            id,
            kind,
            device,
            channel,
        })?;
        self.latency.mark_dirty();
        tracing::debug!("Mapped {} instrument {} on device {} channel {}", kind.name(), id, device, channel);
        Ok(())
    }

    /// `name` and `connection` on a device are forwarded to the driver;
    /// anything else is stored on the studio object.
    pub fn set_mapped_property(
        &self,
        object: MappedObject,
        name: &str,
        value: MappedValue,
    ) -> std::result::Result<(), StudioError> {
        if let (MappedObject::Device(id), Some(text)) = (object, value.as_text()) {
            match name {
                "name" => return self.rename_device(id, text),
                "connection" => return self.set_connection(id, text),
                _ => {}
            }
        }
        self.studio.set_property(object, name, value)
    }

    pub fn get_mapped_property(&self, object: MappedObject, name: &str) -> Option<MappedValue> {
        if let MappedObject::Device(id) = object {
            match name {
                "name" => return self.studio.device(id).map(|d| MappedValue::Text(d.name)),
                "connection" => {
                    return self
                        .studio
                        .device(id)
                        .map(|d| MappedValue::Text(d.connection.unwrap_or_default()))
                }
                _ => {}
            }
        }
        self.studio.property(object, name)
    }

    pub fn add_audio_file(&self, id: AudioFileId, path: &Path) -> std::result::Result<(), DriverError> {
        self.state.lock().borrow_mut().driver.add_audio_file(id, path)?;
        tracing::debug!("Registered audio file {}: {}", id, path.display());
        Ok(())
    }

    pub fn remove_audio_file(&self, id: AudioFileId) -> bool {
        self.state.lock().borrow_mut().driver.remove_audio_file(id)
    }

    pub fn clear_audio_files(&self) {
        self.state.lock().borrow_mut().driver.clear_audio_files();
    }

    /// Current time on the driver clock.
    pub fn sequencer_time(&self) -> RealTime {
        self.state.lock().borrow().driver.sequencer_time()
    }
}
