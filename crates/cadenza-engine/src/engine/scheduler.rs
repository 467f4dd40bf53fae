//! One scheduling-loop iteration and the transport transitions it drives.

use cadenza_core::{MappedEventList, RealTime};

use super::state::EngineState;
use super::Sequencer;
use crate::transport::{LoopRange, RecordMode, TransportRequest, TransportRequestKind, TransportStatus};
use crate::DriverError;

/// What a call to [`Sequencer::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: TransportStatus,
    /// Status differs from the start of the iteration.
    pub changed: bool,
    pub consumed_request: bool,
    /// Nothing pending; the loop may sleep.
    pub at_leisure: bool,
}

impl Sequencer {
    /// Advance the engine by one loop iteration: act on the current status,
    /// update the position clock, process live events, then consume at most
    /// one transport request.
    pub fn step(&self) -> StepOutcome {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let before = st.status;

        if before == TransportStatus::Quit {
            return StepOutcome {
                status: before,
                changed: false,
                consumed_request: false,
                at_leisure: false,
            };
        }

        if self.latency.take_dirty() {
            self.latency
                .refresh(st.driver.as_ref(), &self.studio.instrument_ids());
        }

        match st.status {
            TransportStatus::StartingToPlay => {
                st.status = match self.start_playing(&mut st) {
                    Ok(()) => TransportStatus::Playing,
                    Err(e) => {
                        tracing::warn!("Failed to start playback: {}", e);
                        TransportStatus::Stopping
                    }
                };
            }
            TransportStatus::StartingToRecord => {
                st.status = match self.start_recording(&mut st) {
                    Ok(()) => TransportStatus::Recording,
                    Err(e) => {
                        tracing::warn!("Failed to start recording: {}", e);
                        TransportStatus::Stopping
                    }
                };
            }
            TransportStatus::Playing => self.keep_playing(&mut st),
            TransportStatus::Recording => {
                self.keep_playing(&mut st);
                self.process_recorded_midi(&mut st);
            }
            TransportStatus::Stopping => self.finish_stop(&mut st),
            TransportStatus::Stopped | TransportStatus::RecordingArmed | TransportStatus::Quit => {}
        }

        if !st.status.is_transitional() {
            if let Some(token) = st.deferred_token.take() {
                self.requests.complete(token);
            }
        }

        self.update_clocks(&mut st);
        st.driver.run_tasks();
        self.process_asynchronous_events(&mut st);

        let consumed_request = match self.requests.pop() {
            Some(request) => {
                self.handle_request(&mut st, request);
                if st.status.is_transitional() {
                    st.deferred_token = Some(request.token);
                } else {
                    self.requests.complete(request.token);
                }
                true
            }
            None => false,
        };

        self.publish(&st);

        let status = st.status;
        let changed = status != before;
        if changed {
            tracing::debug!("Transport {:?} -> {:?}", before, status);
        }
        StepOutcome {
            status,
            changed,
            consumed_request,
            at_leisure: !changed
                && !consumed_request
                && !status.is_transitional()
                && !self.requests.has_pending(),
        }
    }

    pub(super) fn publish(&self, st: &EngineState) {
        self.report.set_status(st.status);
        self.report.set_position(st.song_position);
    }

    fn handle_request(&self, st: &mut EngineState, request: TransportRequest) {
        tracing::debug!(
            "Transport request {} {:?} at {:?} in {:?}",
            request.token,
            request.kind,
            request.time,
            st.status
        );
        match request.kind {
            TransportRequestKind::Stop => {
                self.stop_locked(st, false);
            }
            TransportRequestKind::Start => self.start_request(st, None),
            TransportRequestKind::StartAtTime => self.start_request(st, request.time),
            TransportRequestKind::Record => self.record_request(st, request.time, request.mode),
            TransportRequestKind::JumpToTime => {
                if let Some(time) = request.time {
                    self.jump_locked(st, time);
                }
            }
            TransportRequestKind::StopAtTime => {
                self.stop_locked(st, false);
                if let Some(time) = request.time {
                    self.jump_locked(st, time);
                }
            }
            TransportRequestKind::NoChange => {}
        }
    }

    fn start_request(&self, st: &mut EngineState, time: Option<RealTime>) {
        match st.status {
            TransportStatus::Stopped | TransportStatus::Stopping | TransportStatus::RecordingArmed => {
                let armed = st.status == TransportStatus::RecordingArmed;
                if st.status == TransportStatus::Stopping {
                    self.finish_stop(st);
                }
                if let Some(time) = time {
                    self.jump_locked(st, time);
                }
                self.report.set_auto_stopped(false);
                st.status = if armed {
                    TransportStatus::StartingToRecord
                } else {
                    TransportStatus::StartingToPlay
                };
            }
            TransportStatus::Recording => {
                self.punch_out_locked(st);
            }
            TransportStatus::Playing | TransportStatus::StartingToPlay | TransportStatus::StartingToRecord => {
                if let Some(time) = time {
                    self.jump_locked(st, time);
                }
            }
            TransportStatus::Quit => {}
        }
    }

    fn record_request(&self, st: &mut EngineState, time: Option<RealTime>, mode: RecordMode) {
        match (st.status, mode) {
            (TransportStatus::Stopped | TransportStatus::Stopping, _) => {
                if st.status == TransportStatus::Stopping {
                    self.finish_stop(st);
                }
                if let Some(time) = time {
                    self.jump_locked(st, time);
                }
                self.report.set_auto_stopped(false);
                st.status = match mode {
                    RecordMode::Record => TransportStatus::StartingToRecord,
                    RecordMode::Armed => TransportStatus::RecordingArmed,
                };
            }
            (TransportStatus::RecordingArmed, RecordMode::Record) => {
                if let Some(time) = time {
                    self.jump_locked(st, time);
                }
                st.status = TransportStatus::StartingToRecord;
            }
            (TransportStatus::Playing, RecordMode::Record) => match st.driver.punch_in() {
                Ok(()) => {
                    self.sinks.open_all();
                    st.status = TransportStatus::Recording;
                    tracing::debug!("Punched in at {}", st.song_position);
                }
                Err(e) => tracing::warn!("Punch-in failed: {}", e),
            },
            (status, mode) => {
                tracing::debug!("Ignoring record request ({:?}) in {:?}", mode, status);
            }
        }
    }

    pub(super) fn punch_out_locked(&self, st: &mut EngineState) -> bool {
        if st.status != TransportStatus::Recording {
            return false;
        }
        st.driver.punch_out();
        self.sinks.close_all(st.song_position);
        st.status = TransportStatus::Playing;
        tracing::debug!("Punched out at {}", st.song_position);
        true
    }

    pub(super) fn stop_locked(&self, st: &mut EngineState, auto_stop: bool) -> bool {
        if !st.status.is_active() {
            return false;
        }
        st.status = TransportStatus::Stopping;
        self.report.set_auto_stopped(auto_stop);
        if auto_stop {
            tracing::debug!("Reached end of composition at {}", st.song_position);
        }
        true
    }

    fn finish_stop(&self, st: &mut EngineState) {
        st.driver.stop_clocks();
        st.driver.stop_playback();
        self.sinks.close_all(st.song_position);
        st.reset_offsets();
        st.last_fetch = st.song_position;
        st.status = TransportStatus::Stopped;
    }

    pub(super) fn set_loop_locked(
        &self,
        st: &mut EngineState,
        start: RealTime,
        end: RealTime,
        jump_to_loop: bool,
    ) -> bool {
        let had_wraps = !st.pending_wraps.is_empty() || st.fetch_offset != st.clock_offset;
        let Some(range) = LoopRange::new(start, end) else {
            if start < end {
                tracing::warn!(
                    "Loop {} - {} narrower than {} ms, clearing",
                    start,
                    end,
                    LoopRange::MIN_WIDTH_MS
                );
            }
            st.loop_range = None;
            tracing::debug!("Loop cleared");
            if st.status.is_rolling() && had_wraps {
                let position = st.song_position;
                self.jump_locked(st, position);
            }
            return false;
        };

        st.loop_range = Some(range);
        tracing::debug!("Loop set to {} - {}", range.start, range.end);

        let position = st.song_position;
        if jump_to_loop && !range.contains(position) {
            self.jump_locked(st, range.start);
        } else if st.status.is_rolling() && (had_wraps || (position < range.end && st.last_fetch > range.end)) {
            // Already handed off events past the new loop end
            self.jump_locked(st, position);
        }
        true
    }

    pub(super) fn jump_locked(&self, st: &mut EngineState, time: RealTime) -> bool {
        if time.is_negative() {
            tracing::warn!("Rejecting jump to negative time {}", time);
            return false;
        }
        let target = match st.loop_range {
            Some(range) => range.fold(time),
            None => time,
        };

        let old = st.song_position;
        st.song_position = target;
        st.last_fetch = target;

        if st.status.is_rolling() {
            st.driver.reset_playback(old, target);
            st.reset_offsets();
            let read_ahead = st.config.read_ahead;
            let list = self.prefetch(st, target, target + read_ahead, true);
            self.hand_off(st, list);
        }
        tracing::debug!("Jumped from {} to {}", old, target);
        true
    }

    fn start_playing(&self, st: &mut EngineState) -> Result<(), DriverError> {
        self.latency
            .refresh(st.driver.as_ref(), &self.studio.instrument_ids());

        let position = st.song_position;
        st.driver.initialise_playback(position)?;
        st.reset_offsets();

        let read_ahead = st.config.read_ahead;
        let list = self.prefetch(st, position, position + read_ahead, true);
        self.hand_off(st, list);
        st.driver.start_clocks();
        tracing::debug!("Playback started at {}", position);
        Ok(())
    }

    fn start_recording(&self, st: &mut EngineState) -> Result<(), DriverError> {
        self.start_playing(st)?;
        let position = st.song_position;
        if let Err(e) = st.driver.start_recording(position) {
            st.driver.stop_playback();
            return Err(e);
        }
        self.sinks.open_all();
        tracing::debug!("Recording started at {}", position);
        Ok(())
    }

    fn keep_playing(&self, st: &mut EngineState) {
        let now = st.driver.sequencer_time();
        let target = now + st.config.read_ahead - st.fetch_offset;

        let mut list = if target > st.last_fetch {
            let from = st.last_fetch;
            self.prefetch(st, from, target, false)
        } else {
            MappedEventList::new()
        };

        let live = self.queues.drain_out();
        if !live.is_empty() {
            list.extend(live.into_iter().map(|ev| ev.with_time(now)));
            list.sort_by_time();
        }
        self.hand_off(st, list);
    }

    /// Fetch `[start, end)` following the loop, re-time to the driver clock
    /// and record where the play position will wrap.
    fn prefetch(&self, st: &mut EngineState, start: RealTime, end: RealTime, first_fetch: bool) -> MappedEventList {
        let mut list = MappedEventList::new();
        let (next, wraps) = self.fetch_window(st.loop_range, &mut list, start, end, first_fetch);
        list.shift_all(st.fetch_offset);

        if let Some(range) = st.loop_range {
            let width = range.width();
            for lap in 0..wraps {
                let at = range.end + width * lap as i32 + st.fetch_offset;
                st.pending_wraps.push_back((at, width));
            }
            st.fetch_offset += width * wraps as i32;
        }
        st.last_fetch = next;
        list
    }

    /// Loop-aware window fetch. Returns where the next window starts (in
    /// loop coordinates) and how many times the window wrapped.
    pub(super) fn fetch_window(
        &self,
        loop_range: Option<LoopRange>,
        list: &mut MappedEventList,
        start: RealTime,
        end: RealTime,
        first_fetch: bool,
    ) -> (RealTime, u32) {
        if start >= end {
            return (start, 0);
        }

        // A window starting exactly at the loop end wraps immediately
        let Some(range) = loop_range.filter(|r| start <= r.end) else {
            self.source.get_slice(list, start, end, first_fetch);
            return (end, 0);
        };

        let width = range.width();
        let mut from = start;
        let mut to = end;
        let mut shift = RealTime::ZERO;
        let mut first = first_fetch;
        let mut wraps = 0;

        while to > range.end {
            let mut part = MappedEventList::new();
            self.source.get_slice(&mut part, from, range.end, first);
            part.shift_all(shift);
            list.append(&mut part);

            first = false;
            from = range.start;
            to = range.start + (to - range.end);
            shift += width;
            wraps += 1;
        }

        let mut part = MappedEventList::new();
        self.source.get_slice(&mut part, from, to, first);
        part.shift_all(shift);
        list.append(&mut part);
        (to, wraps)
    }

    pub(super) fn compensate(&self, list: &mut MappedEventList, include_audio: bool) {
        for ev in list.iter_mut() {
            if ev.event_type().is_audio() && !include_audio {
                continue;
            }
            *ev = ev.latency_compensated(self.latency.play_compensation(ev.instrument()));
        }
    }

    fn hand_off(&self, st: &mut EngineState, mut list: MappedEventList) {
        if list.is_empty() {
            return;
        }
        self.compensate(&mut list, st.config.compensate_audio_latency);
        st.driver.process_events_out(list);
    }

    fn update_clocks(&self, st: &mut EngineState) {
        if !st.status.is_rolling() {
            return;
        }
        let now = st.driver.sequencer_time();
        while let Some(&(at, width)) = st.pending_wraps.front() {
            if now < at {
                break;
            }
            st.clock_offset += width;
            st.pending_wraps.pop_front();
        }
        st.song_position = (now - st.clock_offset).max_zero();

        if st.loop_range.is_none() {
            if let Some(end) = st.end_of_composition {
                if st.song_position >= end {
                    self.stop_locked(st, true);
                }
            }
        }
    }

    fn process_recorded_midi(&self, st: &mut EngineState) {
        let captured = st.driver.take_captured_events();
        self.handle_captured(st, captured);
    }

    fn process_asynchronous_events(&self, st: &mut EngineState) {
        match st.status {
            TransportStatus::Stopped | TransportStatus::RecordingArmed => {
                let out = self.queues.drain_out();
                self.hand_off(st, out);
            }
            // Merged into the playback window, or held until the
            // transition resolves
            _ => {}
        }

        let captured = st.driver.take_captured_events();
        self.handle_captured(st, captured);
    }

    fn handle_captured(&self, st: &mut EngineState, captured: MappedEventList) {
        if captured.is_empty() {
            return;
        }

        if st.config.midi_thru {
            let mut thru = captured.clone();
            self.apply_filtering(&mut thru, st.config.thru_filter, st.config.filter_control_device);
            self.route_events(&mut thru, false);
            let now = st.driver.sequencer_time();
            let thru: MappedEventList = thru.into_iter().map(|ev| ev.with_time(now)).collect();
            self.hand_off(st, thru);
        }

        if st.status == TransportStatus::Recording {
            let mut recorded = captured;
            self.apply_filtering(&mut recorded, st.config.record_filter, st.config.filter_control_device);
            let clock_offset = st.clock_offset;
            recorded.shift_all(-clock_offset);
            self.route_events(&mut recorded, true);
        } else {
            self.queues.push_in(captured);
        }
    }
}
