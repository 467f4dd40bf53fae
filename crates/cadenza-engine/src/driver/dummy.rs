//! Simulated driver for headless use and tests.
//!
//! `DummyDriver` keeps every hand-off in memory. A cloneable
//! [`DummyDriverHandle`] shares that state so the caller can inspect what was
//! sent, inject captured events and (with a manual clock) move time forward
//! deterministically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use cadenza_core::{
    AtomicRealTime, AudioFileId, DeviceId, InstrumentId, MappedEvent, MappedEventList,
    MappedEventType, RealTime,
};
use parking_lot::Mutex;

use super::{DriverStatus, SoundDriver};
use crate::studio::DeviceKind;
use crate::DriverError;

const DEFAULT_SAMPLE_RATE: u32 = 48000;

enum Clock {
    Wall(Instant),
    Manual(Arc<AtomicRealTime>),
}

impl Clock {
    fn now(&self) -> RealTime {
        match self {
            Clock::Wall(origin) => RealTime::from(origin.elapsed()),
            Clock::Manual(time) => time.get(),
        }
    }
}

struct DummyState {
    clock: Clock,
    available: bool,
    initialised: bool,
    /// Sequencer time when the clocks last stopped or were rebased.
    base: RealTime,
    /// Hardware time when the clocks last started.
    started_at: Option<RealTime>,
    playing: bool,
    recording: bool,
    queued: Vec<MappedEvent>,
    sent: Vec<MappedEvent>,
    played: Vec<MappedEvent>,
    captured: MappedEventList,
    devices: HashMap<DeviceId, (DeviceKind, String, Option<String>)>,
    connections: HashMap<DeviceKind, Vec<String>>,
    play_latency: HashMap<InstrumentId, RealTime>,
    record_latency: HashMap<InstrumentId, RealTime>,
    audio_files: HashMap<AudioFileId, PathBuf>,
    fail_next_start: bool,
    fail_next_record: bool,
    resets: Vec<(RealTime, RealTime)>,
}

impl DummyState {
    fn new(clock: Clock, available: bool) -> Self {
        let mut connections = HashMap::new();
        connections.insert(
            DeviceKind::MIDI_PLAY,
            vec!["Dummy MIDI Out 1".to_string(), "Dummy MIDI Out 2".to_string()],
        );
        connections.insert(DeviceKind::MIDI_RECORD, vec!["Dummy MIDI In 1".to_string()]);
        connections.insert(DeviceKind::Audio, vec!["Dummy Audio Out".to_string()]);

        Self {
            clock,
            available,
            initialised: false,
            base: RealTime::ZERO,
            started_at: None,
            playing: false,
            recording: false,
            queued: Vec::new(),
            sent: Vec::new(),
            played: Vec::new(),
            captured: MappedEventList::new(),
            devices: HashMap::new(),
            connections,
            play_latency: HashMap::new(),
            record_latency: HashMap::new(),
            audio_files: HashMap::new(),
            fail_next_start: false,
            fail_next_record: false,
            resets: Vec::new(),
        }
    }

    fn sequencer_time(&self) -> RealTime {
        match self.started_at {
            Some(started) => self.base + (self.clock.now() - started),
            None => self.base,
        }
    }

    fn flush_due(&mut self) {
        let now = self.sequencer_time();
        let split = self.queued.partition_point(|ev| ev.time() <= now);
        self.played.extend(self.queued.drain(..split));
    }
}

/// In-memory [`SoundDriver`].
pub struct DummyDriver {
    state: Arc<Mutex<DummyState>>,
}

impl DummyDriver {
    /// Driver clocked by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::Wall(Instant::now()), true)
    }

    /// Driver whose hardware clock only moves through
    /// [`DummyDriverHandle::advance`].
    pub fn manual() -> Self {
        Self::with_clock(Clock::Manual(Arc::new(AtomicRealTime::default())), true)
    }

    /// Driver that fails to initialise.
    pub fn unavailable() -> Self {
        Self::with_clock(Clock::Manual(Arc::new(AtomicRealTime::default())), false)
    }

    fn with_clock(clock: Clock, available: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(DummyState::new(clock, available))),
        }
    }

    pub fn handle(&self) -> DummyDriverHandle {
        DummyDriverHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for DummyDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundDriver for DummyDriver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn initialise(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.available {
            return Err(DriverError::NotInitialised);
        }
        state.initialised = true;
        Ok(())
    }

    fn status(&self) -> DriverStatus {
        if self.state.lock().initialised {
            DriverStatus::AUDIO_OK | DriverStatus::MIDI_OK | DriverStatus::VERSION_OK
        } else {
            DriverStatus::NO_DRIVER
        }
    }

    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    fn sequencer_time(&self) -> RealTime {
        self.state.lock().sequencer_time()
    }

    fn initialise_playback(&mut self, position: RealTime) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_start) {
            return Err(DriverError::StartFailed("simulated start failure".into()));
        }
        if !state.initialised {
            return Err(DriverError::NotInitialised);
        }
        state.queued.clear();
        state.base = position;
        state.started_at = None;
        state.playing = true;
        Ok(())
    }

    fn start_clocks(&mut self) {
        let mut state = self.state.lock();
        if state.started_at.is_none() {
            state.started_at = Some(state.clock.now());
        }
    }

    fn stop_clocks(&mut self) {
        let mut state = self.state.lock();
        state.base = state.sequencer_time();
        state.started_at = None;
    }

    fn start_recording(&mut self, _position: RealTime) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_record) {
            return Err(DriverError::RecordFailed("simulated record failure".into()));
        }
        if !state.playing {
            return Err(DriverError::RecordFailed("playback not initialised".into()));
        }
        state.recording = true;
        Ok(())
    }

    fn punch_in(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.playing {
            return Err(DriverError::RecordFailed("not playing".into()));
        }
        state.recording = true;
        Ok(())
    }

    fn punch_out(&mut self) {
        self.state.lock().recording = false;
    }

    fn stop_playback(&mut self) {
        let mut state = self.state.lock();
        state.base = state.sequencer_time();
        state.started_at = None;
        state.queued.clear();
        state.playing = false;
        state.recording = false;
    }

    fn reset_playback(&mut self, old: RealTime, new: RealTime) {
        let mut state = self.state.lock();
        state.queued.clear();
        state.base = new;
        if state.started_at.is_some() {
            state.started_at = Some(state.clock.now());
        }
        state.resets.push((old, new));
    }

    fn process_events_out(&mut self, events: MappedEventList) {
        let mut state = self.state.lock();
        for ev in events {
            state.sent.push(ev);
            if ev.event_type() == MappedEventType::AudioCancel {
                let file = ev.audio_file();
                state
                    .queued
                    .retain(|q| !(q.event_type() == MappedEventType::Audio && q.audio_file() == file));
                continue;
            }
            if state.playing {
                let at = state.queued.partition_point(|q| q.time() <= ev.time());
                state.queued.insert(at, ev);
            } else {
                state.played.push(ev);
            }
        }
    }

    fn take_captured_events(&mut self) -> MappedEventList {
        std::mem::take(&mut self.state.lock().captured)
    }

    fn run_tasks(&mut self) {
        self.state.lock().flush_due();
    }

    fn add_device(&mut self, id: DeviceId, kind: DeviceKind) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state
            .devices
            .insert(id, (kind, format!("Dummy {} {}", kind.name(), id), None));
        Ok(())
    }

    fn remove_device(&mut self, id: DeviceId) -> Result<(), DriverError> {
        self.state
            .lock()
            .devices
            .remove(&id)
            .map(|_| ())
            .ok_or(DriverError::UnknownDevice(id))
    }

    fn rename_device(&mut self, id: DeviceId, name: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(&id)
            .ok_or(DriverError::UnknownDevice(id))?;
        device.1 = name.to_string();
        Ok(())
    }

    fn connections(&self, kind: DeviceKind) -> Vec<String> {
        self.state
            .lock()
            .connections
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn set_connection(&mut self, id: DeviceId, connection: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let kind = state
            .devices
            .get(&id)
            .map(|d| d.0)
            .ok_or(DriverError::UnknownDevice(id))?;

        if connection.is_empty() {
            if let Some(device) = state.devices.get_mut(&id) {
                device.2 = None;
            }
            return Ok(());
        }

        let known = state
            .connections
            .get(&kind)
            .is_some_and(|names| names.iter().any(|n| n == connection));
        if !known {
            return Err(DriverError::UnknownConnection {
                device: id,
                connection: connection.to_string(),
            });
        }
        if let Some(device) = state.devices.get_mut(&id) {
            device.2 = Some(connection.to_string());
        }
        Ok(())
    }

    fn instrument_play_latency(&self, instrument: InstrumentId) -> RealTime {
        self.state
            .lock()
            .play_latency
            .get(&instrument)
            .copied()
            .unwrap_or(RealTime::ZERO)
    }

    fn instrument_record_latency(&self, instrument: InstrumentId) -> RealTime {
        self.state
            .lock()
            .record_latency
            .get(&instrument)
            .copied()
            .unwrap_or(RealTime::ZERO)
    }

    fn add_audio_file(&mut self, id: AudioFileId, path: &Path) -> Result<(), DriverError> {
        if path.as_os_str().is_empty() {
            return Err(DriverError::AudioFile(format!("empty path for file {}", id)));
        }
        self.state.lock().audio_files.insert(id, path.to_path_buf());
        Ok(())
    }

    fn remove_audio_file(&mut self, id: AudioFileId) -> bool {
        self.state.lock().audio_files.remove(&id).is_some()
    }

    fn clear_audio_files(&mut self) {
        self.state.lock().audio_files.clear();
    }
}

/// Shared view into a [`DummyDriver`].
#[derive(Clone)]
pub struct DummyDriverHandle {
    state: Arc<Mutex<DummyState>>,
}

impl DummyDriverHandle {
    /// Every event handed to the driver, in hand-off order.
    pub fn sent(&self) -> Vec<MappedEvent> {
        self.state.lock().sent.clone()
    }

    pub fn take_sent(&self) -> Vec<MappedEvent> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Events that have become due (or were sent while idle).
    pub fn played(&self) -> Vec<MappedEvent> {
        self.state.lock().played.clone()
    }

    pub fn take_played(&self) -> Vec<MappedEvent> {
        std::mem::take(&mut self.state.lock().played)
    }

    /// Events handed off but not yet due.
    pub fn queued(&self) -> Vec<MappedEvent> {
        self.state.lock().queued.clone()
    }

    /// Queue a captured event as if it arrived from an input device.
    pub fn inject(&self, event: MappedEvent) {
        self.state.lock().captured.push(event);
    }

    /// Capture a live event stamped with the current sequencer time.
    pub fn capture(&self, event_type: MappedEventType, data1: u8, data2: u8, device: DeviceId, channel: u8) {
        let mut state = self.state.lock();
        let now = state.sequencer_time();
        state
            .captured
            .push(MappedEvent::captured(event_type, data1, data2, now, device, channel));
    }

    /// Move the manual hardware clock forward. No-op for wall-clock drivers.
    pub fn advance(&self, by: RealTime) {
        let state = self.state.lock();
        if let Clock::Manual(time) = &state.clock {
            time.advance(by);
        }
    }

    pub fn sequencer_time(&self) -> RealTime {
        self.state.lock().sequencer_time()
    }

    pub fn fail_next_start(&self) {
        self.state.lock().fail_next_start = true;
    }

    pub fn fail_next_record(&self) {
        self.state.lock().fail_next_record = true;
    }

    pub fn set_play_latency(&self, instrument: InstrumentId, latency: RealTime) {
        self.state.lock().play_latency.insert(instrument, latency);
    }

    pub fn set_record_latency(&self, instrument: InstrumentId, latency: RealTime) {
        self.state.lock().record_latency.insert(instrument, latency);
    }

    pub fn set_connections(&self, kind: DeviceKind, names: Vec<String>) {
        self.state.lock().connections.insert(kind, names);
    }

    pub fn device_connection(&self, id: DeviceId) -> Option<String> {
        self.state.lock().devices.get(&id).and_then(|d| d.2.clone())
    }

    pub fn device_name(&self, id: DeviceId) -> Option<String> {
        self.state.lock().devices.get(&id).map(|d| d.1.clone())
    }

    pub fn audio_files(&self) -> Vec<(AudioFileId, PathBuf)> {
        let mut files: Vec<_> = self
            .state
            .lock()
            .audio_files
            .iter()
            .map(|(id, path)| (*id, path.clone()))
            .collect();
        files.sort_by_key(|(id, _)| *id);
        files
    }

    /// `(old, new)` pairs passed to `reset_playback`.
    pub fn resets(&self) -> Vec<(RealTime, RealTime)> {
        self.state.lock().resets.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    pub fn is_clock_running(&self) -> bool {
        self.state.lock().started_at.is_some()
    }
}
