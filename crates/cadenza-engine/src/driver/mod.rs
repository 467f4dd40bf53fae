//! Sound Driver boundary.
//!
//! The engine talks to hardware exclusively through [`SoundDriver`]. Only the
//! scheduling loop calls the timed play/record methods; topology calls arrive
//! from the interactive side under the engine lock.

mod dummy;
pub use dummy::{DummyDriver, DummyDriverHandle};

use std::fmt;
use std::ops::BitOr;
use std::path::Path;

use cadenza_core::{AudioFileId, DeviceId, InstrumentId, MappedEventList, RealTime};

use crate::studio::DeviceKind;
use crate::DriverError;

/// Driver capability bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DriverStatus(u8);

impl DriverStatus {
    pub const NO_DRIVER: DriverStatus = DriverStatus(0);
    pub const AUDIO_OK: DriverStatus = DriverStatus(1);
    pub const MIDI_OK: DriverStatus = DriverStatus(2);
    pub const VERSION_OK: DriverStatus = DriverStatus(4);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: DriverStatus) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DriverStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        DriverStatus(self.0 | rhs.0)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no driver");
        }
        let mut parts = Vec::with_capacity(3);
        if self.contains(Self::AUDIO_OK) {
            parts.push("audio");
        }
        if self.contains(Self::MIDI_OK) {
            parts.push("midi");
        }
        if self.contains(Self::VERSION_OK) {
            parts.push("version");
        }
        f.write_str(&parts.join("+"))
    }
}

/// Hardware/timing backend driven by the sequencer.
///
/// `sequencer_time` is a linear clock: it only moves forward while the clocks
/// run and is rebased by `initialise_playback` and `reset_playback`. Loop
/// wrapping is handled by the engine, never by the driver.
pub trait SoundDriver: Send {
    fn name(&self) -> &str;

    fn initialise(&mut self) -> Result<(), DriverError>;

    fn status(&self) -> DriverStatus;

    fn sample_rate(&self) -> u32;

    fn sequencer_time(&self) -> RealTime;

    /// Prepare to play from `position`. The clock is set to `position` and
    /// stays stopped until [`SoundDriver::start_clocks`].
    fn initialise_playback(&mut self, position: RealTime) -> Result<(), DriverError>;

    fn start_clocks(&mut self);

    fn stop_clocks(&mut self);

    fn start_recording(&mut self, position: RealTime) -> Result<(), DriverError>;

    fn punch_in(&mut self) -> Result<(), DriverError>;

    fn punch_out(&mut self);

    /// Stop clocks, silence sounding notes, drop anything still queued.
    fn stop_playback(&mut self);

    /// Flush queued events and rebase the clock from `old` to `new`.
    fn reset_playback(&mut self, old: RealTime, new: RealTime);

    /// Take ownership of a batch of timed events. Events are due at their
    /// timestamp on the `sequencer_time` clock.
    fn process_events_out(&mut self, events: MappedEventList);

    /// Drain events captured from input devices since the last call.
    fn take_captured_events(&mut self) -> MappedEventList;

    /// Housekeeping hook, called once per loop iteration.
    fn run_tasks(&mut self) {}

    fn add_device(&mut self, id: DeviceId, kind: DeviceKind) -> Result<(), DriverError>;

    fn remove_device(&mut self, id: DeviceId) -> Result<(), DriverError>;

    fn rename_device(&mut self, id: DeviceId, name: &str) -> Result<(), DriverError>;

    /// Connection names available for devices of `kind`.
    fn connections(&self, kind: DeviceKind) -> Vec<String>;

    /// An empty `connection` disconnects the device.
    fn set_connection(&mut self, id: DeviceId, connection: &str) -> Result<(), DriverError>;

    fn instrument_play_latency(&self, instrument: InstrumentId) -> RealTime;

    fn instrument_record_latency(&self, instrument: InstrumentId) -> RealTime;

    fn add_audio_file(&mut self, id: AudioFileId, path: &Path) -> Result<(), DriverError>;

    fn remove_audio_file(&mut self, id: AudioFileId) -> bool;

    fn clear_audio_files(&mut self);
}
