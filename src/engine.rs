//! Cadenza handle that owns the sequencer and its scheduling loop.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadenza_core::{AudioFileId, DeviceId, MappedEvent, MappedEventList, RealTime};
use cadenza_engine::{
    DeviceKind, DriverStatus, EventSource, LoopRange, RecordMode, Route, Sequencer,
    SequencerThread, StepOutcome, TransportRequestKind, TransportStatus, TransportToken,
};
use parking_lot::Mutex;

use crate::Result;

/// Composition root: one [`Sequencer`] shared by `Arc` with the scheduling
/// loop and every call site.
///
/// Dropping the handle quits the sequencer and joins the loop thread.
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let cadenza = Cadenza::builder().build()?;
/// cadenza.event_source().add_buffer(track_events);
///
/// let token = cadenza.play(RealTime::ZERO);
/// cadenza.wait_for(token, Duration::from_millis(500));
/// assert_eq!(cadenza.status(), TransportStatus::Playing);
/// ```
pub struct Cadenza {
    sequencer: Arc<Sequencer>,

    /// Scheduling loop (absent with manual stepping)
    thread: Mutex<Option<SequencerThread>>,
}

impl Cadenza {
    pub fn builder() -> crate::CadenzaBuilder {
        crate::CadenzaBuilder::default()
    }

    pub(crate) fn from_parts(sequencer: Arc<Sequencer>, thread: Option<SequencerThread>) -> Self {
        Self {
            sequencer,
            thread: Mutex::new(thread),
        }
    }

    /// Full engine API.
    pub fn sequencer(&self) -> &Arc<Sequencer> {
        &self.sequencer
    }

    /// Run one loop iteration by hand. Intended for manual stepping; harmless
    /// alongside the loop thread.
    pub fn step(&self) -> StepOutcome {
        self.sequencer.step()
    }

    pub fn is_loop_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|t| t.is_running())
    }

    // ---- transport ----------------------------------------------------

    pub fn play(&self, time: RealTime) -> TransportToken {
        self.sequencer.play(time)
    }

    /// Start from the current position.
    pub fn start(&self) -> TransportToken {
        self.sequencer.transport_change(TransportRequestKind::Start)
    }

    pub fn record(&self, time: RealTime, mode: RecordMode) -> TransportToken {
        self.sequencer.record(time, mode)
    }

    pub fn punch_out(&self) -> bool {
        self.sequencer.punch_out()
    }

    pub fn stop(&self) -> TransportToken {
        self.sequencer.transport_change(TransportRequestKind::Stop)
    }

    pub fn jump_to(&self, time: RealTime) -> bool {
        self.sequencer.jump_to(time)
    }

    pub fn set_loop(&self, start: RealTime, end: RealTime, jump_to_loop: bool) -> bool {
        self.sequencer.set_loop(start, end, jump_to_loop)
    }

    pub fn clear_loop(&self) {
        self.sequencer.set_loop(RealTime::ZERO, RealTime::ZERO, false);
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.sequencer.loop_range()
    }

    pub fn status(&self) -> TransportStatus {
        self.sequencer.status()
    }

    pub fn position(&self) -> RealTime {
        self.sequencer.position()
    }

    pub fn is_transport_sync_complete(&self, token: TransportToken) -> bool {
        self.sequencer.is_transport_sync_complete(token)
    }

    /// Poll until `token` completes or `timeout` passes. With manual
    /// stepping the loop is stepped here instead of sleeping.
    pub fn wait_for(&self, token: TransportToken, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let manual = self.thread.lock().is_none();
        while !self.sequencer.is_transport_sync_complete(token) {
            if Instant::now() >= deadline {
                tracing::warn!("Timed out waiting for transport token {}", token);
                return false;
            }
            if manual {
                self.sequencer.step();
            } else {
                std::thread::sleep(self.sequencer.sleep_interval());
            }
        }
        true
    }

    // ---- events -------------------------------------------------------

    pub fn event_source(&self) -> &EventSource {
        self.sequencer.event_source()
    }

    pub fn process_mapped_event(&self, event: MappedEvent) {
        self.sequencer.process_mapped_event(event);
    }

    pub fn pull_asynchronous_midi_queue(&self) -> MappedEventList {
        self.sequencer.pull_asynchronous_midi_queue()
    }

    pub fn add_route(&self, route: Route) {
        self.sequencer.add_route(route);
    }

    // ---- driver -------------------------------------------------------

    pub fn sound_driver_status(&self) -> DriverStatus {
        self.sequencer.sound_driver_status()
    }

    pub fn add_device(&self, id: DeviceId, kind: DeviceKind, name: &str) -> Result<()> {
        self.sequencer.add_device(id, kind, name)?;
        Ok(())
    }

    pub fn add_audio_file(&self, id: AudioFileId, path: impl AsRef<Path>) -> Result<()> {
        self.sequencer.add_audio_file(id, path.as_ref())?;
        Ok(())
    }

    /// Quit the sequencer and wait for the loop thread to exit.
    pub fn shutdown(&self) {
        self.sequencer.quit();
        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            thread.join();
        }
    }
}

impl Drop for Cadenza {
    fn drop(&mut self) {
        self.shutdown();
    }
}
