//! Test helpers and fixtures for Cadenza integration tests
//!
//! Engines run on a manual-clock `DummyDriver` with the scheduling loop
//! stepped by hand, so every test is deterministic.

#![allow(dead_code)]

use cadenza::prelude::*;
use cadenza::{DummyDriver, DummyDriverHandle, InstrumentId};

/// Read-ahead used by every fixture (the default).
pub const READ_AHEAD_MS: i64 = 80;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn ms(v: i64) -> RealTime {
    RealTime::from_millis(v)
}

/// Manually stepped engine plus a handle onto its driver.
pub fn test_engine() -> (Cadenza, DummyDriverHandle) {
    test_engine_with(CadenzaBuilder::default())
}

pub fn test_engine_with(builder: CadenzaBuilder) -> (Cadenza, DummyDriverHandle) {
    init_tracing();
    let driver = DummyDriver::manual();
    let handle = driver.handle();
    let cadenza = builder
        .driver(driver)
        .manual_stepping()
        .build()
        .expect("Failed to create test engine");
    (cadenza, handle)
}

/// Step until the transport reaches `status`, at most `max_steps` times.
pub fn step_until(cadenza: &Cadenza, status: TransportStatus, max_steps: usize) -> bool {
    for _ in 0..max_steps {
        if cadenza.status() == status {
            return true;
        }
        cadenza.step();
    }
    cadenza.status() == status
}

/// Start playback at `time` and wait until rolling.
pub fn start_playing(cadenza: &Cadenza, time: RealTime) {
    let token = cadenza.play(time);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Playing);
}

/// Advance the manual clock in `tick_ms` steps, running one loop iteration
/// per tick.
pub fn run_for(cadenza: &Cadenza, handle: &DummyDriverHandle, total_ms: i64, tick_ms: i64) {
    let mut elapsed = 0;
    while elapsed < total_ms {
        handle.advance(ms(tick_ms));
        cadenza.step();
        elapsed += tick_ms;
    }
}

/// One note per beat at `bpm`, starting at zero.
pub fn click_track(instrument: InstrumentId, bpm: u32, beats: u32) -> Vec<MappedEvent> {
    let beat_ms = 60_000 / bpm as i64;
    (0..beats as i64)
        .map(|i| MappedEvent::note(instrument, 76, 100, ms(i * beat_ms), ms(beat_ms / 2)))
        .collect()
}

pub fn onsets(events: &[MappedEvent]) -> Vec<RealTime> {
    events.iter().map(|e| e.time()).collect()
}
