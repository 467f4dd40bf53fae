//! Per-instrument latency cache.
//!
//! Play compensation delays every instrument to line up with the slowest
//! one: `compensation = max_play_latency - own_play_latency`. Values are
//! queried from the driver only on refresh (playback start, or the next
//! iteration after a topology change marks the cache dirty) and published
//! as an immutable snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use cadenza_core::{AtomicFlag, InstrumentId, RealTime};

use crate::SoundDriver;

#[derive(Debug, Clone, Default)]
pub struct LatencyState {
    pub play: HashMap<InstrumentId, RealTime>,
    pub record: HashMap<InstrumentId, RealTime>,
    pub compensation: HashMap<InstrumentId, RealTime>,
    pub max_play: RealTime,
}

impl LatencyState {
    pub fn recalculate(&mut self) {
        self.max_play = self
            .play
            .values()
            .copied()
            .max()
            .unwrap_or(RealTime::ZERO)
            .max_zero();

        self.compensation.clear();
        for (&id, &latency) in &self.play {
            self.compensation.insert(id, (self.max_play - latency).max_zero());
        }
    }
}

pub struct LatencyCache {
    state: ArcSwap<LatencyState>,
    dirty: AtomicFlag,
}

impl LatencyCache {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(LatencyState::default()),
            dirty: AtomicFlag::new(true),
        }
    }

    /// Request a refresh on the next loop iteration.
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Clears and returns the dirty flag.
    #[inline]
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false)
    }

    /// Query the driver for every instrument and publish a new snapshot.
    pub fn refresh(&self, driver: &dyn SoundDriver, instruments: &[InstrumentId]) {
        let mut state = LatencyState::default();
        for &id in instruments {
            state.play.insert(id, driver.instrument_play_latency(id).max_zero());
            state.record.insert(id, driver.instrument_record_latency(id).max_zero());
        }
        state.recalculate();

        tracing::debug!(
            "Refreshed latency cache: {} instruments, max play latency {}",
            instruments.len(),
            state.max_play
        );
        self.state.store(Arc::new(state));
        self.dirty.set(false);
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<LatencyState> {
        self.state.load_full()
    }

    /// Delay to add to events for `instrument`. Unknown instruments are
    /// treated as zero-latency.
    pub fn play_compensation(&self, instrument: InstrumentId) -> RealTime {
        let state = self.state.load();
        state
            .compensation
            .get(&instrument)
            .copied()
            .unwrap_or(state.max_play)
    }

    pub fn record_latency(&self, instrument: InstrumentId) -> RealTime {
        self.state
            .load()
            .record
            .get(&instrument)
            .copied()
            .unwrap_or(RealTime::ZERO)
    }

    pub fn max_play_latency(&self) -> RealTime {
        self.state.load().max_play
    }
}

impl Default for LatencyCache {
    fn default() -> Self {
        Self::new()
    }
}
