//! Engine state guarded by the sequencer lock, plus the lock-free report.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};

use cadenza_core::{AtomicFlag, AtomicRealTime, RealTime};

use crate::transport::{LoopRange, TransportStatus, TransportToken};
use crate::{RoutingTable, SequencerConfig, SoundDriver};

pub(crate) struct EngineState {
    pub driver: Box<dyn SoundDriver>,
    pub config: SequencerConfig,
    pub status: TransportStatus,
    pub routing: RoutingTable,
    /// Current play position on the song timeline.
    pub song_position: RealTime,
    /// Song time (in the current fetch lap) up to which events were fetched.
    pub last_fetch: RealTime,
    /// Driver time minus song time for the fetch lap.
    pub fetch_offset: RealTime,
    /// Driver time minus song time for the play position.
    pub clock_offset: RealTime,
    /// Driver times at which the play position wraps, with the width to
    /// add to `clock_offset` at each.
    pub pending_wraps: VecDeque<(RealTime, RealTime)>,
    pub loop_range: Option<LoopRange>,
    pub end_of_composition: Option<RealTime>,
    /// Token of a request whose transition resolves on a later iteration.
    pub deferred_token: Option<TransportToken>,
}

impl EngineState {
    pub fn new(driver: Box<dyn SoundDriver>, config: SequencerConfig) -> Self {
        Self {
            driver,
            config,
            status: TransportStatus::Stopped,
            routing: RoutingTable::new(),
            song_position: RealTime::ZERO,
            last_fetch: RealTime::ZERO,
            fetch_offset: RealTime::ZERO,
            clock_offset: RealTime::ZERO,
            pending_wraps: VecDeque::new(),
            loop_range: None,
            end_of_composition: None,
            deferred_token: None,
        }
    }

    /// Forget every loop/lap offset, e.g. after the driver clock is rebased.
    pub fn reset_offsets(&mut self) {
        self.fetch_offset = RealTime::ZERO;
        self.clock_offset = RealTime::ZERO;
        self.pending_wraps.clear();
    }
}

/// Position report readable without the engine lock.
pub(crate) struct PositionReport {
    status: AtomicU8,
    position: AtomicRealTime,
    auto_stopped: AtomicFlag,
}

impl PositionReport {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(TransportStatus::Stopped.to_u8()),
            position: AtomicRealTime::default(),
            auto_stopped: AtomicFlag::new(false),
        }
    }

    #[inline]
    pub fn status(&self) -> TransportStatus {
        TransportStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_status(&self, status: TransportStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    #[inline]
    pub fn position(&self) -> RealTime {
        self.position.get()
    }

    #[inline]
    pub fn set_position(&self, position: RealTime) {
        self.position.set(position);
    }

    #[inline]
    pub fn auto_stopped(&self) -> bool {
        self.auto_stopped.get()
    }

    #[inline]
    pub fn set_auto_stopped(&self, auto_stopped: bool) {
        self.auto_stopped.set(auto_stopped);
    }
}
