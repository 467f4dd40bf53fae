//! Transport state and request plumbing.

mod queue;
mod status;

pub use queue::{RecordMode, TransportQueue, TransportRequest, TransportRequestKind, TransportToken};
pub use status::TransportStatus;

use cadenza_core::RealTime;

/// Active-or-not loop region on the song timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopRange {
    pub start: RealTime,
    pub end: RealTime,
}

impl LoopRange {
    /// Narrowest accepted loop. Bounds the laps a single fetch window can
    /// cover.
    pub const MIN_WIDTH_MS: i64 = 10;

    /// `None` unless `end - start` is at least [`LoopRange::MIN_WIDTH_MS`].
    pub fn new(start: RealTime, end: RealTime) -> Option<Self> {
        (end - start >= RealTime::from_millis(Self::MIN_WIDTH_MS)).then_some(Self { start, end })
    }

    #[inline]
    pub fn width(&self) -> RealTime {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, time: RealTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Map a time at or past `end` back into the loop.
    pub fn fold(&self, time: RealTime) -> RealTime {
        if time < self.end {
            return time;
        }
        let width = self.width().to_nanos();
        let over = (time - self.end).to_nanos() % width;
        self.start + RealTime::from_nanos(over)
    }
}
