//! Async in/out queues for live events crossing the engine boundary.
//!
//! - out: interactive side → engine (immediate events to send to the driver)
//! - in: engine → interactive side (captured live events, polled)

use cadenza_core::{MappedEvent, MappedEventList};
use crossbeam_channel::{unbounded, Receiver, Sender};

pub struct AsyncQueues {
    out_tx: Sender<MappedEvent>,
    out_rx: Receiver<MappedEvent>,
    in_tx: Sender<MappedEvent>,
    in_rx: Receiver<MappedEvent>,
}

impl AsyncQueues {
    pub fn new() -> Self {
        let (out_tx, out_rx) = unbounded();
        let (in_tx, in_rx) = unbounded();
        Self {
            out_tx,
            out_rx,
            in_tx,
            in_rx,
        }
    }

    /// Queue an event for the driver.
    #[inline]
    pub fn push_out(&self, event: MappedEvent) {
        // Both ends live in self, so the channel cannot be disconnected
        let _ = self.out_tx.send(event);
    }

    pub fn drain_out(&self) -> MappedEventList {
        self.out_rx.try_iter().collect()
    }

    pub fn has_out(&self) -> bool {
        !self.out_rx.is_empty()
    }

    /// Publish captured events for the interactive side.
    pub fn push_in(&self, events: impl IntoIterator<Item = MappedEvent>) {
        for event in events {
            let _ = self.in_tx.send(event);
        }
    }

    pub fn drain_in(&self) -> MappedEventList {
        self.in_rx.try_iter().collect()
    }

    pub fn in_len(&self) -> usize {
        self.in_rx.len()
    }

    pub fn out_len(&self) -> usize {
        self.out_rx.len()
    }
}

impl Default for AsyncQueues {
    fn default() -> Self {
        Self::new()
    }
}
