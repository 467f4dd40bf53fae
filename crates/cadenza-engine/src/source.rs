//! Event source iterator: merges per-track event buffers into one
//! time-ordered stream.
//!
//! # Architecture
//!
//! ```text
//! Interactive thread                 Scheduling loop
//!     │                                   │
//!     ▼                                   ▼
//! ┌──────────────────┐  ArcSwap   ┌────────────────────────┐
//! │ MappedEventBuffer│──────────▶│ EventSource::get_slice  │
//! │  refill()        │            │  k-way merge, stateless │
//! └──────────────────┘            └────────────────────────┘
//! ```
//!
//! Buffers are refilled wholesale; the loop only ever sees complete,
//! sorted snapshots.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use cadenza_core::{AtomicFlag, InstrumentId, MappedEvent, MappedEventList, MappedEventType, RealTime};
use smallvec::SmallVec;

pub type BufferId = u32;

/// One track's (or segment's) events, sorted by onset.
pub struct MappedEventBuffer {
    id: BufferId,
    events: ArcSwap<Vec<MappedEvent>>,
    muted: AtomicFlag,
}

impl MappedEventBuffer {
    fn new(id: BufferId) -> Self {
        Self {
            id,
            events: ArcSwap::from_pointee(Vec::new()),
            muted: AtomicFlag::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Replace the buffer contents. Events are stably sorted by onset.
    pub fn refill(&self, events: impl IntoIterator<Item = MappedEvent>) {
        let mut events: Vec<MappedEvent> = events.into_iter().collect();
        events.sort_by_key(|ev| ev.time());
        self.events.store(Arc::new(events));
    }

    pub fn clear(&self) {
        self.events.store(Arc::new(Vec::new()));
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<MappedEvent>> {
        self.events.load_full()
    }

    pub fn len(&self) -> usize {
        self.events.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.load().is_empty()
    }

    #[inline]
    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }
}

/// Set of buffers the scheduling loop reads from.
pub struct EventSource {
    buffers: ArcSwap<Vec<Arc<MappedEventBuffer>>>,
    next_id: AtomicU32,
}

impl EventSource {
    pub fn new() -> Self {
        Self {
            buffers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a new buffer holding `events`. Later buffers sort after
    /// earlier ones when onsets tie.
    pub fn add_buffer(&self, events: impl IntoIterator<Item = MappedEvent>) -> Arc<MappedEventBuffer> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let buffer = Arc::new(MappedEventBuffer::new(id));
        buffer.refill(events);

        self.buffers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&buffer));
            next
        });
        tracing::debug!("Added event buffer {} ({} events)", id, buffer.len());
        buffer
    }

    pub fn remove_buffer(&self, id: BufferId) -> bool {
        let mut removed = false;
        self.buffers.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|b| b.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        if removed {
            tracing::debug!("Removed event buffer {}", id);
        }
        removed
    }

    pub fn buffer(&self, id: BufferId) -> Option<Arc<MappedEventBuffer>> {
        self.buffers.load().iter().find(|b| b.id == id).cloned()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.load().len()
    }

    pub fn clear(&self) {
        self.buffers.store(Arc::new(Vec::new()));
    }

    /// Append every event with onset in `[start, end)` to `list`, merged
    /// across unmuted buffers in time order. Ties keep buffer order, then
    /// insertion order.
    ///
    /// With `first_fetch`, events that define the state at `start` are
    /// prepended: notes and audio still sounding at `start`, and the latest
    /// channel-state event (controller, program, pitch bend, pressure) per
    /// instrument before `start`.
    ///
    /// Stateless: identical arguments yield identical output.
    pub fn get_slice(&self, list: &mut MappedEventList, start: RealTime, end: RealTime, first_fetch: bool) {
        if start >= end {
            return;
        }

        let buffers = self.buffers.load();
        let snapshots: SmallVec<[Arc<Vec<MappedEvent>>; 8]> = buffers
            .iter()
            .filter(|b| !b.is_muted())
            .map(|b| b.snapshot())
            .collect();

        if first_fetch {
            let prefixes = snapshots.iter().map(|events| {
                let until = events.partition_point(|ev| ev.time() < start);
                &events[..until]
            });
            list.extend(state_at(MergedEvents::new(prefixes), start));
        }

        let windows = snapshots.iter().map(|events| {
            let from = events.partition_point(|ev| ev.time() < start);
            let to = events.partition_point(|ev| ev.time() < end);
            &events[from..to]
        });
        list.extend(MergedEvents::new(windows));
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Events before `start` that still matter at `start`, in time order.
fn state_at(before: impl Iterator<Item = MappedEvent>, start: RealTime) -> Vec<MappedEvent> {
    let before: Vec<MappedEvent> = before.collect();
    let mut seen: HashSet<(InstrumentId, MappedEventType, u8)> = HashSet::new();
    let mut kept = Vec::new();

    for ev in before.iter().rev() {
        let event_type = ev.event_type();
        let sounding = match event_type {
            MappedEventType::Note | MappedEventType::Audio => ev.end_time() > start,
            _ => false,
        };
        if sounding {
            kept.push(*ev);
            continue;
        }
        if event_type.is_channel_state() {
            let key = match event_type {
                MappedEventType::Controller | MappedEventType::KeyPressure => ev.data1(),
                _ => 0,
            };
            if seen.insert((ev.instrument(), event_type, key)) {
                kept.push(*ev);
            }
        }
    }
    kept.reverse();
    kept
}

/// K-way merge over time-sorted slices.
pub struct MergedEvents<'a> {
    slices: SmallVec<[&'a [MappedEvent]; 8]>,
    heap: BinaryHeap<Reverse<(RealTime, usize, usize)>>,
}

impl<'a> MergedEvents<'a> {
    pub fn new(slices: impl IntoIterator<Item = &'a [MappedEvent]>) -> Self {
        let slices: SmallVec<[&'a [MappedEvent]; 8]> = slices.into_iter().collect();
        let mut heap = BinaryHeap::with_capacity(slices.len());
        for (index, slice) in slices.iter().enumerate() {
            if let Some(first) = slice.first() {
                heap.push(Reverse((first.time(), index, 0)));
            }
        }
        Self { slices, heap }
    }
}

impl Iterator for MergedEvents<'_> {
    type Item = MappedEvent;

    fn next(&mut self) -> Option<MappedEvent> {
        let Reverse((_, index, pos)) = self.heap.pop()?;
        let slice = self.slices[index];
        if let Some(next) = slice.get(pos + 1) {
            self.heap.push(Reverse((next.time(), index, pos + 1)));
        }
        Some(slice[pos])
    }
}
