//! Record sinks: destinations for events captured while recording.
//!
//! Each sink filters by device and channel and keeps its own copy of every
//! matching event. Captured note-on/note-off pairs are joined into `Note`
//! events with a duration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use cadenza_core::{AtomicFlag, DeviceId, MappedEvent, MappedEventList, MappedEventType, RealTime};
use parking_lot::Mutex;
use smallvec::SmallVec;

pub type SinkId = u32;

#[derive(Default)]
struct SinkContents {
    events: Vec<MappedEvent>,
    /// Open note-ons keyed by (device, channel, pitch).
    pending: HashMap<(DeviceId, u8, u8), MappedEvent>,
}

impl SinkContents {
    fn terminate(&mut self, on: MappedEvent, at: RealTime) {
        self.events.push(on.with_duration(at - on.time()));
    }
}

pub struct RecordSink {
    id: SinkId,
    device: Option<DeviceId>,
    channel: Option<u8>,
    open: AtomicFlag,
    contents: Mutex<SinkContents>,
}

impl RecordSink {
    fn new(id: SinkId, device: Option<DeviceId>, channel: Option<u8>) -> Self {
        Self {
            id,
            device,
            channel,
            open: AtomicFlag::new(false),
            contents: Mutex::new(SinkContents::default()),
        }
    }

    #[inline]
    pub fn id(&self) -> SinkId {
        self.id
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    #[inline]
    pub fn accepts(&self, event: &MappedEvent) -> bool {
        self.device.is_none_or(|d| d == event.recorded_device())
            && self.channel.is_none_or(|c| c == event.recorded_channel())
    }

    pub fn open(&self) {
        self.open.set(true);
    }

    /// Close the sink, ending any still-held notes at `at`.
    pub fn close(&self, at: RealTime) {
        if !self.open.swap(false) {
            return;
        }
        let mut contents = self.contents.lock();
        let pending: Vec<MappedEvent> = contents.pending.drain().map(|(_, on)| on).collect();
        for on in pending {
            contents.terminate(on, at);
        }
    }

    fn record(&self, event: MappedEvent) {
        let mut contents = self.contents.lock();

        if event.event_type() != MappedEventType::Note {
            contents.events.push(event);
            return;
        }

        let key = (event.recorded_device(), event.recorded_channel(), event.pitch());
        if event.is_note_off() {
            match contents.pending.remove(&key) {
                Some(on) => contents.terminate(on, event.time()),
                None => tracing::warn!(
                    "Dropping unmatched note-off: pitch {} device {} channel {}",
                    event.pitch(),
                    event.recorded_device(),
                    event.recorded_channel()
                ),
            }
            return;
        }

        // Retriggered before release: end the previous note here
        if let Some(previous) = contents.pending.insert(key, event) {
            contents.terminate(previous, event.time());
        }
    }

    /// Take everything recorded so far, ordered by onset. Held notes stay
    /// pending.
    pub fn take_recorded(&self) -> MappedEventList {
        let mut list: MappedEventList = std::mem::take(&mut self.contents.lock().events).into();
        list.sort_by_time();
        list
    }

    pub fn recorded_len(&self) -> usize {
        self.contents.lock().events.len()
    }

    pub fn pending_notes(&self) -> usize {
        self.contents.lock().pending.len()
    }
}

pub struct RecordSinks {
    sinks: ArcSwap<Vec<Arc<RecordSink>>>,
    next_id: AtomicU32,
}

impl RecordSinks {
    pub fn new() -> Self {
        Self {
            sinks: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// New closed sink. `None` filters accept anything.
    pub fn add(&self, device: Option<DeviceId>, channel: Option<u8>) -> Arc<RecordSink> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sink = Arc::new(RecordSink::new(id, device, channel));
        self.sinks.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&sink));
            next
        });
        tracing::debug!("Added record sink {} (device {:?}, channel {:?})", id, device, channel);
        sink
    }

    pub fn remove(&self, id: SinkId) -> bool {
        let mut removed = false;
        self.sinks.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub fn get(&self, id: SinkId) -> Option<Arc<RecordSink>> {
        self.sinks.load().iter().find(|s| s.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sinks.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn open_all(&self) {
        for sink in self.sinks.load().iter() {
            sink.open();
        }
    }

    pub fn close_all(&self, at: RealTime) {
        for sink in self.sinks.load().iter() {
            sink.close(at);
        }
    }

    /// Give each open, matching sink its own copy. Returns how many sinks
    /// received the event.
    pub fn deliver(&self, event: MappedEvent) -> usize {
        let sinks = self.sinks.load();
        let targets: SmallVec<[&Arc<RecordSink>; 4]> = sinks
            .iter()
            .filter(|s| s.is_open() && s.accepts(&event))
            .collect();
        for sink in &targets {
            sink.record(event);
        }
        targets.len()
    }
}

impl Default for RecordSinks {
    fn default() -> Self {
        Self::new()
    }
}
