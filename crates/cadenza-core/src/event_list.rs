//! Owned batches of mapped events.

use core::slice;

use serde::{Deserialize, Serialize};

use crate::{MappedEvent, RealTime};

/// Ordered collection of [`MappedEvent`]s.
///
/// Lists are handed to drivers and queues by value; whoever holds the list
/// owns its events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappedEventList {
    events: Vec<MappedEvent>,
}

impl MappedEventList {
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, event: MappedEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, MappedEvent> {
        self.events.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, MappedEvent> {
        self.events.iter_mut()
    }

    #[inline]
    pub fn as_slice(&self) -> &[MappedEvent] {
        &self.events
    }

    #[inline]
    pub fn first(&self) -> Option<&MappedEvent> {
        self.events.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&MappedEvent> {
        self.events.last()
    }

    pub fn retain(&mut self, f: impl FnMut(&MappedEvent) -> bool) {
        self.events.retain(f);
    }

    pub fn retain_mut(&mut self, f: impl FnMut(&mut MappedEvent) -> bool) {
        self.events.retain_mut(f);
    }

    /// Moves every event out of `other`.
    pub fn append(&mut self, other: &mut MappedEventList) {
        self.events.append(&mut other.events);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Moves every event by `delta`.
    pub fn shift_all(&mut self, delta: RealTime) {
        if delta.is_zero() {
            return;
        }
        for ev in &mut self.events {
            *ev = ev.shifted(delta);
        }
    }

    /// Stable sort by onset time.
    pub fn sort_by_time(&mut self) {
        self.events.sort_by_key(|ev| ev.time());
    }

    pub fn is_time_ordered(&self) -> bool {
        self.events.windows(2).all(|w| w[0].time() <= w[1].time())
    }

    /// Splits into (matching, rest), preserving order in both.
    pub fn partition(self, f: impl FnMut(&MappedEvent) -> bool) -> (MappedEventList, MappedEventList) {
        let (yes, no): (Vec<_>, Vec<_>) = self.events.into_iter().partition(f);
        (yes.into(), no.into())
    }

    pub fn into_vec(self) -> Vec<MappedEvent> {
        self.events
    }
}

impl From<Vec<MappedEvent>> for MappedEventList {
    fn from(events: Vec<MappedEvent>) -> Self {
        Self { events }
    }
}

impl FromIterator<MappedEvent> for MappedEventList {
    fn from_iter<I: IntoIterator<Item = MappedEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl Extend<MappedEvent> for MappedEventList {
    fn extend<I: IntoIterator<Item = MappedEvent>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl IntoIterator for MappedEventList {
    type Item = MappedEvent;
    type IntoIter = std::vec::IntoIter<MappedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a MappedEventList {
    type Item = &'a MappedEvent;
    type IntoIter = slice::Iter<'a, MappedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
