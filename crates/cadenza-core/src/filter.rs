//! Event-type filter masks.

use core::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::{MappedEvent, MappedEventType};

/// Set of event types to drop.
///
/// A filter *contains* the types it removes; [`EventFilter::accepts`] is the
/// complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventFilter(u32);

impl EventFilter {
    /// Drops nothing.
    pub const NONE: EventFilter = EventFilter(0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn with(self, event_type: MappedEventType) -> Self {
        Self(self.0 | event_type.bit())
    }

    #[inline]
    pub const fn without(self, event_type: MappedEventType) -> Self {
        Self(self.0 & !event_type.bit())
    }

    #[inline]
    pub const fn contains(self, event_type: MappedEventType) -> bool {
        self.0 & event_type.bit() != 0
    }

    #[inline]
    pub fn accepts(self, event: &MappedEvent) -> bool {
        !self.contains(event.event_type())
    }
}

impl BitOr for EventFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<MappedEventType> for EventFilter {
    fn from(event_type: MappedEventType) -> Self {
        Self::NONE.with(event_type)
    }
}
