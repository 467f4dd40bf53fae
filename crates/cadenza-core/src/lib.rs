//! Core value types for the Cadenza sequencer.
//!
//! - [`RealTime`]: signed seconds + nanoseconds timestamp/duration
//! - [`MappedEvent`]: one timed MIDI/audio event, immutable once built
//! - [`MappedEventList`]: owned batch handed between threads
//! - [`EventFilter`]: event-type mask used by record and thru filters
//!
//! Nothing in this crate spawns threads or performs I/O.

pub mod error;
pub use error::{Error, Result};

mod real_time;
pub use real_time::RealTime;

mod event;
pub use event::{
    AudioFileId, DeviceId, InstrumentId, MappedEvent, MappedEventBuilder, MappedEventType,
    NO_DEVICE,
};

mod event_list;
pub use event_list::MappedEventList;

mod filter;
pub use filter::EventFilter;

mod lockfree;
pub use lockfree::{AtomicFlag, AtomicRealTime};
