//! Sequencer transport engine.
//!
//! # Primary API
//!
//! - [`Sequencer`]: transport, live events, studio topology
//! - [`SequencerThread`]: background scheduling loop
//! - [`SoundDriver`]: boundary to audio/MIDI hardware ([`DummyDriver`] for
//!   headless use)
//! - [`EventSource`]: composition buffers the loop fetches from
//!
//! # Threads
//!
//! ```text
//! interactive side ──transport_change()──▶ TransportQueue ──▶ scheduling loop ──▶ SoundDriver
//!        │                                                         ▲      │
//!        └──process_mapped_event()──▶ out queue ───────────────────┘      │
//!        ◀──pull_asynchronous_midi_queue()── in queue ◀──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cadenza_engine::{DummyDriver, Sequencer, SequencerConfig, SequencerThread};
//!
//! let seq = Arc::new(Sequencer::new(Box::new(DummyDriver::new()), SequencerConfig::default())?);
//! seq.event_source().add_buffer(events);
//! let thread = SequencerThread::spawn(Arc::clone(&seq))?;
//!
//! let token = seq.play(RealTime::ZERO);
//! while !seq.is_transport_sync_complete(token) {}
//! ```

pub mod error;
pub use error::{DriverError, Error, Result, StudioError};

mod config;
pub use config::SequencerConfig;

pub mod driver;
pub use driver::{DriverStatus, DummyDriver, DummyDriverHandle, SoundDriver};

pub mod transport;
pub use transport::{
    LoopRange, RecordMode, TransportQueue, TransportRequest, TransportRequestKind, TransportStatus,
    TransportToken,
};

mod source;
pub use source::{BufferId, EventSource, MappedEventBuffer, MergedEvents};

mod queues;
pub use queues::AsyncQueues;

mod latency;
pub use latency::{LatencyCache, LatencyState};

mod routing;
pub use routing::{Route, RoutingSnapshot, RoutingTable};

mod record;
pub use record::{RecordSink, RecordSinks, SinkId};

pub mod studio;
pub use studio::{
    Device, DeviceKind, Instrument, InstrumentKind, MappedObject, MappedValue, MidiDirection,
    Studio,
};

mod engine;
pub use engine::{Sequencer, StepOutcome};

mod thread;
pub use thread::SequencerThread;

pub use cadenza_core::{
    EventFilter, MappedEvent, MappedEventList, MappedEventType, RealTime, NO_DEVICE,
};
