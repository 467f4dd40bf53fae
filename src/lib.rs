//! # Cadenza - Real-time Sequencer Transport
//!
//! Drives MIDI and audio playback and recording through a scheduling loop
//! that runs beside the interactive application.
//!
//! ## Architecture
//!
//! Cadenza is an umbrella crate that coordinates:
//! - **cadenza-core** - Value types (RealTime, MappedEvent, event lists, filters)
//! - **cadenza-engine** - Sound Driver boundary, transport state machine,
//!   window fetch, latency compensation, live-event routing, scheduling loop
//!
//! ## Quick Start
//!
//! ```ignore
//! use cadenza::prelude::*;
//!
//! let cadenza = Cadenza::builder().build()?;
//!
//! cadenza.event_source().add_buffer(vec![
//!     MappedEvent::note(1, 60, 100, RealTime::from_millis(0), RealTime::from_millis(250)),
//!     MappedEvent::note(1, 64, 100, RealTime::from_millis(250), RealTime::from_millis(250)),
//! ]);
//!
//! let token = cadenza.play(RealTime::ZERO);
//! cadenza.wait_for(token, Duration::from_millis(500));
//! ```

/// Re-export of cadenza-core for direct access
pub use cadenza_core as core;

/// Re-export of cadenza-engine for direct access
pub use cadenza_engine as sequencer;

// Core types
pub use cadenza_core::{
    AudioFileId, DeviceId, EventFilter, InstrumentId, MappedEvent, MappedEventBuilder,
    MappedEventList, MappedEventType, RealTime, NO_DEVICE,
};

// Engine
pub use cadenza_engine::{
    DeviceKind, DriverStatus, DummyDriver, DummyDriverHandle, EventSource, InstrumentKind,
    LoopRange, MappedObject, MappedValue, RecordMode, Route, Sequencer, SequencerConfig,
    SequencerThread, SoundDriver, StepOutcome, TransportRequestKind, TransportStatus,
    TransportToken,
};

mod builder;
mod engine;
mod error;

pub use builder::CadenzaBuilder;
pub use engine::Cadenza;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Cadenza, CadenzaBuilder};

    pub use crate::core::{MappedEvent, MappedEventList, MappedEventType, RealTime};

    pub use crate::sequencer::{
        DeviceKind, RecordMode, Route, SequencerConfig, TransportStatus, TransportToken,
    };

    pub use std::time::Duration;
}
