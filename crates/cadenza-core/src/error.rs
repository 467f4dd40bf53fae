//! Error types for cadenza-core.

use thiserror::Error;

/// Error type for building core values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Time out of range: {0} ns")]
    TimeOutOfRange(i64),

    #[error("Data byte out of range for {event_type}: {value}")]
    DataOutOfRange { event_type: &'static str, value: u8 },

    #[error("Negative duration: {0}")]
    NegativeDuration(String),

    #[error("Audio event without an audio file")]
    MissingAudioFile,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
