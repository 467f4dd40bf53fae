//! Error types for cadenza-engine.

use cadenza_core::{DeviceId, InstrumentId};
use thiserror::Error;

/// Failures reported by a [`crate::SoundDriver`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Driver failed to start: {0}")]
    StartFailed(String),

    #[error("Driver failed to start recording: {0}")]
    RecordFailed(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Unknown connection '{connection}' for device {device}")]
    UnknownConnection { device: DeviceId, connection: String },

    #[error("Audio file error: {0}")]
    AudioFile(String),

    #[error("Driver not initialised")]
    NotInitialised,
}

/// Rejected studio configuration calls. State is unchanged when returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    #[error("Device {0} already exists")]
    DuplicateDevice(DeviceId),

    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error("Device {0} does not accept connections")]
    ConnectionNotSupported(DeviceId),

    #[error("Device {device} cannot host a {kind} instrument")]
    IncompatibleInstrument { device: DeviceId, kind: &'static str },

    #[error("Unknown mapped object")]
    UnknownObject,

    #[error("Invalid channel: {0}. Must be 0-15")]
    InvalidChannel(u8),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Error type for engine construction and thread management.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn sequencer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
