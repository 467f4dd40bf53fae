//! Centralized error type for the cadenza umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[error(transparent)]
    Engine(#[from] cadenza_engine::Error),

    #[error("Studio: {0}")]
    Studio(#[from] cadenza_engine::StudioError),

    #[error("Driver: {0}")]
    Driver(#[from] cadenza_engine::DriverError),
}

pub type Result<T> = std::result::Result<T, Error>;
