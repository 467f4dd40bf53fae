//! Builder for configuring and constructing a `Cadenza` handle.

use std::sync::Arc;
use std::time::Duration;

use cadenza_core::{EventFilter, RealTime};
use cadenza_engine::{DummyDriver, Sequencer, SequencerConfig, SequencerThread, SoundDriver};

use crate::{Cadenza, Result};

/// Without an explicit driver the engine runs on a wall-clock
/// [`DummyDriver`]. The scheduling loop is spawned on build unless
/// [`CadenzaBuilder::manual_stepping`] is set, in which case the caller
/// drives the engine with [`Cadenza::step`].
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let cadenza = Cadenza::builder()
///     .read_ahead(RealTime::from_millis(120))
///     .midi_thru(true)
///     .build()?;
///
/// let token = cadenza.play(RealTime::ZERO);
/// cadenza.wait_for(token, Duration::from_secs(1));
/// ```
pub struct CadenzaBuilder {
    driver: Option<Box<dyn SoundDriver>>,
    config: SequencerConfig,
    spawn_loop: bool,
}

impl Default for CadenzaBuilder {
    fn default() -> Self {
        Self {
            driver: None,
            config: SequencerConfig::default(),
            spawn_loop: true,
        }
    }
}

impl CadenzaBuilder {
    pub fn driver(mut self, driver: impl SoundDriver + 'static) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 80 ms
    pub fn read_ahead(mut self, read_ahead: RealTime) -> Self {
        self.config.read_ahead = read_ahead;
        self
    }

    /// Default: 10 ms
    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.config.sleep_interval = interval;
        self
    }

    pub fn midi_thru(mut self, enabled: bool) -> Self {
        self.config.midi_thru = enabled;
        self
    }

    pub fn compensate_audio_latency(mut self, enabled: bool) -> Self {
        self.config.compensate_audio_latency = enabled;
        self
    }

    pub fn record_filter(mut self, filter: EventFilter) -> Self {
        self.config.record_filter = filter;
        self
    }

    pub fn thru_filter(mut self, filter: EventFilter) -> Self {
        self.config.thru_filter = filter;
        self
    }

    pub fn filter_control_device(mut self, enabled: bool) -> Self {
        self.config.filter_control_device = enabled;
        self
    }

    /// Don't spawn the scheduling loop.
    pub fn manual_stepping(mut self) -> Self {
        self.spawn_loop = false;
        self
    }

    pub fn build(self) -> Result<Cadenza> {
        let driver: Box<dyn SoundDriver> = match self.driver {
            Some(driver) => driver,
            None => Box::new(DummyDriver::new()),
        };
        let sequencer = Arc::new(Sequencer::new(driver, self.config)?);

        let thread = if self.spawn_loop {
            Some(SequencerThread::spawn(Arc::clone(&sequencer))?)
        } else {
            None
        };

        Ok(Cadenza::from_parts(sequencer, thread))
    }
}
