//! Sequencer configuration.

use std::time::Duration;

use cadenza_core::{EventFilter, MappedEventType, RealTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Scheduling and live-event settings for a [`crate::Sequencer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// How far past the play position events are fetched and handed off.
    pub read_ahead: RealTime,
    /// Idle sleep between loop iterations.
    pub sleep_interval: Duration,
    /// Echo captured live events back to the driver.
    pub midi_thru: bool,
    /// Shift audio events by play compensation as well as MIDI.
    pub compensate_audio_latency: bool,
    /// Event types dropped before record sinks.
    pub record_filter: EventFilter,
    /// Event types dropped before MIDI thru.
    pub thru_filter: EventFilter,
    /// Drop events coming from the studio's control-surface device.
    pub filter_control_device: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            read_ahead: RealTime::from_millis(80),
            sleep_interval: Duration::from_millis(10),
            midi_thru: false,
            compensate_audio_latency: false,
            record_filter: EventFilter::NONE,
            thru_filter: EventFilter::NONE.with(MappedEventType::SystemMessage),
            filter_control_device: true,
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.read_ahead.is_negative() || self.read_ahead.is_zero() {
            return Err(Error::InvalidConfig(format!(
                "read_ahead must be positive, got {}",
                self.read_ahead
            )));
        }
        if self.read_ahead > RealTime::from_seconds(10.0) {
            return Err(Error::InvalidConfig(format!(
                "read_ahead must be at most 10s, got {}",
                self.read_ahead
            )));
        }
        if self.sleep_interval.is_zero() {
            return Err(Error::InvalidConfig("sleep_interval must be non-zero".into()));
        }
        if self.sleep_interval > Duration::from_secs(1) {
            return Err(Error::InvalidConfig(format!(
                "sleep_interval must be at most 1s, got {:?}",
                self.sleep_interval
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SequencerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_ahead, RealTime::from_millis(80));
        assert_eq!(config.sleep_interval, Duration::from_millis(10));
        assert!(!config.midi_thru);
        assert!(config.filter_control_device);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SequencerConfig {
            read_ahead: RealTime::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = SequencerConfig {
            sleep_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = SequencerConfig {
            read_ahead: RealTime::from_seconds(30.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
