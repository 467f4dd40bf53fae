//! Transport status.

/// Live transport state. Mutated only by the scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportStatus {
    #[default]
    Stopped,
    Playing,
    Recording,
    Stopping,
    StartingToPlay,
    StartingToRecord,
    RecordingArmed,
    Quit,
}

impl TransportStatus {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            TransportStatus::Stopped => 0,
            TransportStatus::Playing => 1,
            TransportStatus::Recording => 2,
            TransportStatus::Stopping => 3,
            TransportStatus::StartingToPlay => 4,
            TransportStatus::StartingToRecord => 5,
            TransportStatus::RecordingArmed => 6,
            TransportStatus::Quit => 7,
        }
    }

    pub(crate) fn from_u8(val: u8) -> Self {
        match val {
            1 => TransportStatus::Playing,
            2 => TransportStatus::Recording,
            3 => TransportStatus::Stopping,
            4 => TransportStatus::StartingToPlay,
            5 => TransportStatus::StartingToRecord,
            6 => TransportStatus::RecordingArmed,
            7 => TransportStatus::Quit,
            _ => TransportStatus::Stopped,
        }
    }

    /// Anything a stop can act on.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TransportStatus::Playing
                | TransportStatus::Recording
                | TransportStatus::StartingToPlay
                | TransportStatus::StartingToRecord
                | TransportStatus::RecordingArmed
        )
    }

    /// Clocks running and events flowing.
    #[inline]
    pub fn is_rolling(self) -> bool {
        matches!(self, TransportStatus::Playing | TransportStatus::Recording)
    }

    #[inline]
    pub fn is_recording(self) -> bool {
        self == TransportStatus::Recording
    }

    /// States that must resolve on the next iteration.
    #[inline]
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            TransportStatus::StartingToPlay | TransportStatus::StartingToRecord | TransportStatus::Stopping
        )
    }
}
