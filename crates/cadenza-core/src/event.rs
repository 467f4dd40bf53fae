//! Wire-level sequencer events.
//!
//! A [`MappedEvent`] is immutable once built. Anything that needs a different
//! timestamp or destination builds a new value (`with_time`, `with_instrument`,
//! `latency_compensated`), so an event handed across a thread boundary is never
//! changed underneath its new owner.

use serde::{Deserialize, Serialize};

use crate::{Error, RealTime, Result};

/// Destination instrument identifier.
pub type InstrumentId = u32;

/// Studio device identifier.
pub type DeviceId = u32;

/// Registered audio file identifier.
pub type AudioFileId = u32;

/// Marker for events that did not arrive from any device.
pub const NO_DEVICE: DeviceId = u32::MAX;

/// Kind of a mapped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappedEventType {
    /// Note with a duration. A captured note-off is a `Note` with velocity 0.
    Note,
    /// Note-on without a scheduled note-off.
    NoteOneShot,
    ProgramChange,
    KeyPressure,
    ChannelPressure,
    /// `data1` carries the MSB, `data2` the LSB.
    PitchBend,
    Controller,
    SystemMessage,
    Audio,
    AudioCancel,
    Marker,
}

impl MappedEventType {
    pub const ALL: [MappedEventType; 11] = [
        MappedEventType::Note,
        MappedEventType::NoteOneShot,
        MappedEventType::ProgramChange,
        MappedEventType::KeyPressure,
        MappedEventType::ChannelPressure,
        MappedEventType::PitchBend,
        MappedEventType::Controller,
        MappedEventType::SystemMessage,
        MappedEventType::Audio,
        MappedEventType::AudioCancel,
        MappedEventType::Marker,
    ];

    /// Bit used by [`crate::EventFilter`] masks.
    #[inline]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    #[inline]
    pub const fn is_note(self) -> bool {
        matches!(self, MappedEventType::Note | MappedEventType::NoteOneShot)
    }

    #[inline]
    pub const fn is_audio(self) -> bool {
        matches!(self, MappedEventType::Audio | MappedEventType::AudioCancel)
    }

    /// Events whose latest value defines ongoing channel state.
    #[inline]
    pub const fn is_channel_state(self) -> bool {
        matches!(
            self,
            MappedEventType::ProgramChange
                | MappedEventType::KeyPressure
                | MappedEventType::ChannelPressure
                | MappedEventType::PitchBend
                | MappedEventType::Controller
        )
    }

    /// Whether `data1`/`data2` are 7-bit MIDI data bytes.
    #[inline]
    pub const fn has_midi_data(self) -> bool {
        !matches!(
            self,
            MappedEventType::SystemMessage
                | MappedEventType::Audio
                | MappedEventType::AudioCancel
                | MappedEventType::Marker
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            MappedEventType::Note => "Note",
            MappedEventType::NoteOneShot => "NoteOneShot",
            MappedEventType::ProgramChange => "ProgramChange",
            MappedEventType::KeyPressure => "KeyPressure",
            MappedEventType::ChannelPressure => "ChannelPressure",
            MappedEventType::PitchBend => "PitchBend",
            MappedEventType::Controller => "Controller",
            MappedEventType::SystemMessage => "SystemMessage",
            MappedEventType::Audio => "Audio",
            MappedEventType::AudioCancel => "AudioCancel",
            MappedEventType::Marker => "Marker",
        }
    }
}

/// One timed MIDI/audio control event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedEvent {
    time: RealTime,
    duration: RealTime,
    event_type: MappedEventType,
    data1: u8,
    data2: u8,
    instrument: InstrumentId,
    recorded_device: DeviceId,
    recorded_channel: u8,
    audio_file: Option<AudioFileId>,
    audio_start_marker: RealTime,
    #[serde(skip)]
    compensated: bool,
}

impl MappedEvent {
    #[inline]
    pub fn builder(event_type: MappedEventType) -> MappedEventBuilder {
        MappedEventBuilder::new(event_type)
    }

    /// Note for playback.
    pub fn note(
        instrument: InstrumentId,
        pitch: u8,
        velocity: u8,
        time: RealTime,
        duration: RealTime,
    ) -> Self {
        Self {
            time,
            duration: duration.max_zero(),
            data1: pitch & 0x7F,
            data2: velocity & 0x7F,
            instrument,
            ..Self::blank(MappedEventType::Note)
        }
    }

    pub fn controller(instrument: InstrumentId, controller: u8, value: u8, time: RealTime) -> Self {
        Self {
            time,
            data1: controller & 0x7F,
            data2: value & 0x7F,
            instrument,
            ..Self::blank(MappedEventType::Controller)
        }
    }

    pub fn program_change(instrument: InstrumentId, program: u8, time: RealTime) -> Self {
        Self {
            time,
            data1: program & 0x7F,
            instrument,
            ..Self::blank(MappedEventType::ProgramChange)
        }
    }

    pub fn pitch_bend(instrument: InstrumentId, msb: u8, lsb: u8, time: RealTime) -> Self {
        Self {
            time,
            data1: msb & 0x7F,
            data2: lsb & 0x7F,
            instrument,
            ..Self::blank(MappedEventType::PitchBend)
        }
    }

    /// Audio segment playback starting `start_marker` into the file.
    pub fn audio(
        instrument: InstrumentId,
        file: AudioFileId,
        time: RealTime,
        duration: RealTime,
        start_marker: RealTime,
    ) -> Self {
        Self {
            time,
            duration: duration.max_zero(),
            instrument,
            audio_file: Some(file),
            audio_start_marker: start_marker.max_zero(),
            ..Self::blank(MappedEventType::Audio)
        }
    }

    /// Live event as captured from an input device, not yet routed.
    pub fn captured(
        event_type: MappedEventType,
        data1: u8,
        data2: u8,
        time: RealTime,
        device: DeviceId,
        channel: u8,
    ) -> Self {
        Self {
            time,
            data1: data1 & 0x7F,
            data2: data2 & 0x7F,
            recorded_device: device,
            recorded_channel: channel & 0x0F,
            ..Self::blank(event_type)
        }
    }

    fn blank(event_type: MappedEventType) -> Self {
        Self {
            time: RealTime::ZERO,
            duration: RealTime::ZERO,
            event_type,
            data1: 0,
            data2: 0,
            instrument: 0,
            recorded_device: NO_DEVICE,
            recorded_channel: 0,
            audio_file: None,
            audio_start_marker: RealTime::ZERO,
            compensated: false,
        }
    }

    #[inline]
    pub fn time(&self) -> RealTime {
        self.time
    }

    #[inline]
    pub fn duration(&self) -> RealTime {
        self.duration
    }

    /// Onset plus duration.
    #[inline]
    pub fn end_time(&self) -> RealTime {
        self.time + self.duration
    }

    #[inline]
    pub fn event_type(&self) -> MappedEventType {
        self.event_type
    }

    #[inline]
    pub fn data1(&self) -> u8 {
        self.data1
    }

    #[inline]
    pub fn data2(&self) -> u8 {
        self.data2
    }

    #[inline]
    pub fn pitch(&self) -> u8 {
        self.data1
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.data2
    }

    #[inline]
    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    #[inline]
    pub fn recorded_device(&self) -> DeviceId {
        self.recorded_device
    }

    #[inline]
    pub fn recorded_channel(&self) -> u8 {
        self.recorded_channel
    }

    #[inline]
    pub fn audio_file(&self) -> Option<AudioFileId> {
        self.audio_file
    }

    #[inline]
    pub fn audio_start_marker(&self) -> RealTime {
        self.audio_start_marker
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.event_type.is_note() && self.data2 > 0
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.event_type == MappedEventType::Note && self.data2 == 0
    }

    /// Whether play latency compensation has been applied to this instance.
    #[inline]
    pub fn is_latency_compensated(&self) -> bool {
        self.compensated
    }

    #[inline]
    pub fn with_time(self, time: RealTime) -> Self {
        Self { time, ..self }
    }

    #[inline]
    pub fn with_duration(self, duration: RealTime) -> Self {
        Self {
            duration: duration.max_zero(),
            ..self
        }
    }

    #[inline]
    pub fn with_instrument(self, instrument: InstrumentId) -> Self {
        Self { instrument, ..self }
    }

    /// Copy moved by `delta` on the timeline.
    #[inline]
    pub fn shifted(self, delta: RealTime) -> Self {
        Self {
            time: self.time + delta,
            ..self
        }
    }

    /// Copy delayed by `shift` and marked as compensated. Compensating an
    /// already compensated event returns it unchanged.
    #[inline]
    pub fn latency_compensated(self, shift: RealTime) -> Self {
        if self.compensated {
            return self;
        }
        Self {
            time: self.time + shift,
            compensated: true,
            ..self
        }
    }
}

/// Validating builder for [`MappedEvent`].
#[derive(Debug, Clone, Copy)]
pub struct MappedEventBuilder {
    event: MappedEvent,
}

impl MappedEventBuilder {
    pub fn new(event_type: MappedEventType) -> Self {
        Self {
            event: MappedEvent::blank(event_type),
        }
    }

    pub fn time(mut self, time: RealTime) -> Self {
        self.event.time = time;
        self
    }

    pub fn duration(mut self, duration: RealTime) -> Self {
        self.event.duration = duration;
        self
    }

    pub fn data(mut self, data1: u8, data2: u8) -> Self {
        self.event.data1 = data1;
        self.event.data2 = data2;
        self
    }

    pub fn instrument(mut self, instrument: InstrumentId) -> Self {
        self.event.instrument = instrument;
        self
    }

    pub fn recorded_from(mut self, device: DeviceId, channel: u8) -> Self {
        self.event.recorded_device = device;
        self.event.recorded_channel = channel & 0x0F;
        self
    }

    pub fn audio_file(mut self, file: AudioFileId, start_marker: RealTime) -> Self {
        self.event.audio_file = Some(file);
        self.event.audio_start_marker = start_marker;
        self
    }

    pub fn build(self) -> Result<MappedEvent> {
        let event = self.event;
        let event_type = event.event_type;

        if event_type.has_midi_data() {
            for value in [event.data1, event.data2] {
                if value > 0x7F {
                    return Err(Error::DataOutOfRange {
                        event_type: event_type.name(),
                        value,
                    });
                }
            }
        }
        if event.duration.is_negative() {
            return Err(Error::NegativeDuration(event.duration.to_string()));
        }
        if event_type == MappedEventType::Audio && event.audio_file.is_none() {
            return Err(Error::MissingAudioFile);
        }
        Ok(event)
    }
}
