//! Studio topology: devices, instruments and their mapped properties.
//!
//! The studio mirrors what has been registered with the driver. It is read
//! by routing (which instrument lives on which device/channel) and by the
//! control-device filter.

use std::sync::atomic::{AtomicU32, Ordering};

use cadenza_core::{DeviceId, InstrumentId, NO_DEVICE};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::StudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiDirection {
    Play,
    Record,
}

/// Closed set of device subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Midi { direction: MidiDirection },
    SoftSynth,
    Audio,
}

impl DeviceKind {
    pub const MIDI_PLAY: DeviceKind = DeviceKind::Midi {
        direction: MidiDirection::Play,
    };
    pub const MIDI_RECORD: DeviceKind = DeviceKind::Midi {
        direction: MidiDirection::Record,
    };

    pub const fn name(self) -> &'static str {
        match self {
            DeviceKind::Midi {
                direction: MidiDirection::Play,
            } => "MIDI play",
            DeviceKind::Midi {
                direction: MidiDirection::Record,
            } => "MIDI record",
            DeviceKind::SoftSynth => "soft synth",
            DeviceKind::Audio => "audio",
        }
    }

    /// Soft synths are hosted internally and have no external connection.
    pub const fn accepts_connection(self) -> bool {
        !matches!(self, DeviceKind::SoftSynth)
    }

    /// Kind of instrument this device hosts, if any.
    pub const fn instrument_kind(self) -> Option<InstrumentKind> {
        match self {
            DeviceKind::Midi {
                direction: MidiDirection::Play,
            } => Some(InstrumentKind::Midi),
            DeviceKind::Midi {
                direction: MidiDirection::Record,
            } => None,
            DeviceKind::SoftSynth => Some(InstrumentKind::SoftSynth),
            DeviceKind::Audio => Some(InstrumentKind::Audio),
        }
    }

    pub const fn is_capture(self) -> bool {
        matches!(
            self,
            DeviceKind::Midi {
                direction: MidiDirection::Record
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Midi,
    SoftSynth,
    Audio,
}

impl InstrumentKind {
    pub const fn name(self) -> &'static str {
        match self {
            InstrumentKind::Midi => "MIDI",
            InstrumentKind::SoftSynth => "soft synth",
            InstrumentKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    pub connection: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub kind: InstrumentKind,
    pub device: DeviceId,
    pub channel: u8,
}

/// Key for property storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappedObject {
    Device(DeviceId),
    Instrument(InstrumentId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappedValue {
    Number(f32),
    Text(String),
}

impl MappedValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            MappedValue::Number(n) => Some(*n),
            MappedValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MappedValue::Text(s) => Some(s),
            MappedValue::Number(_) => None,
        }
    }
}

impl From<f32> for MappedValue {
    fn from(value: f32) -> Self {
        MappedValue::Number(value)
    }
}

impl From<&str> for MappedValue {
    fn from(value: &str) -> Self {
        MappedValue::Text(value.to_string())
    }
}

impl From<String> for MappedValue {
    fn from(value: String) -> Self {
        MappedValue::Text(value)
    }
}

pub struct Studio {
    devices: DashMap<DeviceId, Device>,
    instruments: DashMap<InstrumentId, Instrument>,
    properties: DashMap<(MappedObject, String), MappedValue>,
    control_device: AtomicU32,
}

impl Studio {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            instruments: DashMap::new(),
            properties: DashMap::new(),
            control_device: AtomicU32::new(NO_DEVICE),
        }
    }

    pub fn add_device(&self, device: Device) -> Result<(), StudioError> {
        use dashmap::mapref::entry::Entry;

        match self.devices.entry(device.id) {
            Entry::Occupied(_) => Err(StudioError::DuplicateDevice(device.id)),
            Entry::Vacant(slot) => {
                slot.insert(device);
                Ok(())
            }
        }
    }

    /// Removes the device, its instruments and their properties.
    pub fn remove_device(&self, id: DeviceId) -> Result<Device, StudioError> {
        let (_, device) = self
            .devices
            .remove(&id)
            .ok_or(StudioError::UnknownDevice(id))?;

        let orphaned: Vec<InstrumentId> = self
            .instruments
            .iter()
            .filter(|entry| entry.device == id)
            .map(|entry| entry.id)
            .collect();
        for instrument in &orphaned {
            self.instruments.remove(instrument);
        }
        self.properties.retain(|(object, _), _| match object {
            MappedObject::Device(d) => *d != id,
            MappedObject::Instrument(i) => !orphaned.contains(i),
        });

        if self.control_device() == Some(id) {
            self.set_control_device(None);
        }
        Ok(device)
    }

    pub fn rename_device(&self, id: DeviceId, name: &str) -> Result<(), StudioError> {
        let mut device = self
            .devices
            .get_mut(&id)
            .ok_or(StudioError::UnknownDevice(id))?;
        device.name = name.to_string();
        Ok(())
    }

    pub fn set_connection(&self, id: DeviceId, connection: &str) -> Result<(), StudioError> {
        let mut device = self
            .devices
            .get_mut(&id)
            .ok_or(StudioError::UnknownDevice(id))?;
        if !device.kind.accepts_connection() {
            return Err(StudioError::ConnectionNotSupported(id));
        }
        device.connection = if connection.is_empty() {
            None
        } else {
            Some(connection.to_string())
        };
        Ok(())
    }

    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.devices.get(&id).map(|d| d.clone())
    }

    /// All devices ordered by id.
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.iter().map(|d| d.clone()).collect();
        devices.sort_by_key(|d| d.id);
        devices
    }

    pub fn has_device(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Create or replace an instrument on `device`.
    pub fn set_instrument(&self, instrument: Instrument) -> Result<(), StudioError> {
        if instrument.channel > 15 {
            return Err(StudioError::InvalidChannel(instrument.channel));
        }
        let device = self
            .devices
            .get(&instrument.device)
            .ok_or(StudioError::UnknownDevice(instrument.device))?;
        if device.kind.instrument_kind() != Some(instrument.kind) {
            return Err(StudioError::IncompatibleInstrument {
                device: instrument.device,
                kind: instrument.kind.name(),
            });
        }
        drop(device);

        self.instruments.insert(instrument.id, instrument);
        Ok(())
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<Instrument> {
        self.instruments.get(&id).map(|i| *i)
    }

    /// All instrument ids ordered.
    pub fn instrument_ids(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.instruments.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        ids
    }

    fn object_exists(&self, object: MappedObject) -> bool {
        match object {
            MappedObject::Device(id) => self.devices.contains_key(&id),
            MappedObject::Instrument(id) => self.instruments.contains_key(&id),
        }
    }

    pub fn set_property(
        &self,
        object: MappedObject,
        name: &str,
        value: MappedValue,
    ) -> Result<(), StudioError> {
        if !self.object_exists(object) {
            return Err(StudioError::UnknownObject);
        }
        self.properties.insert((object, name.to_string()), value);
        Ok(())
    }

    pub fn property(&self, object: MappedObject, name: &str) -> Option<MappedValue> {
        self.properties
            .get(&(object, name.to_string()))
            .map(|v| v.clone())
    }

    pub fn set_control_device(&self, device: Option<DeviceId>) {
        self.control_device
            .store(device.unwrap_or(NO_DEVICE), Ordering::Release);
    }

    pub fn control_device(&self) -> Option<DeviceId> {
        match self.control_device.load(Ordering::Acquire) {
            NO_DEVICE => None,
            id => Some(id),
        }
    }

    #[inline]
    pub fn is_control_device(&self, device: DeviceId) -> bool {
        device != NO_DEVICE && self.control_device.load(Ordering::Acquire) == device
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: DeviceId, kind: DeviceKind) -> Device {
        Device {
            id,
            name: format!("Device {}", id),
            kind,
            connection: None,
        }
    }

    #[test]
    fn test_duplicate_device_rejected() {
        let studio = Studio::new();
        studio.add_device(device(1, DeviceKind::MIDI_PLAY)).unwrap();
        assert_eq!(
            studio.add_device(device(1, DeviceKind::Audio)),
            Err(StudioError::DuplicateDevice(1))
        );
        assert_eq!(studio.device(1).unwrap().kind, DeviceKind::MIDI_PLAY);
    }

    #[test]
    fn test_instrument_kind_must_match_device() {
        let studio = Studio::new();
        studio.add_device(device(1, DeviceKind::MIDI_PLAY)).unwrap();
        studio.add_device(device(2, DeviceKind::MIDI_RECORD)).unwrap();

        let ok = Instrument {
            id: 10,
            kind: InstrumentKind::Midi,
            device: 1,
            channel: 0,
        };
        assert!(studio.set_instrument(ok).is_ok());

        let wrong = Instrument {
            device: 2,
            id: 11,
            ..ok
        };
        assert!(matches!(
            studio.set_instrument(wrong),
            Err(StudioError::IncompatibleInstrument { device: 2, .. })
        ));

        let bad_channel = Instrument {
            channel: 16,
            id: 12,
            ..ok
        };
        assert_eq!(
            studio.set_instrument(bad_channel),
            Err(StudioError::InvalidChannel(16))
        );
        assert_eq!(studio.instrument_ids(), vec![10]);
    }

    #[test]
    fn test_remove_device_cascades() {
        let studio = Studio::new();
        studio.add_device(device(1, DeviceKind::SoftSynth)).unwrap();
        studio
            .set_instrument(Instrument {
                id: 5,
                kind: InstrumentKind::SoftSynth,
                device: 1,
                channel: 0,
            })
            .unwrap();
        studio
            .set_property(MappedObject::Instrument(5), "volume", MappedValue::Number(0.5))
            .unwrap();
        studio.set_control_device(Some(1));

        studio.remove_device(1).unwrap();
        assert!(studio.instrument(5).is_none());
        assert!(studio.property(MappedObject::Instrument(5), "volume").is_none());
        assert_eq!(studio.control_device(), None);
        assert_eq!(studio.remove_device(1), Err(StudioError::UnknownDevice(1)));
    }

    #[test]
    fn test_soft_synth_has_no_connection() {
        let studio = Studio::new();
        studio.add_device(device(3, DeviceKind::SoftSynth)).unwrap();
        assert_eq!(
            studio.set_connection(3, "anything"),
            Err(StudioError::ConnectionNotSupported(3))
        );
    }

    #[test]
    fn test_properties() {
        let studio = Studio::new();
        assert_eq!(
            studio.set_property(MappedObject::Device(9), "name", "x".into()),
            Err(StudioError::UnknownObject)
        );
        studio.add_device(device(9, DeviceKind::Audio)).unwrap();
        studio
            .set_property(MappedObject::Device(9), "label", "Main out".into())
            .unwrap();
        let value = studio.property(MappedObject::Device(9), "label").unwrap();
        assert_eq!(value.as_text(), Some("Main out"));
        assert_eq!(value.as_number(), None);
    }
}
