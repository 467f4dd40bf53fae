//! Live-event thru, recording into sinks, and filtering.

use cadenza::prelude::*;
use cadenza::{EventFilter, InstrumentKind};

use crate::helpers::*;

const KEYBOARD: u32 = 3;
const SYNTH_DEVICE: u32 = 10;
const SYNTH: u32 = 9;

/// Keyboard input routed to a synth instrument.
fn studio_engine(builder: CadenzaBuilder) -> (Cadenza, cadenza::DummyDriverHandle) {
    let (cadenza, handle) = test_engine_with(builder);
    cadenza.add_device(KEYBOARD, DeviceKind::MIDI_RECORD, "Keyboard").unwrap();
    cadenza.add_device(SYNTH_DEVICE, DeviceKind::MIDI_PLAY, "Synth").unwrap();
    cadenza
        .sequencer()
        .set_mapped_instrument(InstrumentKind::Midi, SYNTH, SYNTH_DEVICE, 0)
        .unwrap();
    cadenza.add_route(Route::for_device(KEYBOARD, SYNTH));
    (cadenza, handle)
}

#[test]
fn test_thru_echoes_routed_events() {
    let (cadenza, handle) = studio_engine(Cadenza::builder().midi_thru(true));
    handle.capture(MappedEventType::Note, 60, 100, KEYBOARD, 0);
    handle.capture(MappedEventType::SystemMessage, 0, 0, KEYBOARD, 0);
    // No route for this device
    handle.capture(MappedEventType::Note, 62, 100, 77, 0);
    cadenza.step();

    let sent = handle.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].instrument(), SYNTH);
    assert_eq!(sent[0].pitch(), 60);

    // Not recording: every captured event is offered to the interactive side
    let pulled = cadenza.pull_asynchronous_midi_queue();
    assert_eq!(pulled.len(), 3);
}

#[test]
fn test_thru_disabled_by_default() {
    let (cadenza, handle) = studio_engine(Cadenza::builder());
    handle.capture(MappedEventType::Note, 60, 100, KEYBOARD, 0);
    cadenza.step();
    assert!(handle.sent().is_empty());
    assert_eq!(cadenza.pull_asynchronous_midi_queue().len(), 1);
}

#[test]
fn test_control_device_filtered_from_thru() {
    let (cadenza, handle) = studio_engine(Cadenza::builder().midi_thru(true));
    cadenza.sequencer().set_control_device(Some(KEYBOARD)).unwrap();
    handle.capture(MappedEventType::Controller, 1, 64, KEYBOARD, 0);
    cadenza.step();
    assert!(handle.sent().is_empty());

    cadenza.sequencer().set_filter_control_device(false);
    handle.capture(MappedEventType::Controller, 1, 64, KEYBOARD, 0);
    cadenza.step();
    assert_eq!(handle.sent().len(), 1);
}

#[test]
fn test_recording_pairs_notes_and_applies_record_latency() {
    let (cadenza, handle) = studio_engine(Cadenza::builder());
    handle.set_record_latency(SYNTH, ms(5));
    let sink = cadenza.sequencer().add_record_sink(Some(KEYBOARD), None);

    let token = cadenza.record(RealTime::ZERO, RecordMode::Record);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Recording);
    assert!(sink.is_open());

    handle.advance(ms(20));
    handle.capture(MappedEventType::Note, 60, 100, KEYBOARD, 0);
    cadenza.step();
    assert_eq!(sink.pending_notes(), 1);

    handle.advance(ms(100));
    handle.capture(MappedEventType::Note, 60, 0, KEYBOARD, 0);
    cadenza.step();

    let token = cadenza.stop();
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));

    let recorded = cadenza.sequencer().take_recorded(sink.id()).unwrap();
    assert_eq!(recorded.len(), 1);
    let note = recorded.as_slice()[0];
    assert_eq!(note.time(), ms(15));
    assert_eq!(note.duration(), ms(100));
    assert_eq!(note.instrument(), SYNTH);

    // Recorded events don't land on the in-queue
    assert!(cadenza.pull_asynchronous_midi_queue().is_empty());
}

#[test]
fn test_stop_terminates_held_notes() {
    let (cadenza, handle) = studio_engine(Cadenza::builder());
    let sink = cadenza.sequencer().add_record_sink(None, Some(0));

    let token = cadenza.record(RealTime::ZERO, RecordMode::Record);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    handle.capture(MappedEventType::Note, 64, 90, KEYBOARD, 0);
    // Wrong channel for this sink
    handle.capture(MappedEventType::Note, 65, 90, KEYBOARD, 1);
    cadenza.step();

    run_for(&cadenza, &handle, 50, 10);
    assert!(cadenza.stop().value() > 0);
    assert!(step_until(&cadenza, TransportStatus::Stopped, 3));

    let recorded = sink.take_recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded.as_slice()[0].pitch(), 64);
    assert_eq!(recorded.as_slice()[0].duration(), ms(50));
    assert_eq!(sink.pending_notes(), 0);
}

#[test]
fn test_unmatched_note_off_is_dropped() {
    let (cadenza, handle) = studio_engine(Cadenza::builder());
    let sink = cadenza.sequencer().add_record_sink(None, None);
    let token = cadenza.record(RealTime::ZERO, RecordMode::Record);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));

    handle.capture(MappedEventType::Note, 60, 0, KEYBOARD, 0);
    cadenza.step();
    assert_eq!(sink.recorded_len(), 0);
    assert_eq!(cadenza.status(), TransportStatus::Recording);
}

#[test]
fn test_record_filter_drops_types() {
    let filter = EventFilter::NONE.with(MappedEventType::Controller);
    let (cadenza, handle) = studio_engine(Cadenza::builder().record_filter(filter));
    let sink = cadenza.sequencer().add_record_sink(None, None);
    let token = cadenza.record(RealTime::ZERO, RecordMode::Record);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));

    handle.capture(MappedEventType::Controller, 64, 127, KEYBOARD, 0);
    handle.capture(MappedEventType::PitchBend, 0, 64, KEYBOARD, 0);
    cadenza.step();

    let recorded = sink.take_recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded.as_slice()[0].event_type(), MappedEventType::PitchBend);
}

#[test]
fn test_fallback_instrument_catches_unrouted() {
    let (cadenza, handle) = studio_engine(Cadenza::builder().midi_thru(true));
    cadenza.sequencer().set_fallback_instrument(Some(42));
    handle.capture(MappedEventType::Note, 60, 100, 77, 2);
    cadenza.step();

    let sent = handle.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].instrument(), 42);

    cadenza.sequencer().set_fallback_instrument(None);
    handle.capture(MappedEventType::Note, 60, 100, 77, 2);
    cadenza.step();
    assert_eq!(handle.sent().len(), 1);
}

#[test]
fn test_removing_device_drops_its_routes() {
    let (cadenza, handle) = studio_engine(Cadenza::builder().midi_thru(true));
    cadenza.sequencer().remove_device(KEYBOARD).unwrap();
    handle.capture(MappedEventType::Note, 60, 100, KEYBOARD, 0);
    cadenza.step();
    assert!(handle.sent().is_empty());
}
