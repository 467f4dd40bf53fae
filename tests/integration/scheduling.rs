//! What reaches the driver, and when.

use cadenza::prelude::*;
use cadenza::sequencer::EventSource;
use cadenza::InstrumentKind;
use proptest::prelude::*;

use crate::helpers::*;

#[test]
fn test_read_ahead_window_advances_with_clock() {
    let (cadenza, handle) = test_engine();
    cadenza.event_source().add_buffer(click_track(1, 600, 10));

    start_playing(&cadenza, RealTime::ZERO);
    // 100ms beats, 80ms read-ahead
    assert_eq!(onsets(&handle.sent()), vec![ms(0)]);

    run_for(&cadenza, &handle, 250, 10);
    assert_eq!(
        onsets(&handle.sent()),
        vec![ms(0), ms(100), ms(200), ms(300)]
    );
    assert_eq!(onsets(&handle.played()), vec![ms(0), ms(100), ms(200)]);
    assert_eq!(handle.queued().len(), 1);
}

#[test]
fn test_first_fetch_restores_channel_state() {
    let (cadenza, handle) = test_engine();
    cadenza.event_source().add_buffer(vec![
        MappedEvent::program_change(1, 5, ms(50)),
        MappedEvent::controller(1, 7, 10, ms(100)),
        MappedEvent::controller(1, 7, 20, ms(200)),
        MappedEvent::controller(1, 10, 64, ms(300)),
        MappedEvent::note(1, 60, 100, ms(400), ms(100)),
        MappedEvent::note(1, 62, 100, ms(900), ms(400)),
        MappedEvent::note(1, 64, 100, ms(1100), ms(100)),
    ]);

    start_playing(&cadenza, ms(1000));
    let sent = handle.sent();
    let kinds: Vec<_> = sent.iter().map(|e| (e.event_type(), e.data1(), e.data2())).collect();
    assert_eq!(
        kinds,
        vec![
            (MappedEventType::ProgramChange, 5, 0),
            (MappedEventType::Controller, 7, 20),
            (MappedEventType::Controller, 10, 64),
            (MappedEventType::Note, 62, 100),
        ]
    );
}

#[test]
fn test_muted_buffer_contributes_nothing() {
    let (cadenza, handle) = test_engine();
    let drums = cadenza.event_source().add_buffer(click_track(1, 600, 4));
    cadenza.event_source().add_buffer(click_track(2, 600, 4));
    drums.set_muted(true);

    start_playing(&cadenza, RealTime::ZERO);
    run_for(&cadenza, &handle, 300, 10);
    assert!(handle.sent().iter().all(|e| e.instrument() == 2));
    assert_eq!(handle.sent().len(), 4);
}

#[test]
fn test_refilled_buffer_used_on_next_play() {
    let (cadenza, handle) = test_engine();
    let track = cadenza.event_source().add_buffer(click_track(1, 600, 2));

    start_playing(&cadenza, RealTime::ZERO);
    let token = cadenza.stop();
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    handle.take_sent();

    // Refill out of order; the buffer sorts on refill
    track.refill(vec![
        MappedEvent::note(3, 64, 100, ms(40), ms(10)),
        MappedEvent::note(3, 60, 100, ms(20), ms(10)),
    ]);
    start_playing(&cadenza, RealTime::ZERO);
    assert_eq!(onsets(&handle.sent()), vec![ms(20), ms(40)]);
}

#[test]
fn test_latency_compensation_lines_up_instruments() {
    let (cadenza, handle) = test_engine();
    let seq = cadenza.sequencer();
    cadenza.add_device(1, DeviceKind::MIDI_PLAY, "Slow synth").unwrap();
    cadenza.add_device(2, DeviceKind::MIDI_PLAY, "Fast synth").unwrap();
    seq.set_mapped_instrument(InstrumentKind::Midi, 10, 1, 0).unwrap();
    seq.set_mapped_instrument(InstrumentKind::Midi, 20, 2, 0).unwrap();
    handle.set_play_latency(10, ms(20));
    handle.set_play_latency(20, ms(5));

    cadenza.event_source().add_buffer(vec![
        MappedEvent::note(10, 60, 100, ms(10), ms(10)),
        MappedEvent::note(20, 60, 100, ms(10), ms(10)),
        MappedEvent::audio(20, 1, ms(10), ms(100), RealTime::ZERO),
    ]);

    start_playing(&cadenza, RealTime::ZERO);
    let sent = handle.sent();
    assert_eq!(onsets(&sent), vec![ms(10), ms(25), ms(10)]);
    assert!(sent[..2].iter().all(|e| e.is_latency_compensated()));

    // Source buffers are never shifted
    let mut again = MappedEventList::new();
    seq.fetch_events(&mut again, RealTime::ZERO, ms(80), false);
    assert_eq!(onsets(again.as_slice()), vec![ms(10), ms(10), ms(10)]);
}

#[test]
fn test_audio_compensation_opt_in() {
    let (cadenza, handle) = test_engine_with(Cadenza::builder().compensate_audio_latency(true));
    let seq = cadenza.sequencer();
    cadenza.add_device(1, DeviceKind::MIDI_PLAY, "Synth").unwrap();
    cadenza.add_device(2, DeviceKind::Audio, "Audio out").unwrap();
    seq.set_mapped_instrument(InstrumentKind::Midi, 10, 1, 0).unwrap();
    seq.set_mapped_instrument(InstrumentKind::Audio, 20, 2, 0).unwrap();
    handle.set_play_latency(10, ms(30));

    cadenza.event_source().add_buffer(vec![MappedEvent::audio(20, 1, ms(10), ms(100), RealTime::ZERO)]);
    start_playing(&cadenza, RealTime::ZERO);
    assert_eq!(onsets(&handle.sent()), vec![ms(40)]);
}

#[test]
fn test_live_events_follow_transport_state() {
    let (cadenza, handle) = test_engine();

    // Idle: sent on the next iteration
    cadenza.process_mapped_event(MappedEvent::controller(1, 7, 1, RealTime::ZERO));
    cadenza.step();
    assert_eq!(handle.played().len(), 1);

    // Starting: held until rolling, then stamped with the driver time
    let token = cadenza.play(ms(500));
    cadenza.step();
    assert_eq!(cadenza.status(), TransportStatus::StartingToPlay);
    cadenza.process_mapped_event(MappedEvent::controller(1, 7, 2, RealTime::ZERO));
    cadenza.step();
    assert!(cadenza.is_transport_sync_complete(token));
    assert_eq!(handle.sent().len(), 1);

    handle.advance(ms(10));
    cadenza.step();
    let sent = handle.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].data2(), 2);
    assert_eq!(sent[1].time(), ms(510));
}

proptest! {
    #[test]
    fn prop_adjacent_windows_concatenate(
        mut times in prop::collection::vec(0i64..1000, 0..40),
        a in 0i64..1000,
        b in 0i64..1000,
        c in 0i64..1000,
    ) {
        times.sort_unstable();
        let mut bounds = [a, b, c];
        bounds.sort_unstable();
        let [a, b, c] = bounds.map(ms);

        let source = EventSource::new();
        source.add_buffer(times.iter().map(|&t| MappedEvent::controller(1, 7, (t % 128) as u8, ms(t))));

        let mut whole = MappedEventList::new();
        source.get_slice(&mut whole, a, c, false);

        let mut split = MappedEventList::new();
        source.get_slice(&mut split, a, b, false);
        source.get_slice(&mut split, b, c, false);

        prop_assert_eq!(whole.as_slice(), split.as_slice());
        prop_assert!(whole.is_time_ordered());
        prop_assert!(whole.iter().all(|e| e.time() >= a && e.time() < c));
    }
}
