//! Transport state machine driven through the request queue.

use cadenza::prelude::*;
use cadenza::TransportRequestKind;

use crate::helpers::*;

#[test]
fn test_play_stop_cycle() {
    let (cadenza, handle) = test_engine();
    start_playing(&cadenza, RealTime::ZERO);
    assert!(handle.is_playing());

    let token = cadenza.stop();
    cadenza.step();
    assert_eq!(cadenza.status(), TransportStatus::Stopping);
    assert!(!cadenza.is_transport_sync_complete(token));
    cadenza.step();
    assert_eq!(cadenza.status(), TransportStatus::Stopped);
    assert!(cadenza.is_transport_sync_complete(token));
    assert!(!handle.is_playing());
}

#[test]
fn test_tokens_strictly_increase() {
    let (cadenza, _handle) = test_engine();
    let seq = cadenza.sequencer();
    let a = seq.transport_change(TransportRequestKind::NoChange);
    let b = seq.transport_change(TransportRequestKind::NoChange);
    let c = seq.transport_jump(TransportRequestKind::JumpToTime, ms(10));
    assert!(a < b && b < c);

    // One request per iteration
    cadenza.step();
    assert!(cadenza.is_transport_sync_complete(a));
    assert!(!cadenza.is_transport_sync_complete(b));
    cadenza.step();
    cadenza.step();
    assert!(cadenza.is_transport_sync_complete(c));
    assert_eq!(cadenza.position(), ms(10));
}

#[test]
fn test_stop_at_time_repositions() {
    let (cadenza, handle) = test_engine();
    start_playing(&cadenza, RealTime::ZERO);
    run_for(&cadenza, &handle, 100, 10);

    let token = cadenza
        .sequencer()
        .transport_jump(TransportRequestKind::StopAtTime, ms(500));
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Stopped);
    assert_eq!(cadenza.position(), ms(500));
}

#[test]
fn test_start_resumes_from_current_position() {
    let (cadenza, handle) = test_engine();
    assert!(cadenza.jump_to(ms(1000)));

    let token = cadenza.start();
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.position(), ms(1000));

    run_for(&cadenza, &handle, 30, 10);
    assert_eq!(cadenza.position(), ms(1030));
}

#[test]
fn test_loop_jump_folds_position() {
    let (cadenza, _handle) = test_engine();
    assert!(cadenza.set_loop(ms(2000), ms(5000), true));
    assert_eq!(cadenza.position(), ms(2000));
    assert!(cadenza.jump_to(ms(6000)));
    assert_eq!(cadenza.position(), ms(3000));

    cadenza.clear_loop();
    assert!(cadenza.loop_range().is_none());
    assert!(cadenza.jump_to(ms(6000)));
    assert_eq!(cadenza.position(), ms(6000));
}

#[test]
fn test_loop_playback_over_several_laps() {
    let (cadenza, handle) = test_engine();
    cadenza.event_source().add_buffer(click_track(1, 240, 4));
    cadenza.set_loop(RealTime::ZERO, ms(500), false);

    start_playing(&cadenza, RealTime::ZERO);
    run_for(&cadenza, &handle, 1200, 10);

    assert_eq!(cadenza.position(), ms(200));
    let sent = handle.sent();
    assert_eq!(
        onsets(&sent),
        vec![ms(0), ms(250), ms(500), ms(750), ms(1000), ms(1250)]
    );
    assert!(sent.windows(2).all(|w| w[0].time() < w[1].time()));
}

#[test]
fn test_end_of_composition_stops_unless_looping() {
    let (cadenza, handle) = test_engine();
    cadenza.sequencer().set_end_of_composition(Some(ms(300)));

    start_playing(&cadenza, RealTime::ZERO);
    run_for(&cadenza, &handle, 300, 10);
    assert!(step_until(&cadenza, TransportStatus::Stopped, 2));
    assert!(cadenza.sequencer().auto_stopped());

    // Looping inside the composition never reaches its end
    cadenza.set_loop(RealTime::ZERO, ms(200), false);
    start_playing(&cadenza, RealTime::ZERO);
    run_for(&cadenza, &handle, 600, 10);
    assert_eq!(cadenza.status(), TransportStatus::Playing);
    assert!(!cadenza.sequencer().auto_stopped());
}

#[test]
fn test_record_from_stopped_with_time() {
    let (cadenza, handle) = test_engine();
    let token = cadenza.record(ms(300), RecordMode::Record);
    cadenza.step();
    assert_eq!(cadenza.status(), TransportStatus::StartingToRecord);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Recording);
    assert_eq!(cadenza.position(), ms(300));
    assert!(handle.is_recording());
}

#[test]
fn test_armed_recording_waits_for_start() {
    let (cadenza, handle) = test_engine();
    let token = cadenza.record(RealTime::ZERO, RecordMode::Armed);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::RecordingArmed);
    assert!(!handle.is_playing());

    let token = cadenza.start();
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Recording);
}

#[test]
fn test_play_while_recording_punches_out() {
    let (cadenza, handle) = test_engine();
    start_playing(&cadenza, RealTime::ZERO);

    let token = cadenza.record(RealTime::ZERO, RecordMode::Record);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Recording);

    let token = cadenza.start();
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Playing);
    assert!(!handle.is_recording());
    assert!(handle.is_playing());
}

#[test]
fn test_failed_start_falls_back_to_stopped() {
    let (cadenza, handle) = test_engine();
    handle.fail_next_start();

    let token = cadenza.play(RealTime::ZERO);
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Stopped);

    // The failure was one-shot
    start_playing(&cadenza, RealTime::ZERO);
}

#[test]
fn test_shutdown_completes_pending_tokens() {
    let (cadenza, _handle) = test_engine();
    let token = cadenza.play(RealTime::ZERO);
    cadenza.shutdown();
    assert_eq!(cadenza.status(), TransportStatus::Quit);
    assert!(cadenza.is_transport_sync_complete(token));
    assert_eq!(cadenza.step().status, TransportStatus::Quit);
}
