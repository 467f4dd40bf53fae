//! Engine lifecycle tests: construction, the loop thread and shutdown.

use std::sync::Arc;

use cadenza::prelude::*;
use cadenza::sequencer::StudioError;
use cadenza::{DriverStatus, DummyDriver, Error};

use crate::helpers::*;

#[test]
fn test_threaded_play_and_stop() {
    init_tracing();
    let cadenza = Cadenza::builder()
        .driver(DummyDriver::new())
        .sleep_interval(Duration::from_millis(1))
        .build()
        .expect("Failed to create engine");
    assert!(cadenza.is_loop_running());

    cadenza.event_source().add_buffer(click_track(1, 120, 8));

    let token = cadenza.play(RealTime::ZERO);
    assert!(cadenza.wait_for(token, Duration::from_secs(2)));
    assert_eq!(cadenza.status(), TransportStatus::Playing);

    let token = cadenza.stop();
    assert!(cadenza.wait_for(token, Duration::from_secs(2)));
    assert_eq!(cadenza.status(), TransportStatus::Stopped);

    cadenza.shutdown();
    assert!(!cadenza.is_loop_running());
    assert_eq!(cadenza.status(), TransportStatus::Quit);
}

#[test]
fn test_shutdown_while_polled_from_other_threads() {
    init_tracing();
    let cadenza = Cadenza::builder()
        .driver(DummyDriver::new())
        .sleep_interval(Duration::from_millis(1))
        .build()
        .expect("Failed to create engine");
    cadenza.event_source().add_buffer(click_track(1, 120, 8));
    let token = cadenza.play(RealTime::ZERO);
    assert!(cadenza.wait_for(token, Duration::from_secs(2)));

    std::thread::scope(|s| {
        let poller = s.spawn(|| {
            while cadenza.is_loop_running() {
                std::thread::yield_now();
            }
        });
        let second = s.spawn(|| cadenza.shutdown());
        cadenza.shutdown();
        second.join().expect("shutdown thread panicked");
        poller.join().expect("poller thread panicked");
    });

    assert!(!cadenza.is_loop_running());
    assert_eq!(cadenza.status(), TransportStatus::Quit);
}

#[test]
fn test_drop_quits_sequencer() {
    init_tracing();
    let cadenza = Cadenza::builder()
        .driver(DummyDriver::new())
        .build()
        .expect("Failed to create engine");
    let sequencer = Arc::clone(cadenza.sequencer());

    drop(cadenza);
    assert_eq!(sequencer.status(), TransportStatus::Quit);
}

#[test]
fn test_invalid_config_rejected() {
    let result = Cadenza::builder()
        .read_ahead(RealTime::ZERO)
        .manual_stepping()
        .build();
    assert!(matches!(result, Err(Error::Engine(_))));

    let result = Cadenza::builder()
        .sleep_interval(Duration::from_secs(5))
        .manual_stepping()
        .build();
    assert!(matches!(result, Err(Error::Engine(_))));
}

#[test]
fn test_driver_status_reported() {
    let (cadenza, _handle) = test_engine();
    assert!(cadenza.sound_driver_status().contains(DriverStatus::MIDI_OK));
    assert!(!cadenza.is_loop_running());

    let cadenza = Cadenza::builder()
        .driver(DummyDriver::unavailable())
        .manual_stepping()
        .build()
        .expect("Unavailable driver must not fail construction");
    assert_eq!(cadenza.sound_driver_status(), DriverStatus::NO_DRIVER);
}

#[test]
fn test_errors_convert_to_umbrella() {
    let (cadenza, _handle) = test_engine();
    cadenza.add_device(1, DeviceKind::MIDI_PLAY, "Out").unwrap();

    let err = cadenza.add_device(1, DeviceKind::MIDI_PLAY, "Out").unwrap_err();
    assert!(matches!(err, Error::Studio(StudioError::DuplicateDevice(1))));

    let err = cadenza.add_audio_file(1, "").unwrap_err();
    assert!(matches!(err, Error::Driver(_)));
}

#[test]
fn test_wait_for_steps_manual_engine() {
    let (cadenza, _handle) = test_engine();
    let token = cadenza.play(ms(250));
    assert!(!cadenza.is_transport_sync_complete(token));
    assert!(cadenza.wait_for(token, Duration::from_secs(1)));
    assert_eq!(cadenza.status(), TransportStatus::Playing);
    assert_eq!(cadenza.position(), ms(250));
}
