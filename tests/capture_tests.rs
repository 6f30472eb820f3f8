// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture facade on the synthetic backend

use camera_access::backends::camera::synthetic::{Pattern, SyntheticBackend};
use camera_access::constants::resolutions;
use camera_access::{
    CameraBackendType, CameraManager, Config, FilterType, ImageAdjustments, SessionState,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn fast_config() -> Config {
    Config {
        backend: CameraBackendType::Synthetic,
        default_resolution: resolutions::VGA,
        initial_frame_interval_ms: 16.0,
        restart_settle_ms: 10,
        restart_frame_timeout_ms: 1000,
        ..Config::default()
    }
}

fn wait_until_buffered(manager: &CameraManager) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while manager.get_last_frame_from_buffer().is_none() {
        assert!(Instant::now() < deadline, "no frame buffered in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_capture_on_stalled_device_returns_within_deadline() {
    let backend = SyntheticBackend::new();
    let controls = backend.controls();
    controls.set_stalled(true);
    let manager = CameraManager::with_backend(fast_config(), Arc::new(backend)).unwrap();
    manager.start_session("synthetic0").unwrap();

    let started = Instant::now();
    assert!(manager.capture_frame(false).is_none());
    assert!(started.elapsed() < Duration::from_millis(500));

    let started = Instant::now();
    assert!(manager.capture_frame(true).is_none());
    assert!(started.elapsed() < Duration::from_millis(800));

    manager.stop_session().unwrap();
    assert_eq!(controls.open_streams(), 0);
}

#[test]
fn test_concurrent_consumers_all_get_frames() {
    let manager = Arc::new(
        CameraManager::with_backend(fast_config(), Arc::new(SyntheticBackend::new())).unwrap(),
    );
    manager.start_session("synthetic0").unwrap();
    wait_until_buffered(&manager);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                (0..10)
                    .filter(|_| manager.capture_frame(true).is_some())
                    .count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
    manager.stop_session().unwrap();
}

#[test]
fn test_stop_from_another_thread_during_capture() {
    let backend = SyntheticBackend::new();
    backend.controls().set_read_delay(Duration::from_millis(20));
    let manager = Arc::new(CameraManager::with_backend(fast_config(), Arc::new(backend)).unwrap());
    manager.start_session("synthetic0").unwrap();

    let consumer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(300);
            while Instant::now() < deadline {
                let _ = manager.capture_frame(false);
            }
        })
    };

    thread::sleep(Duration::from_millis(100));
    manager.stop_session().unwrap();
    consumer.join().unwrap();

    assert_eq!(manager.session_state(), SessionState::Idle);
    assert!(manager.capture_frame(false).is_none());
}

#[test]
fn test_session_adjustments_applied_to_frames() {
    let backend = SyntheticBackend::new().with_pattern(Pattern::Solid([0, 0, 255, 255]));
    let manager = CameraManager::with_backend(fast_config(), Arc::new(backend)).unwrap();
    let inverted = ImageAdjustments::default().with_filter(FilterType::Inverted);
    manager
        .start_session_with_config("synthetic0", resolutions::HD, inverted)
        .unwrap();
    wait_until_buffered(&manager);

    let frame = manager.get_last_frame_from_buffer().unwrap();
    assert_eq!(frame.resolution(), resolutions::HD);
    assert_eq!(frame.pixel(0, 0), [255, 255, 0, 255]);
    manager.stop_session().unwrap();
}

#[test]
fn test_zoom_keeps_dimensions_on_gradient() {
    let manager =
        CameraManager::with_backend(fast_config(), Arc::new(SyntheticBackend::new())).unwrap();
    manager.set_zoom_level(3.0).unwrap();
    manager.start_session("synthetic1").unwrap();
    wait_until_buffered(&manager);

    let frame = manager.capture_frame(true).unwrap();
    assert_eq!(frame.resolution(), resolutions::VGA);
    assert_eq!(frame.data.len(), 640 * 480 * 4);
    manager.stop_session().unwrap();
}

#[test]
fn test_refresh_keeps_default_first() {
    let manager =
        CameraManager::with_backend(fast_config(), Arc::new(SyntheticBackend::new())).unwrap();
    let devices = manager.refresh_devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices[0].is_default);
    assert_eq!(manager.available_cameras(), devices);
}
