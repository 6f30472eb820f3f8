// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use camera_access::constants::{pacing, resolutions};
use camera_access::{CameraBackendType, Config, FilterType, WhiteBalance};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.backend, CameraBackendType::V4l2);
    assert_eq!(config.default_resolution, resolutions::DEFAULT);
    assert_eq!(config.initial_frame_interval_ms, pacing::INITIAL_INTERVAL_MS);
    assert!(config.adaptive_quality, "Adaptive pacing should be on by default");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.backend = CameraBackendType::Synthetic;
    config.max_zoom = 4.0;
    config.white_balance = WhiteBalance::Cloudy;
    config.adjustments.set_filter(FilterType::Sepia);
    config.adjustments.set_brightness(0.25);
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "backend": "Synthetic", "white_balance": "tungsten" }"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.backend, CameraBackendType::Synthetic);
    assert_eq!(config.white_balance, WhiteBalance::Incandescent);
    assert_eq!(config.default_resolution, resolutions::DEFAULT);
}

#[test]
fn test_out_of_range_values_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "initial_frame_interval_ms": 500.0,
            "max_zoom": 0.2,
            "stream_buffers": 0,
            "adjustments": { "brightness": 9.0, "filter": "negative" }
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.initial_frame_interval_ms, pacing::MAX_INTERVAL_MS);
    assert_eq!(config.max_zoom, 1.0);
    assert_eq!(config.stream_buffers, 1);
    assert_eq!(config.adjustments.brightness(), 1.0);
    assert_eq!(config.adjustments.filter(), FilterType::Inverted);
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), "CAMERA_ERROR");
}
