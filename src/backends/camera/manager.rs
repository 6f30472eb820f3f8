// SPDX-License-Identifier: GPL-3.0-only

//! Capture facade
//!
//! [`CameraManager`] is the single entry point callers use. It owns the
//! device registry and the capture session and implements frame retrieval:
//!
//! - [`CameraManager::capture_frame`]: newest buffered frame when the buffer
//!   lock is free in time, otherwise wait briefly for the next publish.
//! - [`CameraManager::capture_frame_alternative`]: restart the session and
//!   return its first frame.
//! - [`CameraManager::capture_frame_with_adjustments`]: like `capture_frame`
//!   but rendered with caller-supplied adjustments for this call only.
//!
//! The manager is `Send + Sync`; share it behind an `Arc`.

use super::frame_buffer::BufferedFrame;
use super::registry::DeviceRegistry;
use super::session::{
    CaptureSession, CaptureStats, PacingConfig, ProcessingSettings, SessionShared,
};
use super::types::*;
use super::{CameraBackend, get_backend_for_type};
use crate::config::Config;
use crate::constants::{capture, resolutions, zoom};
use crate::errors::{CameraError, CameraResult};
use crate::frame_processor::{FrameProcessor, ImageAdjustments, WhiteBalance};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct CameraManager {
    backend: Arc<dyn CameraBackend>,
    registry: Mutex<DeviceRegistry>,
    session: CaptureSession,
    shared: Arc<SessionShared>,
    processor: FrameProcessor,
    /// Resolution requested for the next session start
    resolution: Mutex<Resolution>,
    config: Config,
}

impl CameraManager {
    /// Create a manager using the backend named in `config`
    pub fn new(config: Config) -> CameraResult<Self> {
        let backend = get_backend_for_type(config.backend, &config);
        Self::with_backend(config, backend)
    }

    /// Create a manager on an explicit backend instance
    pub fn with_backend(config: Config, backend: Arc<dyn CameraBackend>) -> CameraResult<Self> {
        config.validate()?;
        info!(backend = %backend.backend_type(), "Creating camera manager");

        let registry = DeviceRegistry::new(Arc::clone(&backend))?;
        let shared = Arc::new(SessionShared::new(ProcessingSettings {
            adjustments: config.adjustments,
            white_balance: config.white_balance,
        }));
        let processor = FrameProcessor::new();
        let session = CaptureSession::new(
            Arc::clone(&backend),
            Arc::clone(&shared),
            processor.clone(),
            PacingConfig {
                initial_interval_ms: config.initial_frame_interval_ms,
                adaptive: config.adaptive_quality,
            },
        );

        Ok(Self {
            backend,
            registry: Mutex::new(registry),
            session,
            shared,
            processor,
            resolution: Mutex::new(config.default_resolution),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend_type(&self) -> CameraBackendType {
        self.backend.backend_type()
    }

    // ===== Devices =====

    /// Devices from the last enumeration
    pub fn available_cameras(&self) -> Vec<CameraDevice> {
        self.registry.lock().devices().to_vec()
    }

    /// Re-enumerate devices
    pub fn refresh_devices(&self) -> CameraResult<Vec<CameraDevice>> {
        let mut registry = self.registry.lock();
        Ok(registry.refresh()?.to_vec())
    }

    // ===== Session =====

    /// Start capturing from `device_id` at the current resolution
    pub fn start_session(&self, device_id: &str) -> CameraResult<CameraFormat> {
        if self.registry.lock().find(device_id).is_none() {
            warn!(device = device_id, "Start requested for unknown device");
            return Err(CameraError::DeviceNotFound(device_id.to_string()));
        }
        let resolution = *self.resolution.lock();
        self.session.start(device_id, resolution)
    }

    /// Store resolution and adjustments, then start
    pub fn start_session_with_config(
        &self,
        device_id: &str,
        resolution: Resolution,
        adjustments: ImageAdjustments,
    ) -> CameraResult<CameraFormat> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(CameraError::InvalidArgument(format!(
                "invalid resolution {}",
                resolution
            )));
        }
        self.session.stop()?;
        *self.resolution.lock() = resolution;
        self.set_image_adjustments(adjustments);
        self.start_session(device_id)
    }

    pub fn stop_session(&self) -> CameraResult<()> {
        self.session.stop()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn active_device(&self) -> Option<String> {
        self.session.active_device()
    }

    /// Format negotiated for the running session
    pub fn current_format(&self) -> Option<CameraFormat> {
        self.session.format()
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.stats()
    }

    // ===== Frame retrieval =====

    /// Fetch the newest frame, waiting briefly for a new one if needed
    ///
    /// With `force`, lock and wait deadlines are longer and a buffered
    /// frame older than the staleness limit is not returned directly.
    /// Returns `None` when no session is active or nothing arrives.
    pub fn capture_frame(&self, force: bool) -> Option<Arc<Frame>> {
        self.select_entry(force).map(|entry| entry.processed)
    }

    /// Newest buffered frame without waiting for a new one
    pub fn get_last_frame_from_buffer(&self) -> Option<Arc<Frame>> {
        self.shared.buffer.newest()
    }

    /// Restart the session and return its first frame
    ///
    /// Slow path for when the normal capture keeps returning nothing. The
    /// session is stopped, given time to settle, restarted on the same
    /// device, given time to settle again, and then its first frame is
    /// awaited. `high_quality` is accepted for API compatibility.
    pub fn capture_frame_alternative(&self, high_quality: bool) -> Option<Arc<Frame>> {
        let device_id = self.session.active_device()?;
        info!(device = %device_id, high_quality, "Restarting session for alternative capture");

        if let Err(e) = self.session.stop() {
            warn!(error = %e, "Failed to stop session for alternative capture");
            return None;
        }
        thread::sleep(self.config.restart_settle());

        let resolution = *self.resolution.lock();
        if let Err(e) = self.session.start(&device_id, resolution) {
            warn!(device = %device_id, error = %e, "Failed to restart session");
            return None;
        }
        thread::sleep(self.config.restart_settle());

        let buffer = &self.shared.buffer;
        let seen = buffer.generation();
        if let Some(frame) = buffer.newest() {
            return Some(frame);
        }
        let frame = buffer.wait_for_new(seen, self.config.restart_frame_timeout());
        if frame.is_none() {
            warn!(device = %device_id, "No frame after restart");
        }
        frame
    }

    /// Like [`Self::capture_frame`], rendered with `adjustments`
    ///
    /// The session's own adjustments are never modified: the buffered
    /// source frame is re-processed with the given values.
    pub fn capture_frame_with_adjustments(
        &self,
        adjustments: ImageAdjustments,
        force: bool,
    ) -> Option<Arc<Frame>> {
        let entry = self.select_entry(force)?;
        let white_balance = self.shared.settings.read().white_balance.gains();
        Some(Arc::new(self.processor.adjust(
            &entry.source,
            &adjustments,
            white_balance,
        )))
    }

    fn select_entry(&self, force: bool) -> Option<BufferedFrame> {
        if !self.session.is_active() {
            return None;
        }

        let (lock_timeout, wait) = if force {
            (capture::FORCED_LOCK_TIMEOUT, capture::FORCED_FRAME_WAIT)
        } else {
            (capture::LOCK_TIMEOUT, capture::FRAME_WAIT)
        };

        let buffer = &self.shared.buffer;
        let seen = buffer.generation();

        if let Some(ring) = buffer.try_lock_ring_for(lock_timeout) {
            if let Some(entry) = ring.newest()
                && (!force || entry.processed.age() < capture::STALE_FRAME_AGE)
            {
                return Some(entry.clone());
            }
        } else {
            debug!(force, "Frame buffer busy, waiting for next frame");
        }

        let started = Instant::now();
        if buffer.wait_for_new(seen, wait).is_some() {
            debug!(waited_ms = started.elapsed().as_millis() as u64, "Got fresh frame");
        }
        buffer.newest_entry()
    }

    // ===== Zoom =====

    pub fn zoom_level(&self) -> f32 {
        self.shared.buffer.zoom()
    }

    pub fn max_zoom_level(&self) -> f32 {
        self.config.max_zoom
    }

    /// Set digital zoom, clamped to [1, max]; returns the applied level
    pub fn set_zoom_level(&self, level: f32) -> CameraResult<f32> {
        if !level.is_finite() {
            return Err(CameraError::InvalidArgument(format!(
                "zoom level must be finite, got {}",
                level
            )));
        }
        let level = level.clamp(zoom::MIN_ZOOM, self.config.max_zoom);
        self.shared.buffer.set_zoom(level);
        debug!(level, "Zoom level set");
        Ok(level)
    }

    // ===== Adjustments =====

    /// Set white balance by name; unknown names select auto
    pub fn set_white_balance(&self, mode: &str) -> WhiteBalance {
        let white_balance = WhiteBalance::from_name(mode);
        self.shared.settings.write().white_balance = white_balance;
        info!(
            requested = mode,
            mode = %white_balance,
            temperature = ?white_balance.temperature(),
            "White balance set"
        );
        white_balance
    }

    pub fn white_balance(&self) -> WhiteBalance {
        self.shared.settings.read().white_balance
    }

    pub fn set_image_adjustments(&self, adjustments: ImageAdjustments) {
        self.shared.settings.write().adjustments = adjustments;
    }

    pub fn image_adjustments(&self) -> ImageAdjustments {
        self.shared.settings.read().adjustments
    }

    // ===== Resolution =====

    /// Resolution used for the next session start
    pub fn current_resolution(&self) -> Resolution {
        *self.resolution.lock()
    }

    /// Resolutions that can be requested
    ///
    /// Common presets while idle; with an active session, what the device
    /// reports merged with the presets, smallest first.
    pub fn available_resolutions(&self) -> Vec<Resolution> {
        let mut list = resolutions::COMMON.to_vec();
        if let Some(device_id) = self.session.active_device() {
            match self.backend.supported_resolutions(&device_id) {
                Ok(native) => list.extend(native),
                Err(e) => debug!(device = %device_id, error = %e, "Could not query resolutions"),
            }
        }
        list.sort();
        list.dedup();
        list
    }

    /// Pick the closest available resolution; restarts an active session
    pub fn set_resolution(&self, width: u32, height: u32) -> CameraResult<Resolution> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidArgument(format!(
                "invalid resolution {}x{}",
                width, height
            )));
        }
        let target = Resolution::new(width, height);
        let chosen = Resolution::closest(target, &self.available_resolutions()).unwrap_or(target);
        *self.resolution.lock() = chosen;
        info!(requested = %target, chosen = %chosen, "Resolution set");

        if let Some(device_id) = self.session.active_device() {
            self.session.start(&device_id, chosen)?;
        }
        Ok(chosen)
    }

    // ===== Permissions =====

    /// Camera access needs no runtime grant on this platform
    pub fn check_permission(&self) -> bool {
        true
    }

    pub fn request_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::synthetic::{Pattern, SyntheticBackend};
    use crate::frame_processor::FilterType;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            backend: CameraBackendType::Synthetic,
            default_resolution: resolutions::VGA,
            initial_frame_interval_ms: 16.0,
            restart_settle_ms: 20,
            restart_frame_timeout_ms: 1000,
            ..Config::default()
        }
    }

    fn manager_with(backend: SyntheticBackend) -> CameraManager {
        CameraManager::with_backend(test_config(), Arc::new(backend)).unwrap()
    }

    fn wait_for_frame(manager: &CameraManager) -> Arc<Frame> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(frame) = manager.capture_frame(true) {
                return frame;
            }
        }
        panic!("no frame within deadline");
    }

    #[test]
    fn test_capture_without_session() {
        let manager = manager_with(SyntheticBackend::new());
        assert!(manager.capture_frame(false).is_none());
        assert!(manager.capture_frame(true).is_none());
        assert!(manager.get_last_frame_from_buffer().is_none());
        assert!(manager.capture_frame_alternative(true).is_none());
        assert!(
            manager
                .capture_frame_with_adjustments(ImageAdjustments::default(), false)
                .is_none()
        );
    }

    #[test]
    fn test_unknown_device_rejected() {
        let manager = manager_with(SyntheticBackend::new());
        let result = manager.start_session("missing");
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
        assert_eq!(manager.session_state(), SessionState::Idle);
    }

    #[test]
    fn test_capture_returns_frame() {
        let manager = manager_with(SyntheticBackend::new());
        let format = manager.start_session("synthetic0").unwrap();
        assert_eq!(format.resolution, resolutions::VGA);

        let frame = wait_for_frame(&manager);
        assert_eq!(frame.resolution(), resolutions::VGA);
        assert!(manager.get_last_frame_from_buffer().is_some());
        assert!(manager.stats().frames_captured > 0);

        manager.stop_session().unwrap();
        assert!(manager.capture_frame(false).is_none());
        assert!(manager.get_last_frame_from_buffer().is_none());
    }

    #[test]
    fn test_zoom_clamped_and_keeps_size() {
        let manager = manager_with(SyntheticBackend::new());
        assert_eq!(manager.set_zoom_level(0.5).unwrap(), 1.0);
        assert_eq!(manager.set_zoom_level(50.0).unwrap(), manager.max_zoom_level());
        assert!(matches!(
            manager.set_zoom_level(f32::NAN),
            Err(CameraError::InvalidArgument(_))
        ));
        assert_eq!(manager.zoom_level(), manager.max_zoom_level());

        manager.set_zoom_level(2.0).unwrap();
        manager.start_session("synthetic0").unwrap();
        let frame = wait_for_frame(&manager);
        assert_eq!(frame.resolution(), resolutions::VGA);
        manager.stop_session().unwrap();
        assert_eq!(manager.zoom_level(), 2.0);
    }

    #[test]
    fn test_adjustment_override_leaves_session_settings() {
        let backend = SyntheticBackend::new().with_pattern(Pattern::Solid([10, 100, 200, 255]));
        let manager = manager_with(backend);
        manager.start_session("synthetic0").unwrap();
        wait_for_frame(&manager);

        let grayscale = ImageAdjustments::default().with_filter(FilterType::Grayscale);
        let frame = manager
            .capture_frame_with_adjustments(grayscale, true)
            .unwrap();
        let [b, g, r, _] = frame.pixel(3, 3);
        assert_eq!(b, g);
        assert_eq!(g, r);

        assert_eq!(manager.image_adjustments(), ImageAdjustments::default());
        let plain = wait_for_frame(&manager);
        assert_eq!(plain.pixel(3, 3), [10, 100, 200, 255]);
        manager.stop_session().unwrap();
    }

    #[test]
    fn test_alternative_capture_restarts() {
        let backend = SyntheticBackend::new();
        let controls = backend.controls();
        let manager = manager_with(backend);
        manager.start_session("synthetic1").unwrap();

        let frame = manager.capture_frame_alternative(false);
        assert!(frame.is_some());
        assert_eq!(controls.streams_opened(), 2);
        assert_eq!(controls.max_open_streams(), 1);
        assert_eq!(manager.active_device().as_deref(), Some("synthetic1"));
        manager.stop_session().unwrap();
    }

    #[test]
    fn test_buffer_empty_right_after_start() {
        let backend = SyntheticBackend::new();
        backend.controls().set_stalled(true);
        let manager = manager_with(backend);

        manager.start_session("synthetic0").unwrap();
        assert!(manager.is_session_active());
        assert!(manager.get_last_frame_from_buffer().is_none());
        manager.stop_session().unwrap();
    }

    #[test]
    fn test_white_balance_changes_published_pixels() {
        let backend = SyntheticBackend::new().with_pattern(Pattern::Solid([100, 100, 100, 255]));
        let manager = manager_with(backend);
        manager.set_white_balance("incandescent");
        manager.start_session("synthetic0").unwrap();

        let frame = wait_for_frame(&manager);
        let [b, g, r, a] = frame.pixel(10, 10);
        manager.stop_session().unwrap();

        // 2700 K boosts red relative to green and blue
        assert!(b < g, "pixel {:?}", [b, g, r, a]);
        assert!(g < r, "pixel {:?}", [b, g, r, a]);
        assert!(b < 100);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_white_balance_names() {
        let manager = manager_with(SyntheticBackend::new());
        assert_eq!(manager.set_white_balance("tungsten"), WhiteBalance::Incandescent);
        assert_eq!(manager.white_balance(), WhiteBalance::Incandescent);
        assert_eq!(manager.set_white_balance("bogus"), WhiteBalance::Auto);
    }

    #[test]
    fn test_set_resolution() {
        let manager = manager_with(SyntheticBackend::new());
        assert!(matches!(
            manager.set_resolution(0, 480),
            Err(CameraError::InvalidArgument(_))
        ));
        assert_eq!(manager.set_resolution(1280, 720).unwrap(), resolutions::HD);
        assert_eq!(manager.current_resolution(), resolutions::HD);

        manager.start_session("synthetic0").unwrap();
        manager.set_resolution(640, 480).unwrap();
        assert_eq!(
            manager.current_format().map(|f| f.resolution),
            Some(resolutions::VGA)
        );
        manager.stop_session().unwrap();
    }

    #[test]
    fn test_permissions_granted() {
        let manager = manager_with(SyntheticBackend::new());
        assert!(manager.check_permission());
        assert!(manager.request_permission());
    }
}
