// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle and the capture worker
//!
//! A session moves through `Idle → Starting → Active → Stopping → Idle`.
//! Every transition happens under the lifecycle lock; the current state is
//! mirrored in an atomic so readers never take that lock.
//!
//! While Active, one worker thread owns the device stream. It paces reads
//! using the [`QualityController`] interval, runs each sample through the
//! [`FrameProcessor`] and publishes the result to the shared
//! [`FrameBuffer`]. Stopping joins the worker, which drops the stream and
//! releases the device before `stop` returns.

use super::frame_buffer::{BufferedFrame, FrameBuffer};
use super::frame_loop::{CaptureLoopController, LoopAction, StopSignal};
use super::types::{CameraFormat, Frame, Resolution, SessionState};
use super::{CameraBackend, CaptureStream};
use crate::constants::device::{CAPTURE_THREAD_NAME, CAPTURE_THREAD_NICE};
use crate::errors::{BackendError, CameraResult};
use crate::frame_processor::{FrameProcessor, ImageAdjustments, WhiteBalance};
use crate::quality::QualityController;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Adjustments applied to every captured frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessingSettings {
    pub adjustments: ImageAdjustments,
    pub white_balance: WhiteBalance,
}

/// Snapshot of capture counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub read_failures: u64,
    /// Current pacing interval in milliseconds
    pub interval_ms: f64,
}

#[derive(Debug, Default)]
struct CaptureCounters {
    frames: AtomicU64,
    failures: AtomicU64,
    /// f64 bits of the pacing interval in milliseconds
    interval_bits: AtomicU64,
}

/// State shared between the session, its worker and the facade
#[derive(Debug)]
pub struct SessionShared {
    pub buffer: FrameBuffer,
    pub settings: RwLock<ProcessingSettings>,
    counters: CaptureCounters,
}

impl SessionShared {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self {
            buffer: FrameBuffer::new(),
            settings: RwLock::new(settings),
            counters: CaptureCounters::default(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.counters.frames.load(Ordering::Relaxed),
            read_failures: self.counters.failures.load(Ordering::Relaxed),
            interval_ms: f64::from_bits(self.counters.interval_bits.load(Ordering::Relaxed)),
        }
    }

    fn publish_interval(&self, interval_ms: f64) {
        self.counters
            .interval_bits
            .store(interval_ms.to_bits(), Ordering::Relaxed);
    }
}

/// Pacing settings for new sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub initial_interval_ms: f64,
    pub adaptive: bool,
}

struct SessionInner {
    controller: Option<CaptureLoopController>,
    device_id: Option<String>,
    format: Option<CameraFormat>,
}

pub struct CaptureSession {
    backend: Arc<dyn CameraBackend>,
    shared: Arc<SessionShared>,
    processor: FrameProcessor,
    pacing: PacingConfig,
    state: AtomicU8,
    /// Lifecycle lock
    inner: Mutex<SessionInner>,
}

impl CaptureSession {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        shared: Arc<SessionShared>,
        processor: FrameProcessor,
        pacing: PacingConfig,
    ) -> Self {
        let initial = QualityController::new(pacing.initial_interval_ms, pacing.adaptive);
        shared.publish_interval(initial.interval_ms());
        Self {
            backend,
            shared,
            processor,
            pacing,
            state: AtomicU8::new(SessionState::Idle as u8),
            inner: Mutex::new(SessionInner {
                controller: None,
                device_id: None,
                format: None,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    fn set_state(&self, state: SessionState) {
        debug!(%state, "Session state change");
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Id of the device being captured, if Active
    pub fn active_device(&self) -> Option<String> {
        self.inner.lock().device_id.clone()
    }

    /// Format negotiated for the active session
    pub fn format(&self) -> Option<CameraFormat> {
        self.inner.lock().format
    }

    /// Open `device_id` and start the capture worker
    ///
    /// An existing session is stopped first inside the same critical
    /// section. On failure the session is left Idle with nothing open.
    pub fn start(&self, device_id: &str, resolution: Resolution) -> CameraResult<CameraFormat> {
        let mut inner = self.inner.lock();
        self.stop_locked(&mut inner);
        self.set_state(SessionState::Starting);

        let stream = match self.backend.open_stream(device_id, resolution) {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(SessionState::Idle);
                return Err(e.into());
            }
        };
        let format = stream.format();

        let worker = CaptureWorker {
            stream,
            quality: QualityController::new(self.pacing.initial_interval_ms, self.pacing.adaptive),
            processor: self.processor.clone(),
            shared: Arc::clone(&self.shared),
            last_accept: None,
        };
        self.shared.publish_interval(worker.quality.interval_ms());

        let controller = CaptureLoopController::start_with_init(
            CAPTURE_THREAD_NAME,
            move || {
                elevate_thread_priority();
                Ok(worker)
            },
            |worker, stop| worker.step(stop),
        );

        let controller = match controller {
            Ok(controller) => controller,
            Err(e) => {
                self.set_state(SessionState::Idle);
                return Err(e.into());
            }
        };

        inner.controller = Some(controller);
        inner.device_id = Some(device_id.to_string());
        inner.format = Some(format);
        self.set_state(SessionState::Active);

        info!(device = device_id, %format, "Capture session started");
        Ok(format)
    }

    /// Stop the session and wait for the worker to exit
    ///
    /// Idempotent. Buffered frames are discarded.
    pub fn stop(&self) -> CameraResult<()> {
        let mut inner = self.inner.lock();
        self.stop_locked(&mut inner);
        Ok(())
    }

    fn stop_locked(&self, inner: &mut SessionInner) {
        if inner.controller.is_none() && self.state() == SessionState::Idle {
            return;
        }

        self.set_state(SessionState::Stopping);
        if let Some(mut controller) = inner.controller.take() {
            controller.stop();
        }
        if let Some(device_id) = inner.device_id.take() {
            info!(device = %device_id, "Capture session stopped");
        }
        inner.format = None;
        self.shared.buffer.clear();
        self.set_state(SessionState::Idle);
    }
}

/// State owned by the capture thread
struct CaptureWorker {
    stream: Box<dyn CaptureStream>,
    quality: QualityController,
    processor: FrameProcessor,
    shared: Arc<SessionShared>,
    last_accept: Option<Instant>,
}

impl CaptureWorker {
    fn step(&mut self, stop: &StopSignal) -> LoopAction {
        let interval = self.quality.interval();
        if let Some(last) = self.last_accept {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
                return LoopAction::Continue;
            }
        }

        // The interval runs from the start of one accepted read to the next
        let tick = Instant::now();
        match self.stream.read_sample(stop) {
            Ok(raw) => self.accept(raw, tick),
            Err(BackendError::Interrupted) => {}
            Err(e) => {
                self.shared.counters.failures.fetch_add(1, Ordering::Relaxed);
                trace!(error = %e, "Skipping failed sample");
            }
        }
        LoopAction::Continue
    }

    fn accept(&mut self, raw: Frame, tick: Instant) {
        let started = Instant::now();
        let zoom = self.shared.buffer.zoom();
        let settings = *self.shared.settings.read();
        let processed = self.processor.process(
            raw,
            zoom,
            &settings.adjustments,
            settings.white_balance.gains(),
        );

        self.quality.record(started.elapsed());
        self.shared.publish_interval(self.quality.interval_ms());

        self.shared.buffer.publish(BufferedFrame {
            processed: Arc::new(processed.output),
            source: Arc::new(processed.source),
        });
        self.shared.counters.frames.fetch_add(1, Ordering::Relaxed);
        self.last_accept = Some(tick);
    }
}

/// Raise the scheduling priority of the calling thread
#[cfg(target_os = "linux")]
fn elevate_thread_priority() {
    // On Linux the nice value of PRIO_PROCESS 0 applies to the calling thread
    let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, CAPTURE_THREAD_NICE) };
    if result != 0 {
        debug!(
            error = %std::io::Error::last_os_error(),
            "Could not raise capture thread priority"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn elevate_thread_priority() {
    debug!(nice = CAPTURE_THREAD_NICE, "Thread priority unchanged on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::synthetic::SyntheticBackend;
    use crate::constants::resolutions;
    use std::time::Duration;

    fn session_with(backend: SyntheticBackend) -> CaptureSession {
        session_with_pacing(
            backend,
            PacingConfig {
                initial_interval_ms: 16.0,
                adaptive: true,
            },
        )
    }

    fn session_with_pacing(backend: SyntheticBackend, pacing: PacingConfig) -> CaptureSession {
        CaptureSession::new(
            Arc::new(backend),
            Arc::new(SessionShared::new(ProcessingSettings::default())),
            FrameProcessor::software_only(),
            pacing,
        )
    }

    const STATE_POLL: Duration = Duration::from_millis(5);

    fn wait_for_frame(session: &CaptureSession) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if session.shared.buffer.has_frame() {
                return true;
            }
            thread::sleep(STATE_POLL);
        }
        false
    }

    #[test]
    fn test_start_and_stop() {
        let session = session_with(SyntheticBackend::new());
        assert_eq!(session.state(), SessionState::Idle);

        let format = session.start("synthetic0", resolutions::VGA).unwrap();
        assert_eq!(format.resolution, resolutions::VGA);
        assert!(session.is_active());
        assert_eq!(session.active_device().as_deref(), Some("synthetic0"));
        assert!(wait_for_frame(&session));

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.shared.buffer.has_frame());
        assert_eq!(session.shared.buffer.ring_len(), 0);
    }

    #[test]
    fn test_stop_when_idle_is_ok() {
        let session = session_with(SyntheticBackend::new());
        assert!(session.stop().is_ok());
        assert!(session.stop().is_ok());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_open_failure_leaves_idle() {
        let backend = SyntheticBackend::new().with_unsupported_format("synthetic1");
        let controls = backend.controls();
        let session = session_with(backend);

        let result = session.start("synthetic1", resolutions::VGA);
        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(controls.open_streams(), 0);
    }

    #[test]
    fn test_restart_stops_previous_stream() {
        let backend = SyntheticBackend::new();
        let controls = backend.controls();
        let session = session_with(backend);

        session.start("synthetic0", resolutions::VGA).unwrap();
        session.start("synthetic1", resolutions::HD).unwrap();
        assert_eq!(controls.max_open_streams(), 1);
        assert_eq!(session.active_device().as_deref(), Some("synthetic1"));

        session.stop().unwrap();
        assert_eq!(controls.open_streams(), 0);
    }

    #[test]
    fn test_stop_with_stalled_device() {
        let backend = SyntheticBackend::new();
        let controls = backend.controls();
        let session = session_with(backend);

        session.start("synthetic0", resolutions::VGA).unwrap();
        controls.set_stalled(true);
        thread::sleep(Duration::from_millis(30));

        let started = Instant::now();
        session.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(controls.open_streams(), 0);
    }

    #[test]
    fn test_read_failures_are_skipped() {
        let backend = SyntheticBackend::new();
        let controls = backend.controls();
        controls.set_fail_reads(true);
        let session = session_with(backend);

        session.start("synthetic0", resolutions::VGA).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(session.is_active());
        assert!(session.shared.stats().read_failures > 0);
        assert!(!session.shared.buffer.has_frame());

        controls.set_fail_reads(false);
        assert!(wait_for_frame(&session));
        session.stop().unwrap();
    }

    #[test]
    fn test_interval_paced_from_read_start() {
        let backend = SyntheticBackend::new().with_resolutions(vec![Resolution::new(8, 8)]);
        let controls = backend.controls();
        controls.set_read_delay(Duration::from_millis(15));
        let session = session_with_pacing(
            backend,
            PacingConfig {
                initial_interval_ms: 20.0,
                adaptive: false,
            },
        );

        session.start("synthetic0", Resolution::new(8, 8)).unwrap();
        assert!(wait_for_frame(&session));
        let first = session.shared.stats().frames_captured;
        thread::sleep(Duration::from_secs(1));
        let captured = session.shared.stats().frames_captured - first;
        session.stop().unwrap();

        // Paced at 20 ms this is about 50 frames; adding the 15 ms read
        // on top of the interval would give about 28
        assert!(captured >= 40, "captured {} frames in 1s", captured);
        assert!(captured <= 55, "captured {} frames in 1s", captured);
    }
}
