// SPDX-License-Identifier: GPL-3.0-only

//! Generated test-pattern backend
//!
//! Produces BGRA frames without hardware. A shared [`SyntheticControls`]
//! handle lets callers inject read failures, stall the device, slow it
//! down or make it refuse to open, and records how many streams are open
//! at once.

use super::frame_loop::StopSignal;
use super::types::{CameraBackendType, CameraDevice, CameraFormat, Frame, Resolution, SourceFormat};
use super::{CameraBackend, CaptureStream};
use crate::constants::resolutions;
use crate::errors::{BackendError, BackendResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Poll period while stalled
const STALL_POLL: Duration = Duration::from_millis(2);

/// Image content of generated frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Diagonal gradient that shifts every frame
    Gradient,
    /// Every pixel the same BGRA value
    Solid([u8; 4]),
}

/// Runtime knobs and counters shared with open streams
#[derive(Debug, Default)]
pub struct SyntheticControls {
    fail_reads: AtomicBool,
    stalled: AtomicBool,
    fail_open: AtomicBool,
    read_delay_us: AtomicU64,
    open_streams: AtomicUsize,
    max_open_streams: AtomicUsize,
    streams_opened: AtomicUsize,
    frames_produced: AtomicU64,
}

impl SyntheticControls {
    /// Make every read fail until cleared
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Block reads until cleared or the session stops
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Refuse to open any device
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Time each read takes before returning a frame
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_us
            .store(delay.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open streams seen
    pub fn max_open_streams(&self) -> usize {
        self.max_open_streams.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced.load(Ordering::SeqCst)
    }

    fn read_delay(&self) -> Duration {
        Duration::from_micros(self.read_delay_us.load(Ordering::SeqCst))
    }
}

/// Backend producing generated frames
pub struct SyntheticBackend {
    devices: Vec<CameraDevice>,
    resolutions: Vec<Resolution>,
    unsupported: HashSet<String>,
    pattern: Pattern,
    controls: Arc<SyntheticControls>,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticBackend {
    /// Two devices, VGA and HD, gradient pattern, ~200 samples per second
    pub fn new() -> Self {
        let controls = Arc::new(SyntheticControls::default());
        controls.set_read_delay(Duration::from_millis(5));
        Self {
            devices: vec![
                CameraDevice::new("synthetic0", "Synthetic Front Camera"),
                CameraDevice::new("synthetic1", "Synthetic USB Camera"),
            ],
            resolutions: vec![resolutions::VGA, resolutions::HD],
            unsupported: HashSet::new(),
            pattern: Pattern::Gradient,
            controls,
        }
    }

    /// Replace the device list
    pub fn with_devices(mut self, devices: Vec<CameraDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_resolutions(mut self, resolutions: Vec<Resolution>) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Device opens but offers no BGRA-convertible format
    pub fn with_unsupported_format(mut self, device_id: &str) -> Self {
        self.unsupported.insert(device_id.to_string());
        self
    }

    pub fn controls(&self) -> Arc<SyntheticControls> {
        Arc::clone(&self.controls)
    }
}

impl CameraBackend for SyntheticBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        Ok(self.devices.clone())
    }

    fn supported_resolutions(&self, device_id: &str) -> BackendResult<Vec<Resolution>> {
        if !self.devices.iter().any(|d| d.id == device_id) {
            return Err(BackendError::DeviceOpen {
                device: device_id.to_string(),
                reason: "no such device".to_string(),
            });
        }
        Ok(self.resolutions.clone())
    }

    fn open_stream(
        &self,
        device_id: &str,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        if self.controls.fail_open.load(Ordering::SeqCst)
            || !self.devices.iter().any(|d| d.id == device_id)
        {
            return Err(BackendError::DeviceOpen {
                device: device_id.to_string(),
                reason: "device unavailable".to_string(),
            });
        }
        if self.unsupported.contains(device_id) {
            return Err(BackendError::FormatNegotiation {
                device: device_id.to_string(),
                reason: "device only offers unsupported formats".to_string(),
            });
        }

        let resolution = Resolution::closest(resolution, &self.resolutions).unwrap_or(resolution);
        let open = self.controls.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.controls.max_open_streams.fetch_max(open, Ordering::SeqCst);
        self.controls.streams_opened.fetch_add(1, Ordering::SeqCst);

        debug!(device = device_id, %resolution, "Synthetic stream opened");

        Ok(Box::new(SyntheticStream {
            format: CameraFormat {
                resolution,
                source: SourceFormat::Bgra,
            },
            pattern: self.pattern,
            sequence: 0,
            controls: Arc::clone(&self.controls),
        }))
    }
}

struct SyntheticStream {
    format: CameraFormat,
    pattern: Pattern,
    sequence: u32,
    controls: Arc<SyntheticControls>,
}

impl SyntheticStream {
    fn render(&self) -> Vec<u8> {
        let Resolution { width, height } = self.format.resolution;
        match self.pattern {
            Pattern::Solid(bgra) => bgra.repeat(width as usize * height as usize),
            Pattern::Gradient => {
                let mut data = Vec::with_capacity(width as usize * height as usize * 4);
                for y in 0..height {
                    for x in 0..width {
                        let b = (x.wrapping_add(self.sequence) & 0xff) as u8;
                        let g = (y & 0xff) as u8;
                        let r = (((x + y) / 2) & 0xff) as u8;
                        data.extend_from_slice(&[b, g, r, 255]);
                    }
                }
                data
            }
        }
    }
}

impl CaptureStream for SyntheticStream {
    fn format(&self) -> CameraFormat {
        self.format
    }

    fn read_sample(&mut self, stop: &StopSignal) -> BackendResult<Frame> {
        while self.controls.stalled.load(Ordering::SeqCst) {
            if stop.is_set() {
                return Err(BackendError::Interrupted);
            }
            thread::sleep(STALL_POLL);
        }

        let delay = self.controls.read_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if stop.is_set() {
            return Err(BackendError::Interrupted);
        }
        if self.controls.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Read("injected failure".to_string()));
        }

        self.sequence = self.sequence.wrapping_add(1);
        self.controls.frames_produced.fetch_add(1, Ordering::SeqCst);
        let Resolution { width, height } = self.format.resolution;
        Frame::new(self.render(), width, height)
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.controls.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
