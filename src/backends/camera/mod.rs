// SPDX-License-Identifier: GPL-3.0-only

//! Camera capture engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    CameraManager    │  ← Public operations, zoom, white balance
//! └──────────┬──────────┘
//!            │
//!     ┌──────┴─────────┐
//!     ▼                ▼
//! ┌──────────────┐ ┌──────────────┐
//! │DeviceRegistry│ │CaptureSession│ ← Lifecycle, capture thread
//! └──────────────┘ └──────┬───────┘
//!                         │
//!                         ▼
//!            ┌─────────────────────┐
//!            │ CameraBackend Trait │  ← Enumerate, open, read samples
//!            └──────────┬──────────┘
//!                  ┌────┴─────┐
//!                  ▼          ▼
//!               ┌────┐  ┌─────────┐
//!               │V4L2│  │Synthetic│
//!               └────┘  └─────────┘
//! ```

pub mod format_converters;
pub mod frame_buffer;
pub mod frame_loop;
pub mod manager;
pub mod registry;
pub mod session;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use frame_loop::StopSignal;
pub use manager::CameraManager;
pub use registry::DeviceRegistry;
pub use session::{CaptureSession, CaptureStats};
pub use types::*;

use crate::config::Config;
use crate::errors::BackendResult;
use std::sync::Arc;

/// Device backend contract
///
/// A backend enumerates devices and opens capture streams. Opening a
/// stream negotiates a format the engine can turn into BGRA; a backend that
/// cannot do so must release the device before returning the error.
pub trait CameraBackend: Send + Sync {
    /// Which backend this is
    fn backend_type(&self) -> CameraBackendType;

    /// Enumerate capture devices, in the backend's native order
    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>>;

    /// Resolutions the device reports, unsorted, possibly with duplicates
    fn supported_resolutions(&self, device_id: &str) -> BackendResult<Vec<Resolution>>;

    /// Open a device and negotiate a stream close to `resolution`
    ///
    /// # Returns
    /// * `Ok(stream)` - Device opened and streaming
    /// * `Err(BackendError::DeviceOpen)` - Device could not be opened
    /// * `Err(BackendError::FormatNegotiation)` - No BGRA-convertible format
    fn open_stream(
        &self,
        device_id: &str,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureStream>>;
}

/// An open, streaming device
///
/// Dropping the stream releases the device.
pub trait CaptureStream: Send {
    /// Negotiated format
    fn format(&self) -> CameraFormat;

    /// Block until the next sample arrives and return it as BGRA
    ///
    /// Implementations must return `BackendError::Interrupted` promptly once
    /// `stop` is set, even when the device has stopped producing samples.
    fn read_sample(&mut self, stop: &StopSignal) -> BackendResult<Frame>;
}

/// Create the backend selected in the configuration
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
    config: &Config,
) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new(
            config.stream_buffers,
            config.read_timeout(),
        )),
        CameraBackendType::Synthetic => Arc::new(synthetic::SyntheticBackend::new()),
    }
}
