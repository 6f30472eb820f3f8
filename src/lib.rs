// SPDX-License-Identifier: GPL-3.0-only

//! Camera Access - a concurrent camera capture engine
//!
//! This library enumerates capture devices, runs one capture session at a
//! time on a dedicated thread and hands processed BGRA frames to callers on
//! demand.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Device backends, capture session and the [`CameraManager`] facade
//! - [`frame_processor`]: Zoom, tone, white balance and filters
//! - [`quality`]: Adaptive frame pacing
//! - [`gpu`]: Optional hardware frame path
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```no_run
//! use camera_access::{CameraManager, Config};
//!
//! let manager = CameraManager::new(Config::default())?;
//! if let Some(camera) = manager.available_cameras().first() {
//!     manager.start_session(&camera.id)?;
//!     let frame = manager.capture_frame(true);
//!     manager.stop_session()?;
//! }
//! # Ok::<(), camera_access::CameraError>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod gpu;
pub mod quality;

// Re-export commonly used types
pub use backends::camera::{
    CameraBackendType, CameraDevice, CameraFormat, CameraManager, CaptureStats, Frame,
    Resolution, SessionState,
};
pub use config::Config;
pub use errors::{BackendError, CameraError, CameraResult};
pub use frame_processor::{FilterType, ImageAdjustments, WhiteBalance};
