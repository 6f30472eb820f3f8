// SPDX-License-Identifier: GPL-3.0-only

//! GPU context for the hardware frame path.
//!
//! A single device is created lazily the first time a frame asks for
//! hardware processing and shared for the rest of the process. When no
//! adapter is found (or the crate is built without the `gpu` feature) the
//! shared context is `None` and frames are processed in software.

use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "gpu")]
mod readback;

#[cfg(feature = "gpu")]
pub use readback::GpuContext;

/// wgpu instance used for frame readback, separate from any UI renderer
#[cfg(feature = "gpu")]
pub use wgpu_compute as wgpu;

/// Errors from the hardware frame path
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("hardware processing unavailable: {0}")]
    Unavailable(&'static str),
}

/// Shared context, initialized on first use
static SHARED_CONTEXT: OnceLock<Option<Arc<GpuContext>>> = OnceLock::new();

/// Get the process-wide GPU context, creating it on first call
pub fn shared_context() -> Option<Arc<GpuContext>> {
    SHARED_CONTEXT
        .get_or_init(|| match GpuContext::new() {
            Ok(context) => {
                info!(adapter = %context.adapter_name(), "GPU frame path available");
                Some(Arc::new(context))
            }
            Err(e) => {
                warn!(error = %e, "GPU frame path unavailable, using software processing");
                None
            }
        })
        .clone()
}

/// Placeholder context when built without GPU support
#[cfg(not(feature = "gpu"))]
#[derive(Debug)]
pub struct GpuContext {
    _private: (),
}

#[cfg(not(feature = "gpu"))]
impl GpuContext {
    pub fn new() -> Result<Self, GpuError> {
        Err(GpuError::Unavailable("built without the gpu feature"))
    }

    pub fn adapter_name(&self) -> &str {
        ""
    }

    pub fn round_trip(
        &self,
        _frame: &crate::backends::camera::types::Frame,
    ) -> Result<crate::backends::camera::types::Frame, GpuError> {
        Err(GpuError::Unavailable("built without the gpu feature"))
    }
}
