// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture engine

use thiserror::Error;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Result type alias for device backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the capture facade
#[derive(Debug, Error)]
pub enum CameraError {
    /// Device id is not in the registry
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),

    /// Device backend failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Operation requires an active session
    #[error("no active camera session")]
    NotActive,

    /// Caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read or written
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Error code reported to the method-dispatch layer
    pub fn code(&self) -> &'static str {
        match self {
            CameraError::InvalidArgument(_) => "INVALID_ARGS",
            _ => "CAMERA_ERROR",
        }
    }
}

/// Errors raised by a device backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Device could not be opened
    #[error("failed to open device {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    /// Device does not offer a format convertible to BGRA
    #[error("format negotiation failed for {device}: {reason}")]
    FormatNegotiation { device: String, reason: String },

    /// A sample read failed
    #[error("sample read failed: {0}")]
    Read(String),

    /// No sample arrived within the poll period
    #[error("timed out waiting for a sample")]
    Timeout,

    /// The read was abandoned because the session is stopping
    #[error("read interrupted by stop request")]
    Interrupted,

    /// Sample payload does not match the negotiated format
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Device enumeration failed
    #[error("device enumeration failed: {0}")]
    Enumeration(String),
}

impl From<serde_json::Error> for CameraError {
    fn from(err: serde_json::Error) -> Self {
        CameraError::Config(err.to_string())
    }
}
