// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::{CameraBackendType, Resolution};
use crate::constants::{capture, device, pacing, resolutions, zoom};
use crate::errors::{CameraError, CameraResult};
use crate::frame_processor::{ImageAdjustments, WhiteBalance};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "camera-access";
const CONFIG_FILE_NAME: &str = "config.json";

/// Engine configuration
///
/// Every field has a default, so partial files load fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device backend to use
    pub backend: CameraBackendType,
    /// Resolution requested when a session starts without one
    pub default_resolution: Resolution,
    /// Pacing interval for new sessions, in milliseconds
    pub initial_frame_interval_ms: f64,
    /// Let processing load adjust the pacing interval
    pub adaptive_quality: bool,
    /// Upper bound for digital zoom
    pub max_zoom: f32,
    /// Memory-mapped buffers requested from the device
    pub stream_buffers: u32,
    /// Poll timeout of a blocking device read, in milliseconds
    pub read_timeout_ms: u64,
    /// Pause around the restart in the alternative capture path
    pub restart_settle_ms: u64,
    /// Maximum wait for the first frame after a restart
    pub restart_frame_timeout_ms: u64,
    /// Adjustments applied when the engine starts
    pub adjustments: ImageAdjustments,
    pub white_balance: WhiteBalance,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            default_resolution: resolutions::DEFAULT,
            initial_frame_interval_ms: pacing::INITIAL_INTERVAL_MS,
            adaptive_quality: true,
            max_zoom: zoom::MAX_ZOOM,
            stream_buffers: device::STREAM_BUFFERS,
            read_timeout_ms: device::READ_TIMEOUT_MS,
            restart_settle_ms: capture::RESTART_SETTLE_MS,
            restart_frame_timeout_ms: capture::RESTART_FRAME_TIMEOUT_MS,
            adjustments: ImageAdjustments::default(),
            white_balance: WhiteBalance::default(),
        }
    }
}

impl Config {
    /// Default config file location, `~/.config/camera-access/config.json` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> CameraResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config.sanitized())
    }

    /// Load from the default location
    pub fn load_default() -> CameraResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> CameraResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Clamp values that would break the engine
    pub fn sanitized(mut self) -> Self {
        if !self.max_zoom.is_finite() || self.max_zoom < zoom::MIN_ZOOM {
            self.max_zoom = zoom::MIN_ZOOM;
        }
        if !self.initial_frame_interval_ms.is_finite() {
            self.initial_frame_interval_ms = pacing::INITIAL_INTERVAL_MS;
        }
        self.initial_frame_interval_ms = self
            .initial_frame_interval_ms
            .clamp(pacing::MIN_INTERVAL_MS, pacing::MAX_INTERVAL_MS);
        self.stream_buffers = self.stream_buffers.max(1);
        if self.default_resolution.width == 0 || self.default_resolution.height == 0 {
            self.default_resolution = resolutions::DEFAULT;
        }
        self
    }

    /// Check values a caller supplied directly
    pub fn validate(&self) -> CameraResult<()> {
        if self.default_resolution.width == 0 || self.default_resolution.height == 0 {
            return Err(CameraError::InvalidArgument(
                "default resolution must be non-zero".to_string(),
            ));
        }
        if !self.max_zoom.is_finite() || self.max_zoom < zoom::MIN_ZOOM {
            return Err(CameraError::InvalidArgument(format!(
                "max zoom must be at least {}",
                zoom::MIN_ZOOM
            )));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    pub fn restart_frame_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_frame_timeout_ms)
    }
}
