// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::buffer::BYTES_PER_PIXEL;
use crate::errors::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, Instant};

/// Where a camera sits relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
    External,
    #[default]
    Unknown,
}

impl CameraPosition {
    /// Guess the position from a device display name
    ///
    /// Backends rarely report a physical position, so the name is searched
    /// case-insensitively for hints like "front", "rear" or "usb".
    pub fn from_device_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("front") || lower.contains("internal") {
            CameraPosition::Front
        } else if lower.contains("back") || lower.contains("rear") {
            CameraPosition::Back
        } else if lower.contains("usb") || lower.contains("external") {
            CameraPosition::External
        } else {
            CameraPosition::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraPosition::Front => "front",
            CameraPosition::Back => "back",
            CameraPosition::External => "external",
            CameraPosition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Stable identifier, e.g. `/dev/video0`
    pub id: String,
    /// Human readable name
    pub name: String,
    /// First enumerated device
    pub is_default: bool,
    pub position: CameraPosition,
}

impl CameraDevice {
    /// Device with its position guessed from the name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            position: CameraPosition::from_device_name(&name),
            name,
            is_default: false,
        }
    }
}

/// Capture resolution
///
/// Resolutions order by pixel count, ties broken by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Pick the candidate whose pixel count is closest to `target`
    ///
    /// Returns `None` only when `candidates` is empty. On a tie the earlier
    /// candidate wins.
    pub fn closest(target: Resolution, candidates: &[Resolution]) -> Option<Resolution> {
        let target_pixels = target.pixel_count();
        candidates
            .iter()
            .copied()
            .min_by_key(|c| c.pixel_count().abs_diff(target_pixels))
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl Ord for Resolution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pixel_count()
            .cmp(&other.pixel_count())
            .then(self.width.cmp(&other.width))
    }
}

impl PartialOrd for Resolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout delivered by the device before conversion to BGRA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// 32-bit BGRA, passed through
    Bgra,
    /// 32-bit BGRX, alpha forced opaque
    Bgrx,
    /// Packed YUV 4:2:2
    Yuyv,
    /// Motion JPEG
    Mjpeg,
}

impl SourceFormat {
    pub fn fourcc(&self) -> &'static str {
        match self {
            SourceFormat::Bgra => "AR24",
            SourceFormat::Bgrx => "XR24",
            SourceFormat::Yuyv => "YUYV",
            SourceFormat::Mjpeg => "MJPG",
        }
    }
}

/// Negotiated stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub resolution: Resolution,
    pub source: SourceFormat,
}

impl fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resolution, self.source.fourcc())
    }
}

/// A single BGRA frame
///
/// Rows are tightly packed, so `stride == width * 4`. Frames handed to
/// consumers are shared behind `Arc` and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub captured_at: Instant,
}

impl Frame {
    /// Wrap a BGRA buffer, checking its length against the dimensions
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> BackendResult<Self> {
        Self::with_timestamp(data, width, height, Instant::now())
    }

    pub fn with_timestamp(
        data: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: Instant,
    ) -> BackendResult<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(BackendError::InvalidFrame(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            stride: width * BYTES_PER_PIXEL as u32,
            captured_at,
        })
    }

    /// Frame of a single BGRA color
    pub fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let data = bgra.repeat(width as usize * height as usize);
        Self {
            data,
            width,
            height,
            stride: width * BYTES_PER_PIXEL as u32,
            captured_at: Instant::now(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Time since the frame was captured
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    /// BGRA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = y as usize * self.stride as usize + x as usize * BYTES_PER_PIXEL;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Device backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices
    #[default]
    V4l2,
    /// Generated test pattern, no hardware needed
    Synthetic,
}

impl CameraBackendType {
    pub const ALL: [CameraBackendType; 2] = [CameraBackendType::V4l2, CameraBackendType::Synthetic];

    pub fn display_name(&self) -> &'static str {
        match self {
            CameraBackendType::V4l2 => "V4L2",
            CameraBackendType::Synthetic => "Synthetic",
        }
    }
}

impl fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v4l2" | "v4l" => Ok(CameraBackendType::V4l2),
            "synthetic" | "test" => Ok(CameraBackendType::Synthetic),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Starting = 1,
    Active = 2,
    Stopping = 3,
}

impl SessionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Starting,
            2 => SessionState::Active,
            3 => SessionState::Stopping,
            _ => SessionState::Idle,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_name() {
        assert_eq!(
            CameraPosition::from_device_name("Integrated Front Camera"),
            CameraPosition::Front
        );
        assert_eq!(
            CameraPosition::from_device_name("Internal Webcam"),
            CameraPosition::Front
        );
        assert_eq!(
            CameraPosition::from_device_name("REAR sensor"),
            CameraPosition::Back
        );
        assert_eq!(
            CameraPosition::from_device_name("Logitech USB Camera"),
            CameraPosition::External
        );
        assert_eq!(
            CameraPosition::from_device_name("HD Pro Webcam C920"),
            CameraPosition::Unknown
        );
    }

    #[test]
    fn test_resolution_ordering() {
        let mut list = vec![
            Resolution::new(1920, 1080),
            Resolution::new(640, 480),
            Resolution::new(1280, 720),
        ];
        list.sort();
        assert_eq!(
            list,
            vec![
                Resolution::new(640, 480),
                Resolution::new(1280, 720),
                Resolution::new(1920, 1080)
            ]
        );
    }

    #[test]
    fn test_closest_resolution() {
        let candidates = [
            Resolution::new(640, 480),
            Resolution::new(1280, 720),
            Resolution::new(1920, 1080),
        ];
        assert_eq!(
            Resolution::closest(Resolution::new(1280, 800), &candidates),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(
            Resolution::closest(Resolution::new(100, 100), &candidates),
            Some(Resolution::new(640, 480))
        );
        assert_eq!(Resolution::closest(Resolution::new(1, 1), &[]), None);
    }

    #[test]
    fn test_frame_length_validation() {
        assert!(Frame::new(vec![0; 16], 2, 2).is_ok());
        assert!(Frame::new(vec![0; 15], 2, 2).is_err());
        assert!(Frame::new(Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_frame_stride_and_pixel() {
        let frame = Frame::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(frame.stride, 12);
        assert_eq!(frame.pixel(2, 1), [1, 2, 3, 4]);
    }

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("V4L2".parse::<CameraBackendType>(), Ok(CameraBackendType::V4l2));
        assert_eq!(
            "synthetic".parse::<CameraBackendType>(),
            Ok(CameraBackendType::Synthetic)
        );
        assert!("pipewire".parse::<CameraBackendType>().is_err());
    }

    #[test]
    fn test_session_state_roundtrip() {
        for state in [
            SessionState::Idle,
            SessionState::Starting,
            SessionState::Active,
            SessionState::Stopping,
        ] {
            assert_eq!(SessionState::from_u8(state as u8), state);
        }
    }
}
