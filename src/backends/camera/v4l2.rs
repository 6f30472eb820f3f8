// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 capture backend
//!
//! Streams are memory-mapped with a poll timeout so a blocked read can
//! notice a stop request. Formats are tried in order of conversion cost:
//! native BGRA, BGRX, YUYV, then MJPG.

use super::format_converters::to_bgra;
use super::frame_loop::StopSignal;
use super::types::{CameraBackendType, CameraDevice, CameraFormat, Frame, Resolution, SourceFormat};
use super::{CameraBackend, CaptureStream};
use crate::constants::resolutions;
use crate::errors::{BackendError, BackendResult};
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as _;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Pixel formats the engine can convert, preferred first
const NEGOTIATION_ORDER: [SourceFormat; 4] = [
    SourceFormat::Bgra,
    SourceFormat::Bgrx,
    SourceFormat::Yuyv,
    SourceFormat::Mjpeg,
];

fn fourcc_for(source: SourceFormat) -> FourCC {
    FourCC::new(match source {
        SourceFormat::Bgra => b"AR24",
        SourceFormat::Bgrx => b"XR24",
        SourceFormat::Yuyv => b"YUYV",
        SourceFormat::Mjpeg => b"MJPG",
    })
}

fn source_for(fourcc: FourCC) -> Option<SourceFormat> {
    NEGOTIATION_ORDER
        .into_iter()
        .find(|source| fourcc_for(*source) == fourcc)
}

/// Common presets that fit inside a stepwise frame size range
fn presets_within(min: Resolution, max: Resolution) -> Vec<Resolution> {
    resolutions::COMMON
        .into_iter()
        .filter(|r| {
            r.width >= min.width
                && r.width <= max.width
                && r.height >= min.height
                && r.height <= max.height
        })
        .collect()
}

pub struct V4l2Backend {
    buffer_count: u32,
    read_timeout: Duration,
}

impl V4l2Backend {
    pub fn new(buffer_count: u32, read_timeout: Duration) -> Self {
        Self {
            buffer_count: buffer_count.max(1),
            read_timeout,
        }
    }

    fn open_device(device_id: &str) -> BackendResult<Device> {
        Device::with_path(device_id).map_err(|e| BackendError::DeviceOpen {
            device: device_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Try each convertible format at the requested size
    fn negotiate(
        device: &Device,
        device_id: &str,
        resolution: Resolution,
    ) -> BackendResult<(Format, SourceFormat)> {
        for source in NEGOTIATION_ORDER {
            let fourcc = fourcc_for(source);
            let requested = Format::new(resolution.width, resolution.height, fourcc);
            match device.set_format(&requested) {
                Ok(actual) if actual.fourcc == fourcc => return Ok((actual, source)),
                Ok(actual) => {
                    debug!(
                        device = device_id,
                        requested = %fourcc,
                        got = %actual.fourcc,
                        "Driver substituted format"
                    );
                }
                Err(e) => {
                    debug!(device = device_id, fourcc = %fourcc, error = %e, "Format rejected");
                }
            }
        }

        Err(BackendError::FormatNegotiation {
            device: device_id.to_string(),
            reason: "no BGRA-convertible pixel format accepted".to_string(),
        })
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let mut cameras = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();
            let Ok(device) = Device::with_path(&path) else {
                debug!(path = %path, "Skipping device that cannot be opened");
                continue;
            };
            let Ok(caps) = device.query_caps() else {
                continue;
            };
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }
            // Metadata nodes advertise capture but list no pixel formats
            let has_formats = device
                .enum_formats()
                .map(|formats| !formats.is_empty())
                .unwrap_or(false);
            if !has_formats {
                continue;
            }

            let name = node.name().unwrap_or(caps.card);
            cameras.push(CameraDevice::new(path, name));
        }

        info!(count = cameras.len(), "Enumerated V4L2 cameras");
        Ok(cameras)
    }

    fn supported_resolutions(&self, device_id: &str) -> BackendResult<Vec<Resolution>> {
        let device = Self::open_device(device_id)?;
        let formats = device
            .enum_formats()
            .map_err(|e| BackendError::Enumeration(e.to_string()))?;

        let mut found = Vec::new();
        for description in formats {
            if source_for(description.fourcc).is_none() {
                continue;
            }
            let Ok(sizes) = device.enum_framesizes(description.fourcc) else {
                continue;
            };
            for size in sizes {
                match size.size {
                    v4l::framesize::FrameSizeEnum::Discrete(discrete) => {
                        found.push(Resolution::new(discrete.width, discrete.height));
                    }
                    v4l::framesize::FrameSizeEnum::Stepwise(step) => {
                        found.extend(presets_within(
                            Resolution::new(step.min_width, step.min_height),
                            Resolution::new(step.max_width, step.max_height),
                        ));
                    }
                }
            }
        }
        Ok(found)
    }

    fn open_stream(
        &self,
        device_id: &str,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        let device = Self::open_device(device_id)?;
        let (format, source) = Self::negotiate(&device, device_id, resolution)?;

        info!(
            device = device_id,
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "V4L2 format configured"
        );

        let mut stream = Stream::with_buffers(&device, Type::VideoCapture, self.buffer_count)
            .map_err(|e| BackendError::DeviceOpen {
                device: device_id.to_string(),
                reason: format!("failed to create stream: {}", e),
            })?;
        stream.set_timeout(self.read_timeout);

        Ok(Box::new(V4l2Stream {
            stream,
            _device: device,
            format: CameraFormat {
                resolution: Resolution::new(format.width, format.height),
                source,
            },
            stride: format.stride,
        }))
    }
}

/// Open V4L2 stream; the device closes when this is dropped
struct V4l2Stream {
    stream: Stream<'static>,
    _device: Device,
    format: CameraFormat,
    stride: u32,
}

impl CaptureStream for V4l2Stream {
    fn format(&self) -> CameraFormat {
        self.format
    }

    fn read_sample(&mut self, stop: &StopSignal) -> BackendResult<Frame> {
        let Resolution { width, height } = self.format.resolution;
        loop {
            if stop.is_set() {
                return Err(BackendError::Interrupted);
            }

            match self.stream.next() {
                Ok((buf, meta)) => {
                    let used = meta.bytesused as usize;
                    let data = if used > 0 && used <= buf.len() {
                        &buf[..used]
                    } else {
                        buf
                    };
                    let bgra = to_bgra(self.format.source, data, width, height, self.stride)?;
                    return Frame::new(bgra, width, height);
                }
                // Poll timeout, check the stop signal again
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!(error = %e, "Failed to dequeue V4L2 buffer");
                    return Err(BackendError::Read(e.to_string()));
                }
            }
        }
    }
}
