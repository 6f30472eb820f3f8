// SPDX-License-Identifier: GPL-3.0-only

//! Texture upload, on-GPU copy and staging readback of BGRA frames

use super::{GpuError, wgpu};
use crate::backends::camera::types::Frame;
use tracing::{debug, info};

/// wgpu device and queue used by the hardware frame path
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    backend: wgpu::Backend,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter_name", &self.adapter_name)
            .field("backend", &self.backend)
            .finish()
    }
}

impl GpuContext {
    /// Create a device on the first high-performance adapter
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GpuError::NoAdapter(e.to_string()))?;

        let adapter_info = adapter.get_info();
        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU adapter selected for frame processing"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("camera_access_frame_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))
        .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter_name: adapter_info.name,
            backend: adapter_info.backend,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Run a frame through the GPU and back
    ///
    /// The frame is uploaded into a BGRA texture, copied into a second
    /// texture and read back through a staging buffer. No transform is
    /// applied on the device, so the returned pixels equal the input.
    pub fn round_trip(&self, frame: &Frame) -> Result<Frame, GpuError> {
        let width = frame.width;
        let height = frame.height;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let source = self.create_frame_texture("frame_source", size);
        let target = self.create_frame_texture("frame_target", size);

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.stride),
                rows_per_image: Some(height),
            },
            size,
        );

        let padded_bytes_per_row = (width * 4 + 255) & !255; // Align to 256 bytes

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_staging"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_readback_encoder"),
            });

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            size,
        );

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            size,
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

        pollster::block_on(receiver)
            .map_err(|_| GpuError::Readback("mapping callback dropped".to_string()))?
            .map_err(|e| GpuError::Readback(format!("failed to map buffer: {:?}", e)))?;

        let row_bytes = (width * 4) as usize;
        let data = buffer_slice.get_mapped_range();
        let mut output = Vec::with_capacity(row_bytes * height as usize);

        if padded_bytes_per_row as usize == row_bytes {
            output.extend_from_slice(&data[..row_bytes * height as usize]);
        } else {
            for row in 0..height as usize {
                let start = row * padded_bytes_per_row as usize;
                output.extend_from_slice(&data[start..start + row_bytes]);
            }
        }

        drop(data);
        staging_buffer.unmap();

        debug!(width, height, "Frame read back from GPU");

        Frame::with_timestamp(output, width, height, frame.captured_at)
            .map_err(|e| GpuError::Readback(e.to_string()))
    }

    fn create_frame_texture(&self, label: &str, size: wgpu::Extent3d) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }
}
