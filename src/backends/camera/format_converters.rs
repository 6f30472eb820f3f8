// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion to tightly packed BGRA
//!
//! Devices deliver whatever layout they negotiated; every converter here
//! produces `width * height * 4` bytes in B, G, R, A order.

use super::types::SourceFormat;
use crate::errors::{BackendError, BackendResult};

/// Convert a raw device sample to BGRA
///
/// `stride` is the device's bytes per line; rows are repacked when it
/// exceeds the packed width.
pub fn to_bgra(
    source: SourceFormat,
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> BackendResult<Vec<u8>> {
    match source {
        SourceFormat::Bgra => repack_rows(data, width, height, stride, width * 4),
        SourceFormat::Bgrx => {
            let mut bgra = repack_rows(data, width, height, stride, width * 4)?;
            for pixel in bgra.chunks_exact_mut(4) {
                pixel[3] = 255;
            }
            Ok(bgra)
        }
        SourceFormat::Yuyv => {
            let packed = repack_rows(data, width, height, stride, width * 2)?;
            Ok(yuyv_to_bgra(&packed, width, height))
        }
        SourceFormat::Mjpeg => mjpeg_to_bgra(data, width, height),
    }
}

/// Copy `row_bytes` from each of `height` rows spaced `stride` apart
fn repack_rows(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    row_bytes: u32,
) -> BackendResult<Vec<u8>> {
    let stride = stride.max(row_bytes) as usize;
    let row_bytes = row_bytes as usize;
    let rows = height as usize;
    let needed = stride * rows.saturating_sub(1) + row_bytes;
    if data.len() < needed {
        return Err(BackendError::InvalidFrame(format!(
            "{}x{} sample needs {} bytes, got {}",
            width,
            height,
            needed,
            data.len()
        )));
    }

    if stride == row_bytes {
        return Ok(data[..row_bytes * rows].to_vec());
    }

    let mut packed = Vec::with_capacity(row_bytes * rows);
    for row in 0..rows {
        let start = row * stride;
        packed.extend_from_slice(&data[start..start + row_bytes]);
    }
    Ok(packed)
}

/// Convert YUYV (YUV 4:2:2) to BGRA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients.
pub fn yuyv_to_bgra(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut bgra = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if bgra.len() >= pixel_count * 4 {
                break;
            }
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            bgra.extend_from_slice(&[b, g, r, 255]);
        }
    }

    // Odd widths leave the last pixel unset
    bgra.resize(pixel_count * 4, 255);
    bgra
}

/// Decode a Motion JPEG sample to BGRA
pub fn mjpeg_to_bgra(data: &[u8], width: u32, height: u32) -> BackendResult<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::InvalidFrame(format!("MJPG decode failed: {}", e)))?;
    let rgba = decoded.to_rgba8();
    if rgba.width() != width || rgba.height() != height {
        return Err(BackendError::InvalidFrame(format!(
            "MJPG sample is {}x{}, expected {}x{}",
            rgba.width(),
            rgba.height(),
            width,
            height
        )));
    }
    Ok(rgba_to_bgra(rgba.into_raw()))
}

/// Swap red and blue in place, RGBA <-> BGRA
pub fn rgba_to_bgra(mut data: Vec<u8>) -> Vec<u8> {
    for pixel in data.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    data
}
