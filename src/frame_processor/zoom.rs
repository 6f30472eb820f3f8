// SPDX-License-Identifier: GPL-3.0-only

//! Digital zoom: centered crop resampled back to full size

use crate::backends::camera::types::Frame;
use crate::constants::buffer::BYTES_PER_PIXEL;
use crate::constants::zoom::IDENTITY_THRESHOLD;

/// Centered crop rectangle for a zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn centered(width: u32, height: u32, level: f32) -> Self {
        let crop_width = ((width as f32 / level) as u32).max(1).min(width);
        let crop_height = ((height as f32 / level) as u32).max(1).min(height);
        Self {
            x: (width - crop_width) / 2,
            y: (height - crop_height) / 2,
            width: crop_width,
            height: crop_height,
        }
    }
}

/// Whether a zoom level changes the image at all
pub fn is_identity(level: f32) -> bool {
    !level.is_finite() || level <= IDENTITY_THRESHOLD
}

/// Apply digital zoom to a BGRA frame
///
/// The centered crop is resampled to the original dimensions with bilinear
/// interpolation on B, G and R. Alpha comes from the top-left neighbour.
/// Neighbours past the last row or column clamp to the edge, so every
/// output pixel is written.
pub fn apply_zoom(frame: &Frame, level: f32) -> Frame {
    if is_identity(level) || frame.width == 0 || frame.height == 0 {
        return frame.clone();
    }

    let width = frame.width;
    let height = frame.height;
    let stride = frame.stride as usize;
    let crop = CropRect::centered(width, height, level);
    let src = &frame.data;
    let mut out = vec![0u8; src.len()];

    for y in 0..height {
        let src_y = crop.y as f32 + (y as f32 / height as f32) * crop.height as f32;
        let y0 = (src_y as u32).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let weight_y = src_y - y0 as f32;

        for x in 0..width {
            let src_x = crop.x as f32 + (x as f32 / width as f32) * crop.width as f32;
            let x0 = (src_x as u32).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let weight_x = src_x - x0 as f32;

            let idx_tl = y0 as usize * stride + x0 as usize * BYTES_PER_PIXEL;
            let idx_tr = y0 as usize * stride + x1 as usize * BYTES_PER_PIXEL;
            let idx_bl = y1 as usize * stride + x0 as usize * BYTES_PER_PIXEL;
            let idx_br = y1 as usize * stride + x1 as usize * BYTES_PER_PIXEL;
            let dst = y as usize * stride + x as usize * BYTES_PER_PIXEL;

            for c in 0..3 {
                let tl = src[idx_tl + c] as f32;
                let tr = src[idx_tr + c] as f32;
                let bl = src[idx_bl + c] as f32;
                let br = src[idx_br + c] as f32;
                let top = tl + (tr - tl) * weight_x;
                let bottom = bl + (br - bl) * weight_x;
                out[dst + c] = (top + (bottom - top) * weight_y) as u8;
            }
            out[dst + 3] = src[idx_tl + 3];
        }
    }

    Frame {
        data: out,
        width,
        height,
        stride: frame.stride,
        captured_at: frame.captured_at,
    }
}
