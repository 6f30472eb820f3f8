// SPDX-License-Identifier: GPL-3.0-only

//! Named color filters on BGRA pixels

use super::adjustments::FilterType;
use crate::constants::buffer::BYTES_PER_PIXEL;

/// Apply a named filter to a BGRA buffer in place
pub fn apply_filter(data: &mut [u8], filter: FilterType) {
    match filter {
        FilterType::None => {}
        FilterType::Grayscale => grayscale(data),
        FilterType::Sepia => sepia(data),
        FilterType::Inverted => invert(data),
    }
}

/// BT.601 luma into all three channels
fn grayscale(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
        let b = pixel[0] as f32;
        let g = pixel[1] as f32;
        let r = pixel[2] as f32;
        let luma = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
        pixel[0] = luma;
        pixel[1] = luma;
        pixel[2] = luma;
    }
}

fn sepia(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
        let b = pixel[0] as f32;
        let g = pixel[1] as f32;
        let r = pixel[2] as f32;
        pixel[2] = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8;
        pixel[1] = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8;
        pixel[0] = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8;
    }
}

fn invert(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        vec![10, 200, 90, 255, 0, 0, 0, 128, 255, 255, 255, 0, 33, 66, 99, 77]
    }

    #[test]
    fn test_grayscale_equal_channels() {
        let mut data = sample();
        apply_filter(&mut data, FilterType::Grayscale);
        for pixel in data.chunks_exact(4) {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
        }
        // Alpha untouched
        assert_eq!(data[7], 128);
        assert_eq!(data[15], 77);
    }

    #[test]
    fn test_invert_is_involution() {
        let mut data = sample();
        apply_filter(&mut data, FilterType::Inverted);
        assert_eq!(&data[0..4], &[245, 55, 165, 255]);
        apply_filter(&mut data, FilterType::Inverted);
        assert_eq!(data, sample());
    }

    #[test]
    fn test_invert_every_value() {
        let original: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v, v]).collect();
        let mut data = original.clone();
        apply_filter(&mut data, FilterType::Inverted);
        for (pixel, v) in data.chunks_exact(4).zip(0..=255u8) {
            assert_eq!(&pixel[..3], &[255 - v; 3]);
            assert_eq!(pixel[3], v);
        }
        apply_filter(&mut data, FilterType::Inverted);
        assert_eq!(data, original);
    }

    #[test]
    fn test_sepia_saturates_white() {
        let mut data = vec![255, 255, 255, 255];
        apply_filter(&mut data, FilterType::Sepia);
        // Red and green rows sum above 1, blue row does not
        assert_eq!(data[2], 255);
        assert_eq!(data[1], 255);
        assert_eq!(data[0], 238);
    }

    #[test]
    fn test_none_is_noop() {
        let mut data = sample();
        apply_filter(&mut data, FilterType::None);
        assert_eq!(data, sample());
    }
}
