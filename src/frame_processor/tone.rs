// SPDX-License-Identifier: GPL-3.0-only

//! Exposure, white balance, saturation, brightness and contrast

use super::adjustments::ImageAdjustments;
use super::white_balance::ChannelGains;
use crate::constants::buffer::BYTES_PER_PIXEL;

/// Tone parameters mapped from [`ImageAdjustments`] into pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Added to every channel, in 0..255 units
    pub brightness: f32,
    /// Contrast multiplier around mid-gray
    pub contrast: f32,
    /// Saturation multiplier
    pub saturation: f32,
    /// Combined exposure and gain multiplier
    pub exposure_gain: f32,
    pub white_balance: ChannelGains,
}

impl ToneParams {
    pub fn new(adjustments: &ImageAdjustments, white_balance: ChannelGains) -> Self {
        Self {
            brightness: adjustments.brightness() * 255.0,
            contrast: adjustments.contrast() + 1.0,
            saturation: adjustments.saturation() + 1.0,
            exposure_gain: 2f32.powf(adjustments.exposure()) * adjustments.gain(),
            white_balance,
        }
    }

    /// True when applying these parameters leaves every pixel unchanged
    pub fn is_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && self.exposure_gain == 1.0
            && self.white_balance.is_neutral()
    }
}

/// Apply tone parameters to a BGRA buffer in place; alpha is untouched
pub fn apply_tone(data: &mut [u8], params: &ToneParams) {
    if params.is_neutral() {
        return;
    }

    let wb = params.white_balance;
    for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
        let mut b = pixel[0] as f32 * params.exposure_gain * wb.blue;
        let mut g = pixel[1] as f32 * params.exposure_gain * wb.green;
        let mut r = pixel[2] as f32 * params.exposure_gain * wb.red;

        if params.saturation != 1.0 {
            adjust_saturation(&mut r, &mut g, &mut b, params.saturation);
        }

        r = contrast(r + params.brightness, params.contrast);
        g = contrast(g + params.brightness, params.contrast);
        b = contrast(b + params.brightness, params.contrast);

        pixel[0] = b.clamp(0.0, 255.0) as u8;
        pixel[1] = g.clamp(0.0, 255.0) as u8;
        pixel[2] = r.clamp(0.0, 255.0) as u8;
    }
}

#[inline]
fn contrast(value: f32, factor: f32) -> f32 {
    (value - 127.5) * factor + 127.5
}

/// Scale HSL-style saturation while keeping lightness
///
/// The largest and smallest channels move to `lum * (1 ± sat)`, the middle
/// channel keeps its relative position between them.
fn adjust_saturation(r: &mut f32, g: &mut f32, b: &mut f32, factor: f32) {
    let max_val = r.max(*g).max(*b);
    let min_val = r.min(*g).min(*b);
    if max_val == min_val {
        return;
    }

    let lum = (max_val + min_val) / 2.0;
    let sat = if lum <= 127.5 {
        (max_val - min_val) / (max_val + min_val)
    } else {
        (max_val - min_val) / (510.0 - max_val - min_val)
    };
    let sat = (sat * factor).clamp(0.0, 1.0);

    let min_new = lum * (1.0 - sat);
    let max_new = lum * (1.0 + sat);
    let rescale = |v: f32| min_new + (v - min_val) * (max_new - min_new) / (max_val - min_val);

    // Channel order decides which is max, min and middle
    if *r == max_val {
        *r = max_new;
        if *g == min_val {
            *g = min_new;
            *b = rescale(*b);
        } else {
            *g = rescale(*g);
            *b = min_new;
        }
    } else if *g == max_val {
        *g = max_new;
        if *r == min_val {
            *r = min_new;
            *b = rescale(*b);
        } else {
            *r = rescale(*r);
            *b = min_new;
        }
    } else {
        *b = max_new;
        if *r == min_val {
            *r = min_new;
            *g = rescale(*g);
        } else {
            *r = rescale(*r);
            *g = min_new;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(adjustments: ImageAdjustments) -> ToneParams {
        ToneParams::new(&adjustments, ChannelGains::NEUTRAL)
    }

    #[test]
    fn test_neutral_is_noop() {
        let mut data = vec![10, 20, 30, 40, 250, 128, 0, 255];
        let original = data.clone();
        apply_tone(&mut data, &params(ImageAdjustments::default()));
        assert_eq!(data, original);
    }

    #[test]
    fn test_brightness_adds_and_clamps() {
        let mut data = vec![10, 200, 250, 7];
        apply_tone(
            &mut data,
            &params(ImageAdjustments::default().with_brightness(0.2)),
        );
        // 0.2 * 255 = 51
        assert_eq!(data, vec![61, 251, 255, 7]);
    }

    #[test]
    fn test_gain_zero_blacks_out() {
        let mut data = vec![100, 150, 200, 255];
        apply_tone(&mut data, &params(ImageAdjustments::default().with_gain(0.0)));
        assert_eq!(data, vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_exposure_doubles() {
        let mut data = vec![20, 40, 60, 255];
        apply_tone(
            &mut data,
            &params(ImageAdjustments::default().with_exposure(1.0)),
        );
        assert_eq!(data, vec![40, 80, 120, 255]);
    }

    #[test]
    fn test_full_desaturation_is_gray() {
        let mut data = vec![30, 90, 200, 255];
        apply_tone(
            &mut data,
            &params(ImageAdjustments::default().with_saturation(-1.0)),
        );
        assert_eq!(data[0], data[1]);
        assert_eq!(data[1], data[2]);
    }

    #[test]
    fn test_contrast_minimum_flattens() {
        let mut data = vec![0, 100, 255, 255];
        apply_tone(
            &mut data,
            &params(ImageAdjustments::default().with_contrast(-1.0)),
        );
        assert_eq!(data, vec![127, 127, 127, 255]);
    }

    #[test]
    fn test_white_balance_scales_channels() {
        let wb = ChannelGains {
            red: 2.0,
            green: 1.0,
            blue: 0.5,
        };
        let mut data = vec![100, 100, 100, 255];
        apply_tone(
            &mut data,
            &ToneParams::new(&ImageAdjustments::default(), wb),
        );
        assert_eq!(data, vec![50, 100, 200, 255]);
    }
}
