// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame image adjustment parameters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named color filter applied after tone adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterType {
    #[default]
    None,
    Grayscale,
    Sepia,
    Inverted,
}

impl FilterType {
    /// Parse a filter name, unknown names yield `None`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "grayscale" | "blackandwhite" => FilterType::Grayscale,
            "sepia" => FilterType::Sepia,
            "inverted" | "negative" => FilterType::Inverted,
            _ => FilterType::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::None => "",
            FilterType::Grayscale => "grayscale",
            FilterType::Sepia => "sepia",
            FilterType::Inverted => "inverted",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterType::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<String> for FilterType {
    fn from(name: String) -> Self {
        FilterType::from_name(&name)
    }
}

impl From<FilterType> for String {
    fn from(filter: FilterType) -> Self {
        filter.as_str().to_string()
    }
}

/// Clamp to a range, mapping NaN and infinities to `neutral`
fn clamp_finite(value: f32, min: f32, max: f32, neutral: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        neutral
    }
}

/// Tone, filter and execution-path settings for processed frames
///
/// Every value is clamped on the way in, whether through a setter or
/// through deserialization, so a held `ImageAdjustments` is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAdjustments")]
pub struct ImageAdjustments {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    exposure: f32,
    gain: f32,
    sharpness: f32,
    filter: FilterType,
    use_hardware: bool,
}

/// Unvalidated form used for deserialization
#[derive(Deserialize)]
#[serde(default)]
struct RawAdjustments {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    exposure: f32,
    gain: f32,
    sharpness: f32,
    filter: FilterType,
    use_hardware: bool,
}

impl Default for RawAdjustments {
    fn default() -> Self {
        let defaults = ImageAdjustments::default();
        Self {
            brightness: defaults.brightness,
            contrast: defaults.contrast,
            saturation: defaults.saturation,
            exposure: defaults.exposure,
            gain: defaults.gain,
            sharpness: defaults.sharpness,
            filter: defaults.filter,
            use_hardware: defaults.use_hardware,
        }
    }
}

impl From<RawAdjustments> for ImageAdjustments {
    fn from(raw: RawAdjustments) -> Self {
        ImageAdjustments::default()
            .with_brightness(raw.brightness)
            .with_contrast(raw.contrast)
            .with_saturation(raw.saturation)
            .with_exposure(raw.exposure)
            .with_gain(raw.gain)
            .with_sharpness(raw.sharpness)
            .with_filter(raw.filter)
            .with_hardware(raw.use_hardware)
    }
}

impl Default for ImageAdjustments {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            exposure: 0.0,
            gain: 1.0,
            sharpness: 0.0,
            filter: FilterType::None,
            // Hardware path is a readback copy, software is the useful default
            use_hardware: false,
        }
    }
}

impl ImageAdjustments {
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    /// Exposure in stops
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Stored for callers, not applied by the pipeline
    pub fn sharpness(&self) -> f32 {
        self.sharpness
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn use_hardware(&self) -> bool {
        self.use_hardware
    }

    /// Set brightness, clamped to [-1, 1]
    pub fn set_brightness(&mut self, value: f32) {
        self.brightness = clamp_finite(value, -1.0, 1.0, 0.0);
    }

    /// Set contrast, clamped to [-1, 1]
    pub fn set_contrast(&mut self, value: f32) {
        self.contrast = clamp_finite(value, -1.0, 1.0, 0.0);
    }

    /// Set saturation, clamped to [-1, 1]
    pub fn set_saturation(&mut self, value: f32) {
        self.saturation = clamp_finite(value, -1.0, 1.0, 0.0);
    }

    /// Set exposure in stops, clamped to [-1, 1]
    pub fn set_exposure(&mut self, value: f32) {
        self.exposure = clamp_finite(value, -1.0, 1.0, 0.0);
    }

    /// Set gain, clamped to [0, 2]
    pub fn set_gain(&mut self, value: f32) {
        self.gain = clamp_finite(value, 0.0, 2.0, 1.0);
    }

    /// Set sharpness, clamped to [0, 1]
    pub fn set_sharpness(&mut self, value: f32) {
        self.sharpness = clamp_finite(value, 0.0, 1.0, 0.0);
    }

    pub fn set_filter(&mut self, filter: FilterType) {
        self.filter = filter;
    }

    pub fn set_use_hardware(&mut self, enabled: bool) {
        self.use_hardware = enabled;
    }

    pub fn with_brightness(mut self, value: f32) -> Self {
        self.set_brightness(value);
        self
    }

    pub fn with_contrast(mut self, value: f32) -> Self {
        self.set_contrast(value);
        self
    }

    pub fn with_saturation(mut self, value: f32) -> Self {
        self.set_saturation(value);
        self
    }

    pub fn with_exposure(mut self, value: f32) -> Self {
        self.set_exposure(value);
        self
    }

    pub fn with_gain(mut self, value: f32) -> Self {
        self.set_gain(value);
        self
    }

    pub fn with_sharpness(mut self, value: f32) -> Self {
        self.set_sharpness(value);
        self
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.set_filter(filter);
        self
    }

    pub fn with_hardware(mut self, enabled: bool) -> Self {
        self.set_use_hardware(enabled);
        self
    }

    /// True when brightness, contrast, saturation, exposure and gain are all neutral
    pub fn is_tone_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.exposure == 0.0
            && self.gain == 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_clamp() {
        let adj = ImageAdjustments::default()
            .with_brightness(5.0)
            .with_contrast(-3.0)
            .with_saturation(1.5)
            .with_exposure(-7.0)
            .with_gain(9.0)
            .with_sharpness(-1.0);

        assert_eq!(adj.brightness(), 1.0);
        assert_eq!(adj.contrast(), -1.0);
        assert_eq!(adj.saturation(), 1.0);
        assert_eq!(adj.exposure(), -1.0);
        assert_eq!(adj.gain(), 2.0);
        assert_eq!(adj.sharpness(), 0.0);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let once = ImageAdjustments::default().with_gain(3.0).with_brightness(-2.0);
        let twice = once.with_gain(once.gain()).with_brightness(once.brightness());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_finite_maps_to_neutral() {
        let adj = ImageAdjustments::default()
            .with_gain(f32::NAN)
            .with_brightness(f32::INFINITY);
        assert_eq!(adj.gain(), 1.0);
        assert_eq!(adj.brightness(), 0.0);
    }

    #[test]
    fn test_defaults_are_neutral() {
        let adj = ImageAdjustments::default();
        assert!(adj.is_tone_neutral());
        assert_eq!(adj.filter(), FilterType::None);
        assert!(!adj.use_hardware());
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(FilterType::from_name("grayscale"), FilterType::Grayscale);
        assert_eq!(FilterType::from_name("BlackAndWhite"), FilterType::Grayscale);
        assert_eq!(FilterType::from_name("sepia"), FilterType::Sepia);
        assert_eq!(FilterType::from_name("negative"), FilterType::Inverted);
        assert_eq!(FilterType::from_name("inverted"), FilterType::Inverted);
        assert_eq!(FilterType::from_name("vivid"), FilterType::None);
        assert_eq!(FilterType::from_name(""), FilterType::None);
    }

    #[test]
    fn test_deserialize_clamps_and_fills_defaults() {
        let json = r#"{"brightness": 4.0, "gain": -1.0, "filter": "sepia"}"#;
        let adj: ImageAdjustments = serde_json::from_str(json).unwrap();
        assert_eq!(adj.brightness(), 1.0);
        assert_eq!(adj.gain(), 0.0);
        assert_eq!(adj.contrast(), 0.0);
        assert_eq!(adj.filter(), FilterType::Sepia);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let adj = ImageAdjustments::default()
            .with_contrast(0.25)
            .with_filter(FilterType::Inverted)
            .with_hardware(true);
        let json = serde_json::to_string(&adj).unwrap();
        assert!(json.contains("\"inverted\""));
        let parsed: ImageAdjustments = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, adj);
    }
}
