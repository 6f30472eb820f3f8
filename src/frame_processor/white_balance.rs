// SPDX-License-Identifier: GPL-3.0-only

//! White balance presets and their per-channel gains

use serde::{Deserialize, Serialize};
use std::fmt;

/// Multipliers applied to the red, green and blue channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelGains {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl ChannelGains {
    pub const NEUTRAL: ChannelGains = ChannelGains {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    /// Gains for a color temperature in Kelvin
    ///
    /// Warm light (<= 5000 K) boosts blue and damps green, cooler light
    /// damps red instead.
    pub fn from_temperature(kelvin: u32) -> Self {
        let t = kelvin as f32;
        if kelvin <= 5000 {
            ChannelGains {
                red: 1.0,
                green: 0.7 + t / 12000.0,
                blue: 0.5 + t / 10000.0,
            }
        } else {
            ChannelGains {
                red: 10000.0 / t,
                green: 0.9,
                blue: 1.0,
            }
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for ChannelGains {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// White balance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WhiteBalance {
    #[default]
    Auto,
    Daylight,
    Cloudy,
    Fluorescent,
    Incandescent,
}

impl WhiteBalance {
    pub const ALL: [WhiteBalance; 5] = [
        WhiteBalance::Auto,
        WhiteBalance::Daylight,
        WhiteBalance::Cloudy,
        WhiteBalance::Fluorescent,
        WhiteBalance::Incandescent,
    ];

    /// Parse a mode name, unknown names fall back to `Auto`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "daylight" | "sunny" => WhiteBalance::Daylight,
            "cloudy" => WhiteBalance::Cloudy,
            "fluorescent" => WhiteBalance::Fluorescent,
            "incandescent" | "tungsten" => WhiteBalance::Incandescent,
            _ => WhiteBalance::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteBalance::Auto => "auto",
            WhiteBalance::Daylight => "daylight",
            WhiteBalance::Cloudy => "cloudy",
            WhiteBalance::Fluorescent => "fluorescent",
            WhiteBalance::Incandescent => "incandescent",
        }
    }

    /// Color temperature in Kelvin, `None` for auto
    pub fn temperature(&self) -> Option<u32> {
        match self {
            WhiteBalance::Auto => None,
            WhiteBalance::Daylight => Some(5500),
            WhiteBalance::Cloudy => Some(6500),
            WhiteBalance::Fluorescent => Some(4000),
            WhiteBalance::Incandescent => Some(2700),
        }
    }

    pub fn gains(&self) -> ChannelGains {
        self.temperature()
            .map(ChannelGains::from_temperature)
            .unwrap_or(ChannelGains::NEUTRAL)
    }
}

impl fmt::Display for WhiteBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WhiteBalance {
    fn from(name: String) -> Self {
        WhiteBalance::from_name(&name)
    }
}

impl From<WhiteBalance> for String {
    fn from(mode: WhiteBalance) -> Self {
        mode.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(WhiteBalance::from_name("sunny"), WhiteBalance::Daylight);
        assert_eq!(WhiteBalance::from_name("Tungsten"), WhiteBalance::Incandescent);
        assert_eq!(WhiteBalance::from_name("cloudy"), WhiteBalance::Cloudy);
        assert_eq!(WhiteBalance::from_name("candlelight"), WhiteBalance::Auto);
    }

    #[test]
    fn test_temperatures() {
        assert_eq!(WhiteBalance::Auto.temperature(), None);
        assert_eq!(WhiteBalance::Daylight.temperature(), Some(5500));
        assert_eq!(WhiteBalance::Cloudy.temperature(), Some(6500));
        assert_eq!(WhiteBalance::Fluorescent.temperature(), Some(4000));
        assert_eq!(WhiteBalance::Incandescent.temperature(), Some(2700));
    }

    #[test]
    fn test_warm_gains() {
        let gains = WhiteBalance::Fluorescent.gains();
        assert!(approx(gains.red, 1.0));
        assert!(approx(gains.green, 0.7 + 4000.0 / 12000.0));
        assert!(approx(gains.blue, 0.9));
    }

    #[test]
    fn test_cool_gains() {
        let gains = WhiteBalance::Daylight.gains();
        assert!(approx(gains.red, 10000.0 / 5500.0));
        assert!(approx(gains.green, 0.9));
        assert!(approx(gains.blue, 1.0));
    }

    #[test]
    fn test_auto_is_neutral() {
        assert!(WhiteBalance::Auto.gains().is_neutral());
        assert!(!WhiteBalance::Cloudy.gains().is_neutral());
    }
}
