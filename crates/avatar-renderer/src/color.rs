//! RGB colors with channels in `[0, 1]`.
//!
//! Colors coming from configuration or query strings are always parsed from a
//! six-digit `RRGGBB` hex string with [`parse_color`]; there is no other path
//! from external input. The renderer only ever consumes range-valid values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ColorError;

/// Luminance above which a background counts as light.
pub const LUMINANCE_THRESHOLD: f64 = 0.5;

/// An RGB color with each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    red: f64,
    green: f64,
    blue: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
    };

    pub const WHITE: Rgb = Rgb {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    /// Build a color from unit-range channels, rejecting NaN and anything
    /// outside `[0, 1]`.
    pub fn new(red: f64, green: f64, blue: f64) -> Result<Self, ColorError> {
        for (channel, value) in [("red", red), ("green", green), ("blue", blue)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ColorError::OutOfRange { channel, value });
            }
        }
        Ok(Self { red, green, blue })
    }

    /// Build a color from channels already known to be in range.
    pub(crate) const fn from_unit(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Build a color from 8-bit channels.
    pub fn from_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f64 / 255.0,
            green: green as f64 / 255.0,
            blue: blue as f64 / 255.0,
        }
    }

    pub fn red(&self) -> f64 {
        self.red
    }

    pub fn green(&self) -> f64 {
        self.green
    }

    pub fn blue(&self) -> f64 {
        self.blue
    }

    /// Channels rounded to the nearest byte.
    pub fn to_u8(&self) -> (u8, u8, u8) {
        let to_byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        (to_byte(self.red), to_byte(self.green), to_byte(self.blue))
    }

    /// Uppercase `RRGGBB` form, rounding each channel to the nearest byte.
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_u8();
        format!("{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Perceptual luminance using ITU-R BT.601 weights.
    pub fn luminance(&self) -> f64 {
        luminance(self)
    }

    /// Black on light colors, white on dark ones.
    pub fn contrasting_monochrome(&self) -> Rgb {
        contrasting_monochrome(self)
    }
}

/// Parse an `RRGGBB` string (case-insensitive, no prefix) into a color.
pub fn parse_color(hex: &str) -> Result<Rgb, ColorError> {
    // from_str_radix alone would accept a leading '+'
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidFormat {
            value: hex.to_string(),
        });
    }

    let number = u32::from_str_radix(hex, 16).map_err(|_| ColorError::InvalidFormat {
        value: hex.to_string(),
    })?;

    Ok(Rgb::from_u8(
        ((number >> 16) & 0xFF) as u8,
        ((number >> 8) & 0xFF) as u8,
        (number & 0xFF) as u8,
    ))
}

/// `0.299 r + 0.587 g + 0.114 b`
pub fn luminance(color: &Rgb) -> f64 {
    0.299 * color.red + 0.587 * color.green + 0.114 * color.blue
}

/// Pick pure black or pure white for legible text on `color`.
pub fn contrasting_monochrome(color: &Rgb) -> Rgb {
    if luminance(color) > LUMINANCE_THRESHOLD {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_color(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
