//! Color math shared by the resolver, the classifier and the colorizer.
//!
//! Every translucent color is resolved to an opaque one by blending it over white; this
//! module is the only place that happens.

use std::fmt;
use std::str::FromStr;

use crate::{VectorizeError, VectorizeResult};

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lower-case `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Convert one pixel of a 3- or 4-channel grid into an opaque color.
    ///
    /// 4-channel pixels are blended over white with `alpha = pixel[3] / 255`.
    pub fn from_channels(pixel: &[u8]) -> VectorizeResult<Self> {
        match *pixel {
            [r, g, b] => Ok(Rgb::new(r, g, b)),
            [r, g, b, a] => Ok(blend_over_white(Rgba::new(r, g, b, f64::from(a) / 255.0))),
            _ => Err(VectorizeError::UnsupportedChannelLayout {
                channels: pixel.len().min(u8::MAX as usize) as u8,
            }),
        }
    }

    /// Squared Euclidean distance in RGB space.
    pub fn distance_squared(self, other: Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = VectorizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_to_rgb(s)
    }
}

/// An RGB color with a straight (non-premultiplied) alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Rgb> for Rgba {
    fn from(value: Rgb) -> Self {
        Rgba::new(value.r, value.g, value.b, 1.0)
    }
}

impl FromStr for Rgba {
    type Err = VectorizeError;

    /// Parse `rgb(r, g, b)`, `rgba(r, g, b, a)` or a hex color.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("rgba(")
            .or_else(|| trimmed.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'));

        let Some(body) = body else {
            return hex_to_rgb(trimmed).map(Rgba::from);
        };

        let invalid = || VectorizeError::InvalidColor(s.to_string());
        let values: Vec<&str> = body.split(',').map(str::trim).collect();
        if values.len() != 3 && values.len() != 4 {
            return Err(invalid());
        }
        let channel = |v: &str| v.parse::<u8>().map_err(|_| invalid());
        let a = match values.get(3) {
            Some(v) => v.parse::<f64>().map_err(|_| invalid())?,
            None => 1.0,
        };
        Ok(Rgba::new(
            channel(values[0])?,
            channel(values[1])?,
            channel(values[2])?,
            a,
        ))
    }
}

/// Parse `#rgb`, `#rrggbb` (the `#` is optional, case insensitive) into RGB.
pub fn hex_to_rgb(hex: &str) -> VectorizeResult<Rgb> {
    let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
    let invalid = || VectorizeError::InvalidColor(hex.to_string());
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(invalid()),
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
    Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Resolve a color expression to an opaque `#rrggbb`, blending any alpha over white.
pub fn hexify(color: impl Into<Rgba>) -> String {
    blend_over_white(color.into()).to_hex()
}

/// `channel' = round(a * channel + (1 - a) * 255)`, with `a` clamped to `[0, 1]`.
pub fn blend_over_white(color: Rgba) -> Rgb {
    let a = if color.a.is_nan() { 1.0 } else { color.a.clamp(0.0, 1.0) };
    let blend = |c: u8| (a * f64::from(c) + (1.0 - a) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(blend(color.r), blend(color.g), blend(color.b))
}

/// Opacity of two independent translucent layers stacked on top of each other.
pub fn combine_opacity(a: f64, b: f64) -> f64 {
    1.0 - (1.0 - a) * (1.0 - b)
}
