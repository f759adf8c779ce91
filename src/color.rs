//! Display colors for labels, scan rows, and box outlines.
//!
//! Label colors are derived from the label name alone so that the same
//! catalog always renders the same way across runs and in tests.

use std::fmt;

use rand::distr::{Distribution, StandardUniform};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Serializer};

/// An opaque 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);
    pub const GREEN: Rgb = Rgb::new(0x00, 0xFF, 0x00);
    pub const YELLOW: Rgb = Rgb::new(0xFF, 0xFF, 0x00);
    pub const ORANGE: Rgb = Rgb::new(0xFF, 0xA5, 0x00);

    /// Row background for files with overlapping boxes.
    pub const OVERLAP_ROW: Rgb = Rgb::new(0xFF, 0xD0, 0xD0);
    /// Row background for files with out-of-catalog class ids.
    pub const INVALID_LABEL_ROW: Rgb = Rgb::new(0xFF, 0xFF, 0xD0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Formats as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Convert HSV to RGB.
///
/// `h` is in degrees (0-360), `s` and `v` in 0.0-1.0.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let to_u8 = |channel: f64| ((channel + m).clamp(0.0, 1.0) * 255.0) as u8;
    Rgb::new(to_u8(r), to_u8(g), to_u8(b))
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A bright, deterministic color for a label name.
///
/// The name's FNV-1a hash seeds the generator, which then draws hue,
/// saturation in `[0.6, 1.0)` and value in `[0.8, 1.0)`.
pub fn label_color(name: &str) -> Rgb {
    let mut rng = StdRng::seed_from_u64(fnv1a(name.as_bytes()));
    let mut unit = || -> f64 { StandardUniform.sample(&mut rng) };
    let hue = unit() * 360.0;
    let saturation = 0.6 + unit() * 0.4;
    let value = 0.8 + unit() * 0.2;
    hsv_to_rgb(hue, saturation, value)
}
