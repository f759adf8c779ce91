//! Coordinate space marker types.
//!
//! Label files store boxes normalized to the image size, while the editor
//! works in image pixels. These zero-sized types keep the two apart at
//! compile time.

use std::fmt;

/// Marker for image pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates expressed as fractions of image width/height.
///
/// Values are conventionally in `[0, 1]` but are never clamped.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
