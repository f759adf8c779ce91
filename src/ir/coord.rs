//! Typed 2D points using PhantomData for compile-time safety.

use std::marker::PhantomData;
use std::ops::{Add, Sub};

/// A 2D point or offset tagged with its coordinate space.
///
/// The editor uses `Coord<Pixel>` for pointer positions and deltas; mixing
/// it with a normalized value is a type error.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rotates this offset by `degrees` around the origin.
    pub fn rotated(self, degrees: f64) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Angle of the vector from `self` to `other`, in degrees.
    pub fn angle_to(&self, other: &Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

impl<TSpace> Add for Coord<TSpace> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<TSpace> Sub for Coord<TSpace> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
