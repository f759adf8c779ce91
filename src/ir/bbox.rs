//! Bounding box types in corner (XYXY) format, plus the IoU metric.

use super::coord::Coord;
use super::{Normalized, Pixel};

/// Axis-aligned rectangle stored as its top-left and bottom-right corners,
/// tagged with [`Pixel`] or [`Normalized`] space.
///
/// `min <= max` is not enforced. Label files can hold
/// degenerate boxes, and the editor produces inverted rectangles mid-drag
/// before calling [`BBoxXYXY::normalized`].
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn new(min: Coord<TSpace>, max: Coord<TSpace>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// From a top-left corner and a size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// From a center and a size, the label file layout.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::from_xyxy(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let center = self.center();
        (center.x, center.y, self.width(), self.height())
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Negative when the edges are inverted.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn center(&self) -> Coord<TSpace> {
        Coord::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Swaps inverted edges so that `min <= max` on both axes.
    pub fn normalized(&self) -> Self {
        Self::from_xyxy(
            self.min.x.min(self.max.x),
            self.min.y.min(self.max.y),
            self.min.x.max(self.max.x),
            self.min.y.max(self.max.y),
        )
    }

    /// Returns a copy shifted by `offset`.
    pub fn translated(&self, offset: Coord<TSpace>) -> Self {
        Self::from_xyxy(
            self.min.x + offset.x,
            self.min.y + offset.y,
            self.max.x + offset.x,
            self.max.y + offset.y,
        )
    }

    /// Inclusive point containment test.
    pub fn contains(&self, point: &Coord<TSpace>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Intersection rectangle, or `None` when the boxes are disjoint.
    ///
    /// Edge-touching boxes yield a zero-area intersection, not `None`.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.xmin().max(other.xmin());
        let top = self.ymin().max(other.ymin());
        let right = self.xmax().min(other.xmax());
        let bottom = self.ymax().min(other.ymax());

        if right < left || bottom < top {
            return None;
        }
        Some(Self::from_xyxy(left, top, right, bottom))
    }

    /// Intersection over union with `other`.
    ///
    /// Returns exactly `0.0` for disjoint boxes and whenever the union area
    /// is not positive, so degenerate boxes never produce NaN.
    pub fn iou(&self, other: &Self) -> f64 {
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let intersection = inter.area();
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

impl BBoxXYXY<Pixel> {
    /// Divides by the image size.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xyxy(
            self.min.x / image_width,
            self.min.y / image_height,
            self.max.x / image_width,
            self.max.y / image_height,
        )
    }
}

impl BBoxXYXY<Normalized> {
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }
}
