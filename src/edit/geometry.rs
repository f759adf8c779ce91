//! Pixel-space geometry for the box editor: handles and the
//! normalized/pixel conversion used on load and save.

use crate::ir::{BBoxXYXY, Coord, Pixel, YoloBox};

/// A pointer position or offset in image pixels.
pub type Point = Coord<Pixel>;

/// An axis-aligned rectangle in image pixels.
pub type Rect = BBoxXYXY<Pixel>;

/// Side length of a handle square, in pixels.
pub const HANDLE_SIZE: f64 = 8.0;

/// Gap between the top edge and the rotation handle, in pixels.
pub const HANDLE_SPACE: f64 = 4.0;

/// Offset of a box's label tag above its position.
pub const LABEL_OFFSET_Y: f64 = 20.0;

/// Interactive anchors of an editable box.
///
/// The declaration order is the hit-test order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    Rotate,
}

impl Handle {
    pub const ALL: [Handle; 9] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
        Handle::Rotate,
    ];

    pub fn is_rotate(self) -> bool {
        self == Handle::Rotate
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Top | Handle::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(
            self,
            Handle::BottomRight | Handle::Bottom | Handle::BottomLeft
        )
    }

    fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Left | Handle::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::Right | Handle::BottomRight)
    }

    /// The handle's square for `rect`, in the same space as `rect`.
    pub fn square(self, rect: &Rect) -> Rect {
        let s = HANDLE_SIZE;
        let center = rect.center();
        let (x, y) = match self {
            Handle::TopLeft => (rect.xmin(), rect.ymin()),
            Handle::Top => (center.x, rect.ymin()),
            Handle::TopRight => (rect.xmax(), rect.ymin()),
            Handle::Right => (rect.xmax(), center.y),
            Handle::BottomRight => (rect.xmax(), rect.ymax()),
            Handle::Bottom => (center.x, rect.ymax()),
            Handle::BottomLeft => (rect.xmin(), rect.ymax()),
            Handle::Left => (rect.xmin(), center.y),
            Handle::Rotate => {
                return Rect::from_xywh(
                    center.x - s / 2.0,
                    rect.ymin() - HANDLE_SPACE - s,
                    s,
                    s,
                )
            }
        };
        Rect::from_xywh(x - s / 2.0, y - s / 2.0, s, s)
    }

    /// Applies a pointer `delta` to the edges this handle owns.
    ///
    /// The result is normalized, so dragging past the opposite edge swaps
    /// edges instead of producing a negative size. The rotation handle
    /// leaves the rectangle unchanged.
    pub fn resize(self, original: &Rect, delta: Point) -> Rect {
        let mut left = original.xmin();
        let mut top = original.ymin();
        let mut right = original.xmax();
        let mut bottom = original.ymax();

        if self.moves_top() {
            top += delta.y;
        }
        if self.moves_bottom() {
            bottom += delta.y;
        }
        if self.moves_left() {
            left += delta.x;
        }
        if self.moves_right() {
            right += delta.x;
        }

        Rect::from_xyxy(left, top, right, bottom).normalized()
    }
}

/// First handle of `rect` containing `point`, scanning in hit-test order.
pub fn handle_at(rect: &Rect, point: &Point, allow_rotation: bool) -> Option<Handle> {
    Handle::ALL
        .into_iter()
        .filter(|handle| allow_rotation || !handle.is_rotate())
        .find(|handle| handle.square(rect).contains(point))
}

/// Rectangle spanned by two drag corners, in either order.
pub fn rect_from_corners(a: Point, b: Point) -> Rect {
    Rect::from_xywh(a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs())
}

/// Pixel rectangle of a normalized box on an image of the given size.
pub fn yolo_to_pixel(b: &YoloBox, image_width: f64, image_height: f64) -> Rect {
    b.to_corners().to_pixel(image_width, image_height)
}

/// Normalized box for a pixel rectangle on an image of the given size.
pub fn pixel_to_yolo(class_id: usize, rect: &Rect, image_width: f64, image_height: f64) -> YoloBox {
    YoloBox::from_corners(class_id, &rect.to_normalized(image_width, image_height))
}
