//! Interactive box editing.
//!
//! [`EditableBox`] is the per-box state machine (handles, drag, nudge,
//! focus). [`EditSession`] owns the boxes of one image, routes pointer and
//! keyboard input between them, and saves the result back to the label
//! file. Neither depends on a rendering toolkit: shapes describe how they
//! look through [`Paint`] and callers feed them pointer positions in image
//! pixels.

mod geometry;
mod session;
mod shape;
mod timer;

pub use geometry::{
    handle_at, pixel_to_yolo, rect_from_corners, yolo_to_pixel, Handle, Point, Rect, HANDLE_SIZE,
    HANDLE_SPACE, LABEL_OFFSET_Y,
};
pub use session::{DrawingState, EditSession, MouseButton};
pub use shape::{
    CallbackError, ChangeCallback, Drag, EditableBox, EditableBoxBuilder, EditableShape,
    HandlePaint, Hit, InteractionState, Key, LabelTag, Paint, PressOutcome, ShapeChange,
};
pub use timer::{RepeatingTask, DEFAULT_NUDGE_INTERVAL};
