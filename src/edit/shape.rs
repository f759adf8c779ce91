//! Editable shapes: the per-box interaction state machine.
//!
//! A shape is `Passive` until it is pressed or focused. While `Editable` it
//! exposes resize and rotation handles and accepts arrow-key nudges. A press
//! on a handle or on the body enters `Dragging` until the pointer is
//! released.
//!
//! All pointer positions are scene (image pixel) coordinates. A shape keeps
//! its rectangle in local coordinates relative to its position and rotates
//! it about the rectangle centre.

use std::any::Any;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use super::geometry::{handle_at, pixel_to_yolo, Handle, Point, Rect, LABEL_OFFSET_Y};
use super::timer::{RepeatingTask, DEFAULT_NUDGE_INTERVAL};
use crate::check::BoxClass;
use crate::color::Rgb;
use crate::error::LabelCheckError;
use crate::ir::YoloBox;

/// Which geometry mutation triggered a change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeChange {
    Resized,
    Moved,
    Rotated,
    Nudged,
    Created,
    Deleted,
}

/// Error type a change callback may return.
pub type CallbackError = Box<dyn Error>;

/// Change-notification callback shared by the shapes of one session.
pub type ChangeCallback = Rc<dyn Fn(ShapeChange) -> Result<(), CallbackError>>;

/// Keyboard keys the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Other,
}

impl Key {
    pub fn is_arrow(self) -> bool {
        self != Key::Other
    }

    fn direction(self) -> Option<Point> {
        match self {
            Key::Left => Some(Point::new(-1.0, 0.0)),
            Key::Right => Some(Point::new(1.0, 0.0)),
            Key::Up => Some(Point::new(0.0, -1.0)),
            Key::Down => Some(Point::new(0.0, 1.0)),
            Key::Other => None,
        }
    }
}

/// The text element showing a box's class name.
///
/// Shapes only hold a weak link to their tag; the session owns it.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTag {
    pub text: String,
    pub position: Point,
    pub color: Rgb,
    pub highlighted: bool,
}

impl LabelTag {
    pub fn new(text: impl Into<String>, color: Rgb) -> Self {
        Self {
            text: text.into(),
            position: Point::default(),
            color,
            highlighted: false,
        }
    }

    pub fn display_color(&self) -> Rgb {
        if self.highlighted {
            Rgb::WHITE
        } else {
            self.color
        }
    }
}

/// What a press landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    Handle(Handle),
    Body,
}

/// An in-progress pointer drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Drag {
    /// Resize from a snapshot taken at press time.
    Resize {
        handle: Handle,
        press_point: Point,
        press_rect: Rect,
    },
    Rotate,
    /// Translate by the pointer delta since `last`.
    Move { last: Point },
}

impl Drag {
    fn handle(&self) -> Option<Handle> {
        match self {
            Drag::Resize { handle, .. } => Some(*handle),
            Drag::Rotate => Some(Handle::Rotate),
            Drag::Move { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionState {
    Passive,
    Editable,
    Dragging(Drag),
}

/// Result of a pointer press on a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// The press missed an editable shape.
    Ignored,
    /// A passive shape became editable. No drag was started.
    Selected,
    /// A drag started on a handle or on the body.
    Grabbed(Hit),
}

/// Draw description for one handle square.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlePaint {
    pub handle: Handle,
    pub corners: [Point; 4],
    pub fill: Rgb,
    pub border: Rgb,
}

/// Draw description for a shape, in scene coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub outline: Rgb,
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point; 4],
    /// Empty unless the shape is editable.
    pub handles: Vec<HandlePaint>,
}

/// A shape that can be hit-tested, painted, and manipulated.
pub trait EditableShape {
    fn hit_test(&self, point: &Point) -> Option<Hit>;

    fn paint(&self) -> Paint;

    fn press(&mut self, point: Point) -> PressOutcome;

    /// Pointer moved with the button held.
    fn drag_to(&mut self, point: Point);

    /// Ends a drag. Returns true if one was in progress.
    fn release(&mut self, point: Point) -> bool;

    /// Updates the hovered handle. `None` means the pointer left the shape.
    fn hover(&mut self, point: Option<Point>);

    /// Returns true if the key was consumed.
    fn key_down_at(&mut self, key: Key, now: Instant) -> bool;

    fn key_down(&mut self, key: Key) -> bool {
        self.key_down_at(key, Instant::now())
    }

    fn key_up(&mut self, key: Key) -> bool;

    /// Advances the nudge timer to `now`.
    fn tick(&mut self, now: Instant);

    fn set_editable(&mut self, editable: bool);

    /// Makes the shape editable and highlights its label.
    fn focus_in(&mut self);

    /// Makes the shape passive and clears its highlight.
    fn focus_out(&mut self);

    fn is_editable(&self) -> bool;

    /// Notifies removal. The owner drops the shape afterwards.
    fn delete(&mut self);
}

/// A rotatable rectangle with eight resize handles and one rotation handle.
pub struct EditableBox {
    class_id: usize,
    position: Point,
    rect: Rect,
    rotation: f64,
    state: InteractionState,
    box_class: BoxClass,
    hovered: Option<Handle>,
    label: Weak<RefCell<LabelTag>>,
    allow_rotation: bool,
    move_speed: f64,
    velocity: Point,
    /// Arrow key driving the current nudge.
    nudge_key: Option<Key>,
    nudge: RepeatingTask,
    on_change: ChangeCallback,
}

impl EditableBox {
    /// Starts building a box whose unrotated scene rectangle is `x, y, w, h`.
    pub fn builder(x: f64, y: f64, w: f64, h: f64) -> EditableBoxBuilder {
        EditableBoxBuilder::new(x, y, w, h)
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn set_class_id(&mut self, class_id: usize) {
        self.class_id = class_id;
    }

    /// Classification from the last check. Not refreshed by edits.
    pub fn box_class(&self) -> BoxClass {
        self.box_class
    }

    pub fn set_box_class(&mut self, box_class: BoxClass) {
        self.box_class = box_class;
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Rectangle in local coordinates.
    pub fn local_rect(&self) -> Rect {
        self.rect
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging(_))
    }

    pub fn is_nudging(&self) -> bool {
        self.nudge.is_active()
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn hovered_handle(&self) -> Option<Handle> {
        self.hovered
    }

    pub fn label(&self) -> Option<Rc<RefCell<LabelTag>>> {
        self.label.upgrade()
    }

    pub fn set_label(&mut self, label: &Rc<RefCell<LabelTag>>) {
        self.label = Rc::downgrade(label);
        self.sync_label();
    }

    /// Unrotated rectangle in scene coordinates.
    pub fn scene_rect(&self) -> Rect {
        self.rect.translated(self.position)
    }

    /// Scene-space centre of the rectangle, the pivot for rotation.
    pub fn scene_center(&self) -> Point {
        self.position + self.rect.center()
    }

    /// The box in label-file form. Rotation is not representable and is
    /// dropped.
    pub fn to_yolo(&self, image_width: f64, image_height: f64) -> YoloBox {
        pixel_to_yolo(self.class_id, &self.scene_rect(), image_width, image_height)
    }

    /// Notifies that this box was just drawn.
    pub fn notify_created(&self) {
        self.notify(ShapeChange::Created);
    }

    fn to_local(&self, scene: Point) -> Point {
        let center = self.rect.center();
        center + (scene - self.position - center).rotated(-self.rotation)
    }

    fn to_scene(&self, local: Point) -> Point {
        let center = self.rect.center();
        self.position + center + (local - center).rotated(self.rotation)
    }

    fn quad(&self, rect: &Rect) -> [Point; 4] {
        [
            self.to_scene(Point::new(rect.xmin(), rect.ymin())),
            self.to_scene(Point::new(rect.xmax(), rect.ymin())),
            self.to_scene(Point::new(rect.xmax(), rect.ymax())),
            self.to_scene(Point::new(rect.xmin(), rect.ymax())),
        ]
    }

    fn selected_handle(&self) -> Option<Handle> {
        match &self.state {
            InteractionState::Dragging(drag) => drag.handle(),
            _ => None,
        }
    }

    fn translate(&mut self, offset: Point, change: ShapeChange) {
        self.position = self.position + offset;
        self.sync_label();
        self.notify(change);
    }

    fn stop_nudge(&mut self) {
        self.nudge.cancel();
        self.velocity = Point::default();
        self.nudge_key = None;
    }

    fn sync_label(&self) {
        if let Some(label) = self.label.upgrade() {
            label.borrow_mut().position =
                Point::new(self.position.x, self.position.y - LABEL_OFFSET_Y);
        }
    }

    fn highlight_label(&self, highlighted: bool) {
        if let Some(label) = self.label.upgrade() {
            label.borrow_mut().highlighted = highlighted;
        }
    }

    fn notify(&self, change: ShapeChange) {
        let callback = &self.on_change;
        match panic::catch_unwind(AssertUnwindSafe(|| callback(change))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("Change callback failed on {change:?}: {err}"),
            Err(payload) => log::error!(
                "Change callback panicked on {change:?}: {}",
                panic_message(payload.as_ref())
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl EditableShape for EditableBox {
    fn hit_test(&self, point: &Point) -> Option<Hit> {
        let local = self.to_local(*point);
        if self.is_editable() {
            if let Some(handle) = handle_at(&self.rect, &local, self.allow_rotation) {
                return Some(Hit::Handle(handle));
            }
        }
        self.rect.contains(&local).then_some(Hit::Body)
    }

    fn paint(&self) -> Paint {
        let handles = if self.is_editable() {
            let selected = self.selected_handle();
            Handle::ALL
                .into_iter()
                .filter(|handle| self.allow_rotation || !handle.is_rotate())
                .map(|handle| {
                    let (fill, border) = if Some(handle) == selected {
                        (Rgb::RED, Rgb::RED)
                    } else if Some(handle) == self.hovered {
                        (Rgb::ORANGE, Rgb::ORANGE)
                    } else if handle.is_rotate() {
                        (Rgb::GREEN, Rgb::BLACK)
                    } else {
                        (Rgb::WHITE, Rgb::BLACK)
                    };
                    HandlePaint {
                        handle,
                        corners: self.quad(&handle.square(&self.rect)),
                        fill,
                        border,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Paint {
            outline: self.box_class.outline_color(),
            corners: self.quad(&self.rect),
            handles,
        }
    }

    fn press(&mut self, point: Point) -> PressOutcome {
        if !self.is_editable() {
            self.focus_in();
            return PressOutcome::Selected;
        }

        let drag = match self.hit_test(&point) {
            Some(Hit::Handle(Handle::Rotate)) => Drag::Rotate,
            Some(Hit::Handle(handle)) => Drag::Resize {
                handle,
                press_point: point,
                press_rect: self.rect,
            },
            Some(Hit::Body) => Drag::Move { last: point },
            None => return PressOutcome::Ignored,
        };
        let hit = drag.handle().map(Hit::Handle).unwrap_or(Hit::Body);
        self.state = InteractionState::Dragging(drag);
        PressOutcome::Grabbed(hit)
    }

    fn drag_to(&mut self, point: Point) {
        let InteractionState::Dragging(drag) = self.state else {
            return;
        };

        match drag {
            Drag::Resize {
                handle,
                press_point,
                press_rect,
            } => {
                let delta = (point - press_point).rotated(-self.rotation);
                let rect = handle.resize(&press_rect, delta);
                // The pivot moves with the centre; shift the position so the
                // edges the handle does not own stay put in the scene.
                if self.rotation != 0.0 {
                    let shift = rect.center() - self.rect.center();
                    self.position = self.position + shift.rotated(self.rotation) - shift;
                }
                self.rect = rect;
                self.notify(ShapeChange::Resized);
            }
            Drag::Rotate => {
                self.rotation = self.scene_center().angle_to(&point);
                self.notify(ShapeChange::Rotated);
            }
            Drag::Move { last } => {
                let delta = point - last;
                self.state = InteractionState::Dragging(Drag::Move { last: point });
                if delta != Point::default() {
                    self.translate(delta, ShapeChange::Moved);
                }
            }
        }
    }

    fn release(&mut self, _point: Point) -> bool {
        if self.is_dragging() {
            self.state = InteractionState::Editable;
            true
        } else {
            false
        }
    }

    fn hover(&mut self, point: Option<Point>) {
        self.hovered = match point {
            Some(point) if self.is_editable() => {
                handle_at(&self.rect, &self.to_local(point), self.allow_rotation)
            }
            _ => None,
        };
    }

    fn key_down_at(&mut self, key: Key, now: Instant) -> bool {
        if !self.is_editable() {
            return false;
        }
        let Some(direction) = key.direction() else {
            return false;
        };

        self.velocity = Point::new(direction.x * self.move_speed, direction.y * self.move_speed);
        self.nudge_key = Some(key);
        self.translate(self.velocity, ShapeChange::Nudged);
        self.nudge.start(now);
        true
    }

    /// Only releasing the key that drives the nudge stops it.
    fn key_up(&mut self, key: Key) -> bool {
        if !key.is_arrow() {
            return false;
        }
        if self.nudge_key == Some(key) {
            self.stop_nudge();
        }
        true
    }

    fn tick(&mut self, now: Instant) {
        let ticks = self.nudge.due_ticks(now);
        if self.velocity == Point::default() {
            return;
        }
        for _ in 0..ticks {
            self.translate(self.velocity, ShapeChange::Nudged);
        }
    }

    fn set_editable(&mut self, editable: bool) {
        if editable {
            if self.state == InteractionState::Passive {
                self.state = InteractionState::Editable;
            }
        } else {
            self.state = InteractionState::Passive;
            self.hovered = None;
            self.stop_nudge();
        }
    }

    fn focus_in(&mut self) {
        self.set_editable(true);
        self.highlight_label(true);
    }

    fn focus_out(&mut self) {
        self.set_editable(false);
        self.highlight_label(false);
    }

    fn is_editable(&self) -> bool {
        self.state != InteractionState::Passive
    }

    fn delete(&mut self) {
        self.focus_out();
        self.notify(ShapeChange::Deleted);
    }
}

impl fmt::Debug for EditableBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditableBox")
            .field("class_id", &self.class_id)
            .field("position", &self.position)
            .field("rect", &self.rect)
            .field("rotation", &self.rotation)
            .field("state", &self.state)
            .field("box_class", &self.box_class)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EditableBox`]. A change callback is mandatory.
pub struct EditableBoxBuilder {
    scene_rect: Rect,
    class_id: usize,
    editable: bool,
    box_class: BoxClass,
    label: Weak<RefCell<LabelTag>>,
    allow_rotation: bool,
    move_speed: f64,
    nudge_interval: Duration,
    on_change: Option<ChangeCallback>,
}

impl EditableBoxBuilder {
    fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            scene_rect: Rect::from_xywh(x, y, w, h),
            class_id: 0,
            editable: false,
            box_class: BoxClass::Normal,
            label: Weak::new(),
            allow_rotation: true,
            move_speed: 1.0,
            nudge_interval: DEFAULT_NUDGE_INTERVAL,
            on_change: None,
        }
    }

    pub fn class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn box_class(mut self, box_class: BoxClass) -> Self {
        self.box_class = box_class;
        self
    }

    pub fn label(mut self, label: &Rc<RefCell<LabelTag>>) -> Self {
        self.label = Rc::downgrade(label);
        self
    }

    pub fn allow_rotation(mut self, allow_rotation: bool) -> Self {
        self.allow_rotation = allow_rotation;
        self
    }

    /// Pixels moved per nudge step.
    pub fn move_speed(mut self, move_speed: f64) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn nudge_interval(mut self, nudge_interval: Duration) -> Self {
        self.nudge_interval = nudge_interval;
        self
    }

    pub fn on_change<F>(self, callback: F) -> Self
    where
        F: Fn(ShapeChange) -> Result<(), CallbackError> + 'static,
    {
        self.shared_on_change(Rc::new(callback))
    }

    /// Uses a callback shared with other shapes.
    pub fn shared_on_change(mut self, callback: ChangeCallback) -> Self {
        self.on_change = Some(callback);
        self
    }

    pub fn build(self) -> Result<EditableBox, LabelCheckError> {
        let on_change = self
            .on_change
            .ok_or(LabelCheckError::MissingChangeCallback)?;

        let shape = EditableBox {
            class_id: self.class_id,
            position: self.scene_rect.min,
            rect: Rect::from_xywh(0.0, 0.0, self.scene_rect.width(), self.scene_rect.height()),
            rotation: 0.0,
            state: if self.editable {
                InteractionState::Editable
            } else {
                InteractionState::Passive
            },
            box_class: self.box_class,
            hovered: None,
            label: self.label,
            allow_rotation: self.allow_rotation,
            move_speed: self.move_speed,
            velocity: Point::default(),
            nudge_key: None,
            nudge: RepeatingTask::new(self.nudge_interval),
            on_change,
        };
        shape.sync_label();
        Ok(shape)
    }
}
