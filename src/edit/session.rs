//! Editing session for one image: owns its shapes and routes input.
//!
//! Pointer presses go to the selected shape's handles first, then to the
//! top-most shape under the pointer (the last in box order). A press on
//! empty canvas clears the selection. At most one shape is editable.
//!
//! Box classification is recomputed when a gesture ends (pointer release,
//! arrow key release, delete, relabel, or a committed drawing), not on
//! every intermediate move.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use super::geometry::{rect_from_corners, yolo_to_pixel, Point, Rect};
use super::shape::{
    ChangeCallback, EditableBox, EditableBoxBuilder, EditableShape, Hit, Key, LabelTag, Paint,
    ShapeChange,
};
use crate::check::{check_annotation, CheckOptions, IssueSet};
use crate::config::Config;
use crate::error::LabelCheckError;
use crate::ir::{parse_annotation, save_annotation, Annotation, LabelCatalog};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
}

/// State of the add-box gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DrawingState {
    /// Not drawing.
    #[default]
    Idle,
    /// Drawing mode entered, waiting for the first press.
    Armed,
    /// Primary button held; `provisional` follows the pointer.
    Dragging {
        anchor: Point,
        provisional: Option<Rect>,
    },
}

impl DrawingState {
    pub fn is_drawing(&self) -> bool {
        !matches!(self, DrawingState::Idle)
    }

    pub fn provisional(&self) -> Option<Rect> {
        match self {
            DrawingState::Dragging { provisional, .. } => *provisional,
            _ => None,
        }
    }
}

/// The in-memory annotation of one open image.
pub struct EditSession {
    path: PathBuf,
    image_width: f64,
    image_height: f64,
    shapes: Vec<EditableBox>,
    labels: Vec<Rc<RefCell<LabelTag>>>,
    selected: Option<usize>,
    /// Shape receiving the current pointer drag.
    grabbed: Option<usize>,
    drawing: DrawingState,
    catalog: LabelCatalog,
    options: CheckOptions,
    issues: IssueSet,
    config: Config,
    dirty: Rc<Cell<bool>>,
    on_change: ChangeCallback,
}

impl EditSession {
    /// Opens a session on `annotation`, which belongs to an image of
    /// `image_size` pixels and is saved back to `path`.
    ///
    /// `issues` provides the initial box classification.
    pub fn open(
        path: impl Into<PathBuf>,
        annotation: &Annotation,
        image_size: (u32, u32),
        issues: &IssueSet,
        catalog: LabelCatalog,
        config: &Config,
    ) -> Result<Self, LabelCheckError> {
        let path = path.into();
        let (width, height) = image_size;
        if width == 0 || height == 0 {
            return Err(LabelCheckError::DatasetInvalid {
                path,
                message: format!("image size {width}x{height} has no area"),
            });
        }

        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        let on_change: ChangeCallback = Rc::new(move |change: ShapeChange| {
            log::trace!("shape changed: {change:?}");
            flag.set(true);
            Ok(())
        });

        let mut session = Self {
            path,
            image_width: f64::from(width),
            image_height: f64::from(height),
            shapes: Vec::with_capacity(annotation.len()),
            labels: Vec::with_capacity(annotation.len()),
            selected: None,
            grabbed: None,
            drawing: DrawingState::Idle,
            options: config.check_options(Some(&catalog)),
            catalog,
            issues: issues.clone(),
            config: config.clone(),
            dirty,
            on_change,
        };

        for (index, b) in annotation.boxes.iter().enumerate() {
            let rect = yolo_to_pixel(b, session.image_width, session.image_height);
            let label = session.make_label(b.class_id);
            let shape = session
                .shape_builder(&rect, b.class_id, &label)
                .box_class(issues.classify_box(index))
                .build()?;
            session.shapes.push(shape);
            session.labels.push(label);
        }

        log::debug!(
            "opened {} with {} box(es)",
            session.path.display(),
            session.shapes.len()
        );
        Ok(session)
    }

    /// Opens a session from files: reads the image size and the annotation,
    /// then runs an initial check.
    pub fn open_files(
        image_path: &Path,
        annotation_path: &Path,
        catalog: LabelCatalog,
        config: &Config,
    ) -> Result<Self, LabelCheckError> {
        let image_size = crate::dataset::image_dimensions(image_path)?;
        let annotation = parse_annotation(annotation_path)?;
        let issues = check_annotation(&annotation, &config.check_options(Some(&catalog)));
        Self::open(
            annotation_path,
            &annotation,
            image_size,
            &issues,
            catalog,
            config,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image_size(&self) -> (f64, f64) {
        (self.image_width, self.image_height)
    }

    pub fn shapes(&self) -> &[EditableBox] {
        &self.shapes
    }

    pub fn label(&self, index: usize) -> Option<LabelTag> {
        self.labels.get(index).map(|label| label.borrow().clone())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn drawing(&self) -> DrawingState {
        self.drawing
    }

    pub fn issues(&self) -> &IssueSet {
        &self.issues
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn has_changes(&self) -> bool {
        self.dirty.get()
    }

    /// Draw descriptions for every shape, in box order.
    pub fn paint(&self) -> Vec<Paint> {
        self.shapes.iter().map(EditableShape::paint).collect()
    }

    // -- pointer and keyboard routing --------------------------------------

    pub fn pointer_press(&mut self, point: Point, button: MouseButton) {
        if self.drawing.is_drawing() {
            match button {
                MouseButton::Secondary => self.cancel_drawing(),
                MouseButton::Primary => {
                    self.drawing = DrawingState::Dragging {
                        anchor: point,
                        provisional: None,
                    };
                }
            }
            return;
        }
        if button != MouseButton::Primary {
            return;
        }

        // Handles of the selected shape win over any body underneath.
        if let Some(index) = self.selected {
            if matches!(self.shapes[index].hit_test(&point), Some(Hit::Handle(_))) {
                self.shapes[index].press(point);
                self.grabbed = Some(index);
                return;
            }
        }

        let Some(index) = self
            .shapes
            .iter()
            .rposition(|shape| shape.hit_test(&point).is_some())
        else {
            self.clear_selection();
            return;
        };

        if self.selected != Some(index) {
            self.clear_selection();
            self.selected = Some(index);
            log::debug!("selected box {index}");
        }
        self.shapes[index].press(point);
        if self.shapes[index].is_dragging() {
            self.grabbed = Some(index);
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        if let DrawingState::Dragging { anchor, .. } = self.drawing {
            self.drawing = DrawingState::Dragging {
                anchor,
                provisional: Some(rect_from_corners(anchor, point)),
            };
            return;
        }

        if let Some(index) = self.grabbed {
            self.shapes[index].drag_to(point);
        } else if let Some(index) = self.selected {
            self.shapes[index].hover(Some(point));
        }
    }

    pub fn pointer_release(&mut self, point: Point, button: MouseButton) {
        if self.drawing.is_drawing() {
            if button == MouseButton::Primary {
                self.finish_drawing();
            }
            return;
        }

        if let Some(index) = self.grabbed.take() {
            if self.shapes[index].release(point) {
                self.reclassify();
            }
        }
    }

    pub fn key_down(&mut self, key: Key) -> bool {
        self.key_down_at(key, Instant::now())
    }

    /// Keys are ignored while drawing.
    pub fn key_down_at(&mut self, key: Key, now: Instant) -> bool {
        if self.drawing.is_drawing() {
            return false;
        }
        match self.selected {
            Some(index) => self.shapes[index].key_down_at(key, now),
            None => false,
        }
    }

    pub fn key_up(&mut self, key: Key) -> bool {
        let Some(index) = self.selected else {
            return false;
        };
        let consumed = self.shapes[index].key_up(key);
        if consumed {
            self.reclassify();
        }
        consumed
    }

    /// Drives nudge timers up to `now`.
    pub fn tick(&mut self, now: Instant) {
        for shape in &mut self.shapes {
            shape.tick(now);
        }
    }

    // -- selection ----------------------------------------------------------

    pub fn select(&mut self, index: usize) -> Result<(), LabelCheckError> {
        if index >= self.shapes.len() {
            return Err(LabelCheckError::NoSelection);
        }
        if self.selected != Some(index) {
            self.clear_selection();
        }
        self.shapes[index].focus_in();
        self.selected = Some(index);
        Ok(())
    }

    /// Selects the box after the current one, wrapping around.
    pub fn select_next(&mut self) -> Option<usize> {
        if self.shapes.is_empty() {
            return None;
        }
        let next = self
            .selected
            .map(|index| (index + 1) % self.shapes.len())
            .unwrap_or(0);
        self.select(next).ok()?;
        Some(next)
    }

    pub fn clear_selection(&mut self) {
        if let Some(index) = self.selected.take() {
            self.shapes[index].focus_out();
        }
        self.grabbed = None;
    }

    // -- editing commands ---------------------------------------------------

    /// Enters drawing mode. Pointer events create a new box until the
    /// gesture is committed or cancelled.
    pub fn begin_drawing(&mut self) {
        self.clear_selection();
        self.drawing = DrawingState::Armed;
        log::debug!("drawing mode entered");
    }

    pub fn cancel_drawing(&mut self) {
        if self.drawing.is_drawing() {
            log::debug!("drawing cancelled");
        }
        self.drawing = DrawingState::Idle;
    }

    fn finish_drawing(&mut self) {
        let provisional = self.drawing.provisional();
        self.drawing = DrawingState::Idle;

        let Some(rect) = provisional else {
            log::debug!("drawing finished without a box");
            return;
        };

        let label = self.make_label(0);
        let shape = match self.shape_builder(&rect, 0, &label).build() {
            Ok(shape) => shape,
            Err(err) => {
                log::error!("failed to create drawn box: {err}");
                return;
            }
        };

        self.clear_selection();
        self.shapes.push(shape);
        self.labels.push(label);
        let index = self.shapes.len() - 1;
        self.shapes[index].focus_in();
        self.selected = Some(index);
        self.shapes[index].notify_created();
        self.reclassify();
        log::info!(
            "added box {index} at ({:.1}, {:.1}) size {:.1}x{:.1}",
            rect.xmin(),
            rect.ymin(),
            rect.width(),
            rect.height()
        );
    }

    pub fn delete_selected(&mut self) -> Result<(), LabelCheckError> {
        let index = self.selected.take().ok_or(LabelCheckError::NoSelection)?;
        self.grabbed = None;
        self.shapes[index].delete();
        self.shapes.remove(index);
        self.labels.remove(index);
        self.reclassify();
        log::info!("deleted box {index}");
        Ok(())
    }

    /// Changes the selected box's class. The id must exist in the catalog.
    pub fn relabel_selected(&mut self, class_id: usize) -> Result<(), LabelCheckError> {
        let index = self.selected.ok_or(LabelCheckError::NoSelection)?;
        if self.catalog.name(class_id).is_none() {
            return Err(LabelCheckError::ClassIdOutOfRange {
                class_id,
                max_class_id: self.catalog.len().saturating_sub(1),
            });
        }

        self.shapes[index].set_class_id(class_id);
        {
            let mut label = self.labels[index].borrow_mut();
            label.text = self.label_text(class_id);
            label.color = self.catalog.color(class_id);
        }
        self.dirty.set(true);
        self.reclassify();

        if self.config.auto_save {
            self.save()?;
        }
        Ok(())
    }

    // -- persistence --------------------------------------------------------

    /// Current boxes in label-file form, in box order.
    pub fn to_annotation(&self) -> Annotation {
        Annotation::new(
            self.shapes
                .iter()
                .map(|shape| shape.to_yolo(self.image_width, self.image_height))
                .collect(),
        )
    }

    /// Writes all boxes to the annotation file. On failure the session
    /// stays marked as changed.
    pub fn save(&mut self) -> Result<(), LabelCheckError> {
        let rotated = self
            .shapes
            .iter()
            .filter(|shape| shape.rotation() != 0.0)
            .count();
        if rotated > 0 {
            log::warn!(
                "{rotated} rotated box(es) in {} are saved without rotation",
                self.path.display()
            );
        }

        save_annotation(&self.path, &self.to_annotation().boxes)?;
        self.dirty.set(false);
        log::info!("saved {} box(es) to {}", self.shapes.len(), self.path.display());
        Ok(())
    }

    /// Resolves pending changes before the image is closed.
    ///
    /// Returns `Ok(true)` if a save happened. Without `auto_save`, pending
    /// changes are reported as [`LabelCheckError::UnsavedChanges`] so the
    /// caller can ask the user.
    pub fn maybe_save(&mut self) -> Result<bool, LabelCheckError> {
        if !self.has_changes() {
            return Ok(false);
        }
        if self.config.auto_save {
            self.save()?;
            Ok(true)
        } else {
            Err(LabelCheckError::UnsavedChanges {
                path: self.path.clone(),
            })
        }
    }

    /// Drops the pending-changes flag without saving.
    pub fn discard_changes(&mut self) {
        self.dirty.set(false);
    }

    /// Re-runs the checker on the live boxes with `opts` and updates every
    /// shape's classification.
    pub fn refresh_classification(&mut self, opts: &CheckOptions) -> &IssueSet {
        self.options = *opts;
        self.reclassify();
        &self.issues
    }

    fn reclassify(&mut self) {
        self.issues = check_annotation(&self.to_annotation(), &self.options);
        for (index, shape) in self.shapes.iter_mut().enumerate() {
            shape.set_box_class(self.issues.classify_box(index));
        }
    }

    fn label_text(&self, class_id: usize) -> String {
        self.catalog
            .name(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| class_id.to_string())
    }

    fn make_label(&self, class_id: usize) -> Rc<RefCell<LabelTag>> {
        Rc::new(RefCell::new(LabelTag::new(
            self.label_text(class_id),
            self.catalog.color(class_id),
        )))
    }

    fn shape_builder(
        &self,
        rect: &Rect,
        class_id: usize,
        label: &Rc<RefCell<LabelTag>>,
    ) -> EditableBoxBuilder {
        EditableBox::builder(rect.xmin(), rect.ymin(), rect.width(), rect.height())
            .class_id(class_id)
            .label(label)
            .allow_rotation(self.config.allow_rotation)
            .move_speed(self.config.move_speed)
            .nudge_interval(self.config.nudge_interval())
            .shared_on_change(Rc::clone(&self.on_change))
    }
}
