//! Box model for labelcheck.
//!
//! This module defines the value types everything else works on: a single
//! labelled box ([`YoloBox`]), the ordered box set of one image
//! ([`Annotation`]), the label catalog, and the corner-format geometry used
//! for IoU and for the editor.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: pixel and normalized coordinates are distinct types,
//!    so the editor cannot write pixel values into a label file by mistake.
//!
//! 2. **Order is identity**: boxes keep their source order from load to
//!    save, because issue reports refer to boxes by index.
//!
//! 3. **Permissive Construction**: degenerate boxes (zero or negative size)
//!    can be represented; the checker reports on them instead of panicking.
//!
//! # Example
//!
//! ```
//! use labelcheck::ir::{iou, YoloBox};
//!
//! let a = YoloBox::new(0, 0.5, 0.5, 0.4, 0.4);
//! let b = YoloBox::new(0, 0.5, 0.5, 0.4, 0.4);
//! assert_eq!(iou(&a, &b), 1.0);
//! ```

pub mod annotation;
mod bbox;
pub mod catalog;
mod coord;
mod space;

pub use annotation::{
    from_annotation_str, iou, load_annotation, parse_annotation, parse_box, save_annotation,
    to_annotation_string, Annotation, AnnotationSource, LoadedAnnotation, SkippedLine, YoloBox,
};
pub use bbox::BBoxXYXY;
pub use catalog::LabelCatalog;
pub use coord::Coord;
pub use space::{Normalized, Pixel};
