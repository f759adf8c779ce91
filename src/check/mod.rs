//! Annotation consistency checks.
//!
//! This module checks one image's boxes for:
//! - Overlaps: box pairs whose IoU is strictly above the threshold
//! - Invalid labels: class ids past the end of the label catalog

mod report;

pub use report::{BoxClass, FileStatus, InvalidLabel, IssueSet, Overlap};

use serde::Serialize;

use crate::error::LabelCheckError;
use crate::ir::{iou, Annotation, LabelCatalog, YoloBox};

/// Default IoU above which two boxes are reported as overlapping.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.6;

/// Options for check behavior.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CheckOptions {
    /// IoU threshold in `[0, 1]`; pairs strictly above it are reported.
    pub overlap_threshold: f64,
    /// Highest valid class id. `None` disables the label check.
    pub max_class_id: Option<usize>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            max_class_id: None,
        }
    }
}

impl CheckOptions {
    pub fn with_threshold(mut self, overlap_threshold: f64) -> Self {
        self.overlap_threshold = overlap_threshold;
        self
    }

    /// Bound class ids by `catalog`. An empty catalog disables the check.
    pub fn with_catalog(mut self, catalog: &LabelCatalog) -> Self {
        self.max_class_id = catalog.max_class_id();
        self
    }

    /// Interpret the `-1` sentinel used by label tools for "no catalog".
    pub fn with_max_class_id_sentinel(mut self, max_class_id: i64) -> Self {
        self.max_class_id = usize::try_from(max_class_id).ok();
        self
    }

    pub fn validate(&self) -> Result<(), LabelCheckError> {
        if (0.0..=1.0).contains(&self.overlap_threshold) {
            Ok(())
        } else {
            Err(LabelCheckError::InvalidThreshold(self.overlap_threshold))
        }
    }
}

/// Checks an annotation and returns every issue found.
///
/// The overlap pass is quadratic in the box count.
pub fn check_annotation(annotation: &Annotation, opts: &CheckOptions) -> IssueSet {
    check_boxes(&annotation.boxes, opts)
}

/// Same as [`check_annotation`] on a bare slice of boxes.
pub fn check_boxes(boxes: &[YoloBox], opts: &CheckOptions) -> IssueSet {
    let mut issues = IssueSet::new();

    if let Some(max_class_id) = opts.max_class_id {
        check_labels(boxes, max_class_id, &mut issues);
    }
    check_overlaps(boxes, opts.overlap_threshold, &mut issues);

    issues
}

fn check_labels(boxes: &[YoloBox], max_class_id: usize, issues: &mut IssueSet) {
    for (index, b) in boxes.iter().enumerate() {
        if b.class_id > max_class_id {
            issues.invalid_labels.push(InvalidLabel {
                index,
                class_id: b.class_id,
                max_class_id,
            });
        }
    }
}

fn check_overlaps(boxes: &[YoloBox], threshold: f64, issues: &mut IssueSet) {
    for (i, first) in boxes.iter().enumerate() {
        for (j, second) in boxes.iter().enumerate().skip(i + 1) {
            let value = iou(first, second);
            if value > threshold {
                issues.overlaps.push(Overlap {
                    first: i,
                    second: j,
                    iou: value,
                });
            }
        }
    }
}
