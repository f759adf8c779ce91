//! Issue set types for structured check results.
//!
//! An [`IssueSet`] is derived from one image's boxes and is never
//! persisted; recomputing it from the same inputs yields the same value.

use std::fmt;

use serde::Serialize;

use crate::color::Rgb;

/// Two boxes whose IoU exceeded the overlap threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Overlap {
    /// Index of the earlier box; always less than `second`.
    pub first: usize,
    pub second: usize,
    pub iou: f64,
}

/// A box whose class id is beyond the end of the label catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidLabel {
    pub index: usize,
    pub class_id: usize,
    pub max_class_id: usize,
}

/// All issues found in one annotation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IssueSet {
    pub overlaps: Vec<Overlap>,
    pub invalid_labels: Vec<InvalidLabel>,
}

impl IssueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.overlaps.is_empty() && self.invalid_labels.is_empty()
    }

    pub fn status(&self) -> FileStatus {
        match (self.overlaps.is_empty(), self.invalid_labels.is_empty()) {
            (true, true) => FileStatus::Clean,
            (false, true) => FileStatus::OverlapOnly,
            (true, false) => FileStatus::InvalidLabelOnly,
            (false, false) => FileStatus::Both,
        }
    }

    /// Classification of box `index` for display.
    ///
    /// Overlap wins over an invalid label when a box has both.
    pub fn classify_box(&self, index: usize) -> BoxClass {
        if self
            .overlaps
            .iter()
            .any(|o| o.first == index || o.second == index)
        {
            BoxClass::Overlap
        } else if self.invalid_labels.iter().any(|l| l.index == index) {
            BoxClass::InvalidLabel
        } else {
            BoxClass::Normal
        }
    }
}

impl fmt::Display for IssueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Check passed: no issues found");
        }

        writeln!(
            f,
            "Check found {} overlap(s) and {} invalid label(s):",
            self.overlaps.len(),
            self.invalid_labels.len()
        )?;
        writeln!(f)?;

        for overlap in &self.overlaps {
            writeln!(
                f,
                "  [OVERLAP] boxes {} and {}: IoU {:.3}",
                overlap.first, overlap.second, overlap.iou
            )?;
        }
        for label in &self.invalid_labels {
            writeln!(
                f,
                "  [LABEL  ] box {}: class id {} exceeds max class id {}",
                label.index, label.class_id, label.max_class_id
            )?;
        }

        Ok(())
    }
}

/// Per-box classification used to color shapes in the editor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxClass {
    #[default]
    Normal,
    Overlap,
    InvalidLabel,
}

impl BoxClass {
    /// Outline color for a box of this class.
    pub fn outline_color(&self) -> Rgb {
        match self {
            BoxClass::Normal => Rgb::GREEN,
            BoxClass::Overlap => Rgb::RED,
            BoxClass::InvalidLabel => Rgb::YELLOW,
        }
    }
}

impl fmt::Display for BoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoxClass::Normal => "ok",
            BoxClass::Overlap => "overlap",
            BoxClass::InvalidLabel => "invalid label",
        };
        f.write_str(name)
    }
}

/// Per-file classification used by the batch scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Clean,
    OverlapOnly,
    InvalidLabelOnly,
    Both,
}

impl FileStatus {
    pub fn has_overlaps(&self) -> bool {
        matches!(self, FileStatus::OverlapOnly | FileStatus::Both)
    }

    pub fn has_invalid_labels(&self) -> bool {
        matches!(self, FileStatus::InvalidLabelOnly | FileStatus::Both)
    }
}
