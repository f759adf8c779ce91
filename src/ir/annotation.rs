//! YOLO label files: one box per line, `class_id cx cy w h`, normalized.
//!
//! Loading is deliberately forgiving. A missing file is an empty annotation,
//! and a malformed line is skipped without aborting the rest of the file.
//! Both facts are reported back in [`LoadedAnnotation`] so the caller can
//! decide how loud to be about them.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{BBoxXYXY, Normalized};
use crate::error::LabelCheckError;

/// A single labelled box in normalized center format.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct YoloBox {
    pub class_id: usize,
    /// Center x.
    pub cx: f64,
    /// Center y.
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl YoloBox {
    pub fn new(class_id: usize, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            class_id,
            cx,
            cy,
            w,
            h,
        }
    }

    /// Converts to corner format. Pure, no clamping.
    #[inline]
    pub fn to_corners(&self) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_cxcywh(self.cx, self.cy, self.w, self.h)
    }

    /// Builds a box from normalized corners.
    pub fn from_corners(class_id: usize, corners: &BBoxXYXY<Normalized>) -> Self {
        let (cx, cy, w, h) = corners.to_cxcywh();
        Self::new(class_id, cx, cy, w, h)
    }

    /// True when the box has positive, finite extent.
    pub fn has_valid_geometry(&self) -> bool {
        self.w > 0.0 && self.h > 0.0 && self.to_corners().is_finite()
    }
}

/// Intersection over union of two boxes.
///
/// Symmetric, in `[0, 1]`, and exactly `0.0` for disjoint or edge-touching
/// boxes.
pub fn iou(a: &YoloBox, b: &YoloBox) -> f64 {
    a.to_corners().iou(&b.to_corners())
}

/// All boxes for one image, in source order.
///
/// The position of a box in `boxes` is its identity in issue reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Annotation {
    pub boxes: Vec<YoloBox>,
}

impl Annotation {
    pub fn new(boxes: Vec<YoloBox>) -> Self {
        Self { boxes }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Whether the label file existed when it was loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSource {
    Present,
    Missing,
}

/// A line that was ignored during parsing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Result of loading a label file.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedAnnotation {
    pub annotation: Annotation,
    pub source: AnnotationSource,
    pub skipped: Vec<SkippedLine>,
}

impl LoadedAnnotation {
    fn missing() -> Self {
        Self {
            annotation: Annotation::default(),
            source: AnnotationSource::Missing,
            skipped: Vec::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.source == AnnotationSource::Missing
    }
}

/// Load a label file, reporting absence and skipped lines explicitly.
///
/// Only genuine I/O failures (permissions, invalid UTF-8, a directory in
/// place of a file) are returned as errors.
pub fn load_annotation(path: &Path) -> Result<LoadedAnnotation, LabelCheckError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(from_annotation_str(&content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(LoadedAnnotation::missing()),
        Err(err) => Err(LabelCheckError::Io(err)),
    }
}

/// Load a label file, logging skipped lines and returning only the boxes.
pub fn parse_annotation(path: &Path) -> Result<Annotation, LabelCheckError> {
    let loaded = load_annotation(path)?;
    if loaded.is_missing() {
        log::debug!("annotation file {} not found, using empty box set", path.display());
    }
    for skipped in &loaded.skipped {
        log::warn!(
            "{}:{}: skipped line ({})",
            path.display(),
            skipped.line,
            skipped.reason
        );
    }
    Ok(loaded.annotation)
}

/// Parse label file contents held in memory.
pub fn from_annotation_str(content: &str) -> LoadedAnnotation {
    let mut boxes = Vec::new();
    let mut skipped = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        match parse_label_line(line) {
            Ok(Some(parsed)) => boxes.push(parsed),
            Ok(None) => {}
            Err(reason) => skipped.push(SkippedLine {
                line: line_idx + 1,
                reason,
            }),
        }
    }

    LoadedAnnotation {
        annotation: Annotation::new(boxes),
        source: AnnotationSource::Present,
        skipped,
    }
}

fn parse_label_line(line: &str) -> Result<Option<YoloBox>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    if tokens.len() != 5 {
        let found = if tokens.len() > 5 {
            "more than 5".to_string()
        } else {
            tokens.len().to_string()
        };
        return Err(format!("expected 5 fields, found {found}"));
    }

    let mut values = [0.0f64; 5];
    for (value, token) in values.iter_mut().zip(&tokens) {
        *value = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{token}' is not a number"))?;
    }

    let class_id = class_id_from_f64(values[0])
        .ok_or_else(|| format!("'{}' is not a valid class id", tokens[0]))?;

    Ok(Some(YoloBox::new(
        class_id, values[1], values[2], values[3], values[4],
    )))
}

/// Parse a single box given as `"cx cy w h"` (class 0) or
/// `"class cx cy w h"`.
pub fn parse_box(input: &str) -> Result<YoloBox, LabelCheckError> {
    let invalid = |message: String| LabelCheckError::InvalidBox {
        input: input.to_string(),
        message,
    };

    let line = if input.split_whitespace().count() == 4 {
        format!("0 {input}")
    } else {
        input.to_string()
    };
    parse_label_line(&line)
        .map_err(invalid)?
        .ok_or_else(|| invalid("empty input".to_string()))
}

/// Label files sometimes carry class ids as floats (`"3.0"`); accept those
/// when they are integral and non-negative.
fn class_id_from_f64(raw: f64) -> Option<usize> {
    if raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw <= usize::MAX as f64 {
        Some(raw as usize)
    } else {
        None
    }
}

/// Serialize boxes in label-file layout with 6-decimal precision.
pub fn to_annotation_string(boxes: &[YoloBox]) -> String {
    let mut out = String::new();
    for b in boxes {
        out.push_str(&format_box(b));
        out.push('\n');
    }
    out
}

fn format_box(b: &YoloBox) -> String {
    format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        b.class_id, b.cx, b.cy, b.w, b.h
    )
}

/// Overwrite `path` with `boxes`, one per line, in the given order.
pub fn save_annotation(path: &Path, boxes: &[YoloBox]) -> Result<(), LabelCheckError> {
    let save_failed = |source| LabelCheckError::SaveFailed {
        path: PathBuf::from(path),
        source,
    };

    let file = fs::File::create(path).map_err(save_failed)?;
    let mut writer = BufWriter::new(file);
    for b in boxes {
        writeln!(writer, "{}", format_box(b)).map_err(save_failed)?;
    }
    writer.flush().map_err(save_failed)?;

    log::debug!("saved {} box(es) to {}", boxes.len(), path.display());
    Ok(())
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<Option<YoloBox>, String> {
    parse_label_line(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_label_line_accepts_valid_rows() {
        let parsed = parse_label_line("2 0.5 0.25 0.3 0.1")
            .expect("parse should succeed")
            .expect("line should produce a box");
        assert_eq!(parsed, YoloBox::new(2, 0.5, 0.25, 0.3, 0.1));
    }

    #[test]
    fn parse_label_line_rejects_non_finite_values() {
        assert!(parse_label_line("0 nan 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("0 0.5 inf 0.1 0.1").is_err());
    }

    #[test]
    fn parse_box_defaults_class_to_zero() {
        assert_eq!(
            parse_box("0.5 0.5 0.2 0.2").expect("parse"),
            YoloBox::new(0, 0.5, 0.5, 0.2, 0.2)
        );
        assert_eq!(
            parse_box("4 0.5 0.5 0.2 0.2").expect("parse").class_id,
            4
        );
        assert!(matches!(
            parse_box("0.5 0.5 0.2"),
            Err(LabelCheckError::InvalidBox { .. })
        ));
        assert!(matches!(
            parse_box("  "),
            Err(LabelCheckError::InvalidBox { .. })
        ));
    }

    #[test]
    fn parse_label_line_accepts_integral_float_class() {
        let parsed = parse_label_line("3.0 0.5 0.5 0.1 0.1")
            .expect("parse should succeed")
            .expect("line should produce a box");
        assert_eq!(parsed.class_id, 3);
    }

    #[test]
    fn parse_label_line_skips_blank_rows() {
        assert_eq!(parse_label_line("   "), Ok(None));
    }

    #[test]
    fn parse_label_line_rejects_wrong_field_counts() {
        assert!(parse_label_line("0 0.1 0.2").is_err());
        assert!(parse_label_line("0 0.1 0.2 0.3 0.4 0.5").is_err());
    }

    #[test]
    fn parse_label_line_rejects_bad_class_ids() {
        assert!(parse_label_line("-1 0.5 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("1.5 0.5 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("cat 0.5 0.5 0.1 0.1").is_err());
    }

    #[test]
    fn malformed_lines_do_not_abort_the_file() {
        let loaded = from_annotation_str("0 0.5 0.5 0.2 0.2\nnot a box\n1 0.1 0.1 0.05 0.05\n");
        assert_eq!(loaded.annotation.len(), 2);
        assert_eq!(loaded.annotation.boxes[1].class_id, 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].line, 2);
    }

    #[test]
    fn missing_file_is_empty_and_flagged() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let loaded = load_annotation(&temp.path().join("absent.txt")).expect("load");
        assert!(loaded.is_missing());
        assert!(loaded.annotation.is_empty());
    }

    #[test]
    fn directory_in_place_of_file_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        assert!(load_annotation(temp.path()).is_err());
    }

    #[test]
    fn to_annotation_string_uses_six_decimals() {
        let text = to_annotation_string(&[YoloBox::new(4, 0.5, 0.25, 0.125, 1.0 / 3.0)]);
        assert_eq!(text, "4 0.500000 0.250000 0.125000 0.333333\n");
    }

    #[test]
    fn save_annotation_overwrites_existing_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.txt");
        fs::write(&path, "0 0.1 0.1 0.1 0.1\n1 0.2 0.2 0.2 0.2\n").expect("seed file");

        save_annotation(&path, &[YoloBox::new(7, 0.5, 0.5, 0.5, 0.5)]).expect("save");

        let reloaded = load_annotation(&path).expect("reload");
        assert_eq!(reloaded.annotation.boxes, vec![YoloBox::new(7, 0.5, 0.5, 0.5, 0.5)]);
    }

    #[test]
    fn save_annotation_reports_failure() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("no_such_dir").join("img.txt");
        let err = save_annotation(&path, &[]).unwrap_err();
        assert!(matches!(err, LabelCheckError::SaveFailed { .. }));
    }

    #[test]
    fn iou_is_symmetric_for_free_function() {
        let a = YoloBox::new(0, 0.4, 0.4, 0.3, 0.3);
        let b = YoloBox::new(0, 0.5, 0.5, 0.3, 0.3);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        assert!(iou(&a, &b) > 0.0);
    }
}
