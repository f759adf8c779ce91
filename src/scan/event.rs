//! Events streamed by a batch scan and the running totals built from them.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::check::FileStatus;
use crate::color::Rgb;

pub const STATUS_OK: &str = "OK";
pub const STATUS_OVERLAP: &str = "Overlap";
pub const STATUS_INVALID_LABEL: &str = "Invalid label";

/// One progress row update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScanProgress {
    /// Position of the image in the sorted scan order.
    pub row: usize,
    pub image: PathBuf,
    pub status: &'static str,
    pub detail: String,
    pub color: Rgb,
    /// Classification of the whole file, identical for every event of a row.
    pub file_status: FileStatus,
    pub overlaps: usize,
    pub invalid_labels: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Progress(ScanProgress),
    /// Always the last event of a scan, including a cancelled one.
    Finished {
        scanned: usize,
        skipped: usize,
        cancelled: bool,
    },
}

/// Totals across one scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub clean_files: usize,
    pub overlap_files: usize,
    pub invalid_label_files: usize,
    pub total_overlaps: usize,
    pub total_invalid_labels: usize,
    #[serde(skip)]
    last_row: Option<usize>,
}

impl ScanSummary {
    /// Folds one event into the totals.
    ///
    /// Events for the same row arrive back to back, so a file is counted
    /// on its first event only.
    pub fn record(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Progress(progress) => {
                if self.last_row == Some(progress.row) {
                    return;
                }
                self.last_row = Some(progress.row);

                if progress.file_status == FileStatus::Clean {
                    self.clean_files += 1;
                }
                if progress.file_status.has_overlaps() {
                    self.overlap_files += 1;
                }
                if progress.file_status.has_invalid_labels() {
                    self.invalid_label_files += 1;
                }
                self.total_overlaps += progress.overlaps;
                self.total_invalid_labels += progress.invalid_labels;
            }
            ScanEvent::Finished {
                scanned,
                skipped,
                cancelled,
            } => {
                self.scanned = *scanned;
                self.skipped = *skipped;
                self.cancelled = *cancelled;
            }
        }
    }

    /// True when no scanned file had an issue.
    pub fn is_clean(&self) -> bool {
        self.overlap_files == 0 && self.invalid_label_files == 0
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scanned {} file(s), skipped {}: {} clean, {} with overlaps ({} total), {} with invalid labels ({} total)",
            self.scanned,
            self.skipped,
            self.clean_files,
            self.overlap_files,
            self.total_overlaps,
            self.invalid_label_files,
            self.total_invalid_labels
        )?;
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        Ok(())
    }
}
