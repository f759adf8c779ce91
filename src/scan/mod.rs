//! Batch scanning of a dataset on a background thread.
//!
//! [`run_scan`] is the synchronous core: it walks the images in sorted
//! order, checks each annotation, and hands events to a sink. [`Scanner`]
//! runs it on a worker thread and streams the events over a channel.
//!
//! Cancellation is cooperative. The stop flag is read once before each
//! image, and a scan always ends with [`ScanEvent::Finished`].

mod event;

pub use event::{
    ScanEvent, ScanProgress, ScanSummary, STATUS_INVALID_LABEL, STATUS_OK, STATUS_OVERLAP,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::check::{check_annotation, CheckOptions, IssueSet};
use crate::color::Rgb;
use crate::dataset::Dataset;
use crate::error::LabelCheckError;
use crate::ir::load_annotation;

/// Everything a scan needs, captured when it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRequest {
    pub images: Vec<PathBuf>,
    /// Annotation file per image stem.
    pub annotation_paths: BTreeMap<String, PathBuf>,
    pub options: CheckOptions,
}

impl ScanRequest {
    pub fn new(
        images: Vec<PathBuf>,
        annotation_paths: BTreeMap<String, PathBuf>,
        options: CheckOptions,
    ) -> Self {
        Self {
            images,
            annotation_paths,
            options,
        }
    }

    pub fn from_dataset(dataset: &Dataset, options: CheckOptions) -> Self {
        Self::new(
            dataset.images().to_vec(),
            dataset.annotation_paths().clone(),
            options,
        )
    }

    /// Images in scan order: lexicographic by path string.
    pub fn sorted_images(&self) -> Vec<PathBuf> {
        let mut images = self.images.clone();
        images.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        images
    }
}

fn image_stem(image: &Path) -> String {
    image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs a scan to completion (or until `stop` is set), passing every event
/// to `sink`. Returns the totals of the run.
pub fn run_scan<F>(request: &ScanRequest, stop: &AtomicBool, mut sink: F) -> ScanSummary
where
    F: FnMut(ScanEvent),
{
    let images = request.sorted_images();
    log::info!(
        "scan started: {} image(s), overlap threshold {}",
        images.len(),
        request.options.overlap_threshold
    );

    let mut summary = ScanSummary::default();
    let mut emit = |event: ScanEvent| {
        summary.record(&event);
        sink(event);
    };

    let mut scanned = 0;
    let mut skipped = 0;
    let mut cancelled = false;

    for (row, image) in images.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            cancelled = true;
            break;
        }

        let stem = image_stem(image);
        let Some(annotation_path) = request.annotation_paths.get(&stem) else {
            log::warn!("skipping {}: no annotation file for '{stem}'", image.display());
            skipped += 1;
            continue;
        };

        let loaded = match load_annotation(annotation_path) {
            Ok(loaded) => loaded,
            Err(err) => {
                log::warn!("skipping {}: {err}", annotation_path.display());
                skipped += 1;
                continue;
            }
        };
        for line in &loaded.skipped {
            log::warn!(
                "{}:{}: skipped line ({})",
                annotation_path.display(),
                line.line,
                line.reason
            );
        }

        let issues = check_annotation(&loaded.annotation, &request.options);
        for event in row_events(row, image, &issues) {
            emit(event);
        }
        scanned += 1;
    }

    if cancelled {
        log::info!("scan cancelled after {scanned} image(s)");
    } else {
        log::info!("scan finished: {scanned} scanned, {skipped} skipped");
    }
    emit(ScanEvent::Finished {
        scanned,
        skipped,
        cancelled,
    });
    summary
}

/// Events for one checked image. A file with both kinds of issue yields
/// two events; the second detail repeats the first.
fn row_events(row: usize, image: &Path, issues: &IssueSet) -> Vec<ScanEvent> {
    let file_status = issues.status();
    let progress = |status: &'static str, detail: String, color: Rgb| {
        ScanEvent::Progress(ScanProgress {
            row,
            image: image.to_path_buf(),
            status,
            detail,
            color,
            file_status,
            overlaps: issues.overlaps.len(),
            invalid_labels: issues.invalid_labels.len(),
        })
    };

    if issues.is_clean() {
        return vec![progress(STATUS_OK, String::new(), Rgb::WHITE)];
    }

    let mut events = Vec::with_capacity(2);
    let mut details = Vec::with_capacity(2);
    if !issues.overlaps.is_empty() {
        details.push(format!("found {} overlap(s)", issues.overlaps.len()));
        events.push(progress(STATUS_OVERLAP, details.join("; "), Rgb::OVERLAP_ROW));
    }
    if !issues.invalid_labels.is_empty() {
        details.push(format!(
            "found {} invalid label(s)",
            issues.invalid_labels.len()
        ));
        events.push(progress(
            STATUS_INVALID_LABEL,
            details.join("; "),
            Rgb::INVALID_LABEL_ROW,
        ));
    }
    events
}

/// Runs scans on a background thread, one at a time.
#[derive(Default)]
pub struct Scanner {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ScanSummary>>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a scan and returns its event stream.
    ///
    /// A scan that is still running is stopped and joined first.
    pub fn start(&mut self, request: ScanRequest) -> Result<Receiver<ScanEvent>, LabelCheckError> {
        if self.handle.is_some() {
            self.stop();
            self.join();
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::channel();
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("label-scan".to_string())
            .spawn(move || {
                run_scan(&request, &thread_stop, |event| {
                    if event_tx.send(event).is_err() {
                        log::debug!("scan event receiver dropped");
                    }
                })
            })?;

        self.stop = stop;
        self.handle = Some(handle);
        Ok(event_rx)
    }

    /// Asks the running scan to stop before its next image.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the current scan and returns its totals.
    pub fn join(&mut self) -> Option<ScanSummary> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::warn!("Scan thread panicked: {:?}", e);
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::debug!("Stopping scan thread");
            self.stop();
            self.join();
        }
    }
}
