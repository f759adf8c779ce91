//! Scan result export: a CSV table of rows and a JSON report.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::check::FileStatus;
use crate::color::Rgb;
use crate::error::LabelCheckError;
use crate::scan::{ScanEvent, ScanSummary};

pub const CSV_HEADER: [&str; 3] = ["file_name", "status", "detail"];

/// Final state of one row of the results table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    pub row: usize,
    pub file_name: String,
    pub image: PathBuf,
    pub status: String,
    pub detail: String,
    pub color: Rgb,
    pub file_status: FileStatus,
}

/// Rows and totals of a finished scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub rows: Vec<ResultRow>,
}

impl ScanReport {
    /// Builds the table a scan leaves behind. When a row receives several
    /// events, the last one wins, as in a live table.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ScanEvent>) -> Self {
        let mut summary = ScanSummary::default();
        let mut rows = BTreeMap::new();

        for event in events {
            summary.record(event);
            if let ScanEvent::Progress(progress) = event {
                let file_name = progress
                    .image
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                rows.insert(
                    progress.row,
                    ResultRow {
                        row: progress.row,
                        file_name,
                        image: progress.image.clone(),
                        status: progress.status.to_string(),
                        detail: progress.detail.clone(),
                        color: progress.color,
                        file_status: progress.file_status,
                    },
                );
            }
        }

        Self {
            summary,
            rows: rows.into_values().collect(),
        }
    }
}

fn write_rows_csv<W: Write>(writer: W, rows: &[ResultRow]) -> csv::Result<W> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for row in rows {
        csv_writer.write_record([&row.file_name, &row.status, &row.detail])?;
    }
    csv_writer.into_inner().map_err(|e| e.into_error().into())
}

/// Writes `file_name,status,detail` rows to a CSV file.
pub fn write_results_csv(path: &Path, rows: &[ResultRow]) -> Result<(), LabelCheckError> {
    let file = File::create(path).map_err(LabelCheckError::Io)?;
    write_rows_csv(BufWriter::new(file), rows)
        .map_err(|source| LabelCheckError::CsvWrite {
            path: path.to_path_buf(),
            source,
        })?
        .flush()
        .map_err(LabelCheckError::Io)?;

    log::info!("exported {} row(s) to {}", rows.len(), path.display());
    Ok(())
}

/// Renders rows as CSV text.
pub fn to_results_csv_string(rows: &[ResultRow]) -> Result<String, LabelCheckError> {
    let bytes = write_rows_csv(Vec::new(), rows).map_err(|source| LabelCheckError::CsvWrite {
        path: PathBuf::from("<memory>"),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes the report as pretty-printed JSON.
pub fn write_report_json<W: Write>(writer: W, report: &ScanReport) -> Result<(), LabelCheckError> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
