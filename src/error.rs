use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelcheck operations.
#[derive(Debug, Error)]
pub enum LabelCheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save annotation file {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid label catalog {path}: {message}")]
    LabelCatalogInvalid { path: PathBuf, message: String },

    #[error("Failed to parse data.yaml at {path}: {source}")]
    DataYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid dataset directory {path}: {message}")]
    DatasetInvalid { path: PathBuf, message: String },

    #[error("Overlap threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Editable shape requires an on_change callback")]
    MissingChangeCallback,

    #[error("Class id {class_id} is out of range (max class id {max_class_id})")]
    ClassIdOutOfRange {
        class_id: usize,
        max_class_id: usize,
    },

    #[error("No box is selected")]
    NoSelection,

    #[error("Annotation {path} has unsaved changes")]
    UnsavedChanges { path: PathBuf },

    #[error("Invalid box '{input}': {message}")]
    InvalidBox { input: String, message: String },

    #[error("Failed to write CSV to {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to serialize report as JSON: {0}")]
    ReportJson(#[from] serde_json::Error),

    #[error("Check found {overlap_files} file(s) with overlaps and {invalid_label_files} file(s) with invalid labels")]
    CheckFailed {
        overlap_files: usize,
        invalid_label_files: usize,
    },
}
