//! Configuration file support for labelcheck.
//!
//! Settings live in an optional `labelcheck.yaml`, either next to the
//! dataset or passed explicitly. Every field has a default, so an empty
//! file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::check::{CheckOptions, DEFAULT_OVERLAP_THRESHOLD};
use crate::error::LabelCheckError;
use crate::ir::LabelCatalog;

/// File name looked up in a dataset directory.
pub const CONFIG_FILE_NAME: &str = "labelcheck.yaml";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Checker and editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// IoU strictly above which two boxes are reported as overlapping.
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,

    /// `classes.txt` or `data.yaml` to bound class ids. Relative paths are
    /// resolved against the config file's directory.
    #[serde(default)]
    pub labels: Option<PathBuf>,

    /// Highest valid class id when no label file is given; `-1` disables
    /// the label check.
    #[serde(default)]
    pub max_class_id: Option<i64>,

    /// Save pending edits without asking before switching images.
    #[serde(default)]
    pub auto_save: bool,

    #[serde(default = "default_allow_rotation")]
    pub allow_rotation: bool,

    /// Arrow-key repeat interval while a key is held.
    #[serde(default = "default_nudge_interval_ms")]
    pub nudge_interval_ms: u64,

    /// Pixels per nudge step.
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,

    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_overlap_threshold() -> f64 {
    DEFAULT_OVERLAP_THRESHOLD
}

fn default_allow_rotation() -> bool {
    true
}

fn default_nudge_interval_ms() -> u64 {
    20
}

fn default_move_speed() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlap_threshold: default_overlap_threshold(),
            labels: None,
            max_class_id: None,
            auto_save: false,
            allow_rotation: default_allow_rotation(),
            nudge_interval_ms: default_nudge_interval_ms(),
            move_speed: default_move_speed(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self, LabelCheckError> {
        let data = fs::read_to_string(path)?;
        let mut config: Config =
            serde_yaml::from_str(&data).map_err(|source| LabelCheckError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        if let (Some(labels), Some(base)) = (config.labels.as_mut(), path.parent()) {
            if labels.is_relative() {
                *labels = base.join(&*labels);
            }
        }

        config.check_options(None).validate()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else `dir/labelcheck.yaml` if it exists,
    /// else defaults.
    pub fn resolve(dir: &Path, explicit: Option<&Path>) -> Result<Self, LabelCheckError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn nudge_interval(&self) -> Duration {
        Duration::from_millis(self.nudge_interval_ms)
    }

    /// Checker options. A catalog takes precedence over `max_class_id`.
    pub fn check_options(&self, catalog: Option<&LabelCatalog>) -> CheckOptions {
        let opts = CheckOptions::default().with_threshold(self.overlap_threshold);
        match (catalog, self.max_class_id) {
            (Some(catalog), _) => opts.with_catalog(catalog),
            (None, Some(max_class_id)) => opts.with_max_class_id_sentinel(max_class_id),
            (None, None) => opts,
        }
    }
}
