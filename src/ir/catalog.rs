//! Label catalogs: the ordered class names an annotation set may use.
//!
//! A catalog comes from `classes.txt` (one name per line, line index is the
//! class id) or from the `names` field of a YOLO `data.yaml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::color::{label_color, Rgb};
use crate::error::LabelCheckError;

/// Ordered list of class names; index is the class id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    names: Vec<String>,
}

impl LabelCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load a catalog, choosing the parser by file name.
    pub fn load(path: &Path) -> Result<Self, LabelCheckError> {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let catalog = if is_yaml {
            read_data_yaml(path)?
        } else {
            read_classes_txt(path)?
        };
        log::info!("loaded {} label(s) from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Highest valid class id, or `None` for an empty catalog.
    pub fn max_class_id(&self) -> Option<usize> {
        self.names.len().checked_sub(1)
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn class_id(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Display color for a class id; ids outside the catalog render white.
    pub fn color(&self, class_id: usize) -> Rgb {
        self.name(class_id).map(label_color).unwrap_or(Rgb::WHITE)
    }
}

/// Read `classes.txt`. Blank lines are ignored.
pub fn read_classes_txt(path: &Path) -> Result<LabelCatalog, LabelCheckError> {
    let data = fs::read_to_string(path)?;
    Ok(from_classes_str(&data))
}

/// Parse `classes.txt` contents held in memory.
pub fn from_classes_str(data: &str) -> LabelCatalog {
    let names = data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    LabelCatalog::new(names)
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    names: DataYamlNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

/// Read the `names` field of a YOLO `data.yaml`.
///
/// Gaps in an index mapping are filled with `class_<n>` so that the
/// position of every name still equals its class id.
pub fn read_data_yaml(path: &Path) -> Result<LabelCatalog, LabelCheckError> {
    let data = fs::read_to_string(path)?;
    let parsed: DataYaml =
        serde_yaml::from_str(&data).map_err(|source| LabelCheckError::DataYamlParse {
            path: path.to_path_buf(),
            source,
        })?;

    let names = match parsed.names {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            let Some(max_index) = mapping.keys().max().copied() else {
                return Ok(LabelCatalog::default());
            };
            if max_index > 100_000 {
                return Err(LabelCheckError::LabelCatalogInvalid {
                    path: path.to_path_buf(),
                    message: format!("class index {max_index} is implausibly large"),
                });
            }
            let mut names = vec![String::new(); max_index + 1];
            for (index, name) in mapping {
                names[index] = name;
            }
            for (index, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("class_{index}");
                }
            }
            names
        }
    };

    Ok(LabelCatalog::new(names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_txt_skips_blank_lines() {
        let catalog = from_classes_str("person\n\n  bicycle  \ncar\n");
        assert_eq!(catalog.names(), ["person", "bicycle", "car"]);
        assert_eq!(catalog.max_class_id(), Some(2));
    }

    #[test]
    fn empty_catalog_has_no_max_class_id() {
        assert_eq!(LabelCatalog::default().max_class_id(), None);
    }

    #[test]
    fn lookup_by_name_and_id() {
        let catalog = from_classes_str("cat\ndog\n");
        assert_eq!(catalog.class_id("dog"), Some(1));
        assert_eq!(catalog.name(0), Some("cat"));
        assert_eq!(catalog.name(5), None);
        assert_eq!(catalog.color(5), Rgb::WHITE);
    }

    #[test]
    fn data_yaml_sequence_and_mapping() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let seq = temp.path().join("seq.yaml");
        fs::write(&seq, "names:\n  - cat\n  - dog\n").expect("write yaml");
        assert_eq!(LabelCatalog::load(&seq).expect("load").names(), ["cat", "dog"]);

        let map = temp.path().join("data.yaml");
        fs::write(&map, "names:\n  0: person\n  2: car\n").expect("write yaml");
        assert_eq!(
            LabelCatalog::load(&map).expect("load").names(),
            ["person", "class_1", "car"]
        );
    }

    #[test]
    fn data_yaml_without_names_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("data.yaml");
        fs::write(&path, "nc: 2\n").expect("write yaml");
        let err = LabelCatalog::load(&path).unwrap_err();
        assert!(matches!(err, LabelCheckError::DataYamlParse { .. }));
    }
}
