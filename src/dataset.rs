//! Dataset discovery: images paired with same-stem label files.
//!
//! A dataset is a single flat directory. Only images that have a `.txt`
//! file with the same stem next to them are included; subdirectories are
//! not searched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LabelCheckError;
use crate::ir::LabelCatalog;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
pub const LABEL_EXTENSION: &str = "txt";

/// Catalog files looked up in the dataset directory, in priority order.
pub const CATALOG_FILE_NAMES: [&str; 3] = ["classes.txt", "data.yaml", "data.yml"];

/// Images and label files found in one directory.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    root: PathBuf,
    images: Vec<PathBuf>,
    annotation_paths: BTreeMap<String, PathBuf>,
    catalog: Option<LabelCatalog>,
}

impl Dataset {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paired images, sorted by path.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// Label file per image stem.
    pub fn annotation_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.annotation_paths
    }

    pub fn annotation_path(&self, image: &Path) -> Option<&Path> {
        let stem = image.file_stem()?.to_str()?;
        self.annotation_paths.get(stem).map(PathBuf::as_path)
    }

    /// Catalog found in the directory, if any.
    pub fn catalog(&self) -> Option<&LabelCatalog> {
        self.catalog.as_ref()
    }

    pub fn set_catalog(&mut self, catalog: LabelCatalog) {
        self.catalog = Some(catalog);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Lists the images in `dir` that have a same-stem label file, and loads
/// a label catalog from the directory when one is present.
pub fn discover_dataset(dir: &Path) -> Result<Dataset, LabelCheckError> {
    if !dir.is_dir() {
        return Err(LabelCheckError::DatasetInvalid {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut images = Vec::new();
    let mut annotation_paths = BTreeMap::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| LabelCheckError::DatasetInvalid {
            path: dir.to_path_buf(),
            message: format!("failed while listing directory: {source}"),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, &IMAGE_EXTENSIONS) {
            continue;
        }
        let label = path.with_extension(LABEL_EXTENSION);
        if !label.is_file() {
            log::debug!("no label file for {}", path.display());
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            log::warn!("skipping image with non UTF-8 name: {}", path.display());
            continue;
        };

        annotation_paths.insert(stem.to_string(), label);
        images.push(path.to_path_buf());
    }
    images.sort();

    let catalog = discover_catalog(dir);
    log::info!(
        "found {} image(s) with labels in {}",
        images.len(),
        dir.display()
    );

    Ok(Dataset {
        root: dir.to_path_buf(),
        images,
        annotation_paths,
        catalog,
    })
}

/// Loads the first catalog file present in `dir`. A broken catalog is
/// logged and ignored.
pub fn discover_catalog(dir: &Path) -> Option<LabelCatalog> {
    let path = CATALOG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())?;

    match LabelCatalog::load(&path) {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            log::warn!("ignoring label catalog {}: {err}", path.display());
            None
        }
    }
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// Reads an image's pixel size from its header.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), LabelCheckError> {
    let size = imagesize::size(path).map_err(|source| LabelCheckError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| LabelCheckError::DatasetInvalid {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;

    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| LabelCheckError::DatasetInvalid {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn pairs_images_with_same_stem_labels() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        for name in ["b.JPG", "a.png", "c.bmp", "d.gif", "b.txt", "a.txt", "d.txt"] {
            fs::write(root.join(name), b"").expect("write file");
        }
        fs::create_dir(root.join("nested")).expect("create dir");
        fs::write(root.join("nested/e.jpg"), b"").expect("write file");
        fs::write(root.join("nested/e.txt"), b"").expect("write file");

        let dataset = discover_dataset(root).expect("discover");
        assert_eq!(dataset.images(), [root.join("a.png"), root.join("b.JPG")]);
        assert_eq!(
            dataset.annotation_path(&root.join("b.JPG")),
            Some(root.join("b.txt").as_path())
        );
        assert!(dataset.catalog().is_none());
    }

    #[test]
    fn loads_catalog_from_directory() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("classes.txt"), "cat\ndog\n").expect("write classes");
        let dataset = discover_dataset(temp.path()).expect("discover");
        assert_eq!(
            dataset.catalog().map(LabelCatalog::max_class_id),
            Some(Some(1))
        );
        assert!(dataset.is_empty());
    }

    #[test]
    fn file_is_not_a_dataset() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let file = temp.path().join("x.txt");
        fs::write(&file, "").expect("write file");
        assert!(matches!(
            discover_dataset(&file),
            Err(LabelCheckError::DatasetInvalid { .. })
        ));
    }

    #[test]
    fn unreadable_image_header_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("broken.png");
        fs::write(&path, b"not an image").expect("write file");
        assert!(matches!(
            image_dimensions(&path),
            Err(LabelCheckError::ImageDimensionRead { .. })
        ));
    }
}
