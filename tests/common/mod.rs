#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Writes a flat dataset:
///
/// - `a.bmp`: two identical boxes (overlap)
/// - `b.bmp`: one box with class 5 (invalid with three classes)
/// - `c.bmp`: two far-apart boxes (clean)
/// - `d.bmp`: overlap and invalid label
/// - `e.bmp`: no label file (not part of the dataset)
/// - `classes.txt`: cat, dog, bird
pub fn write_sample_dataset(root: &Path) {
    for name in ["a", "b", "c", "d", "e"] {
        write_bmp(&root.join(format!("{name}.bmp")), 40, 20);
    }
    fs::write(root.join("classes.txt"), "cat\ndog\nbird\n").expect("write classes");
    fs::write(
        root.join("a.txt"),
        "0 0.5 0.5 0.4 0.4\n0 0.5 0.5 0.4 0.4\n",
    )
    .expect("write a.txt");
    fs::write(root.join("b.txt"), "5 0.5 0.5 0.2 0.2\n").expect("write b.txt");
    fs::write(
        root.join("c.txt"),
        "0 0.1 0.1 0.1 0.1\n1 0.9 0.9 0.1 0.1\n",
    )
    .expect("write c.txt");
    fs::write(
        root.join("d.txt"),
        "2 0.5 0.5 0.4 0.4\n7 0.5 0.5 0.4 0.4\n",
    )
    .expect("write d.txt");
}
