//! Integration tests for editing a label file through an edit session.

use std::fs;
use std::path::Path;

use labelcheck::check::BoxClass;
use labelcheck::color::Rgb;
use labelcheck::config::Config;
use labelcheck::edit::{DrawingState, EditSession, MouseButton, Point};
use labelcheck::ir::catalog::from_classes_str;
use labelcheck::ir::LabelCatalog;
use labelcheck::LabelCheckError;

mod common;
use common::write_bmp;

fn catalog() -> LabelCatalog {
    from_classes_str("cat\ndog\nbird\n")
}

fn open(root: &Path, labels: &str, config: &Config) -> EditSession {
    let image = root.join("img.bmp");
    let label = root.join("img.txt");
    write_bmp(&image, 400, 200);
    fs::write(&label, labels).expect("write label file");
    EditSession::open_files(&image, &label, catalog(), config).expect("open session")
}

fn click(session: &mut EditSession, x: f64, y: f64) {
    session.pointer_press(Point::new(x, y), MouseButton::Primary);
    session.pointer_release(Point::new(x, y), MouseButton::Primary);
}

fn drag(session: &mut EditSession, from: (f64, f64), to: (f64, f64)) {
    session.pointer_press(Point::new(from.0, from.1), MouseButton::Primary);
    session.pointer_move(Point::new(to.0, to.1));
    session.pointer_release(Point::new(to.0, to.1), MouseButton::Primary);
}

#[test]
fn open_files_places_boxes_in_pixels_with_classification() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let session = open(
        temp.path(),
        "0 0.5 0.5 0.4 0.4\n0 0.5 0.5 0.4 0.4\n9 0.1 0.1 0.05 0.05\n",
        &Config::default(),
    );

    assert_eq!(session.image_size(), (400.0, 200.0));
    assert_eq!(session.shapes().len(), 3);

    let rect = session.shapes()[0].scene_rect();
    assert_eq!(
        (rect.xmin(), rect.ymin(), rect.xmax(), rect.ymax()),
        (120.0, 60.0, 280.0, 140.0)
    );

    let classes: Vec<BoxClass> = session.shapes().iter().map(|s| s.box_class()).collect();
    assert_eq!(
        classes,
        [BoxClass::Overlap, BoxClass::Overlap, BoxClass::InvalidLabel]
    );
    assert_eq!(session.paint()[0].outline, Rgb::RED);
    assert_eq!(session.label(2).map(|tag| tag.text), Some("9".to_string()));
    assert!(!session.has_changes());
}

#[test]
fn missing_annotation_opens_empty() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image = temp.path().join("img.bmp");
    write_bmp(&image, 64, 64);

    let session = EditSession::open_files(
        &image,
        &temp.path().join("img.txt"),
        catalog(),
        &Config::default(),
    )
    .expect("open session");

    assert!(session.shapes().is_empty());
    assert!(session.issues().is_clean());
}

#[test]
fn moved_box_is_saved_in_normalized_form() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut session = open(temp.path(), "0 0.5 0.5 0.4 0.4\n", &Config::default());

    click(&mut session, 200.0, 100.0);
    assert_eq!(session.selected(), Some(0));
    drag(&mut session, (200.0, 100.0), (240.0, 120.0));
    assert!(session.has_changes());

    assert!(matches!(
        session.maybe_save(),
        Err(LabelCheckError::UnsavedChanges { .. })
    ));

    session.save().expect("save");
    assert!(!session.has_changes());
    assert_eq!(
        fs::read_to_string(temp.path().join("img.txt")).expect("read label file"),
        "0 0.600000 0.600000 0.400000 0.400000\n"
    );
}

#[test]
fn auto_save_writes_relabel_immediately() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let config = Config {
        auto_save: true,
        ..Config::default()
    };
    let mut session = open(temp.path(), "0 0.5 0.5 0.4 0.4\n", &config);

    session.select(0).expect("select");
    session.relabel_selected(2).expect("relabel");

    assert!(!session.has_changes());
    assert_eq!(session.label(0).map(|tag| tag.text), Some("bird".to_string()));
    assert_eq!(
        fs::read_to_string(temp.path().join("img.txt")).expect("read label file"),
        "2 0.500000 0.500000 0.400000 0.400000\n"
    );
    assert!(!session.maybe_save().expect("nothing pending"));
}

#[test]
fn relabel_outside_catalog_is_rejected() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut session = open(temp.path(), "0 0.5 0.5 0.4 0.4\n", &Config::default());

    session.select(0).expect("select");
    assert!(matches!(
        session.relabel_selected(3),
        Err(LabelCheckError::ClassIdOutOfRange {
            class_id: 3,
            max_class_id: 2
        })
    ));
    assert!(!session.has_changes());
}

#[test]
fn drawn_box_is_appended_and_saved() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut session = open(temp.path(), "1 0.5 0.5 0.4 0.4\n", &Config::default());

    session.begin_drawing();
    assert_eq!(session.drawing(), DrawingState::Armed);
    drag(&mut session, (10.0, 10.0), (50.0, 30.0));

    assert_eq!(session.drawing(), DrawingState::Idle);
    assert_eq!(session.shapes().len(), 2);
    assert_eq!(session.selected(), Some(1));
    assert!(session.has_changes());

    session.save().expect("save");
    assert_eq!(
        fs::read_to_string(temp.path().join("img.txt")).expect("read label file"),
        "1 0.500000 0.500000 0.400000 0.400000\n0 0.075000 0.100000 0.100000 0.100000\n"
    );
}

#[test]
fn deleting_an_overlapping_box_clears_the_overlap() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut session = open(
        temp.path(),
        "0 0.5 0.5 0.4 0.4\n1 0.5 0.5 0.4 0.4\n",
        &Config::default(),
    );
    assert_eq!(session.issues().overlaps.len(), 1);

    session.select(1).expect("select");
    session.delete_selected().expect("delete");

    assert!(session.issues().is_clean());
    assert_eq!(session.shapes()[0].box_class(), BoxClass::Normal);
    assert!(session.has_changes());
}

#[test]
fn failed_save_keeps_changes_pending() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut session = open(temp.path(), "0 0.5 0.5 0.4 0.4\n", &Config::default());
    session.select(0).expect("select");
    session.delete_selected().expect("delete");

    // Replace the label file with a directory so it cannot be written.
    let label = temp.path().join("img.txt");
    fs::remove_file(&label).expect("remove label file");
    fs::create_dir(&label).expect("create directory");

    assert!(matches!(
        session.save(),
        Err(LabelCheckError::SaveFailed { .. })
    ));
    assert!(session.has_changes());
}
