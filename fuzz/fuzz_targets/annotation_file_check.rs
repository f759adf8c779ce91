//! Fuzz target for parsing and checking a whole label file.
//!
//! Parsed boxes may be degenerate or out of range; the checker must
//! still return without panicking and report IoUs within [0, 1].

#![no_main]

use labelcheck::check::{check_annotation, CheckOptions};
use labelcheck::ir::from_annotation_str;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let loaded = from_annotation_str(text);
    let opts = CheckOptions::default().with_max_class_id_sentinel(3);
    let issues = check_annotation(&loaded.annotation, &opts);
    for overlap in &issues.overlaps {
        assert!(overlap.first < overlap.second);
        assert!((0.0..=1.0).contains(&overlap.iou));
    }
});
