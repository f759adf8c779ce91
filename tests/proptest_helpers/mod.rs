#![allow(dead_code)]

use labelcheck::ir::YoloBox;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for values written with six decimals.
pub const EPS_LABEL_FILE: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Any box with components in the open unit interval.
pub fn arb_box(max_class_id: usize) -> impl Strategy<Value = YoloBox> {
    (
        0..=max_class_id,
        0.001f64..0.999,
        0.001f64..0.999,
        0.001f64..0.999,
        0.001f64..0.999,
    )
        .prop_map(|(class_id, cx, cy, w, h)| YoloBox::new(class_id, cx, cy, w, h))
}

/// Boxes that may be degenerate (zero or negative size).
pub fn arb_any_box() -> impl Strategy<Value = YoloBox> {
    (
        0usize..10,
        -0.5f64..1.5,
        -0.5f64..1.5,
        -0.2f64..1.0,
        -0.2f64..1.0,
    )
        .prop_map(|(class_id, cx, cy, w, h)| YoloBox::new(class_id, cx, cy, w, h))
}

pub fn arb_boxes(max_len: usize) -> impl Strategy<Value = Vec<YoloBox>> {
    prop::collection::vec(arb_box(9), 0..=max_len)
}

pub fn assert_boxes_close(left: &[YoloBox], right: &[YoloBox], eps: f64) -> Result<(), String> {
    if left.len() != right.len() {
        return Err(format!(
            "box count differs: {} vs {}",
            left.len(),
            right.len()
        ));
    }

    for (index, (a, b)) in left.iter().zip(right).enumerate() {
        if a.class_id != b.class_id {
            return Err(format!(
                "box {index}: class {} vs {}",
                a.class_id, b.class_id
            ));
        }
        for (field, x, y) in [
            ("cx", a.cx, b.cx),
            ("cy", a.cy, b.cy),
            ("w", a.w, b.w),
            ("h", a.h, b.h),
        ] {
            if (x - y).abs() > eps {
                return Err(format!("box {index}: {field} {x} vs {y} (eps {eps})"));
            }
        }
    }
    Ok(())
}
