use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use toypat_core::{Version, decode_pattern_file, make_report};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

fn load_expected_report(dir: &str) -> Value {
    let expected_path = repo_root().join(dir).join("expected_report.json");
    let expected_json = fs::read_to_string(&expected_path).expect("read expected_report.json");
    serde_json::from_str(&expected_json).expect("parse expected report")
}

fn run_golden(dir: &str) {
    let input = repo_root().join(dir).join("input.pat");
    let expected = load_expected_report(dir);

    let pattern = decode_pattern_file(&input).expect("decode pattern");
    let bytes = input.metadata().expect("input metadata").len();
    let mut actual = make_report(&input.display().to_string(), bytes, pattern, false);
    actual.input.path = expected["input"]["path"]
        .as_str()
        .expect("expected input path")
        .to_string();

    let actual_value = serde_json::to_value(actual).expect("serialize actual");
    assert_eq!(actual_value, expected, "golden mismatch in {dir}");
}

#[test]
fn golden_edge() {
    run_golden("tests/golden/edge");
}

#[test]
fn golden_legacy() {
    run_golden("tests/golden/legacy");
}

#[test]
fn golden_rotate() {
    run_golden("tests/golden/rotate");
}

#[test]
fn golden_edge_matches_header_fields() {
    let pattern = decode_pattern_file(&repo_root().join("tests/golden/edge/input.pat"))
        .expect("decode pattern");
    assert_eq!(pattern.header.version, Version::Standard);
    assert_eq!(pattern.points.len(), 30);
    assert_eq!(pattern.points.to_vecs()[..8], [
        vec![0, 1],
        vec![1, 0],
        vec![1, 0],
        vec![0, 1],
        vec![20, 0],
        vec![0, 20],
        vec![20, 20],
        vec![0, 0],
    ]);
}

#[test]
fn golden_legacy_scales_to_unit_range() {
    let pattern = decode_pattern_file(&repo_root().join("tests/golden/legacy/input.pat"))
        .expect("decode pattern");
    let scaled = pattern.scaled();
    assert!(scaled.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(scaled[18], vec![1.0]);
    assert_eq!(scaled[3], vec![0.1]);
}
