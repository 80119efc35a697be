//! Batch driver behavior against real temp directories.

use std::fs;
use std::path::Path;

use stepmill_cli::{run_convert, ConvertConfig, Status};
use stepmill_tessellate::TessellationParams;

const BOX_STEP: &[u8] = include_bytes!("fixtures/box.step");

fn config(input: &Path, out: &Path, files: &[&str]) -> ConvertConfig {
    ConvertConfig {
        input_dir: input.to_path_buf(),
        files: files.iter().map(|s| s.to_string()).collect(),
        out_dir: out.to_path_buf(),
        params: TessellationParams::default(),
        json: false,
    }
}

fn run(cfg: &ConvertConfig) -> (Vec<stepmill_cli::FileOutcome>, String) {
    let mut buf = Vec::new();
    let outcomes = run_convert(cfg, &mut buf).unwrap();
    (outcomes, String::from_utf8(buf).unwrap())
}

#[test]
fn one_success_one_missing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("box.step"), BOX_STEP).unwrap();

    let cfg = config(dir.path(), &out, &["box.step", "missing.step"]);
    let (outcomes, output) = run(&cfg);

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].file, "box.step");
    match &outcomes[0].status {
        Status::Converted(report) => {
            assert!((report.volume - 1000.0).abs() < 1e-6);
            assert!((report.area - 600.0).abs() < 1e-6);
            assert_eq!(report.triangles, 12);
            assert!(report.watertight);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(matches!(outcomes[1].status, Status::NotFound));

    assert!(out.join("box.stl").exists());
    assert!(!out.join("missing.stl").exists());

    assert!(output.contains("Starting conversion of 2 files..."));
    assert!(output.contains("CONVERSION SUMMARY"));
    assert!(output.contains("Successful: 1"));
    assert!(output.contains("Failed: 1"));
    assert!(output.contains("missing.step - Not found"));
}

#[test]
fn unparseable_file_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("broken.step"), b"not a step file").unwrap();
    fs::write(dir.path().join("box.step"), BOX_STEP).unwrap();

    let cfg = config(dir.path(), &out, &["broken.step", "box.step"]);
    let (outcomes, output) = run(&cfg);

    assert!(matches!(outcomes[0].status, Status::Failed(_)));
    assert!(matches!(outcomes[1].status, Status::Converted(_)));
    assert!(!out.join("broken.stl").exists());
    assert!(out.join("box.stl").exists());
    assert!(output.contains("Error:"));
}

#[test]
fn empty_file_list_scans_directory_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("b.step"), BOX_STEP).unwrap();
    fs::write(dir.path().join("a.stp"), BOX_STEP).unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let cfg = config(dir.path(), &out, &[]);
    let (outcomes, _) = run(&cfg);

    let names: Vec<&str> = outcomes.iter().map(|o| o.file.as_str()).collect();
    assert_eq!(names, ["a.stp", "b.step"]);
    assert!(out.join("a.stl").exists());
    assert!(out.join("b.stl").exists());
}

#[test]
fn rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("box.step"), BOX_STEP).unwrap();
    let cfg = config(dir.path(), &out, &["box.step"]);

    let (first, _) = run(&cfg);
    let first_bytes = fs::read(out.join("box.stl")).unwrap();
    fs::remove_dir_all(&out).unwrap();
    let (second, _) = run(&cfg);
    let second_bytes = fs::read(out.join("box.stl")).unwrap();

    assert_eq!(first.len(), second.len());
    assert!(matches!(second[0].status, Status::Converted(_)));
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn colliding_output_names_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("box.step"), BOX_STEP).unwrap();
    fs::write(dir.path().join("box.stp"), BOX_STEP).unwrap();

    let cfg = config(dir.path(), &out, &["box.step", "box.stp"]);
    let (outcomes, output) = run(&cfg);

    assert!(matches!(outcomes[0].status, Status::Converted(_)));
    assert!(matches!(outcomes[1].status, Status::Converted(_)));
    assert!(out.join("box.stl").exists());
    assert!(out.join("box-2.stl").exists());
    assert!(output.contains("Saved: box-2.stl"));
    assert!(output.contains("  \u{2713} box-2.stl"));
}

#[test]
fn json_summary_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stl");
    fs::write(dir.path().join("box.step"), BOX_STEP).unwrap();

    let mut cfg = config(dir.path(), &out, &["box.step", "missing.step"]);
    cfg.json = true;
    let (_, output) = run(&cfg);

    let json_start = output.find('{').unwrap();
    let summary: serde_json::Value = serde_json::from_str(&output[json_start..]).unwrap();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["successful"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["outcomes"][0]["status"], "converted");
    assert_eq!(summary["outcomes"][0]["detail"]["triangles"], 12);
    assert_eq!(summary["outcomes"][1]["status"], "not_found");
}
