//! End-to-end: STEP box in, watertight mesh with exact statistics out.

use stepmill_step::read_step_from_buffer;
use stepmill_tessellate::{tessellate_solids, TessellationParams};

const BOX_STEP: &[u8] = include_bytes!("fixtures/box.step");

#[test]
fn box_tessellates_exactly() {
    let solids = read_step_from_buffer(BOX_STEP).unwrap();
    let mesh = tessellate_solids(&solids, &TessellationParams::default()).unwrap();
    assert_eq!(mesh.triangles.len(), 12);
    assert_eq!(mesh.vertices.len(), 8);

    let report = mesh.report();
    assert!(report.watertight);
    assert!((report.volume - 1000.0).abs() < 1e-6);
    assert!((report.area - 600.0).abs() < 1e-6);
    let bounds = report.bounds.unwrap();
    assert_eq!(bounds[0], [0.0, 0.0, 0.0]);
    assert_eq!(bounds[1], [10.0, 10.0, 10.0]);
}

#[test]
fn tessellation_is_deterministic() {
    let solids = read_step_from_buffer(BOX_STEP).unwrap();
    let params = TessellationParams::default();
    let a = tessellate_solids(&solids, &params).unwrap();
    let b = tessellate_solids(&solids, &params).unwrap();
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.triangles, b.triangles);
}
