//! Boundary edge discretization.
//!
//! Each edge is discretized once per solid, keyed by its entity id, in a
//! canonical direction derived from the curve sense. Both faces sharing an
//! edge therefore see bit-identical polyline points, which is what keeps
//! the welded mesh closed across face boundaries.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use stepmill_geom::{normalize_angle, Curve, Point3};
use stepmill_step::BoundaryEdge;

use crate::TessellationParams;

// Floor on the angular step so a pathological tolerance cannot explode the
// triangle count.
const MIN_STEP: f64 = 1e-3;

const COINCIDENT: f64 = 1e-9;

/// Per-solid cache of canonical edge polylines.
#[derive(Debug, Default)]
pub(crate) struct EdgeCache {
    polylines: HashMap<u64, Vec<Point3>>,
}

impl EdgeCache {
    /// Polyline for `edge` in loop traversal order (start to end).
    pub(crate) fn polyline(
        &mut self,
        edge: &BoundaryEdge,
        params: &TessellationParams,
    ) -> Vec<Point3> {
        let canonical = self
            .polylines
            .entry(edge.id)
            .or_insert_with(|| discretize(edge, params));
        if edge.curve_forward {
            canonical.clone()
        } else {
            let mut rev = canonical.clone();
            rev.reverse();
            rev
        }
    }
}

/// Discretize in the curve-forward direction, independent of how either
/// face traverses the edge.
fn discretize(edge: &BoundaryEdge, params: &TessellationParams) -> Vec<Point3> {
    let (a, b) = if edge.curve_forward {
        (edge.start, edge.end)
    } else {
        (edge.end, edge.start)
    };
    match &edge.curve {
        Some(Curve::Circle(circle)) => {
            let a0 = circle.angle_of(&a);
            let a1 = circle.angle_of(&b);
            let closed = (a - b).norm() < COINCIDENT;
            let sweep = if closed {
                TAU
            } else {
                let d = normalize_angle(a1 - a0);
                // Coincident angles with distinct vertices mean a full turn.
                if d < 1e-9 {
                    TAU
                } else {
                    d
                }
            };
            let step = params
                .angular_tolerance
                .min(chord_step(circle.radius, params.tolerance))
                .max(MIN_STEP);
            let mut n = (sweep / step).ceil() as usize;
            if closed {
                n = n.max(8);
            }
            let mut pts = Vec::with_capacity(n + 1);
            pts.push(a);
            for k in 1..n {
                pts.push(circle.point_at(a0 + sweep * k as f64 / n as f64));
            }
            // Endpoints are the vertex coordinates themselves so that edges
            // meeting at a vertex weld exactly.
            pts.push(b);
            pts
        }
        // Lines and unrecognized curves become a single chord.
        _ => vec![a, b],
    }
}

/// Largest angular step whose chord stays within `tolerance` of the arc.
fn chord_step(radius: f64, tolerance: f64) -> f64 {
    if tolerance < radius {
        2.0 * (1.0 - tolerance / radius).acos()
    } else {
        PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepmill_geom::{Circle3, Dir3, Vec3};

    fn unit_circle_edge(id: u64, curve_forward: bool) -> BoundaryEdge {
        let start = Point3::new(1.0, 0.0, 0.0);
        BoundaryEdge {
            id,
            start,
            end: start,
            curve: Some(Curve::Circle(Circle3 {
                center: Point3::origin(),
                radius: 1.0,
                x_dir: Dir3::new_normalize(Vec3::x()),
                y_dir: Dir3::new_normalize(Vec3::y()),
                normal: Dir3::new_normalize(Vec3::z()),
            })),
            curve_forward,
        }
    }

    #[test]
    fn full_circle_closes() {
        let mut cache = EdgeCache::default();
        let params = TessellationParams::default();
        let pts = cache.polyline(&unit_circle_edge(1, true), &params);
        assert!(pts.len() > 8);
        assert_eq!(pts[0], *pts.last().unwrap());
        for p in &pts {
            assert!((p.coords.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn shared_edge_polylines_are_bit_identical() {
        let mut cache = EdgeCache::default();
        let params = TessellationParams::default();
        let forward = cache.polyline(&unit_circle_edge(7, true), &params);
        let mut backward = cache.polyline(&unit_circle_edge(7, false), &params);
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn tighter_tolerance_samples_more() {
        let coarse = TessellationParams {
            tolerance: 0.01,
            ..Default::default()
        };
        let fine = TessellationParams {
            tolerance: 0.0001,
            ..Default::default()
        };
        let mut c1 = EdgeCache::default();
        let mut c2 = EdgeCache::default();
        let n_coarse = c1.polyline(&unit_circle_edge(1, true), &coarse).len();
        let n_fine = c2.polyline(&unit_circle_edge(1, true), &fine).len();
        assert!(n_fine > n_coarse);
    }

    #[test]
    fn line_is_a_single_chord() {
        let mut cache = EdgeCache::default();
        let edge = BoundaryEdge {
            id: 2,
            start: Point3::origin(),
            end: Point3::new(0.0, 0.0, 5.0),
            curve: None,
            curve_forward: true,
        };
        let pts = cache.polyline(&edge, &TessellationParams::default());
        assert_eq!(pts.len(), 2);
    }
}
