#![warn(missing_docs)]

//! Tolerance-driven tessellation of B-rep solids into triangle meshes.
//!
//! Faces are triangulated from their boundary loops alone: every edge is
//! discretized once per file (keyed by entity id), loops are unwrapped into
//! the surface's parameter space, and the resulting rings are triangulated
//! there. Because adjacent faces reference bit-identical boundary points,
//! the welded output mesh is watertight whenever the input B-rep is closed.

use std::f64::consts::{PI, TAU};

use thiserror::Error;
use tracing::debug;

use stepmill_geom::{Point2, Point3, Surface};
use stepmill_mesh::{MeshBuilder, TriMesh};
use stepmill_step::{BoundaryLoop, Face, Solid};

mod edges;
mod triangulate;

use edges::EdgeCache;
use triangulate::{signed_area, triangulate, LoopVertex};

/// Tessellation quality parameters.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Maximum chord deviation from the true surface, in model units.
    pub tolerance: f64,
    /// Maximum angular step along curved edges, in radians.
    pub angular_tolerance: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.001,
            angular_tolerance: 0.1,
        }
    }
}

/// Errors from tessellation.
#[derive(Error, Debug)]
pub enum TessError {
    /// A boundary loop has fewer than three points.
    #[error("face #{face} has a degenerate boundary loop")]
    DegenerateLoop {
        /// Face entity id.
        face: u64,
    },

    /// A loop on a periodic surface does not close in parameter space,
    /// which means the face is missing its seam edge.
    #[error("face #{face} does not close in parameter space (missing seam edge)")]
    OpenLoop {
        /// Face entity id.
        face: u64,
    },
}

/// Tessellate a single solid into a welded triangle mesh.
pub fn tessellate_solid(solid: &Solid, params: &TessellationParams) -> Result<TriMesh, TessError> {
    tessellate_solids(std::slice::from_ref(solid), params)
}

/// Tessellate several solids into one welded mesh.
///
/// Entity ids are unique within a STEP file, so one edge cache serves all
/// solids.
pub fn tessellate_solids(
    solids: &[Solid],
    params: &TessellationParams,
) -> Result<TriMesh, TessError> {
    let mut builder = MeshBuilder::new();
    let mut cache = EdgeCache::default();
    for solid in solids {
        for face in &solid.faces {
            add_face(face, params, &mut cache, &mut builder)?;
        }
    }
    Ok(builder.build())
}

fn add_face(
    face: &Face,
    params: &TessellationParams,
    cache: &mut EdgeCache,
    out: &mut MeshBuilder,
) -> Result<(), TessError> {
    let mut outer = loop_ring(face, &face.outer, params, cache)?;
    if signed_area(&outer) < 0.0 {
        outer.reverse();
    }
    let mut holes = Vec::new();
    for lp in &face.inner {
        let mut hole = loop_ring(face, lp, params, cache)?;
        if signed_area(&hole) > 0.0 {
            hole.reverse();
        }
        holes.push(hole);
    }
    debug!(
        face = face.id,
        boundary_points = outer.len(),
        holes = holes.len(),
        "triangulating face"
    );
    triangulate(outer, holes, !face.same_sense, out);
    Ok(())
}

/// Discretize a loop and project it into the face's parameter space.
fn loop_ring(
    face: &Face,
    lp: &BoundaryLoop,
    params: &TessellationParams,
    cache: &mut EdgeCache,
) -> Result<Vec<LoopVertex>, TessError> {
    let mut pts: Vec<Point3> = Vec::new();
    for edge in &lp.edges {
        let poly = cache.polyline(edge, params);
        // The last point of each edge is the first of the next.
        pts.extend_from_slice(&poly[..poly.len().saturating_sub(1)]);
    }
    if pts.len() < 3 {
        return Err(TessError::DegenerateLoop { face: face.id });
    }
    let uv = project(face, &pts)?;
    Ok(pts
        .into_iter()
        .zip(uv)
        .map(|(position, uv)| LoopVertex { uv, position })
        .collect())
}

/// Map loop points to `(u, v)`, unwrapping periodic parameters so the ring
/// is continuous rather than jumping at the seam.
fn project(face: &Face, pts: &[Point3]) -> Result<Vec<Point2>, TessError> {
    let surface = &face.surface;
    let mut uv: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in pts {
        let mut q = surface.uv_of(p);
        if let Some(prev) = uv.last().copied() {
            if surface.u_periodic() {
                q.x = unwrap_near(q.x, prev.x);
            }
            if surface.v_periodic() {
                q.y = unwrap_near(q.y, prev.y);
            }
            // Parameter singularities (sphere poles, cone apex) have no
            // longitude of their own; inherit the neighbor's.
            if u_degenerate(surface, p) {
                q.x = prev.x;
            }
        }
        uv.push(q);
    }
    if uv.len() > 1 && u_degenerate(surface, &pts[0]) {
        uv[0].x = uv[1].x;
    }

    // A loop that ends a full period away from its start is winding around
    // a closed surface without a seam edge; that cannot be triangulated in
    // parameter space.
    if let Some(last) = uv.last() {
        let closes = |periodic: bool, first: f64, last: f64| {
            !periodic || (unwrap_near(first, last) - first).abs() < PI
        };
        if !closes(surface.u_periodic(), uv[0].x, last.x)
            || !closes(surface.v_periodic(), uv[0].y, last.y)
        {
            return Err(TessError::OpenLoop { face: face.id });
        }
    }
    Ok(uv)
}

/// Shift `x` by whole periods to land nearest `prev`.
fn unwrap_near(x: f64, prev: f64) -> f64 {
    x - TAU * ((x - prev) / TAU).round()
}

fn u_degenerate(surface: &Surface, p: &Point3) -> bool {
    match surface {
        Surface::Sphere(s) => {
            let d = p - s.center;
            let radial = d - d.dot(s.axis.as_ref()) * s.axis.as_ref();
            radial.norm() < 1e-9 * s.radius.max(1.0)
        }
        Surface::Cone(c) => (p - c.apex).norm() < 1e-9,
        _ => false,
    }
}
