//! Resolve a parsed entity graph into boundary-representation solids.
//!
//! The reader walks every `MANIFOLD_SOLID_BREP`, follows its shell down to
//! faces, bounds, loops, and edges, and resolves the referenced geometry into
//! the analytic types from `stepmill_geom`. Edge identity is preserved: two
//! faces sharing a STEP edge see the same [`BoundaryEdge::id`], which is what
//! lets a downstream tessellator discretize each edge exactly once and keep
//! the mesh watertight.

use std::fs;
use std::path::Path;

use tracing::debug;

use stepmill_geom::{Curve, Point3, Surface};

use crate::entities;
use crate::error::StepError;
use crate::parser::{Parser, StepFile};

/// One edge of a boundary loop, oriented as the loop traverses it.
#[derive(Debug, Clone)]
pub struct BoundaryEdge {
    /// Id of the underlying `EDGE_CURVE`, shared between adjacent faces.
    pub id: u64,
    /// Start point in loop order.
    pub start: Point3,
    /// End point in loop order.
    pub end: Point3,
    /// Curve geometry; `None` means the edge is treated as a straight chord.
    pub curve: Option<Curve>,
    /// Whether the curve's parameter direction runs start to end.
    pub curve_forward: bool,
}

/// A closed loop of boundary edges.
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Edges in traversal order.
    pub edges: Vec<BoundaryEdge>,
}

/// A face: an analytic surface trimmed by an outer loop and optional holes.
#[derive(Debug, Clone)]
pub struct Face {
    /// Id of the `ADVANCED_FACE` entity.
    pub id: u64,
    /// Underlying surface geometry.
    pub surface: Surface,
    /// Whether the face normal agrees with the surface's natural normal.
    pub same_sense: bool,
    /// Outer boundary.
    pub outer: BoundaryLoop,
    /// Inner boundaries (holes).
    pub inner: Vec<BoundaryLoop>,
}

/// A solid body assembled from faces.
#[derive(Debug, Clone)]
pub struct Solid {
    /// Name from the STEP file, often empty.
    pub name: String,
    /// Faces of the outer shell.
    pub faces: Vec<Face>,
}

/// Parse a STEP file from disk and resolve its solids.
pub fn read_step(path: &Path) -> Result<Vec<Solid>, StepError> {
    let data = fs::read(path)?;
    read_step_from_buffer(&data)
}

/// Parse STEP data from memory and resolve its solids.
pub fn read_step_from_buffer(data: &[u8]) -> Result<Vec<Solid>, StepError> {
    let file = Parser::parse(data)?;
    resolve_solids(&file)
}

fn resolve_solids(file: &StepFile) -> Result<Vec<Solid>, StepError> {
    let brep_ids = file.ids_of_type("MANIFOLD_SOLID_BREP");
    if brep_ids.is_empty() {
        return Err(StepError::NoSolids);
    }
    let mut solids = Vec::with_capacity(brep_ids.len());
    for id in brep_ids {
        let brep = entities::manifold_solid_brep(file, id)?;
        let face_ids = entities::shell_faces(file, brep.outer_shell)?;
        debug!(solid = id, faces = face_ids.len(), "resolving solid");
        let mut faces = Vec::with_capacity(face_ids.len());
        for fid in face_ids {
            faces.push(resolve_face(file, fid)?);
        }
        solids.push(Solid {
            name: brep.name,
            faces,
        });
    }
    Ok(solids)
}

fn resolve_face(file: &StepFile, id: u64) -> Result<Face, StepError> {
    let raw = entities::advanced_face(file, id)?;
    let surface = entities::surface(file, raw.surface)?;

    let mut outer = None;
    let mut inner = Vec::new();
    for bound in &raw.bounds {
        let bl = resolve_loop(file, bound.edge_loop, bound.orientation)?;
        // Treat the first FACE_BOUND as outer when no FACE_OUTER_BOUND is
        // present; some exporters never emit the subtype.
        if bound.outer || outer.is_none() {
            if let Some(prev) = outer.replace(bl) {
                inner.push(prev);
            }
        } else {
            inner.push(bl);
        }
    }
    let outer = outer.ok_or_else(|| StepError::invalid(id, "face has no boundary loops"))?;

    Ok(Face {
        id,
        surface,
        same_sense: raw.same_sense,
        outer,
        inner,
    })
}

fn resolve_loop(
    file: &StepFile,
    loop_id: u64,
    orientation: bool,
) -> Result<BoundaryLoop, StepError> {
    let oriented_ids = entities::edge_loop(file, loop_id)?;
    if oriented_ids.is_empty() {
        return Err(StepError::invalid(loop_id, "edge loop is empty"));
    }
    let mut edges = Vec::with_capacity(oriented_ids.len());
    for oid in oriented_ids {
        let oe = entities::oriented_edge(file, oid)?;
        let ec = entities::edge_curve(file, oe.edge)?;
        let start = entities::vertex_point(file, ec.start_vertex)?;
        let end = entities::vertex_point(file, ec.end_vertex)?;
        let curve = entities::curve(file, ec.curve)?;

        // Fold the three orientation flags into loop order: the bound's
        // orientation, the oriented edge's, and the edge's own sense.
        let forward = oe.forward == orientation;
        let (start, end) = if forward { (start, end) } else { (end, start) };
        edges.push(BoundaryEdge {
            id: ec.id,
            start,
            end,
            curve,
            curve_forward: forward == ec.same_sense,
        });
    }
    if !orientation {
        edges.reverse();
    }
    Ok(BoundaryLoop { edges })
}
