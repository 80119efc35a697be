#![warn(missing_docs)]

//! Indexed triangle meshes with welded vertices, STL read/write, and the
//! statistics (volume, area, watertightness) reported after conversion.
//!
//! Meshes are stored as `f32` vertices because that is all STL can carry.
//! Welding happens on exact `f32` bit patterns: two triangles that evaluate
//! a shared boundary to bit-identical coordinates end up referencing the
//! same vertex, which is what makes the watertightness check meaningful.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

mod stl;

pub use stl::{read_stl, stl_bytes, write_stl};

/// Errors from mesh and STL handling.
#[derive(Error, Debug)]
pub enum MeshError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed STL data.
    #[error("invalid STL: {0}")]
    Format(String),
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Triangles as triples of vertex indices, counterclockwise when viewed
    /// from outside.
    pub triangles: Vec<[u32; 3]>,
}

/// Accumulates triangles into a [`TriMesh`], welding duplicate vertices.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    vertices: Vec<[f32; 3]>,
    triangles: Vec<[u32; 3]>,
    index: HashMap<[u32; 3], u32>,
}

impl MeshBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn weld(&mut self, p: [f64; 3]) -> u32 {
        let v = [p[0] as f32, p[1] as f32, p[2] as f32];
        // Normalize -0.0 so it welds with +0.0.
        let key = [
            (v[0] + 0.0).to_bits(),
            (v[1] + 0.0).to_bits(),
            (v[2] + 0.0).to_bits(),
        ];
        match self.index.entry(key) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let idx = self.vertices.len() as u32;
                self.vertices.push(v);
                *e.insert(idx)
            }
        }
    }

    /// Add one triangle. Triangles that collapse to fewer than three distinct
    /// vertices after welding are discarded.
    pub fn push_triangle(&mut self, a: [f64; 3], b: [f64; 3], c: [f64; 3]) {
        let ia = self.weld(a);
        let ib = self.weld(b);
        let ic = self.weld(c);
        if ia == ib || ib == ic || ic == ia {
            return;
        }
        self.triangles.push([ia, ib, ic]);
    }

    /// Finish and return the mesh.
    pub fn build(self) -> TriMesh {
        TriMesh {
            vertices: self.vertices,
            triangles: self.triangles,
        }
    }
}

/// Per-mesh statistics reported after a conversion.
#[derive(Debug, Clone, Serialize)]
pub struct MeshReport {
    /// Enclosed volume (sum of signed tetrahedra), in cubic model units.
    pub volume: f64,
    /// Total surface area, in square model units.
    pub area: f64,
    /// Number of triangles.
    pub triangles: usize,
    /// Number of distinct vertices.
    pub vertices: usize,
    /// Whether every edge is shared by exactly two triangles.
    pub watertight: bool,
    /// Axis-aligned bounds as `[min, max]`, or `None` for an empty mesh.
    pub bounds: Option<[[f64; 3]; 2]>,
}

impl TriMesh {
    /// Compute the statistics report for this mesh.
    pub fn report(&self) -> MeshReport {
        let mut volume = 0.0;
        let mut area = 0.0;
        for t in &self.triangles {
            let a = to_f64(self.vertices[t[0] as usize]);
            let b = to_f64(self.vertices[t[1] as usize]);
            let c = to_f64(self.vertices[t[2] as usize]);
            let n = cross(sub(b, a), sub(c, a));
            area += 0.5 * norm(n);
            // Divergence theorem: signed volume of tetrahedron (O, a, b, c).
            volume += dot(a, cross(b, c)) / 6.0;
        }

        let bounds = self.bounds();
        MeshReport {
            volume,
            area,
            triangles: self.triangles.len(),
            vertices: self.vertices.len(),
            watertight: self.is_watertight(),
            bounds,
        }
    }

    /// Axis-aligned bounding box, `None` when there are no vertices.
    pub fn bounds(&self) -> Option<[[f64; 3]; 2]> {
        let first = self.vertices.first()?;
        let mut min = to_f64(*first);
        let mut max = min;
        for v in &self.vertices[1..] {
            for k in 0..3 {
                let x = v[k] as f64;
                min[k] = min[k].min(x);
                max[k] = max[k].max(x);
            }
        }
        Some([min, max])
    }

    /// A mesh is watertight when every undirected edge appears in exactly
    /// two triangles. The empty mesh is not watertight.
    pub fn is_watertight(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                *edges.entry(key).or_insert(0) += 1;
            }
        }
        edges.values().all(|&c| c == 2)
    }
}

fn to_f64(v: [f32; 3]) -> [f64; 3] {
    [v[0] as f64, v[1] as f64, v[2] as f64]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit cube as 12 triangles with outward CCW winding.
    pub(crate) fn unit_cube() -> TriMesh {
        let p = |x: f64, y: f64, z: f64| [x, y, z];
        let corners = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ];
        // Quads with outward CCW winding, split on the first diagonal.
        let quads = [
            [0, 3, 2, 1], // bottom, -z
            [4, 5, 6, 7], // top, +z
            [0, 1, 5, 4], // -y
            [2, 3, 7, 6], // +y
            [1, 2, 6, 5], // +x
            [3, 0, 4, 7], // -x
        ];
        let mut builder = MeshBuilder::new();
        for q in quads {
            builder.push_triangle(corners[q[0]], corners[q[1]], corners[q[2]]);
            builder.push_triangle(corners[q[0]], corners[q[2]], corners[q[3]]);
        }
        builder.build()
    }

    #[test]
    fn welding_dedups_vertices() {
        let mesh = unit_cube();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangles.len(), 12);
    }

    #[test]
    fn cube_report() {
        let report = unit_cube().report();
        assert!((report.volume - 1.0).abs() < 1e-9);
        assert!((report.area - 6.0).abs() < 1e-9);
        assert_eq!(report.triangles, 12);
        assert_eq!(report.vertices, 8);
        assert!(report.watertight);
        let bounds = report.bounds.unwrap();
        assert_eq!(bounds[0], [0.0, 0.0, 0.0]);
        assert_eq!(bounds[1], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn open_mesh_is_not_watertight() {
        let mut builder = MeshBuilder::new();
        builder.push_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let mesh = builder.build();
        assert!(!mesh.is_watertight());
    }

    #[test]
    fn empty_mesh_report() {
        let report = TriMesh::default().report();
        assert_eq!(report.triangles, 0);
        assert!(!report.watertight);
        assert!(report.bounds.is_none());
        assert_eq!(report.volume, 0.0);
    }

    #[test]
    fn degenerate_triangles_are_dropped() {
        let mut builder = MeshBuilder::new();
        builder.push_triangle([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(builder.build().triangles.is_empty());
    }

    #[test]
    fn negative_zero_welds_with_zero() {
        let mut builder = MeshBuilder::new();
        builder.push_triangle([-0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        builder.push_triangle([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]);
        assert_eq!(builder.build().vertices.len(), 4);
    }
}
