//! Binary and ASCII STL read/write.
//!
//! Writing always produces binary STL. Reading auto-detects: a file that
//! starts with `solid` and contains a `facet` keyword is parsed as ASCII,
//! anything else as binary.

use std::fs;
use std::path::Path;

use crate::{MeshBuilder, MeshError, TriMesh};

/// Serialize a mesh as binary STL.
pub fn stl_bytes(mesh: &TriMesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(84 + mesh.triangles.len() * 50);
    out.extend_from_slice(&[0u8; 80]);
    out.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
    for t in &mesh.triangles {
        let a = mesh.vertices[t[0] as usize];
        let b = mesh.vertices[t[1] as usize];
        let c = mesh.vertices[t[2] as usize];
        for x in facet_normal(a, b, c) {
            out.extend_from_slice(&x.to_le_bytes());
        }
        for v in [a, b, c] {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Write a mesh to disk as binary STL.
pub fn write_stl(path: &Path, mesh: &TriMesh) -> Result<(), MeshError> {
    fs::write(path, stl_bytes(mesh))?;
    Ok(())
}

/// Read an STL file (binary or ASCII), welding duplicate vertices.
pub fn read_stl(path: &Path) -> Result<TriMesh, MeshError> {
    let data = fs::read(path)?;
    if looks_ascii(&data) {
        read_ascii(&data)
    } else {
        read_binary(&data)
    }
}

fn looks_ascii(data: &[u8]) -> bool {
    data.starts_with(b"solid")
        && std::str::from_utf8(&data[..data.len().min(1024)])
            .map(|head| head.contains("facet"))
            .unwrap_or(false)
}

fn facet_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0; 3]
    }
}

fn read_binary(data: &[u8]) -> Result<TriMesh, MeshError> {
    if data.len() < 84 {
        return Err(MeshError::Format("binary STL shorter than header".into()));
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let expected = 84 + count * 50;
    if data.len() < expected {
        return Err(MeshError::Format(format!(
            "binary STL truncated: header promises {count} facets"
        )));
    }
    let mut builder = MeshBuilder::new();
    for i in 0..count {
        let base = 84 + i * 50;
        let mut verts = [[0.0f64; 3]; 3];
        for (v, vert) in verts.iter_mut().enumerate() {
            for k in 0..3 {
                let off = base + 12 + v * 12 + k * 4;
                let bytes = [data[off], data[off + 1], data[off + 2], data[off + 3]];
                vert[k] = f32::from_le_bytes(bytes) as f64;
            }
        }
        builder.push_triangle(verts[0], verts[1], verts[2]);
    }
    Ok(builder.build())
}

fn read_ascii(data: &[u8]) -> Result<TriMesh, MeshError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| MeshError::Format("ASCII STL is not valid UTF-8".into()))?;
    let mut builder = MeshBuilder::new();
    let mut verts: Vec<[f64; 3]> = Vec::with_capacity(3);
    for (lineno, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("vertex") => {
                let mut v = [0.0f64; 3];
                for x in &mut v {
                    *x = words
                        .next()
                        .and_then(|w| w.parse().ok())
                        .ok_or_else(|| {
                            MeshError::Format(format!("bad vertex on line {}", lineno + 1))
                        })?;
                }
                verts.push(v);
            }
            Some("endfacet") => {
                if verts.len() != 3 {
                    return Err(MeshError::Format(format!(
                        "facet ending on line {} has {} vertices",
                        lineno + 1,
                        verts.len()
                    )));
                }
                builder.push_triangle(verts[0], verts[1], verts[2]);
                verts.clear();
            }
            _ => {}
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::unit_cube;

    #[test]
    fn binary_roundtrip() {
        let mesh = unit_cube();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        write_stl(&path, &mesh).unwrap();

        let back = read_stl(&path).unwrap();
        assert_eq!(back.triangles.len(), 12);
        assert_eq!(back.vertices.len(), 8);
        let report = back.report();
        assert!((report.volume - 1.0).abs() < 1e-9);
        assert!(report.watertight);
    }

    #[test]
    fn binary_size_is_exact() {
        let mesh = unit_cube();
        assert_eq!(stl_bytes(&mesh).len(), 84 + 12 * 50);
    }

    #[test]
    fn ascii_is_detected_and_parsed() {
        let ascii = "\
solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        std::fs::write(&path, ascii).unwrap();
        let mesh = read_stl(&path).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let mesh = unit_cube();
        let mut bytes = stl_bytes(&mesh);
        bytes.truncate(bytes.len() - 10);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.stl");
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(read_stl(&path), Err(MeshError::Format(_))));
    }
}
