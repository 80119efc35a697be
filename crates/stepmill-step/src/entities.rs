//! Typed resolution of the AP214 entity subset needed for solid geometry.
//!
//! Each function takes the raw entity graph and an id, validates the entity
//! type, and produces either a geom type or a small topology record. The
//! reader stitches these into solids.

use stepmill_geom::{
    any_perpendicular, Circle3, Cone, Curve, Cylinder, Dir3, Line3, Plane, Point3, Sphere, Surface,
    Torus, Vec3,
};

use crate::error::StepError;
use crate::parser::{Entity, StepFile, Value};

// ---------------------------------------------------------------------------
// Argument accessors
// ---------------------------------------------------------------------------

impl Entity {
    pub(crate) fn real(&self, idx: usize) -> Result<f64, StepError> {
        self.args.get(idx).and_then(Value::as_real).ok_or_else(|| {
            StepError::parse(
                Some(self.id),
                format!("expected real at arg {idx} in {}", self.type_name),
            )
        })
    }

    pub(crate) fn enumeration(&self, idx: usize) -> Result<&str, StepError> {
        self.args.get(idx).and_then(Value::as_enum).ok_or_else(|| {
            StepError::parse(
                Some(self.id),
                format!("expected enum at arg {idx} in {}", self.type_name),
            )
        })
    }

    pub(crate) fn ref_id(&self, idx: usize) -> Result<u64, StepError> {
        self.args.get(idx).and_then(Value::as_ref_id).ok_or_else(|| {
            StepError::parse(
                Some(self.id),
                format!("expected entity ref at arg {idx} in {}", self.type_name),
            )
        })
    }

    pub(crate) fn real_list(&self, idx: usize) -> Result<Vec<f64>, StepError> {
        let list = self.args.get(idx).and_then(Value::as_list).ok_or_else(|| {
            StepError::parse(
                Some(self.id),
                format!("expected list at arg {idx} in {}", self.type_name),
            )
        })?;
        list.iter()
            .map(|v| {
                v.as_real().ok_or_else(|| {
                    StepError::parse(Some(self.id), format!("expected reals in arg {idx}"))
                })
            })
            .collect()
    }

    pub(crate) fn ref_list(&self, idx: usize) -> Result<Vec<u64>, StepError> {
        let list = self.args.get(idx).and_then(Value::as_list).ok_or_else(|| {
            StepError::parse(
                Some(self.id),
                format!("expected list at arg {idx} in {}", self.type_name),
            )
        })?;
        list.iter()
            .map(|v| {
                v.as_ref_id().ok_or_else(|| {
                    StepError::parse(Some(self.id), format!("expected entity refs in arg {idx}"))
                })
            })
            .collect()
    }

    pub(crate) fn is_null(&self, idx: usize) -> bool {
        self.args.get(idx).map(Value::is_null).unwrap_or(true)
    }

    fn expect_type(&self, expected: &str) -> Result<(), StepError> {
        if self.type_name == expected {
            Ok(())
        } else {
            Err(StepError::type_mismatch(expected, &self.type_name))
        }
    }
}

// ---------------------------------------------------------------------------
// Points, directions, placements
// ---------------------------------------------------------------------------

/// `CARTESIAN_POINT(name, (x, y, z))`
pub fn cartesian_point(file: &StepFile, id: u64) -> Result<Point3, StepError> {
    let e = file.require(id)?;
    e.expect_type("CARTESIAN_POINT")?;
    let coords = e.real_list(1)?;
    if coords.len() < 3 {
        return Err(StepError::parse(
            Some(id),
            format!("CARTESIAN_POINT needs 3 coordinates, got {}", coords.len()),
        ));
    }
    Ok(Point3::new(coords[0], coords[1], coords[2]))
}

/// `DIRECTION(name, (x, y, z))`
pub fn direction(file: &StepFile, id: u64) -> Result<Dir3, StepError> {
    let e = file.require(id)?;
    e.expect_type("DIRECTION")?;
    let coords = e.real_list(1)?;
    if coords.len() < 3 {
        return Err(StepError::parse(
            Some(id),
            format!("DIRECTION needs 3 components, got {}", coords.len()),
        ));
    }
    let v = Vec3::new(coords[0], coords[1], coords[2]);
    if v.norm() < 1e-15 {
        return Err(StepError::invalid(id, "zero-length direction"));
    }
    Ok(Dir3::new_normalize(v))
}

/// `VECTOR(name, direction, magnitude)`
pub fn vector(file: &StepFile, id: u64) -> Result<Vec3, StepError> {
    let e = file.require(id)?;
    e.expect_type("VECTOR")?;
    let dir = direction(file, e.ref_id(1)?)?;
    let magnitude = e.real(2)?;
    Ok(magnitude * dir.as_ref())
}

/// An axis placement: location plus optional z and x directions.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Location point.
    pub location: Point3,
    /// Z axis (main axis / normal), if given.
    pub axis: Option<Dir3>,
    /// X axis (reference direction), if given.
    pub ref_direction: Option<Dir3>,
}

impl Placement {
    /// Z axis, defaulting to +Z.
    pub fn z_axis(&self) -> Dir3 {
        self.axis.unwrap_or_else(|| Dir3::new_normalize(Vec3::z()))
    }

    /// X axis, projected perpendicular to Z; synthesized when absent.
    pub fn x_axis(&self) -> Dir3 {
        let z = self.z_axis();
        match self.ref_direction {
            Some(x) => {
                let projected = x.as_ref() - x.dot(z.as_ref()) * z.as_ref();
                if projected.norm() < 1e-12 {
                    any_perpendicular(&z)
                } else {
                    Dir3::new_normalize(projected)
                }
            }
            None => any_perpendicular(&z),
        }
    }

    /// Y axis (`z × x`).
    pub fn y_axis(&self) -> Dir3 {
        Dir3::new_normalize(self.z_axis().as_ref().cross(self.x_axis().as_ref()))
    }
}

/// `AXIS2_PLACEMENT_3D(name, location, axis, ref_direction)` or
/// `AXIS1_PLACEMENT(name, location, axis)`.
pub fn placement(file: &StepFile, id: u64) -> Result<Placement, StepError> {
    let e = file.require(id)?;
    match e.type_name.as_str() {
        "AXIS2_PLACEMENT_3D" => {
            let location = cartesian_point(file, e.ref_id(1)?)?;
            let axis = optional_direction(file, e, 2)?;
            let ref_direction = optional_direction(file, e, 3)?;
            Ok(Placement {
                location,
                axis,
                ref_direction,
            })
        }
        "AXIS1_PLACEMENT" => {
            let location = cartesian_point(file, e.ref_id(1)?)?;
            let axis = optional_direction(file, e, 2)?;
            Ok(Placement {
                location,
                axis,
                ref_direction: None,
            })
        }
        other => Err(StepError::type_mismatch("AXIS2_PLACEMENT_3D", other)),
    }
}

fn optional_direction(file: &StepFile, e: &Entity, idx: usize) -> Result<Option<Dir3>, StepError> {
    if e.is_null(idx) {
        Ok(None)
    } else {
        Ok(Some(direction(file, e.ref_id(idx)?)?))
    }
}

// ---------------------------------------------------------------------------
// Curves
// ---------------------------------------------------------------------------

/// Resolve an edge's curve geometry. Unknown curve types return `Ok(None)`;
/// the edge then degrades to a straight chord between its vertices.
pub fn curve(file: &StepFile, id: u64) -> Result<Option<Curve>, StepError> {
    let e = file.require(id)?;
    match e.type_name.as_str() {
        "LINE" => {
            let origin = cartesian_point(file, e.ref_id(1)?)?;
            let dir = vector(file, e.ref_id(2)?)?;
            Ok(Some(Curve::Line(Line3 {
                origin,
                direction: dir,
            })))
        }
        "CIRCLE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            let radius = e.real(2)?;
            if radius <= 0.0 {
                return Err(StepError::invalid(
                    id,
                    format!("circle has non-positive radius {radius}"),
                ));
            }
            Ok(Some(Curve::Circle(Circle3 {
                center: pl.location,
                radius,
                x_dir: pl.x_axis(),
                y_dir: pl.y_axis(),
                normal: pl.z_axis(),
            })))
        }
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// Resolve a face's surface geometry.
pub fn surface(file: &StepFile, id: u64) -> Result<Surface, StepError> {
    let e = file.require(id)?;
    match e.type_name.as_str() {
        "PLANE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            Ok(Surface::Plane(Plane::new(
                pl.location,
                *pl.x_axis().as_ref(),
                *pl.y_axis().as_ref(),
            )))
        }
        "CYLINDRICAL_SURFACE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            Ok(Surface::Cylinder(Cylinder {
                center: pl.location,
                axis: pl.z_axis(),
                ref_dir: pl.x_axis(),
                radius: e.real(2)?,
            }))
        }
        "CONICAL_SURFACE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            let radius = e.real(2)?;
            let half_angle = e.real(3)?;
            // STEP positions the placement at the reference circle; our cone
            // is apex-based, so walk back along the axis.
            let apex_dist = if half_angle.tan().abs() > 1e-15 {
                radius / half_angle.tan()
            } else {
                0.0
            };
            let apex = pl.location - apex_dist * pl.z_axis().as_ref();
            Ok(Surface::Cone(Cone {
                apex,
                axis: pl.z_axis(),
                ref_dir: pl.x_axis(),
                half_angle,
            }))
        }
        "SPHERICAL_SURFACE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            Ok(Surface::Sphere(Sphere {
                center: pl.location,
                axis: pl.z_axis(),
                ref_dir: pl.x_axis(),
                radius: e.real(2)?,
            }))
        }
        "TOROIDAL_SURFACE" => {
            let pl = placement(file, e.ref_id(1)?)?;
            Ok(Surface::Torus(Torus {
                center: pl.location,
                axis: pl.z_axis(),
                ref_dir: pl.x_axis(),
                major_radius: e.real(2)?,
                minor_radius: e.real(3)?,
            }))
        }
        other => Err(StepError::Unsupported(format!("surface type {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// `VERTEX_POINT(name, point)`
pub fn vertex_point(file: &StepFile, id: u64) -> Result<Point3, StepError> {
    let e = file.require(id)?;
    e.expect_type("VERTEX_POINT")?;
    cartesian_point(file, e.ref_id(1)?)
}

/// Parsed `EDGE_CURVE`.
#[derive(Debug, Clone)]
pub struct EdgeCurve {
    /// Entity id (stable key for shared discretization).
    pub id: u64,
    /// Start vertex id.
    pub start_vertex: u64,
    /// End vertex id.
    pub end_vertex: u64,
    /// Curve geometry id.
    pub curve: u64,
    /// Whether curve direction matches edge direction.
    pub same_sense: bool,
}

/// `EDGE_CURVE(name, start, end, curve, same_sense)`
pub fn edge_curve(file: &StepFile, id: u64) -> Result<EdgeCurve, StepError> {
    let e = file.require(id)?;
    e.expect_type("EDGE_CURVE")?;
    Ok(EdgeCurve {
        id,
        start_vertex: e.ref_id(1)?,
        end_vertex: e.ref_id(2)?,
        curve: e.ref_id(3)?,
        same_sense: e.enumeration(4)? == "T",
    })
}

/// Parsed `ORIENTED_EDGE`: the underlying edge plus the loop orientation.
#[derive(Debug, Clone, Copy)]
pub struct OrientedEdge {
    /// Underlying `EDGE_CURVE` id.
    pub edge: u64,
    /// Orientation of the edge within its loop.
    pub forward: bool,
}

/// `ORIENTED_EDGE(name, *, *, edge, orientation)`
pub fn oriented_edge(file: &StepFile, id: u64) -> Result<OrientedEdge, StepError> {
    let e = file.require(id)?;
    e.expect_type("ORIENTED_EDGE")?;
    Ok(OrientedEdge {
        edge: e.ref_id(3)?,
        forward: e.enumeration(4)? == "T",
    })
}

/// `EDGE_LOOP(name, (oriented_edges...))`
pub fn edge_loop(file: &StepFile, id: u64) -> Result<Vec<u64>, StepError> {
    let e = file.require(id)?;
    e.expect_type("EDGE_LOOP")?;
    e.ref_list(1)
}

/// Parsed `FACE_BOUND` / `FACE_OUTER_BOUND`.
#[derive(Debug, Clone, Copy)]
pub struct FaceBound {
    /// The `EDGE_LOOP` id.
    pub edge_loop: u64,
    /// Whether the bound orientation agrees with the loop.
    pub orientation: bool,
    /// Whether this is the outer bound.
    pub outer: bool,
}

/// `FACE_BOUND(name, loop, orientation)` (or `FACE_OUTER_BOUND`)
pub fn face_bound(file: &StepFile, id: u64) -> Result<FaceBound, StepError> {
    let e = file.require(id)?;
    match e.type_name.as_str() {
        "FACE_BOUND" | "FACE_OUTER_BOUND" => Ok(FaceBound {
            edge_loop: e.ref_id(1)?,
            orientation: e.enumeration(2)? == "T",
            outer: e.type_name == "FACE_OUTER_BOUND",
        }),
        other => Err(StepError::type_mismatch("FACE_BOUND", other)),
    }
}

/// Parsed `ADVANCED_FACE`.
#[derive(Debug, Clone)]
pub struct AdvancedFace {
    /// Bound records.
    pub bounds: Vec<FaceBound>,
    /// Surface geometry id.
    pub surface: u64,
    /// Whether the face normal agrees with the surface normal.
    pub same_sense: bool,
}

/// `ADVANCED_FACE(name, (bounds...), surface, same_sense)`
pub fn advanced_face(file: &StepFile, id: u64) -> Result<AdvancedFace, StepError> {
    let e = file.require(id)?;
    e.expect_type("ADVANCED_FACE")?;
    let bound_ids = e.ref_list(1)?;
    let mut bounds = Vec::with_capacity(bound_ids.len());
    for bid in bound_ids {
        bounds.push(face_bound(file, bid)?);
    }
    Ok(AdvancedFace {
        bounds,
        surface: e.ref_id(2)?,
        same_sense: e.enumeration(3)? == "T",
    })
}

/// `CLOSED_SHELL(name, (faces...))` (or `OPEN_SHELL`)
pub fn shell_faces(file: &StepFile, id: u64) -> Result<Vec<u64>, StepError> {
    let e = file.require(id)?;
    match e.type_name.as_str() {
        "CLOSED_SHELL" | "OPEN_SHELL" => e.ref_list(1),
        other => Err(StepError::type_mismatch("CLOSED_SHELL", other)),
    }
}

/// Parsed `MANIFOLD_SOLID_BREP`.
#[derive(Debug, Clone)]
pub struct SolidBrep {
    /// Solid name from the file (often empty).
    pub name: String,
    /// Outer shell id.
    pub outer_shell: u64,
}

/// `MANIFOLD_SOLID_BREP(name, outer_shell)`
pub fn manifold_solid_brep(file: &StepFile, id: u64) -> Result<SolidBrep, StepError> {
    let e = file.require(id)?;
    e.expect_type("MANIFOLD_SOLID_BREP")?;
    let name = match e.args.first() {
        Some(Value::Str(s)) => s.clone(),
        _ => String::new(),
    };
    Ok(SolidBrep {
        name,
        outer_shell: e.ref_id(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(input: &str) -> StepFile {
        Parser::parse(input.as_bytes()).unwrap()
    }

    fn wrap(data: &str) -> String {
        format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n")
    }

    #[test]
    fn point_and_direction() {
        let file = parse(&wrap(
            "#1 = CARTESIAN_POINT('', (1.0, 2.0, 3.0));\n#2 = DIRECTION('', (0.0, 0.0, 2.0));",
        ));
        let p = cartesian_point(&file, 1).unwrap();
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
        let d = direction(&file, 2).unwrap();
        assert!((d.as_ref().z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn placement_frame() {
        let file = parse(&wrap(
            "#1 = CARTESIAN_POINT('', (0.0, 0.0, 5.0));\n\
             #2 = DIRECTION('', (0.0, 0.0, 1.0));\n\
             #3 = DIRECTION('', (1.0, 0.0, 0.0));\n\
             #4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);",
        ));
        let pl = placement(&file, 4).unwrap();
        assert!((pl.location.z - 5.0).abs() < 1e-12);
        assert!((pl.y_axis().as_ref().y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn placement_without_ref_direction() {
        let file = parse(&wrap(
            "#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));\n\
             #2 = DIRECTION('', (0.0, 0.0, 1.0));\n\
             #4 = AXIS2_PLACEMENT_3D('', #1, #2, $);",
        ));
        let pl = placement(&file, 4).unwrap();
        // Synthesized x must be perpendicular to z.
        assert!(pl.x_axis().dot(pl.z_axis().as_ref()).abs() < 1e-12);
    }

    #[test]
    fn circle_curve() {
        let file = parse(&wrap(
            "#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));\n\
             #2 = DIRECTION('', (0.0, 0.0, 1.0));\n\
             #3 = DIRECTION('', (1.0, 0.0, 0.0));\n\
             #4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);\n\
             #5 = CIRCLE('', #4, 5.0);",
        ));
        match curve(&file, 5).unwrap() {
            Some(Curve::Circle(c)) => assert!((c.radius - 5.0).abs() < 1e-12),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn degenerate_geometry_names_the_entity() {
        let file = parse(&wrap(
            "#2 = DIRECTION('', (0.0, 0.0, 0.0));\n\
             #5 = CIRCLE('', #9, 0.0);\n\
             #9 = AXIS2_PLACEMENT_3D('', #10, $, $);\n\
             #10 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));",
        ));
        assert!(matches!(
            direction(&file, 2),
            Err(StepError::Invalid { entity: 2, .. })
        ));
        assert!(matches!(
            curve(&file, 5),
            Err(StepError::Invalid { entity: 5, .. })
        ));
    }

    #[test]
    fn unknown_curve_degrades_to_none() {
        let file = parse(&wrap("#1 = ELLIPSE('', #9, 2.0, 1.0);"));
        assert!(curve(&file, 1).unwrap().is_none());
    }

    #[test]
    fn cylindrical_surface() {
        let file = parse(&wrap(
            "#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));\n\
             #2 = DIRECTION('', (0.0, 0.0, 1.0));\n\
             #3 = DIRECTION('', (1.0, 0.0, 0.0));\n\
             #4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);\n\
             #5 = CYLINDRICAL_SURFACE('', #4, 3.0);",
        ));
        match surface(&file, 5).unwrap() {
            Surface::Cylinder(c) => assert!((c.radius - 3.0).abs() < 1e-12),
            other => panic!("expected cylinder, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_surface_errors() {
        let file = parse(&wrap("#1 = B_SPLINE_SURFACE_WITH_KNOTS('', 3, 3, (), ());"));
        assert!(matches!(surface(&file, 1), Err(StepError::Unsupported(_))));
    }

    #[test]
    fn face_and_bounds() {
        let file = parse(&wrap(
            "#6 = EDGE_LOOP('', (#10, #11));\n\
             #7 = FACE_OUTER_BOUND('', #6, .T.);\n\
             #8 = ADVANCED_FACE('', (#7), #5, .F.);",
        ));
        let face = advanced_face(&file, 8).unwrap();
        assert_eq!(face.surface, 5);
        assert!(!face.same_sense);
        assert!(face.bounds[0].outer);
        assert_eq!(edge_loop(&file, 6).unwrap(), vec![10, 11]);
    }

    #[test]
    fn oriented_edge_with_derived_args() {
        let file = parse(&wrap("#1 = ORIENTED_EDGE('', *, *, #42, .F.);"));
        let oe = oriented_edge(&file, 1).unwrap();
        assert_eq!(oe.edge, 42);
        assert!(!oe.forward);
    }
}
