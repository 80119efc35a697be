#![warn(missing_docs)]

//! Analytic geometry for the stepmill STEP importer.
//!
//! Thin nalgebra aliases plus the analytic surface and curve types that
//! AP214 B-rep files are built from: planes, cylinders, cones, spheres,
//! tori, lines, and circles. Surfaces evaluate `(u, v)` parameters to 3D
//! points and can invert a 3D point back to parameters, which is what the
//! tessellator uses to map boundary loops into parameter space.

use std::f64::consts::PI;

use nalgebra::{Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D parameter space.
pub type Vec2 = Vector2<f64>;

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_angle(a: f64) -> f64 {
    let a = a % (2.0 * PI);
    if a < 0.0 {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Build a unit vector perpendicular to `axis`.
///
/// Used when a STEP placement omits its reference direction.
pub fn any_perpendicular(axis: &Dir3) -> Dir3 {
    let arbitrary = if axis.as_ref().x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    Dir3::new_normalize(arbitrary - arbitrary.dot(axis.as_ref()) * axis.as_ref())
}

// =============================================================================
// Surfaces
// =============================================================================

/// An infinite plane with an in-plane coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along u.
    pub x_dir: Dir3,
    /// Unit vector along v.
    pub y_dir: Dir3,
    /// Unit normal (`x_dir × y_dir`).
    pub normal: Dir3,
}

impl Plane {
    /// Create a plane from an origin and two (not necessarily unit) frame vectors.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        let x = Dir3::new_normalize(x_dir);
        let n = Dir3::new_normalize(x_dir.cross(&y_dir));
        // Re-orthogonalize y so the frame is exact even for sloppy inputs.
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal: n,
        }
    }

    /// Project a 3D point into the plane's `(u, v)` frame.
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }
}

/// A cylindrical surface.
///
/// Parameterization:
/// `P(u, v) = center + radius * (cos(u) * ref_dir + sin(u) * y_dir) + v * axis`
/// with `u ∈ [0, 2π)` and `v` the height along the axis.
#[derive(Debug, Clone)]
pub struct Cylinder {
    /// A point on the cylinder axis.
    pub center: Point3,
    /// Unit direction of the axis.
    pub axis: Dir3,
    /// Reference direction for `u = 0` (perpendicular to the axis).
    pub ref_dir: Dir3,
    /// Radius.
    pub radius: f64,
}

impl Cylinder {
    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

/// A conical surface.
///
/// Parameterization:
/// `P(u, v) = apex + v * (cos(α) * axis + sin(α) * (cos(u) * ref_dir + sin(u) * y_dir))`
/// where `α` is the half-angle and `v ≥ 0` is the slant distance from the apex.
#[derive(Debug, Clone)]
pub struct Cone {
    /// Apex (tip) of the cone.
    pub apex: Point3,
    /// Unit direction from apex toward the widening end.
    pub axis: Dir3,
    /// Reference direction for `u = 0`.
    pub ref_dir: Dir3,
    /// Half-angle in radians.
    pub half_angle: f64,
}

impl Cone {
    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

/// A spherical surface.
///
/// Parameterization:
/// `P(u, v) = center + r * (cos(v) * (cos(u) * ref_dir + sin(u) * y_dir) + sin(v) * axis)`
/// with `u ∈ [0, 2π)` the longitude and `v ∈ [-π/2, π/2]` the latitude.
#[derive(Debug, Clone)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3,
    /// Unit direction toward the north pole.
    pub axis: Dir3,
    /// Reference direction for `u = 0`.
    pub ref_dir: Dir3,
    /// Radius.
    pub radius: f64,
}

impl Sphere {
    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

/// A toroidal surface.
///
/// Parameterization:
/// `P(u, v) = center + (R + r * cos(v)) * (cos(u) * ref_dir + sin(u) * y_dir) + r * sin(v) * axis`
/// with both parameters periodic.
#[derive(Debug, Clone)]
pub struct Torus {
    /// Center of the torus.
    pub center: Point3,
    /// Unit direction of the main axis.
    pub axis: Dir3,
    /// Reference direction for `u = 0`.
    pub ref_dir: Dir3,
    /// Major radius (center to tube center).
    pub major_radius: f64,
    /// Minor radius (tube).
    pub minor_radius: f64,
}

impl Torus {
    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

/// The kind of a surface, for dispatch and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Cylindrical surface.
    Cylinder,
    /// Conical surface.
    Cone,
    /// Spherical surface.
    Sphere,
    /// Toroidal surface.
    Torus,
}

/// An analytic surface.
///
/// A closed enum rather than a trait: the STEP reader is the only producer
/// and the tessellator needs the concrete fields anyway.
#[derive(Debug, Clone)]
pub enum Surface {
    /// Planar surface.
    Plane(Plane),
    /// Cylindrical surface.
    Cylinder(Cylinder),
    /// Conical surface.
    Cone(Cone),
    /// Spherical surface.
    Sphere(Sphere),
    /// Toroidal surface.
    Torus(Torus),
}

impl Surface {
    /// The kind of this surface.
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Plane(_) => SurfaceKind::Plane,
            Surface::Cylinder(_) => SurfaceKind::Cylinder,
            Surface::Cone(_) => SurfaceKind::Cone,
            Surface::Sphere(_) => SurfaceKind::Sphere,
            Surface::Torus(_) => SurfaceKind::Torus,
        }
    }

    /// Evaluate the surface at `(u, v)`.
    pub fn evaluate(&self, uv: Point2) -> Point3 {
        match self {
            Surface::Plane(p) => p.origin + uv.x * p.x_dir.as_ref() + uv.y * p.y_dir.as_ref(),
            Surface::Cylinder(c) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                c.center
                    + c.radius * (cos_u * c.ref_dir.as_ref() + sin_u * c.y_dir())
                    + uv.y * c.axis.as_ref()
            }
            Surface::Cone(c) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                let (sin_a, cos_a) = c.half_angle.sin_cos();
                c.apex
                    + uv.y
                        * (cos_a * c.axis.as_ref()
                            + sin_a * (cos_u * c.ref_dir.as_ref() + sin_u * c.y_dir()))
            }
            Surface::Sphere(s) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                let (sin_v, cos_v) = uv.y.sin_cos();
                s.center
                    + s.radius
                        * (cos_v * (cos_u * s.ref_dir.as_ref() + sin_u * s.y_dir())
                            + sin_v * s.axis.as_ref())
            }
            Surface::Torus(t) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                let (sin_v, cos_v) = uv.y.sin_cos();
                let radial = cos_u * t.ref_dir.as_ref() + sin_u * t.y_dir();
                t.center
                    + (t.major_radius + t.minor_radius * cos_v) * radial
                    + t.minor_radius * sin_v * t.axis.as_ref()
            }
        }
    }

    /// Surface normal at `(u, v)`, pointing along the natural orientation
    /// (`same_sense = true` in STEP terms).
    pub fn normal(&self, uv: Point2) -> Dir3 {
        match self {
            Surface::Plane(p) => p.normal,
            Surface::Cylinder(c) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                Dir3::new_normalize(cos_u * c.ref_dir.as_ref() + sin_u * c.y_dir())
            }
            Surface::Cone(c) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                let (sin_a, cos_a) = c.half_angle.sin_cos();
                let radial = cos_u * c.ref_dir.as_ref() + sin_u * c.y_dir();
                Dir3::new_normalize(cos_a * radial - sin_a * c.axis.as_ref())
            }
            Surface::Sphere(s) => {
                let p = self.evaluate(uv);
                Dir3::new_normalize(p - s.center)
            }
            Surface::Torus(t) => {
                let (sin_u, cos_u) = uv.x.sin_cos();
                let (sin_v, cos_v) = uv.y.sin_cos();
                let radial = cos_u * t.ref_dir.as_ref() + sin_u * t.y_dir();
                Dir3::new_normalize(cos_v * radial + sin_v * t.axis.as_ref())
            }
        }
    }

    /// Invert a 3D point (assumed on or near the surface) to `(u, v)`.
    ///
    /// Angular parameters come back in `[0, 2π)`; the caller is responsible
    /// for seam unwrapping when walking a boundary loop.
    pub fn uv_of(&self, p: &Point3) -> Point2 {
        match self {
            Surface::Plane(pl) => pl.project(p),
            Surface::Cylinder(c) => {
                let d = p - c.center;
                let v = d.dot(c.axis.as_ref());
                let radial = d - v * c.axis.as_ref();
                let u = normalize_angle(radial.dot(&c.y_dir()).atan2(radial.dot(c.ref_dir.as_ref())));
                Point2::new(u, v)
            }
            Surface::Cone(c) => {
                let d = p - c.apex;
                let h = d.dot(c.axis.as_ref());
                let radial = d - h * c.axis.as_ref();
                let u = if radial.norm() < 1e-12 {
                    0.0
                } else {
                    normalize_angle(radial.dot(&c.y_dir()).atan2(radial.dot(c.ref_dir.as_ref())))
                };
                Point2::new(u, d.norm())
            }
            Surface::Sphere(s) => {
                let d = (p - s.center) / s.radius;
                let v = d.dot(s.axis.as_ref()).clamp(-1.0, 1.0).asin();
                let radial = d - d.dot(s.axis.as_ref()) * s.axis.as_ref();
                let u = if radial.norm() < 1e-12 {
                    // Poles have no longitude; pick the seam.
                    0.0
                } else {
                    normalize_angle(radial.dot(&s.y_dir()).atan2(radial.dot(s.ref_dir.as_ref())))
                };
                Point2::new(u, v)
            }
            Surface::Torus(t) => {
                let d = p - t.center;
                let h = d.dot(t.axis.as_ref());
                let radial = d - h * t.axis.as_ref();
                let rho = radial.norm();
                let u = if rho < 1e-12 {
                    0.0
                } else {
                    normalize_angle(radial.dot(&t.y_dir()).atan2(radial.dot(t.ref_dir.as_ref())))
                };
                let v = normalize_angle(h.atan2(rho - t.major_radius));
                Point2::new(u, v)
            }
        }
    }

    /// Whether the `u` parameter is periodic with period 2π.
    pub fn u_periodic(&self) -> bool {
        !matches!(self, Surface::Plane(_))
    }

    /// Whether the `v` parameter is periodic with period 2π.
    pub fn v_periodic(&self) -> bool {
        matches!(self, Surface::Torus(_))
    }
}

// =============================================================================
// Curves
// =============================================================================

/// A line defined by an origin and a (not necessarily unit) direction vector.
///
/// The vector magnitude carries the STEP parametric scale and is irrelevant
/// to discretization; edges are bounded by their vertices.
#[derive(Debug, Clone)]
pub struct Line3 {
    /// A point on the line.
    pub origin: Point3,
    /// Direction (magnitude from the STEP VECTOR).
    pub direction: Vec3,
}

/// A circle in 3D with an explicit in-plane frame.
#[derive(Debug, Clone)]
pub struct Circle3 {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// In-plane direction at angle 0.
    pub x_dir: Dir3,
    /// In-plane direction at angle π/2.
    pub y_dir: Dir3,
    /// Plane normal; positive angles rotate counterclockwise around it.
    pub normal: Dir3,
}

impl Circle3 {
    /// Point at the given angle (radians from `x_dir`).
    pub fn point_at(&self, angle: f64) -> Point3 {
        let (s, c) = angle.sin_cos();
        self.center + self.radius * (c * self.x_dir.as_ref() + s * self.y_dir.as_ref())
    }

    /// Angle of a point on the circle, in `[0, 2π)`.
    pub fn angle_of(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        normalize_angle(d.dot(self.y_dir.as_ref()).atan2(d.dot(self.x_dir.as_ref())))
    }
}

/// An edge's underlying curve geometry.
#[derive(Debug, Clone)]
pub enum Curve {
    /// Straight line.
    Line(Line3),
    /// Circular arc (possibly a full circle).
    Circle(Circle3),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn z_dir() -> Dir3 {
        Dir3::new_normalize(Vec3::z())
    }

    fn x_dir() -> Dir3 {
        Dir3::new_normalize(Vec3::x())
    }

    #[test]
    fn plane_roundtrip() {
        let plane = Surface::Plane(Plane::new(
            Point3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ));
        let uv = Point2::new(0.5, -1.5);
        let p = plane.evaluate(uv);
        let back = plane.uv_of(&p);
        assert!((back - uv).norm() < 1e-12);
    }

    #[test]
    fn cylinder_roundtrip() {
        let cyl = Surface::Cylinder(Cylinder {
            center: Point3::new(0.0, 0.0, -2.0),
            axis: z_dir(),
            ref_dir: x_dir(),
            radius: 5.0,
        });
        let uv = Point2::new(1.25, 7.0);
        let p = cyl.evaluate(uv);
        let back = cyl.uv_of(&p);
        assert!((back.x - uv.x).abs() < 1e-12);
        assert!((back.y - uv.y).abs() < 1e-12);
        // Normal points radially outward.
        let n = cyl.normal(uv);
        assert!(n.as_ref().dot(&Vec3::z()).abs() < 1e-12);
    }

    #[test]
    fn cone_normal_perpendicular_to_slant() {
        let cone = Cone {
            apex: Point3::origin(),
            axis: z_dir(),
            ref_dir: x_dir(),
            half_angle: 0.4,
        };
        let surf = Surface::Cone(cone);
        let uv = Point2::new(0.7, 3.0);
        let p0 = surf.evaluate(uv);
        let p1 = surf.evaluate(Point2::new(uv.x, uv.y + 0.01));
        let slant = p1 - p0;
        assert!(surf.normal(uv).as_ref().dot(&slant).abs() < 1e-3);
    }

    #[test]
    fn sphere_poles() {
        let sph = Surface::Sphere(Sphere {
            center: Point3::origin(),
            axis: z_dir(),
            ref_dir: x_dir(),
            radius: 2.0,
        });
        let north = sph.evaluate(Point2::new(0.0, FRAC_PI_2));
        assert!((north - Point3::new(0.0, 0.0, 2.0)).norm() < 1e-12);
        let uv = sph.uv_of(&north);
        assert!((uv.y - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn torus_roundtrip() {
        let tor = Surface::Torus(Torus {
            center: Point3::origin(),
            axis: z_dir(),
            ref_dir: x_dir(),
            major_radius: 10.0,
            minor_radius: 2.0,
        });
        let uv = Point2::new(0.3, 4.0);
        let p = tor.evaluate(uv);
        let back = tor.uv_of(&p);
        assert!((back.x - uv.x).abs() < 1e-9);
        assert!((back.y - uv.y).abs() < 1e-9);
    }

    #[test]
    fn circle_angle_roundtrip() {
        let circle = Circle3 {
            center: Point3::new(1.0, 0.0, 0.0),
            radius: 3.0,
            x_dir: x_dir(),
            y_dir: Dir3::new_normalize(Vec3::y()),
            normal: z_dir(),
        };
        for k in 0..8 {
            let a = k as f64 * PI / 4.0;
            let p = circle.point_at(a);
            assert!((circle.angle_of(&p) - normalize_angle(a)).abs() < 1e-9);
        }
    }

    #[test]
    fn normalize_angle_range() {
        assert!((normalize_angle(-0.1) - (2.0 * PI - 0.1)).abs() < 1e-12);
        assert!(normalize_angle(2.0 * PI) < 1e-12);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
    }
}
