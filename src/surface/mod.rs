//! Surface types for the B-Rep kernel.
//!
//! Each `Face` in the topology carries one `Surface` as its geometric carrier.
//! Only the defining data is kept here; writers read it directly.

use crate::error::{KernelError, Result};
use crate::math::{is_finite3, plane_frame, ModelTransform, Point3, Vector3, PARAM_TOL};

/// A geometric surface. Carried by topology `Face` entities.
///
/// Every variant is placed by a location point and a unit axis; the
/// reference direction in the perpendicular plane is `plane_frame(axis).0`.
#[derive(Clone, Debug)]
pub enum Surface {
    Plane {
        origin: Point3,
        normal: Vector3,
    },
    Cylinder {
        origin: Point3,
        axis: Vector3,
        radius: f64,
    },
    Cone {
        apex: Point3,
        axis: Vector3,
        half_angle: f64,
    },
    Sphere {
        center: Point3,
        radius: f64,
    },
    Torus {
        center: Point3,
        axis: Vector3,
        major_r: f64,
        minor_r: f64,
    },
}

impl Surface {
    /// Location point and main axis (sphere axis is +Z).
    pub fn position(&self) -> (Point3, Vector3) {
        match self {
            Surface::Plane { origin, normal } => (*origin, normal.normalize()),
            Surface::Cylinder { origin, axis, .. } => (*origin, axis.normalize()),
            Surface::Cone { apex, axis, .. } => (*apex, axis.normalize()),
            Surface::Sphere { center, .. } => (*center, Vector3::new(0.0, 0.0, 1.0)),
            Surface::Torus { center, axis, .. } => (*center, axis.normalize()),
        }
    }

    /// Reference (X) direction of the surface placement.
    pub fn ref_direction(&self) -> Vector3 {
        plane_frame(&self.position().1).0
    }

    pub fn is_plane(&self) -> bool {
        matches!(self, Surface::Plane { .. })
    }

    /// Short type name used by the structural dump.
    pub fn type_name(&self) -> &'static str {
        match self {
            Surface::Plane { .. } => "Plane",
            Surface::Cylinder { .. } => "CylindricalSurface",
            Surface::Cone { .. } => "ConicalSurface",
            Surface::Sphere { .. } => "SphericalSurface",
            Surface::Torus { .. } => "ToroidalSurface",
        }
    }

    /// Return the surface mapped into exported model space.
    pub fn transformed(&self, t: &ModelTransform) -> Surface {
        match self {
            Surface::Plane { origin, normal } => Surface::Plane {
                origin: t.point(origin),
                normal: t.direction(normal),
            },
            Surface::Cylinder {
                origin,
                axis,
                radius,
            } => Surface::Cylinder {
                origin: t.point(origin),
                axis: t.direction(axis),
                radius: t.length(*radius),
            },
            Surface::Cone {
                apex,
                axis,
                half_angle,
            } => Surface::Cone {
                apex: t.point(apex),
                axis: t.direction(axis),
                half_angle: *half_angle,
            },
            Surface::Sphere { center, radius } => Surface::Sphere {
                center: t.point(center),
                radius: t.length(*radius),
            },
            Surface::Torus {
                center,
                axis,
                major_r,
                minor_r,
            } => Surface::Torus {
                center: t.point(center),
                axis: t.direction(axis),
                major_r: t.length(*major_r),
                minor_r: t.length(*minor_r),
            },
        }
    }

    /// Check the defining data is finite and non-degenerate.
    pub fn check(&self) -> Result<()> {
        let (loc, axis) = match self {
            Surface::Plane { origin, normal } => (*origin, *normal),
            Surface::Cylinder { origin, axis, .. } => (*origin, *axis),
            Surface::Cone { apex, axis, .. } => (*apex, *axis),
            Surface::Sphere { center, .. } => (*center, Vector3::z()),
            Surface::Torus { center, axis, .. } => (*center, *axis),
        };
        if !is_finite3(&loc.coords) || !is_finite3(&axis) {
            return Err(KernelError::NonFiniteGeometry(format!(
                "{} has non-finite placement",
                self.type_name()
            )));
        }
        if axis.norm() < PARAM_TOL {
            return Err(KernelError::DegenerateGeometry(format!(
                "{} axis has zero length",
                self.type_name()
            )));
        }
        let positive = |r: f64| r.is_finite() && r > 0.0;
        let ok = match self {
            Surface::Plane { .. } => true,
            Surface::Cylinder { radius, .. } | Surface::Sphere { radius, .. } => positive(*radius),
            Surface::Cone { half_angle, .. } => {
                positive(*half_angle) && *half_angle < std::f64::consts::FRAC_PI_2
            }
            Surface::Torus {
                major_r, minor_r, ..
            } => positive(*major_r) && positive(*minor_r),
        };
        if ok {
            Ok(())
        } else {
            Err(KernelError::DegenerateGeometry(format!(
                "{} has an invalid radius or angle",
                self.type_name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Isometry3;

    #[test]
    fn ref_direction_is_perpendicular_to_axis() {
        let s = Surface::Cylinder {
            origin: Point3::origin(),
            axis: Vector3::new(0.0, 3.0, 0.0),
            radius: 1.0,
        };
        let (_, axis) = s.position();
        assert!((axis.norm() - 1.0).abs() < 1e-12);
        assert!(s.ref_direction().dot(&axis).abs() < 1e-12);
    }

    #[test]
    fn transformed_sphere_scales_radius() {
        let s = Surface::Sphere {
            center: Point3::new(1.0, 0.0, 0.0),
            radius: 4.0,
        };
        let t = ModelTransform::new(Isometry3::identity(), 0.5);
        match s.transformed(&t) {
            Surface::Sphere { center, radius } => {
                assert!((center.x - 0.5).abs() < 1e-12);
                assert!((radius - 2.0).abs() < 1e-12);
            }
            other => panic!("unexpected surface {other:?}"),
        }
    }

    #[test]
    fn invalid_surfaces_are_rejected() {
        let cone = Surface::Cone {
            apex: Point3::origin(),
            axis: Vector3::z(),
            half_angle: 2.0,
        };
        assert!(cone.check().is_err());
        let plane = Surface::Plane {
            origin: Point3::new(f64::INFINITY, 0.0, 0.0),
            normal: Vector3::z(),
        };
        assert!(plane.check().is_err());
        let torus = Surface::Torus {
            center: Point3::origin(),
            axis: Vector3::z(),
            major_r: 5.0,
            minor_r: 1.0,
        };
        assert!(torus.check().is_ok());
    }
}
