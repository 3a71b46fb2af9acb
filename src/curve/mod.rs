//! 3D curve types carried by topology `Edge` entities.

use crate::error::{KernelError, Result};
use crate::math::{is_finite3, plane_frame, ModelTransform, Point3, Vector3, PARAM_TOL};

/// A geometric curve in 3D space. Carried by topology `Edge` entities.
///
/// Parameterizations:
/// - **Line:** `C(t) = origin + t*dir` (an edge built between two points uses `[0, 1]`)
/// - **Circle:** `C(t) = center + radius*(cos(t)*u + sin(t)*v)` where `(u, v) = plane_frame(axis)`
/// - **Ellipse:** `C(t) = center + cos(t)*major + sin(t)*minor`
#[derive(Clone, Debug)]
pub enum Curve3 {
    Line {
        origin: Point3,
        dir: Vector3,
    },
    Circle {
        center: Point3,
        axis: Vector3,
        radius: f64,
    },
    Ellipse {
        center: Point3,
        major: Vector3,
        minor: Vector3,
    },
}

impl Curve3 {
    /// Evaluate the curve at parameter `t`.
    pub fn evaluate(&self, t: f64) -> Point3 {
        match self {
            Curve3::Line { origin, dir } => origin + dir * t,
            Curve3::Circle {
                center,
                axis,
                radius,
            } => {
                let (u, v) = plane_frame(axis);
                center + (u * t.cos() + v * t.sin()) * *radius
            }
            Curve3::Ellipse {
                center,
                major,
                minor,
            } => center + major * t.cos() + minor * t.sin(),
        }
    }

    /// Find the parameter closest to the given point.
    ///
    /// Closed curves return a parameter in `(-pi, pi]`.
    pub fn closest_parameter(&self, point: &Point3) -> f64 {
        match self {
            Curve3::Line { origin, dir } => {
                let d = point - origin;
                d.dot(dir) / dir.dot(dir)
            }
            Curve3::Circle { center, axis, .. } => {
                let (u, v) = plane_frame(axis);
                let d = point - center;
                d.dot(&v).atan2(d.dot(&u))
            }
            Curve3::Ellipse {
                center,
                major,
                minor,
            } => {
                let d = point - center;
                (d.dot(minor) / minor.norm_squared()).atan2(d.dot(major) / major.norm_squared())
            }
        }
    }

    /// True for curves whose parameter range wraps around (circle, ellipse).
    pub fn is_periodic(&self) -> bool {
        !matches!(self, Curve3::Line { .. })
    }

    /// Return the curve mapped into exported model space.
    pub fn transformed(&self, t: &ModelTransform) -> Curve3 {
        match self {
            Curve3::Line { origin, dir } => Curve3::Line {
                origin: t.point(origin),
                dir: t.vector(dir),
            },
            Curve3::Circle {
                center,
                axis,
                radius,
            } => Curve3::Circle {
                center: t.point(center),
                axis: t.direction(axis),
                radius: t.length(*radius),
            },
            Curve3::Ellipse {
                center,
                major,
                minor,
            } => Curve3::Ellipse {
                center: t.point(center),
                major: t.vector(major),
                minor: t.vector(minor),
            },
        }
    }

    /// Check the defining data is finite and non-degenerate.
    pub fn check(&self) -> Result<()> {
        let finite = |p: &Point3| is_finite3(&p.coords);
        match self {
            Curve3::Line { origin, dir } => {
                if !finite(origin) || !is_finite3(dir) {
                    return Err(KernelError::NonFiniteGeometry("line has non-finite data".into()));
                }
                if dir.norm() < PARAM_TOL {
                    return Err(KernelError::DegenerateGeometry("line direction has zero length".into()));
                }
            }
            Curve3::Circle {
                center,
                axis,
                radius,
            } => {
                if !finite(center) || !is_finite3(axis) || !radius.is_finite() {
                    return Err(KernelError::NonFiniteGeometry("circle has non-finite data".into()));
                }
                if *radius <= 0.0 || axis.norm() < PARAM_TOL {
                    return Err(KernelError::DegenerateGeometry(format!(
                        "circle with radius {radius} is degenerate"
                    )));
                }
            }
            Curve3::Ellipse {
                center,
                major,
                minor,
            } => {
                if !finite(center) || !is_finite3(major) || !is_finite3(minor) {
                    return Err(KernelError::NonFiniteGeometry("ellipse has non-finite data".into()));
                }
                if major.cross(minor).norm() < PARAM_TOL {
                    return Err(KernelError::DegenerateGeometry("ellipse axes are parallel or zero".into()));
                }
                if major.dot(minor).abs() > PARAM_TOL * major.norm() * minor.norm() {
                    return Err(KernelError::DegenerateGeometry("ellipse axes are not perpendicular".into()));
                }
            }
        }
        Ok(())
    }
}
