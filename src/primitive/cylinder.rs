//! Cylinder primitive: the barrel is split into two half-cylinder faces so
//! that every edge borders two different faces.
//!
//! 4 vertices (2 per rim), 6 edges (4 half-circle arcs + 2 seam lines),
//! 4 faces (2 barrel halves + 2 caps). V(4) - E(6) + F(4) = 2 ✓

use std::f64::consts::PI;

use super::add_line_edge;
use crate::builder::ShapeBuilder;
use crate::curve::Curve3;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::surface::Surface;
use crate::topo::*;

/// Create a cylinder on the Z axis from z = 0 to z = `height`.
pub fn make_cylinder(b: &mut ShapeBuilder, radius: f64, height: f64) -> SolidId {
    let axis = Vector3::z();
    let bottom_circle = Curve3::Circle {
        center: Point3::origin(),
        axis,
        radius,
    };
    let top_circle = Curve3::Circle {
        center: Point3::new(0.0, 0.0, height),
        axis,
        radius,
    };

    // Seam vertices at t = 0 and t = pi on each rim.
    let v_b0 = b.vertex(bottom_circle.evaluate(0.0));
    let v_b1 = b.vertex(bottom_circle.evaluate(PI));
    let v_t0 = b.vertex(top_circle.evaluate(0.0));
    let v_t1 = b.vertex(top_circle.evaluate(PI));

    let arc = |b: &mut ShapeBuilder, curve: &Curve3, t_start: f64, start, end| {
        b.store_mut().add_edge(Edge {
            curve: curve.clone(),
            t_start,
            t_end: t_start + PI,
            start,
            end,
            tolerance: TOLERANCE,
        })
    };
    let e_b_front = arc(b, &bottom_circle, 0.0, v_b0, v_b1);
    let e_b_back = arc(b, &bottom_circle, PI, v_b1, v_b0);
    let e_t_front = arc(b, &top_circle, 0.0, v_t0, v_t1);
    let e_t_back = arc(b, &top_circle, PI, v_t1, v_t0);

    let e_seam0 = add_line_edge(b, v_b0, v_t0);
    let e_seam1 = add_line_edge(b, v_b1, v_t1);

    let barrel = Surface::Cylinder {
        origin: Point3::origin(),
        axis,
        radius,
    };

    let bottom = b.face_from_edges(
        Surface::Plane {
            origin: Point3::origin(),
            normal: -axis,
        },
        &[(e_b_back, false), (e_b_front, false)],
        true,
    );
    let top = b.face_from_edges(
        Surface::Plane {
            origin: Point3::new(0.0, 0.0, height),
            normal: axis,
        },
        &[(e_t_front, true), (e_t_back, true)],
        true,
    );
    let barrel_front = b.face_from_edges(
        barrel.clone(),
        &[(e_b_front, true), (e_seam1, true), (e_t_front, false), (e_seam0, false)],
        true,
    );
    let barrel_back = b.face_from_edges(
        barrel,
        &[(e_b_back, true), (e_seam0, true), (e_t_back, false), (e_seam1, false)],
        true,
    );

    let shell = b.shell(vec![bottom, top, barrel_front, barrel_back]);
    b.solid(shell, vec![])
}
