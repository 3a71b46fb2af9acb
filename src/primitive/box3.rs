//! Box primitive: 6 planar faces, 12 edges, 8 vertices.
//!
//! Creates an axis-aligned box centered at the origin with half-extents (hx, hy, hz).
//! Euler: V(8) - E(12) + F(6) = 2 ✓

use super::add_line_edge;
use crate::builder::ShapeBuilder;
use crate::math::{Point3, Vector3};
use crate::surface::Surface;
use crate::topo::*;

/// Create an axis-aligned box centered at the origin.
///
/// `hx`, `hy`, `hz` are the half-extents along each axis.
pub fn make_box(b: &mut ShapeBuilder, hx: f64, hy: f64, hz: f64) -> SolidId {
    let v = [
        b.vertex(Point3::new(-hx, -hy, -hz)), // 0: ---
        b.vertex(Point3::new( hx, -hy, -hz)), // 1: +--
        b.vertex(Point3::new( hx,  hy, -hz)), // 2: ++-
        b.vertex(Point3::new(-hx,  hy, -hz)), // 3: -+-
        b.vertex(Point3::new(-hx, -hy,  hz)), // 4: --+
        b.vertex(Point3::new( hx, -hy,  hz)), // 5: +-+
        b.vertex(Point3::new( hx,  hy,  hz)), // 6: +++
        b.vertex(Point3::new(-hx,  hy,  hz)), // 7: -++
    ];

    // Bottom ring (z = -hz)
    let e0 = add_line_edge(b, v[0], v[1]);
    let e1 = add_line_edge(b, v[1], v[2]);
    let e2 = add_line_edge(b, v[2], v[3]);
    let e3 = add_line_edge(b, v[3], v[0]);

    // Top ring (z = +hz)
    let e4 = add_line_edge(b, v[4], v[5]);
    let e5 = add_line_edge(b, v[5], v[6]);
    let e6 = add_line_edge(b, v[6], v[7]);
    let e7 = add_line_edge(b, v[7], v[4]);

    // Verticals
    let e8 = add_line_edge(b, v[0], v[4]);
    let e9 = add_line_edge(b, v[1], v[5]);
    let e10 = add_line_edge(b, v[2], v[6]);
    let e11 = add_line_edge(b, v[3], v[7]);

    let plane = |origin: Point3, normal: Vector3| Surface::Plane { origin, normal };

    // Each shared edge is used once forward and once reversed.
    let bottom = b.face_from_edges(
        plane(Point3::new(0.0, 0.0, -hz), -Vector3::z()),
        &[(e3, false), (e2, false), (e1, false), (e0, false)],
        true,
    );
    let top = b.face_from_edges(
        plane(Point3::new(0.0, 0.0, hz), Vector3::z()),
        &[(e4, true), (e5, true), (e6, true), (e7, true)],
        true,
    );
    let front = b.face_from_edges(
        plane(Point3::new(0.0, -hy, 0.0), -Vector3::y()),
        &[(e0, true), (e9, true), (e4, false), (e8, false)],
        true,
    );
    let back = b.face_from_edges(
        plane(Point3::new(0.0, hy, 0.0), Vector3::y()),
        &[(e2, true), (e11, true), (e6, false), (e10, false)],
        true,
    );
    let right = b.face_from_edges(
        plane(Point3::new(hx, 0.0, 0.0), Vector3::x()),
        &[(e1, true), (e10, true), (e5, false), (e9, false)],
        true,
    );
    let left = b.face_from_edges(
        plane(Point3::new(-hx, 0.0, 0.0), -Vector3::x()),
        &[(e3, true), (e8, true), (e7, false), (e11, false)],
        true,
    );

    let shell = b.shell(vec![bottom, top, front, back, right, left]);
    b.solid(shell, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::validate::{shell_is_closed, wire_is_closed};

    #[test]
    fn box_is_closed_manifold() {
        let mut b = ShapeBuilder::new();
        let solid = make_box(&mut b, 1.0, 2.0, 3.0);
        let store = b.store();
        let shell = store.solid(solid).unwrap().outer_shell;
        assert!(shell_is_closed(store, shell).unwrap());
        for &f in &store.shell(shell).unwrap().faces {
            assert!(wire_is_closed(store, store.face(f).unwrap().outer_wire).unwrap());
        }
    }

    #[test]
    fn zero_extent_box_fails_structural_check() {
        let mut b = ShapeBuilder::new();
        let solid = make_box(&mut b, 0.0, 1.0, 1.0);
        let shape = b.finish(ShapeRef::Solid(solid));
        assert_eq!(shape.check().unwrap_err().kind(), "DegenerateGeometry");
    }
}
