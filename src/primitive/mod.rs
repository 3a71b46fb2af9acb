//! Primitive solid constructors.
//!
//! Each function lays out a complete B-Rep solid (topology + geometry) in a
//! `ShapeBuilder`. Dimensions are not validated here; a degenerate primitive
//! is rejected by the exporters' structural check.

mod box3;
mod cylinder;

pub use box3::make_box;
pub use cylinder::make_cylinder;

use crate::builder::ShapeBuilder;
use crate::curve::Curve3;
use crate::math::TOLERANCE;
use crate::topo::*;

/// Add a line edge between two vertices, parameterized on `[0, 1]`.
fn add_line_edge(b: &mut ShapeBuilder, start: VertexId, end: VertexId) -> EdgeId {
    let store = b.store_mut();
    let p0 = store.vertices[start.0].point;
    let p1 = store.vertices[end.0].point;
    store.add_edge(Edge {
        curve: Curve3::Line {
            origin: p0,
            dir: p1 - p0,
        },
        t_start: 0.0,
        t_end: 1.0,
        start,
        end,
        tolerance: TOLERANCE,
    })
}
