//! The `Shape` value handed to exporters.
//!
//! A shape is a root entity inside a topology store, seen with an
//! orientation and a rigid placement. The store sits behind an `Arc`, so a
//! `Shape` is cheap to clone and re-place without copying topology.
//!
//! # Example
//!
//! ```rust
//! use brepio::shape::Shape;
//! use brepio::math::Isometry3;
//!
//! let moved = Shape::box3(5.0, 3.0, 8.0).located(Isometry3::translation(0.0, 0.0, 10.0));
//! assert!(!moved.is_null());
//! ```

use std::sync::Arc;

use crate::builder::ShapeBuilder;
use crate::error::{KernelError, Result};
use crate::math::{Isometry3, ModelTransform, Point3, Vector3};
use crate::primitive;
use crate::topo::validate::check_shape;
use crate::topo::*;

#[derive(Clone, Debug)]
pub struct Shape {
    store: Arc<TopoStore>,
    root: Option<ShapeRef>,
    orientation: Orientation,
    location: Isometry3,
}

impl Default for Shape {
    fn default() -> Self {
        Self::null()
    }
}

impl Shape {
    /// The null shape: no topology at all.
    pub fn null() -> Self {
        Self::from_parts(TopoStore::new(), None)
    }

    pub fn from_parts(store: TopoStore, root: Option<ShapeRef>) -> Self {
        Self {
            store: Arc::new(store),
            root,
            orientation: Orientation::Forward,
            location: Isometry3::identity(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<ShapeRef> {
        self.root
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        self.root.map(ShapeRef::kind)
    }

    pub fn store(&self) -> &TopoStore {
        &self.store
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn location(&self) -> &Isometry3 {
        &self.location
    }

    /// Same topology, placed by `placement` on top of the current location.
    pub fn located(&self, placement: Isometry3) -> Self {
        Self {
            location: placement * self.location,
            ..self.clone()
        }
    }

    pub fn oriented(&self, orientation: Orientation) -> Self {
        Self {
            orientation,
            ..self.clone()
        }
    }

    pub fn reversed(&self) -> Self {
        self.oriented(self.orientation.reversed())
    }

    /// Transform from kernel coordinates to exported model space.
    pub fn model_transform(&self, unit_scale: f64) -> ModelTransform {
        ModelTransform::new(self.location, unit_scale)
    }

    /// Verify the shape is well formed. The null shape always is.
    pub fn check(&self) -> Result<()> {
        match self.root {
            Some(root) => check_shape(&self.store, root),
            None => Ok(()),
        }
    }

    /// Number of unique sub-shapes of the given kind (including the root).
    pub fn count(&self, kind: ShapeKind) -> Result<usize> {
        match self.root {
            Some(root) => Ok(self.store.collect(root, kind)?.len()),
            None => Ok(0),
        }
    }

    // --- Constructors ---

    pub fn vertex(point: Point3) -> Self {
        let mut b = ShapeBuilder::new();
        let v = b.vertex(point);
        b.finish(ShapeRef::Vertex(v))
    }

    /// Straight edge from `a` to `b`.
    pub fn segment(a: Point3, b: Point3) -> Result<Self> {
        let mut builder = ShapeBuilder::new();
        let v0 = builder.vertex(a);
        let v1 = builder.vertex(b);
        let edge = builder.line_edge(v0, v1)?;
        Ok(builder.finish(ShapeRef::Edge(edge)))
    }

    /// Full circle edge.
    pub fn circle(center: Point3, axis: Vector3, radius: f64) -> Result<Self> {
        let mut b = ShapeBuilder::new();
        let edge = b.circle_edge(center, axis, radius)?;
        Ok(b.finish(ShapeRef::Edge(edge)))
    }

    pub fn polyline(points: &[Point3], closed: bool) -> Result<Self> {
        let mut b = ShapeBuilder::new();
        let wire = b.polyline(points, closed)?;
        Ok(b.finish(ShapeRef::Wire(wire)))
    }

    /// Planar face bounded by the polygon through `points`.
    pub fn polygon(points: &[Point3]) -> Result<Self> {
        let mut b = ShapeBuilder::new();
        let face = b.polygon_face(points)?;
        Ok(b.finish(ShapeRef::Face(face)))
    }

    /// Axis-aligned box centered at the origin.
    /// `hx`, `hy`, `hz` are the half-extents along each axis.
    pub fn box3(hx: f64, hy: f64, hz: f64) -> Self {
        let mut b = ShapeBuilder::new();
        let solid = primitive::make_box(&mut b, hx, hy, hz);
        b.finish(ShapeRef::Solid(solid))
    }

    /// Cylinder on the Z axis from z = 0 to z = `height`.
    pub fn cylinder(radius: f64, height: f64) -> Self {
        let mut b = ShapeBuilder::new();
        let solid = primitive::make_cylinder(&mut b, radius, height);
        b.finish(ShapeRef::Solid(solid))
    }

    /// Group shapes into a compound. Null shapes are skipped.
    pub fn compound(shapes: &[Shape]) -> Self {
        let mut b = ShapeBuilder::new();
        let children = shapes.iter().filter_map(|s| b.import(s)).collect();
        let compound = b.compound(children);
        b.finish(ShapeRef::Compound(compound))
    }

    /// Closed shell of a solid as a standalone shape.
    pub fn outer_shell(&self) -> Result<Self> {
        match self.root {
            Some(ShapeRef::Solid(id)) => {
                let shell = self.store.solid(id)?.outer_shell;
                Ok(Self {
                    root: Some(ShapeRef::Shell(shell)),
                    ..self.clone()
                })
            }
            other => Err(KernelError::Construction(format!(
                "outer shell requested from {}",
                other.map_or("null shape", |r| r.kind().name())
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_shape_has_no_kind() {
        let s = Shape::null();
        assert!(s.is_null());
        assert_eq!(s.kind(), None);
        assert_eq!(s.count(ShapeKind::Face).unwrap(), 0);
        s.check().unwrap();
    }

    #[test]
    fn box_topology_counts() {
        let s = Shape::box3(5.0, 3.0, 8.0);
        assert_eq!(s.kind(), Some(ShapeKind::Solid));
        assert_eq!(s.count(ShapeKind::Vertex).unwrap(), 8);
        assert_eq!(s.count(ShapeKind::Edge).unwrap(), 12);
        assert_eq!(s.count(ShapeKind::Face).unwrap(), 6);
        s.check().unwrap();
    }

    #[test]
    fn clones_share_topology() {
        let s = Shape::box3(1.0, 1.0, 1.0);
        let moved = s.located(Isometry3::translation(1.0, 2.0, 3.0)).reversed();
        assert!(std::ptr::eq(s.store(), moved.store()));
        assert_eq!(moved.orientation(), Orientation::Reversed);
        assert!((moved.location().translation.vector.z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn compound_skips_null_children() {
        let c = Shape::compound(&[
            Shape::vertex(Point3::origin()),
            Shape::null(),
            Shape::box3(1.0, 1.0, 1.0),
        ]);
        assert_eq!(c.kind(), Some(ShapeKind::Compound));
        assert_eq!(c.count(ShapeKind::Solid).unwrap(), 1);
        assert_eq!(c.count(ShapeKind::Vertex).unwrap(), 9);
        c.check().unwrap();
    }

    #[test]
    fn outer_shell_of_non_solid_fails() {
        let err = Shape::vertex(Point3::origin()).outer_shell().unwrap_err();
        assert_eq!(err.kind(), "ConstructionError");
        let shell = Shape::box3(1.0, 1.0, 1.0).outer_shell().unwrap();
        assert_eq!(shell.kind(), Some(ShapeKind::Shell));
    }
}
