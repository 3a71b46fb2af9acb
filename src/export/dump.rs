//! Structural debug dump as JSON.
//!
//! Every object emits its scalar fields. Nested objects (`location`,
//! `tshape`, `geometry`, `children`) are emitted only while the remaining
//! depth is non-zero, and each nesting level consumes one unit. A negative
//! depth never reaches zero, so the whole structure is dumped.

use serde_json::{json, Map, Value};

use super::into_text;
use crate::curve::Curve3;
use crate::error::Result;
use crate::math::{Isometry3, Point3, Vector3};
use crate::shape::Shape;
use crate::surface::Surface;
use crate::topo::validate::{shell_is_closed, wire_is_closed};
use crate::topo::*;

/// Serialize the structure of a shape as pretty-printed JSON.
pub fn export_debug_json(shape: &Shape, depth: i32) -> Result<String> {
    let value = dump_shape(shape, depth)?;
    let mut sink = Vec::new();
    serde_json::to_writer_pretty(&mut sink, &value)?;
    tracing::debug!(depth, bytes = sink.len(), "debug dump written");
    into_text(sink)
}

/// Build the JSON value describing `shape` down to `depth` nesting levels.
pub fn dump_shape(shape: &Shape, depth: i32) -> Result<Value> {
    shape.check()?;
    let Some(root) = shape.root() else {
        return Ok(json!({
            "className": "Shape",
            "kind": Value::Null,
            "orientation": shape.orientation().name(),
            "isNull": true,
        }));
    };
    let dumper = Dumper { store: shape.store() };
    dumper.node(root, shape.orientation(), shape.location(), depth)
}

fn deeper(depth: i32) -> i32 {
    if depth < 0 {
        depth
    } else {
        depth - 1
    }
}

struct Dumper<'a> {
    store: &'a TopoStore,
}

impl Dumper<'_> {
    /// A located, oriented use of an entity.
    fn node(
        &self,
        shape: ShapeRef,
        orientation: Orientation,
        location: &Isometry3,
        depth: i32,
    ) -> Result<Value> {
        let mut obj = Map::new();
        obj.insert("className".into(), json!("Shape"));
        obj.insert("kind".into(), json!(shape.kind().name()));
        obj.insert("orientation".into(), json!(orientation.name()));
        obj.insert("isNull".into(), json!(false));
        if depth != 0 {
            obj.insert("location".into(), location_json(location));
            obj.insert("tshape".into(), self.tshape(shape, deeper(depth))?);
        }
        Ok(Value::Object(obj))
    }

    /// The entity itself, without orientation or placement.
    fn tshape(&self, shape: ShapeRef, depth: i32) -> Result<Value> {
        let children = self.store.children(shape)?;
        let closed = match shape {
            ShapeRef::Vertex(_) => true,
            ShapeRef::Edge(id) => self.store.edge(id)?.is_closed(),
            ShapeRef::Wire(id) => wire_is_closed(self.store, id)?,
            ShapeRef::Shell(id) => shell_is_closed(self.store, id)?,
            _ => false,
        };

        let mut obj = Map::new();
        obj.insert("className".into(), json!(format!("TShape{}", shape.kind().name())));
        obj.insert("index".into(), json!(shape.index()));
        obj.insert("free".into(), json!(false));
        obj.insert("modified".into(), json!(true));
        obj.insert("orientable".into(), json!(true));
        obj.insert("closed".into(), json!(closed));
        obj.insert("infinite".into(), json!(false));
        obj.insert("convex".into(), json!(matches!(shape, ShapeRef::Vertex(_))));
        obj.insert("nbChildren".into(), json!(children.len()));

        if depth != 0 {
            if let Some(geometry) = self.geometry(shape)? {
                obj.insert("geometry".into(), geometry);
            }
            let identity = Isometry3::identity();
            let nested = children
                .into_iter()
                .map(|(child, orientation)| self.node(child, orientation, &identity, deeper(depth)))
                .collect::<Result<Vec<_>>>()?;
            obj.insert("children".into(), Value::Array(nested));
        }
        Ok(Value::Object(obj))
    }

    /// Geometric carrier of vertices, edges and faces. Scalars only.
    fn geometry(&self, shape: ShapeRef) -> Result<Option<Value>> {
        let value = match shape {
            ShapeRef::Vertex(id) => {
                let vertex = self.store.vertex(id)?;
                json!({
                    "className": "Point",
                    "point": point(&vertex.point),
                    "tolerance": vertex.tolerance,
                })
            }
            ShapeRef::Edge(id) => {
                let edge = self.store.edge(id)?;
                let mut obj = curve_json(&edge.curve);
                obj.insert("first".into(), json!(edge.t_start));
                obj.insert("last".into(), json!(edge.t_end));
                obj.insert("tolerance".into(), json!(edge.tolerance));
                Value::Object(obj)
            }
            ShapeRef::Face(id) => {
                let face = self.store.face(id)?;
                let mut obj = surface_json(&face.surface);
                obj.insert("sameSense".into(), json!(face.outward));
                obj.insert("nbInnerWires".into(), json!(face.inner_wires.len()));
                Value::Object(obj)
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

fn point(p: &Point3) -> Value {
    json!([p.x, p.y, p.z])
}

fn vector(v: &Vector3) -> Value {
    json!([v.x, v.y, v.z])
}

fn location_json(location: &Isometry3) -> Value {
    let q = location.rotation.quaternion();
    json!({
        "className": "Location",
        "isIdentity": *location == Isometry3::identity(),
        "translation": vector(&location.translation.vector),
        "rotation": [q.w, q.i, q.j, q.k],
    })
}

fn curve_json(curve: &Curve3) -> Map<String, Value> {
    let mut obj = Map::new();
    match curve {
        Curve3::Line { origin, dir } => {
            obj.insert("className".into(), json!("Line"));
            obj.insert("origin".into(), point(origin));
            obj.insert("direction".into(), vector(dir));
        }
        Curve3::Circle { center, axis, radius } => {
            obj.insert("className".into(), json!("Circle"));
            obj.insert("center".into(), point(center));
            obj.insert("axis".into(), vector(axis));
            obj.insert("radius".into(), json!(radius));
        }
        Curve3::Ellipse { center, major, minor } => {
            obj.insert("className".into(), json!("Ellipse"));
            obj.insert("center".into(), point(center));
            obj.insert("majorAxis".into(), vector(major));
            obj.insert("minorAxis".into(), vector(minor));
        }
    }
    obj
}

fn surface_json(surface: &Surface) -> Map<String, Value> {
    let (location, axis) = surface.position();
    let mut obj = Map::new();
    obj.insert("className".into(), json!(surface.type_name()));
    obj.insert("location".into(), point(&location));
    obj.insert("axis".into(), vector(&axis));
    obj.insert("refDirection".into(), vector(&surface.ref_direction()));
    match surface {
        Surface::Plane { .. } => {}
        Surface::Cylinder { radius, .. } | Surface::Sphere { radius, .. } => {
            obj.insert("radius".into(), json!(radius));
        }
        Surface::Cone { half_angle, .. } => {
            obj.insert("semiAngle".into(), json!(half_angle));
        }
        Surface::Torus { major_r, minor_r, .. } => {
            obj.insert("majorRadius".into(), json!(major_r));
            obj.insert("minorRadius".into(), json!(minor_r));
        }
    }
    obj
}
