//! Arena builder for well-formed shapes.
//!
//! `ShapeBuilder` owns a `TopoStore` while entities are added and hands it
//! over to a `Shape` in `finish`. Entities are created bottom-up, so every
//! reference points at an entity that already exists.
//!
//! # Example
//!
//! ```rust
//! use brepio::builder::ShapeBuilder;
//! use brepio::math::Point3;
//! use brepio::topo::ShapeRef;
//!
//! let mut b = ShapeBuilder::new();
//! let face = b.polygon_face(&[
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(4.0, 0.0, 0.0),
//!     Point3::new(0.0, 3.0, 0.0),
//! ]).unwrap();
//! let triangle = b.finish(ShapeRef::Face(face));
//! assert_eq!(triangle.count(brepio::topo::ShapeKind::Edge).unwrap(), 3);
//! ```

use crate::curve::Curve3;
use crate::error::{KernelError, Result};
use crate::math::{ModelTransform, Point3, Vector3, PARAM_TOL, TOLERANCE};
use crate::shape::Shape;
use crate::surface::Surface;
use crate::topo::*;

use std::f64::consts::TAU;

#[derive(Debug, Default)]
pub struct ShapeBuilder {
    store: TopoStore,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &TopoStore {
        &self.store
    }

    /// Raw arena access for constructors that lay out topology themselves.
    pub fn store_mut(&mut self) -> &mut TopoStore {
        &mut self.store
    }

    // --- Vertices and edges ---

    pub fn vertex(&mut self, point: Point3) -> VertexId {
        self.store.add_vertex(Vertex {
            point,
            tolerance: TOLERANCE,
        })
    }

    /// Straight edge between two existing vertices, parameterized on `[0, 1]`.
    pub fn line_edge(&mut self, start: VertexId, end: VertexId) -> Result<EdgeId> {
        let p0 = self.store.vertex(start)?.point;
        let p1 = self.store.vertex(end)?.point;
        let dir = p1 - p0;
        if dir.norm() < TOLERANCE {
            return Err(KernelError::Construction(format!(
                "line edge between coincident vertices {} and {}",
                start.0, end.0
            )));
        }
        Ok(self.store.add_edge(Edge {
            curve: Curve3::Line { origin: p0, dir },
            t_start: 0.0,
            t_end: 1.0,
            start,
            end,
            tolerance: TOLERANCE,
        }))
    }

    /// Edge on an arbitrary curve; the bounding vertices are created from
    /// the curve end points (a single vertex when the range is a full turn).
    pub fn curve_edge(&mut self, curve: Curve3, t_start: f64, t_end: f64) -> Result<EdgeId> {
        curve.check()?;
        if !(t_end > t_start) {
            return Err(KernelError::Construction(format!(
                "empty parameter range [{t_start}, {t_end}]"
            )));
        }
        let start = self.vertex(curve.evaluate(t_start));
        let closed = curve.is_periodic() && (t_end - t_start - TAU).abs() < PARAM_TOL;
        let end = if closed {
            start
        } else {
            self.vertex(curve.evaluate(t_end))
        };
        Ok(self.store.add_edge(Edge {
            curve,
            t_start,
            t_end,
            start,
            end,
            tolerance: TOLERANCE,
        }))
    }

    /// Closed full-circle edge.
    pub fn circle_edge(&mut self, center: Point3, axis: Vector3, radius: f64) -> Result<EdgeId> {
        self.curve_edge(
            Curve3::Circle {
                center,
                axis,
                radius,
            },
            0.0,
            TAU,
        )
    }

    /// Add an edge whose vertices already exist.
    pub fn edge(&mut self, edge: Edge) -> Result<EdgeId> {
        self.store.vertex(edge.start)?;
        self.store.vertex(edge.end)?;
        edge.curve.check()?;
        Ok(self.store.add_edge(edge))
    }

    // --- Wires and faces ---

    pub fn wire(&mut self, coedges: Vec<CoEdge>) -> WireId {
        self.store.add_wire(Wire { coedges })
    }

    /// Chain of line edges through `points`; `closed` joins the last point back to the first.
    pub fn polyline(&mut self, points: &[Point3], closed: bool) -> Result<WireId> {
        let min = if closed { 3 } else { 2 };
        if points.len() < min {
            return Err(KernelError::Construction(format!(
                "polyline needs at least {min} points, got {}",
                points.len()
            )));
        }
        let verts: Vec<VertexId> = points.iter().map(|&p| self.vertex(p)).collect();
        let n_edges = if closed { verts.len() } else { verts.len() - 1 };
        let mut coedges = Vec::with_capacity(n_edges);
        for i in 0..n_edges {
            let edge = self.line_edge(verts[i], verts[(i + 1) % verts.len()])?;
            coedges.push(CoEdge {
                edge,
                forward: true,
            });
        }
        Ok(self.wire(coedges))
    }

    /// Planar face bounded by the closed polygon through `points`.
    ///
    /// The face normal follows the right-hand rule over the point order.
    pub fn polygon_face(&mut self, points: &[Point3]) -> Result<FaceId> {
        let normal = newell_normal(points).ok_or_else(|| {
            KernelError::Construction("polygon points are collinear or too few".into())
        })?;
        let centroid = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;
        let wire = self.polyline(points, true)?;
        Ok(self.face(
            Surface::Plane {
                origin: Point3::from(centroid),
                normal,
            },
            wire,
            vec![],
            true,
        ))
    }

    pub fn face(
        &mut self,
        surface: Surface,
        outer_wire: WireId,
        inner_wires: Vec<WireId>,
        outward: bool,
    ) -> FaceId {
        self.store.add_face(Face {
            surface,
            outer_wire,
            inner_wires,
            outward,
        })
    }

    /// Face bounded by a single loop of `(edge, forward)` pairs.
    pub fn face_from_edges(
        &mut self,
        surface: Surface,
        edge_dirs: &[(EdgeId, bool)],
        outward: bool,
    ) -> FaceId {
        let coedges = edge_dirs
            .iter()
            .map(|&(edge, forward)| CoEdge { edge, forward })
            .collect();
        let wire = self.wire(coedges);
        self.face(surface, wire, vec![], outward)
    }

    // --- Shells, solids, compounds ---

    pub fn shell(&mut self, faces: Vec<FaceId>) -> ShellId {
        self.store.add_shell(Shell { faces })
    }

    pub fn solid(&mut self, outer_shell: ShellId, inner_shells: Vec<ShellId>) -> SolidId {
        self.store.add_solid(Solid {
            outer_shell,
            inner_shells,
        })
    }

    pub fn compound(&mut self, children: Vec<ShapeRef>) -> CompoundId {
        self.store.add_compound(Compound { children })
    }

    /// Copy every entity of `shape` into this builder and return its root.
    ///
    /// The shape's location is applied to the copied geometry; its root
    /// orientation is kept only for faces. Returns `None` for a null shape.
    pub fn import(&mut self, shape: &Shape) -> Option<ShapeRef> {
        let root = shape.root()?;
        let src = shape.store();
        let t = ModelTransform::new(*shape.location(), 1.0);
        let off = Offsets::of(&self.store);

        self.store.vertices.extend(src.vertices.iter().map(|v| Vertex {
            point: t.point(&v.point),
            tolerance: v.tolerance,
        }));
        self.store.edges.extend(src.edges.iter().map(|e| Edge {
            curve: e.curve.transformed(&t),
            start: off.vertex(e.start),
            end: off.vertex(e.end),
            ..e.clone()
        }));
        self.store.wires.extend(src.wires.iter().map(|w| Wire {
            coedges: w
                .coedges
                .iter()
                .map(|ce| CoEdge {
                    edge: off.edge(ce.edge),
                    forward: ce.forward,
                })
                .collect(),
        }));
        let reversed_face = match (root, shape.orientation()) {
            (ShapeRef::Face(id), Orientation::Reversed) => Some(id.0),
            _ => None,
        };
        self.store.faces.extend(src.faces.iter().enumerate().map(|(i, f)| Face {
            surface: f.surface.transformed(&t),
            outer_wire: off.wire(f.outer_wire),
            inner_wires: f.inner_wires.iter().map(|&w| off.wire(w)).collect(),
            outward: if reversed_face == Some(i) { !f.outward } else { f.outward },
        }));
        self.store.shells.extend(src.shells.iter().map(|s| Shell {
            faces: s.faces.iter().map(|&f| FaceId(f.0 + off.faces)).collect(),
        }));
        self.store.solids.extend(src.solids.iter().map(|s| Solid {
            outer_shell: ShellId(s.outer_shell.0 + off.shells),
            inner_shells: s.inner_shells.iter().map(|&c| ShellId(c.0 + off.shells)).collect(),
        }));
        self.store.compounds.extend(src.compounds.iter().map(|c| Compound {
            children: c.children.iter().map(|&r| off.shape(r)).collect(),
        }));

        Some(off.shape(root))
    }

    /// Hand the store over to a shape rooted at `root`.
    pub fn finish(self, root: ShapeRef) -> Shape {
        Shape::from_parts(self.store, Some(root))
    }
}

/// Arena lengths at the moment another store is appended.
#[derive(Clone, Copy)]
struct Offsets {
    vertices: usize,
    edges: usize,
    wires: usize,
    faces: usize,
    shells: usize,
    solids: usize,
    compounds: usize,
}

impl Offsets {
    fn of(store: &TopoStore) -> Self {
        Self {
            vertices: store.vertices.len(),
            edges: store.edges.len(),
            wires: store.wires.len(),
            faces: store.faces.len(),
            shells: store.shells.len(),
            solids: store.solids.len(),
            compounds: store.compounds.len(),
        }
    }

    fn vertex(&self, id: VertexId) -> VertexId {
        VertexId(id.0 + self.vertices)
    }

    fn edge(&self, id: EdgeId) -> EdgeId {
        EdgeId(id.0 + self.edges)
    }

    fn wire(&self, id: WireId) -> WireId {
        WireId(id.0 + self.wires)
    }

    fn shape(&self, r: ShapeRef) -> ShapeRef {
        match r {
            ShapeRef::Vertex(id) => ShapeRef::Vertex(self.vertex(id)),
            ShapeRef::Edge(id) => ShapeRef::Edge(self.edge(id)),
            ShapeRef::Wire(id) => ShapeRef::Wire(self.wire(id)),
            ShapeRef::Face(id) => ShapeRef::Face(FaceId(id.0 + self.faces)),
            ShapeRef::Shell(id) => ShapeRef::Shell(ShellId(id.0 + self.shells)),
            ShapeRef::Solid(id) => ShapeRef::Solid(SolidId(id.0 + self.solids)),
            ShapeRef::Compound(id) => ShapeRef::Compound(CompoundId(id.0 + self.compounds)),
        }
    }
}

/// Polygon normal by Newell's method; `None` when the points span no area.
fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    if points.len() < 3 {
        return None;
    }
    let mut n = Vector3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    let len = n.norm();
    (len > PARAM_TOL).then(|| n / len)
}
