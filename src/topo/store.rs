//! Arena-based topology store.
//!
//! All topology entities live in the `TopoStore`. Entities reference each other
//! via typed indices (e.g., `VertexId`, `EdgeId`). This avoids Rc/Arc reference
//! cycles in the inherently cyclic topology graph.
//!
//! Lookups return `Result`: a shape handed to an exporter may carry
//! references that do not resolve, and that must surface as a kernel error.

use std::collections::HashSet;

use super::types::*;
use crate::error::{KernelError, Result};

/// Arena-based storage for all topology entities.
#[derive(Clone, Debug, Default)]
pub struct TopoStore {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub wires: Vec<Wire>,
    pub faces: Vec<Face>,
    pub shells: Vec<Shell>,
    pub solids: Vec<Solid>,
    pub compounds: Vec<Compound>,
}

fn lookup<'a, T>(items: &'a [T], index: usize, entity: &'static str) -> Result<&'a T> {
    items
        .get(index)
        .ok_or(KernelError::DanglingReference { entity, index })
}

impl TopoStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Add entities ---

    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(vertex);
        id
    }

    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(edge);
        id
    }

    pub fn add_wire(&mut self, wire: Wire) -> WireId {
        let id = WireId(self.wires.len());
        self.wires.push(wire);
        id
    }

    pub fn add_face(&mut self, face: Face) -> FaceId {
        let id = FaceId(self.faces.len());
        self.faces.push(face);
        id
    }

    pub fn add_shell(&mut self, shell: Shell) -> ShellId {
        let id = ShellId(self.shells.len());
        self.shells.push(shell);
        id
    }

    pub fn add_solid(&mut self, solid: Solid) -> SolidId {
        let id = SolidId(self.solids.len());
        self.solids.push(solid);
        id
    }

    pub fn add_compound(&mut self, compound: Compound) -> CompoundId {
        let id = CompoundId(self.compounds.len());
        self.compounds.push(compound);
        id
    }

    // --- Get entities ---

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        lookup(&self.vertices, id.0, "Vertex")
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        lookup(&self.edges, id.0, "Edge")
    }

    pub fn wire(&self, id: WireId) -> Result<&Wire> {
        lookup(&self.wires, id.0, "Wire")
    }

    pub fn face(&self, id: FaceId) -> Result<&Face> {
        lookup(&self.faces, id.0, "Face")
    }

    pub fn shell(&self, id: ShellId) -> Result<&Shell> {
        lookup(&self.shells, id.0, "Shell")
    }

    pub fn solid(&self, id: SolidId) -> Result<&Solid> {
        lookup(&self.solids, id.0, "Solid")
    }

    pub fn compound(&self, id: CompoundId) -> Result<&Compound> {
        lookup(&self.compounds, id.0, "Compound")
    }

    // --- Traversal helpers ---

    /// Direct sub-shapes of `shape` with their orientation relative to it.
    ///
    /// Edges list their first vertex Forward and their last vertex Reversed.
    /// Solid cavities are Reversed shells.
    pub fn children(&self, shape: ShapeRef) -> Result<Vec<(ShapeRef, Orientation)>> {
        let children = match shape {
            ShapeRef::Vertex(_) => Vec::new(),
            ShapeRef::Edge(id) => {
                let edge = self.edge(id)?;
                vec![
                    (ShapeRef::Vertex(edge.start), Orientation::Forward),
                    (ShapeRef::Vertex(edge.end), Orientation::Reversed),
                ]
            }
            ShapeRef::Wire(id) => self
                .wire(id)?
                .coedges
                .iter()
                .map(|ce| (ShapeRef::Edge(ce.edge), Orientation::from_forward(ce.forward)))
                .collect(),
            ShapeRef::Face(id) => {
                let face = self.face(id)?;
                std::iter::once(face.outer_wire)
                    .chain(face.inner_wires.iter().copied())
                    .map(|w| (ShapeRef::Wire(w), Orientation::Forward))
                    .collect()
            }
            ShapeRef::Shell(id) => {
                let mut out = Vec::new();
                for &face_id in &self.shell(id)?.faces {
                    let face = self.face(face_id)?;
                    out.push((ShapeRef::Face(face_id), Orientation::from_forward(face.outward)));
                }
                out
            }
            ShapeRef::Solid(id) => {
                let solid = self.solid(id)?;
                std::iter::once((ShapeRef::Shell(solid.outer_shell), Orientation::Forward))
                    .chain(
                        solid
                            .inner_shells
                            .iter()
                            .map(|&s| (ShapeRef::Shell(s), Orientation::Reversed)),
                    )
                    .collect()
            }
            ShapeRef::Compound(id) => self
                .compound(id)?
                .children
                .iter()
                .map(|&c| (c, Orientation::Forward))
                .collect(),
        };
        Ok(children)
    }

    /// All unique sub-shapes of `root` (including `root`), children before parents.
    ///
    /// Each entity appears once even when shared; reference cycles between
    /// compounds are cut at the first revisit.
    pub fn postorder(&self, root: ShapeRef) -> Result<Vec<ShapeRef>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        self.visit(root, &mut seen, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        shape: ShapeRef,
        seen: &mut HashSet<ShapeRef>,
        order: &mut Vec<ShapeRef>,
    ) -> Result<()> {
        if !seen.insert(shape) {
            return Ok(());
        }
        for (child, _) in self.children(shape)? {
            self.visit(child, seen, order)?;
        }
        order.push(shape);
        Ok(())
    }

    /// Unique sub-shapes of `root` of the given kind, in traversal order.
    pub fn collect(&self, root: ShapeRef, kind: ShapeKind) -> Result<Vec<ShapeRef>> {
        Ok(self
            .postorder(root)?
            .into_iter()
            .filter(|s| s.kind() == kind)
            .collect())
    }

    /// Non-compound sub-shapes reached from `root` through compounds, each once.
    /// A non-compound root is its own single leaf.
    pub fn leaves(&self, root: ShapeRef) -> Result<Vec<ShapeRef>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_leaves(root, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect_leaves(
        &self,
        shape: ShapeRef,
        seen: &mut HashSet<ShapeRef>,
        out: &mut Vec<ShapeRef>,
    ) -> Result<()> {
        if !seen.insert(shape) {
            return Ok(());
        }
        match shape {
            ShapeRef::Compound(id) => {
                for &child in &self.compound(id)?.children {
                    self.collect_leaves(child, seen, out)?;
                }
            }
            other => out.push(other),
        }
        Ok(())
    }

    /// Edges of a wire in traversal order with their use direction.
    pub fn wire_coedges(&self, wire_id: WireId) -> Result<&[CoEdge]> {
        Ok(&self.wire(wire_id)?.coedges)
    }

    /// Start vertex of a coedge, honoring its direction.
    pub fn coedge_start(&self, coedge: &CoEdge) -> Result<VertexId> {
        let edge = self.edge(coedge.edge)?;
        Ok(if coedge.forward { edge.start } else { edge.end })
    }
}
