//! Structural checks run by the exporters before they read a shape.
//!
//! Only well-formedness is checked: every reference resolves, geometry data
//! is finite and non-degenerate, wires are non-empty, and no compound
//! contains itself. Geometric
//! correctness (self-intersection, vertex-on-curve agreement) is not.

use std::collections::{HashMap, HashSet};

use super::store::TopoStore;
use super::types::*;
use crate::error::{KernelError, Result};
use crate::math::is_finite3;

/// Verify that every entity reachable from `root` is well formed.
pub fn check_shape(store: &TopoStore, root: ShapeRef) -> Result<()> {
    if let ShapeRef::Compound(id) = root {
        check_acyclic(store, id, &mut Vec::new(), &mut HashSet::new())?;
    }
    for shape in store.postorder(root)? {
        match shape {
            ShapeRef::Vertex(id) => {
                let vertex = store.vertex(id)?;
                if !is_finite3(&vertex.point.coords) {
                    return Err(KernelError::NonFiniteGeometry(format!(
                        "vertex #{} at {:?}",
                        id.0, vertex.point
                    )));
                }
            }
            ShapeRef::Edge(id) => {
                let edge = store.edge(id)?;
                edge.curve.check()?;
                if !edge.t_start.is_finite() || !edge.t_end.is_finite() {
                    return Err(KernelError::NonFiniteGeometry(format!(
                        "edge #{} parameter range",
                        id.0
                    )));
                }
                if edge.t_end <= edge.t_start {
                    return Err(KernelError::DegenerateGeometry(format!(
                        "edge #{} has empty parameter range [{}, {}]",
                        id.0, edge.t_start, edge.t_end
                    )));
                }
            }
            ShapeRef::Wire(id) => {
                if store.wire(id)?.coedges.is_empty() {
                    return Err(KernelError::DegenerateGeometry(format!(
                        "wire #{} has no edges",
                        id.0
                    )));
                }
            }
            ShapeRef::Face(id) => {
                store.face(id)?.surface.check()?;
            }
            ShapeRef::Shell(id) => {
                if store.shell(id)?.faces.is_empty() {
                    return Err(KernelError::DegenerateGeometry(format!(
                        "shell #{} has no faces",
                        id.0
                    )));
                }
            }
            ShapeRef::Solid(_) | ShapeRef::Compound(_) => {}
        }
    }
    Ok(())
}

fn check_acyclic(
    store: &TopoStore,
    id: CompoundId,
    path: &mut Vec<CompoundId>,
    done: &mut HashSet<CompoundId>,
) -> Result<()> {
    if done.contains(&id) {
        return Ok(());
    }
    if path.contains(&id) {
        return Err(KernelError::Construction(format!(
            "compound #{} contains itself",
            id.0
        )));
    }
    path.push(id);
    for &child in &store.compound(id)?.children {
        if let ShapeRef::Compound(c) = child {
            check_acyclic(store, c, path, done)?;
        }
    }
    path.pop();
    done.insert(id);
    Ok(())
}

/// True if the shell is closed: every edge is used exactly twice with
/// opposite orientations (manifold condition).
pub fn shell_is_closed(store: &TopoStore, shell_id: ShellId) -> Result<bool> {
    let shell = store.shell(shell_id)?;
    let mut edge_uses: HashMap<EdgeId, Vec<bool>> = HashMap::new();

    for &face_id in &shell.faces {
        let face = store.face(face_id)?;
        for wire_id in std::iter::once(face.outer_wire).chain(face.inner_wires.iter().copied()) {
            for coedge in store.wire_coedges(wire_id)? {
                // A reversed face traverses its boundary backwards.
                let forward = coedge.forward == face.outward;
                edge_uses.entry(coedge.edge).or_default().push(forward);
            }
        }
    }

    Ok(!edge_uses.is_empty()
        && edge_uses
            .values()
            .all(|uses| uses.len() == 2 && uses[0] != uses[1]))
}

/// True if the wire's coedges chain end to start and return to the first vertex.
pub fn wire_is_closed(store: &TopoStore, wire_id: WireId) -> Result<bool> {
    let coedges = store.wire_coedges(wire_id)?;
    let Some(first) = coedges.first() else {
        return Ok(false);
    };
    let mut current_end = None;
    for coedge in coedges {
        let edge = store.edge(coedge.edge)?;
        let (start, end) = if coedge.forward {
            (edge.start, edge.end)
        } else {
            (edge.end, edge.start)
        };
        if let Some(prev) = current_end {
            if prev != start {
                return Ok(false);
            }
        }
        current_end = Some(end);
    }
    Ok(current_end == Some(store.coedge_start(first)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ShapeBuilder;
    use crate::curve::Curve3;
    use crate::math::{Point3, Vector3};

    #[test]
    fn box_shell_is_closed() {
        let shape = crate::shape::Shape::box3(1.0, 2.0, 3.0);
        let store = shape.store();
        assert!(shell_is_closed(store, ShellId(0)).unwrap());
        for w in 0..store.wires.len() {
            assert!(wire_is_closed(store, WireId(w)).unwrap());
        }
        check_shape(store, shape.root().unwrap()).unwrap();
    }

    #[test]
    fn single_face_shell_is_open() {
        let mut b = ShapeBuilder::new();
        let face = b
            .polygon_face(&[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ])
            .unwrap();
        let shell = b.shell(vec![face]);
        let shape = b.finish(ShapeRef::Shell(shell));
        assert!(!shell_is_closed(shape.store(), shell).unwrap());
    }

    #[test]
    fn nan_vertex_is_rejected() {
        let mut store = TopoStore::new();
        let v = store.add_vertex(Vertex {
            point: Point3::new(f64::NAN, 0.0, 0.0),
            tolerance: 1e-7,
        });
        let err = check_shape(&store, ShapeRef::Vertex(v)).unwrap_err();
        assert_eq!(err.kind(), "NonFiniteGeometry");
    }

    #[test]
    fn reversed_edge_range_is_rejected() {
        let mut store = TopoStore::new();
        let v = store.add_vertex(Vertex { point: Point3::origin(), tolerance: 1e-7 });
        let e = store.add_edge(Edge {
            curve: Curve3::Line { origin: Point3::origin(), dir: Vector3::x() },
            t_start: 1.0,
            t_end: 0.0,
            start: v,
            end: v,
            tolerance: 1e-7,
        });
        let err = check_shape(&store, ShapeRef::Edge(e)).unwrap_err();
        assert_eq!(err.kind(), "DegenerateGeometry");
    }

    #[test]
    fn cyclic_compound_is_rejected() {
        let mut store = TopoStore::new();
        let inner = store.add_compound(Compound {
            children: vec![ShapeRef::Compound(CompoundId(1))],
        });
        let outer = store.add_compound(Compound {
            children: vec![ShapeRef::Compound(inner)],
        });
        let err = check_shape(&store, ShapeRef::Compound(outer)).unwrap_err();
        assert_eq!(err.kind(), "ConstructionError");
    }

    #[test]
    fn shared_compound_is_not_a_cycle() {
        let mut store = TopoStore::new();
        let shared = store.add_compound(Compound::default());
        let outer = store.add_compound(Compound {
            children: vec![ShapeRef::Compound(shared), ShapeRef::Compound(shared)],
        });
        check_shape(&store, ShapeRef::Compound(outer)).unwrap();
    }

    #[test]
    fn dangling_face_is_rejected() {
        let mut store = TopoStore::new();
        let shell = store.add_shell(Shell { faces: vec![FaceId(9)] });
        let err = check_shape(&store, ShapeRef::Shell(shell)).unwrap_err();
        assert_eq!(err.kind(), "DanglingReference");
    }
}
