//! Topology entity types and typed index handles.

use crate::curve::Curve3;
use crate::math::Point3;
use crate::surface::Surface;

// --- Typed index handles ---
// These are cheap to copy, store, and compare.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShellId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundId(pub usize);

/// Topological entity kind, ordered from the most complex to the simplest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Compound,
    Solid,
    Shell,
    Face,
    Wire,
    Edge,
    Vertex,
}

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Compound => "Compound",
            ShapeKind::Solid => "Solid",
            ShapeKind::Shell => "Shell",
            ShapeKind::Face => "Face",
            ShapeKind::Wire => "Wire",
            ShapeKind::Edge => "Edge",
            ShapeKind::Vertex => "Vertex",
        }
    }
}

/// A handle to any topological entity in a `TopoStore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeRef {
    Compound(CompoundId),
    Solid(SolidId),
    Shell(ShellId),
    Face(FaceId),
    Wire(WireId),
    Edge(EdgeId),
    Vertex(VertexId),
}

impl ShapeRef {
    pub fn kind(self) -> ShapeKind {
        match self {
            ShapeRef::Compound(_) => ShapeKind::Compound,
            ShapeRef::Solid(_) => ShapeKind::Solid,
            ShapeRef::Shell(_) => ShapeKind::Shell,
            ShapeRef::Face(_) => ShapeKind::Face,
            ShapeRef::Wire(_) => ShapeKind::Wire,
            ShapeRef::Edge(_) => ShapeKind::Edge,
            ShapeRef::Vertex(_) => ShapeKind::Vertex,
        }
    }

    /// Arena index of the referenced entity.
    pub fn index(self) -> usize {
        match self {
            ShapeRef::Compound(id) => id.0,
            ShapeRef::Solid(id) => id.0,
            ShapeRef::Shell(id) => id.0,
            ShapeRef::Face(id) => id.0,
            ShapeRef::Wire(id) => id.0,
            ShapeRef::Edge(id) => id.0,
            ShapeRef::Vertex(id) => id.0,
        }
    }
}

/// Orientation of a sub-shape relative to its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
    Internal,
    External,
}

impl Orientation {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Orientation::Forward
        } else {
            Orientation::Reversed
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
            other => other,
        }
    }

    /// Orientation of a sub-shape seen through a parent with orientation `self`.
    pub fn compose(self, child: Orientation) -> Orientation {
        match self {
            Orientation::Forward => child,
            Orientation::Reversed => child.reversed(),
            Orientation::Internal | Orientation::External => self,
        }
    }

    /// Numeric code (0 = Forward, 1 = Reversed, 2 = Internal, 3 = External).
    pub fn code(self) -> u8 {
        match self {
            Orientation::Forward => 0,
            Orientation::Reversed => 1,
            Orientation::Internal => 2,
            Orientation::External => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Forward => "Forward",
            Orientation::Reversed => "Reversed",
            Orientation::Internal => "Internal",
            Orientation::External => "External",
        }
    }
}

// --- Topology entities ---

/// A topological vertex at a specific 3D point.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub point: Point3,
    pub tolerance: f64,
}

/// A topological edge: a bounded curve segment between two vertices.
///
/// The geometric carrier is `curve` parameterized from `t_start` to `t_end`.
/// A closed edge (full circle) has `start == end`.
#[derive(Clone, Debug)]
pub struct Edge {
    pub curve: Curve3,
    pub t_start: f64,
    pub t_end: f64,
    pub start: VertexId,
    pub end: VertexId,
    pub tolerance: f64,
}

impl Edge {
    pub fn is_closed(&self) -> bool {
        self.start == self.end
    }
}

/// An oriented use of an edge inside a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoEdge {
    pub edge: EdgeId,
    /// True if the coedge traverses the edge from start→end; false for end→start.
    pub forward: bool,
}

/// An ordered chain of coedges.
///
/// Face boundaries are closed: the outer wire runs counter-clockwise when
/// viewed against the face normal, inner wires (holes) clockwise.
#[derive(Clone, Debug)]
pub struct Wire {
    pub coedges: Vec<CoEdge>,
}

/// A topological face: a bounded region on a surface.
#[derive(Clone, Debug)]
pub struct Face {
    pub surface: Surface,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes in the face).
    pub inner_wires: Vec<WireId>,
    /// True if the face normal agrees with the surface normal; false if reversed.
    pub outward: bool,
}

/// A connected set of faces forming a closed (or open) surface.
#[derive(Clone, Debug)]
pub struct Shell {
    pub faces: Vec<FaceId>,
}

/// A solid bounded by one outer shell and zero or more inner shells (cavities).
#[derive(Clone, Debug)]
pub struct Solid {
    pub outer_shell: ShellId,
    pub inner_shells: Vec<ShellId>,
}

/// An unstructured group of shapes of any kind.
#[derive(Clone, Debug, Default)]
pub struct Compound {
    pub children: Vec<ShapeRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_compose_flips_under_reversed_parent() {
        assert_eq!(Orientation::Reversed.compose(Orientation::Forward), Orientation::Reversed);
        assert_eq!(Orientation::Reversed.compose(Orientation::Reversed), Orientation::Forward);
        assert_eq!(Orientation::Forward.compose(Orientation::Reversed), Orientation::Reversed);
        assert_eq!(Orientation::Internal.compose(Orientation::Reversed), Orientation::Internal);
    }

    #[test]
    fn shape_ref_reports_kind_and_index() {
        let r = ShapeRef::Face(FaceId(4));
        assert_eq!(r.kind(), ShapeKind::Face);
        assert_eq!(r.index(), 4);
        assert!(ShapeKind::Compound < ShapeKind::Vertex);
    }
}
