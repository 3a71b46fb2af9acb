//! STEP (ISO 10303-21) export.
//!
//! Maps B-Rep topology and geometry directly to STEP entities without tessellation.
//!
//! Export runs in two stages, each reporting a [`ReturnStatus`]:
//! 1. `transfer` maps the shape into an entity model under a [`StepModelType`].
//!    A mode that does not apply to the shape yields `Fail`; a null shape or
//!    an empty compound yields `Void`.
//! 2. `write_stream` writes the header, the DATA section and the trailer.
//!
//! A status other than `Done` is not an error: [`export_step`] reports it by
//! returning an empty string. Malformed shapes are `Err(KernelError)`.
//!
//! Entity mapping:
//! - `Vertex` → `VERTEX_POINT` + `CARTESIAN_POINT`
//! - `Edge` → `EDGE_CURVE` + curve entity
//! - `Face` → `ADVANCED_FACE` + `FACE_OUTER_BOUND` + surface entity
//! - `Solid` → `MANIFOLD_SOLID_BREP` + `CLOSED_SHELL`
//!
//! Surface mapping:
//! - `Plane` → `PLANE` + `AXIS2_PLACEMENT_3D`
//! - `Cylinder` → `CYLINDRICAL_SURFACE`
//! - `Cone` → `CONICAL_SURFACE`
//! - `Sphere` → `SPHERICAL_SURFACE`
//! - `Torus` → `TOROIDAL_SURFACE`

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::io::Write;

use serde::{Deserialize, Serialize};

use super::{fmt_real, into_text};
use crate::curve::Curve3;
use crate::error::Result;
use crate::math::{plane_frame, ModelTransform, Point3, Vector3, PARAM_TOL};
use crate::settings::{interchange_settings, InterchangeSettings, LengthUnit};
use crate::shape::Shape;
use crate::surface::Surface;
use crate::topo::validate::shell_is_closed;
use crate::topo::*;

/// How a shape is represented in the STEP model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepModelType {
    /// Pick the representation from the shape's own kind.
    #[default]
    AsIs,
    ManifoldSolidBrep,
    FacetedBrep,
    ShellBasedSurfaceModel,
    GeometricCurveSet,
}

impl StepModelType {
    pub fn code(self) -> u8 {
        match self {
            StepModelType::AsIs => 0,
            StepModelType::ManifoldSolidBrep => 1,
            StepModelType::FacetedBrep => 2,
            StepModelType::ShellBasedSurfaceModel => 3,
            StepModelType::GeometricCurveSet => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => StepModelType::AsIs,
            1 => StepModelType::ManifoldSolidBrep,
            2 => StepModelType::FacetedBrep,
            3 => StepModelType::ShellBasedSurfaceModel,
            4 => StepModelType::GeometricCurveSet,
            _ => return None,
        })
    }
}

/// Outcome of a writer stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Nothing to do.
    Void,
    Done,
    Error,
    Fail,
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriterState {
    Idle,
    Transferred,
    Written,
    Failed,
}

/// Serialize a shape to STEP text.
///
/// Returns an empty string when transfer or writing does not complete.
pub fn export_step(shape: &Shape, mode: StepModelType) -> Result<String> {
    let mut writer = StepWriter::new();
    if writer.transfer(shape, mode)? != ReturnStatus::Done {
        return Ok(String::new());
    }
    let mut sink = Vec::new();
    if writer.write_stream(&mut sink)? != ReturnStatus::Done {
        return Ok(String::new());
    }
    into_text(sink)
}

/// Two-stage STEP writer. `Failed` is absorbing.
pub struct StepWriter {
    settings: InterchangeSettings,
    state: WriterState,
    entities: Vec<String>,
}

impl Default for StepWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepWriter {
    /// Writer configured from a snapshot of the global interchange settings.
    pub fn new() -> Self {
        Self::with_settings(interchange_settings())
    }

    pub fn with_settings(settings: InterchangeSettings) -> Self {
        Self {
            settings,
            state: WriterState::Idle,
            entities: Vec::new(),
        }
    }

    /// Number of entities in the transferred model.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn fail(&mut self, status: ReturnStatus, reason: &str) -> ReturnStatus {
        tracing::warn!(?status, reason, "STEP export did not complete");
        self.state = WriterState::Failed;
        self.entities.clear();
        status
    }

    /// Map `shape` into the entity model.
    pub fn transfer(&mut self, shape: &Shape, mode: StepModelType) -> Result<ReturnStatus> {
        if self.state != WriterState::Idle {
            return Ok(self.fail(ReturnStatus::Fail, "writer already holds a model"));
        }
        self.settings.validate()?;
        let Some(root) = shape.root() else {
            return Ok(self.fail(ReturnStatus::Void, "null shape"));
        };
        shape.check()?;
        let store = shape.store();

        let leaves = store.leaves(root)?;
        if leaves.is_empty() {
            return Ok(self.fail(ReturnStatus::Void, "empty compound"));
        }

        let transform = shape.model_transform(self.settings.length_unit.scale_from_kernel());
        let flip = shape.orientation() == Orientation::Reversed;
        let mut tr = Translator::new(store, transform, flip);

        let mut solids = Vec::new();
        let mut shells = Vec::new();
        let mut curve_set = Vec::new();
        let mut curve_edges = HashSet::new();

        for leaf in leaves {
            match (mode, leaf) {
                (StepModelType::AsIs | StepModelType::ManifoldSolidBrep, ShapeRef::Solid(id)) => {
                    solids.push(tr.manifold_solid(id)?);
                }
                (StepModelType::ManifoldSolidBrep, ShapeRef::Shell(id)) => {
                    if shell_is_closed(store, id)? {
                        let shell = tr.shell(id, true)?;
                        solids.push(tr.add(format!("MANIFOLD_SOLID_BREP('',#{shell})")));
                    }
                }
                (StepModelType::FacetedBrep, ShapeRef::Solid(id)) => {
                    let solid = store.solid(id)?;
                    let mut faceted = true;
                    for shell in std::iter::once(solid.outer_shell).chain(solid.inner_shells.iter().copied()) {
                        faceted &= is_faceted(store, shell)?;
                    }
                    if faceted {
                        solids.push(tr.faceted_brep(solid.outer_shell, &solid.inner_shells)?);
                    }
                }
                (StepModelType::FacetedBrep, ShapeRef::Shell(id)) => {
                    if shell_is_closed(store, id)? && is_faceted(store, id)? {
                        solids.push(tr.faceted_brep(id, &[])?);
                    }
                }
                (StepModelType::AsIs | StepModelType::ShellBasedSurfaceModel, ShapeRef::Shell(id)) => {
                    let closed = shell_is_closed(store, id)?;
                    shells.push(tr.shell(id, closed)?);
                }
                (StepModelType::AsIs | StepModelType::ShellBasedSurfaceModel, ShapeRef::Face(id)) => {
                    let face = tr.advanced_face(id)?;
                    shells.push(tr.add(format!("OPEN_SHELL('',(#{face}))")));
                }
                (StepModelType::ShellBasedSurfaceModel, ShapeRef::Solid(id)) => {
                    let solid = store.solid(id)?;
                    for shell in std::iter::once(solid.outer_shell).chain(solid.inner_shells.iter().copied()) {
                        shells.push(tr.shell(shell, true)?);
                    }
                }
                (StepModelType::AsIs, ShapeRef::Wire(_) | ShapeRef::Edge(_))
                | (StepModelType::GeometricCurveSet, _) => {
                    if let ShapeRef::Vertex(id) = leaf {
                        curve_set.push(tr.point(id)?);
                    }
                    for edge in store.collect(leaf, ShapeKind::Edge)? {
                        if let ShapeRef::Edge(id) = edge {
                            if curve_edges.insert(id) {
                                curve_set.push(tr.trimmed_curve(id)?);
                            }
                        }
                    }
                }
                (StepModelType::AsIs, ShapeRef::Vertex(id)) => {
                    curve_set.push(tr.point(id)?);
                }
                (mode, leaf) => {
                    tracing::debug!(?mode, kind = leaf.kind().name(), "sub-shape not representable in mode");
                }
            }
        }

        let mut groups = Vec::new();
        if !solids.is_empty() {
            let rep = if mode == StepModelType::FacetedBrep {
                "FACETED_BREP_SHAPE_REPRESENTATION"
            } else {
                "ADVANCED_BREP_SHAPE_REPRESENTATION"
            };
            groups.push((rep, solids));
        }
        if !shells.is_empty() {
            let model = tr.add(format!("SHELL_BASED_SURFACE_MODEL('',({}))", refs(&shells)));
            groups.push(("MANIFOLD_SURFACE_SHAPE_REPRESENTATION", vec![model]));
        }
        if !curve_set.is_empty() {
            let set = tr.add(format!("GEOMETRIC_CURVE_SET('',({}))", refs(&curve_set)));
            groups.push(("GEOMETRICALLY_BOUNDED_WIREFRAME_SHAPE_REPRESENTATION", vec![set]));
        }

        let (rep_type, items) = match groups.len() {
            0 => return Ok(self.fail(ReturnStatus::Fail, "shape has no content representable in this mode")),
            1 => groups.remove(0),
            _ => (
                "SHAPE_REPRESENTATION",
                groups.into_iter().flat_map(|(_, items)| items).collect(),
            ),
        };

        let context = tr.representation_context(&self.settings);
        let name = step_string(&self.settings.product_name);
        let rep = tr.add(format!("{rep_type}('{name}',({}),#{context})", refs(&items)));
        tr.product_chain(&self.settings, rep);

        self.entities = tr.entities;
        self.state = WriterState::Transferred;
        tracing::debug!(?mode, entities = self.entities.len(), "STEP transfer done");
        Ok(ReturnStatus::Done)
    }

    /// Write the transferred model as an exchange structure.
    ///
    /// Sink I/O failures are reported as `Fail`.
    pub fn write_stream<W: Write>(&mut self, sink: &mut W) -> Result<ReturnStatus> {
        match self.state {
            WriterState::Idle => return Ok(self.fail(ReturnStatus::Void, "nothing transferred")),
            WriterState::Failed => return Ok(ReturnStatus::Fail),
            WriterState::Transferred | WriterState::Written => {}
        }
        self.settings.validate()?;
        if let Err(err) = self.write_model(sink) {
            tracing::debug!(%err, "STEP sink rejected output");
            return Ok(self.fail(ReturnStatus::Fail, "sink write failed"));
        }
        self.state = WriterState::Written;
        tracing::debug!(entities = self.entities.len(), "STEP stream written");
        Ok(ReturnStatus::Done)
    }

    fn write_model<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let s = &self.settings;
        writeln!(writer, "ISO-10303-21;")?;
        writeln!(writer, "HEADER;")?;
        writeln!(writer, "FILE_DESCRIPTION(('brepio B-Rep export'),'2;1');")?;
        writeln!(
            writer,
            "FILE_NAME('{}','{}',('{}'),('{}'),",
            step_string(&s.product_name),
            s.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            step_string(&s.author),
            step_string(&s.organization)
        )?;
        writeln!(writer, "  'brepio {}','brepio','');", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer, "FILE_SCHEMA(('{}'));", s.step_schema.file_schema())?;
        writeln!(writer, "ENDSEC;")?;
        writeln!(writer, "DATA;")?;
        for (i, entity) in self.entities.iter().enumerate() {
            writeln!(writer, "#{}={};", i + 1, entity)?;
        }
        writeln!(writer, "ENDSEC;")?;
        writeln!(writer, "END-ISO-10303-21;")?;
        writer.flush()
    }
}

/// True if every face of the shell is planar and bounded by straight edges.
fn is_faceted(store: &TopoStore, shell: ShellId) -> Result<bool> {
    for &face_id in &store.shell(shell)?.faces {
        let face = store.face(face_id)?;
        if !face.surface.is_plane() {
            return Ok(false);
        }
        for wire in std::iter::once(face.outer_wire).chain(face.inner_wires.iter().copied()) {
            for coedge in store.wire_coedges(wire)? {
                if !matches!(store.edge(coedge.edge)?.curve, Curve3::Line { .. }) {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn refs(ids: &[usize]) -> String {
    ids.iter().map(|id| format!("#{id}")).collect::<Vec<_>>().join(",")
}

fn logical(value: bool) -> &'static str {
    if value {
        ".T."
    } else {
        ".F."
    }
}

/// Encode a STEP string literal body: quotes and backslashes are doubled,
/// characters outside printable ASCII become `\X2\` or `\X4\` hex runs.
fn step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            ' '..='~' => out.push(c),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\X2\\{:04X}\\X0\\", c as u32)),
            c => out.push_str(&format!("\\X4\\{:08X}\\X0\\", c as u32)),
        }
    }
    out
}

fn triple(x: f64, y: f64, z: f64) -> String {
    format!("({},{},{})", fmt_real(x), fmt_real(y), fmt_real(z))
}

/// Builds entities for one shape. Vertices, edges and geometry points are
/// shared between every face that uses them.
struct Translator<'a> {
    store: &'a TopoStore,
    transform: ModelTransform,
    flip: bool,
    entities: Vec<String>,
    points: HashMap<VertexId, usize>,
    vertices: HashMap<VertexId, usize>,
    edges: HashMap<EdgeId, usize>,
}

impl<'a> Translator<'a> {
    fn new(store: &'a TopoStore, transform: ModelTransform, flip: bool) -> Self {
        Self {
            store,
            transform,
            flip,
            entities: Vec::new(),
            points: HashMap::new(),
            vertices: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    fn add(&mut self, entity: String) -> usize {
        self.entities.push(entity);
        self.entities.len()
    }

    // --- Geometry ---

    fn cartesian_point(&mut self, p: &Point3) -> usize {
        self.add(format!("CARTESIAN_POINT('',{})", triple(p.x, p.y, p.z)))
    }

    fn direction(&mut self, d: &Vector3) -> usize {
        let d = d.normalize();
        self.add(format!("DIRECTION('',{})", triple(d.x, d.y, d.z)))
    }

    fn axis2_placement(&mut self, origin: &Point3, axis: &Vector3, ref_dir: &Vector3) -> usize {
        let p = self.cartesian_point(origin);
        let a = self.direction(axis);
        let r = self.direction(ref_dir);
        self.add(format!("AXIS2_PLACEMENT_3D('',#{p},#{a},#{r})"))
    }

    /// Curve entity for a curve already in model space.
    fn curve(&mut self, curve: &Curve3) -> usize {
        match curve {
            Curve3::Line { origin, dir } => {
                let p = self.cartesian_point(origin);
                let d = self.direction(dir);
                let v = self.add(format!("VECTOR('',#{d},{})", fmt_real(dir.norm())));
                self.add(format!("LINE('',#{p},#{v})"))
            }
            Curve3::Circle { center, axis, radius } => {
                let (u, _) = plane_frame(axis);
                let placement = self.axis2_placement(center, axis, &u);
                self.add(format!("CIRCLE('',#{placement},{})", fmt_real(*radius)))
            }
            Curve3::Ellipse { center, major, minor } => {
                let axis = major.cross(minor);
                let placement = self.axis2_placement(center, &axis, major);
                self.add(format!(
                    "ELLIPSE('',#{placement},{},{})",
                    fmt_real(major.norm()),
                    fmt_real(minor.norm())
                ))
            }
        }
    }

    /// Surface entity for a surface already in model space.
    fn surface(&mut self, surface: &Surface) -> usize {
        let (origin, axis) = surface.position();
        let placement = self.axis2_placement(&origin, &axis, &surface.ref_direction());
        match surface {
            Surface::Plane { .. } => self.add(format!("PLANE('',#{placement})")),
            Surface::Cylinder { radius, .. } => self.add(format!(
                "CYLINDRICAL_SURFACE('',#{placement},{})",
                fmt_real(*radius)
            )),
            Surface::Cone { half_angle, .. } => self.add(format!(
                "CONICAL_SURFACE('',#{placement},0.,{})",
                fmt_real(*half_angle)
            )),
            Surface::Sphere { radius, .. } => self.add(format!(
                "SPHERICAL_SURFACE('',#{placement},{})",
                fmt_real(*radius)
            )),
            Surface::Torus { major_r, minor_r, .. } => self.add(format!(
                "TOROIDAL_SURFACE('',#{placement},{},{})",
                fmt_real(*major_r),
                fmt_real(*minor_r)
            )),
        }
    }

    fn model_point(&self, id: VertexId) -> Result<Point3> {
        Ok(self.transform.point(&self.store.vertex(id)?.point))
    }

    /// Shared `CARTESIAN_POINT` of a vertex.
    fn point(&mut self, id: VertexId) -> Result<usize> {
        if let Some(&e) = self.points.get(&id) {
            return Ok(e);
        }
        let p = self.model_point(id)?;
        let e = self.cartesian_point(&p);
        self.points.insert(id, e);
        Ok(e)
    }

    /// Edge curve trimmed at its vertices, for curve sets.
    fn trimmed_curve(&mut self, id: EdgeId) -> Result<usize> {
        let edge = self.store.edge(id)?;
        let curve = edge.curve.transformed(&self.transform);
        let (start, end) = (edge.start, edge.end);
        let p0 = self.model_point(start)?;
        let p1 = self.model_point(end)?;
        let t0 = curve.closest_parameter(&p0);
        let mut t1 = curve.closest_parameter(&p1);
        if curve.is_periodic() && t1 <= t0 + PARAM_TOL {
            t1 += TAU;
        }
        let c = self.curve(&curve);
        let cp0 = self.point(start)?;
        let cp1 = self.point(end)?;
        Ok(self.add(format!(
            "TRIMMED_CURVE('',#{c},(#{cp0},PARAMETER_VALUE({})),(#{cp1},PARAMETER_VALUE({})),.T.,.PARAMETER.)",
            fmt_real(t0),
            fmt_real(t1)
        )))
    }

    // --- Topology ---

    fn vertex_point(&mut self, id: VertexId) -> Result<usize> {
        if let Some(&e) = self.vertices.get(&id) {
            return Ok(e);
        }
        let p = self.point(id)?;
        let e = self.add(format!("VERTEX_POINT('',#{p})"));
        self.vertices.insert(id, e);
        Ok(e)
    }

    fn edge_curve(&mut self, id: EdgeId) -> Result<usize> {
        if let Some(&e) = self.edges.get(&id) {
            return Ok(e);
        }
        let edge = self.store.edge(id)?;
        let curve = edge.curve.transformed(&self.transform);
        let (start, end) = (edge.start, edge.end);
        let v0 = self.vertex_point(start)?;
        let v1 = self.vertex_point(end)?;
        let c = self.curve(&curve);
        let e = self.add(format!("EDGE_CURVE('',#{v0},#{v1},#{c},.T.)"));
        self.edges.insert(id, e);
        Ok(e)
    }

    fn edge_loop(&mut self, wire: WireId) -> Result<usize> {
        let store = self.store;
        let mut oriented = Vec::new();
        for coedge in store.wire_coedges(wire)? {
            let ec = self.edge_curve(coedge.edge)?;
            oriented.push(self.add(format!("ORIENTED_EDGE('',*,*,#{ec},{})", logical(coedge.forward))));
        }
        Ok(self.add(format!("EDGE_LOOP('',({}))", refs(&oriented))))
    }

    fn advanced_face(&mut self, id: FaceId) -> Result<usize> {
        let store = self.store;
        let face = store.face(id)?;
        let mut bounds = Vec::new();
        let outer = self.edge_loop(face.outer_wire)?;
        bounds.push(self.add(format!("FACE_OUTER_BOUND('',#{outer},.T.)")));
        for &wire in &face.inner_wires {
            let inner = self.edge_loop(wire)?;
            bounds.push(self.add(format!("FACE_BOUND('',#{inner},.T.)")));
        }
        let surface = self.surface(&face.surface.transformed(&self.transform));
        let same_sense = face.outward != self.flip;
        Ok(self.add(format!(
            "ADVANCED_FACE('',({}),#{surface},{})",
            refs(&bounds),
            logical(same_sense)
        )))
    }

    fn shell(&mut self, id: ShellId, closed: bool) -> Result<usize> {
        let store = self.store;
        let mut faces = Vec::new();
        for &face in &store.shell(id)?.faces {
            faces.push(self.advanced_face(face)?);
        }
        let kind = if closed { "CLOSED_SHELL" } else { "OPEN_SHELL" };
        Ok(self.add(format!("{kind}('',({}))", refs(&faces))))
    }

    fn manifold_solid(&mut self, id: SolidId) -> Result<usize> {
        let store = self.store;
        let solid = store.solid(id)?;
        let outer = self.shell(solid.outer_shell, true)?;
        if solid.inner_shells.is_empty() {
            return Ok(self.add(format!("MANIFOLD_SOLID_BREP('',#{outer})")));
        }
        let mut voids = Vec::new();
        for &cavity in &solid.inner_shells {
            let shell = self.shell(cavity, true)?;
            voids.push(self.add(format!("ORIENTED_CLOSED_SHELL('',*,#{shell},.F.)")));
        }
        Ok(self.add(format!("BREP_WITH_VOIDS('',#{outer},({}))", refs(&voids))))
    }

    /// Faceted solid; cavities become voids of a faceted `BREP_WITH_VOIDS`.
    fn faceted_brep(&mut self, outer: ShellId, cavities: &[ShellId]) -> Result<usize> {
        let outer = self.faceted_shell(outer)?;
        if cavities.is_empty() {
            return Ok(self.add(format!("FACETED_BREP('',#{outer})")));
        }
        let mut voids = Vec::new();
        for &cavity in cavities {
            let shell = self.faceted_shell(cavity)?;
            voids.push(self.add(format!("ORIENTED_CLOSED_SHELL('',*,#{shell},.F.)")));
        }
        Ok(self.add(format!(
            "(BREP_WITH_VOIDS(({}))FACETED_BREP()GEOMETRIC_REPRESENTATION_ITEM()\
             MANIFOLD_SOLID_BREP(#{outer})REPRESENTATION_ITEM('')SOLID_MODEL())",
            refs(&voids)
        )))
    }

    /// `CLOSED_SHELL` of `FACE_SURFACE`s bounded by `POLY_LOOP`s.
    fn faceted_shell(&mut self, shell: ShellId) -> Result<usize> {
        let store = self.store;
        let mut faces = Vec::new();
        for &face_id in &store.shell(shell)?.faces {
            let face = store.face(face_id)?;
            let mut bounds = Vec::new();
            for (i, wire) in std::iter::once(face.outer_wire)
                .chain(face.inner_wires.iter().copied())
                .enumerate()
            {
                let mut corners = Vec::new();
                for coedge in store.wire_coedges(wire)? {
                    let start = store.coedge_start(coedge)?;
                    corners.push(self.point(start)?);
                }
                let poly = self.add(format!("POLY_LOOP('',({}))", refs(&corners)));
                let bound = if i == 0 { "FACE_OUTER_BOUND" } else { "FACE_BOUND" };
                bounds.push(self.add(format!("{bound}('',#{poly},.T.)")));
            }
            let plane = self.surface(&face.surface.transformed(&self.transform));
            let same_sense = face.outward != self.flip;
            faces.push(self.add(format!(
                "FACE_SURFACE('',({}),#{plane},{})",
                refs(&bounds),
                logical(same_sense)
            )));
        }
        Ok(self.add(format!("CLOSED_SHELL('',({}))", refs(&faces))))
    }

    // --- Context and product structure ---

    fn length_unit(&mut self, unit: LengthUnit) -> usize {
        let si = |prefix: &str| format!("(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT({prefix},.METRE.))");
        match unit {
            LengthUnit::Millimetre => self.add(si(".MILLI.")),
            LengthUnit::Centimetre => self.add(si(".CENTI.")),
            LengthUnit::Metre => self.add(si("$")),
            LengthUnit::Inch | LengthUnit::Foot => {
                let (name, mm) = match unit {
                    LengthUnit::Inch => ("INCH", 25.4),
                    _ => ("FOOT", 304.8),
                };
                let base = self.add(si(".MILLI."));
                let measure = self.add(format!(
                    "LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE({}),#{base})",
                    fmt_real(mm)
                ));
                let dims = self.add("DIMENSIONAL_EXPONENTS(1.,0.,0.,0.,0.,0.,0.)".to_string());
                self.add(format!(
                    "(CONVERSION_BASED_UNIT('{name}',#{measure})LENGTH_UNIT()NAMED_UNIT(#{dims}))"
                ))
            }
        }
    }

    fn representation_context(&mut self, settings: &InterchangeSettings) -> usize {
        let len_unit = self.length_unit(settings.length_unit);
        let angle_unit = self.add("(NAMED_UNIT(*)PLANE_ANGLE_UNIT()SI_UNIT($,.RADIAN.))".to_string());
        let solid_angle_unit =
            self.add("(NAMED_UNIT(*)SI_UNIT($,.STERADIAN.)SOLID_ANGLE_UNIT())".to_string());
        let uncertainty = self.add(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE({}),#{len_unit},'distance_accuracy_value','confusion accuracy')",
            fmt_real(settings.resolution)
        ));
        self.add(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3)GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty}))\
             GLOBAL_UNIT_ASSIGNED_CONTEXT((#{len_unit},#{angle_unit},#{solid_angle_unit}))\
             REPRESENTATION_CONTEXT('Context3D','3D Context with UNIT and UNCERTAINTY'))"
        ))
    }

    fn product_chain(&mut self, settings: &InterchangeSettings, representation: usize) {
        let (context_name, protocol, year) = settings.step_schema.application();
        let name = step_string(&settings.product_name);

        let app_ctx = self.add(format!("APPLICATION_CONTEXT('{context_name}')"));
        self.add(format!(
            "APPLICATION_PROTOCOL_DEFINITION('international standard','{protocol}',{year},#{app_ctx})"
        ));
        let prod_ctx = self.add(format!("PRODUCT_CONTEXT('',#{app_ctx},'mechanical')"));
        let product = self.add(format!("PRODUCT('{name}','{name}','',(#{prod_ctx}))"));
        let pdf = self.add(format!("PRODUCT_DEFINITION_FORMATION('','',#{product})"));
        let pdc = self.add(format!("PRODUCT_DEFINITION_CONTEXT('part definition',#{app_ctx},'design')"));
        let prod_def = self.add(format!("PRODUCT_DEFINITION('design','',#{pdf},#{pdc})"));
        let pds = self.add(format!("PRODUCT_DEFINITION_SHAPE('','',#{prod_def})"));
        self.add(format!("SHAPE_DEFINITION_REPRESENTATION(#{pds},#{representation})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ShapeBuilder;
    use crate::math::Point3;
    use crate::primitive::{make_box, make_cylinder};

    fn count(text: &str, entity: &str) -> usize {
        let needle = format!("={entity}(");
        text.lines().filter(|l| l.contains(&needle)).count()
    }

    #[test]
    fn step_box_contains_entities() {
        let text = export_step(&Shape::box3(5.0, 3.0, 8.0), StepModelType::AsIs).unwrap();
        assert!(text.starts_with("ISO-10303-21;"));
        assert!(text.contains("FILE_SCHEMA(('AUTOMOTIVE_DESIGN"));
        assert_eq!(count(&text, "MANIFOLD_SOLID_BREP"), 1);
        assert_eq!(count(&text, "CLOSED_SHELL"), 1);
        assert_eq!(count(&text, "ADVANCED_FACE"), 6);
        assert_eq!(count(&text, "EDGE_CURVE"), 12);
        assert_eq!(count(&text, "VERTEX_POINT"), 8);
        assert_eq!(count(&text, "ADVANCED_BREP_SHAPE_REPRESENTATION"), 1);
        assert!(text.contains("SI_UNIT(.MILLI.,.METRE.)"));
        assert!(text.trim_end().ends_with("END-ISO-10303-21;"));
    }

    #[test]
    fn step_cylinder_contains_cylindrical_surface() {
        let text = export_step(&Shape::cylinder(5.0, 20.0), StepModelType::AsIs).unwrap();
        assert_eq!(count(&text, "CYLINDRICAL_SURFACE"), 2);
        assert_eq!(count(&text, "PLANE"), 2);
        assert_eq!(count(&text, "CIRCLE"), 4);
    }

    #[test]
    fn vertex_is_not_a_manifold_solid() {
        let vertex = Shape::vertex(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(export_step(&vertex, StepModelType::ManifoldSolidBrep).unwrap(), "");
        let text = export_step(&vertex, StepModelType::AsIs).unwrap();
        assert!(text.contains("ISO-10303-21;"));
        assert_eq!(count(&text, "GEOMETRIC_CURVE_SET"), 1);
        assert!(text.contains("CARTESIAN_POINT('',(1.,2.,3.))"));
    }

    #[test]
    fn faceted_mode_needs_planar_faces() {
        let text = export_step(&Shape::box3(1.0, 1.0, 1.0), StepModelType::FacetedBrep).unwrap();
        assert_eq!(count(&text, "FACETED_BREP"), 1);
        assert_eq!(count(&text, "POLY_LOOP"), 6);
        assert_eq!(count(&text, "FACETED_BREP_SHAPE_REPRESENTATION"), 1);
        assert_eq!(export_step(&Shape::cylinder(1.0, 2.0), StepModelType::FacetedBrep).unwrap(), "");
    }

    /// 10 mm cube with a cavity built from the outer shell of `cavity`.
    fn hollow_solid(cavity: impl FnOnce(&mut ShapeBuilder) -> SolidId) -> Shape {
        let mut b = ShapeBuilder::new();
        let outer = make_box(&mut b, 5.0, 5.0, 5.0);
        let inner = cavity(&mut b);
        let outer_shell = b.store().solid(outer).unwrap().outer_shell;
        let cavity_shell = b.store().solid(inner).unwrap().outer_shell;
        let solid = b.solid(outer_shell, vec![cavity_shell]);
        b.finish(ShapeRef::Solid(solid))
    }

    #[test]
    fn faceted_solid_keeps_its_cavities() {
        let shape = hollow_solid(|b| make_box(b, 1.0, 1.0, 1.0));

        let text = export_step(&shape, StepModelType::AsIs).unwrap();
        assert_eq!(count(&text, "BREP_WITH_VOIDS"), 1);
        assert_eq!(count(&text, "ADVANCED_FACE"), 12);

        let text = export_step(&shape, StepModelType::FacetedBrep).unwrap();
        assert_eq!(count(&text, "FACE_SURFACE"), 12);
        assert_eq!(count(&text, "CLOSED_SHELL"), 2);
        assert_eq!(count(&text, "ORIENTED_CLOSED_SHELL"), 1);
        assert_eq!(text.lines().filter(|l| l.contains("=(BREP_WITH_VOIDS((#")).count(), 1);
        assert!(text.contains("FACETED_BREP()"));
        assert_eq!(count(&text, "FACETED_BREP"), 0);
    }

    #[test]
    fn curved_cavity_is_not_faceted() {
        let shape = hollow_solid(|b| make_cylinder(b, 1.0, 2.0));
        assert_eq!(export_step(&shape, StepModelType::FacetedBrep).unwrap(), "");
        assert!(!export_step(&shape, StepModelType::AsIs).unwrap().is_empty());
    }

    #[test]
    fn open_face_only_fits_surface_modes() {
        let face = Shape::polygon(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(export_step(&face, StepModelType::ManifoldSolidBrep).unwrap(), "");
        let text = export_step(&face, StepModelType::ShellBasedSurfaceModel).unwrap();
        assert_eq!(count(&text, "OPEN_SHELL"), 1);
        assert_eq!(count(&text, "MANIFOLD_SURFACE_SHAPE_REPRESENTATION"), 1);
        let text = export_step(&face, StepModelType::GeometricCurveSet).unwrap();
        assert_eq!(count(&text, "TRIMMED_CURVE"), 3);
    }

    #[test]
    fn curve_set_of_box_has_one_curve_per_edge() {
        let text = export_step(&Shape::box3(1.0, 1.0, 1.0), StepModelType::GeometricCurveSet).unwrap();
        assert_eq!(count(&text, "TRIMMED_CURVE"), 12);
        assert_eq!(
            count(&text, "GEOMETRICALLY_BOUNDED_WIREFRAME_SHAPE_REPRESENTATION"),
            1
        );
    }

    #[test]
    fn mixed_compound_uses_plain_shape_representation() {
        let shape = Shape::compound(&[Shape::box3(1.0, 1.0, 1.0), Shape::vertex(Point3::origin())]);
        let text = export_step(&shape, StepModelType::AsIs).unwrap();
        assert_eq!(count(&text, "SHAPE_REPRESENTATION"), 1);
        assert_eq!(count(&text, "MANIFOLD_SOLID_BREP"), 1);
        assert_eq!(count(&text, "GEOMETRIC_CURVE_SET"), 1);
    }

    #[test]
    fn null_and_empty_shapes_are_void() {
        let mut writer = StepWriter::new();
        assert_eq!(writer.transfer(&Shape::null(), StepModelType::AsIs).unwrap(), ReturnStatus::Void);
        let mut writer = StepWriter::new();
        let empty = Shape::compound(&[]);
        assert_eq!(writer.transfer(&empty, StepModelType::AsIs).unwrap(), ReturnStatus::Void);
        assert_eq!(export_step(&empty, StepModelType::AsIs).unwrap(), "");
    }

    #[test]
    fn failed_writer_stays_failed() {
        let mut writer = StepWriter::new();
        let vertex = Shape::vertex(Point3::origin());
        assert_eq!(
            writer.transfer(&vertex, StepModelType::ManifoldSolidBrep).unwrap(),
            ReturnStatus::Fail
        );
        assert_eq!(writer.transfer(&vertex, StepModelType::AsIs).unwrap(), ReturnStatus::Fail);
        assert_eq!(writer.write_stream(&mut Vec::new()).unwrap(), ReturnStatus::Fail);
        assert_eq!(writer.entity_count(), 0);
    }

    #[test]
    fn write_before_transfer_is_void() {
        let mut writer = StepWriter::new();
        let mut sink = Vec::new();
        assert_eq!(writer.write_stream(&mut sink).unwrap(), ReturnStatus::Void);
        assert!(sink.is_empty());
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_is_a_status_not_an_error() {
        let mut writer = StepWriter::new();
        let status = writer.transfer(&Shape::box3(1.0, 1.0, 1.0), StepModelType::AsIs).unwrap();
        assert_eq!(status, ReturnStatus::Done);
        assert_eq!(writer.write_stream(&mut BrokenSink).unwrap(), ReturnStatus::Fail);
    }

    #[test]
    fn malformed_shape_is_an_error() {
        let mut store = TopoStore::new();
        let solid = store.add_solid(Solid {
            outer_shell: ShellId(4),
            inner_shells: vec![],
        });
        let shape = Shape::from_parts(store, Some(ShapeRef::Solid(solid)));
        let err = export_step(&shape, StepModelType::AsIs).unwrap_err();
        assert_eq!(err.kind(), "DanglingReference");
    }

    #[test]
    fn explicit_settings_override_the_global() {
        let settings = InterchangeSettings {
            length_unit: LengthUnit::Inch,
            product_name: "Bracket's plate".into(),
            ..InterchangeSettings::default()
        };
        let mut writer = StepWriter::with_settings(settings);
        writer.transfer(&Shape::box3(25.4, 25.4, 25.4), StepModelType::AsIs).unwrap();
        let mut sink = Vec::new();
        assert_eq!(writer.write_stream(&mut sink).unwrap(), ReturnStatus::Done);
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("CONVERSION_BASED_UNIT('INCH'"));
        assert!(text.contains("PRODUCT('Bracket''s plate'"));
        assert_eq!(count(&text, "VERTEX_POINT"), 8);
    }

    #[test]
    fn header_strings_are_encoded() {
        assert_eq!(step_string("plain"), "plain");
        assert_eq!(step_string(r"C:\parts"), r"C:\\parts");
        assert_eq!(step_string("Wälzlager"), r"W\X2\00E4\X0\lzlager");
        assert_eq!(step_string("🔩"), r"\X4\0001F529\X0\");

        let settings = InterchangeSettings {
            product_name: r"C:\parts\Wälzlager".into(),
            author: "Ø'Brien".into(),
            ..InterchangeSettings::default()
        };
        let mut writer = StepWriter::with_settings(settings);
        writer.transfer(&Shape::box3(1.0, 1.0, 1.0), StepModelType::AsIs).unwrap();
        let mut sink = Vec::new();
        assert_eq!(writer.write_stream(&mut sink).unwrap(), ReturnStatus::Done);
        let text = String::from_utf8(sink).unwrap();
        assert!(text.is_ascii());
        assert!(text.contains(r"FILE_NAME('C:\\parts\\W\X2\00E4\X0\lzlager'"));
        assert!(text.contains(r"PRODUCT('C:\\parts\\W\X2\00E4\X0\lzlager'"));
        assert!(text.contains(r"('\X2\00D8\X0\''Brien')"));
    }

    #[test]
    fn mode_codes_round_trip() {
        for code in 0..5 {
            assert_eq!(StepModelType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(StepModelType::from_code(5), None);
    }
}
