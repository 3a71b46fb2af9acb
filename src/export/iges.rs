//! IGES 5.3 export (faces mode).
//!
//! Faces become trimmed surfaces (144) over analytic surfaces (190-198),
//! bounded by curves on surface (142) that carry composite curves (102) of
//! the edge curves. Free wires, edges and vertices are written as composite
//! curves, curves and points.
//!
//! Curve mapping:
//! - `Line` → 110
//! - `Circle` → 100 circular arc + 124 transformation matrix
//! - `Ellipse` → 104 conic arc + 124 transformation matrix
//!
//! The file is laid out in 80-column records: Start, Global, Directory
//! Entry, Parameter Data and Terminate sections.

use std::f64::consts::TAU;
use std::io::Write;

use once_cell::sync::OnceCell;

use super::{fmt_real, into_text};
use crate::curve::Curve3;
use crate::error::{KernelError, Result};
use crate::math::{plane_frame, ModelTransform, Point3, Vector3, PARAM_TOL};
use crate::settings::{interchange_settings, InterchangeSettings};
use crate::shape::Shape;
use crate::surface::Surface;
use crate::topo::*;

/// IGES version flag for 5.3.
const IGES_VERSION_FLAG: u32 = 11;

/// Columns of parameter text on a Parameter Data record.
const PD_WIDTH: usize = 64;

/// Columns of text on a Start or Global record.
const SG_WIDTH: usize = 72;

static CONTROLLER: OnceCell<IgesController> = OnceCell::new();

/// Process-wide IGES translation setup.
#[derive(Debug)]
pub struct IgesController {
    version_flag: u32,
    drafting_standard: u32,
}

impl IgesController {
    /// Initialize the controller once; later calls return the same instance.
    pub fn init() -> &'static IgesController {
        CONTROLLER.get_or_init(|| {
            tracing::info!(version_flag = IGES_VERSION_FLAG, "IGES controller initialized");
            IgesController {
                version_flag: IGES_VERSION_FLAG,
                drafting_standard: 0,
            }
        })
    }

    pub fn is_initialized() -> bool {
        CONTROLLER.get().is_some()
    }

    pub fn version_flag(&self) -> u32 {
        self.version_flag
    }
}

/// Serialize a shape to IGES text.
pub fn export_iges(shape: &Shape) -> Result<String> {
    IgesController::init();
    let mut writer = IgesWriter::new();
    writer.add_shape(shape)?;
    writer.compute_model()?;
    let mut sink = Vec::new();
    writer.write(&mut sink, false)?;
    tracing::debug!(entities = writer.entity_count(), bytes = sink.len(), "IGES written");
    into_text(sink)
}

/// One directory entry with its parameter data.
#[derive(Debug, Clone)]
struct Entity {
    type_number: u16,
    form: u16,
    params: Vec<String>,
    /// DE pointer of a 124 transformation matrix, or 0.
    matrix: usize,
    /// Referenced by another entity (physically dependent).
    dependent: bool,
}

/// Laid-out file records, without line terminators.
#[derive(Debug, Clone, Default)]
struct IgesModel {
    start: Vec<String>,
    global: Vec<String>,
    directory: Vec<String>,
    parameters: Vec<String>,
}

pub struct IgesWriter {
    settings: InterchangeSettings,
    controller: &'static IgesController,
    entities: Vec<Entity>,
    max_coord: f64,
    model: Option<IgesModel>,
}

impl Default for IgesWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl IgesWriter {
    /// Writer configured from a snapshot of the global interchange settings.
    pub fn new() -> Self {
        Self::with_settings(interchange_settings())
    }

    pub fn with_settings(settings: InterchangeSettings) -> Self {
        Self {
            settings,
            controller: IgesController::init(),
            entities: Vec::new(),
            max_coord: 0.0,
            model: None,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Translate a shape into entities. Returns `false` for the null shape.
    pub fn add_shape(&mut self, shape: &Shape) -> Result<bool> {
        let Some(root) = shape.root() else {
            return Ok(false);
        };
        shape.check()?;
        let store = shape.store();
        let transform = shape.model_transform(self.settings.length_unit.scale_from_kernel());
        let before = self.entities.len();

        for leaf in store.leaves(root)? {
            match leaf {
                ShapeRef::Solid(_) | ShapeRef::Shell(_) | ShapeRef::Face(_) => {
                    for face in store.collect(leaf, ShapeKind::Face)? {
                        if let ShapeRef::Face(id) = face {
                            self.trimmed_surface(store, &transform, id)?;
                        }
                    }
                }
                ShapeRef::Wire(id) => {
                    self.composite_curve(store, &transform, id, false)?;
                }
                ShapeRef::Edge(id) => {
                    self.edge_curve(store, &transform, id, true, false)?;
                }
                ShapeRef::Vertex(id) => {
                    let p = transform.point(&store.vertex(id)?.point);
                    self.point(&p, false);
                }
                ShapeRef::Compound(_) => {}
            }
        }
        self.model = None;
        tracing::debug!(added = self.entities.len() - before, "IGES shape translated");
        Ok(true)
    }

    /// Append an entity and return its DE pointer.
    fn add(&mut self, type_number: u16, form: u16, params: Vec<String>, matrix: usize, dependent: bool) -> usize {
        self.entities.push(Entity {
            type_number,
            form,
            params,
            matrix,
            dependent,
        });
        2 * self.entities.len() - 1
    }

    fn track(&mut self, p: &Point3) {
        self.max_coord = p.coords.iter().fold(self.max_coord, |m, c| m.max(c.abs()));
    }

    fn point(&mut self, p: &Point3, dependent: bool) -> usize {
        self.track(p);
        let params = vec![fmt_real(p.x), fmt_real(p.y), fmt_real(p.z)];
        self.add(116, 0, params, 0, dependent)
    }

    fn direction(&mut self, d: &Vector3) -> usize {
        let d = d.normalize();
        let params = vec![fmt_real(d.x), fmt_real(d.y), fmt_real(d.z)];
        self.add(123, 0, params, 0, true)
    }

    /// 124 matrix mapping a local XY frame at `origin` into model space.
    fn matrix(&mut self, origin: &Point3, x: &Vector3, y: &Vector3) -> usize {
        let z = x.cross(y);
        let mut params = Vec::with_capacity(12);
        for row in 0..3 {
            params.extend([x[row], y[row], z[row], origin[row]].map(fmt_real));
        }
        self.add(124, 0, params, 0, true)
    }

    /// Curve entity for one use of an edge, running start to end when `forward`.
    fn edge_curve(
        &mut self,
        store: &TopoStore,
        transform: &ModelTransform,
        id: EdgeId,
        forward: bool,
        dependent: bool,
    ) -> Result<usize> {
        let edge = store.edge(id)?;
        let curve = edge.curve.transformed(transform);
        let p_start = transform.point(&store.vertex(edge.start)?.point);
        let p_end = transform.point(&store.vertex(edge.end)?.point);
        self.track(&p_start);
        self.track(&p_end);

        let de = match &curve {
            Curve3::Line { .. } => {
                let (a, b) = if forward { (p_start, p_end) } else { (p_end, p_start) };
                let params = [a.x, a.y, a.z, b.x, b.y, b.z].map(fmt_real).to_vec();
                self.add(110, 0, params, 0, dependent)
            }
            Curve3::Circle { center, axis, radius } => {
                let (u, v) = plane_frame(axis);
                let (s0, s1, y) = local_range(&curve, &p_start, &p_end, forward, v);
                let matrix = self.matrix(center, &u, &y);
                let (start, end) = arc_ends(edge.is_closed(), s0, s1, |s| (radius * s.cos(), radius * s.sin()));
                let params = vec![
                    fmt_real(0.0),
                    fmt_real(0.0),
                    fmt_real(0.0),
                    fmt_real(start.0),
                    fmt_real(start.1),
                    fmt_real(end.0),
                    fmt_real(end.1),
                ];
                self.add(100, 0, params, matrix, dependent)
            }
            Curve3::Ellipse { center, major, minor } => {
                let (a, b) = (major.norm(), minor.norm());
                let x = major / a;
                let (s0, s1, y) = local_range(&curve, &p_start, &p_end, forward, minor / b);
                let matrix = self.matrix(center, &x, &y);
                let (start, end) = arc_ends(edge.is_closed(), s0, s1, |s| (a * s.cos(), b * s.sin()));
                let params = vec![
                    fmt_real(b * b),
                    fmt_real(0.0),
                    fmt_real(a * a),
                    fmt_real(0.0),
                    fmt_real(0.0),
                    fmt_real(-a * a * b * b),
                    fmt_real(0.0),
                    fmt_real(start.0),
                    fmt_real(start.1),
                    fmt_real(end.0),
                    fmt_real(end.1),
                ];
                self.add(104, 1, params, matrix, dependent)
            }
        };
        Ok(de)
    }

    fn composite_curve(
        &mut self,
        store: &TopoStore,
        transform: &ModelTransform,
        wire: WireId,
        dependent: bool,
    ) -> Result<usize> {
        let mut curves = Vec::new();
        for coedge in store.wire_coedges(wire)? {
            curves.push(self.edge_curve(store, transform, coedge.edge, coedge.forward, true)?);
        }
        let mut params = vec![curves.len().to_string()];
        params.extend(curves.iter().map(|de| de.to_string()));
        Ok(self.add(102, 0, params, 0, dependent))
    }

    /// Analytic surface entity for a surface already in model space.
    fn surface(&mut self, surface: &Surface) -> usize {
        let (origin, axis) = surface.position();
        let loc = self.point(&origin, true);
        let axis_de = self.direction(&axis);
        let refd = self.direction(&surface.ref_direction());
        let (type_number, params) = match surface {
            Surface::Plane { .. } => (190, vec![loc.to_string(), axis_de.to_string(), refd.to_string()]),
            Surface::Cylinder { radius, .. } => (
                192,
                vec![loc.to_string(), axis_de.to_string(), fmt_real(*radius), refd.to_string()],
            ),
            Surface::Cone { half_angle, .. } => (
                194,
                vec![
                    loc.to_string(),
                    axis_de.to_string(),
                    fmt_real(0.0),
                    fmt_real(half_angle.to_degrees()),
                    refd.to_string(),
                ],
            ),
            Surface::Sphere { radius, .. } => (
                196,
                vec![loc.to_string(), fmt_real(*radius), axis_de.to_string(), refd.to_string()],
            ),
            Surface::Torus { major_r, minor_r, .. } => (
                198,
                vec![
                    loc.to_string(),
                    axis_de.to_string(),
                    fmt_real(*major_r),
                    fmt_real(*minor_r),
                    refd.to_string(),
                ],
            ),
        };
        // Form 1: parameterised surface with a reference direction.
        self.add(type_number, 1, params, 0, true)
    }

    fn trimmed_surface(&mut self, store: &TopoStore, transform: &ModelTransform, id: FaceId) -> Result<usize> {
        let face = store.face(id)?;
        let surface = self.surface(&face.surface.transformed(transform));
        let outer = self.curve_on_surface(store, transform, surface, face.outer_wire)?;
        let mut inner = Vec::new();
        for &wire in &face.inner_wires {
            inner.push(self.curve_on_surface(store, transform, surface, wire)?);
        }
        let mut params = vec![surface.to_string(), "1".to_string(), inner.len().to_string(), outer.to_string()];
        params.extend(inner.iter().map(|de| de.to_string()));
        Ok(self.add(144, 0, params, 0, false))
    }

    fn curve_on_surface(
        &mut self,
        store: &TopoStore,
        transform: &ModelTransform,
        surface: usize,
        wire: WireId,
    ) -> Result<usize> {
        let curve = self.composite_curve(store, transform, wire, true)?;
        // No parameter-space curve; the model-space curve is preferred.
        let params = vec![
            "0".to_string(),
            surface.to_string(),
            "0".to_string(),
            curve.to_string(),
            "2".to_string(),
        ];
        Ok(self.add(142, 0, params, 0, true))
    }

    /// Lay out the file records.
    pub fn compute_model(&mut self) -> Result<()> {
        self.settings.validate()?;
        let mut model = IgesModel::default();

        model.start = wrap_text("brepio IGES export", SG_WIDTH)
            .into_iter()
            .enumerate()
            .map(|(i, text)| format!("{text:<72}S{:>7}", i + 1))
            .collect();

        model.global = wrap_tokens(&self.global_params(), SG_WIDTH)
            .into_iter()
            .enumerate()
            .map(|(i, text)| format!("{text:<72}G{:>7}", i + 1))
            .collect();

        for (i, entity) in self.entities.iter().enumerate() {
            let de = 2 * i + 1;
            let first_pd = model.parameters.len() + 1;
            let mut tokens = vec![entity.type_number.to_string()];
            tokens.extend(entity.params.iter().cloned());
            let lines = wrap_tokens(&tokens, PD_WIDTH);
            for text in &lines {
                let seq = model.parameters.len() + 1;
                model.parameters.push(format!("{text:<64} {de:>7}P{seq:>7}"));
            }
            let status = if entity.dependent { "00010000" } else { "00000000" };
            model.directory.push(format!(
                "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}D{:>7}",
                entity.type_number, first_pd, 0, 0, 0, 0, entity.matrix, 0, status, de
            ));
            model.directory.push(format!(
                "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}D{:>7}",
                entity.type_number,
                0,
                0,
                lines.len(),
                entity.form,
                "",
                "",
                "",
                0,
                de + 1
            ));
        }

        tracing::debug!(
            directory = model.directory.len(),
            parameters = model.parameters.len(),
            "IGES model computed"
        );
        self.model = Some(model);
        Ok(())
    }

    fn global_params(&self) -> Vec<String> {
        let s = &self.settings;
        let date = s.timestamp.format("%Y%m%d.%H%M%S").to_string();
        vec![
            hollerith(","),
            hollerith(";"),
            hollerith(&s.product_name),
            hollerith(&format!("{}.igs", s.product_name)),
            hollerith("brepio"),
            hollerith(env!("CARGO_PKG_VERSION")),
            "32".to_string(),
            "38".to_string(),
            "6".to_string(),
            "308".to_string(),
            "15".to_string(),
            hollerith(&s.product_name),
            fmt_real(1.0),
            s.length_unit.iges_flag().to_string(),
            hollerith(s.length_unit.iges_name()),
            "1".to_string(),
            fmt_real(1.0),
            hollerith(&date),
            fmt_real(s.resolution),
            fmt_real(self.max_coord),
            hollerith(&s.author),
            hollerith(&s.organization),
            self.controller.version_flag.to_string(),
            self.controller.drafting_standard.to_string(),
            hollerith(&date),
        ]
    }

    /// Write the laid-out file. Only text output is supported.
    pub fn write<W: Write>(&mut self, sink: &mut W, binary: bool) -> Result<()> {
        if binary {
            return Err(KernelError::NotSupported("binary IGES output".to_string()));
        }
        if self.model.is_none() {
            self.compute_model()?;
        }
        let Some(model) = &self.model else {
            return Ok(());
        };
        for line in model
            .start
            .iter()
            .chain(&model.global)
            .chain(&model.directory)
            .chain(&model.parameters)
        {
            writeln!(sink, "{line}")?;
        }
        writeln!(
            sink,
            "S{:>7}G{:>7}D{:>7}P{:>7}{:>40}T{:>7}",
            model.start.len(),
            model.global.len(),
            model.directory.len(),
            model.parameters.len(),
            "",
            1
        )?;
        sink.flush()?;
        Ok(())
    }
}

/// Parameter range of an arc in its local frame, and the frame's Y axis.
///
/// A reversed use mirrors the frame (Y and Z flipped) so the arc still runs
/// counter-clockwise from its start point.
fn local_range(curve: &Curve3, p_start: &Point3, p_end: &Point3, forward: bool, y: Vector3) -> (f64, f64, Vector3) {
    let t0 = curve.closest_parameter(p_start);
    let mut t1 = curve.closest_parameter(p_end);
    if t1 <= t0 + PARAM_TOL {
        t1 += TAU;
    }
    if forward {
        (t0, t1, y)
    } else {
        (-t1, -t0, -y)
    }
}

/// Local start and end points; a closed edge ends exactly where it starts.
fn arc_ends(closed: bool, s0: f64, s1: f64, at: impl Fn(f64) -> (f64, f64)) -> ((f64, f64), (f64, f64)) {
    let start = at(s0);
    let end = if closed { start } else { at(s1) };
    (start, end)
}

/// IGES Hollerith string; empty strings become a defaulted parameter.
fn hollerith(s: &str) -> String {
    let ascii: String = s.chars().map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' }).collect();
    if ascii.is_empty() {
        String::new()
    } else {
        format!("{}H{}", ascii.len(), ascii)
    }
}

/// Split text into records of at most `width` columns.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Join parameter tokens with `,` and a final `;` into records of at most
/// `width` columns, breaking between tokens. Only a token wider than a whole
/// record (a long Hollerith string) continues onto the next record.
fn wrap_tokens(tokens: &[String], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let delimiter = if i + 1 == tokens.len() { ';' } else { ',' };
        let piece = format!("{token}{delimiter}");
        if !current.is_empty() && current.len() + piece.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if piece.len() > width {
            let mut chunks = wrap_text(&piece, width);
            current = chunks.pop().unwrap_or_default();
            lines.extend(chunks);
        } else {
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
