//! Native BRep text export.
//!
//! Writes the kernel's own topology format: a header, the geometry tables
//! (locations, curves, surfaces) and one record per unique topological
//! entity. Records are written children first, so every reference points
//! at an entity already listed:
//!
//! ```text
//! CASCADE Topology V1, (c) Matra-Datavision
//! Locations 0
//! Curve2ds 0
//! Curves 12
//! 1 -1 -1 -1 1 0 0
//! ...
//! TShapes 34
//! Ve
//! 0.0000001
//! ...
//! +34 0
//! ```

use std::collections::HashMap;
use std::io::Write;

use super::into_text;
use crate::curve::Curve3;
use crate::error::Result;
use crate::math::{plane_frame, Isometry3, Point3, Vector3, TOLERANCE};
use crate::shape::Shape;
use crate::surface::Surface;
use crate::topo::validate::{shell_is_closed, wire_is_closed};
use crate::topo::*;

const HEADER: &str = "CASCADE Topology V1, (c) Matra-Datavision";

/// Serialize a shape to native BRep text.
///
/// The null shape yields the header, empty tables and a `*` root.
pub fn export_native(shape: &Shape) -> Result<String> {
    let mut sink = Vec::new();
    write_brep(shape, &mut sink)?;
    tracing::debug!(bytes = sink.len(), "native BRep written");
    into_text(sink)
}

/// Write a shape as native BRep text to the given writer.
pub fn write_brep<W: Write>(shape: &Shape, writer: &mut W) -> Result<()> {
    shape.check()?;
    let store = shape.store();
    let order = match shape.root() {
        Some(root) => store.postorder(root)?,
        None => Vec::new(),
    };
    let index: HashMap<ShapeRef, usize> = order.iter().enumerate().map(|(i, s)| (*s, i + 1)).collect();

    // Geometry tables, numbered from 1 in record order
    let mut curves = Vec::new();
    let mut surfaces = Vec::new();
    let mut curve_index = HashMap::new();
    let mut surface_index = HashMap::new();
    for shape_ref in &order {
        match *shape_ref {
            ShapeRef::Edge(id) => {
                curves.push(&store.edge(id)?.curve);
                curve_index.insert(id, curves.len());
            }
            ShapeRef::Face(id) => {
                surfaces.push(&store.face(id)?.surface);
                surface_index.insert(id, surfaces.len());
            }
            _ => {}
        }
    }

    let located = *shape.location() != Isometry3::identity();

    writeln!(writer, "{HEADER}")?;
    if located {
        writeln!(writer, "Locations 1")?;
        write_location(writer, shape.location())?;
    } else {
        writeln!(writer, "Locations 0")?;
    }
    writeln!(writer, "Curve2ds 0")?;
    writeln!(writer, "Curves {}", curves.len())?;
    for curve in curves {
        write_curve(writer, curve)?;
    }
    writeln!(writer, "Polygon3D 0")?;
    writeln!(writer, "PolygonOnTriangulations 0")?;
    writeln!(writer, "Surfaces {}", surfaces.len())?;
    for surface in surfaces {
        write_surface(writer, surface)?;
    }
    writeln!(writer, "Triangulations 0")?;
    writeln!(writer)?;

    writeln!(writer, "TShapes {}", order.len())?;
    for &shape_ref in &order {
        match shape_ref {
            ShapeRef::Vertex(id) => {
                let vertex = store.vertex(id)?;
                writeln!(writer, "Ve")?;
                writeln!(writer, "{}", vertex.tolerance)?;
                writeln!(writer, "{}", point(&vertex.point))?;
                writeln!(writer, "0 0")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(true, true))?;
            }
            ShapeRef::Edge(id) => {
                let edge = store.edge(id)?;
                // Lines are stored unit-speed, so their range is rescaled.
                let speed = match &edge.curve {
                    Curve3::Line { dir, .. } => dir.norm(),
                    _ => 1.0,
                };
                writeln!(writer, "Ed")?;
                writeln!(writer, " {} 1 1 0", edge.tolerance)?;
                writeln!(
                    writer,
                    "1  {} 0 {} {}",
                    curve_index[&id],
                    edge.t_start * speed,
                    edge.t_end * speed
                )?;
                writeln!(writer, "0")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(edge.is_closed(), false))?;
            }
            ShapeRef::Wire(id) => {
                writeln!(writer, "Wi")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(wire_is_closed(store, id)?, false))?;
            }
            ShapeRef::Face(id) => {
                writeln!(writer, "Fa")?;
                writeln!(writer, "0  {} {} 0", TOLERANCE, surface_index[&id])?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(false, false))?;
            }
            ShapeRef::Shell(id) => {
                writeln!(writer, "Sh")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(shell_is_closed(store, id)?, false))?;
            }
            ShapeRef::Solid(_) => {
                writeln!(writer, "So")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(false, false))?;
            }
            ShapeRef::Compound(_) => {
                writeln!(writer, "Co")?;
                writeln!(writer)?;
                writeln!(writer, "{}", flags(false, false))?;
            }
        }
        let mut refs = String::new();
        for (child, orientation) in store.children(shape_ref)? {
            refs.push_str(&format!("{}{} 0 ", orientation_char(orientation), index[&child]));
        }
        writeln!(writer, "{refs}*")?;
        writeln!(writer)?;
    }

    match shape.root() {
        Some(root) => {
            let mut orientation = shape.orientation();
            if let ShapeRef::Face(id) = root {
                orientation = orientation.compose(Orientation::from_forward(store.face(id)?.outward));
            }
            writeln!(
                writer,
                "{}{} {}",
                orientation_char(orientation),
                index[&root],
                u8::from(located)
            )?;
        }
        None => writeln!(writer, "*")?,
    }
    Ok(())
}

/// Flag line: free, modified, checked, orientable, closed, infinite, convex.
fn flags(closed: bool, convex: bool) -> String {
    format!("0101{}0{}", u8::from(closed), u8::from(convex))
}

fn orientation_char(orientation: Orientation) -> char {
    match orientation {
        Orientation::Forward => '+',
        Orientation::Reversed => '-',
        Orientation::Internal => 'i',
        Orientation::External => 'e',
    }
}

fn point(p: &Point3) -> String {
    format!("{} {} {}", p.x, p.y, p.z)
}

fn vector(v: &Vector3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

fn write_location<W: Write>(writer: &mut W, location: &Isometry3) -> Result<()> {
    let m = location.to_homogeneous();
    writeln!(writer, "1")?;
    for row in 0..3 {
        writeln!(
            writer,
            "{} {} {} {}",
            m[(row, 0)],
            m[(row, 1)],
            m[(row, 2)],
            m[(row, 3)]
        )?;
    }
    Ok(())
}

fn write_curve<W: Write>(writer: &mut W, curve: &Curve3) -> Result<()> {
    match curve {
        Curve3::Line { origin, dir } => {
            writeln!(writer, "1 {} {}", point(origin), vector(&dir.normalize()))?;
        }
        Curve3::Circle { center, axis, radius } => {
            let (u, v) = plane_frame(axis);
            writeln!(
                writer,
                "2 {} {} {} {} {}",
                point(center),
                vector(&axis.normalize()),
                vector(&u),
                vector(&v),
                radius
            )?;
        }
        Curve3::Ellipse { center, major, minor } => {
            let x = major.normalize();
            let y = minor.normalize();
            writeln!(
                writer,
                "3 {} {} {} {} {} {}",
                point(center),
                vector(&x.cross(&y)),
                vector(&x),
                vector(&y),
                major.norm(),
                minor.norm()
            )?;
        }
    }
    Ok(())
}

fn write_surface<W: Write>(writer: &mut W, surface: &Surface) -> Result<()> {
    let (location, axis) = surface.position();
    let (x, y) = plane_frame(&axis);
    let frame = format!("{} {} {} {}", point(&location), vector(&axis), vector(&x), vector(&y));
    match surface {
        Surface::Plane { .. } => writeln!(writer, "1 {frame}")?,
        Surface::Cylinder { radius, .. } => writeln!(writer, "2 {frame} {radius}")?,
        Surface::Cone { half_angle, .. } => writeln!(writer, "3 {frame} 0 {half_angle}")?,
        Surface::Sphere { radius, .. } => writeln!(writer, "4 {frame} {radius}")?,
        Surface::Torus { major_r, minor_r, .. } => writeln!(writer, "5 {frame} {major_r} {minor_r}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_line(text: &str) -> &str {
        text.lines().filter(|l| !l.is_empty()).last().unwrap()
    }

    #[test]
    fn null_shape_writes_empty_tables() {
        let text = export_native(&Shape::null()).unwrap();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("Curves 0"));
        assert!(text.contains("Surfaces 0"));
        assert!(text.contains("TShapes 0"));
        assert_eq!(last_line(&text), "*");
    }

    #[test]
    fn box_lists_every_entity_once() {
        let text = export_native(&Shape::box3(5.0, 3.0, 8.0)).unwrap();
        assert!(text.contains("Curves 12\n"));
        assert!(text.contains("Surfaces 6\n"));
        assert!(text.contains("TShapes 34\n"));
        assert_eq!(text.lines().filter(|l| *l == "Ve").count(), 8);
        assert_eq!(text.lines().filter(|l| *l == "Fa").count(), 6);
        assert_eq!(last_line(&text), "+34 0");
    }

    #[test]
    fn segment_is_written_unit_speed() {
        let shape = Shape::segment(Point3::origin(), Point3::new(10.0, 0.0, 0.0)).unwrap();
        let text = export_native(&shape).unwrap();
        assert!(text.contains("\n1 0 0 0 1 0 0\n"));
        assert!(text.contains("\n1  1 0 0 10\n"));
        // Edge references its end vertex reversed.
        assert!(text.contains("\n+1 0 -2 0 *\n"));
    }

    #[test]
    fn location_and_orientation_reach_the_root() {
        let shape = Shape::box3(1.0, 1.0, 1.0)
            .located(Isometry3::translation(0.0, 0.0, 10.0))
            .reversed();
        let text = export_native(&shape).unwrap();
        assert!(text.contains("Locations 1\n1\n1 0 0 0\n0 1 0 0\n0 0 1 10\n"));
        assert_eq!(last_line(&text), "-34 1");
    }

    #[test]
    fn closed_shell_is_flagged_closed() {
        let text = export_native(&Shape::box3(1.0, 1.0, 1.0)).unwrap();
        assert!(text.contains("Sh\n\n0101100\n"));
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let mut store = TopoStore::new();
        let shell = store.add_shell(Shell { faces: vec![FaceId(0)] });
        let shape = Shape::from_parts(store, Some(ShapeRef::Shell(shell)));
        let err = export_native(&shape).unwrap_err();
        assert_eq!(err.kind(), "DanglingReference");
    }
}
