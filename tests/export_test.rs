use brepio::math::{Isometry3, Point3, Vector3};
use brepio::topo::{FaceId, Shell, ShapeRef, TopoStore};
use brepio::{
    catch_failure, describe_failure, export, export_debug_json, export_iges, export_native,
    export_step, release, ExportFormat, Shape, StepModelType,
};
use serde_json::Value;

const ALL_MODES: [StepModelType; 5] = [
    StepModelType::AsIs,
    StepModelType::ManifoldSolidBrep,
    StepModelType::FacetedBrep,
    StepModelType::ShellBasedSurfaceModel,
    StepModelType::GeometricCurveSet,
];

fn sample_shapes() -> Vec<Shape> {
    vec![
        Shape::vertex(Point3::new(1.0, 2.0, 3.0)),
        Shape::segment(Point3::origin(), Point3::new(0.0, 4.0, 0.0)).unwrap(),
        Shape::circle(Point3::origin(), Vector3::z(), 3.0).unwrap(),
        Shape::polygon(&[
            Point3::origin(),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ])
        .unwrap(),
        Shape::box3(5.0, 3.0, 8.0),
        Shape::cylinder(2.0, 6.0).located(Isometry3::translation(1.0, 1.0, 1.0)),
        Shape::compound(&[Shape::box3(1.0, 1.0, 1.0), Shape::vertex(Point3::new(9.0, 9.0, 9.0))]),
    ]
}

fn malformed_shape() -> Shape {
    let mut store = TopoStore::new();
    let shell = store.add_shell(Shell { faces: vec![FaceId(3)] });
    Shape::from_parts(store, Some(ShapeRef::Shell(shell)))
}

#[test]
fn single_vertex_as_solid_brep_is_empty() {
    let vertex = Shape::vertex(Point3::new(1.0, 2.0, 3.0));
    let text = export_step(&vertex, StepModelType::ManifoldSolidBrep).unwrap();
    assert_eq!(text, "");

    let text = export_step(&vertex, StepModelType::AsIs).unwrap();
    assert!(text.starts_with("ISO-10303-21;"));
    assert!(text.contains("CARTESIAN_POINT('',(1.,2.,3.))"));
}

#[test]
fn null_shape_is_exported_by_every_text_writer() {
    let null = Shape::null();
    assert!(export_native(&null).unwrap().trim_end().ends_with('*'));
    let dump: Value = serde_json::from_str(&export_debug_json(&null, -1).unwrap()).unwrap();
    assert_eq!(dump["isNull"], true);
    assert!(!export_iges(&null).unwrap().is_empty());
    assert_eq!(export_step(&null, StepModelType::AsIs).unwrap(), "");
}

#[test]
fn exports_are_deterministic() {
    for shape in sample_shapes() {
        assert_eq!(export_native(&shape).unwrap(), export_native(&shape).unwrap());
        assert_eq!(
            export_debug_json(&shape, -1).unwrap(),
            export_debug_json(&shape, -1).unwrap()
        );
        assert_eq!(export_iges(&shape).unwrap(), export_iges(&shape).unwrap());
        assert_eq!(
            export_step(&shape, StepModelType::AsIs).unwrap(),
            export_step(&shape, StepModelType::AsIs).unwrap()
        );
    }
}

#[test]
fn step_modes_never_error_on_valid_shapes() {
    for shape in sample_shapes() {
        for mode in ALL_MODES {
            let text = export_step(&shape, mode).unwrap();
            if !text.is_empty() {
                assert!(text.trim_end().ends_with("END-ISO-10303-21;"), "{mode:?}");
            }
        }
    }
}

#[test]
fn box_step_is_a_closed_advanced_brep() {
    let text = export_step(&Shape::box3(5.0, 3.0, 8.0), StepModelType::AsIs).unwrap();
    assert!(text.contains("ADVANCED_BREP_SHAPE_REPRESENTATION"));
    assert!(text.contains("CLOSED_SHELL"));
    assert_eq!(text.matches("ADVANCED_FACE(").count(), 6);
    assert_eq!(text.matches("=PLANE(").count(), 6);
}

#[test]
fn cylinder_step_uses_cylindrical_surfaces() {
    let text = export_step(&Shape::cylinder(5.0, 20.0), StepModelType::AsIs).unwrap();
    assert!(text.contains("CYLINDRICAL_SURFACE"));
    assert!(text.contains("CIRCLE("));
}

#[test]
fn iges_records_are_80_columns() {
    for shape in sample_shapes() {
        let text = export_iges(&shape).unwrap();
        assert!(text.lines().last().unwrap().as_bytes()[72] == b'T');
        for line in text.lines() {
            assert_eq!(line.len(), 80, "bad record: {line:?}");
        }
    }
}

#[test]
fn native_export_of_compound_shares_nothing_twice() {
    let b = Shape::box3(1.0, 1.0, 1.0);
    let pair = Shape::compound(&[b.clone(), b.located(Isometry3::translation(5.0, 0.0, 0.0))]);
    let text = export_native(&pair).unwrap();
    assert_eq!(text.lines().filter(|l| *l == "Co").count(), 1);
    assert_eq!(text.lines().filter(|l| *l == "So").count(), 2);
}

fn key_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let path = format!("{prefix}/{k}");
                out.push(path.clone());
                key_paths(v, &path, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                key_paths(v, &format!("{prefix}/{i}"), out);
            }
        }
        _ => {}
    }
}

#[test]
fn deeper_dumps_only_add_detail() {
    let shape = Shape::cylinder(1.0, 2.0);
    let mut previous: Vec<String> = Vec::new();
    for depth in 0..16 {
        let dump: Value = serde_json::from_str(&export_debug_json(&shape, depth).unwrap()).unwrap();
        let mut paths = Vec::new();
        key_paths(&dump, "", &mut paths);
        for path in &previous {
            assert!(paths.contains(path), "depth {depth} lost {path}");
        }
        previous = paths;
    }
    let full: Value = serde_json::from_str(&export_debug_json(&shape, -1).unwrap()).unwrap();
    let mut paths = Vec::new();
    key_paths(&full, "", &mut paths);
    assert_eq!(paths, previous);
}

#[test]
fn malformed_shape_fails_every_writer() {
    let shape = malformed_shape();
    assert_eq!(export_native(&shape).unwrap_err().kind(), "DanglingReference");
    assert_eq!(export_debug_json(&shape, 0).unwrap_err().kind(), "DanglingReference");
    assert_eq!(export_iges(&shape).unwrap_err().kind(), "DanglingReference");
    assert_eq!(
        export_step(&shape, StepModelType::AsIs).unwrap_err().kind(),
        "DanglingReference"
    );
}

#[test]
fn failures_cross_the_boundary_as_handles() {
    let shape = malformed_shape();
    let handle = catch_failure(|| export(&shape, &ExportFormat::Native)).unwrap_err();
    let view = unsafe { describe_failure(handle) };
    assert_eq!(view.kind, "DanglingReference");
    assert!(view.message.contains("Face #3"));
    unsafe { release(handle) };
}
