//! Global interchange settings. Every test here mutates process-wide state,
//! so they serialize on a lock and restore the defaults when done.

use std::sync::{Mutex, MutexGuard, PoisonError};

use brepio::settings::{
    interchange_settings, reset_interchange_settings, set_interchange_settings,
    update_interchange_settings,
};
use brepio::{export_iges, export_step, InterchangeSettings, LengthUnit, Shape, StepModelType, StepSchema};

static LOCK: Mutex<()> = Mutex::new(());

struct Defaults<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Drop for Defaults<'_> {
    fn drop(&mut self) {
        reset_interchange_settings();
    }
}

fn exclusive() -> Defaults<'static> {
    let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    reset_interchange_settings();
    Defaults { _guard: guard }
}

#[test]
fn metre_unit_scales_step_and_iges() {
    let _g = exclusive();
    let shape = Shape::box3(1000.0, 1000.0, 1000.0);
    assert!(export_step(&shape, StepModelType::AsIs).unwrap().contains("1000."));

    update_interchange_settings(|s| s.length_unit = LengthUnit::Metre).unwrap();
    let step = export_step(&shape, StepModelType::AsIs).unwrap();
    assert!(step.contains("SI_UNIT($,.METRE.)"));
    assert!(!step.contains("1000."));

    let iges = export_iges(&shape).unwrap();
    let global: String = iges
        .lines()
        .filter(|l| l.as_bytes()[72] == b'G')
        .map(|l| &l[..72])
        .collect();
    assert!(global.contains(",6,1HM,"));
}

#[test]
fn inch_unit_uses_a_conversion_based_unit() {
    let _g = exclusive();
    update_interchange_settings(|s| s.length_unit = LengthUnit::Inch).unwrap();
    let step = export_step(&Shape::box3(1.0, 1.0, 1.0), StepModelType::AsIs).unwrap();
    assert!(step.contains("CONVERSION_BASED_UNIT('INCH'"));
    assert!(step.contains("LENGTH_MEASURE(25.4)"));
}

#[test]
fn schema_and_header_fields_reach_the_file() {
    let _g = exclusive();
    set_interchange_settings(InterchangeSettings {
        step_schema: StepSchema::Ap203,
        author: "O'Neil".to_string(),
        product_name: "bracket".to_string(),
        ..InterchangeSettings::default()
    })
    .unwrap();
    let step = export_step(&Shape::box3(1.0, 1.0, 1.0), StepModelType::AsIs).unwrap();
    assert!(step.contains("CONFIG_CONTROL_DESIGN"));
    assert!(step.contains("('O''Neil')"));
    assert!(step.contains("FILE_NAME('bracket'"));
}

#[test]
fn invalid_settings_are_rejected_unchanged() {
    let _g = exclusive();
    let err = update_interchange_settings(|s| s.resolution = -1.0).unwrap_err();
    assert_eq!(err.kind(), "InvalidSettings");
    assert_eq!(interchange_settings(), InterchangeSettings::default());

    let err = set_interchange_settings(InterchangeSettings {
        product_name: "  ".to_string(),
        ..InterchangeSettings::default()
    })
    .unwrap_err();
    assert_eq!(err.kind(), "InvalidSettings");
}

#[test]
fn reset_restores_defaults() {
    let _g = exclusive();
    update_interchange_settings(|s| s.author = "someone".to_string()).unwrap();
    assert_eq!(interchange_settings().author, "someone");
    reset_interchange_settings();
    assert_eq!(interchange_settings(), InterchangeSettings::default());
}
