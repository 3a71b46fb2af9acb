//! Process-wide interchange settings.
//!
//! The IGES and STEP writers read their unit, precision, schema and header
//! metadata from a single global guarded by a mutex. A writer takes a
//! snapshot when it is constructed, so changing the settings never affects
//! an export already in progress. `with_settings` constructors bypass the
//! global entirely.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Length unit of exported model space. Kernel geometry is in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    #[default]
    Millimetre,
    Centimetre,
    Metre,
    Inch,
    Foot,
}

impl LengthUnit {
    /// Size of one unit in millimetres.
    pub fn millimetres(self) -> f64 {
        match self {
            LengthUnit::Millimetre => 1.0,
            LengthUnit::Centimetre => 10.0,
            LengthUnit::Metre => 1000.0,
            LengthUnit::Inch => 25.4,
            LengthUnit::Foot => 304.8,
        }
    }

    /// Factor converting kernel millimetres into this unit.
    pub fn scale_from_kernel(self) -> f64 {
        1.0 / self.millimetres()
    }

    /// IGES global-section unit flag.
    pub fn iges_flag(self) -> u8 {
        match self {
            LengthUnit::Inch => 1,
            LengthUnit::Millimetre => 2,
            LengthUnit::Foot => 4,
            LengthUnit::Metre => 6,
            LengthUnit::Centimetre => 10,
        }
    }

    /// IGES global-section unit name.
    pub fn iges_name(self) -> &'static str {
        match self {
            LengthUnit::Inch => "INCH",
            LengthUnit::Millimetre => "MM",
            LengthUnit::Foot => "FT",
            LengthUnit::Metre => "M",
            LengthUnit::Centimetre => "CM",
        }
    }
}

/// STEP application protocol written to `FILE_SCHEMA`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSchema {
    Ap203,
    #[default]
    Ap214,
    Ap242,
}

impl StepSchema {
    pub fn file_schema(self) -> &'static str {
        match self {
            StepSchema::Ap203 => "CONFIG_CONTROL_DESIGN",
            StepSchema::Ap214 => "AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }",
            StepSchema::Ap242 => "AP242_MANAGED_MODEL_BASED_3D_ENGINEERING_MIM_LF { 1 0 10303 442 1 1 4 }",
        }
    }

    /// Application context and protocol names for the product chain.
    pub fn application(self) -> (&'static str, &'static str, u32) {
        match self {
            StepSchema::Ap203 => ("configuration controlled 3D designs of mechanical parts and assemblies", "config_control_design", 1994),
            StepSchema::Ap214 => ("core data for automotive mechanical design processes", "automotive_design", 2000),
            StepSchema::Ap242 => ("managed model based 3d engineering", "ap242_managed_model_based_3d_engineering", 2011),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterchangeSettings {
    pub length_unit: LengthUnit,
    /// Geometric resolution written as the model uncertainty (model units).
    pub resolution: f64,
    pub step_schema: StepSchema,
    pub author: String,
    pub organization: String,
    pub product_name: String,
    /// Header timestamp. A fixed value keeps repeated exports byte-identical.
    pub timestamp: NaiveDateTime,
}

impl Default for InterchangeSettings {
    fn default() -> Self {
        Self {
            length_unit: LengthUnit::default(),
            resolution: 1e-7,
            step_schema: StepSchema::default(),
            author: String::new(),
            organization: String::new(),
            product_name: "Shape".to_string(),
            timestamp: NaiveDateTime::default(),
        }
    }
}

impl InterchangeSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(KernelError::InvalidSettings(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.product_name.trim().is_empty() {
            return Err(KernelError::InvalidSettings(
                "product name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

static SETTINGS: Lazy<Mutex<InterchangeSettings>> =
    Lazy::new(|| Mutex::new(InterchangeSettings::default()));

fn lock() -> MutexGuard<'static, InterchangeSettings> {
    // The settings are plain data; a panic elsewhere cannot leave them torn.
    SETTINGS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of the current global settings.
pub fn interchange_settings() -> InterchangeSettings {
    lock().clone()
}

/// Replace the global settings. Invalid settings are rejected unchanged.
pub fn set_interchange_settings(settings: InterchangeSettings) -> Result<()> {
    settings.validate()?;
    *lock() = settings;
    Ok(())
}

/// Modify the global settings in place. The change is applied only if the
/// result validates.
pub fn update_interchange_settings(f: impl FnOnce(&mut InterchangeSettings)) -> Result<()> {
    let mut guard = lock();
    let mut next = guard.clone();
    f(&mut next);
    next.validate()?;
    *guard = next;
    Ok(())
}

pub fn reset_interchange_settings() {
    *lock() = InterchangeSettings::default();
}
