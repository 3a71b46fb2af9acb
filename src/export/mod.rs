//! Shape serializers.
//!
//! Four independent writers turn a [`Shape`] into text:
//! - **BRep**: the kernel's native topology format
//! - **Debug JSON**: a structural dump with a depth limit
//! - **IGES 5.3**: trimmed surfaces (faces mode)
//! - **STEP**: ISO 10303-21 exchange structure
//!
//! Every writer fills an in-memory sink and returns its contents.
//! Kernel failures are `Err(KernelError)`. STEP additionally reports
//! transfer and write status failures by returning an empty string.

pub mod brep;
pub mod dump;
pub mod iges;
pub mod step;

pub use brep::{export_native, write_brep};
pub use dump::{dump_shape, export_debug_json};
pub use iges::{export_iges, IgesController, IgesWriter};
pub use step::{export_step, ReturnStatus, StepModelType, StepWriter};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::shape::Shape;

/// Turn a filled sink into the exported text.
pub fn into_text(sink: Vec<u8>) -> Result<String> {
    Ok(String::from_utf8(sink)?)
}

/// A serializer together with its per-call parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ExportFormat {
    Native,
    DebugJson {
        #[serde(default = "unlimited_depth")]
        depth: i32,
    },
    Iges,
    Step {
        #[serde(default)]
        mode: StepModelType,
    },
}

fn unlimited_depth() -> i32 {
    -1
}

/// Serialize `shape` in the requested format.
pub fn export(shape: &Shape, format: &ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Native => export_native(shape),
        ExportFormat::DebugJson { depth } => export_debug_json(shape, *depth),
        ExportFormat::Iges => export_iges(shape),
        ExportFormat::Step { mode } => export_step(shape, *mode),
    }
}

/// Real number with a mandatory decimal point, as STEP and IGES require.
pub(crate) fn fmt_real(value: f64) -> String {
    // Collapse -0.0 so the sign of a zero never differs between exports.
    let value = if value == 0.0 { 0.0 } else { value };
    let magnitude = value.abs();
    if value != 0.0 && !(1e-6..1e15).contains(&magnitude) {
        let s = format!("{value:E}");
        return match s.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => format!("{mantissa}.E{exponent}"),
            _ => s,
        };
    }
    let mut s = value.to_string();
    if !s.contains('.') {
        s.push('.');
    }
    s
}
