//! brepio: boundary-representation shapes and their interchange writers.
//!
//! A [`Shape`] is an immutable, cheaply cloned view of a topology store
//! (vertices, edges, wires, faces, shells, solids and compounds over analytic
//! curves and surfaces). It can be serialized as:
//!
//! - native BRep text ([`export_native`])
//! - a depth-limited JSON structure dump ([`export_debug_json`])
//! - IGES 5.3 ([`export_iges`])
//! - STEP ([`export_step`])
//!
//! Kernel failures surface as [`KernelError`]. Callers on the far side of a
//! foreign boundary receive a [`FailureHandle`] and read it back with
//! [`describe_failure`].

pub mod builder;
pub mod curve;
pub mod error;
pub mod export;
pub mod failure;
pub mod math;
pub mod primitive;
pub mod settings;
pub mod shape;
pub mod surface;
pub mod topo;

pub use builder::ShapeBuilder;
pub use error::{KernelError, Result};
pub use export::{
    export, export_debug_json, export_iges, export_native, export_step, ExportFormat, ReturnStatus,
    StepModelType,
};
pub use failure::{catch_failure, describe_failure, release, FailureHandle, FailureView};
pub use settings::{InterchangeSettings, LengthUnit, StepSchema};
pub use shape::Shape;
