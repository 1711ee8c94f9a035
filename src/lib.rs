//! # fsi-rs
//!
//! Time integration and staggered coupling for fluid-structure interaction
//! on top of abstract finite-element discretizations.
//!
//! This crate provides:
//! - An assembler adapter that caches the constant and state-dependent
//!   systems of a discretization
//! - A Newton solver over any system assembler (increment or next-iterate form)
//! - Theta-scheme integrators for structural dynamics and incompressible flow,
//!   the latter on moving (ALE) domains
//! - A staggered structure → mesh → flow coupler with warm-up, ramped
//!   boundary data, fold detection and a per-step diagnostic log
//! - Small 1D reference discretizations (elastic bar, channel flow)

pub mod assembly;
pub mod boundary;
pub mod coupling;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod field;
pub mod linalg;
pub mod models;
pub mod nonlinear;
pub mod simulation;
pub mod state;
pub mod time;
pub mod types;

// Re-export main types for convenience
pub use assembly::{
    AssembledSystem, AssemblerAdapter, ConvectiveDiscretization, ConvectiveLinearization,
    Discretization, FieldSampler, MassForm, MeshGeometry, SystemAssembler,
};
pub use boundary::{BoundaryKey, BoundaryLayout, CouplingLink, FixedDofs, PatchLink};
pub use coupling::{
    CouplerConfig, CouplingSummary, InterfaceMap, MeshMotion, MonitorConfig, SamplePoint,
    StaggeredCoupler,
};
pub use diagnostics::{DiagnosticLog, StepRecord};
pub use error::{FsiError, Result};
pub use field::{FieldPatch, PatchField};
pub use linalg::{LinearSolverKind, SparseMatrix};
pub use nonlinear::{ConvergenceReport, IterationMode, NewtonConfig, NewtonSolver};
pub use state::FieldState;
pub use time::{
    AleCoupling, FluidIntegrator, IntegratorConfig, StructuralIntegrator, TimeIntegrator,
    TimeScheme,
};
pub use types::{BoxSide, PatchSide};
