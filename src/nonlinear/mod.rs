//! Nonlinear solvers.

mod newton;

pub use newton::{ConvergenceReport, IterationMode, NewtonConfig, NewtonSolver};
