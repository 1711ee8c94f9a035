//! Error types for the FSI engine.

use crate::types::BoxSide;
use thiserror::Error;

/// Errors raised by assembly, solvers, integrators and the coupler.
#[derive(Debug, Error)]
pub enum FsiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Missing boundary data for patch {patch}, side {side}, component {component}")]
    MissingBoundaryData {
        patch: usize,
        side: BoxSide,
        component: usize,
    },

    #[error("No initial conditions provided for the {0}")]
    MissingInitialCondition(&'static str),

    #[error("No state saved")]
    NoSavedState,

    #[error("Linear solve failed: {0}")]
    LinearSolveFailed(String),

    #[error("{field} solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    ConvergenceFailure {
        field: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("Mesh breakdown at step {step} (t = {time:.4}): patch {patch} is no longer bijective")]
    MeshBreakdown { patch: usize, time: f64, step: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsiError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Create a linear solver failure.
    pub fn linear_solve(msg: impl Into<String>) -> Self {
        Self::LinearSolveFailed(msg.into())
    }

    /// Whether the error reports the mesh folding over.
    pub fn is_mesh_breakdown(&self) -> bool {
        matches!(self, Self::MeshBreakdown { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FsiError>;

/// Check that a slice has the expected length.
pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FsiError::dimension_mismatch(context, expected, actual))
    }
}
