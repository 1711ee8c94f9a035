//! Trait-based time integrator abstraction.
//!
//! Every field integrator owns its discretization (through an
//! [`AssemblerAdapter`](crate::assembly::AssemblerAdapter)), its
//! [`FieldState`] and at most one checkpoint. Drivers such as
//! [`Simulation`](crate::simulation::Simulation) and the staggered coupler
//! only need the [`TimeIntegrator`] surface.
//!
//! # Example
//! ```ignore
//! use fsi_rs::time::{StructuralIntegrator, IntegratorConfig, TimeIntegrator};
//!
//! let mut structure = StructuralIntegrator::new(bar, IntegratorConfig::structural())?;
//! structure.set_displacement_vector(vec![0.0; n])?;
//! structure.save_state()?;
//! let report = structure.make_time_step(0.01)?;
//! structure.recover_state()?; // back to t = 0
//! ```

use crate::error::Result;
use crate::nonlinear::ConvergenceReport;
use crate::state::FieldState;

use super::TimeScheme;

// =============================================================================
// IntegratorInfo Trait (dyn-compatible)
// =============================================================================

/// Descriptive information about an integrator.
pub trait IntegratorInfo {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    fn scheme(&self) -> TimeScheme;

    fn theta(&self) -> f64;
}

// =============================================================================
// TimeIntegrator Trait
// =============================================================================

/// A single-field implicit time integrator.
pub trait TimeIntegrator: IntegratorInfo {
    /// Advance the field by `dt`, initializing on first use.
    ///
    /// A Newton solve that stops without converging still advances the
    /// state; the report says so and the caller decides (e.g. recover a
    /// checkpoint).
    fn make_time_step(&mut self, dt: f64) -> Result<ConvergenceReport>;

    /// Store a checkpoint, replacing any previous one.
    fn save_state(&mut self) -> Result<()>;

    /// Restore and consume the checkpoint.
    fn recover_state(&mut self) -> Result<()>;

    /// Newton iterations of the last step.
    fn number_iterations(&self) -> usize;

    fn state(&self) -> &FieldState;

    /// Number of completed steps (restored by checkpoints).
    fn steps_taken(&self) -> usize;
}

/// Lifecycle of an integrator within and between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorPhase {
    /// No initial condition processed yet
    Uninitialized,
    /// Constant forms assembled, ready to step
    Initialized,
    /// Building the constant part of the step right-hand side
    Assembling,
    /// Inside the linear or Newton solve
    Solving,
    /// At least one step completed
    Advanced,
}

impl IntegratorPhase {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }
}

/// Validate a step size.
pub(crate) fn check_step_size(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(crate::error::FsiError::config(format!(
            "time step must be positive and finite, got {}",
            dt
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase() {
        assert!(!IntegratorPhase::Uninitialized.is_initialized());
        assert!(IntegratorPhase::Solving.is_initialized());
    }

    #[test]
    fn test_step_size_check() {
        assert!(check_step_size(0.1).is_ok());
        assert!(check_step_size(0.0).is_err());
        assert!(check_step_size(f64::NAN).is_err());
        assert!(check_step_size(-1.0).is_err());
    }
}
