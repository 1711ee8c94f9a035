//! Newton iteration over a [`SystemAssembler`].
//!
//! Two iteration modes cover the two system forms discretizations produce:
//!
//! - **Update**: the system is `K_t(x) dx = r(x)`; the residual norm is
//!   `||r(x)||` and the new iterate is `x + dx`.
//! - **Next**: the system is `A(x) y = b(x)` for the next iterate directly
//!   (Oseen / Newton-next); the residual norm is `||A(x) x - b(x)||` and the
//!   new iterate is `y`.
//!
//! The system is assembled at every iterate, including the last one, so the
//! assembler cache always holds the system at the returned solution. A
//! linear problem therefore converges after exactly one linear solve.
//!
//! # Convergence Criteria
//!
//! After at least one update the iteration stops when any of
//!
//! - `||res|| <= abs_tol`
//! - `||res|| / ||res_0|| <= rel_tol`
//! - `||dx|| <= abs_tol`
//! - `||dx|| / ||dx_0|| <= rel_tol` (from the second update on)
//!
//! holds. Reaching `max_iters` without convergence is reported, not raised.

use crate::assembly::SystemAssembler;
use crate::boundary::FixedDofs;
use crate::error::{FsiError, Result, check_len};
use crate::linalg::vector::{norm2, sub};
use crate::linalg::{LinearSolverKind, solve_linear_system};

/// What the assembled system solves for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IterationMode {
    /// The solution of the linear system is the next iterate
    Next,
    /// The solution of the linear system is an increment
    #[default]
    Update,
}

// =============================================================================
// Configuration
// =============================================================================

/// Newton solver settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Absolute tolerance on residual and update norms
    pub abs_tol: f64,
    /// Tolerance relative to the first residual and update norms
    pub rel_tol: f64,
    /// Maximum number of linear solves
    pub max_iters: usize,
    pub mode: IterationMode,
    pub linear_solver: LinearSolverKind,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            abs_tol: 1e-10,
            rel_tol: 1e-7,
            max_iters: 50,
            mode: IterationMode::Update,
            linear_solver: LinearSolverKind::SparseLu,
        }
    }
}

impl NewtonConfig {
    pub fn new(abs_tol: f64, rel_tol: f64, max_iters: usize) -> Self {
        Self {
            abs_tol,
            rel_tol,
            max_iters,
            ..Default::default()
        }
    }

    pub fn with_tolerances(mut self, abs_tol: f64, rel_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_mode(mut self, mode: IterationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_linear_solver(mut self, linear_solver: LinearSolverKind) -> Self {
        self.linear_solver = linear_solver;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iters == 0 {
            return Err(FsiError::config("Newton max_iters must be at least 1"));
        }
        let tol_ok = |t: f64| t.is_finite() && t >= 0.0;
        if !tol_ok(self.abs_tol) || !tol_ok(self.rel_tol) {
            return Err(FsiError::config(format!(
                "Newton tolerances must be finite and non-negative (abs {}, rel {})",
                self.abs_tol, self.rel_tol
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of a Newton solve.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceReport {
    pub converged: bool,
    /// Number of linear solves performed
    pub iterations: usize,
    /// Residual norm at the returned solution
    pub last_residual_norm: f64,
    /// Residual norm at the initial guess
    pub initial_residual_norm: f64,
}

impl ConvergenceReport {
    /// Report for a single direct solve.
    pub fn single_solve(residual_norm: f64) -> Self {
        Self {
            converged: true,
            iterations: 1,
            last_residual_norm: residual_norm,
            initial_residual_norm: residual_norm,
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} after {} iterations, residual {:.3e} (initial {:.3e})",
            if self.converged { "converged" } else { "NOT converged" },
            self.iterations,
            self.last_residual_norm,
            self.initial_residual_norm
        )
    }
}

// =============================================================================
// Solver
// =============================================================================

/// Newton-type iteration driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewtonSolver {
    config: NewtonConfig,
}

impl NewtonSolver {
    pub fn new(config: NewtonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    /// Iterate from `initial` with the fixed DOFs held constant.
    pub fn solve<A>(&self, assembler: &mut A, initial: &[f64], fixed: &FixedDofs) -> Result<(Vec<f64>, ConvergenceReport)>
    where
        A: SystemAssembler + ?Sized,
    {
        self.config.validate()?;
        check_len("Newton initial guess", assembler.num_free_dofs(), initial.len())?;

        let mut x = initial.to_vec();
        let mut iterations = 0usize;
        let mut initial_residual: Option<f64> = None;
        let mut initial_update: Option<f64> = None;
        let mut update_norm = f64::INFINITY;

        loop {
            let system = assembler.assemble(&x, fixed)?;
            let residual = match self.config.mode {
                IterationMode::Update => system.rhs_norm(),
                IterationMode::Next => system.residual_norm(&x)?,
            };
            let residual_0 = *initial_residual.get_or_insert(residual);

            if iterations > 0 && self.is_converged(iterations, residual, residual_0, update_norm, initial_update) {
                log::debug!(
                    "Newton converged in {} iterations, residual {:.3e}",
                    iterations,
                    residual
                );
                return Ok((x, self.report(true, iterations, residual, residual_0)));
            }

            if iterations >= self.config.max_iters {
                if self.config.max_iters > 1 {
                    log::warn!(
                        "Newton did not converge in {} iterations (residual {:.3e}, initial {:.3e})",
                        iterations,
                        residual,
                        residual_0
                    );
                }
                return Ok((x, self.report(false, iterations, residual, residual_0)));
            }

            let solution = solve_linear_system(self.config.linear_solver, &system.matrix, &system.rhs)?;
            match self.config.mode {
                IterationMode::Update => {
                    update_norm = norm2(&solution);
                    x.iter_mut().zip(&solution).for_each(|(xi, dxi)| *xi += dxi);
                }
                IterationMode::Next => {
                    update_norm = norm2(&sub(&solution, &x));
                    x = solution;
                }
            }
            initial_update.get_or_insert(update_norm);
            iterations += 1;

            log::trace!(
                "Newton iteration {}: residual {:.3e}, update {:.3e}",
                iterations,
                residual,
                update_norm
            );
        }
    }

    fn is_converged(
        &self,
        iterations: usize,
        residual: f64,
        residual_0: f64,
        update_norm: f64,
        update_0: Option<f64>,
    ) -> bool {
        let tol = &self.config;
        if residual <= tol.abs_tol || update_norm <= tol.abs_tol {
            return true;
        }
        if residual_0 > 0.0 && residual / residual_0 <= tol.rel_tol {
            return true;
        }
        match update_0 {
            Some(u0) if iterations > 1 && u0 > 0.0 => update_norm / u0 <= tol.rel_tol,
            _ => false,
        }
    }

    fn report(&self, converged: bool, iterations: usize, residual: f64, residual_0: f64) -> ConvergenceReport {
        ConvergenceReport {
            converged,
            iterations,
            last_residual_norm: residual,
            initial_residual_norm: residual_0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::AssembledSystem;
    use crate::linalg::sparse::diagonal;

    /// Scalar problem `x^3 + x - c = 0` in update form.
    struct Cubic {
        c: f64,
        system: Option<AssembledSystem>,
    }

    impl SystemAssembler for Cubic {
        fn num_free_dofs(&self) -> usize {
            1
        }

        fn num_fixed_dofs(&self) -> usize {
            0
        }

        fn assemble(&mut self, trial: &[f64], _fixed: &FixedDofs) -> Result<&AssembledSystem> {
            let x = trial[0];
            let tangent = diagonal(&[3.0 * x * x + 1.0]);
            let residual = vec![self.c - x * x * x - x];
            Ok(self.system.insert(AssembledSystem::new(tangent, residual)?))
        }
    }

    #[test]
    fn test_cubic_converges() {
        let mut problem = Cubic { c: 10.0, system: None };
        let solver = NewtonSolver::new(NewtonConfig::default().with_tolerances(1e-12, 1e-12));
        let (x, report) = solver.solve(&mut problem, &[0.0], &FixedDofs::new()).unwrap();

        assert!(report.converged, "{}", report.summary_line());
        assert!((x[0] - 2.0).abs() < 1e-10, "x = {}", x[0]);
        assert!(report.iterations > 1 && report.iterations < 20);
    }

    #[test]
    fn test_max_iters_reports_non_convergence() {
        let mut problem = Cubic { c: 10.0, system: None };
        let solver = NewtonSolver::new(NewtonConfig::default().with_max_iters(2));
        let (_, report) = solver.solve(&mut problem, &[0.0], &FixedDofs::new()).unwrap();

        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert!(report.last_residual_norm > 0.0);
    }

    #[test]
    fn test_rejects_wrong_initial_length() {
        let mut problem = Cubic { c: 1.0, system: None };
        let result = NewtonSolver::default().solve(&mut problem, &[0.0, 1.0], &FixedDofs::new());
        assert!(matches!(result, Err(FsiError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_config_validation() {
        assert!(NewtonConfig::default().validate().is_ok());
        assert!(NewtonConfig::default().with_max_iters(0).validate().is_err());
        assert!(NewtonConfig::default().with_tolerances(-1.0, 1e-7).validate().is_err());
    }
}
