//! Simulation runner implementation.

use crate::error::{FsiError, Result};
use crate::time::TimeIntegrator;

// =============================================================================
// Simulation Configuration
// =============================================================================

/// Configuration for a fixed-step run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Number of equal time steps.
    pub num_time_steps: usize,
    /// Total simulated time.
    pub time_span: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_time_steps: 100,
            time_span: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn new(num_time_steps: usize, time_span: f64) -> Self {
        Self {
            num_time_steps,
            time_span,
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_span / self.num_time_steps as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_time_steps == 0 {
            return Err(FsiError::config("at least one time step is required"));
        }
        if !(self.time_span.is_finite() && self.time_span > 0.0) {
            return Err(FsiError::config(format!(
                "time span must be positive, got {}",
                self.time_span
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Simulation Result
// =============================================================================

/// Result of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Final simulation time reached.
    pub final_time: f64,
    /// Number of time steps taken.
    pub n_steps: usize,
    /// Newton iterations summed over all steps.
    pub total_iterations: usize,
    /// Steps whose solve stopped without converging.
    pub non_converged_steps: usize,
    /// Total wall-clock time in seconds.
    pub wall_time: f64,
    /// Whether the simulation completed successfully.
    pub success: bool,
    /// Error message if simulation failed.
    pub error: Option<String>,
}

impl SimulationResult {
    /// Create a successful result.
    pub fn success(final_time: f64, n_steps: usize, total_iterations: usize, wall_time: f64) -> Self {
        Self {
            final_time,
            n_steps,
            total_iterations,
            non_converged_steps: 0,
            wall_time,
            success: true,
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(final_time: f64, n_steps: usize, error: String) -> Self {
        Self {
            final_time,
            n_steps,
            total_iterations: 0,
            non_converged_steps: 0,
            wall_time: 0.0,
            success: false,
            error: Some(error),
        }
    }
}

// =============================================================================
// Simulation Runner
// =============================================================================

/// Fixed-step driver for one time integrator.
pub struct Simulation<I: TimeIntegrator> {
    integrator: I,
    config: SimulationConfig,
}

impl<I: TimeIntegrator> Simulation<I> {
    pub fn new(integrator: I, config: SimulationConfig) -> Self {
        Self { integrator, config }
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    pub fn integrator_mut(&mut self) -> &mut I {
        &mut self.integrator
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn into_inner(self) -> I {
        self.integrator
    }

    /// Run all configured steps.
    pub fn run(&mut self) -> SimulationResult {
        self.run_with_callback(|_, _| {})
    }

    /// Run all configured steps, calling `callback` with the integrator and
    /// the time at the start and after every step.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> SimulationResult
    where
        F: FnMut(&I, f64),
    {
        if let Err(err) = self.config.validate() {
            return SimulationResult::failure(0.0, 0, err.to_string());
        }
        let start_wall = std::time::Instant::now();
        let dt = self.config.time_step();
        let mut t = 0.0;
        let mut total_iterations = 0;
        let mut non_converged = 0;

        callback(&self.integrator, t);
        log::info!(
            "Starting simulation: {} ({}, theta = {}), {} steps of dt = {:.4e}",
            self.integrator.name(),
            self.integrator.scheme().name(),
            self.integrator.theta(),
            self.config.num_time_steps,
            dt
        );

        for n in 0..self.config.num_time_steps {
            let report = match self.integrator.make_time_step(dt) {
                Ok(report) => report,
                Err(err) => return SimulationResult::failure(t, n, err.to_string()),
            };
            if !report.converged {
                non_converged += 1;
                log::warn!("Step {} did not converge: {}", n + 1, report.summary_line());
            }
            total_iterations += report.iterations;
            t = (n + 1) as f64 * dt;
            callback(&self.integrator, t);
        }

        let wall_time = start_wall.elapsed().as_secs_f64();
        log::info!(
            "Simulation complete: {} steps, {} iterations, {:.2}s wall time",
            self.config.num_time_steps,
            total_iterations,
            wall_time
        );

        let mut result = SimulationResult::success(t, self.config.num_time_steps, total_iterations, wall_time);
        result.non_converged_steps = non_converged;
        result
    }
}
