//! Time-stepping configuration of a coupled run.

use crate::error::{FsiError, Result};

/// Tolerance of the time comparisons against accumulated simulation time.
pub(crate) const TIME_EPS: f64 = 1e-9;

/// Configuration for a staggered coupled run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplerConfig {
    /// Fine (production) step size
    pub time_step: f64,
    /// End time of the run
    pub time_span: f64,
    /// Use a coarse step and ramp boundary data at the start
    pub warm_up: bool,
    /// Step size while warming up
    pub warm_up_step: f64,
    /// Simulation time until which the coarse step is used
    pub warm_up_duration: f64,
    /// Period of the cosine ramp on ramped boundary data
    pub ramp_duration: f64,
    /// Export sample density; 0 disables export
    pub plot_density: usize,
    /// Treat a non-converged field solve as fatal
    pub abort_on_divergence: bool,
    /// Log progress every N percent of the time span
    pub progress_interval_pct: u32,
}

impl Default for CouplerConfig {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            time_span: 3.0,
            warm_up: false,
            warm_up_step: 0.1,
            warm_up_duration: 2.0,
            ramp_duration: 2.0,
            plot_density: 0,
            abort_on_divergence: true,
            progress_interval_pct: 10,
        }
    }
}

impl CouplerConfig {
    pub fn new(time_step: f64, time_span: f64) -> Self {
        Self {
            time_step,
            time_span,
            ..Self::default()
        }
    }

    /// Enable the warm-up phase with the default coarse step and ramp.
    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn with_warm_up_step(mut self, step: f64, duration: f64) -> Self {
        self.warm_up_step = step;
        self.warm_up_duration = duration;
        self
    }

    pub fn with_ramp_duration(mut self, duration: f64) -> Self {
        self.ramp_duration = duration;
        self
    }

    pub fn with_plot_density(mut self, density: usize) -> Self {
        self.plot_density = density;
        self
    }

    pub fn with_abort_on_divergence(mut self, abort: bool) -> Self {
        self.abort_on_divergence = abort;
        self
    }

    pub fn with_progress_interval(mut self, pct: u32) -> Self {
        self.progress_interval_pct = pct;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(FsiError::config(format!("{} must be positive, got {}", name, value)))
            }
        };
        positive("time step", self.time_step)?;
        positive("time span", self.time_span)?;
        positive("ramp duration", self.ramp_duration)?;
        if self.warm_up {
            positive("warm-up step", self.warm_up_step)?;
            if self.warm_up_duration.is_nan() || self.warm_up_duration < 0.0 {
                return Err(FsiError::config(format!(
                    "warm-up duration must be non-negative, got {}",
                    self.warm_up_duration
                )));
            }
        }
        if self.progress_interval_pct == 0 || self.progress_interval_pct > 100 {
            return Err(FsiError::config(format!(
                "progress interval must be in 1..=100 percent, got {}",
                self.progress_interval_pct
            )));
        }
        Ok(())
    }

    /// Step size to use from simulation time `t`.
    pub fn effective_step(&self, t: f64) -> f64 {
        if self.warm_up && t < self.warm_up_duration - TIME_EPS {
            self.warm_up_step
        } else {
            self.time_step
        }
    }

    /// Factor applied to ramped boundary data at time `t`.
    ///
    /// The ramp is independent of the warm-up phase: a ramped boundary
    /// starts from zero whether or not coarse steps are taken.
    pub fn ramp_factor(&self, t: f64) -> f64 {
        cosine_ramp(t, self.ramp_duration)
    }
}

/// `(1 - cos(pi t / period)) / 2` for `t < period`, 1 afterwards.
pub fn cosine_ramp(t: f64, period: f64) -> f64 {
    if t <= 0.0 {
        0.0
    } else if t < period {
        0.5 * (1.0 - (std::f64::consts::PI * t / period).cos())
    } else {
        1.0
    }
}
