//! Time integrator configuration.

use crate::error::{FsiError, Result};
use crate::nonlinear::{IterationMode, NewtonConfig};

/// How the implicit step equations are solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeScheme {
    /// One linear solve per step on a linearization about the extrapolated state
    ImplicitLinear,
    /// Full Newton iteration per step
    ImplicitNonlinear,
}

impl TimeScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImplicitLinear => "implicit linear",
            Self::ImplicitNonlinear => "implicit nonlinear",
        }
    }
}

/// Settings shared by the structural and fluid integrators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegratorConfig {
    pub scheme: TimeScheme,
    /// Implicitness in `[0, 1]`: 0 explicit Euler, 0.5 Crank-Nicolson, 1 implicit Euler
    pub theta: f64,
    pub newton: NewtonConfig,
}

impl IntegratorConfig {
    /// Structural default: implicit-linear, implicit Euler, increment form.
    pub fn structural() -> Self {
        Self {
            scheme: TimeScheme::ImplicitLinear,
            theta: 1.0,
            newton: NewtonConfig::default().with_mode(IterationMode::Update),
        }
    }

    /// Fluid default: implicit-nonlinear Crank-Nicolson, next-iterate form.
    pub fn fluid() -> Self {
        Self {
            scheme: TimeScheme::ImplicitNonlinear,
            theta: 0.5,
            newton: NewtonConfig::default().with_mode(IterationMode::Next),
        }
    }

    pub fn with_scheme(mut self, scheme: TimeScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    /// Check ranges and that the Newton mode matches the system form the
    /// integrator assembles.
    pub fn validate(&self, expected_mode: IterationMode) -> Result<()> {
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(FsiError::config(format!("theta must lie in [0, 1], got {}", self.theta)));
        }
        if self.newton.mode != expected_mode {
            return Err(FsiError::config(format!(
                "integrator assembles systems for {:?} iteration but Newton is configured for {:?}",
                expected_mode, self.newton.mode
            )));
        }
        self.newton.validate()
    }
}
