//! Implicit time integration of single fields.
//!
//! | Integrator | Field | Unknowns | Newton mode |
//! |------------|-------|----------|-------------|
//! | [`StructuralIntegrator`] | structure | displacement (+ pressure), velocity state | `Update` |
//! | [`FluidIntegrator`] | flow | velocity + pressure | `Next` |
//!
//! Both use a theta scheme, extrapolate the Newton seed from the last two
//! states and keep a single consumable checkpoint.

mod config;
mod fluid;
mod integrator;
mod structural;

pub use config::{IntegratorConfig, TimeScheme};
pub use fluid::{AleCoupling, FluidIntegrator};
pub use integrator::{IntegratorInfo, IntegratorPhase, TimeIntegrator};
pub use structural::StructuralIntegrator;
