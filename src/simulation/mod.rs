//! Single-field simulation runner.
//!
//! Drives any [`TimeIntegrator`](crate::time::TimeIntegrator) with a fixed
//! step size over a time span, with an optional per-step callback.
//!
//! # Example
//! ```ignore
//! use fsi_rs::simulation::{Simulation, SimulationConfig};
//!
//! let result = Simulation::new(structure, SimulationConfig::new(100, 10.0))
//!     .run_with_callback(|integrator, time| println!("t = {:.2}", time));
//! assert!(result.success);
//! ```

mod runner;

pub use runner::{Simulation, SimulationConfig, SimulationResult};
