//! Staggered fluid-structure coupling.
//!
//! | Type | Role |
//! |------|------|
//! | [`CouplerConfig`] | Step sizes, warm-up, ramp, export density |
//! | [`MeshMotion`] | Incremental pseudo-elastic mesh solve with fold detection |
//! | [`StaggeredCoupler`] | Structure → mesh → flow macro steps |
//! | [`InterfaceMap`] | Which sides feed which between the fields |
//! | [`MonitorConfig`] | Forces and points sampled into each [`StepRecord`](crate::diagnostics::StepRecord) |
//!
//! # Example
//! ```ignore
//! use fsi_rs::coupling::{CouplerConfig, InterfaceMap, MeshMotion, StaggeredCoupler};
//!
//! let config = CouplerConfig::new(0.01, 3.0).with_warm_up(true);
//! let mut coupler = StaggeredCoupler::new(structure, MeshMotion::new(mesh)?, fluid, interface, config)?
//!     .with_log_file("fsi.log")?;
//! coupler.ramp_boundary(0, BoxSide::East)?;
//! let summary = coupler.run()?;
//! ```

mod config;
mod coupler;
mod mesh_motion;

pub use config::{CouplerConfig, cosine_ramp};
pub use coupler::{
    CouplingSummary, InterfaceMap, MonitorConfig, SamplePoint, RampedBoundary, StaggeredCoupler,
};
pub use mesh_motion::MeshMotion;
