//! Concrete one-dimensional discretizations.
//!
//! | Model | Field | Capabilities |
//! |-------|-------|--------------|
//! | [`ElasticBar1D`] | structure or mesh motion | `Discretization`, `MassForm`, `MeshGeometry`, `FieldSampler` |
//! | [`ChannelFlow1D`] | flow | `ConvectiveDiscretization`, `MassForm` |
//!
//! Both live on a movable [`Mesh1D`] and expose a single patch with a
//! `West` and an `East` side, which is enough to couple a bar, a mesh and a
//! channel end to end.

mod bar_1d;
mod channel_1d;
mod mesh1d;

pub use bar_1d::{BarMaterial, ElasticBar1D};
pub use channel_1d::{ChannelFlow1D, FlowProperties};
pub use mesh1d::Mesh1D;
