//! Dirichlet boundary data and inter-field boundary correspondences.
//!
//! | Type | Role |
//! |------|------|
//! | [`BoundaryKey`] | `(patch, side, component)` address of a fixed-DOF block |
//! | [`FixedDofs`] | Prescribed values of one field, replaced entry by entry |
//! | [`BoundaryLayout`] | Conditions a discretization declares, with sizes |
//! | [`CouplingLink`] | Source side of one field feeding a target side of another |
//! | [`PatchLink`] | Whole-patch correspondence (ALE geometry and velocity) |

mod fixed_dofs;
mod links;

pub use fixed_dofs::{BoundaryKey, BoundaryLayout, FixedDofs};
pub use links::{CouplingLink, PatchLink};
