//! Capabilities a spatial discretization provides to the engine.
//!
//! The engine never looks inside a discretization: it only asks for
//! assembled systems over the free DOFs, given trial values for the free
//! DOFs and the current fixed (Dirichlet) DOFs. What the returned system
//! means is up to the discretization and must match the iteration mode the
//! caller configures:
//!
//! | Form | Matrix | Right-hand side | Newton mode |
//! |------|--------|-----------------|-------------|
//! | Residual (structure, mesh) | tangent `K_t(u)` | residual `f_ext - f_int(u)` | `Update` |
//! | Next-iterate (fluid) | linearized operator `A(u)` | `b(u)`, solve `A x = b` | `Next` |

use crate::boundary::{BoundaryLayout, FixedDofs};
use crate::error::Result;
use crate::field::{FieldPatch, PatchField};
use crate::types::PatchSide;

use super::AssembledSystem;

/// A discretized field with free and fixed DOFs.
pub trait Discretization {
    /// Number of free (unknown) DOFs.
    fn num_free_dofs(&self) -> usize;

    /// Dirichlet conditions this discretization expects values for.
    fn boundary_layout(&self) -> &BoundaryLayout;

    /// Number of prescribed DOFs.
    fn num_fixed_dofs(&self) -> usize {
        self.boundary_layout().num_fixed_dofs()
    }

    /// Assemble the state-dependent system at the trial point.
    fn assemble(&mut self, free: &[f64], fixed: &FixedDofs) -> Result<AssembledSystem>;

    /// Physical field from free and fixed DOFs.
    fn construct_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField>;
}

/// A constant (state-independent) mass form.
///
/// The mass form may cover only a leading block of the unknowns, e.g. the
/// velocity DOFs of a velocity/pressure formulation.
pub trait MassForm {
    /// Number of DOFs the mass matrix acts on.
    fn num_mass_dofs(&self) -> usize;

    /// Mass matrix over free DOFs and the elimination right-hand side
    /// `-M_fD u_D` for the given fixed DOFs.
    fn assemble_mass(&mut self, fixed: &FixedDofs) -> Result<AssembledSystem>;
}

/// Linearization of the convective term `(a . grad) u`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvectiveLinearization {
    /// Transport velocity frozen: Picard / Oseen iteration
    Oseen,
    /// Full Newton linearization, assembled for the next iterate
    NewtonNext,
}

/// A mixed velocity/pressure flow discretization on a movable geometry.
///
/// Free DOFs are ordered velocity first, then pressure.
pub trait ConvectiveDiscretization: Discretization {
    /// Number of leading velocity DOFs among the free DOFs.
    fn num_velocity_dofs(&self) -> usize;

    /// Velocity field, the default transport velocity.
    fn velocity_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField>;

    /// Pressure field.
    fn pressure_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField>;

    /// Assemble with an explicit transport velocity (flow velocity minus
    /// mesh velocity on moving patches).
    fn assemble_convective(
        &mut self,
        free: &[f64],
        fixed: &FixedDofs,
        transport: &PatchField,
        linearization: ConvectiveLinearization,
    ) -> Result<AssembledSystem>;

    /// Move the geometry of one patch by a displacement with the same
    /// layout as the velocity field on that patch.
    fn displace_patch(&mut self, patch: usize, displacement: &FieldPatch) -> Result<()>;

    /// Total force the flow exerts on the given boundary sides, one entry
    /// per spatial direction.
    fn boundary_force(&self, free: &[f64], fixed: &FixedDofs, sides: &[PatchSide]) -> Result<Vec<f64>>;

    /// Pressure at a parametric point of a patch.
    fn pressure_at(&self, free: &[f64], fixed: &FixedDofs, patch: usize, point: &[f64]) -> Result<f64>;
}

/// Geometry quality of a mesh deformed by a displacement field.
pub trait MeshGeometry {
    /// First patch whose deformed Jacobian determinant is not positive
    /// everywhere, or `None` when the deformed geometry is valid.
    fn check_geometry(&self, displacement: &PatchField) -> Result<Option<usize>>;

    /// `max(det J) / min(det J)` over the deformed geometry.
    fn jacobian_ratio(&self, displacement: &PatchField) -> Result<f64>;

    /// L2 norm of a field over the reference geometry.
    fn field_norm(&self, field: &PatchField) -> Result<f64>;
}

/// Point evaluation of a field.
pub trait FieldSampler {
    /// Field value (all components) at a parametric point of a patch.
    fn evaluate(&self, field: &PatchField, patch: usize, point: &[f64]) -> Result<Vec<f64>>;
}
