//! Caching, validating front end to a discretization.
//!
//! [`AssemblerAdapter`] owns a discretization, checks every request against
//! its DOF counts and boundary layout, and keeps the most recent state
//! system and constant (mass) system for inspection and checkpointing.
//!
//! # Example
//!
//! ```ignore
//! use fsi_rs::assembly::{AssemblerAdapter, SystemAssembler};
//! use fsi_rs::models::{BarMaterial, ElasticBar1D};
//! use fsi_rs::types::BoxSide;
//!
//! let bar = ElasticBar1D::new(0.0, 1.0, 8, BarMaterial::default()).with_dirichlet(BoxSide::West);
//! let mut adapter = AssemblerAdapter::new(bar);
//! let fixed = adapter.boundary_layout().zeros();
//! let system = adapter.assemble(&vec![0.0; 8], &fixed)?;
//! assert_eq!(system.matrix.nrows(), 8);
//! ```

use crate::boundary::{BoundaryLayout, FixedDofs};
use crate::error::{FsiError, Result, check_len};
use crate::field::PatchField;
use crate::linalg::SparseMatrix;

use super::{AssembledSystem, ConvectiveDiscretization, ConvectiveLinearization, Discretization, MassForm};

/// Anything that can produce a square system at a trial point.
///
/// This is the single capability the Newton solver consumes; integrators
/// expose their per-step systems through it.
pub trait SystemAssembler {
    fn num_free_dofs(&self) -> usize;

    fn num_fixed_dofs(&self) -> usize;

    /// Assemble at `trial` with the given fixed DOFs.
    fn assemble(&mut self, trial: &[f64], fixed: &FixedDofs) -> Result<&AssembledSystem>;
}

/// Wrapper around a [`Discretization`] with validation and caching.
#[derive(Clone, Debug)]
pub struct AssemblerAdapter<D> {
    discretization: D,
    last: Option<AssembledSystem>,
    constant: Option<AssembledSystem>,
}

impl<D: Discretization> AssemblerAdapter<D> {
    pub fn new(discretization: D) -> Self {
        Self {
            discretization,
            last: None,
            constant: None,
        }
    }

    pub fn discretization(&self) -> &D {
        &self.discretization
    }

    /// Mutable access to the discretization, e.g. to move its geometry.
    pub fn discretization_mut(&mut self) -> &mut D {
        &mut self.discretization
    }

    pub fn into_inner(self) -> D {
        self.discretization
    }

    pub fn boundary_layout(&self) -> &BoundaryLayout {
        self.discretization.boundary_layout()
    }

    /// Validate a free/fixed DOF pair against the discretization.
    pub fn check_trial(&self, free: &[f64], fixed: &FixedDofs) -> Result<()> {
        check_len("free dofs", self.discretization.num_free_dofs(), free.len())?;
        self.boundary_layout().validate(fixed)
    }

    /// Most recent state system.
    pub fn last_system(&self) -> Option<&AssembledSystem> {
        self.last.as_ref()
    }

    pub fn last_matrix(&self) -> Option<&SparseMatrix> {
        self.last.as_ref().map(|s| &s.matrix)
    }

    pub fn last_rhs(&self) -> Option<&[f64]> {
        self.last.as_ref().map(|s| s.rhs.as_slice())
    }

    /// Most recent constant system.
    pub fn constant_system(&self) -> Option<&AssembledSystem> {
        self.constant.as_ref()
    }

    /// Put back a previously cached state system (checkpoint restore).
    pub fn restore_last(&mut self, system: Option<AssembledSystem>) {
        self.last = system;
    }

    /// Physical field from free and fixed DOFs.
    pub fn construct_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField> {
        self.check_trial(free, fixed)?;
        self.discretization.construct_field(free, fixed)
    }

    fn store(&mut self, system: AssembledSystem) -> Result<&AssembledSystem> {
        let n = self.discretization.num_free_dofs();
        check_shape("state system", &system, n, n)?;
        Ok(self.last.insert(system))
    }
}

impl<D: Discretization + MassForm> AssemblerAdapter<D> {
    /// Assemble the constant (mass) form for the given fixed DOFs.
    pub fn assemble_constant(&mut self, fixed: &FixedDofs) -> Result<&AssembledSystem> {
        self.boundary_layout().validate(fixed)?;
        let n_mass = self.discretization.num_mass_dofs();
        if n_mass > self.discretization.num_free_dofs() {
            return Err(FsiError::config(format!(
                "mass form covers {} dofs but only {} are free",
                n_mass,
                self.discretization.num_free_dofs()
            )));
        }
        let system = self.discretization.assemble_mass(fixed)?;
        check_shape("mass system", &system, n_mass, n_mass)?;
        Ok(self.constant.insert(system))
    }
}

impl<D: ConvectiveDiscretization> AssemblerAdapter<D> {
    /// Assemble the flow system with an explicit transport velocity.
    pub fn assemble_with_transport(
        &mut self,
        free: &[f64],
        fixed: &FixedDofs,
        transport: &PatchField,
        linearization: ConvectiveLinearization,
    ) -> Result<&AssembledSystem> {
        self.check_trial(free, fixed)?;
        let system = self
            .discretization
            .assemble_convective(free, fixed, transport, linearization)?;
        self.store(system)
    }
}

impl<D: Discretization> SystemAssembler for AssemblerAdapter<D> {
    fn num_free_dofs(&self) -> usize {
        self.discretization.num_free_dofs()
    }

    fn num_fixed_dofs(&self) -> usize {
        self.discretization.num_fixed_dofs()
    }

    fn assemble(&mut self, trial: &[f64], fixed: &FixedDofs) -> Result<&AssembledSystem> {
        self.check_trial(trial, fixed)?;
        let system = self.discretization.assemble(trial, fixed)?;
        self.store(system)
    }
}

fn check_shape(context: &'static str, system: &AssembledSystem, rows: usize, cols: usize) -> Result<()> {
    check_len(context, rows, system.matrix.nrows())?;
    check_len(context, cols, system.matrix.ncols())?;
    check_len(context, rows, system.rhs.len())
}
