//! Pseudo-elastic mesh motion driven by interface displacements.

use crate::assembly::{AssembledSystem, AssemblerAdapter, Discretization, MeshGeometry};
use crate::boundary::{BoundaryKey, FixedDofs};
use crate::error::{FsiError, Result};
use crate::field::PatchField;
use crate::nonlinear::{ConvergenceReport, IterationMode, NewtonConfig, NewtonSolver};
use crate::types::PatchSide;

#[derive(Clone, Debug)]
struct MeshCheckpoint {
    increment: Vec<f64>,
    fixed: FixedDofs,
    total: PatchField,
    last_system: Option<AssembledSystem>,
}

/// Mesh-motion field solved incrementally: each call imposes an interface
/// displacement increment, performs one Newton iteration from the previous
/// increment and adds the result to the total mesh displacement.
pub struct MeshMotion<M> {
    assembler: AssemblerAdapter<M>,
    solver: NewtonSolver,
    increment: Vec<f64>,
    fixed: FixedDofs,
    total: PatchField,
    checkpoint: Option<MeshCheckpoint>,
}

impl<M: Discretization + MeshGeometry> MeshMotion<M> {
    pub fn new(discretization: M) -> Result<Self> {
        let n = discretization.num_free_dofs();
        let fixed = discretization.boundary_layout().zeros();
        let total = discretization.construct_field(&vec![0.0; n], &fixed)?;
        Ok(Self {
            assembler: AssemblerAdapter::new(discretization),
            solver: NewtonSolver::new(
                NewtonConfig::default()
                    .with_max_iters(1)
                    .with_mode(IterationMode::Update),
            ),
            increment: vec![0.0; n],
            fixed,
            total,
            checkpoint: None,
        })
    }

    /// Replace the Newton configuration (mode is forced to `Update`).
    pub fn with_newton(mut self, config: NewtonConfig) -> Self {
        self.solver = NewtonSolver::new(config.with_mode(IterationMode::Update));
        self
    }

    pub fn discretization(&self) -> &M {
        self.assembler.discretization()
    }

    /// Accumulated mesh displacement.
    pub fn total_displacement(&self) -> &PatchField {
        &self.total
    }

    /// Prescribe the displacement increment on a mesh side.
    pub fn set_interface_increment(&mut self, at: PatchSide, components: &[Vec<f64>]) -> Result<()> {
        for (component, values) in components.iter().enumerate() {
            let key = BoundaryKey::new(at.patch, at.side, component);
            self.assembler.boundary_layout().validate_entry(&key, values)?;
            self.fixed.insert(key, values.clone());
        }
        Ok(())
    }

    /// Solve for the displacement increment under the current interface data.
    pub fn solve_increment(&mut self) -> Result<(PatchField, ConvergenceReport)> {
        let (increment, report) = self
            .solver
            .solve(&mut self.assembler, &self.increment, &self.fixed)?;
        let field = self.assembler.construct_field(&increment, &self.fixed)?;
        self.increment = increment;
        Ok((field, report))
    }

    /// Total displacement after adding `delta`, and the first patch whose
    /// geometry would fold, if any.
    pub fn candidate(&self, delta: &PatchField) -> Result<(PatchField, Option<usize>)> {
        let mut candidate = self.total.clone();
        candidate.add_scaled(1.0, delta)?;
        let folded = self.discretization().check_geometry(&candidate)?;
        Ok((candidate, folded))
    }

    pub fn commit(&mut self, total: PatchField) -> Result<()> {
        if total.n_patches() != self.total.n_patches() {
            return Err(FsiError::dimension_mismatch(
                "mesh displacement patches",
                self.total.n_patches(),
                total.n_patches(),
            ));
        }
        self.total = total;
        Ok(())
    }

    /// Remember the increment, interface data and total displacement.
    pub fn save_state(&mut self) {
        self.checkpoint = Some(MeshCheckpoint {
            increment: self.increment.clone(),
            fixed: self.fixed.clone(),
            total: self.total.clone(),
            last_system: self.assembler.last_system().cloned(),
        });
    }

    /// Return to the last saved state, consuming it.
    pub fn recover_state(&mut self) -> Result<()> {
        let checkpoint = self.checkpoint.take().ok_or(FsiError::NoSavedState)?;
        self.increment = checkpoint.increment;
        self.fixed = checkpoint.fixed;
        self.total = checkpoint.total;
        self.assembler.restore_last(checkpoint.last_system);
        Ok(())
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Norm of the accumulated displacement.
    pub fn displacement_norm(&self) -> Result<f64> {
        self.discretization().field_norm(&self.total)
    }

    /// `max(det J) / min(det J)` of the accumulated displacement.
    pub fn quality(&self) -> Result<f64> {
        self.discretization().jacobian_ratio(&self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarMaterial, ElasticBar1D};
    use crate::types::BoxSide;

    fn mesh() -> MeshMotion<ElasticBar1D> {
        let bar = ElasticBar1D::new(0.0, 1.0, 4, BarMaterial::default())
            .with_dirichlet(BoxSide::West)
            .with_dirichlet(BoxSide::East);
        MeshMotion::new(bar).unwrap()
    }

    #[test]
    fn test_increment_spreads_linearly() {
        let mut motion = mesh();
        motion
            .set_interface_increment(PatchSide::new(0, BoxSide::West), &[vec![0.2]])
            .unwrap();
        let (delta, report) = motion.solve_increment().unwrap();
        assert!(report.converged);
        let coefs = delta.patch(0).unwrap().coefs();
        for (i, c) in coefs.iter().enumerate() {
            let expected = 0.2 * (1.0 - i as f64 / 4.0);
            assert!((c - expected).abs() < 1e-12, "node {}: {} vs {}", i, c, expected);
        }

        let (candidate, folded) = motion.candidate(&delta).unwrap();
        assert_eq!(folded, None);
        motion.commit(candidate).unwrap();
        assert!(motion.displacement_norm().unwrap() > 0.0);
        assert!(motion.quality().unwrap() >= 1.0);
    }

    #[test]
    fn test_folding_candidate_is_reported() {
        let mut motion = mesh();
        motion
            .set_interface_increment(PatchSide::new(0, BoxSide::West), &[vec![1.5]])
            .unwrap();
        let (delta, _) = motion.solve_increment().unwrap();
        let (_, folded) = motion.candidate(&delta).unwrap();
        assert_eq!(folded, Some(0));
    }

    #[test]
    fn test_recover_state_undoes_commit() {
        let mut motion = mesh();
        motion.save_state();
        motion
            .set_interface_increment(PatchSide::new(0, BoxSide::West), &[vec![0.2]])
            .unwrap();
        let (delta, _) = motion.solve_increment().unwrap();
        let (candidate, _) = motion.candidate(&delta).unwrap();
        motion.commit(candidate).unwrap();
        assert!(motion.displacement_norm().unwrap() > 0.0);

        motion.recover_state().unwrap();
        assert!(!motion.has_checkpoint());
        assert!(motion.total_displacement().patch(0).unwrap().coefs().iter().all(|c| *c == 0.0));

        // the next increment starts from the restored interface data
        let (delta, _) = motion.solve_increment().unwrap();
        assert!(delta.patch(0).unwrap().coefs().iter().all(|c| c.abs() < 1e-14));
        assert!(matches!(motion.recover_state(), Err(FsiError::NoSavedState)));
    }

    #[test]
    fn test_rejects_unknown_side() {
        let mut motion = mesh();
        assert!(
            motion
                .set_interface_increment(PatchSide::new(0, BoxSide::North), &[vec![0.1]])
                .is_err()
        );
    }
}
