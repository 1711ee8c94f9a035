//! Per-field solution state.
//!
//! A [`FieldState`] holds the current free DOFs, the fixed DOFs they were
//! computed with, and the previous step's free DOFs and step size used for
//! linear extrapolation of the next Newton seed.

use crate::boundary::FixedDofs;

/// Solution state of one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    free_dofs: Vec<f64>,
    fixed_dofs: FixedDofs,
    previous_free_dofs: Vec<f64>,
    previous_step_size: f64,
}

impl FieldState {
    /// Initial state; the previous solution equals the current one and the
    /// previous step size is 1.
    pub fn new(free_dofs: Vec<f64>, fixed_dofs: FixedDofs) -> Self {
        Self {
            previous_free_dofs: free_dofs.clone(),
            free_dofs,
            fixed_dofs,
            previous_step_size: 1.0,
        }
    }

    pub fn free_dofs(&self) -> &[f64] {
        &self.free_dofs
    }

    pub fn fixed_dofs(&self) -> &FixedDofs {
        &self.fixed_dofs
    }

    pub fn previous_free_dofs(&self) -> &[f64] {
        &self.previous_free_dofs
    }

    pub fn previous_step_size(&self) -> f64 {
        self.previous_step_size
    }

    pub fn num_free_dofs(&self) -> usize {
        self.free_dofs.len()
    }

    /// Whether an initial condition has been supplied.
    pub fn is_set(&self) -> bool {
        !self.free_dofs.is_empty()
    }

    /// `u_n + (dt / dt_prev) (u_n - u_{n-1})`.
    pub fn extrapolate(&self, dt: f64) -> Vec<f64> {
        let ratio = dt / self.previous_step_size;
        self.free_dofs
            .iter()
            .zip(&self.previous_free_dofs)
            .map(|(u, u_old)| u + ratio * (u - u_old))
            .collect()
    }

    /// Replace the current solution and reset the history to it.
    pub(crate) fn reset(&mut self, free_dofs: Vec<f64>) {
        self.previous_free_dofs = free_dofs.clone();
        self.free_dofs = free_dofs;
        self.previous_step_size = 1.0;
    }

    /// Accept a new solution computed with step size `dt`.
    pub(crate) fn advance(&mut self, free_dofs: Vec<f64>, dt: f64) {
        self.previous_free_dofs = std::mem::replace(&mut self.free_dofs, free_dofs);
        self.previous_step_size = dt;
    }

    pub(crate) fn fixed_dofs_mut(&mut self) -> &mut FixedDofs {
        &mut self.fixed_dofs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_history() {
        let state = FieldState::new(vec![1.0, 2.0], FixedDofs::new());
        assert_eq!(state.previous_free_dofs(), state.free_dofs());
        assert_eq!(state.previous_step_size(), 1.0);
        assert_eq!(state.extrapolate(0.3), vec![1.0, 2.0]);
    }

    #[test]
    fn test_advance_and_extrapolate() {
        let mut state = FieldState::new(vec![0.0], FixedDofs::new());
        state.advance(vec![1.0], 0.5);
        assert_eq!(state.previous_free_dofs(), &[0.0]);
        assert_eq!(state.previous_step_size(), 0.5);

        // slope 2 per unit time continued over 0.25
        assert_eq!(state.extrapolate(0.25), vec![1.5]);
    }

    #[test]
    fn test_reset() {
        let mut state = FieldState::new(vec![], FixedDofs::new());
        assert!(!state.is_set());
        state.advance(vec![3.0], 0.1);
        state.reset(vec![5.0]);
        assert!(state.is_set());
        assert_eq!(state.previous_free_dofs(), &[5.0]);
        assert_eq!(state.previous_step_size(), 1.0);
    }
}
