//! Assembled linear systems.

use crate::error::{Result, check_len};
use crate::linalg::{SparseMatrix, SparseOps};
use crate::linalg::vector::{norm2, sub};

/// Sparse matrix and right-hand side restricted to the free DOFs.
#[derive(Clone, Debug)]
pub struct AssembledSystem {
    pub matrix: SparseMatrix,
    pub rhs: Vec<f64>,
}

impl AssembledSystem {
    /// Pair a matrix with its right-hand side.
    ///
    /// Rectangular matrices are allowed: a mass form may cover only the
    /// leading block of the unknowns.
    pub fn new(matrix: SparseMatrix, rhs: Vec<f64>) -> Result<Self> {
        check_len("assembled rhs", matrix.nrows(), rhs.len())?;
        Ok(Self { matrix, rhs })
    }

    pub fn n_rows(&self) -> usize {
        self.rhs.len()
    }

    /// `||A x - b||`, the residual of the system at `x`.
    pub fn residual_norm(&self, x: &[f64]) -> Result<f64> {
        check_len("residual trial vector", self.matrix.ncols(), x.len())?;
        Ok(norm2(&sub(&self.matrix.mul_vec(x), &self.rhs)))
    }

    /// `||b||`.
    pub fn rhs_norm(&self) -> f64 {
        norm2(&self.rhs)
    }
}

impl PartialEq for AssembledSystem {
    fn eq(&self, other: &Self) -> bool {
        self.rhs == other.rhs && self.matrix.same_entries(&other.matrix)
    }
}
