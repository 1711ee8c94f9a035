//! Direct linear solvers backed by faer factorizations.
//!
//! Assembled systems are solved with faer's sparse LU by default. The
//! sparse Cholesky applies to symmetric positive definite systems. The
//! dense factorizations densify the matrix first and are only used when
//! selected explicitly.

use super::SparseMatrix;
use super::sparse::SparseOps;
use crate::error::{FsiError, Result, check_len};
use faer::Mat;
use faer::Side;
use faer::linalg::solvers::Solve;

/// Factorization used for the linear systems of a Newton iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinearSolverKind {
    /// Sparse LU with partial pivoting
    #[default]
    SparseLu,
    /// Sparse Cholesky (LLT); requires a symmetric positive definite matrix
    SparseCholesky,
    /// Dense LU with partial (row) pivoting
    DensePartialPivLu,
    /// Dense LU with full pivoting; slower, more robust for near-singular systems
    DenseFullPivLu,
}

impl LinearSolverKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SparseLu => "sparse LU",
            Self::SparseCholesky => "sparse Cholesky",
            Self::DensePartialPivLu => "dense LU (partial pivoting)",
            Self::DenseFullPivLu => "dense LU (full pivoting)",
        }
    }
}

/// Solve `A x = b`.
///
/// Fails with [`FsiError::LinearSolveFailed`] when the factorization breaks
/// down or the solution is not finite (singular system).
pub fn solve_linear_system(kind: LinearSolverKind, matrix: &SparseMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
    if !matrix.is_square() {
        return Err(FsiError::linear_solve(format!(
            "system matrix is not square ({}x{})",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let n = matrix.nrows();
    check_len("linear system rhs", n, rhs.len())?;
    if n == 0 {
        return Ok(Vec::new());
    }

    let b = Mat::<f64>::from_fn(n, 1, |i, _| rhs[i]);

    let x = match kind {
        LinearSolverKind::SparseLu => matrix
            .as_ref()
            .sp_lu()
            .map_err(|e| FsiError::linear_solve(format!("sparse LU factorization failed: {:?}", e)))?
            .solve(&b),
        LinearSolverKind::SparseCholesky => matrix
            .as_ref()
            .sp_cholesky(Side::Lower)
            .map_err(|e| FsiError::linear_solve(format!("sparse Cholesky factorization failed: {:?}", e)))?
            .solve(&b),
        LinearSolverKind::DensePartialPivLu => matrix.to_dense().as_ref().partial_piv_lu().solve(&b),
        LinearSolverKind::DenseFullPivLu => matrix.to_dense().as_ref().full_piv_lu().solve(&b),
    };

    let solution: Vec<f64> = (0..n).map(|i| x[(i, 0)]).collect();
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(FsiError::linear_solve(format!(
            "{} produced a non-finite solution (singular {}x{} system)",
            kind.name(),
            n,
            n
        )));
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse::{diagonal, from_triplets, zeros};

    const ALL_KINDS: [LinearSolverKind; 4] = [
        LinearSolverKind::SparseLu,
        LinearSolverKind::SparseCholesky,
        LinearSolverKind::DensePartialPivLu,
        LinearSolverKind::DenseFullPivLu,
    ];

    fn spd() -> SparseMatrix {
        from_triplets(
            3,
            3,
            &[
                (0, 0, 4.0),
                (0, 1, -1.0),
                (1, 0, -1.0),
                (1, 1, 4.0),
                (1, 2, -1.0),
                (2, 1, -1.0),
                (2, 2, 4.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_kinds_agree() {
        let a = spd();
        let x_exact = [1.0, -2.0, 0.5];
        let b = a.mul_vec(&x_exact);

        for kind in ALL_KINDS {
            let x = solve_linear_system(kind, &a, &b).unwrap();
            for (xi, ei) in x.iter().zip(&x_exact) {
                assert!((xi - ei).abs() < 1e-12, "{}: {} vs {}", kind.name(), xi, ei);
            }
        }
    }

    #[test]
    fn test_sparse_lu_handles_unsymmetric_system() {
        // [ 2 1 0 ]
        // [ 0 3 1 ]
        // [ 1 0 4 ]
        let a = from_triplets(
            3,
            3,
            &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0), (1, 2, 1.0), (2, 0, 1.0), (2, 2, 4.0)],
        )
        .unwrap();
        let x_exact = [0.5, 1.0, -1.5];
        let b = a.mul_vec(&x_exact);

        let sparse = solve_linear_system(LinearSolverKind::SparseLu, &a, &b).unwrap();
        let dense = solve_linear_system(LinearSolverKind::DensePartialPivLu, &a, &b).unwrap();
        for i in 0..3 {
            assert!((sparse[i] - x_exact[i]).abs() < 1e-12);
            assert!((sparse[i] - dense[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_singular_system_fails() {
        let a = from_triplets(2, 2, &[(0, 0, 1.0)]).unwrap();
        for kind in [LinearSolverKind::SparseLu, LinearSolverKind::DensePartialPivLu] {
            let result = solve_linear_system(kind, &a, &[1.0, 1.0]);
            assert!(matches!(result, Err(FsiError::LinearSolveFailed(_))), "{}", kind.name());
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = diagonal(&[1.0, -1.0]);
        let result = solve_linear_system(LinearSolverKind::SparseCholesky, &a, &[1.0, 1.0]);
        assert!(matches!(result, Err(FsiError::LinearSolveFailed(_))));
    }

    #[test]
    fn test_rhs_length_checked() {
        let a = spd();
        let result = solve_linear_system(LinearSolverKind::default(), &a, &[1.0]);
        assert!(matches!(result, Err(FsiError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_empty_system() {
        for kind in ALL_KINDS {
            assert!(solve_linear_system(kind, &zeros(0, 0), &[]).unwrap().is_empty());
        }
    }
}
