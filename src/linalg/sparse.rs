//! Sparse matrices on top of faer's row-major storage.
//!
//! Assembled systems are [`SparseMatrix`] values (`faer::sparse::SparseRowMat`).
//! They are built once from triplets through [`TripletBuilder`], with
//! duplicate entries summed by faer. Afterwards they are only read:
//! scaling, sums, blocks and the blended step matrices all produce fresh
//! matrices. The operations the integrators need on top of faer live in
//! [`SparseOps`].
//!
//! With the `parallel` feature, matrix-vector products run over the rows
//! on the rayon thread pool.
//!
//! # Example
//!
//! ```
//! use fsi_rs::linalg::{SparseOps, TripletBuilder};
//!
//! let mut builder = TripletBuilder::new(2, 2);
//! builder.add(0, 0, 4.0);
//! builder.add(0, 1, -1.0);
//! builder.add(1, 0, -1.0);
//! builder.add(1, 1, 4.0);
//! builder.add(1, 1, 1.0); // duplicates are summed
//! let a = builder.build().unwrap();
//!
//! assert_eq!(a.entry(1, 1), 5.0);
//! assert_eq!(a.mul_vec(&[1.0, 1.0]), vec![3.0, 4.0]);
//! ```

use faer::sparse::{SparseRowMat, SymbolicSparseRowMat, Triplet};

use crate::error::{FsiError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Row-major sparse matrix of assembled systems.
pub type SparseMatrix = SparseRowMat<usize, f64>;

// =============================================================================
// Construction
// =============================================================================

/// Triplet accumulator for [`SparseMatrix`].
#[derive(Clone, Debug)]
pub struct TripletBuilder {
    n_rows: usize,
    n_cols: usize,
    entries: Vec<Triplet<usize, usize, f64>>,
}

impl TripletBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    pub fn with_capacity(n_rows: usize, n_cols: usize, capacity: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add `value` at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when the index lies outside the matrix.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.n_rows && col < self.n_cols,
            "entry ({}, {}) outside a {}x{} matrix",
            row,
            col,
            self.n_rows,
            self.n_cols
        );
        self.entries.push(Triplet::new(row, col, value));
    }

    /// Number of accumulated (unmerged) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> Result<SparseMatrix> {
        SparseMatrix::try_new_from_triplets(self.n_rows, self.n_cols, &self.entries)
            .map_err(|e| FsiError::config(format!("sparse matrix construction failed: {:?}", e)))
    }
}

/// Matrix from `(row, col, value)` triplets; duplicates are summed.
pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f64)]) -> Result<SparseMatrix> {
    let mut builder = TripletBuilder::with_capacity(n_rows, n_cols, triplets.len());
    for &(row, col, value) in triplets {
        builder.add(row, col, value);
    }
    builder.build()
}

/// Matrix without stored entries.
pub fn zeros(n_rows: usize, n_cols: usize) -> SparseMatrix {
    let symbolic = SymbolicSparseRowMat::new_checked(n_rows, n_cols, vec![0; n_rows + 1], None, Vec::new());
    SparseMatrix::new(symbolic, Vec::new())
}

pub fn diagonal(diag: &[f64]) -> SparseMatrix {
    let n = diag.len();
    let symbolic = SymbolicSparseRowMat::new_checked(n, n, (0..=n).collect(), None, (0..n).collect());
    SparseMatrix::new(symbolic, diag.to_vec())
}

pub fn identity(n: usize) -> SparseMatrix {
    diagonal(&vec![1.0; n])
}

// =============================================================================
// Operations
// =============================================================================

/// Operations on assembled matrices beyond what faer provides directly.
pub trait SparseOps {
    fn is_square(&self) -> bool;

    /// Stored value at `(row, col)`, zero when not stored.
    fn entry(&self, row: usize, col: usize) -> f64;

    /// `A x`.
    fn mul_vec(&self, x: &[f64]) -> Vec<f64>;

    /// `A + alpha B` for matrices of equal shape.
    fn add_scaled(&self, alpha: f64, other: &SparseMatrix) -> Result<SparseMatrix>;

    /// Sub-matrix of `n_rows x n_cols` starting at `(row0, col0)`.
    fn block(&self, row0: usize, col0: usize, n_rows: usize, n_cols: usize) -> Result<SparseMatrix>;

    /// Same shape, sparsity pattern and values.
    fn same_entries(&self, other: &SparseMatrix) -> bool;
}

impl SparseOps for SparseMatrix {
    fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    fn entry(&self, row: usize, col: usize) -> f64 {
        self.get(row, col).copied().unwrap_or(0.0)
    }

    fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.ncols(), "mat-vec length mismatch");
        let row_dot = |i: usize| -> f64 {
            self.col_idx_of_row_raw(i)
                .iter()
                .zip(self.val_of_row(i))
                .map(|(&j, v)| v * x[j])
                .sum()
        };

        #[cfg(feature = "parallel")]
        let y: Vec<f64> = (0..self.nrows()).into_par_iter().map(row_dot).collect();
        #[cfg(not(feature = "parallel"))]
        let y: Vec<f64> = (0..self.nrows()).map(row_dot).collect();
        y
    }

    fn add_scaled(&self, alpha: f64, other: &SparseMatrix) -> Result<SparseMatrix> {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return Err(FsiError::config(format!(
                "cannot add a {}x{} matrix to a {}x{} matrix",
                other.nrows(),
                other.ncols(),
                self.nrows(),
                self.ncols()
            )));
        }
        let nnz = self.compute_nnz() + other.compute_nnz();
        let mut builder = TripletBuilder::with_capacity(self.nrows(), self.ncols(), nnz);
        for t in self.triplet_iter() {
            builder.add(t.row, t.col, *t.val);
        }
        for t in other.triplet_iter() {
            builder.add(t.row, t.col, alpha * t.val);
        }
        builder.build()
    }

    fn block(&self, row0: usize, col0: usize, n_rows: usize, n_cols: usize) -> Result<SparseMatrix> {
        if row0 + n_rows > self.nrows() || col0 + n_cols > self.ncols() {
            return Err(FsiError::config(format!(
                "block {}x{} at ({}, {}) exceeds a {}x{} matrix",
                n_rows,
                n_cols,
                row0,
                col0,
                self.nrows(),
                self.ncols()
            )));
        }
        let mut builder = TripletBuilder::new(n_rows, n_cols);
        for i in row0..row0 + n_rows {
            for (&j, &v) in self.col_idx_of_row_raw(i).iter().zip(self.val_of_row(i)) {
                if (col0..col0 + n_cols).contains(&j) {
                    builder.add(i - row0, j - col0, v);
                }
            }
        }
        builder.build()
    }

    fn same_entries(&self, other: &SparseMatrix) -> bool {
        self.nrows() == other.nrows()
            && self.ncols() == other.ncols()
            && self
                .triplet_iter()
                .map(|t| (t.row, t.col, *t.val))
                .eq(other.triplet_iter().map(|t| (t.row, t.col, *t.val)))
    }
}

/// Step matrix of a theta scheme with a leading inertia block:
///
/// ```text
/// [ mass_scale M + leading_scale A_11   off_scale A_12 ]
/// [ off_scale A_21                      off_scale A_22 ]
/// ```
///
/// where the leading block has the size of `mass`.
pub fn blend_leading_block(
    matrix: &SparseMatrix,
    leading_scale: f64,
    off_scale: f64,
    mass: &SparseMatrix,
    mass_scale: f64,
) -> Result<SparseMatrix> {
    let n_lead = mass.nrows();
    if !matrix.is_square() || !mass.is_square() || n_lead > matrix.nrows() {
        return Err(FsiError::config(format!(
            "cannot blend a {}x{} leading block into a {}x{} matrix",
            mass.nrows(),
            mass.ncols(),
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let n = matrix.nrows();
    let mut builder = TripletBuilder::with_capacity(n, n, matrix.compute_nnz() + mass.compute_nnz());
    for t in matrix.triplet_iter() {
        let scale = if t.row < n_lead && t.col < n_lead {
            leading_scale
        } else {
            off_scale
        };
        builder.add(t.row, t.col, scale * t.val);
    }
    for t in mass.triplet_iter() {
        builder.add(t.row, t.col, mass_scale * t.val);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        // [ 4 -1  0 ]
        // [-1  4 -1 ]
        // [ 0 -1  2 ]
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
                (2, 2, 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_merges_duplicates() {
        let a = from_triplets(2, 2, &[(1, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0)]).unwrap();
        assert_eq!(a.compute_nnz(), 2);
        assert_eq!(a.entry(1, 0), 4.0);
        assert_eq!(a.entry(0, 1), 2.0);
        assert_eq!(a.entry(0, 0), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_builder_rejects_out_of_range_entry() {
        TripletBuilder::new(2, 2).add(2, 0, 1.0);
    }

    #[test]
    fn test_mul_vec() {
        let y = sample().mul_vec(&[1.0, 2.0, 3.0]);
        assert_eq!(y, vec![2.0, 4.0, 4.0]);
        assert!(zeros(2, 3).mul_vec(&[1.0, 1.0, 1.0]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_mul_vec_matches_triplet_sum() {
        // large enough for the rows to be split across rayon workers
        let n = 500;
        let mut builder = TripletBuilder::new(n, n);
        for i in 0..n {
            builder.add(i, i, 2.0 + i as f64);
            builder.add(i, (7 * i + 3) % n, -0.5);
        }
        let a = builder.build().unwrap();
        let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();

        let mut expected = vec![0.0; n];
        for t in a.triplet_iter() {
            expected[t.row] += t.val * x[t.col];
        }
        for (y, e) in a.mul_vec(&x).iter().zip(&expected) {
            assert!((y - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_add_scaled() {
        let a = sample();
        let b = a.add_scaled(2.0, &identity(3)).unwrap();
        assert_eq!(b.entry(0, 0), 6.0);
        assert_eq!(b.entry(2, 2), 4.0);
        assert_eq!(b.entry(1, 2), -1.0);
        assert!(a.add_scaled(1.0, &identity(2)).is_err());
    }

    #[test]
    fn test_block() {
        let a = sample();
        let b = a.block(1, 1, 2, 2).unwrap();
        assert_eq!(b.entry(0, 0), 4.0);
        assert_eq!(b.entry(0, 1), -1.0);
        assert_eq!(b.entry(1, 1), 2.0);
        assert!(a.block(2, 0, 2, 1).is_err());
    }

    #[test]
    fn test_blend_leading_block() {
        let a = sample();
        let b = blend_leading_block(&a, 0.5, 10.0, &identity(2), 1.0).unwrap();

        assert_eq!(b.entry(0, 0), 3.0);
        assert_eq!(b.entry(1, 1), 3.0);
        assert_eq!(b.entry(0, 1), -0.5);
        assert_eq!(b.entry(1, 2), -10.0);
        assert_eq!(b.entry(2, 1), -10.0);
        assert_eq!(b.entry(2, 2), 20.0);

        // unit scales and an empty leading block reproduce the matrix
        let same = blend_leading_block(&a, 1.0, 1.0, &zeros(0, 0), 1.0).unwrap();
        assert!(same.same_entries(&a));
        assert!(blend_leading_block(&a, 1.0, 1.0, &identity(4), 1.0).is_err());
    }

    #[test]
    fn test_same_entries() {
        assert!(sample().same_entries(&sample()));
        assert!(!sample().same_entries(&identity(3)));
        assert!(diagonal(&[1.0, 1.0]).same_entries(&identity(2)));
    }
}
