//! Sparse storage, vector helpers and direct solvers.

mod direct;
pub mod sparse;
pub mod vector;

pub use direct::{LinearSolverKind, solve_linear_system};
pub use sparse::{SparseMatrix, SparseOps, TripletBuilder, blend_leading_block};
