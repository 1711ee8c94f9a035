//! Strongly-typed addressing for multi-patch geometries.
//!
//! Boundary conditions, interface correspondences and monitors refer to a
//! patch side through [`PatchSide`] rather than positional indices.
//!
//! # Example
//!
//! ```
//! use fsi_rs::types::{BoxSide, PatchSide};
//!
//! let interface = PatchSide::new(0, BoxSide::East);
//! assert_eq!(interface.side.opposite(), BoxSide::West);
//! ```

mod sides;

pub use sides::{BoxSide, PatchSide};
