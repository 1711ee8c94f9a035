//! Correspondences between the patches of different fields.

use crate::types::{BoxSide, PatchSide};

/// Identifies that a side of one field's patch coincides with a side of
/// another field's patch.
///
/// Boundary traces of the source field on `source` become fixed DOFs of the
/// target field on `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CouplingLink {
    pub source: PatchSide,
    pub target: PatchSide,
}

impl CouplingLink {
    pub const fn new(source_patch: usize, source_side: BoxSide, target_patch: usize, target_side: BoxSide) -> Self {
        Self {
            source: PatchSide::new(source_patch, source_side),
            target: PatchSide::new(target_patch, target_side),
        }
    }
}

/// Identifies a whole patch of one field with a patch of another field,
/// e.g. a fluid patch whose geometry follows a mesh-motion patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchLink {
    pub source: usize,
    pub target: usize,
}

impl PatchLink {
    pub const fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}
