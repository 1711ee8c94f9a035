//! Named sides of a tensor-product patch.
//!
//! Boundary data, interface links and force monitors all address a patch side
//! by name instead of by a raw index into a per-side array.

use std::fmt;

/// One side of a parametric box (patch).
///
/// In one and two parametric dimensions only the first two (respectively
/// four) sides exist; the ordering is the usual `west, east, south, north,
/// front, back` convention of tensor-product patches.
///
/// # Example
///
/// ```
/// use fsi_rs::types::BoxSide;
///
/// assert_eq!(BoxSide::West.opposite(), BoxSide::East);
/// assert_eq!(BoxSide::North.direction(), 1);
/// assert!(BoxSide::East.is_upper());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoxSide {
    /// Lower end of the first parametric direction
    West,
    /// Upper end of the first parametric direction
    East,
    /// Lower end of the second parametric direction
    South,
    /// Upper end of the second parametric direction
    North,
    /// Lower end of the third parametric direction
    Front,
    /// Upper end of the third parametric direction
    Back,
}

impl BoxSide {
    /// All sides in canonical order.
    pub const ALL: [BoxSide; 6] = [
        BoxSide::West,
        BoxSide::East,
        BoxSide::South,
        BoxSide::North,
        BoxSide::Front,
        BoxSide::Back,
    ];

    /// Sides that exist on a patch with `dim` parametric directions.
    pub fn sides_for_dim(dim: usize) -> &'static [BoxSide] {
        &Self::ALL[..(2 * dim).min(6)]
    }

    /// Canonical index (0..6).
    pub fn index(self) -> usize {
        match self {
            BoxSide::West => 0,
            BoxSide::East => 1,
            BoxSide::South => 2,
            BoxSide::North => 3,
            BoxSide::Front => 4,
            BoxSide::Back => 5,
        }
    }

    /// Parametric direction this side is orthogonal to.
    pub fn direction(self) -> usize {
        self.index() / 2
    }

    /// Whether this side sits at the upper end (parameter 1) of its direction.
    pub fn is_upper(self) -> bool {
        self.index() % 2 == 1
    }

    /// Parametric value of the side along its direction (0 or 1).
    pub fn parameter(self) -> f64 {
        if self.is_upper() { 1.0 } else { 0.0 }
    }

    /// The side across the patch.
    pub fn opposite(self) -> Self {
        match self {
            BoxSide::West => BoxSide::East,
            BoxSide::East => BoxSide::West,
            BoxSide::South => BoxSide::North,
            BoxSide::North => BoxSide::South,
            BoxSide::Front => BoxSide::Back,
            BoxSide::Back => BoxSide::Front,
        }
    }

    /// Outward normal sign along the side's direction.
    pub fn outward_sign(self) -> f64 {
        if self.is_upper() { 1.0 } else { -1.0 }
    }
}

impl fmt::Display for BoxSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoxSide::West => "west",
            BoxSide::East => "east",
            BoxSide::South => "south",
            BoxSide::North => "north",
            BoxSide::Front => "front",
            BoxSide::Back => "back",
        };
        write!(f, "{}", name)
    }
}

/// A side of a specific patch in a multi-patch geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatchSide {
    /// Patch index
    pub patch: usize,
    /// Side of that patch
    pub side: BoxSide,
}

impl PatchSide {
    /// Create a new patch side.
    pub const fn new(patch: usize, side: BoxSide) -> Self {
        Self { patch, side }
    }
}

impl fmt::Display for PatchSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch {} ({})", self.patch, self.side)
    }
}
