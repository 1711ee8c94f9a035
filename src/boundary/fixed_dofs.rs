//! Prescribed (Dirichlet) degree-of-freedom values.
//!
//! Fixed DOFs are keyed by `(patch, side, component)`. Each entry holds the
//! coefficient values of that component along the side, ordered the way the
//! discretization orders boundary coefficients. Entries are always replaced
//! as a whole; there is no partial in-place update.

use std::collections::BTreeMap;

use crate::error::{FsiError, Result};
use crate::types::{BoxSide, PatchSide};

/// Address of one fixed-DOF block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundaryKey {
    pub patch: usize,
    pub side: BoxSide,
    pub component: usize,
}

impl BoundaryKey {
    pub const fn new(patch: usize, side: BoxSide, component: usize) -> Self {
        Self {
            patch,
            side,
            component,
        }
    }

    /// The patch side this key lives on.
    pub fn patch_side(&self) -> PatchSide {
        PatchSide::new(self.patch, self.side)
    }
}

// =============================================================================
// Fixed DOF values
// =============================================================================

/// Values of all prescribed DOFs of one field.
///
/// Iteration order (and [`FixedDofs::flatten`]) follows the key order, so
/// two equal maps always flatten identically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedDofs {
    entries: BTreeMap<BoundaryKey, Vec<f64>>,
}

impl FixedDofs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the values of one entry.
    pub fn insert(&mut self, key: BoundaryKey, values: Vec<f64>) -> Option<Vec<f64>> {
        self.entries.insert(key, values)
    }

    pub fn get(&self, key: &BoundaryKey) -> Option<&[f64]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Values for a key, or an error naming the missing entry.
    pub fn require(&self, key: &BoundaryKey) -> Result<&[f64]> {
        self.get(key).ok_or(FsiError::MissingBoundaryData {
            patch: key.patch,
            side: key.side,
            component: key.component,
        })
    }

    pub fn contains(&self, key: &BoundaryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Replace every listed component of a side; `components[c]` holds the
    /// values of component `c`.
    pub fn set_side(&mut self, patch: usize, side: BoxSide, components: &[Vec<f64>]) {
        for (component, values) in components.iter().enumerate() {
            self.entries
                .insert(BoundaryKey::new(patch, side, component), values.clone());
        }
    }

    /// Values of all components stored for a side, ordered by component.
    pub fn side(&self, patch: usize, side: BoxSide) -> Vec<Vec<f64>> {
        self.entries
            .iter()
            .filter(|(k, _)| k.patch == patch && k.side == side)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Set every value to zero, keeping the layout.
    pub fn homogenize(&mut self) {
        for values in self.entries.values_mut() {
            values.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Set the values of one side to zero.
    pub fn homogenize_side(&mut self, patch: usize, side: BoxSide) {
        for (key, values) in self.entries.iter_mut() {
            if key.patch == patch && key.side == side {
                values.iter_mut().for_each(|v| *v = 0.0);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BoundaryKey, &[f64])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &BoundaryKey> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of prescribed values.
    pub fn num_values(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// All values concatenated in key order.
    pub fn flatten(&self) -> Vec<f64> {
        self.entries.values().flatten().copied().collect()
    }
}

// =============================================================================
// Layout
// =============================================================================

/// The Dirichlet conditions a discretization declares, with the number of
/// coefficient values each entry must carry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundaryLayout {
    conditions: BTreeMap<BoundaryKey, usize>,
}

impl BoundaryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fixed entry with `n_values` coefficients.
    pub fn declare(&mut self, key: BoundaryKey, n_values: usize) {
        self.conditions.insert(key, n_values);
    }

    /// Builder form of [`BoundaryLayout::declare`] for all components of a side.
    pub fn with_side(mut self, patch: usize, side: BoxSide, n_components: usize, n_values: usize) -> Self {
        for component in 0..n_components {
            self.declare(BoundaryKey::new(patch, side, component), n_values);
        }
        self
    }

    pub fn contains(&self, key: &BoundaryKey) -> bool {
        self.conditions.contains_key(key)
    }

    /// Declared size of an entry.
    pub fn size_of(&self, key: &BoundaryKey) -> Option<usize> {
        self.conditions.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BoundaryKey> {
        self.conditions.keys()
    }

    pub fn num_conditions(&self) -> usize {
        self.conditions.len()
    }

    /// Total number of fixed DOFs.
    pub fn num_fixed_dofs(&self) -> usize {
        self.conditions.values().sum()
    }

    /// A zero-valued map matching this layout.
    pub fn zeros(&self) -> FixedDofs {
        let mut fixed = FixedDofs::new();
        for (key, &n) in &self.conditions {
            fixed.insert(*key, vec![0.0; n]);
        }
        fixed
    }

    /// Check that `fixed` supplies exactly the declared entries and sizes.
    pub fn validate(&self, fixed: &FixedDofs) -> Result<()> {
        for (key, &n) in &self.conditions {
            let values = fixed.require(key)?;
            if values.len() != n {
                return Err(FsiError::dimension_mismatch("fixed dofs entry", n, values.len()));
            }
        }
        if let Some(extra) = fixed.keys().find(|k| !self.contains(k)) {
            return Err(FsiError::config(format!(
                "fixed dofs given for undeclared boundary: patch {}, side {}, component {}",
                extra.patch, extra.side, extra.component
            )));
        }
        Ok(())
    }

    /// Check a single replacement entry before it is stored.
    pub fn validate_entry(&self, key: &BoundaryKey, values: &[f64]) -> Result<()> {
        match self.size_of(key) {
            Some(n) if n == values.len() => Ok(()),
            Some(n) => Err(FsiError::dimension_mismatch("fixed dofs entry", n, values.len())),
            None => Err(FsiError::config(format!(
                "no Dirichlet condition declared on patch {}, side {}, component {}",
                key.patch, key.side, key.component
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> BoundaryLayout {
        BoundaryLayout::new()
            .with_side(0, BoxSide::West, 2, 3)
            .with_side(1, BoxSide::East, 1, 1)
    }

    #[test]
    fn test_layout_counts() {
        let l = layout();
        assert_eq!(l.num_conditions(), 3);
        assert_eq!(l.num_fixed_dofs(), 7);
        assert_eq!(l.zeros().num_values(), 7);
        assert!(l.validate(&l.zeros()).is_ok());
    }

    #[test]
    fn test_validate_reports_missing_entry() {
        let l = layout();
        let mut fixed = FixedDofs::new();
        fixed.set_side(0, BoxSide::West, &[vec![0.0; 3], vec![0.0; 3]]);

        match l.validate(&fixed) {
            Err(FsiError::MissingBoundaryData {
                patch,
                side,
                component,
            }) => {
                assert_eq!((patch, side, component), (1, BoxSide::East, 0));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_wrong_size_and_extra() {
        let l = layout();
        let mut fixed = l.zeros();
        fixed.insert(BoundaryKey::new(1, BoxSide::East, 0), vec![0.0, 1.0]);
        assert!(matches!(l.validate(&fixed), Err(FsiError::DimensionMismatch { .. })));

        let mut fixed = l.zeros();
        fixed.insert(BoundaryKey::new(3, BoxSide::North, 0), vec![0.0]);
        assert!(matches!(l.validate(&fixed), Err(FsiError::Configuration(_))));
    }

    #[test]
    fn test_set_side_replaces_whole_entry() {
        let mut fixed = layout().zeros();
        fixed.set_side(0, BoxSide::West, &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        fixed.set_side(0, BoxSide::West, &[vec![7.0, 8.0, 9.0]]);

        let side = fixed.side(0, BoxSide::West);
        assert_eq!(side, vec![vec![7.0, 8.0, 9.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_homogenize() {
        let mut fixed = layout().zeros();
        fixed.set_side(1, BoxSide::East, &[vec![2.5]]);
        fixed.set_side(0, BoxSide::West, &[vec![1.0; 3], vec![1.0; 3]]);

        fixed.homogenize_side(1, BoxSide::East);
        assert_eq!(fixed.get(&BoundaryKey::new(1, BoxSide::East, 0)), Some(&[0.0][..]));
        assert_eq!(fixed.flatten().iter().sum::<f64>(), 6.0);

        fixed.homogenize();
        assert!(fixed.flatten().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_flatten_follows_key_order() {
        let mut a = FixedDofs::new();
        a.insert(BoundaryKey::new(1, BoxSide::West, 0), vec![3.0]);
        a.insert(BoundaryKey::new(0, BoxSide::East, 0), vec![1.0, 2.0]);
        assert_eq!(a.flatten(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_validate_entry() {
        let l = layout();
        let key = BoundaryKey::new(1, BoxSide::East, 0);
        assert!(l.validate_entry(&key, &[1.0]).is_ok());
        assert!(l.validate_entry(&key, &[1.0, 2.0]).is_err());
        assert!(l.validate_entry(&BoundaryKey::new(1, BoxSide::West, 0), &[1.0]).is_err());
    }
}
