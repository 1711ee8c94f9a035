//! Multi-patch physical fields.
//!
//! A [`PatchField`] is the coefficient representation of a field over a
//! multi-patch geometry: per patch, node-major coefficients with
//! `n_components` values per node, and the node indices lying on each side.
//! Boundary traces taken from a field are what flows across field interfaces.

use std::collections::BTreeMap;

use crate::error::{FsiError, Result, check_len};
use crate::types::{BoxSide, PatchSide};

/// Coefficients of one field on one patch.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldPatch {
    n_components: usize,
    /// `coefs[node * n_components + component]`
    coefs: Vec<f64>,
    sides: BTreeMap<BoxSide, Vec<usize>>,
}

impl FieldPatch {
    /// Create a patch from node-major coefficients.
    ///
    /// # Panics
    ///
    /// Panics if `n_components` is zero, the coefficient count is not a
    /// multiple of it, or a side references a node outside the patch.
    pub fn new(n_components: usize, coefs: Vec<f64>, sides: BTreeMap<BoxSide, Vec<usize>>) -> Self {
        assert!(n_components > 0, "field patch needs at least one component");
        assert_eq!(
            coefs.len() % n_components,
            0,
            "coefficient count must be a multiple of the component count"
        );
        let n_nodes = coefs.len() / n_components;
        assert!(
            sides.values().flatten().all(|&node| node < n_nodes),
            "side node index out of range"
        );
        Self {
            n_components,
            coefs,
            sides,
        }
    }

    /// Same layout, all coefficients zero.
    pub fn zeros_like(&self) -> Self {
        Self {
            n_components: self.n_components,
            coefs: vec![0.0; self.coefs.len()],
            sides: self.sides.clone(),
        }
    }

    #[inline]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.coefs.len() / self.n_components
    }

    pub fn coefs(&self) -> &[f64] {
        &self.coefs
    }

    pub fn coefs_mut(&mut self) -> &mut [f64] {
        &mut self.coefs
    }

    #[inline]
    pub fn value(&self, node: usize, component: usize) -> f64 {
        self.coefs[node * self.n_components + component]
    }

    /// Nodes on a side, in boundary order.
    pub fn side_nodes(&self, side: BoxSide) -> Option<&[usize]> {
        self.sides.get(&side).map(Vec::as_slice)
    }

    /// Values along a side, one vector per component.
    pub fn trace(&self, side: BoxSide) -> Option<Vec<Vec<f64>>> {
        let nodes = self.side_nodes(side)?;
        Some(
            (0..self.n_components)
                .map(|c| nodes.iter().map(|&n| self.value(n, c)).collect())
                .collect(),
        )
    }

    fn same_layout(&self, other: &FieldPatch) -> bool {
        self.n_components == other.n_components && self.coefs.len() == other.coefs.len()
    }
}

// =============================================================================
// Multi-patch field
// =============================================================================

/// A field over all patches of a geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchField {
    patches: Vec<FieldPatch>,
}

impl PatchField {
    pub fn new(patches: Vec<FieldPatch>) -> Self {
        Self { patches }
    }

    /// Same layout, all coefficients zero.
    pub fn zeros_like(&self) -> Self {
        Self {
            patches: self.patches.iter().map(FieldPatch::zeros_like).collect(),
        }
    }

    pub fn n_patches(&self) -> usize {
        self.patches.len()
    }

    pub fn patches(&self) -> &[FieldPatch] {
        &self.patches
    }

    pub fn patch(&self, index: usize) -> Result<&FieldPatch> {
        let n = self.patches.len();
        self.patches
            .get(index)
            .ok_or_else(|| FsiError::config(format!("patch {} out of range ({} patches)", index, n)))
    }

    pub fn patch_mut(&mut self, index: usize) -> Result<&mut FieldPatch> {
        let n = self.patches.len();
        self.patches
            .get_mut(index)
            .ok_or_else(|| FsiError::config(format!("patch {} out of range ({} patches)", index, n)))
    }

    /// Values of every component along a patch side.
    pub fn boundary_trace(&self, at: PatchSide) -> Result<Vec<Vec<f64>>> {
        self.patch(at.patch)?
            .trace(at.side)
            .ok_or_else(|| FsiError::config(format!("field has no boundary nodes on {}", at)))
    }

    /// `self - other`, patch by patch.
    pub fn difference(&self, other: &PatchField) -> Result<PatchField> {
        let mut out = self.clone();
        out.add_scaled(-1.0, other)?;
        Ok(out)
    }

    /// `self += alpha * other`, patch by patch.
    pub fn add_scaled(&mut self, alpha: f64, other: &PatchField) -> Result<()> {
        check_len("field patch count", self.patches.len(), other.patches.len())?;
        for (index, patch) in other.patches.iter().enumerate() {
            self.add_scaled_patch(index, alpha, patch)?;
        }
        Ok(())
    }

    /// `self[index] += alpha * patch`.
    pub fn add_scaled_patch(&mut self, index: usize, alpha: f64, patch: &FieldPatch) -> Result<()> {
        let target = self.patch_mut(index)?;
        if !target.same_layout(patch) {
            return Err(FsiError::config(format!(
                "field patch {} layout mismatch ({} components x {} nodes vs {} x {})",
                index,
                target.n_components,
                target.n_nodes(),
                patch.n_components,
                patch.n_nodes()
            )));
        }
        for (t, s) in target.coefs.iter_mut().zip(&patch.coefs) {
            *t += alpha * s;
        }
        Ok(())
    }

    /// Multiply every coefficient by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for patch in &mut self.patches {
            patch.coefs.iter_mut().for_each(|c| *c *= factor);
        }
    }

    /// Euclidean norm of all coefficients.
    pub fn coef_norm(&self) -> f64 {
        self.patches
            .iter()
            .flat_map(|p| p.coefs.iter())
            .map(|c| c * c)
            .sum::<f64>()
            .sqrt()
    }
}
