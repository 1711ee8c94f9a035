//! Linear-element elastic bar.
//!
//! Axial bar on a [`Mesh1D`] with P1 elements. The axial force is
//!
//! ```text
//! N(eps) = EA (eps + beta eps^3),   eps = du/dx
//! ```
//!
//! so `beta = 0` is linear elasticity and `beta > 0` gives a hardening
//! nonlinear response. The same model serves as structure and as
//! pseudo-elastic mesh-motion operator.
//!
//! # Example
//!
//! ```ignore
//! use fsi_rs::models::{BarMaterial, ElasticBar1D};
//! use fsi_rs::types::BoxSide;
//!
//! let bar = ElasticBar1D::new(0.0, 1.0, 10, BarMaterial::default().with_body_force(-1.0))
//!     .with_dirichlet(BoxSide::West);
//! assert_eq!(bar.num_free_dofs(), 10);
//! ```

use std::collections::BTreeMap;

use crate::assembly::{AssembledSystem, Discretization, FieldSampler, MassForm, MeshGeometry};
use crate::boundary::{BoundaryKey, BoundaryLayout, FixedDofs};
use crate::error::{FsiError, Result, check_len};
use crate::field::{FieldPatch, PatchField};
use crate::linalg::TripletBuilder;
use crate::types::BoxSide;

use super::Mesh1D;

/// Material and loading of a bar (per unit reference length).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarMaterial {
    /// Axial stiffness EA
    pub stiffness: f64,
    /// Cubic hardening coefficient beta
    pub hardening: f64,
    /// Mass per unit length
    pub density: f64,
    /// Distributed axial load
    pub body_force: f64,
}

impl Default for BarMaterial {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            hardening: 0.0,
            density: 1.0,
            body_force: 0.0,
        }
    }
}

impl BarMaterial {
    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_hardening(mut self, hardening: f64) -> Self {
        self.hardening = hardening;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_body_force(mut self, body_force: f64) -> Self {
        self.body_force = body_force;
        self
    }

    /// Axial force and tangent stiffness at strain `eps`.
    fn response(&self, eps: f64) -> (f64, f64) {
        let force = self.stiffness * (eps + self.hardening * eps * eps * eps);
        let tangent = self.stiffness * (1.0 + 3.0 * self.hardening * eps * eps);
        (force, tangent)
    }
}

/// P1 bar, one patch with `West` and `East` sides.
#[derive(Clone, Debug)]
pub struct ElasticBar1D {
    mesh: Mesh1D,
    material: BarMaterial,
    dirichlet: Vec<BoxSide>,
    /// End loads (West, East)
    traction: [f64; 2],
    layout: BoundaryLayout,
    free_index: Vec<Option<usize>>,
    n_free: usize,
}

impl ElasticBar1D {
    pub fn new(x_min: f64, x_max: f64, n_elements: usize, material: BarMaterial) -> Self {
        let mut bar = Self {
            mesh: Mesh1D::uniform(x_min, x_max, n_elements),
            material,
            dirichlet: Vec::new(),
            traction: [0.0; 2],
            layout: BoundaryLayout::new(),
            free_index: Vec::new(),
            n_free: 0,
        };
        bar.number_dofs();
        bar
    }

    /// Prescribe the displacement of an end.
    pub fn with_dirichlet(mut self, side: BoxSide) -> Self {
        let side = end_side(side);
        if !self.dirichlet.contains(&side) {
            self.dirichlet.push(side);
            self.number_dofs();
        }
        self
    }

    /// Apply a point load at an end.
    pub fn with_traction(mut self, side: BoxSide, load: f64) -> Self {
        self.traction[end_side(side).index()] = load;
        self
    }

    pub fn mesh(&self) -> &Mesh1D {
        &self.mesh
    }

    pub fn material(&self) -> &BarMaterial {
        &self.material
    }

    fn end_node(&self, side: BoxSide) -> usize {
        match side {
            BoxSide::West => 0,
            _ => self.mesh.n_elements,
        }
    }

    fn number_dofs(&mut self) {
        let n_nodes = self.mesh.n_nodes();
        let fixed_nodes: Vec<usize> = self.dirichlet.iter().map(|&s| self.end_node(s)).collect();

        let mut next = 0;
        self.free_index = (0..n_nodes)
            .map(|node| {
                if fixed_nodes.contains(&node) {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect();
        self.n_free = next;

        self.layout = BoundaryLayout::new();
        for &side in &self.dirichlet {
            self.layout.declare(BoundaryKey::new(0, side, 0), 1);
        }
    }

    /// Nodal displacements from free and fixed DOFs.
    fn nodal_values(&self, free: &[f64], fixed: &FixedDofs) -> Result<Vec<f64>> {
        check_len("bar free dofs", self.n_free, free.len())?;
        let mut u = vec![0.0; self.mesh.n_nodes()];
        for (node, index) in self.free_index.iter().enumerate() {
            if let Some(i) = index {
                u[node] = free[*i];
            }
        }
        for &side in &self.dirichlet {
            u[self.end_node(side)] = fixed.require(&BoundaryKey::new(0, side, 0))?[0];
        }
        Ok(u)
    }

    fn sides(&self) -> BTreeMap<BoxSide, Vec<usize>> {
        BTreeMap::from([
            (BoxSide::West, vec![0]),
            (BoxSide::East, vec![self.mesh.n_elements]),
        ])
    }

    /// Nodal coefficients of patch 0 of a displacement-like field.
    fn patch_values<'a>(&self, field: &'a PatchField) -> Result<&'a [f64]> {
        let patch = field.patch(0)?;
        check_len("bar field nodes", self.mesh.n_nodes(), patch.n_nodes())?;
        if patch.n_components() != 1 {
            return Err(FsiError::config("bar fields have a single component"));
        }
        Ok(patch.coefs())
    }

    /// Deformed-to-reference length ratio of every element.
    fn element_jacobians(&self, displacement: &PatchField) -> Result<Vec<f64>> {
        let d = self.patch_values(displacement)?;
        Ok((0..self.mesh.n_elements)
            .map(|k| {
                let h = self.mesh.element_sizes[k];
                (h + d[k + 1] - d[k]) / h
            })
            .collect())
    }
}

fn end_side(side: BoxSide) -> BoxSide {
    if side.is_upper() { BoxSide::East } else { BoxSide::West }
}

impl Discretization for ElasticBar1D {
    fn num_free_dofs(&self) -> usize {
        self.n_free
    }

    fn boundary_layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    /// Tangent stiffness and residual `f_ext - f_int(u)`.
    fn assemble(&mut self, free: &[f64], fixed: &FixedDofs) -> Result<AssembledSystem> {
        let u = self.nodal_values(free, fixed)?;
        let mut builder = TripletBuilder::with_capacity(self.n_free, self.n_free, 4 * self.mesh.n_elements);
        let mut rhs = vec![0.0; self.n_free];
        let sign = [-1.0, 1.0];

        for k in 0..self.mesh.n_elements {
            let nodes = [k, k + 1];
            let h = self.mesh.element_sizes[k];
            let eps = (u[k + 1] - u[k]) / h;
            let (force, tangent) = self.material.response(eps);

            for a in 0..2 {
                let Some(row) = self.free_index[nodes[a]] else {
                    continue;
                };
                rhs[row] += self.material.body_force * h / 2.0 - sign[a] * force;
                for b in 0..2 {
                    if let Some(col) = self.free_index[nodes[b]] {
                        builder.add(row, col, sign[a] * sign[b] * tangent / h);
                    }
                }
            }
        }

        for side in [BoxSide::West, BoxSide::East] {
            if let Some(row) = self.free_index[self.end_node(side)] {
                rhs[row] += self.traction[side.index()];
            }
        }

        AssembledSystem::new(builder.build()?, rhs)
    }

    fn construct_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField> {
        let u = self.nodal_values(free, fixed)?;
        Ok(PatchField::new(vec![FieldPatch::new(1, u, self.sides())]))
    }
}

impl MassForm for ElasticBar1D {
    fn num_mass_dofs(&self) -> usize {
        self.n_free
    }

    fn assemble_mass(&mut self, fixed: &FixedDofs) -> Result<AssembledSystem> {
        let u_fixed = self.nodal_values(&vec![0.0; self.n_free], fixed)?;
        let mut builder = TripletBuilder::with_capacity(self.n_free, self.n_free, 4 * self.mesh.n_elements);
        let mut rhs = vec![0.0; self.n_free];

        for k in 0..self.mesh.n_elements {
            let nodes = [k, k + 1];
            let m = self.material.density * self.mesh.element_sizes[k] / 6.0;
            for a in 0..2 {
                let Some(row) = self.free_index[nodes[a]] else {
                    continue;
                };
                for b in 0..2 {
                    let entry = if a == b { 2.0 * m } else { m };
                    match self.free_index[nodes[b]] {
                        Some(col) => builder.add(row, col, entry),
                        None => rhs[row] -= entry * u_fixed[nodes[b]],
                    }
                }
            }
        }

        AssembledSystem::new(builder.build()?, rhs)
    }
}

impl MeshGeometry for ElasticBar1D {
    fn check_geometry(&self, displacement: &PatchField) -> Result<Option<usize>> {
        let jacobians = self.element_jacobians(displacement)?;
        Ok(jacobians.iter().any(|&j| j <= 0.0).then_some(0))
    }

    fn jacobian_ratio(&self, displacement: &PatchField) -> Result<f64> {
        let jacobians = self.element_jacobians(displacement)?;
        let max = jacobians.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = jacobians.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(max / min)
    }

    fn field_norm(&self, field: &PatchField) -> Result<f64> {
        let d = self.patch_values(field)?;
        let sum: f64 = (0..self.mesh.n_elements)
            .map(|k| {
                let (a, b) = (d[k], d[k + 1]);
                self.mesh.element_sizes[k] / 3.0 * (a * a + a * b + b * b)
            })
            .sum();
        Ok(sum.sqrt())
    }
}

impl FieldSampler for ElasticBar1D {
    fn evaluate(&self, field: &PatchField, patch: usize, point: &[f64]) -> Result<Vec<f64>> {
        if patch != 0 {
            return Err(FsiError::config(format!("bar has a single patch, got patch {}", patch)));
        }
        let xi = *point
            .first()
            .ok_or_else(|| FsiError::config("sample point needs one parametric coordinate"))?;
        let d = self.patch_values(field)?;
        let (k, r) = self.mesh.locate(xi);
        Ok(vec![(1.0 - r) * d[k] + r * d[k + 1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{LinearSolverKind, SparseOps, solve_linear_system};

    fn clamped(n: usize, material: BarMaterial) -> ElasticBar1D {
        ElasticBar1D::new(0.0, 1.0, n, material).with_dirichlet(BoxSide::West)
    }

    #[test]
    fn test_dof_numbering() {
        let bar = clamped(4, BarMaterial::default());
        assert_eq!(bar.num_free_dofs(), 4);
        assert_eq!(bar.num_fixed_dofs(), 1);

        let both = bar.clone().with_dirichlet(BoxSide::East);
        assert_eq!(both.num_free_dofs(), 3);
        assert_eq!(both.boundary_layout().num_conditions(), 2);
    }

    #[test]
    fn test_static_tip_load_matches_exact() {
        // u(x) = P x / EA for a tip load P
        let mut bar = clamped(5, BarMaterial::default().with_stiffness(2.0)).with_traction(BoxSide::East, 1.0);
        let fixed = bar.boundary_layout().zeros();
        let system = bar.assemble(&[0.0; 5], &fixed).unwrap();
        let u = solve_linear_system(LinearSolverKind::default(), &system.matrix, &system.rhs).unwrap();
        assert!((u[4] - 0.5).abs() < 1e-12, "tip {}", u[4]);
        assert!((u[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_tangent_matches_finite_difference() {
        let mut bar = clamped(3, BarMaterial::default().with_hardening(2.0));
        let fixed = bar.boundary_layout().zeros();
        let u = [0.1, 0.3, 0.2];
        let system = bar.assemble(&u, &fixed).unwrap();

        let eps = 1e-7;
        for j in 0..3 {
            let mut up = u;
            up[j] += eps;
            let rp = bar.assemble(&up, &fixed).unwrap().rhs;
            for i in 0..3 {
                // K_t = -dR/du
                let fd = -(rp[i] - system.rhs[i]) / eps;
                assert!((fd - system.matrix.entry(i, j)).abs() < 1e-4, "({}, {}): {} vs {}", i, j, fd, system.matrix.entry(i, j));
            }
        }
    }

    #[test]
    fn test_mass_elimination_rhs() {
        let mut bar = clamped(2, BarMaterial::default().with_density(6.0));
        let mut fixed = bar.boundary_layout().zeros();
        fixed.set_side(0, BoxSide::West, &[vec![1.0]]);
        let mass = bar.assemble_mass(&fixed).unwrap();
        // element mass rho h / 6 = 0.5; coupling entry to the fixed node is 0.5
        assert!((mass.matrix.entry(0, 0) - 2.0).abs() < 1e-14);
        assert!((mass.rhs[0] + 0.5).abs() < 1e-14);
        assert_eq!(mass.rhs[1], 0.0);
    }

    #[test]
    fn test_geometry_check() {
        let bar = ElasticBar1D::new(0.0, 1.0, 2, BarMaterial::default());
        let ok = PatchField::new(vec![FieldPatch::new(1, vec![0.0, 0.1, 0.0], bar.sides())]);
        assert_eq!(bar.check_geometry(&ok).unwrap(), None);
        let ratio = bar.jacobian_ratio(&ok).unwrap();
        assert!((ratio - 1.2 / 0.8).abs() < 1e-12);

        let folded = PatchField::new(vec![FieldPatch::new(1, vec![0.0, 0.6, 0.0], bar.sides())]);
        assert_eq!(bar.check_geometry(&folded).unwrap(), Some(0));
    }

    #[test]
    fn test_point_evaluation_and_norm() {
        let bar = ElasticBar1D::new(0.0, 2.0, 2, BarMaterial::default());
        let field = PatchField::new(vec![FieldPatch::new(1, vec![1.0, 1.0, 1.0], bar.sides())]);
        assert!((bar.field_norm(&field).unwrap() - 2.0f64.sqrt()).abs() < 1e-14);

        let linear = PatchField::new(vec![FieldPatch::new(1, vec![0.0, 1.0, 2.0], bar.sides())]);
        assert!((bar.evaluate(&linear, 0, &[0.75]).unwrap()[0] - 1.5).abs() < 1e-14);
        assert!(bar.evaluate(&linear, 1, &[0.5]).is_err());
    }
}
