//! One-dimensional channel flow with penalty incompressibility.
//!
//! P1 velocity and P0 (element-wise) pressure on a movable [`Mesh1D`]:
//!
//! ```text
//! rho (u_t + a u_x) - mu u_xx + p_x = f
//!                    -u_x - eps p  = 0
//! ```
//!
//! with `a` the transport velocity (flow minus mesh velocity under ALE).
//! Free DOFs are the velocity nodes without a Dirichlet condition followed
//! by one pressure per element.

use std::collections::BTreeMap;

use crate::assembly::{
    AssembledSystem, ConvectiveDiscretization, ConvectiveLinearization, Discretization, MassForm,
};
use crate::boundary::{BoundaryKey, BoundaryLayout, FixedDofs};
use crate::error::{FsiError, Result, check_len};
use crate::field::{FieldPatch, PatchField};
use crate::linalg::TripletBuilder;
use crate::types::{BoxSide, PatchSide};

use super::Mesh1D;

/// Fluid properties and stabilization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowProperties {
    pub viscosity: f64,
    pub density: f64,
    /// Penalty parameter of the continuity equation
    pub penalty: f64,
    pub body_force: f64,
}

impl Default for FlowProperties {
    fn default() -> Self {
        Self {
            viscosity: 0.01,
            density: 1.0,
            penalty: 1e-4,
            body_force: 0.0,
        }
    }
}

impl FlowProperties {
    pub fn with_viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = viscosity;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_body_force(mut self, body_force: f64) -> Self {
        self.body_force = body_force;
        self
    }
}

/// P1/P0 channel discretization, one patch with `West` and `East` sides.
#[derive(Clone, Debug)]
pub struct ChannelFlow1D {
    mesh: Mesh1D,
    props: FlowProperties,
    dirichlet: Vec<BoxSide>,
    layout: BoundaryLayout,
    velocity_index: Vec<Option<usize>>,
    n_velocity: usize,
}

impl ChannelFlow1D {
    pub fn new(x_min: f64, x_max: f64, n_elements: usize, props: FlowProperties) -> Self {
        let mut channel = Self {
            mesh: Mesh1D::uniform(x_min, x_max, n_elements),
            props,
            dirichlet: Vec::new(),
            layout: BoundaryLayout::new(),
            velocity_index: Vec::new(),
            n_velocity: 0,
        };
        channel.number_dofs();
        channel
    }

    /// Prescribe the velocity at an end.
    pub fn with_dirichlet(mut self, side: BoxSide) -> Self {
        let side = if side.is_upper() { BoxSide::East } else { BoxSide::West };
        if !self.dirichlet.contains(&side) {
            self.dirichlet.push(side);
            self.number_dofs();
        }
        self
    }

    pub fn mesh(&self) -> &Mesh1D {
        &self.mesh
    }

    pub fn properties(&self) -> &FlowProperties {
        &self.props
    }

    pub fn n_pressure(&self) -> usize {
        self.mesh.n_elements
    }

    fn end_node(&self, side: BoxSide) -> usize {
        match side {
            BoxSide::West => 0,
            _ => self.mesh.n_elements,
        }
    }

    fn number_dofs(&mut self) {
        let fixed_nodes: Vec<usize> = self.dirichlet.iter().map(|&s| self.end_node(s)).collect();
        let mut next = 0;
        self.velocity_index = (0..self.mesh.n_nodes())
            .map(|node| {
                if fixed_nodes.contains(&node) {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect();
        self.n_velocity = next;

        self.layout = BoundaryLayout::new();
        for &side in &self.dirichlet {
            self.layout.declare(BoundaryKey::new(0, side, 0), 1);
        }
    }

    /// Nodal velocities from free and fixed DOFs.
    fn velocities(&self, free: &[f64], fixed: &FixedDofs) -> Result<Vec<f64>> {
        check_len("channel free dofs", self.num_free_dofs(), free.len())?;
        let mut u = vec![0.0; self.mesh.n_nodes()];
        for (node, index) in self.velocity_index.iter().enumerate() {
            if let Some(i) = index {
                u[node] = free[*i];
            }
        }
        for &side in &self.dirichlet {
            u[self.end_node(side)] = fixed.require(&BoundaryKey::new(0, side, 0))?[0];
        }
        Ok(u)
    }

    fn pressures<'a>(&self, free: &'a [f64]) -> Result<&'a [f64]> {
        check_len("channel free dofs", self.num_free_dofs(), free.len())?;
        Ok(&free[self.n_velocity..])
    }

    fn node_sides(&self) -> BTreeMap<BoxSide, Vec<usize>> {
        BTreeMap::from([
            (BoxSide::West, vec![0]),
            (BoxSide::East, vec![self.mesh.n_elements]),
        ])
    }

    fn check_patch(&self, patch: usize) -> Result<()> {
        if patch == 0 {
            Ok(())
        } else {
            Err(FsiError::config(format!("channel has a single patch, got patch {}", patch)))
        }
    }
}

impl Discretization for ChannelFlow1D {
    fn num_free_dofs(&self) -> usize {
        self.n_velocity + self.mesh.n_elements
    }

    fn boundary_layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    /// Newton-linearized system with the flow velocity as transport.
    fn assemble(&mut self, free: &[f64], fixed: &FixedDofs) -> Result<AssembledSystem> {
        let transport = self.velocity_field(free, fixed)?;
        self.assemble_convective(free, fixed, &transport, ConvectiveLinearization::NewtonNext)
    }

    fn construct_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField> {
        self.velocity_field(free, fixed)
    }
}

impl MassForm for ChannelFlow1D {
    fn num_mass_dofs(&self) -> usize {
        self.n_velocity
    }

    fn assemble_mass(&mut self, fixed: &FixedDofs) -> Result<AssembledSystem> {
        let u = self.velocities(&vec![0.0; self.num_free_dofs()], fixed)?;
        let nv = self.n_velocity;
        let mut builder = TripletBuilder::with_capacity(nv, nv, 4 * self.mesh.n_elements);
        let mut rhs = vec![0.0; nv];

        for k in 0..self.mesh.n_elements {
            let nodes = [k, k + 1];
            let m = self.props.density * self.mesh.element_sizes[k] / 6.0;
            for a in 0..2 {
                let Some(row) = self.velocity_index[nodes[a]] else {
                    continue;
                };
                for b in 0..2 {
                    let entry = if a == b { 2.0 * m } else { m };
                    match self.velocity_index[nodes[b]] {
                        Some(col) => builder.add(row, col, entry),
                        None => rhs[row] -= entry * u[nodes[b]],
                    }
                }
            }
        }

        AssembledSystem::new(builder.build()?, rhs)
    }
}

impl ConvectiveDiscretization for ChannelFlow1D {
    fn num_velocity_dofs(&self) -> usize {
        self.n_velocity
    }

    fn velocity_field(&self, free: &[f64], fixed: &FixedDofs) -> Result<PatchField> {
        let u = self.velocities(free, fixed)?;
        Ok(PatchField::new(vec![FieldPatch::new(1, u, self.node_sides())]))
    }

    fn pressure_field(&self, free: &[f64], _fixed: &FixedDofs) -> Result<PatchField> {
        let p = self.pressures(free)?.to_vec();
        let sides = BTreeMap::from([
            (BoxSide::West, vec![0]),
            (BoxSide::East, vec![self.mesh.n_elements - 1]),
        ]);
        Ok(PatchField::new(vec![FieldPatch::new(1, p, sides)]))
    }

    fn assemble_convective(
        &mut self,
        free: &[f64],
        fixed: &FixedDofs,
        transport: &PatchField,
        linearization: ConvectiveLinearization,
    ) -> Result<AssembledSystem> {
        let u = self.velocities(free, fixed)?;
        let a = transport.patch(0)?.coefs();
        check_len("channel transport velocity", self.mesh.n_nodes(), a.len())?;

        let nv = self.n_velocity;
        let n = self.num_free_dofs();
        let newton = linearization == ConvectiveLinearization::NewtonNext;
        let FlowProperties {
            viscosity: mu,
            density: rho,
            penalty,
            body_force,
        } = self.props;

        let mut builder = TripletBuilder::with_capacity(n, n, 10 * self.mesh.n_elements);
        let mut rhs = vec![0.0; n];
        let sign = [-1.0, 1.0];

        for k in 0..self.mesh.n_elements {
            let nodes = [k, k + 1];
            let h = self.mesh.element_sizes[k];
            let a_mean = 0.5 * (a[k] + a[k + 1]);
            let u_x = (u[k + 1] - u[k]) / h;
            let pressure = nv + k;

            for i in 0..2 {
                let Some(row) = self.velocity_index[nodes[i]] else {
                    continue;
                };
                rhs[row] += body_force * h / 2.0;
                if newton {
                    rhs[row] += rho * u_x * h / 6.0 * (2.0 * u[nodes[i]] + u[nodes[1 - i]]);
                }
                builder.add(row, pressure, -sign[i]);

                for j in 0..2 {
                    let mut entry = mu / h * sign[i] * sign[j] + 0.5 * rho * a_mean * sign[j];
                    if newton {
                        entry += rho * u_x * h / 6.0 * if i == j { 2.0 } else { 1.0 };
                    }
                    match self.velocity_index[nodes[j]] {
                        Some(col) => builder.add(row, col, entry),
                        None => rhs[row] -= entry * u[nodes[j]],
                    }
                }
            }

            for j in 0..2 {
                match self.velocity_index[nodes[j]] {
                    Some(col) => builder.add(pressure, col, -sign[j]),
                    None => rhs[pressure] += sign[j] * u[nodes[j]],
                }
            }
            builder.add(pressure, pressure, -penalty * h);
        }

        AssembledSystem::new(builder.build()?, rhs)
    }

    fn displace_patch(&mut self, patch: usize, displacement: &FieldPatch) -> Result<()> {
        self.check_patch(patch)?;
        if displacement.n_components() != 1 {
            return Err(FsiError::config("channel geometry moves along a single direction"));
        }
        self.mesh.displace(displacement.coefs())
    }

    fn boundary_force(&self, free: &[f64], fixed: &FixedDofs, sides: &[PatchSide]) -> Result<Vec<f64>> {
        let u = self.velocities(free, fixed)?;
        let p = self.pressures(free)?;
        let mut force = 0.0;
        for at in sides {
            self.check_patch(at.patch)?;
            let k = if at.side.is_upper() { self.mesh.n_elements - 1 } else { 0 };
            let u_x = (u[k + 1] - u[k]) / self.mesh.element_sizes[k];
            // force on the wall: -sigma n with sigma = -p + mu u_x
            force += at.side.outward_sign() * (p[k] - self.props.viscosity * u_x);
        }
        Ok(vec![force])
    }

    fn pressure_at(&self, free: &[f64], _fixed: &FixedDofs, patch: usize, point: &[f64]) -> Result<f64> {
        self.check_patch(patch)?;
        let xi = *point
            .first()
            .ok_or_else(|| FsiError::config("sample point needs one parametric coordinate"))?;
        let (k, _) = self.mesh.locate(xi);
        Ok(self.pressures(free)?[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{LinearSolverKind, solve_linear_system};

    fn channel(n: usize) -> ChannelFlow1D {
        ChannelFlow1D::new(0.0, 1.0, n, FlowProperties::default())
            .with_dirichlet(BoxSide::West)
            .with_dirichlet(BoxSide::East)
    }

    #[test]
    fn test_dof_layout() {
        let c = channel(4);
        assert_eq!(c.num_velocity_dofs(), 3);
        assert_eq!(c.num_free_dofs(), 7);
        assert_eq!(c.num_mass_dofs(), 3);
        assert_eq!(c.boundary_layout().num_fixed_dofs(), 2);
    }

    #[test]
    fn test_uniform_flow_is_steady_solution() {
        // constant velocity: no viscous, convective or compressive response
        let mut c = channel(4);
        let mut fixed = c.boundary_layout().zeros();
        fixed.set_side(0, BoxSide::West, &[vec![0.5]]);
        fixed.set_side(0, BoxSide::East, &[vec![0.5]]);
        let guess = vec![0.0; 7];
        let transport = c.velocity_field(&[0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0], &fixed).unwrap();
        let system = c
            .assemble_convective(&guess, &fixed, &transport, ConvectiveLinearization::Oseen)
            .unwrap();
        let x = solve_linear_system(LinearSolverKind::default(), &system.matrix, &system.rhs).unwrap();

        for v in &x[..3] {
            assert!((v - 0.5).abs() < 1e-12, "velocity {}", v);
        }
        for p in &x[3..] {
            assert!(p.abs() < 1e-10, "pressure {}", p);
        }
    }

    #[test]
    fn test_newton_next_reproduces_solution_at_fixed_point() {
        // at a solution of the nonlinear problem, the Newton-next system
        // returns the same point
        let mut c = channel(3);
        let fixed = c.boundary_layout().zeros();
        let x = vec![0.0; c.num_free_dofs()];
        let system = c.assemble(&x, &fixed).unwrap();
        assert!(system.residual_norm(&x).unwrap() < 1e-14);
    }

    #[test]
    fn test_compression_raises_pressure() {
        let mut c = channel(2);
        let mut fixed = c.boundary_layout().zeros();
        // inflow from both ends squeezes the channel
        fixed.set_side(0, BoxSide::West, &[vec![1e-3]]);
        fixed.set_side(0, BoxSide::East, &[vec![-1e-3]]);
        let x0 = vec![0.0; c.num_free_dofs()];
        let transport = c.velocity_field(&x0, &fixed).unwrap();
        let system = c
            .assemble_convective(&x0, &fixed, &transport, ConvectiveLinearization::Oseen)
            .unwrap();
        let x = solve_linear_system(LinearSolverKind::default(), &system.matrix, &system.rhs).unwrap();
        let p = &x[1..];
        assert!(p.iter().all(|&p| p > 0.0), "pressures {:?}", p);

        let force = c
            .boundary_force(&x, &fixed, &[PatchSide::new(0, BoxSide::West)])
            .unwrap();
        assert!(force[0] < 0.0, "west wall is pushed outward, got {}", force[0]);
        assert_eq!(c.pressure_at(&x, &fixed, 0, &[0.9]).unwrap(), p[1]);
    }

    #[test]
    fn test_displace_patch_moves_mesh() {
        let mut c = channel(2);
        let sides = BTreeMap::from([(BoxSide::West, vec![0])]);
        let d = FieldPatch::new(1, vec![0.1, 0.05, 0.0], sides);
        c.displace_patch(0, &d).unwrap();
        assert!((c.mesh().x_min - 0.1).abs() < 1e-14);
        assert!((c.mesh().element_sizes[0] - 0.45).abs() < 1e-14);
        assert!(c.displace_patch(1, &d).is_err());
    }
}
