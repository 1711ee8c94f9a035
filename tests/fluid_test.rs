//! Fluid theta-scheme integration: step system structure, ALE transport,
//! Dirichlet elimination and checkpoints.

use std::collections::BTreeMap;

use fsi_rs::assembly::{
    AssembledSystem, ConvectiveDiscretization, ConvectiveLinearization, Discretization, MassForm,
};
use fsi_rs::boundary::{BoundaryLayout, FixedDofs, PatchLink};
use fsi_rs::field::{FieldPatch, PatchField};
use fsi_rs::linalg::sparse::{diagonal, from_triplets};
use fsi_rs::models::{ChannelFlow1D, FlowProperties};
use fsi_rs::time::{FluidIntegrator, IntegratorConfig, TimeIntegrator, TimeScheme};
use fsi_rs::types::{BoxSide, PatchSide};
use fsi_rs::{FsiError, Result};

/// One velocity and one pressure unknown with a constant operator
/// `[a b; c d]`, load `(f_v, f_p)` and mass `m`. Records every transport
/// velocity it is assembled with.
struct Toy {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    f_v: f64,
    f_p: f64,
    m: f64,
    layout: BoundaryLayout,
    seen: Vec<(f64, f64)>,
}

impl Toy {
    fn new() -> Self {
        Self {
            a: 2.0,
            b: 1.0,
            c: 1.0,
            d: -1.0,
            f_v: 0.5,
            f_p: 0.0,
            m: 1.0,
            layout: BoundaryLayout::new(),
            seen: Vec::new(),
        }
    }
}

fn scalar_field(value: f64) -> PatchField {
    PatchField::new(vec![FieldPatch::new(1, vec![value], BTreeMap::new())])
}

impl Discretization for Toy {
    fn num_free_dofs(&self) -> usize {
        2
    }

    fn boundary_layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    fn assemble(&mut self, free: &[f64], fixed: &FixedDofs) -> Result<AssembledSystem> {
        let transport = scalar_field(free[0]);
        self.assemble_convective(free, fixed, &transport, ConvectiveLinearization::NewtonNext)
    }

    fn construct_field(&self, free: &[f64], _fixed: &FixedDofs) -> Result<PatchField> {
        Ok(scalar_field(free[0]))
    }
}

impl MassForm for Toy {
    fn num_mass_dofs(&self) -> usize {
        1
    }

    fn assemble_mass(&mut self, _fixed: &FixedDofs) -> Result<AssembledSystem> {
        AssembledSystem::new(diagonal(&[self.m]), vec![0.0])
    }
}

impl ConvectiveDiscretization for Toy {
    fn num_velocity_dofs(&self) -> usize {
        1
    }

    fn velocity_field(&self, free: &[f64], _fixed: &FixedDofs) -> Result<PatchField> {
        Ok(scalar_field(free[0]))
    }

    fn pressure_field(&self, free: &[f64], _fixed: &FixedDofs) -> Result<PatchField> {
        Ok(scalar_field(free[1]))
    }

    fn assemble_convective(
        &mut self,
        free: &[f64],
        _fixed: &FixedDofs,
        transport: &PatchField,
        _linearization: ConvectiveLinearization,
    ) -> Result<AssembledSystem> {
        self.seen.push((free[0], transport.patch(0)?.coefs()[0]));
        let matrix = from_triplets(
            2,
            2,
            &[(0, 0, self.a), (0, 1, self.b), (1, 0, self.c), (1, 1, self.d)],
        )?;
        AssembledSystem::new(matrix, vec![self.f_v, self.f_p])
    }

    fn displace_patch(&mut self, _patch: usize, _displacement: &FieldPatch) -> Result<()> {
        Ok(())
    }

    fn boundary_force(&self, free: &[f64], _fixed: &FixedDofs, _sides: &[PatchSide]) -> Result<Vec<f64>> {
        Ok(vec![free[1]])
    }

    fn pressure_at(&self, free: &[f64], _fixed: &FixedDofs, _patch: usize, _point: &[f64]) -> Result<f64> {
        Ok(free[1])
    }
}

fn toy_integrator(config: IntegratorConfig) -> FluidIntegrator<Toy> {
    let mut fluid = FluidIntegrator::new(Toy::new(), config).unwrap();
    fluid.set_solution_vector(vec![1.0, 0.0]).unwrap();
    fluid
}

#[test]
fn test_single_step_matches_hand_computation() {
    // [1 + 0.1*0.5*2, 0.1; 0.1, -0.1] [v; p] = [0.05 - 0.1 + 1; 0]
    for scheme in [TimeScheme::ImplicitLinear, TimeScheme::ImplicitNonlinear] {
        let mut fluid = toy_integrator(IntegratorConfig::fluid().with_scheme(scheme));
        let report = fluid.make_time_step(0.1).unwrap();
        assert!(report.converged);

        let expected = 0.95 / 1.2;
        let x = fluid.solution_vector();
        assert!((x[0] - expected).abs() < 1e-12, "{}: v = {}", scheme.name(), x[0]);
        assert!((x[1] - expected).abs() < 1e-12, "{}: p = {}", scheme.name(), x[1]);
    }
}

#[test]
fn test_pressure_rows_are_not_theta_blended() {
    // c v + d p = f_p must hold after every step, whatever theta and dt
    for theta in [0.5, 0.75, 1.0] {
        let mut fluid = toy_integrator(IntegratorConfig::fluid().with_theta(theta));
        for dt in [0.3, 0.05, 0.2] {
            fluid.make_time_step(dt).unwrap();
            let x = fluid.solution_vector();
            assert!((x[0] - x[1]).abs() < 1e-12, "theta {}, dt {}: {:?}", theta, dt, x);
        }
    }
}

#[test]
fn test_mesh_velocity_is_subtracted_at_every_assembly() {
    let mut fluid = toy_integrator(IntegratorConfig::fluid());
    assert!(fluid.set_ale_velocity(scalar_field(0.25)).is_err());

    fluid.enable_ale(vec![PatchLink::new(0, 0)]);
    fluid.initialize().unwrap();
    let at_rest = fluid.discretization().seen.len();
    assert!(at_rest > 0);

    fluid.set_ale_velocity(scalar_field(0.25)).unwrap();
    for _ in 0..3 {
        fluid.make_time_step(0.1).unwrap();
    }

    let seen = &fluid.discretization().seen;
    for &(velocity, transport) in &seen[..at_rest] {
        assert_eq!(velocity, transport);
    }
    assert!(seen.len() > at_rest + 3);
    for &(velocity, transport) in &seen[at_rest..] {
        assert!((velocity - 0.25 - transport).abs() < 1e-15);
    }
}

#[test]
fn test_geometry_moves_only_with_ale() {
    let mut fluid = toy_integrator(IntegratorConfig::fluid());
    assert!(fluid.displace_geometry(&scalar_field(0.1)).is_err());
    fluid.enable_ale(vec![PatchLink::new(0, 0)]);
    assert!(fluid.displace_geometry(&scalar_field(0.1)).is_ok());
}

#[test]
fn test_missing_initial_condition() {
    let mut fluid = FluidIntegrator::new(Toy::new(), IntegratorConfig::fluid()).unwrap();
    assert!(matches!(
        fluid.make_time_step(0.1),
        Err(FsiError::MissingInitialCondition(_))
    ));
    assert!(FluidIntegrator::new(Toy::new(), IntegratorConfig::structural()).is_err());
}

// =============================================================================
// Channel flow
// =============================================================================

fn channel(n: usize) -> FluidIntegrator<ChannelFlow1D> {
    let flow = ChannelFlow1D::new(0.0, 1.0, n, FlowProperties::default())
        .with_dirichlet(BoxSide::West)
        .with_dirichlet(BoxSide::East);
    let n_free = flow.num_free_dofs();
    let mut fluid = FluidIntegrator::new(flow, IntegratorConfig::fluid()).unwrap();
    fluid.set_solution_vector(vec![0.0; n_free]).unwrap();
    fluid
}

#[test]
fn test_channel_at_rest_stays_at_rest() {
    let mut fluid = channel(6);
    for _ in 0..5 {
        let report = fluid.make_time_step(0.1).unwrap();
        assert!(report.converged);
    }
    assert!(fluid.solution_vector().iter().all(|x| x.abs() < 1e-14));
}

#[test]
fn test_uniform_channel_flow_is_steady() {
    let mut fluid = channel(4);
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![0.5]]).unwrap();
    fluid.set_fixed_dofs(0, BoxSide::East, &[vec![0.5]]).unwrap();
    fluid
        .set_solution_vector(vec![0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0])
        .unwrap();
    for _ in 0..4 {
        fluid.make_time_step(0.05).unwrap();
    }
    let x = fluid.solution_vector();
    assert!(x[..3].iter().all(|v| (v - 0.5).abs() < 1e-10), "{:?}", x);
    assert!(x[3..].iter().all(|p| p.abs() < 1e-8), "{:?}", x);
}

#[test]
fn test_dirichlet_data_enters_mass_elimination() {
    let mut fluid = channel(4);
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![1.0]]).unwrap();
    fluid.make_time_step(0.1).unwrap();

    // -M_fD u_D with M_01 = rho h / 6
    let rhs = fluid.mass_elimination_rhs();
    assert_eq!(rhs.len(), 3);
    assert!((rhs[0] + 0.25 / 6.0).abs() < 1e-15);
    assert_eq!(rhs[1], 0.0);
    assert_eq!(rhs[2], 0.0);
    assert_eq!(fluid.fixed_dofs_side(0, BoxSide::West), vec![vec![1.0]]);

    // flow is driven into the channel
    assert!(fluid.solution_vector()[0] > 0.0);
}

#[test]
fn test_homogenized_inflow() {
    let mut fluid = channel(4);
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![1.0]]).unwrap();
    fluid.homogenize_fixed_dofs();
    assert_eq!(fluid.fixed_dofs_side(0, BoxSide::West), vec![vec![0.0]]);
}

#[test]
fn test_channel_checkpoint_round_trip() {
    let mut fluid = channel(4);
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![0.2]]).unwrap();
    fluid.make_time_step(0.1).unwrap();
    fluid.save_state().unwrap();

    let state = fluid.state().clone();
    let mass_rhs = fluid.mass_elimination_rhs().to_vec();
    let system = fluid.assembler().last_system().cloned();

    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![0.4]]).unwrap();
    fluid.make_time_step(0.1).unwrap();
    fluid.recover_state().unwrap();

    assert_eq!(fluid.state(), &state);
    assert_eq!(fluid.mass_elimination_rhs(), mass_rhs.as_slice());
    assert_eq!(fluid.assembler().last_system().cloned(), system);
    assert!(matches!(fluid.recover_state(), Err(FsiError::NoSavedState)));
}

#[test]
fn test_recover_state_restores_mesh_velocity() {
    let mut fluid = channel(4);
    fluid.enable_ale(vec![PatchLink::new(0, 0)]);
    let at_rest = fluid.ale().clone();
    fluid.save_state().unwrap();

    let velocity = PatchField::new(vec![FieldPatch::new(1, vec![0.5; 5], BTreeMap::new())]);
    fluid.set_ale_velocity(velocity).unwrap();
    assert_ne!(fluid.ale(), &at_rest);

    fluid.recover_state().unwrap();
    assert_eq!(fluid.ale(), &at_rest);
}

#[test]
fn test_channel_force_and_pressure_samples() {
    let mut fluid = channel(4);
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![0.01]]).unwrap();
    fluid.make_time_step(0.1).unwrap();

    let force = fluid.boundary_force(&[PatchSide::new(0, BoxSide::East)]).unwrap();
    assert_eq!(force.len(), 1);
    let p_east = fluid.pressure_field().unwrap().patch(0).unwrap().coefs()[3];
    assert_eq!(fluid.pressure_at(0, &[0.99]).unwrap(), p_east);
}
