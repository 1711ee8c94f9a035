//! Theta-scheme integrator for structural dynamics.
//!
//! Second-order dynamics `M a = R(u)` (with `R = f_ext - f_int`) are written
//! as the first-order system
//!
//! ```text
//! u_{n+1} = u_n + dt (theta v_{n+1} + (1 - theta) v_n)
//! M v_{n+1} = M v_n + dt (theta R(u_{n+1}) + (1 - theta) R(u_n))
//! ```
//!
//! For `theta > 0` the velocity is eliminated and the step is solved for
//! the displacement:
//!
//! ```text
//! (a M + K_t) du = R(u) + c1 R_n + M (a (u_n - u) + b v_n)
//! a = 1 / (theta^2 dt^2),  b = 1 / (theta^2 dt),  c1 = (1 - theta) / theta
//! v_{n+1} = (u_{n+1} - u_n) / (theta dt) - c1 v_n
//! ```
//!
//! `theta = 0` is explicit: `u_{n+1} = u_n + dt v_n` and one mass solve
//! for the velocity.
//!
//! When the mass form covers fewer DOFs than the stiffness form (a mixed
//! displacement/pressure formulation), the mass terms enter the leading
//! block only. Time derivatives of Dirichlet data are not taken into
//! account: prescribed structural displacements act as quasi-static
//! constraints.

use crate::assembly::{AssembledSystem, AssemblerAdapter, Discretization, MassForm, SystemAssembler};
use crate::boundary::{BoundaryKey, FixedDofs};
use crate::error::{FsiError, Result, check_len};
use crate::field::PatchField;
use crate::linalg::vector::{axpy, scaled, sub};
use crate::linalg::sparse::zeros;
use crate::linalg::{SparseMatrix, SparseOps, blend_leading_block, solve_linear_system};
use crate::nonlinear::{ConvergenceReport, IterationMode, NewtonSolver};
use crate::state::FieldState;
use crate::types::BoxSide;

use super::integrator::check_step_size;
use super::{IntegratorConfig, IntegratorInfo, IntegratorPhase, TimeIntegrator, TimeScheme};

#[derive(Clone, Debug)]
struct StructuralCheckpoint {
    state: FieldState,
    velocity: Vec<f64>,
    residual: Vec<f64>,
    last_system: Option<AssembledSystem>,
    phase: IntegratorPhase,
    num_iters: usize,
    steps: usize,
}

/// Time integrator for a structural field.
#[derive(Clone)]
pub struct StructuralIntegrator<D> {
    assembler: AssemblerAdapter<D>,
    config: IntegratorConfig,
    state: FieldState,
    velocity: Vec<f64>,
    /// `R(u_n)` over all free DOFs
    residual: Vec<f64>,
    mass: SparseMatrix,
    phase: IntegratorPhase,
    num_iters: usize,
    steps: usize,
    checkpoint: Option<StructuralCheckpoint>,
}

impl<D: Discretization + MassForm> StructuralIntegrator<D> {
    pub fn new(discretization: D, config: IntegratorConfig) -> Result<Self> {
        config.validate(IterationMode::Update)?;
        let n = discretization.num_free_dofs();
        let n_mass = discretization.num_mass_dofs();
        if n_mass > n {
            return Err(FsiError::config(format!(
                "structural mass form covers {} dofs, more than the {} free dofs",
                n_mass, n
            )));
        }
        let fixed = discretization.boundary_layout().zeros();
        Ok(Self {
            assembler: AssemblerAdapter::new(discretization),
            config,
            state: FieldState::new(Vec::new(), fixed),
            velocity: Vec::new(),
            residual: Vec::new(),
            mass: zeros(n_mass, n_mass),
            phase: IntegratorPhase::Uninitialized,
            num_iters: 0,
            steps: 0,
            checkpoint: None,
        })
    }

    // =========================================================================
    // Initial and boundary data
    // =========================================================================

    /// Set the displacement (all free DOFs); requires re-initialization.
    pub fn set_displacement_vector(&mut self, displacement: Vec<f64>) -> Result<()> {
        check_len("structural displacement", self.assembler.num_free_dofs(), displacement.len())?;
        self.state.reset(displacement);
        self.phase = IntegratorPhase::Uninitialized;
        Ok(())
    }

    /// Set the velocity of the dynamic DOFs; requires re-initialization.
    pub fn set_velocity_vector(&mut self, velocity: Vec<f64>) -> Result<()> {
        check_len("structural velocity", self.num_dynamic_dofs(), velocity.len())?;
        self.velocity = velocity;
        self.phase = IntegratorPhase::Uninitialized;
        Ok(())
    }

    /// Replace the prescribed values of every listed component of a side.
    pub fn set_fixed_dofs(&mut self, patch: usize, side: BoxSide, components: &[Vec<f64>]) -> Result<()> {
        for (component, values) in components.iter().enumerate() {
            self.set_fixed_dof_entry(BoundaryKey::new(patch, side, component), values.clone())?;
        }
        Ok(())
    }

    /// Replace one fixed-DOF entry.
    pub fn set_fixed_dof_entry(&mut self, key: BoundaryKey, values: Vec<f64>) -> Result<()> {
        self.assembler.boundary_layout().validate_entry(&key, &values)?;
        self.state.fixed_dofs_mut().insert(key, values);
        Ok(())
    }

    pub fn fixed_dofs(&self) -> &FixedDofs {
        self.state.fixed_dofs()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn displacement_vector(&self) -> &[f64] {
        self.state.free_dofs()
    }

    pub fn velocity_vector(&self) -> &[f64] {
        &self.velocity
    }

    /// `R(u_n)` at the current state (empty before initialization).
    pub fn residual_vector(&self) -> &[f64] {
        &self.residual
    }

    /// Number of DOFs carrying inertia.
    pub fn num_dynamic_dofs(&self) -> usize {
        self.assembler.discretization().num_mass_dofs()
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn phase(&self) -> IntegratorPhase {
        self.phase
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    pub fn assembler(&self) -> &AssemblerAdapter<D> {
        &self.assembler
    }

    pub fn discretization(&self) -> &D {
        self.assembler.discretization()
    }

    /// Displacement field of the current state.
    pub fn construct_solution(&self) -> Result<PatchField> {
        self.assembler
            .construct_field(self.state.free_dofs(), self.state.fixed_dofs())
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Assemble the mass form and the residual at the initial state.
    pub fn initialize(&mut self) -> Result<()> {
        let n = self.assembler.num_free_dofs();
        if n == 0 || !self.state.is_set() {
            return Err(FsiError::MissingInitialCondition("structural displacement"));
        }
        let n_mass = self.num_dynamic_dofs();
        if self.velocity.is_empty() {
            self.velocity = vec![0.0; n_mass];
        }
        check_len("structural velocity", n_mass, self.velocity.len())?;

        self.mass = self
            .assembler
            .assemble_constant(self.state.fixed_dofs())?
            .matrix
            .clone();
        self.residual = self
            .assembler
            .assemble(self.state.free_dofs(), self.state.fixed_dofs())?
            .rhs
            .clone();

        self.phase = IntegratorPhase::Initialized;
        log::info!(
            "Structural integrator initialized: {} free dofs ({} dynamic), {} fixed, {} scheme, theta = {}",
            n,
            n_mass,
            self.assembler.num_fixed_dofs(),
            self.config.scheme.name(),
            self.config.theta
        );
        Ok(())
    }

    fn implicit_step(&mut self, dt: f64) -> Result<(Vec<f64>, Vec<f64>, ConvergenceReport)> {
        let theta = self.config.theta;
        let n_mass = self.velocity.len();
        let a = 1.0 / (theta * theta * dt * dt);
        let b = 1.0 / (theta * theta * dt);
        let c1 = (1.0 - theta) / theta;

        let u_n = self.state.free_dofs().to_vec();
        let mut const_rhs = scaled(c1, &self.residual);
        let inertia: Vec<f64> = (0..n_mass).map(|i| a * u_n[i] + b * self.velocity[i]).collect();
        axpy(1.0, &self.mass.mul_vec(&inertia), &mut const_rhs[..n_mass]);

        let seed = self.state.extrapolate(dt);
        self.phase = IntegratorPhase::Solving;

        let mut step = StructuralStepSystem {
            assembler: &mut self.assembler,
            mass: &self.mass,
            const_rhs: &const_rhs,
            mass_factor: a,
            system: None,
        };
        let fixed = self.state.fixed_dofs();

        let (u_new, report) = match self.config.scheme {
            TimeScheme::ImplicitLinear => {
                let system = step.assemble(&seed, fixed)?;
                let du = solve_linear_system(self.config.newton.linear_solver, &system.matrix, &system.rhs)?;
                let report = ConvergenceReport::single_solve(system.rhs_norm());
                let mut u = seed.clone();
                axpy(1.0, &du, &mut u);
                (u, report)
            }
            TimeScheme::ImplicitNonlinear => NewtonSolver::new(self.config.newton).solve(&mut step, &seed, fixed)?,
        };

        let residual = match self.config.scheme {
            // first-order correction of the residual linearized at the seed
            TimeScheme::ImplicitLinear => {
                let seed_system = self.last_stiffness()?;
                let correction = seed_system.matrix.mul_vec(&sub(&u_new, &seed));
                sub(&seed_system.rhs, &correction)
            }
            // the last Newton assembly is at u_new
            TimeScheme::ImplicitNonlinear => self.last_stiffness()?.rhs.clone(),
        };

        let velocity = (0..n_mass)
            .map(|i| (u_new[i] - u_n[i]) / (theta * dt) - c1 * self.velocity[i])
            .collect();

        self.state.advance(u_new, dt);
        Ok((velocity, residual, report))
    }

    fn explicit_step(&mut self, dt: f64) -> Result<(Vec<f64>, Vec<f64>, ConvergenceReport)> {
        let n_mass = self.velocity.len();
        if n_mass != self.assembler.num_free_dofs() {
            return Err(FsiError::config(
                "explicit (theta = 0) structural step needs a pure displacement formulation",
            ));
        }
        self.phase = IntegratorPhase::Solving;

        let mut u_new = self.state.free_dofs().to_vec();
        axpy(dt, &self.velocity, &mut u_new);

        let mut momentum = self.mass.mul_vec(&self.velocity);
        axpy(dt, &self.residual, &mut momentum);
        let velocity = solve_linear_system(self.config.newton.linear_solver, &self.mass, &momentum)?;
        let report = ConvergenceReport::single_solve(crate::linalg::vector::norm2(&self.residual));

        let residual = self
            .assembler
            .assemble(&u_new, self.state.fixed_dofs())?
            .rhs
            .clone();

        self.state.advance(u_new, dt);
        Ok((velocity, residual, report))
    }

    fn last_stiffness(&self) -> Result<&AssembledSystem> {
        self.assembler
            .last_system()
            .ok_or_else(|| FsiError::config("structural stiffness system not assembled"))
    }
}

impl<D: Discretization + MassForm> IntegratorInfo for StructuralIntegrator<D> {
    fn name(&self) -> &'static str {
        "structural theta scheme"
    }

    fn scheme(&self) -> TimeScheme {
        self.config.scheme
    }

    fn theta(&self) -> f64 {
        self.config.theta
    }
}

impl<D: Discretization + MassForm> TimeIntegrator for StructuralIntegrator<D> {
    fn make_time_step(&mut self, dt: f64) -> Result<ConvergenceReport> {
        check_step_size(dt)?;
        if !self.phase.is_initialized() {
            self.initialize()?;
        }
        self.phase = IntegratorPhase::Assembling;

        let (velocity, residual, report) = if self.config.theta == 0.0 {
            self.explicit_step(dt)?
        } else {
            self.implicit_step(dt)?
        };

        self.velocity = velocity;
        self.residual = residual;
        self.num_iters = report.iterations;
        self.steps += 1;
        self.phase = IntegratorPhase::Advanced;

        log::debug!("Structure step {}: {}", self.steps, report.summary_line());
        Ok(report)
    }

    fn save_state(&mut self) -> Result<()> {
        if !self.phase.is_initialized() {
            self.initialize()?;
        }
        self.checkpoint = Some(StructuralCheckpoint {
            state: self.state.clone(),
            velocity: self.velocity.clone(),
            residual: self.residual.clone(),
            last_system: self.assembler.last_system().cloned(),
            phase: self.phase,
            num_iters: self.num_iters,
            steps: self.steps,
        });
        Ok(())
    }

    fn recover_state(&mut self) -> Result<()> {
        let checkpoint = self.checkpoint.take().ok_or(FsiError::NoSavedState)?;
        self.state = checkpoint.state;
        self.velocity = checkpoint.velocity;
        self.residual = checkpoint.residual;
        self.assembler.restore_last(checkpoint.last_system);
        self.phase = checkpoint.phase;
        self.num_iters = checkpoint.num_iters;
        self.steps = checkpoint.steps;
        Ok(())
    }

    fn number_iterations(&self) -> usize {
        self.num_iters
    }

    fn state(&self) -> &FieldState {
        &self.state
    }

    fn steps_taken(&self) -> usize {
        self.steps
    }
}

// =============================================================================
// Per-step system
// =============================================================================

/// The step equations seen by the Newton solver: stiffness plus scaled mass
/// on the leading block, residual plus the constant step terms.
struct StructuralStepSystem<'a, D> {
    assembler: &'a mut AssemblerAdapter<D>,
    mass: &'a SparseMatrix,
    const_rhs: &'a [f64],
    mass_factor: f64,
    system: Option<AssembledSystem>,
}

impl<D: Discretization> SystemAssembler for StructuralStepSystem<'_, D> {
    fn num_free_dofs(&self) -> usize {
        self.assembler.num_free_dofs()
    }

    fn num_fixed_dofs(&self) -> usize {
        self.assembler.num_fixed_dofs()
    }

    fn assemble(&mut self, trial: &[f64], fixed: &FixedDofs) -> Result<&AssembledSystem> {
        let n_mass = self.mass.nrows();
        let stiffness = self.assembler.assemble(trial, fixed)?;

        let matrix = blend_leading_block(&stiffness.matrix, 1.0, 1.0, self.mass, self.mass_factor)?;

        let mut rhs = stiffness.rhs.clone();
        axpy(1.0, self.const_rhs, &mut rhs);
        let inertia = self.mass.mul_vec(&trial[..n_mass]);
        axpy(-self.mass_factor, &inertia, &mut rhs[..n_mass]);

        Ok(self.system.insert(AssembledSystem::new(matrix, rhs)?))
    }
}
