//! Theta-scheme integrator for incompressible flow in velocity/pressure form.
//!
//! With `K(u)` the linearized flow operator, `F` its right-hand side, `M`
//! the velocity mass matrix and `nv` velocity DOFs leading the unknowns,
//! each step solves
//!
//! ```text
//! [ M + dt theta K_vv   dt K_vp ] [v]   =  dt theta F_{n+1} + C_n
//! [ dt K_pv             dt K_pp ] [p]
//!
//! C_n = dt (1 - theta) F_n
//!     - dt (1 - theta) K_vv(u_n) v_n     (velocity rows)
//!     + M v_n - m_n + m_{n+1}            (velocity rows)
//! ```
//!
//! where `m = -M_fD u_D` eliminates the prescribed velocities, so
//! time-dependent Dirichlet data enters the time derivative. Pressure rows
//! are scaled by `dt` only.
//!
//! The implicit-linear scheme builds an Oseen system around the
//! extrapolated velocity and solves it once; the implicit-nonlinear scheme
//! runs Newton (next-iterate form) on Newton-linearized systems.
//!
//! With ALE coupling enabled, the mesh velocity is subtracted from the
//! transport velocity on every linked patch before each assembly, and the
//! mass form is re-assembled every step on the moved geometry. Checkpoints
//! cover the solution history and cached systems, not the geometry.

use crate::assembly::{
    AssembledSystem, AssemblerAdapter, ConvectiveDiscretization, ConvectiveLinearization, MassForm,
    SystemAssembler,
};
use crate::boundary::{BoundaryKey, FixedDofs, PatchLink};
use crate::error::{FsiError, Result, check_len};
use crate::field::PatchField;
use crate::linalg::vector::{axpy, scaled};
use crate::linalg::sparse::zeros;
use crate::linalg::{SparseMatrix, SparseOps, blend_leading_block, solve_linear_system};
use crate::nonlinear::{ConvergenceReport, IterationMode, NewtonSolver};
use crate::state::FieldState;
use crate::types::{BoxSide, PatchSide};

use super::integrator::check_step_size;
use super::{IntegratorConfig, IntegratorInfo, IntegratorPhase, TimeIntegrator, TimeScheme};

/// Whether and how the flow domain follows a moving mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AleCoupling {
    /// Fixed domain; transport velocity is the flow velocity
    #[default]
    Disabled,
    /// Moving domain; `links` map mesh patches (source) onto flow patches
    /// (target). Without a mesh velocity the mesh is at rest.
    Enabled {
        links: Vec<PatchLink>,
        mesh_velocity: Option<PatchField>,
    },
}

impl AleCoupling {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

#[derive(Clone, Debug)]
struct FluidCheckpoint {
    state: FieldState,
    ale: AleCoupling,
    mass: SparseMatrix,
    mass_rhs: Vec<f64>,
    last_system: Option<AssembledSystem>,
    phase: IntegratorPhase,
    num_iters: usize,
    steps: usize,
}

/// Time integrator for a flow field.
#[derive(Clone)]
pub struct FluidIntegrator<F> {
    assembler: AssemblerAdapter<F>,
    config: IntegratorConfig,
    state: FieldState,
    ale: AleCoupling,
    mass: SparseMatrix,
    /// `-M_fD u_D` at the current fixed DOFs
    mass_rhs: Vec<f64>,
    phase: IntegratorPhase,
    num_iters: usize,
    steps: usize,
    checkpoint: Option<FluidCheckpoint>,
}

impl<F: ConvectiveDiscretization + MassForm> FluidIntegrator<F> {
    pub fn new(discretization: F, config: IntegratorConfig) -> Result<Self> {
        config.validate(IterationMode::Next)?;
        let n = discretization.num_free_dofs();
        let nv = discretization.num_velocity_dofs();
        if nv > n {
            return Err(FsiError::config(format!(
                "{} velocity dofs declared but only {} free dofs",
                nv, n
            )));
        }
        if discretization.num_mass_dofs() != nv {
            return Err(FsiError::config(format!(
                "fluid mass form covers {} dofs, expected the {} velocity dofs",
                discretization.num_mass_dofs(),
                nv
            )));
        }
        let fixed = discretization.boundary_layout().zeros();
        Ok(Self {
            assembler: AssemblerAdapter::new(discretization),
            config,
            state: FieldState::new(Vec::new(), fixed),
            ale: AleCoupling::Disabled,
            mass: zeros(nv, nv),
            mass_rhs: Vec::new(),
            phase: IntegratorPhase::Uninitialized,
            num_iters: 0,
            steps: 0,
            checkpoint: None,
        })
    }

    // =========================================================================
    // Initial and boundary data
    // =========================================================================

    /// Set velocity and pressure DOFs; requires re-initialization.
    pub fn set_solution_vector(&mut self, solution: Vec<f64>) -> Result<()> {
        check_len("fluid solution", self.assembler.num_free_dofs(), solution.len())?;
        self.state.reset(solution);
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

    /// Prescribed values of a side, one vector per component.
    pub fn fixed_dofs_side(&self, patch: usize, side: BoxSide) -> Vec<Vec<f64>> {
        self.state.fixed_dofs().side(patch, side)
    }

    pub fn fixed_dofs(&self) -> &FixedDofs {
        self.state.fixed_dofs()
    }

    /// Zero every prescribed value (e.g. to start a ramped inflow from rest).
    pub fn homogenize_fixed_dofs(&mut self) {
        self.state.fixed_dofs_mut().homogenize();
    }

    // =========================================================================
    // ALE
    // =========================================================================

    /// Let the flow patches follow the linked mesh patches.
    pub fn enable_ale(&mut self, links: Vec<PatchLink>) {
        self.ale = AleCoupling::Enabled {
            links,
            mesh_velocity: None,
        };
    }

    pub fn disable_ale(&mut self) {
        self.ale = AleCoupling::Disabled;
    }

    pub fn ale(&self) -> &AleCoupling {
        &self.ale
    }

    /// Mesh velocity used for the next steps.
    pub fn set_ale_velocity(&mut self, velocity: PatchField) -> Result<()> {
        match &mut self.ale {
            AleCoupling::Enabled { mesh_velocity, .. } => {
                *mesh_velocity = Some(velocity);
                Ok(())
            }
            AleCoupling::Disabled => Err(FsiError::config(
                "mesh velocity supplied but ALE coupling is disabled",
            )),
        }
    }

    /// Move every linked flow patch by the matching mesh displacement.
    pub fn displace_geometry(&mut self, displacement: &PatchField) -> Result<()> {
        let AleCoupling::Enabled { links, .. } = &self.ale else {
            return Err(FsiError::config("cannot move the flow domain: ALE coupling is disabled"));
        };
        for link in links {
            self.assembler
                .discretization_mut()
                .displace_patch(link.target, displacement.patch(link.source)?)?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn solution_vector(&self) -> &[f64] {
        self.state.free_dofs()
    }

    /// Mass elimination right-hand side `-M_fD u_D` of the current step.
    pub fn mass_elimination_rhs(&self) -> &[f64] {
        &self.mass_rhs
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

    pub fn assembler(&self) -> &AssemblerAdapter<F> {
        &self.assembler
    }

    pub fn discretization(&self) -> &F {
        self.assembler.discretization()
    }

    pub fn velocity_field(&self) -> Result<PatchField> {
        self.assembler
            .check_trial(self.state.free_dofs(), self.state.fixed_dofs())?;
        self.discretization()
            .velocity_field(self.state.free_dofs(), self.state.fixed_dofs())
    }

    pub fn pressure_field(&self) -> Result<PatchField> {
        self.assembler
            .check_trial(self.state.free_dofs(), self.state.fixed_dofs())?;
        self.discretization()
            .pressure_field(self.state.free_dofs(), self.state.fixed_dofs())
    }

    /// Force of the flow on the given sides.
    pub fn boundary_force(&self, sides: &[PatchSide]) -> Result<Vec<f64>> {
        self.discretization()
            .boundary_force(self.state.free_dofs(), self.state.fixed_dofs(), sides)
    }

    /// Pressure at a parametric point.
    pub fn pressure_at(&self, patch: usize, point: &[f64]) -> Result<f64> {
        self.discretization()
            .pressure_at(self.state.free_dofs(), self.state.fixed_dofs(), patch, point)
    }

    fn linearization(&self) -> ConvectiveLinearization {
        match self.config.scheme {
            TimeScheme::ImplicitLinear => ConvectiveLinearization::Oseen,
            TimeScheme::ImplicitNonlinear => ConvectiveLinearization::NewtonNext,
        }
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Assemble the mass form and the flow system at the initial state.
    pub fn initialize(&mut self) -> Result<()> {
        if self.assembler.num_free_dofs() == 0 || !self.state.is_set() {
            return Err(FsiError::MissingInitialCondition("fluid solution"));
        }
        let constant = self.assembler.assemble_constant(self.state.fixed_dofs())?;
        self.mass = constant.matrix.clone();
        self.mass_rhs = constant.rhs.clone();

        let free = self.state.free_dofs();
        let fixed = self.state.fixed_dofs();
        let transport = transport_velocity(self.assembler.discretization(), &self.ale, free, fixed)?;
        let linearization = self.linearization();
        self.assembler
            .assemble_with_transport(free, fixed, &transport, linearization)?;

        self.phase = IntegratorPhase::Initialized;
        log::info!(
            "Fluid integrator initialized: {} free dofs ({} velocity), {} fixed, {} scheme, theta = {}, ALE {}",
            self.assembler.num_free_dofs(),
            self.mass.nrows(),
            self.assembler.num_fixed_dofs(),
            self.config.scheme.name(),
            self.config.theta,
            if self.ale.is_enabled() { "on" } else { "off" }
        );
        Ok(())
    }

    /// Constant part of the step right-hand side from the level-n system.
    fn constant_rhs(&self, dt: f64) -> Result<Vec<f64>> {
        let theta = self.config.theta;
        let nv = self.mass.nrows();
        let stiffness = self
            .assembler
            .last_system()
            .ok_or_else(|| FsiError::config("fluid system not assembled"))?;
        let v_n = &self.state.free_dofs()[..nv];

        let mut rhs = scaled(dt * (1.0 - theta), &stiffness.rhs);
        let k_vv = stiffness.matrix.block(0, 0, nv, nv)?;
        let head = &mut rhs[..nv];
        axpy(-dt * (1.0 - theta), &k_vv.mul_vec(v_n), head);
        axpy(1.0, &self.mass.mul_vec(v_n), head);
        axpy(-1.0, &self.mass_rhs, head);
        Ok(rhs)
    }
}

impl<F: ConvectiveDiscretization + MassForm> IntegratorInfo for FluidIntegrator<F> {
    fn name(&self) -> &'static str {
        "fluid theta scheme"
    }

    fn scheme(&self) -> TimeScheme {
        self.config.scheme
    }

    fn theta(&self) -> f64 {
        self.config.theta
    }
}

impl<F: ConvectiveDiscretization + MassForm> TimeIntegrator for FluidIntegrator<F> {
    fn make_time_step(&mut self, dt: f64) -> Result<ConvergenceReport> {
        check_step_size(dt)?;
        if !self.phase.is_initialized() {
            self.initialize()?;
        }
        self.phase = IntegratorPhase::Assembling;

        // the flow domain may have moved since the last step
        let constant = self.assembler.assemble_constant(self.state.fixed_dofs())?;
        self.mass = constant.matrix.clone();
        let mass_rhs = constant.rhs.clone();

        let nv = self.mass.nrows();
        let mut const_rhs = self.constant_rhs(dt)?;
        axpy(1.0, &mass_rhs, &mut const_rhs[..nv]);

        let seed = self.state.extrapolate(dt);
        let linearization = self.linearization();
        self.phase = IntegratorPhase::Solving;

        let mut step = FluidStepSystem {
            assembler: &mut self.assembler,
            ale: &self.ale,
            mass: &self.mass,
            const_rhs: &const_rhs,
            dt,
            theta: self.config.theta,
            linearization,
            system: None,
        };
        let fixed = self.state.fixed_dofs();

        let (solution, report) = match self.config.scheme {
            TimeScheme::ImplicitLinear => {
                let system = step.assemble(&seed, fixed)?;
                let solution = solve_linear_system(self.config.newton.linear_solver, &system.matrix, &system.rhs)?;
                let report = ConvergenceReport::single_solve(system.residual_norm(&seed)?);
                (solution, report)
            }
            TimeScheme::ImplicitNonlinear => NewtonSolver::new(self.config.newton).solve(&mut step, &seed, fixed)?,
        };

        self.state.advance(solution, dt);
        self.mass_rhs = mass_rhs;
        self.num_iters = report.iterations;
        self.steps += 1;
        self.phase = IntegratorPhase::Advanced;

        log::debug!("Fluid step {}: {}", self.steps, report.summary_line());
        Ok(report)
    }

    fn save_state(&mut self) -> Result<()> {
        if !self.phase.is_initialized() {
            self.initialize()?;
        }
        self.checkpoint = Some(FluidCheckpoint {
            state: self.state.clone(),
            ale: self.ale.clone(),
            mass: self.mass.clone(),
            mass_rhs: self.mass_rhs.clone(),
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
        self.ale = checkpoint.ale;
        self.mass = checkpoint.mass;
        self.mass_rhs = checkpoint.mass_rhs;
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

/// Flow velocity minus mesh velocity on the ALE-linked patches.
fn transport_velocity<F: ConvectiveDiscretization>(
    discretization: &F,
    ale: &AleCoupling,
    free: &[f64],
    fixed: &FixedDofs,
) -> Result<PatchField> {
    let mut transport = discretization.velocity_field(free, fixed)?;
    if let AleCoupling::Enabled {
        links,
        mesh_velocity: Some(mesh_velocity),
    } = ale
    {
        for link in links {
            transport.add_scaled_patch(link.target, -1.0, mesh_velocity.patch(link.source)?)?;
        }
    }
    Ok(transport)
}

// =============================================================================
// Per-step system
// =============================================================================

/// Blended step system: mass plus scaled flow operator on the velocity
/// block, flow operator scaled by `dt` elsewhere.
struct FluidStepSystem<'a, F> {
    assembler: &'a mut AssemblerAdapter<F>,
    ale: &'a AleCoupling,
    mass: &'a SparseMatrix,
    const_rhs: &'a [f64],
    dt: f64,
    theta: f64,
    linearization: ConvectiveLinearization,
    system: Option<AssembledSystem>,
}

impl<F: ConvectiveDiscretization> SystemAssembler for FluidStepSystem<'_, F> {
    fn num_free_dofs(&self) -> usize {
        self.assembler.num_free_dofs()
    }

    fn num_fixed_dofs(&self) -> usize {
        self.assembler.num_fixed_dofs()
    }

    fn assemble(&mut self, trial: &[f64], fixed: &FixedDofs) -> Result<&AssembledSystem> {
        let transport = transport_velocity(self.assembler.discretization(), self.ale, trial, fixed)?;
        let flow = self
            .assembler
            .assemble_with_transport(trial, fixed, &transport, self.linearization)?;

        let matrix = blend_leading_block(&flow.matrix, self.dt * self.theta, self.dt, self.mass, 1.0)?;

        let mut rhs = scaled(self.dt * self.theta, &flow.rhs);
        axpy(1.0, self.const_rhs, &mut rhs);

        Ok(self.system.insert(AssembledSystem::new(matrix, rhs)?))
    }
}
