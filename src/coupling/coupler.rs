//! Staggered structure → mesh → flow coupler.
//!
//! Each macro step:
//!
//! 1. checkpoint and advance the structure, take its displacement increment
//! 2. impose the increment traces on the mesh interface and solve the mesh
//!    increment (one Newton iteration)
//! 3. reject a folded mesh and halt before the flow step
//! 4. move the flow geometry by the mesh increment, impose
//!    `increment / dt` as interface velocity and ALE mesh velocity
//! 5. re-impose ramped inflow data and advance the flow
//! 6. record forces, sampled values and timings
//!
//! A step that fails (folded mesh, diverged solve, solver error) is rolled
//! back as a whole: the structure, the mesh-motion state and the flow state
//! and geometry return to the start of the step.
//!
//! The coupling is explicit: there are no sub-iterations between the
//! fields within a step.

use std::io::Write;
use std::path::Path;

use crate::assembly::{ConvectiveDiscretization, Discretization, FieldSampler, MassForm, MeshGeometry};
use crate::boundary::CouplingLink;
use crate::diagnostics::{DiagnosticLog, ProgressReporter, StageTimers, StepRecord, format_hms};
use crate::error::{FsiError, Result};
use crate::export::{FieldExporter, LabelledField, TimeCollection};
use crate::field::PatchField;
use crate::nonlinear::ConvergenceReport;
use crate::time::{FluidIntegrator, StructuralIntegrator, TimeIntegrator};
use crate::types::{BoxSide, PatchSide};

use super::config::TIME_EPS;
use super::{CouplerConfig, MeshMotion};

// =============================================================================
// Configuration types
// =============================================================================

/// Side correspondences between the three fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceMap {
    /// Structure sides (source) feeding mesh sides (target)
    pub structure_to_mesh: Vec<CouplingLink>,
    /// Mesh sides (source) feeding flow sides (target)
    pub mesh_to_fluid: Vec<CouplingLink>,
}

impl InterfaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structure_to_mesh(mut self, link: CouplingLink) -> Self {
        self.structure_to_mesh.push(link);
        self
    }

    pub fn with_mesh_to_fluid(mut self, link: CouplingLink) -> Self {
        self.mesh_to_fluid.push(link);
        self
    }
}

/// A parametric point on a patch.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplePoint {
    pub patch: usize,
    pub point: Vec<f64>,
}

impl SamplePoint {
    pub fn new(patch: usize, point: Vec<f64>) -> Self {
        Self { patch, point }
    }
}

/// What the per-step record measures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MonitorConfig {
    /// Flow sides whose force gives drag and lift
    pub force_sides: Vec<PatchSide>,
    pub pressure_front: Option<SamplePoint>,
    pub pressure_back: Option<SamplePoint>,
    /// Structure point whose displacement is recorded
    pub displacement: Option<SamplePoint>,
}

impl MonitorConfig {
    pub fn with_force_side(mut self, at: PatchSide) -> Self {
        self.force_sides.push(at);
        self
    }

    pub fn with_pressure_points(mut self, front: SamplePoint, back: SamplePoint) -> Self {
        self.pressure_front = Some(front);
        self.pressure_back = Some(back);
        self
    }

    pub fn with_displacement_point(mut self, point: SamplePoint) -> Self {
        self.displacement = Some(point);
        self
    }
}

/// Flow boundary data imposed as `base * ramp(t)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RampedBoundary {
    pub patch: usize,
    pub side: BoxSide,
    pub base: Vec<Vec<f64>>,
}

/// Outcome of [`StaggeredCoupler::run`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplingSummary {
    pub final_time: f64,
    pub steps: usize,
    pub timers: StageTimers,
    pub last_record: StepRecord,
}

// =============================================================================
// Coupler
// =============================================================================

/// Drives a structure, a mesh-motion field and a flow field in sequence.
pub struct StaggeredCoupler<S, M, F> {
    structure: StructuralIntegrator<S>,
    mesh: MeshMotion<M>,
    fluid: FluidIntegrator<F>,
    interface: InterfaceMap,
    config: CouplerConfig,
    monitors: MonitorConfig,
    ramped: Vec<RampedBoundary>,
    timers: StageTimers,
    sim_time: f64,
    steps: usize,
    log: Option<DiagnosticLog<Box<dyn Write>>>,
    exporter: Option<Box<dyn FieldExporter>>,
    collection: TimeCollection,
}

impl<S, M, F> StaggeredCoupler<S, M, F>
where
    S: Discretization + MassForm + FieldSampler,
    M: Discretization + MeshGeometry,
    F: ConvectiveDiscretization + MassForm,
{
    /// The flow integrator must have ALE coupling enabled.
    pub fn new(
        structure: StructuralIntegrator<S>,
        mesh: MeshMotion<M>,
        fluid: FluidIntegrator<F>,
        interface: InterfaceMap,
        config: CouplerConfig,
    ) -> Result<Self> {
        config.validate()?;
        if !fluid.ale().is_enabled() {
            return Err(FsiError::config(
                "the flow integrator must follow the mesh: enable ALE coupling first",
            ));
        }
        Ok(Self {
            structure,
            mesh,
            fluid,
            interface,
            config,
            monitors: MonitorConfig::default(),
            ramped: Vec::new(),
            timers: StageTimers::default(),
            sim_time: 0.0,
            steps: 0,
            log: None,
            exporter: None,
            collection: TimeCollection::new("fsi"),
        })
    }

    pub fn with_monitors(mut self, monitors: MonitorConfig) -> Self {
        self.monitors = monitors;
        self
    }

    /// Write step records to `writer`, starting with the header line.
    pub fn with_log_writer<W: Write + 'static>(mut self, writer: W) -> Result<Self> {
        let writer: Box<dyn Write> = Box::new(writer);
        self.log = Some(DiagnosticLog::new(writer)?);
        Ok(self)
    }

    /// Write step records to a file, truncating it.
    pub fn with_log_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        self.with_log_writer(std::io::BufWriter::new(file))
    }

    /// Export fields every step while `plot_density > 0`.
    pub fn with_exporter(mut self, exporter: Box<dyn FieldExporter>, collection: TimeCollection) -> Self {
        self.exporter = Some(exporter);
        self.collection = collection;
        self
    }

    /// Ramp the current flow data of a side from zero.
    pub fn ramp_boundary(&mut self, patch: usize, side: BoxSide) -> Result<()> {
        let base = self.fluid.fixed_dofs_side(patch, side);
        if base.is_empty() {
            return Err(FsiError::config(format!(
                "no flow boundary data on {} to ramp",
                PatchSide::new(patch, side)
            )));
        }
        self.ramped.push(RampedBoundary { patch, side, base });
        self.apply_ramps(self.sim_time)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn structure(&self) -> &StructuralIntegrator<S> {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut StructuralIntegrator<S> {
        &mut self.structure
    }

    pub fn mesh(&self) -> &MeshMotion<M> {
        &self.mesh
    }

    pub fn fluid(&self) -> &FluidIntegrator<F> {
        &self.fluid
    }

    pub fn fluid_mut(&mut self) -> &mut FluidIntegrator<F> {
        &mut self.fluid
    }

    pub fn config(&self) -> &CouplerConfig {
        &self.config
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn timers(&self) -> &StageTimers {
        &self.timers
    }

    pub fn collection(&self) -> &TimeCollection {
        &self.collection
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Run until the configured time span is reached.
    pub fn run(&mut self) -> Result<CouplingSummary> {
        let mut progress = ProgressReporter::new(self.config.time_span, self.config.progress_interval_pct);
        log::info!(
            "Coupled run to t = {} with dt = {}{}",
            self.config.time_span,
            self.config.time_step,
            if self.config.warm_up {
                format!(
                    " (warm-up dt = {} until t = {})",
                    self.config.warm_up_step, self.config.warm_up_duration
                )
            } else {
                String::new()
            }
        );

        let mut last_record = self.record()?;
        if self.steps == 0 {
            self.append_record(&last_record)?;
            if self.config.plot_density > 0 {
                self.export()?;
            }
        }

        while self.sim_time < self.config.time_span - TIME_EPS {
            last_record = self.advance()?;
            progress.step();
            progress.maybe_report(self.sim_time);
        }

        log::info!(
            "Coupled run finished at t = {:.4} after {} steps in {}: {}",
            self.sim_time,
            self.steps,
            format_hms(progress.elapsed()),
            self.timers.summary_line()
        );
        Ok(CouplingSummary {
            final_time: self.sim_time,
            steps: self.steps,
            timers: self.timers,
            last_record,
        })
    }

    /// Advance all three fields by one macro step.
    ///
    /// On failure the structure, the mesh and the flow (states and
    /// geometry) are back where the step started.
    pub fn advance(&mut self) -> Result<StepRecord> {
        let dt = self.config.effective_step(self.sim_time);
        let t_new = self.sim_time + dt;

        self.structure.save_state()?;
        self.mesh.save_state();
        self.fluid.save_state()?;

        let mut moved = None;
        if let Err(err) = self.step_fields(dt, t_new, &mut moved) {
            self.roll_back(moved.as_ref())?;
            return Err(err);
        }

        self.sim_time = t_new;
        self.steps += 1;

        if self.config.plot_density > 0 {
            self.export()?;
        }
        let record = self.record()?;
        self.append_record(&record)?;
        Ok(record)
    }

    /// Structure, mesh and flow solves of one step. `moved` receives the
    /// displacement applied to the flow geometry.
    fn step_fields(&mut self, dt: f64, t_new: f64, moved: &mut Option<PatchField>) -> Result<()> {
        // structure
        let before = self.structure.construct_solution()?;
        let report = StageTimers::time(&mut self.timers.structure, || self.structure.make_time_step(dt))?;
        self.check_converged("structure", &report)?;
        let increment = self.structure.construct_solution()?.difference(&before)?;

        // mesh
        let interface = &self.interface;
        let mesh = &mut self.mesh;
        let (delta, mesh_report) = StageTimers::time(&mut self.timers.mesh, || {
            for link in &interface.structure_to_mesh {
                mesh.set_interface_increment(link.target, &increment.boundary_trace(link.source)?)?;
            }
            mesh.solve_increment()
        })?;
        log::debug!("Mesh increment: {}", mesh_report.summary_line());

        let (candidate, folded) = self.mesh.candidate(&delta)?;
        if let Some(patch) = folded {
            log::error!(
                "Mesh patch {} folds at t = {:.4} (step {}); halting before the flow step",
                patch,
                t_new,
                self.steps + 1
            );
            return Err(FsiError::MeshBreakdown {
                patch,
                time: t_new,
                step: self.steps + 1,
            });
        }
        self.mesh.commit(candidate)?;

        // flow
        let mut mesh_velocity = delta.clone();
        mesh_velocity.scale(1.0 / dt);
        self.fluid.displace_geometry(&delta)?;
        *moved = Some(delta);
        for link in &self.interface.mesh_to_fluid {
            let trace = mesh_velocity.boundary_trace(link.source)?;
            self.fluid
                .set_fixed_dofs(link.target.patch, link.target.side, &trace)?;
        }
        self.fluid.set_ale_velocity(mesh_velocity)?;
        self.apply_ramps(t_new)?;

        let report = StageTimers::time(&mut self.timers.flow, || self.fluid.make_time_step(dt))?;
        self.check_converged("flow", &report)
    }

    /// Restore the three fields saved at the start of the step and move the
    /// flow geometry back by `moved`.
    fn roll_back(&mut self, moved: Option<&PatchField>) -> Result<()> {
        self.structure.recover_state()?;
        self.mesh.recover_state()?;
        self.fluid.recover_state()?;
        if let Some(delta) = moved {
            let mut back = delta.clone();
            back.scale(-1.0);
            self.fluid.displace_geometry(&back)?;
        }
        log::warn!("Step {} rolled back to t = {:.4}", self.steps + 1, self.sim_time);
        Ok(())
    }

    /// Fail when a solve diverged and divergence is fatal.
    fn check_converged(&self, field: &'static str, report: &ConvergenceReport) -> Result<()> {
        if report.converged || !self.config.abort_on_divergence {
            return Ok(());
        }
        log::error!(
            "{} solve diverged at t = {:.4}: {}",
            field,
            self.sim_time,
            report.summary_line()
        );
        Err(FsiError::ConvergenceFailure {
            field,
            iterations: report.iterations,
            residual: report.last_residual_norm,
        })
    }

    fn apply_ramps(&mut self, t: f64) -> Result<()> {
        let ramp = self.config.ramp_factor(t);
        for boundary in &self.ramped {
            let values: Vec<Vec<f64>> = boundary
                .base
                .iter()
                .map(|component| component.iter().map(|v| v * ramp).collect())
                .collect();
            self.fluid.set_fixed_dofs(boundary.patch, boundary.side, &values)?;
        }
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        let Some(exporter) = self.exporter.as_mut() else {
            return Ok(());
        };
        let displacement = self.structure.construct_solution()?;
        let velocity = self.fluid.velocity_field()?;
        let pressure = self.fluid.pressure_field()?;
        let fields = [
            LabelledField {
                label: "displacement",
                field: &displacement,
            },
            LabelledField {
                label: "mesh",
                field: self.mesh.total_displacement(),
            },
            LabelledField {
                label: "velocity",
                field: &velocity,
            },
            LabelledField {
                label: "pressure",
                field: &pressure,
            },
        ];
        exporter.export(&fields, self.config.plot_density, &mut self.collection, self.sim_time)
    }

    /// Diagnostics of the current state.
    pub fn record(&self) -> Result<StepRecord> {
        let force = if self.monitors.force_sides.is_empty() {
            Vec::new()
        } else {
            self.fluid.boundary_force(&self.monitors.force_sides)?
        };

        let pressure_diff = match (&self.monitors.pressure_front, &self.monitors.pressure_back) {
            (Some(front), Some(back)) => {
                self.fluid.pressure_at(front.patch, &front.point)?
                    - self.fluid.pressure_at(back.patch, &back.point)?
            }
            _ => 0.0,
        };

        let displacement = match &self.monitors.displacement {
            Some(sample) => {
                let field = self.structure.construct_solution()?;
                self.structure
                    .discretization()
                    .evaluate(&field, sample.patch, &sample.point)?
            }
            None => Vec::new(),
        };

        Ok(StepRecord {
            sim_time: self.sim_time,
            drag: force.first().copied().unwrap_or(0.0),
            lift: force.get(1).copied().unwrap_or(0.0),
            pressure_diff,
            disp_ax: displacement.first().copied().unwrap_or(0.0),
            disp_ay: displacement.get(1).copied().unwrap_or(0.0),
            ale_norm: self.mesh.displacement_norm()?,
            ale_time: self.timers.mesh.as_secs_f64(),
            flow_time: self.timers.flow.as_secs_f64(),
            beam_time: self.timers.structure.as_secs_f64(),
            flow_iter: self.fluid.number_iterations(),
            beam_iter: self.structure.number_iterations(),
        })
    }

    fn append_record(&mut self, record: &StepRecord) -> Result<()> {
        if let Some(log) = self.log.as_mut() {
            log.append(record)?;
        }
        Ok(())
    }
}
