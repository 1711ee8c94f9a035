//! Elastic piston pushed by a channel flow.
//!
//! An elastic bar on [0, 1] is clamped at its west end. Its east end is the
//! wall of a channel on [1, 2] whose east boundary carries an inflow that is
//! ramped up during the warm-up phase. A second bar on [1, 2] moves the
//! channel mesh with the piston.
//!
//! Run with: `RUST_LOG=info cargo run --example piston_fsi`
//!
//! The diagnostic log is written to `piston_fsi.log` in the working directory.

use fsi_rs::boundary::{CouplingLink, PatchLink};
use fsi_rs::coupling::{CouplerConfig, InterfaceMap, MeshMotion, MonitorConfig, SamplePoint, StaggeredCoupler};
use fsi_rs::diagnostics::format_hms;
use fsi_rs::models::{BarMaterial, ChannelFlow1D, ElasticBar1D, FlowProperties};
use fsi_rs::time::{FluidIntegrator, IntegratorConfig, StructuralIntegrator};
use fsi_rs::types::{BoxSide, PatchSide};
use fsi_rs::{Discretization, Result};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parameters
    let n_elements = 16;
    let inflow = -0.5; // into the channel through its east end
    let time_step = 0.01;
    let time_span = 3.0;

    println!("Elastic piston FSI");
    println!("==================");
    println!("Elements per field: {}", n_elements);
    println!("Inflow velocity: {}", inflow);
    println!("Time step: {} (warm-up 0.1 until t = 2)", time_step);
    println!("Final time: {}", time_span);
    println!();

    // Structure
    let material = BarMaterial::default().with_stiffness(5.0).with_density(2.0);
    let bar = ElasticBar1D::new(0.0, 1.0, n_elements, material).with_dirichlet(BoxSide::West);
    let mut structure = StructuralIntegrator::new(bar, IntegratorConfig::structural().with_theta(0.5))?;
    structure.set_displacement_vector(vec![0.0; n_elements])?;

    // Mesh motion
    let mesh_bar = ElasticBar1D::new(1.0, 2.0, n_elements, BarMaterial::default())
        .with_dirichlet(BoxSide::West)
        .with_dirichlet(BoxSide::East);
    let mesh = MeshMotion::new(mesh_bar)?;

    // Flow
    let properties = FlowProperties::default().with_viscosity(0.05).with_penalty(1e-3);
    let channel = ChannelFlow1D::new(1.0, 2.0, n_elements, properties)
        .with_dirichlet(BoxSide::West)
        .with_dirichlet(BoxSide::East);
    let n_free = channel.num_free_dofs();
    let mut fluid = FluidIntegrator::new(channel, IntegratorConfig::fluid())?;
    fluid.set_solution_vector(vec![0.0; n_free])?;
    fluid.set_fixed_dofs(0, BoxSide::East, &[vec![inflow]])?;
    fluid.enable_ale(vec![PatchLink::new(0, 0)]);

    let interface = InterfaceMap::new()
        .with_structure_to_mesh(CouplingLink::new(0, BoxSide::East, 0, BoxSide::West))
        .with_mesh_to_fluid(CouplingLink::new(0, BoxSide::West, 0, BoxSide::West));

    let monitors = MonitorConfig::default()
        .with_force_side(PatchSide::new(0, BoxSide::West))
        .with_pressure_points(SamplePoint::new(0, vec![0.05]), SamplePoint::new(0, vec![0.95]))
        .with_displacement_point(SamplePoint::new(0, vec![1.0]));

    let config = CouplerConfig::new(time_step, time_span)
        .with_warm_up(true)
        .with_progress_interval(10);

    let mut coupler = StaggeredCoupler::new(structure, mesh, fluid, interface, config)?
        .with_monitors(monitors)
        .with_log_file("piston_fsi.log")?;
    coupler.ramp_boundary(0, BoxSide::East)?;

    let summary = coupler.run()?;

    println!();
    println!("Finished at t = {:.4} after {} steps", summary.final_time, summary.steps);
    println!("Piston displacement: {:.6e}", summary.last_record.disp_ax);
    println!("Wall force:          {:.6e}", summary.last_record.drag);
    println!("Pressure difference: {:.6e}", summary.last_record.pressure_diff);
    println!("Mesh increment norm: {:.6e}", summary.last_record.ale_norm);
    println!("Wall time: {}", format_hms(summary.timers.total()));
    println!("Stages:    {}", summary.timers.summary_line());

    Ok(())
}
