//! Benchmarks for field time steps and the coupled advance.
//!
//! Run with: `cargo bench --bench time_stepping_bench`
//!
//! Covers single structural and flow steps at several resolutions and one
//! staggered structure → mesh → flow step.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsi_rs::boundary::{CouplingLink, PatchLink};
use fsi_rs::coupling::{CouplerConfig, InterfaceMap, MeshMotion, StaggeredCoupler};
use fsi_rs::models::{BarMaterial, ChannelFlow1D, ElasticBar1D, FlowProperties};
use fsi_rs::time::{FluidIntegrator, IntegratorConfig, StructuralIntegrator, TimeIntegrator, TimeScheme};
use fsi_rs::types::BoxSide;
use fsi_rs::Discretization;

fn setup_structure(n: usize, scheme: TimeScheme) -> StructuralIntegrator<ElasticBar1D> {
    let material = BarMaterial::default().with_hardening(2.0).with_body_force(1.0);
    let bar = ElasticBar1D::new(0.0, 1.0, n, material).with_dirichlet(BoxSide::West);
    let config = IntegratorConfig::structural().with_scheme(scheme);
    let mut structure = StructuralIntegrator::new(bar, config).unwrap();
    structure.set_displacement_vector(vec![0.0; n]).unwrap();
    structure
}

fn setup_fluid(n: usize, x_min: f64) -> FluidIntegrator<ChannelFlow1D> {
    let channel = ChannelFlow1D::new(x_min, x_min + 1.0, n, FlowProperties::default().with_penalty(1e-2))
        .with_dirichlet(BoxSide::West)
        .with_dirichlet(BoxSide::East);
    let n_free = channel.num_free_dofs();
    let mut fluid = FluidIntegrator::new(channel, IntegratorConfig::fluid()).unwrap();
    fluid.set_solution_vector(vec![0.0; n_free]).unwrap();
    fluid.set_fixed_dofs(0, BoxSide::West, &[vec![0.2]]).unwrap();
    fluid
}

/// Benchmark one structural step for both implicit schemes.
fn bench_structural_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_step");
    group.sample_size(30);

    for n in [16, 64, 256] {
        for scheme in [TimeScheme::ImplicitLinear, TimeScheme::ImplicitNonlinear] {
            let template = setup_structure(n, scheme);
            group.bench_with_input(
                BenchmarkId::new(scheme.name(), format!("{}_nodes", n)),
                &n,
                |b, _| {
                    b.iter(|| {
                        let mut structure = template.clone();
                        structure.make_time_step(black_box(0.01)).unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark one flow step; the mass matrix is rebuilt every step.
fn bench_fluid_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("fluid_step");
    group.sample_size(30);

    for n in [16, 64, 256] {
        let template = setup_fluid(n, 0.0);
        group.bench_with_input(BenchmarkId::new("step", format!("{}_elements", n)), &n, |b, _| {
            b.iter(|| {
                let mut fluid = template.clone();
                fluid.make_time_step(black_box(0.01)).unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark a short coupled run: structure, mesh increment and flow per step.
fn bench_coupled_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("coupled_steps");
    group.sample_size(20);

    let n = 32;
    for n_steps in [1, 10] {
        group.bench_with_input(BenchmarkId::new("steps", n_steps), &n_steps, |b, &n_steps| {
            b.iter(|| {
                let mesh_bar = ElasticBar1D::new(1.0, 2.0, n, BarMaterial::default())
                    .with_dirichlet(BoxSide::West)
                    .with_dirichlet(BoxSide::East);
                let mut fluid = setup_fluid(n, 1.0);
                fluid.enable_ale(vec![PatchLink::new(0, 0)]);
                let interface = InterfaceMap::new()
                    .with_structure_to_mesh(CouplingLink::new(0, BoxSide::East, 0, BoxSide::West))
                    .with_mesh_to_fluid(CouplingLink::new(0, BoxSide::West, 0, BoxSide::West));
                let mut coupler = StaggeredCoupler::new(
                    setup_structure(n, TimeScheme::ImplicitLinear),
                    MeshMotion::new(mesh_bar).unwrap(),
                    fluid,
                    interface,
                    CouplerConfig::new(0.01, 1.0),
                )
                .unwrap();
                for _ in 0..n_steps {
                    black_box(coupler.advance().unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_structural_step, bench_fluid_step, bench_coupled_steps);
criterion_main!(benches);
