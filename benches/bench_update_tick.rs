use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use ringroad_sim::{DensityPolicy, Field, LatticeBuilder};

fn bench_update_tick(c: &mut Criterion) {
    let densities = [0.05, 0.15, 0.3];

    let mut group = c.benchmark_group("update_tick");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &density in &densities {
        let topology = LatticeBuilder::new(10, 8, 5).uniform(3).build().unwrap();
        let mut field: Field = Field::with_seed(topology, 42);
        field.set_density_policy(DensityPolicy::ImmediateRespawn);
        field.initialize_density(density).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(density), &density, |b, _| {
            b.iter(|| {
                let moved = field.update().unwrap();
                black_box(moved);
            });
        });
    }

    group.finish();
}

fn bench_gradual_lattice_tick(c: &mut Criterion) {
    let topology = LatticeBuilder::new(10, 16, 5)
        .gradual(&[4, 3, 2, 1])
        .build()
        .unwrap();
    let mut field: Field = Field::with_seed(topology, 7);
    field.set_density_policy(DensityPolicy::ImmediateRespawn);
    field.initialize_density(0.2).unwrap();

    c.bench_function("gradual_lattice_tick", |b| {
        b.iter(|| black_box(field.update().unwrap()));
    });
}

criterion_group!(benches, bench_update_tick, bench_gradual_lattice_tick);
criterion_main!(benches);
