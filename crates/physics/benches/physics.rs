use criterion::{criterion_group, criterion_main, Criterion};
use physics::{DoubleCartPole, DoubleCartPoleConfig};

fn bench_double_cartpole_step(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(0);
    let mut cp = DoubleCartPole::new(DoubleCartPoleConfig::default(), &mut rng).unwrap();
    c.bench_function("double_cartpole_step", |b| {
        b.iter(|| {
            cp.apply_force(0.0).unwrap();
            cp.update_velocities().unwrap();
            cp.step();
        });
    });
}

criterion_group!(benches, bench_double_cartpole_step);
criterion_main!(benches);
