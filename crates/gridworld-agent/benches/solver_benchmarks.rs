//! Solver throughput on the built-in 5x5 layouts

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridworld_agent::{
    DynamicProgrammingSolver, MonteCarloControl, OffPolicyMonteCarlo, SolverConfig,
};
use gridworld_core::NoopObserver;
use gridworld_env::make_grid;

fn config(episodes: usize) -> SolverConfig {
    SolverConfig {
        episodes,
        seed: Some(7),
        ..SolverConfig::default()
    }
}

fn bench_dynamic_programming(c: &mut Criterion) {
    c.bench_function("value_iteration_terminal", |b| {
        b.iter(|| {
            let grid = make_grid("terminal").unwrap();
            let mut solver = DynamicProgrammingSolver::new(grid, config(1)).unwrap();
            black_box(solver.value_iteration(&mut NoopObserver))
        });
    });

    c.bench_function("policy_iteration_shifting", |b| {
        b.iter(|| {
            let grid = make_grid("shifting").unwrap();
            let mut solver = DynamicProgrammingSolver::new(grid, config(1)).unwrap();
            black_box(solver.policy_iteration(&mut NoopObserver))
        });
    });
}

fn bench_monte_carlo(c: &mut Criterion) {
    c.bench_function("monte_carlo_100_episodes", |b| {
        b.iter(|| {
            let grid = make_grid("terminal").unwrap();
            let mut solver = MonteCarloControl::new(grid, config(100)).unwrap();
            black_box(solver.run(&mut NoopObserver))
        });
    });

    c.bench_function("off_policy_100_episodes", |b| {
        b.iter(|| {
            let grid = make_grid("terminal").unwrap();
            let mut solver = OffPolicyMonteCarlo::new(grid, config(100)).unwrap();
            black_box(solver.run(&mut NoopObserver))
        });
    });
}

criterion_group!(benches, bench_dynamic_programming, bench_monte_carlo);
criterion_main!(benches);
