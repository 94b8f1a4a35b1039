use std::ops::ControlFlow;

use approx::assert_abs_diff_eq;
use gridworld_agent::{DynamicProgrammingSolver, Method, SolverConfig};
use gridworld_core::{
    positions, Action, Environment, NoopObserver, PolicyEntry, Position, Progress, SolverView,
};
use gridworld_env::{make_grid, GridConfig, GridWorld};
use proptest::prelude::*;

fn two_by_two() -> GridWorld {
    GridWorld::new(GridConfig {
        size: 2,
        special_cells: Vec::new(),
        terminal_cells: vec![Position::new(1, 1)],
        ..GridConfig::default()
    })
    .unwrap()
}

fn seeded(seed: u64) -> SolverConfig {
    SolverConfig {
        seed: Some(seed),
        ..SolverConfig::default()
    }
}

#[test]
fn test_jump_cell_has_highest_value() {
    let grid = make_grid("jump").unwrap();
    let mut solver = DynamicProgrammingSolver::new(grid, seeded(1)).unwrap();
    let report = solver.value_iteration(&mut NoopObserver);

    assert!(report.converged);
    assert_eq!(report.best_states, vec![Position::new(0, 1)]);
    let jump = solver.values()[[0, 1]];
    for state in positions(5).filter(|s| *s != Position::new(0, 1)) {
        assert!(jump > solver.values()[state.ix()], "V{state} >= V(0, 1)");
    }
}

#[test]
fn test_zero_reward_grid_evaluates_to_zero() {
    let grid = GridWorld::new(GridConfig {
        size: 5,
        special_cells: Vec::new(),
        terminal_cells: Vec::new(),
        out_of_bounds_penalty: 0.0,
        step_penalty: 0.0,
        terminal_reward: 0.0,
        swap: None,
    })
    .unwrap();
    for method in [Method::Bellman, Method::PolicyEvaluation] {
        let mut solver = DynamicProgrammingSolver::new(grid.clone(), seeded(2))
            .unwrap()
            .with_method(method)
            .unwrap();
        let report = solver.solve(&mut NoopObserver);
        assert!(report.converged);
        for v in solver.values() {
            assert_abs_diff_eq!(*v, 0.0);
        }
    }
}

#[test]
fn test_tied_actions_kept_in_enumeration_order() {
    for method in [Method::ValueIteration, Method::PolicyIteration] {
        let mut solver = DynamicProgrammingSolver::new(two_by_two(), seeded(3))
            .unwrap()
            .with_method(method)
            .unwrap();
        let report = solver.solve(&mut NoopObserver);
        assert!(report.converged, "{method}");

        let entry = solver.policy()[[0, 0]];
        let actions: Vec<Action> = entry.displayed_actions().iter().collect();
        assert_eq!(actions, vec![Action::Down, Action::Right], "{method}");
        assert_eq!(solver.policy()[[1, 1]], PolicyEntry::Unset);
        assert_abs_diff_eq!(solver.values()[[0, 0]], -0.2);
    }
}

#[test]
fn test_acyclic_grid_converges_quickly() {
    let mut solver = DynamicProgrammingSolver::new(two_by_two(), seeded(4)).unwrap();
    let report = solver.value_iteration(&mut NoopObserver);
    assert!(report.converged);
    assert!(report.iterations <= 3);
}

#[test]
fn test_bellman_uses_sum_norm() {
    let grid = make_grid("classic").unwrap();
    let mut solver = DynamicProgrammingSolver::new(grid, seeded(5))
        .unwrap()
        .with_method(Method::Bellman)
        .unwrap();
    let report = solver.solve(&mut NoopObserver);
    assert!(report.converged);

    let before = solver.values().clone();
    let delta = solver.expectation_sweep(
        &gridworld_core::ActionDistribution::uniform(),
        gridworld_agent::DeltaNorm::Sum,
    );
    let sum: f64 = (solver.values() - &before).iter().map(|d| d.abs()).sum();
    assert_abs_diff_eq!(delta, sum, epsilon = 1e-12);
}

#[test]
fn test_observer_can_stop_a_run() {
    let grid = make_grid("classic").unwrap();
    let config = SolverConfig {
        theta: 1e-12,
        ..seeded(6)
    };
    let mut solver = DynamicProgrammingSolver::new(grid, config).unwrap();
    let mut calls = Vec::new();
    let mut observer = |progress: &Progress, view: &dyn SolverView| {
        calls.push(*progress);
        assert_eq!(view.value_snapshot().dim(), (5, 5));
        if progress.iteration >= 3 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };
    let report = solver.value_iteration(&mut observer);

    assert!(report.stopped_early);
    assert!(!report.converged);
    assert_eq!(report.iterations, 3);
    assert_eq!(calls.len(), 4);
    assert!(calls.last().unwrap().finished);
    assert!(calls[..3].iter().all(|p| !p.finished && p.delta.is_some()));
}

#[test]
fn test_policy_iteration_on_shifting_layout() {
    let grid = make_grid("shifting").unwrap();
    let mut solver = DynamicProgrammingSolver::new(grid, seeded(7))
        .unwrap()
        .with_method(Method::PolicyIteration)
        .unwrap();
    let report = solver.solve(&mut NoopObserver);

    assert!(report.converged);
    assert!(report.iterations >= 2);
    for terminal in [Position::new(2, 4), Position::new(4, 0)] {
        assert!(solver.env().is_terminal(terminal));
        assert_abs_diff_eq!(solver.values()[terminal.ix()], 0.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_terminal_values_stay_zero(
        gamma in 0.5f64..0.99,
        theta in 0.001f64..0.1,
        method_ix in 0usize..4,
        layout_ix in 0usize..3,
        seed in any::<u64>(),
    ) {
        let method = [
            Method::Bellman,
            Method::PolicyEvaluation,
            Method::ValueIteration,
            Method::PolicyIteration,
        ][method_ix];
        let layout = ["terminal", "shifting", "jump"][layout_ix];
        let grid = make_grid(layout).unwrap();
        let terminals: Vec<Position> = grid.terminal_cells().collect();
        let config = SolverConfig {
            gamma,
            theta,
            seed: Some(seed),
            ..SolverConfig::default()
        };
        let mut solver = DynamicProgrammingSolver::new(grid, config)
            .unwrap()
            .with_method(method)
            .unwrap();
        solver.solve(&mut NoopObserver);

        for terminal in terminals {
            prop_assert_eq!(solver.values()[terminal.ix()], 0.0);
        }
    }
}
