// Command implementations for gridctl

use anyhow::{Context, Result};
use serde::Serialize;
use std::ops::ControlFlow;
use tracing::info;

use gridworld_agent::{build_solver, Method, RunConfig, RunReport, SolverConfig};
use gridworld_core::{CellKind, Environment, NoopObserver, Progress, ProgressObserver, SolverView};
use gridworld_env::{layout_config, list_layouts as registered_layouts, make_grid, GridWorld};

use crate::render;
use crate::SolveArgs;

const DEFAULT_LAYOUT: &str = "terminal";

pub fn list_layouts() {
    println!("Registered layouts:");
    for name in registered_layouts() {
        println!("   {name}");
    }
}

pub fn show_layout(name: &str) -> Result<()> {
    let grid = make_grid(name).with_context(|| format!("Failed to load layout '{name}'"))?;
    println!("Layout: {name} ({0}x{0})", grid.size());
    print!("{}", render::render_layout(&grid.layout()));
    Ok(())
}

/// Grid, solver parameters and method after applying command-line overrides
fn resolve_run(args: &SolveArgs) -> Result<RunConfig> {
    let mut run = match (&args.config, &args.layout) {
        (Some(path), _) => RunConfig::from_json_file(path)
            .with_context(|| format!("Failed to load run configuration {}", path.display()))?,
        (None, layout) => {
            let name = layout.as_deref().unwrap_or(DEFAULT_LAYOUT);
            RunConfig {
                grid: layout_config(name)
                    .with_context(|| format!("Failed to load layout '{name}'"))?,
                solver: SolverConfig::default(),
                method: Method::default(),
            }
        }
    };

    if let Some(method) = args.method {
        run.method = method;
    }
    let solver = &mut run.solver;
    if let Some(gamma) = args.gamma {
        solver.gamma = gamma;
    }
    if let Some(theta) = args.theta {
        solver.theta = theta;
    }
    if let Some(epsilon) = args.epsilon {
        solver.epsilon = epsilon;
    }
    if let Some(episodes) = args.episodes {
        solver.episodes = episodes;
    }
    if let Some(seed) = args.seed {
        solver.seed = Some(seed);
    }
    if let Some(interval) = args.checkpoint_interval {
        solver.checkpoint_interval = interval;
    }
    solver.validate().context("Invalid solver parameters")?;
    Ok(run)
}

/// Redraws the grid at every checkpoint
struct WatchRenderer;

impl ProgressObserver for WatchRenderer {
    fn on_progress(&mut self, progress: &Progress, view: &dyn SolverView) -> ControlFlow<()> {
        if progress.finished {
            return ControlFlow::Continue(());
        }
        match progress.delta {
            Some(delta) => println!("--- iteration {} (delta {delta:.4}) ---", progress.iteration),
            None => println!("--- iteration {} ---", progress.iteration),
        }
        if progress.layout_changed {
            println!("special cells swapped");
        }
        let layout = view.special_cell_layout();
        print!("{}", render::render_values(&view.value_snapshot()));
        print!("{}", render::render_policy(&view.policy_snapshot(), &layout));
        ControlFlow::Continue(())
    }
}

#[derive(Serialize)]
struct SolveOutput<'a> {
    report: &'a RunReport,
    values: Vec<Vec<f64>>,
    policy: Vec<Vec<String>>,
    layout: Vec<Vec<CellKind>>,
}

pub fn solve(args: SolveArgs) -> Result<()> {
    let run = resolve_run(&args)?;
    let grid = GridWorld::new(run.grid).context("Invalid grid configuration")?;
    info!(method = %run.method, size = grid.size(), "solving");

    let mut solver = build_solver(run.method, grid, run.solver)
        .with_context(|| format!("Cannot run {} on this grid", run.method))?;

    let report = if args.watch {
        solver.run(&mut WatchRenderer)
    } else {
        solver.run(&mut NoopObserver)
    };

    let values = solver.value_snapshot();
    let layout = solver.special_cell_layout();
    let policy = solver.policy_snapshot();

    if args.json {
        let output = SolveOutput {
            report: &report,
            values: render::rows(&values),
            policy: render::policy_labels(&policy, &layout),
            layout: render::rows(&layout),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Method: {}", report.method);
    println!(
        "Iterations: {}  converged: {}  time: {} ms",
        report.iterations,
        report.converged,
        report.duration().num_milliseconds()
    );
    if let Some(delta) = report.final_delta {
        println!("Final delta: {delta:.6}");
    }
    if report.layout_changes > 0 {
        println!("Special-cell swaps: {}", report.layout_changes);
    }
    if report.truncated_episodes > 0 {
        println!("Truncated episodes: {}", report.truncated_episodes);
    }
    if !report.converged && !report.stopped_early {
        eprintln!("warning: {} did not converge", report.method);
    }

    println!("\nValues:");
    print!("{}", render::render_values(&values));
    println!("\nPolicy:");
    print!("{}", render::render_policy(&policy, &layout));
    println!();
    println!("{}", render::render_best_states(&report.best_states, report.best_value));

    Ok(())
}
