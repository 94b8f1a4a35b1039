// GridWorld Control CLI
// Runs the grid-world solvers from the command line

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gridworld_agent::Method;

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "gridctl")]
#[command(about = "GridWorld solver CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered layouts
    Layouts,

    /// Print the cell kinds of a layout
    Show {
        /// Layout name
        layout: String,
    },

    /// Run a solver
    Solve(SolveArgs),
}

#[derive(Args)]
struct SolveArgs {
    /// Solution method (bellman, policy-evaluation, value-iteration,
    /// policy-iteration, monte-carlo, monte-carlo-es, off-policy)
    #[arg(short, long)]
    method: Option<Method>,

    /// Named layout
    #[arg(short, long, conflicts_with = "config")]
    layout: Option<String>,

    /// JSON run configuration (grid, solver, method)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discount factor
    #[arg(long)]
    gamma: Option<f64>,

    /// Convergence threshold
    #[arg(long)]
    theta: Option<f64>,

    /// Exploration rate
    #[arg(long)]
    epsilon: Option<f64>,

    /// Monte Carlo episode budget
    #[arg(long)]
    episodes: Option<usize>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Sweeps or episodes between redraws
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    /// Redraw the grid at every checkpoint
    #[arg(short, long)]
    watch: bool,

    /// Print the report and final snapshots as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layouts => {
            commands::list_layouts();
        }

        Commands::Show { layout } => {
            commands::show_layout(&layout)?;
        }

        Commands::Solve(args) => {
            commands::solve(args)?;
        }
    }

    Ok(())
}
