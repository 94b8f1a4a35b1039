//! Grid-world solvers
//!
//! This crate provides the tabular solution methods:
//! - Bellman expectation sweeps and iterative policy evaluation
//! - Value iteration and policy iteration
//! - On-policy first-visit Monte Carlo control, with or without exploring starts
//! - Off-policy Monte Carlo control with weighted importance sampling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod dp;
pub mod episode;
pub mod mc;
pub mod off_policy;
pub mod report;
pub mod solver;
pub mod utils;

// Re-export solvers
pub use dp::DynamicProgrammingSolver;
pub use mc::MonteCarloControl;
pub use off_policy::{BackwardPass, OffPolicyMonteCarlo};
pub use solver::{build_solver, Solver};

// Re-export configuration and results
pub use config::{DeltaNorm, Method, RunConfig, SolverConfig};
pub use report::RunReport;
pub use utils::{argmax_all, argmax_first, argmax_random_tie, highest_value_states};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        build_solver, DynamicProgrammingSolver, Method, MonteCarloControl, OffPolicyMonteCarlo,
        RunConfig, RunReport, Solver, SolverConfig,
    };
    pub use gridworld_core::prelude::*;
}
