//! Core grid-world MDP types
//!
//! This crate provides the shared vocabulary of the grid-world solvers:
//! actions, positions, transition outcomes, policies, value tables,
//! episodes and the observer seam used by renderers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observer;
pub mod policy;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{Action, ActionSet};
pub use environment::{Environment, Outcome, Transition};
pub use error::{GridError, Result};
pub use observer::{NoopObserver, Progress, ProgressObserver, SolverView};
pub use policy::{ActionDistribution, PolicyEntry, PolicyGrid};
pub use state::{positions, CellKind, Position};
pub use trajectory::{Episode, EpisodeStep};
pub use value::{incremental_mean, zero_values, ActionValueTable, ValueGrid};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionDistribution, ActionSet, Environment, Episode, GridError, Position,
        Progress, ProgressObserver, Result, SolverView,
    };
}
