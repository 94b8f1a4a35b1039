//! Grid-world environments
//!
//! This crate provides the configurable 5x5 grid world used by the solvers:
//! - Deterministic and stochastic jump cells
//! - Terminal cells and step penalties
//! - An optional non-stationary swap of two special cells
//! - A registry of named layouts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod grid;
pub mod layouts;
pub mod registry;

pub use grid::{GridConfig, GridWorld, SpecialCellConfig, SpecialKind, SwapConfig};
pub use registry::{layout_config, list_layouts, make_grid, register_layout, LayoutRegistry};

// Re-export core types
pub use gridworld_core::{Action, CellKind, Environment, Outcome, Position, Transition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{make_grid, GridConfig, GridWorld, LayoutRegistry};
    pub use gridworld_core::prelude::*;
}
