//! Progress reporting seam between solvers and renderers
//!
//! A solver calls its observer every `checkpoint_interval` sweeps or
//! episodes and once more when it finishes. The observer only gets read-only
//! snapshots and may ask the solver to stop by returning
//! [`ControlFlow::Break`].

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

use crate::{CellKind, PolicyGrid, ValueGrid};

/// Where a solver is in its run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Sweeps or episodes completed so far
    pub iteration: usize,
    /// Convergence delta of the last sweep, if the solver tracks one
    pub delta: Option<f64>,
    /// The special-cell layout changed since the previous checkpoint
    pub layout_changed: bool,
    /// This is the final call of the run
    pub finished: bool,
}

/// Read-only access to a solver's current estimates
pub trait SolverView {
    /// Copy of the value grid
    fn value_snapshot(&self) -> ValueGrid;

    /// Copy of the displayed policy
    fn policy_snapshot(&self) -> PolicyGrid;

    /// Current cell kinds, which change when special cells swap
    fn special_cell_layout(&self) -> Array2<CellKind>;
}

/// Receives checkpoints from a running solver
pub trait ProgressObserver {
    /// Called at every checkpoint
    fn on_progress(&mut self, progress: &Progress, view: &dyn SolverView) -> ControlFlow<()>;
}

impl<F> ProgressObserver for F
where
    F: FnMut(&Progress, &dyn SolverView) -> ControlFlow<()>,
{
    fn on_progress(&mut self, progress: &Progress, view: &dyn SolverView) -> ControlFlow<()> {
        self(progress, view)
    }
}

/// Observer that ignores every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&mut self, _progress: &Progress, _view: &dyn SolverView) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
