//! Common solver interface and method dispatch

use std::ops::ControlFlow;

use gridworld_core::{Progress, ProgressObserver, Result, SolverView};
use gridworld_env::GridWorld;

use crate::config::{Method, SolverConfig};
use crate::dp::DynamicProgrammingSolver;
use crate::mc::MonteCarloControl;
use crate::off_policy::OffPolicyMonteCarlo;
use crate::report::RunReport;

/// A configured solver ready to run
pub trait Solver: SolverView {
    /// Method this solver runs
    fn method(&self) -> Method;

    /// Run to completion, reporting to `observer`
    fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport;
}

/// Build the solver for `method` on `grid`
pub fn build_solver(
    method: Method,
    grid: GridWorld,
    mut config: SolverConfig,
) -> Result<Box<dyn Solver>> {
    Ok(match method {
        Method::Bellman
        | Method::PolicyEvaluation
        | Method::ValueIteration
        | Method::PolicyIteration => {
            Box::new(DynamicProgrammingSolver::new(grid, config)?.with_method(method)?)
        }
        Method::MonteCarlo | Method::MonteCarloEs => {
            config.exploring_starts = method == Method::MonteCarloEs;
            Box::new(MonteCarloControl::new(grid, config)?)
        }
        Method::OffPolicy => Box::new(OffPolicyMonteCarlo::new(grid, config)?),
    })
}

/// Tracks checkpoint cadence and pending layout changes for one run
#[derive(Debug)]
pub(crate) struct Checkpoints {
    interval: usize,
    layout_changed: bool,
}

impl Checkpoints {
    pub(crate) fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            layout_changed: false,
        }
    }

    pub(crate) fn note_layout_change(&mut self, changed: bool) {
        self.layout_changed |= changed;
    }

    /// Call the observer if `iteration` is on the cadence
    pub(crate) fn reached(
        &mut self,
        observer: &mut dyn ProgressObserver,
        view: &dyn SolverView,
        iteration: usize,
        delta: Option<f64>,
    ) -> ControlFlow<()> {
        if iteration % self.interval != 0 {
            return ControlFlow::Continue(());
        }
        self.notify(observer, view, iteration, delta, false)
    }

    /// Final call of the run
    pub(crate) fn finish(
        &mut self,
        observer: &mut dyn ProgressObserver,
        view: &dyn SolverView,
        iteration: usize,
        delta: Option<f64>,
    ) {
        let _ = self.notify(observer, view, iteration, delta, true);
    }

    fn notify(
        &mut self,
        observer: &mut dyn ProgressObserver,
        view: &dyn SolverView,
        iteration: usize,
        delta: Option<f64>,
        finished: bool,
    ) -> ControlFlow<()> {
        let progress = Progress {
            iteration,
            delta,
            layout_changed: std::mem::take(&mut self.layout_changed),
            finished,
        };
        observer.on_progress(&progress, view)
    }
}
