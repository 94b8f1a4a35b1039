//! Run summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use gridworld_core::{Position, ValueGrid};

use crate::config::Method;
use crate::utils::highest_value_states;

/// Outcome of one solver run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run id
    pub id: Uuid,
    /// Method that produced the run
    pub method: Method,
    /// Sweeps, improvement passes or episodes completed
    pub iterations: usize,
    /// `false` when a DP method hit its sweep cap before reaching `theta`
    pub converged: bool,
    /// The observer asked the run to stop
    pub stopped_early: bool,
    /// Delta of the last sweep, for DP methods
    pub final_delta: Option<f64>,
    /// Special-cell swaps during the run
    pub layout_changes: usize,
    /// Episodes cut off at the step cap
    pub truncated_episodes: usize,
    /// Cells sharing the highest value
    pub best_states: Vec<Position>,
    /// The highest value
    pub best_value: f64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn begin(method: Method) -> Self {
        let now = Utc::now();
        info!(%method, "starting run");
        Self {
            id: Uuid::new_v4(),
            method,
            iterations: 0,
            converged: false,
            stopped_early: false,
            final_delta: None,
            layout_changes: 0,
            truncated_episodes: 0,
            best_states: Vec::new(),
            best_value: 0.0,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self, values: &ValueGrid) -> Self {
        let (best_states, best_value) = highest_value_states(values);
        self.best_states = best_states;
        self.best_value = best_value;
        self.finished_at = Utc::now();
        info!(
            method = %self.method,
            iterations = self.iterations,
            converged = self.converged,
            best_value = self.best_value,
            "run finished"
        );
        self
    }

    /// Wall-clock duration of the run
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
