//! Episode storage

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Action, Position};

/// One `(state, action, reward)` step of an episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStep {
    /// State the action was taken in
    pub state: Position,
    /// Action taken
    pub action: Action,
    /// Reward received for the transition
    pub reward: f64,
}

/// Ordered sequence of steps from a start state to a terminal state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Episode {
    /// Steps in the order they were taken
    pub steps: Vec<EpisodeStep>,
    /// The step cap was hit before a terminal state was reached
    pub truncated: bool,
    /// Number of special-cell swaps that happened during the episode
    pub layout_changes: usize,
}

impl Episode {
    /// Create an empty episode
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step
    pub fn push(&mut self, state: Position, action: Action, reward: f64) {
        self.steps.push(EpisodeStep {
            state,
            action,
            reward,
        });
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the episode has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undiscounted sum of rewards
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.steps.iter().map(|s| s.reward).sum()
    }

    /// Discounted return from every step: `G_t = r_t + γ G_{t+1}`
    #[must_use]
    pub fn returns(&self, gamma: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            running_return = self.steps[i].reward + gamma * running_return;
            returns[i] = running_return;
        }

        returns
    }

    /// `true` at index `t` iff `(s_t, a_t)` does not occur earlier in the episode
    #[must_use]
    pub fn first_visits(&self) -> Vec<bool> {
        let mut seen = HashSet::with_capacity(self.len());
        self.steps
            .iter()
            .map(|s| seen.insert((s.state, s.action)))
            .collect()
    }
}
