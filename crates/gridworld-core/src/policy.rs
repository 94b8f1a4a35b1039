//! Policy representations: per-state action distributions and displayed policies

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSet, GridError, Result};

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Probability of each action in one state, indexed in enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionDistribution([f64; Action::COUNT]);

impl ActionDistribution {
    /// Equal probability on every action
    #[must_use]
    pub fn uniform() -> Self {
        Self([1.0 / Action::COUNT as f64; Action::COUNT])
    }

    /// Build a distribution, checking that it is a valid probability table
    pub fn from_probs(probs: [f64; Action::COUNT]) -> Result<Self> {
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(GridError::config(format!(
                "action probabilities must be finite and non-negative, got {probs:?}"
            )));
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(GridError::config(format!(
                "action probabilities must sum to 1, got {total}"
            )));
        }
        Ok(Self(probs))
    }

    /// Epsilon-soft greedy distribution: `1 - ε + ε/|A|` on `best`, `ε/|A|` elsewhere
    #[must_use]
    pub fn epsilon_greedy(best: Action, epsilon: f64) -> Self {
        let floor = epsilon / Action::COUNT as f64;
        let mut probs = [floor; Action::COUNT];
        probs[best.index()] += 1.0 - epsilon;
        Self(probs)
    }

    /// Probability of `action`
    #[must_use]
    pub fn prob(&self, action: Action) -> f64 {
        self.0[action.index()]
    }

    /// Raw probability table
    #[must_use]
    pub fn probs(&self) -> &[f64; Action::COUNT] {
        &self.0
    }

    /// Whether every action has strictly positive probability
    #[must_use]
    pub fn is_soft(&self) -> bool {
        self.0.iter().all(|p| *p > 0.0)
    }

    /// Draw an action from the distribution
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        let mut remaining = rng.gen::<f64>();
        for action in Action::ALL {
            let p = self.prob(action);
            if remaining < p {
                return action;
            }
            remaining -= p;
        }
        // Rounding left a sliver of mass: fall back to the last action with support.
        Action::ALL
            .into_iter()
            .rev()
            .find(|a| self.prob(*a) > 0.0)
            .unwrap_or(Action::Right)
    }
}

impl Default for ActionDistribution {
    fn default() -> Self {
        Self::uniform()
    }
}

/// What a solver currently prescribes in one state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyEntry {
    /// No decision yet (terminal cell, or not improved)
    #[default]
    Unset,
    /// All actions tied for the maximum, in enumeration order
    Tied {
        /// The tied-best actions
        actions: ActionSet,
    },
    /// Greedy action together with the full action distribution
    Stochastic {
        /// Displayed greedy action
        greedy: Action,
        /// Probability of every action
        distribution: ActionDistribution,
    },
}

impl PolicyEntry {
    /// Actions a renderer should draw for this cell
    #[must_use]
    pub fn displayed_actions(&self) -> ActionSet {
        match self {
            PolicyEntry::Unset => ActionSet::empty(),
            PolicyEntry::Tied { actions } => *actions,
            PolicyEntry::Stochastic { greedy, .. } => ActionSet::single(*greedy),
        }
    }
}

/// Policy snapshot over the whole grid
pub type PolicyGrid = Array2<PolicyEntry>;
