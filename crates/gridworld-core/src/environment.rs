//! Environment model trait

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Action, CellKind, Position};

/// Result of a single transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Cell the agent ends up in
    pub next: Position,
    /// Reward for the transition
    pub reward: f64,
}

/// One possible outcome of `(state, action)` with its probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Probability of this outcome
    pub probability: f64,
    /// The resulting transition
    pub transition: Transition,
}

impl Outcome {
    /// Outcome that happens with certainty
    #[must_use]
    pub fn certain(next: Position, reward: f64) -> Self {
        Self {
            probability: 1.0,
            transition: Transition { next, reward },
        }
    }
}

/// Tabular MDP over a square grid
///
/// Implementors describe the full outcome distribution; sampling is derived
/// from it so model-based and sample-based solvers see the same dynamics.
pub trait Environment {
    /// Side length of the grid
    fn size(&self) -> usize;

    /// Whether `state` is terminal (zero future value)
    fn is_terminal(&self, state: Position) -> bool;

    /// All outcomes of taking `action` in `state`; probabilities sum to 1
    fn outcomes(&self, state: Position, action: Action) -> Vec<Outcome>;

    /// Kind of every cell, for renderers
    fn layout(&self) -> Array2<CellKind>;

    /// Sample one transition
    ///
    /// Deterministic transitions do not consume randomness.
    fn step<R: Rng + ?Sized>(&self, state: Position, action: Action, rng: &mut R) -> Transition {
        let outcomes = self.outcomes(state, action);
        if let [only] = outcomes.as_slice() {
            return only.transition;
        }
        let mut remaining = rng.gen::<f64>();
        for outcome in &outcomes {
            if remaining < outcome.probability {
                return outcome.transition;
            }
            remaining -= outcome.probability;
        }
        outcomes
            .last()
            .map_or(Transition { next: state, reward: 0.0 }, |o| o.transition)
    }

    /// Apply the non-stationary layout change, if the model has one.
    /// Returns whether the layout changed.
    fn perturb<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> bool {
        false
    }

    /// Number of terminal cells
    fn terminal_count(&self) -> usize {
        crate::positions(self.size())
            .filter(|p| self.is_terminal(*p))
            .count()
    }
}
