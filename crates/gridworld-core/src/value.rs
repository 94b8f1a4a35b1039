//! Tabular value functions

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::{Action, Position};

/// State value function `V(s)` over the grid, zero-initialised
pub type ValueGrid = Array2<f64>;

/// Zero value grid of side `size`
#[must_use]
pub fn zero_values(size: usize) -> ValueGrid {
    Array2::zeros((size, size))
}

/// Incremental weighted mean: `mean + weight * (sample - mean) / total`
///
/// `total` is the cumulative weight including `weight`; with unit weights this
/// is the exact running average.
#[must_use]
pub fn incremental_mean(mean: f64, sample: f64, weight: f64, total: f64) -> f64 {
    mean + weight * (sample - mean) / total
}

/// Tabular action-value function `Q(s, a)` with per-pair cumulative weights
///
/// The weight is the visit count `N` for ordinary averaging and the
/// cumulative importance weight `C` for weighted importance sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionValueTable {
    q: Array3<f64>,
    weights: Array3<f64>,
}

impl ActionValueTable {
    /// Zero table for a `size`x`size` grid
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            q: Array3::zeros((size, size, Action::COUNT)),
            weights: Array3::zeros((size, size, Action::COUNT)),
        }
    }

    /// `Q(s, a)`
    #[must_use]
    pub fn q(&self, state: Position, action: Action) -> f64 {
        self.q[[state.row, state.col, action.index()]]
    }

    /// `Q(s, ·)` in enumeration order
    #[must_use]
    pub fn row(&self, state: Position) -> [f64; Action::COUNT] {
        let mut out = [0.0; Action::COUNT];
        for action in Action::ALL {
            out[action.index()] = self.q(state, action);
        }
        out
    }

    /// Cumulative weight of `(s, a)`
    #[must_use]
    pub fn weight(&self, state: Position, action: Action) -> f64 {
        self.weights[[state.row, state.col, action.index()]]
    }

    /// Add `weight` to the pair's cumulative weight and fold `sample` into the
    /// weighted running mean. Returns the new cumulative weight.
    ///
    /// A zero weight leaves the table untouched.
    pub fn record(&mut self, state: Position, action: Action, sample: f64, weight: f64) -> f64 {
        let ix = [state.row, state.col, action.index()];
        if weight == 0.0 {
            return self.weights[ix];
        }
        self.weights[ix] += weight;
        let total = self.weights[ix];
        self.q[ix] = incremental_mean(self.q[ix], sample, weight, total);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unit_weights_give_exact_average() {
        let mut table = ActionValueTable::new(2);
        let s = Position::new(1, 0);
        for g in [2.0, 4.0, 9.0] {
            table.record(s, Action::Up, g, 1.0);
        }
        assert_abs_diff_eq!(table.q(s, Action::Up), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(table.weight(s, Action::Up), 3.0);
        assert_abs_diff_eq!(table.q(s, Action::Down), 0.0);
    }

    #[test]
    fn test_weighted_mean() {
        let mut table = ActionValueTable::new(1);
        let s = Position::new(0, 0);
        table.record(s, Action::Left, 1.0, 1.0);
        table.record(s, Action::Left, 4.0, 2.0);
        // (1*1 + 2*4) / 3
        assert_abs_diff_eq!(table.q(s, Action::Left), 3.0, epsilon = 1e-12);
        assert_eq!(table.row(s)[Action::Left.index()], table.q(s, Action::Left));
    }

    #[test]
    fn test_zero_weight_is_ignored() {
        let mut table = ActionValueTable::new(1);
        let s = Position::new(0, 0);
        assert_abs_diff_eq!(table.record(s, Action::Right, 10.0, 0.0), 0.0);
        assert_abs_diff_eq!(table.q(s, Action::Right), 0.0);
    }
}
