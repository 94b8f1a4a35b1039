//! Off-policy Monte Carlo control with weighted importance sampling
//!
//! Episodes are sampled from a fixed behaviour distribution. The target
//! policy is epsilon-soft greedy in `Q` and is refreshed at each state as the
//! backward pass reaches it, before the importance weight picks up that
//! state's ratio.

use ndarray::Array2;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gridworld_core::{
    incremental_mean, zero_values, Action, ActionDistribution, ActionValueTable, CellKind,
    Environment, Episode, GridError, PolicyEntry, PolicyGrid, Position, ProgressObserver, Result,
    SolverView, ValueGrid,
};

use crate::config::{Method, SolverConfig};
use crate::episode;
use crate::report::RunReport;
use crate::solver::{Checkpoints, Solver};
use crate::utils::argmax_first;

/// Summary of one backward pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackwardPass {
    /// Steps whose `(state, action)` pair was updated
    pub updated: usize,
    /// Importance weight when the pass ended
    pub final_weight: f64,
}

/// Weighted importance-sampling estimator
pub struct OffPolicyMonteCarlo<E, R = StdRng> {
    env: E,
    config: SolverConfig,
    behavior: ActionDistribution,
    q: ActionValueTable,
    values: ValueGrid,
    value_weights: Array2<f64>,
    target: Array2<ActionDistribution>,
    greedy: Array2<Option<Action>>,
    rng: R,
}

impl<E: Environment> OffPolicyMonteCarlo<E, StdRng> {
    /// Create an estimator seeded from the configuration
    pub fn new(env: E, config: SolverConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(env, config, rng)
    }
}

impl<E: Environment, R: Rng> OffPolicyMonteCarlo<E, R> {
    /// Create an estimator with an explicit random source
    pub fn with_rng(env: E, config: SolverConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if env.terminal_count() == 0 {
            return Err(GridError::config(
                "off-policy Monte Carlo needs at least one terminal cell",
            ));
        }
        let size = env.size();
        config.start.check_bounds(size)?;
        let behavior = config.behavior_distribution()?;
        Ok(Self {
            env,
            config,
            behavior,
            q: ActionValueTable::new(size),
            values: zero_values(size),
            value_weights: Array2::zeros((size, size)),
            target: Array2::from_elem((size, size), ActionDistribution::uniform()),
            greedy: Array2::from_elem((size, size), None),
            rng,
        })
    }

    /// Current action values; the weights are the cumulative `C[s, a]`
    pub fn action_values(&self) -> &ActionValueTable {
        &self.q
    }

    /// Current state values
    pub fn values(&self) -> &ValueGrid {
        &self.values
    }

    /// Cumulative importance weight behind each state value
    pub fn value_weights(&self) -> &Array2<f64> {
        &self.value_weights
    }

    /// Fixed behaviour distribution
    pub fn behavior(&self) -> &ActionDistribution {
        &self.behavior
    }

    /// Target distribution at `state`
    #[must_use]
    pub fn target(&self, state: Position) -> ActionDistribution {
        self.target[state.ix()]
    }

    /// Greedy target action at `state`, once the state has been updated
    #[must_use]
    pub fn greedy_action(&self, state: Position) -> Option<Action> {
        self.greedy[state.ix()]
    }

    /// Sample one episode from the start cell under the behaviour distribution
    pub fn generate_episode(&mut self) -> Episode {
        let behavior = self.behavior;
        episode::generate_episode(
            &mut self.env,
            self.config.start,
            |_| behavior,
            self.config.max_episode_steps,
            &mut self.rng,
        )
    }

    /// Weighted importance-sampling backward pass over one episode
    #[allow(clippy::float_cmp)]
    pub fn update_from_episode(&mut self, episode: &Episode) -> BackwardPass {
        let gamma = self.config.gamma;
        let epsilon = self.config.epsilon;
        let mut g = 0.0;
        let mut w = 1.0;
        let mut updated = 0;

        for step in episode.steps.iter().rev() {
            g = gamma * g + step.reward;

            self.q.record(step.state, step.action, g, w);
            let total = &mut self.value_weights[step.state.ix()];
            *total += w;
            let v = &mut self.values[step.state.ix()];
            *v = incremental_mean(*v, g, w, *total);
            updated += 1;

            let best = argmax_first(&self.q.row(step.state));
            let target = ActionDistribution::epsilon_greedy(best, epsilon);
            self.target[step.state.ix()] = target;
            self.greedy[step.state.ix()] = Some(best);

            w *= target.prob(step.action) / self.behavior.prob(step.action);
            if w == 0.0 {
                break;
            }
        }

        BackwardPass {
            updated,
            final_weight: w,
        }
    }

    /// Run the configured episode budget
    pub fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let mut report = RunReport::begin(Method::OffPolicy);
        let mut checkpoints = Checkpoints::new(self.config.checkpoint_interval);

        for index in 1..=self.config.episodes {
            let episode = self.generate_episode();
            if episode.truncated {
                report.truncated_episodes += 1;
            }
            report.layout_changes += episode.layout_changes;
            checkpoints.note_layout_change(episode.layout_changes > 0);

            let pass = self.update_from_episode(&episode);
            report.iterations = index;
            debug!(
                episode = index,
                steps = episode.len(),
                updated = pass.updated,
                weight = pass.final_weight,
                "backward pass"
            );

            if checkpoints.reached(observer, &*self, index, None).is_break() {
                report.stopped_early = true;
                break;
            }
        }

        report.converged = !report.stopped_early;
        if report.truncated_episodes > 0 {
            warn!(
                truncated = report.truncated_episodes,
                cap = self.config.max_episode_steps,
                "episodes hit the step cap"
            );
        }
        checkpoints.finish(observer, &*self, report.iterations, None);
        report.finish(&self.values)
    }
}

impl<E: Environment, R: Rng> SolverView for OffPolicyMonteCarlo<E, R> {
    fn value_snapshot(&self) -> ValueGrid {
        self.values.clone()
    }

    fn policy_snapshot(&self) -> PolicyGrid {
        Array2::from_shape_fn(self.greedy.dim(), |ix| match self.greedy[ix] {
            Some(greedy) => PolicyEntry::Stochastic {
                greedy,
                distribution: self.target[ix],
            },
            None => PolicyEntry::Unset,
        })
    }

    fn special_cell_layout(&self) -> Array2<CellKind> {
        self.env.layout()
    }
}

impl<E: Environment, R: Rng> Solver for OffPolicyMonteCarlo<E, R> {
    fn method(&self) -> Method {
        Method::OffPolicy
    }

    fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        OffPolicyMonteCarlo::run(self, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gridworld_env::{GridConfig, GridWorld};
    use rand::SeedableRng;

    fn estimator(epsilon: f64) -> OffPolicyMonteCarlo<GridWorld> {
        let grid = GridWorld::new(GridConfig {
            size: 2,
            special_cells: Vec::new(),
            terminal_cells: vec![Position::new(1, 1)],
            ..GridConfig::default()
        })
        .unwrap();
        OffPolicyMonteCarlo::with_rng(
            grid,
            SolverConfig {
                epsilon,
                gamma: 1.0,
                ..SolverConfig::default()
            },
            StdRng::seed_from_u64(17),
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_update_by_hand() {
        let mut op = estimator(0.4);
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        let mut episode = Episode::new();
        episode.push(a, Action::Right, -0.2);
        episode.push(b, Action::Down, 0.0);

        let pass = op.update_from_episode(&episode);
        assert_eq!(pass.updated, 2);

        // (b, Down): G = 0, C = 1; greedy at b is Up (all zero), so target(Down) = 0.1
        assert_abs_diff_eq!(op.action_values().weight(b, Action::Down), 1.0);
        assert_eq!(op.greedy_action(b), Some(Action::Up));
        // W = 0.1 / 0.25 = 0.4 when (a, Right) is recorded
        assert_abs_diff_eq!(op.action_values().weight(a, Action::Right), 0.4);
        assert_abs_diff_eq!(op.action_values().q(a, Action::Right), -0.2);
        assert_abs_diff_eq!(op.values()[[0, 0]], -0.2);
        // Q(a, Right) = -0.2 is the lowest, so Up is greedy and target(Right) = 0.1
        assert_abs_diff_eq!(pass.final_weight, 0.4 * 0.4);
    }

    #[test]
    fn test_state_value_averages_across_actions() {
        let mut op = estimator(0.4);
        let a = Position::new(0, 0);

        let mut first = Episode::new();
        first.push(a, Action::Up, -1.0);
        op.update_from_episode(&first);

        let mut second = Episode::new();
        second.push(a, Action::Right, -3.0);
        op.update_from_episode(&second);

        assert_abs_diff_eq!(op.action_values().q(a, Action::Up), -1.0);
        assert_abs_diff_eq!(op.action_values().q(a, Action::Right), -3.0);
        assert_abs_diff_eq!(op.value_weights()[[0, 0]], 2.0);
        assert_abs_diff_eq!(op.values()[[0, 0]], -2.0);
    }

    #[test]
    fn test_zero_weight_stops_pass() {
        let mut op = estimator(0.0);
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        let mut episode = Episode::new();
        episode.push(a, Action::Right, -0.2);
        episode.push(b, Action::Down, 0.0);

        let pass = op.update_from_episode(&episode);
        assert_eq!(pass.updated, 1);
        assert_abs_diff_eq!(pass.final_weight, 0.0);
        assert_abs_diff_eq!(op.action_values().weight(a, Action::Right), 0.0);
        assert_eq!(op.greedy_action(a), None);
    }

    #[test]
    fn test_rejects_hard_behavior() {
        let grid = GridWorld::new(gridworld_env::layouts::terminal()).unwrap();
        let config = SolverConfig {
            behavior: Some([1.0, 0.0, 0.0, 0.0]),
            ..SolverConfig::default()
        };
        assert!(OffPolicyMonteCarlo::new(grid, config).is_err());
    }
}
