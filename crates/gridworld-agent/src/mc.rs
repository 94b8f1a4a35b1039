//! On-policy first-visit Monte Carlo control

use ndarray::Array2;
use rand::{rngs::StdRng, Rng};
use tracing::{debug, warn};

use gridworld_core::{
    incremental_mean, positions, zero_values, Action, ActionDistribution, ActionValueTable,
    CellKind, Environment, Episode, GridError, PolicyEntry, PolicyGrid, Position,
    ProgressObserver, Result, SolverView, ValueGrid,
};

use crate::config::{Method, SolverConfig};
use crate::episode;
use crate::report::RunReport;
use crate::solver::{Checkpoints, Solver};
use crate::utils::argmax_random_tie;

/// Epsilon-greedy Monte Carlo control with first-visit averaging
pub struct MonteCarloControl<E, R = StdRng> {
    env: E,
    config: SolverConfig,
    q: ActionValueTable,
    values: ValueGrid,
    policy: Array2<ActionDistribution>,
    greedy: Array2<Option<Action>>,
    rng: R,
}

impl<E: Environment> MonteCarloControl<E, StdRng> {
    /// Create a solver seeded from the configuration
    pub fn new(env: E, config: SolverConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(env, config, rng)
    }
}

impl<E: Environment, R: Rng> MonteCarloControl<E, R> {
    /// Create a solver with an explicit random source
    pub fn with_rng(env: E, config: SolverConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if env.terminal_count() == 0 {
            return Err(GridError::config(
                "Monte Carlo control needs at least one terminal cell",
            ));
        }
        let size = env.size();
        config.start.check_bounds(size)?;
        Ok(Self {
            env,
            config,
            q: ActionValueTable::new(size),
            values: zero_values(size),
            policy: Array2::from_elem((size, size), ActionDistribution::uniform()),
            greedy: Array2::from_elem((size, size), None),
            rng,
        })
    }

    /// Current action values
    pub fn action_values(&self) -> &ActionValueTable {
        &self.q
    }

    /// Current state values
    pub fn values(&self) -> &ValueGrid {
        &self.values
    }

    /// Current behaviour distribution at `state`
    #[must_use]
    pub fn distribution(&self, state: Position) -> ActionDistribution {
        self.policy[state.ix()]
    }

    /// Greedy action at `state`, once the state has been improved
    #[must_use]
    pub fn greedy_action(&self, state: Position) -> Option<Action> {
        self.greedy[state.ix()]
    }

    /// Sample one episode under the current policy
    pub fn generate_episode(&mut self) -> Episode {
        let start = if self.config.exploring_starts {
            let size = self.env.size();
            Position::new(self.rng.gen_range(0..size), self.rng.gen_range(0..size))
        } else {
            self.config.start
        };
        let policy = &self.policy;
        episode::generate_episode(
            &mut self.env,
            start,
            |s| policy[s.ix()],
            self.config.max_episode_steps,
            &mut self.rng,
        )
    }

    /// Fold an episode's first-visit returns into `Q` and `V`
    ///
    /// Returns the number of `(state, action)` pairs updated.
    pub fn update_from_episode(&mut self, episode: &Episode) -> usize {
        let returns = episode.returns(self.config.gamma);
        let first_visits = episode.first_visits();
        let mut updated = 0;

        for ((step, g), first) in episode.steps.iter().zip(returns).zip(first_visits).rev() {
            if !first {
                continue;
            }
            let count = self.q.record(step.state, step.action, g, 1.0);
            let v = &mut self.values[step.state.ix()];
            *v = incremental_mean(*v, g, 1.0, count);
            updated += 1;
        }
        updated
    }

    /// Make the policy epsilon-greedy in `Q` at every non-terminal state
    pub fn improve_policy(&mut self) {
        let epsilon = self.config.epsilon;
        for state in positions(self.env.size()) {
            if self.env.is_terminal(state) {
                continue;
            }
            let best = argmax_random_tie(&self.q.row(state), &mut self.rng);
            self.policy[state.ix()] = ActionDistribution::epsilon_greedy(best, epsilon);
            self.greedy[state.ix()] = Some(best);
        }
    }

    fn current_method(&self) -> Method {
        if self.config.exploring_starts {
            Method::MonteCarloEs
        } else {
            Method::MonteCarlo
        }
    }

    /// Run the configured episode budget
    pub fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let mut report = RunReport::begin(self.current_method());
        let mut checkpoints = Checkpoints::new(self.config.checkpoint_interval);

        for index in 1..=self.config.episodes {
            let episode = self.generate_episode();
            if episode.truncated {
                report.truncated_episodes += 1;
            }
            report.layout_changes += episode.layout_changes;
            checkpoints.note_layout_change(episode.layout_changes > 0);

            let updated = self.update_from_episode(&episode);
            self.improve_policy();
            report.iterations = index;
            debug!(episode = index, steps = episode.len(), updated, "episode processed");

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

impl<E: Environment, R: Rng> SolverView for MonteCarloControl<E, R> {
    fn value_snapshot(&self) -> ValueGrid {
        self.values.clone()
    }

    fn policy_snapshot(&self) -> PolicyGrid {
        Array2::from_shape_fn(self.greedy.dim(), |ix| match self.greedy[ix] {
            Some(greedy) => PolicyEntry::Stochastic {
                greedy,
                distribution: self.policy[ix],
            },
            None => PolicyEntry::Unset,
        })
    }

    fn special_cell_layout(&self) -> Array2<CellKind> {
        self.env.layout()
    }
}

impl<E: Environment, R: Rng> Solver for MonteCarloControl<E, R> {
    fn method(&self) -> Method {
        self.current_method()
    }

    fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        MonteCarloControl::run(self, observer)
    }
}
