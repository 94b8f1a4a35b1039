//! Dynamic-programming solvers
//!
//! Bellman expectation sweeps and iterative policy evaluation evaluate a
//! fixed action distribution. Value iteration and policy iteration solve
//! for the optimal values and keep every tied-best action per state.
//! All backups take the exact expectation over stochastic jump outcomes.

use ndarray::Array2;
use rand::{rngs::StdRng, Rng};
use tracing::{debug, warn};

use gridworld_core::{
    positions, zero_values, Action, ActionDistribution, CellKind, Environment, GridError,
    PolicyEntry, PolicyGrid, Position, ProgressObserver, Result, SolverView, ValueGrid,
};

use crate::config::{DeltaNorm, Method, SolverConfig};
use crate::report::RunReport;
use crate::solver::{Checkpoints, Solver};
use crate::utils::argmax_all;

/// One-step lookahead `Σ p (r + γ V(s'))` for every action
fn lookahead<E: Environment>(
    env: &E,
    values: &ValueGrid,
    gamma: f64,
    state: Position,
) -> [f64; Action::COUNT] {
    let mut q = [0.0; Action::COUNT];
    for action in Action::ALL {
        q[action.index()] = env
            .outcomes(state, action)
            .iter()
            .map(|o| o.probability * (o.transition.reward + gamma * values[o.transition.next.ix()]))
            .sum();
    }
    q
}

/// Model-based solver over an [`Environment`]
pub struct DynamicProgrammingSolver<E, R = StdRng> {
    env: E,
    config: SolverConfig,
    method: Method,
    values: ValueGrid,
    policy: PolicyGrid,
    rng: R,
}

impl<E: Environment> DynamicProgrammingSolver<E, StdRng> {
    /// Create a solver seeded from the configuration
    pub fn new(env: E, config: SolverConfig) -> Result<Self> {
        let rng = config.rng();
        Self::with_rng(env, config, rng)
    }
}

impl<E: Environment, R: Rng> DynamicProgrammingSolver<E, R> {
    /// Create a solver with an explicit random source
    ///
    /// The random source only drives the layout swap during policy iteration.
    pub fn with_rng(env: E, config: SolverConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let size = env.size();
        Ok(Self {
            env,
            config,
            method: Method::ValueIteration,
            values: zero_values(size),
            policy: Array2::default((size, size)),
            rng,
        })
    }

    /// Select the method [`Solver::run`] uses
    pub fn with_method(mut self, method: Method) -> Result<Self> {
        if !method.is_dynamic_programming() {
            return Err(GridError::config(format!(
                "{method} is not a dynamic-programming method"
            )));
        }
        self.method = method;
        Ok(self)
    }

    /// Current state values
    pub fn values(&self) -> &ValueGrid {
        &self.values
    }

    /// Current policy
    pub fn policy(&self) -> &PolicyGrid {
        &self.policy
    }

    /// The environment being solved
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Action values of `state` under the current value grid
    #[must_use]
    pub fn action_values(&self, state: Position) -> [f64; Action::COUNT] {
        lookahead(&self.env, &self.values, self.config.gamma, state)
    }

    /// One synchronous expectation sweep under `distribution`; returns the delta
    ///
    /// The displayed policy is the greedy tie set of the lookahead.
    pub fn expectation_sweep(&mut self, distribution: &ActionDistribution, norm: DeltaNorm) -> f64 {
        let gamma = self.config.gamma;
        let mut next = zero_values(self.env.size());
        let mut delta = 0.0;
        for state in positions(self.env.size()) {
            if self.env.is_terminal(state) {
                continue;
            }
            let q = lookahead(&self.env, &self.values, gamma, state);
            let v: f64 = Action::ALL
                .into_iter()
                .map(|a| distribution.prob(a) * q[a.index()])
                .sum();
            delta = norm.fold(delta, v - self.values[state.ix()]);
            next[state.ix()] = v;
            self.policy[state.ix()] = PolicyEntry::Tied {
                actions: argmax_all(&q),
            };
        }
        self.values = next;
        delta
    }

    /// One synchronous greedy sweep `V(s) = max_a Q(s, a)`; returns the delta
    pub fn greedy_sweep(&mut self, norm: DeltaNorm) -> f64 {
        let gamma = self.config.gamma;
        let mut next = zero_values(self.env.size());
        let mut delta = 0.0;
        for state in positions(self.env.size()) {
            if self.env.is_terminal(state) {
                continue;
            }
            let q = lookahead(&self.env, &self.values, gamma, state);
            let v = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            delta = norm.fold(delta, v - self.values[state.ix()]);
            next[state.ix()] = v;
            self.policy[state.ix()] = PolicyEntry::Tied {
                actions: argmax_all(&q),
            };
        }
        self.values = next;
        delta
    }

    /// One in-place greedy sweep, leaving the policy untouched
    pub fn greedy_sweep_in_place(&mut self, norm: DeltaNorm) -> f64 {
        let gamma = self.config.gamma;
        let mut delta = 0.0;
        for state in positions(self.env.size()) {
            if self.env.is_terminal(state) {
                continue;
            }
            let q = lookahead(&self.env, &self.values, gamma, state);
            let v = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            delta = norm.fold(delta, v - self.values[state.ix()]);
            self.values[state.ix()] = v;
        }
        delta
    }

    /// Recompute the best-action set of every non-terminal state
    ///
    /// Returns `true` when no state's set changed.
    pub fn improve_policy(&mut self) -> bool {
        let gamma = self.config.gamma;
        let mut stable = true;
        for state in positions(self.env.size()) {
            if self.env.is_terminal(state) {
                continue;
            }
            let q = lookahead(&self.env, &self.values, gamma, state);
            let entry = PolicyEntry::Tied {
                actions: argmax_all(&q),
            };
            if self.policy[state.ix()] != entry {
                stable = false;
                self.policy[state.ix()] = entry;
            }
        }
        stable
    }

    fn sweep_until_converged<F>(
        &mut self,
        method: Method,
        observer: &mut dyn ProgressObserver,
        mut sweep: F,
    ) -> RunReport
    where
        F: FnMut(&mut Self) -> f64,
    {
        let theta = self.config.theta;
        let mut report = RunReport::begin(method);
        let mut checkpoints = Checkpoints::new(self.config.checkpoint_interval);

        while report.iterations < self.config.max_sweeps {
            let delta = sweep(self);
            report.iterations += 1;
            report.final_delta = Some(delta);
            debug!(sweep = report.iterations, delta, "sweep complete");

            if delta < theta {
                report.converged = true;
                break;
            }
            if checkpoints
                .reached(observer, &*self, report.iterations, Some(delta))
                .is_break()
            {
                report.stopped_early = true;
                break;
            }
        }

        if !report.converged && !report.stopped_early {
            warn!(
                %method,
                sweeps = report.iterations,
                delta = ?report.final_delta,
                "did not converge within the sweep cap"
            );
        }
        checkpoints.finish(observer, &*self, report.iterations, report.final_delta);
        report.finish(&self.values)
    }

    /// Evaluate a fixed action distribution until the delta drops below `theta`
    pub fn evaluate_policy(
        &mut self,
        distribution: ActionDistribution,
        method: Method,
        observer: &mut dyn ProgressObserver,
    ) -> RunReport {
        let norm = self.config.delta_norm_for(method);
        self.sweep_until_converged(method, observer, |solver| {
            solver.expectation_sweep(&distribution, norm)
        })
    }

    fn configured_distribution(&self) -> ActionDistribution {
        self.config
            .behavior_distribution()
            .unwrap_or_default()
    }

    /// Bellman expectation sweeps, sum-norm convergence by default
    pub fn bellman(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let distribution = self.configured_distribution();
        self.evaluate_policy(distribution, Method::Bellman, observer)
    }

    /// Iterative policy evaluation, max-norm convergence by default
    pub fn policy_evaluation(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let distribution = self.configured_distribution();
        self.evaluate_policy(distribution, Method::PolicyEvaluation, observer)
    }

    /// Value iteration
    pub fn value_iteration(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let norm = self.config.delta_norm_for(Method::ValueIteration);
        self.sweep_until_converged(Method::ValueIteration, observer, |solver| {
            solver.greedy_sweep(norm)
        })
    }

    /// Policy iteration
    ///
    /// Each pass evaluates to convergence, then improves. On a non-stationary
    /// grid the layout may swap after an improvement, which forces another pass.
    pub fn policy_iteration(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        let norm = self.config.delta_norm_for(Method::PolicyIteration);
        let theta = self.config.theta;
        let mut report = RunReport::begin(Method::PolicyIteration);
        let mut checkpoints = Checkpoints::new(self.config.checkpoint_interval);
        let mut sweeps = 0;

        'outer: loop {
            let delta = loop {
                if sweeps >= self.config.max_sweeps {
                    warn!(
                        sweeps,
                        delta = ?report.final_delta,
                        "policy iteration did not converge within the sweep cap"
                    );
                    break 'outer;
                }
                let delta = self.greedy_sweep_in_place(norm);
                sweeps += 1;
                report.final_delta = Some(delta);
                if delta < theta {
                    break delta;
                }
            };

            let mut stable = self.improve_policy();
            report.iterations += 1;
            if self.env.perturb(&mut self.rng) {
                report.layout_changes += 1;
                checkpoints.note_layout_change(true);
                stable = false;
            }
            debug!(pass = report.iterations, sweeps, delta, stable, "improvement pass");

            if stable {
                report.converged = true;
                break;
            }
            if checkpoints
                .reached(observer, &*self, report.iterations, Some(delta))
                .is_break()
            {
                report.stopped_early = true;
                break;
            }
        }

        checkpoints.finish(observer, &*self, report.iterations, report.final_delta);
        report.finish(&self.values)
    }

    /// Run the selected method
    pub fn solve(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        match self.method {
            Method::Bellman => self.bellman(observer),
            Method::PolicyEvaluation => self.policy_evaluation(observer),
            Method::PolicyIteration => self.policy_iteration(observer),
            _ => self.value_iteration(observer),
        }
    }
}

impl<E: Environment, R: Rng> SolverView for DynamicProgrammingSolver<E, R> {
    fn value_snapshot(&self) -> ValueGrid {
        self.values.clone()
    }

    fn policy_snapshot(&self) -> PolicyGrid {
        self.policy.clone()
    }

    fn special_cell_layout(&self) -> Array2<CellKind> {
        self.env.layout()
    }
}

impl<E: Environment, R: Rng> Solver for DynamicProgrammingSolver<E, R> {
    fn method(&self) -> Method {
        self.method
    }

    fn run(&mut self, observer: &mut dyn ProgressObserver) -> RunReport {
        self.solve(observer)
    }
}
