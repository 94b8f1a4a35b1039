//! Solver configuration

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use gridworld_core::{Action, ActionDistribution, GridError, Position, Result};
use gridworld_env::GridConfig;

/// How per-state deltas are folded into a sweep's convergence delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaNorm {
    /// Sum of absolute deltas
    Sum,
    /// Largest absolute delta
    Max,
}

impl DeltaNorm {
    /// Fold one absolute delta into the running norm
    #[must_use]
    pub fn fold(self, acc: f64, delta: f64) -> f64 {
        match self {
            DeltaNorm::Sum => acc + delta.abs(),
            DeltaNorm::Max => acc.max(delta.abs()),
        }
    }
}

/// Solution method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Bellman expectation sweep under a fixed policy, sum-norm convergence
    Bellman,
    /// Iterative policy evaluation under a fixed policy, max-norm convergence
    PolicyEvaluation,
    /// Value iteration
    #[default]
    ValueIteration,
    /// Policy iteration
    PolicyIteration,
    /// On-policy first-visit Monte Carlo control from the fixed start
    MonteCarlo,
    /// On-policy first-visit Monte Carlo control with exploring starts
    MonteCarloEs,
    /// Off-policy Monte Carlo with weighted importance sampling
    OffPolicy,
}

impl Method {
    /// Every method, in display order
    pub const ALL: [Method; 7] = [
        Method::Bellman,
        Method::PolicyEvaluation,
        Method::ValueIteration,
        Method::PolicyIteration,
        Method::MonteCarlo,
        Method::MonteCarloEs,
        Method::OffPolicy,
    ];

    /// Command-line name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Method::Bellman => "bellman",
            Method::PolicyEvaluation => "policy-evaluation",
            Method::ValueIteration => "value-iteration",
            Method::PolicyIteration => "policy-iteration",
            Method::MonteCarlo => "monte-carlo",
            Method::MonteCarloEs => "monte-carlo-es",
            Method::OffPolicy => "off-policy",
        }
    }

    /// Whether the method is model-based
    #[must_use]
    pub fn is_dynamic_programming(self) -> bool {
        matches!(
            self,
            Method::Bellman
                | Method::PolicyEvaluation
                | Method::ValueIteration
                | Method::PolicyIteration
        )
    }

    /// Norm used when the configuration does not pick one
    #[must_use]
    pub fn default_delta_norm(self) -> DeltaNorm {
        match self {
            Method::Bellman => DeltaNorm::Sum,
            _ => DeltaNorm::Max,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| GridError::config(format!("unknown method: {s}")))
    }
}

/// Solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Discount factor
    pub gamma: f64,
    /// Convergence threshold for DP sweeps
    pub theta: f64,
    /// Override of the method's delta norm
    pub delta_norm: Option<DeltaNorm>,
    /// Exploration rate of epsilon-greedy and epsilon-soft policies
    pub epsilon: f64,
    /// Monte Carlo episode budget
    pub episodes: usize,
    /// Start every on-policy episode from a uniformly random cell
    pub exploring_starts: bool,
    /// Fixed start cell
    pub start: Position,
    /// Sweeps or episodes between observer calls
    pub checkpoint_interval: usize,
    /// DP sweep cap; exceeding it is reported as non-convergence
    pub max_sweeps: usize,
    /// Step cap per Monte Carlo episode
    pub max_episode_steps: usize,
    /// Fixed action distribution for policy evaluation and off-policy behaviour
    pub behavior: Option<[f64; Action::COUNT]>,
    /// RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            theta: 0.01,
            delta_norm: None,
            epsilon: 0.1,
            episodes: 10_000,
            exploring_starts: false,
            start: Position::new(0, 0),
            checkpoint_interval: 1,
            max_sweeps: 10_000,
            max_episode_steps: 100_000,
            behavior: None,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Reject parameters no solver can run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(GridError::config(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if self.theta.is_nan() || self.theta <= 0.0 {
            return Err(GridError::config(format!(
                "theta must be positive, got {}",
                self.theta
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(GridError::config(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if self.episodes == 0 {
            return Err(GridError::config("episode budget must be at least 1"));
        }
        if self.checkpoint_interval == 0 {
            return Err(GridError::config("checkpoint interval must be at least 1"));
        }
        if self.max_sweeps == 0 || self.max_episode_steps == 0 {
            return Err(GridError::config("sweep and step caps must be at least 1"));
        }
        if !self.behavior_distribution()?.is_soft() {
            return Err(GridError::config(
                "behavior policy must give every action positive probability",
            ));
        }
        Ok(())
    }

    /// Behaviour distribution, uniform when not configured
    pub fn behavior_distribution(&self) -> Result<ActionDistribution> {
        self.behavior
            .map_or(Ok(ActionDistribution::uniform()), ActionDistribution::from_probs)
    }

    /// Delta norm for `method`, honouring the override
    #[must_use]
    pub fn delta_norm_for(&self, method: Method) -> DeltaNorm {
        self.delta_norm
            .unwrap_or_else(|| method.default_delta_norm())
    }

    /// Random source seeded from the configuration
    #[must_use]
    pub fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }
}

/// Everything needed for one run, as loaded from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Grid definition
    pub grid: GridConfig,
    /// Solver parameters
    pub solver: SolverConfig,
    /// Solution method
    pub method: Method,
}

impl RunConfig {
    /// Load a run configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.solver.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delta_norm_for(Method::Bellman), DeltaNorm::Sum);
        assert_eq!(config.delta_norm_for(Method::ValueIteration), DeltaNorm::Max);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let bad = [
            SolverConfig {
                gamma: 1.5,
                ..SolverConfig::default()
            },
            SolverConfig {
                theta: 0.0,
                ..SolverConfig::default()
            },
            SolverConfig {
                epsilon: -0.1,
                ..SolverConfig::default()
            },
            SolverConfig {
                episodes: 0,
                ..SolverConfig::default()
            },
            SolverConfig {
                checkpoint_interval: 0,
                ..SolverConfig::default()
            },
            SolverConfig {
                behavior: Some([0.5, 0.5, 0.0, 0.0]),
                ..SolverConfig::default()
            },
            SolverConfig {
                behavior: Some([0.5, 0.5, 0.5, 0.5]),
                ..SolverConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(GridError::Configuration(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>().unwrap(), method);
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.name()));
        }
        assert!("q-learning".parse::<Method>().is_err());
    }

    #[test]
    fn test_delta_norm_fold() {
        let deltas = [0.5, -2.0, 1.0];
        let sum = deltas.iter().fold(0.0, |acc, d| DeltaNorm::Sum.fold(acc, *d));
        let max = deltas.iter().fold(0.0, |acc, d| DeltaNorm::Max.fold(acc, *d));
        assert!((sum - 3.5).abs() < 1e-12);
        assert!((max - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_config_partial_json() {
        let json = r#"{ "method": "off-policy", "solver": { "gamma": 0.9, "seed": 7 } }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.method, Method::OffPolicy);
        assert!((config.solver.gamma - 0.9).abs() < 1e-12);
        assert_eq!(config.solver.episodes, 10_000);
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_demo_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/shifting_monte_carlo.json");
        let config = RunConfig::from_json_file(path).unwrap();
        assert_eq!(config.method, Method::MonteCarlo);
        assert_eq!(config.grid, gridworld_env::layouts::shifting());
        assert_eq!(config.solver.checkpoint_interval, 1000);
        assert_eq!(config.solver.seed, Some(7));
    }
}
