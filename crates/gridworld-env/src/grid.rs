//! Grid-world transition model
//!
//! Rules are evaluated in this order for `step(position, action)`:
//!
//! 1. terminal cell: stay, reward 0
//! 2. jump cell: go to the configured target, ignoring the action
//! 3. stochastic jump cell: go to one of two targets
//! 4. move leaving the grid: stay, out-of-bounds penalty
//! 5. move onto a terminal cell: terminal reward
//! 6. anything else: step penalty

use indexmap::{IndexMap, IndexSet};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gridworld_core::{Action, CellKind, Environment, GridError, Outcome, Position, Result};

use crate::layouts;

fn default_split() -> f64 {
    0.5
}

/// Behaviour of a special cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecialKind {
    /// Deterministic jump
    Jump {
        /// Where the agent lands
        target: Position,
        /// Reward for the jump
        reward: f64,
    },
    /// Jump to `targets[0]` with `split_probability`, otherwise to `targets[1]`
    StochasticJump {
        /// The two landing cells
        targets: [Position; 2],
        /// Reward for either jump
        reward: f64,
        /// Probability of landing on the first target
        #[serde(default = "default_split")]
        split_probability: f64,
    },
}

impl SpecialKind {
    fn cell_kind(&self) -> CellKind {
        match self {
            SpecialKind::Jump { .. } => CellKind::Jump,
            SpecialKind::StochasticJump { .. } => CellKind::StochasticJump,
        }
    }

    fn targets(&self) -> Vec<Position> {
        match self {
            SpecialKind::Jump { target, .. } => vec![*target],
            SpecialKind::StochasticJump { targets, .. } => targets.to_vec(),
        }
    }
}

/// A special cell in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecialCellConfig {
    /// Where the special cell sits
    pub position: Position,
    /// What it does
    #[serde(flatten)]
    pub kind: SpecialKind,
}

/// Random exchange of two special cells after every simulated step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// First special cell
    pub first: Position,
    /// Second special cell
    pub second: Position,
    /// Chance of swapping at each opportunity
    pub probability: f64,
}

/// Grid definition supplied by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of the square grid
    pub size: usize,
    /// Jump cells
    pub special_cells: Vec<SpecialCellConfig>,
    /// Cells where episodes end
    pub terminal_cells: Vec<Position>,
    /// Reward for trying to leave the grid
    pub out_of_bounds_penalty: f64,
    /// Reward for an ordinary move
    pub step_penalty: f64,
    /// Reward for moving onto a terminal cell
    pub terminal_reward: f64,
    /// Non-stationary special-cell swap
    pub swap: Option<SwapConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        layouts::terminal()
    }
}

/// Validated grid world
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: usize,
    special: IndexMap<Position, SpecialKind>,
    terminals: IndexSet<Position>,
    out_of_bounds_penalty: f64,
    step_penalty: f64,
    terminal_reward: f64,
    swap: Option<SwapConfig>,
}

impl GridWorld {
    /// Build a grid world, rejecting invalid or contradictory configurations
    pub fn new(config: GridConfig) -> Result<Self> {
        let size = config.size;
        if size == 0 {
            return Err(GridError::config("grid size must be at least 1"));
        }
        for (name, value) in [
            ("out_of_bounds_penalty", config.out_of_bounds_penalty),
            ("step_penalty", config.step_penalty),
            ("terminal_reward", config.terminal_reward),
        ] {
            if !value.is_finite() {
                return Err(GridError::config(format!("{name} must be finite")));
            }
        }

        let mut terminals = IndexSet::new();
        for cell in &config.terminal_cells {
            terminals.insert(cell.check_bounds(size)?);
        }

        let mut special = IndexMap::new();
        for cell in &config.special_cells {
            let position = cell.position.check_bounds(size)?;
            if terminals.contains(&position) {
                return Err(GridError::config(format!(
                    "cell {position} is both special and terminal"
                )));
            }
            for target in cell.kind.targets() {
                target.check_bounds(size)?;
            }
            match cell.kind {
                SpecialKind::Jump { reward, .. } if !reward.is_finite() => {
                    return Err(GridError::config(format!(
                        "jump reward at {position} must be finite"
                    )));
                }
                SpecialKind::StochasticJump {
                    reward,
                    split_probability,
                    ..
                } => {
                    if !reward.is_finite() {
                        return Err(GridError::config(format!(
                            "jump reward at {position} must be finite"
                        )));
                    }
                    if !(0.0..=1.0).contains(&split_probability) {
                        return Err(GridError::config(format!(
                            "split probability at {position} must be in [0, 1], \
                             got {split_probability}"
                        )));
                    }
                }
                SpecialKind::Jump { .. } => {}
            }
            if special.insert(position, cell.kind).is_some() {
                return Err(GridError::config(format!(
                    "cell {position} is declared special more than once"
                )));
            }
        }

        if let Some(swap) = &config.swap {
            if swap.first == swap.second {
                return Err(GridError::config("swap cells must be distinct"));
            }
            for cell in [swap.first, swap.second] {
                if !special.contains_key(&cell) {
                    return Err(GridError::config(format!(
                        "swap cell {cell} is not a special cell"
                    )));
                }
            }
            if !(0.0..=1.0).contains(&swap.probability) {
                return Err(GridError::config(format!(
                    "swap probability must be in [0, 1], got {}",
                    swap.probability
                )));
            }
        }

        Ok(Self {
            size,
            special,
            terminals,
            out_of_bounds_penalty: config.out_of_bounds_penalty,
            step_penalty: config.step_penalty,
            terminal_reward: config.terminal_reward,
            swap: config.swap,
        })
    }

    /// Special cell at `position`, if any
    #[must_use]
    pub fn special_cell(&self, position: Position) -> Option<&SpecialKind> {
        self.special.get(&position)
    }

    /// Special cells in declaration order
    pub fn special_cells(&self) -> impl Iterator<Item = (Position, &SpecialKind)> {
        self.special.iter().map(|(p, k)| (*p, k))
    }

    /// Terminal cells in declaration order
    pub fn terminal_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.terminals.iter().copied()
    }

    /// Whether the grid has the non-stationary swap option
    #[must_use]
    pub fn is_non_stationary(&self) -> bool {
        self.swap.is_some_and(|s| s.probability > 0.0)
    }

    /// Exchange the behaviour of the two swap cells
    ///
    /// Does nothing when the grid has no swap option.
    pub fn swap_special_cells(&mut self) {
        let Some(swap) = self.swap else {
            return;
        };
        if let (Some(first), Some(second)) = (
            self.special.get(&swap.first).copied(),
            self.special.get(&swap.second).copied(),
        ) {
            self.special.insert(swap.first, second);
            self.special.insert(swap.second, first);
            debug!(first = %swap.first, second = %swap.second, "special cells swapped");
        }
    }

    /// Current configuration, reflecting any swaps so far
    #[must_use]
    pub fn config(&self) -> GridConfig {
        GridConfig {
            size: self.size,
            special_cells: self
                .special
                .iter()
                .map(|(position, kind)| SpecialCellConfig {
                    position: *position,
                    kind: *kind,
                })
                .collect(),
            terminal_cells: self.terminals.iter().copied().collect(),
            out_of_bounds_penalty: self.out_of_bounds_penalty,
            step_penalty: self.step_penalty,
            terminal_reward: self.terminal_reward,
            swap: self.swap,
        }
    }
}

impl Environment for GridWorld {
    fn size(&self) -> usize {
        self.size
    }

    fn is_terminal(&self, state: Position) -> bool {
        self.terminals.contains(&state)
    }

    fn outcomes(&self, state: Position, action: Action) -> Vec<Outcome> {
        if self.is_terminal(state) {
            return vec![Outcome::certain(state, 0.0)];
        }

        match self.special.get(&state) {
            Some(SpecialKind::Jump { target, reward }) => {
                return vec![Outcome::certain(*target, *reward)];
            }
            Some(SpecialKind::StochasticJump {
                targets,
                reward,
                split_probability,
            }) => {
                let mut first = Outcome::certain(targets[0], *reward);
                first.probability = *split_probability;
                let mut second = Outcome::certain(targets[1], *reward);
                second.probability = 1.0 - split_probability;
                return vec![first, second];
            }
            None => {}
        }

        match state.moved(action, self.size) {
            None => vec![Outcome::certain(state, self.out_of_bounds_penalty)],
            Some(next) if self.is_terminal(next) => {
                vec![Outcome::certain(next, self.terminal_reward)]
            }
            Some(next) => vec![Outcome::certain(next, self.step_penalty)],
        }
    }

    fn layout(&self) -> Array2<CellKind> {
        let mut layout = Array2::from_elem((self.size, self.size), CellKind::Plain);
        for kind in self.special.values() {
            for target in kind.targets() {
                layout[target.ix()] = CellKind::JumpTarget;
            }
        }
        for (position, kind) in &self.special {
            layout[position.ix()] = kind.cell_kind();
        }
        for terminal in &self.terminals {
            layout[terminal.ix()] = CellKind::Terminal;
        }
        layout
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self.swap {
            Some(swap) if rng.gen::<f64>() < swap.probability => {
                self.swap_special_cells();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    fn terminal_grid() -> GridWorld {
        GridWorld::new(layouts::terminal()).unwrap()
    }

    #[test]
    fn test_terminal_cell_absorbs() {
        let grid = terminal_grid();
        let mut rng = StdRng::seed_from_u64(1);
        for action in Action::ALL {
            let t = grid.step(p(2, 4), action, &mut rng);
            assert_eq!(t.next, p(2, 4));
            assert_abs_diff_eq!(t.reward, 0.0);
        }
    }

    #[test]
    fn test_jump_ignores_action() {
        let grid = terminal_grid();
        let mut rng = StdRng::seed_from_u64(1);
        for action in Action::ALL {
            let t = grid.step(p(0, 1), action, &mut rng);
            assert_eq!(t.next, p(3, 2));
            assert_abs_diff_eq!(t.reward, 5.0);
        }
    }

    #[test]
    fn test_stochastic_jump_split() {
        let grid = terminal_grid();
        let outcomes = grid.outcomes(p(0, 4), Action::Left);
        assert_eq!(outcomes.len(), 2);
        assert_abs_diff_eq!(outcomes.iter().map(|o| o.probability).sum::<f64>(), 1.0);

        let mut rng = StdRng::seed_from_u64(42);
        let n = 10_000;
        let first = (0..n)
            .filter(|_| grid.step(p(0, 4), Action::Up, &mut rng).next == p(4, 2))
            .count();
        assert_abs_diff_eq!(first as f64 / n as f64, 0.5, epsilon = 0.02);
    }

    #[test]
    fn test_out_of_bounds_stays_put() {
        let grid = terminal_grid();
        let mut rng = StdRng::seed_from_u64(1);
        let t = grid.step(p(0, 0), Action::Up, &mut rng);
        assert_eq!(t.next, p(0, 0));
        assert_abs_diff_eq!(t.reward, -0.5);
        let t = grid.step(p(4, 4), Action::Right, &mut rng);
        assert_eq!(t.next, p(4, 4));
    }

    #[test]
    fn test_entering_terminal_and_plain_moves() {
        let grid = terminal_grid();
        let mut rng = StdRng::seed_from_u64(1);
        let t = grid.step(p(1, 4), Action::Down, &mut rng);
        assert_eq!(t.next, p(2, 4));
        assert_abs_diff_eq!(t.reward, 0.0);
        let t = grid.step(p(1, 1), Action::Down, &mut rng);
        assert_eq!(t.next, p(2, 1));
        assert_abs_diff_eq!(t.reward, -0.2);
    }

    #[test]
    fn test_rejects_special_terminal_overlap() {
        let mut config = layouts::terminal();
        config.terminal_cells.push(p(0, 1));
        assert!(matches!(GridWorld::new(config), Err(GridError::Configuration(_))));
    }

    #[test]
    fn test_rejects_out_of_grid_target() {
        let mut config = layouts::jump();
        config.special_cells[0].kind = SpecialKind::Jump {
            target: p(7, 0),
            reward: 1.0,
        };
        assert!(matches!(
            GridWorld::new(config),
            Err(GridError::InvalidPosition { row: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_split_and_size() {
        let mut config = layouts::classic();
        if let SpecialKind::StochasticJump {
            split_probability, ..
        } = &mut config.special_cells[1].kind
        {
            *split_probability = 1.5;
        }
        assert!(GridWorld::new(config).is_err());

        let config = GridConfig {
            size: 0,
            ..GridConfig::default()
        };
        assert!(GridWorld::new(config).is_err());
    }

    #[test]
    fn test_swap_exchanges_behaviour_and_layout() {
        let mut grid = GridWorld::new(layouts::shifting()).unwrap();
        assert!(grid.is_non_stationary());
        assert_eq!(grid.layout()[[0, 1]], CellKind::Jump);
        assert_eq!(grid.layout()[[0, 4]], CellKind::StochasticJump);

        grid.swap_special_cells();
        assert!(matches!(
            grid.special_cell(p(0, 1)),
            Some(SpecialKind::StochasticJump { .. })
        ));
        assert!(matches!(grid.special_cell(p(0, 4)), Some(SpecialKind::Jump { .. })));
        assert!(grid.special_cell(p(0, 0)).is_none());
        assert_eq!(grid.layout()[[0, 1]], CellKind::StochasticJump);
        assert_eq!(grid.layout()[[0, 4]], CellKind::Jump);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(grid.step(p(0, 4), Action::Up, &mut rng).next, p(3, 2));
    }

    #[test]
    fn test_perturb_rate() {
        let mut grid = GridWorld::new(layouts::shifting()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let swaps = (0..10_000).filter(|_| grid.perturb(&mut rng)).count();
        assert_abs_diff_eq!(swaps as f64 / 10_000.0, 0.1, epsilon = 0.015);

        let mut stationary = terminal_grid();
        assert!(!(0..100).any(|_| stationary.perturb(&mut rng)));
    }

    #[test]
    fn test_config_roundtrip_through_json() {
        let config = layouts::shifting();
        let json = serde_json::to_string(&config).unwrap();
        let back: GridConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(GridWorld::new(back).unwrap().config(), config);
    }
}
