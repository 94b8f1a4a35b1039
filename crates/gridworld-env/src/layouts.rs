//! Built-in 5x5 layouts

use gridworld_core::Position;

use crate::grid::{GridConfig, SpecialCellConfig, SpecialKind, SwapConfig};

const SIZE: usize = 5;
const JUMP_CELL: Position = Position::new(0, 1);
const STOCHASTIC_CELL: Position = Position::new(0, 4);
const JUMP_TARGET: Position = Position::new(3, 2);

fn jump_cell() -> SpecialCellConfig {
    SpecialCellConfig {
        position: JUMP_CELL,
        kind: SpecialKind::Jump {
            target: JUMP_TARGET,
            reward: 5.0,
        },
    }
}

fn stochastic_cell(first_target: Position) -> SpecialCellConfig {
    SpecialCellConfig {
        position: STOCHASTIC_CELL,
        kind: SpecialKind::StochasticJump {
            targets: [first_target, Position::new(4, 4)],
            reward: 2.5,
            split_probability: 0.5,
        },
    }
}

/// Continuing task: no terminals, free moves, both jumps land in the body of the grid
#[must_use]
pub fn classic() -> GridConfig {
    GridConfig {
        size: SIZE,
        special_cells: vec![jump_cell(), stochastic_cell(JUMP_TARGET)],
        terminal_cells: Vec::new(),
        out_of_bounds_penalty: -0.5,
        step_penalty: 0.0,
        terminal_reward: 0.0,
        swap: None,
    }
}

/// Episodic task with two terminal cells and a step penalty
#[must_use]
pub fn terminal() -> GridConfig {
    GridConfig {
        size: SIZE,
        special_cells: vec![jump_cell(), stochastic_cell(Position::new(4, 2))],
        terminal_cells: vec![Position::new(2, 4), Position::new(4, 0)],
        out_of_bounds_penalty: -0.5,
        step_penalty: -0.2,
        terminal_reward: 0.0,
        swap: None,
    }
}

/// [`terminal`] with the two special cells swapping places with probability 0.1
#[must_use]
pub fn shifting() -> GridConfig {
    GridConfig {
        swap: Some(SwapConfig {
            first: JUMP_CELL,
            second: STOCHASTIC_CELL,
            probability: 0.1,
        }),
        ..terminal()
    }
}

/// A single jump cell and one terminal in the far corner
#[must_use]
pub fn jump() -> GridConfig {
    GridConfig {
        size: SIZE,
        special_cells: vec![jump_cell()],
        terminal_cells: vec![Position::new(4, 4)],
        out_of_bounds_penalty: -0.5,
        step_penalty: -0.2,
        terminal_reward: 0.0,
        swap: None,
    }
}
