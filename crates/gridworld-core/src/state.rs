//! Grid positions and cell kinds

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Action, GridError, Result};

/// A cell of the grid, `0 <= row, col < size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index, 0 is the top row
    pub row: usize,
    /// Column index, 0 is the left column
    pub col: usize,
}

impl Position {
    /// Create a new position
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Whether the position lies inside a `size`x`size` grid
    #[must_use]
    pub fn in_bounds(self, size: usize) -> bool {
        self.row < size && self.col < size
    }

    /// Check the position against the grid bounds
    pub fn check_bounds(self, size: usize) -> Result<Self> {
        if self.in_bounds(size) {
            Ok(self)
        } else {
            Err(GridError::InvalidPosition {
                row: self.row,
                col: self.col,
                size,
            })
        }
    }

    /// Cell reached by moving along `action`, `None` if it leaves the grid
    #[must_use]
    pub fn moved(self, action: Action, size: usize) -> Option<Self> {
        let (dr, dc) = action.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let next = Self::new(row, col);
        next.in_bounds(size).then_some(next)
    }

    /// `(row, col)` index for ndarray lookups
    #[must_use]
    pub fn ix(self) -> [usize; 2] {
        [self.row, self.col]
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Every position of a `size`x`size` grid in row-major order
pub fn positions(size: usize) -> impl Iterator<Item = Position> {
    (0..size).flat_map(move |row| (0..size).map(move |col| Position::new(row, col)))
}

/// Kind of a cell as seen by a renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// Ordinary cell
    #[default]
    Plain,
    /// Episode ends here, value is always zero
    Terminal,
    /// Deterministic jump to a fixed target
    Jump,
    /// Jump to one of two targets
    StochasticJump,
    /// Target of at least one jump
    JumpTarget,
}
