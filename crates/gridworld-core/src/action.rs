//! Actions and tied-action sets
//!
//! The enumeration order `Up, Down, Left, Right` is significant: every
//! deterministic tie-break and every ordered action listing follows it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four grid moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Move one row up
    Up,
    /// Move one row down
    Down,
    /// Move one column left
    Left,
    /// Move one column right
    Right,
}

impl Action {
    /// Number of actions
    pub const COUNT: usize = 4;

    /// All actions in enumeration order
    pub const ALL: [Action; Self::COUNT] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Position of the action in the enumeration order
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    /// Action at `index` in the enumeration order
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Row/column displacement of the move
    #[must_use]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
        };
        f.write_str(name)
    }
}

/// Set of actions, iterated in enumeration order
///
/// Used for the tied-best actions of the dynamic-programming policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    /// The empty set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set holding a single action
    #[must_use]
    pub fn single(action: Action) -> Self {
        let mut set = Self::empty();
        set.insert(action);
        set
    }

    /// Add an action
    pub fn insert(&mut self, action: Action) {
        self.0 |= 1 << action.index();
    }

    /// Whether `action` is in the set
    #[must_use]
    pub fn contains(self, action: Action) -> bool {
        self.0 & (1 << action.index()) != 0
    }

    /// Number of actions in the set
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// First action in enumeration order
    #[must_use]
    pub fn first(self) -> Option<Action> {
        self.iter().next()
    }

    /// Actions in enumeration order
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = Self::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl Serialize for ActionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let actions = Vec::<Action>::deserialize(deserializer)?;
        Ok(actions.into_iter().collect())
    }
}
