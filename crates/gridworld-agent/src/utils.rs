//! Argmax helpers shared by the solvers

use rand::{seq::IteratorRandom, Rng};

use gridworld_core::{Action, ActionSet, Position, ValueGrid};

/// Every action whose value equals the maximum, in enumeration order
///
/// Equality is exact, so near-ties from floating-point noise are not merged.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn argmax_all(values: &[f64; Action::COUNT]) -> ActionSet {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Action::ALL
        .into_iter()
        .filter(|a| values[a.index()] == max)
        .collect()
}

/// First maximiser in enumeration order
#[must_use]
pub fn argmax_first(values: &[f64; Action::COUNT]) -> Action {
    argmax_all(values).first().unwrap_or(Action::Up)
}

/// Maximiser chosen uniformly at random among the tied actions
pub fn argmax_random_tie<R: Rng + ?Sized>(values: &[f64; Action::COUNT], rng: &mut R) -> Action {
    argmax_all(values)
        .iter()
        .choose(rng)
        .unwrap_or(Action::Up)
}

/// Positions sharing the maximum value
#[must_use]
#[allow(clippy::float_cmp)]
pub fn highest_value_states(values: &ValueGrid) -> (Vec<Position>, f64) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let best = values
        .indexed_iter()
        .filter(|(_, v)| **v == max)
        .map(|((row, col), _)| Position::new(row, col))
        .collect();
    (best, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_argmax_all_keeps_ties_in_order() {
        let ties = argmax_all(&[1.0, 3.0, 0.0, 3.0]);
        assert_eq!(ties.iter().collect::<Vec<_>>(), vec![Action::Down, Action::Right]);
        assert_eq!(argmax_first(&[1.0, 3.0, 0.0, 3.0]), Action::Down);
    }

    #[test]
    fn test_argmax_random_tie_covers_all_maximisers() {
        let mut rng = StdRng::seed_from_u64(5);
        let values = [2.0, 2.0, -1.0, 2.0];
        let mut seen = ActionSet::empty();
        for _ in 0..200 {
            let a = argmax_random_tie(&values, &mut rng);
            assert_ne!(a, Action::Left);
            seen.insert(a);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_highest_value_states() {
        let values = ndarray::array![[1.0, 4.0], [4.0, 0.0]];
        let (best, max) = highest_value_states(&values);
        assert_eq!(best, vec![Position::new(0, 1), Position::new(1, 0)]);
        assert!((max - 4.0).abs() < f64::EPSILON);
    }
}
