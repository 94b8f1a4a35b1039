//! Episode generation

use rand::Rng;

use gridworld_core::{ActionDistribution, Environment, Episode, Position};

/// Roll out one episode from `start` until a terminal cell or `max_steps`
///
/// After every step the environment gets a chance to change its layout.
/// An episode that starts on a terminal cell is empty.
pub fn generate_episode<E, R, P>(
    env: &mut E,
    start: Position,
    mut policy: P,
    max_steps: usize,
    rng: &mut R,
) -> Episode
where
    E: Environment,
    R: Rng + ?Sized,
    P: FnMut(Position) -> ActionDistribution,
{
    let mut episode = Episode::new();
    let mut state = start;

    while !env.is_terminal(state) {
        if episode.len() >= max_steps {
            episode.truncated = true;
            break;
        }
        let action = policy(state).sample(rng);
        let transition = env.step(state, action, rng);
        episode.push(state, action, transition.reward);
        if env.perturb(rng) {
            episode.layout_changes += 1;
        }
        state = transition.next;
    }

    episode
}
