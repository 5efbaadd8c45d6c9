//! Deriving session state from an event log.
//!
//! All three functions are plain folds of [`SessionState::fold`]; they read no
//! clock and touch no storage, so the same events always give the same state.

use crate::event::GameEvent;
use crate::state::SessionState;

/// Full replay from [`SessionState::empty`].
pub fn rebuild<I>(events: I) -> SessionState
where
    I: IntoIterator<Item = GameEvent>,
{
    replay_onto(SessionState::empty(), events)
}

/// State as it was right after the first `count` events were applied.
pub fn rebuild_prefix(events: &[GameEvent], count: usize) -> SessionState {
    rebuild(events.iter().take(count).cloned())
}

/// Applies `tail` on top of an already derived state, e.g. a snapshot.
pub fn replay_onto<I>(state: SessionState, tail: I) -> SessionState
where
    I: IntoIterator<Item = GameEvent>,
{
    tail.into_iter().fold(state, SessionState::fold)
}
