//! The day vote and the vampire bites that come due after it.

use crate::clock::Timestamp;
use crate::event::{EliminationCause, GameEvent};
use crate::model::{PlayerId, StatusKind, VampireKillTiming, Vote};
use crate::state::SessionState;

/// Weighted totals per target, in the order each target first received a vote.
/// Totals are widened so that imported weights cannot overflow them.
pub fn tally(votes: &[Vote]) -> Vec<(PlayerId, u64)> {
    let mut totals: Vec<(PlayerId, u64)> = Vec::new();
    for vote in votes {
        let weight = u64::from(vote.weight);
        match totals.iter_mut().find(|(target, _)| *target == vote.target_id) {
            Some((_, total)) => *total = total.saturating_add(weight),
            None => totals.push((vote.target_id.clone(), weight)),
        }
    }
    totals
}

/// The target with the strictly highest total. On a tie the target that was
/// voted for first keeps the lead; zero-weight tallies elect nobody.
pub fn vote_leader(votes: &[Vote]) -> Option<PlayerId> {
    tally(votes)
        .into_iter()
        .fold(None, |leader: Option<(PlayerId, u64)>, (target, total)| {
            match leader {
                Some((_, best)) if total <= best => leader,
                _ if total == 0 => leader,
                _ => Some((target, total)),
            }
        })
        .map(|(target, _)| target)
}

/// Events closing the day: the vote's execution, then, when vampires bite on
/// the day after, every living player carrying `delayedDeath` dies and loses
/// the marker.
pub fn resolve_day(state: &SessionState, now: Timestamp) -> Vec<GameEvent> {
    let mut events = Vec::new();

    if let Some(condemned) = vote_leader(&state.votes) {
        events.push(GameEvent::eliminated(now, condemned, EliminationCause::Day));
    }

    let bites_due = state.settings.enable_vampires
        && state.settings.vampire_kill_timing == VampireKillTiming::DayAfterVote;
    if bites_due {
        for bitten in state
            .alive_players()
            .filter(|player| player.has_status(StatusKind::DelayedDeath))
        {
            events.push(GameEvent::eliminated(
                now,
                bitten.id.clone(),
                EliminationCause::Vampire,
            ));
            events.push(GameEvent::status_removed(
                now,
                bitten.id.clone(),
                StatusKind::DelayedDeath,
            ));
        }
    }

    events
}
