//! Turning the night's submissions into outcomes.
//!
//! Only the latest action per role counts. Steps run in a fixed order because
//! the lethal step reads the protection handed out before it.

use std::collections::BTreeSet;

use crate::clock::Timestamp;
use crate::event::{EliminationCause, EventKind, GameEvent};
use crate::model::{MetaValue, NightAction, Player, PlayerId, Status, StatusKind};
use crate::roles::ids;
use crate::state::SessionState;

pub const HEAL_WOLF_VICTIM: &str = "healWolfVictim";
pub const TARGET_ID: &str = "targetId";
pub const TARGETS: &str = "targets";
pub const POISON_TARGET: &str = "poisonTarget";
pub const KILL_TARGET: &str = "killTarget";
pub const MODE: &str = "mode";

/// Resolves the current night. Returns the events to commit, always ending
/// with `night_actions_reset`; commits nothing itself.
pub fn resolve_night(state: &SessionState, now: Timestamp) -> Vec<GameEvent> {
    let night = state.night_number;
    let latest = |role: &str| state.latest_action(role);
    let target = |role: &str, key: &str| latest(role).and_then(|action| action.target(key));

    let mut events = Vec::new();

    let heal_requested = [ids::WITCH, ids::WIZARD]
        .into_iter()
        .filter_map(latest)
        .any(|action| action.flag(HEAL_WOLF_VICTIM));

    let mut protected: BTreeSet<PlayerId> = state
        .players
        .iter()
        .filter(|player| shielded_tonight(player, night))
        .map(|player| player.id.clone())
        .collect();

    if let Some(guarded) = target(ids::BODYGUARD, TARGET_ID) {
        let status = Status::new(StatusKind::Protected).with_meta("night", night);
        events.push(GameEvent::status_added(now, guarded.clone(), status));
        protected.insert(guarded);
    }

    if let Some((first, second)) = latest(ids::AMUR).and_then(lovers) {
        events.push(GameEvent::status_added(
            now,
            first.clone(),
            Status::new(StatusKind::Lovers)
                .with_meta("linkedId", MetaValue::Text(second.to_string())),
        ));
        events.push(GameEvent::status_added(
            now,
            second,
            Status::new(StatusKind::Lovers)
                .with_meta("linkedId", MetaValue::Text(first.to_string())),
        ));
    }

    if state.settings.enable_sect {
        if let Some(recruit) = target(ids::CULT_LEADER, TARGET_ID) {
            events.push(GameEvent::status_added(
                now,
                recruit,
                Status::new(StatusKind::SectMember),
            ));
        }
    }

    if let Some(priest) = latest(ids::PRIEST) {
        if let Some(blessed) = priest.target(TARGET_ID) {
            match priest.text(MODE) {
                Some("bless") => events.push(GameEvent::status_added(
                    now,
                    blessed,
                    Status::new(StatusKind::Blessed),
                )),
                Some("cleanse") => events.push(GameEvent::status_removed(
                    now,
                    blessed,
                    StatusKind::Cursed,
                )),
                _ => {}
            }
        }
    }

    if let Some(victim) = target(ids::WEREWOLF, TARGET_ID) {
        if !protected.contains(&victim) && !heal_requested {
            events.push(GameEvent::eliminated(now, victim, EliminationCause::Night));
        }
    }
    if let Some(victim) = target(ids::WITCH, POISON_TARGET) {
        if !protected.contains(&victim) {
            events.push(GameEvent::eliminated(now, victim, EliminationCause::Poison));
        }
    }
    if let Some(victim) = target(ids::WIZARD, KILL_TARGET) {
        if !protected.contains(&victim) {
            events.push(GameEvent::eliminated(now, victim, EliminationCause::Magic));
        }
    }

    if state.settings.enable_vampires {
        if let Some(bitten) = target(ids::VAMPIRE, TARGET_ID) {
            let status = Status::new(StatusKind::DelayedDeath)
                .with_meta("source", ids::VAMPIRE)
                .with_meta("night", night);
            events.push(GameEvent::status_added(now, bitten, status));
        }
    }

    if let Some(copied) = target(ids::DOPPELGANGER, TARGET_ID) {
        let status = Status::new(StatusKind::Marked).with_meta("by", ids::DOPPELGANGER);
        events.push(GameEvent::status_added(now, copied, status));
    }

    events.push(GameEvent::new(now, EventKind::NightActionsReset));
    events
}

/// A `protected` status counts for the night it was granted; one without a
/// night (set by hand) always counts.
fn shielded_tonight(player: &Player, night: u32) -> bool {
    player
        .statuses
        .iter()
        .filter(|status| status.kind == StatusKind::Protected)
        .any(|status| match status.meta.get("night") {
            Some(MetaValue::Number(granted)) => *granted == i64::from(night),
            _ => true,
        })
}

/// Exactly two distinct players, in submission order.
fn lovers(action: &NightAction) -> Option<(PlayerId, PlayerId)> {
    match action.targets(TARGETS).as_slice() {
        [first, second] if first != second => Some((first.clone(), second.clone())),
        _ => None,
    }
}
