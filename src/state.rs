//! The derived session aggregate and the reducer that builds it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::command::AggregateState;
use crate::event::{EventKind, GameEvent};
use crate::model::{
    LogEntry, NightAction, Phase, Player, PlayerId, SessionId, Settings, Stage, Vote,
};

/// Everything the moderator sees about a session, derived from its events.
///
/// Never mutate this directly: build it with [`crate::replay::rebuild`] or by
/// applying events through [`AggregateState::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub id: Option<SessionId>,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub settings: Settings,
    pub phase: Phase,
    pub stage: Stage,
    pub day_number: u32,
    pub night_number: u32,
    pub players: Vec<Player>,
    /// Every action recorded since the last reset, oldest first.
    pub night_actions: Vec<NightAction>,
    /// Most recent action per role id. Later submissions replace earlier ones.
    pub latest_actions: BTreeMap<String, NightAction>,
    pub votes: Vec<Vote>,
    pub log: Vec<LogEntry>,
    pub events: Vec<GameEvent>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::empty()
    }
}

impl SessionState {
    /// The canonical starting point of every fold: no identity, default
    /// settings, zero counters and a zero clock.
    pub fn empty() -> Self {
        Self {
            id: None,
            name: String::new(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
            settings: Settings::default(),
            phase: Phase::Setup,
            stage: Stage::Players,
            day_number: 0,
            night_number: 0,
            players: Vec::new(),
            night_actions: Vec::new(),
            latest_actions: BTreeMap::new(),
            votes: Vec::new(),
            log: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| &player.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.alive)
    }

    /// Roster in seating order; unseated players come last in insertion order.
    pub fn players_by_seat(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.iter().collect();
        players.sort_by_key(|player| player.seat_index.unwrap_or(u32::MAX));
        players
    }

    /// The authoritative submission for `role` this night, if any.
    pub fn latest_action(&self, role: &str) -> Option<&NightAction> {
        self.latest_actions.get(role)
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Consuming form of [`AggregateState::apply`]; replay uses it to avoid a
    /// clone per event.
    pub fn fold(mut self, event: GameEvent) -> Self {
        if event.is_unrecognized() {
            // Forward compatibility: a kind from a newer build changes nothing.
            return self;
        }

        self.updated_at = event.timestamp;
        let timestamp = event.timestamp;
        let kind = event.kind.clone();
        self.events.push(event);

        match kind {
            EventKind::SessionCreated {
                session_id,
                name,
                settings,
            } => {
                self.id = Some(session_id);
                self.name = name;
                self.created_at = timestamp;
                self.settings = settings;
                self.phase = Phase::Setup;
                self.stage = Stage::Players;
                self.day_number = 1;
                self.night_number = 1;
            }
            EventKind::SettingsUpdated { settings } => self.settings = settings,
            EventKind::StageSet { stage } => self.stage = stage,
            EventKind::PhaseSet { phase } => self.phase = phase,
            EventKind::DayNightSet {
                day_number,
                night_number,
            } => {
                self.day_number = day_number;
                self.night_number = night_number;
            }
            EventKind::PlayerAdded { player } => self.players.push(player),
            EventKind::PlayerUpdated { player_id, patch } => {
                if let Some(player) = self.player_mut(&player_id) {
                    patch.apply_to(player);
                }
            }
            EventKind::PlayerRemoved { player_id } => {
                self.players.retain(|player| player.id != player_id)
            }
            EventKind::SeatsAssigned { seats } => {
                for player in &mut self.players {
                    if let Some(seat) = seats.iter().find(|seat| seat.player_id == player.id) {
                        player.seat_index = Some(seat.seat_index);
                    }
                }
            }
            EventKind::RolesAssigned { assignments } => {
                for player in &mut self.players {
                    if let Some(assignment) = assignments
                        .iter()
                        .find(|assignment| assignment.player_id == player.id)
                    {
                        player.role_id = Some(assignment.role_id.clone());
                        player.team = Some(assignment.team);
                    }
                }
            }
            EventKind::NightActionRecorded { action } => {
                self.latest_actions
                    .insert(action.role_id.to_string(), action.clone());
                self.night_actions.push(action);
            }
            EventKind::NightActionsReset => {
                self.night_actions.clear();
                self.latest_actions.clear();
            }
            EventKind::DayVoteRecorded { vote } => self.votes.push(vote),
            EventKind::DayVotesReset => self.votes.clear(),
            EventKind::LogEntryAdded { entry } => self.log.push(entry),
            EventKind::PlayerStatusAdded { player_id, status } => {
                if let Some(player) = self.player_mut(&player_id) {
                    player.statuses.push(status);
                }
            }
            EventKind::PlayerStatusRemoved {
                player_id,
                status_type,
            } => {
                if let Some(player) = self.player_mut(&player_id) {
                    player.statuses.retain(|status| status.kind != status_type);
                }
            }
            EventKind::PlayerEliminated { player_id, .. } => {
                if let Some(player) = self.player_mut(&player_id) {
                    player.alive = false;
                }
            }
            EventKind::EventsTruncated { keep_until } => self.truncate(keep_until),
            EventKind::Unrecognized { .. } => {}
        }

        self
    }

    fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| &player.id == id)
    }

    /// Keeps events `0..=keep_until`. The night-action buffer is rebuilt from the
    /// retained events, so it holds exactly what those events recorded since
    /// their last reset.
    fn truncate(&mut self, keep_until: usize) {
        self.events.truncate(keep_until.saturating_add(1));

        self.night_actions.clear();
        self.latest_actions.clear();
        for event in &self.events {
            match &event.kind {
                EventKind::NightActionRecorded { action } => {
                    self.latest_actions
                        .insert(action.role_id.to_string(), action.clone());
                    self.night_actions.push(action.clone());
                }
                EventKind::NightActionsReset => {
                    self.night_actions.clear();
                    self.latest_actions.clear();
                }
                _ => {}
            }
        }
    }
}

impl AggregateState<GameEvent> for SessionState {
    fn apply(&self, event: GameEvent) -> Self {
        self.clone().fold(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SeatAssignment;
    use crate::model::{PayloadValue, PlayerPatch, RoleId, Status, StatusKind};
    use serde_json::Map;

    fn at(millis: i64, kind: EventKind) -> GameEvent {
        GameEvent::new(Timestamp::from_millis(millis), kind)
    }

    fn pid(raw: &str) -> PlayerId {
        PlayerId::try_new(raw).unwrap()
    }

    fn created() -> SessionState {
        SessionState::empty().fold(at(
            10,
            EventKind::SessionCreated {
                session_id: SessionId::try_new("s1").unwrap(),
                name: "Friday".into(),
                settings: Settings::default(),
            },
        ))
    }

    fn with_players(ids: &[&str]) -> SessionState {
        ids.iter().enumerate().fold(created(), |state, (n, id)| {
            state.fold(at(
                11 + n as i64,
                EventKind::PlayerAdded {
                    player: Player::new(pid(id), id.to_uppercase()),
                },
            ))
        })
    }

    fn action(role: &str, actor: &str, target: &str) -> GameEvent {
        at(
            50,
            EventKind::NightActionRecorded {
                action: NightAction::new(RoleId::try_new(role).unwrap(), pid(actor))
                    .with("targetId", PayloadValue::Text(target.into())),
            },
        )
    }

    #[test]
    fn creation_sets_identity_and_counters() {
        let state = created();
        assert_eq!(state.id.as_ref().map(|id| id.to_string()), Some("s1".into()));
        assert_eq!(state.created_at, Timestamp::from_millis(10));
        assert_eq!(state.updated_at, Timestamp::from_millis(10));
        assert_eq!((state.day_number, state.night_number), (1, 1));
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(state.stage, Stage::Players);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn empty_patch_changes_only_the_bookkeeping() {
        let before = with_players(&["p1"]);
        let after = before.apply(at(
            99,
            EventKind::PlayerUpdated {
                player_id: pid("p1"),
                patch: PlayerPatch::default(),
            },
        ));
        assert_eq!(after.players, before.players);
        assert_eq!(after.updated_at, Timestamp::from_millis(99));
        assert_eq!(after.events.len(), before.events.len() + 1);
    }

    #[test]
    fn unknown_players_are_ignored() {
        let before = with_players(&["p1"]);
        let after = before
            .apply(at(20, EventKind::PlayerEliminated {
                player_id: pid("ghost"),
                reason: crate::event::EliminationCause::Night,
            }))
            .apply(at(21, EventKind::PlayerRemoved { player_id: pid("ghost") }))
            .apply(at(22, EventKind::PlayerUpdated {
                player_id: pid("ghost"),
                patch: PlayerPatch {
                    name: Some("Casper".into()),
                    seat_index: Some(Some(3)),
                    ..PlayerPatch::default()
                },
            }))
            .apply(GameEvent::status_added(
                Timestamp::from_millis(23),
                pid("ghost"),
                Status::new(StatusKind::Protected),
            ))
            .apply(at(24, EventKind::PlayerStatusRemoved {
                player_id: pid("ghost"),
                status_type: StatusKind::Protected,
            }));
        assert_eq!(after.players, before.players);
        assert_eq!(after.events.len(), before.events.len() + 5);
    }

    #[test]
    fn elimination_is_idempotent() {
        let eliminated = |state: SessionState, millis| {
            state.fold(GameEvent::eliminated(
                Timestamp::from_millis(millis),
                pid("p1"),
                crate::event::EliminationCause::Day,
            ))
        };
        let once = eliminated(with_players(&["p1"]), 20);
        let twice = eliminated(once.clone(), 21);
        assert!(!once.players[0].alive);
        assert_eq!(once.players, twice.players);
    }

    #[test]
    fn later_submissions_replace_earlier_ones() {
        let state = with_players(&["w", "a", "b"])
            .fold(action("werewolf", "w", "a"))
            .fold(action("werewolf", "w", "b"));
        assert_eq!(state.night_actions.len(), 2);
        assert_eq!(state.latest_action("werewolf").unwrap().target("targetId"), Some(pid("b")));

        let reset = state.fold(at(60, EventKind::NightActionsReset));
        assert!(reset.night_actions.is_empty());
        assert!(reset.latest_action("werewolf").is_none());
    }

    #[test]
    fn truncation_recomputes_the_night_buffer() {
        let base = with_players(&["w", "a", "b"]);
        // events: created, 3 players, action (4), reset (5), action (6)
        let state = base
            .fold(action("werewolf", "w", "a"))
            .fold(at(60, EventKind::NightActionsReset))
            .fold(action("werewolf", "w", "b"));

        let kept_first = state.clone().fold(at(70, EventKind::EventsTruncated { keep_until: 4 }));
        assert_eq!(kept_first.events.len(), 5);
        assert_eq!(kept_first.night_actions.len(), 1);
        assert_eq!(
            kept_first.latest_action("werewolf").unwrap().target("targetId"),
            Some(pid("a"))
        );

        let kept_reset = state.fold(at(70, EventKind::EventsTruncated { keep_until: 5 }));
        assert!(kept_reset.night_actions.is_empty());
        assert!(kept_reset.latest_actions.is_empty());
    }

    #[test]
    fn seats_sort_the_roster_and_unseated_players_trail() {
        let state = with_players(&["a", "b", "c"]).fold(at(
            30,
            EventKind::SeatsAssigned {
                seats: vec![
                    SeatAssignment {
                        player_id: pid("c"),
                        seat_index: 0,
                    },
                    SeatAssignment {
                        player_id: pid("a"),
                        seat_index: 1,
                    },
                    SeatAssignment {
                        player_id: pid("ghost"),
                        seat_index: 2,
                    },
                ],
            },
        ));
        let order: Vec<_> = state
            .players_by_seat()
            .iter()
            .map(|player| player.id.to_string())
            .collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn unrecognized_events_leave_state_untouched() {
        let before = with_players(&["p1"]);
        let mut fields = Map::new();
        fields.insert("moon".into(), "full".into());
        let after = before.apply(at(
            99,
            EventKind::Unrecognized {
                kind: "moon_phase_set".into(),
                fields,
            },
        ));
        assert_eq!(after, before);
    }

    #[test]
    fn state_survives_a_json_round_trip() {
        let state = with_players(&["p1", "p2"]).fold(action("seer", "p1", "p2"));
        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
