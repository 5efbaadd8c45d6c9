//! Game events: the single source of truth for a session.
//!
//! Every change to a session is recorded as an immutable [`GameEvent`]. State is
//! never stored on its own; it is always the fold of an event-sequence prefix
//! (see [`crate::replay`]).
//!
//! # Wire shape
//!
//! Each event travels as one flat JSON object:
//!
//! ```json
//! { "kind": "player_eliminated", "timestamp": 1718000000000, "playerId": "p3", "reason": "night" }
//! ```
//!
//! Kinds this version does not know about are kept as
//! [`EventKind::Unrecognized`] with all their fields, so an older build can load,
//! replay and re-export a log written by a newer one without losing anything.
//!
//! # Examples
//!
//! ```rust
//! use nocturne::{EventKind, GameEvent, Timestamp};
//!
//! let json = r#"{"kind":"day_votes_reset","timestamp":17}"#;
//! let event: GameEvent = serde_json::from_str(json).unwrap();
//! assert_eq!(event.kind, EventKind::DayVotesReset);
//!
//! let future: GameEvent =
//!     serde_json::from_str(r#"{"kind":"moon_phase_set","timestamp":18,"moon":"full"}"#).unwrap();
//! assert!(future.is_unrecognized());
//! assert_eq!(serde_json::to_value(&future).unwrap()["moon"], "full");
//! ```

mod cause;

pub use cause::EliminationCause;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::model::{
    LogEntry, NightAction, Phase, Player, PlayerId, PlayerPatch, RoleId, SessionId, Settings,
    Stage, Status, StatusKind, Team, Vote,
};

/// Represents a domain event in the event log.
///
/// The trait is implemented for types that are serializable, so they can be
/// persisted, and that can name their own kind for logging and storage.
///
/// # Examples
///
/// ```rust
/// use nocturne::{Event, EventKind, GameEvent, Timestamp};
///
/// let event = GameEvent::new(Timestamp::from_millis(5), EventKind::NightActionsReset);
/// assert_eq!(event.event_type(), "night_actions_reset");
/// ```
pub trait Event: Debug + for<'de> Deserialize<'de> + Serialize + Send + Sync + Sized {
    /// Returns the wire tag of the event.
    fn event_type(&self) -> String;
}

/// Problems turning raw JSON into a [`GameEvent`].
#[derive(Debug, Error)]
pub enum WireError {
    #[error("event must be a JSON object")]
    NotAnObject,
    #[error("event is missing a string `kind`")]
    MissingKind,
    #[error("event is missing an integer `timestamp`")]
    MissingTimestamp,
    #[error("malformed `{kind}` event: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub player_id: PlayerId,
    pub seat_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub player_id: PlayerId,
    pub role_id: RoleId,
    pub team: Team,
}

/// The kind-specific part of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    SessionCreated {
        session_id: SessionId,
        name: String,
        settings: Settings,
    },
    SettingsUpdated {
        settings: Settings,
    },
    StageSet {
        stage: Stage,
    },
    PhaseSet {
        phase: Phase,
    },
    DayNightSet {
        day_number: u32,
        night_number: u32,
    },
    PlayerAdded {
        player: Player,
    },
    PlayerUpdated {
        player_id: PlayerId,
        patch: PlayerPatch,
    },
    PlayerRemoved {
        player_id: PlayerId,
    },
    SeatsAssigned {
        seats: Vec<SeatAssignment>,
    },
    RolesAssigned {
        assignments: Vec<RoleAssignment>,
    },
    NightActionRecorded {
        action: NightAction,
    },
    NightActionsReset,
    DayVoteRecorded {
        vote: Vote,
    },
    DayVotesReset,
    LogEntryAdded {
        entry: LogEntry,
    },
    PlayerStatusAdded {
        player_id: PlayerId,
        status: Status,
    },
    PlayerStatusRemoved {
        player_id: PlayerId,
        status_type: StatusKind,
    },
    PlayerEliminated {
        player_id: PlayerId,
        reason: EliminationCause,
    },
    EventsTruncated {
        keep_until: usize,
    },
    /// A kind written by a newer build. Carried through untouched.
    #[serde(skip)]
    Unrecognized {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl EventKind {
    /// Every tag this build understands.
    pub const KNOWN: [&'static str; 19] = [
        "session_created",
        "settings_updated",
        "stage_set",
        "phase_set",
        "day_night_set",
        "player_added",
        "player_updated",
        "player_removed",
        "seats_assigned",
        "roles_assigned",
        "night_action_recorded",
        "night_actions_reset",
        "day_vote_recorded",
        "day_votes_reset",
        "log_entry_added",
        "player_status_added",
        "player_status_removed",
        "player_eliminated",
        "events_truncated",
    ];

    pub fn is_known(tag: &str) -> bool {
        Self::KNOWN.contains(&tag)
    }

    pub fn tag(&self) -> &str {
        match self {
            EventKind::SessionCreated { .. } => "session_created",
            EventKind::SettingsUpdated { .. } => "settings_updated",
            EventKind::StageSet { .. } => "stage_set",
            EventKind::PhaseSet { .. } => "phase_set",
            EventKind::DayNightSet { .. } => "day_night_set",
            EventKind::PlayerAdded { .. } => "player_added",
            EventKind::PlayerUpdated { .. } => "player_updated",
            EventKind::PlayerRemoved { .. } => "player_removed",
            EventKind::SeatsAssigned { .. } => "seats_assigned",
            EventKind::RolesAssigned { .. } => "roles_assigned",
            EventKind::NightActionRecorded { .. } => "night_action_recorded",
            EventKind::NightActionsReset => "night_actions_reset",
            EventKind::DayVoteRecorded { .. } => "day_vote_recorded",
            EventKind::DayVotesReset => "day_votes_reset",
            EventKind::LogEntryAdded { .. } => "log_entry_added",
            EventKind::PlayerStatusAdded { .. } => "player_status_added",
            EventKind::PlayerStatusRemoved { .. } => "player_status_removed",
            EventKind::PlayerEliminated { .. } => "player_eliminated",
            EventKind::EventsTruncated { .. } => "events_truncated",
            EventKind::Unrecognized { kind, .. } => kind,
        }
    }
}

/// One entry of the log: a logical timestamp plus the kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct GameEvent {
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

impl GameEvent {
    pub fn new(timestamp: Timestamp, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self.kind, EventKind::Unrecognized { .. })
    }

    pub fn status_added(timestamp: Timestamp, player_id: PlayerId, status: Status) -> Self {
        Self::new(timestamp, EventKind::PlayerStatusAdded { player_id, status })
    }

    pub fn status_removed(timestamp: Timestamp, player_id: PlayerId, status_type: StatusKind) -> Self {
        Self::new(
            timestamp,
            EventKind::PlayerStatusRemoved {
                player_id,
                status_type,
            },
        )
    }

    pub fn eliminated(timestamp: Timestamp, player_id: PlayerId, reason: EliminationCause) -> Self {
        Self::new(timestamp, EventKind::PlayerEliminated { player_id, reason })
    }
}

impl Event for GameEvent {
    fn event_type(&self) -> String {
        self.kind.tag().to_string()
    }
}

impl TryFrom<Value> for GameEvent {
    type Error = WireError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(WireError::NotAnObject);
        };
        let timestamp = fields
            .remove("timestamp")
            .and_then(|raw| raw.as_i64())
            .map(Timestamp::from_millis)
            .ok_or(WireError::MissingTimestamp)?;
        let tag = fields
            .get("kind")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(WireError::MissingKind)?;

        if !EventKind::is_known(&tag) {
            fields.remove("kind");
            return Ok(Self::new(
                timestamp,
                EventKind::Unrecognized { kind: tag, fields },
            ));
        }

        let kind = serde_json::from_value(Value::Object(fields))
            .map_err(|source| WireError::Payload { kind: tag, source })?;
        Ok(Self::new(timestamp, kind))
    }
}

impl From<GameEvent> for Value {
    fn from(event: GameEvent) -> Self {
        let mut object = match event.kind {
            EventKind::Unrecognized { kind, mut fields } => {
                fields.insert("kind".to_string(), Value::String(kind));
                fields
            }
            known => match serde_json::to_value(&known) {
                Ok(Value::Object(fields)) => fields,
                // Internally tagged variants always serialize to objects.
                _ => Map::new(),
            },
        };
        object.insert(
            "timestamp".to_string(),
            Value::from(event.timestamp.as_millis()),
        );
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pid(raw: &str) -> PlayerId {
        PlayerId::try_new(raw).unwrap()
    }

    #[test]
    fn known_events_use_flat_wire_shape() {
        let event = GameEvent::eliminated(
            Timestamp::from_millis(9),
            pid("p3"),
            EliminationCause::Poison,
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({ "kind": "player_eliminated", "timestamp": 9, "playerId": "p3", "reason": "poison" })
        );
        let back: GameEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unknown_kinds_are_preserved_verbatim() {
        let raw = json!({ "kind": "moon_phase_set", "timestamp": 3, "moon": { "full": true } });
        let event: GameEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.event_type(), "moon_phase_set");
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }

    #[test]
    fn envelope_must_carry_kind_and_timestamp() {
        let missing_time = serde_json::from_value::<GameEvent>(json!({ "kind": "day_votes_reset" }));
        assert!(missing_time.is_err());
        let missing_kind = serde_json::from_value::<GameEvent>(json!({ "timestamp": 1 }));
        assert!(missing_kind.is_err());
        let not_object = serde_json::from_value::<GameEvent>(json!([1, 2]));
        assert!(not_object.is_err());
    }

    #[test]
    fn malformed_known_payload_is_rejected() {
        let raw = json!({ "kind": "player_removed", "timestamp": 1 });
        let err = GameEvent::try_from(raw).unwrap_err();
        assert!(matches!(err, WireError::Payload { ref kind, .. } if kind == "player_removed"));
    }

    #[test]
    fn every_tag_is_listed_as_known() {
        let samples = [
            EventKind::NightActionsReset,
            EventKind::DayVotesReset,
            EventKind::StageSet { stage: Stage::Night },
            EventKind::PhaseSet { phase: Phase::Day },
            EventKind::EventsTruncated { keep_until: 2 },
            EventKind::PlayerRemoved { player_id: pid("p1") },
        ];
        for kind in samples {
            assert!(EventKind::is_known(kind.tag()), "{} not listed", kind.tag());
            let value = serde_json::to_value(&kind).unwrap();
            assert_eq!(value["kind"], kind.tag());
        }
    }

    #[test]
    fn field_names_are_camel_case() {
        let event = GameEvent::new(
            Timestamp::from_millis(1),
            EventKind::DayNightSet {
                day_number: 2,
                night_number: 3,
            },
        );
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["dayNumber"], 2);
        assert_eq!(value["nightNumber"], 3);
    }
}
