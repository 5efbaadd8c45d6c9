//! Whole-session export and all-or-nothing import.
//!
//! An export carries the durable log plus a few summary fields. Only the
//! events matter on the way back in: state is always rederived from them, and
//! the `players` array is checked for shape but otherwise ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::event::{EventKind, GameEvent};
use crate::model::{Player, SessionId, Settings, StatusKind, Team};
use crate::state::SessionState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub id: SessionId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub settings: Settings,
    pub players: Vec<Player>,
    pub events: Vec<GameEvent>,
}

/// Packages a session for export. `events` must be the durable log, which
/// unlike `state.events` still holds kinds this build does not understand.
pub fn export(id: &SessionId, state: &SessionState, events: Vec<GameEvent>) -> ExportPayload {
    ExportPayload {
        id: id.clone(),
        name: state.name.clone(),
        created_at: state.created_at,
        updated_at: state.updated_at,
        settings: state.settings.clone(),
        players: state.players.clone(),
        events,
    }
}

/// One problem found in an import payload, located by a JSON path such as
/// `$.players[3].id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Import rejected with {} problem(s){}", violations.len(), violations.first().map(|v| format!(", first {v}")).unwrap_or_default())]
pub struct ImportError {
    pub violations: Vec<Violation>,
}

/// Allowed wire values of the enumerated settings.
const SETTING_CHOICES: [(&str, &[&str]); 6] = [
    ("revealOnDeath", &["none", "team", "role"]),
    ("martyrMode", &["sacrifice", "night"]),
    ("bodyguardRepeatProtect", &["allow", "disallow"]),
    ("seerDetectMode", &["team", "role"]),
    ("wolfCubRevengeMode", &["doubleHunt", "sacrifice"]),
    ("vampireKillTiming", &["dayAfterVote", "immediate"]),
];

#[derive(Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    fn string(&mut self, object: &Map<String, Value>, path: &str, key: &str) {
        if !object.get(key).is_some_and(Value::is_string) {
            self.push(format!("{path}.{key}"), "must be a string");
        }
    }

    fn non_empty_string(&mut self, object: &Map<String, Value>, path: &str, key: &str) {
        match object.get(key).and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => {}
            _ => self.push(format!("{path}.{key}"), "must be a non-empty string"),
        }
    }

    fn integer(&mut self, object: &Map<String, Value>, path: &str, key: &str) {
        if object.get(key).and_then(Value::as_i64).is_none() {
            self.push(format!("{path}.{key}"), "must be an integer");
        }
    }

    fn boolean(&mut self, object: &Map<String, Value>, path: &str, key: &str) {
        if !object.get(key).is_some_and(Value::is_boolean) {
            self.push(format!("{path}.{key}"), "must be a boolean");
        }
    }

    /// Present, and either `null` or accepted by `check`.
    fn nullable(
        &mut self,
        object: &Map<String, Value>,
        path: &str,
        key: &str,
        message: &str,
        check: impl Fn(&Value) -> bool,
    ) {
        match object.get(key) {
            Some(Value::Null) => {}
            Some(value) if check(value) => {}
            _ => self.push(format!("{path}.{key}"), message),
        }
    }
}

/// Checks an import payload. On success returns the session id and the events
/// to store, in order; otherwise every problem found.
pub fn validate(payload: &Value) -> Result<(SessionId, Vec<GameEvent>), ImportError> {
    let mut violations = Violations::default();
    let Some(root) = payload.as_object() else {
        violations.push("$", "must be a JSON object");
        return Err(ImportError {
            violations: violations.0,
        });
    };

    let id = match root.get("id").and_then(Value::as_str) {
        Some(raw) => SessionId::try_new(raw).ok(),
        None => None,
    };
    if id.is_none() {
        violations.push("$.id", "must be a non-empty string of at most 128 characters");
    }
    violations.string(root, "$", "name");
    violations.integer(root, "$", "createdAt");
    violations.integer(root, "$", "updatedAt");

    check_settings(root.get("settings"), &mut violations);
    check_players(root.get("players"), &mut violations);
    let events = check_events(root.get("events"), id.as_ref(), &mut violations);

    match id {
        Some(id) if violations.0.is_empty() => Ok((id, events)),
        _ => Err(ImportError {
            violations: violations.0,
        }),
    }
}

fn check_settings(settings: Option<&Value>, violations: &mut Violations) {
    let Some(settings) = settings.and_then(Value::as_object) else {
        violations.push("$.settings", "must be an object");
        return;
    };
    for field in Settings::FIELDS {
        let path = format!("$.settings.{field}");
        let Some(value) = settings.get(field) else {
            violations.push(path, "is missing");
            continue;
        };
        match SETTING_CHOICES.iter().find(|(name, _)| *name == field) {
            Some((_, choices)) => {
                if !value.as_str().is_some_and(|raw| choices.contains(&raw)) {
                    violations.push(path, format!("must be one of {}", choices.join(", ")));
                }
            }
            None => {
                if !value.is_boolean() {
                    violations.push(path, "must be a boolean");
                }
            }
        }
    }
    for key in settings.keys() {
        if !Settings::FIELDS.contains(&key.as_str()) {
            violations.push(format!("$.settings.{key}"), "is not a known setting");
        }
    }
}

fn check_players(players: Option<&Value>, violations: &mut Violations) {
    let Some(players) = players.and_then(Value::as_array) else {
        violations.push("$.players", "must be an array");
        return;
    };
    for (index, player) in players.iter().enumerate() {
        let path = format!("$.players[{index}]");
        let Some(player) = player.as_object() else {
            violations.push(path, "must be an object");
            continue;
        };
        violations.non_empty_string(player, &path, "id");
        violations.string(player, &path, "name");
        violations.boolean(player, &path, "alive");
        violations.string(player, &path, "notes");
        violations.nullable(player, &path, "seatIndex", "must be null or a seat number", |value| {
            value.as_u64().is_some_and(|seat| u32::try_from(seat).is_ok())
        });
        violations.nullable(player, &path, "roleId", "must be null or a non-empty string", |value| {
            value.as_str().is_some_and(|raw| !raw.trim().is_empty())
        });
        violations.nullable(player, &path, "team", "must be null or a known team", |value| {
            serde_json::from_value::<Team>(value.clone()).is_ok()
        });
        check_statuses(player.get("statuses"), &path, violations);
    }
}

fn check_statuses(statuses: Option<&Value>, player_path: &str, violations: &mut Violations) {
    let Some(statuses) = statuses.and_then(Value::as_array) else {
        violations.push(format!("{player_path}.statuses"), "must be an array");
        return;
    };
    for (index, status) in statuses.iter().enumerate() {
        let path = format!("{player_path}.statuses[{index}]");
        let Some(status) = status.as_object() else {
            violations.push(path, "must be an object");
            continue;
        };
        let known = status
            .get("type")
            .is_some_and(|kind| serde_json::from_value::<StatusKind>(kind.clone()).is_ok());
        if !known {
            violations.push(format!("{path}.type"), "must be a known status type");
        }
        match status.get("meta") {
            None => {}
            Some(Value::Object(meta)) => {
                for (key, value) in meta {
                    if value.is_array() || value.is_object() {
                        violations.push(
                            format!("{path}.meta.{key}"),
                            "must be a string, number, boolean or null",
                        );
                    }
                }
            }
            Some(_) => violations.push(format!("{path}.meta"), "must be an object"),
        }
    }
}

fn check_events(
    events: Option<&Value>,
    id: Option<&SessionId>,
    violations: &mut Violations,
) -> Vec<GameEvent> {
    let Some(raw_events) = events.and_then(Value::as_array) else {
        violations.push("$.events", "must be an array");
        return Vec::new();
    };
    if raw_events.is_empty() {
        violations.push("$.events", "must contain at least the session_created event");
        return Vec::new();
    }

    let mut events = Vec::with_capacity(raw_events.len());
    for (index, raw) in raw_events.iter().enumerate() {
        let path = format!("$.events[{index}]");
        let Some(object) = raw.as_object() else {
            violations.push(path, "must be an object");
            continue;
        };
        let before = violations.0.len();
        violations.non_empty_string(object, &path, "kind");
        violations.integer(object, &path, "timestamp");
        if violations.0.len() > before {
            continue;
        }
        match GameEvent::try_from(raw.clone()) {
            Ok(event) => events.push(event),
            Err(error) => violations.push(path, error.to_string()),
        }
    }

    match raw_events[0].get("kind").and_then(Value::as_str) {
        Some("session_created") => {
            if let Some(EventKind::SessionCreated { session_id, .. }) =
                events.first().map(|event| &event.kind)
            {
                if id.is_some_and(|id| id != session_id) {
                    violations.push("$.events[0].sessionId", "must match $.id");
                }
            }
        }
        _ => violations.push("$.events[0].kind", "must be session_created"),
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::rebuild;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "id": "s1",
            "name": "Friday",
            "createdAt": 1,
            "updatedAt": 2,
            "settings": serde_json::to_value(Settings::default()).unwrap(),
            "players": [{
                "id": "p1", "name": "Ann", "seatIndex": 0, "roleId": "seer", "team": "villagers",
                "alive": true, "statuses": [{ "type": "protected", "meta": { "night": 1 } }], "notes": ""
            }],
            "events": [
                {
                    "kind": "session_created", "timestamp": 1, "sessionId": "s1", "name": "Friday",
                    "settings": serde_json::to_value(Settings::default()).unwrap()
                },
                { "kind": "moon_phase_set", "timestamp": 2, "moon": "full" }
            ]
        })
    }

    fn paths(payload: &Value) -> Vec<String> {
        validate(payload)
            .unwrap_err()
            .violations
            .into_iter()
            .map(|violation| violation.path)
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        let (id, events) = validate(&valid()).unwrap();
        assert_eq!(id.to_string(), "s1");
        assert_eq!(events.len(), 2);
        assert!(events[1].is_unrecognized());
    }

    #[test]
    fn setting_choices_match_the_wire_enums() {
        for (field, choices) in SETTING_CHOICES {
            for choice in choices {
                let mut settings = serde_json::to_value(Settings::default()).unwrap();
                settings[field] = json!(choice);
                assert!(
                    serde_json::from_value::<Settings>(settings).is_ok(),
                    "{field} = {choice}"
                );
            }
        }
    }

    #[test]
    fn every_problem_is_reported() {
        let mut payload = valid();
        payload["id"] = json!("");
        payload["settings"]["revealOnDeath"] = json!("everything");
        payload["settings"]["extra"] = json!(true);
        payload["players"][0]["alive"] = json!("yes");
        payload["players"][0]["statuses"][0]["type"] = json!("haunted");
        payload["events"][1]["timestamp"] = json!("late");

        assert_eq!(
            paths(&payload),
            [
                "$.id",
                "$.settings.revealOnDeath",
                "$.settings.extra",
                "$.players[0].alive",
                "$.players[0].statuses[0].type",
                "$.events[1].timestamp",
            ]
        );
    }

    #[test]
    fn the_log_must_open_with_this_session() {
        let mut payload = valid();
        payload["events"][0]["sessionId"] = json!("other");
        assert_eq!(paths(&payload), ["$.events[0].sessionId"]);

        let mut payload = valid();
        payload["events"] = json!([{ "kind": "day_votes_reset", "timestamp": 1 }]);
        assert_eq!(paths(&payload), ["$.events[0].kind"]);

        let mut payload = valid();
        payload["events"] = json!([]);
        assert_eq!(paths(&payload), ["$.events"]);
    }

    #[test]
    fn malformed_known_events_are_rejected() {
        let mut payload = valid();
        payload["events"][1] = json!({ "kind": "player_removed", "timestamp": 3 });
        assert_eq!(paths(&payload), ["$.events[1]"]);
    }

    #[test]
    fn export_carries_the_durable_log() {
        let (id, events) = validate(&valid()).unwrap();
        let state = rebuild(events.clone());
        let payload = export(&id, &state, events.clone());
        assert_eq!(payload.name, "Friday");
        assert_eq!(payload.events, events);

        let value = serde_json::to_value(&payload).unwrap();
        let (_, again) = validate(&value).unwrap();
        assert_eq!(again, events);
    }

    #[test]
    fn message_summarises_the_first_problem() {
        let error = validate(&json!([])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Import rejected with 1 problem(s), first $: must be a JSON object"
        );
    }
}
