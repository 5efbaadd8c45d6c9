//! Value types that make up a session: players, their statuses, night actions,
//! votes and log entries.
//!
//! Everything here is plain data. Behaviour lives in the reducer
//! ([`crate::SessionState`]) and the resolvers.

mod ids;
mod player;
mod settings;

pub use ids::{PlayerId, RoleId, SessionId};
pub use player::{Player, PlayerPatch, Status, StatusKind, StatusMeta, MetaValue};
pub use settings::{
    DetectMode, MartyrMode, RepeatProtect, RevealMode, Settings, VampireKillTiming,
    WolfCubRevenge,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// A grouping of players sharing a win condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Team {
    Villagers,
    Werewolves,
    Vampires,
    Sect,
    Neutral,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Team::Villagers => "villagers",
            Team::Werewolves => "werewolves",
            Team::Vampires => "vampires",
            Team::Sect => "sect",
            Team::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

/// Coarse game phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Setup,
    Night,
    Day,
    Ended,
}

/// Finer-grained workflow stage the moderator is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Players,
    IntroNight,
    Day,
    Night,
    Ended,
}

/// One value inside a night action payload, shaped by the role's action schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Flag(bool),
    Number(i64),
    Text(String),
    List(Vec<String>),
}

/// A role's submission for the current night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightAction {
    pub role_id: RoleId,
    pub actor_id: PlayerId,
    #[serde(default)]
    pub payload: BTreeMap<String, PayloadValue>,
}

impl NightAction {
    pub fn new(role_id: RoleId, actor_id: PlayerId) -> Self {
        Self {
            role_id,
            actor_id,
            payload: BTreeMap::new(),
        }
    }

    /// Builder-style helper for filling in a payload field.
    pub fn with(mut self, key: impl Into<String>, value: PayloadValue) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// A single player reference stored under `key`. Blank or malformed ids read as absent.
    pub fn target(&self, key: &str) -> Option<PlayerId> {
        match self.payload.get(key)? {
            PayloadValue::Text(raw) => PlayerId::try_new(raw.as_str()).ok(),
            _ => None,
        }
    }

    /// Every player reference stored under `key`, in submission order.
    pub fn targets(&self, key: &str) -> Vec<PlayerId> {
        match self.payload.get(key) {
            Some(PayloadValue::List(raw)) => raw
                .iter()
                .filter_map(|id| PlayerId::try_new(id.as_str()).ok())
                .collect(),
            Some(PayloadValue::Text(raw)) => PlayerId::try_new(raw.as_str()).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.payload.get(key), Some(PayloadValue::Flag(true)))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.payload.get(key)? {
            PayloadValue::Text(raw) => Some(raw.as_str()),
            _ => None,
        }
    }
}

/// A day vote. `weight` is normally 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub weight: u32,
}

/// Human-readable moderator log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: Timestamp,
    pub phase: Phase,
    pub day_number: u32,
    pub night_number: u32,
    pub description: String,
}
