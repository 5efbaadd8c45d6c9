use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{PlayerId, RoleId, Team};

/// Tag of a transient effect attached to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Protected,
    Poisoned,
    DelayedDeath,
    Lovers,
    OberegHolder,
    SectMember,
    Blessed,
    Cursed,
    Marked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Flag(bool),
    Number(i64),
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<u32> for MetaValue {
    fn from(value: u32) -> Self {
        MetaValue::Number(i64::from(value))
    }
}

pub type StatusMeta = BTreeMap<String, MetaValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: StatusMeta,
}

impl Status {
    pub fn new(kind: StatusKind) -> Self {
        Self {
            kind,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub seat_index: Option<u32>,
    pub role_id: Option<RoleId>,
    pub team: Option<Team>,
    pub alive: bool,
    pub statuses: Vec<Status>,
    pub notes: String,
}

impl Player {
    /// A living, unseated player with no role yet.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            seat_index: None,
            role_id: None,
            team: None,
            alive: true,
            statuses: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|status| status.kind == kind)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role_id.as_ref().is_some_and(|id| id.as_ref() == role)
    }
}

/// Partial update of a player. Absent fields are left alone; for the nullable
/// fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub seat_index: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub role_id: Option<Option<RoleId>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub team: Option<Option<Team>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<Status>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Distinguishes a field that was sent as `null` from one that was not sent at all.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PlayerPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites only the fields present in the patch.
    pub fn apply_to(&self, player: &mut Player) {
        if let Some(name) = &self.name {
            player.name = name.clone();
        }
        if let Some(seat_index) = self.seat_index {
            player.seat_index = seat_index;
        }
        if let Some(role_id) = &self.role_id {
            player.role_id = role_id.clone();
        }
        if let Some(team) = self.team {
            player.team = team;
        }
        if let Some(alive) = self.alive {
            player.alive = alive;
        }
        if let Some(statuses) = &self.statuses {
            player.statuses = statuses.clone();
        }
        if let Some(notes) = &self.notes {
            player.notes = notes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        let mut player = Player::new(PlayerId::try_new("p1").unwrap(), "Anna");
        player.seat_index = Some(3);
        player
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut target = player();
        let patch = PlayerPatch {
            notes: Some("quiet".into()),
            ..Default::default()
        };
        patch.apply_to(&mut target);
        assert_eq!(target.notes, "quiet");
        assert_eq!(target.name, "Anna");
        assert_eq!(target.seat_index, Some(3));
    }

    #[test]
    fn explicit_null_clears_a_nullable_field() {
        let patch: PlayerPatch = serde_json::from_str(r#"{"seatIndex": null}"#).unwrap();
        assert_eq!(patch.seat_index, Some(None));

        let mut target = player();
        patch.apply_to(&mut target);
        assert_eq!(target.seat_index, None);
    }

    #[test]
    fn missing_field_is_not_a_clear() {
        let patch: PlayerPatch = serde_json::from_str(r#"{"name": "Bo"}"#).unwrap();
        assert_eq!(patch.seat_index, None);
        assert!(!patch.is_empty());
    }

    #[test]
    fn status_meta_is_omitted_when_empty() {
        let json = serde_json::to_value(Status::new(StatusKind::Blessed)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "blessed" }));
    }
}
