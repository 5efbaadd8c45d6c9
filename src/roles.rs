//! The role registry: a read-only catalogue of role records keyed by a stable id.
//!
//! The engine only consumes the [`RoleRegistry`] trait. [`Catalogue::standard`]
//! ships the classic roster (team, night order, action schema and balance
//! points, no display text); hosts may load their own with
//! [`Catalogue::from_json`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{RoleId, Team};
use crate::state::SessionState;

/// Ids the resolvers and the win evaluator refer to by name.
pub mod ids {
    pub const AMUR: &str = "amur";
    pub const BANDIT: &str = "bandit";
    pub const BODYGUARD: &str = "bodyguard";
    pub const CULT_LEADER: &str = "cult_leader";
    pub const DOPPELGANGER: &str = "doppelganger";
    pub const LONE_WOLF: &str = "lone_wolf";
    pub const MAYOR: &str = "mayor";
    pub const PRIEST: &str = "priest";
    pub const TANNER: &str = "tanner";
    pub const VAMPIRE: &str = "vampire";
    pub const WEREWOLF: &str = "werewolf";
    pub const WITCH: &str = "witch";
    pub const WIZARD: &str = "wizard";
}

/// One input the moderator fills in when recording a role's night action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionField {
    /// One player id, or a list of up to `max` ids when `multiple` is set.
    Player {
        key: String,
        #[serde(default = "yes")]
        allow_self: bool,
        #[serde(default)]
        allow_dead: bool,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        max: Option<usize>,
    },
    Toggle {
        key: String,
    },
    Choice {
        key: String,
        options: Vec<String>,
    },
}

fn yes() -> bool {
    true
}

impl ActionField {
    pub fn key(&self) -> &str {
        match self {
            ActionField::Player { key, .. }
            | ActionField::Toggle { key }
            | ActionField::Choice { key, .. } => key,
        }
    }

    fn player(key: &str) -> Self {
        ActionField::Player {
            key: key.to_string(),
            allow_self: false,
            allow_dead: false,
            multiple: false,
            max: None,
        }
    }

    fn players(key: &str, max: usize) -> Self {
        ActionField::Player {
            key: key.to_string(),
            allow_self: true,
            allow_dead: false,
            multiple: true,
            max: Some(max),
        }
    }

    fn toggle(key: &str) -> Self {
        ActionField::Toggle {
            key: key.to_string(),
        }
    }

    fn choice(key: &str, options: &[&str]) -> Self {
        ActionField::Choice {
            key: key.to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSchema {
    pub fields: Vec<ActionField>,
}

impl ActionSchema {
    pub fn field(&self, key: &str) -> Option<&ActionField> {
        self.fields.iter().find(|field| field.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub id: RoleId,
    pub team: Team,
    pub night_order: Option<u32>,
    pub has_night_action: bool,
    #[serde(default)]
    pub balance_points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_schema: Option<ActionSchema>,
}

impl RoleRecord {
    /// Whether the role takes a step in the night queue at all.
    pub fn acts_at_night(&self) -> bool {
        self.has_night_action && self.night_order.is_some()
    }
}

pub trait RoleRegistry: Send + Sync {
    fn lookup(&self, id: &str) -> Option<&RoleRecord>;

    /// Every record, in catalogue order.
    fn all(&self) -> &[RoleRecord];
}

/// An immutable, indexed list of role records.
#[derive(Debug, Clone)]
pub struct Catalogue {
    records: Vec<RoleRecord>,
    index: HashMap<String, usize>,
}

impl Catalogue {
    /// Later records with a duplicate id shadow earlier ones.
    pub fn new(records: Vec<RoleRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.to_string(), position))
            .collect();
        Self { records, index }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<RoleRecord>>(raw).map(Self::new)
    }

    pub fn standard() -> Self {
        use Team::*;

        let mut records = Vec::new();
        let mut role = |id: &str, team: Team, points: i32, night: Option<(u32, Vec<ActionField>)>| {
            let Ok(id) = RoleId::try_new(id) else {
                return;
            };
            let (night_order, action_schema) = match night {
                Some((order, fields)) => (Some(order), Some(ActionSchema { fields })),
                None => (None, None),
            };
            records.push(RoleRecord {
                id,
                team,
                night_order,
                has_night_action: night_order.is_some(),
                balance_points: points,
                action_schema,
            });
        };

        role(ids::AMUR, Villagers, 3, Some((1, vec![ActionField::players("targets", 2)])));
        role(
            ids::WITCH,
            Villagers,
            11,
            Some((
                4,
                vec![
                    ActionField::toggle("healWolfVictim"),
                    ActionField::player("poisonTarget"),
                ],
            )),
        );
        role(
            ids::WIZARD,
            Villagers,
            9,
            Some((
                4,
                vec![
                    ActionField::toggle("healWolfVictim"),
                    ActionField::player("killTarget"),
                ],
            )),
        );
        role("fool", Villagers, 1, None);
        role("tough", Villagers, 4, None);
        role("lycan", Villagers, 1, None);
        role("mason", Villagers, 6, None);
        role("medium", Villagers, 4, Some((5, vec![ActionField::player("targetId")])));
        role("martyr", Villagers, 1, None);
        role(ids::MAYOR, Villagers, 5, None);
        role("pacifist", Villagers, 1, None);
        role("prince", Villagers, 5, None);
        role("instigator", Villagers, 2, None);
        role(ids::BODYGUARD, Villagers, 3, Some((3, vec![ActionField::player("targetId")])));
        role(
            ids::PRIEST,
            Villagers,
            3,
            Some((
                6,
                vec![
                    ActionField::player("targetId"),
                    ActionField::choice("mode", &["bless", "cleanse"]),
                ],
            )),
        );
        role("hunter", Villagers, 6, None);
        role("ghost", Villagers, 1, None);
        role("elder", Villagers, 0, None);
        role("plague", Villagers, 3, None);
        role("psychic", Villagers, 3, Some((2, vec![ActionField::player("targetId")])));
        role("seer", Villagers, 7, Some((2, vec![ActionField::player("targetId")])));
        role("seer_apprentice", Villagers, 2, None);
        role(ids::WEREWOLF, Werewolves, -6, Some((7, vec![ActionField::player("targetId")])));
        role("wolf_cub", Werewolves, -8, None);
        role(ids::LONE_WOLF, Werewolves, -5, None);
        role("sorceress", Werewolves, -3, Some((5, vec![ActionField::player("targetId")])));
        role("cursed", Villagers, -3, None);
        role("lackey", Werewolves, -6, None);
        role(ids::DOPPELGANGER, Neutral, -2, Some((1, vec![ActionField::player("targetId")])));
        role(ids::VAMPIRE, Vampires, -8, Some((7, vec![ActionField::player("targetId")])));
        role(ids::CULT_LEADER, Sect, 1, Some((6, vec![ActionField::player("targetId")])));
        role(ids::TANNER, Neutral, 0, None);
        role(ids::BANDIT, Neutral, 0, None);

        Self::new(records)
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::standard()
    }
}

impl RoleRegistry for Catalogue {
    fn lookup(&self, id: &str) -> Option<&RoleRecord> {
        self.index
            .get(id)
            .and_then(|position| self.records.get(*position))
    }

    fn all(&self) -> &[RoleRecord] {
        &self.records
    }
}

/// Sum of the balance points of every assigned role. Positive favours the
/// village; roles missing from the registry count as zero.
pub fn balance(state: &SessionState, roles: &dyn RoleRegistry) -> i32 {
    state
        .players
        .iter()
        .filter_map(|player| player.role_id.as_ref())
        .filter_map(|role_id| roles.lookup(role_id.as_ref()))
        .map(|role| role.balance_points)
        .sum()
}
