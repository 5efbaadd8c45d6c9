use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevealMode {
    None,
    Team,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MartyrMode {
    Sacrifice,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatProtect {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectMode {
    Team,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WolfCubRevenge {
    DoubleHunt,
    Sacrifice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VampireKillTiming {
    /// Bitten players die when the following day's vote is resolved.
    DayAfterVote,
    /// Informational only: the bite is marked and the moderator eliminates
    /// the player by hand. No resolver kills on this timing.
    Immediate,
}

/// House rules for one session.
///
/// A value object: `settings_updated` replaces it wholesale, so every field is
/// required on the wire and nothing is ever merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub reveal_on_death: RevealMode,
    pub enable_vampires: bool,
    pub enable_sect: bool,
    pub enable_obereg: bool,
    pub sheriff_double_vote: bool,
    pub martyr_mode: MartyrMode,
    pub bodyguard_repeat_protect: RepeatProtect,
    pub seer_detect_mode: DetectMode,
    pub wolf_cub_revenge_mode: WolfCubRevenge,
    pub vampire_kill_timing: VampireKillTiming,
    pub cult_leader_inherit: bool,
}

impl Settings {
    /// Field names as they appear on the wire, in declaration order.
    pub const FIELDS: [&'static str; 11] = [
        "revealOnDeath",
        "enableVampires",
        "enableSect",
        "enableObereg",
        "sheriffDoubleVote",
        "martyrMode",
        "bodyguardRepeatProtect",
        "seerDetectMode",
        "wolfCubRevengeMode",
        "vampireKillTiming",
        "cultLeaderInherit",
    ];
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reveal_on_death: RevealMode::Team,
            enable_vampires: false,
            enable_sect: false,
            enable_obereg: false,
            sheriff_double_vote: true,
            martyr_mode: MartyrMode::Sacrifice,
            bodyguard_repeat_protect: RepeatProtect::Disallow,
            seer_detect_mode: DetectMode::Team,
            wolf_cub_revenge_mode: WolfCubRevenge::DoubleHunt,
            vampire_kill_timing: VampireKillTiming::DayAfterVote,
            cult_leader_inherit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_list_matches_serde() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), Settings::FIELDS.len());
        for field in Settings::FIELDS {
            assert!(object.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn partial_settings_are_rejected() {
        let result = serde_json::from_str::<Settings>(r#"{"revealOnDeath": "role"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn enum_values_use_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["vampireKillTiming"], "dayAfterVote");
        assert_eq!(json["wolfCubRevengeMode"], "doubleHunt");
    }
}
