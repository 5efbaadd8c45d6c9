use serde::{Deserialize, Serialize};

/// Why a player left the game. Recorded on `player_eliminated` and consulted by
/// win conditions that care about how someone died.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EliminationCause {
    /// Werewolf hunt.
    Night,
    Poison,
    Magic,
    /// Executed by the day vote.
    Day,
    /// Delayed bite taking effect.
    Vampire,
    /// Anything the moderator typed in by hand.
    Other(String),
}

impl EliminationCause {
    pub fn as_str(&self) -> &str {
        match self {
            EliminationCause::Night => "night",
            EliminationCause::Poison => "poison",
            EliminationCause::Magic => "magic",
            EliminationCause::Day => "day",
            EliminationCause::Vampire => "vampire",
            EliminationCause::Other(reason) => reason,
        }
    }
}

impl From<String> for EliminationCause {
    fn from(reason: String) -> Self {
        match reason.as_str() {
            "night" => EliminationCause::Night,
            "poison" => EliminationCause::Poison,
            "magic" => EliminationCause::Magic,
            "day" => EliminationCause::Day,
            "vampire" => EliminationCause::Vampire,
            _ => EliminationCause::Other(reason),
        }
    }
}

impl From<EliminationCause> for String {
    fn from(cause: EliminationCause) -> Self {
        cause.as_str().to_string()
    }
}

impl std::fmt::Display for EliminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_reasons_survive_a_round_trip() {
        let cause: EliminationCause = serde_json::from_str("\"left early\"").unwrap();
        assert_eq!(cause, EliminationCause::Other("left early".into()));
        assert_eq!(serde_json::to_string(&cause).unwrap(), "\"left early\"");
    }

    #[test]
    fn known_reasons_map_to_variants() {
        let cause: EliminationCause = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(cause, EliminationCause::Day);
    }
}
