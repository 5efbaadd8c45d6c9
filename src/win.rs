//! Deciding whether the game is over.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{EliminationCause, EventKind};
use crate::model::{StatusKind, Team};
use crate::roles::ids;
use crate::state::SessionState;

/// Who won. Solo winners come first because they pre-empt team outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    LoneWolf,
    Tanner,
    Bandit,
    Sect,
    Vampires,
    Werewolves,
    Villagers,
}

impl Winner {
    /// The team that shares the win, if any.
    pub fn team(&self) -> Option<Team> {
        match self {
            Winner::Sect => Some(Team::Sect),
            Winner::Vampires => Some(Team::Vampires),
            Winner::Werewolves => Some(Team::Werewolves),
            Winner::Villagers => Some(Team::Villagers),
            Winner::LoneWolf | Winner::Tanner | Winner::Bandit => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Winner::LoneWolf => "Lone wolf",
            Winner::Tanner => "Tanner",
            Winner::Bandit => "Bandit",
            Winner::Sect => "Sect",
            Winner::Vampires => "Vampires",
            Winner::Werewolves => "Werewolves",
            Winner::Villagers => "Villagers",
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Winner::LoneWolf | Winner::Bandit => "Last one standing.",
            Winner::Tanner => "Executed by the village.",
            Winner::Sect => "Every living player belongs to the sect.",
            Winner::Vampires => "Only vampires remain.",
            Winner::Werewolves => "The werewolves control the village.",
            Winner::Villagers => "Every threat has been eliminated.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victory {
    pub winner: Winner,
    pub reason: String,
}

impl Victory {
    pub fn new(winner: Winner) -> Self {
        Self {
            winner,
            reason: winner.reason().to_string(),
        }
    }
}

/// Checks the win conditions in order and returns the first that holds.
///
/// 1. a lone wolf is the sole survivor;
/// 2. a tanner was ever executed by the day vote;
/// 3. a bandit is the sole survivor;
/// 4. with the sect enabled, every living player is the cult leader or a member;
/// 5. with vampires enabled, every living player is a vampire;
/// 6. living werewolves match or outnumber everyone else;
/// 7. no werewolves, vampires or sect members are left alive.
///
/// Players without a team count as neutral.
pub fn evaluate(state: &SessionState) -> Option<Victory> {
    let alive: Vec<_> = state.alive_players().collect();
    let sole_survivor = |role: &str| alive.len() == 1 && alive[0].has_role(role);

    if sole_survivor(ids::LONE_WOLF) {
        return Some(Victory::new(Winner::LoneWolf));
    }
    if tanner_executed(state) {
        return Some(Victory::new(Winner::Tanner));
    }
    if sole_survivor(ids::BANDIT) {
        return Some(Victory::new(Winner::Bandit));
    }

    if state.settings.enable_sect
        && !alive.is_empty()
        && alive.iter().all(|player| {
            player.has_role(ids::CULT_LEADER) || player.has_status(StatusKind::SectMember)
        })
    {
        return Some(Victory::new(Winner::Sect));
    }

    let mut teams: BTreeMap<Team, usize> = BTreeMap::new();
    for player in &alive {
        *teams.entry(player.team.unwrap_or(Team::Neutral)).or_default() += 1;
    }
    let count = |team: Team| teams.get(&team).copied().unwrap_or(0);

    if state.settings.enable_vampires && count(Team::Vampires) > 0 && count(Team::Vampires) == alive.len() {
        return Some(Victory::new(Winner::Vampires));
    }

    let wolves = count(Team::Werewolves);
    if wolves > 0 && wolves >= alive.len() - wolves {
        return Some(Victory::new(Winner::Werewolves));
    }

    if wolves == 0 && count(Team::Vampires) == 0 && count(Team::Sect) == 0 {
        return Some(Victory::new(Winner::Villagers));
    }

    None
}

/// Whether the log records a day execution of a player who holds the tanner
/// role. Reads history, so it holds even after later events.
fn tanner_executed(state: &SessionState) -> bool {
    state.events.iter().any(|event| match &event.kind {
        EventKind::PlayerEliminated {
            player_id,
            reason: EliminationCause::Day,
        } => state
            .player(player_id)
            .is_some_and(|player| player.has_role(ids::TANNER)),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::{pid, run, table};
    use crate::command::{AddStatus, EliminatePlayer};
    use crate::model::{Settings, Status};

    fn kill(state: SessionState, id: &str, reason: EliminationCause) -> SessionState {
        run(
            state,
            EliminatePlayer {
                player_id: pid(id),
                reason,
            },
        )
    }

    fn winner(state: &SessionState) -> Option<Winner> {
        evaluate(state).map(|victory| victory.winner)
    }

    #[test]
    fn a_balanced_table_has_no_winner() {
        let state = table(&[("w", "werewolf"), ("a", "seer"), ("b", "mason")]);
        assert_eq!(winner(&state), None);
    }

    #[test]
    fn werewolves_win_at_parity() {
        let state = table(&[("w", "werewolf"), ("a", "seer"), ("b", "mason")]);
        let state = kill(state, "b", EliminationCause::Night);
        assert_eq!(winner(&state), Some(Winner::Werewolves));
    }

    #[test]
    fn villagers_win_when_every_threat_is_gone() {
        let state = table(&[("w", "werewolf"), ("a", "seer"), ("b", "mason")]);
        let state = kill(state, "w", EliminationCause::Day);
        let victory = evaluate(&state).unwrap();
        assert_eq!(victory.winner, Winner::Villagers);
        assert_eq!(victory.winner.team(), Some(Team::Villagers));
        assert_eq!(victory.reason, "Every threat has been eliminated.");
    }

    #[test]
    fn lone_wolf_outranks_the_pack() {
        let state = table(&[("l", "lone_wolf"), ("a", "seer")]);
        let state = kill(state, "a", EliminationCause::Night);
        assert_eq!(winner(&state), Some(Winner::LoneWolf));
    }

    #[test]
    fn tanner_executed_by_day_wins_even_when_wolves_reach_parity() {
        let state = table(&[("w", "werewolf"), ("t", "tanner"), ("a", "seer")]);
        let state = kill(state, "t", EliminationCause::Day);
        assert_eq!(winner(&state), Some(Winner::Tanner));
    }

    #[test]
    fn tanner_killed_at_night_is_just_dead() {
        let state = table(&[("w", "werewolf"), ("t", "tanner"), ("a", "seer"), ("b", "mason")]);
        let state = kill(state, "t", EliminationCause::Night);
        assert_eq!(winner(&state), None);
    }

    #[test]
    fn bandit_needs_to_be_alone() {
        let state = table(&[("x", "bandit"), ("a", "seer")]);
        let state = kill(state, "a", EliminationCause::Day);
        assert_eq!(winner(&state), Some(Winner::Bandit));
    }

    #[test]
    fn sect_wins_only_when_enabled() {
        let mut state = table(&[("c", "cult_leader"), ("a", "seer")]);
        state = run(
            state,
            AddStatus {
                player_id: pid("a"),
                status: Status::new(StatusKind::SectMember),
            },
        );
        // The sect team is still alive, so the village has not won either.
        assert_eq!(winner(&state), None);

        state.settings = Settings {
            enable_sect: true,
            ..Settings::default()
        };
        assert_eq!(winner(&state), Some(Winner::Sect));
    }

    #[test]
    fn vampires_win_when_only_they_remain() {
        let mut state = table(&[("v", "vampire"), ("a", "seer")]);
        state = kill(state, "a", EliminationCause::Vampire);
        assert_eq!(winner(&state), None);

        state.settings = Settings {
            enable_vampires: true,
            ..Settings::default()
        };
        assert_eq!(winner(&state), Some(Winner::Vampires));
    }

    #[test]
    fn players_without_a_team_count_as_neutral() {
        let state = table(&[("w", "werewolf")]);
        let state = run(
            state,
            crate::command::AddPlayer::with_id(pid("x"), "Unassigned"),
        );
        // One wolf against one neutral is parity.
        assert_eq!(winner(&state), Some(Winner::Werewolves));
    }
}
