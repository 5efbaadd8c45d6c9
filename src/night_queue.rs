//! The order in which the moderator wakes roles at night.

use crate::model::{PlayerId, Team};
use crate::roles::{RoleRecord, RoleRegistry, ids};
use crate::state::SessionState;

/// One wake-up call: a role and the living players who act for it.
#[derive(Debug, Clone, PartialEq)]
pub struct NightStep<'r> {
    pub role: &'r RoleRecord,
    pub actors: Vec<PlayerId>,
}

/// Steps for every role with a night action and at least one living actor,
/// sorted by night order (catalogue order breaks ties).
///
/// The werewolf hunt wakes every living member of the werewolf team, whatever
/// their role. Vampires and the cult leader only wake when their faction is
/// enabled.
pub fn night_queue<'r>(state: &SessionState, roles: &'r dyn RoleRegistry) -> Vec<NightStep<'r>> {
    let alive: Vec<_> = state.alive_players().collect();
    let mut steps = Vec::new();

    for role in roles.all().iter().filter(|role| role.acts_at_night()) {
        let id: &str = role.id.as_ref();
        let actors: Vec<PlayerId> = match id {
            ids::WEREWOLF => alive
                .iter()
                .filter(|player| player.team == Some(Team::Werewolves))
                .map(|player| player.id.clone())
                .collect(),
            ids::VAMPIRE if !state.settings.enable_vampires => continue,
            ids::CULT_LEADER if !state.settings.enable_sect => continue,
            _ => alive
                .iter()
                .filter(|player| player.has_role(id))
                .map(|player| player.id.clone())
                .collect(),
        };
        if !actors.is_empty() {
            steps.push(NightStep { role, actors });
        }
    }

    steps.sort_by_key(|step| step.role.night_order);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::{pid, table};
    use crate::model::Settings;
    use crate::roles::Catalogue;

    fn order(steps: &[NightStep<'_>]) -> Vec<String> {
        steps.iter().map(|step| step.role.id.to_string()).collect()
    }

    #[test]
    fn roles_wake_in_night_order() {
        let state = table(&[("p1", "bodyguard"), ("p2", "seer")]);
        let catalogue = Catalogue::standard();
        assert_eq!(order(&night_queue(&state, &catalogue)), ["seer", "bodyguard"]);
    }

    #[test]
    fn the_hunt_wakes_the_whole_pack() {
        let state = table(&[("w1", "werewolf"), ("w2", "wolf_cub"), ("s", "sorceress"), ("v", "seer")]);
        let catalogue = Catalogue::standard();
        let queue = night_queue(&state, &catalogue);
        let hunt = queue.iter().find(|step| step.role.id.to_string() == "werewolf").unwrap();
        assert_eq!(hunt.actors, vec![pid("w1"), pid("w2"), pid("s")]);
        assert_eq!(queue.last().unwrap().role.id.to_string(), "werewolf");
    }

    #[test]
    fn dead_players_and_disabled_factions_stay_asleep() {
        let mut state = table(&[("v", "vampire"), ("c", "cult_leader"), ("s", "seer")]);
        state.players[2].alive = false;
        let catalogue = Catalogue::standard();
        assert!(night_queue(&state, &catalogue).is_empty());

        state.settings = Settings {
            enable_vampires: true,
            enable_sect: true,
            ..Settings::default()
        };
        assert_eq!(order(&night_queue(&state, &catalogue)), ["cult_leader", "vampire"]);
    }
}
