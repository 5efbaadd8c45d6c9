use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::command::{Command, CommandContext, CommandError};
use crate::event::{EventKind, GameEvent, RoleAssignment, SeatAssignment};
use crate::model::{Player, PlayerId, PlayerPatch, RoleId};

#[derive(Debug, Clone)]
pub struct AddPlayer {
    pub player_id: PlayerId,
    pub name: String,
}

impl AddPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(PlayerId::generate(), name)
    }

    pub fn with_id(player_id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            player_id,
            name: name.into(),
        }
    }
}

impl Command for AddPlayer {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CommandError::BlankName);
        }
        if ctx.state.player(&self.player_id).is_some() {
            return Err(CommandError::DuplicatePlayer(self.player_id.clone()));
        }
        Ok(vec![ctx.event(EventKind::PlayerAdded {
            player: Player::new(self.player_id.clone(), name),
        })])
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePlayer {
    pub player_id: PlayerId,
    pub patch: PlayerPatch,
}

impl Command for UpdatePlayer {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        ctx.require_player(&self.player_id)?;
        if self
            .patch
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(CommandError::BlankName);
        }
        Ok(vec![ctx.event(EventKind::PlayerUpdated {
            player_id: self.player_id.clone(),
            patch: self.patch.clone(),
        })])
    }
}

#[derive(Debug, Clone)]
pub struct RemovePlayer(pub PlayerId);

impl Command for RemovePlayer {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        ctx.require_player(&self.0)?;
        Ok(vec![ctx.event(EventKind::PlayerRemoved {
            player_id: self.0.clone(),
        })])
    }
}

#[derive(Debug, Clone)]
pub struct AssignSeats(pub Vec<SeatAssignment>);

impl AssignSeats {
    /// Seats the players clockwise in the order given, starting at seat 0.
    pub fn in_order(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self(
            players
                .into_iter()
                .zip(0..)
                .map(|(player_id, seat_index)| SeatAssignment {
                    player_id,
                    seat_index,
                })
                .collect(),
        )
    }
}

impl Command for AssignSeats {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        for seat in &self.0 {
            ctx.require_player(&seat.player_id)?;
        }
        Ok(vec![ctx.event(EventKind::SeatsAssigned {
            seats: self.0.clone(),
        })])
    }
}

/// Hands out roles by hand. Each player's team comes from the role catalogue.
#[derive(Debug, Clone)]
pub struct AssignRoles(pub Vec<(PlayerId, RoleId)>);

impl AssignRoles {
    pub fn new(assignments: impl IntoIterator<Item = (PlayerId, RoleId)>) -> Self {
        Self(assignments.into_iter().collect())
    }
}

impl Command for AssignRoles {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        let assignments = self
            .0
            .iter()
            .map(|(player_id, role_id)| assignment(ctx, player_id, role_id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![ctx.event(EventKind::RolesAssigned { assignments })])
    }
}

fn assignment(
    ctx: &CommandContext<'_>,
    player_id: &PlayerId,
    role_id: &RoleId,
) -> Result<RoleAssignment, CommandError> {
    ctx.require_player(player_id)?;
    let role = ctx
        .roles
        .lookup(role_id.as_ref())
        .ok_or_else(|| CommandError::UnknownRole(role_id.clone()))?;
    Ok(RoleAssignment {
        player_id: player_id.clone(),
        role_id: role_id.clone(),
        team: role.team,
    })
}

/// Shuffles a deck of roles and deals it around the table in seat order.
///
/// The shuffle is seeded from the command, and the outcome is recorded as an
/// ordinary `roles_assigned` event, so replay never touches the generator.
#[derive(Debug, Clone)]
pub struct DealRoles {
    pub deck: Vec<RoleId>,
    pub seed: u64,
}

impl Command for DealRoles {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        let players = ctx.state.players_by_seat();
        if players.len() != self.deck.len() {
            return Err(CommandError::DeckMismatch {
                roles: self.deck.len(),
                players: players.len(),
            });
        }

        let mut deck = self.deck.clone();
        deck.shuffle(&mut SmallRng::seed_from_u64(self.seed));

        let assignments = players
            .iter()
            .zip(&deck)
            .map(|(player, role_id)| assignment(ctx, &player.id, role_id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![ctx.event(EventKind::RolesAssigned { assignments })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::{handle, pid, rid, run, table};
    use crate::model::Team;

    #[test]
    fn adding_a_player_trims_the_name() {
        let state = run(table(&[]), AddPlayer::with_id(pid("p1"), "  Ann "));
        let ann = state.player(&pid("p1")).unwrap();
        assert_eq!(ann.name, "Ann");
        assert!(ann.alive);
        assert_eq!(ann.seat_index, None);
    }

    #[test]
    fn player_ids_are_unique() {
        let state = table(&[("p1", "seer")]);
        assert_eq!(
            handle(&state, AddPlayer::with_id(pid("p1"), "Again")).unwrap_err(),
            CommandError::DuplicatePlayer(pid("p1"))
        );
        assert_eq!(
            handle(&state, AddPlayer::new("   ")).unwrap_err(),
            CommandError::BlankName
        );
    }

    #[test]
    fn roles_take_their_team_from_the_catalogue() {
        let state = table(&[("p1", "seer"), ("p2", "sorceress"), ("p3", "tanner")]);
        assert_eq!(state.player(&pid("p1")).unwrap().team, Some(Team::Villagers));
        assert_eq!(state.player(&pid("p2")).unwrap().team, Some(Team::Werewolves));
        assert_eq!(state.player(&pid("p3")).unwrap().team, Some(Team::Neutral));

        let unknown = AssignRoles::new([(pid("p1"), rid("necromancer"))]);
        assert_eq!(
            handle(&state, unknown).unwrap_err(),
            CommandError::UnknownRole(rid("necromancer"))
        );
    }

    #[test]
    fn seats_follow_the_given_order() {
        let state = table(&[("a", "seer"), ("b", "werewolf"), ("c", "mayor")]);
        let state = run(state, AssignSeats::in_order([pid("c"), pid("a"), pid("b")]));
        let order: Vec<_> = state
            .players_by_seat()
            .iter()
            .map(|player| player.id.to_string())
            .collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn removing_an_unknown_player_is_rejected() {
        let state = table(&[("p1", "seer")]);
        assert_eq!(
            handle(&state, RemovePlayer(pid("ghost"))).unwrap_err(),
            CommandError::UnknownPlayer(pid("ghost"))
        );
        let state = run(state, RemovePlayer(pid("p1")));
        assert!(state.players.is_empty());
    }

    #[test]
    fn dealing_is_reproducible_for_a_seed() {
        let state = table(&[("a", "seer"), ("b", "seer"), ("c", "seer"), ("d", "seer")]);
        let deal = DealRoles {
            deck: vec![rid("werewolf"), rid("seer"), rid("mayor"), rid("bodyguard")],
            seed: 7,
        };
        let first = handle(&state, deal.clone()).unwrap();
        let second = handle(&state, deal.clone()).unwrap();
        assert_eq!(first, second);

        let dealt = run(state, deal);
        let mut roles: Vec<_> = dealt
            .players
            .iter()
            .filter_map(|player| player.role_id.as_ref().map(ToString::to_string))
            .collect();
        roles.sort();
        assert_eq!(roles, ["bodyguard", "mayor", "seer", "werewolf"]);
    }

    #[test]
    fn deck_must_match_the_table() {
        let state = table(&[("a", "seer"), ("b", "seer")]);
        let deal = DealRoles {
            deck: vec![rid("werewolf")],
            seed: 1,
        };
        assert_eq!(
            handle(&state, deal).unwrap_err(),
            CommandError::DeckMismatch { roles: 1, players: 2 }
        );
    }
}
