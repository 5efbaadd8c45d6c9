use crate::command::{Command, CommandContext, CommandError};
use crate::event::{EliminationCause, EventKind, GameEvent};
use crate::model::{PlayerId, Status, StatusKind};

#[derive(Debug, Clone)]
pub struct AddStatus {
    pub player_id: PlayerId,
    pub status: Status,
}

impl Command for AddStatus {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        ctx.require_player(&self.player_id)?;
        Ok(vec![GameEvent::status_added(
            ctx.now,
            self.player_id.clone(),
            self.status.clone(),
        )])
    }
}

/// Removes every status of the given kind from the player.
#[derive(Debug, Clone)]
pub struct RemoveStatus {
    pub player_id: PlayerId,
    pub kind: StatusKind,
}

impl Command for RemoveStatus {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        ctx.require_player(&self.player_id)?;
        Ok(vec![GameEvent::status_removed(
            ctx.now,
            self.player_id.clone(),
            self.kind,
        )])
    }
}

/// Moderator-driven elimination, e.g. a hunter's shot or a player leaving.
#[derive(Debug, Clone)]
pub struct EliminatePlayer {
    pub player_id: PlayerId,
    pub reason: EliminationCause,
}

impl Command for EliminatePlayer {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        ctx.require_player(&self.player_id)?;
        Ok(vec![ctx.event(EventKind::PlayerEliminated {
            player_id: self.player_id.clone(),
            reason: self.reason.clone(),
        })])
    }
}
