//! Command handling for a moderated session.
//!
//! A command is the moderator's intention ("record the witch's potion", "end
//! the night"). Handling one validates it against the current state and turns
//! it into timestamped [`GameEvent`]s; it never mutates anything. The
//! [`crate::Session`] handle commits the events one by one.
//!
//! # Examples
//!
//! ```rust
//! use nocturne::command::{AddPlayer, Command, CommandContext, CreateSession};
//! use nocturne::{AggregateState, Catalogue, SessionState, Timestamp};
//!
//! let roles = Catalogue::standard();
//! let now = Timestamp::from_millis(1_000);
//!
//! let empty = SessionState::empty();
//! let created = CreateSession::new("Friday game")
//!     .handle(&CommandContext::new(&empty, &roles, now))
//!     .unwrap();
//! let state = created.into_iter().fold(empty, |state, event| state.apply(event));
//!
//! let added = AddPlayer::new("Ann")
//!     .handle(&CommandContext::new(&state, &roles, now))
//!     .unwrap();
//! assert_eq!(added.len(), 1);
//! ```

mod day;
mod lifecycle;
mod night;
mod roster;
mod status;

pub use day::{EndDay, RecordVote, ResetVotes};
pub use lifecycle::{
    AddLogEntry, CompleteIntroNight, CreateSession, DeclareVictory, SetDayNight, SetPhase,
    SetStage, UpdateSettings,
};
pub use night::{EndNight, RecordNightAction};
pub use roster::{AddPlayer, AssignRoles, AssignSeats, DealRoles, RemovePlayer, UpdatePlayer};
pub use status::{AddStatus, EliminatePlayer, RemoveStatus};

use std::fmt::Debug;

use thiserror::Error;

use crate::clock::Timestamp;
use crate::event::{Event, GameEvent};
use crate::model::{LogEntry, Phase, PlayerId, RoleId, SessionId};
use crate::roles::RoleRegistry;
use crate::state::SessionState;

/// Why a command was turned down. Nothing is recorded when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Session {0} has already been created")]
    AlreadyCreated(SessionId),

    #[error("No session has been created yet")]
    NoSession,

    #[error("The game is over")]
    GameOver,

    #[error("Player name cannot be blank")]
    BlankName,

    #[error("Player {0} already exists")]
    DuplicatePlayer(PlayerId),

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {0} has been eliminated")]
    PlayerEliminated(PlayerId),

    #[error("Unknown role '{0}'")]
    UnknownRole(RoleId),

    #[error("Role '{0}' has no night action")]
    NoNightAction(RoleId),

    #[error("Invalid '{field}' for role '{role}': {reason}")]
    InvalidPayload {
        role: RoleId,
        field: String,
        reason: String,
    },

    #[error("Cannot deal {roles} roles to {players} players")]
    DeckMismatch { roles: usize, players: usize },

    #[error("Cannot {action} while the phase is {phase:?}")]
    WrongPhase { action: &'static str, phase: Phase },
}

/// What a command sees: the state it validates against, the role catalogue,
/// and the single clock reading all of its events are stamped with.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub state: &'a SessionState,
    pub roles: &'a dyn RoleRegistry,
    pub now: Timestamp,
}

impl<'a> CommandContext<'a> {
    pub fn new(state: &'a SessionState, roles: &'a dyn RoleRegistry, now: Timestamp) -> Self {
        Self { state, roles, now }
    }

    pub(crate) fn event(&self, kind: crate::event::EventKind) -> GameEvent {
        GameEvent::new(self.now, kind)
    }

    /// A log entry stamped with the current phase and counters. Ids are
    /// derived from the timestamp so replays never mint new ones.
    pub(crate) fn log_entry(&self, suffix: &str, description: impl Into<String>) -> LogEntry {
        self.log_entry_in(self.state.phase, suffix, description)
    }

    pub(crate) fn log_entry_in(
        &self,
        phase: Phase,
        suffix: &str,
        description: impl Into<String>,
    ) -> LogEntry {
        LogEntry {
            id: format!("{}-{suffix}", self.now.as_millis()),
            timestamp: self.now,
            phase,
            day_number: self.state.day_number,
            night_number: self.state.night_number,
            description: description.into(),
        }
    }

    pub(crate) fn require_session(&self) -> Result<(), CommandError> {
        match self.state.id {
            Some(_) => Ok(()),
            None => Err(CommandError::NoSession),
        }
    }

    pub(crate) fn require_running(&self) -> Result<(), CommandError> {
        self.require_session()?;
        if self.state.is_ended() {
            return Err(CommandError::GameOver);
        }
        Ok(())
    }

    pub(crate) fn require_player(&self, id: &PlayerId) -> Result<(), CommandError> {
        self.state
            .player(id)
            .map(|_| ())
            .ok_or_else(|| CommandError::UnknownPlayer(id.clone()))
    }

    pub(crate) fn require_alive(&self, id: &PlayerId) -> Result<(), CommandError> {
        match self.state.player(id) {
            Some(player) if player.alive => Ok(()),
            Some(_) => Err(CommandError::PlayerEliminated(id.clone())),
            None => Err(CommandError::UnknownPlayer(id.clone())),
        }
    }
}

/// Represents a command that can be executed to produce events.
///
/// Handling must be deterministic given the context: read time only from
/// `ctx.now` and randomness only from seeds carried on the command itself.
pub trait Command {
    /// The error type that can be returned when handling this command
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validates the command against `ctx.state` and produces the events to
    /// commit, in order.
    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error>;
}

/// Represents the state of an aggregate that can be modified by events
///
/// # Type Parameters
///
/// * `E` - The event type that can modify this state
pub trait AggregateState<E: Event>: Debug + Sized {
    /// Apply an event to the current state and return the new state
    fn apply(&self, event: E) -> Self;
}
