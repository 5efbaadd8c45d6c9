use crate::command::{Command, CommandContext, CommandError};
use crate::event::{EventKind, GameEvent};
use crate::model::{Phase, SessionId, Settings, Stage};
use crate::win::Victory;

/// Opens a new session with the given house rules.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub session_id: SessionId,
    pub name: String,
    pub settings: Settings,
}

impl CreateSession {
    /// A fresh id and the default house rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::generate(),
            name: name.into(),
            settings: Settings::default(),
        }
    }

    pub fn with_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }
}

impl Command for CreateSession {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        if let Some(existing) = &ctx.state.id {
            return Err(CommandError::AlreadyCreated(existing.clone()));
        }
        Ok(vec![ctx.event(EventKind::SessionCreated {
            session_id: self.session_id.clone(),
            name: self.name.trim().to_string(),
            settings: self.settings.clone(),
        })])
    }
}

/// Replaces the whole settings record.
#[derive(Debug, Clone)]
pub struct UpdateSettings(pub Settings);

impl Command for UpdateSettings {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        Ok(vec![ctx.event(EventKind::SettingsUpdated {
            settings: self.0.clone(),
        })])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetStage(pub Stage);

impl Command for SetStage {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        Ok(vec![ctx.event(EventKind::StageSet { stage: self.0 })])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetPhase(pub Phase);

impl Command for SetPhase {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        Ok(vec![ctx.event(EventKind::PhaseSet { phase: self.0 })])
    }
}

/// Moderator override of the day and night counters.
#[derive(Debug, Clone, Copy)]
pub struct SetDayNight {
    pub day_number: u32,
    pub night_number: u32,
}

impl Command for SetDayNight {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        Ok(vec![ctx.event(EventKind::DayNightSet {
            day_number: self.day_number,
            night_number: self.night_number,
        })])
    }
}

/// A free-form note in the game log.
#[derive(Debug, Clone)]
pub struct AddLogEntry(pub String);

impl Command for AddLogEntry {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        let suffix = format!("note-{}", ctx.state.log.len());
        Ok(vec![ctx.event(EventKind::LogEntryAdded {
            entry: ctx.log_entry(&suffix, self.0.clone()),
        })])
    }
}

/// Closes the introduction night, where roles are handed out and nobody acts,
/// and opens the first day.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteIntroNight;

impl Command for CompleteIntroNight {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        Ok(vec![
            ctx.event(EventKind::LogEntryAdded {
                entry: ctx.log_entry_in(Phase::Night, "intro", "Introduction night finished"),
            }),
            ctx.event(EventKind::PhaseSet { phase: Phase::Day }),
            ctx.event(EventKind::StageSet { stage: Stage::Day }),
        ])
    }
}

/// Ends the game: phase and stage `ended` plus one log line naming the winner.
#[derive(Debug, Clone)]
pub struct DeclareVictory(pub Victory);

impl Command for DeclareVictory {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        let Victory { winner, reason } = &self.0;
        Ok(vec![
            ctx.event(EventKind::PhaseSet {
                phase: Phase::Ended,
            }),
            ctx.event(EventKind::StageSet {
                stage: Stage::Ended,
            }),
            ctx.event(EventKind::LogEntryAdded {
                entry: ctx.log_entry_in(
                    Phase::Ended,
                    "win",
                    format!("Victory: {}. {reason}", winner.label()),
                ),
            }),
        ])
    }
}
