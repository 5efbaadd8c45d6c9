use crate::command::{Command, CommandContext, CommandError};
use crate::event::{EventKind, GameEvent};
use crate::model::{NightAction, PayloadValue, Phase, PlayerId, Stage};
use crate::resolve::resolve_night;
use crate::roles::{ActionField, ActionSchema};

/// Records one role's submission for the current night. A later submission
/// for the same role replaces this one when the night is resolved.
#[derive(Debug, Clone)]
pub struct RecordNightAction(pub NightAction);

impl Command for RecordNightAction {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        let action = &self.0;
        let role = ctx
            .roles
            .lookup(action.role_id.as_ref())
            .ok_or_else(|| CommandError::UnknownRole(action.role_id.clone()))?;
        if !role.acts_at_night() {
            return Err(CommandError::NoNightAction(action.role_id.clone()));
        }
        ctx.require_alive(&action.actor_id)?;

        let empty = ActionSchema::default();
        let schema = role.action_schema.as_ref().unwrap_or(&empty);
        for (key, value) in &action.payload {
            let field = schema.field(key).ok_or_else(|| invalid(action, key, "not part of this role's action"))?;
            check_field(ctx, action, field, value)?;
        }

        Ok(vec![ctx.event(EventKind::NightActionRecorded {
            action: action.clone(),
        })])
    }
}

fn invalid(action: &NightAction, field: &str, reason: impl Into<String>) -> CommandError {
    CommandError::InvalidPayload {
        role: action.role_id.clone(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn check_field(
    ctx: &CommandContext<'_>,
    action: &NightAction,
    field: &ActionField,
    value: &PayloadValue,
) -> Result<(), CommandError> {
    let key = field.key();
    match (field, value) {
        (
            ActionField::Player {
                multiple: false, ..
            },
            PayloadValue::Text(id),
        ) => check_target(ctx, action, field, id),
        (
            ActionField::Player {
                multiple: true,
                max,
                ..
            },
            PayloadValue::List(ids),
        ) => {
            if let Some(max) = max {
                if ids.len() > *max {
                    return Err(invalid(action, key, format!("at most {max} players")));
                }
            }
            ids.iter().try_for_each(|id| check_target(ctx, action, field, id))
        }
        (ActionField::Player { multiple: false, .. }, _) => {
            Err(invalid(action, key, "expected a player id"))
        }
        (ActionField::Player { multiple: true, .. }, _) => {
            Err(invalid(action, key, "expected a list of player ids"))
        }
        (ActionField::Toggle { .. }, PayloadValue::Flag(_)) => Ok(()),
        (ActionField::Toggle { .. }, _) => Err(invalid(action, key, "expected true or false")),
        (ActionField::Choice { options, .. }, PayloadValue::Text(choice))
            if options.iter().any(|option| option == choice) =>
        {
            Ok(())
        }
        (ActionField::Choice { options, .. }, _) => Err(invalid(
            action,
            key,
            format!("expected one of {}", options.join(", ")),
        )),
    }
}

fn check_target(
    ctx: &CommandContext<'_>,
    action: &NightAction,
    field: &ActionField,
    raw: &str,
) -> Result<(), CommandError> {
    let ActionField::Player {
        key,
        allow_self,
        allow_dead,
        ..
    } = field
    else {
        return Ok(());
    };
    let id = PlayerId::try_new(raw).map_err(|_| invalid(action, key, "blank player id"))?;
    let target = ctx
        .state
        .player(&id)
        .ok_or_else(|| invalid(action, key, format!("unknown player {id}")))?;
    if !allow_self && target.id == action.actor_id {
        return Err(invalid(action, key, "cannot target the acting player"));
    }
    if !allow_dead && !target.alive {
        return Err(invalid(action, key, format!("player {id} has been eliminated")));
    }
    Ok(())
}

/// Resolves the night and opens the next day: the resolver's events, a log
/// line, phase and stage `day`, and the day counter advanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndNight;

impl Command for EndNight {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        let state = ctx.state;
        if state.phase != Phase::Night {
            return Err(CommandError::WrongPhase {
                action: "end the night",
                phase: state.phase,
            });
        }

        let mut events = resolve_night(state, ctx.now);
        events.push(ctx.event(EventKind::LogEntryAdded {
            entry: ctx.log_entry_in(
                Phase::Night,
                "night",
                format!("Night {} finished", state.night_number),
            ),
        }));
        events.push(ctx.event(EventKind::PhaseSet { phase: Phase::Day }));
        events.push(ctx.event(EventKind::StageSet { stage: Stage::Day }));
        events.push(ctx.event(EventKind::DayNightSet {
            day_number: state.day_number + 1,
            night_number: state.night_number,
        }));
        Ok(events)
    }
}
