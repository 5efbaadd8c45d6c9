use crate::command::{Command, CommandContext, CommandError};
use crate::event::{EventKind, GameEvent};
use crate::model::{Phase, PlayerId, Stage, Vote};
use crate::resolve::resolve_day;
use crate::roles::ids;

/// One living player's vote. The mayor's vote weighs 2 when the
/// `sheriff_double_vote` house rule is on.
#[derive(Debug, Clone)]
pub struct RecordVote {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
}

impl Command for RecordVote {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        ctx.require_alive(&self.voter_id)?;
        ctx.require_alive(&self.target_id)?;

        let doubled = ctx.state.settings.sheriff_double_vote
            && ctx
                .state
                .player(&self.voter_id)
                .is_some_and(|voter| voter.has_role(ids::MAYOR));
        Ok(vec![ctx.event(EventKind::DayVoteRecorded {
            vote: Vote {
                voter_id: self.voter_id.clone(),
                target_id: self.target_id.clone(),
                weight: if doubled { 2 } else { 1 },
            },
        })])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetVotes;

impl Command for ResetVotes {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_session()?;
        Ok(vec![ctx.event(EventKind::DayVotesReset)])
    }
}

/// Closes the day: the vote's execution and any bites coming due, the votes
/// cleared, a log line, phase and stage `night`, and the night counter advanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndDay;

impl Command for EndDay {
    type Error = CommandError;

    fn handle(&self, ctx: &CommandContext<'_>) -> Result<Vec<GameEvent>, Self::Error> {
        ctx.require_running()?;
        let state = ctx.state;
        if state.phase != Phase::Day {
            return Err(CommandError::WrongPhase {
                action: "end the day",
                phase: state.phase,
            });
        }

        let mut events = resolve_day(state, ctx.now);
        events.push(ctx.event(EventKind::DayVotesReset));
        events.push(ctx.event(EventKind::LogEntryAdded {
            entry: ctx.log_entry_in(
                Phase::Day,
                "day",
                format!("Day {} finished", state.day_number),
            ),
        }));
        events.push(ctx.event(EventKind::PhaseSet {
            phase: Phase::Night,
        }));
        events.push(ctx.event(EventKind::StageSet {
            stage: Stage::Night,
        }));
        events.push(ctx.event(EventKind::DayNightSet {
            day_number: state.day_number,
            night_number: state.night_number + 1,
        }));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::{handle, pid, run, table};
    use crate::command::{EliminatePlayer, SetPhase, UpdateSettings};
    use crate::event::EliminationCause;
    use crate::model::Settings;
    use crate::state::SessionState;

    fn day() -> SessionState {
        let state = table(&[("mayor", "mayor"), ("a", "seer"), ("w", "werewolf"), ("b", "mason")]);
        run(state, SetPhase(Phase::Day))
    }

    fn vote(voter: &str, target: &str) -> RecordVote {
        RecordVote {
            voter_id: pid(voter),
            target_id: pid(target),
        }
    }

    #[test]
    fn mayor_weight_follows_the_house_rule() {
        let state = run(day(), vote("mayor", "w"));
        assert_eq!(state.votes[0].weight, 2);

        let state = run(
            day(),
            UpdateSettings(Settings {
                sheriff_double_vote: false,
                ..Settings::default()
            }),
        );
        let state = run(state, vote("mayor", "w"));
        assert_eq!(state.votes[0].weight, 1);
    }

    #[test]
    fn the_dead_do_not_vote() {
        let state = run(
            day(),
            EliminatePlayer {
                player_id: pid("a"),
                reason: EliminationCause::Night,
            },
        );
        assert_eq!(
            handle(&state, vote("a", "w")).unwrap_err(),
            CommandError::PlayerEliminated(pid("a"))
        );
        assert_eq!(
            handle(&state, vote("b", "a")).unwrap_err(),
            CommandError::PlayerEliminated(pid("a"))
        );
    }

    #[test]
    fn ending_the_day_executes_and_opens_the_next_night() {
        let state = run(day(), vote("a", "w"));
        let state = run(state, vote("b", "w"));
        let state = run(state, vote("mayor", "a"));
        let state = run(state, EndDay);

        assert!(!state.player(&pid("w")).unwrap().alive);
        assert!(state.player(&pid("a")).unwrap().alive);
        assert!(state.votes.is_empty());
        assert_eq!(state.phase, Phase::Night);
        assert_eq!(state.stage, Stage::Night);
        assert_eq!(state.day_number, 1);
        assert_eq!(state.night_number, 2);
        assert_eq!(state.log.last().unwrap().description, "Day 1 finished");
    }

    #[test]
    fn ending_a_day_without_votes_executes_nobody() {
        let state = run(day(), EndDay);
        assert_eq!(state.alive_players().count(), 4);
        assert!(matches!(handle(&state, EndDay), Err(CommandError::WrongPhase { .. })));
    }

    #[test]
    fn only_a_running_day_can_be_ended() {
        let setup = table(&[("a", "seer"), ("w", "werewolf")]);
        assert!(matches!(
            handle(&setup, EndDay),
            Err(CommandError::WrongPhase { phase: Phase::Setup, .. })
        ));
    }
}
