//! The handle a host uses to drive one session.
//!
//! A [`Session`] owns the derived state, the store it persists to, and the
//! collaborators commands need (role catalogue, clock). Every mutation goes
//! through [`Session::execute`], which commits events one at a time: the next
//! state is computed first, the event is appended, and only once the append has
//! succeeded does the in-memory state move forward. A failed append leaves the
//! handle exactly as it was.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{
    AggregateState, Command, CommandContext, CreateSession, DeclareVictory, EndDay, EndNight,
};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::event::GameEvent;
use crate::model::SessionId;
use crate::night_queue::{NightStep, night_queue};
use crate::replay::{rebuild, rebuild_prefix};
use crate::roles::{Catalogue, RoleRegistry, balance};
use crate::snapshot::{SnapshotManager, recover};
use crate::state::SessionState;
use crate::store::{EventStore, SnapshotStore};
use crate::transfer::{self, ExportPayload};
use crate::win::{Victory, evaluate};

/// Receives every committed event. Register one with [`Session::subscribe`] to
/// keep a UI in step with the engine.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &GameEvent, state: &SessionState);

    /// Called when the state was replaced wholesale by a rollback or recovery.
    fn on_reset(&self, state: &SessionState) {
        let _ = state;
    }
}

/// Collaborators and configuration shared by every session a host opens.
#[derive(Clone)]
pub struct SessionOptions {
    config: EngineConfig,
    roles: Arc<dyn RoleRegistry>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            roles: Arc::new(Catalogue::standard()),
            clock: Arc::new(SystemClock),
        }
    }
}

impl SessionOptions {
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_roles(mut self, roles: Arc<dyn RoleRegistry>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }
}

pub struct Session<S> {
    id: SessionId,
    state: SessionState,
    /// Length of the durable log. Differs from `state.events.len()` when the
    /// log holds kinds this build does not understand.
    log_len: usize,
    store: S,
    roles: Arc<dyn RoleRegistry>,
    clock: Arc<dyn Clock>,
    snapshots: SnapshotManager,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl<S> Session<S>
where
    S: EventStore + SnapshotStore + Send + Sync,
{
    fn assemble(
        store: S,
        id: SessionId,
        state: SessionState,
        log_len: usize,
        options: SessionOptions,
    ) -> Self {
        Self {
            id,
            state,
            log_len,
            store,
            roles: options.roles,
            clock: options.clock,
            snapshots: SnapshotManager::new(options.config.snapshots()),
            observers: Vec::new(),
        }
    }

    /// Starts a new session and commits its `session_created` event.
    pub async fn create(
        store: S,
        command: CreateSession,
        options: SessionOptions,
    ) -> Result<Self, Error> {
        let id = command.session_id.clone();
        match store.read_stream(&id).await {
            Ok(_) => return Err(Error::SessionExists(id)),
            Err(Error::SessionNotFound(_)) => {}
            Err(error) => return Err(error),
        }

        let mut session = Self::assemble(store, id, SessionState::empty(), 0, options);
        session.execute(command).await?;
        info!(session = %session.id, name = %session.state.name, "session created");
        Ok(session)
    }

    /// Reopens a stored session, recovering its state from durable storage.
    pub async fn open(store: S, id: &SessionId, options: SessionOptions) -> Result<Self, Error> {
        let recovered = recover(&store, id).await?;
        info!(
            session = %id,
            events = recovered.log_len,
            snapshot = ?recovered.snapshot_index,
            "session opened"
        );
        Ok(Self::assemble(
            store,
            id.clone(),
            recovered.state,
            recovered.log_len,
            options,
        ))
    }

    /// Validates an export payload and stores it as a new session. Either the
    /// whole log is written or nothing is. Once the log is written the import
    /// has succeeded, even if the follow-up checkpoint could not be saved.
    pub async fn import(
        mut store: S,
        payload: &Value,
        options: SessionOptions,
    ) -> Result<Self, Error> {
        let (id, events) = match transfer::validate(payload) {
            Ok(valid) => valid,
            Err(error) => {
                warn!(problems = error.violations.len(), %error, "import rejected");
                return Err(error.into());
            }
        };

        store.create_log(&id, events.clone()).await?;
        let log_len = events.len();
        let state = rebuild(events);
        let mut session = Self::assemble(store, id, state, log_len, options);
        let last = log_len.saturating_sub(1);
        let now = session.clock.now();
        if let Err(error) = session
            .snapshots
            .checkpoint(&mut session.store, &session.id, &session.state, last, now)
            .await
        {
            warn!(
                session = %session.id,
                %error,
                "checkpoint after import failed; the log is unaffected"
            );
        }
        info!(session = %session.id, events = log_len, "session imported");
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn log_len(&self) -> usize {
        self.log_len
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Handles `command` against the current state and commits the resulting
    /// events in order. Returns what was committed.
    ///
    /// A rejected command commits nothing. A storage failure part way through
    /// leaves the events before it committed; recovery replays exactly those.
    pub async fn execute<C: Command>(&mut self, command: C) -> Result<Vec<GameEvent>, Error> {
        let now = self.clock.now();
        let ctx = CommandContext::new(&self.state, self.roles.as_ref(), now);
        let events = command.handle(&ctx).map_err(|error| Error::CommandFailed {
            message: error.to_string(),
            source: Box::new(error),
        })?;

        for event in &events {
            self.commit(event.clone()).await?;
        }
        Ok(events)
    }

    async fn commit(&mut self, event: GameEvent) -> Result<(), Error> {
        let next = self.state.apply(event.clone());
        self.store.append(&self.id, event.clone()).await?;
        self.state = next;
        self.log_len += 1;
        debug!(
            session = %self.id,
            index = self.log_len - 1,
            kind = event.kind.tag(),
            "event committed"
        );

        if let Err(error) = self
            .snapshots
            .maybe_snapshot(
                &mut self.store,
                &self.id,
                &self.state,
                self.log_len,
                event.timestamp,
            )
            .await
        {
            warn!(session = %self.id, %error, "snapshot failed; the log is unaffected");
        }

        for observer in &self.observers {
            observer.on_event(&event, &self.state);
        }
        Ok(())
    }

    /// Resolves the night, moves to the next day and checks for a winner.
    pub async fn end_night(&mut self) -> Result<Option<Victory>, Error> {
        self.execute(EndNight).await?;
        self.check_win().await
    }

    /// Resolves the day vote, moves to the next night and checks for a winner.
    pub async fn end_day(&mut self) -> Result<Option<Victory>, Error> {
        self.execute(EndDay).await?;
        self.check_win().await
    }

    /// Ends the game if a win condition holds.
    pub async fn check_win(&mut self) -> Result<Option<Victory>, Error> {
        if self.state.is_ended() {
            return Ok(None);
        }
        let Some(victory) = evaluate(&self.state) else {
            return Ok(None);
        };
        self.execute(DeclareVictory(victory.clone())).await?;
        info!(session = %self.id, winner = victory.winner.label(), "game over");
        Ok(Some(victory))
    }

    /// Destructively rolls the session back so that events `0..=keep_until`
    /// remain. Checkpoints taken after the cutoff are discarded first, so a
    /// crash part way through never leaves one describing lost history.
    pub async fn rollback(&mut self, keep_until: usize) -> Result<(), Error> {
        if keep_until >= self.log_len {
            return Err(Error::RollbackOutOfRange {
                keep_until,
                len: self.log_len,
            });
        }

        let events = self.store.read_stream(&self.id).await?.read_all().await?;
        let discarded = self
            .store
            .discard_snapshots_after(&self.id, keep_until)
            .await?;
        self.store.truncate(&self.id, keep_until).await?;

        self.log_len = keep_until + 1;
        self.state = rebuild_prefix(&events, self.log_len);
        info!(
            session = %self.id,
            keep_until,
            dropped = events.len().saturating_sub(self.log_len),
            discarded_snapshots = discarded,
            "session rolled back"
        );
        self.notify_reset();
        Ok(())
    }

    /// Throws away the in-memory state and rebuilds it from the latest
    /// checkpoint plus the durable log. Returns the checkpoint index used.
    pub async fn panic_recover(&mut self) -> Result<Option<usize>, Error> {
        let recovered = recover(&self.store, &self.id).await?;
        self.state = recovered.state;
        self.log_len = recovered.log_len;
        info!(
            session = %self.id,
            snapshot = ?recovered.snapshot_index,
            replayed = recovered.replayed,
            "session recovered from storage"
        );
        self.notify_reset();
        Ok(recovered.snapshot_index)
    }

    fn notify_reset(&self) {
        for observer in &self.observers {
            observer.on_reset(&self.state);
        }
    }

    /// The durable log plus summary fields, ready to serialise.
    pub async fn export(&self) -> Result<ExportPayload, Error> {
        let events = self.store.read_stream(&self.id).await?.read_all().await?;
        Ok(transfer::export(&self.id, &self.state, events))
    }

    /// Who to wake tonight, in order.
    pub fn night_queue(&self) -> Vec<NightStep<'_>> {
        night_queue(&self.state, self.roles.as_ref())
    }

    /// Sum of the balance points of every assigned role.
    pub fn balance(&self) -> i32 {
        balance(&self.state, self.roles.as_ref())
    }
}
