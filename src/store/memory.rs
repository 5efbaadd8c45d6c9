use std::collections::HashMap;

use crate::error::Error;
use crate::event::GameEvent;
use crate::model::SessionId;
use crate::snapshot::Snapshot;
use crate::store::{EventStore, EventStream, SessionSummary, SnapshotStore, sort_summaries};

/// Keeps everything in process memory. Used by tests and by hosts that persist
/// through an export.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    logs: HashMap<SessionId, Vec<GameEvent>>,
    /// Per session, in creation order.
    snapshots: HashMap<SessionId, Vec<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event indices of the retained checkpoints, oldest first.
    pub fn snapshot_indices(&self, session_id: &SessionId) -> Vec<usize> {
        self.snapshots
            .get(session_id)
            .map(|snapshots| snapshots.iter().map(|snapshot| snapshot.event_index).collect())
            .unwrap_or_default()
    }
}

impl EventStore for MemoryStore {
    async fn append(&mut self, session_id: &SessionId, event: GameEvent) -> Result<(), Error> {
        self.logs.entry(session_id.clone()).or_default().push(event);
        Ok(())
    }

    async fn create_log(
        &mut self,
        session_id: &SessionId,
        events: Vec<GameEvent>,
    ) -> Result<(), Error> {
        if self.logs.contains_key(session_id) {
            return Err(Error::SessionExists(session_id.clone()));
        }
        self.logs.insert(session_id.clone(), events);
        Ok(())
    }

    async fn read_stream(&self, session_id: &SessionId) -> Result<EventStream, Error> {
        self.logs
            .get(session_id)
            .map(|events| EventStream::from_events(events.clone()))
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))
    }

    async fn truncate(&mut self, session_id: &SessionId, keep_until: usize) -> Result<(), Error> {
        let log = self
            .logs
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;
        log.truncate(keep_until.saturating_add(1));
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, Error> {
        let mut summaries: Vec<_> = self
            .logs
            .iter()
            .map(|(id, events)| SessionSummary::from_log(id.clone(), events))
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

impl SnapshotStore for MemoryStore {
    async fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<(), Error> {
        self.snapshots
            .entry(snapshot.session_id.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn latest_snapshot(&self, session_id: &SessionId) -> Result<Option<Snapshot>, Error> {
        Ok(self.snapshots.get(session_id).and_then(|snapshots| {
            snapshots
                .iter()
                .max_by_key(|snapshot| snapshot.event_index)
                .cloned()
        }))
    }

    async fn prune_snapshots(&mut self, session_id: &SessionId, keep: usize) -> Result<usize, Error> {
        let Some(snapshots) = self.snapshots.get_mut(session_id) else {
            return Ok(0);
        };
        let excess = snapshots.len().saturating_sub(keep);
        snapshots.drain(..excess);
        Ok(excess)
    }

    async fn discard_snapshots_after(
        &mut self,
        session_id: &SessionId,
        event_index: usize,
    ) -> Result<usize, Error> {
        let Some(snapshots) = self.snapshots.get_mut(session_id) else {
            return Ok(0);
        };
        let before = snapshots.len();
        snapshots.retain(|snapshot| snapshot.event_index <= event_index);
        Ok(before - snapshots.len())
    }
}
