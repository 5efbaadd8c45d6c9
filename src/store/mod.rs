//! Durable storage for session logs and snapshots.
//!
//! The log is the source of truth: append-only, except for the destructive
//! [`EventStore::truncate`] a rollback performs. Snapshots are a cache and may
//! be thrown away at any time.
//!
//! # Examples
//!
//! ```rust
//! use nocturne::store::{EventStore, MemoryStore};
//! use nocturne::{EventKind, GameEvent, SessionId, Timestamp};
//!
//! # async fn example() -> Result<(), nocturne::Error> {
//! let mut store = MemoryStore::new();
//! let id = SessionId::try_new("game-1").unwrap();
//!
//! store
//!     .append(&id, GameEvent::new(Timestamp::from_millis(1), EventKind::DayVotesReset))
//!     .await?;
//!
//! let mut stream = store.read_stream(&id).await?;
//! while let Some((event, index)) = stream.next().await? {
//!     println!("event {index}: {}", event.kind.tag());
//! }
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::Error;
use crate::event::{EventKind, GameEvent};
use crate::model::SessionId;
use crate::snapshot::Snapshot;

/// A session as listed on the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub event_count: usize,
}

impl SessionSummary {
    /// Summarises a log. Name and creation time come from its
    /// `session_created` event; the last event dates the update.
    pub fn from_log(id: SessionId, events: &[GameEvent]) -> Self {
        let name = events
            .iter()
            .find_map(|event| match &event.kind {
                EventKind::SessionCreated { name, .. } => Some(name.clone()),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            id,
            name,
            created_at: events.first().map(|event| event.timestamp).unwrap_or_default(),
            updated_at: events.last().map(|event| event.timestamp).unwrap_or_default(),
            event_count: events.len(),
        }
    }
}

/// Most recently updated first.
pub(crate) fn sort_summaries(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}

/// A session's durable events in log order, each paired with its index.
pub struct EventStream {
    inner: BoxStream<'static, Result<GameEvent, Error>>,
    next_index: usize,
}

impl EventStream {
    pub fn new(inner: impl Stream<Item = Result<GameEvent, Error>> + Send + 'static) -> Self {
        Self {
            inner: inner.boxed(),
            next_index: 0,
        }
    }

    pub fn from_events(events: Vec<GameEvent>) -> Self {
        Self::new(stream::iter(events.into_iter().map(Ok)))
    }

    pub async fn next(&mut self) -> Result<Option<(GameEvent, usize)>, Error> {
        match self.inner.next().await {
            None => Ok(None),
            Some(result) => {
                let event = result?;
                let index = self.next_index;
                self.next_index += 1;
                Ok(Some((event, index)))
            }
        }
    }

    /// Drains the stream into a vector.
    pub async fn read_all(mut self) -> Result<Vec<GameEvent>, Error> {
        let mut events = Vec::new();
        while let Some((event, _)) = self.next().await? {
            events.push(event);
        }
        Ok(events)
    }
}

pub trait EventStore {
    /// Appends one event to the session's log, creating the log on first use.
    fn append(
        &mut self,
        session_id: &SessionId,
        event: GameEvent,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Writes a complete log for a new session in one step. Fails with
    /// [`Error::SessionExists`] if the session already has a log.
    fn create_log(
        &mut self,
        session_id: &SessionId,
        events: Vec<GameEvent>,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fails with [`Error::SessionNotFound`] if the session has no log.
    fn read_stream(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<EventStream, Error>> + Send;

    /// Keeps events `0..=keep_until` and drops the rest for good.
    fn truncate(
        &mut self,
        session_id: &SessionId,
        keep_until: usize,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Every stored session, most recently updated first.
    fn list_sessions(&self) -> impl Future<Output = Result<Vec<SessionSummary>, Error>> + Send;
}

pub trait SnapshotStore {
    fn save_snapshot(&mut self, snapshot: Snapshot) -> impl Future<Output = Result<(), Error>> + Send;

    /// The checkpoint with the highest event index, if any.
    fn latest_snapshot(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Snapshot>, Error>> + Send;

    /// Keeps the `keep` most recent checkpoints; returns how many were removed.
    fn prune_snapshots(
        &mut self,
        session_id: &SessionId,
        keep: usize,
    ) -> impl Future<Output = Result<usize, Error>> + Send;

    /// Drops every checkpoint taken after `event_index`; returns how many were
    /// removed.
    fn discard_snapshots_after(
        &mut self,
        session_id: &SessionId,
        event_index: usize,
    ) -> impl Future<Output = Result<usize, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_numbers_events_from_zero() {
        let events = vec![
            GameEvent::new(Timestamp::from_millis(1), EventKind::DayVotesReset),
            GameEvent::new(Timestamp::from_millis(2), EventKind::NightActionsReset),
        ];
        let mut stream = EventStream::from_events(events.clone());
        assert_eq!(stream.next().await.unwrap(), Some((events[0].clone(), 0)));
        assert_eq!(stream.next().await.unwrap(), Some((events[1].clone(), 1)));
        assert_eq!(stream.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_surfaces_read_errors() {
        let failing = stream::iter(vec![Err(Error::from(std::io::Error::other("gone")))]);
        let mut stream = EventStream::new(failing);
        assert!(matches!(stream.next().await, Err(Error::Storage(_))));
    }

    #[test]
    fn summary_reads_name_and_times_from_the_log() {
        let id = SessionId::try_new("s1").unwrap();
        let events = vec![
            GameEvent::new(
                Timestamp::from_millis(10),
                EventKind::SessionCreated {
                    session_id: id.clone(),
                    name: "Friday".into(),
                    settings: Default::default(),
                },
            ),
            GameEvent::new(Timestamp::from_millis(25), EventKind::DayVotesReset),
        ];
        let summary = SessionSummary::from_log(id, &events);
        assert_eq!(summary.name, "Friday");
        assert_eq!(summary.created_at, Timestamp::from_millis(10));
        assert_eq!(summary.updated_at, Timestamp::from_millis(25));
        assert_eq!(summary.event_count, 2);
    }
}
