//! Periodic checkpoints of derived state, and recovery from them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Timestamp;
use crate::config::SnapshotPolicy;
use crate::error::Error;
use crate::model::SessionId;
use crate::replay::{rebuild, replay_onto};
use crate::state::SessionState;
use crate::store::{EventStore, SnapshotStore};

/// Derived state as it was right after the log's `event_index`th event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session_id: SessionId,
    pub event_index: usize,
    pub created_at: Timestamp,
    pub state: SessionState,
}

/// Outcome of [`recover`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub state: SessionState,
    /// Number of events in the durable log.
    pub log_len: usize,
    /// Index of the checkpoint recovery started from, if one was usable.
    pub snapshot_index: Option<usize>,
    /// Events folded on top of the checkpoint (or from scratch).
    pub replayed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotManager {
    policy: SnapshotPolicy,
}

impl SnapshotManager {
    pub fn new(policy: SnapshotPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// Checkpoints `state` if a log of `committed` events is due for one.
    /// Returns the checkpoint's event index when one was taken.
    pub async fn maybe_snapshot<S: SnapshotStore>(
        &self,
        store: &mut S,
        session_id: &SessionId,
        state: &SessionState,
        committed: usize,
        now: Timestamp,
    ) -> Result<Option<usize>, Error> {
        if !self.policy.is_due(committed) {
            return Ok(None);
        }
        let event_index = committed - 1;
        self.checkpoint(store, session_id, state, event_index, now)
            .await?;
        Ok(Some(event_index))
    }

    /// Stores a checkpoint unconditionally, then prunes to the retention limit.
    pub async fn checkpoint<S: SnapshotStore>(
        &self,
        store: &mut S,
        session_id: &SessionId,
        state: &SessionState,
        event_index: usize,
        now: Timestamp,
    ) -> Result<(), Error> {
        store
            .save_snapshot(Snapshot {
                session_id: session_id.clone(),
                event_index,
                created_at: now,
                state: state.clone(),
            })
            .await?;
        let pruned = store.prune_snapshots(session_id, self.policy.keep()).await?;
        info!(session = %session_id, event_index, pruned, "snapshot taken");
        Ok(())
    }
}

/// Rebuilds a session from durable storage alone.
///
/// Without a usable checkpoint the whole log is replayed; otherwise only the
/// events after the checkpoint are folded onto its state. A checkpoint that
/// claims more events than the log holds is ignored.
pub async fn recover<S>(store: &S, session_id: &SessionId) -> Result<Recovered, Error>
where
    S: EventStore + SnapshotStore,
{
    let events = store.read_stream(session_id).await?.read_all().await?;
    let log_len = events.len();

    let recovered = match store.latest_snapshot(session_id).await? {
        Some(snapshot) if snapshot.event_index < log_len => {
            let tail: Vec<_> = events.into_iter().skip(snapshot.event_index + 1).collect();
            let replayed = tail.len();
            Recovered {
                state: replay_onto(snapshot.state, tail),
                log_len,
                snapshot_index: Some(snapshot.event_index),
                replayed,
            }
        }
        stale => {
            if let Some(snapshot) = stale {
                warn!(
                    session = %session_id,
                    event_index = snapshot.event_index,
                    log_len,
                    "ignoring snapshot beyond the end of the log"
                );
            }
            Recovered {
                state: rebuild(events),
                log_len,
                snapshot_index: None,
                replayed: log_len,
            }
        }
    };

    debug!(
        session = %session_id,
        snapshot = ?recovered.snapshot_index,
        replayed = recovered.replayed,
        "session recovered"
    );
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::event::{EventKind, GameEvent};
    use crate::model::{Player, PlayerId, Settings};
    use crate::store::MemoryStore;

    fn id() -> SessionId {
        SessionId::try_new("s1").unwrap()
    }

    fn events(count: usize) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::new(
            Timestamp::from_millis(1),
            EventKind::SessionCreated {
                session_id: id(),
                name: "Test".into(),
                settings: Settings::default(),
            },
        )];
        for n in 1..count {
            let player = Player::new(PlayerId::try_new(format!("p{n}")).unwrap(), format!("P{n}"));
            events.push(GameEvent::new(
                Timestamp::from_millis(n as i64 + 1),
                EventKind::PlayerAdded { player },
            ));
        }
        events
    }

    async fn store_with(events: &[GameEvent]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for event in events {
            store.append(&id(), event.clone()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn missing_sessions_are_reported() {
        let store = MemoryStore::new();
        assert!(matches!(
            recover(&store, &id()).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn without_a_checkpoint_the_whole_log_is_replayed() {
        let log = events(5);
        let store = store_with(&log).await;
        let recovered = recover(&store, &id()).await.unwrap();
        assert_eq!(recovered.state, rebuild(log));
        assert_eq!(recovered.snapshot_index, None);
        assert_eq!(recovered.replayed, 5);
    }

    #[tokio::test]
    async fn only_the_tail_after_a_checkpoint_is_replayed() {
        let log = events(12);
        let mut store = store_with(&log).await;
        let manager = SnapshotManager::default();
        let at_ten = rebuild(log[..10].to_vec());
        let taken = manager
            .maybe_snapshot(&mut store, &id(), &at_ten, 10, Timestamp::from_millis(99))
            .await
            .unwrap();
        assert_eq!(taken, Some(9));

        let recovered = recover(&store, &id()).await.unwrap();
        assert_eq!(recovered.snapshot_index, Some(9));
        assert_eq!(recovered.replayed, 2);
        assert_eq!(recovered.state, rebuild(log));
    }

    #[tokio::test]
    async fn checkpoints_are_only_taken_when_due() {
        let mut store = MemoryStore::new();
        let manager = SnapshotManager::default();
        let state = SessionState::empty();
        for committed in [1, 9, 11] {
            let taken = manager
                .maybe_snapshot(&mut store, &id(), &state, committed, Timestamp::default())
                .await
                .unwrap();
            assert_eq!(taken, None);
        }
        assert!(store.latest_snapshot(&id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retention_keeps_the_most_recent() {
        let policy = EngineConfig::default()
            .with_snapshot_every(1)
            .unwrap()
            .with_snapshot_keep(2)
            .unwrap()
            .snapshots();
        let manager = SnapshotManager::new(policy);
        let mut store = MemoryStore::new();
        let state = SessionState::empty();
        for committed in 1..=4 {
            manager
                .maybe_snapshot(&mut store, &id(), &state, committed, Timestamp::default())
                .await
                .unwrap();
        }
        assert_eq!(store.snapshot_indices(&id()), vec![2, 3]);
    }

    #[tokio::test]
    async fn stale_checkpoints_are_ignored() {
        let log = events(3);
        let mut store = store_with(&log).await;
        SnapshotManager::default()
            .checkpoint(&mut store, &id(), &SessionState::empty(), 7, Timestamp::default())
            .await
            .unwrap();
        let recovered = recover(&store, &id()).await.unwrap();
        assert_eq!(recovered.snapshot_index, None);
        assert_eq!(recovered.state, rebuild(log));
    }
}
