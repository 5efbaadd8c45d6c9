//! An event-sourced rules engine for moderating werewolf-style party games.
//!
//! Every change to a session is a [`GameEvent`] appended to a durable log.
//! [`SessionState`] is always derived by folding that log, so any prefix of it
//! can be replayed into exactly the state the moderator saw at the time. A
//! [`Session`] ties the pieces together: it turns commands into events,
//! commits them to an [`store::EventStore`], checkpoints periodically and
//! resolves nights, days and wins.
//!
//! ```rust
//! use nocturne::command::{AddPlayer, AssignRoles, CompleteIntroNight};
//! use nocturne::store::MemoryStore;
//! use nocturne::{PlayerId, RoleId, Session, SessionOptions};
//! use nocturne::command::CreateSession;
//!
//! # async fn example() -> Result<(), nocturne::Error> {
//! let mut session =
//!     Session::create(MemoryStore::new(), CreateSession::new("Friday"), SessionOptions::default())
//!         .await?;
//!
//! let ann = PlayerId::try_new("ann").unwrap();
//! session.execute(AddPlayer::with_id(ann.clone(), "Ann")).await?;
//! session
//!     .execute(AssignRoles::new([(ann, RoleId::try_new("seer").unwrap())]))
//!     .await?;
//! session.execute(CompleteIntroNight).await?;
//!
//! if let Some(victory) = session.end_day().await? {
//!     println!("{}", victory.reason);
//! }
//! # Ok(())
//! # }
//! ```

mod clock;
pub mod command;
mod config;
mod error;
mod event;
mod model;
mod night_queue;
mod replay;
pub mod resolve;
mod roles;
mod session;
mod snapshot;
mod state;
pub mod store;
mod transfer;
mod win;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use command::{AggregateState, Command, CommandError};
pub use config::{EngineConfig, SNAPSHOT_EVERY_VAR, SNAPSHOT_KEEP_VAR, SnapshotPolicy};
pub use error::Error;
pub use event::{
    EliminationCause, Event, EventKind, GameEvent, RoleAssignment, SeatAssignment, WireError,
};
pub use model::{
    DetectMode, LogEntry, MartyrMode, MetaValue, NightAction, PayloadValue, Phase, Player,
    PlayerId, PlayerPatch, RepeatProtect, RevealMode, RoleId, SessionId, Settings, Stage, Status,
    StatusKind, StatusMeta, Team, VampireKillTiming, Vote, WolfCubRevenge,
};
pub use night_queue::{NightStep, night_queue};
pub use replay::{rebuild, rebuild_prefix, replay_onto};
pub use roles::{ActionField, ActionSchema, Catalogue, RoleRecord, RoleRegistry, balance, ids as role_ids};
pub use session::{Session, SessionObserver, SessionOptions};
pub use snapshot::{Recovered, Snapshot, SnapshotManager, recover};
pub use state::SessionState;
pub use transfer::{ExportPayload, ImportError, Violation, export, validate};
pub use win::{Victory, Winner, evaluate};
