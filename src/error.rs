/// Error types for the nocturne engine.
///
/// The reducer, replay and the resolvers never fail. Everything here comes from
/// the edges: storage, the wire format, imports, command validation and
/// configuration.
use std::fmt::Debug;
use thiserror::Error;

use crate::event::WireError;
use crate::model::SessionId;
use crate::transfer::ImportError;

/// Represents errors that can occur while running a session
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates a failure to (de)serialize a snapshot, record or export
    #[error(transparent)]
    Serialization(#[from] serde_json::error::Error),

    /// Indicates a stored event whose envelope could not be read
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Indicates a failure of the durable store
    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),

    /// Indicates that no durable log exists for the session
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Indicates that a session with the same id already has a log
    #[error("Session already exists: {0}")]
    SessionExists(SessionId),

    /// Indicates an import payload that failed validation; nothing was written
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Indicates a command that was rejected before any event was produced
    #[error("Command failed: {message}")]
    CommandFailed {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Indicates a rollback target past the end of the log
    #[error("Cannot roll back to event {keep_until}: the log holds {len} events")]
    RollbackOutOfRange { keep_until: usize, len: usize },

    /// Indicates an invalid configuration parameter
    #[error("Invalid configuration{}: {message}", parameter.as_ref().map(|p| format!(" parameter '{p}'")).unwrap_or_default())]
    InvalidConfig {
        message: String,
        parameter: Option<String>,
    },
}

impl Error {
    /// Whether retrying the same operation later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub(crate) fn invalid_config(parameter: &str, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
            parameter: Some(parameter.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failures_are_transient() {
        let io = Error::from(std::io::Error::other("disk full"));
        assert!(io.is_transient());

        let missing = Error::SessionNotFound(SessionId::try_new("s1").unwrap());
        assert!(!missing.is_transient());
    }

    #[test]
    fn invalid_config_names_the_parameter() {
        let error = Error::invalid_config("snapshot_every", "snapshot_every cannot be 0");
        assert_eq!(
            error.to_string(),
            "Invalid configuration parameter 'snapshot_every': snapshot_every cannot be 0"
        );
    }
}
