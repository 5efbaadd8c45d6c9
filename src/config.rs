use crate::Error;

pub const SNAPSHOT_EVERY_VAR: &str = "NOCTURNE_SNAPSHOT_EVERY";
pub const SNAPSHOT_KEEP_VAR: &str = "NOCTURNE_SNAPSHOT_KEEP";

/// When to checkpoint and how many checkpoints to retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    every: usize,
    keep: usize,
}

impl SnapshotPolicy {
    /// Checkpoint after every `every`th committed event.
    pub fn every(&self) -> usize {
        self.every
    }

    /// Number of most recent checkpoints kept per session.
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Whether a log that just reached `committed` events should be checkpointed.
    pub fn is_due(&self, committed: usize) -> bool {
        committed > 0 && committed % self.every == 0
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self { every: 10, keep: 50 }
    }
}

/// Runtime configuration for a [`crate::Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    snapshots: SnapshotPolicy,
}

impl EngineConfig {
    pub fn snapshots(&self) -> SnapshotPolicy {
        self.snapshots
    }

    pub fn with_snapshot_every(mut self, every: usize) -> Result<Self, Error> {
        if every == 0 {
            return Err(Error::invalid_config(
                "snapshot_every",
                "snapshot_every cannot be 0",
            ));
        }
        self.snapshots.every = every;
        Ok(self)
    }

    pub fn with_snapshot_keep(mut self, keep: usize) -> Result<Self, Error> {
        if keep == 0 {
            return Err(Error::invalid_config(
                "snapshot_keep",
                "snapshot_keep cannot be 0",
            ));
        }
        self.snapshots.keep = keep;
        Ok(self)
    }

    /// Defaults overridden by `NOCTURNE_SNAPSHOT_EVERY` and
    /// `NOCTURNE_SNAPSHOT_KEEP` when they are set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(raw) = lookup(SNAPSHOT_EVERY_VAR) {
            config = config.with_snapshot_every(parse_count(SNAPSHOT_EVERY_VAR, &raw)?)?;
        }
        if let Some(raw) = lookup(SNAPSHOT_KEEP_VAR) {
            config = config.with_snapshot_keep(parse_count(SNAPSHOT_KEEP_VAR, &raw)?)?;
        }
        Ok(config)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, Error> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid_config(name, format!("{name} must be a positive integer, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_checkpoint_every_ten_and_keep_fifty() {
        let policy = EngineConfig::default().snapshots();
        assert_eq!(policy.every(), 10);
        assert_eq!(policy.keep(), 50);
        assert!(!policy.is_due(0));
        assert!(!policy.is_due(9));
        assert!(policy.is_due(10));
        assert!(policy.is_due(20));
    }

    #[test]
    fn rejects_zero() {
        match EngineConfig::default().with_snapshot_every(0) {
            Err(Error::InvalidConfig { message, parameter }) => {
                assert_eq!(message, "snapshot_every cannot be 0");
                assert_eq!(parameter, Some("snapshot_every".to_string()));
            }
            other => panic!("Expected InvalidConfig error, got {:?}", other),
        }
        assert!(EngineConfig::default().with_snapshot_keep(0).is_err());
    }

    #[test]
    fn reads_overrides_from_the_environment() {
        let config = EngineConfig::from_lookup(|name| match name {
            SNAPSHOT_EVERY_VAR => Some("3".into()),
            SNAPSHOT_KEEP_VAR => Some(" 7 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.snapshots().every(), 3);
        assert_eq!(config.snapshots().keep(), 7);
    }

    #[test]
    fn malformed_environment_values_are_rejected() {
        let result = EngineConfig::from_lookup(|name| {
            (name == SNAPSHOT_KEEP_VAR).then(|| "lots".to_string())
        });
        match result {
            Err(Error::InvalidConfig { parameter, .. }) => {
                assert_eq!(parameter.as_deref(), Some(SNAPSHOT_KEEP_VAR));
            }
            other => panic!("Expected InvalidConfig error, got {:?}", other),
        }
    }
}
