use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use futures::{StreamExt, stream};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_stream::wrappers::ReadDirStream;
use tracing::warn;

use crate::error::Error;
use crate::event::{EventKind, GameEvent};
use crate::model::SessionId;
use crate::snapshot::Snapshot;
use crate::store::{EventStore, EventStream, SessionSummary, SnapshotStore, sort_summaries};

/// Stores each session as a JSON-lines log plus one JSON file per checkpoint:
///
/// ```text
/// <root>/logs/<session>.jsonl
/// <root>/snapshots/<session>/<event index>.json
/// ```
///
/// Appends go straight to the end of the log. A crash part way through an
/// append leaves an unterminated last line; readers skip it and the next
/// append cuts it off first. Anything that rewrites a file
/// (truncation, imports, checkpoints) writes a temporary file and renames it
/// into place, so a crash leaves either the old or the new content.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let store = Self { root: root.into() };
        fs::create_dir_all(store.logs_dir()).await?;
        fs::create_dir_all(store.root.join("snapshots")).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    fn log_path(&self, session_id: &SessionId) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.jsonl", file_stem(session_id)))
    }

    fn snapshot_dir(&self, session_id: &SessionId) -> PathBuf {
        self.root.join("snapshots").join(file_stem(session_id))
    }

    fn snapshot_path(&self, session_id: &SessionId, event_index: usize) -> PathBuf {
        self.snapshot_dir(session_id)
            .join(format!("{event_index:012}.json"))
    }
}

/// Session ids are free text; anything outside `[A-Za-z0-9_-]` is
/// percent-encoded so the id is always a single safe path component.
fn file_stem(session_id: &SessionId) -> String {
    let raw: &str = session_id.as_ref();
    let mut stem = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), Error> {
    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn encode_lines(events: &[GameEvent]) -> Result<Vec<u8>, Error> {
    let mut data = Vec::new();
    for event in events {
        serde_json::to_writer(&mut data, event)?;
        data.push(b'\n');
    }
    Ok(data)
}

/// Decodes a log. Every complete line must parse; text after the last newline
/// is the remains of an interrupted append and is skipped.
fn decode_log(path: &Path, raw: &str) -> Vec<Result<GameEvent, Error>> {
    let (complete, torn) = match raw.rfind('\n') {
        Some(end) => raw.split_at(end + 1),
        None => ("", raw),
    };
    if !torn.trim().is_empty() {
        warn!(path = %path.display(), bytes = torn.len(), "ignoring unterminated log line");
    }
    complete
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

async fn read_log(path: &Path) -> Result<Vec<GameEvent>, Error> {
    let raw = fs::read_to_string(path).await?;
    decode_log(path, &raw).into_iter().collect()
}

/// Cuts an unterminated last line off an open log.
async fn drop_torn_tail(file: &mut File, path: &Path) -> Result<(), Error> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1)).await?;
    if file.read_u8().await? == b'\n' {
        return Ok(());
    }
    file.seek(SeekFrom::Start(0)).await?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw).await?;
    let keep = raw
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |end| end + 1);
    warn!(
        path = %path.display(),
        bytes = raw.len() - keep,
        "cutting unterminated log line before append"
    );
    file.set_len(keep as u64).await?;
    Ok(())
}

fn not_found(error: &std::io::Error) -> bool {
    error.kind() == ErrorKind::NotFound
}

/// Indices of the checkpoints stored in `dir`, ascending. Stray files are
/// ignored.
async fn snapshot_indices(dir: &Path) -> Result<Vec<usize>, Error> {
    let entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if not_found(&error) => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };
    let mut indices = Vec::new();
    let mut entries = ReadDirStream::new(entries);
    while let Some(entry) = entries.next().await {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(index) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse().ok())
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

impl EventStore for FileStore {
    async fn append(&mut self, session_id: &SessionId, event: GameEvent) -> Result<(), Error> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        let path = self.log_path(session_id);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;
        drop_torn_tail(&mut file, &path).await?;
        file.write_all(&line).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn create_log(
        &mut self,
        session_id: &SessionId,
        events: Vec<GameEvent>,
    ) -> Result<(), Error> {
        let path = self.log_path(session_id);
        if fs::try_exists(&path).await? {
            return Err(Error::SessionExists(session_id.clone()));
        }
        atomic_write(&path, &encode_lines(&events)?).await
    }

    async fn read_stream(&self, session_id: &SessionId) -> Result<EventStream, Error> {
        let path = self.log_path(session_id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if not_found(&error) => {
                return Err(Error::SessionNotFound(session_id.clone()));
            }
            Err(error) => return Err(error.into()),
        };
        Ok(EventStream::new(stream::iter(decode_log(&path, &raw))))
    }

    async fn truncate(&mut self, session_id: &SessionId, keep_until: usize) -> Result<(), Error> {
        let path = self.log_path(session_id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if not_found(&error) => {
                return Err(Error::SessionNotFound(session_id.clone()));
            }
            Err(error) => return Err(error.into()),
        };
        let complete = raw.rfind('\n').map_or("", |end| &raw[..=end]);
        let mut kept = String::with_capacity(complete.len());
        for line in complete
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(keep_until.saturating_add(1))
        {
            kept.push_str(line);
            kept.push('\n');
        }
        atomic_write(&path, kept.as_bytes()).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, Error> {
        let mut summaries = Vec::new();
        let mut entries = ReadDirStream::new(fs::read_dir(self.logs_dir()).await?);
        while let Some(entry) = entries.next().await {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            let events = read_log(&path).await?;
            let id = events.iter().find_map(|event| match &event.kind {
                EventKind::SessionCreated { session_id, .. } => Some(session_id.clone()),
                _ => None,
            });
            match id {
                Some(id) => summaries.push(SessionSummary::from_log(id, &events)),
                None => warn!(path = %path.display(), "skipping log without session_created"),
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

impl SnapshotStore for FileStore {
    async fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<(), Error> {
        fs::create_dir_all(self.snapshot_dir(&snapshot.session_id)).await?;
        let path = self.snapshot_path(&snapshot.session_id, snapshot.event_index);
        atomic_write(&path, &serde_json::to_vec(&snapshot)?).await
    }

    async fn latest_snapshot(&self, session_id: &SessionId) -> Result<Option<Snapshot>, Error> {
        let Some(latest) = snapshot_indices(&self.snapshot_dir(session_id))
            .await?
            .last()
            .copied()
        else {
            return Ok(None);
        };
        let raw = fs::read(self.snapshot_path(session_id, latest)).await?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Checkpoints are ranked by event index, which matches creation order as
    /// long as rollbacks discard the ones they invalidate.
    async fn prune_snapshots(&mut self, session_id: &SessionId, keep: usize) -> Result<usize, Error> {
        let indices = snapshot_indices(&self.snapshot_dir(session_id)).await?;
        let excess = indices.len().saturating_sub(keep);
        for index in &indices[..excess] {
            fs::remove_file(self.snapshot_path(session_id, *index)).await?;
        }
        Ok(excess)
    }

    async fn discard_snapshots_after(
        &mut self,
        session_id: &SessionId,
        event_index: usize,
    ) -> Result<usize, Error> {
        let mut removed = 0;
        for index in snapshot_indices(&self.snapshot_dir(session_id)).await? {
            if index > event_index {
                fs::remove_file(self.snapshot_path(session_id, index)).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
