//! JSON-lines analytics sink with size-capped rotation.
//!
//! One collected event per line. With a size cap set, a write that would push
//! the active file past the cap first moves it to `<file>.1` (replacing the
//! previous rotation) and starts a fresh file, so at most two files exist.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::SinkError;
use crate::event::CollectedEvent;
use crate::sink::AnalyticsSink;

const SINK_NAME: &str = "file";

/// Appends events to a JSON-lines file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    max_bytes: Option<u64>,
    active: Mutex<ActiveFile>,
}

#[derive(Debug)]
struct ActiveFile {
    file: File,
    len: u64,
}

impl ActiveFile {
    async fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| failure(format!("cannot open '{}': {e}", path.display())))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| failure(format!("cannot stat '{}': {e}", path.display())))?
            .len();
        Ok(Self { file, len })
    }
}

impl FileSink {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::BackendFailure`] if the file cannot be opened, so
    /// a bad path is caught at startup rather than on the first event.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let active = ActiveFile::open(&path).await?;
        Ok(Self {
            path,
            max_bytes: None,
            active: Mutex::new(active),
        })
    }

    /// Rotate once the active file would exceed `max_bytes`. Zero disables.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = (max_bytes > 0).then_some(max_bytes);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the previous file goes on rotation.
    #[must_use]
    pub fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".1");
        PathBuf::from(name)
    }

    async fn rotate(&self, active: &mut ActiveFile) -> Result<(), SinkError> {
        let rotated = self.rotated_path();
        tokio::fs::rename(&self.path, &rotated)
            .await
            .map_err(|e| failure(format!("cannot rotate to '{}': {e}", rotated.display())))?;
        let previous = active.len;
        *active = ActiveFile::open(&self.path).await?;
        info!(
            path = %self.path.display(),
            rotated_bytes = previous,
            "analytics file rotated"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnalyticsSink for FileSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn record(&self, event: &CollectedEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event).map_err(|e| SinkError::Serialization {
            reason: e.to_string(),
        })?;
        line.push(b'\n');
        let line_len = u64::try_from(line.len()).unwrap_or(u64::MAX);

        let mut active = self.active.lock().await;
        let over_cap = self
            .max_bytes
            .is_some_and(|cap| active.len > 0 && active.len.saturating_add(line_len) > cap);
        if over_cap {
            self.rotate(&mut active).await?;
        }

        active
            .file
            .write_all(&line)
            .await
            .map_err(|e| failure(format!("write failed: {e}")))?;
        active
            .file
            .flush()
            .await
            .map_err(|e| failure(format!("flush failed: {e}")))?;
        active.len += line_len;
        Ok(())
    }
}

fn failure(reason: String) -> SinkError {
    SinkError::BackendFailure {
        name: SINK_NAME.to_owned(),
        reason,
    }
}
