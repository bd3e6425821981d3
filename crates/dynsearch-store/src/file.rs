//! File-backed job store.
//!
//! Every job lives in its own `<id>.json` file inside the store directory, so
//! enqueueing and draining may happen in different processes. Writes go to a
//! hidden temp file first and are renamed into place.

use async_trait::async_trait;
use chrono::Utc;
use dynsearch_core::{Envelope, JobStore, StoreError, StoredJob};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

/// Durable job store keeping one JSON file per job.
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    /// Create a store rooted at `dir`. The directory is created on [`init`](Self::init)
    /// or on the first write.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the store directory.
    pub async fn init(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Init(format!("{}: {e}", self.dir.display())))?;
        debug!("FileJobStore initialized at {:?}", self.dir);
        Ok(())
    }

    fn entry_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::Put(format!("invalid job id \"{id}\"")));
        }
        Ok(self.dir.join(format!("{id}.{ENTRY_EXTENSION}")))
    }

    async fn read_entry(&self, path: &Path, id: &str) -> Result<Option<StoredJob>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Get(format!("{id}: {e}"))),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn put(&self, id: &str, envelope: &Envelope, tag: &str) -> Result<(), StoreError> {
        let path = self.entry_path(id)?;
        self.init().await?;

        let job = StoredJob {
            id: id.to_string(),
            tag: tag.to_string(),
            stored_at: Utc::now(),
            envelope: envelope.clone(),
        };
        let json = serde_json::to_vec_pretty(&job).map_err(|e| StoreError::Put(e.to_string()))?;

        let tmp_path = self.dir.join(format!(".{id}.{ENTRY_EXTENSION}.tmp"));
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| StoreError::Put(format!("{id}: {e}")))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::Put(format!("{id}: {e}")))?;

        debug!("Stored job {} under tag {}", id, tag);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredJob>, StoreError> {
        let path = self
            .entry_path(id)
            .map_err(|_| StoreError::Get(format!("invalid job id \"{id}\"")))?;
        self.read_entry(&path, id).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self
            .entry_path(id)
            .map_err(|_| StoreError::Delete(format!("invalid job id \"{id}\"")))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted job {}", id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete(format!("{id}: {e}"))),
        }
    }

    async fn list_ids_by_tag(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::List(format!("{}: {e}", self.dir.display()))),
        };

        let mut stream = ReadDirStream::new(entries);
        let mut found = Vec::new();

        while let Some(entry) = stream.next().await {
            let entry = entry.map_err(|e| StoreError::List(e.to_string()))?;
            let path = entry.path();

            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.starts_with('.'))
                .map(str::to_string)
            else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            match self.read_entry(&path, &id).await {
                Ok(Some(job)) if job.tag == tag => found.push((job.stored_at, id)),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable job file {:?}: {}", path, e),
            }
        }

        // Directory order is arbitrary; present entries oldest-stored first
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }
}
