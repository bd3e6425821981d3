//! In-memory job store.
//!
//! This module provides a [`MemoryJobStore`] that keeps queued envelopes in
//! memory. It's useful for:
//! - Unit tests of the queue without touching the filesystem
//! - Single-process setups where enqueue and drain share one runtime

use async_trait::async_trait;
use chrono::Utc;
use dynsearch_core::{Envelope, JobStore, StoreError, StoredJob};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory job store.
///
/// Ids listed for a tag come back in insertion order.
///
/// # Example
///
/// ```rust
/// use dynsearch_store::MemoryJobStore;
/// use dynsearch_core::{DispatchType, Envelope, JobStore, Options, ResourceType};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryJobStore::new();
/// let envelope = Envelope::new("shop", DispatchType::Create, ResourceType::Object, 1, Options::new());
/// store.put(envelope.id(), &envelope, "queue").await?;
///
/// assert_eq!(store.list_ids_by_tag("queue").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    entries: Arc<RwLock<HashMap<String, StoredJob>>>,
    tags: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, across all tags.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, id: &str, envelope: &Envelope, tag: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let mut tags = self.tags.write().await;

        let job = StoredJob {
            id: id.to_string(),
            tag: tag.to_string(),
            stored_at: Utc::now(),
            envelope: envelope.clone(),
        };

        if let Some(previous) = entries.insert(id.to_string(), job) {
            if previous.tag == tag {
                return Ok(());
            }
            if let Some(ids) = tags.get_mut(&previous.tag) {
                ids.retain(|existing| existing != id);
            }
        }
        tags.entry(tag.to_string()).or_default().push(id.to_string());

        debug!("Stored job {} under tag {}", id, tag);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredJob>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let mut tags = self.tags.write().await;

        if let Some(job) = entries.remove(id) {
            if let Some(ids) = tags.get_mut(&job.tag) {
                ids.retain(|existing| existing != id);
            }
            debug!("Deleted job {}", id);
        }
        Ok(())
    }

    async fn list_ids_by_tag(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let tags = self.tags.read().await;
        Ok(tags.get(tag).cloned().unwrap_or_default())
    }
}
