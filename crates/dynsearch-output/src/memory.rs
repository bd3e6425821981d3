//! In-memory output channel.
//!
//! This module provides a [`MemoryIndexProvider`] that keeps indexed documents
//! in memory. It's useful for:
//! - Testing the pipeline without a search engine
//! - Inspecting what a context would send to its index

use async_trait::async_trait;
use dynsearch_core::{ContextDefinition, IndexDocument, IndexProvider, ProviderError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Operation counters of a [`MemoryIndexProvider`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

/// In-memory index, one document map per context.
///
/// # Example
///
/// ```rust
/// use dynsearch_output::MemoryIndexProvider;
/// use dynsearch_core::{ContextDefinition, IndexDocument, IndexProvider, Options, ResourceMeta, ResourceType};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = MemoryIndexProvider::new();
/// let context = ContextDefinition::new("shop");
/// let meta = ResourceMeta::new("object_1", ResourceType::Object, 1);
///
/// provider.execute_insert(&context, &IndexDocument::new(Some(meta), Options::new())).await?;
/// assert_eq!(provider.len("shop").await, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryIndexProvider {
    documents: Arc<RwLock<HashMap<String, HashMap<String, IndexDocument>>>>,
    stats: Arc<RwLock<ProviderStats>>,
}

impl MemoryIndexProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch one indexed document.
    pub async fn document(&self, context: &str, document_id: &str) -> Option<IndexDocument> {
        let documents = self.documents.read().await;
        documents
            .get(context)
            .and_then(|docs| docs.get(document_id))
            .cloned()
    }

    /// Ids of all documents indexed for a context, sorted.
    pub async fn document_ids(&self, context: &str) -> Vec<String> {
        let documents = self.documents.read().await;
        let mut ids: Vec<String> = documents
            .get(context)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Number of documents indexed for a context.
    pub async fn len(&self, context: &str) -> usize {
        let documents = self.documents.read().await;
        documents.get(context).map_or(0, HashMap::len)
    }

    pub async fn stats(&self) -> ProviderStats {
        *self.stats.read().await
    }

    fn document_id(document: &IndexDocument) -> Result<String, String> {
        document
            .document_id()
            .map(str::to_string)
            .ok_or_else(|| "document has no resource meta".to_string())
    }

    async fn store(&self, context: &ContextDefinition, document: &IndexDocument, id: String) {
        let mut documents = self.documents.write().await;
        documents
            .entry(context.name.clone())
            .or_default()
            .insert(id, document.clone());
    }
}

#[async_trait]
impl IndexProvider for MemoryIndexProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute_insert(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        let id = Self::document_id(document).map_err(ProviderError::Insert)?;
        debug!(context = %context.name, "Inserting document {}", id);
        self.store(context, document, id).await;
        self.stats.write().await.inserts += 1;
        Ok(())
    }

    async fn execute_update(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        let id = Self::document_id(document).map_err(ProviderError::Update)?;
        debug!(context = %context.name, "Updating document {}", id);
        self.store(context, document, id).await;
        self.stats.write().await.updates += 1;
        Ok(())
    }

    async fn execute_delete(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        let id = Self::document_id(document).map_err(ProviderError::Delete)?;
        let removed = {
            let mut documents = self.documents.write().await;
            documents
                .get_mut(&context.name)
                .and_then(|docs| docs.remove(&id))
                .is_some()
        };
        debug!(context = %context.name, "Deleted document {} (present: {})", id, removed);
        self.stats.write().await.deletes += 1;
        Ok(())
    }
}
