//! Core traits for dynsearch components.
//!
//! This module defines the trait interfaces the pipeline is assembled from:
//!
//! - [`JobStore`]: Durable, tag-indexed storage of pending envelopes
//! - [`ResourceResolver`]: Lookup of content items by type and id
//! - [`ResourceNormalizer`]: Expansion of a resource into index-level identities
//! - [`FieldTransformer`]: One step of a field transformer chain
//! - [`TransformerWorkflowProcessor`]: Conversion of a normalized resource into an [`IndexDocument`]
//! - [`IndexProvider`]: An output channel backed by a search index
//!
//! Implementations are shared as `Arc<dyn Trait>` so stores, repositories and
//! output channels can be swapped without touching the queue.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{NormalizerError, ProviderError, StoreError, TransformerError};
use crate::types::{
    ContextDefinition, Envelope, IndexDocument, NormalizedResource, Resource,
    ResourceContainer, ResourceType, StoredJob,
};

// ============================================================================
// Job Storage
// ============================================================================

/// Durable store of pending envelopes.
///
/// Every operation is atomic for a single entry. `delete` is idempotent:
/// removing an id that is not present is not an error.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store an envelope under `id`, tagged for bulk lookup.
    async fn put(&self, id: &str, envelope: &Envelope, tag: &str) -> Result<(), StoreError>;

    /// Fetch an entry.
    async fn get(&self, id: &str) -> Result<Option<StoredJob>, StoreError>;

    /// Remove an entry.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Ids of all entries carrying `tag`.
    async fn list_ids_by_tag(&self, tag: &str) -> Result<Vec<String>, StoreError>;
}

// ============================================================================
// Resources
// ============================================================================

/// Lookup of content items, one method per resource type.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn find_asset(&self, id: u64) -> Option<Resource>;

    async fn find_document(&self, id: u64) -> Option<Resource>;

    async fn find_object(&self, id: u64) -> Option<Resource>;

    /// Resolve a resource of any known type.
    async fn resolve(&self, resource_type: ResourceType, id: u64) -> Option<Resource> {
        match resource_type {
            ResourceType::Asset => self.find_asset(id).await,
            ResourceType::Document => self.find_document(id).await,
            ResourceType::Object => self.find_object(id).await,
        }
    }
}

/// Expands a resource reference into the index-level identities it produces.
#[async_trait]
pub trait ResourceNormalizer: Send + Sync {
    /// Name the normalizer is registered under.
    fn name(&self) -> &str;

    /// Normalize a resource into an ordered resource stack.
    async fn normalize_to_resource_stack(
        &self,
        context: &ContextDefinition,
        container: &ResourceContainer,
    ) -> Result<Vec<NormalizedResource>, NormalizerError>;
}

// ============================================================================
// Transformation
// ============================================================================

/// One step of a field transformer chain.
pub trait FieldTransformer: Send + Sync {
    /// Name the transformer is referenced by in field definitions.
    fn name(&self) -> &str;

    /// Transform a value. `Ok(None)` drops the field.
    fn transform(&self, value: Value) -> Result<Option<Value>, TransformerError>;
}

/// Converts a normalized resource into an [`IndexDocument`].
///
/// Must be deterministic for identical input.
#[async_trait]
pub trait TransformerWorkflowProcessor: Send + Sync {
    /// Build the document. `Ok(None)` means there is nothing to index.
    async fn dispatch_index_document_transform(
        &self,
        context: &ContextDefinition,
        data: &NormalizedResource,
    ) -> Result<Option<IndexDocument>, TransformerError>;
}

// ============================================================================
// Output
// ============================================================================

/// An output channel that writes documents to a backing index.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Name the provider is registered under.
    fn name(&self) -> &str;

    /// Add a document to the index.
    async fn execute_insert(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError>;

    /// Replace a document in the index.
    async fn execute_update(
        &self,
        _context: &ContextDefinition,
        _document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(crate::types::DispatchType::Update))
    }

    /// Remove a document from the index.
    async fn execute_delete(
        &self,
        _context: &ContextDefinition,
        _document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(crate::types::DispatchType::Delete))
    }
}
