//! Queue manager.
//!
//! Accepts change notifications, persists them as [`Envelope`]s in a
//! [`JobStore`] and hands them back deduplicated on drain. Store failures never
//! leave this module: they are logged and turned into empty or no-op results.

use dynsearch_core::{
    Configuration, ContextDefinition, DispatchType, Envelope, JobStore, NormalizedResource,
    NormalizerError, Options, Resource, ResourceContainer, ResourceMeta, ResourceNormalizer,
    ResourceResolver, ResourceType, StoredJob, REMOVABLE_DOCUMENTS_OPTION,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tag every envelope of this queue is stored under.
pub const QUEUE_IDENTIFIER: &str = "dynamic_search_index_queue";

/// Drained envelopes, grouped by context name, then by dispatch type.
///
/// Within a bucket envelopes are ordered newest first.
pub type ActiveEnvelopes = BTreeMap<String, BTreeMap<DispatchType, Vec<Envelope>>>;

/// Queue of pending index changes.
pub struct QueueManager {
    /// Pending envelopes
    store: Arc<dyn JobStore>,
    /// Backing content items
    resources: Arc<dyn ResourceResolver>,
    /// Expands deletions into their removable documents
    normalizer: Arc<dyn ResourceNormalizer>,
    /// Known contexts
    configuration: Arc<Configuration>,
    /// Store tag
    tag: String,
}

impl QueueManager {
    pub fn new(
        store: Arc<dyn JobStore>,
        resources: Arc<dyn ResourceResolver>,
        normalizer: Arc<dyn ResourceNormalizer>,
        configuration: Arc<Configuration>,
    ) -> Self {
        Self {
            store,
            resources,
            normalizer,
            configuration,
            tag: QUEUE_IDENTIFIER.to_string(),
        }
    }

    /// Store envelopes under a different tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Queue a change for a resource.
    ///
    /// Invalid dispatch or resource types are logged and dropped. A deletion
    /// is only queued if its removable documents can be resolved now, while
    /// the normalizer can still see what the resource was indexed as.
    ///
    /// Returns the stored envelope, or `None` if nothing was queued.
    pub async fn enqueue(
        &self,
        context_name: &str,
        dispatcher: &str,
        resource_type: &str,
        resource_id: u64,
        mut options: Options,
    ) -> Option<Envelope> {
        let dispatch_type = match dispatcher.parse::<DispatchType>() {
            Ok(dispatch_type) => dispatch_type,
            Err(e) => {
                error!(context = %context_name, "Cannot enqueue: {}", e);
                return None;
            }
        };
        let resource_type = match resource_type.parse::<ResourceType>() {
            Ok(resource_type) => resource_type,
            Err(e) => {
                error!(context = %context_name, "Cannot enqueue: {}", e);
                return None;
            }
        };

        if dispatch_type == DispatchType::Delete {
            let removable = self
                .removable_documents(context_name, resource_type, resource_id)
                .await;
            if removable.is_empty() {
                error!(
                    context = %context_name,
                    "No removable documents for {}_{}, deletion dropped",
                    resource_type,
                    resource_id
                );
                return None;
            }

            match serde_json::to_value(&removable) {
                Ok(value) => {
                    options.insert(REMOVABLE_DOCUMENTS_OPTION.to_string(), value);
                }
                Err(e) => {
                    error!(context = %context_name, "Cannot encode removable documents: {}", e);
                    return None;
                }
            }
        }

        let envelope = Envelope::new(
            context_name,
            dispatch_type,
            resource_type,
            resource_id,
            options,
        );

        if let Err(e) = self.store.put(envelope.id(), &envelope, &self.tag).await {
            error!(context = %context_name, "Failed to store envelope {}: {}", envelope.id(), e);
            return None;
        }

        debug!(
            context = %context_name,
            "Queued {} for {}_{} as {}",
            dispatch_type,
            resource_type,
            resource_id,
            envelope.id()
        );
        Some(envelope)
    }

    async fn removable_documents(
        &self,
        context_name: &str,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Vec<ResourceMeta> {
        let Some(context) = self
            .configuration
            .context_definition(DispatchType::Delete, context_name)
        else {
            error!(context = %context_name, "Context is not configured");
            return Vec::new();
        };

        let container = self.resource_container(resource_type, resource_id).await;
        match self.normalize(&context, &container).await {
            Ok(stack) => stack.into_iter().map(|n| n.meta).collect(),
            Err(e) => {
                error!(context = %context_name, "Cannot resolve removable documents: {}", e);
                Vec::new()
            }
        }
    }

    /// Remove every job of this queue.
    ///
    /// Failed deletes are retried once, then logged.
    pub async fn clear(&self) {
        let ids = match self.store.list_ids_by_tag(&self.tag).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Cannot list jobs to clear: {}", e);
                return;
            }
        };
        if ids.is_empty() {
            debug!("Queue is already empty");
            return;
        }

        info!("Clearing {} job(s)", ids.len());
        let mut failed = Vec::new();
        for id in ids {
            if let Err(e) = self.store.delete(&id).await {
                warn!("Failed to delete job {}: {}", id, e);
                failed.push(id);
            }
        }

        for id in failed {
            if let Err(e) = self.store.delete(&id).await {
                error!("Giving up on job {}: {}", id, e);
            }
        }
    }

    /// Check whether any job is queued.
    pub async fn has_active_jobs(&self) -> bool {
        match self.store.list_ids_by_tag(&self.tag).await {
            Ok(ids) => !ids.is_empty(),
            Err(e) => {
                error!("Cannot list jobs: {}", e);
                false
            }
        }
    }

    /// Every stored job of this queue, unordered and unfiltered.
    pub async fn list_active_jobs(&self) -> Vec<StoredJob> {
        let ids = match self.store.list_ids_by_tag(&self.tag).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Cannot list jobs: {}", e);
                return Vec::new();
            }
        };

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get(&id).await {
                Ok(Some(job)) => jobs.push(job),
                // Removed since listing
                Ok(None) => {}
                Err(e) => warn!("Skipping job {}: {}", id, e),
            }
        }
        jobs
    }

    /// Drain view of the queue.
    ///
    /// Per context, resource type and resource id only the newest envelope is
    /// returned; older ones are deleted from the store on the way.
    pub async fn list_active_envelopes(&self) -> ActiveEnvelopes {
        let mut envelopes: Vec<Envelope> = self
            .list_active_jobs()
            .await
            .into_iter()
            .map(|job| job.envelope)
            .collect();

        // Stable, newest first
        envelopes.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let mut seen = HashSet::new();
        let mut active = ActiveEnvelopes::new();
        for envelope in envelopes {
            if !seen.insert(envelope.dedup_key()) {
                debug!(
                    context = %envelope.context_name(),
                    "Dropping outdated envelope {} for {}",
                    envelope.id(),
                    envelope.dedup_key()
                );
                self.delete_job(&envelope).await;
                continue;
            }

            active
                .entry(envelope.context_name().to_string())
                .or_default()
                .entry(envelope.dispatcher())
                .or_default()
                .push(envelope);
        }
        active
    }

    /// Remove one envelope from the store.
    pub async fn delete_job(&self, envelope: &Envelope) {
        if let Err(e) = self.store.delete(envelope.id()).await {
            error!(
                context = %envelope.context_name(),
                "Failed to delete envelope {}: {}",
                envelope.id(),
                e
            );
        }
    }

    /// Look up a backing resource. Unknown types resolve to nothing.
    pub async fn resolve_resource(&self, resource_type: &str, resource_id: u64) -> Option<Resource> {
        match resource_type.parse::<ResourceType>() {
            Ok(resource_type) => self.resources.resolve(resource_type, resource_id).await,
            Err(e) => {
                debug!("Cannot resolve resource: {}", e);
                None
            }
        }
    }

    /// Reference to a resource, whether or not it still exists.
    pub async fn resource_container(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> ResourceContainer {
        let resource = self.resources.resolve(resource_type, resource_id).await;
        ResourceContainer::new(resource_type, resource_id, resource)
    }

    /// Expand a resource with the queue's normalizer.
    pub async fn normalize(
        &self,
        context: &ContextDefinition,
        container: &ResourceContainer,
    ) -> Result<Vec<NormalizedResource>, NormalizerError> {
        self.normalizer
            .normalize_to_resource_stack(context, container)
            .await
    }
}
