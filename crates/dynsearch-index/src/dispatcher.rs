//! Data processing dispatcher.
//!
//! Handles "new data" notifications: the normalized resource is transformed
//! into an index document and inserted through the context's output channel.

use dynsearch_core::{
    Configuration, ContextDefinition, DataEvent, DispatchOutcome, DispatchType, Error,
    IndexDocument, IndexProvider, NormalizedResource, ProviderError, Result, TransformerError,
    TransformerWorkflowProcessor,
};
use dynsearch_output::ProviderRegistry;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Routes data notifications to the transformer and the output channels.
pub struct DataProcessingDispatcher {
    configuration: Arc<Configuration>,
    processor: Arc<dyn TransformerWorkflowProcessor>,
    providers: Arc<ProviderRegistry>,
}

impl DataProcessingDispatcher {
    pub fn new(
        configuration: Arc<Configuration>,
        processor: Arc<dyn TransformerWorkflowProcessor>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            configuration,
            processor,
            providers,
        }
    }

    /// Output channel bound to a context.
    pub fn provider_for(
        &self,
        context: &ContextDefinition,
    ) -> std::result::Result<Arc<dyn IndexProvider>, ProviderError> {
        self.providers.for_context(context)
    }

    /// Index a newly available resource.
    ///
    /// Transformer failures are returned to the caller. A transformer that
    /// produces nothing ends the dispatch with [`DispatchOutcome::Skipped`].
    pub async fn on_new_data(&self, event: &DataEvent) -> Result<DispatchOutcome> {
        let context = self
            .configuration
            .context_definition(DispatchType::Create, &event.context_name)
            .ok_or_else(|| {
                Error::Config(format!("context \"{}\" is not configured", event.context_name))
            })?;
        let provider = self.provider_for(&context)?;

        let Some(document) = self.transform(&context, &event.data).await? else {
            debug!(
                context = %context.name,
                "Nothing to index for {}",
                event.data.meta.document_id
            );
            return Ok(DispatchOutcome::Skipped);
        };

        log_document(&context, &document);
        provider.execute_insert(&context, &document).await?;

        Ok(DispatchOutcome::Inserted {
            document_id: document.document_id().map(str::to_string),
        })
    }

    /// Notification for a changed resource. Has no behavior yet.
    pub async fn on_updated_data(&self, event: &DataEvent) -> Result<DispatchOutcome> {
        debug!(context = %event.context_name, "Update notifications are not handled");
        Ok(DispatchOutcome::NotImplemented(DispatchType::Update))
    }

    /// Notification for a removed resource. Has no behavior yet.
    pub async fn on_removed_data(&self, event: &DataEvent) -> Result<DispatchOutcome> {
        debug!(context = %event.context_name, "Remove notifications are not handled");
        Ok(DispatchOutcome::NotImplemented(DispatchType::Delete))
    }

    /// Run the transformer workflow for one resource.
    pub async fn transform(
        &self,
        context: &ContextDefinition,
        data: &NormalizedResource,
    ) -> std::result::Result<Option<IndexDocument>, TransformerError> {
        self.processor
            .dispatch_index_document_transform(context, data)
            .await
            .map_err(|e| {
                error!(
                    context = %context.name,
                    "Transformation of {} failed: {}",
                    data.meta.document_id,
                    e
                );
                e
            })
    }
}

fn log_document(context: &ContextDefinition, document: &IndexDocument) {
    let transformers = document.transformer_names();
    info!(
        context = %context.name,
        "Indexing {}: {} index field(s), {} option field(s), transformers [{}]",
        document.document_id().unwrap_or("<no id>"),
        document.index_fields().len(),
        document.option_fields().len(),
        transformers.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dynsearch_core::{Resource, ResourceContainer, ResourceMeta, ResourceType};
    use dynsearch_output::{MemoryIndexProvider, ProviderStats};
    use dynsearch_transform::DefaultWorkflowProcessor;
    use serde_json::json;
    use std::collections::HashMap;

    // ==================== Mock Processors ====================

    struct EmptyProcessor;

    #[async_trait]
    impl TransformerWorkflowProcessor for EmptyProcessor {
        async fn dispatch_index_document_transform(
            &self,
            _context: &ContextDefinition,
            _data: &NormalizedResource,
        ) -> std::result::Result<Option<IndexDocument>, TransformerError> {
            Ok(None)
        }
    }

    struct FailingProcessor;

    #[async_trait]
    impl TransformerWorkflowProcessor for FailingProcessor {
        async fn dispatch_index_document_transform(
            &self,
            _context: &ContextDefinition,
            _data: &NormalizedResource,
        ) -> std::result::Result<Option<IndexDocument>, TransformerError> {
            Err(TransformerError::Failed("boom".to_string()))
        }
    }

    // ==================== Helpers ====================

    fn create_test_configuration() -> Arc<Configuration> {
        let mut context = ContextDefinition::new("products");
        context.fields = serde_json::from_value(json!([
            {"name": "title", "source": "name", "transformers": ["trim", "lowercase"]}
        ]))
        .unwrap();

        let mut contexts = HashMap::new();
        contexts.insert("products".to_string(), context);
        Arc::new(Configuration::from_contexts(contexts))
    }

    fn create_test_dispatcher(
        processor: Arc<dyn TransformerWorkflowProcessor>,
    ) -> (DataProcessingDispatcher, Arc<MemoryIndexProvider>) {
        let provider = Arc::new(MemoryIndexProvider::new());
        let mut providers = ProviderRegistry::new();
        providers.register(provider.clone());

        let dispatcher =
            DataProcessingDispatcher::new(create_test_configuration(), processor, Arc::new(providers));
        (dispatcher, provider)
    }

    fn create_test_event(context: &str) -> DataEvent {
        let resource =
            Resource::new(ResourceType::Object, 42).with_attribute("name", json!(" Oak Chair "));
        DataEvent {
            context_name: context.to_string(),
            data: NormalizedResource {
                container: ResourceContainer::from_resource(resource),
                meta: ResourceMeta::new("object_42", ResourceType::Object, 42),
            },
        }
    }

    // ==================== New Data Tests ====================

    #[tokio::test]
    async fn test_new_data_is_inserted() {
        let (dispatcher, provider) =
            create_test_dispatcher(Arc::new(DefaultWorkflowProcessor::default()));

        let outcome = dispatcher
            .on_new_data(&create_test_event("products"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Inserted {
                document_id: Some("object_42".to_string())
            }
        );
        let stored = provider.document("products", "object_42").await.unwrap();
        assert_eq!(stored.index_fields()[0].data, json!("oak chair"));
    }

    #[tokio::test]
    async fn test_nothing_to_index_skips_provider() {
        let (dispatcher, provider) = create_test_dispatcher(Arc::new(EmptyProcessor));

        let outcome = dispatcher
            .on_new_data(&create_test_event("products"))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert_eq!(provider.stats().await.inserts, 0);
    }

    #[tokio::test]
    async fn test_transformer_failure_is_surfaced() {
        let (dispatcher, provider) = create_test_dispatcher(Arc::new(FailingProcessor));

        let err = dispatcher
            .on_new_data(&create_test_event("products"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transformer(TransformerError::Failed(_))));
        assert_eq!(provider.stats().await.inserts, 0);
    }

    #[tokio::test]
    async fn test_unknown_context() {
        let (dispatcher, _provider) =
            create_test_dispatcher(Arc::new(DefaultWorkflowProcessor::default()));

        let err = dispatcher
            .on_new_data(&create_test_event("blog"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let dispatcher = DataProcessingDispatcher::new(
            create_test_configuration(),
            Arc::new(DefaultWorkflowProcessor::default()),
            Arc::new(ProviderRegistry::new()),
        );

        let err = dispatcher
            .on_new_data(&create_test_event("products"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::NotFound(_))));
    }

    // ==================== Placeholder Tests ====================

    #[tokio::test]
    async fn test_update_and_remove_are_not_implemented() {
        let (dispatcher, provider) =
            create_test_dispatcher(Arc::new(DefaultWorkflowProcessor::default()));
        let event = create_test_event("products");

        assert_eq!(
            dispatcher.on_updated_data(&event).await.unwrap(),
            DispatchOutcome::NotImplemented(DispatchType::Update)
        );
        assert_eq!(
            dispatcher.on_removed_data(&event).await.unwrap(),
            DispatchOutcome::NotImplemented(DispatchType::Delete)
        );
        assert_eq!(provider.stats().await, ProviderStats::default());
    }
}
