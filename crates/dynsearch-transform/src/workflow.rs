//! Default index document workflow.

use async_trait::async_trait;
use dynsearch_core::{
    ContextDefinition, FieldKind, IndexDocument, IndexField, NormalizedResource, OptionField,
    TransformerError, TransformerWorkflowProcessor,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::transformer::TransformerRegistry;

/// Builds index documents from a context's field definitions.
///
/// For every field definition the processor reads the source attribute,
/// picks the meta's locale out of localized values (`{"en": .., "de": ..}`),
/// runs the transformer chain and stores the result as an index or option
/// field. Missing attributes and dropped values produce no field.
pub struct DefaultWorkflowProcessor {
    transformers: Arc<TransformerRegistry>,
}

impl DefaultWorkflowProcessor {
    #[must_use]
    pub fn new(transformers: Arc<TransformerRegistry>) -> Self {
        Self { transformers }
    }
}

impl Default for DefaultWorkflowProcessor {
    fn default() -> Self {
        Self::new(Arc::new(TransformerRegistry::with_defaults()))
    }
}

fn localize(value: Value, locale: Option<&str>) -> Value {
    match (value, locale) {
        (Value::Object(mut map), Some(locale)) if map.contains_key(locale) => {
            map.remove(locale).unwrap_or(Value::Null)
        }
        (value, _) => value,
    }
}

#[async_trait]
impl TransformerWorkflowProcessor for DefaultWorkflowProcessor {
    async fn dispatch_index_document_transform(
        &self,
        context: &ContextDefinition,
        data: &NormalizedResource,
    ) -> Result<Option<IndexDocument>, TransformerError> {
        let Some(resource) = data.container.resource() else {
            debug!(
                context = %context.name,
                "No resource behind {}, nothing to index",
                data.meta.document_id
            );
            return Ok(None);
        };

        if !context.accepts(resource.resource_type) {
            debug!(
                context = %context.name,
                "Resource type {} is not enabled, skipping {}",
                resource.resource_type,
                data.meta.document_id
            );
            return Ok(None);
        }

        let locale = data.meta.locale();
        let mut document = IndexDocument::new(
            Some(data.meta.clone()),
            context.document_configuration.clone(),
        );

        for field in &context.fields {
            let Some(raw) = resource.attribute(&field.source).cloned() else {
                trace!("Attribute {} missing on {}", field.source, data.meta.document_id);
                continue;
            };

            let value = localize(raw, locale);
            let Some(value) =
                self.transformers
                    .apply_chain(&field.name, &field.transformers, value)?
            else {
                continue;
            };

            match field.kind {
                FieldKind::Index => document.add_index_field(IndexField {
                    name: field.name.clone(),
                    index_type: field.index_type.clone(),
                    data: value,
                    transformers: field.transformers.clone(),
                }),
                FieldKind::Option => document.add_option_field(OptionField {
                    name: field.name.clone(),
                    data: value,
                    transformers: field.transformers.clone(),
                }),
            }
        }

        Ok(Some(document))
    }
}
