//! Resource normalizers and the normalizer registry.
//!
//! A normalizer turns one resource reference into the index-level identities
//! it produces. Normalizers only look at the container's type and id, plus the
//! resource's sub type when the resource still exists, so deletions can be
//! expanded after the backing item is gone.

use async_trait::async_trait;
use dynsearch_core::{
    ContextDefinition, NormalizedResource, NormalizerError, ResourceContainer, ResourceMeta,
    ResourceNormalizer,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Normalizer option listing the locales a resource is indexed in.
pub const LOCALES_OPTION: &str = "locales";

fn base_meta(container: &ResourceContainer, document_id: String) -> ResourceMeta {
    ResourceMeta::new(
        document_id,
        container.resource_type(),
        container.resource_id(),
    )
    .with_sub_type(container.resource().and_then(|r| r.sub_type.clone()))
}

/// One document per resource, id `<type>_<id>`.
pub struct DefaultResourceNormalizer;

impl DefaultResourceNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultResourceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceNormalizer for DefaultResourceNormalizer {
    fn name(&self) -> &str {
        "default"
    }

    async fn normalize_to_resource_stack(
        &self,
        _context: &ContextDefinition,
        container: &ResourceContainer,
    ) -> Result<Vec<NormalizedResource>, NormalizerError> {
        let document_id = format!(
            "{}_{}",
            container.resource_type(),
            container.resource_id()
        );

        Ok(vec![NormalizedResource {
            container: container.clone(),
            meta: base_meta(container, document_id),
        }])
    }
}

/// One document per configured locale, id `<type>_<locale>_<id>`.
///
/// Locales are read from the context's `normalizer_options.locales`, which
/// must be a list of strings.
pub struct LocalizedResourceNormalizer;

impl LocalizedResourceNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn locales(context: &ContextDefinition) -> Result<Vec<String>, NormalizerError> {
        let Some(value) = context.normalizer_options.get(LOCALES_OPTION) else {
            return Err(NormalizerError::InvalidOptions(format!(
                "context \"{}\" has no \"{LOCALES_OPTION}\" option",
                context.name
            )));
        };

        let items = value.as_array().ok_or_else(|| {
            NormalizerError::InvalidOptions(format!("\"{LOCALES_OPTION}\" must be a list"))
        })?;

        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    NormalizerError::InvalidOptions(format!(
                        "\"{LOCALES_OPTION}\" entries must be strings, got {item}"
                    ))
                })
            })
            .collect()
    }
}

impl Default for LocalizedResourceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceNormalizer for LocalizedResourceNormalizer {
    fn name(&self) -> &str {
        "localized"
    }

    async fn normalize_to_resource_stack(
        &self,
        context: &ContextDefinition,
        container: &ResourceContainer,
    ) -> Result<Vec<NormalizedResource>, NormalizerError> {
        let locales = Self::locales(context)?;

        let stack = locales
            .into_iter()
            .map(|locale| {
                let document_id = format!(
                    "{}_{}_{}",
                    container.resource_type(),
                    locale,
                    container.resource_id()
                );
                NormalizedResource {
                    container: container.clone(),
                    meta: base_meta(container, document_id)
                        .with_normalizer_option("locale", Value::String(locale)),
                }
            })
            .collect();

        Ok(stack)
    }
}

/// Registry of resource normalizers.
///
/// The registry is itself a [`ResourceNormalizer`]: it forwards to the
/// normalizer named by the context definition.
pub struct NormalizerRegistry {
    /// Named normalizers
    normalizers: HashMap<String, Arc<dyn ResourceNormalizer>>,
}

impl NormalizerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normalizers: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in normalizers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DefaultResourceNormalizer::new());
        registry.register(LocalizedResourceNormalizer::new());
        registry
    }

    /// Register a normalizer under its own name.
    pub fn register<N: ResourceNormalizer + 'static>(&mut self, normalizer: N) {
        self.normalizers
            .insert(normalizer.name().to_string(), Arc::new(normalizer));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceNormalizer>> {
        self.normalizers.get(name).cloned()
    }

    /// Names of all registered normalizers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.normalizers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl ResourceNormalizer for NormalizerRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    async fn normalize_to_resource_stack(
        &self,
        context: &ContextDefinition,
        container: &ResourceContainer,
    ) -> Result<Vec<NormalizedResource>, NormalizerError> {
        let normalizer = self
            .get(&context.resource_normalizer)
            .ok_or_else(|| NormalizerError::NotFound(context.resource_normalizer.clone()))?;

        let stack = normalizer
            .normalize_to_resource_stack(context, container)
            .await?;
        debug!(
            context = %context.name,
            "Normalizer {} produced {} resource(s) for {}_{}",
            normalizer.name(),
            stack.len(),
            container.resource_type(),
            container.resource_id()
        );
        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynsearch_core::{Resource, ResourceType};
    use serde_json::json;

    fn localized_context(locales: Value) -> ContextDefinition {
        let mut context = ContextDefinition::new("shop");
        context.resource_normalizer = "localized".to_string();
        context
            .normalizer_options
            .insert(LOCALES_OPTION.to_string(), locales);
        context
    }

    // ========== Default Normalizer Tests ==========

    #[tokio::test]
    async fn test_default_normalizer_single_document() {
        let resource = Resource::new(ResourceType::Object, 42).with_sub_type("product");
        let container = ResourceContainer::from_resource(resource);

        let stack = DefaultResourceNormalizer::new()
            .normalize_to_resource_stack(&ContextDefinition::new("shop"), &container)
            .await
            .unwrap();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].meta.document_id, "object_42");
        assert_eq!(stack[0].meta.resource_id, 42);
        assert_eq!(stack[0].meta.resource_sub_type.as_deref(), Some("product"));
        assert!(stack[0].container.has_resource());
    }

    #[tokio::test]
    async fn test_default_normalizer_without_resource() {
        let container = ResourceContainer::new(ResourceType::Asset, 7, None);

        let stack = DefaultResourceNormalizer::new()
            .normalize_to_resource_stack(&ContextDefinition::new("shop"), &container)
            .await
            .unwrap();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].meta.document_id, "asset_7");
        assert_eq!(stack[0].meta.resource_sub_type, None);
    }

    // ========== Localized Normalizer Tests ==========

    #[tokio::test]
    async fn test_localized_normalizer_one_document_per_locale() {
        let context = localized_context(json!(["en", "de"]));
        let container = ResourceContainer::new(ResourceType::Object, 42, None);

        let stack = LocalizedResourceNormalizer::new()
            .normalize_to_resource_stack(&context, &container)
            .await
            .unwrap();

        let ids: Vec<&str> = stack.iter().map(|n| n.meta.document_id.as_str()).collect();
        assert_eq!(ids, vec!["object_en_42", "object_de_42"]);
        assert_eq!(stack[1].meta.locale(), Some("de"));
    }

    #[tokio::test]
    async fn test_localized_normalizer_empty_locales() {
        let context = localized_context(json!([]));
        let container = ResourceContainer::new(ResourceType::Object, 42, None);

        let stack = LocalizedResourceNormalizer::new()
            .normalize_to_resource_stack(&context, &container)
            .await
            .unwrap();
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn test_localized_normalizer_invalid_options() {
        let container = ResourceContainer::new(ResourceType::Object, 1, None);
        let normalizer = LocalizedResourceNormalizer::new();

        let missing = ContextDefinition::new("shop");
        assert!(matches!(
            normalizer
                .normalize_to_resource_stack(&missing, &container)
                .await,
            Err(NormalizerError::InvalidOptions(_))
        ));

        let not_strings = localized_context(json!(["en", 3]));
        assert!(matches!(
            normalizer
                .normalize_to_resource_stack(&not_strings, &container)
                .await,
            Err(NormalizerError::InvalidOptions(_))
        ));
    }

    // ========== Registry Tests ==========

    #[test]
    fn test_new_registry_is_empty() {
        let registry = NormalizerRegistry::new();
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = NormalizerRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["default", "localized"]);
        assert!(registry.get("default").is_some());
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_context() {
        let registry = NormalizerRegistry::with_defaults();
        let container = ResourceContainer::new(ResourceType::Document, 5, None);

        let stack = registry
            .normalize_to_resource_stack(&localized_context(json!(["fr"])), &container)
            .await
            .unwrap();
        assert_eq!(stack[0].meta.document_id, "document_fr_5");
    }

    #[tokio::test]
    async fn test_registry_unknown_normalizer() {
        let registry = NormalizerRegistry::with_defaults();
        let mut context = ContextDefinition::new("shop");
        context.resource_normalizer = "missing".to_string();
        let container = ResourceContainer::new(ResourceType::Object, 1, None);

        let err = registry
            .normalize_to_resource_stack(&context, &container)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizerError::NotFound(name) if name == "missing"));
    }
}
