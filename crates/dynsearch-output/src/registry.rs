//! Provider registry for managing output channels.

use dynsearch_core::{ContextDefinition, IndexProvider, ProviderError};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of output channels.
pub struct ProviderRegistry {
    /// Named providers
    providers: HashMap<String, Arc<dyn IndexProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its own name.
    ///
    /// Takes an `Arc` so callers can keep a handle to inspect the provider.
    pub fn register(&mut self, provider: Arc<dyn IndexProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn IndexProvider>> {
        self.providers.get(name).cloned()
    }

    /// Provider bound to a context.
    pub fn for_context(
        &self,
        context: &ContextDefinition,
    ) -> Result<Arc<dyn IndexProvider>, ProviderError> {
        self.get(&context.index_provider)
            .ok_or_else(|| ProviderError::NotFound(context.index_provider.clone()))
    }

    /// Names of all registered providers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryIndexProvider;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ProviderRegistry::new();
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_register_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MemoryIndexProvider::new()));

        assert_eq!(registry.names(), vec!["memory"]);
        assert!(registry.get("memory").is_some());
        assert!(registry.get("elasticsearch").is_none());
    }

    #[test]
    fn test_for_context() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MemoryIndexProvider::new()));

        let context = ContextDefinition::new("shop");
        assert_eq!(registry.for_context(&context).unwrap().name(), "memory");

        let mut other = ContextDefinition::new("blog");
        other.index_provider = "jsonl".to_string();
        assert!(matches!(
            registry.for_context(&other),
            Err(ProviderError::NotFound(name)) if name == "jsonl"
        ));
    }
}
