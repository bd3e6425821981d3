//! Field transformers and the transformer registry.
//!
//! Built-in transformers:
//! - `trim`: strip surrounding whitespace
//! - `lowercase`: lowercase text
//! - `strip_tags`: remove markup tags
//! - `join`: flatten a list into one space-separated string
//!
//! String transformers also apply element-wise to lists of strings and leave
//! other values untouched. `null` drops the field.

use dynsearch_core::{FieldTransformer, TransformerError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

fn map_text(value: Value, f: impl Fn(&str) -> String) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Value::String(f(&s))),
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(f(&s)),
                    other => other,
                })
                .collect(),
        )),
        other => Some(other),
    }
}

/// Strip surrounding whitespace.
pub struct TrimTransformer;

impl FieldTransformer for TrimTransformer {
    fn name(&self) -> &str {
        "trim"
    }

    fn transform(&self, value: Value) -> Result<Option<Value>, TransformerError> {
        Ok(map_text(value, |s| s.trim().to_string()))
    }
}

/// Lowercase text.
pub struct LowercaseTransformer;

impl FieldTransformer for LowercaseTransformer {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn transform(&self, value: Value) -> Result<Option<Value>, TransformerError> {
        Ok(map_text(value, str::to_lowercase))
    }
}

/// Remove `<...>` tags, keeping the text between them.
pub struct StripTagsTransformer;

fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => output.push(c),
            _ => {}
        }
    }
    output
}

impl FieldTransformer for StripTagsTransformer {
    fn name(&self) -> &str {
        "strip_tags"
    }

    fn transform(&self, value: Value) -> Result<Option<Value>, TransformerError> {
        Ok(map_text(value, strip_tags))
    }
}

/// Join a list of scalars into one space-separated string.
pub struct JoinTransformer;

impl FieldTransformer for JoinTransformer {
    fn name(&self) -> &str {
        "join"
    }

    fn transform(&self, value: Value) -> Result<Option<Value>, TransformerError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Null => {}
                        Value::String(s) => parts.push(s),
                        Value::Number(n) => parts.push(n.to_string()),
                        Value::Bool(b) => parts.push(b.to_string()),
                        other => {
                            return Err(TransformerError::Failed(format!(
                                "join cannot flatten nested value {other}"
                            )))
                        }
                    }
                }
                Ok(Some(Value::String(parts.join(" "))))
            }
            Value::Object(_) => Err(TransformerError::Failed(
                "join expects a list, got an object".to_string(),
            )),
            scalar => Ok(Some(scalar)),
        }
    }
}

/// Registry of field transformers.
pub struct TransformerRegistry {
    /// Named transformers
    transformers: HashMap<String, Arc<dyn FieldTransformer>>,
}

impl TransformerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in transformers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TrimTransformer);
        registry.register(LowercaseTransformer);
        registry.register(StripTagsTransformer);
        registry.register(JoinTransformer);
        registry
    }

    /// Register a transformer under its own name.
    pub fn register<T: FieldTransformer + 'static>(&mut self, transformer: T) {
        self.transformers
            .insert(transformer.name().to_string(), Arc::new(transformer));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn FieldTransformer>> {
        self.transformers.get(name).cloned()
    }

    /// Run a transformer chain over a field value.
    ///
    /// Stops early and returns `Ok(None)` as soon as a step drops the value.
    pub fn apply_chain(
        &self,
        field: &str,
        names: &[String],
        value: Value,
    ) -> Result<Option<Value>, TransformerError> {
        let mut current = value;
        for name in names {
            let transformer = self
                .get(name)
                .ok_or_else(|| TransformerError::NotFound(name.clone()))?;

            match transformer.transform(current) {
                Ok(Some(next)) => current = next,
                Ok(None) => return Ok(None),
                Err(e) => {
                    return Err(TransformerError::Field {
                        field: field.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(Some(current))
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
