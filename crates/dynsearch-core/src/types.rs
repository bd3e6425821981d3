//! Core types for dynsearch.
//!
//! This module contains all shared data structures used across dynsearch:
//!
//! ## Queue
//! - [`Envelope`]: One queued change for a resource
//! - [`StoredJob`]: An envelope as persisted by a job store
//! - [`DispatchType`] / [`ResourceType`]: The allow-listed enums an envelope is built from
//!
//! ## Resources
//! - [`Resource`]: A content item (asset, document or object)
//! - [`ResourceContainer`]: A resource reference whose backing item may be gone
//! - [`ResourceMeta`]: Index-level identity produced by a normalizer
//! - [`NormalizedResource`]: A container paired with its meta
//!
//! ## Documents
//! - [`IndexDocument`]: Provider-agnostic, index-ready representation
//! - [`IndexField`] / [`OptionField`]: Field containers
//!
//! ## Contexts
//! - [`ContextDefinition`]: A named indexing configuration
//! - [`Configuration`]: All known contexts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Option key under which a delete envelope carries its removable documents.
pub const REMOVABLE_DOCUMENTS_OPTION: &str = "removable_documents";

/// Prefix of every generated envelope id.
pub const ENVELOPE_ID_PREFIX: &str = "dynamic-search-envelope-";

/// Free-form, string-keyed options.
pub type Options = HashMap<String, Value>;

// ============================================================================
// Dispatch and Resource Types
// ============================================================================

/// Kind of change an envelope describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DispatchType {
    Create,
    Update,
    Delete,
}

impl DispatchType {
    /// Every allowed dispatch type.
    pub const ALL: [DispatchType; 3] = [Self::Create, Self::Update, Self::Delete];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidDispatchType(s.to_string()))
    }
}

/// Content type of a resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Asset,
    Document,
    Object,
}

impl ResourceType {
    /// Every allowed resource type.
    pub const ALL: [ResourceType; 3] = [Self::Asset, Self::Document, Self::Object];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Document => "document",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidResourceType(s.to_string()))
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// One queued change for a resource.
///
/// Envelopes are immutable once built. The serialized layout is
/// `{id, contextName, dispatcher, resourceType, resourceId, options, createdAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    id: String,
    context_name: String,
    dispatcher: DispatchType,
    resource_type: ResourceType,
    resource_id: u64,
    #[serde(default)]
    options: Options,
    created_at: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope with a fresh id, stamped now.
    pub fn new(
        context_name: impl Into<String>,
        dispatcher: DispatchType,
        resource_type: ResourceType,
        resource_id: u64,
        options: Options,
    ) -> Self {
        Self {
            id: format!("{ENVELOPE_ID_PREFIX}{}", Uuid::new_v4().simple()),
            context_name: context_name.into(),
            dispatcher,
            resource_type,
            resource_id,
            options,
            created_at: Utc::now(),
        }
    }

    /// Replace the creation timestamp (used when replaying or importing jobs).
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn dispatcher(&self) -> DispatchType {
        self.dispatcher
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn resource_id(&self) -> u64 {
        self.resource_id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Key under which duplicate envelopes collapse during a drain.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            context_name: self.context_name.clone(),
            resource_type: self.resource_type,
            resource_id: self.resource_id,
        }
    }

    /// Decode the `removable_documents` option of a delete envelope.
    ///
    /// Returns an empty list when the option is missing or malformed.
    #[must_use]
    pub fn removable_documents(&self) -> Vec<ResourceMeta> {
        self.options
            .get(REMOVABLE_DOCUMENTS_OPTION)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}

/// Identity of a resource within a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub context_name: String,
    pub resource_type: ResourceType,
    pub resource_id: u64,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.context_name, self.resource_type, self.resource_id
        )
    }
}

/// An envelope as held by a job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredJob {
    /// Store key (equal to the envelope id)
    pub id: String,
    /// Tag used for bulk lookup
    pub tag: String,
    /// When the store accepted the entry
    pub stored_at: DateTime<Utc>,
    /// The queued change
    pub envelope: Envelope,
}

// ============================================================================
// Resources
// ============================================================================

/// A content item as returned by a resource resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Content type
    pub resource_type: ResourceType,
    /// Identifier, unique per type
    pub id: u64,
    /// Finer classification (asset mime group, document kind, object class)
    #[serde(default)]
    pub sub_type: Option<String>,
    /// Arbitrary attributes
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl Resource {
    #[must_use]
    pub fn new(resource_type: ResourceType, id: u64) -> Self {
        Self {
            resource_type,
            id,
            sub_type: None,
            attributes: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Look up an attribute by dot path (`seo.title`, `tags.0`).
    #[must_use]
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.attributes.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// A resource reference whose backing item may already be gone.
///
/// The type and id are always known, so deletions can still be normalized
/// after the resource itself was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContainer {
    resource_type: ResourceType,
    resource_id: u64,
    resource: Option<Resource>,
}

impl ResourceContainer {
    #[must_use]
    pub fn new(resource_type: ResourceType, resource_id: u64, resource: Option<Resource>) -> Self {
        Self {
            resource_type,
            resource_id,
            resource,
        }
    }

    #[must_use]
    pub fn from_resource(resource: Resource) -> Self {
        Self::new(resource.resource_type, resource.id, Some(resource))
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn resource_id(&self) -> u64 {
        self.resource_id
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }
}

/// Index-level identity of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    /// Id of the document in the output index
    pub document_id: String,
    /// Id of the source resource
    pub resource_id: u64,
    /// Type of the source resource
    pub resource_collection_type: ResourceType,
    /// Sub type of the source resource, if known
    #[serde(default)]
    pub resource_sub_type: Option<String>,
    /// Values the normalizer attached (e.g. `locale`)
    #[serde(default)]
    pub normalizer_options: Options,
}

impl ResourceMeta {
    #[must_use]
    pub fn new(
        document_id: impl Into<String>,
        resource_collection_type: ResourceType,
        resource_id: u64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            resource_id,
            resource_collection_type,
            resource_sub_type: None,
            normalizer_options: Options::new(),
        }
    }

    #[must_use]
    pub fn with_sub_type(mut self, sub_type: Option<String>) -> Self {
        self.resource_sub_type = sub_type;
        self
    }

    #[must_use]
    pub fn with_normalizer_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.normalizer_options.insert(key.into(), value);
        self
    }

    /// Locale attached by a localizing normalizer.
    pub fn locale(&self) -> Option<&str> {
        self.normalizer_options.get("locale").and_then(Value::as_str)
    }
}

/// Output of a resource normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResource {
    pub container: ResourceContainer,
    pub meta: ResourceMeta,
}

// ============================================================================
// Index Documents
// ============================================================================

/// A field that is sent to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    /// Provider-specific field type (`text`, `keyword`, ...)
    pub index_type: String,
    pub data: Value,
    /// Transformers applied, in order
    #[serde(default)]
    pub transformers: Vec<String>,
}

/// A field stored alongside the document but not indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionField {
    pub name: String,
    pub data: Value,
    #[serde(default)]
    pub transformers: Vec<String>,
}

/// Provider-agnostic representation of a resource, ready for indexing.
///
/// A document without index fields is valid; providers usually skip it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    resource_meta: Option<ResourceMeta>,
    document_configuration: Options,
    index_fields: Vec<IndexField>,
    option_fields: Vec<OptionField>,
}

impl IndexDocument {
    #[must_use]
    pub fn new(resource_meta: Option<ResourceMeta>, document_configuration: Options) -> Self {
        Self {
            resource_meta,
            document_configuration,
            index_fields: Vec::new(),
            option_fields: Vec::new(),
        }
    }

    /// Document id taken from the resource meta, if any.
    pub fn document_id(&self) -> Option<&str> {
        self.resource_meta.as_ref().map(|m| m.document_id.as_str())
    }

    pub fn resource_meta(&self) -> Option<&ResourceMeta> {
        self.resource_meta.as_ref()
    }

    pub fn document_configuration(&self) -> &Options {
        &self.document_configuration
    }

    pub fn add_index_field(&mut self, field: IndexField) {
        self.index_fields.push(field);
    }

    pub fn add_option_field(&mut self, field: OptionField) {
        self.option_fields.push(field);
    }

    pub fn has_index_fields(&self) -> bool {
        !self.index_fields.is_empty()
    }

    pub fn index_fields(&self) -> &[IndexField] {
        &self.index_fields
    }

    pub fn has_option_fields(&self) -> bool {
        !self.option_fields.is_empty()
    }

    pub fn option_fields(&self) -> &[OptionField] {
        &self.option_fields
    }

    /// Distinct transformer names used across all fields, in first-use order.
    #[must_use]
    pub fn transformer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let used = self
            .index_fields
            .iter()
            .flat_map(|f| f.transformers.iter())
            .chain(self.option_fields.iter().flat_map(|f| f.transformers.iter()));
        for name in used {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        names
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// Where a defined field ends up in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Index,
    Option,
}

/// Mapping from a resource attribute to a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name in the document
    pub name: String,
    /// Dot path of the source attribute
    pub source: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default = "default_index_type")]
    pub index_type: String,
    /// Field transformers to apply, in order
    #[serde(default)]
    pub transformers: Vec<String>,
}

fn default_index_type() -> String {
    "text".to_string()
}

/// A named indexing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDefinition {
    /// Context name (filled from the configuration key)
    #[serde(skip)]
    pub name: String,
    /// Dispatch type this definition was requested for
    #[serde(skip)]
    pub dispatch_type: Option<DispatchType>,
    /// Name of the resource normalizer
    #[serde(default = "default_resource_normalizer")]
    pub resource_normalizer: String,
    /// Options handed to the normalizer
    #[serde(default)]
    pub normalizer_options: Options,
    /// Resource types enabled for this context (empty = all)
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
    /// Name of the output channel
    #[serde(default = "default_index_provider")]
    pub index_provider: String,
    /// Options handed to the output channel
    #[serde(default)]
    pub index_provider_options: Options,
    /// Read-only configuration copied into every document
    #[serde(default)]
    pub document_configuration: Options,
    /// Field definitions
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

fn default_resource_normalizer() -> String {
    "default".to_string()
}

fn default_index_provider() -> String {
    "memory".to_string()
}

impl ContextDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dispatch_type: None,
            resource_normalizer: default_resource_normalizer(),
            normalizer_options: Options::new(),
            resource_types: Vec::new(),
            index_provider: default_index_provider(),
            index_provider_options: Options::new(),
            document_configuration: Options::new(),
            fields: Vec::new(),
        }
    }

    /// Check whether the context indexes resources of this type.
    pub fn accepts(&self, resource_type: ResourceType) -> bool {
        self.resource_types.is_empty() || self.resource_types.contains(&resource_type)
    }
}

/// All known context definitions.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    contexts: BTreeMap<String, ContextDefinition>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a name → definition map, filling in each definition's name.
    #[must_use]
    pub fn from_contexts(contexts: HashMap<String, ContextDefinition>) -> Self {
        let mut config = Self::new();
        for (name, mut definition) in contexts {
            definition.name = name;
            config.insert(definition);
        }
        config
    }

    pub fn insert(&mut self, definition: ContextDefinition) {
        self.contexts.insert(definition.name.clone(), definition);
    }

    /// Definition of a context as seen by the given dispatch type.
    #[must_use]
    pub fn context_definition(
        &self,
        dispatch_type: DispatchType,
        name: &str,
    ) -> Option<ContextDefinition> {
        self.contexts.get(name).map(|definition| ContextDefinition {
            dispatch_type: Some(dispatch_type),
            ..definition.clone()
        })
    }

    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

// ============================================================================
// Events
// ============================================================================

/// A data notification raised for one normalized resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    pub context_name: String,
    pub data: NormalizedResource,
}

/// What a dispatcher handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The document was handed to the output channel
    Inserted { document_id: Option<String> },
    /// The transformer produced nothing to index
    Skipped,
    /// This notification kind has no behavior yet
    NotImplemented(DispatchType),
}
