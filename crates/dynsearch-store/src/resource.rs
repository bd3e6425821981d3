//! Resource repositories.
//!
//! Two [`ResourceResolver`] implementations:
//! - [`MemoryResourceRepository`]: resources held in memory, for tests and embedding
//! - [`JsonResourceRepository`]: one JSON file per resource at `<root>/<type>/<id>.json`

use async_trait::async_trait;
use dynsearch_core::{Resource, ResourceResolver, ResourceType};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// In-memory resource repository.
#[derive(Clone, Default)]
pub struct MemoryResourceRepository {
    resources: Arc<RwLock<HashMap<(ResourceType, u64), Resource>>>,
}

impl MemoryResourceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub async fn insert(&self, resource: Resource) {
        let mut resources = self.resources.write().await;
        resources.insert((resource.resource_type, resource.id), resource);
    }

    /// Remove a resource, returning it if it existed.
    pub async fn remove(&self, resource_type: ResourceType, id: u64) -> Option<Resource> {
        let mut resources = self.resources.write().await;
        resources.remove(&(resource_type, id))
    }

    async fn lookup(&self, resource_type: ResourceType, id: u64) -> Option<Resource> {
        let resources = self.resources.read().await;
        resources.get(&(resource_type, id)).cloned()
    }
}

#[async_trait]
impl ResourceResolver for MemoryResourceRepository {
    async fn find_asset(&self, id: u64) -> Option<Resource> {
        self.lookup(ResourceType::Asset, id).await
    }

    async fn find_document(&self, id: u64) -> Option<Resource> {
        self.lookup(ResourceType::Document, id).await
    }

    async fn find_object(&self, id: u64) -> Option<Resource> {
        self.lookup(ResourceType::Object, id).await
    }
}

/// On-disk layout of a resource file. Type and id come from the path.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceFile {
    #[serde(default)]
    sub_type: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// Resource repository reading `<root>/<type>/<id>.json`.
///
/// ```text
/// resources/
/// ├── asset/12.json
/// ├── document/3.json
/// └── object/42.json   {"subType": "product", "attributes": {"name": "Chair"}}
/// ```
pub struct JsonResourceRepository {
    root: PathBuf,
}

impl JsonResourceRepository {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resource_path(&self, resource_type: ResourceType, id: u64) -> PathBuf {
        self.root
            .join(resource_type.as_str())
            .join(format!("{id}.json"))
    }

    async fn load(&self, resource_type: ResourceType, id: u64) -> Option<Resource> {
        let path = self.resource_path(resource_type, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read resource {:?}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_slice::<ResourceFile>(&bytes) {
            Ok(file) => Some(Resource {
                resource_type,
                id,
                sub_type: file.sub_type,
                attributes: file.attributes,
            }),
            Err(e) => {
                warn!("Invalid resource file {:?}: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl ResourceResolver for JsonResourceRepository {
    async fn find_asset(&self, id: u64) -> Option<Resource> {
        self.load(ResourceType::Asset, id).await
    }

    async fn find_document(&self, id: u64) -> Option<Resource> {
        self.load(ResourceType::Document, id).await
    }

    async fn find_object(&self, id: u64) -> Option<Resource> {
        self.load(ResourceType::Object, id).await
    }
}
