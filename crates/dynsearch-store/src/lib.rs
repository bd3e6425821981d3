//! Storage layer for dynsearch.
//!
//! This crate provides the [`JobStore`](dynsearch_core::JobStore) backends the
//! queue persists envelopes in, and the
//! [`ResourceResolver`](dynsearch_core::ResourceResolver) repositories content
//! items are looked up from.
//!
//! # Job Stores
//!
//! - [`MemoryJobStore`]: In-process, insertion-ordered
//! - [`FileJobStore`]: One JSON file per job, shared between processes
//!
//! # Resource Repositories
//!
//! - [`MemoryResourceRepository`]: In-process map
//! - [`JsonResourceRepository`]: `<root>/<type>/<id>.json` tree
//!
//! # Example
//!
//! ```rust,ignore
//! use dynsearch_store::FileJobStore;
//! use dynsearch_core::JobStore;
//!
//! let store = FileJobStore::new("path/to/queue".into());
//! store.init().await?;
//!
//! store.put(envelope.id(), &envelope, "dynamic_search_index_queue").await?;
//! let ids = store.list_ids_by_tag("dynamic_search_index_queue").await?;
//! ```

pub mod file;
pub mod memory;
pub mod resource;

pub use file::FileJobStore;
pub use memory::MemoryJobStore;
pub use resource::{JsonResourceRepository, MemoryResourceRepository};
