//! Output channels for dynsearch.
//!
//! An output channel is an [`IndexProvider`](dynsearch_core::IndexProvider)
//! that receives index documents and applies them to a backing index.
//!
//! - [`MemoryIndexProvider`]: per-context document maps, for tests and inspection
//! - [`JsonlIndexProvider`]: append-only `<dir>/<context>.jsonl` operation log
//! - [`ProviderRegistry`]: picks the provider a context definition names

pub mod jsonl;
pub mod memory;
pub mod registry;

pub use jsonl::JsonlIndexProvider;
pub use memory::{MemoryIndexProvider, ProviderStats};
pub use registry::ProviderRegistry;
