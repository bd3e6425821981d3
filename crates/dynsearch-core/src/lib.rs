//! # dynsearch-core
//!
//! Core types and traits for dynsearch, a queue-driven content indexing pipeline.
//!
//! Resources (assets, documents, objects) change; the change is queued as an
//! [`Envelope`], deduplicated on drain, normalized into index-level identities,
//! transformed into an [`IndexDocument`] and handed to an output channel.
//!
//! ## Architecture
//!
//! ```text
//! notification → JobStore (Envelope) → drain/dedup → ResourceNormalizer
//!                                                        ↓
//!                      IndexProvider ← IndexDocument ← TransformerWorkflowProcessor
//! ```
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`JobStore`] | Persist pending envelopes, tag-indexed |
//! | [`ResourceResolver`] | Look up assets, documents and objects |
//! | [`ResourceNormalizer`] | Expand a resource into resource metas |
//! | [`FieldTransformer`] | One step of a field transformer chain |
//! | [`TransformerWorkflowProcessor`] | Build an index document |
//! | [`IndexProvider`] | Insert, update, delete against an index |
//!
//! ## Related Crates
//!
//! - `dynsearch-store`: Job stores and resource repositories
//! - `dynsearch-transform`: Normalizers, field transformers, workflow processor
//! - `dynsearch-output`: Output channels
//! - `dynsearch-index`: Queue manager, dispatcher and worker

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    Error, NormalizerError, ProviderError, Result, StoreError, TransformerError, ValidationError,
};
pub use traits::*;
pub use types::*;
