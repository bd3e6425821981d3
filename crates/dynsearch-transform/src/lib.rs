//! Resource normalization and index document generation for dynsearch.
//!
//! - [`NormalizerRegistry`]: picks the [`ResourceNormalizer`](dynsearch_core::ResourceNormalizer)
//!   a context names (`default`, `localized`)
//! - [`TransformerRegistry`]: named field transformers (`trim`, `lowercase`, `strip_tags`, `join`)
//! - [`DefaultWorkflowProcessor`]: builds an [`IndexDocument`](dynsearch_core::IndexDocument)
//!   from a context's field definitions

pub mod normalizer;
pub mod transformer;
pub mod workflow;

pub use normalizer::{
    DefaultResourceNormalizer, LocalizedResourceNormalizer, NormalizerRegistry, LOCALES_OPTION,
};
pub use transformer::{
    JoinTransformer, LowercaseTransformer, StripTagsTransformer, TransformerRegistry,
    TrimTransformer,
};
pub use workflow::DefaultWorkflowProcessor;
