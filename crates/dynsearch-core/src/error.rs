//! Error types for dynsearch.

use thiserror::Error;

use crate::types::DispatchType;

/// Main error type for dynsearch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An enqueue request was rejected
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource normalization failed
    #[error("normalizer error: {0}")]
    Normalizer(#[from] NormalizerError),

    /// Index document generation failed
    #[error("transformer error: {0}")]
    Transformer(#[from] TransformerError),

    /// Job store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Output channel operation failed
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Rejected enqueue requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("wrong dispatch type \"{0}\", allowed types are: create, update, delete")]
    InvalidDispatchType(String),

    #[error("wrong resource type \"{0}\", allowed types are: asset, document, object")]
    InvalidResourceType(String),
}

/// Resource normalization errors.
#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("resource normalizer \"{0}\" not found")]
    NotFound(String),

    #[error("invalid normalizer options: {0}")]
    InvalidOptions(String),

    #[error("normalization failed: {0}")]
    Failed(String),
}

/// Index document generation errors.
#[derive(Error, Debug)]
pub enum TransformerError {
    #[error("field transformer \"{0}\" not found")]
    NotFound(String),

    #[error("field \"{field}\" could not be transformed: {reason}")]
    Field { field: String, reason: String },

    #[error("error while applying data transformation: {0}")]
    Failed(String),
}

/// Job store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("put failed: {0}")]
    Put(String),

    #[error("get failed: {0}")]
    Get(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("list failed: {0}")]
    List(String),

    #[error("corrupt entry {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Output channel errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("index provider \"{0}\" not found")]
    NotFound(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("{0} is not supported by this provider")]
    Unsupported(DispatchType),
}

/// Result type alias for dynsearch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    // ========== ValidationError Tests ==========

    #[test]
    fn test_validation_error_dispatch_type_display() {
        let err = ValidationError::InvalidDispatchType("upsert".to_string());
        assert_eq!(
            err.to_string(),
            "wrong dispatch type \"upsert\", allowed types are: create, update, delete"
        );
    }

    #[test]
    fn test_validation_error_resource_type_display() {
        let err = ValidationError::InvalidResourceType("folder".to_string());
        assert!(err.to_string().contains("\"folder\""));
        assert!(err.to_string().contains("asset, document, object"));
    }

    // ========== NormalizerError Tests ==========

    #[test]
    fn test_normalizer_error_not_found_display() {
        let err = NormalizerError::NotFound("localized".to_string());
        assert_eq!(err.to_string(), "resource normalizer \"localized\" not found");
    }

    #[test]
    fn test_normalizer_error_invalid_options_display() {
        let err = NormalizerError::InvalidOptions("locales must be a list".to_string());
        assert_eq!(
            err.to_string(),
            "invalid normalizer options: locales must be a list"
        );
    }

    // ========== TransformerError Tests ==========

    #[test]
    fn test_transformer_error_field_display() {
        let err = TransformerError::Field {
            field: "title".to_string(),
            reason: "expected string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "field \"title\" could not be transformed: expected string"
        );
    }

    #[test]
    fn test_transformer_error_failed_display() {
        let err = TransformerError::Failed("boom".to_string());
        assert_eq!(
            err.to_string(),
            "error while applying data transformation: boom"
        );
    }

    // ========== StoreError Tests ==========

    #[test]
    fn test_store_error_delete_display() {
        let err = StoreError::Delete("disk full".to_string());
        assert_eq!(err.to_string(), "delete failed: disk full");
    }

    #[test]
    fn test_store_error_corrupt_display() {
        let err = StoreError::Corrupt {
            id: "job-1".to_string(),
            reason: "unexpected EOF".to_string(),
        };
        assert_eq!(err.to_string(), "corrupt entry job-1: unexpected EOF");
    }

    // ========== ProviderError Tests ==========

    #[test]
    fn test_provider_error_unsupported_display() {
        let err = ProviderError::Unsupported(DispatchType::Update);
        assert_eq!(err.to_string(), "update is not supported by this provider");
    }

    // ========== Main Error Tests ==========

    #[test]
    fn test_error_from_validation_error() {
        let err: Error = ValidationError::InvalidResourceType("page".to_string()).into();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_error_from_transformer_error() {
        let err: Error = TransformerError::NotFound("rot13".to_string()).into();
        assert!(matches!(err, Error::Transformer(_)));
        assert!(err.to_string().starts_with("transformer error"));
    }

    #[test]
    fn test_error_from_store_error() {
        let err: Error = StoreError::List("timeout".to_string()).into();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_from_provider_error() {
        let err: Error = ProviderError::NotFound("elastic".to_string()).into();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_error_config_display() {
        let err = Error::Config("unknown context \"shop\"".to_string());
        assert_eq!(err.to_string(), "config error: unknown context \"shop\"");
    }

    #[test]
    fn test_result_type_alias() {
        fn example_function() -> Result<i32> {
            Ok(42)
        }

        fn failing_function() -> Result<i32> {
            Err(Error::Other("test failure".to_string()))
        }

        assert!(example_function().is_ok());
        assert!(failing_function().is_err());
    }
}
