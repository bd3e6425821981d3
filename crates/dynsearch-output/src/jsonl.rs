//! JSON-lines output channel.
//!
//! Every operation appends one line to `<dir>/<context>.jsonl`:
//!
//! ```text
//! {"operation":"create","context":"shop","documentId":"object_42","timestamp":"...","document":{...}}
//! ```
//!
//! Downstream tools replay the file in order to rebuild the index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dynsearch_core::{ContextDefinition, DispatchType, IndexDocument, IndexProvider, ProviderError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonlRecord<'a> {
    operation: DispatchType,
    context: &'a str,
    document_id: Option<&'a str>,
    timestamp: DateTime<Utc>,
    document: &'a IndexDocument,
}

/// Output channel appending operations to per-context JSON-lines files.
pub struct JsonlIndexProvider {
    dir: PathBuf,
}

impl JsonlIndexProvider {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the given context writes to.
    pub fn path_for(&self, context: &str) -> Option<PathBuf> {
        let valid = !context.is_empty()
            && !context.starts_with('.')
            && context
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        valid.then(|| self.dir.join(format!("{context}.jsonl")))
    }

    async fn append(
        &self,
        operation: DispatchType,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), String> {
        let path = self
            .path_for(&context.name)
            .ok_or_else(|| format!("context name \"{}\" is not a valid file name", context.name))?;

        let record = JsonlRecord {
            operation,
            context: &context.name,
            document_id: document.document_id(),
            timestamp: Utc::now(),
            document,
        };
        let mut line = serde_json::to_vec(&record).map_err(|e| e.to_string())?;
        line.push(b'\n');

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| format!("{}: {e}", self.dir.display()))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        file.write_all(&line)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        file.flush()
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;

        debug!(
            context = %context.name,
            "Appended {} for {:?} to {:?}",
            operation,
            document.document_id(),
            path
        );
        Ok(())
    }
}

#[async_trait]
impl IndexProvider for JsonlIndexProvider {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn execute_insert(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        self.append(DispatchType::Create, context, document)
            .await
            .map_err(ProviderError::Insert)
    }

    async fn execute_update(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        self.append(DispatchType::Update, context, document)
            .await
            .map_err(ProviderError::Update)
    }

    async fn execute_delete(
        &self,
        context: &ContextDefinition,
        document: &IndexDocument,
    ) -> Result<(), ProviderError> {
        self.append(DispatchType::Delete, context, document)
            .await
            .map_err(ProviderError::Delete)
    }
}
