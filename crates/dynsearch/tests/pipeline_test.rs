//! Integration tests for the full dynsearch pipeline.
//!
//! Tests the complete flow: enqueue → file store → dedup → normalize →
//! transform → output channel, with everything backed by temp directories.

use dynsearch_core::{
    Configuration, ContextDefinition, DispatchType, IndexProvider, JobStore, ResourceNormalizer,
    ResourceResolver,
};
use dynsearch_index::{DataProcessingDispatcher, QueueManager, QueueUpdate, QueueWorker, WorkerConfig};
use dynsearch_output::{JsonlIndexProvider, MemoryIndexProvider, ProviderRegistry};
use dynsearch_store::{FileJobStore, JsonResourceRepository};
use dynsearch_transform::{DefaultWorkflowProcessor, NormalizerRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

struct Pipeline {
    queue: Arc<QueueManager>,
    worker: QueueWorker,
    memory: Arc<MemoryIndexProvider>,
}

fn create_test_configuration() -> Arc<Configuration> {
    let mut products: ContextDefinition = serde_json::from_value(json!({
        "resource_normalizer": "localized",
        "normalizer_options": {"locales": ["en", "de"]},
        "resource_types": ["object"],
        "index_provider": "jsonl",
        "document_configuration": {"index": "products"},
        "fields": [
            {"name": "title", "source": "name", "transformers": ["strip_tags", "trim"]},
            {"name": "tags", "source": "tags", "index_type": "keyword", "transformers": ["join"]},
            {"name": "url", "source": "path", "kind": "option"}
        ]
    }))
    .unwrap();
    products.name = "products".to_string();

    let mut pages: ContextDefinition = serde_json::from_value(json!({
        "resource_types": ["document"],
        "index_provider": "memory",
        "fields": [
            {"name": "title", "source": "title", "transformers": ["trim", "lowercase"]}
        ]
    }))
    .unwrap();
    pages.name = "pages".to_string();

    let mut contexts = HashMap::new();
    contexts.insert(products.name.clone(), products);
    contexts.insert(pages.name.clone(), pages);
    Arc::new(Configuration::from_contexts(contexts))
}

async fn create_pipeline(root: &Path) -> Pipeline {
    let store = FileJobStore::new(root.join("queue"));
    store.init().await.unwrap();

    let memory = Arc::new(MemoryIndexProvider::new());
    let mut providers = ProviderRegistry::new();
    providers.register(memory.clone() as Arc<dyn IndexProvider>);
    providers.register(Arc::new(JsonlIndexProvider::new(root.join("output"))));

    let configuration = create_test_configuration();
    let queue = Arc::new(QueueManager::new(
        Arc::new(store) as Arc<dyn JobStore>,
        Arc::new(JsonResourceRepository::new(root.join("resources"))) as Arc<dyn ResourceResolver>,
        Arc::new(NormalizerRegistry::with_defaults()) as Arc<dyn ResourceNormalizer>,
        configuration.clone(),
    ));
    let dispatcher = Arc::new(DataProcessingDispatcher::new(
        configuration,
        Arc::new(DefaultWorkflowProcessor::default()),
        Arc::new(providers),
    ));
    let worker = QueueWorker::new(queue.clone(), dispatcher, WorkerConfig::default());

    Pipeline {
        queue,
        worker,
        memory,
    }
}

fn write_resource(root: &Path, resource_type: &str, id: u64, content: Value) {
    let dir = root.join("resources").join(resource_type);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{id}.json")), content.to_string()).unwrap();
}

fn read_jsonl(root: &Path, context: &str) -> Vec<Value> {
    let path = root.join("output").join(format!("{context}.jsonl"));
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn index_field<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    record["document"]["indexFields"]
        .as_array()?
        .iter()
        .find(|field| field["name"] == name)
        .map(|field| &field["data"])
}

#[tokio::test]
async fn test_create_flows_to_jsonl_per_locale() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_resource(
        root,
        "object",
        42,
        json!({
            "subType": "product",
            "attributes": {
                "name": {"en": " <b>Oak</b> Chair ", "de": "Eichenstuhl"},
                "tags": ["wood", "chair"],
                "path": "/products/oak-chair"
            }
        }),
    );
    let pipeline = create_pipeline(root).await;

    assert!(pipeline
        .queue
        .enqueue("products", "create", "object", 42, HashMap::new())
        .await
        .is_some());

    let stats = pipeline.worker.drain_once().await;
    assert_eq!(stats.envelopes, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.documents, 2);

    let records = read_jsonl(root, "products");
    assert_eq!(records.len(), 2);

    let en = records
        .iter()
        .find(|r| r["documentId"] == "object_en_42")
        .unwrap();
    assert_eq!(en["operation"], "create");
    assert_eq!(index_field(en, "title"), Some(&json!("Oak Chair")));
    assert_eq!(index_field(en, "tags"), Some(&json!("wood chair")));
    assert_eq!(en["document"]["documentConfiguration"]["index"], "products");

    let de = records
        .iter()
        .find(|r| r["documentId"] == "object_de_42")
        .unwrap();
    assert_eq!(index_field(de, "title"), Some(&json!("Eichenstuhl")));

    assert!(!pipeline.queue.has_active_jobs().await);
}

#[tokio::test]
async fn test_duplicate_notifications_are_indexed_once() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_resource(
        root,
        "document",
        7,
        json!({"attributes": {"title": "  About Us "}}),
    );
    let pipeline = create_pipeline(root).await;

    for _ in 0..3 {
        pipeline
            .queue
            .enqueue("pages", "create", "document", 7, HashMap::new())
            .await
            .unwrap();
    }
    assert_eq!(pipeline.queue.list_active_jobs().await.len(), 3);

    let stats = pipeline.worker.drain_once().await;
    assert_eq!(stats.envelopes, 1);
    assert_eq!(stats.documents, 1);

    let document = pipeline.memory.document("pages", "document_7").await.unwrap();
    assert_eq!(document.index_fields()[0].data, json!("about us"));
    assert_eq!(pipeline.memory.stats().await.inserts, 1);
    assert!(!pipeline.queue.has_active_jobs().await);
}

#[tokio::test]
async fn test_delete_after_resource_is_gone() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_resource(
        root,
        "object",
        5,
        json!({"attributes": {"name": "Lamp"}}),
    );
    let pipeline = create_pipeline(root).await;

    pipeline
        .queue
        .enqueue("products", "create", "object", 5, HashMap::new())
        .await
        .unwrap();
    pipeline.worker.drain_once().await;

    std::fs::remove_file(root.join("resources/object/5.json")).unwrap();
    let envelope = pipeline
        .queue
        .enqueue("products", "delete", "object", 5, HashMap::new())
        .await
        .unwrap();
    assert_eq!(envelope.removable_documents().len(), 2);

    let stats = pipeline.worker.drain_once().await;
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.documents, 2);

    let deletes: Vec<_> = read_jsonl(root, "products")
        .into_iter()
        .filter(|r| r["operation"] == DispatchType::Delete.as_str())
        .collect();
    assert_eq!(deletes.len(), 2);
    assert!(deletes.iter().any(|r| r["documentId"] == "object_en_5"));
    assert!(deletes.iter().any(|r| r["documentId"] == "object_de_5"));
}

#[tokio::test]
async fn test_missing_resource_is_skipped() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    let pipeline = create_pipeline(root).await;

    pipeline
        .queue
        .enqueue("pages", "create", "document", 404, HashMap::new())
        .await
        .unwrap();

    let stats = pipeline.worker.drain_once().await;
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.documents, 0);
    assert_eq!(pipeline.memory.stats().await.inserts, 0);
    assert!(!pipeline.queue.has_active_jobs().await);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_resource(
        root,
        "document",
        1,
        json!({"attributes": {"title": "Home"}}),
    );

    {
        let pipeline = create_pipeline(root).await;
        pipeline
            .queue
            .enqueue("pages", "create", "document", 1, HashMap::new())
            .await
            .unwrap();
    }

    let pipeline = create_pipeline(root).await;
    assert!(pipeline.queue.has_active_jobs().await);

    let mut updates = pipeline.worker.subscribe();
    let stats = pipeline.worker.drain_once().await;
    assert_eq!(stats.documents, 1);

    assert!(matches!(
        updates.try_recv().unwrap(),
        QueueUpdate::DrainStarted { envelopes: 1 }
    ));
    assert!(pipeline.memory.document("pages", "document_1").await.is_some());
}

#[tokio::test]
async fn test_invalid_notifications_are_not_queued() {
    let temp_dir = tempdir().unwrap();
    let pipeline = create_pipeline(temp_dir.path()).await;

    assert!(pipeline
        .queue
        .enqueue("pages", "rename", "document", 1, HashMap::new())
        .await
        .is_none());
    assert!(pipeline
        .queue
        .enqueue("pages", "create", "folder", 1, HashMap::new())
        .await
        .is_none());
    // Unknown context
    assert!(pipeline
        .queue
        .enqueue("blog", "delete", "document", 1, HashMap::new())
        .await
        .is_none());

    assert!(!pipeline.queue.has_active_jobs().await);
}
