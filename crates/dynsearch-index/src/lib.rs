//! Queue and dispatch engine for dynsearch.
//!
//! This crate turns change notifications into index operations:
//! enqueue → dedup on drain → normalize → transform → output channel.
//!
//! # Components
//!
//! - [`QueueManager`]: Validates, persists and deduplicates envelopes
//! - [`DataProcessingDispatcher`]: Handles "new data" notifications
//! - [`QueueWorker`]: Drains the queue once or on an interval
//! - [`QueueUpdate`]: Events emitted while draining
//!
//! # Example
//!
//! ```rust,ignore
//! use dynsearch_index::{QueueManager, QueueWorker, WorkerConfig};
//!
//! let queue = Arc::new(QueueManager::new(store, resources, normalizers, configuration));
//! queue.enqueue("products", "create", "object", 42, Options::new()).await;
//!
//! let worker = QueueWorker::new(queue, dispatcher, WorkerConfig::default());
//! let stats = worker.drain_once().await;
//! println!("{} processed, {} failed", stats.processed, stats.failed);
//! ```

pub mod dispatcher;
pub mod queue;
pub mod worker;

pub use dispatcher::DataProcessingDispatcher;
pub use queue::{ActiveEnvelopes, QueueManager, QUEUE_IDENTIFIER};
pub use worker::{DrainStats, QueueUpdate, QueueWorker, WorkerConfig};
