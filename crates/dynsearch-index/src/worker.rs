//! Queue worker.
//!
//! Drains the queue and pushes every surviving envelope through the
//! pipeline:
//!
//! ```text
//! create: resolve → normalize → DataProcessingDispatcher::on_new_data (per resource)
//! update: resolve → normalize → transform → IndexProvider::execute_update
//! delete: removable documents → IndexProvider::execute_delete
//! ```
//!
//! A failing envelope is logged and skipped; it is removed from the store
//! like every other processed envelope.

use dynsearch_core::{
    DataEvent, DispatchOutcome, DispatchType, Envelope, Error, IndexDocument, Result,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::dispatcher::DataProcessingDispatcher;
use crate::queue::QueueManager;

/// Queue worker events.
#[derive(Debug, Clone)]
pub enum QueueUpdate {
    DrainStarted { envelopes: usize },
    EnvelopeProcessed {
        envelope_id: String,
        context_name: String,
        dispatcher: DispatchType,
        documents: usize,
    },
    EnvelopeFailed {
        envelope_id: String,
        context_name: String,
        error: String,
    },
    DrainFinished { stats: DrainStats },
}

/// Summary of one or more drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    /// Envelopes left after deduplication
    pub envelopes: usize,
    /// Envelopes processed without error
    pub processed: usize,
    /// Envelopes that failed
    pub failed: usize,
    /// Documents inserted, updated or deleted
    pub documents: usize,
}

impl DrainStats {
    fn absorb(&mut self, other: &DrainStats) {
        self.envelopes += other.envelopes;
        self.processed += other.processed;
        self.failed += other.failed;
        self.documents += other.documents;
    }
}

/// Configuration for the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between two drains
    pub drain_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_secs(10),
        }
    }
}

/// Periodic queue drainer.
pub struct QueueWorker {
    /// Queue to drain
    queue: Arc<QueueManager>,
    /// Handles create notifications
    dispatcher: Arc<DataProcessingDispatcher>,
    /// Configuration
    config: WorkerConfig,
    /// Totals over all drains
    totals: Arc<RwLock<DrainStats>>,
    /// Update broadcast
    update_tx: broadcast::Sender<QueueUpdate>,
    /// Running flag
    running: Arc<RwLock<bool>>,
    /// Background loop and its stop signal (if started)
    task: Mutex<Option<(JoinHandle<()>, Arc<Notify>)>>,
}

impl QueueWorker {
    pub fn new(
        queue: Arc<QueueManager>,
        dispatcher: Arc<DataProcessingDispatcher>,
        config: WorkerConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            queue,
            dispatcher,
            config,
            totals: Arc::new(RwLock::new(DrainStats::default())),
            update_tx,
            running: Arc::new(RwLock::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Subscribe to worker updates.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueUpdate> {
        self.update_tx.subscribe()
    }

    /// Totals over every drain this worker ran.
    pub async fn stats(&self) -> DrainStats {
        *self.totals.read().await
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Drain the queue once.
    pub async fn drain_once(&self) -> DrainStats {
        drain(&self.queue, &self.dispatcher, &self.update_tx, &self.totals).await
    }

    /// Start draining every `drain_interval` in the background.
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            return;
        }
        *running = true;
        drop(running);

        info!(
            "Starting queue worker (interval: {:?})",
            self.config.drain_interval
        );

        let queue = Arc::clone(&self.queue);
        let dispatcher = Arc::clone(&self.dispatcher);
        let update_tx = self.update_tx.clone();
        let totals = Arc::clone(&self.totals);
        let running = Arc::clone(&self.running);
        let shutdown = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&shutdown);
        let interval = self.config.drain_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while *running.read().await {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = shutdown.notified() => break,
                }
                if !*running.read().await {
                    break;
                }
                drain(&queue, &dispatcher, &update_tx, &totals).await;
            }
            debug!("Queue worker loop finished");
        });

        *self.task.lock().await = Some((handle, stop_signal));
    }

    /// Stop the background loop and wait for the current drain to finish.
    pub async fn stop(&self) {
        {
            let mut running = self.running.write().await;
            if !*running {
                return;
            }
            *running = false;
        }
        if let Some((handle, shutdown)) = self.task.lock().await.take() {
            shutdown.notify_one();
            if let Err(e) = handle.await {
                error!("Queue worker task failed: {}", e);
            }
        }
        info!("Queue worker stopped");
    }
}

async fn drain(
    queue: &QueueManager,
    dispatcher: &DataProcessingDispatcher,
    update_tx: &broadcast::Sender<QueueUpdate>,
    totals: &RwLock<DrainStats>,
) -> DrainStats {
    let active = queue.list_active_envelopes().await;

    let mut stats = DrainStats {
        envelopes: active
            .values()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum(),
        ..DrainStats::default()
    };
    if stats.envelopes == 0 {
        debug!("Queue is empty");
        return stats;
    }

    info!("Draining {} envelope(s)", stats.envelopes);
    let _ = update_tx.send(QueueUpdate::DrainStarted {
        envelopes: stats.envelopes,
    });

    for envelope in active.into_values().flat_map(|b| b.into_values()).flatten() {
        match process_envelope(queue, dispatcher, &envelope).await {
            Ok(documents) => {
                debug!(
                    context = %envelope.context_name(),
                    "Processed {} ({} document(s))",
                    envelope.id(),
                    documents
                );
                stats.processed += 1;
                stats.documents += documents;
                let _ = update_tx.send(QueueUpdate::EnvelopeProcessed {
                    envelope_id: envelope.id().to_string(),
                    context_name: envelope.context_name().to_string(),
                    dispatcher: envelope.dispatcher(),
                    documents,
                });
            }
            Err(e) => {
                error!(
                    context = %envelope.context_name(),
                    "Failed to process {} ({} {}_{}): {}",
                    envelope.id(),
                    envelope.dispatcher(),
                    envelope.resource_type(),
                    envelope.resource_id(),
                    e
                );
                stats.failed += 1;
                let _ = update_tx.send(QueueUpdate::EnvelopeFailed {
                    envelope_id: envelope.id().to_string(),
                    context_name: envelope.context_name().to_string(),
                    error: e.to_string(),
                });
            }
        }

        queue.delete_job(&envelope).await;
    }

    info!(
        "Drain finished: {} processed, {} failed, {} document(s)",
        stats.processed, stats.failed, stats.documents
    );
    totals.write().await.absorb(&stats);
    let _ = update_tx.send(QueueUpdate::DrainFinished { stats });
    stats
}

/// Run one envelope through the pipeline, returning the number of documents touched.
async fn process_envelope(
    queue: &QueueManager,
    dispatcher: &DataProcessingDispatcher,
    envelope: &Envelope,
) -> Result<usize> {
    let context = queue
        .configuration()
        .context_definition(envelope.dispatcher(), envelope.context_name())
        .ok_or_else(|| {
            Error::Config(format!(
                "context \"{}\" is not configured",
                envelope.context_name()
            ))
        })?;

    match envelope.dispatcher() {
        DispatchType::Create => {
            let container = queue
                .resource_container(envelope.resource_type(), envelope.resource_id())
                .await;
            let mut inserted = 0;
            for data in queue.normalize(&context, &container).await? {
                let event = DataEvent {
                    context_name: context.name.clone(),
                    data,
                };
                if let DispatchOutcome::Inserted { .. } = dispatcher.on_new_data(&event).await? {
                    inserted += 1;
                }
            }
            Ok(inserted)
        }
        DispatchType::Update => {
            let provider = dispatcher.provider_for(&context)?;
            let container = queue
                .resource_container(envelope.resource_type(), envelope.resource_id())
                .await;
            let mut updated = 0;
            for data in queue.normalize(&context, &container).await? {
                if let Some(document) = dispatcher.transform(&context, &data).await? {
                    provider.execute_update(&context, &document).await?;
                    updated += 1;
                }
            }
            Ok(updated)
        }
        DispatchType::Delete => {
            let provider = dispatcher.provider_for(&context)?;
            let removable = envelope.removable_documents();
            if removable.is_empty() {
                warn!(
                    context = %context.name,
                    "Delete envelope {} carries no removable documents",
                    envelope.id()
                );
            }
            let mut deleted = 0;
            for meta in removable {
                let document =
                    IndexDocument::new(Some(meta), context.document_configuration.clone());
                provider.execute_delete(&context, &document).await?;
                deleted += 1;
            }
            Ok(deleted)
        }
    }
}
