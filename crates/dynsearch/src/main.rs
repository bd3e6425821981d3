//! # dynsearch CLI
//!
//! Command-line interface for dynsearch, a queue-driven content indexing
//! pipeline.
//!
//! Changes to resources are queued as envelopes, deduplicated when the queue
//! is drained, and pushed through the configured contexts into their output
//! channels.
//!
//! ## Commands
//!
//! - `dynsearch enqueue <CONTEXT> <DISPATCHER> <TYPE> <ID>` - Queue a change
//! - `dynsearch drain` - Process the queue once
//! - `dynsearch run` - Drain the queue on an interval until interrupted
//! - `dynsearch status` - Show queued jobs
//! - `dynsearch clear` - Drop every queued job
//! - `dynsearch config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Queue a new product
//! dynsearch enqueue products create object 42
//!
//! # Queue a change with options
//! dynsearch enqueue products update object 42 -o reason=import -o priority=2
//!
//! # Process it
//! dynsearch drain --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dynsearch_core::{IndexProvider, JobStore, Options, ResourceNormalizer, ResourceResolver};
use dynsearch_index::{DataProcessingDispatcher, DrainStats, QueueManager, QueueWorker, WorkerConfig};
use dynsearch_output::{JsonlIndexProvider, MemoryIndexProvider, ProviderRegistry};
use dynsearch_store::{FileJobStore, JsonResourceRepository};
use dynsearch_transform::{DefaultWorkflowProcessor, NormalizerRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "dynsearch")]
#[command(about = "Queue-driven content indexing pipeline")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/dynsearch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a change for a resource
    Enqueue {
        /// Context name
        context: String,

        /// Dispatch type (create, update, delete)
        dispatcher: String,

        /// Resource type (asset, document, object)
        resource_type: String,

        /// Resource id
        resource_id: u64,

        /// Envelope option as key=value (value parsed as JSON if possible)
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },

    /// Process the queue once
    Drain,

    /// Drain the queue on an interval until interrupted
    Run,

    /// Show queued jobs
    Status,

    /// Drop every queued job
    Clear,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for enqueue.
#[derive(Serialize)]
struct EnqueueOutput {
    queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope_id: Option<String>,
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    tag: String,
    total_jobs: usize,
    /// context → dispatcher → count
    jobs: BTreeMap<String, BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oldest: Option<String>,
}

/// Wired pipeline components.
struct Components {
    queue: Arc<QueueManager>,
    dispatcher: Arc<DataProcessingDispatcher>,
}

/// Create the standard component stack.
async fn create_components(config: &Config) -> Result<Components> {
    let configuration = Arc::new(config.configuration());

    // Job store
    let store = FileJobStore::new(config.queue_dir()?);
    store.init().await.context("Failed to initialize job store")?;

    // Resources
    let resources = JsonResourceRepository::new(config.resources_root()?);

    // Output channels
    let mut providers = ProviderRegistry::new();
    for context in config.volatile_contexts() {
        warn!(
            context = %context,
            "Context uses the memory provider; indexed documents are lost when dynsearch exits"
        );
    }
    providers.register(Arc::new(MemoryIndexProvider::new()) as Arc<dyn IndexProvider>);
    providers.register(Arc::new(JsonlIndexProvider::new(config.output_dir()?)));

    let queue = QueueManager::new(
        Arc::new(store) as Arc<dyn JobStore>,
        Arc::new(resources) as Arc<dyn ResourceResolver>,
        Arc::new(NormalizerRegistry::with_defaults()) as Arc<dyn ResourceNormalizer>,
        configuration.clone(),
    )
    .with_tag(config.queue.tag.clone());

    let dispatcher = DataProcessingDispatcher::new(
        configuration,
        Arc::new(DefaultWorkflowProcessor::default()),
        Arc::new(providers),
    );

    Ok(Components {
        queue: Arc::new(queue),
        dispatcher: Arc::new(dispatcher),
    })
}

/// Parse `key=value` pairs into envelope options.
fn parse_options(pairs: &[String]) -> Result<Options> {
    let mut options = Options::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid option \"{pair}\", expected key=value"))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

fn print_drain_stats(stats: &DrainStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stats)?);
        }
        OutputFormat::Text => {
            println!("Envelopes: {}", stats.envelopes);
            println!("  Processed: {}", stats.processed);
            println!("  Failed:    {}", stats.failed);
            println!("  Documents: {}", stats.documents);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from file or CLI-specified path
    let config = if let Some(ref path) = cli.config {
        Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load().context("Failed to load config")?
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Enqueue {
            context,
            dispatcher,
            resource_type,
            resource_id,
            options,
        } => {
            let options = parse_options(&options)?;
            let components = create_components(&config).await?;

            let envelope = components
                .queue
                .enqueue(&context, &dispatcher, &resource_type, resource_id, options)
                .await;

            match cli.format {
                OutputFormat::Json => {
                    let output = EnqueueOutput {
                        queued: envelope.is_some(),
                        envelope_id: envelope.as_ref().map(|e| e.id().to_string()),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => match envelope {
                    Some(envelope) => println!("Queued {}", envelope.id()),
                    None => println!("Nothing queued (see log for details)"),
                },
            }
        }

        Commands::Drain => {
            let components = create_components(&config).await?;
            let worker = QueueWorker::new(
                components.queue,
                components.dispatcher,
                WorkerConfig::default(),
            );

            let stats = worker.drain_once().await;
            print_drain_stats(&stats, cli.format)?;
        }

        Commands::Run => {
            let components = create_components(&config).await?;
            let worker = QueueWorker::new(
                components.queue,
                components.dispatcher,
                WorkerConfig {
                    drain_interval: config.drain_interval(),
                },
            );

            worker.start().await;
            info!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            worker.stop().await;

            print_drain_stats(&worker.stats().await, cli.format)?;
        }

        Commands::Status => {
            let components = create_components(&config).await?;
            let jobs = components.queue.list_active_jobs().await;

            let mut grouped: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
            for job in &jobs {
                *grouped
                    .entry(job.envelope.context_name().to_string())
                    .or_default()
                    .entry(job.envelope.dispatcher().to_string())
                    .or_default() += 1;
            }
            let oldest = jobs.iter().map(|job| job.envelope.created_at()).min();

            match cli.format {
                OutputFormat::Json => {
                    let output = StatusOutput {
                        tag: components.queue.tag().to_string(),
                        total_jobs: jobs.len(),
                        jobs: grouped,
                        oldest: oldest.map(|t| t.to_rfc3339()),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Queue {}", components.queue.tag());
                    println!("  Jobs: {}", jobs.len());
                    for (context, dispatchers) in &grouped {
                        for (dispatcher, count) in dispatchers {
                            println!("    {context} / {dispatcher}: {count}");
                        }
                    }
                    if let Some(oldest) = oldest {
                        println!("  Oldest: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
                    }
                }
            }
        }

        Commands::Clear => {
            let components = create_components(&config).await?;
            components.queue.clear().await;

            let remaining = components.queue.has_active_jobs().await;
            match cli.format {
                OutputFormat::Json => {
                    println!(r#"{{"cleared": {}}}"#, !remaining);
                }
                OutputFormat::Text => {
                    if remaining {
                        println!("Some jobs could not be removed (see log for details)");
                    } else {
                        println!("Queue cleared");
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
