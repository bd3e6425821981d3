//! Configuration handling for dynsearch.
//!
//! The config file is TOML, by default at `~/.config/dynsearch/config.toml`.
//! Every field has a default, so an empty or missing file is valid.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use dynsearch_core::{Configuration, ContextDefinition};
use dynsearch_index::QUEUE_IDENTIFIER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Resource tree configuration
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Output channel configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Indexing contexts by name
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextDefinition>,
}

/// Queue-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Tag envelopes are stored under
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Seconds between two drains of `dynsearch run`
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Job store directory (default: `<data dir>/queue`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

fn default_tag() -> String {
    QUEUE_IDENTIFIER.to_string()
}

fn default_drain_interval_secs() -> u64 {
    10
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            drain_interval_secs: default_drain_interval_secs(),
            store_dir: None,
        }
    }
}

/// Resource tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourcesConfig {
    /// Root of the `<type>/<id>.json` tree (default: `<data dir>/resources`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Output channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Directory of the JSON-lines output (default: `<data dir>/output`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load the config from `path`, or from the default location.
    ///
    /// A missing file at the default location yields the default config; an
    /// explicitly given path must exist.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => match Self::config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse a config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Context definitions with their names filled in.
    pub fn configuration(&self) -> Configuration {
        let mut configuration = Configuration::new();
        for (name, definition) in &self.contexts {
            let mut definition = definition.clone();
            definition.name = name.clone();
            configuration.insert(definition);
        }
        configuration
    }

    /// Contexts bound to the in-process `memory` provider. Their documents are
    /// gone once the process exits.
    pub fn volatile_contexts(&self) -> Vec<&str> {
        self.contexts
            .iter()
            .filter(|(_, definition)| definition.index_provider == "memory")
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.queue.drain_interval_secs.max(1))
    }

    pub fn queue_dir(&self) -> Result<PathBuf> {
        resolve_dir(self.queue.store_dir.as_deref(), "queue")
    }

    pub fn resources_root(&self) -> Result<PathBuf> {
        resolve_dir(self.resources.root.as_deref(), "resources")
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        resolve_dir(self.output.dir.as_deref(), "output")
    }

    /// A commented sample config file.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }
}

fn resolve_dir(configured: Option<&Path>, default_name: &str) -> Result<PathBuf> {
    match configured {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(data_dir()
            .context("Failed to get data directory")?
            .join(default_name)),
    }
}

const SAMPLE_TOML: &str = r#"# dynsearch configuration

[queue]
# Tag envelopes are stored under
tag = "dynamic_search_index_queue"
# Seconds between two drains of `dynsearch run`
drain_interval_secs = 10
# store_dir = "/var/lib/dynsearch/queue"

[resources]
# Resources are read from <root>/<asset|document|object>/<id>.json
# root = "/var/lib/dynsearch/resources"

[output]
# The jsonl provider appends to <dir>/<context>.jsonl
# dir = "/var/lib/dynsearch/output"

[logging]
level = "info"

[contexts.products]
resource_normalizer = "localized"
resource_types = ["object"]
index_provider = "jsonl"

[contexts.products.normalizer_options]
locales = ["en", "de"]

[contexts.products.document_configuration]
index = "products"

[[contexts.products.fields]]
name = "title"
source = "name"
transformers = ["strip_tags", "trim"]

[[contexts.products.fields]]
name = "description"
source = "description"
transformers = ["strip_tags", "trim", "lowercase"]

[[contexts.products.fields]]
name = "tags"
source = "tags"
index_type = "keyword"
transformers = ["join"]

[[contexts.products.fields]]
name = "url"
source = "path"
kind = "option"
"#;

/// Get the XDG data directory for dynsearch.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DYNSEARCH_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "dynsearch").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the XDG config directory for dynsearch.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DYNSEARCH_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "dynsearch").map(|dirs| dirs.config_dir().to_path_buf())
}
