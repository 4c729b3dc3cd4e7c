//! Process configuration
//!
//! Loaded once at startup from a JSON file. Every key has a default, so an
//! empty object is a valid configuration:
//!
//! ```json
//! {
//!   "broker": {
//!     "retry_exchange": "search.retry",
//!     "failed_exchange": "search.failed",
//!     "index_queue": "search.index",
//!     "delete_queue": "search.delete",
//!     "max_retries": 4
//!   },
//!   "database": { "schema": "musicbrainz" },
//!   "catalog_file": null,
//!   "entities": null
//! }
//! ```

mod errors;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};

use crate::amqp::{
    RetryRouter, DEFAULT_FAILED_EXCHANGE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_EXCHANGE,
};
use crate::schema::musicbrainz::DATABASE_SCHEMA;

/// Broker exchanges, queues and retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_retry_exchange")]
    pub retry_exchange: String,

    #[serde(default = "default_failed_exchange")]
    pub failed_exchange: String,

    #[serde(default = "default_index_queue")]
    pub index_queue: String,

    /// Messages consumed here default to the delete operation
    #[serde(default = "default_delete_queue")]
    pub delete_queue: String,

    /// Retries a message starts with when it carries no header
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            retry_exchange: default_retry_exchange(),
            failed_exchange: default_failed_exchange(),
            index_queue: default_index_queue(),
            delete_queue: default_delete_queue(),
            max_retries: default_max_retries(),
        }
    }
}

impl BrokerConfig {
    /// Retry router for these settings
    pub fn router(&self) -> RetryRouter {
        RetryRouter::new(
            self.retry_exchange.clone(),
            self.failed_exchange.clone(),
            self.max_retries,
        )
    }
}

/// Relational database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Schema the tables live in, used in projection queries
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
        }
    }
}

fn default_retry_exchange() -> String {
    DEFAULT_RETRY_EXCHANGE.to_string()
}
fn default_failed_exchange() -> String {
    DEFAULT_FAILED_EXCHANGE.to_string()
}
fn default_index_queue() -> String {
    "search.index".to_string()
}
fn default_delete_queue() -> String {
    "search.delete".to_string()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_schema() -> String {
    DATABASE_SCHEMA.to_string()
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// JSON table catalog replacing the built-in one
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,

    /// Entities to enable; all built-in entities when absent
    #[serde(default)]
    pub entities: Option<Vec<String>>,
}

impl SearchConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let display = path.display().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::unreadable(&display, e))?;
        Self::parse(&display, &content)
    }

    /// Parse configuration from a JSON string
    pub fn parse(source: &str, content: &str) -> ConfigResult<Self> {
        let config: SearchConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::malformed(source, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let broker = &self.broker;

        for (key, value) in [
            ("broker.retry_exchange", &broker.retry_exchange),
            ("broker.failed_exchange", &broker.failed_exchange),
            ("broker.index_queue", &broker.index_queue),
            ("broker.delete_queue", &broker.delete_queue),
            ("database.schema", &self.database.schema),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{} must not be empty", key)));
            }
        }

        if broker.retry_exchange == broker.failed_exchange {
            return Err(ConfigError::invalid(format!(
                "broker.retry_exchange and broker.failed_exchange are both '{}'",
                broker.retry_exchange
            )));
        }

        if broker.index_queue == broker.delete_queue {
            return Err(ConfigError::invalid(format!(
                "broker.index_queue and broker.delete_queue are both '{}'",
                broker.index_queue
            )));
        }

        if let Some(entities) = &self.entities {
            if entities.is_empty() {
                return Err(ConfigError::invalid("entities must not be an empty list"));
            }
        }

        Ok(())
    }

    /// Catalog file path, resolved against the config file's directory
    pub fn catalog_path(&self, config_path: &Path) -> Option<PathBuf> {
        let file = self.catalog_file.as_ref()?;
        if file.is_absolute() {
            return Some(file.clone());
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(file))
    }
}
