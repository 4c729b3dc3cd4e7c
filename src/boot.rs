//! Startup sequence
//!
//! 1. Configuration load and validation
//! 2. Table catalog (file or built-in)
//! 3. Entity registry, every plan compiled
//! 4. Fan-out links derived from the registry
//!
//! Any failure here is fatal; nothing is consumed before the sequence
//! completes. The resulting state is read-only and shared by all workers.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::amqp::Channel;
use crate::config::{ConfigError, SearchConfig};
use crate::entity::{musicbrainz, EntityRegistry};
use crate::indexer::{Dispatcher, FanoutResolver, IndexSink, Store, Worker};
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry};
use crate::planner::PlannerError;
use crate::schema::{self, Catalog, CatalogLoader, SchemaError};

/// Fatal startup failure
#[derive(Debug, Clone, Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Planner(#[from] PlannerError),
}

impl BootError {
    /// String code of the underlying error
    pub fn code(&self) -> &'static str {
        match self {
            BootError::Config(e) => e.code().code(),
            BootError::Schema(e) => e.code().code(),
            BootError::Planner(e) => e.code().code(),
        }
    }
}

/// Shared state of a booted process
#[derive(Debug, Clone)]
pub struct Runtime {
    config: SearchConfig,
    catalog: Arc<Catalog>,
    registry: Arc<EntityRegistry>,
    fanout: Arc<FanoutResolver>,
    metrics: Arc<MetricsRegistry>,
}

impl Runtime {
    /// Loads the configuration file and boots from it
    pub fn boot(config_path: &Path) -> Result<Self, BootError> {
        log_event(Event::BootStart);

        let result = SearchConfig::load(config_path)
            .map_err(BootError::from)
            .and_then(|config| {
                let catalog_path = config.catalog_path(config_path);
                Self::assemble(config, catalog_path.as_deref())
            });

        if let Err(err) = &result {
            report_failure(err);
        }
        result
    }

    /// Boots from an already loaded configuration.
    ///
    /// A relative `catalog_file` is resolved against the working directory.
    pub fn from_config(config: SearchConfig) -> Result<Self, BootError> {
        log_event(Event::BootStart);

        let catalog_path = config.catalog_file.clone();
        let result = config
            .validate()
            .map_err(BootError::from)
            .and_then(|()| Self::assemble(config, catalog_path.as_deref()));

        if let Err(err) = &result {
            report_failure(err);
        }
        result
    }

    fn assemble(config: SearchConfig, catalog_path: Option<&Path>) -> Result<Self, BootError> {
        let max_retries = config.broker.max_retries.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("max_retries", max_retries.as_str()),
                ("retry_exchange", config.broker.retry_exchange.as_str()),
                ("schema", config.database.schema.as_str()),
            ],
        );

        let (catalog, source) = match catalog_path {
            Some(path) => (CatalogLoader::new(path).load()?, path.display().to_string()),
            None => (schema::musicbrainz::catalog()?, "builtin".to_string()),
        };
        let table_count = catalog.len().to_string();
        log_event_with_fields(
            Event::CatalogLoaded,
            &[("source", source.as_str()), ("tables", table_count.as_str())],
        );

        let mut registry = musicbrainz::registry(&catalog)?;
        if let Some(enabled) = &config.entities {
            registry = registry
                .restrict(enabled.as_slice())
                .map_err(|name| ConfigError::unknown_entity(&name))?;
        }
        let names = registry.names().join(",");
        let entity_count = registry.len().to_string();
        log_event_with_fields(
            Event::PlansCompiled,
            &[("entities", entity_count.as_str()), ("names", names.as_str())],
        );

        let fanout = FanoutResolver::new(&catalog, &registry, config.database.schema.clone());

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            registry: Arc::new(registry),
            fanout: Arc::new(fanout),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub fn fanout(&self) -> &Arc<FanoutResolver> {
        &self.fanout
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Dispatcher writing through the given store and sink
    pub fn dispatcher(&self, store: Arc<dyn Store>, sink: Arc<dyn IndexSink>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.fanout),
            store,
            sink,
            Arc::clone(&self.metrics),
        )
    }

    /// Worker settling deliveries on `channel`
    pub fn worker(
        &self,
        name: impl Into<String>,
        dispatcher: Arc<Dispatcher>,
        channel: Arc<dyn Channel>,
    ) -> Worker {
        Worker::new(
            name,
            self.config.broker.router(),
            dispatcher,
            channel,
            self.config.broker.delete_queue.clone(),
            Arc::clone(&self.metrics),
        )
    }
}

fn report_failure(err: &BootError) {
    let message = err.to_string();
    log_event_with_fields(
        Event::BootFailed,
        &[("code", err.code()), ("error", message.as_str())],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigErrorCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_boot_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();

        let runtime = Runtime::boot(file.path()).unwrap();
        assert_eq!(
            runtime.registry().names(),
            vec!["area", "artist", "label", "place"]
        );
        assert_eq!(runtime.fanout().schema(), "musicbrainz");
        assert!(runtime.catalog().table("artist_tag").is_some());
    }

    #[test]
    fn test_entity_subset() {
        let config = SearchConfig {
            entities: Some(vec!["place".to_string()]),
            ..SearchConfig::default()
        };
        let runtime = Runtime::from_config(config).unwrap();
        assert_eq!(runtime.registry().names(), vec!["place"]);
        assert!(runtime.fanout().dependents_of("artist").is_empty());
        assert_eq!(runtime.fanout().dependents_of("area").len(), 1);
    }

    #[test]
    fn test_unknown_entity_is_fatal() {
        let config = SearchConfig {
            entities: Some(vec!["recording".to_string()]),
            ..SearchConfig::default()
        };
        let err = Runtime::from_config(config).unwrap_err();
        assert_eq!(err.code(), "SEARCH_CONFIG_UNKNOWN_ENTITY");
        match err {
            BootError::Config(e) => {
                assert_eq!(e.code(), ConfigErrorCode::SearchConfigUnknownEntity)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_catalog_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"catalog_file": "does-not-exist.json"}}"#).unwrap();

        let err = Runtime::boot(file.path()).unwrap_err();
        assert!(matches!(err, BootError::Schema(_)));
    }

    #[test]
    fn test_worker_uses_configured_router() {
        let config = SearchConfig::parse("inline", r#"{"broker": {"max_retries": 1}}"#).unwrap();
        let runtime = Runtime::from_config(config).unwrap();
        assert_eq!(runtime.config().broker.router().max_retries(), 1);
    }
}
