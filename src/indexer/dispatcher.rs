//! Message dispatch
//!
//! Routes one parsed change notification:
//! - delete carrying a natural key removes that document, nothing else
//! - delete of a child row without one re-indexes the rows that embedded it
//! - insert/update re-indexes the row itself (entity tables) and every
//!   fan-out dependent
//!
//! Runs inside the retry router; every error is a per-message failure.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::ProcessingError;
use super::fanout::{Fanout, FanoutResolver};
use super::store::{IndexSink, Store};
use crate::amqp::{scalar_string, Message, Operation};
use crate::entity::{EntityRegistry, SearchEntity, NATURAL_KEY};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// What one dispatch did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Documents written
    pub indexed: usize,
    /// Documents deleted
    pub deleted: usize,
    /// Projection queries issued
    pub fanout_queries: usize,
}

/// Routes messages to the store and the sink
pub struct Dispatcher {
    registry: Arc<EntityRegistry>,
    fanout: Arc<FanoutResolver>,
    store: Arc<dyn Store>,
    sink: Arc<dyn IndexSink>,
    metrics: Arc<MetricsRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared, read-only entity state
    pub fn new(
        registry: Arc<EntityRegistry>,
        fanout: Arc<FanoutResolver>,
        store: Arc<dyn Store>,
        sink: Arc<dyn IndexSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            registry,
            fanout,
            store,
            sink,
            metrics,
        }
    }

    /// Entity registry
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Handles one message
    pub fn dispatch(&self, message: &Message) -> Result<DispatchReport, ProcessingError> {
        let entity = self.registry.for_table(&message.table);

        match (message.operation, entity) {
            (Operation::Delete, entity) if message.gid.is_some() || entity.is_some() => {
                let key = message.gid.as_deref().ok_or_else(|| missing_key(message, NATURAL_KEY))?;
                let name = entity.map_or(message.table.as_str(), |e| e.name());
                self.sink.delete(name, key)?;
                self.metrics.increment_documents_deleted();
                log_event_with_fields(Event::DocumentDeleted, &[("entity", name), ("key", key)]);
                Ok(DispatchReport {
                    deleted: 1,
                    ..DispatchReport::default()
                })
            }
            (Operation::Delete, _) => self.reindex_dependents(message, DispatchReport::default()),
            (Operation::Insert | Operation::Update, Some(entity)) => {
                let id = message.id.as_deref().ok_or_else(|| missing_key(message, "id"))?;
                let ids = BTreeSet::from([id.to_string()]);
                let report = DispatchReport {
                    indexed: self.reindex(entity.name(), &ids)?,
                    ..DispatchReport::default()
                };
                self.reindex_dependents(message, report)
            }
            (Operation::Insert | Operation::Update, None) => {
                self.reindex_dependents(message, DispatchReport::default())
            }
        }
    }

    fn reindex_dependents(
        &self,
        message: &Message,
        mut report: DispatchReport,
    ) -> Result<DispatchReport, ProcessingError> {
        let fanout = self.fanout.resolve(message, self.store.as_ref())?;
        self.metrics.add_fanout_queries(fanout.queries.len() as u64);
        log_fanout(message, &fanout);

        report.fanout_queries = fanout.queries.len();
        for request in &fanout.requests {
            report.indexed += self.reindex(&request.entity, &request.ids)?;
        }
        Ok(report)
    }

    /// Loads the given root ids with the entity's plan and writes one
    /// document per instance. Returns the number of documents written.
    pub fn reindex(&self, entity: &str, ids: &BTreeSet<String>) -> Result<usize, ProcessingError> {
        let Some(entity) = self.registry.get(entity) else {
            return Ok(0);
        };
        let ids: Vec<String> = ids.iter().cloned().collect();
        let instances = self.store.fetch(entity.plan(), &ids)?;

        for instance in &instances {
            self.sink.index(entity.name(), entity.document(instance))?;
            let id = instance
                .get("id")
                .and_then(scalar_string)
                .unwrap_or_default();
            let key = SearchEntity::natural_key(instance).unwrap_or_default();
            log_event_with_fields(
                Event::DocumentIndexed,
                &[
                    ("entity", entity.name()),
                    ("id", id.as_str()),
                    ("key", key.as_str()),
                ],
            );
        }

        self.metrics.add_documents_indexed(instances.len() as u64);
        Ok(instances.len())
    }
}

fn missing_key(message: &Message, key: &str) -> ProcessingError {
    ProcessingError::MissingKey {
        table: message.table.clone(),
        operation: message.operation.to_string(),
        key: key.to_string(),
    }
}

fn log_fanout(message: &Message, fanout: &Fanout) {
    let entities = fanout
        .requests
        .iter()
        .map(|r| format!("{}:{}", r.entity, r.ids.len()))
        .collect::<Vec<_>>()
        .join(",");
    let queries = fanout.queries.len().to_string();
    log_event_with_fields(
        Event::FanoutResolved,
        &[
            ("entities", entities.as_str()),
            ("queries", queries.as_str()),
            ("table", message.table.as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::musicbrainz;
    use crate::schema::musicbrainz as mb_schema;
    use crate::testing::{MemoryStore, RecordingSink, SinkCall};
    use serde_json::{json, Map, Value};

    struct Fixture {
        dispatcher: Dispatcher,
        store: Arc<MemoryStore>,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(mb_schema::catalog().unwrap());
        let registry = Arc::new(musicbrainz::registry(&catalog).unwrap());
        let fanout = Arc::new(FanoutResolver::new(&catalog, &registry, "musicbrainz"));
        let store = Arc::new(MemoryStore::new(Arc::clone(&catalog)));
        let sink = Arc::new(RecordingSink::new());

        store.insert("area", json!({"id": 2, "gid": "area-2", "name": "Berlin"}));
        store.insert(
            "place",
            json!({"id": 5, "gid": "place-5", "name": "Berghain", "area_id": 2}),
        );

        let dispatcher = Dispatcher::new(
            registry,
            fanout,
            store.clone(),
            sink.clone(),
            Arc::new(MetricsRegistry::new()),
        );
        Fixture {
            dispatcher,
            store,
            sink,
        }
    }

    fn message(table: &str, columns: Value, operation: Operation) -> Message {
        let columns: Map<String, Value> = columns.as_object().cloned().unwrap_or_default();
        Message::new(table, columns, operation)
    }

    #[test]
    fn test_delete_entity_by_gid() {
        let f = fixture();
        let report = f
            .dispatcher
            .dispatch(&message("area", json!({"gid": "area-2"}), Operation::Delete))
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(
            f.sink.calls(),
            vec![SinkCall::Delete {
                entity: "area".into(),
                key: "area-2".into()
            }]
        );
        assert!(f.store.calls().is_empty());
    }

    #[test]
    fn test_delete_without_gid_fails() {
        let f = fixture();
        let err = f
            .dispatcher
            .dispatch(&message("area", json!({"id": "2"}), Operation::Delete))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MissingKey { .. }));
        assert!(f.sink.calls().is_empty());
    }

    #[test]
    fn test_child_delete_with_gid_skips_planning() {
        let f = fixture();
        let report = f
            .dispatcher
            .dispatch(&message("area_alias", json!({"gid": "alias-1"}), Operation::Delete))
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(
            f.sink.calls(),
            vec![SinkCall::Delete {
                entity: "area_alias".into(),
                key: "alias-1".into()
            }]
        );
        assert!(f.store.calls().is_empty());
    }

    #[test]
    fn test_child_delete_without_gid_fans_out() {
        let f = fixture();
        let report = f
            .dispatcher
            .dispatch(&message(
                "area_alias",
                json!({"id": "9", "area": "2"}),
                Operation::Delete,
            ))
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.fanout_queries, 5);
        assert!(f
            .sink
            .calls()
            .iter()
            .all(|c| !matches!(c, SinkCall::Delete { .. })));
        assert!(f.sink.indexed().iter().any(|(entity, _)| entity == "area"));
    }

    #[test]
    fn test_update_reindexes_row_and_dependents() {
        let f = fixture();
        let report = f
            .dispatcher
            .dispatch(&message("area", json!({"id": "2"}), Operation::Update))
            .unwrap();

        assert_eq!(report.fanout_queries, 5);
        assert_eq!(report.indexed, 2);

        let indexed = f.sink.indexed();
        assert_eq!(indexed[0].0, "area");
        assert_eq!(indexed[0].1["area"], json!("Berlin"));
        assert_eq!(indexed[1].0, "place");
        assert_eq!(indexed[1].1["area"], json!("Berlin"));
    }

    #[test]
    fn test_store_outage_is_a_processing_error() {
        let f = fixture();
        f.store.set_unavailable(true);
        let err = f
            .dispatcher
            .dispatch(&message("area", json!({"id": "2"}), Operation::Update))
            .unwrap_err();
        assert!(err.is_transport());
        assert!(f.sink.calls().is_empty());
    }
}
