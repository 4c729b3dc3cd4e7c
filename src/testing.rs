//! In-memory doubles for the broker channel, the relational store and the
//! search sink. Every call is recorded so tests can assert on exact
//! interaction sequences.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::amqp::{scalar_string, BrokerError, BrokerResult, Channel, Delivery};
use crate::indexer::{IndexSink, ProjectionQuery, SinkError, Store, StoreError};
use crate::planner::{CompiledPlan, LoadDirective};
use crate::schema::{Catalog, RelationKind, TableDef};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Broker channel
// ---------------------------------------------------------------------------

/// A message republished through the channel
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub exchange: String,
    pub routing_key: String,
    pub delivery: Delivery,
}

/// One call made on a [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Ack { tag: u64 },
    Reject { tag: u64, requeue: bool },
    Publish(Published),
}

/// Channel that records every call
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<ChannelCall>>,
    closed: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every further call fail with [`BrokerError::Closed`]
    pub fn set_closed(&self, closed: bool) {
        self.closed.store(closed, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        lock(&self.calls).clone()
    }

    pub fn acks(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ChannelCall::Ack { .. }))
            .count()
    }

    pub fn rejects(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ChannelCall::Reject { .. }))
            .count()
    }

    pub fn published(&self) -> Vec<Published> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ChannelCall::Publish(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChannelCall) -> BrokerResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl Channel for RecordingChannel {
    fn ack(&self, tag: u64) -> BrokerResult<()> {
        self.record(ChannelCall::Ack { tag })
    }

    fn reject(&self, tag: u64, requeue: bool) -> BrokerResult<()> {
        self.record(ChannelCall::Reject { tag, requeue })
    }

    fn publish(&self, delivery: &Delivery, exchange: &str, routing_key: &str) -> BrokerResult<()> {
        self.record(ChannelCall::Publish(Published {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            delivery: delivery.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Relational store
// ---------------------------------------------------------------------------

/// One call made on a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch { entity: String, ids: Vec<String> },
    Select(ProjectionQuery),
}

/// Store holding rows in memory, keyed by attribute name.
///
/// `fetch` hydrates instances the way a plan says: root rows whole,
/// related rows reduced to the columns the plan loads at their hop. A
/// document built from the result is therefore missing anything the plan
/// deferred.
#[derive(Debug)]
pub struct MemoryStore {
    catalog: Arc<Catalog>,
    rows: Mutex<BTreeMap<String, Vec<Value>>>,
    calls: Mutex<Vec<StoreCall>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            rows: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Adds a row to a table
    pub fn insert(&self, table: &str, row: Value) {
        lock(&self.rows).entry(table.to_string()).or_default().push(row);
    }

    /// Makes every further call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Projection queries issued, in order
    pub fn selects(&self) -> Vec<ProjectionQuery> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                StoreCall::Select(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn table(&self, name: &str) -> Result<&TableDef, StoreError> {
        self.catalog
            .table(name)
            .ok_or_else(|| StoreError::Query(format!("no table '{}'", name)))
    }

    fn rows_where(&self, table: &str, attribute: &str, value: &str) -> Vec<Value> {
        lock(&self.rows)
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| attr(row, attribute).as_deref() == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn hydrate(
        &self,
        plan: &CompiledPlan,
        table: &TableDef,
        parent_path: &str,
        mut row: Map<String, Value>,
    ) -> Result<Map<String, Value>, StoreError> {
        let key = row.get(table.key_column()).and_then(scalar_string);

        for directive in plan.children(parent_path) {
            let Some(rel) = table.relationship(directive.relationship()) else {
                continue;
            };
            let target = self.table(&rel.target)?;

            let value = match &rel.kind {
                RelationKind::ManyToOne { foreign_key } => {
                    let fk = row.get(foreign_key).and_then(scalar_string);
                    let found = fk
                        .map(|fk| self.rows_where(&target.name, target.key_column(), &fk))
                        .unwrap_or_default();
                    match found.into_iter().next() {
                        Some(related) => Value::Object(self.load(plan, target, directive, &related)?),
                        None => Value::Null,
                    }
                }
                RelationKind::OneToMany { foreign_key } => {
                    let mut related = key
                        .as_deref()
                        .map(|k| self.rows_where(&target.name, foreign_key, k))
                        .unwrap_or_default();
                    related.sort_by_key(|r| r.get("position").and_then(Value::as_i64));
                    let loaded = related
                        .iter()
                        .map(|r| self.load(plan, target, directive, r).map(Value::Object))
                        .collect::<Result<Vec<_>, _>>()?;
                    Value::Array(loaded)
                }
                RelationKind::ManyToMany {
                    secondary,
                    local_key,
                    remote_key,
                } => {
                    let links = key
                        .as_deref()
                        .map(|k| self.rows_where(secondary, local_key, k))
                        .unwrap_or_default();
                    let mut loaded = Vec::new();
                    for link in links {
                        let Some(remote) = attr(&link, remote_key) else {
                            continue;
                        };
                        for related in self.rows_where(&target.name, target.key_column(), &remote) {
                            loaded.push(Value::Object(self.load(plan, target, directive, &related)?));
                        }
                    }
                    Value::Array(loaded)
                }
            };

            row.insert(rel.name.clone(), value);
        }

        Ok(row)
    }

    /// Keeps only the columns loaded at the hop, then hydrates below it
    fn load(
        &self,
        plan: &CompiledPlan,
        table: &TableDef,
        directive: &LoadDirective,
        row: &Value,
    ) -> Result<Map<String, Value>, StoreError> {
        let projected = row
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(column, _)| directive.loads(column))
                    .map(|(column, value)| (column.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        self.hydrate(plan, table, &directive.path, projected)
    }
}

fn attr(row: &Value, attribute: &str) -> Option<String> {
    row.get(attribute).and_then(scalar_string)
}

impl Store for MemoryStore {
    fn fetch(&self, plan: &CompiledPlan, ids: &[String]) -> Result<Vec<Value>, StoreError> {
        self.check_available()?;
        lock(&self.calls).push(StoreCall::Fetch {
            entity: plan.entity().to_string(),
            ids: ids.to_vec(),
        });

        let root = self.table(plan.root())?;
        let mut instances = Vec::new();
        for id in ids {
            for row in self.rows_where(&root.name, root.key_column(), id) {
                let row = row.as_object().cloned().unwrap_or_default();
                instances.push(Value::Object(self.hydrate(plan, root, "", row)?));
            }
        }
        Ok(instances)
    }

    fn select_ids(&self, query: &ProjectionQuery) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        lock(&self.calls).push(StoreCall::Select(query.clone()));

        let table = self.table(&query.table)?;
        let attribute = table
            .columns
            .iter()
            .find(|c| c.db_name() == query.column)
            .map(|c| c.name.as_str())
            .unwrap_or(query.column.as_str());

        let mut ids = Vec::new();
        for value in &query.ids {
            for row in self.rows_where(&table.name, attribute, value) {
                if let Some(id) = attr(&row, &query.key_column) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Search sink
// ---------------------------------------------------------------------------

/// One call made on a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Index {
        entity: String,
        document: Map<String, Value>,
    },
    Delete {
        entity: String,
        key: String,
    },
}

/// Sink that records every call
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every further call fail with [`SinkError::Unavailable`]
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        lock(&self.calls).clone()
    }

    /// Indexed documents, in write order
    pub fn indexed(&self) -> Vec<(String, Map<String, Value>)> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                SinkCall::Index { entity, document } => Some((entity.clone(), document.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("recording sink marked failing".into()));
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl IndexSink for RecordingSink {
    fn index(&self, entity: &str, document: Map<String, Value>) -> Result<(), SinkError> {
        self.record(SinkCall::Index {
            entity: entity.to_string(),
            document,
        })
    }

    fn delete(&self, entity: &str, key: &str) -> Result<(), SinkError> {
        self.record(SinkCall::Delete {
            entity: entity.to_string(),
            key: key.to_string(),
        })
    }
}
