//! Foreign key fan-out
//!
//! A changed row can be embedded in documents of other entities. Two kinds
//! of links are derived from the entity declarations at startup:
//!
//! - dependents: an entity whose first hop is a many-to-one relationship
//!   onto the changed table. Affected ids are found with a projection
//!   query on the entity's root table.
//! - back references: an entity whose first hop is a one-to-many (or
//!   many-to-many) collection stored in the changed table. The changed row
//!   names its parent directly, so no query is needed.
//!
//! Every declared dependent is queried, in declaration order, regardless of
//! which columns changed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::errors::ProcessingError;
use super::store::{ProjectionQuery, Store};
use crate::amqp::Message;
use crate::entity::EntityRegistry;
use crate::schema::{Catalog, RelationKind, TableDef};

/// An entity embedding rows of another table through a many-to-one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependent {
    /// Entity name
    pub entity: String,
    /// Entity root table
    pub table: String,
    /// Key column selected from the root table
    pub key_column: String,
    /// Relationship name on the root table
    pub relationship: String,
    /// Database column holding the foreign key
    pub column: String,
}

impl Dependent {
    /// Projection query for a set of changed ids
    pub fn query(&self, schema: &str, ids: Vec<String>) -> ProjectionQuery {
        ProjectionQuery {
            entity: self.entity.clone(),
            schema: schema.to_string(),
            table: self.table.clone(),
            key_column: self.key_column.clone(),
            column: self.column.clone(),
            ids,
        }
    }
}

/// An entity whose collection rows live in another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackReference {
    /// Entity name
    pub entity: String,
    /// Relationship name on the entity's root table
    pub relationship: String,
    /// Database column of the child row naming the parent
    pub column: String,
}

/// Many-to-one link from a table to a parent table
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentLink {
    column: String,
    target: String,
}

/// Ids of one entity to re-index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReindexRequest {
    /// Entity name
    pub entity: String,
    /// Root ids, sorted
    pub ids: BTreeSet<String>,
}

/// Result of resolving one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fanout {
    /// Projection queries issued, in order
    pub queries: Vec<ProjectionQuery>,
    /// Re-index requests, one per entity, in first-seen order
    pub requests: Vec<ReindexRequest>,
}

impl Fanout {
    fn add(&mut self, entity: &str, ids: impl IntoIterator<Item = String>) {
        let ids: BTreeSet<String> = ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }
        match self.requests.iter_mut().find(|r| r.entity == entity) {
            Some(request) => request.ids.extend(ids),
            None => self.requests.push(ReindexRequest {
                entity: entity.to_string(),
                ids,
            }),
        }
    }

    /// True if nothing needs re-indexing
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Resolves changed rows to dependent entity ids
#[derive(Debug, Clone, Default)]
pub struct FanoutResolver {
    schema: String,
    entity_tables: BTreeSet<String>,
    known_tables: BTreeSet<String>,
    dependents: BTreeMap<String, Vec<Dependent>>,
    back_references: BTreeMap<String, Vec<BackReference>>,
    parents: BTreeMap<String, Vec<ParentLink>>,
}

impl FanoutResolver {
    /// Derives every dependency from the catalog and the entity declarations
    pub fn new(catalog: &Catalog, registry: &EntityRegistry, schema: impl Into<String>) -> Self {
        let mut resolver = Self {
            schema: schema.into(),
            known_tables: catalog.tables().map(|t| t.name.clone()).collect(),
            ..Self::default()
        };

        for table in catalog.tables() {
            let links = table
                .relationships
                .iter()
                .filter_map(|rel| match &rel.kind {
                    RelationKind::ManyToOne { foreign_key } => Some(ParentLink {
                        column: table.db_name(foreign_key).to_string(),
                        target: rel.target.clone(),
                    }),
                    _ => None,
                })
                .collect::<Vec<_>>();
            if !links.is_empty() {
                resolver.parents.insert(table.name.clone(), links);
            }
        }

        for entity in registry.iter() {
            let Some(root) = catalog.table(entity.model()) else {
                continue;
            };
            resolver.entity_tables.insert(root.name.clone());

            let mut seen = BTreeSet::new();
            for field in entity.fields() {
                for path in field.paths() {
                    let first = path.split('.').next().unwrap_or(path.as_str());
                    if seen.insert(first.to_string()) {
                        resolver.link(catalog, entity.name(), root, first);
                    }
                }
            }
        }

        resolver
    }

    fn link(&mut self, catalog: &Catalog, entity: &str, root: &TableDef, first_hop: &str) {
        let Some(rel) = root.relationship(first_hop) else {
            return;
        };

        match &rel.kind {
            RelationKind::ManyToOne { foreign_key } => {
                self.dependents
                    .entry(rel.target.clone())
                    .or_default()
                    .push(Dependent {
                        entity: entity.to_string(),
                        table: root.name.clone(),
                        key_column: root.key_column().to_string(),
                        relationship: rel.name.clone(),
                        column: root.db_name(foreign_key).to_string(),
                    });
            }
            RelationKind::OneToMany { foreign_key } => {
                let column = catalog
                    .table(&rel.target)
                    .map(|child| child.db_name(foreign_key).to_string())
                    .unwrap_or_else(|| foreign_key.clone());
                self.back_references
                    .entry(rel.target.clone())
                    .or_default()
                    .push(BackReference {
                        entity: entity.to_string(),
                        relationship: rel.name.clone(),
                        column,
                    });
            }
            RelationKind::ManyToMany {
                secondary,
                local_key,
                ..
            } => {
                let column = catalog
                    .table(secondary)
                    .map(|assoc| assoc.db_name(local_key).to_string())
                    .unwrap_or_else(|| local_key.clone());
                self.back_references
                    .entry(secondary.clone())
                    .or_default()
                    .push(BackReference {
                        entity: entity.to_string(),
                        relationship: rel.name.clone(),
                        column,
                    });
            }
        }
    }

    /// Database schema used in projection queries
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// True if some entity is rooted at the table
    pub fn is_entity_table(&self, table: &str) -> bool {
        self.entity_tables.contains(table)
    }

    /// Dependents declared on a table, in declaration order
    pub fn dependents_of(&self, table: &str) -> &[Dependent] {
        self.dependents.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Back references declared on a table
    pub fn back_references_of(&self, table: &str) -> &[BackReference] {
        self.back_references
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Projection queries a message triggers, in issue order.
    ///
    /// The changed row's own id is matched against its dependents. For
    /// rows of tables no entity is rooted at, each many-to-one foreign key
    /// present in the message is also matched against the dependents of
    /// the parent table.
    pub fn queries(&self, message: &Message) -> Result<Vec<ProjectionQuery>, ProcessingError> {
        if !self.known_tables.contains(&message.table) {
            return Err(ProcessingError::UnknownTable(message.table.clone()));
        }

        let mut queries = Vec::new();

        if let Some(id) = &message.id {
            for dependent in self.dependents_of(&message.table) {
                queries.push(dependent.query(&self.schema, vec![id.clone()]));
            }
        }

        if !self.is_entity_table(&message.table) {
            if let Some(links) = self.parents.get(&message.table) {
                for link in links {
                    let Some(parent_id) = message.column(&link.column) else {
                        continue;
                    };
                    for dependent in self.dependents_of(&link.target) {
                        queries.push(dependent.query(&self.schema, vec![parent_id.clone()]));
                    }
                }
            }
        }

        Ok(queries)
    }

    /// Resolves a message: issues every projection query and collects the
    /// returned ids, plus parents named directly by back references
    pub fn resolve(&self, message: &Message, store: &dyn Store) -> Result<Fanout, ProcessingError> {
        let queries = self.queries(message)?;
        let mut fanout = Fanout::default();

        for query in &queries {
            let ids = store.select_ids(query)?;
            fanout.add(&query.entity, ids);
        }

        for back_ref in self.back_references_of(&message.table) {
            if let Some(parent_id) = message.column(&back_ref.column) {
                fanout.add(&back_ref.entity, [parent_id]);
            }
        }

        fanout.queries = queries;
        Ok(fanout)
    }
}
