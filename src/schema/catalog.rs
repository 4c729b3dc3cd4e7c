//! Validated, immutable table catalog
//!
//! Built once at startup from a list of `TableDef`s. Construction checks
//! every cross-reference so the planner and the fan-out resolver can trust
//! lookups afterwards.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::types::{RelationKind, RelationshipDef, TableDef};

/// On-disk catalog layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Table definitions
    pub tables: Vec<TableDef>,
}

/// Immutable catalog of every table the indexer knows about
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: BTreeMap<String, TableDef>,
}

impl Catalog {
    /// Builds and validates a catalog.
    pub fn new(tables: impl IntoIterator<Item = TableDef>) -> SchemaResult<Self> {
        let mut map = BTreeMap::new();
        for table in tables {
            if map.contains_key(&table.name) {
                return Err(SchemaError::duplicate_table(&table.name));
            }
            map.insert(table.name.clone(), table);
        }

        let catalog = Self { tables: map };
        for table in catalog.tables.values() {
            catalog.validate_table(table)?;
        }
        Ok(catalog)
    }

    fn validate_table(&self, table: &TableDef) -> SchemaResult<()> {
        let mut names = HashSet::new();
        for name in table
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(table.relationships.iter().map(|r| r.name.as_str()))
        {
            if !names.insert(name) {
                return Err(SchemaError::duplicate_attribute(&table.name, name));
            }
        }

        for pk in &table.primary_key {
            if table.column(pk).is_none() {
                return Err(SchemaError::unknown_column(&table.name, pk, "Primary key"));
            }
        }

        for rel in &table.relationships {
            self.validate_relationship(table, rel)?;
        }
        Ok(())
    }

    fn validate_relationship(&self, table: &TableDef, rel: &RelationshipDef) -> SchemaResult<()> {
        let target = self
            .tables
            .get(&rel.target)
            .ok_or_else(|| SchemaError::unknown_target(&table.name, &rel.name, &rel.target))?;

        match &rel.kind {
            RelationKind::ManyToOne { foreign_key } => {
                if table.column(foreign_key).is_none() {
                    return Err(SchemaError::unknown_column(
                        &table.name,
                        foreign_key,
                        "Foreign key",
                    ));
                }
            }
            RelationKind::OneToMany { foreign_key } => {
                if target.column(foreign_key).is_none() {
                    return Err(SchemaError::unknown_column(
                        &target.name,
                        foreign_key,
                        "Foreign key",
                    ));
                }
            }
            RelationKind::ManyToMany {
                secondary,
                local_key,
                remote_key,
            } => {
                let assoc = self.tables.get(secondary).ok_or_else(|| {
                    SchemaError::unknown_target(&table.name, &rel.name, secondary)
                })?;
                for key in [local_key, remote_key] {
                    if assoc.column(key).is_none() {
                        return Err(SchemaError::unknown_column(
                            &assoc.name,
                            key,
                            "Association key",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks up a table
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Returns true if the table is declared
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterates tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Number of declared tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if no tables are declared
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
