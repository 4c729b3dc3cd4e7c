//! Relational store and search sink boundaries

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::{SinkError, StoreError};
use crate::planner::CompiledPlan;

/// Narrow query selecting the ids of rows that reference changed rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionQuery {
    /// Entity the returned ids belong to
    pub entity: String,
    /// Database schema
    pub schema: String,
    /// Table queried (the entity's root table)
    pub table: String,
    /// Column selected
    pub key_column: String,
    /// Foreign key column filtered on
    pub column: String,
    /// Values the foreign key is matched against
    pub ids: Vec<String>,
}

impl ProjectionQuery {
    /// SQL text with a single `:ids` bind parameter
    pub fn sql(&self) -> String {
        format!(
            "SELECT {table}.{key} FROM {schema}.{table} WHERE {table}.{column} IN (:ids)",
            table = self.table,
            key = self.key_column,
            schema = self.schema,
            column = self.column,
        )
    }
}

/// Relational store the plans run against
pub trait Store: Send + Sync {
    /// Runs a compiled plan for a set of root ids, returning hydrated
    /// instances (relationships nested under their names)
    fn fetch(&self, plan: &CompiledPlan, ids: &[String]) -> Result<Vec<Value>, StoreError>;

    /// Runs a projection query, returning the selected ids
    fn select_ids(&self, query: &ProjectionQuery) -> Result<Vec<String>, StoreError>;
}

/// Search index documents are written to
pub trait IndexSink: Send + Sync {
    /// Upserts a document
    fn index(&self, entity: &str, document: Map<String, Value>) -> Result<(), SinkError>;

    /// Deletes a document by natural key
    fn delete(&self, entity: &str, key: &str) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_sql() {
        let query = ProjectionQuery {
            entity: "place".into(),
            schema: "musicbrainz".into(),
            table: "place".into(),
            key_column: "id".into(),
            column: "area".into(),
            ids: vec!["2".into()],
        };
        assert_eq!(
            query.sql(),
            "SELECT place.id FROM musicbrainz.place WHERE place.area IN (:ids)"
        );
    }
}
