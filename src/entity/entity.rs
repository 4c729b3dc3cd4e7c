//! Search entities
//!
//! An entity binds a root table to its searchable fields. Its eager-load
//! plan is compiled once, at construction, and never changes afterwards.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::document::build_document;
use super::field::SearchField;
use crate::planner::{CompiledPlan, PlannerError, PlannerResult, QueryPlanner};
use crate::schema::Catalog;

/// Natural key attribute used to address documents in the index
pub const NATURAL_KEY: &str = "gid";

/// An indexable entity type
#[derive(Debug, Clone)]
pub struct SearchEntity {
    name: String,
    model: String,
    fields: Vec<SearchField>,
    version: f32,
    plan: CompiledPlan,
}

impl SearchEntity {
    /// Creates an entity and compiles its plan against the catalog.
    ///
    /// Fails if two fields share a name or any path cannot be planned.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        fields: Vec<SearchField>,
        version: f32,
        catalog: &Catalog,
    ) -> PlannerResult<Self> {
        let name = name.into();
        let model = model.into();

        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(PlannerError::duplicate_field(&name, field.name()));
            }
        }

        let plan = QueryPlanner::new(catalog).compile(&name, &model, &fields)?;

        Ok(Self {
            name,
            model,
            fields,
            version,
            plan,
        })
    }

    /// Entity name, which is also the index core it is written to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root table
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fields, in declaration order
    pub fn fields(&self) -> &[SearchField] {
        &self.fields
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&SearchField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Supported index schema version
    pub fn version(&self) -> f32 {
        self.version
    }

    /// Compiled eager-load plan
    pub fn plan(&self) -> &CompiledPlan {
        &self.plan
    }

    /// Builds the index document for one hydrated instance
    pub fn document(&self, instance: &Value) -> Map<String, Value> {
        build_document(&self.fields, instance)
    }

    /// Natural key of a hydrated instance, if present
    pub fn natural_key(instance: &Value) -> Option<String> {
        match instance.get(NATURAL_KEY)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
