//! Entity registry
//!
//! Built once at startup, then shared read-only between workers.

use std::collections::BTreeMap;

use super::entity::SearchEntity;
use crate::planner::{PlannerError, PlannerResult};

/// Immutable, ordered set of search entities
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<SearchEntity>,
    by_name: BTreeMap<String, usize>,
}

impl EntityRegistry {
    /// Creates a registry, keeping declaration order.
    ///
    /// Entity names must be unique.
    pub fn new(entities: Vec<SearchEntity>) -> PlannerResult<Self> {
        let mut by_name = BTreeMap::new();
        for (i, entity) in entities.iter().enumerate() {
            if by_name.insert(entity.name().to_string(), i).is_some() {
                return Err(PlannerError::duplicate_entity(entity.name()));
            }
        }
        Ok(Self { entities, by_name })
    }

    /// Keeps only the named entities, in declaration order.
    ///
    /// Returns the first unknown name as the error.
    pub fn restrict<S: AsRef<str>>(self, names: &[S]) -> Result<Self, String> {
        for name in names {
            let name: &str = name.as_ref();
            if !self.by_name.contains_key(name) {
                return Err(name.to_string());
            }
        }

        let kept = self
            .entities
            .into_iter()
            .filter(|e| names.iter().any(|n| n.as_ref() == e.name()))
            .collect();

        Self::new(kept).map_err(|e| e.message().to_string())
    }

    /// Looks up an entity by name
    pub fn get(&self, name: &str) -> Option<&SearchEntity> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }

    /// Entity rooted at the given table, if any
    pub fn for_table(&self, table: &str) -> Option<&SearchEntity> {
        self.entities.iter().find(|e| e.model() == table)
    }

    /// Entities in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &SearchEntity> {
        self.entities.iter()
    }

    /// Entity names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.entities.iter().map(SearchEntity::name).collect()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is registered
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
