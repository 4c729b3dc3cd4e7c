//! Compiled eager-load plans
//!
//! A plan is built once per entity and never mutated. It names the root
//! table and, for every relationship hop reachable from the entity's field
//! paths, how the hop is loaded and which of its columns are skipped.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::schema::RelationKind;

/// How one relationship hop is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Joined into the parent query
    Join,
    /// Separate query keyed by the set of parent ids
    BatchedSecondaryQuery,
    /// Whatever the store does for this relationship by default
    Default,
}

impl LoadStrategy {
    /// Strategy for a relationship kind.
    ///
    /// Many-to-one joins fan out at most one row per parent. One-to-many
    /// would multiply parent rows if joined, so it is batched instead.
    pub fn for_relation(kind: &RelationKind) -> Self {
        match kind {
            RelationKind::ManyToOne { .. } => LoadStrategy::Join,
            RelationKind::OneToMany { .. } => LoadStrategy::BatchedSecondaryQuery,
            RelationKind::ManyToMany { .. } => LoadStrategy::Default,
        }
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::Join => "JOIN",
            LoadStrategy::BatchedSecondaryQuery => "BATCHED_SECONDARY_QUERY",
            LoadStrategy::Default => "DEFAULT",
        }
    }
}

/// Load directive for one relationship hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadDirective {
    /// Dotted relationship path from the root (`area`, `aliases.type`)
    pub path: String,
    /// Table the hop lands on
    pub table: String,
    /// How the hop is loaded
    pub strategy: LoadStrategy,
    /// Columns loaded at this hop
    pub loaded: BTreeSet<String>,
    /// Columns skipped at this hop
    pub deferred: BTreeSet<String>,
}

impl LoadDirective {
    /// Path of the hop this one hangs off; empty for first hops
    pub fn parent_path(&self) -> &str {
        parent_of(&self.path)
    }

    /// Relationship name on the parent table
    pub fn relationship(&self) -> &str {
        self.path
            .rsplit_once('.')
            .map(|(_, last)| last)
            .unwrap_or(&self.path)
    }

    /// True if the column is loaded at this hop
    pub fn loads(&self, column: &str) -> bool {
        self.loaded.contains(column)
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

/// Immutable, reusable eager-load plan for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledPlan {
    entity: String,
    root: String,
    directives: BTreeMap<String, LoadDirective>,
}

impl CompiledPlan {
    pub(crate) fn new(
        entity: impl Into<String>,
        root: impl Into<String>,
        directives: BTreeMap<String, LoadDirective>,
    ) -> Self {
        Self {
            entity: entity.into(),
            root: root.into(),
            directives,
        }
    }

    /// Entity the plan belongs to
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Root table; all of its columns are loaded
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Directive for a relationship path
    pub fn directive(&self, path: &str) -> Option<&LoadDirective> {
        self.directives.get(path)
    }

    /// All directives, parents before children
    pub fn directives(&self) -> impl Iterator<Item = &LoadDirective> {
        self.directives.values()
    }

    /// Directives hanging directly off `parent` (empty string for the root)
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a LoadDirective> {
        self.directives
            .values()
            .filter(move |d| d.parent_path() == parent)
    }

    /// True if the column is skipped at the given hop
    pub fn is_deferred(&self, path: &str, column: &str) -> bool {
        self.directives
            .get(path)
            .map(|d| d.deferred.contains(column))
            .unwrap_or(false)
    }

    /// Number of relationship hops
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// True if the plan loads only root columns
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
