//! Table catalog type definitions
//!
//! Every indexed table is described statically: its columns, its primary
//! key and its relationships, each tagged with a kind that fixes the
//! cardinality and the side holding the foreign key. Nothing is discovered
//! from a live database.

use serde::{Deserialize, Serialize};

/// Default primary key column
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// A plain column.
///
/// `name` is the attribute used in field paths and in hydrated rows;
/// `column` is the database column name when it differs (the `area_id`
/// attribute is stored in the `area` column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnSpec")]
pub struct ColumnDef {
    /// Attribute name
    pub name: String,
    /// Database column name, if different from the attribute name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl ColumnDef {
    /// Column whose database name equals its attribute name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
        }
    }

    /// Column stored under a different database name
    pub fn mapped(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
        }
    }

    /// Name of the column in the database
    pub fn db_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Catalog files may write a column as a bare string or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Bare(String),
    Full {
        name: String,
        #[serde(default)]
        column: Option<String>,
    },
}

impl From<ColumnSpec> for ColumnDef {
    fn from(raw: ColumnSpec) -> Self {
        match raw {
            ColumnSpec::Bare(name) => ColumnDef::new(name),
            ColumnSpec::Full { name, column } => ColumnDef { name, column },
        }
    }
}

/// Relationship kind, carrying the keys that implement it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    /// This row references one parent through `foreign_key` (on this table)
    ManyToOne {
        /// Foreign key attribute on the declaring table
        foreign_key: String,
    },
    /// Many children reference this row through `foreign_key` (on the target)
    OneToMany {
        /// Foreign key attribute on the target table
        foreign_key: String,
    },
    /// Rows are linked through an association table
    ManyToMany {
        /// Association table name
        secondary: String,
        /// Association column referencing the declaring table
        local_key: String,
        /// Association column referencing the target table
        remote_key: String,
    },
}

impl RelationKind {
    /// Returns the kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ManyToOne { .. } => "many_to_one",
            RelationKind::OneToMany { .. } => "one_to_many",
            RelationKind::ManyToMany { .. } => "many_to_many",
        }
    }
}

/// A named relationship from one table to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Attribute name used in field paths
    pub name: String,
    /// Target table
    pub target: String,
    /// Kind and keys
    #[serde(flatten)]
    pub kind: RelationKind,
}

/// Static description of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Primary key columns
    #[serde(default = "default_primary_key")]
    pub primary_key: Vec<String>,
    /// Plain columns, in declaration order
    pub columns: Vec<ColumnDef>,
    /// Relationships, in declaration order
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
}

fn default_primary_key() -> Vec<String> {
    vec![DEFAULT_PRIMARY_KEY.to_string()]
}

/// Result of resolving a path segment against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// Plain column
    Column(&'a ColumnDef),
    /// Relationship to descend into
    Relationship(&'a RelationshipDef),
}

impl TableDef {
    /// Creates a table with the default `id` primary key and no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Replaces the primary key
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds plain columns whose database names equal their attribute names
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(ColumnDef::new));
        self
    }

    /// Adds a column stored under a different database name
    pub fn with_mapped_column(mut self, name: &str, column: &str) -> Self {
        self.columns.push(ColumnDef::mapped(name, column));
        self
    }

    /// Adds a many-to-one relationship keyed by `foreign_key` on this table
    pub fn many_to_one(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationships.push(RelationshipDef {
            name: name.to_string(),
            target: target.to_string(),
            kind: RelationKind::ManyToOne {
                foreign_key: foreign_key.to_string(),
            },
        });
        self
    }

    /// Adds a one-to-many relationship keyed by `foreign_key` on the target
    pub fn one_to_many(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationships.push(RelationshipDef {
            name: name.to_string(),
            target: target.to_string(),
            kind: RelationKind::OneToMany {
                foreign_key: foreign_key.to_string(),
            },
        });
        self
    }

    /// Adds a many-to-many relationship through an association table
    pub fn many_to_many(
        mut self,
        name: &str,
        target: &str,
        secondary: &str,
        local_key: &str,
        remote_key: &str,
    ) -> Self {
        self.relationships.push(RelationshipDef {
            name: name.to_string(),
            target: target.to_string(),
            kind: RelationKind::ManyToMany {
                secondary: secondary.to_string(),
                local_key: local_key.to_string(),
                remote_key: remote_key.to_string(),
            },
        });
        self
    }

    /// Looks up a column by attribute name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a relationship by name
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Resolves a path segment. Relationships and columns never share names.
    pub fn resolve(&self, segment: &str) -> Option<Attribute<'_>> {
        if let Some(rel) = self.relationship(segment) {
            return Some(Attribute::Relationship(rel));
        }
        self.column(segment).map(Attribute::Column)
    }

    /// True if the column is part of the primary key
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    /// First primary key column; rows are addressed by it
    pub fn key_column(&self) -> &str {
        self.primary_key
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// Database name of an attribute, falling back to the attribute itself
    pub fn db_name<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.column(attribute)
            .map(ColumnDef::db_name)
            .unwrap_or(attribute)
    }
}
