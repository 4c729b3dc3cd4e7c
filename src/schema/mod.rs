//! Static table catalog
//!
//! Describes every table the indexer reads: columns (attribute name and
//! database column name), primary key, and relationships tagged with
//! their kind. The catalog is validated once at startup and is read-only
//! afterwards.

mod catalog;
mod errors;
mod loader;
pub mod musicbrainz;
mod types;

pub use catalog::{Catalog, CatalogFile};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::CatalogLoader;
pub use types::{Attribute, ColumnDef, RelationKind, RelationshipDef, TableDef, DEFAULT_PRIMARY_KEY};
