//! Search entities and their documents
//!
//! An entity is a root table plus the searchable fields indexed for it.
//! Entities are declared once, their plans compiled at construction, and
//! the resulting registry is shared read-only by every worker.

mod document;
mod entity;
mod field;
pub mod musicbrainz;
mod registry;

pub use document::{build_document, field_values, values_at};
pub use entity::{SearchEntity, NATURAL_KEY};
pub use field::{SearchField, Transform};
pub use registry::EntityRegistry;
