//! Catalog loader for reading a table catalog from disk at startup
//!
//! - One JSON file: `{"tables": [...]}`
//! - Unreadable or invalid files cause startup failure (FATAL)

use std::fs;
use std::path::{Path, PathBuf};

use super::catalog::{Catalog, CatalogFile};
use super::errors::{SchemaError, SchemaResult};

/// Reads a catalog file and validates it.
pub struct CatalogLoader {
    path: PathBuf,
}

impl CatalogLoader {
    /// Creates a loader for the given catalog file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the catalog.
    pub fn load(&self) -> SchemaResult<Catalog> {
        let source = self.path.display().to_string();

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SchemaError::malformed(&source, format!("Failed to read file: {}", e)))?;

        Self::parse(&source, &content)
    }

    /// Parses catalog JSON from memory.
    pub fn parse(source: &str, content: &str) -> SchemaResult<Catalog> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(source, format!("Invalid JSON: {}", e)))?;

        Catalog::new(file.tables)
    }
}
