//! Searchable fields

use serde_json::Value;

/// Pure function applied to every value of a field before indexing
pub type Transform = fn(Value) -> Value;

/// One searchable field of an entity.
///
/// Each path is a dotted walk from the entity's root table; the values
/// found at the end of all paths are collected into the field.
#[derive(Debug, Clone)]
pub struct SearchField {
    name: String,
    paths: Vec<String>,
    transform: Option<Transform>,
}

impl SearchField {
    /// Creates a field from its name and paths
    pub fn new<I, S>(name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            transform: None,
        }
    }

    /// Attaches a transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Field name in the index
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Paths, in declaration order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Transform, if any
    pub fn transform(&self) -> Option<Transform> {
        self.transform
    }

    /// Applies the transform, or returns the value unchanged
    pub fn apply(&self, value: Value) -> Value {
        match self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        }
    }

    #[test]
    fn test_paths_keep_declaration_order() {
        let field = SearchField::new("alias", ["aliases.name", "aliases.sort_name"]);
        assert_eq!(field.name(), "alias");
        assert_eq!(field.paths(), ["aliases.name", "aliases.sort_name"]);
        assert!(field.transform().is_none());
    }

    #[test]
    fn test_apply_without_transform_is_identity() {
        let field = SearchField::new("name", ["name"]);
        assert_eq!(field.apply(json!("Berlin")), json!("Berlin"));
    }

    #[test]
    fn test_apply_with_transform() {
        let field = SearchField::new("name", ["name"]).with_transform(upper);
        assert_eq!(field.apply(json!("Berlin")), json!("BERLIN"));
        assert_eq!(field.apply(json!(3)), json!(3));
    }
}
