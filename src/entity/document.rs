//! Document materialisation
//!
//! Walks every field path through a hydrated instance:
//! - objects descend by key
//! - arrays flatten, each element walked with the remaining path
//! - nulls and missing keys contribute nothing
//!
//! One value stays scalar, several become an array, none omit the field.

use serde_json::{Map, Value};

use super::field::SearchField;

/// Collects the values at the end of one dotted path
pub fn values_at(instance: &Value, path: &str) -> Vec<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect(instance, &segments, &mut out);
    out
}

fn collect(value: &Value, segments: &[&str], out: &mut Vec<Value>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        Value::Object(map) => match segments.split_first() {
            Some((head, rest)) => {
                if let Some(next) = map.get(*head) {
                    collect(next, rest, out);
                }
            }
            None => out.push(value.clone()),
        },
        scalar => {
            if segments.is_empty() {
                out.push(scalar.clone());
            }
        }
    }
}

/// Values of one field, transformed, in path order
pub fn field_values(field: &SearchField, instance: &Value) -> Vec<Value> {
    field
        .paths()
        .iter()
        .flat_map(|path| values_at(instance, path))
        .map(|value| field.apply(value))
        .filter(|value| !value.is_null())
        .collect()
}

/// Builds the document for one hydrated instance
pub fn build_document(fields: &[SearchField], instance: &Value) -> Map<String, Value> {
    let mut document = Map::new();
    for field in fields {
        let mut values = field_values(field, instance);
        match values.len() {
            0 => {}
            1 => {
                document.insert(field.name().to_string(), values.remove(0));
            }
            _ => {
                document.insert(field.name().to_string(), Value::Array(values));
            }
        }
    }
    document
}
