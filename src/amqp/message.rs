//! Change notification parsing
//!
//! Bodies look like `{"_table": "area", "id": "2", ...changed columns}`.
//! Parsed once per delivery.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::delivery::Delivery;
use super::errors::MessageError;

/// Key naming the changed table
pub const TABLE_KEY: &str = "_table";

/// Optional key naming the operation explicitly
pub const OPERATION_KEY: &str = "_operation";

/// Row-level operation that triggered the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Row inserted
    Insert,
    /// Row updated
    Update,
    /// Row deleted
    Delete,
}

impl Operation {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(MessageError::UnknownOperation(s.to_string())),
        }
    }
}

/// A parsed change notification
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Changed table
    pub table: String,
    /// Row id, if present
    pub id: Option<String>,
    /// Row natural key, if present
    pub gid: Option<String>,
    /// Changed columns by database column name (includes `id` / `gid`)
    pub columns: Map<String, Value>,
    /// Operation
    pub operation: Operation,
}

/// Renders a scalar column value as a key string
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Message {
    /// Creates a message from its parts; `id` and `gid` come from `columns`
    pub fn new(table: impl Into<String>, columns: Map<String, Value>, operation: Operation) -> Self {
        let id = columns.get("id").and_then(scalar_string);
        let gid = columns.get("gid").and_then(scalar_string);
        Self {
            table: table.into(),
            id,
            gid,
            columns,
            operation,
        }
    }

    /// Parses a body. An `_operation` key overrides `default_operation`.
    pub fn parse(body: &[u8], default_operation: Operation) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| MessageError::InvalidJson(e.to_string()))?;

        let Value::Object(mut columns) = value else {
            return Err(MessageError::NotAnObject);
        };

        let table = match columns.remove(TABLE_KEY) {
            Some(Value::String(table)) if !table.is_empty() => table,
            _ => return Err(MessageError::MissingTable),
        };

        let operation = match columns.remove(OPERATION_KEY) {
            Some(Value::String(op)) => op.parse()?,
            Some(other) => return Err(MessageError::UnknownOperation(other.to_string())),
            None => default_operation,
        };

        Ok(Self::new(table, columns, operation))
    }

    /// Parses a delivery; messages consumed from `delete_queue` default to delete
    pub fn from_delivery(delivery: &Delivery, delete_queue: &str) -> Result<Self, MessageError> {
        let default_operation = if delivery.queue == delete_queue {
            Operation::Delete
        } else {
            Operation::Update
        };
        Self::parse(&delivery.body, default_operation)
    }

    /// Value of a changed column as a key string
    pub fn column(&self, name: &str) -> Option<String> {
        self.columns.get(name).and_then(scalar_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_message() {
        let msg = Message::parse(br#"{"_table": "artist", "id": "42"}"#, Operation::Update).unwrap();
        assert_eq!(msg.table, "artist");
        assert_eq!(msg.id.as_deref(), Some("42"));
        assert_eq!(msg.gid, None);
        assert_eq!(msg.operation, Operation::Update);
        assert!(!msg.columns.contains_key(TABLE_KEY));
    }

    #[test]
    fn test_numeric_columns_become_strings() {
        let msg = Message::parse(
            br#"{"_table": "area_alias", "id": 1, "area": 2, "type": null}"#,
            Operation::Update,
        )
        .unwrap();
        assert_eq!(msg.id.as_deref(), Some("1"));
        assert_eq!(msg.column("area").as_deref(), Some("2"));
        assert_eq!(msg.column("type"), None);
    }

    #[test]
    fn test_explicit_operation_wins() {
        let msg = Message::parse(
            br#"{"_table": "area", "id": "2", "_operation": "INSERT"}"#,
            Operation::Delete,
        )
        .unwrap();
        assert_eq!(msg.operation, Operation::Insert);
        assert!(!msg.columns.contains_key(OPERATION_KEY));
    }

    #[test]
    fn test_queue_decides_default_operation() {
        let body = r#"{"_table": "artist", "gid": "90d7709d-feba-47e6-a2d1-8770da3c3d9c"}"#;
        let delete = Delivery::new(1, "search.delete", "artist", body);
        let index = Delivery::new(2, "search.index", "artist", body);

        let msg = Message::from_delivery(&delete, "search.delete").unwrap();
        assert_eq!(msg.operation, Operation::Delete);
        assert_eq!(msg.gid.as_deref(), Some("90d7709d-feba-47e6-a2d1-8770da3c3d9c"));
        assert_eq!(
            Message::from_delivery(&index, "search.delete").unwrap().operation,
            Operation::Update
        );
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            Message::parse(b"not json", Operation::Update),
            Err(MessageError::InvalidJson(_))
        ));
        assert_eq!(
            Message::parse(b"[1, 2]", Operation::Update),
            Err(MessageError::NotAnObject)
        );
        assert_eq!(
            Message::parse(br#"{"id": "1"}"#, Operation::Update),
            Err(MessageError::MissingTable)
        );
        assert_eq!(
            Message::parse(br#"{"_table": "a", "_operation": "merge"}"#, Operation::Update),
            Err(MessageError::UnknownOperation("merge".into()))
        );
    }
}
