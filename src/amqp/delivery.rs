//! Deliveries and the broker channel they arrive on

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::BrokerResult;

/// Header carrying the number of retries a message has left
pub const RETRIES_HEADER: &str = "mb-retries";

/// One message as handed over by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Broker-assigned delivery tag
    pub tag: u64,
    /// Queue the message was consumed from
    pub queue: String,
    /// Routing key it was published with
    pub routing_key: String,
    /// Raw body
    pub body: Vec<u8>,
    /// Application headers
    pub headers: BTreeMap<String, Value>,
}

impl Delivery {
    /// Creates a delivery without headers
    pub fn new(
        tag: u64,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            tag,
            queue: queue.into(),
            routing_key: routing_key.into(),
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Adds a header
    pub fn with_header(mut self, key: impl Into<String>, value: Value) -> Self {
        self.headers.insert(key.into(), value);
        self
    }

    /// Retries left according to the header.
    ///
    /// `None` when the header is absent or not a non-negative integer.
    pub fn retries(&self) -> Option<u32> {
        match self.headers.get(RETRIES_HEADER)? {
            Value::Number(n) => n.as_u64().map(|v| u32::try_from(v).unwrap_or(u32::MAX)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Copy of this delivery with the retries header set
    pub fn with_retries(&self, retries: u32) -> Self {
        self.clone().with_header(RETRIES_HEADER, Value::from(retries))
    }
}

/// Broker channel a worker consumes from.
///
/// Calls are synchronous; a worker finishes one delivery before taking
/// the next.
pub trait Channel: Send + Sync {
    /// Acknowledges a delivery
    fn ack(&self, tag: u64) -> BrokerResult<()>;

    /// Rejects a delivery, optionally asking the broker to requeue it
    fn reject(&self, tag: u64, requeue: bool) -> BrokerResult<()>;

    /// Publishes a delivery's body and headers to an exchange
    fn publish(&self, delivery: &Delivery, exchange: &str, routing_key: &str) -> BrokerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery() -> Delivery {
        Delivery::new(1, "search.index", "area", r#"{"_table": "area", "id": "2"}"#)
    }

    #[test]
    fn test_retries_header_absent() {
        assert_eq!(delivery().retries(), None);
    }

    #[test]
    fn test_retries_header_forms() {
        assert_eq!(delivery().with_header(RETRIES_HEADER, json!(3)).retries(), Some(3));
        assert_eq!(delivery().with_header(RETRIES_HEADER, json!("2")).retries(), Some(2));
        assert_eq!(delivery().with_header(RETRIES_HEADER, json!(-1)).retries(), None);
        assert_eq!(delivery().with_header(RETRIES_HEADER, json!("x")).retries(), None);
    }

    #[test]
    fn test_with_retries_keeps_body_and_key() {
        let original = delivery();
        let copy = original.with_retries(0);
        assert_eq!(copy.body, original.body);
        assert_eq!(copy.routing_key, original.routing_key);
        assert_eq!(copy.retries(), Some(0));
        assert_eq!(original.retries(), None);
    }
}
