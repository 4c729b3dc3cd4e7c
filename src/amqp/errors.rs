//! Broker and message errors

use thiserror::Error;

/// Result type for broker channel operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Failures talking to the broker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Channel or connection is gone
    #[error("Broker channel closed")]
    Closed,

    /// Acknowledgment was not accepted
    #[error("Failed to ack delivery {tag}: {reason}")]
    Ack { tag: u64, reason: String },

    /// Rejection was not accepted
    #[error("Failed to reject delivery {tag}: {reason}")]
    Reject { tag: u64, reason: String },

    /// Republish was not accepted
    #[error("Failed to publish to '{exchange}': {reason}")]
    Publish { exchange: String, reason: String },
}

/// Malformed change notification bodies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Body is not valid JSON
    #[error("Message body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Body is JSON but not an object
    #[error("Message body must be a JSON object")]
    NotAnObject,

    /// `_table` missing or not a string
    #[error("Message has no '_table' key")]
    MissingTable,

    /// `_operation` is not insert, update or delete
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
}
