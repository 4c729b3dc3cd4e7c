//! Per-message processing errors
//!
//! Everything that can go wrong while handling one delivery converts into
//! [`ProcessingError`], which the retry router turns into a retry or a
//! dead letter. None of these stop the process.

use thiserror::Error;

use crate::amqp::{BrokerError, MessageError};

/// Relational store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Query was sent but failed
    #[error("Query failed: {0}")]
    Query(String),
}

/// Search index failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Index cannot be reached
    #[error("Search index unavailable: {0}")]
    Unavailable(String),

    /// Index refused the document
    #[error("Search index rejected {entity} document: {reason}")]
    Rejected { entity: String, reason: String },
}

/// Any failure while processing one delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// Body could not be parsed
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sink failed
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Broker failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Changed table is not in the catalog
    #[error("Table '{0}' is not in the catalog")]
    UnknownTable(String),

    /// Message lacks the key needed for its operation
    #[error("{operation} on '{table}' needs a '{key}' value")]
    MissingKey {
        table: String,
        operation: String,
        key: String,
    },
}

impl ProcessingError {
    /// True for store, sink and broker outages
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProcessingError::Store(StoreError::Unavailable(_))
                | ProcessingError::Sink(SinkError::Unavailable(_))
                | ProcessingError::Broker(_)
        )
    }
}
