//! Broker-facing side of the sync process
//!
//! Deliveries, change notification parsing, and the redelivery state
//! machine that settles every delivery as acked, requeued through the
//! retry exchange, or dead-lettered. The broker's wire protocol stays
//! behind the [`Channel`] trait.

mod delivery;
mod errors;
mod message;
mod retry;

pub use delivery::{Channel, Delivery, RETRIES_HEADER};
pub use errors::{BrokerError, BrokerResult, MessageError};
pub use message::{scalar_string, Message, Operation, OPERATION_KEY, TABLE_KEY};
pub use retry::{
    decide, Outcome, RetryDecision, RetryRouter, DEFAULT_FAILED_EXCHANGE, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_EXCHANGE,
};
