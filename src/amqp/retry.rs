//! Redelivery state machine
//!
//! ```text
//! DELIVERED ──ok──────────────▶ ACKED
//!     │
//!     └─fail─▶ reject ─┬─ r > 0 ─▶ publish(retry, r-1)   REQUEUED
//!                      └─ r = 0 ─▶ publish(failed, 0)    DEAD_LETTERED
//! ```
//!
//! The decision is a pure function of (failed, retries). A failed delivery
//! is never acked and never retried past zero.

use std::fmt;

use super::delivery::{Channel, Delivery};
use super::errors::BrokerResult;
use crate::observability::{log_event_with_fields, Event};

/// Retries a message starts with when the header is absent
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Default exchange failed messages are republished to for another try
pub const DEFAULT_RETRY_EXCHANGE: &str = "search.retry";

/// Default exchange messages go to once retries are exhausted
pub const DEFAULT_FAILED_EXCHANGE: &str = "search.failed";

/// What to do with a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Processing succeeded
    Ack,
    /// Republish to the retry exchange with `remaining` retries
    Retry { remaining: u32 },
    /// Republish to the failed exchange
    DeadLetter,
}

/// Decides the fate of a delivery from the processing result and its
/// retries header
pub fn decide(failed: bool, retries: u32) -> RetryDecision {
    if !failed {
        RetryDecision::Ack
    } else if retries > 0 {
        RetryDecision::Retry {
            remaining: retries - 1,
        }
    } else {
        RetryDecision::DeadLetter
    }
}

/// Terminal state of a routed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Acknowledged
    Acked,
    /// Rejected and republished to the retry exchange
    Requeued { remaining: u32 },
    /// Rejected and republished to the failed exchange
    DeadLettered,
}

impl Outcome {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Acked => "ACKED",
            Outcome::Requeued { .. } => "REQUEUED",
            Outcome::DeadLettered => "DEAD_LETTERED",
        }
    }
}

/// Routes every delivery to exactly one terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryRouter {
    retry_exchange: String,
    failed_exchange: String,
    max_retries: u32,
}

impl Default for RetryRouter {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_EXCHANGE,
            DEFAULT_FAILED_EXCHANGE,
            DEFAULT_MAX_RETRIES,
        )
    }
}

impl RetryRouter {
    /// Creates a router
    pub fn new(
        retry_exchange: impl Into<String>,
        failed_exchange: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            retry_exchange: retry_exchange.into(),
            failed_exchange: failed_exchange.into(),
            max_retries,
        }
    }

    /// Retry exchange name
    pub fn retry_exchange(&self) -> &str {
        &self.retry_exchange
    }

    /// Failed exchange name
    pub fn failed_exchange(&self) -> &str {
        &self.failed_exchange
    }

    /// Retries a fresh message starts with
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retries left for a delivery.
    ///
    /// An absent or unreadable header counts as the maximum; values above
    /// the maximum are capped.
    pub fn retries_of(&self, delivery: &Delivery) -> u32 {
        delivery
            .retries()
            .map(|r| r.min(self.max_retries))
            .unwrap_or(self.max_retries)
    }

    /// Runs `handler` on the delivery and settles it on the channel.
    ///
    /// Success acks exactly once. Failure rejects without requeue, then
    /// republishes the same body and routing key to the retry exchange with
    /// one retry fewer, or to the failed exchange once none are left.
    pub fn route<F, E>(
        &self,
        channel: &dyn Channel,
        delivery: &Delivery,
        handler: F,
    ) -> BrokerResult<Outcome>
    where
        F: FnOnce(&Delivery) -> Result<(), E>,
        E: fmt::Display,
    {
        let retries = self.retries_of(delivery);
        let failure = handler(delivery).err().map(|e| e.to_string());
        let reason = failure.as_deref().unwrap_or_default();

        match decide(failure.is_some(), retries) {
            RetryDecision::Ack => {
                channel.ack(delivery.tag)?;
                Ok(Outcome::Acked)
            }
            RetryDecision::Retry { remaining } => {
                channel.reject(delivery.tag, false)?;
                channel.publish(
                    &delivery.with_retries(remaining),
                    &self.retry_exchange,
                    &delivery.routing_key,
                )?;
                let remaining_str = remaining.to_string();
                log_event_with_fields(
                    Event::MessageRequeued,
                    &[
                        ("exchange", self.retry_exchange.as_str()),
                        ("reason", reason),
                        ("retries", remaining_str.as_str()),
                        ("routing_key", delivery.routing_key.as_str()),
                    ],
                );
                Ok(Outcome::Requeued { remaining })
            }
            RetryDecision::DeadLetter => {
                channel.reject(delivery.tag, false)?;
                channel.publish(
                    &delivery.with_retries(0),
                    &self.failed_exchange,
                    &delivery.routing_key,
                )?;
                log_event_with_fields(
                    Event::MessageDeadLettered,
                    &[
                        ("exchange", self.failed_exchange.as_str()),
                        ("reason", reason),
                        ("routing_key", delivery.routing_key.as_str()),
                    ],
                );
                Ok(Outcome::DeadLettered)
            }
        }
    }
}
