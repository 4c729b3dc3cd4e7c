//! Delivery consumer
//!
//! Takes deliveries off a channel strictly one at a time and settles each
//! one before looking at the next. Several workers may run side by side;
//! they share only read-only state.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::dispatcher::Dispatcher;
use super::errors::ProcessingError;
use crate::amqp::{BrokerResult, Channel, Delivery, Message, Outcome, RetryRouter};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// One consumer of change notifications
pub struct Worker {
    name: String,
    router: RetryRouter,
    dispatcher: Arc<Dispatcher>,
    channel: Arc<dyn Channel>,
    delete_queue: String,
    metrics: Arc<MetricsRegistry>,
}

impl Worker {
    /// Creates a worker
    pub fn new(
        name: impl Into<String>,
        router: RetryRouter,
        dispatcher: Arc<Dispatcher>,
        channel: Arc<dyn Channel>,
        delete_queue: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            router,
            dispatcher,
            channel,
            delete_queue: delete_queue.into(),
            metrics,
        }
    }

    /// Consumes deliveries until the sender side closes.
    ///
    /// Returns the number of deliveries settled. A broker failure while
    /// settling stops the worker.
    pub async fn run(self, mut deliveries: mpsc::Receiver<Delivery>) -> BrokerResult<u64> {
        log_event_with_fields(Event::WorkerStart, &[("worker", self.name.as_str())]);

        let mut settled = 0u64;
        while let Some(delivery) = deliveries.recv().await {
            if let Err(err) = self.process(&delivery) {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::WorkerStop,
                    &[("reason", reason.as_str()), ("worker", self.name.as_str())],
                );
                return Err(err);
            }
            settled += 1;
        }

        let count = settled.to_string();
        log_event_with_fields(
            Event::WorkerStop,
            &[("settled", count.as_str()), ("worker", self.name.as_str())],
        );
        Ok(settled)
    }

    /// Processes and settles a single delivery
    pub fn process(&self, delivery: &Delivery) -> BrokerResult<Outcome> {
        self.metrics.increment_received();
        let tag = delivery.tag.to_string();
        log_event_with_fields(
            Event::MessageReceived,
            &[
                ("queue", delivery.queue.as_str()),
                ("routing_key", delivery.routing_key.as_str()),
                ("tag", tag.as_str()),
            ],
        );

        let outcome = self.router.route(
            self.channel.as_ref(),
            delivery,
            |d: &Delivery| -> Result<(), ProcessingError> {
                let message = Message::from_delivery(d, &self.delete_queue)?;
                self.dispatcher.dispatch(&message)?;
                Ok(())
            },
        )?;

        match outcome {
            Outcome::Acked => {
                self.metrics.increment_acked();
                log_event_with_fields(
                    Event::MessageAcked,
                    &[("queue", delivery.queue.as_str()), ("tag", tag.as_str())],
                );
            }
            Outcome::Requeued { .. } => self.metrics.increment_requeued(),
            Outcome::DeadLettered => self.metrics.increment_dead_lettered(),
        }

        Ok(outcome)
    }
}
