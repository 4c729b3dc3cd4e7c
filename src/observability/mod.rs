//! Observability subsystem
//!
//! - Structured logging (JSON, one line per event)
//! - Lifecycle events
//! - Counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails the caller
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use searchsync::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::MessageAcked, &[("table", "area")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_acked();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Only verifies no panic
        log_event(Event::BootStart);
        log_event(Event::WorkerStop);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/search.json")]);
    }
}
