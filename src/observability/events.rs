//! Observable events
//!
//! Every lifecycle point the sync process logs is named here. Events are
//! explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Startup begins
    BootStart,
    /// Startup aborted by a fatal error
    BootFailed,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Table catalog loaded and validated
    CatalogLoaded,
    /// Every entity plan compiled
    PlansCompiled,
    /// One relationship hop of a compiled plan
    PlanDirective,

    // Message handling
    /// Delivery taken off the queue
    MessageReceived,
    /// Delivery processed and acknowledged
    MessageAcked,
    /// Delivery failed and was republished to the retry exchange
    MessageRequeued,
    /// Delivery failed with no retries left
    MessageDeadLettered,

    // Indexing
    /// Dependent entities resolved for a changed row
    FanoutResolved,
    /// Document written to the sink
    DocumentIndexed,
    /// Document removed from the sink
    DocumentDeleted,

    // Worker
    /// Worker started consuming
    WorkerStart,
    /// Worker stopped; delivery channel closed
    WorkerStop,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "SEARCHSYNC_STARTUP_BEGIN",
            Event::BootFailed => "SEARCHSYNC_STARTUP_FAILED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CatalogLoaded => "CATALOG_LOADED",
            Event::PlansCompiled => "PLANS_COMPILED",
            Event::PlanDirective => "PLAN_DIRECTIVE",

            Event::MessageReceived => "MESSAGE_RECEIVED",
            Event::MessageAcked => "MESSAGE_ACKED",
            Event::MessageRequeued => "MESSAGE_REQUEUED",
            Event::MessageDeadLettered => "MESSAGE_DEAD_LETTERED",

            Event::FanoutResolved => "FANOUT_RESOLVED",
            Event::DocumentIndexed => "DOCUMENT_INDEXED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",

            Event::WorkerStart => "WORKER_START",
            Event::WorkerStop => "WORKER_STOP",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BootFailed => Severity::Fatal,
            Event::MessageDeadLettered => Severity::Error,
            Event::MessageRequeued => Severity::Warn,
            Event::PlanDirective
            | Event::MessageReceived
            | Event::FanoutResolved
            | Event::DocumentIndexed
            | Event::DocumentDeleted => Severity::Trace,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 15] = [
        Event::BootStart,
        Event::BootFailed,
        Event::ConfigLoaded,
        Event::CatalogLoaded,
        Event::PlansCompiled,
        Event::PlanDirective,
        Event::MessageReceived,
        Event::MessageAcked,
        Event::MessageRequeued,
        Event::MessageDeadLettered,
        Event::FanoutResolved,
        Event::DocumentIndexed,
        Event::DocumentDeleted,
        Event::WorkerStart,
        Event::WorkerStop,
    ];

    #[test]
    fn test_all_events_have_string_representation() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severities() {
        assert!(Event::BootFailed.is_fatal());
        assert!(!Event::MessageDeadLettered.is_fatal());
        assert_eq!(Event::MessageDeadLettered.severity(), Severity::Error);
        assert_eq!(Event::MessageRequeued.severity(), Severity::Warn);
        assert_eq!(Event::PlanDirective.severity(), Severity::Trace);
        assert_eq!(Event::MessageAcked.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::BootStart), "SEARCHSYNC_STARTUP_BEGIN");
        assert_eq!(format!("{}", Event::MessageAcked), "MESSAGE_ACKED");
    }
}
