//! Diagnostic sink for failure and notable events.
//!
//! Every connection reports its failure paths through a `DiagnosticSink`.
//! The default sink discards events; `TracingSink` forwards them to
//! `tracing`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::errors::SearchError;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Verbose diagnostics.
    Debug,
    /// Notable but expected events.
    Information,
    /// Recoverable failures.
    Warning,
    /// Failed operations.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "debug",
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single diagnostic event.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    /// When the event was raised.
    pub timestamp: DateTime<Utc>,
    /// Event severity.
    pub severity: Severity,
    /// The fault that caused the event, if any.
    pub fault: Option<SearchError>,
    /// Structured context (index, query text, keys...).
    pub context: BTreeMap<String, String>,
    /// Human-readable message.
    pub message: String,
}

impl DiagnosticEvent {
    /// Create an event with no fault and no context.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            fault: None,
            context: BTreeMap::new(),
            message: message.into(),
        }
    }

    /// Attach the fault that caused the event.
    pub fn with_fault(mut self, fault: SearchError) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Add a context entry.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }
}

/// Receives diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    /// Record an event.
    fn log(&self, event: DiagnosticEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn log(&self, _event: DiagnosticEvent) {}
}

/// Sink that forwards events to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, event: DiagnosticEvent) {
        let context = format!("{:?}", event.context);
        let fault = event.fault.map(|f| f.to_string()).unwrap_or_default();

        match event.severity {
            Severity::Debug => debug!(context = %context, fault = %fault, "{}", event.message),
            Severity::Information => info!(context = %context, fault = %fault, "{}", event.message),
            Severity::Warning => warn!(context = %context, fault = %fault, "{}", event.message),
            Severity::Error => error!(context = %context, fault = %fault, "{}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = DiagnosticEvent::new(Severity::Warning, "Search failed")
            .with_fault(SearchError::transport("reset"))
            .with("index", "hotels")
            .with("count", 3);

        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.context["index"], "hotels");
        assert_eq!(event.context["count"], "3");
        assert!(event.fault.is_some());
    }

    #[test]
    fn test_sinks_accept_events() {
        NoopSink.log(DiagnosticEvent::new(Severity::Error, "discarded"));
        TracingSink.log(DiagnosticEvent::new(Severity::Information, "forwarded"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert_eq!(Severity::Information.to_string(), "information");
    }
}
