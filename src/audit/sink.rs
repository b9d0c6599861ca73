//! Security event sinks.
//!
//! Sinks receive every [`SecurityEvent`] the pipeline records. Two
//! implementations cover the common cases: [`MemorySink`] keeps events in
//! memory for tests and operator snapshots, and [`TracingSink`] forwards
//! them to the tracing infrastructure as structured log entries.

use std::sync::Mutex;

use super::{SecurityEvent, Severity};

/// Destination for recorded security events.
///
/// Implementations must be cheap and non-blocking; the pipeline records
/// events inline on the request path. Recording is infallible by design:
/// a sink that can fail must handle its own failures (buffer, drop, log)
/// rather than pushing them back into request handling.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: SecurityEvent);
}

/// In-memory recorder for security events.
///
/// Stores events in arrival order behind a mutex, so one sink can be shared
/// across request tasks. Intended for tests, demos, and operator snapshots;
/// production deployments forward to a persistent system via
/// [`TracingSink`] or their own [`EventSink`].
///
/// # Example
///
/// ```
/// use guard_core::audit::{EventSink, MemorySink, SecurityEvent, SecurityEventKind, Severity};
///
/// let sink = MemorySink::new();
/// sink.record(SecurityEvent::new(
///     SecurityEventKind::CsrfAttackAttempt,
///     Severity::High,
///     "req-1",
///     "corr-1",
/// ));
///
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.events()[0].request_id(), "req-1");
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .expect("security event sink mutex poisoned")
            .clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .expect("security event sink mutex poisoned")
            .len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .expect("security event sink mutex poisoned")
            .clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: SecurityEvent) {
        self.events
            .lock()
            .expect("security event sink mutex poisoned")
            .push(event);
    }
}

/// Sink that emits events through `tracing` as structured log entries.
///
/// Events are logged under the `security_audit` target at a level mapped
/// from severity (low and medium are `info`, high is `warn`, critical is
/// `error`), so operators can route and filter them independently of
/// ordinary application logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates the sink.
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn record(&self, event: SecurityEvent) {
        match event.severity() {
            Severity::Low | Severity::Medium => tracing::info!(
                target: "security_audit",
                event_type = %event.kind(),
                severity = %event.severity(),
                ip = ?event.ip(),
                user_agent = ?event.user_agent(),
                method = %event.method(),
                url = %event.url(),
                request_id = %event.request_id(),
                correlation_id = %event.correlation_id(),
                details = ?event.details(),
                "security event"
            ),
            Severity::High => tracing::warn!(
                target: "security_audit",
                event_type = %event.kind(),
                severity = %event.severity(),
                ip = ?event.ip(),
                user_agent = ?event.user_agent(),
                method = %event.method(),
                url = %event.url(),
                request_id = %event.request_id(),
                correlation_id = %event.correlation_id(),
                details = ?event.details(),
                "security event"
            ),
            Severity::Critical => tracing::error!(
                target: "security_audit",
                event_type = %event.kind(),
                severity = %event.severity(),
                ip = ?event.ip(),
                user_agent = ?event.user_agent(),
                method = %event.method(),
                url = %event.url(),
                request_id = %event.request_id(),
                correlation_id = %event.correlation_id(),
                details = ?event.details(),
                "security event"
            ),
        }
    }
}
