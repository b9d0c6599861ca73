//! Security audit events and sinks.
//!
//! This module provides:
//! - `SecurityEvent`: structured record of an anomaly or security decision
//! - `SecurityEventKind` / `Severity`: the categorization axes
//! - `EventSink`: destination trait for recorded events
//! - `MemorySink` / `TracingSink`: in-memory and log-forwarding sinks
//!
//! Events are designed to be safe by default:
//! - No credential or key material is stored
//! - No request bodies are stored
//! - Only identifiers and reviewed metadata are recorded
//!
//! The event stream is observational and append-only; nothing in the
//! pipeline reads it back to make decisions.

mod event;
mod sink;

pub use event::{SecurityEvent, SecurityEventKind, Severity};
pub use sink::{EventSink, MemorySink, TracingSink};
