//! Security event schema.
//!
//! This module defines the structure of security events that can be safely
//! recorded without risk of leaking sensitive data: no credential material,
//! no raw request bodies, only identifiers and metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of security event being recorded.
///
/// Categorizes the anomaly or decision the event describes. The serialized
/// and displayed form is the SCREAMING_SNAKE_CASE tag operators filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    /// A bearer credential was rejected (expired, malformed, wrong kind).
    AuthenticationFailure,
    /// CSRF cookie and header were both present, well formed, and unequal.
    CsrfAttackAttempt,
    /// CSRF material was missing or malformed (the benign rejection class).
    CsrfRejected,
    /// A role or ownership check denied the request.
    AuthorizationFailure,
    /// SQL injection tokens matched in the URL or a header.
    SqlInjectionAttempt,
    /// Script or markup injection tokens matched.
    ScriptInjectionAttempt,
    /// Path traversal sequences matched.
    PathTraversalAttempt,
    /// Embedding tags (iframe, object, embed) matched.
    EmbedTagInjection,
    /// Code evaluation tokens matched.
    CodeEvaluationAttempt,
    /// User agent absent or automation-like.
    SuspiciousUserAgent,
    /// Accept and Accept-Language both absent.
    MissingAcceptHeaders,
    /// Query parameter count above the configured ceiling.
    ExcessiveQueryParams,
    /// Body size above the configured ceiling.
    OversizedBody,
    /// More than two distinct IP-forwarding headers present.
    RateLimitBypassAttempt,
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SecurityEventKind::AuthenticationFailure => "AUTHENTICATION_FAILURE",
            SecurityEventKind::CsrfAttackAttempt => "CSRF_ATTACK_ATTEMPT",
            SecurityEventKind::CsrfRejected => "CSRF_REJECTED",
            SecurityEventKind::AuthorizationFailure => "AUTHORIZATION_FAILURE",
            SecurityEventKind::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            SecurityEventKind::ScriptInjectionAttempt => "SCRIPT_INJECTION_ATTEMPT",
            SecurityEventKind::PathTraversalAttempt => "PATH_TRAVERSAL_ATTEMPT",
            SecurityEventKind::EmbedTagInjection => "EMBED_TAG_INJECTION",
            SecurityEventKind::CodeEvaluationAttempt => "CODE_EVALUATION_ATTEMPT",
            SecurityEventKind::SuspiciousUserAgent => "SUSPICIOUS_USER_AGENT",
            SecurityEventKind::MissingAcceptHeaders => "MISSING_ACCEPT_HEADERS",
            SecurityEventKind::ExcessiveQueryParams => "EXCESSIVE_QUERY_PARAMS",
            SecurityEventKind::OversizedBody => "OVERSIZED_BODY",
            SecurityEventKind::RateLimitBypassAttempt => "RATE_LIMIT_BYPASS_ATTEMPT",
        };
        f.write_str(tag)
    }
}

/// Ordered severity of a security event.
///
/// The derive order gives `Low < Medium < High < Critical`, which sinks and
/// tests rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine noise (missing headers, expired credentials).
    Low,
    /// Worth a look (malformed credentials, single signature match).
    Medium,
    /// Likely hostile (CSRF mismatch, multiple signature families).
    High,
    /// Act now.
    Critical,
}

impl Severity {
    /// Returns the next severity up, saturating at [`Severity::Critical`].
    pub fn escalated(self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High => Severity::Critical,
            Severity::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A structured, append-only record of a security-relevant observation.
///
/// # Safety Invariants
///
/// - No credential or key material is stored
/// - No request bodies are stored
/// - `details` holds only short, safe metadata strings
///
/// # Example
///
/// ```
/// use guard_core::audit::{SecurityEvent, SecurityEventKind, Severity};
///
/// let event = SecurityEvent::new(
///     SecurityEventKind::AuthorizationFailure,
///     Severity::Medium,
///     "req-123",
///     "corr-456",
/// )
/// .with_method("DELETE")
/// .with_url("/api/admin/voters/9")
/// .with_detail("heldRole", "manager");
///
/// assert_eq!(event.request_id(), "req-123");
/// assert_eq!(event.kind(), SecurityEventKind::AuthorizationFailure);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    /// Category of the observation.
    #[serde(rename = "eventType")]
    kind: SecurityEventKind,
    /// How alarming the observation is.
    severity: Severity,
    /// Client IP, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    /// Client user agent, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    /// Request URL (path and query), already safe to log.
    url: String,
    /// HTTP method.
    method: String,
    /// Request identifier for correlation.
    request_id: String,
    /// Cross-service correlation identifier.
    correlation_id: String,
    /// Event creation time.
    timestamp: DateTime<Utc>,
    /// Short, safe metadata strings. Sorted for stable output.
    details: BTreeMap<String, String>,
}

impl SecurityEvent {
    /// Creates an event with the required identity fields.
    ///
    /// Transport metadata (method, URL, IP, user agent) starts empty and is
    /// attached with the builder methods.
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        request_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            ip: None,
            user_agent: None,
            url: String::new(),
            method: String::new(),
            request_id: request_id.into(),
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            details: BTreeMap::new(),
        }
    }

    /// Sets the client IP.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Sets the client user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the request URL (path and query; no secrets).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Adds one metadata entry.
    ///
    /// Values must be safe to log; callers never pass raw input here.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Raises the severity to `severity` if it is higher than the current
    /// one.
    pub fn raised_to(mut self, severity: Severity) -> Self {
        if severity > self.severity {
            self.severity = severity;
        }
        self
    }

    /// Returns the event kind.
    pub fn kind(&self) -> SecurityEventKind {
        self.kind
    }

    /// Returns the severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the client IP, if resolved.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// Returns the user agent, if present.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the correlation identifier.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Returns the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the metadata entries.
    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecurityEvent[type={}, severity={}, method={}, url={}, request_id={}, correlation_id={}",
            self.kind, self.severity, self.method, self.url, self.request_id, self.correlation_id
        )?;

        if let Some(ip) = &self.ip {
            write!(f, ", ip={}", ip)?;
        }
        if let Some(user_agent) = &self.user_agent {
            write!(f, ", user_agent={}", user_agent)?;
        }
        for (key, value) in &self.details {
            write!(f, ", {}={}", key, value)?;
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_uses_screaming_snake_case() {
        assert_eq!(
            SecurityEventKind::CsrfAttackAttempt.to_string(),
            "CSRF_ATTACK_ATTEMPT"
        );
        assert_eq!(
            SecurityEventKind::RateLimitBypassAttempt.to_string(),
            "RATE_LIMIT_BYPASS_ATTEMPT"
        );
    }

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_escalation_saturates() {
        assert_eq!(Severity::Low.escalated(), Severity::Medium);
        assert_eq!(Severity::High.escalated(), Severity::Critical);
        assert_eq!(Severity::Critical.escalated(), Severity::Critical);
    }

    #[test]
    fn event_builder_populates_fields() {
        let event = SecurityEvent::new(
            SecurityEventKind::SqlInjectionAttempt,
            Severity::Medium,
            "req-1",
            "corr-1",
        )
        .with_ip("203.0.113.9")
        .with_user_agent("curl/8.0")
        .with_method("GET")
        .with_url("/api/voters?q=1")
        .with_detail("family", "sql");

        assert_eq!(event.ip(), Some("203.0.113.9"));
        assert_eq!(event.user_agent(), Some("curl/8.0"));
        assert_eq!(event.method(), "GET");
        assert_eq!(event.url(), "/api/voters?q=1");
        assert_eq!(event.details().get("family").map(String::as_str), Some("sql"));
    }

    #[test]
    fn raised_to_only_raises() {
        let event = SecurityEvent::new(
            SecurityEventKind::CsrfRejected,
            Severity::Medium,
            "req-2",
            "corr-2",
        );
        assert_eq!(event.clone().raised_to(Severity::High).severity(), Severity::High);
        assert_eq!(event.raised_to(Severity::Low).severity(), Severity::Medium);
    }

    #[test]
    fn event_serializes_with_wire_field_names() {
        let event = SecurityEvent::new(
            SecurityEventKind::AuthenticationFailure,
            Severity::Low,
            "req-3",
            "corr-3",
        )
        .with_method("POST")
        .with_url("/api/login");

        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains("\"eventType\":\"AUTHENTICATION_FAILURE\""));
        assert!(json.contains("\"severity\":\"low\""));
        assert!(json.contains("\"requestId\":\"req-3\""));
        assert!(json.contains("\"correlationId\":\"corr-3\""));
    }

    #[test]
    fn event_display_is_safe_and_complete() {
        let event = SecurityEvent::new(
            SecurityEventKind::PathTraversalAttempt,
            Severity::High,
            "req-4",
            "corr-4",
        )
        .with_method("GET")
        .with_url("/files?p=../../etc/passwd");

        let display = event.to_string();
        assert!(display.contains("PATH_TRAVERSAL_ATTEMPT"));
        assert!(display.contains("high"));
        assert!(display.contains("req-4"));
    }
}
