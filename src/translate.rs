//! Failure-to-response translation.
//!
//! Every denial leaves the pipeline through [`ErrorTranslator`], which is
//! the single place that decides what a client gets to see. Development
//! environments receive the specific message and structured details;
//! production receives a fixed status-keyed message and no details at all.
//! What the audit sink sees is decided separately and never redacted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::audit::{SecurityEvent, SecurityEventKind, Severity};
use crate::config::Environment;
use crate::csrf::CsrfError;
use crate::error::{ErrorCode, ErrorDetails, FieldError, SecurityError};
use crate::gate::AccessError;
use crate::token::TokenError;
use crate::trace::RequestTrace;

/// Serialized shape of the `error` object inside a denial response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "ErrorDetails::is_none")]
    details: ErrorDetails,
    timestamp: DateTime<Utc>,
    request_id: String,
}

impl ErrorBody {
    /// The stable external code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The client-facing message after environment policy was applied.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details, `None` in production.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// When the denial was produced.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The request id the denial belongs to.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// The wire envelope for a denial: `{ "success": false, "error": { … } }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

impl ErrorResponse {
    /// Always `false`.
    pub fn success(&self) -> bool {
        self.success
    }

    /// The error object.
    pub fn error(&self) -> &ErrorBody {
        &self.error
    }
}

/// A fully translated denial: HTTP status plus response body.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    status: u16,
    body: ErrorResponse,
}

/// Body used when serialization itself fails. Kept as a literal so the
/// error path cannot recurse.
const FALLBACK_BODY: &str =
    r#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"Internal server error"}}"#;

impl ErrorRecord {
    /// The HTTP status to answer with.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The envelope to serialize.
    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }

    /// The envelope as a JSON string.
    pub fn body_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| FALLBACK_BODY.to_string())
    }
}

/// Environment-aware translator from [`SecurityError`] to [`ErrorRecord`].
///
/// # Examples
///
/// ```
/// use guard_core::{
///     Environment, ErrorTranslator, RequestTrace, SecurityError, TokenError,
/// };
///
/// let translator = ErrorTranslator::new(Environment::Production);
/// let trace = RequestTrace::generate();
///
/// let record = translator.translate(&SecurityError::from(TokenError::Expired), &trace);
/// assert_eq!(record.status(), 401);
/// assert_eq!(record.body().error().message(), "Authentication required");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    environment: Environment,
}

impl ErrorTranslator {
    /// Creates a translator for the given environment.
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Translates a failure into the status and body the client receives.
    ///
    /// In production the message is replaced with the fixed text for the
    /// status and details are dropped entirely; elsewhere the specific
    /// message and details pass through. Markup-significant characters are
    /// stripped from everything outgoing in every environment. The
    /// specific failure is logged here so redaction never loses it.
    pub fn translate(&self, error: &SecurityError, trace: &RequestTrace) -> ErrorRecord {
        let code = error.code();
        let status = code.status();

        debug!(
            code = %code,
            status,
            error = %error,
            request_id = %trace.request_id(),
            "translated denial"
        );

        let (message, details) = if self.environment.is_production() {
            (generic_message(status).to_string(), ErrorDetails::None)
        } else {
            (strip_markup(&error.to_string()), sanitize_details(error.details()))
        };

        ErrorRecord {
            status,
            body: ErrorResponse {
                success: false,
                error: ErrorBody {
                    code,
                    message,
                    details,
                    timestamp: Utc::now(),
                    request_id: trace.request_id().to_string(),
                },
            },
        }
    }

    /// The mirrored audit event for a failure, if it is security relevant.
    ///
    /// Token, CSRF, and authorization failures always produce an event,
    /// regardless of environment; everything else yields `None`. The event
    /// carries the true message and failure context. Transport metadata
    /// (IP, URL, method) is attached by the caller, which is the only
    /// place that has it.
    pub fn audit_event_for(
        &self,
        error: &SecurityError,
        trace: &RequestTrace,
    ) -> Option<SecurityEvent> {
        if !error.is_security_relevant() {
            return None;
        }

        let (kind, severity) = classify(error);
        let mut event =
            SecurityEvent::new(kind, severity, trace.request_id(), trace.correlation_id())
                .with_detail("code", error.code().to_string())
                .with_detail("message", error.to_string());

        if let ErrorDetails::KeyValue(map) = error.details() {
            for (key, value) in map {
                event = event.with_detail(key, value);
            }
        }

        Some(event)
    }
}

/// Fixed client-facing text per HTTP status, used in production.
fn generic_message(status: u16) -> &'static str {
    match status {
        400 => "Invalid request",
        401 => "Authentication required",
        403 => "Access forbidden",
        404 => "Resource not found",
        429 => "Too many requests",
        500 => "Internal server error",
        _ => "Request failed",
    }
}

/// Removes the characters a browser could interpret as markup.
fn strip_markup(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect()
}

fn sanitize_details(details: ErrorDetails) -> ErrorDetails {
    match details {
        ErrorDetails::None => ErrorDetails::None,
        ErrorDetails::Fields(fields) => ErrorDetails::Fields(
            fields
                .iter()
                .map(|f| FieldError::new(strip_markup(f.field()), strip_markup(f.message())))
                .collect(),
        ),
        ErrorDetails::KeyValue(map) => ErrorDetails::KeyValue(
            map.into_iter()
                .map(|(key, value)| (key, strip_markup(&value)))
                .collect(),
        ),
    }
}

/// Event kind and severity for a security-relevant failure.
fn classify(error: &SecurityError) -> (SecurityEventKind, Severity) {
    match error {
        SecurityError::Token(TokenError::Expired) | SecurityError::Token(TokenError::Missing) => {
            (SecurityEventKind::AuthenticationFailure, Severity::Low)
        }
        SecurityError::Token(_) => (SecurityEventKind::AuthenticationFailure, Severity::Medium),
        SecurityError::Csrf(CsrfError::Mismatch) => {
            (SecurityEventKind::CsrfAttackAttempt, Severity::High)
        }
        SecurityError::Csrf(CsrfError::InvalidFormat) => {
            (SecurityEventKind::CsrfRejected, Severity::Medium)
        }
        SecurityError::Csrf(_) => (SecurityEventKind::CsrfRejected, Severity::Low),
        SecurityError::Access(AccessError::AdminRequired) => {
            (SecurityEventKind::AuthorizationFailure, Severity::Medium)
        }
        SecurityError::Access(_) => (SecurityEventKind::AuthorizationFailure, Severity::Medium),
        // Not security relevant; audit_event_for returned before this.
        _ => (SecurityEventKind::AuthenticationFailure, Severity::Low),
    }
}
