//! Request and correlation identifiers.

use uuid::Uuid;

/// Standard request-identifier header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Standard correlation-identifier header.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The identifier pair attached to every audit record and error response.
///
/// Both identifiers are echoed when the client supplied them and generated
/// (UUID v4) when absent, so a request can always be correlated across
/// logs, audit events, and the error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTrace {
    request_id: String,
    correlation_id: String,
}

impl RequestTrace {
    /// Builds a trace from identifiers the client supplied.
    pub fn new(request_id: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Builds a trace with two freshly generated identifiers.
    pub fn generate() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Builds a trace from optionally supplied header values, generating
    /// whichever identifier is absent or empty.
    pub fn from_headers(request_id: Option<&str>, correlation_id: Option<&str>) -> Self {
        Self {
            request_id: Self::echo_or_generate(request_id),
            correlation_id: Self::echo_or_generate(correlation_id),
        }
    }

    fn echo_or_generate(supplied: Option<&str>) -> String {
        match supplied {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the correlation identifier.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Header name/value pairs the response should carry back.
    pub fn response_headers(&self) -> [(&'static str, &str); 2] {
        [
            ("X-Request-ID", self.request_id.as_str()),
            ("X-Correlation-ID", self.correlation_id.as_str()),
        ]
    }
}
