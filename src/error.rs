//! Unified failure taxonomy for the security pipeline.
//!
//! Every way a request can fail converges on [`SecurityError`], which maps
//! onto a stable, externally visible [`ErrorCode`] and an HTTP status.
//! Precedence between failure classes is structural: a failure is exactly
//! one variant, callers construct the most specific one they can, and the
//! [`SecurityError::Internal`] catch-all is reserved for failures nothing
//! else claimed.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::csrf::CsrfError;
use crate::gate::AccessError;
use crate::token::TokenError;

/// Any failure the security pipeline can surface to a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// Bearer credential verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// CSRF double-submit verification failed.
    #[error(transparent)]
    Csrf(#[from] CsrfError),
    /// A role or ownership check denied the request.
    #[error(transparent)]
    Access(#[from] AccessError),
    /// Request input failed validation.
    #[error("request validation failed ({n} field{s})", n = .0.len(), s = if .0.len() == 1 { "" } else { "s" })]
    Validation(Vec<FieldError>),
    /// A data-layer conflict: duplicate, missing, or dangling reference.
    #[error(transparent)]
    Data(#[from] DataError),
    /// A file upload broke a limit or arrived in the wrong shape.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Anything nothing more specific claimed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SecurityError {
    /// Wraps field-level validation failures.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        SecurityError::Validation(fields)
    }

    /// Wraps an unclassified failure. The message is internal; clients in
    /// production only ever see the generic 500 text.
    pub fn internal(message: impl Into<String>) -> Self {
        SecurityError::Internal(message.into())
    }

    /// The stable external code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            SecurityError::Token(TokenError::Expired) => ErrorCode::TokenExpired,
            SecurityError::Token(TokenError::WrongKind { .. }) => ErrorCode::InvalidTokenType,
            SecurityError::Token(_) => ErrorCode::InvalidToken,
            SecurityError::Csrf(CsrfError::MissingCookie) => ErrorCode::CsrfTokenMissingCookie,
            SecurityError::Csrf(CsrfError::MissingHeader) => ErrorCode::CsrfTokenMissingHeader,
            SecurityError::Csrf(CsrfError::InvalidFormat) => ErrorCode::CsrfTokenInvalidFormat,
            SecurityError::Csrf(CsrfError::Mismatch) => ErrorCode::CsrfTokenMismatch,
            SecurityError::Access(AccessError::AdminRequired) => ErrorCode::AdminAuthRequired,
            SecurityError::Access(AccessError::InsufficientRole { .. }) => {
                ErrorCode::InsufficientPermissions
            }
            SecurityError::Access(AccessError::NotOwner { .. }) => ErrorCode::AccessDenied,
            SecurityError::Validation(_) => ErrorCode::ValidationError,
            SecurityError::Data(DataError::Duplicate { .. }) => ErrorCode::DuplicateError,
            SecurityError::Data(DataError::NotFound { .. }) => ErrorCode::NotFoundError,
            SecurityError::Data(DataError::BadReference { .. }) => ErrorCode::ReferenceError,
            SecurityError::Upload(UploadError::FileTooLarge { .. }) => ErrorCode::FileSizeExceeded,
            SecurityError::Upload(UploadError::UnsupportedType { .. }) => {
                ErrorCode::InvalidFileType
            }
            SecurityError::Upload(UploadError::TooMany { .. }) => ErrorCode::TooManyFiles,
            SecurityError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The HTTP status this failure answers with.
    pub fn status(&self) -> u16 {
        self.code().status()
    }

    /// Structured context for the non-production `details` field.
    ///
    /// Only safe metadata goes in here; raw input and secrets never do.
    pub fn details(&self) -> ErrorDetails {
        match self {
            SecurityError::Validation(fields) => ErrorDetails::Fields(fields.clone()),
            SecurityError::Token(TokenError::Invalid { reason }) => {
                ErrorDetails::pair("reason", reason)
            }
            SecurityError::Token(TokenError::WrongKind { expected, actual }) => {
                let mut map = BTreeMap::new();
                map.insert("expected".to_string(), expected.to_string());
                map.insert("actual".to_string(), actual.to_string());
                ErrorDetails::KeyValue(map)
            }
            SecurityError::Access(AccessError::InsufficientRole { role, allowed }) => {
                let mut map = BTreeMap::new();
                map.insert(
                    "heldRole".to_string(),
                    role.map_or_else(|| "none".to_string(), |r| r.to_string()),
                );
                map.insert("requiredRoles".to_string(), allowed.to_string());
                ErrorDetails::KeyValue(map)
            }
            SecurityError::Access(AccessError::NotOwner { resource }) => {
                ErrorDetails::pair("resource", resource)
            }
            SecurityError::Data(DataError::Duplicate { field })
            | SecurityError::Data(DataError::BadReference { field }) => {
                ErrorDetails::pair("field", field)
            }
            SecurityError::Data(DataError::NotFound { resource }) => {
                ErrorDetails::pair("resource", resource)
            }
            SecurityError::Upload(UploadError::FileTooLarge { limit_bytes }) => {
                ErrorDetails::pair("limitBytes", limit_bytes.to_string())
            }
            SecurityError::Upload(UploadError::UnsupportedType { mime }) => {
                ErrorDetails::pair("mimeType", mime)
            }
            SecurityError::Upload(UploadError::TooMany { limit }) => {
                ErrorDetails::pair("limit", limit.to_string())
            }
            _ => ErrorDetails::None,
        }
    }

    /// Whether this failure class is mirrored into the audit sink.
    ///
    /// Token, CSRF, and authorization failures always are, in every
    /// environment. Validation, data, and upload failures are ordinary
    /// application outcomes.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            SecurityError::Token(_) | SecurityError::Csrf(_) | SecurityError::Access(_)
        )
    }
}

/// One field that failed input validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    field: String,
    message: String,
}

impl FieldError {
    /// Creates a field-level validation failure.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field's name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// What was wrong with it.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Data-layer conflicts surfaced through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// A uniqueness constraint was hit.
    #[error("a record with this {field} already exists")]
    Duplicate {
        /// The constrained field.
        field: String,
    },
    /// The addressed record does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// What was looked up.
        resource: String,
    },
    /// The request referenced a record that does not exist.
    #[error("referenced {field} does not exist")]
    BadReference {
        /// The referencing field.
        field: String,
    },
}

/// File upload failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The file is bigger than the configured ceiling.
    #[error("file exceeds the {limit_bytes} byte limit")]
    FileTooLarge {
        /// The ceiling in bytes.
        limit_bytes: u64,
    },
    /// The file's type is not accepted.
    #[error("file type {mime} is not accepted")]
    UnsupportedType {
        /// The rejected MIME type.
        mime: String,
    },
    /// More files than the endpoint accepts.
    #[error("too many files (limit {limit})")]
    TooMany {
        /// Maximum accepted file count.
        limit: usize,
    },
}

/// Stable error codes exposed to clients.
///
/// These are wire contract: clients branch on them, so variants are only
/// ever added, never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Credential missing, malformed, or failed verification.
    InvalidToken,
    /// Credential expired.
    TokenExpired,
    /// Credential belongs to the wrong principal kind.
    InvalidTokenType,
    /// CSRF cookie absent.
    CsrfTokenMissingCookie,
    /// CSRF header absent.
    CsrfTokenMissingHeader,
    /// CSRF value malformed.
    CsrfTokenInvalidFormat,
    /// CSRF cookie and header disagree.
    CsrfTokenMismatch,
    /// Administrator authentication required.
    AdminAuthRequired,
    /// Authenticated administrator lacks the required role.
    InsufficientPermissions,
    /// Principal does not own the resource.
    AccessDenied,
    /// Request input failed validation.
    ValidationError,
    /// Uniqueness conflict.
    DuplicateError,
    /// Addressed record missing.
    NotFoundError,
    /// Dangling reference in the request.
    ReferenceError,
    /// Uploaded file too large.
    FileSizeExceeded,
    /// Uploaded file type not accepted.
    InvalidFileType,
    /// Too many uploaded files.
    TooManyFiles,
    /// Unclassified server-side failure.
    InternalError,
}

impl ErrorCode {
    /// The HTTP status paired with this code.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::InvalidToken
            | ErrorCode::TokenExpired
            | ErrorCode::InvalidTokenType
            | ErrorCode::AdminAuthRequired => 401,
            ErrorCode::CsrfTokenMissingCookie
            | ErrorCode::CsrfTokenMissingHeader
            | ErrorCode::CsrfTokenInvalidFormat
            | ErrorCode::CsrfTokenMismatch
            | ErrorCode::InsufficientPermissions
            | ErrorCode::AccessDenied => 403,
            ErrorCode::ValidationError
            | ErrorCode::DuplicateError
            | ErrorCode::ReferenceError
            | ErrorCode::FileSizeExceeded
            | ErrorCode::InvalidFileType
            | ErrorCode::TooManyFiles => 400,
            ErrorCode::NotFoundError => 404,
            ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InvalidTokenType => "INVALID_TOKEN_TYPE",
            ErrorCode::CsrfTokenMissingCookie => "CSRF_TOKEN_MISSING_COOKIE",
            ErrorCode::CsrfTokenMissingHeader => "CSRF_TOKEN_MISSING_HEADER",
            ErrorCode::CsrfTokenInvalidFormat => "CSRF_TOKEN_INVALID_FORMAT",
            ErrorCode::CsrfTokenMismatch => "CSRF_TOKEN_MISMATCH",
            ErrorCode::AdminAuthRequired => "ADMIN_AUTH_REQUIRED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DuplicateError => "DUPLICATE_ERROR",
            ErrorCode::NotFoundError => "NOT_FOUND_ERROR",
            ErrorCode::ReferenceError => "REFERENCE_ERROR",
            ErrorCode::FileSizeExceeded => "FILE_SIZE_EXCEEDED",
            ErrorCode::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorCode::TooManyFiles => "TOO_MANY_FILES",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(tag)
    }
}

/// Structured context attached to non-production error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// Nothing beyond code and message.
    None,
    /// Per-field validation failures.
    Fields(Vec<FieldError>),
    /// Free-form safe metadata.
    KeyValue(BTreeMap<String, String>),
}

impl ErrorDetails {
    /// Whether there is nothing to serialize.
    pub fn is_none(&self) -> bool {
        matches!(self, ErrorDetails::None)
    }

    fn pair(key: &str, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.to_string(), value.into());
        ErrorDetails::KeyValue(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{PrincipalKind, Role, RoleSet};

    #[test]
    fn token_failures_map_to_401_codes() {
        let cases = [
            (TokenError::Missing, ErrorCode::InvalidToken),
            (TokenError::Expired, ErrorCode::TokenExpired),
            (
                TokenError::Invalid {
                    reason: "x".to_string(),
                },
                ErrorCode::InvalidToken,
            ),
            (
                TokenError::WrongKind {
                    expected: PrincipalKind::Admin,
                    actual: PrincipalKind::User,
                },
                ErrorCode::InvalidTokenType,
            ),
        ];
        for (err, code) in cases {
            let failure = SecurityError::from(err);
            assert_eq!(failure.code(), code);
            assert_eq!(failure.status(), 401);
            assert!(failure.is_security_relevant());
        }
    }

    #[test]
    fn csrf_failures_map_to_403_codes() {
        let cases = [
            (CsrfError::MissingCookie, ErrorCode::CsrfTokenMissingCookie),
            (CsrfError::MissingHeader, ErrorCode::CsrfTokenMissingHeader),
            (CsrfError::InvalidFormat, ErrorCode::CsrfTokenInvalidFormat),
            (CsrfError::Mismatch, ErrorCode::CsrfTokenMismatch),
        ];
        for (err, code) in cases {
            let failure = SecurityError::from(err);
            assert_eq!(failure.code(), code);
            assert_eq!(failure.status(), 403);
        }
    }

    #[test]
    fn authorization_failures_split_401_from_403() {
        let missing = SecurityError::from(AccessError::AdminRequired);
        assert_eq!(missing.code(), ErrorCode::AdminAuthRequired);
        assert_eq!(missing.status(), 401);

        let lacking = SecurityError::from(AccessError::InsufficientRole {
            role: Some(Role::Manager),
            allowed: RoleSet::admin_only(),
        });
        assert_eq!(lacking.code(), ErrorCode::InsufficientPermissions);
        assert_eq!(lacking.status(), 403);

        let stranger = SecurityError::from(AccessError::NotOwner {
            resource: "reg-1".to_string(),
        });
        assert_eq!(stranger.code(), ErrorCode::AccessDenied);
        assert_eq!(stranger.status(), 403);
    }

    #[test]
    fn application_failures_keep_their_statuses() {
        assert_eq!(
            SecurityError::validation(vec![FieldError::new("email", "required")]).status(),
            400
        );
        assert_eq!(
            SecurityError::from(DataError::Duplicate {
                field: "email".to_string()
            })
            .status(),
            400
        );
        assert_eq!(
            SecurityError::from(DataError::NotFound {
                resource: "poll".to_string()
            })
            .status(),
            404
        );
        assert_eq!(
            SecurityError::from(UploadError::FileTooLarge { limit_bytes: 1024 }).status(),
            400
        );
        assert_eq!(SecurityError::internal("boom").status(), 500);
    }

    #[test]
    fn only_security_classes_are_mirrored_to_audit() {
        assert!(SecurityError::from(CsrfError::Mismatch).is_security_relevant());
        assert!(!SecurityError::validation(vec![]).is_security_relevant());
        assert!(!SecurityError::internal("boom").is_security_relevant());
        assert!(!SecurityError::from(DataError::NotFound {
            resource: "poll".to_string()
        })
        .is_security_relevant());
    }

    #[test]
    fn insufficient_role_details_carry_held_and_required() {
        let failure = SecurityError::from(AccessError::InsufficientRole {
            role: Some(Role::Manager),
            allowed: RoleSet::admin_only(),
        });
        match failure.details() {
            ErrorDetails::KeyValue(map) => {
                assert_eq!(map.get("heldRole").map(String::as_str), Some("manager"));
                assert_eq!(map.get("requiredRoles").map(String::as_str), Some("admin"));
            }
            other => panic!("expected key/value details, got {other:?}"),
        }
    }

    #[test]
    fn validation_details_carry_the_field_list() {
        let failure = SecurityError::validation(vec![
            FieldError::new("email", "required"),
            FieldError::new("county", "unknown value"),
        ]);
        match failure.details() {
            ErrorDetails::Fields(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field(), "email");
            }
            other => panic!("expected field details, got {other:?}"),
        }
    }

    #[test]
    fn codes_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::CsrfTokenMissingCookie).expect("serializes");
        assert_eq!(json, "\"CSRF_TOKEN_MISSING_COOKIE\"");
        assert_eq!(
            ErrorCode::CsrfTokenMissingCookie.to_string(),
            "CSRF_TOKEN_MISSING_COOKIE"
        );
    }

    #[test]
    fn details_serialize_untagged() {
        let fields =
            serde_json::to_value(ErrorDetails::Fields(vec![FieldError::new("email", "bad")]))
                .expect("serializes");
        assert_eq!(
            fields,
            serde_json::json!([{ "field": "email", "message": "bad" }])
        );

        let mut map = BTreeMap::new();
        map.insert("resource".to_string(), "reg-1".to_string());
        let kv = serde_json::to_value(ErrorDetails::KeyValue(map)).expect("serializes");
        assert_eq!(kv, serde_json::json!({ "resource": "reg-1" }));
    }

    #[test]
    fn display_passes_through_the_specific_failure() {
        let failure = SecurityError::from(TokenError::Expired);
        assert_eq!(failure.to_string(), "credential has expired");
    }
}
