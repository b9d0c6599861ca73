//! Request security pipeline for web services: bearer-token auth,
//! double-submit CSRF, anomaly scanning, authorization gates, and audited
//! error translation.
//!
//! Every incoming request runs one fixed chain: the scanner observes and
//! records anomalies, the token codec authenticates, the CSRF guard checks
//! double-submit proof on mutations, the access gate applies role and
//! ownership rules, and every denial leaves through one translator that
//! redacts per environment. Security-relevant failures are always mirrored
//! into an audit sink, whatever the environment hides from clients.
//!
//! # Core Types
//!
//! - [`TokenCodec`]: issues and verifies signed bearer credentials
//! - [`CsrfGuard`]: mints and checks double-submit CSRF tokens
//! - [`PatternScanner`]: matches injection patterns and request heuristics
//! - [`AccessGate`]: role and ownership authorization
//! - [`ErrorTranslator`]: the single failure-to-response point
//! - [`web::SecurityPipeline`]: runs the whole chain per request
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use guard_core::{MemorySink, Principal, SecurityConfig, StaticOwners};
//! use guard_core::web::{Admission, RequestAdapter, RoutePolicy, SecurityPipeline};
//!
//! let sink = Arc::new(MemorySink::new());
//! let pipeline = SecurityPipeline::new(
//!     SecurityConfig::default(),
//!     sink.clone(),
//!     Arc::new(StaticOwners::new()),
//! )
//! .expect("default configuration is valid");
//!
//! // A voter fetches the poll list; a CSRF token is issued on the way out.
//! let credential = pipeline
//!     .token_codec()
//!     .issue(&Principal::user("voter-12"))
//!     .expect("signing succeeds");
//! let request = RequestAdapter::new("GET", "/api/polls")
//!     .with_header("Authorization", format!("Bearer {credential}"))
//!     .with_header("User-Agent", "Mozilla/5.0")
//!     .with_header("Accept", "application/json")
//!     .with_header("Accept-Language", "en-US");
//!
//! match pipeline.admit(&request, &RoutePolicy::public()) {
//!     Admission::Granted { context, csrf_cookie } => {
//!         assert_eq!(context.principal().map(|p| p.id()), Some("voter-12"));
//!         assert!(csrf_cookie.is_some());
//!     }
//!     Admission::Denied(record) => panic!("denied: {}", record.body_json()),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod config;
mod csrf;
mod error;
mod gate;
mod principal;
mod scanner;
mod token;
mod trace;
mod translate;
pub mod web;

pub use audit::{EventSink, MemorySink, SecurityEvent, SecurityEventKind, Severity, TracingSink};
pub use config::{Environment, SecurityConfig, SigningKey};
pub use csrf::{CsrfError, CsrfGuard, IssuedCsrf};
pub use error::{
    DataError, ErrorCode, ErrorDetails, FieldError, SecurityError, UploadError,
};
pub use gate::{AccessError, AccessGate, OwnerDirectory, StaticOwners};
pub use principal::{InvalidPrincipal, Principal, PrincipalKind, Role, RoleSet};
pub use scanner::{Detection, PatternError, PatternScanner, ScanLimits, ScanRequest};
pub use token::{TokenCodec, TokenError};
pub use trace::{RequestTrace, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
pub use translate::{ErrorBody, ErrorRecord, ErrorResponse, ErrorTranslator};
