//! The per-request security pipeline.
//!
//! [`SecurityPipeline`] owns every guard component and runs them in a
//! fixed order for each request:
//!
//! ```text
//! RequestAdapter + RoutePolicy
//!   ↓
//! PatternScanner        (observe and record, never block)
//!   ↓
//! TokenCodec            (authenticate per AuthPolicy)
//!   ↓
//! CsrfGuard             (verify on mutations, issue on safe methods)
//!   ↓
//! AccessGate            (role and ownership checks)
//!   ↓
//! Admission::Granted { SecurityContext, fresh CSRF cookie }
//! ```
//!
//! The first failing stage short-circuits: the failure is translated into
//! the client-facing [`ErrorRecord`], the mirrored audit event is recorded,
//! and later stages never run.
//!
//! # Design Principles
//!
//! 1. **Stateless per request**: nothing survives a request except what the
//!    append-only sink collected. Two concurrent requests share only
//!    immutable components.
//!
//! 2. **Explicit context**: on success the caller receives a
//!    [`SecurityContext`] value. Handlers take it as an argument; there is
//!    no ambient request state to reach for.
//!
//! 3. **Detection is not enforcement**: scanner findings are recorded and
//!    the request proceeds. Only authentication, CSRF, and authorization
//!    failures deny.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::audit::{EventSink, SecurityEvent};
use crate::config::SecurityConfig;
use crate::csrf::CsrfGuard;
use crate::error::SecurityError;
use crate::gate::{AccessGate, OwnerDirectory};
use crate::principal::{Principal, PrincipalKind};
use crate::scanner::{PatternError, PatternScanner, ScanLimits};
use crate::token::{TokenCodec, TokenError};
use crate::trace::RequestTrace;
use crate::translate::{ErrorRecord, ErrorTranslator};

use super::adapter::RequestAdapter;
use super::cookie::SetCookie;
use super::route::{AuthPolicy, CsrfPolicy, RoutePolicy};

/// Errors raised while assembling a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineBuildError {
    /// The configuration failed semantic validation; every violation is
    /// listed.
    #[error("configuration invalid: {}", .0.join("; "))]
    Config(Vec<String>),
    /// The scanner's pattern table failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// What a granted request carries into its handler.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    trace: RequestTrace,
    principal: Option<Principal>,
    client_ip: Option<String>,
}

impl SecurityContext {
    /// The request's trace identity.
    pub fn trace(&self) -> &RequestTrace {
        &self.trace
    }

    /// The authenticated principal, when the route produced one.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The resolved client address, when one was available.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }
}

/// Outcome of running the pipeline over one request.
#[derive(Debug)]
pub enum Admission {
    /// The request may proceed to its handler.
    Granted {
        /// Context the handler receives.
        context: SecurityContext,
        /// Fresh CSRF cookie to set on the response, present on safe
        /// methods under any non-exempt CSRF policy.
        csrf_cookie: Option<SetCookie>,
    },
    /// The request was denied; answer with this record.
    Denied(ErrorRecord),
}

impl Admission {
    /// Whether the request was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted { .. })
    }

    /// Whether the request was denied.
    pub fn is_denied(&self) -> bool {
        !self.is_granted()
    }
}

/// The assembled request security pipeline.
///
/// Build one per process from validated configuration and share it;
/// admission is `&self` and safe to run concurrently.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use guard_core::{MemorySink, SecurityConfig, StaticOwners};
/// use guard_core::web::{RequestAdapter, RoutePolicy, SecurityPipeline};
///
/// let sink = Arc::new(MemorySink::new());
/// let pipeline = SecurityPipeline::new(
///     SecurityConfig::default(),
///     sink,
///     Arc::new(StaticOwners::new()),
/// )
/// .unwrap();
///
/// let request = RequestAdapter::new("GET", "/api/polls")
///     .with_header("User-Agent", "Mozilla/5.0")
///     .with_header("Accept", "application/json")
///     .with_header("Accept-Language", "en-US");
/// let admission = pipeline.admit(&request, &RoutePolicy::public());
/// assert!(admission.is_granted());
/// ```
pub struct SecurityPipeline {
    scanner: PatternScanner,
    codec: TokenCodec,
    guard: CsrfGuard,
    gate: AccessGate,
    translator: ErrorTranslator,
    sink: Arc<dyn EventSink>,
    owners: Arc<dyn OwnerDirectory>,
    csrf_cookie_name: String,
    csrf_header_name: String,
    secure_cookies: bool,
}

impl std::fmt::Debug for SecurityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityPipeline")
            .field("scanner", &self.scanner)
            .field("codec", &self.codec)
            .field("csrf_cookie_name", &self.csrf_cookie_name)
            .field("csrf_header_name", &self.csrf_header_name)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl SecurityPipeline {
    /// Assembles a pipeline from validated configuration plus the two
    /// injected collaborators: the audit sink and the ownership directory.
    ///
    /// # Errors
    ///
    /// - [`PipelineBuildError::Config`] listing every configuration
    ///   violation
    /// - [`PipelineBuildError::Pattern`] if the scanner's pattern table
    ///   fails to compile
    pub fn new(
        config: SecurityConfig,
        sink: Arc<dyn EventSink>,
        owners: Arc<dyn OwnerDirectory>,
    ) -> Result<Self, PipelineBuildError> {
        config.validate().map_err(PipelineBuildError::Config)?;

        let scanner = PatternScanner::new(ScanLimits::new(
            config.max_query_params,
            config.max_body_bytes as usize,
        ))?;
        let codec = TokenCodec::new(
            &config.signing_key,
            Duration::from_secs(config.token_ttl_secs),
        );
        let guard = CsrfGuard::new(
            config.csrf_token_bytes,
            Duration::from_secs(config.csrf_ttl_secs),
        );

        Ok(Self {
            scanner,
            codec,
            guard,
            gate: AccessGate::new(),
            translator: ErrorTranslator::new(config.environment),
            sink,
            owners,
            csrf_cookie_name: config.csrf_cookie_name,
            csrf_header_name: config.csrf_header_name,
            secure_cookies: config.environment.is_production(),
        })
    }

    /// The credential codec, shared so login handlers can issue tokens
    /// signed with the same key the pipeline verifies against.
    pub fn token_codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Runs the full admission chain for one request under one route
    /// policy.
    pub fn admit(&self, request: &RequestAdapter, route: &RoutePolicy) -> Admission {
        let trace = request.trace();

        self.record_detections(request, &trace);

        let principal = match self.authenticate(request, route) {
            Ok(principal) => principal,
            Err(error) => return self.deny(error, request, &trace),
        };

        let csrf_cookie = match self.apply_csrf(request, route, principal.as_ref()) {
            Ok(cookie) => cookie,
            Err(error) => return self.deny(error, request, &trace),
        };

        if let Err(error) = self.authorize(request, route, principal.as_ref()) {
            return self.deny(error, request, &trace);
        }

        Admission::Granted {
            context: SecurityContext {
                trace,
                principal,
                client_ip: request.client_ip(),
            },
            csrf_cookie,
        }
    }

    /// Translates a handler-raised failure into a response record, with
    /// the same audit mirroring a pipeline denial gets.
    ///
    /// Handlers use this for validation, data, and upload failures that
    /// occur after admission. The trace comes from the admitted `context`,
    /// so the envelope and the mirrored event carry the same identifiers
    /// as every admission-phase artifact of the request.
    pub fn reject(
        &self,
        error: &SecurityError,
        request: &RequestAdapter,
        context: &SecurityContext,
    ) -> ErrorRecord {
        let trace = context.trace();
        if let Some(event) = self.translator.audit_event_for(error, trace) {
            self.sink.record(self.enrich(event, request));
        }
        self.translator.translate(error, trace)
    }

    /// Scanner stage: record everything suspicious, block nothing.
    fn record_detections(&self, request: &RequestAdapter, trace: &RequestTrace) {
        let view = request.scan_view();
        let mut detections = self.scanner.scan(&view);
        if let Some(stacked) = self.scanner.check_forwarding_headers(&view) {
            detections.push(stacked);
        }
        if detections.is_empty() {
            return;
        }

        debug!(
            count = detections.len(),
            request_id = %trace.request_id(),
            url = %request.url(),
            "request anomalies detected"
        );
        for detection in detections {
            let event = SecurityEvent::new(
                detection.kind(),
                detection.severity(),
                trace.request_id(),
                trace.correlation_id(),
            )
            .with_detail("summary", detection.summary());
            self.sink.record(self.enrich(event, request));
        }
    }

    /// Authentication stage, per the route's [`AuthPolicy`].
    ///
    /// Admin routes verify in optional mode so that a wholly absent
    /// credential reaches the role gate, which reports it as missing admin
    /// authentication rather than a malformed token.
    fn authenticate(
        &self,
        request: &RequestAdapter,
        route: &RoutePolicy,
    ) -> Result<Option<Principal>, SecurityError> {
        let credential = request.bearer_credential();
        let principal = match route.auth() {
            AuthPolicy::Anonymous => None,
            AuthPolicy::Optional => self
                .codec
                .verify_optional(credential, PrincipalKind::User)?,
            AuthPolicy::RequiredUser => {
                let credential = credential.ok_or(TokenError::Missing)?;
                Some(self.codec.verify(credential, PrincipalKind::User)?)
            }
            AuthPolicy::RequiredAdmin(_) => self
                .codec
                .verify_optional(credential, PrincipalKind::Admin)?,
        };
        Ok(principal)
    }

    /// CSRF stage: verify double-submit proof on state-changing requests,
    /// slide a fresh token on safe ones.
    fn apply_csrf(
        &self,
        request: &RequestAdapter,
        route: &RoutePolicy,
        principal: Option<&Principal>,
    ) -> Result<Option<SetCookie>, SecurityError> {
        if route.csrf() == CsrfPolicy::Exempt {
            return Ok(None);
        }

        if request.is_state_changing() {
            let demanded = match route.csrf() {
                CsrfPolicy::Always => true,
                CsrfPolicy::WhenAuthenticated => principal.is_some(),
                CsrfPolicy::Exempt => false,
            };
            if demanded {
                self.guard.verify(
                    request.cookie(&self.csrf_cookie_name),
                    request.header(&self.csrf_header_name),
                )?;
            }
            return Ok(None);
        }

        // Sliding issuance: previously issued tokens stay valid until
        // their own cookie expires, so refreshing costs nothing.
        let issued = self.guard.issue();
        Ok(Some(
            SetCookie::new(&self.csrf_cookie_name, issued.value())
                .with_max_age(issued.ttl())
                .with_secure(self.secure_cookies),
        ))
    }

    /// Authorization stage: role check for admin routes, then ownership
    /// when the route declares it.
    fn authorize(
        &self,
        request: &RequestAdapter,
        route: &RoutePolicy,
        principal: Option<&Principal>,
    ) -> Result<(), SecurityError> {
        if let AuthPolicy::RequiredAdmin(allowed) = route.auth() {
            self.gate.require_role(principal, allowed)?;
        }

        if let Some(param) = route.ownership() {
            let resource_id = request.path_param(param).ok_or_else(|| {
                SecurityError::internal(format!(
                    "route declares ownership of :{param} but the router provided no such parameter"
                ))
            })?;
            let owner = self.owners.owner_of(resource_id);
            self.gate
                .require_ownership(principal, resource_id, owner.as_deref())?;
        }

        Ok(())
    }

    fn deny(
        &self,
        error: SecurityError,
        request: &RequestAdapter,
        trace: &RequestTrace,
    ) -> Admission {
        if let Some(event) = self.translator.audit_event_for(&error, trace) {
            self.sink.record(self.enrich(event, request));
        }
        Admission::Denied(self.translator.translate(&error, trace))
    }

    /// Attaches the transport metadata only this layer has.
    fn enrich(&self, event: SecurityEvent, request: &RequestAdapter) -> SecurityEvent {
        let mut event = event.with_url(request.url()).with_method(request.method());
        if let Some(ip) = request.client_ip() {
            event = event.with_ip(ip);
        }
        if let Some(agent) = request.header("user-agent") {
            event = event.with_user_agent(agent);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::config::SigningKey;
    use crate::gate::StaticOwners;

    fn pipeline_with(config: SecurityConfig) -> Result<SecurityPipeline, PipelineBuildError> {
        SecurityPipeline::new(
            config,
            Arc::new(MemorySink::new()),
            Arc::new(StaticOwners::new()),
        )
    }

    #[test]
    fn default_configuration_builds() {
        assert!(pipeline_with(SecurityConfig::default()).is_ok());
    }

    #[test]
    fn invalid_configuration_reports_every_problem() {
        let config = SecurityConfig {
            signing_key: SigningKey::new(""),
            token_ttl_secs: 0,
            ..SecurityConfig::default()
        };
        let err = pipeline_with(config).expect_err("invalid config");
        match err {
            PipelineBuildError::Config(problems) => {
                assert_eq!(problems.len(), 2);
                assert!(problems.iter().any(|p| p.contains("signing_key")));
                assert!(problems.iter().any(|p| p.contains("token_ttl_secs")));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_route_grants_without_credentials_or_cookie() {
        let pipeline = pipeline_with(SecurityConfig::default()).expect("builds");
        let request = RequestAdapter::new("GET", "/healthz")
            .with_header("User-Agent", "Mozilla/5.0")
            .with_header("Accept", "application/json");

        match pipeline.admit(&request, &RoutePolicy::anonymous()) {
            Admission::Granted {
                context,
                csrf_cookie,
            } => {
                assert!(context.principal().is_none());
                assert!(csrf_cookie.is_none());
            }
            Admission::Denied(record) => panic!("denied: {}", record.body_json()),
        }
    }

    #[test]
    fn safe_public_request_receives_a_fresh_csrf_cookie() {
        let pipeline = pipeline_with(SecurityConfig::default()).expect("builds");
        let request = RequestAdapter::new("GET", "/api/polls")
            .with_header("User-Agent", "Mozilla/5.0")
            .with_header("Accept", "application/json")
            .with_header("Accept-Language", "en-US");

        match pipeline.admit(&request, &RoutePolicy::public()) {
            Admission::Granted { csrf_cookie, .. } => {
                let cookie = csrf_cookie.expect("issued on safe methods");
                assert_eq!(cookie.name(), "csrf-token");
                assert_eq!(cookie.value().len(), 64);
                assert!(!cookie.secure());
            }
            Admission::Denied(record) => panic!("denied: {}", record.body_json()),
        }
    }

    #[test]
    fn production_pipeline_hardens_the_cookie() {
        let config = SecurityConfig {
            environment: crate::config::Environment::Production,
            signing_key: SigningKey::new("a-production-grade-signing-key-0123456789"),
            ..SecurityConfig::default()
        };
        let pipeline = pipeline_with(config).expect("builds");
        let request = RequestAdapter::new("GET", "/api/polls")
            .with_header("User-Agent", "Mozilla/5.0")
            .with_header("Accept", "application/json")
            .with_header("Accept-Language", "en-US");

        match pipeline.admit(&request, &RoutePolicy::public()) {
            Admission::Granted { csrf_cookie, .. } => {
                assert!(csrf_cookie.expect("issued").secure());
            }
            Admission::Denied(record) => panic!("denied: {}", record.body_json()),
        }
    }
}
