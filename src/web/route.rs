//! Declarative per-route security policy.

use crate::principal::RoleSet;

/// How a route authenticates callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// No credential is looked at; every caller is anonymous.
    Anonymous,
    /// A user credential is honored when present; absence is fine, but a
    /// present invalid credential still fails the request.
    Optional,
    /// A valid user credential is mandatory.
    RequiredUser,
    /// A valid admin credential holding one of the listed roles is
    /// mandatory.
    RequiredAdmin(RoleSet),
}

/// When CSRF double-submit proof is demanded.
///
/// Verification only ever applies to state-changing methods; safe methods
/// instead receive a fresh token under any non-exempt policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfPolicy {
    /// Never verified, never issued. For machine-to-machine routes.
    Exempt,
    /// Verified only when the request is authenticated. The conditional
    /// mode for mixed public/authenticated routes.
    WhenAuthenticated,
    /// Always verified on state-changing methods.
    Always,
}

/// The complete security posture of one route.
///
/// A policy composes an authentication mode, a CSRF mode, and optionally
/// an ownership requirement naming the path parameter that carries the
/// guarded resource id. Presets cover the three postures the application
/// actually uses; builder methods adjust the rest.
///
/// # Examples
///
/// ```
/// use guard_core::web::{CsrfPolicy, RoutePolicy};
/// use guard_core::RoleSet;
///
/// // A public listing: tokens honored when present, CSRF when logged in.
/// let listing = RoutePolicy::public();
///
/// // A voter updating their own registration.
/// let update = RoutePolicy::user().owned_by("registration_id");
/// assert_eq!(update.ownership(), Some("registration_id"));
///
/// // Back-office route for any admin role, CSRF-exempt service variant.
/// let service = RoutePolicy::admin(RoleSet::any_admin()).with_csrf(CsrfPolicy::Exempt);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    auth: AuthPolicy,
    csrf: CsrfPolicy,
    ownership: Option<String>,
}

impl RoutePolicy {
    /// Fully anonymous route: no authentication, no CSRF. Health checks
    /// and the like.
    pub fn anonymous() -> Self {
        Self {
            auth: AuthPolicy::Anonymous,
            csrf: CsrfPolicy::Exempt,
            ownership: None,
        }
    }

    /// Public route: credentials honored when present, CSRF proof demanded
    /// only from authenticated callers.
    pub fn public() -> Self {
        Self {
            auth: AuthPolicy::Optional,
            csrf: CsrfPolicy::WhenAuthenticated,
            ownership: None,
        }
    }

    /// Authenticated user route with unconditional CSRF on mutations.
    pub fn user() -> Self {
        Self {
            auth: AuthPolicy::RequiredUser,
            csrf: CsrfPolicy::Always,
            ownership: None,
        }
    }

    /// Admin route restricted to the given roles, with unconditional CSRF
    /// on mutations.
    pub fn admin(allowed: RoleSet) -> Self {
        Self {
            auth: AuthPolicy::RequiredAdmin(allowed),
            csrf: CsrfPolicy::Always,
            ownership: None,
        }
    }

    /// Overrides the authentication mode.
    pub fn with_auth(mut self, auth: AuthPolicy) -> Self {
        self.auth = auth;
        self
    }

    /// Overrides the CSRF mode.
    pub fn with_csrf(mut self, csrf: CsrfPolicy) -> Self {
        self.csrf = csrf;
        self
    }

    /// Requires ownership of the resource named by `path_param`.
    pub fn owned_by(mut self, path_param: impl Into<String>) -> Self {
        self.ownership = Some(path_param.into());
        self
    }

    /// The authentication mode.
    pub fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    /// The CSRF mode.
    pub fn csrf(&self) -> CsrfPolicy {
        self.csrf
    }

    /// The path parameter naming the owned resource, when set.
    pub fn ownership(&self) -> Option<&str> {
        self.ownership.as_deref()
    }
}
