//! `Set-Cookie` rendering for the CSRF cookie.

use std::fmt;
use std::time::Duration;

/// Conventional name for the header that carries the CSRF token in both
/// directions: the host echoes a freshly issued token to the client under
/// it (the cookie itself is `HttpOnly`, so script cannot read it), and the
/// client sends it back on every mutation.
///
/// Deployments that rename the header via
/// [`SecurityConfig::csrf_header_name`](crate::SecurityConfig) should use
/// their configured name instead.
pub const CSRF_ECHO_HEADER: &str = "X-CSRF-Token";

/// Builder for the security pipeline's `Set-Cookie` header value.
///
/// The rendered cookie is always `HttpOnly`, `SameSite=Strict`, and scoped
/// to `Path=/`; `Secure` is added for production deployments. These are not
/// configurable: loosening any of them would undermine the double-submit
/// scheme the cookie exists for.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use guard_core::web::SetCookie;
///
/// let cookie = SetCookie::new("csrf-token", "deadbeef")
///     .with_max_age(Duration::from_secs(86_400))
///     .with_secure(true);
/// assert_eq!(
///     cookie.header_value(),
///     "csrf-token=deadbeef; Max-Age=86400; Path=/; HttpOnly; SameSite=Strict; Secure"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    max_age: Duration,
    secure: bool,
}

impl SetCookie {
    /// Creates a cookie with a one-day lifetime and `Secure` off.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: Duration::from_secs(86_400),
            secure: false,
        }
    }

    /// Sets the cookie lifetime, rendered as whole seconds.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Adds or removes the `Secure` attribute.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// The cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The configured lifetime.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Whether `Secure` will be rendered.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Renders the complete `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict",
            self.name,
            self.value,
            self.max_age.as_secs()
        )?;
        if self.secure {
            write!(f, "; Secure")?;
        }
        Ok(())
    }
}
