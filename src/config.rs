//! Pipeline configuration.
//!
//! All knobs the security pipeline reads live in one [`SecurityConfig`]
//! value: the signing key, token and CSRF lifetimes, cookie and header
//! names, and the scanner's ceilings. The struct deserializes from config
//! files with serde, defaults to development-sane values, and is validated
//! semantically before a pipeline is built (serde handles the syntactic
//! part). Validation returns every problem found, not just the first.

use std::fmt;

use serde::Deserialize;

/// Deployment environment; drives redaction and cookie hardening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local or staging runs: responses keep diagnostic detail.
    #[default]
    Development,
    /// Live runs: generic messages, no details, `Secure` cookies.
    Production,
}

impl Environment {
    /// True for [`Environment::Production`].
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Symmetric key material for credential signing.
///
/// The key is never printed: `Debug` and `Display` both render `[REDACTED]`
/// unconditionally, and the type deliberately implements neither `Serialize`
/// nor `Clone` beyond what configuration loading needs. Access to the raw
/// bytes goes through [`expose_secret`](Self::expose_secret), whose name is
/// meant to stand out in review.
///
/// # Examples
///
/// ```
/// use guard_core::SigningKey;
///
/// let key = SigningKey::new("a-long-random-secret-for-signing");
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(format!("{}", key), "[REDACTED]");
/// ```
#[derive(Deserialize)]
#[serde(from = "String")]
pub struct SigningKey {
    inner: Vec<u8>,
}

impl SigningKey {
    /// Wraps raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    /// Explicitly exposes the key bytes.
    ///
    /// Callers must not log or serialize the returned slice.
    pub fn expose_secret(&self) -> &[u8] {
        &self.inner
    }

    /// Key length in bytes, safe to report in diagnostics.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the key holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for SigningKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for SigningKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Ceiling on the configurable lifetimes: ten years in seconds.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Read-only configuration shared by every pipeline component.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Deployment environment.
    pub environment: Environment,

    /// Key used to sign and verify bearer credentials.
    pub signing_key: SigningKey,

    /// Bearer credential lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Random byte length of a CSRF token; the wire value is twice this
    /// many lowercase hex characters.
    pub csrf_token_bytes: usize,

    /// CSRF cookie lifetime in seconds.
    pub csrf_ttl_secs: u64,

    /// Name of the CSRF cookie.
    pub csrf_cookie_name: String,

    /// Name of the request header that must echo the cookie value.
    pub csrf_header_name: String,

    /// Query-parameter count above which the scanner flags a request.
    pub max_query_params: usize,

    /// Body size in bytes above which the scanner flags a request.
    pub max_body_bytes: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            signing_key: SigningKey::from("development-only-signing-key-not-for-live-use"),
            token_ttl_secs: 60 * 60,
            csrf_token_bytes: 32,
            csrf_ttl_secs: 24 * 60 * 60,
            csrf_cookie_name: "csrf-token".to_string(),
            csrf_header_name: "x-csrf-token".to_string(),
            max_query_params: 50,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl SecurityConfig {
    /// Semantic validation: checks value ranges and key strength.
    ///
    /// # Errors
    ///
    /// Returns every violation found as a human-readable list. A production
    /// environment additionally requires a key of at least 32 bytes.
    /// Lifetimes must be positive and at most ten years; `max_body_bytes`
    /// must fit the platform's addressable size.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.signing_key.is_empty() {
            problems.push("signing_key must not be empty".to_string());
        } else if self.environment.is_production() && self.signing_key.len() < 32 {
            problems.push(format!(
                "signing_key must be at least 32 bytes in production (got {})",
                self.signing_key.len()
            ));
        }
        if self.token_ttl_secs == 0 {
            problems.push("token_ttl_secs must be greater than zero".to_string());
        } else if self.token_ttl_secs > MAX_TTL_SECS {
            problems.push(format!(
                "token_ttl_secs must be at most {MAX_TTL_SECS} (got {})",
                self.token_ttl_secs
            ));
        }
        if self.csrf_token_bytes == 0 {
            problems.push("csrf_token_bytes must be greater than zero".to_string());
        }
        if self.csrf_ttl_secs == 0 {
            problems.push("csrf_ttl_secs must be greater than zero".to_string());
        } else if self.csrf_ttl_secs > MAX_TTL_SECS {
            problems.push(format!(
                "csrf_ttl_secs must be at most {MAX_TTL_SECS} (got {})",
                self.csrf_ttl_secs
            ));
        }
        if self.csrf_cookie_name.is_empty() {
            problems.push("csrf_cookie_name must not be empty".to_string());
        }
        if self.csrf_header_name.is_empty() {
            problems.push("csrf_header_name must not be empty".to_string());
        }
        if self.max_query_params == 0 {
            problems.push("max_query_params must be greater than zero".to_string());
        }
        if self.max_body_bytes == 0 {
            problems.push("max_body_bytes must be greater than zero".to_string());
        } else if usize::try_from(self.max_body_bytes).is_err() {
            problems.push(format!(
                "max_body_bytes does not fit this platform's addressable size (got {})",
                self.max_body_bytes
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SecurityConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_defaults_to_development() {
        assert_eq!(Environment::default(), Environment::Development);
        assert!(!Environment::Development.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn signing_key_redacts_debug_and_display() {
        let key = SigningKey::from("super-secret-material");
        assert_eq!(format!("{:?}", key), "[REDACTED]");
        assert_eq!(format!("{}", key), "[REDACTED]");
    }

    #[test]
    fn config_debug_never_shows_key_bytes() {
        let config = SecurityConfig::default();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("development-only-signing-key"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let config = SecurityConfig {
            signing_key: SigningKey::new(Vec::new()),
            token_ttl_secs: 0,
            csrf_token_bytes: 0,
            csrf_cookie_name: String::new(),
            ..SecurityConfig::default()
        };

        let problems = config.validate().expect_err("invalid config");
        assert_eq!(problems.len(), 4);
    }

    #[test]
    fn validate_bounds_numeric_extremes() {
        let config = SecurityConfig {
            token_ttl_secs: u64::MAX,
            csrf_ttl_secs: u64::MAX,
            ..SecurityConfig::default()
        };

        let problems = config.validate().expect_err("extremes rejected");
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("token_ttl_secs")));
        assert!(problems.iter().any(|p| p.contains("csrf_ttl_secs")));
    }

    #[test]
    fn production_requires_strong_key() {
        let config = SecurityConfig {
            environment: Environment::Production,
            signing_key: SigningKey::from("short"),
            ..SecurityConfig::default()
        };

        let problems = config.validate().expect_err("weak key rejected");
        assert!(problems[0].contains("32 bytes"));
    }

    #[test]
    fn config_deserializes_from_json() {
        let json = r#"{
            "environment": "production",
            "signing_key": "0123456789abcdef0123456789abcdef",
            "csrf_token_bytes": 16
        }"#;

        let config: SecurityConfig = serde_json::from_str(json).expect("parses");
        assert!(config.environment.is_production());
        assert_eq!(config.csrf_token_bytes, 16);
        // Unspecified fields keep their defaults.
        assert_eq!(config.csrf_cookie_name, "csrf-token");
        assert!(config.validate().is_ok());
    }
}
