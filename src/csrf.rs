//! Double-submit CSRF token issuance and verification.
//!
//! The guard mints an opaque random token that the boundary layer places
//! both in a cookie and in the response body. State-changing requests must
//! echo the token back in a header; the guard checks that cookie and header
//! carry the same well-formed value. A forged cross-site request can make
//! the browser send the cookie but cannot read it to fill in the header,
//! so agreement between the two proves same-origin intent.
//!
//! Failures are ordered from most to least innocent: a missing cookie means
//! an expired or never-started session, a missing header usually means a
//! client bug, a malformed value means tampering or corruption, and a
//! well-formed mismatch is the actual attack signature.

use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Errors raised by CSRF verification, ordered by the check ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    /// No CSRF cookie accompanied the request.
    #[error("CSRF cookie is missing")]
    MissingCookie,
    /// The cookie is present but the echo header is not.
    #[error("CSRF header is missing")]
    MissingHeader,
    /// Cookie or header value is not a token this guard could have minted.
    #[error("CSRF token format is invalid")]
    InvalidFormat,
    /// Both values are well formed but disagree. This is the attack case.
    #[error("CSRF token mismatch")]
    Mismatch,
}

/// A freshly minted CSRF token together with its intended lifetime.
///
/// The boundary layer turns this into a cookie and echoes the value in a
/// response header so browser clients can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCsrf {
    value: String,
    ttl: Duration,
}

impl IssuedCsrf {
    /// The token value: lowercase hex, two characters per random byte.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// How long the paired cookie should live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Consumes the issuance and returns the bare token value.
    pub fn into_value(self) -> String {
        self.value
    }
}

/// Stateless double-submit CSRF guard.
///
/// Tokens are random bytes hex-encoded; nothing is stored server side, so
/// verification compares only what the request itself carries. Lifetime is
/// enforced entirely through the cookie's `Max-Age`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use guard_core::CsrfGuard;
///
/// let guard = CsrfGuard::new(32, Duration::from_secs(86_400));
/// let issued = guard.issue();
///
/// // The client echoes the cookie value back in the header.
/// assert!(guard.verify(Some(issued.value()), Some(issued.value())).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    token_bytes: usize,
    ttl: Duration,
}

impl CsrfGuard {
    /// Creates a guard minting tokens of `token_bytes` random bytes with
    /// the given cookie lifetime.
    pub fn new(token_bytes: usize, ttl: Duration) -> Self {
        Self { token_bytes, ttl }
    }

    /// Mints a fresh token from the operating system's entropy source.
    pub fn issue(&self) -> IssuedCsrf {
        let mut bytes = vec![0u8; self.token_bytes];
        OsRng.fill_bytes(&mut bytes);
        IssuedCsrf {
            value: hex::encode(bytes),
            ttl: self.ttl,
        }
    }

    /// Verifies the double-submit pair for a state-changing request.
    ///
    /// The checks run as a ladder and report the first rung that fails:
    /// cookie presence, header presence, format of both values, then a
    /// constant-time comparison. Format is validated before comparing so
    /// the timing of the comparison never varies with attacker-chosen
    /// lengths or alphabets.
    ///
    /// # Errors
    ///
    /// One of the [`CsrfError`] variants, in ladder order. Only
    /// [`CsrfError::Mismatch`] indicates a likely forgery.
    pub fn verify(&self, cookie: Option<&str>, header: Option<&str>) -> Result<(), CsrfError> {
        let cookie = cookie.ok_or(CsrfError::MissingCookie)?;
        let header = header.ok_or(CsrfError::MissingHeader)?;

        if !self.well_formed(cookie) || !self.well_formed(header) {
            return Err(CsrfError::InvalidFormat);
        }

        let equal: bool = cookie.as_bytes().ct_eq(header.as_bytes()).into();
        if equal {
            Ok(())
        } else {
            Err(CsrfError::Mismatch)
        }
    }

    /// Whether `value` is exactly a token this guard could have minted:
    /// two lowercase hex characters per configured byte.
    fn well_formed(&self, value: &str) -> bool {
        value.len() == self.token_bytes * 2
            && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CsrfGuard {
        CsrfGuard::new(32, Duration::from_secs(86_400))
    }

    #[test]
    fn issued_token_is_lowercase_hex_of_configured_width() {
        let issued = guard().issue();
        assert_eq!(issued.value().len(), 64);
        assert!(issued
            .value()
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        assert_eq!(issued.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn successive_issues_differ() {
        let guard = guard();
        assert_ne!(guard.issue().value(), guard.issue().value());
    }

    #[test]
    fn matching_pair_verifies() {
        let guard = guard();
        let issued = guard.issue();
        assert!(guard
            .verify(Some(issued.value()), Some(issued.value()))
            .is_ok());
    }

    #[test]
    fn ladder_reports_missing_cookie_first() {
        let guard = guard();
        let issued = guard.issue();
        assert_eq!(
            guard.verify(None, Some(issued.value())),
            Err(CsrfError::MissingCookie)
        );
        // Cookie absent and header absent still reports the cookie.
        assert_eq!(guard.verify(None, None), Err(CsrfError::MissingCookie));
    }

    #[test]
    fn ladder_reports_missing_header_second() {
        let guard = guard();
        let issued = guard.issue();
        assert_eq!(
            guard.verify(Some(issued.value()), None),
            Err(CsrfError::MissingHeader)
        );
    }

    #[test]
    fn malformed_values_fail_format_not_mismatch() {
        let guard = guard();
        let issued = guard.issue();

        // Too short, wrong alphabet, and uppercase all fail the same way.
        for bad in ["deadbeef", "zz", &issued.value().to_uppercase()] {
            assert_eq!(
                guard.verify(Some(bad), Some(issued.value())),
                Err(CsrfError::InvalidFormat)
            );
            assert_eq!(
                guard.verify(Some(issued.value()), Some(bad)),
                Err(CsrfError::InvalidFormat)
            );
        }
        assert_eq!(
            guard.verify(Some(""), Some("")),
            Err(CsrfError::InvalidFormat)
        );
    }

    #[test]
    fn well_formed_but_different_value_is_a_mismatch() {
        let guard = guard();
        let issued = guard.issue();

        // Flip one hex digit, keeping the value well formed.
        let mut forged: Vec<u8> = issued.value().bytes().collect();
        forged[0] = if forged[0] == b'0' { b'1' } else { b'0' };
        let forged = String::from_utf8(forged).expect("still ascii");

        assert_eq!(
            guard.verify(Some(issued.value()), Some(forged.as_str())),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn token_width_follows_configuration() {
        let short = CsrfGuard::new(16, Duration::from_secs(60));
        let issued = short.issue();
        assert_eq!(issued.value().len(), 32);

        // A 64-char token is malformed for a 16-byte guard.
        let long = guard().issue();
        assert_eq!(
            short.verify(Some(long.value()), Some(long.value())),
            Err(CsrfError::InvalidFormat)
        );
    }
}
