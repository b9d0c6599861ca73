//! Bearer credential encoding and verification.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::SigningKey;
use crate::principal::{Principal, PrincipalKind, Role};

/// Errors raised by credential verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No credential was supplied on a route that requires one.
    #[error("authentication credential required")]
    Missing,
    /// The credential's expiry has passed.
    #[error("credential has expired")]
    Expired,
    /// Signature, format, or claim verification failed.
    #[error("credential rejected: {reason}")]
    Invalid {
        /// Coarse internal reason; never echoed verbatim to clients in
        /// production.
        reason: String,
    },
    /// The credential verified but belongs to the wrong principal kind for
    /// this route.
    #[error("credential is for a {actual} principal, this route expects {expected}")]
    WrongKind {
        /// The kind the route expects.
        expected: PrincipalKind,
        /// The kind the credential carries.
        actual: PrincipalKind,
    },
}

/// Claim layout of a signed bearer credential.
///
/// Unknown claims are ignored on decode; absent optional claims default.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    kind: PrincipalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    iat: u64,
    exp: u64,
}

/// Stateless encoder/verifier for signed bearer credentials.
///
/// Credentials are HMAC-SHA256 signed and self-contained: verification
/// needs no store lookup and there is no revocation list. Expiry is the
/// only lifetime control, checked with zero leeway so the boundary is
/// exact.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use guard_core::{Principal, PrincipalKind, SigningKey, TokenCodec};
///
/// let key = SigningKey::from("an-adequately-long-signing-secret");
/// let codec = TokenCodec::new(&key, Duration::from_secs(3600));
///
/// let credential = codec.issue(&Principal::user("voter-12")).unwrap();
/// let principal = codec.verify(&credential, PrincipalKind::User).unwrap();
/// assert_eq!(principal.id(), "voter-12");
/// ```
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish()
    }
}

impl TokenCodec {
    /// Creates a codec from the shared signing key and credential lifetime.
    pub fn new(key: &SigningKey, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The default 60s leeway would blur the expiry boundary.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(key.expose_secret()),
            decoding_key: DecodingKey::from_secret(key.expose_secret()),
            validation,
            ttl,
        }
    }

    /// Mints a signed credential for `principal`, valid for the configured
    /// lifetime starting now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the configured lifetime overflows
    /// the expiry timestamp, or if the claims cannot be signed; both
    /// indicate a configuration or key problem rather than anything the
    /// caller did.
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let exp = now
            .checked_add(self.ttl.as_secs())
            .ok_or_else(|| TokenError::Invalid {
                reason: "credential lifetime overflows the expiry timestamp".to_string(),
            })?;
        let claims = Claims {
            sub: principal.id().to_string(),
            kind: principal.kind(),
            role: principal.role(),
            iat: now,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|_| {
            TokenError::Invalid {
                reason: "credential could not be signed".to_string(),
            }
        })
    }

    /// Verifies a credential and reconstructs its principal.
    ///
    /// Checks, in order: signature and claim shape, expiry, the principal
    /// model invariant, and finally that the principal kind matches what
    /// the route expects. Verification is stateless; nothing is consulted
    /// beyond the credential itself.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Expired`] when the expiry has passed
    /// - [`TokenError::Invalid`] for every other decode failure
    /// - [`TokenError::WrongKind`] when the decoded kind differs from
    ///   `expected`
    pub fn verify(&self, credential: &str, expected: PrincipalKind) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;
        let claims = data.claims;

        let principal = Principal::from_parts(claims.sub, claims.kind, claims.role).map_err(|_| {
            TokenError::Invalid {
                reason: "claims violate the principal model".to_string(),
            }
        })?;

        if principal.kind() != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: principal.kind(),
            });
        }

        Ok(principal)
    }

    /// Optional-mode verification for routes that serve both anonymous and
    /// authenticated callers.
    ///
    /// An absent credential yields `Ok(None)`. A present credential is
    /// verified exactly as [`verify`](Self::verify) does; only absence is
    /// forgiven, never an invalid value.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify) when a credential is present.
    pub fn verify_optional(
        &self,
        credential: Option<&str>,
        expected: PrincipalKind,
    ) -> Result<Option<Principal>, TokenError> {
        match credential {
            None => Ok(None),
            Some(value) => self.verify(value, expected).map(Some),
        }
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::Invalid {
            reason: "signature verification failed".to_string(),
        },
        _ => TokenError::Invalid {
            reason: "credential is malformed".to_string(),
        },
    }
}
