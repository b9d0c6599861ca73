//! Property tests across the pipeline's cross-module invariants.
//!
//! These validate guarantees no single unit test pins down: credentials
//! round-trip for every principal shape, CSRF verification reduces to
//! exact equality of well-formed proof, plain traffic never trips the
//! scanner, and no environment emits markup in a client-facing message.

use std::sync::Arc;
use std::time::Duration;

use guard_core::web::{Admission, RequestAdapter, RoutePolicy, SecurityPipeline};
use guard_core::{
    CsrfError, CsrfGuard, Environment, ErrorTranslator, MemorySink, PatternScanner, Principal,
    RequestTrace, Role, RoleSet, ScanLimits, ScanRequest, SecurityConfig, SecurityError, Severity,
    SigningKey, StaticOwners, TokenCodec,
};
use proptest::prelude::*;

// Strategy: identifiers shaped like the ones the application mints
fn arb_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9-]{3,12}").unwrap()
}

// Strategy: either admin role
fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Manager)]
}

// Strategy: every principal shape the codec can mint
fn arb_principal() -> impl Strategy<Value = Principal> {
    prop_oneof![
        arb_id().prop_map(|id| Principal::user(id)),
        (arb_id(), arb_role()).prop_map(|(id, role)| Principal::admin(id, role)),
    ]
}

fn test_codec() -> TokenCodec {
    TokenCodec::new(
        &SigningKey::from("property-test-signing-key-0123456789ab"),
        Duration::from_secs(3600),
    )
}

fn test_guard() -> CsrfGuard {
    CsrfGuard::new(32, Duration::from_secs(600))
}

proptest! {
    /// Property: issue followed by verify reproduces the principal exactly,
    /// for every principal shape.
    #[test]
    fn proptest_credentials_round_trip_for_any_principal(principal in arb_principal()) {
        let codec = test_codec();
        let credential = codec.issue(&principal).expect("issues");
        let verified = codec.verify(&credential, principal.kind()).expect("verifies");
        prop_assert_eq!(verified, principal);
    }

    /// Property: changing any single character of a credential makes it
    /// unverifiable; the signature covers the whole compact form.
    #[test]
    fn proptest_tampered_credentials_never_verify(
        principal in arb_principal(),
        position in any::<prop::sample::Index>(),
    ) {
        let codec = test_codec();
        let credential = codec.issue(&principal).expect("issues");

        let mut bytes = credential.into_bytes();
        let at = position.index(bytes.len());
        // Stay inside the compact-form alphabet so rejection is
        // cryptographic rather than syntactic.
        bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).expect("still ascii");

        prop_assert!(codec.verify(&tampered, principal.kind()).is_err());
    }

    /// Property: an honest echo of any well-formed token verifies.
    #[test]
    fn proptest_honest_echo_always_verifies(
        token in prop::string::string_regex("[0-9a-f]{64}").unwrap(),
    ) {
        prop_assert!(test_guard().verify(Some(&token), Some(&token)).is_ok());
    }

    /// Property: altering one hex digit always lands on a mismatch, never
    /// on a format error.
    #[test]
    fn proptest_any_single_digit_change_is_a_mismatch(
        token in prop::string::string_regex("[0-9a-f]{64}").unwrap(),
        at in 0usize..64,
        replacement in prop::sample::select("0123456789abcdef".chars().collect::<Vec<char>>()),
    ) {
        let mut chars: Vec<char> = token.chars().collect();
        prop_assume!(chars[at] != replacement);
        chars[at] = replacement;
        let tampered: String = chars.into_iter().collect();

        prop_assert_eq!(
            test_guard().verify(Some(&token), Some(&tampered)),
            Err(CsrfError::Mismatch)
        );
    }

    /// Property: issuance is well formed at every configured width, and a
    /// fresh token proves itself.
    #[test]
    fn proptest_issued_tokens_are_well_formed(width in 1usize..=64) {
        let guard = CsrfGuard::new(width, Duration::from_secs(600));
        let issued = guard.issue();

        prop_assert_eq!(issued.value().len(), width * 2);
        prop_assert!(issued
            .value()
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        prop_assert!(guard.verify(Some(issued.value()), Some(issued.value())).is_ok());
    }

    /// Property: ordinary API traffic never trips the scanner.
    #[test]
    fn proptest_plain_api_traffic_is_never_flagged(
        path in prop::string::string_regex("/[a-z0-9/_]{0,40}").unwrap(),
        query in prop::string::string_regex(
            "([a-z0-9]{1,5}=[a-z0-9]{0,8}(&[a-z0-9]{1,5}=[a-z0-9]{0,8}){0,3})?"
        ).unwrap(),
    ) {
        let scanner = PatternScanner::new(ScanLimits::default()).expect("patterns compile");

        let url = if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        };
        let headers = vec![
            (
                "user-agent".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
            ),
            ("accept".to_string(), "application/json".to_string()),
            ("accept-language".to_string(), "en".to_string()),
        ];
        let view = ScanRequest::new(&url, &headers)
            .with_query_params(2)
            .with_body_bytes(256);

        prop_assert!(scanner.scan(&view).is_empty());
        prop_assert!(scanner.check_forwarding_headers(&view).is_none());
    }

    /// Property: production output is status-generic and detail-free,
    /// whatever text the failure held.
    #[test]
    fn proptest_production_output_is_independent_of_failure_text(
        text in prop::string::string_regex(".{0,60}").unwrap(),
    ) {
        let translator = ErrorTranslator::new(Environment::Production);
        let trace = RequestTrace::new("req-prop", "corr-prop");

        let record = translator.translate(&SecurityError::internal(text), &trace);

        prop_assert_eq!(record.status(), 500);
        prop_assert_eq!(record.body().error().message(), "Internal server error");
        prop_assert!(!record.body_json().contains("\"details\""));
    }

    /// Property: no environment emits markup-significant characters in a
    /// client-facing message.
    #[test]
    fn proptest_no_environment_emits_markup(
        text in prop::string::string_regex(".{0,60}").unwrap(),
    ) {
        for environment in [Environment::Development, Environment::Production] {
            let translator = ErrorTranslator::new(environment);
            let trace = RequestTrace::new("req-prop", "corr-prop");
            let record = translator.translate(&SecurityError::internal(text.clone()), &trace);

            for forbidden in ['<', '>', '"', '\'', '&'] {
                prop_assert!(
                    !record.body().error().message().contains(forbidden),
                    "{:?} leaked into {:?}",
                    forbidden,
                    record.body().error().message()
                );
            }
        }
    }

    /// Property: escalation never lowers severity and saturates at the top.
    #[test]
    fn proptest_escalation_is_monotone(
        severity in prop::sample::select(vec![
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]),
    ) {
        prop_assert!(severity.escalated() >= severity);
        prop_assert_eq!(severity.escalated().escalated().escalated(), Severity::Critical);
    }

    /// Property: a role set contains exactly the roles it was built from.
    #[test]
    fn proptest_role_sets_reflect_their_inputs(
        roles in prop::collection::vec(arb_role(), 0..6),
    ) {
        let set = RoleSet::new(&roles);
        for role in [Role::Admin, Role::Manager] {
            prop_assert_eq!(set.contains(role), roles.contains(&role));
        }
        prop_assert!(set.iter().count() <= 2);
    }

    /// Property: public-route admission is total and honors its contract
    /// for every principal shape and method.
    ///
    /// Anonymous callers pass; user credentials pass on safe methods and
    /// fail mutations (no CSRF proof was sent); admin credentials never
    /// open a user-facing route.
    #[test]
    fn proptest_public_admission_is_total_and_consistent(
        principal in prop::option::of(arb_principal()),
        method in prop::sample::select(vec!["GET", "HEAD", "POST", "PUT", "DELETE"]),
    ) {
        let pipeline = SecurityPipeline::new(
            SecurityConfig::default(),
            Arc::new(MemorySink::new()),
            Arc::new(StaticOwners::new()),
        )
        .expect("pipeline builds");

        let mut request = RequestAdapter::new(method, "/api/polls")
            .with_header("User-Agent", "Mozilla/5.0")
            .with_header("Accept", "application/json")
            .with_header("Accept-Language", "en");
        if let Some(principal) = &principal {
            let credential = pipeline.token_codec().issue(principal).expect("issues");
            request = request.with_header("Authorization", format!("Bearer {credential}"));
        }
        let safe = request.is_safe();

        match (&principal, pipeline.admit(&request, &RoutePolicy::public())) {
            (None, Admission::Granted { context, .. }) => {
                prop_assert!(context.principal().is_none());
            }
            (None, Admission::Denied(record)) => {
                return Err(TestCaseError::fail(format!(
                    "anonymous traffic denied: {}",
                    record.body_json()
                )));
            }
            (Some(p), admission) if p.is_admin() => {
                match admission {
                    Admission::Denied(record) => prop_assert_eq!(record.status(), 401),
                    Admission::Granted { .. } => {
                        return Err(TestCaseError::fail(
                            "admin credential passed a user-facing route",
                        ));
                    }
                }
            }
            (Some(p), Admission::Granted { context, .. }) => {
                prop_assert!(safe);
                prop_assert_eq!(
                    context.principal().map(|c| c.id().to_string()),
                    Some(p.id().to_string())
                );
            }
            (Some(_), Admission::Denied(record)) => {
                prop_assert!(!safe);
                prop_assert_eq!(record.status(), 403);
            }
        }
    }
}
