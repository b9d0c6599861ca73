//! Double-submit CSRF protection demonstration.
//!
//! This example shows the guard on its own and inside the pipeline:
//! 1. Issue a token and verify an honest echo
//! 2. Walk every rung of the rejection ladder
//! 3. Tamper with the echo and watch the attack event it produces
//!
//! Run with: `cargo run --example double_submit`

use std::sync::Arc;
use std::time::Duration;

use guard_core::web::{Admission, RequestAdapter, RoutePolicy, SecurityPipeline, CSRF_ECHO_HEADER};
use guard_core::{CsrfGuard, MemorySink, Principal, SecurityConfig, StaticOwners};

fn main() {
    println!("=== Double-Submit CSRF Example ===");

    let guard = CsrfGuard::new(32, Duration::from_secs(24 * 60 * 60));

    // Scenario 1: the honest browser echoes the cookie into the header.
    println!("\n--- Scenario 1: Honest echo ---");
    let issued = guard.issue();
    println!("Issued token: {}…", &issued.value()[..16]);
    match guard.verify(Some(issued.value()), Some(issued.value())) {
        Ok(()) => println!("✓ Cookie and header agree"),
        Err(e) => println!("✗ Unexpected: {e}"),
    }

    // Scenario 2: every rung of the ladder, in evaluation order.
    println!("\n--- Scenario 2: The rejection ladder ---");
    let token = issued.value();
    let other = guard.issue();
    let cases: [(&str, Option<&str>, Option<&str>); 4] = [
        ("absent cookie", None, Some(token)),
        ("absent header", Some(token), None),
        ("malformed value", Some("not-hex"), Some("not-hex")),
        ("honest-looking forgery", Some(token), Some(other.value())),
    ];
    for (label, cookie, header) in cases {
        match guard.verify(cookie, header) {
            Ok(()) => println!("  {label}: unexpectedly accepted"),
            Err(e) => println!("  {label}: ✗ {e}"),
        }
    }

    // Scenario 3: the same forgery through the pipeline.
    println!("\n--- Scenario 3: A tampered echo through the pipeline ---");
    let sink = Arc::new(MemorySink::new());
    let pipeline = SecurityPipeline::new(
        SecurityConfig::default(),
        sink.clone(),
        Arc::new(StaticOwners::new()),
    )
    .expect("pipeline builds");
    let credential = pipeline
        .token_codec()
        .issue(&Principal::user("voter-9"))
        .expect("credential issues");

    let page = RequestAdapter::new("GET", "/api/registrations")
        .with_header("User-Agent", "Mozilla/5.0")
        .with_header("Accept", "application/json")
        .with_header("Authorization", format!("Bearer {credential}"));
    let cookie_value = match pipeline.admit(&page, &RoutePolicy::user()) {
        Admission::Granted { csrf_cookie, .. } => {
            csrf_cookie.expect("issued").value().to_string()
        }
        Admission::Denied(record) => {
            println!("page denied: {}", record.body_json());
            return;
        }
    };

    // One flipped hex digit is all it takes.
    let mut tampered: Vec<char> = cookie_value.chars().collect();
    tampered[0] = if tampered[0] == '0' { '1' } else { '0' };
    let tampered: String = tampered.into_iter().collect();

    let forged = RequestAdapter::new("POST", "/api/registrations")
        .with_header("User-Agent", "Mozilla/5.0")
        .with_header("Accept", "application/json")
        .with_header("Authorization", format!("Bearer {credential}"))
        .with_header("Cookie", format!("csrf-token={cookie_value}"))
        .with_header(CSRF_ECHO_HEADER, tampered)
        .with_peer_addr("198.51.100.7");
    if let Admission::Denied(record) = pipeline.admit(&forged, &RoutePolicy::user()) {
        println!(
            "Client sees {}: {}",
            record.status(),
            record.body().error().message()
        );
    }
    for event in sink.events() {
        println!("Audit: {event}");
    }

    println!("\n=== Key Takeaways ===");
    println!("1. Proof requires the cookie AND its header echo, well formed and equal");
    println!("2. Missing or malformed material is benign noise; a mismatch is an attack");
    println!("3. Comparison is constant time, so near-misses reveal nothing");
}
