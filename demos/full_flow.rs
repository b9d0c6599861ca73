//! Complete request security flow demonstration.
//!
//! This example walks one voter session through the full admission chain:
//! 1. Build the pipeline from configuration
//! 2. Issue a bearer credential at login
//! 3. Load a page and pick up the CSRF cookie
//! 4. Submit a mutation with the double-submit proof
//! 5. Watch the denials when pieces are missing
//!
//! Run with: `cargo run --example full_flow`

use std::sync::Arc;

use guard_core::web::{Admission, RequestAdapter, RoutePolicy, SecurityPipeline, CSRF_ECHO_HEADER};
use guard_core::{MemorySink, Principal, Role, RoleSet, SecurityConfig, StaticOwners};

/// A request with the headers an ordinary browser sends.
fn browser(method: &str, path: &str) -> RequestAdapter {
    RequestAdapter::new(method, path)
        .with_header("User-Agent", "Mozilla/5.0 (X11; Linux x86_64)")
        .with_header("Accept", "application/json")
        .with_header("Accept-Language", "en-US")
        .with_peer_addr("203.0.113.9")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Full Request Security Flow ===");

    // One pipeline per process, shared across requests.
    let sink = Arc::new(MemorySink::new());
    let pipeline = SecurityPipeline::new(
        SecurityConfig::default(),
        sink.clone(),
        Arc::new(StaticOwners::new().with_owner("reg-55", "voter-42")),
    )?;
    let route = RoutePolicy::user().owned_by("id");

    // Scenario 1: login, page load, mutation.
    println!("\n--- Scenario 1: The happy path ---");

    let credential = pipeline.token_codec().issue(&Principal::user("voter-42"))?;
    println!("1. Issued credential ({} bytes)", credential.len());

    let page = browser("GET", "/api/registrations/reg-55")
        .with_path_param("id", "reg-55")
        .with_header("Authorization", format!("Bearer {credential}"));
    let csrf = match pipeline.admit(&page, &route) {
        Admission::Granted { csrf_cookie, .. } => {
            let cookie = csrf_cookie.expect("safe method issues a cookie");
            // The host sets both: the HttpOnly cookie, and the readable
            // echo header browser code stores for later mutations.
            println!("2. ✓ Page served; Set-Cookie: {}", cookie.header_value());
            println!("   {}: {}", CSRF_ECHO_HEADER, cookie.value());
            cookie.value().to_string()
        }
        Admission::Denied(record) => {
            println!("2. ✗ Unexpected denial: {}", record.body_json());
            return Ok(());
        }
    };

    let mutation = browser("PUT", "/api/registrations/reg-55")
        .with_path_param("id", "reg-55")
        .with_header("Authorization", format!("Bearer {credential}"))
        .with_header("Cookie", format!("csrf-token={csrf}"))
        .with_header(CSRF_ECHO_HEADER, csrf);
    match pipeline.admit(&mutation, &route) {
        Admission::Granted { context, .. } => {
            let who = context.principal().map(Principal::id).unwrap_or("nobody");
            println!("3. ✓ Mutation admitted for {who}");
        }
        Admission::Denied(record) => println!("3. ✗ Denied: {}", record.body_json()),
    }

    // Scenario 2: the same mutation without the double-submit proof.
    println!("\n--- Scenario 2: Mutation without CSRF proof ---");
    let bare = browser("PUT", "/api/registrations/reg-55")
        .with_path_param("id", "reg-55")
        .with_header("Authorization", format!("Bearer {credential}"));
    if let Admission::Denied(record) = pipeline.admit(&bare, &route) {
        println!("✓ Denied with {}: {}", record.status(), record.body_json());
    }

    // Scenario 3: a different voter reaching for someone else's record.
    println!("\n--- Scenario 3: Foreign registration ---");
    let stranger = pipeline.token_codec().issue(&Principal::user("voter-7"))?;
    let foreign = browser("GET", "/api/registrations/reg-55")
        .with_path_param("id", "reg-55")
        .with_header("Authorization", format!("Bearer {stranger}"));
    if let Admission::Denied(record) = pipeline.admit(&foreign, &route) {
        println!("✓ Denied with {}: {}", record.status(), record.body_json());
    }

    // Scenario 4: role gates on the back office.
    println!("\n--- Scenario 4: Admin routes ---");
    let manager = pipeline
        .token_codec()
        .issue(&Principal::admin("staff-1", Role::Manager))?;

    let settings = browser("GET", "/api/admin/settings")
        .with_header("Authorization", format!("Bearer {manager}"));
    if let Admission::Denied(record) =
        pipeline.admit(&settings, &RoutePolicy::admin(RoleSet::admin_only()))
    {
        println!("✓ Manager refused admin-only route: {}", record.body_json());
    }

    let stats = browser("GET", "/api/admin/stats")
        .with_header("Authorization", format!("Bearer {manager}"));
    if let Admission::Granted { context, .. } =
        pipeline.admit(&stats, &RoutePolicy::admin(RoleSet::any_admin()))
    {
        let who = context.principal().map(Principal::id).unwrap_or("nobody");
        println!("✓ Manager admitted to the wider route as {who}");
    }

    // Everything the denials mirrored into the audit sink.
    println!("\n=== Audit Trail ===");
    for event in sink.events() {
        println!("  {event}");
    }

    println!("\n=== Key Takeaways ===");
    println!("1. One pipeline serves every request; the route policy decides the posture");
    println!("2. Safe methods receive CSRF tokens, mutations must prove them");
    println!("3. Denials carry stable codes; the audit sink keeps the specifics");

    Ok(())
}
