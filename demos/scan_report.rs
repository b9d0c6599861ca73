//! Anomaly scanner demonstration.
//!
//! This example sends a handful of hostile requests through the pipeline
//! with the tracing sink attached, then runs the scanner directly to print
//! a detection report:
//! 1. Hostile traffic is admitted anyway; detection never blocks
//! 2. Every finding reaches the sink as a structured log line
//! 3. Stacked signature families escalate severity
//!
//! Run with: `cargo run --example scan_report`

use std::sync::Arc;

use guard_core::web::{RequestAdapter, RoutePolicy, SecurityPipeline};
use guard_core::{PatternScanner, ScanLimits, SecurityConfig, StaticOwners, TracingSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Route security events to stdout as structured log lines.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Anomaly Scan Report ===\n");

    let pipeline = SecurityPipeline::new(
        SecurityConfig::default(),
        Arc::new(TracingSink::new()),
        Arc::new(StaticOwners::new()),
    )?;

    let probes = vec![
        (
            "sql probe",
            RequestAdapter::new("GET", "/api/polls").with_query("q=' OR 1=1--"),
        ),
        (
            "script injection",
            RequestAdapter::new("GET", "/api/search")
                .with_query("term=<script>alert(1)</script>"),
        ),
        (
            "path traversal",
            RequestAdapter::new("GET", "/api/files").with_query("p=../../etc/passwd"),
        ),
        (
            "forwarding stuffing",
            RequestAdapter::new("GET", "/api/polls")
                .with_header("X-Forwarded-For", "203.0.113.9")
                .with_header("X-Real-IP", "198.51.100.2")
                .with_header("True-Client-IP", "192.0.2.6"),
        ),
        (
            "automation client",
            RequestAdapter::new("GET", "/api/polls").with_header("User-Agent", "curl/8.5.0"),
        ),
    ];

    // Scenario 1: everything is admitted; the sink hears about all of it.
    println!("--- Scenario 1: Admission under observation ---");
    for (label, request) in &probes {
        let admission = pipeline.admit(request, &RoutePolicy::public());
        println!("{label}: admitted = {}", admission.is_granted());
    }

    // Scenario 2: the same requests, scanned directly.
    println!("\n--- Scenario 2: Direct scanner report ---");
    let scanner = PatternScanner::new(ScanLimits::default())?;
    for (label, request) in &probes {
        let view = request.scan_view();
        let mut findings = scanner.scan(&view);
        if let Some(stacked) = scanner.check_forwarding_headers(&view) {
            findings.push(stacked);
        }

        println!("{label}:");
        if findings.is_empty() {
            println!("  (nothing flagged)");
        }
        for finding in findings {
            println!(
                "  [{}] {}: {}",
                finding.severity(),
                finding.kind(),
                finding.summary()
            );
        }
    }

    println!("\n=== Key Takeaways ===");
    println!("1. Detection is observational: every probe above was admitted");
    println!("2. One detection per signature family; stacked families escalate");
    println!("3. TracingSink turns events into log lines operators can route");

    Ok(())
}
