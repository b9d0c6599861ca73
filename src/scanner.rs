//! Request anomaly detection over URLs and headers.
//!
//! The scanner matches five families of injection patterns (SQL, script,
//! path traversal, embed tags, code evaluation) against the request URL and
//! every header value, and applies a handful of cheap heuristics: missing
//! or automation-like user agents, absent browser accept headers, query
//! parameter and body size ceilings, and stacks of IP-forwarding headers.
//!
//! Detection is purely observational. The scanner reports what it saw and
//! the caller decides what to do with the report; by itself it never blocks
//! a request, so a false positive costs an audit record rather than an
//! outage.

use regex_lite::Regex;

use crate::audit::{SecurityEventKind, Severity};

/// A threat pattern failed to compile.
///
/// Patterns are fixed at build time, so seeing this means the pattern table
/// itself is broken rather than anything request dependent.
#[derive(Debug, thiserror::Error)]
#[error("threat pattern failed to compile: {0}")]
pub struct PatternError(#[from] regex_lite::Error);

/// Size ceilings applied by the scanner's heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    max_query_params: usize,
    max_body_bytes: usize,
}

impl ScanLimits {
    /// Creates limits from a query parameter cap and a body byte ceiling.
    pub fn new(max_query_params: usize, max_body_bytes: usize) -> Self {
        Self {
            max_query_params,
            max_body_bytes,
        }
    }

    /// Maximum query parameter count before a request is flagged.
    pub fn max_query_params(&self) -> usize {
        self.max_query_params
    }

    /// Maximum body size in bytes before a request is flagged.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_query_params: 50,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Borrowed view of the request parts the scanner inspects.
///
/// The boundary layer builds one of these from its request representation;
/// the scanner itself has no opinion about transports.
#[derive(Debug, Clone)]
pub struct ScanRequest<'a> {
    url: &'a str,
    headers: &'a [(String, String)],
    query_param_count: usize,
    body_bytes: usize,
}

impl<'a> ScanRequest<'a> {
    /// Creates a view over a request URL (path plus query, as received)
    /// and its header list.
    pub fn new(url: &'a str, headers: &'a [(String, String)]) -> Self {
        Self {
            url,
            headers,
            query_param_count: 0,
            body_bytes: 0,
        }
    }

    /// Sets the number of query parameters the request carries.
    pub fn with_query_params(mut self, count: usize) -> Self {
        self.query_param_count = count;
        self
    }

    /// Sets the request body size in bytes.
    pub fn with_body_bytes(mut self, bytes: usize) -> Self {
        self.body_bytes = bytes;
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// One thing the scanner noticed about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    kind: SecurityEventKind,
    severity: Severity,
    summary: String,
}

impl Detection {
    /// The event kind this detection maps to.
    pub fn kind(&self) -> SecurityEventKind {
        self.kind
    }

    /// Severity after any escalation.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Human-readable account of what matched and where.
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

struct Family {
    kind: SecurityEventKind,
    label: &'static str,
    patterns: Vec<Regex>,
}

impl std::fmt::Debug for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Family")
            .field("kind", &self.kind)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// Pattern table: one entry per threat family.
///
/// Patterns favour recall over precision. A hit never blocks anything, so
/// the cost of a loose pattern is a spurious audit record.
const FAMILY_TABLE: &[(SecurityEventKind, &str, &[&str])] = &[
    (
        SecurityEventKind::SqlInjectionAttempt,
        "sql injection",
        &[
            r"(?i)'\s*(or|and)\s+.*=",
            r"(?i)\b(union\s+select|select\s+.+\s+from|insert\s+into|delete\s+from|drop\s+table|update\s+\w+\s+set)\b",
            r"(?i);\s*(select|insert|update|delete|drop)\b",
            r"--",
            // Paired form only: a bare /* would flag every "Accept: */*".
            r"/\*.*\*/",
        ],
    ),
    (
        SecurityEventKind::ScriptInjectionAttempt,
        "script injection",
        &[
            r"(?i)<\s*script",
            r"(?i)javascript\s*:",
            r"(?i)vbscript\s*:",
            r"(?i)\bon(load|error|click|mouseover|focus|submit)\s*=",
            r"(?i)expression\s*\(",
        ],
    ),
    (
        SecurityEventKind::PathTraversalAttempt,
        "path traversal",
        &[r"\.\./", r"\.\.\\", r"(?i)(%2e%2e|\.\.)(%2f|%5c)"],
    ),
    (
        SecurityEventKind::EmbedTagInjection,
        "embed tag",
        &[r"(?i)<\s*(iframe|object|embed|applet|form)\b"],
    ),
    (
        SecurityEventKind::CodeEvaluationAttempt,
        "code evaluation",
        &[
            r"(?i)\beval\s*\(",
            r"(?i)\bnew\s+function\s*\(",
            r"(?i)\b(settimeout|setinterval)\s*\(",
            r"(?i)\b(system|exec|shell_exec|passthru)\s*\(",
        ],
    ),
];

/// Headers that claim to carry the client's real address.
///
/// Legitimate proxy chains add one or two of these. A request stacking more
/// is usually trying to confuse IP-keyed rate limiting.
const FORWARDING_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-real-ip",
    "x-client-ip",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
    "x-cluster-client-ip",
    "x-forwarded-host",
    "true-client-ip",
    "cf-connecting-ip",
    "x-originating-ip",
    "via",
];

/// User agent fragments belonging to well-known automation tools.
const AUTOMATION_FRAGMENTS: &[&str] = &[
    "curl",
    "wget",
    "python-requests",
    "scrapy",
    "go-http-client",
    "libwww",
    "bot",
    "crawler",
    "spider",
];

/// Headers carrying opaque credential material, skipped by signature
/// matching. Dedicated verifiers already check these byte for byte, and
/// base64-style encodings alias the comment and traversal signatures.
const CREDENTIAL_HEADERS: &[&str] = &["authorization", "cookie", "proxy-authorization"];

const FAMILY_BASE_SEVERITY: Severity = Severity::Medium;

/// Compiled anomaly scanner.
///
/// Construction compiles the whole pattern table once; scanning is
/// allocation-light and runs on every request, so the scanner is built a
/// single time and shared.
///
/// # Examples
///
/// ```
/// use guard_core::{ScanLimits, ScanRequest, PatternScanner};
///
/// let scanner = PatternScanner::new(ScanLimits::default()).unwrap();
/// let headers = vec![
///     ("user-agent".to_string(), "Mozilla/5.0".to_string()),
///     ("accept".to_string(), "application/json".to_string()),
///     ("accept-language".to_string(), "en-US".to_string()),
/// ];
///
/// let clean = ScanRequest::new("/api/polls?page=2", &headers);
/// assert!(scanner.scan(&clean).is_empty());
/// ```
#[derive(Debug)]
pub struct PatternScanner {
    families: Vec<Family>,
    limits: ScanLimits,
}

impl PatternScanner {
    /// Compiles the pattern table with the given heuristic limits.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if any pattern in the table fails to
    /// compile.
    pub fn new(limits: ScanLimits) -> Result<Self, PatternError> {
        let mut families = Vec::with_capacity(FAMILY_TABLE.len());
        for (kind, label, sources) in FAMILY_TABLE {
            let mut patterns = Vec::with_capacity(sources.len());
            for source in *sources {
                patterns.push(Regex::new(source)?);
            }
            families.push(Family {
                kind: *kind,
                label,
                patterns,
            });
        }
        Ok(Self { families, limits })
    }

    /// Scans one request against the pattern families and heuristics.
    ///
    /// Each threat family contributes at most one detection no matter how
    /// many of its patterns match or on how many surfaces. When two or more
    /// families match the same request, every family detection is escalated
    /// one severity level. Heuristic detections keep their own severity.
    ///
    /// Signature matching covers the URL and every header value except the
    /// credential headers (`Authorization`, `Cookie`), whose opaque
    /// encodings are verified elsewhere and would only produce noise here.
    ///
    /// Forwarding-header stacking is a separate check; see
    /// [`check_forwarding_headers`](Self::check_forwarding_headers).
    pub fn scan(&self, request: &ScanRequest<'_>) -> Vec<Detection> {
        let mut detections = Vec::new();

        let hits: Vec<(&Family, &str)> = self
            .families
            .iter()
            .filter_map(|family| self.match_surface(family, request).map(|s| (family, s)))
            .collect();
        let escalate = hits.len() >= 2;
        for (family, surface) in hits {
            let severity = if escalate {
                FAMILY_BASE_SEVERITY.escalated()
            } else {
                FAMILY_BASE_SEVERITY
            };
            detections.push(Detection {
                kind: family.kind,
                severity,
                summary: format!("{} pattern in {}", family.label, surface),
            });
        }

        self.check_user_agent(request, &mut detections);
        self.check_accept_headers(request, &mut detections);
        self.check_limits(request, &mut detections);

        detections
    }

    /// Flags requests stacking more than two distinct forwarding headers.
    ///
    /// Kept apart from [`scan`](Self::scan) so callers that trust their
    /// proxy chain can skip it without losing the injection families.
    pub fn check_forwarding_headers(&self, request: &ScanRequest<'_>) -> Option<Detection> {
        let present: Vec<&str> = FORWARDING_HEADERS
            .iter()
            .copied()
            .filter(|name| request.has_header(name))
            .collect();
        if present.len() > 2 {
            Some(Detection {
                kind: SecurityEventKind::RateLimitBypassAttempt,
                severity: Severity::High,
                summary: format!(
                    "{} distinct forwarding headers present ({})",
                    present.len(),
                    present.join(", ")
                ),
            })
        } else {
            None
        }
    }

    /// Where a family first matched: the URL, or the name of a header.
    fn match_surface<'r>(&self, family: &Family, request: &'r ScanRequest<'_>) -> Option<&'r str> {
        if family.patterns.iter().any(|p| p.is_match(request.url)) {
            return Some("url");
        }
        request
            .headers
            .iter()
            .filter(|(name, _)| {
                !CREDENTIAL_HEADERS
                    .iter()
                    .any(|skip| name.eq_ignore_ascii_case(skip))
            })
            .find(|(_, value)| family.patterns.iter().any(|p| p.is_match(value)))
            .map(|(name, _)| name.as_str())
    }

    fn check_user_agent(&self, request: &ScanRequest<'_>, out: &mut Vec<Detection>) {
        match request.header("user-agent") {
            None => out.push(Detection {
                kind: SecurityEventKind::SuspiciousUserAgent,
                severity: Severity::Low,
                summary: "user agent header is absent".to_string(),
            }),
            Some(agent) if agent.trim().is_empty() => out.push(Detection {
                kind: SecurityEventKind::SuspiciousUserAgent,
                severity: Severity::Low,
                summary: "user agent header is empty".to_string(),
            }),
            Some(agent) => {
                let lowered = agent.to_ascii_lowercase();
                if let Some(fragment) = AUTOMATION_FRAGMENTS
                    .iter()
                    .find(|f| lowered.contains(*f))
                {
                    out.push(Detection {
                        kind: SecurityEventKind::SuspiciousUserAgent,
                        severity: Severity::Low,
                        summary: format!("user agent looks automated ({fragment})"),
                    });
                }
            }
        }
    }

    fn check_accept_headers(&self, request: &ScanRequest<'_>, out: &mut Vec<Detection>) {
        if !request.has_header("accept") && !request.has_header("accept-language") {
            out.push(Detection {
                kind: SecurityEventKind::MissingAcceptHeaders,
                severity: Severity::Low,
                summary: "accept and accept-language are both absent".to_string(),
            });
        }
    }

    fn check_limits(&self, request: &ScanRequest<'_>, out: &mut Vec<Detection>) {
        if request.query_param_count > self.limits.max_query_params {
            out.push(Detection {
                kind: SecurityEventKind::ExcessiveQueryParams,
                severity: Severity::Medium,
                summary: format!(
                    "{} query parameters exceeds the cap of {}",
                    request.query_param_count, self.limits.max_query_params
                ),
            });
        }
        if request.body_bytes > self.limits.max_body_bytes {
            out.push(Detection {
                kind: SecurityEventKind::OversizedBody,
                severity: Severity::Medium,
                summary: format!(
                    "{} byte body exceeds the ceiling of {}",
                    request.body_bytes, self.limits.max_body_bytes
                ),
            });
        }
    }
}
