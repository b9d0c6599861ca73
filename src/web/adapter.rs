//! Framework-agnostic request representation.

use std::collections::HashMap;

use crate::scanner::ScanRequest;
use crate::trace::{RequestTrace, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};

/// Methods whose requests change state and therefore need CSRF proof.
const STATE_CHANGING_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

/// Owned, framework-agnostic snapshot of one incoming HTTP request.
///
/// `RequestAdapter` is the integration point between host frameworks and
/// the security pipeline. Host glue converts its native request type into
/// this one; everything downstream (scanner, guards, translator) reads
/// only from here.
///
/// # Design Notes
///
/// The adapter holds simple owned data so it never couples to a specific
/// framework's request types. Header names are lowercased on insertion and
/// looked up case-insensitively; values and the URL are kept exactly as
/// received, since the scanner wants to see raw bytes, encodings and all.
///
/// # Examples
///
/// ```
/// use guard_core::web::RequestAdapter;
///
/// let request = RequestAdapter::new("POST", "/api/polls")
///     .with_query("page=2")
///     .with_header("Authorization", "Bearer abc.def.ghi")
///     .with_header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
///     .with_peer_addr("10.0.0.1");
///
/// assert!(request.is_state_changing());
/// assert_eq!(request.bearer_credential(), Some("abc.def.ghi"));
/// assert_eq!(request.client_ip(), Some("203.0.113.9".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    method: String,
    path: String,
    query: String,
    /// Path plus raw query, exactly as a server would log it.
    url: String,
    query_params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    body_len: usize,
    peer_addr: Option<String>,
}

impl RequestAdapter {
    /// Creates an adapter for a method and path, with no query, headers,
    /// or body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: method.into(),
            url: path.clone(),
            path,
            query: String::new(),
            query_params: Vec::new(),
            headers: Vec::new(),
            path_params: HashMap::new(),
            body_len: 0,
            peer_addr: None,
        }
    }

    /// Attaches the raw query string (no leading `?`).
    ///
    /// The string is kept verbatim for scanning and also split into
    /// key/value pairs, so parameter counts and lookups agree with what
    /// was actually sent.
    pub fn with_query(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.query_params = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (part.to_string(), String::new()),
            })
            .collect();
        self.url = if raw.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, raw)
        };
        self.query = raw;
        self
    }

    /// Adds one header. Names are lowercased; values kept as received.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// Adds one path parameter resolved by the host's router.
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Sets the request body length in bytes.
    pub fn with_body_len(mut self, len: usize) -> Self {
        self.body_len = len;
        self
    }

    /// Sets the transport-level peer address.
    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    /// The request method as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path without query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, empty when absent.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Path plus query, exactly as received.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The parsed query parameters in wire order.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// All headers, names lowercased, in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let wanted = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == wanted)
            .map(|(_, value)| value.as_str())
    }

    /// A path parameter resolved by the router.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Body length in bytes.
    pub fn body_len(&self) -> usize {
        self.body_len
    }

    /// The transport peer address, if the host provided one.
    pub fn peer_addr(&self) -> Option<&str> {
        self.peer_addr.as_deref()
    }

    /// One cookie's value, parsed from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
    }

    /// The bearer credential from the `authorization` header, if the
    /// header is present and uses the bearer scheme.
    pub fn bearer_credential(&self) -> Option<&str> {
        let value = self.header("authorization")?;
        let (scheme, rest) = value.split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") {
            let credential = rest.trim();
            (!credential.is_empty()).then_some(credential)
        } else {
            None
        }
    }

    /// The client address: first `x-forwarded-for` entry when present,
    /// else the peer address.
    pub fn client_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Some(first.to_string());
                }
            }
        }
        self.peer_addr.clone()
    }

    /// Whether this method changes state (POST, PUT, PATCH, DELETE).
    pub fn is_state_changing(&self) -> bool {
        STATE_CHANGING_METHODS
            .iter()
            .any(|m| self.method.eq_ignore_ascii_case(m))
    }

    /// Whether this method is safe (everything non-state-changing).
    pub fn is_safe(&self) -> bool {
        !self.is_state_changing()
    }

    /// The request's trace identity: echoes `X-Request-ID` and
    /// `X-Correlation-ID` when the client sent them, generates fresh ids
    /// otherwise.
    pub fn trace(&self) -> RequestTrace {
        RequestTrace::from_headers(
            self.header(REQUEST_ID_HEADER),
            self.header(CORRELATION_ID_HEADER),
        )
    }

    /// The scanner's borrowed view of this request.
    pub fn scan_view(&self) -> ScanRequest<'_> {
        ScanRequest::new(&self.url, &self.headers)
            .with_query_params(self.query_params.len())
            .with_body_bytes(self.body_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_path_and_raw_query() {
        let bare = RequestAdapter::new("GET", "/api/polls");
        assert_eq!(bare.url(), "/api/polls");

        let with_query = RequestAdapter::new("GET", "/api/polls").with_query("page=2&sort=name");
        assert_eq!(with_query.url(), "/api/polls?page=2&sort=name");
        assert_eq!(with_query.query_params().len(), 2);
    }

    #[test]
    fn query_parsing_keeps_valueless_keys() {
        let request = RequestAdapter::new("GET", "/x").with_query("flag&key=value");
        assert_eq!(
            request.query_params(),
            &[
                ("flag".to_string(), String::new()),
                ("key".to_string(), "value".to_string()),
            ]
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = RequestAdapter::new("GET", "/").with_header("X-CSRF-Token", "abc");
        assert_eq!(request.header("x-csrf-token"), Some("abc"));
        assert_eq!(request.header("X-Csrf-Token"), Some("abc"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn cookie_header_is_parsed_on_demand() {
        let request = RequestAdapter::new("GET", "/")
            .with_header("Cookie", "session=s1; csrf-token=deadbeef; theme=dark");
        assert_eq!(request.cookie("csrf-token"), Some("deadbeef"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.cookie("absent"), None);
    }

    #[test]
    fn bearer_credential_requires_the_bearer_scheme() {
        let bearer = RequestAdapter::new("GET", "/").with_header("Authorization", "Bearer tok-1");
        assert_eq!(bearer.bearer_credential(), Some("tok-1"));

        let lower = RequestAdapter::new("GET", "/").with_header("authorization", "bearer tok-2");
        assert_eq!(lower.bearer_credential(), Some("tok-2"));

        let basic = RequestAdapter::new("GET", "/").with_header("Authorization", "Basic dXNlcg==");
        assert_eq!(basic.bearer_credential(), None);

        let empty = RequestAdapter::new("GET", "/").with_header("Authorization", "Bearer ");
        assert_eq!(empty.bearer_credential(), None);

        assert_eq!(RequestAdapter::new("GET", "/").bearer_credential(), None);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let forwarded = RequestAdapter::new("GET", "/")
            .with_header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .with_peer_addr("10.0.0.1");
        assert_eq!(forwarded.client_ip(), Some("203.0.113.9".to_string()));

        let direct = RequestAdapter::new("GET", "/").with_peer_addr("192.0.2.4");
        assert_eq!(direct.client_ip(), Some("192.0.2.4".to_string()));

        assert_eq!(RequestAdapter::new("GET", "/").client_ip(), None);
    }

    #[test]
    fn state_changing_methods_are_exactly_the_written_four() {
        for method in ["POST", "PUT", "PATCH", "DELETE", "post", "Patch"] {
            assert!(RequestAdapter::new(method, "/").is_state_changing());
        }
        for method in ["GET", "HEAD", "OPTIONS"] {
            let request = RequestAdapter::new(method, "/");
            assert!(request.is_safe());
            assert!(!request.is_state_changing());
        }
    }

    #[test]
    fn trace_echoes_client_ids_and_generates_missing_ones() {
        let echoed = RequestAdapter::new("GET", "/")
            .with_header("X-Request-ID", "req-7")
            .with_header("X-Correlation-ID", "corr-7");
        let trace = echoed.trace();
        assert_eq!(trace.request_id(), "req-7");
        assert_eq!(trace.correlation_id(), "corr-7");

        let generated = RequestAdapter::new("GET", "/").trace();
        assert!(!generated.request_id().is_empty());
        assert!(!generated.correlation_id().is_empty());
    }

    #[test]
    fn scan_view_carries_url_counts_and_body_size() {
        let request = RequestAdapter::new("POST", "/api/polls")
            .with_query("a=1&b=2&c=3")
            .with_body_len(512);
        let view = request.scan_view();
        // The view is exercised through the scanner; here we only check it
        // can be built while the adapter is still borrowed.
        let _ = view;
        assert_eq!(request.body_len(), 512);
    }
}
