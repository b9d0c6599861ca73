//! HTTP boundary for the security pipeline.
//!
//! This module is the seam between host web frameworks and the guard
//! components. It handles:
//! - Mapping framework requests into the owned [`RequestAdapter`]
//! - Declaring per-route security posture with [`RoutePolicy`]
//! - Running the admission chain via [`SecurityPipeline`]
//! - Rendering the CSRF `Set-Cookie` header and trace echo headers
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: nothing here imports a web framework.
//!    Host glue converts its native request type into `RequestAdapter` and
//!    applies the returned headers and status itself.
//!
//! 2. **One Entry Point**: every request goes through
//!    [`SecurityPipeline::admit`]; there is no way to reach a handler with
//!    a partially checked request.
//!
//! 3. **Explicit Context**: admission yields a [`SecurityContext`] value
//!    that handlers take as an argument. No globals, no ambient state.
//!
//! # Integration Model
//!
//! Framework-specific glue should:
//! 1. Build a `RequestAdapter` from the native request
//! 2. Look up the matched route's `RoutePolicy`
//! 3. Call `pipeline.admit(&request, &policy)`
//! 4. On `Admission::Denied`, answer with the record's status and body
//! 5. On `Admission::Granted`, set the CSRF cookie and trace headers, then
//!    call the handler with the `SecurityContext`
//!
//! # Example Flow
//!
//! ```ignore
//! // In host glue (axum, actix, ...):
//! let request = RequestAdapter::new(method, path)
//!     .with_query(raw_query)
//!     .with_header("authorization", auth_header)
//!     .with_peer_addr(peer);
//!
//! match pipeline.admit(&request, &route.policy) {
//!     Admission::Denied(record) => respond(record.status(), record.body_json()),
//!     Admission::Granted { context, csrf_cookie } => {
//!         let mut response = handler(context)?;
//!         if let Some(cookie) = csrf_cookie {
//!             response.header("Set-Cookie", cookie.header_value());
//!             response.header(CSRF_ECHO_HEADER, cookie.value());
//!         }
//!         response
//!     }
//! }
//! ```

mod adapter;
mod cookie;
mod pipeline;
mod route;

pub use adapter::RequestAdapter;
pub use cookie::{SetCookie, CSRF_ECHO_HEADER};
pub use pipeline::{Admission, PipelineBuildError, SecurityContext, SecurityPipeline};
pub use route::{AuthPolicy, CsrfPolicy, RoutePolicy};
