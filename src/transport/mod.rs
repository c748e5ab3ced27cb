//! Blocking HTTP transport layers.
//!
//! * `UreqBlocking` is the default transport; it keeps a cookie store so the
//!   `JSESSIONID` a crumb is bound to persists across requests.
//! * Middleware (see [`middleware`]) wraps any [`blocking_transport::BlockingTransport`].

pub mod blocking_transport;
#[cfg(feature = "metrics")]
pub(crate) mod metrics;
pub mod middleware;
pub mod request;

use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use url::Url;

/// A fully resolved request handed to a transport.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    /// Encoded as `application/x-www-form-urlencoded` when non-empty.
    pub form: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Raw response returned by a transport; the status is not interpreted here.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}
