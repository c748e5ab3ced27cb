//! Blocking CSRF-Crumb middleware.
//!
//! The crumb is fetched at most once per client. Fetching is best-effort: a
//! server without CSRF protection (or one that refuses the issuer call) simply
//! yields no header, and mutating requests go out without it.

use crate::{
    Auth, Error,
    transport::{TransportRequest, TransportResponse, blocking_transport::BlockingTransport},
    util::url::endpoint_url,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Deserialize;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use url::Url;

#[derive(Deserialize)]
struct CrumbResp {
    #[serde(rename = "crumbRequestField")]
    field: Option<String>,
    crumb: Option<String>,
}

/// The CSRF header a mutating request must carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrumbHeader {
    pub name: HeaderName,
    pub value: HeaderValue,
}

#[derive(Clone, Debug)]
enum CrumbState {
    Unresolved,
    Resolved(Option<CrumbHeader>),
}

/// Blocking wrapper that injects a crumb header into non-GET requests.
#[derive(Clone)]
pub struct CrumbBlocking<T> {
    inner: T,
    base_url: Url,
    auth: Option<Auth>,
    fetch_timeout: Duration,
    state: Arc<Mutex<CrumbState>>,
}

impl<T: BlockingTransport> CrumbBlocking<T> {
    pub fn new(
        inner: T,
        base_url: Url,
        auth: Option<Auth>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            base_url,
            auth,
            fetch_timeout,
            state: Arc::new(Mutex::new(CrumbState::Unresolved)),
        }
    }

    /// Resolve the crumb if that has not happened yet and return it.
    pub fn resolve(&self) -> Option<CrumbHeader> {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let CrumbState::Resolved(header) = &*guard {
            return header.clone();
        }
        let header = self.fetch_crumb();
        *guard = CrumbState::Resolved(header.clone());
        header
    }

    fn fetch_crumb(&self) -> Option<CrumbHeader> {
        let resp = match self.request_crumb() {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(error = %err, "crumb issuer request failed; continuing without crumb");
                return None;
            }
        };

        if !resp.status.is_success() {
            tracing::debug!(
                status = resp.status.as_u16(),
                "crumb issuer unavailable; continuing without crumb"
            );
            return None;
        }

        let parsed: CrumbResp = match serde_json::from_slice(&resp.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "crumb issuer returned an unreadable body");
                return None;
            }
        };
        let (Some(field), Some(crumb)) = (parsed.field, parsed.crumb) else {
            return None;
        };

        match (
            HeaderName::from_bytes(field.as_bytes()),
            HeaderValue::from_str(&crumb),
        ) {
            (Ok(name), Ok(value)) => {
                tracing::debug!(header = %name, "crumb resolved");
                Some(CrumbHeader { name, value })
            }
            _ => {
                tracing::warn!(field = %field, "crumb issuer returned an invalid header");
                None
            }
        }
    }

    fn request_crumb(&self) -> Result<TransportResponse, Error> {
        let url = endpoint_url(&self.base_url, ["crumbIssuer", "api", "json"])?;

        let mut headers = HeaderMap::new();
        if let Some(auth) = &self.auth {
            auth.apply(&mut headers)?;
        }

        self.inner.send(TransportRequest {
            method: Method::GET,
            url,
            headers,
            query: vec![],
            form: vec![],
            timeout: self.fetch_timeout,
        })
    }
}

impl<T: BlockingTransport> BlockingTransport for CrumbBlocking<T> {
    fn send(&self, mut req: TransportRequest) -> Result<TransportResponse, Error> {
        if req.method != Method::GET {
            if let Some(CrumbHeader { name, value }) = self.resolve() {
                req.headers.insert(name, value);
            }
        }

        self.inner.send(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::sync::Mutex as StdMutex;

    /// Answers the crumb issuer with a fixed response and records every request.
    struct Scripted {
        crumb: Result<(StatusCode, &'static str), ()>,
        seen: StdMutex<Vec<(Method, String, Option<String>)>>,
    }

    impl Scripted {
        fn new(crumb: Result<(StatusCode, &'static str), ()>) -> Arc<Self> {
            Arc::new(Self {
                crumb,
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(Method, String, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl BlockingTransport for Scripted {
        fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
            let crumb = req
                .headers
                .get("Jenkins-Crumb")
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            self.seen
                .lock()
                .unwrap()
                .push((req.method.clone(), req.url.path().to_owned(), crumb));

            if req.url.path().ends_with("crumbIssuer/api/json") {
                let (status, body) = self.crumb.map_err(|()| Error::Transport {
                    method: Method::GET,
                    path: req.url.path().into(),
                    kind: crate::TransportErrorKind::Connect,
                    source: "connection refused".into(),
                })?;
                return Ok(TransportResponse {
                    status,
                    headers: HeaderMap::new(),
                    body: body.as_bytes().to_vec(),
                });
            }
            Ok(TransportResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
            })
        }
    }

    fn post(url: &str) -> TransportRequest {
        TransportRequest {
            method: Method::POST,
            url: Url::parse(url).unwrap(),
            headers: HeaderMap::new(),
            query: vec![],
            form: vec![],
            timeout: Duration::from_secs(1),
        }
    }

    fn crumb_layer(inner: Arc<Scripted>) -> CrumbBlocking<Arc<Scripted>> {
        CrumbBlocking::new(
            inner,
            Url::parse("https://ci.example.com/").unwrap(),
            Some(Auth::basic("user", "token")),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn crumb_is_fetched_once_and_attached_to_posts() {
        let inner = Scripted::new(Ok((
            StatusCode::OK,
            r#"{"crumbRequestField":"Jenkins-Crumb","crumb":"abc"}"#,
        )));
        let layer = crumb_layer(inner.clone());

        layer.send(post("https://ci.example.com/job/a/1/stop")).unwrap();
        layer.send(post("https://ci.example.com/job/a/2/stop")).unwrap();

        let seen = inner.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1, "/crumbIssuer/api/json");
        assert_eq!(seen[1].2.as_deref(), Some("abc"));
        assert_eq!(seen[2].2.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_crumb_issuer_degrades_to_no_header() {
        let inner = Scripted::new(Ok((StatusCode::NOT_FOUND, "<html/>")));
        let layer = crumb_layer(inner.clone());

        assert_eq!(layer.resolve(), None);
        layer.send(post("https://ci.example.com/job/a/1/stop")).unwrap();

        let seen = inner.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].2, None);
    }

    #[test]
    fn transport_failure_on_crumb_is_not_fatal() {
        let inner = Scripted::new(Err(()));
        let layer = crumb_layer(inner.clone());

        let resp = layer.send(post("https://ci.example.com/job/a/1/stop")).unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(inner.seen().len(), 2);
    }

    #[test]
    fn gets_never_trigger_crumb_fetch() {
        let inner = Scripted::new(Ok((StatusCode::OK, "{}")));
        let layer = crumb_layer(inner.clone());
        let mut req = post("https://ci.example.com/job/a/api/json");
        req.method = Method::GET;

        layer.send(req).unwrap();
        assert_eq!(inner.seen().len(), 1);
    }
}
