//! High-level blocking Jenkins client.

use crate::{
    Auth, BodySnippetConfig, Error, HttpError, api,
    transport::{
        TransportRequest,
        blocking_transport::{BlockingTransport, DynBlockingTransport, UreqBlocking},
        middleware::{CrumbBlocking, CrumbHeader},
        request::{Request, Response},
    },
    util::{
        diagnostics,
        redact::redact_text,
        url::{endpoint_url, normalize_base_url, sanitize_url_for_error},
    },
};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tracing::field;
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Configures and constructs [`BlockingClient`].
pub struct BlockingClientBuilder {
    base_url: Url,
    auth: Option<Auth>,
    user_agent: String,
    timeout: Duration,
    crumb: bool,
    body_snippet: BodySnippetConfig,
    transport: Option<DynBlockingTransport>,
}

impl BlockingClientBuilder {
    fn try_new(base: impl AsRef<str>) -> Result<Self, Error> {
        let base_url = normalize_base_url(base.as_ref())?;
        Ok(Self {
            base_url,
            auth: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(20),
            crumb: false,
            body_snippet: BodySnippetConfig::default(),
            transport: None,
        })
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn auth_basic(mut self, user: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::basic(user, token));
        self
    }

    /// Override the default `User-Agent` header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Attach a CSRF crumb to every mutating request (best-effort, resolved once).
    pub fn with_crumb(mut self) -> Self {
        self.crumb = true;
        self
    }

    /// Cap the server body kept on errors, in bytes.
    pub fn max_body_snippet_bytes(mut self, max_bytes: usize) -> Self {
        self.body_snippet.max_bytes = max_bytes;
        self
    }

    /// Replace the `ureq` transport, e.g. with a recording fake.
    pub fn transport(mut self, transport: impl BlockingTransport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<BlockingClient, Error> {
        let base = self.base_url;

        let mut transport: DynBlockingTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqBlocking::try_new(&self.user_agent, self.timeout)?),
        };

        let crumb = self.crumb.then(|| {
            Arc::new(CrumbBlocking::new(
                transport.clone(),
                base.clone(),
                self.auth.clone(),
                self.timeout,
            ))
        });
        if let Some(crumb) = &crumb {
            transport = crumb.clone();
        }

        Ok(BlockingClient {
            inner: Arc::new(Inner {
                base,
                auth: self.auth,
                timeout: self.timeout,
                body_snippet: self.body_snippet,
                crumb,
                transport,
            }),
        })
    }
}

#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<Inner>,
}

struct Inner {
    base: Url,
    auth: Option<Auth>,
    timeout: Duration,
    body_snippet: BodySnippetConfig,
    crumb: Option<Arc<CrumbBlocking<DynBlockingTransport>>>,
    transport: DynBlockingTransport,
}

impl BlockingClient {
    pub fn builder(base: impl AsRef<str>) -> Result<BlockingClientBuilder, Error> {
        BlockingClientBuilder::try_new(base)
    }

    #[must_use]
    pub fn jobs(&self) -> api::BlockingJobsService {
        api::BlockingJobsService::new(self.clone())
    }

    #[must_use]
    pub fn queue(&self) -> api::BlockingQueueService {
        api::BlockingQueueService::new(self.clone())
    }

    /// Normalized base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Absolute URL for a path below the base URL.
    pub fn endpoint_url<'a, I>(&self, segments: I) -> Result<Url, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        endpoint_url(&self.inner.base, segments)
    }

    /// Resolve the CSRF crumb now instead of before the first mutating request.
    ///
    /// Returns `None` when crumbs are disabled on the client or the server has none.
    pub fn crumb(&self) -> Option<CrumbHeader> {
        self.inner.crumb.as_ref().and_then(|crumb| crumb.resolve())
    }

    pub(crate) fn send_json<T: DeserializeOwned + Send + 'static>(
        &self,
        req: Request,
    ) -> Result<T, Error> {
        let resp = self.execute_request(&req)?;
        resp.json().map_err(|source| {
            let path = self
                .endpoint_url(req.segments.iter().map(String::as_str))
                .map(|url| url.path().to_owned())
                .unwrap_or_default();
            Error::Decode {
                status: resp.status,
                method: req.method.clone(),
                path: path.into_boxed_str(),
                request_id: diagnostics::request_id(&resp.headers),
                body_snippet: diagnostics::body_snippet(
                    &resp.body,
                    self.inner.body_snippet,
                    self.inner.auth.as_ref(),
                ),
                source: Box::new(source),
            }
        })
    }

    pub(crate) fn send_response(&self, req: Request) -> Result<Response, Error> {
        self.execute_request(&req)
    }

    pub(crate) fn execute_request(&self, req: &Request) -> Result<Response, Error> {
        let url = self.endpoint_url(req.segments.iter().map(String::as_str))?;

        let mut headers = HeaderMap::new();
        if let Some(auth) = &self.inner.auth {
            auth.apply(&mut headers)?;
        }

        let start = std::time::Instant::now();
        let span = tracing::info_span!(
            "jenkins.request",
            http.method = %req.method,
            http.host = %self.inner.base.host_str().unwrap_or_default(),
            http.path = %url.path(),
            http.status = field::Empty,
            request_id = field::Empty,
            latency_ms = field::Empty,
            error_kind = field::Empty,
        );
        let _enter = span.enter();

        let resp = match self.inner.transport.send(TransportRequest {
            method: req.method.clone(),
            url: url.clone(),
            headers,
            query: req.query.clone(),
            form: req.form.clone(),
            timeout: self.inner.timeout,
        }) {
            Ok(resp) => resp,
            Err(err) => {
                #[cfg(feature = "metrics")]
                crate::transport::metrics::record_outcome(
                    &req.method,
                    None,
                    start.elapsed(),
                    Some(err.kind()),
                );
                span.record("error_kind", field::debug(err.kind()));
                span.record("latency_ms", start.elapsed().as_millis() as i64);
                return Err(err);
            }
        };

        let request_id = diagnostics::request_id(&resp.headers);
        span.record("http.status", resp.status.as_u16() as i64);
        span.record("latency_ms", start.elapsed().as_millis() as i64);
        if let Some(rid) = request_id.as_deref() {
            span.record("request_id", field::display(rid));
        }

        if resp.status.is_client_error() || resp.status.is_server_error() {
            let message = diagnostics::extract_message(&resp.body)
                .map(|msg| redact_text(msg.into(), self.inner.auth.as_ref()).into_boxed_str());
            let http_error = HttpError {
                status: resp.status,
                method: req.method.clone(),
                url: Box::new(sanitize_url_for_error(&url)),
                message,
                request_id,
                body_snippet: diagnostics::body_snippet(
                    &resp.body,
                    self.inner.body_snippet,
                    self.inner.auth.as_ref(),
                ),
            };
            let err = Error::from_http(http_error);

            #[cfg(feature = "metrics")]
            crate::transport::metrics::record_outcome(
                &req.method,
                err.status(),
                start.elapsed(),
                Some(err.kind()),
            );
            span.record("error_kind", field::debug(err.kind()));
            tracing::debug!(status = resp.status.as_u16(), "request rejected");

            return Err(err);
        }

        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_outcome(
            &req.method,
            Some(resp.status),
            start.elapsed(),
            None,
        );

        Ok(Response {
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
        })
    }
}
