use http::{Method, StatusCode};
use std::{error::Error as StdError, fmt, path::PathBuf};
use thiserror::Error;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy)]
pub struct BodySnippetConfig {
    pub max_bytes: usize,
}

impl Default for BodySnippetConfig {
    fn default() -> Self {
        Self { max_bytes: 4096 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Auth,
    NotFound,
    Api,
    RebuildRejected,
    Transport,
    Decode,
    InvalidConfig,
    InvalidJob,
    Usage,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub method: Method,
    /// Sanitized URL: no query/fragment/userinfo.
    pub url: Box<Url>,
    pub message: Option<Box<str>>,
    pub request_id: Option<Box<str>>,
    pub body_snippet: Option<Box<str>>,
}

impl HttpError {
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A rejected rebuild attempt, kept so every endpoint's answer survives the fallback.
#[derive(Debug, Clone)]
pub struct RejectedAttempt {
    /// Endpoint name (`rebuild`, `buildWithParameters` or `build`).
    pub endpoint: &'static str,
    pub error: HttpError,
}

/// All errors returned by the crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Auth(HttpError),

    #[error("{0}")]
    NotFound(HttpError),

    #[error("{0}")]
    Api(HttpError),

    #[error("Rebuild rejected: {}", RejectedList(.attempts))]
    RebuildRejected { attempts: Vec<RejectedAttempt> },

    #[error("Transport error during {method} {path}: {source}")]
    Transport {
        method: Method,
        path: Box<str>,
        kind: TransportErrorKind,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Decode error (HTTP {status}) during {method} {path}: {source}")]
    Decode {
        status: StatusCode,
        method: Method,
        path: Box<str>,
        request_id: Option<Box<str>>,
        body_snippet: Option<Box<str>>,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: Box<str>,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("Invalid job name {name:?}: {reason}")]
    InvalidJob { name: Box<str>, reason: &'static str },

    #[error("{message}")]
    Usage { message: Box<str> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    Report(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into().into_boxed_str(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into().into_boxed_str(),
            source: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Api(_) => ErrorKind::Api,
            Self::RebuildRejected { .. } => ErrorKind::RebuildRejected,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::InvalidJob { .. } => ErrorKind::InvalidJob,
            Self::Usage { .. } => ErrorKind::Usage,
            Self::Io { .. } | Self::Report(_) => ErrorKind::Io,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Auth(e) | Self::NotFound(e) | Self::Api(e) => Some(e.status),
            Self::RebuildRejected { attempts } => attempts.last().map(|a| a.error.status),
            Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response bodies worth showing to a user, one per failed request.
    #[must_use]
    pub fn body_snippets(&self) -> Vec<&str> {
        match self {
            Self::Auth(e) | Self::NotFound(e) | Self::Api(e) => {
                e.body_snippet.as_deref().into_iter().collect()
            }
            Self::RebuildRejected { attempts } => attempts
                .iter()
                .filter_map(|a| a.error.body_snippet.as_deref())
                .collect(),
            Self::Decode { body_snippet, .. } => body_snippet.as_deref().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Process exit code: 2 for a bad invocation, 1 for everything that failed at runtime.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig { .. } | Self::InvalidJob { .. } | Self::Usage { .. } => 2,
            _ => 1,
        }
    }

    pub(crate) fn from_http(error: HttpError) -> Self {
        match error.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(error),
            StatusCode::NOT_FOUND => Self::NotFound(error),
            _ => Self::Api(error),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} ({} {})", self.status, self.method, self.path())?;
        if let Some(message) = self.message.as_deref() {
            write!(f, ": {message}")?;
        }
        if let Some(request_id) = self.request_id.as_deref() {
            write!(f, " [request-id: {request_id}]")?;
        }
        Ok(())
    }
}

struct RejectedList<'a>(&'a [RejectedAttempt]);

impl fmt::Display for RejectedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, attempt) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} -> {}", attempt.endpoint, attempt.error)?;
        }
        Ok(())
    }
}
