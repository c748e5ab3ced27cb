//! Jenkins build control over the REST API.
//!
//! Stop a running build, rebuild it with inherited parameters (falling back
//! to a direct trigger when the rebuild plugin refuses), follow the queue item
//! to its build number and wait for the build to finish. Everything is
//! blocking and sequential; one [`BuildControl`] run handles one job.
//!
//! ```no_run
//! use jenkins_build_control::{BlockingClient, BuildControl, ControlRequest, JobPath};
//!
//! # fn main() -> Result<(), jenkins_build_control::Error> {
//! let client = BlockingClient::builder("https://jenkins.example.com")?
//!     .auth_basic("user", "api-token")
//!     .with_crumb()
//!     .build()?;
//!
//! let mut request = ControlRequest::new(JobPath::parse("team/deploy")?);
//! request.latest = true;
//! BuildControl::new(client).run(&request, std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod record;
pub mod transport;
pub mod types;
pub mod workflow;

mod util;

pub use auth::{Auth, SecretString};
pub use client::{BlockingClient, BlockingClientBuilder};
pub use error::{
    BodySnippetConfig, Error, ErrorKind, HttpError, RejectedAttempt, Result, TransportErrorKind,
};
pub use record::{LogEntry, ResultLog};
pub use types::*;
pub use workflow::{
    BuildControl, CompletionWait, ControlOutcome, ControlRequest, QueueResolution, QueueState,
    RebuildAttempt, RebuildOutcome, StopOutcome,
};
