//! Jenkins REST API services.
//!
//! Exposed via service accessors on the client:
//! - `BlockingClient::jobs()`
//! - `BlockingClient::queue()`

pub mod jobs;
pub mod queue;

pub use jobs::*;
pub use queue::*;
