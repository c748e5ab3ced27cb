//! Re-exports for middleware layers.

pub mod crumb_blocking;

pub use crumb_blocking::{CrumbBlocking, CrumbHeader};
