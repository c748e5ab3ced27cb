//! Shared request/response types.

pub mod build;
pub mod common;
pub mod queue;

pub use build::*;
pub use common::*;
pub use queue::*;
