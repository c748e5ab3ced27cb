//! The build-control workflow: queue and build polling, rebuild fallback and
//! the orchestrator that sequences them.

pub mod build_wait;
pub mod clock;
pub mod orchestrator;
pub mod queue_wait;
pub mod rebuild;
pub mod report;

pub use build_wait::{BuildSource, BuildWait, wait_for_build_completion};
pub use clock::{Clock, SystemClock};
pub use orchestrator::{
    BuildControl, CompletionWait, ControlOutcome, ControlRequest, RebuildOutcome, StopOutcome,
};
pub use queue_wait::{
    QUEUE_POLL_INTERVAL, QueueResolution, QueueSource, QueueState, wait_for_queue_executable,
};
pub use rebuild::{BuildTrigger, RebuildAttempt, RebuildSubmission, submit_rebuild};
pub use report::Report;
