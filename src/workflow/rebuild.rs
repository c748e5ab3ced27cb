//! Rebuild submission with fallback.
//!
//! The rebuild plugin's `rebuild` action is tried first. When the server
//! rejects it (plugin missing, build not rebuildable, ...) the job is
//! triggered directly: `buildWithParameters` with the merged parameters, or
//! plain `build` for a job without parameters.

use crate::{
    BuildNumber, BuildParameters, Error, JobPath, RejectedAttempt, TriggeredBuild,
    api::BlockingJobsService,
};

/// One way of asking the server for a new build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildAttempt {
    /// `POST /job/<name>/<build>/rebuild`
    Rebuild,
    /// `POST /job/<name>/buildWithParameters`
    BuildWithParameters,
    /// `POST /job/<name>/build`
    Build,
}

impl RebuildAttempt {
    /// Attempts in the order they are tried.
    #[must_use]
    pub fn plan(params: &BuildParameters) -> [Self; 2] {
        let fallback = if params.is_empty() {
            Self::Build
        } else {
            Self::BuildWithParameters
        };
        [Self::Rebuild, fallback]
    }

    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Rebuild => "rebuild",
            Self::BuildWithParameters => "buildWithParameters",
            Self::Build => "build",
        }
    }
}

/// Something that can submit a rebuild attempt.
pub trait BuildTrigger {
    fn submit(
        &self,
        attempt: RebuildAttempt,
        job: &JobPath,
        build: BuildNumber,
        params: &BuildParameters,
    ) -> Result<TriggeredBuild, Error>;
}

impl BuildTrigger for BlockingJobsService {
    fn submit(
        &self,
        attempt: RebuildAttempt,
        job: &JobPath,
        build: BuildNumber,
        params: &BuildParameters,
    ) -> Result<TriggeredBuild, Error> {
        match attempt {
            RebuildAttempt::Rebuild => self.rebuild(job, build),
            RebuildAttempt::BuildWithParameters => self.build_with_parameters(job, params),
            RebuildAttempt::Build => self.build(job),
        }
    }
}

/// The accepted submission and whatever was rejected before it.
#[derive(Clone, Debug)]
pub struct RebuildSubmission {
    pub attempt: RebuildAttempt,
    pub triggered: TriggeredBuild,
    pub rejected: Vec<RejectedAttempt>,
}

impl RebuildSubmission {
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.attempt != RebuildAttempt::Rebuild
    }
}

/// Walk the attempt plan until the server accepts one.
///
/// Only HTTP rejections move on to the next attempt; a transport or decode
/// failure ends the walk. When every attempt is rejected, all of the
/// rejections are returned.
pub fn submit_rebuild<T: BuildTrigger + ?Sized>(
    trigger: &T,
    job: &JobPath,
    build: BuildNumber,
    params: &BuildParameters,
) -> Result<RebuildSubmission, Error> {
    let mut rejected = Vec::new();
    for attempt in RebuildAttempt::plan(params) {
        match trigger.submit(attempt, job, build, params) {
            Ok(triggered) => {
                return Ok(RebuildSubmission {
                    attempt,
                    triggered,
                    rejected,
                });
            }
            Err(Error::Auth(error) | Error::NotFound(error) | Error::Api(error)) => {
                tracing::info!(
                    endpoint = attempt.endpoint(),
                    status = error.status.as_u16(),
                    "rebuild attempt rejected"
                );
                rejected.push(RejectedAttempt {
                    endpoint: attempt.endpoint(),
                    error,
                });
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::RebuildRejected { attempts: rejected })
}
