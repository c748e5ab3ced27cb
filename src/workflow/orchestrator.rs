//! One invocation of the build-control workflow.
//!
//! Steps run strictly in order: crumb, pre-existing queue item, latest/status
//! reads, parameter fetch, stop, rebuild (with post-submit queue resolution),
//! completion wait and finally the result log.

use super::{
    build_wait::{BuildWait, wait_for_build_completion},
    clock::{Clock, SystemClock},
    queue_wait::{QUEUE_POLL_INTERVAL, QueueResolution, QueueState, wait_for_queue_executable},
    rebuild::{RebuildSubmission, submit_rebuild},
    report::Report,
};
use crate::{
    BlockingClient, BuildNumber, BuildParameters, BuildStatus, Error, JobPath, ParamOverride,
    QueueItemId,
    api::BlockingJobsService,
    record::{LogEntry, ResultLog},
};
use http::StatusCode;
use std::{io::Write, path::PathBuf, time::Duration};

/// Queue-wait budget used for a rebuild when none was requested.
pub const REBUILD_QUEUE_WAIT: Duration = Duration::from_secs(30);

/// Completion wait settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionWait {
    /// `None` waits until the build finishes.
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for CompletionWait {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// What a single invocation should do.
#[derive(Clone, Debug)]
pub struct ControlRequest {
    pub job: JobPath,
    pub build: Option<BuildNumber>,
    pub stop: bool,
    pub rebuild: bool,
    pub status: bool,
    pub latest: bool,
    pub queue_id: Option<QueueItemId>,
    pub queue_url: Option<String>,
    /// `None` picks the default: 30s with a rebuild, a single fetch otherwise.
    pub queue_wait: Option<Duration>,
    pub wait: Option<CompletionWait>,
    pub overrides: Vec<ParamOverride>,
    pub record_file: Option<PathBuf>,
    pub dry_run: bool,
}

impl ControlRequest {
    #[must_use]
    pub fn new(job: JobPath) -> Self {
        Self {
            job,
            build: None,
            stop: false,
            rebuild: false,
            status: false,
            latest: false,
            queue_id: None,
            queue_url: None,
            queue_wait: None,
            wait: None,
            overrides: Vec::new(),
            record_file: None,
            dry_run: false,
        }
    }

    /// Reject a request that asks for nothing.
    pub fn validate(&self) -> Result<(), Error> {
        let has_action = self.stop
            || self.rebuild
            || self.status
            || self.latest
            || self.queue_id.is_some()
            || self.queue_url.is_some()
            || self.wait.is_some();
        if has_action {
            Ok(())
        } else {
            Err(Error::usage(
                "Nothing to do. Use --stop/--rebuild/--status/--latest or queue options.",
            ))
        }
    }

    #[must_use]
    pub fn queue_wait_budget(&self) -> Duration {
        self.queue_wait.unwrap_or(if self.rebuild {
            REBUILD_QUEUE_WAIT
        } else {
            Duration::ZERO
        })
    }

    /// Explicit id first, then the id embedded in the queue URL.
    #[must_use]
    pub fn queue_item_id(&self) -> Option<QueueItemId> {
        self.queue_id.or_else(|| {
            self.queue_url
                .as_deref()
                .and_then(QueueItemId::from_location)
        })
    }
}

/// Outcome of the stop step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(StatusCode),
    /// The build had already finished; nothing was sent.
    NotRunning,
    DryRun,
}

/// Outcome of the rebuild step.
#[derive(Clone, Debug)]
pub enum RebuildOutcome {
    Submitted(RebuildSubmission),
    DryRun,
}

/// Everything a run observed, in the order it was observed.
#[derive(Clone, Debug, Default)]
pub struct ControlOutcome {
    /// Last queue resolution (the rebuild's, if one was waited for).
    pub queue: Option<QueueResolution>,
    pub latest: Option<BuildStatus>,
    /// Status shown for the requested build.
    pub status: Option<BuildStatus>,
    /// Merged parameters of the build being stopped or rebuilt.
    pub parameters: Option<BuildParameters>,
    pub stop: Option<StopOutcome>,
    pub rebuild: Option<RebuildOutcome>,
    pub completion: Option<BuildWait>,
    /// The entry appended to the result log, if any.
    pub record: Option<LogEntry>,
}

/// Drives a [`ControlRequest`] against one Jenkins server.
pub struct BuildControl<C = SystemClock> {
    client: BlockingClient,
    clock: C,
    queue_poll_interval: Duration,
}

impl BuildControl<SystemClock> {
    #[must_use]
    pub fn new(client: BlockingClient) -> Self {
        Self {
            client,
            clock: SystemClock,
            queue_poll_interval: QUEUE_POLL_INTERVAL,
        }
    }
}

impl<C: Clock> BuildControl<C> {
    #[must_use]
    pub fn with_clock<D: Clock>(self, clock: D) -> BuildControl<D> {
        BuildControl {
            client: self.client,
            clock,
            queue_poll_interval: self.queue_poll_interval,
        }
    }

    #[must_use]
    pub fn queue_poll_interval(mut self, interval: Duration) -> Self {
        self.queue_poll_interval = interval;
        self
    }

    /// Run `request`, writing `key=value` progress lines to `out`.
    pub fn run<W: Write>(&self, request: &ControlRequest, out: W) -> Result<ControlOutcome, Error> {
        request.validate()?;
        let span = tracing::info_span!("jenkins.control", job = %request.job, dry_run = request.dry_run);
        let _enter = span.enter();

        let mut report = Report::new(out);
        let mut outcome = ControlOutcome::default();
        let jobs = self.client.jobs();
        let job = &request.job;

        let crumb = self.client.crumb();
        tracing::debug!(crumb = crumb.is_some(), "crumb resolved");

        let budget = request.queue_wait_budget();
        let mut record_queue_id = request.queue_item_id();
        let mut record_queue_url = request.queue_url.clone();

        if let Some(id) = record_queue_id {
            outcome.queue = Some(self.resolve_queue(&mut report, id, budget)?);
            if record_queue_url.is_none() {
                record_queue_url = Some(self.queue_item_url(id));
            }
        }

        let build = request.build.or_else(|| {
            outcome
                .queue
                .as_ref()
                .and_then(QueueResolution::build_number)
        });
        if build.is_none() && (request.stop || request.rebuild || request.status) {
            return Err(Error::usage("Missing --build for stop/rebuild/status."));
        }

        if request.latest {
            let latest = jobs.last_build(job)?;
            report.field("latest_build", latest.is_some())?;
            if let Some(status) = &latest {
                report.build_status(status)?;
            }
            outcome.latest = latest;
        }

        if let (true, Some(build)) = (request.status, build) {
            let status = jobs.build_status(job, build)?;
            report.build_status(&status)?;
            outcome.status = Some(status);
        }

        let mut rebuilt: Option<BuildNumber> = None;
        if let (true, Some(build)) = (request.stop || request.rebuild, build) {
            let record = jobs.build_record(job, build)?;
            let mut params = record.parameters;
            params.overlay(&request.overrides);
            report.field("building", record.building)?;
            report.field("param_count", params.len())?;

            if request.stop {
                let stop = self.stop(&mut report, &jobs, job, build, record.building, request.dry_run)?;
                outcome.stop = Some(stop);
            }

            if request.rebuild && request.dry_run {
                let segments = job.segments_with(&[build.to_string().as_str(), "rebuild"]);
                self.dry_run_post(&mut report, &segments, &params)?;
                report.line("dry-run rebuild requested")?;
                outcome.rebuild = Some(RebuildOutcome::DryRun);
            } else if request.rebuild {
                let submission = submit_rebuild(&jobs, job, build, &params)?;
                if submission.used_fallback() {
                    report.field("rebuild_fallback", submission.attempt.endpoint())?;
                }
                report.field("rebuild_status", submission.triggered.status.as_u16())?;
                let location = submission.triggered.location.as_deref();
                if let Some(location) = location {
                    report.field("queue", location)?;
                }
                if let Some(id) = submission.triggered.queue_item_id {
                    report.field("queue_id", id)?;
                    record_queue_id = Some(id);
                    record_queue_url = Some(
                        location.map_or_else(|| self.queue_item_url(id), ToOwned::to_owned),
                    );
                    if !budget.is_zero() {
                        let resolution = self.resolve_queue(&mut report, id, budget)?;
                        rebuilt = resolution.build_number();
                        outcome.queue = Some(resolution);
                    }
                }
                outcome.rebuild = Some(RebuildOutcome::Submitted(submission));
            }
            outcome.parameters = Some(params);
        }

        if request.dry_run && (outcome.stop == Some(StopOutcome::DryRun) || outcome.rebuild.is_some())
        {
            tracing::info!("dry run: skipping wait and result log");
            return Ok(outcome);
        }

        if let Some(wait) = request.wait {
            let build = match rebuilt.or(build) {
                Some(build) => build,
                None => self.latest_build_number(&jobs, job, outcome.latest.as_ref())?,
            };
            let waited = wait_for_build_completion(
                &jobs,
                &self.clock,
                job,
                build,
                wait.timeout,
                wait.poll_interval,
            )?;
            report.line(if waited.timed_out {
                "wait_timeout=true"
            } else {
                "wait_done=true"
            })?;
            report.build_status(&waited.status)?;
            outcome.completion = Some(waited);
        }

        if let Some(path) = &request.record_file {
            let mut entry = self.log_entry(job, &outcome);
            entry.queue_id = record_queue_id;
            entry.queue_url = record_queue_url;
            if entry.is_recordable() {
                ResultLog::new(path).append(&entry)?;
                outcome.record = Some(entry);
            } else {
                tracing::info!(path = %path.display(), "nothing to record");
            }
        }

        Ok(outcome)
    }

    fn resolve_queue<W: Write>(
        &self,
        report: &mut Report<W>,
        id: QueueItemId,
        budget: Duration,
    ) -> Result<QueueResolution, Error> {
        let resolution = wait_for_queue_executable(
            &self.client.queue(),
            &self.clock,
            id,
            budget,
            self.queue_poll_interval,
        )?;
        tracing::info!(queue_id = %id, state = ?resolution.state, "queue item resolved");

        if !budget.is_zero() {
            report.field("queue_wait_seconds", budget.as_secs())?;
        }
        match &resolution.item {
            Some(item) => report.queue_item(item)?,
            None => report.field("queue_not_found", true)?,
        }
        if resolution.state == QueueState::TimedOut {
            report.field("queue_wait_timeout", true)?;
        }
        Ok(resolution)
    }

    fn stop<W: Write>(
        &self,
        report: &mut Report<W>,
        jobs: &BlockingJobsService,
        job: &JobPath,
        build: BuildNumber,
        building: bool,
        dry_run: bool,
    ) -> Result<StopOutcome, Error> {
        if !building {
            report.line("skip stop: build is not running")?;
            return Ok(StopOutcome::NotRunning);
        }
        if dry_run {
            let segments = job.segments_with(&[build.to_string().as_str(), "stop"]);
            self.dry_run_post(report, &segments, &BuildParameters::new())?;
            return Ok(StopOutcome::DryRun);
        }
        let stopped = jobs.stop_build(job, build)?;
        report.field("stop_status", stopped.status.as_u16())?;
        Ok(StopOutcome::Stopped(stopped.status))
    }

    fn dry_run_post<W: Write>(
        &self,
        report: &mut Report<W>,
        segments: &[String],
        params: &BuildParameters,
    ) -> Result<(), Error> {
        let url = self
            .client
            .endpoint_url(segments.iter().map(String::as_str))?;
        report.line(format_args!("dry-run POST {url}"))?;
        if !params.is_empty() {
            let keys: Vec<&str> = params.keys().collect();
            report.line(format_args!("dry-run params: [{}]", keys.join(", ")))?;
        }
        Ok(())
    }

    fn latest_build_number(
        &self,
        jobs: &BlockingJobsService,
        job: &JobPath,
        shown: Option<&BuildStatus>,
    ) -> Result<BuildNumber, Error> {
        let fetched;
        let latest = match shown {
            Some(status) => Some(status),
            None => {
                fetched = jobs.last_build(job)?;
                fetched.as_ref()
            }
        };
        latest
            .map(|status| status.number)
            .ok_or_else(|| Error::usage("Missing build number for --wait."))
    }

    fn queue_item_url(&self, id: QueueItemId) -> String {
        format!("{}queue/item/{id}/", self.client.base_url())
    }

    fn log_entry(&self, job: &JobPath, outcome: &ControlOutcome) -> LogEntry {
        let entry = LogEntry::new(job);
        let status = outcome
            .completion
            .as_ref()
            .map(|wait| &wait.status)
            .or(outcome.status.as_ref())
            .or(outcome.latest.as_ref());
        if let Some(status) = status {
            return entry.with_status(status);
        }
        match outcome.queue.as_ref().and_then(|q| q.item.as_ref()) {
            Some(item) if item.build_number().is_some() => LogEntry {
                build: item.build_number(),
                url: item.build_url().map(ToOwned::to_owned),
                ..entry
            },
            _ => entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ControlRequest {
        ControlRequest::new(JobPath::parse("demo").unwrap())
    }

    #[test]
    fn empty_request_is_a_usage_error() {
        let err = request().validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("Nothing to do"));
    }

    #[test]
    fn any_single_action_is_enough() {
        let mut req = request();
        req.queue_url = Some("https://ci.example.com/queue/item/4/".into());
        assert!(req.validate().is_ok());

        let mut req = request();
        req.wait = Some(CompletionWait::default());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn queue_wait_defaults_depend_on_rebuild() {
        let mut req = request();
        assert_eq!(req.queue_wait_budget(), Duration::ZERO);
        req.rebuild = true;
        assert_eq!(req.queue_wait_budget(), REBUILD_QUEUE_WAIT);
        req.queue_wait = Some(Duration::ZERO);
        assert_eq!(req.queue_wait_budget(), Duration::ZERO);
    }

    #[test]
    fn explicit_queue_id_wins_over_url() {
        let mut req = request();
        req.queue_url = Some("https://ci.example.com/queue/item/11/".into());
        assert_eq!(req.queue_item_id(), Some(QueueItemId::new(11)));
        req.queue_id = Some(QueueItemId::new(12));
        assert_eq!(req.queue_item_id(), Some(QueueItemId::new(12)));

        req.queue_id = None;
        req.queue_url = Some("https://ci.example.com/job/demo/".into());
        assert_eq!(req.queue_item_id(), None);
    }
}
