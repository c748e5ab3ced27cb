//! Waiting for a build to finish.

use super::clock::Clock;
use crate::{BuildNumber, BuildStatus, Error, JobPath, api::BlockingJobsService};
use std::time::Duration;

/// Read access to build status.
pub trait BuildSource {
    fn build_status(&self, job: &JobPath, build: BuildNumber) -> Result<BuildStatus, Error>;
}

impl BuildSource for BlockingJobsService {
    fn build_status(&self, job: &JobPath, build: BuildNumber) -> Result<BuildStatus, Error> {
        BlockingJobsService::build_status(self, job, build)
    }
}

/// Last status seen and whether the wait gave up before the build finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildWait {
    pub status: BuildStatus,
    pub timed_out: bool,
}

/// Poll `build` until it stops building.
///
/// `timeout` of `None` waits forever, as does one too large to put a deadline
/// on. The poll interval is never shorter than one second.
pub fn wait_for_build_completion<S, C>(
    source: &S,
    clock: &C,
    job: &JobPath,
    build: BuildNumber,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<BuildWait, Error>
where
    S: BuildSource + ?Sized,
    C: Clock + ?Sized,
{
    let interval = poll_interval.max(Duration::from_secs(1));
    let deadline = timeout.and_then(|timeout| clock.now().checked_add(timeout));

    let mut status = source.build_status(job, build)?;
    loop {
        if !status.building {
            return Ok(BuildWait {
                status,
                timed_out: false,
            });
        }
        if deadline.is_some_and(|deadline| clock.now() >= deadline) {
            return Ok(BuildWait {
                status,
                timed_out: true,
            });
        }
        tracing::debug!(%job, %build, "build still running");
        clock.sleep(interval);
        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_poll("build");
        status = source.build_status(job, build)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::clock::manual::ManualClock;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct Script {
        replies: RefCell<VecDeque<bool>>,
        forever: Option<bool>,
        calls: Cell<usize>,
    }

    impl Script {
        fn sequence(building: impl IntoIterator<Item = bool>) -> Self {
            Self {
                replies: RefCell::new(building.into_iter().collect()),
                forever: None,
                calls: Cell::new(0),
            }
        }

        fn always_building() -> Self {
            Self {
                replies: RefCell::new(VecDeque::new()),
                forever: Some(true),
                calls: Cell::new(0),
            }
        }
    }

    impl BuildSource for Script {
        fn build_status(&self, _job: &JobPath, build: BuildNumber) -> Result<BuildStatus, Error> {
            self.calls.set(self.calls.get() + 1);
            let building = self
                .replies
                .borrow_mut()
                .pop_front()
                .or(self.forever)
                .expect("script exhausted");
            let status = BuildStatus::new(build, building);
            Ok(if building {
                status
            } else {
                status.with_result("SUCCESS")
            })
        }
    }

    fn job() -> JobPath {
        JobPath::parse("demo").unwrap()
    }

    #[test]
    fn returns_final_status_once_building_stops() {
        let script = Script::sequence([true, true, false]);
        let clock = ManualClock::new();

        let wait = wait_for_build_completion(
            &script,
            &clock,
            &job(),
            BuildNumber::new(5),
            None,
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(!wait.timed_out);
        assert!(!wait.status.building);
        assert_eq!(wait.status.result.as_deref(), Some("SUCCESS"));
        assert_eq!(script.calls.get(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn gives_up_at_the_timeout() {
        let script = Script::always_building();
        let clock = ManualClock::new();

        let wait = wait_for_build_completion(
            &script,
            &clock,
            &job(),
            BuildNumber::new(5),
            Some(Duration::from_secs(5)),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(wait.timed_out);
        assert!(wait.status.building);
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert_eq!(script.calls.get(), 6);
    }

    #[test]
    fn poll_interval_is_at_least_one_second() {
        let script = Script::sequence([true, false]);
        let clock = ManualClock::new();

        wait_for_build_completion(
            &script,
            &clock,
            &job(),
            BuildNumber::new(5),
            None,
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn huge_timeout_waits_without_a_deadline() {
        let script = Script::sequence([true, false]);
        let clock = ManualClock::new();

        let wait = wait_for_build_completion(
            &script,
            &clock,
            &job(),
            BuildNumber::new(5),
            Some(Duration::from_secs(u64::MAX)),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(!wait.timed_out);
        assert_eq!(script.calls.get(), 2);
    }

    #[test]
    fn finished_build_returns_without_sleeping() {
        let script = Script::sequence([false]);
        let clock = ManualClock::new();

        let wait = wait_for_build_completion(
            &script,
            &clock,
            &job(),
            BuildNumber::new(5),
            Some(Duration::from_secs(5)),
            Duration::from_secs(10),
        )
        .unwrap();

        assert!(!wait.timed_out);
        assert!(clock.sleeps().is_empty());
    }
}
