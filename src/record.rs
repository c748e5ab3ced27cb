//! Append-only result log.
//!
//! Each invocation that learned something worth keeping (a build or a queue
//! item) appends one `- jenkins_build: key=value, ...` line. Entries are
//! separated by a blank line; a fresh file starts without one.

use crate::{BuildNumber, BuildStatus, Error, JobPath, QueueItemId};
use chrono::{DateTime, Local};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

const MARKER: &str = "- jenkins_build:";

/// One result log line before rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub job: String,
    pub build: Option<BuildNumber>,
    pub building: Option<bool>,
    pub result: Option<String>,
    pub url: Option<String>,
    pub queue_id: Option<QueueItemId>,
    pub queue_url: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn new(job: &JobPath) -> Self {
        Self {
            job: job.as_str().to_owned(),
            ..Self::default()
        }
    }

    /// Take build number, running flag, result and url from a status snapshot.
    #[must_use]
    pub fn with_status(mut self, status: &BuildStatus) -> Self {
        self.build = Some(status.number);
        self.building = Some(status.building);
        self.result = status.result.clone();
        self.url = Some(status.url.clone()).filter(|url| !url.is_empty());
        self
    }

    /// Only entries that point at a build or a queue item are worth writing.
    #[must_use]
    pub fn is_recordable(&self) -> bool {
        self.build.is_some()
            || self.queue_id.is_some()
            || non_empty(self.url.as_deref()).is_some()
            || non_empty(self.queue_url.as_deref()).is_some()
    }

    #[must_use]
    pub fn render(&self, time: DateTime<Local>) -> String {
        let mut parts = vec![
            format!("time={}", time.format("%Y-%m-%d %H:%M:%S")),
            format!("job={}", self.job),
        ];
        if let Some(build) = self.build {
            parts.push(format!("build={build}"));
        }
        if let Some(building) = self.building {
            parts.push(format!("building={building}"));
        }
        if let Some(result) = non_empty(self.result.as_deref()) {
            parts.push(format!("result={result}"));
        }
        if let Some(url) = non_empty(self.url.as_deref()) {
            parts.push(format!("url={url}"));
        }
        if let Some(queue_id) = self.queue_id {
            parts.push(format!("queue_id={queue_id}"));
        }
        if let Some(queue_url) = non_empty(self.queue_url.as_deref()) {
            parts.push(format!("queue_url={queue_url}"));
        }
        format!("{MARKER} {}", parts.join(", "))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// The log file entries are appended to.
#[derive(Clone, Debug)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `entry` with the current local time and append it.
    pub fn append(&self, entry: &LogEntry) -> Result<(), Error> {
        self.append_line(&entry.render(Local::now()))
    }

    /// Append `line`, creating the file and its parent directories as needed.
    pub fn append_line(&self, line: &str) -> Result<(), Error> {
        self.try_append(line).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn try_append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let is_empty = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(err) => return Err(err),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut text = String::new();
        if !is_empty {
            text.push('\n');
        }
        text.push_str(line.trim_end());
        text.push('\n');
        file.write_all(text.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "result entry appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, 14, 12, 0, 5)
            .single()
            .unwrap()
    }

    #[test]
    fn render_includes_only_known_fields() {
        let job = JobPath::parse("team/deploy").unwrap();
        let status = BuildStatus::new(42, false)
            .with_result("SUCCESS")
            .with_url("https://ci.example.com/job/team/job/deploy/42/");
        let mut entry = LogEntry::new(&job).with_status(&status);
        entry.queue_id = Some(QueueItemId::new(7));

        assert_eq!(
            entry.render(at_noon()),
            "- jenkins_build: time=2026-03-14 12:00:05, job=team/deploy, build=42, \
             building=false, result=SUCCESS, url=https://ci.example.com/job/team/job/deploy/42/, \
             queue_id=7"
        );
    }

    #[test]
    fn entry_without_build_or_queue_is_not_recordable() {
        let job = JobPath::parse("demo").unwrap();
        assert!(!LogEntry::new(&job).is_recordable());

        let mut entry = LogEntry::new(&job);
        entry.queue_url = Some("https://ci.example.com/queue/item/3/".into());
        assert!(entry.is_recordable());
    }

    #[test]
    fn first_append_has_no_leading_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultLog::new(dir.path().join("nested/dir/testrun.md"));

        log.append_line("- jenkins_build: one").unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "- jenkins_build: one\n");
    }

    #[test]
    fn second_append_is_separated_by_one_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultLog::new(dir.path().join("testrun.md"));

        log.append_line("- jenkins_build: one").unwrap();
        log.append_line("- jenkins_build: two  \n").unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "- jenkins_build: one\n\n- jenkins_build: two\n");
    }

    #[test]
    fn empty_existing_file_counts_as_new() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = ResultLog::new(file.path());

        log.append_line("- jenkins_build: only").unwrap();

        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "- jenkins_build: only\n"
        );
    }
}
