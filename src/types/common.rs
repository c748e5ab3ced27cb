//! Identifiers shared by the job, build and queue APIs.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A Jenkins job path (supports nested items like `folder/job`).
///
/// `team/a b` is addressed on the server as `/job/team/job/a%20b/...`; each folder
/// segment is percent-encoded on its own when the URL is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobPath {
    name: String,
    segments: Vec<String>,
}

impl JobPath {
    /// Split a slash-delimited job name into folder segments.
    ///
    /// Segments are trimmed and empty ones are dropped; a name with no segment
    /// left is rejected.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let segments: Vec<String> = name
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if segments.is_empty() {
            return Err(Error::InvalidJob {
                name: name.into(),
                reason: "job name is empty",
            });
        }
        Ok(Self {
            name: segments.join("/"),
            segments,
        })
    }

    /// Normalized `a/b/c` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Unencoded URL path segments: `job`, `<seg>` for every folder level.
    pub(crate) fn url_segments(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|segment| ["job", segment.as_str()])
    }

    /// URL segments for this job followed by `tail`.
    pub(crate) fn segments_with<'a>(&'a self, tail: &[&'a str]) -> Vec<String> {
        self.url_segments()
            .chain(tail.iter().copied())
            .map(ToOwned::to_owned)
            .collect()
    }
}

impl fmt::Display for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for JobPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A Jenkins build number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BuildNumber(u64);

impl BuildNumber {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for BuildNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A Jenkins queue item id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QueueItemId(u64);

impl QueueItemId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Extract the id from a queue URL such as `https://ci/queue/item/42/`.
    ///
    /// Returns `None` when the URL has no `/queue/item/<digits>` part.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').collect();
        segments.windows(3).find_map(|window| match window {
            ["queue", "item", id] if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
                id.parse().ok().map(Self)
            }
            _ => None,
        })
    }
}

impl From<u64> for QueueItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_path_produces_one_element_per_segment() {
        let job = JobPath::parse("/team/ nightly /a b/").unwrap();
        assert_eq!(job.segments(), ["team", "nightly", "a b"]);
        assert_eq!(job.as_str(), "team/nightly/a b");
        assert_eq!(
            job.url_segments().collect::<Vec<_>>(),
            ["job", "team", "job", "nightly", "job", "a b"]
        );
    }

    #[test]
    fn job_path_rejects_empty_names() {
        for name in ["", "/", " / // ", "   "] {
            let err = JobPath::parse(name).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidJob, "{name:?}");
        }
    }

    #[test]
    fn segments_with_appends_tail() {
        let job = JobPath::parse("demo").unwrap();
        assert_eq!(job.segments_with(&["7", "stop"]), ["job", "demo", "7", "stop"]);
    }

    #[test]
    fn queue_id_from_location() {
        assert_eq!(
            QueueItemId::from_location("https://ci.example.com/queue/item/42/"),
            Some(QueueItemId::new(42))
        );
        assert_eq!(
            QueueItemId::from_location("/jenkins/queue/item/7"),
            Some(QueueItemId::new(7))
        );
        assert_eq!(QueueItemId::from_location("/queue/item/abc/"), None);
        assert_eq!(QueueItemId::from_location("https://ci.example.com/job/demo/"), None);
    }
}
