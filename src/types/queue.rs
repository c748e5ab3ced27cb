use crate::{BuildNumber, QueueItemId};
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Last observed snapshot of a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct QueueItem {
    pub id: QueueItemId,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub why: Option<String>,
    /// Set once the server has assigned a build to the item.
    #[serde(default)]
    pub executable: Option<Executable>,
}

impl QueueItem {
    #[must_use]
    pub fn new(id: impl Into<QueueItemId>) -> Self {
        Self {
            id: id.into(),
            cancelled: false,
            why: None,
            executable: None,
        }
    }

    #[must_use]
    pub fn with_executable(mut self, number: impl Into<BuildNumber>, url: impl Into<String>) -> Self {
        self.executable = Some(Executable {
            number: Some(number.into()),
            url: Some(url.into()),
        });
        self
    }

    #[must_use]
    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    #[must_use]
    pub fn with_why(mut self, why: impl Into<String>) -> Self {
        self.why = Some(why.into());
        self
    }

    /// Build number the item resolved to, if any.
    #[must_use]
    pub fn build_number(&self) -> Option<BuildNumber> {
        self.executable.as_ref().and_then(|e| e.number)
    }

    #[must_use]
    pub fn build_url(&self) -> Option<&str> {
        self.executable
            .as_ref()
            .and_then(|e| e.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// The build a queue item was turned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Executable {
    #[serde(default)]
    pub number: Option<BuildNumber>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Result of a build submission (`stop`, `rebuild`, `build`, `buildWithParameters`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TriggeredBuild {
    pub status: StatusCode,
    /// Queue item id parsed from the `Location` header (when available).
    pub queue_item_id: Option<QueueItemId>,
    /// Raw `Location` header value (when available).
    pub location: Option<Box<str>>,
}

impl TriggeredBuild {
    pub(crate) fn from_parts(status: StatusCode, location: Option<&str>) -> Self {
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string().into_boxed_str());
        let queue_item_id = location.as_deref().and_then(QueueItemId::from_location);
        Self {
            status,
            queue_item_id,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_item_without_executable() {
        let item: QueueItem = serde_json::from_value(json!({
            "_class": "hudson.model.Queue$WaitingItem",
            "id": 42,
            "why": "Waiting for next available executor",
            "executable": null
        }))
        .unwrap();
        assert_eq!(item.id, QueueItemId::new(42));
        assert!(!item.cancelled);
        assert_eq!(item.build_number(), None);
        assert_eq!(item.why.as_deref(), Some("Waiting for next available executor"));
    }

    #[test]
    fn queue_item_with_executable() {
        let item: QueueItem = serde_json::from_value(json!({
            "id": 42,
            "cancelled": false,
            "executable": {"number": 8, "url": "https://ci.example.com/job/demo/8/"}
        }))
        .unwrap();
        assert_eq!(item.build_number(), Some(BuildNumber::new(8)));
        assert_eq!(item.build_url(), Some("https://ci.example.com/job/demo/8/"));
    }

    #[test]
    fn triggered_build_parses_location() {
        let t = TriggeredBuild::from_parts(
            StatusCode::CREATED,
            Some("https://ci.example.com/queue/item/17/"),
        );
        assert_eq!(t.queue_item_id, Some(QueueItemId::new(17)));

        let t = TriggeredBuild::from_parts(StatusCode::FOUND, Some("https://ci.example.com/job/demo/"));
        assert_eq!(t.queue_item_id, None);
        assert!(t.location.is_some());

        assert_eq!(TriggeredBuild::from_parts(StatusCode::OK, None).location, None);
    }
}
