//! Build snapshots and build parameters.

use crate::{BuildNumber, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, str::FromStr};

/// Status fields of one build, as returned by a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BuildStatus {
    pub number: BuildNumber,
    #[serde(default)]
    pub building: bool,
    /// `SUCCESS`, `FAILURE`, `ABORTED`, ...; absent while the build runs.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub url: String,
    /// Start time, epoch milliseconds.
    #[serde(default, rename = "timestamp")]
    pub start_timestamp_ms: i64,
    #[serde(default, rename = "duration")]
    pub duration_ms: Option<i64>,
    #[serde(default, rename = "estimatedDuration")]
    pub estimated_duration_ms: Option<i64>,
}

impl BuildStatus {
    #[must_use]
    pub fn new(number: impl Into<BuildNumber>, building: bool) -> Self {
        Self {
            number: number.into(),
            building,
            result: None,
            url: String::new(),
            start_timestamp_ms: 0,
            duration_ms: None,
            estimated_duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// `GET /job/<name>/api/json?tree=lastBuild[...]`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobSummary {
    #[serde(default)]
    pub(crate) last_build: Option<BuildStatus>,
}

/// Build parameters by name. Keys are case-sensitive and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildParameters(BTreeMap<String, String>);

impl BuildParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect parameters recorded in a build's `actions` array.
    ///
    /// Entries without a name or with a `null` value are skipped; later actions
    /// win when a name repeats.
    #[must_use]
    pub fn from_actions(actions: &[Value]) -> Self {
        let mut params = Self::new();
        let entries = actions
            .iter()
            .filter_map(|action| action.get("parameters").and_then(Value::as_array))
            .flatten();
        for entry in entries {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Some(value) = entry.get("value").and_then(normalize_value) {
                params.insert(name, value);
            }
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overlay caller overrides; an override replaces a prior value with the same key.
    pub fn overlay<'a, I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = &'a ParamOverride>,
    {
        for ParamOverride { key, value } in overrides {
            self.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// A `KEY=VALUE` parameter override supplied on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamOverride {
    pub key: String,
    pub value: String,
}

impl FromStr for ParamOverride {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = s.split_once('=') else {
            return Err(Error::usage(format!(
                "Invalid --param value: {s}. Use KEY=VALUE."
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::usage(format!("Invalid --param value: {s}.")));
        }
        Ok(Self {
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// A build's running flag plus the parameters it was started with.
///
/// Read from `GET /job/<name>/<build>/api/json?tree=building,actions[parameters[name,value]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawBuildRecord")]
#[non_exhaustive]
pub struct BuildRecord {
    pub building: bool,
    pub parameters: BuildParameters,
}

#[derive(Deserialize)]
struct RawBuildRecord {
    #[serde(default)]
    building: bool,
    #[serde(default)]
    actions: Vec<Value>,
}

impl From<RawBuildRecord> for BuildRecord {
    fn from(raw: RawBuildRecord) -> Self {
        Self {
            building: raw.building,
            parameters: BuildParameters::from_actions(&raw.actions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_win_on_key_collision() {
        let mut params: BuildParameters = [("A", "1"), ("B", "2")].into_iter().collect();
        let overrides: Vec<ParamOverride> = ["B=3", "C=4"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        params.overlay(&overrides);

        let expected: BuildParameters = [("A", "1"), ("B", "3"), ("C", "4")]
            .into_iter()
            .collect();
        assert_eq!(params, expected);
    }

    #[test]
    fn param_override_keeps_value_verbatim() {
        let o: ParamOverride = " URL =http://x/?a=b".parse().unwrap();
        assert_eq!(o.key, "URL");
        assert_eq!(o.value, "http://x/?a=b");

        assert_eq!(
            "novalue".parse::<ParamOverride>().unwrap_err().kind(),
            crate::ErrorKind::Usage
        );
        assert!(" =1".parse::<ParamOverride>().is_err());
    }

    #[test]
    fn build_record_extracts_and_normalizes_parameters() {
        let record: BuildRecord = serde_json::from_value(json!({
            "building": true,
            "actions": [
                {},
                null,
                {"_class": "hudson.model.CauseAction"},
                {"parameters": [
                    {"name": "BRANCH", "value": "main"},
                    {"name": "RETRIES", "value": 3},
                    {"name": "DEBUG", "value": false},
                    {"name": "TAGS", "value": ["a", "b"]},
                    {"name": "SKIPPED", "value": null},
                    {"value": "nameless"}
                ]}
            ]
        }))
        .unwrap();

        assert!(record.building);
        let p = &record.parameters;
        assert_eq!(p.len(), 4);
        assert_eq!(p.get("BRANCH"), Some("main"));
        assert_eq!(p.get("RETRIES"), Some("3"));
        assert_eq!(p.get("DEBUG"), Some("false"));
        assert_eq!(p.get("TAGS"), Some(r#"["a","b"]"#));
        assert_eq!(p.get("SKIPPED"), None);
    }

    #[test]
    fn build_status_tolerates_running_build() {
        let status: BuildStatus = serde_json::from_value(json!({
            "_class": "hudson.model.FreeStyleBuild",
            "number": 12,
            "building": true,
            "result": null,
            "url": "https://ci.example.com/job/demo/12/",
            "timestamp": 1_700_000_000_000_i64,
            "duration": 0,
            "estimatedDuration": 90_000
        }))
        .unwrap();
        assert_eq!(status.number, BuildNumber::new(12));
        assert!(status.building);
        assert_eq!(status.result, None);
        assert_eq!(status.estimated_duration_ms, Some(90_000));
    }
}
