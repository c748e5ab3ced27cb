//! Credential resolution.
//!
//! Values come from an explicit flag first, then from an [`Environment`]: the
//! process environment layered over an optional `.env` file. The environment
//! is a plain value so callers (and tests) decide what it contains.

use crate::{Error, SecretString};
use std::{collections::HashMap, fs, io, path::Path};

pub const URL_VAR: &str = "JENKINS_URL";
pub const USER_VAR: &str = "JENKINS_USER";
pub const TOKEN_VAR: &str = "JENKINS_TOKEN";

/// An immutable snapshot of environment variables.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Snapshot of the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Layer a `KEY=VALUE` env file underneath the current values.
    ///
    /// A missing file is not an error; keys that are already set are kept.
    pub fn with_env_file(mut self, path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(self),
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        for (key, value) in parse_env_file(&text) {
            self.vars.entry(key).or_insert(value);
        }
        Ok(self)
    }

    /// Non-empty value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

fn parse_env_file(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_owned(), unquote(value.trim()).to_owned()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Values given on the command line; each one overrides the environment.
#[derive(Clone, Debug, Default)]
pub struct CredentialOverrides {
    pub base_url: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
}

/// Jenkins location and identity for one invocation.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Base URL without trailing `/`.
    pub base_url: String,
    pub user: String,
    pub token: SecretString,
}

impl Credentials {
    pub fn resolve(overrides: CredentialOverrides, env: &Environment) -> Result<Self, Error> {
        let base_url = required(overrides.base_url, URL_VAR, env)?;
        let user = required(overrides.user, USER_VAR, env)?;
        let token = required(overrides.token, TOKEN_VAR, env)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            user,
            token: SecretString::new(token),
        })
    }
}

fn required(explicit: Option<String>, var: &str, env: &Environment) -> Result<String, Error> {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| env.get(var).map(ToOwned::to_owned))
        .ok_or_else(|| Error::config(format!("Missing required value for {var}.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env() -> Environment {
        Environment::from_pairs([
            (URL_VAR, "https://ci.example.com/"),
            (USER_VAR, "env-user"),
            (TOKEN_VAR, "env-token"),
        ])
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let creds = Credentials::resolve(
            CredentialOverrides {
                user: Some("flag-user".into()),
                ..CredentialOverrides::default()
            },
            &env(),
        )
        .unwrap();
        assert_eq!(creds.base_url, "https://ci.example.com");
        assert_eq!(creds.user, "flag-user");
        assert_eq!(creds.token.expose(), "env-token");
    }

    #[test]
    fn missing_value_is_a_configuration_error() {
        let env = Environment::from_pairs([(URL_VAR, "https://ci"), (USER_VAR, "u"), (TOKEN_VAR, "")]);
        let err = Credentials::resolve(CredentialOverrides::default(), &env).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidConfig);
        assert!(err.to_string().contains(TOKEN_VAR));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn env_file_fills_gaps_without_overriding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# jenkins\n\nJENKINS_USER=file-user\nJENKINS_TOKEN=\"quoted token\"\nEXTRA='x=y'\nbroken line"
        )
        .unwrap();

        let env = Environment::from_pairs([(USER_VAR, "process-user")])
            .with_env_file(file.path())
            .unwrap();
        assert_eq!(env.get(USER_VAR), Some("process-user"));
        assert_eq!(env.get(TOKEN_VAR), Some("quoted token"));
        assert_eq!(env.get("EXTRA"), Some("x=y"));
        assert_eq!(env.get("broken line"), None);
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default()
            .with_env_file(&dir.path().join("absent.env"))
            .unwrap();
        assert_eq!(env.get(URL_VAR), None);
    }
}
