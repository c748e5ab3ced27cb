use crate::Error;
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use std::fmt;

/// A credential that never prints itself.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// HTTP basic authentication with a Jenkins user and API token.
#[derive(Clone, Debug)]
pub struct Auth {
    user: String,
    token: SecretString,
}

impl Auth {
    #[must_use]
    pub fn basic(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: SecretString::new(token),
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn secret(&self) -> &str {
        self.token.expose()
    }

    pub(crate) fn apply(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        let raw = format!(
            "Basic {}",
            B64.encode(format!("{}:{}", self.user, self.token.expose()))
        );
        let value = HeaderValue::from_str(&raw).map_err(|err| Error::InvalidConfig {
            message: "invalid Authorization header value".into(),
            source: Some(Box::new(err)),
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl From<&crate::config::Credentials> for Auth {
    fn from(creds: &crate::config::Credentials) -> Self {
        Self {
            user: creds.user.clone(),
            token: creds.token.clone(),
        }
    }
}
