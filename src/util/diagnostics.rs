use crate::{Auth, BodySnippetConfig};
use http::HeaderMap;

use super::redact::{redact_text, truncate_utf8};

pub(crate) fn request_id(headers: &HeaderMap) -> Option<Box<str>> {
    ["x-request-id", "x-correlation-id"]
        .into_iter()
        .filter_map(|name| headers.get(name).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(|value| value.to_string().into_boxed_str())
}

/// Pull a one-line reason out of an error body.
///
/// Jenkins answers API errors either as JSON (`message`/`error`) or as an HTML
/// error page, in which case the `<title>` is the most useful line.
pub(crate) fn extract_message(body: &[u8]) -> Option<Box<str>> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        return ["message", "error", "errorMessage"]
            .into_iter()
            .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|msg| !msg.is_empty())
            .map(|msg| msg.to_string().into_boxed_str());
    }

    let text = String::from_utf8_lossy(body);
    let start = text.find("<title>")? + "<title>".len();
    let end = text[start..].find("</title>")? + start;
    let title = text[start..end].trim();
    (!title.is_empty()).then(|| title.to_string().into_boxed_str())
}

pub(crate) fn body_snippet(
    body: &[u8],
    config: BodySnippetConfig,
    auth: Option<&Auth>,
) -> Option<Box<str>> {
    if body.is_empty() {
        return None;
    }

    let body = String::from_utf8_lossy(body);
    let snippet = truncate_utf8(&body, config.max_bytes).to_string();
    Some(redact_text(snippet, auth).into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_message_reads_json_and_html_titles() {
        assert_eq!(
            extract_message(br#"{"message":" queue not found "}"#).as_deref(),
            Some("queue not found")
        );
        assert_eq!(
            extract_message(b"<html><head><title>Error 404 Not Found</title></head></html>")
                .as_deref(),
            Some("Error 404 Not Found")
        );
        assert_eq!(extract_message(b"plain text"), None);
    }

    #[test]
    fn body_snippet_is_truncated_and_redacted() {
        let auth = Auth::basic("user", "tok");
        let config = BodySnippetConfig { max_bytes: 9 };
        assert_eq!(
            body_snippet(b"tok: denied forever", config, Some(&auth)).as_deref(),
            Some("<redacted>: deni")
        );
        assert_eq!(body_snippet(b"", config, None), None);
    }
}
