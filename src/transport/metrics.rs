use crate::ErrorKind;
use http::{Method, StatusCode};
use std::time::Duration;

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

fn error_kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Auth => "auth",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Api => "api",
        ErrorKind::RebuildRejected => "rebuild_rejected",
        ErrorKind::Transport => "transport",
        ErrorKind::Decode => "decode",
        ErrorKind::InvalidConfig => "invalid_config",
        ErrorKind::InvalidJob => "invalid_job",
        ErrorKind::Usage => "usage",
        ErrorKind::Io => "io",
    }
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        _ => "other",
    }
}

pub(crate) fn record_outcome(
    method: &Method,
    status: Option<StatusCode>,
    latency: Duration,
    error_kind: Option<ErrorKind>,
) {
    let method = method_label(method);
    let status_class = status.map(status_class).unwrap_or("transport");

    metrics::counter!(
        "jenkins_build_control_requests_total",
        "method" => method,
        "status_class" => status_class
    )
    .increment(1);
    metrics::histogram!(
        "jenkins_build_control_request_duration_seconds",
        "method" => method,
        "status_class" => status_class
    )
    .record(latency);

    if let Some(kind) = error_kind {
        metrics::counter!(
            "jenkins_build_control_errors_total",
            "method" => method,
            "kind" => error_kind_label(kind)
        )
        .increment(1);
    }
}

/// One iteration of a queue or build poll loop.
pub(crate) fn record_poll(loop_name: &'static str) {
    metrics::counter!("jenkins_build_control_polls_total", "loop" => loop_name).increment(1);
}
