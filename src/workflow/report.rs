//! `key=value` progress lines for whoever drives the workflow.

use crate::{BuildStatus, Error, QueueItem};
use chrono::{Local, TimeZone};
use std::{
    fmt::Display,
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

/// Line-oriented report writer.
pub struct Report<W> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: impl Display) -> Result<(), Error> {
        writeln!(self.out, "{text}").map_err(Error::Report)
    }

    pub fn field(&mut self, key: &str, value: impl Display) -> Result<(), Error> {
        self.line(format_args!("{key}={value}"))
    }

    pub fn build_status(&mut self, status: &BuildStatus) -> Result<(), Error> {
        self.build_status_at(status, now_ms())
    }

    fn build_status_at(&mut self, status: &BuildStatus, now_ms: i64) -> Result<(), Error> {
        self.field("build_number", status.number)?;
        self.field("building", status.building)?;
        self.field("result", status.result.as_deref().unwrap_or("none"))?;
        if !status.url.is_empty() {
            self.field("url", &status.url)?;
        }
        let start_ms = status.start_timestamp_ms;
        if start_ms > 0 {
            if let Some(start) = Local.timestamp_millis_opt(start_ms).single() {
                self.field("start_time", start.format("%Y-%m-%d %H:%M:%S"))?;
            }
            self.field("elapsed_seconds", (now_ms - start_ms).max(0) / 1000)?;
        }
        if let Some(estimated) = status.estimated_duration_ms {
            self.field("estimated_duration_seconds", estimated / 1000)?;
        }
        if let Some(duration) = status.duration_ms {
            self.field("duration_seconds", duration / 1000)?;
        }
        Ok(())
    }

    pub fn queue_item(&mut self, item: &QueueItem) -> Result<(), Error> {
        self.field("queue_cancelled", item.cancelled)?;
        if let Some(why) = item.why.as_deref().filter(|why| !why.is_empty()) {
            self.field("queue_why", why)?;
        }
        match item.build_number() {
            Some(number) => {
                self.field("queue_executable", true)?;
                self.field("queue_build_number", number)?;
            }
            None => self.field("queue_executable", false)?,
        }
        if let Some(url) = item.build_url() {
            self.field("queue_build_url", url)?;
        }
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
