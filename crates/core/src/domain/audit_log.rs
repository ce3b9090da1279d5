//! Per-job audit log.
//!
//! Lines have the form `<severity>:<YYYYMMDD>:<hhmmss>:<component>:<text>`,
//! where severity is a two-digit level and both component and text are
//! escaped so that `:` never appears inside a field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an audit-log line (numeric values are written into the line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
    Verbose = 8,
}

impl LogLevel {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => LogLevel::Emergency,
            1 => LogLevel::Alert,
            2 => LogLevel::Critical,
            3 => LogLevel::Error,
            4 => LogLevel::Warning,
            5 => LogLevel::Notice,
            6 => LogLevel::Info,
            7 => LogLevel::Debug,
            8 => LogLevel::Verbose,
            _ => return None,
        })
    }
}

/// Append-only list of formatted log lines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    component: String,
    lines: Vec<String>,
}

impl AuditLog {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            lines: Vec::new(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Append a line stamped with `now_millis` (UTC)
    pub fn append(&mut self, level: LogLevel, now_millis: i64, text: &str) {
        let stamp = DateTime::<Utc>::from_timestamp_millis(now_millis)
            .unwrap_or_default()
            .format("%Y%m%d:%H%M%S");
        let line = format!(
            "{:02}:{}:{}:{}",
            level as u8,
            stamp,
            escape_tolerant(&self.component),
            escape_tolerant(text)
        );
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Parsed view of one audit-log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub date: String,
    pub time: String,
    pub component: String,
    pub text: String,
}

impl LogLine {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(5, ':');
        let level = LogLevel::from_code(parts.next()?.parse().ok()?)?;
        let date = parts.next()?.to_string();
        let time = parts.next()?.to_string();
        let component = unescape(parts.next()?)?;
        let text = unescape(parts.next()?)?;
        Some(Self {
            level,
            date,
            time,
            component,
            text,
        })
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} {} {}", self.level, self.date, self.time, self.text)
    }
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b" -_.,;!?()[]'\"/+*#=@<>&".contains(&b)
}

/// Percent-escape every byte outside the plain set; never fails
pub fn escape_tolerant(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn unescape(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
