// Job Status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a job
///
/// `ToDo` is the initial state. `Unknown` and `Error` are failure sentinels:
/// a job in either state never requests another sub-message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Unknown,
    ToDo,
    Enqueued,
    Encoded,
    Sent,
    Answered,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Unknown => "unknown",
            JobStatus::ToDo => "todo",
            JobStatus::Enqueued => "enqueued",
            JobStatus::Encoded => "encoded",
            JobStatus::Sent => "sent",
            JobStatus::Answered => "answered",
            JobStatus::Error => "error",
        }
    }

    /// Failure sentinels (`Unknown`, `Error`)
    pub fn is_failed(&self) -> bool {
        matches!(self, JobStatus::Unknown | JobStatus::Error)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(JobStatus::Unknown),
            "todo" => Ok(JobStatus::ToDo),
            "enqueued" => Ok(JobStatus::Enqueued),
            "encoded" => Ok(JobStatus::Encoded),
            "sent" => Ok(JobStatus::Sent),
            "answered" => Ok(JobStatus::Answered),
            "error" => Ok(JobStatus::Error),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status query filter; `All` is the wildcard and is never stored on a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatusFilter {
    All,
    Only(JobStatus),
}

impl JobStatusFilter {
    pub fn matches(&self, status: JobStatus) -> bool {
        match self {
            JobStatusFilter::All => true,
            JobStatusFilter::Only(s) => *s == status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatusFilter::All => "any",
            JobStatusFilter::Only(s) => s.as_str(),
        }
    }
}

impl From<JobStatus> for JobStatusFilter {
    fn from(status: JobStatus) -> Self {
        JobStatusFilter::Only(status)
    }
}

/// Events that drive a job through a message round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// Job was put into a dialog queue (or a new round starts)
    Enqueue,
    /// Job was encoded into a message
    Encode,
    /// Message carrying the job was sent
    Send,
    /// Response for the job arrived
    Answer,
    /// Fatal error
    Fail,
}

impl JobStatus {
    /// Total transition function; events that do not apply leave the status unchanged
    pub fn next(self, event: JobEvent) -> JobStatus {
        use JobStatus::*;
        match (self, event) {
            (Error, _) => Error,
            (_, JobEvent::Fail) => Error,
            (Unknown, _) => Unknown,
            (ToDo | Enqueued | Answered, JobEvent::Enqueue) => Enqueued,
            (Enqueued | Answered, JobEvent::Encode) => Encoded,
            (Encoded, JobEvent::Send) => Sent,
            (Sent, JobEvent::Answer) => Answered,
            (current, _) => current,
        }
    }
}
