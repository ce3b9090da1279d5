// Result Aggregator: classifies bank result codes and extracts them from response data

use super::audit_log::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code that marks a TAN challenge; never counted as a segment warning
pub const CODE_TAN_CHALLENGE: i32 = 3920;
/// "More data available", the parameter carries the attach point
pub const CODE_ATTACH_POINT: i32 = 3040;

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultScope {
    /// Per-segment result (`SegResult`)
    Segment,
    /// Per-message result (`MsgResult`)
    Message,
}

impl ResultScope {
    /// Name of the response-data group holding results of this scope
    pub fn group_name(&self) -> &'static str {
        match self {
            ResultScope::Segment => "SegResult",
            ResultScope::Message => "MsgResult",
        }
    }
}

/// Severity bucket of a result code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResultLevel {
    Info,
    Warning,
    Error,
}

impl ResultLevel {
    /// Severity used for the audit-log line of a result.
    ///
    /// Segment results exclude 3920 from the warning bucket, message results don't.
    pub fn classify(code: i32, scope: ResultScope) -> Self {
        if code >= 9000 {
            ResultLevel::Error
        } else if code >= 3000 && (scope == ResultScope::Message || code != CODE_TAN_CHALLENGE) {
            ResultLevel::Warning
        } else {
            ResultLevel::Info
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            ResultLevel::Info => LogLevel::Info,
            ResultLevel::Warning => LogLevel::Warning,
            ResultLevel::Error => LogLevel::Error,
        }
    }
}

/// Contribution of a single code to the job's aggregate flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultFlags {
    pub has_warnings: bool,
    pub has_errors: bool,
}

impl ResultFlags {
    pub fn for_code(code: i32, scope: ResultScope) -> Self {
        if code >= 9000 {
            return Self {
                has_warnings: false,
                has_errors: true,
            };
        }
        let warning = (3000..4000).contains(&code)
            && (scope == ResultScope::Message || code != CODE_TAN_CHALLENGE);
        Self {
            has_warnings: warning,
            has_errors: false,
        }
    }

    pub fn merge(&mut self, other: ResultFlags) {
        self.has_warnings |= other.has_warnings;
        self.has_errors |= other.has_errors;
    }
}

/// A single result reported by the bank. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankResult {
    code: i32,
    text: Option<String>,
    reference: Option<String>,
    param: Option<String>,
    is_msg_result: bool,
}

impl BankResult {
    pub fn new(
        code: i32,
        text: Option<String>,
        reference: Option<String>,
        param: Option<String>,
        scope: ResultScope,
    ) -> Self {
        Self {
            code,
            text,
            reference,
            param,
            is_msg_result: scope == ResultScope::Message,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn is_msg_result(&self) -> bool {
        self.is_msg_result
    }

    pub fn scope(&self) -> ResultScope {
        if self.is_msg_result {
            ResultScope::Message
        } else {
            ResultScope::Segment
        }
    }

    pub fn level(&self) -> ResultLevel {
        ResultLevel::classify(self.code, self.scope())
    }

    /// Audit-log text, e.g. `SegResult: 3010(No entries)`
    pub fn log_text(&self) -> String {
        match &self.text {
            Some(t) => format!("{}: {}({})", self.scope().group_name(), self.code, t),
            None => format!("{}: {}", self.scope().group_name(), self.code),
        }
    }
}

/// Extract the results of one response-data group.
///
/// Looks for `SegResult` first and falls back to `MsgResult`; returns an empty
/// list when the group carries neither.
pub fn extract_results(data: &Value) -> Vec<BankResult> {
    for scope in [ResultScope::Segment, ResultScope::Message] {
        if let Some(group) = data.get(scope.group_name()) {
            return entries(group)
                .into_iter()
                .map(|entry| {
                    BankResult::new(
                        int_value(entry.get("resultcode")),
                        str_value(entry.get("text")),
                        str_value(entry.get("ref")),
                        str_value(entry.get("param")),
                        scope,
                    )
                })
                .collect();
        }
    }
    Vec::new()
}

/// True if any SegResult/MsgResult entry of `data` carries `code`
pub fn contains_code(data: &Value, code: i32) -> bool {
    [ResultScope::Segment, ResultScope::Message]
        .iter()
        .filter_map(|scope| data.get(scope.group_name()))
        .flat_map(entries)
        .any(|entry| int_value(entry.get("resultcode")) == code)
}

/// `result` children of a result group; a single object counts as one entry
fn entries(group: &Value) -> Vec<&Value> {
    match group.get("result") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::Object(_)) => vec![v],
        _ => Vec::new(),
    }
}

/// Integer value, accepting numbers and numeric strings; anything else is 0
pub(crate) fn int_value(v: Option<&Value>) -> i32 {
    match v {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn str_value(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
