// Job Definitions (what the protocol grammar service knows about a command)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute set of one message of a job definition.
///
/// Values are boolean-as-string (`"0"`, `"1"`); anything that does not start
/// with a non-zero integer counts as off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageAttributes(BTreeMap<String, String>);

impl MessageAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Boolean attribute with a default for when it is absent
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => leading_int(v) != 0,
            None => default,
        }
    }

    /// Per-message security and continuation flags
    pub fn message_flags(&self) -> MessageFlags {
        MessageFlags {
            sign: self.flag("sign", true),
            crypt: self.flag("crypt", true),
            no_sys_id: self.flag("nosysid", false),
            sign_seq_one: self.flag("signseqone", false),
            no_itan: self.flag("noitan", false),
            ignore_errors: self.flag("ignerrors", false),
        }
    }
}

/// Flags sampled from a message definition before building it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFlags {
    pub sign: bool,
    pub crypt: bool,
    pub no_sys_id: bool,
    pub sign_seq_one: bool,
    pub no_itan: bool,
    pub ignore_errors: bool,
}

/// atoi-style parse: optional sign and leading digits, 0 otherwise
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n: i64 = digits[..end].parse().unwrap_or(0);
    if neg {
        -n
    } else {
        n
    }
}

/// Description of one command at one protocol version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Job id, e.g. `JobGetBalance`
    pub name: String,
    /// Segment code, e.g. `HKSAL`
    pub code: String,
    /// Segment version
    pub version: u32,
    /// Name of the bank parameter group this job needs, if any
    #[serde(default)]
    pub params: Option<String>,
    /// Name of the response segment
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Attributes of the job node itself (single-message jobs)
    #[serde(default)]
    pub attributes: MessageAttributes,
    /// Sub-message definitions; non-empty means multi-message job
    #[serde(default)]
    pub messages: Vec<MessageAttributes>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, code: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            version,
            params: None,
            response: None,
            description: None,
            attributes: MessageAttributes::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn with_message(mut self, attrs: MessageAttributes) -> Self {
        self.messages.push(attrs);
        self
    }

    pub fn is_multi_message(&self) -> bool {
        !self.messages.is_empty()
    }
}
