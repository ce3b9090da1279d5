// Decoded response data and security blocks

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Key identity of a signer or crypter.
///
/// The crypto collaborator reports keys it could not verify with a leading
/// `!` (explicitly invalid) or `?` (unknown key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Marked as explicitly invalid (`!`)
    pub fn is_invalid(&self) -> bool {
        self.0.starts_with('!')
    }

    /// Marked as invalid (`!`) or unknown (`?`)
    pub fn is_sentinel(&self) -> bool {
        self.0.starts_with('!') || self.0.starts_with('?')
    }

    /// Case-insensitive identity comparison
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Security block of an inbound message: who signed it and who encrypted it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    #[serde(default)]
    pub signers: Vec<KeyId>,
    #[serde(default)]
    pub crypter: Option<KeyId>,
}

impl SecurityInfo {
    pub fn new(signers: Vec<KeyId>, crypter: Option<KeyId>) -> Self {
        Self { signers, crypter }
    }
}

/// One response group routed to a job: the decoded segment data of one sub-message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseGroup {
    /// Segment name, e.g. `SegResult` or `BalanceResponse`
    pub name: String,
    /// Segment number in the response message
    pub segment: u32,
    /// Segment number of the request segment this answers
    pub reference_segment: Option<u32>,
    /// Decoded segment content
    pub data: Value,
    /// Security block of the message this group was part of
    pub security: Option<SecurityInfo>,
}

impl ResponseGroup {
    pub fn new(name: impl Into<String>, segment: u32, data: Value) -> Self {
        Self {
            name: name.into(),
            segment,
            reference_segment: None,
            data,
            security: None,
        }
    }

    pub fn with_reference(mut self, reference_segment: u32) -> Self {
        self.reference_segment = Some(reference_segment);
        self
    }

    pub fn with_security(mut self, security: SecurityInfo) -> Self {
        self.security = Some(security);
        self
    }
}
