//! Message: one outbound or inbound protocol message of a dialog.
//!
//! The message owns its segments, signer list and crypter and enforces the
//! security contract at the codec boundary: a message flagged to sign must
//! finish encoding with at least one signer, a message flagged to crypt must
//! finish with a crypter. Actual encoding, signing and encryption happen in the
//! grammar and crypto collaborators (see `application::dialog`).

use super::error::{DomainError, Result};
use super::response::{KeyId, ResponseGroup, SecurityInfo};
use super::result::{extract_results, BankResult, ResultFlags, ResultScope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Segment number of the message header
const HEADER_SEGMENT: u32 = 1;

/// One segment of an outbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundSegment {
    /// Segment number inside the message
    pub number: u32,
    /// Segment code, e.g. `HKSAL`
    pub code: String,
    pub version: u32,
    pub data: Value,
}

/// What the grammar service needs to render a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub dialog_id: String,
    pub msg_num: u32,
    pub hbci_version: u32,
    pub segments: Vec<OutboundSegment>,
    pub tan: Option<String>,
    pub no_sys_id: bool,
}

/// Decoded inbound message as produced by the grammar service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub dialog_id: String,
    pub msg_num: u32,
    /// Number of the request message this answers
    pub msg_ref: Option<u32>,
    pub segments: Vec<ResponseGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outbound,
    Inbound,
}

#[derive(Debug, Clone)]
pub struct Message {
    direction: Direction,
    dialog_id: String,
    msg_num: u32,
    msg_ref: Option<u32>,
    hbci_version: u32,

    // Outbound content
    segments: Vec<OutboundSegment>,
    last_segment: u32,
    reserved_slot: Option<u32>,

    // Inbound content
    response: Vec<ResponseGroup>,
    results: Vec<BankResult>,
    result_flags: ResultFlags,

    // Security
    sign: bool,
    crypt: bool,
    signers: Vec<KeyId>,
    crypter: Option<KeyId>,

    buffer: Vec<u8>,
    encoded: bool,

    tan: Option<String>,
    needs_tan: bool,
    no_sys_id: bool,
}

impl Message {
    /// Create an empty outbound message for `dialog_id`
    pub fn new(dialog_id: impl Into<String>, msg_num: u32, hbci_version: u32) -> Self {
        Self {
            direction: Direction::Outbound,
            dialog_id: dialog_id.into(),
            msg_num,
            msg_ref: None,
            hbci_version,
            segments: Vec::new(),
            last_segment: HEADER_SEGMENT,
            reserved_slot: None,
            response: Vec::new(),
            results: Vec::new(),
            result_flags: ResultFlags::default(),
            sign: false,
            crypt: false,
            signers: Vec::new(),
            crypter: None,
            buffer: Vec::new(),
            encoded: false,
            tan: None,
            needs_tan: false,
            no_sys_id: false,
        }
    }

    /// Build an inbound message from decoded data and the verified security block
    pub fn from_response(raw: Vec<u8>, decoded: DecodedMessage, security: SecurityInfo) -> Self {
        let mut msg = Self::new(decoded.dialog_id, decoded.msg_num, 0);
        msg.direction = Direction::Inbound;
        msg.msg_ref = decoded.msg_ref;
        msg.buffer = raw;
        msg.signers = security.signers.clone();
        msg.crypter = security.crypter.clone();
        msg.response = decoded
            .segments
            .into_iter()
            .map(|g| g.with_security(security.clone()))
            .collect();

        for group in &msg.response {
            if group.data.get(ResultScope::Message.group_name()).is_none() {
                continue;
            }
            for r in extract_results(&group.data) {
                msg.result_flags.merge(ResultFlags::for_code(r.code(), r.scope()));
                msg.results.push(r);
            }
        }
        debug!(
            dialog_id = %msg.dialog_id,
            msg_num = msg.msg_num,
            msg_ref = ?msg.msg_ref,
            signers = msg.signers.len(),
            "Decoded inbound message"
        );
        msg
    }

    // ------------------------------------------------------------------
    // Identity and correlation
    // ------------------------------------------------------------------

    pub fn dialog_id(&self) -> &str {
        &self.dialog_id
    }

    pub fn msg_num(&self) -> u32 {
        self.msg_num
    }

    pub fn msg_ref(&self) -> Option<u32> {
        self.msg_ref
    }

    pub fn set_msg_ref(&mut self, msg_ref: u32) {
        self.msg_ref = Some(msg_ref);
    }

    pub fn hbci_version(&self) -> u32 {
        self.hbci_version
    }

    pub fn set_hbci_version(&mut self, v: u32) {
        self.hbci_version = v;
    }

    /// Correlation is by sequence number only
    pub fn is_response_to(&self, request: &Message) -> bool {
        self.direction == Direction::Inbound && self.msg_ref == Some(request.msg_num)
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Append a segment; returns its segment number
    pub fn add_node(&mut self, code: impl Into<String>, version: u32, data: Value) -> Result<u32> {
        self.ensure_mutable()?;
        self.last_segment += 1;
        let number = self.last_segment;
        self.segments.push(OutboundSegment {
            number,
            code: code.into(),
            version,
            data,
        });
        Ok(number)
    }

    /// Reserve the next segment number for a later `insert_node`
    pub fn enable_insert(&mut self) -> Result<u32> {
        self.ensure_mutable()?;
        if self.reserved_slot.is_some() {
            return Err(DomainError::InvalidState("insert position already reserved".into()));
        }
        self.last_segment += 1;
        self.reserved_slot = Some(self.last_segment);
        Ok(self.last_segment)
    }

    /// Fill the reserved position, keeping it ahead of later segments
    pub fn insert_node(&mut self, code: impl Into<String>, version: u32, data: Value) -> Result<u32> {
        self.ensure_mutable()?;
        let number = self
            .reserved_slot
            .take()
            .ok_or_else(|| DomainError::InvalidState("no insert position reserved".into()))?;
        let pos = self
            .segments
            .iter()
            .position(|s| s.number > number)
            .unwrap_or(self.segments.len());
        self.segments.insert(
            pos,
            OutboundSegment {
                number,
                code: code.into(),
                version,
                data,
            },
        );
        Ok(number)
    }

    pub fn segments(&self) -> &[OutboundSegment] {
        &self.segments
    }

    pub fn current_segment_number(&self) -> u32 {
        self.last_segment
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.direction == Direction::Inbound || self.encoded {
            return Err(DomainError::InvalidState(format!(
                "message {} can no longer be modified",
                self.msg_num
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Security
    // ------------------------------------------------------------------

    pub fn set_sign(&mut self, sign: bool) {
        self.sign = sign;
    }

    pub fn set_crypt(&mut self, crypt: bool) {
        self.crypt = crypt;
    }

    pub fn needs_sign(&self) -> bool {
        self.sign
    }

    pub fn needs_crypt(&self) -> bool {
        self.crypt
    }

    /// Add a signer; returns false if it was already present
    pub fn add_signer(&mut self, key: KeyId) -> bool {
        if self.signers.iter().any(|k| k.matches(key.as_str())) {
            return false;
        }
        self.signers.push(key);
        true
    }

    pub fn signers(&self) -> &[KeyId] {
        &self.signers
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    pub fn is_signed_by(&self, key: &str) -> bool {
        self.signers.iter().any(|k| k.matches(key))
    }

    pub fn crypter(&self) -> Option<&KeyId> {
        self.crypter.as_ref()
    }

    pub fn set_crypter(&mut self, key: Option<KeyId>) {
        self.crypter = key;
    }

    /// Security block of an inbound message
    pub fn security(&self) -> SecurityInfo {
        SecurityInfo::new(self.signers.clone(), self.crypter.clone())
    }

    // ------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------

    pub fn draft(&self) -> MessageDraft {
        MessageDraft {
            dialog_id: self.dialog_id.clone(),
            msg_num: self.msg_num,
            hbci_version: self.hbci_version,
            segments: self.segments.clone(),
            tan: self.tan.clone(),
            no_sys_id: self.no_sys_id,
        }
    }

    /// Take the final wire bytes and check the security postconditions
    pub fn finish_encoding(&mut self, buffer: Vec<u8>) -> Result<()> {
        self.ensure_mutable()?;
        if self.reserved_slot.is_some() {
            return Err(DomainError::InvalidState(
                "reserved insert position was never filled".into(),
            ));
        }
        if self.sign && self.signers.is_empty() {
            warn!(msg_num = self.msg_num, "Message needs signature but has no signer");
            return Err(DomainError::SecurityViolation(
                "message must be signed but has no signer".into(),
            ));
        }
        if self.crypt && self.crypter.is_none() {
            warn!(msg_num = self.msg_num, "Message needs encryption but has no crypter");
            return Err(DomainError::SecurityViolation(
                "message must be encrypted but has no crypter".into(),
            ));
        }
        self.buffer = buffer;
        self.encoded = true;
        Ok(())
    }

    pub fn is_encoded(&self) -> bool {
        self.encoded
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    // ------------------------------------------------------------------
    // TAN and system id
    // ------------------------------------------------------------------

    pub fn tan(&self) -> Option<&str> {
        self.tan.as_deref()
    }

    pub fn set_tan(&mut self, tan: Option<String>) {
        self.tan = tan;
    }

    pub fn needs_tan(&self) -> bool {
        self.needs_tan
    }

    pub fn set_needs_tan(&mut self, v: bool) {
        self.needs_tan = v;
    }

    pub fn no_sys_id(&self) -> bool {
        self.no_sys_id
    }

    pub fn set_no_sys_id(&mut self, v: bool) {
        self.no_sys_id = v;
    }

    // ------------------------------------------------------------------
    // Inbound diagnostics
    // ------------------------------------------------------------------

    pub fn response_segments(&self) -> &[ResponseGroup] {
        &self.response
    }

    /// Message-level results of an inbound message
    pub fn results(&self) -> &[BankResult] {
        &self.results
    }

    pub fn has_warnings(&self) -> bool {
        self.result_flags.has_warnings
    }

    pub fn has_errors(&self) -> bool {
        self.result_flags.has_errors
    }

    /// Highest message-level result code, 0 if none
    pub fn result_code(&self) -> i32 {
        self.results.iter().map(|r| r.code()).max().unwrap_or(0)
    }
}
