//! Job Domain Model
//!
//! A job is the unit of work of a dialog: one banking command (or a batch of
//! commands) that is carried out in one or more messages. The job tracks its
//! lifecycle status, the security requirements of the message currently being
//! built, the accumulated responses and results, and the domain transactions
//! whose status mirrors its own.

use super::audit_log::{AuditLog, LogLevel};
use super::definition::{JobDefinition, MessageAttributes, MessageFlags};
use super::error::{DomainError, Result};
use super::job_status::{JobEvent, JobStatus};
use super::response::{KeyId, ResponseGroup, SecurityInfo};
use super::result::{
    contains_code, extract_results, int_value, BankResult, ResultFlags, ResultScope,
    CODE_ATTACH_POINT, CODE_TAN_CHALLENGE,
};
use super::sepa::ExportProfile;
use super::transaction::{AccountStatus, Transaction, TransactionCommand, TransactionStatus};
use super::user::{CryptMode, User, UserId};
use crate::port::TimeProvider;
use serde_json::Value;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dialog-scoped job id
pub type JobId = u32;

// ============================================================================
// Flags
// ============================================================================

/// Multi-message continuation state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuationFlags {
    /// Job definition declares sub-messages
    pub multi_msg: bool,
    /// A response left a continuation cursor
    pub has_attach_point: bool,
    /// Another sub-message is required
    pub has_more_msgs: bool,
    /// Errors of continuation messages are ignored
    pub ignore_errors: bool,
}

/// Security requirements of the message currently being built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityFlags {
    pub needs_sign: bool,
    pub sign: bool,
    pub needs_crypt: bool,
    pub crypt: bool,
    pub no_sys_id: bool,
    pub sign_seq_one: bool,
    pub needs_tan: bool,
    pub tan_used: bool,
    pub no_itan: bool,
}

/// Queue/outbox bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub processed: bool,
    pub committed: bool,
    pub outbox: bool,
    pub ignore_accounts: bool,
    pub attachable: bool,
    pub single: bool,
    pub dialog_job: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFlags {
    pub continuation: ContinuationFlags,
    pub security: SecurityFlags,
    pub lifecycle: LifecycleFlags,
    pub results: ResultFlags,
}

// ============================================================================
// Behaviour (command-specific virtual functions)
// ============================================================================

/// Command-specific behaviour of a job
pub trait JobBehavior: Send + Sync {
    /// Fill the job arguments for the next (sub-)message.
    ///
    /// `user` is the dialog's current view of the user, including account
    /// data refreshed since the job was created.
    fn prepare(&self, _job: &mut Job, _user: &User) -> Result<()> {
        Ok(())
    }

    /// Custom continuation hook.
    ///
    /// `None` means the job has no hook. `Some(Ok(false))` stops the job,
    /// `Some(Ok(true))` lets the generic continuation rules decide, and an
    /// error aborts the job.
    fn has_more(&self, _job: &mut Job) -> Option<Result<bool>> {
        None
    }

    /// Fold the accumulated responses into domain data
    fn process(&self, _job: &mut Job) -> Result<()> {
        Ok(())
    }
}

/// Outcome of `Job::prepare_next_message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextMessage {
    /// Job is finished, no further sub-message
    Finished,
    /// Another sub-message is required
    More,
}

/// Outcome of a signature check that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    /// No signature expected (PIN/TAN, no expected signer, or exempted user)
    NotRequired,
    /// Signed by the expected key
    Verified,
    /// Signed by a valid key other than the expected one, accepted anyway
    AcceptedOther(KeyId),
    /// No signature at all; needs a trust decision
    Unsigned,
}

/// Decision on an unsigned response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    AcceptOnce,
    /// Accept and exempt the user from bank signatures from now on
    AcceptAlways,
    Abort,
}

// ============================================================================
// Job
// ============================================================================

pub struct Job {
    // Identity
    id: JobId,
    name: String,
    code: String,
    response_name: Option<String>,
    description: Option<String>,
    segment_version: u32,
    hbci_version: u32,

    status: JobStatus,
    flags: JobFlags,

    // Segment range inside the current message
    first_segment: u32,
    last_segment: u32,

    // Security
    signers: Vec<KeyId>,
    expected_signer: Option<KeyId>,
    expected_crypter: Option<KeyId>,
    min_signatures: u32,
    security_profile: u32,
    security_class: u32,

    // Protocol state
    definition: JobDefinition,
    msg_cursor: usize,
    params: Value,
    arguments: Value,
    responses: Vec<ResponseGroup>,
    sampled_responses: usize,
    attach_point: Option<String>,

    // Results
    seg_results: Vec<BankResult>,
    msg_results: Vec<BankResult>,

    log: AuditLog,
    clock: Arc<dyn TimeProvider>,

    // Domain linkage
    user_id: UserId,
    commands: Vec<Transaction>,
    max_transfers: usize,
    transfer_count: usize,
    supported_command: TransactionCommand,
    account_status: Option<AccountStatus>,
    imported: Vec<Transaction>,

    // SEPA
    sepa_profile: Option<ExportProfile>,
    sepa_descriptors: Option<Vec<String>>,

    // Dialog context
    dialog_id: Option<String>,
    msg_num: u32,
    jobs_per_msg: u32,
    challenge_class: u32,
    challenge_params: Vec<String>,
    used_tan: Option<String>,

    behavior: Option<Arc<dyn JobBehavior>>,
}

impl Job {
    /// Create a job from its definition and the matching bank parameter group.
    ///
    /// # Arguments
    ///
    /// * `definition` - Job definition for the selected protocol version
    /// * `params` - Bank parameter group for this job (`Value::Null` if none)
    /// * `user` - Owning user
    /// * `clock` - Time source for audit-log stamps (injected)
    /// * `component` - Component name written into audit-log lines
    pub fn new(
        definition: JobDefinition,
        params: Value,
        user: &User,
        clock: Arc<dyn TimeProvider>,
        component: &str,
    ) -> Self {
        let min_signatures = non_negative(int_value(params.get("minsigs")));
        let security_class = non_negative(int_value(params.get("secclass")));
        let jobs_per_msg = non_negative(int_value(params.get("jobspermsg")));
        let security_profile = match non_negative(int_value(params.get("secprofile"))) {
            0 => 1,
            p => p,
        };

        let top = definition.attributes.clone();
        let mut job = Self {
            id: 0,
            name: definition.name.clone(),
            code: definition.code.clone(),
            response_name: definition.response.clone(),
            description: definition.description.clone(),
            segment_version: definition.version,
            hbci_version: user.effective_hbci_version(),
            status: JobStatus::ToDo,
            flags: JobFlags::default(),
            first_segment: 0,
            last_segment: 0,
            signers: Vec::new(),
            expected_signer: None,
            expected_crypter: None,
            min_signatures,
            security_profile,
            security_class,
            definition,
            msg_cursor: 0,
            params,
            arguments: Value::Object(Default::default()),
            responses: Vec::new(),
            sampled_responses: 0,
            attach_point: None,
            seg_results: Vec::new(),
            msg_results: Vec::new(),
            log: AuditLog::new(component),
            clock,
            user_id: user.id.clone(),
            commands: Vec::new(),
            max_transfers: 1,
            transfer_count: 0,
            supported_command: TransactionCommand::None,
            account_status: None,
            imported: Vec::new(),
            sepa_profile: None,
            sepa_descriptors: None,
            dialog_id: None,
            msg_num: 0,
            jobs_per_msg,
            challenge_class: 0,
            challenge_params: Vec::new(),
            used_tan: None,
            behavior: None,
        };

        job.flags.lifecycle.attachable = top.flag("attachable", false);
        job.flags.lifecycle.single = top.flag("single", false);
        job.flags.lifecycle.dialog_job = top.flag("dlg", false);
        job.flags.lifecycle.ignore_accounts = top.flag("ignoreaccounts", false);
        job.flags.security.needs_tan = top.flag("needtan", false);
        job.flags.continuation.multi_msg = job.definition.is_multi_message();

        let first = job.definition.messages.first().cloned().unwrap_or(top);
        job.apply_message_flags(&first);

        if user.crypt_mode != CryptMode::Pintan {
            job.expected_signer = user.bank_sign_key.clone();
            job.expected_crypter = user.bank_crypt_key.clone();
        }

        debug!(
            job = %job.name,
            code = %job.code,
            version = job.segment_version,
            multi_msg = job.flags.continuation.multi_msg,
            "Job created"
        );
        job
    }

    pub fn with_behavior(mut self, behavior: Arc<dyn JobBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn behavior(&self) -> Option<Arc<dyn JobBehavior>> {
        self.behavior.clone()
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn response_name(&self) -> Option<&str> {
        self.response_name.as_deref()
    }

    pub fn set_response_name(&mut self, name: Option<String>) {
        self.response_name = name;
    }

    /// Description, falling back to the job name
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub fn segment_version(&self) -> u32 {
        self.segment_version
    }

    pub fn hbci_version(&self) -> u32 {
        self.hbci_version
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn definition(&self) -> &JobDefinition {
        &self.definition
    }

    /// Attributes of the message currently being built
    pub fn current_message(&self) -> Option<&MessageAttributes> {
        if self.flags.continuation.multi_msg {
            self.definition.messages.get(self.msg_cursor)
        } else {
            Some(&self.definition.attributes)
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Change the status, log the transition and mirror it onto all commands.
    ///
    /// No-op if the status does not change.
    pub fn set_status(&mut self, status: JobStatus) {
        if self.status == status {
            return;
        }
        info!(
            job = %self.name,
            job_id = self.id,
            from = %self.status,
            to = %status,
            "Changing job status"
        );
        let text = format!("Status changed from \"{}\" to \"{}\"", self.status, status);
        self.log(LogLevel::Info, &text);
        self.status = status;

        let mirrored = TransactionStatus::from_job_status(status);
        for t in &mut self.commands {
            t.status = mirrored;
        }
    }

    /// Apply a lifecycle event through the transition function
    pub fn apply(&mut self, event: JobEvent) -> JobStatus {
        let next = self.status.next(event);
        self.set_status(next);
        next
    }

    /// Overwrite the status of all commands without touching the job status
    pub fn set_status_on_commands(&mut self, status: TransactionStatus) {
        for t in &mut self.commands {
            t.status = status;
        }
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn flags(&self) -> &JobFlags {
        &self.flags
    }

    /// Lifecycle flags carry no cross-field rules and may be set directly.
    /// Security flags only change through `set_needs_sign`/`set_needs_crypt`.
    pub fn lifecycle_mut(&mut self) -> &mut LifecycleFlags {
        &mut self.flags.lifecycle
    }

    pub fn is_multi_message(&self) -> bool {
        self.flags.continuation.multi_msg
    }

    pub fn has_more_messages(&self) -> bool {
        self.flags.continuation.has_more_msgs
    }

    pub fn needs_sign(&self) -> bool {
        self.flags.security.needs_sign
    }

    pub fn needs_crypt(&self) -> bool {
        self.flags.security.needs_crypt
    }

    /// Raise or clear the signing requirement.
    ///
    /// A job flagged to sign never reports zero required signatures.
    pub fn set_needs_sign(&mut self, on: bool) {
        if on && self.min_signatures == 0 {
            self.min_signatures = 1;
        }
        self.flags.security.needs_sign = on;
        self.flags.security.sign = on;
    }

    pub fn set_needs_crypt(&mut self, on: bool) {
        self.flags.security.needs_crypt = on;
        self.flags.security.crypt = on;
    }

    fn apply_message_flags(&mut self, attrs: &MessageAttributes) {
        let MessageFlags {
            sign,
            crypt,
            no_sys_id,
            sign_seq_one,
            no_itan,
            ignore_errors,
        } = attrs.message_flags();
        self.set_needs_sign(sign);
        self.set_needs_crypt(crypt);
        self.flags.security.no_sys_id = no_sys_id;
        self.flags.security.sign_seq_one = sign_seq_one;
        self.flags.security.no_itan = no_itan;
        self.flags.continuation.ignore_errors = ignore_errors;
    }

    // ------------------------------------------------------------------
    // Continuation
    // ------------------------------------------------------------------

    /// Decide whether another sub-message is needed and prepare its flags.
    ///
    /// Errors are fatal: the caller must set the job to `Error` and stop.
    pub fn prepare_next_message(&mut self) -> Result<NextMessage> {
        if let Some(behavior) = self.behavior.clone() {
            match behavior.has_more(self) {
                None | Some(Ok(true)) => {}
                Some(Ok(false)) => {
                    debug!(job = %self.name, "Job says: No more messages");
                    self.flags.continuation.has_more_msgs = false;
                    return Ok(NextMessage::Finished);
                }
                Some(Err(e)) => {
                    warn!(job = %self.name, error = %e, "Job says: Error");
                    self.flags.continuation.has_more_msgs = false;
                    return Err(e);
                }
            }
        }

        if self.status.is_failed() {
            info!(job = %self.name, "At least one message had errors, aborting job");
            self.flags.continuation.has_more_msgs = false;
            return Ok(NextMessage::Finished);
        }

        if self.status == JobStatus::ToDo {
            debug!(job = %self.name, "Job has never been sent, nothing to continue");
            self.flags.continuation.has_more_msgs = false;
            return Ok(NextMessage::Finished);
        }

        if self.flags.continuation.has_attach_point {
            debug!(job = %self.name, "Job has an attach point, more messages needed");
            self.flags.continuation.has_more_msgs = true;
            self.log(LogLevel::Debug, "Job has an attachpoint");
            return Ok(NextMessage::More);
        }

        if !self.flags.continuation.multi_msg {
            debug!(job = %self.name, "Not a multi-message job");
            self.flags.continuation.has_more_msgs = false;
            return Ok(NextMessage::Finished);
        }

        if self.msg_cursor >= self.definition.messages.len() {
            self.flags.continuation.has_more_msgs = false;
            return Ok(NextMessage::Finished);
        }

        self.msg_cursor += 1;
        match self.definition.messages.get(self.msg_cursor).cloned() {
            Some(attrs) => {
                debug!(job = %self.name, msg_index = self.msg_cursor, "Multi-message job, still more messages");
                self.log(LogLevel::Debug, "Job has more messages");
                self.apply_message_flags(&attrs);
                self.flags.continuation.has_more_msgs = true;
                Ok(NextMessage::More)
            }
            None => {
                info!(job = %self.name, "Job is finished");
                self.log(LogLevel::Debug, "Job has no more messages");
                self.flags.continuation.has_more_msgs = false;
                Ok(NextMessage::Finished)
            }
        }
    }

    pub fn attach_point(&self) -> Option<&str> {
        self.attach_point.as_deref()
    }

    /// Set or clear the continuation cursor left by the bank
    pub fn set_attach_point(&mut self, attach_point: Option<String>) {
        self.flags.continuation.has_attach_point = attach_point.is_some();
        self.attach_point = attach_point;
    }

    // ------------------------------------------------------------------
    // Segments and responses
    // ------------------------------------------------------------------

    pub fn first_segment(&self) -> u32 {
        self.first_segment
    }

    pub fn last_segment(&self) -> u32 {
        self.last_segment
    }

    pub fn set_segment_range(&mut self, first: u32, last: u32) {
        self.first_segment = first;
        self.last_segment = last;
    }

    /// True if segment number `seg` belongs to this job
    pub fn has_segment(&self, seg: u32) -> bool {
        seg >= self.first_segment && seg <= self.last_segment
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Value {
        &mut self.arguments
    }

    pub fn set_argument(&mut self, key: &str, value: Value) {
        if !self.arguments.is_object() {
            self.arguments = Value::Object(Default::default());
        }
        if let Value::Object(map) = &mut self.arguments {
            map.insert(key.to_string(), value);
        }
    }

    pub fn remove_argument(&mut self, key: &str) -> Option<Value> {
        match &mut self.arguments {
            Value::Object(map) => map.remove(key),
            _ => None,
        }
    }

    pub fn responses(&self) -> &[ResponseGroup] {
        &self.responses
    }

    pub fn add_response(&mut self, group: ResponseGroup) {
        self.responses.push(group);
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Fold result codes of all responses not yet sampled into the job.
    ///
    /// Every response group is sampled exactly once, so this may be called
    /// after each round. A segment result 3040 with a parameter sets the
    /// attach point; if the newly sampled groups carry none, it is cleared.
    pub fn sample_results(&mut self) -> ResultFlags {
        let mut round = ResultFlags::default();
        if self.sampled_responses >= self.responses.len() {
            return round;
        }

        let mut attach_point = None;
        let new_groups: Vec<Value> = self.responses[self.sampled_responses..]
            .iter()
            .map(|g| g.data.clone())
            .collect();
        self.sampled_responses = self.responses.len();

        for data in &new_groups {
            for result in extract_results(data) {
                let code = result.code();
                if code != 0 {
                    let level = result.level().log_level();
                    self.log(level, &result.log_text());
                }
                debug!(job = %self.name, code, scope = ?result.scope(), "Sampled result");

                let flags = ResultFlags::for_code(code, result.scope());
                round.merge(flags);
                self.flags.results.merge(flags);

                match result.scope() {
                    ResultScope::Segment => {
                        if code == CODE_ATTACH_POINT {
                            attach_point = result.param().map(str::to_string);
                        }
                        self.seg_results.push(result);
                    }
                    ResultScope::Message => self.msg_results.push(result),
                }
            }
        }

        self.set_attach_point(attach_point);
        round
    }

    pub fn seg_results(&self) -> &[BankResult] {
        &self.seg_results
    }

    pub fn msg_results(&self) -> &[BankResult] {
        &self.msg_results
    }

    pub fn has_warnings(&self) -> bool {
        self.flags.results.has_warnings
    }

    /// True if the job failed or any error result was sampled
    pub fn has_errors(&self) -> bool {
        self.status == JobStatus::Error || self.flags.results.has_errors
    }

    pub fn has_result_with_code(&self, code: i32) -> bool {
        self.responses.iter().any(|g| contains_code(&g.data, code))
    }

    /// A TAN challenge (3920) was answered
    pub fn has_itan_result(&self) -> bool {
        self.has_result_with_code(CODE_TAN_CHALLENGE)
    }

    // ------------------------------------------------------------------
    // Security
    // ------------------------------------------------------------------

    /// Add a signer; duplicates are rejected with a log notice
    pub fn add_signer(&mut self, key: KeyId) -> bool {
        let added = if self.signers.iter().any(|k| k == &key) {
            debug!(job = %self.name, signer = %key, "Signer already in list");
            let text = format!("Signer \"{}\" already in list", key);
            self.log(LogLevel::Warning, &text);
            false
        } else {
            let text = format!("Signer \"{}\" added", key);
            self.log(LogLevel::Info, &text);
            self.signers.push(key);
            true
        };
        self.flags.security.sign = true;
        added
    }

    /// Add several signers; returns how many were offered
    pub fn add_signers<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = KeyId>,
    {
        keys.into_iter().map(|k| self.add_signer(k)).count()
    }

    pub fn signers(&self) -> &[KeyId] {
        &self.signers
    }

    pub fn expected_signer(&self) -> Option<&KeyId> {
        self.expected_signer.as_ref()
    }

    pub fn set_expected_signer(&mut self, key: Option<KeyId>) {
        self.expected_signer = key;
    }

    pub fn expected_crypter(&self) -> Option<&KeyId> {
        self.expected_crypter.as_ref()
    }

    pub fn set_expected_crypter(&mut self, key: Option<KeyId>) {
        self.expected_crypter = key;
    }

    pub fn min_signatures(&self) -> u32 {
        self.min_signatures
    }

    pub fn security_profile(&self) -> u32 {
        self.security_profile
    }

    pub fn security_class(&self) -> u32 {
        self.security_class
    }

    /// Verify who encrypted a response. Skipped in PIN/TAN mode.
    pub fn check_encryption(&mut self, user: &User, security: Option<&SecurityInfo>) -> Result<()> {
        if user.crypt_mode == CryptMode::Pintan {
            debug!(job = %self.name, "Not checking encryption in PIN/TAN mode");
            return Ok(());
        }
        let Some(security) = security else {
            warn!(job = %self.name, "Response without security info");
            self.log(LogLevel::Error, "Response without security info (internal)");
            return Err(DomainError::SecurityViolation(
                "response without security info".into(),
            ));
        };

        if let Some(crypter) = &security.crypter {
            if crypter.is_sentinel() {
                warn!(job = %self.name, crypter = %crypter, "Encrypted with invalid key");
                self.log(LogLevel::Error, "Response encrypted with invalid key");
                return Err(DomainError::SecurityViolation(format!(
                    "response encrypted with invalid key ({})",
                    crypter
                )));
            }
        }

        let Some(expected) = self.expected_crypter.clone() else {
            debug!(job = %self.name, "No specific crypter expected");
            return Ok(());
        };
        match &security.crypter {
            None => {
                warn!(job = %self.name, "Response is not encrypted (but expected to be)");
                self.log(LogLevel::Error, "Response is not encrypted as expected");
                Err(DomainError::SecurityViolation(
                    "response is not encrypted".into(),
                ))
            }
            Some(crypter) if !crypter.matches(expected.as_str()) => {
                warn!(
                    job = %self.name,
                    expected = %expected,
                    actual = %crypter,
                    "Not encrypted with the expected key"
                );
                let text = format!(
                    "Response encrypted with \"{}\" instead of \"{}\"",
                    crypter, expected
                );
                self.log(LogLevel::Warning, &text);
                Ok(())
            }
            Some(_) => Ok(()),
        }
    }

    /// Verify who signed a response. Skipped in PIN/TAN mode.
    ///
    /// `SignatureCheck::Unsigned` means the caller has to obtain a
    /// `TrustDecision` and pass it to `resolve_unsigned_response`.
    pub fn check_signature(
        &mut self,
        user: &User,
        security: Option<&SecurityInfo>,
    ) -> Result<SignatureCheck> {
        if user.crypt_mode == CryptMode::Pintan {
            debug!(job = %self.name, "Not checking signature in PIN/TAN mode");
            return Ok(SignatureCheck::NotRequired);
        }
        let Some(security) = security else {
            warn!(job = %self.name, "Response without security info");
            self.log(LogLevel::Error, "Response without security info (internal)");
            return Err(DomainError::Generic("response without security info".into()));
        };

        if let Some(bad) = security.signers.iter().find(|s| s.is_invalid()) {
            warn!(job = %self.name, signer = %bad, "Invalid signature found, will not tolerate it");
            self.log(LogLevel::Error, "Invalid bank signature");
            return Err(DomainError::SecurityViolation(format!(
                "invalid bank signature ({})",
                bad
            )));
        }

        let expected = match &self.expected_signer {
            Some(k) if !user.flags.bank_doesnt_sign => k.clone(),
            _ => {
                debug!(job = %self.name, "No signature expected");
                return Ok(SignatureCheck::NotRequired);
            }
        };

        if security.signers.is_empty() {
            warn!(job = %self.name, expected = %expected, "Response not signed by the bank");
            self.log(LogLevel::Error, "Response not signed by the bank");
            return Ok(SignatureCheck::Unsigned);
        }

        for signer in &security.signers {
            if signer.matches(expected.as_str()) {
                debug!(job = %self.name, signer = %signer, "Signed as expected");
                return Ok(SignatureCheck::Verified);
            }
            if !signer.is_sentinel() {
                info!(
                    job = %self.name,
                    signer = %signer,
                    expected = %expected,
                    "Signer does not match expected name, accepting anyway"
                );
                let text = format!(
                    "Response signed by \"{}\" instead of \"{}\", accepted",
                    signer, expected
                );
                self.log(LogLevel::Notice, &text);
                return Ok(SignatureCheck::AcceptedOther(signer.clone()));
            }
        }

        warn!(job = %self.name, expected = %expected, "Job signed with unexpected key(s)");
        self.log(LogLevel::Error, "Response signed with unknown keys");
        Err(DomainError::SecurityViolation(format!(
            "response not signed by expected key \"{}\"",
            expected
        )))
    }

    /// Apply a trust decision for an unsigned response.
    ///
    /// Returns true if the user should be exempted from bank signatures.
    pub fn resolve_unsigned_response(&mut self, decision: TrustDecision) -> Result<bool> {
        match decision {
            TrustDecision::AcceptOnce => {
                self.log(LogLevel::Notice, "User accepts this unsigned response");
                self.expected_signer = None;
                Ok(false)
            }
            TrustDecision::AcceptAlways => {
                self.log(LogLevel::Notice, "User accepts all further unsigned responses");
                self.expected_signer = None;
                Ok(true)
            }
            TrustDecision::Abort => {
                self.log(LogLevel::Error, "Aborted");
                Err(DomainError::SecurityViolation(
                    "unsigned response rejected".into(),
                ))
            }
        }
    }

    // ------------------------------------------------------------------
    // TAN / dialog context
    // ------------------------------------------------------------------

    pub fn used_tan(&self) -> Option<&str> {
        self.used_tan.as_deref()
    }

    pub fn set_used_tan(&mut self, tan: Option<String>) {
        debug!(job = %self.name, job_id = self.id, has_tan = tan.is_some(), "Changing TAN");
        self.flags.security.tan_used = tan.is_some();
        self.used_tan = tan;
    }

    pub fn challenge_class(&self) -> u32 {
        self.challenge_class
    }

    pub fn set_challenge_class(&mut self, class: u32) {
        self.challenge_class = class;
    }

    pub fn challenge_params(&self) -> &[String] {
        &self.challenge_params
    }

    pub fn add_challenge_param(&mut self, param: impl Into<String>) {
        self.challenge_params.push(param.into());
    }

    pub fn clear_challenge_params(&mut self) {
        self.challenge_params.clear();
    }

    pub fn dialog_id(&self) -> Option<&str> {
        self.dialog_id.as_deref()
    }

    pub fn set_dialog_id(&mut self, id: impl Into<String>) {
        self.dialog_id = Some(id.into());
    }

    pub fn msg_num(&self) -> u32 {
        self.msg_num
    }

    pub fn set_msg_num(&mut self, n: u32) {
        self.msg_num = n;
    }

    pub fn jobs_per_msg(&self) -> u32 {
        self.jobs_per_msg
    }

    // ------------------------------------------------------------------
    // Domain commands
    // ------------------------------------------------------------------

    pub fn supported_command(&self) -> TransactionCommand {
        self.supported_command
    }

    pub fn set_supported_command(&mut self, cmd: TransactionCommand) {
        self.supported_command = cmd;
    }

    pub fn max_transfers(&self) -> usize {
        self.max_transfers
    }

    pub fn set_max_transfers(&mut self, n: usize) {
        self.max_transfers = n;
    }

    pub fn transfer_count(&self) -> usize {
        self.transfer_count
    }

    /// Attach a domain command; its status immediately mirrors the job's
    pub fn add_command(&mut self, mut t: Transaction) {
        t.status = TransactionStatus::from_job_status(self.status);
        self.commands.push(t);
    }

    /// Attach a transfer, bounded by `max_transfers`
    pub fn add_transfer(&mut self, t: Transaction) -> Result<()> {
        if self.transfer_count >= self.max_transfers {
            return Err(DomainError::LimitExceeded(format!(
                "job \"{}\" already carries {} transfer(s)",
                self.name, self.max_transfers
            )));
        }
        self.add_command(t);
        self.transfer_count += 1;
        Ok(())
    }

    pub fn commands(&self) -> &[Transaction] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut [Transaction] {
        &mut self.commands
    }

    pub fn account_status(&self) -> Option<&AccountStatus> {
        self.account_status.as_ref()
    }

    pub fn set_account_status(&mut self, status: Option<AccountStatus>) {
        self.account_status = status;
    }

    /// Transactions reported by the bank (statements), not sent by us
    pub fn imported(&self) -> &[Transaction] {
        &self.imported
    }

    pub fn add_imported(&mut self, t: Transaction) {
        self.imported.push(t);
    }

    // ------------------------------------------------------------------
    // SEPA
    // ------------------------------------------------------------------

    pub fn sepa_profile(&self) -> Option<&ExportProfile> {
        self.sepa_profile.as_ref()
    }

    /// Replace the cached profile
    pub fn set_sepa_profile(&mut self, profile: Option<ExportProfile>) {
        self.sepa_profile = profile;
    }

    /// Descriptor override; `None` means "use the user's descriptors"
    pub fn sepa_descriptors(&self) -> Option<&[String]> {
        self.sepa_descriptors.as_deref()
    }

    pub fn set_sepa_descriptors(&mut self, descriptors: Option<Vec<String>>) {
        self.sepa_descriptors = descriptors;
    }

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    pub fn log(&mut self, level: LogLevel, text: &str) {
        let now = self.clock.now_millis();
        self.log.append(level, now, text);
    }

    pub fn logs(&self) -> &[String] {
        self.log.lines()
    }

    /// Multi-line diagnostic summary
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Job:");
        let _ = writeln!(out, "  Name          : {}", self.name);
        let _ = writeln!(out, "  Code          : {}", self.code);
        let _ = writeln!(out, "  SegVer        : {}", self.segment_version);
        let _ = writeln!(out, "  FirstSegment  : {}", self.first_segment);
        let _ = writeln!(out, "  LastSegment   : {}", self.last_segment);
        let _ = writeln!(out, "  ChallengeClass: {}", self.challenge_class);
        let _ = writeln!(out, "  MinSigs       : {}", self.min_signatures);
        let _ = writeln!(out, "  SecProfile    : {}", self.security_profile);
        let _ = writeln!(out, "  SecClass      : {}", self.security_class);
        let _ = writeln!(out, "  JobsPerMsg    : {}", self.jobs_per_msg);
        let _ = writeln!(out, "  Status        : {}", self.status);
        let _ = writeln!(out, "  Msgnum        : {}", self.msg_num);
        let _ = writeln!(out, "  DialogId      : {}", self.dialog_id.as_deref().unwrap_or(""));
        let _ = writeln!(out, "  Owner         : {}", self.user_id);
        let _ = writeln!(out, "  MaxTransfers  : {}", self.max_transfers);
        let _ = writeln!(out, "  TransferCount : {}", self.transfer_count);
        let _ = writeln!(out, "  SupportedCmd  : {}", self.supported_command.as_str());
        let _ = writeln!(out, "  Flags         : {}", self.flag_names().join(" "));
        let _ = writeln!(out, "  Responses     : {}", self.responses.len());
        out
    }

    fn flag_names(&self) -> Vec<&'static str> {
        let f = &self.flags;
        [
            (f.lifecycle.ignore_accounts, "IGNOREACCOUNTS"),
            (f.security.sign_seq_one, "SIGNSEQONE"),
            (f.continuation.ignore_errors, "IGNORE_ERROR"),
            (f.security.no_itan, "NOITAN"),
            (f.security.tan_used, "TANUSED"),
            (f.security.no_sys_id, "NOSYSID"),
            (f.security.needs_crypt, "NEEDCRYPT"),
            (f.security.needs_sign, "NEEDSIGN"),
            (f.lifecycle.attachable, "ATTACHABLE"),
            (f.lifecycle.single, "SINGLE"),
            (f.lifecycle.dialog_job, "DLGJOB"),
            (f.security.crypt, "CRYPT"),
            (f.security.sign, "SIGN"),
            (f.continuation.multi_msg, "MULTIMSG"),
            (f.continuation.has_attach_point, "HASATTACHPOINT"),
            (f.continuation.has_more_msgs, "HASMOREMSGS"),
            (f.results.has_warnings, "HASWARNINGS"),
            (f.results.has_errors, "HASERRORS"),
            (f.lifecycle.processed, "PROCESSED"),
            (f.lifecycle.committed, "COMMITTED"),
            (f.security.needs_tan, "NEEDTAN"),
            (f.lifecycle.outbox, "OUTBOX"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("code", &self.code)
            .field("status", &self.status)
            .field("flags", &self.flags)
            .field("segments", &(self.first_segment, self.last_segment))
            .field("responses", &self.responses.len())
            .field("commands", &self.commands.len())
            .finish()
    }
}

fn non_negative(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::time_provider::FixedTimeProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<dyn TimeProvider> {
        Arc::new(FixedTimeProvider::new(1_709_647_629_000))
    }

    fn rdh_user() -> User {
        let mut u = User::new("u1", "CUST1", CryptMode::Rdh);
        u.hbci_version = 300;
        u.bank_sign_key = Some(KeyId::new("BANK-S"));
        u.bank_crypt_key = Some(KeyId::new("USER-V"));
        u
    }

    fn single_job(user: &User) -> Job {
        let def = JobDefinition::new("JobGetBalance", "HKSAL", 7);
        Job::new(def, json!({"minsigs": "0"}), user, clock(), "aqhbci")
    }

    fn multi_job(user: &User) -> Job {
        let def = JobDefinition::new("JobSendKeys", "HKSAK", 3)
            .with_message(MessageAttributes::new().with("sign", "0").with("crypt", "0"))
            .with_message(MessageAttributes::new().with("nosysid", "1").with("ignerrors", "1"));
        Job::new(def, Value::Null, user, clock(), "aqhbci")
    }

    fn send_round(job: &mut Job) {
        for ev in [JobEvent::Enqueue, JobEvent::Encode, JobEvent::Send, JobEvent::Answer] {
            job.apply(ev);
        }
    }

    #[test]
    fn test_new_job_defaults() {
        let user = rdh_user();
        let job = single_job(&user);
        assert_eq!(job.status(), JobStatus::ToDo);
        assert!(job.needs_sign());
        assert!(job.needs_crypt());
        assert_eq!(job.min_signatures(), 1);
        assert_eq!(job.security_profile(), 1);
        assert_eq!(job.expected_signer().map(KeyId::as_str), Some("BANK-S"));
        assert_eq!(job.description(), "JobGetBalance");
        assert!(job.logs().is_empty());
    }

    #[test]
    fn test_pintan_user_expects_no_keys() {
        let mut user = rdh_user();
        user.crypt_mode = CryptMode::Pintan;
        let job = single_job(&user);
        assert!(job.expected_signer().is_none());
        assert!(job.expected_crypter().is_none());
    }

    #[test]
    fn test_set_status_mirrors_all_commands() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_command(Transaction::new(TransactionCommand::GetBalance));
        job.add_command(Transaction::new(TransactionCommand::GetBalance));
        assert!(job
            .commands()
            .iter()
            .all(|t| t.status == TransactionStatus::Enqueued));

        job.set_status(JobStatus::Sent);
        assert!(job.commands().iter().all(|t| t.status == TransactionStatus::Sending));
        job.set_status(JobStatus::Error);
        assert!(job.commands().iter().all(|t| t.status == TransactionStatus::Error));
        job.set_status(JobStatus::Unknown);
        assert!(job.commands().iter().all(|t| t.status == TransactionStatus::Unknown));
        assert_eq!(job.logs().len(), 3);
    }

    #[test]
    fn test_same_status_is_noop() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_command(Transaction::new(TransactionCommand::GetBalance));
        job.commands_mut()[0].status = TransactionStatus::Accepted;

        job.set_status(JobStatus::ToDo);
        assert!(job.logs().is_empty());
        assert_eq!(job.commands()[0].status, TransactionStatus::Accepted);
    }

    #[test]
    fn test_status_log_line() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.set_status(JobStatus::Enqueued);
        assert_eq!(
            job.logs()[0],
            "06:20240305:140709:aqhbci:Status changed from \"todo\" to \"enqueued\""
        );
    }

    #[test]
    fn test_signers_are_unique() {
        let user = rdh_user();
        let mut job = single_job(&user);
        assert!(job.add_signer(KeyId::new("USER-S")));
        assert!(!job.add_signer(KeyId::new("USER-S")));
        assert_eq!(job.signers().len(), 1);
        assert!(job.logs()[1].contains("already in list"));
        assert!(job.flags().security.sign);

        let offered = job.add_signers(vec![KeyId::new("USER2-S"), KeyId::new("USER-S")]);
        assert_eq!(offered, 2);
        assert_eq!(job.signers().len(), 2);
    }

    #[test]
    fn test_needs_sign_raises_min_signatures() {
        let mut user = rdh_user();
        user.crypt_mode = CryptMode::Pintan;
        let def = JobDefinition::new("JobX", "HKXXX", 1).with_message(
            MessageAttributes::new().with("sign", "0"),
        );
        let mut job = Job::new(def, Value::Null, &user, clock(), "aqhbci");
        assert_eq!(job.min_signatures(), 0);
        assert!(!job.needs_sign());

        job.set_needs_sign(true);
        assert!(job.needs_sign());
        assert_eq!(job.min_signatures(), 1);
    }

    #[test]
    fn test_signing_never_without_min_signatures() {
        let mut user = rdh_user();
        user.crypt_mode = CryptMode::Pintan;
        let def = JobDefinition::new("JobX", "HKXXX", 1)
            .with_message(MessageAttributes::new().with("sign", "0"))
            .with_message(MessageAttributes::new().with("sign", "1"));
        let mut job = Job::new(def, Value::Null, &user, clock(), "aqhbci");
        let holds = |job: &Job| !job.needs_sign() || job.min_signatures() >= 1;
        assert!(holds(&job));

        job.lifecycle_mut().processed = true;
        job.lifecycle_mut().attachable = true;
        assert!(!job.needs_sign());

        // second sub-message asks for a signature
        job.set_status(JobStatus::Answered);
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::More);
        assert!(job.needs_sign());
        assert!(holds(&job));

        job.set_needs_sign(false);
        job.set_needs_sign(true);
        assert!(holds(&job));
    }

    #[test]
    fn test_prepare_next_on_unsent_job() {
        let user = rdh_user();
        let mut job = multi_job(&user);
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
        assert!(!job.has_more_messages());
    }

    #[test]
    fn test_prepare_next_multi_message() {
        let user = rdh_user();
        let mut job = multi_job(&user);
        assert!(!job.needs_sign());
        assert!(!job.needs_crypt());
        send_round(&mut job);

        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::More);
        assert!(job.has_more_messages());
        assert!(job.needs_sign());
        assert!(job.needs_crypt());
        assert!(job.flags().security.no_sys_id);
        assert!(job.flags().continuation.ignore_errors);
        assert!(job.min_signatures() >= 1);

        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
        assert!(!job.has_more_messages());
    }

    #[test]
    fn test_prepare_next_is_idempotent_when_finished() {
        let user = rdh_user();
        let mut job = multi_job(&user);
        send_round(&mut job);
        job.prepare_next_message().unwrap();
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);

        let logs = job.logs().len();
        let flags = *job.flags();
        for _ in 0..3 {
            assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
        }
        assert_eq!(job.logs().len(), logs);
        assert_eq!(*job.flags(), flags);
    }

    #[test]
    fn test_prepare_next_stops_failed_job() {
        let user = rdh_user();
        let mut job = multi_job(&user);
        send_round(&mut job);
        job.set_status(JobStatus::Error);
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
    }

    #[test]
    fn test_attach_point_takes_precedence() {
        let user = rdh_user();
        let mut job = single_job(&user);
        send_round(&mut job);
        job.set_attach_point(Some("4711".into()));
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::More);
        assert!(job.logs().last().unwrap().ends_with("Job has an attachpoint"));

        job.set_attach_point(None);
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
    }

    struct Hook {
        answer: Option<Result<bool>>,
        calls: AtomicUsize,
    }

    impl JobBehavior for Hook {
        fn has_more(&self, _job: &mut Job) -> Option<Result<bool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[test]
    fn test_hook_stop_and_error() {
        let user = rdh_user();

        let stop = Arc::new(Hook {
            answer: Some(Ok(false)),
            calls: AtomicUsize::new(0),
        });
        let mut job = single_job(&user).with_behavior(stop.clone());
        send_round(&mut job);
        job.set_attach_point(Some("1".into()));
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::Finished);
        assert_eq!(stop.calls.load(Ordering::SeqCst), 1);

        let fail = Arc::new(Hook {
            answer: Some(Err(DomainError::Callback(-3))),
            calls: AtomicUsize::new(0),
        });
        let mut job = single_job(&user).with_behavior(fail);
        send_round(&mut job);
        assert_eq!(job.prepare_next_message(), Err(DomainError::Callback(-3)));
        assert!(!job.has_more_messages());

        let go_on = Arc::new(Hook {
            answer: Some(Ok(true)),
            calls: AtomicUsize::new(0),
        });
        let mut job = single_job(&user).with_behavior(go_on);
        send_round(&mut job);
        job.set_attach_point(Some("1".into()));
        assert_eq!(job.prepare_next_message().unwrap(), NextMessage::More);
    }

    fn seg_result(code: &str) -> ResponseGroup {
        ResponseGroup::new("SegResult", 3, json!({"SegResult": {"result": [{"resultcode": code}]}}))
    }

    #[test]
    fn test_sample_results_error_code() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(seg_result("9010"));
        job.sample_results();
        assert!(job.has_errors());
        assert!(!job.has_warnings());
        assert_eq!(job.seg_results()[0].code(), 9010);
        assert!(job.logs()[0].starts_with("03:"));
    }

    #[test]
    fn test_sample_results_tan_challenge_exempt() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(seg_result("3920"));
        job.sample_results();
        assert!(!job.has_warnings());
        assert!(!job.has_errors());
        assert!(job.has_itan_result());
        assert!(job.logs()[0].starts_with("06:"));
    }

    #[test]
    fn test_sample_results_warning_code() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(seg_result("3100"));
        job.sample_results();
        assert!(job.has_warnings());
        assert!(!job.has_errors());
    }

    #[test]
    fn test_sample_results_message_level() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(ResponseGroup::new(
            "MsgResult",
            2,
            json!({"MsgResult": {"result": [{"resultcode": "3920", "text": "TAN"}]}}),
        ));
        job.sample_results();
        assert!(job.has_warnings());
        assert_eq!(job.msg_results().len(), 1);
        assert!(job.msg_results()[0].is_msg_result());
    }

    #[test]
    fn test_sample_results_once_per_group() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(seg_result("0020"));
        job.sample_results();
        job.sample_results();
        assert_eq!(job.seg_results().len(), 1);
        // code 20 is not zero, so it is logged once at info level
        assert_eq!(job.logs().len(), 1);
    }

    #[test]
    fn test_attach_point_from_results() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.add_response(ResponseGroup::new(
            "SegResult",
            3,
            json!({"SegResult": {"result": [{"resultcode": "3040", "param": "CUR-2"}]}}),
        ));
        job.sample_results();
        assert_eq!(job.attach_point(), Some("CUR-2"));
        assert!(job.flags().continuation.has_attach_point);

        job.add_response(seg_result("0020"));
        job.sample_results();
        assert_eq!(job.attach_point(), None);
    }

    #[test]
    fn test_has_errors_when_status_error() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.set_status(JobStatus::Error);
        assert!(job.has_errors());
    }

    #[test]
    fn test_round_trip_preserves_results_and_logs() {
        let user = rdh_user();
        let mut job = single_job(&user);
        send_round(&mut job);
        job.add_response(seg_result("3100"));
        job.sample_results();
        let logs = job.logs().to_vec();

        job.apply(JobEvent::Enqueue);
        assert_eq!(job.status(), JobStatus::Enqueued);
        assert_eq!(&job.logs()[..logs.len()], &logs[..]);
        assert_eq!(job.seg_results().len(), 1);
        assert!(job.has_warnings());
    }

    fn security(signers: &[&str], crypter: Option<&str>) -> SecurityInfo {
        SecurityInfo::new(
            signers.iter().map(|s| KeyId::new(*s)).collect(),
            crypter.map(KeyId::new),
        )
    }

    #[test]
    fn test_encryption_invalid_crypter_always_fails() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.set_expected_crypter(None);
        let sec = security(&[], Some("!USER-V"));
        assert!(matches!(
            job.check_encryption(&user, Some(&sec)),
            Err(DomainError::SecurityViolation(_))
        ));
        let sec = security(&[], Some("?USER-V"));
        assert!(job.check_encryption(&user, Some(&sec)).is_err());
    }

    #[test]
    fn test_encryption_expected_crypter() {
        let user = rdh_user();
        let mut job = single_job(&user);
        assert!(job.check_encryption(&user, Some(&security(&[], None))).is_err());
        assert!(job
            .check_encryption(&user, Some(&security(&[], Some("user-v"))))
            .is_ok());
        // mismatch is logged only
        let before = job.logs().len();
        assert!(job
            .check_encryption(&user, Some(&security(&[], Some("OTHER-V"))))
            .is_ok());
        assert_eq!(job.logs().len(), before + 1);
        assert!(job.check_encryption(&user, None).is_err());
    }

    #[test]
    fn test_checks_skipped_for_pintan() {
        let mut user = rdh_user();
        let mut job = single_job(&user);
        user.crypt_mode = CryptMode::Pintan;
        assert!(job.check_encryption(&user, None).is_ok());
        assert_eq!(job.check_signature(&user, None).unwrap(), SignatureCheck::NotRequired);
    }

    #[test]
    fn test_signature_checks() {
        let user = rdh_user();
        let mut job = single_job(&user);

        assert!(matches!(
            job.check_signature(&user, None),
            Err(DomainError::Generic(_))
        ));
        assert!(matches!(
            job.check_signature(&user, Some(&security(&["BANK-S", "!X"], None))),
            Err(DomainError::SecurityViolation(_))
        ));
        assert_eq!(
            job.check_signature(&user, Some(&security(&["bank-s"], None))).unwrap(),
            SignatureCheck::Verified
        );
        assert_eq!(
            job.check_signature(&user, Some(&security(&["?X", "OTHER-S"], None))).unwrap(),
            SignatureCheck::AcceptedOther(KeyId::new("OTHER-S"))
        );
        assert!(job
            .check_signature(&user, Some(&security(&["?X"], None)))
            .is_err());
        assert_eq!(
            job.check_signature(&user, Some(&security(&[], None))).unwrap(),
            SignatureCheck::Unsigned
        );
    }

    #[test]
    fn test_signature_exempted_user() {
        let mut user = rdh_user();
        user.flags.bank_doesnt_sign = true;
        let mut job = single_job(&user);
        assert_eq!(
            job.check_signature(&user, Some(&security(&[], None))).unwrap(),
            SignatureCheck::NotRequired
        );
        // invalid signatures are still rejected
        assert!(job
            .check_signature(&user, Some(&security(&["!BANK-S"], None)))
            .is_err());
    }

    #[test]
    fn test_resolve_unsigned_response() {
        let user = rdh_user();
        let mut job = single_job(&user);
        assert!(!job.resolve_unsigned_response(TrustDecision::AcceptOnce).unwrap());
        assert!(job.expected_signer().is_none());

        let mut job = single_job(&user);
        assert!(job.resolve_unsigned_response(TrustDecision::AcceptAlways).unwrap());

        let mut job = single_job(&user);
        assert!(job.resolve_unsigned_response(TrustDecision::Abort).is_err());
        assert!(job.expected_signer().is_some());
    }

    #[test]
    fn test_transfer_limit() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.set_max_transfers(2);
        job.add_transfer(Transaction::transfer("A", "DE1", 100, "x")).unwrap();
        job.add_transfer(Transaction::transfer("B", "DE2", 200, "y")).unwrap();
        assert!(matches!(
            job.add_transfer(Transaction::transfer("C", "DE3", 300, "z")),
            Err(DomainError::LimitExceeded(_))
        ));
        assert_eq!(job.transfer_count(), 2);
        assert_eq!(job.commands().len(), 2);
    }

    #[test]
    fn test_has_segment() {
        let user = rdh_user();
        let mut job = single_job(&user);
        job.set_segment_range(3, 4);
        assert!(!job.has_segment(2));
        assert!(job.has_segment(3));
        assert!(job.has_segment(4));
        assert!(!job.has_segment(5));
    }

    #[test]
    fn test_dump_lists_flags() {
        let user = rdh_user();
        let mut job = multi_job(&user);
        job.set_attach_point(Some("x".into()));
        let dump = job.dump();
        assert!(dump.contains("Name          : JobSendKeys"));
        assert!(dump.contains("MULTIMSG"));
        assert!(dump.contains("HASATTACHPOINT"));
    }
}
