// Dialog - drives queued jobs through request/response rounds

mod panic_guard;

pub use panic_guard::{execute_guarded, PanicGuardResult};

use crate::application::security::SecurityVerifier;
use crate::application::settings::EngineSettings;
use crate::domain::{
    Job, JobEvent, JobId, JobQueue, JobStatus, KeyId, LogLevel, Message, NextMessage, SharedJob,
    User,
};
use crate::error::{AppError, Result};
use crate::port::{CryptoService, MessageCodec, Transport, UserDirectory};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogReport {
    pub messages_sent: u32,
    /// Jobs that ran to completion and were processed
    pub finished: Vec<JobId>,
    /// Jobs left in `Error`
    pub failed: Vec<JobId>,
}

/// Runs the jobs of a queue over one dialog.
///
/// Every round collects all `Enqueued` jobs into one message, encodes, signs
/// and encrypts it, exchanges it with the bank, verifies the response and
/// routes its segments back to the jobs. Jobs that need another sub-message
/// are re-enqueued for the next round. A failing job never stops the others.
pub struct DialogRunner {
    codec: Arc<dyn MessageCodec>,
    crypto: Arc<dyn CryptoService>,
    transport: Arc<dyn Transport>,
    users: Arc<dyn UserDirectory>,
    verifier: SecurityVerifier,
    max_messages: u32,
}

impl DialogRunner {
    pub fn new(
        codec: Arc<dyn MessageCodec>,
        crypto: Arc<dyn CryptoService>,
        transport: Arc<dyn Transport>,
        users: Arc<dyn UserDirectory>,
        verifier: SecurityVerifier,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            codec,
            crypto,
            transport,
            users,
            verifier,
            max_messages: settings.max_messages_per_dialog,
        }
    }

    /// Run all queued jobs of `user_id` until none is left to send.
    ///
    /// Message numbers only advance for messages that reached the transport.
    ///
    /// # Errors
    /// - `AppError::NotFound` if the user is unknown
    /// - `AppError::Transport` if the connection fails; jobs of the current
    ///   round are set to `Error`
    pub async fn run(&self, dialog_id: &str, user_id: &str, queue: &JobQueue) -> Result<DialogReport> {
        let mut user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        info!(dialog_id, user_id, jobs = queue.len(), "Dialog started");
        let mut report = DialogReport::default();
        let mut msg_num = 1;
        loop {
            let pending = queue.jobs_with_status(JobStatus::Enqueued.into());
            if pending.is_empty() {
                break;
            }
            if msg_num > self.max_messages {
                warn!(dialog_id, max = self.max_messages, "Message limit reached, aborting jobs");
                for shared in &pending {
                    let mut job = shared.lock().await;
                    job.log(LogLevel::Error, "Too many messages in dialog");
                    job.set_status(JobStatus::Error);
                }
                break;
            }

            if self.round(dialog_id, msg_num, &mut user, &pending).await? {
                report.messages_sent += 1;
                msg_num += 1;
            }
        }

        for shared in queue.jobs() {
            let job = shared.lock().await;
            if job.status() == JobStatus::Error {
                report.failed.push(job.id());
            } else if job.flags().lifecycle.processed {
                report.finished.push(job.id());
            }
        }
        info!(
            dialog_id,
            messages = report.messages_sent,
            finished = report.finished.len(),
            failed = report.failed.len(),
            "Dialog finished"
        );
        Ok(report)
    }

    async fn round(
        &self,
        dialog_id: &str,
        msg_num: u32,
        user: &mut User,
        pending: &[SharedJob],
    ) -> Result<bool> {
        let mut msg = Message::new(dialog_id, msg_num, user.effective_hbci_version());
        let mut included = Vec::with_capacity(pending.len());
        for shared in pending {
            let mut job = shared.lock().await;
            match add_job(&mut msg, &mut job, user) {
                Ok(()) => included.push(Arc::clone(shared)),
                Err(e) => fail(&mut job, &e),
            }
        }
        if included.is_empty() {
            return Ok(false);
        }
        add_message_keys(&mut msg, user);

        let request = match self.encode(&mut msg).await {
            Ok(bytes) => bytes,
            Err(e) => {
                fail_all(&included, &e).await;
                return Ok(false);
            }
        };
        for shared in &included {
            let mut job = shared.lock().await;
            job.apply(JobEvent::Encode);
            job.apply(JobEvent::Send);
        }

        debug!(dialog_id, msg_num, bytes = request.len(), "Sending message");
        let raw = match self.transport.exchange(request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(dialog_id, msg_num, error = %e, "Transport failed");
                fail_all(&included, &e).await;
                return Err(e);
            }
        };

        let response = match self.open(raw).await {
            Ok(response) if response.is_response_to(&msg) => response,
            Ok(response) => {
                let e = AppError::Codec(format!(
                    "response refers to message {:?}, expected {}",
                    response.msg_ref(),
                    msg_num
                ));
                fail_all(&included, &e).await;
                return Ok(true);
            }
            Err(e) => {
                fail_all(&included, &e).await;
                return Ok(true);
            }
        };
        let security = response.security();

        for shared in &included {
            let mut job = shared.lock().await;
            job.apply(JobEvent::Answer);
            if let Err(e) = self.verifier.verify(&mut job, user, Some(&security)).await {
                fail(&mut job, &e);
                continue;
            }

            for group in response.response_segments() {
                let routed = match group.reference_segment {
                    Some(seg) => job.has_segment(seg),
                    None => true,
                };
                if routed {
                    job.add_response(group.clone());
                }
            }

            let flags = job.sample_results();
            if flags.has_errors && !job.flags().continuation.ignore_errors {
                info!(job_id = job.id(), job = %job.name(), "Bank reported errors for job");
                job.set_status(JobStatus::Error);
                continue;
            }

            match job.prepare_next_message() {
                Ok(NextMessage::More) => {
                    job.apply(JobEvent::Enqueue);
                }
                Ok(NextMessage::Finished) => finish(&mut job),
                Err(e) => fail(&mut job, &AppError::from(e)),
            }
        }
        Ok(true)
    }

    async fn encode(&self, msg: &mut Message) -> Result<Vec<u8>> {
        let mut bytes = self.codec.encode(&msg.draft())?;
        if msg.needs_sign() {
            bytes = self.crypto.sign(bytes, msg.signers()).await?;
        }
        if msg.needs_crypt() {
            if let Some(crypter) = msg.crypter().cloned() {
                bytes = self.crypto.encrypt(bytes, &crypter).await?;
            }
        }
        msg.finish_encoding(bytes)?;
        Ok(msg.take_buffer())
    }

    async fn open(&self, raw: Vec<u8>) -> Result<Message> {
        let (plain, security) = self.crypto.open(raw.clone()).await?;
        let decoded = self.codec.decode(&plain)?;
        Ok(Message::from_response(raw, decoded, security))
    }
}

/// Put one job's segment into the message and merge its security needs
fn add_job(msg: &mut Message, job: &mut Job, user: &User) -> Result<()> {
    if let Some(behavior) = job.behavior() {
        let name = job.name().to_string();
        match execute_guarded(&name, AssertUnwindSafe(|| behavior.prepare(job, user))) {
            PanicGuardResult::Success(result) => result?,
            PanicGuardResult::Panicked(panic_msg) => return Err(AppError::Internal(panic_msg)),
        }
    }
    match job.attach_point().map(str::to_string) {
        Some(attach_point) => job.set_argument("attachPoint", Value::String(attach_point)),
        None => {
            job.remove_argument("attachPoint");
        }
    }

    let seg = msg.add_node(job.code(), job.segment_version(), job.arguments().clone())?;
    job.set_segment_range(seg, seg);
    job.set_dialog_id(msg.dialog_id());
    job.set_msg_num(msg.msg_num());

    let security = job.flags().security;
    if security.sign {
        msg.set_sign(true);
    }
    if security.crypt {
        msg.set_crypt(true);
    }
    if security.no_sys_id {
        msg.set_no_sys_id(true);
    }
    for signer in job.signers() {
        msg.add_signer(signer.clone());
    }
    if let Some(tan) = job.used_tan() {
        msg.set_tan(Some(tan.to_string()));
        msg.set_needs_tan(true);
    }
    debug!(job_id = job.id(), job = %job.name(), segment = seg, "Job added to message");
    Ok(())
}

/// Default signer and crypter when no job brought its own
fn add_message_keys(msg: &mut Message, user: &User) {
    if msg.needs_sign() && msg.signers().is_empty() {
        let signer = user
            .sign_key
            .clone()
            .unwrap_or_else(|| KeyId::new(user.customer_id.clone()));
        msg.add_signer(signer);
    }
    if msg.needs_crypt() && msg.crypter().is_none() {
        let bank = if user.bank_code.is_empty() {
            &user.customer_id
        } else {
            &user.bank_code
        };
        msg.set_crypter(Some(KeyId::new(bank.clone())));
    }
}

fn finish(job: &mut Job) {
    if let Some(behavior) = job.behavior() {
        let name = job.name().to_string();
        let outcome = execute_guarded(&name, AssertUnwindSafe(|| behavior.process(job)));
        let error = match outcome {
            PanicGuardResult::Success(Ok(())) => None,
            PanicGuardResult::Success(Err(e)) => Some(AppError::from(e)),
            PanicGuardResult::Panicked(panic_msg) => Some(AppError::Internal(panic_msg)),
        };
        if let Some(e) = error {
            fail(job, &e);
            return;
        }
    }
    job.lifecycle_mut().processed = true;
    info!(job_id = job.id(), job = %job.name(), "Job finished");
}

fn fail(job: &mut Job, error: &AppError) {
    warn!(job_id = job.id(), job = %job.name(), error = %error, "Job failed");
    job.log(LogLevel::Error, &error.to_string());
    job.set_status(JobStatus::Error);
}

async fn fail_all(jobs: &[SharedJob], error: &AppError) {
    for shared in jobs {
        fail(&mut *shared.lock().await, error);
    }
}
