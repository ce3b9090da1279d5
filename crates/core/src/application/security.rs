// Security Verifier - checks who encrypted and signed a response

use crate::application::settings::UnsignedResponsePolicy;
use crate::domain::{Job, SecurityInfo, SignatureCheck, TrustDecision, User, UserFlags};
use crate::error::Result;
use crate::port::{TrustPrompt, UserDirectory};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the job-level encryption and signature checks and settles unsigned
/// responses according to the configured policy.
pub struct SecurityVerifier {
    policy: UnsignedResponsePolicy,
    prompt: Option<Arc<dyn TrustPrompt>>,
    users: Arc<dyn UserDirectory>,
}

impl SecurityVerifier {
    pub fn new(
        policy: UnsignedResponsePolicy,
        prompt: Option<Arc<dyn TrustPrompt>>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            policy,
            prompt,
            users,
        }
    }

    /// Verify the security block of a response for `job`.
    ///
    /// A permanent acceptance is written to the user directory and to `user`.
    ///
    /// # Errors
    /// - `DomainError::SecurityViolation` for policy breaches and rejected
    ///   unsigned responses
    /// - `DomainError::Generic` if the response has no security block
    pub async fn verify(
        &self,
        job: &mut Job,
        user: &mut User,
        security: Option<&SecurityInfo>,
    ) -> Result<SignatureCheck> {
        job.check_encryption(user, security)?;
        let check = job.check_signature(user, security)?;
        if check != SignatureCheck::Unsigned {
            return Ok(check);
        }

        let decision = self.decide(user, job.name()).await;
        info!(job = %job.name(), user_id = %user.id, ?decision, "Unsigned response decision");
        if job.resolve_unsigned_response(decision)? {
            let exemption = UserFlags {
                bank_doesnt_sign: true,
                ..UserFlags::default()
            };
            self.users.add_flags(&user.id, exemption).await?;
            user.flags = user.flags.union(exemption);
        }
        Ok(check)
    }

    async fn decide(&self, user: &User, job_name: &str) -> TrustDecision {
        match self.policy {
            UnsignedResponsePolicy::AcceptOnce => TrustDecision::AcceptOnce,
            UnsignedResponsePolicy::AcceptAlways => TrustDecision::AcceptAlways,
            UnsignedResponsePolicy::Reject => TrustDecision::Abort,
            UnsignedResponsePolicy::Ask => match &self.prompt {
                Some(prompt) => prompt.ask_unsigned(user, job_name).await,
                None => {
                    warn!(job = job_name, "No trust prompt registered, rejecting unsigned response");
                    TrustDecision::Abort
                }
            },
        }
    }
}
