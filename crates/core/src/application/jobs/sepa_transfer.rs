// SEPA credit transfer (HKCCS single, HKCCM batched)

use crate::application::job_factory::JobFactory;
use crate::application::sepa::SepaProfileService;
use crate::domain::error::Result as DomainResult;
use crate::domain::result::int_value;
use crate::domain::{
    DomainError, Job, JobBehavior, Transaction, TransactionCommand, TransactionStatus, User,
};
use crate::error::{AppError, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const JOB_NAME_SINGLE: &str = "JobSepaTransferSingle";
pub const JOB_NAME_MULTI: &str = "JobSepaTransferMulti";

/// Credit transfer initiation, any pain.001 version
pub const SEPA_PATTERN: &str = "001.*";

pub struct SepaTransfer {
    profiles: Arc<SepaProfileService>,
    profile_name: Option<String>,
}

impl SepaTransfer {
    /// Transfer job debiting `iban`.
    ///
    /// A batched job carries up to the configured maximum of transfers, further
    /// limited by the bank's `maxtransfers` parameter.
    pub fn create(
        factory: &JobFactory,
        profiles: Arc<SepaProfileService>,
        user: &User,
        iban: &str,
        batched: bool,
        profile_name: Option<String>,
    ) -> Result<Job> {
        let name = if batched { JOB_NAME_MULTI } else { JOB_NAME_SINGLE };
        let behavior = Arc::new(SepaTransfer {
            profiles,
            profile_name,
        });
        let mut job = factory.create(name, user)?.with_behavior(behavior);
        job.set_supported_command(TransactionCommand::SepaTransfer);
        job.set_argument("account", json!({"iban": iban, "bankCode": user.bank_code}));

        let max = if batched {
            let configured = factory.settings().max_transfers_per_job;
            match int_value(job.params().get("maxtransfers")) {
                bank if bank > 0 => configured.min(bank as usize),
                _ => configured,
            }
        } else {
            1
        };
        job.set_max_transfers(max);
        Ok(job)
    }
}

impl JobBehavior for SepaTransfer {
    fn prepare(&self, job: &mut Job, user: &User) -> DomainResult<()> {
        if job.transfer_count() == 0 {
            return Err(DomainError::Validation("no transfers in job".into()));
        }
        let profile = self
            .profiles
            .find_for_job(job, user, SEPA_PATTERN, self.profile_name.as_deref())
            .map_err(into_domain)?;

        let transfers: Vec<&Transaction> = job
            .commands()
            .iter()
            .filter(|t| t.command == TransactionCommand::SepaTransfer)
            .collect();
        let payload = json!({
            "profile": profile.name,
            "sepaType": profile.sepa_type,
            "descriptor": profile.descriptor,
            "count": transfers.len(),
            "transfers": transfers,
        });
        job.set_argument("sepa", payload);
        info!(job_id = job.id(), profile = %profile.name, "SEPA transfer payload built");
        Ok(())
    }

    fn process(&self, job: &mut Job) -> DomainResult<()> {
        let status = if job.has_errors() {
            TransactionStatus::Rejected
        } else {
            TransactionStatus::Accepted
        };
        job.set_status_on_commands(status);
        Ok(())
    }
}

fn into_domain(e: AppError) -> DomainError {
    match e {
        AppError::Domain(d) => d,
        AppError::Sepa(s) => DomainError::Sepa(s),
        other => DomainError::Generic(other.to_string()),
    }
}
