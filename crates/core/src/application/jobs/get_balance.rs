// GetBalance (HKSAL)

use super::{minor_units, text};
use crate::application::job_factory::JobFactory;
use crate::domain::error::Result as DomainResult;
use crate::domain::{
    AccountStatus, Job, JobBehavior, LogLevel, Transaction, TransactionCommand, User,
};
use crate::error::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub const JOB_NAME: &str = "JobGetBalance";
const DEFAULT_RESPONSE: &str = "BalanceResponse";

#[derive(Debug, Default)]
pub struct GetBalance;

impl GetBalance {
    /// Balance job for the account `iban` of `user`
    pub fn create(factory: &JobFactory, user: &User, iban: &str) -> Result<Job> {
        let mut job = factory.create(JOB_NAME, user)?.with_behavior(Arc::new(GetBalance));
        job.set_supported_command(TransactionCommand::GetBalance);
        job.set_argument("account", json!({"iban": iban, "bankCode": user.bank_code}));
        job.set_argument("allAccounts", json!("N"));

        let mut t = Transaction::new(TransactionCommand::GetBalance);
        t.remote_iban = Some(iban.to_string());
        job.add_command(t);
        Ok(job)
    }
}

impl JobBehavior for GetBalance {
    fn process(&self, job: &mut Job) -> DomainResult<()> {
        let response = job.response_name().unwrap_or(DEFAULT_RESPONSE).to_string();
        let balance = job
            .responses()
            .iter()
            .filter(|g| g.name == response)
            .filter_map(|g| parse_balance(&g.data))
            .last();

        match balance {
            Some(status) => {
                info!(
                    job_id = job.id(),
                    booked_minor = status.booked_minor,
                    currency = %status.currency,
                    "Balance received"
                );
                job.set_account_status(Some(status));
            }
            None => job.log(LogLevel::Warning, "No balance in response"),
        }
        Ok(())
    }
}

fn parse_balance(data: &Value) -> Option<AccountStatus> {
    let booked = data.get("booked")?;
    Some(AccountStatus {
        booked_minor: minor_units(booked.get("amountMinor"))?,
        currency: text(booked.get("currency")).unwrap_or_else(|| "EUR".to_string()),
        date: text(booked.get("date")),
    })
}
