// GetTransactions (HKKAZ), paginated through attach points

use super::{minor_units, text};
use crate::application::job_factory::JobFactory;
use crate::domain::error::Result as DomainResult;
use crate::domain::{Job, JobBehavior, Transaction, TransactionCommand, User};
use crate::error::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const JOB_NAME: &str = "JobGetTransactions";
const DEFAULT_RESPONSE: &str = "TransactionsResponse";

#[derive(Debug, Default)]
pub struct GetTransactions;

impl GetTransactions {
    /// Statement job for `iban`; dates are `YYYYMMDD`
    pub fn create(
        factory: &JobFactory,
        user: &User,
        iban: &str,
        from_date: Option<&str>,
        to_date: Option<&str>,
    ) -> Result<Job> {
        let mut job = factory
            .create(JOB_NAME, user)?
            .with_behavior(Arc::new(GetTransactions));
        job.set_supported_command(TransactionCommand::GetTransactions);
        job.set_argument("account", json!({"iban": iban, "bankCode": user.bank_code}));
        job.set_argument("allAccounts", json!("N"));
        if let Some(from) = from_date {
            job.set_argument("fromDate", json!(from));
        }
        if let Some(to) = to_date {
            job.set_argument("toDate", json!(to));
        }
        job.add_command(Transaction::new(TransactionCommand::GetTransactions));
        Ok(job)
    }
}

impl JobBehavior for GetTransactions {
    fn prepare(&self, job: &mut Job, _user: &User) -> DomainResult<()> {
        if let Some(attach_point) = job.attach_point() {
            debug!(job_id = job.id(), attach_point, "Requesting next page");
        }
        Ok(())
    }

    fn process(&self, job: &mut Job) -> DomainResult<()> {
        let response = job.response_name().unwrap_or(DEFAULT_RESPONSE).to_string();
        let booked: Vec<Transaction> = job
            .responses()
            .iter()
            .filter(|g| g.name == response)
            .filter_map(|g| g.data.get("booked").and_then(Value::as_array))
            .flatten()
            .map(parse_booking)
            .collect();

        info!(job_id = job.id(), count = booked.len(), "Transactions received");
        for t in booked {
            job.add_imported(t);
        }
        Ok(())
    }
}

fn parse_booking(entry: &Value) -> Transaction {
    let mut t = Transaction::new(TransactionCommand::GetTransactions);
    t.remote_name = text(entry.get("remoteName"));
    t.remote_iban = text(entry.get("remoteIban"));
    t.remote_bic = text(entry.get("remoteBic"));
    t.purpose = text(entry.get("purpose"));
    t.amount_minor = minor_units(entry.get("amountMinor"));
    t.currency = text(entry.get("currency"));
    t.booking_date = text(entry.get("bookingDate"));
    t.value_date = text(entry.get("valueDate"));
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::settings::EngineSettings;
    use crate::domain::{CryptMode, JobDefinition, ResponseGroup};
    use crate::port::grammar::mocks::MockGrammar;
    use crate::port::FixedTimeProvider;

    fn factory() -> JobFactory {
        JobFactory::new(
            Arc::new(MockGrammar::new().with_job(300, JobDefinition::new(JOB_NAME, "HKKAZ", 7))),
            Arc::new(FixedTimeProvider::new(0)),
            EngineSettings::default(),
        )
    }

    fn user() -> User {
        let mut u = User::new("u1", "C1", CryptMode::Pintan);
        u.hbci_version = 300;
        u
    }

    #[test]
    fn test_create_with_date_range() {
        let job =
            GetTransactions::create(&factory(), &user(), "DE02", Some("20240101"), None).unwrap();
        assert_eq!(job.arguments()["fromDate"], "20240101");
        assert!(job.arguments().get("toDate").is_none());
    }

    #[test]
    fn test_process_collects_all_pages() {
        let mut job = GetTransactions::create(&factory(), &user(), "DE02", None, None).unwrap();
        for page in [
            json!({"booked": [{"remoteName": "A", "amountMinor": -500}]}),
            json!({"booked": [{"remoteName": "B", "amountMinor": 1200}, {"remoteName": "C"}]}),
        ] {
            job.add_response(ResponseGroup::new("TransactionsResponse", 3, page));
        }
        GetTransactions.process(&mut job).unwrap();

        let names: Vec<_> = job
            .imported()
            .iter()
            .filter_map(|t| t.remote_name.as_deref())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(job.imported()[0].amount_minor, Some(-500));
        assert_eq!(job.imported()[2].amount_minor, None);
    }
}
