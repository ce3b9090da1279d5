// Domain Transactions (the banking commands a job carries out)

use super::job_status::JobStatus;
use serde::{Deserialize, Serialize};

/// Status of a domain transaction, mirrored from the owning job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Unknown,
    Enqueued,
    Sending,
    Accepted,
    Rejected,
    Error,
}

impl TransactionStatus {
    /// Fixed mapping from job status to transaction status
    pub fn from_job_status(status: JobStatus) -> Self {
        match status {
            JobStatus::ToDo | JobStatus::Enqueued => TransactionStatus::Enqueued,
            JobStatus::Encoded | JobStatus::Sent | JobStatus::Answered => {
                TransactionStatus::Sending
            }
            JobStatus::Error => TransactionStatus::Error,
            JobStatus::Unknown => TransactionStatus::Unknown,
        }
    }
}

/// Abstract banking operation a transaction stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCommand {
    None,
    GetBalance,
    GetTransactions,
    SepaTransfer,
}

impl TransactionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCommand::None => "none",
            TransactionCommand::GetBalance => "getBalance",
            TransactionCommand::GetTransactions => "getTransactions",
            TransactionCommand::SepaTransfer => "sepaTransfer",
        }
    }
}

/// Domain transaction: a request from the caller plus the data the bank sent back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub command: TransactionCommand,
    pub status: TransactionStatus,

    // Counterparty / payment data (transfers)
    pub remote_name: Option<String>,
    pub remote_iban: Option<String>,
    pub remote_bic: Option<String>,
    pub purpose: Option<String>,
    /// Amount in minor units (cents)
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,

    // Booking data (statements)
    pub booking_date: Option<String>,
    pub value_date: Option<String>,
}

impl Transaction {
    pub fn new(command: TransactionCommand) -> Self {
        Self {
            command,
            status: TransactionStatus::Unknown,
            remote_name: None,
            remote_iban: None,
            remote_bic: None,
            purpose: None,
            amount_minor: None,
            currency: None,
            booking_date: None,
            value_date: None,
        }
    }

    /// Outbound SEPA credit transfer
    pub fn transfer(
        remote_name: impl Into<String>,
        remote_iban: impl Into<String>,
        amount_minor: i64,
        purpose: impl Into<String>,
    ) -> Self {
        let mut t = Self::new(TransactionCommand::SepaTransfer);
        t.remote_name = Some(remote_name.into());
        t.remote_iban = Some(remote_iban.into());
        t.amount_minor = Some(amount_minor);
        t.currency = Some("EUR".to_string());
        t.purpose = Some(purpose.into());
        t
    }
}

/// Balance reported by the bank for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub booked_minor: i64,
    pub currency: String,
    pub date: Option<String>,
}
