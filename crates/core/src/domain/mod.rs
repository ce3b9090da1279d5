// Domain Layer - Pure protocol logic and entities

pub mod audit_log;
pub mod definition;
pub mod error;
pub mod job;
pub mod job_status;
pub mod message;
pub mod queue;
pub mod response;
pub mod result;
pub mod sepa;
pub mod transaction;
pub mod user;

// Re-exports
pub use audit_log::{AuditLog, LogLevel, LogLine};
pub use definition::{JobDefinition, MessageAttributes, MessageFlags};
pub use error::DomainError;
pub use job::{
    ContinuationFlags, Job, JobBehavior, JobFlags, JobId, LifecycleFlags, NextMessage,
    SecurityFlags, SignatureCheck, TrustDecision,
};
pub use job_status::{JobEvent, JobStatus, JobStatusFilter};
pub use message::{DecodedMessage, Message, MessageDraft, OutboundSegment};
pub use queue::{shared, JobQueue, SharedJob};
pub use response::{KeyId, ResponseGroup, SecurityInfo};
pub use result::{BankResult, ResultFlags, ResultLevel, ResultScope};
pub use sepa::{ExportProfile, SepaError, SepaProfileSelector};
pub use transaction::{AccountStatus, Transaction, TransactionCommand, TransactionStatus};
pub use user::{CryptMode, User, UserFlags, UserId};
