// Engine Settings

use serde::{Deserialize, Serialize};

/// What to do when a bank that is expected to sign sends an unsigned response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsignedResponsePolicy {
    /// Delegate to the registered trust prompt; reject if there is none
    #[default]
    Ask,
    /// Accept each unsigned response without remembering the decision
    AcceptOnce,
    /// Accept and mark the user as "bank does not sign"
    AcceptAlways,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Component name written into job audit logs
    pub provider_name: String,
    pub unsigned_response_policy: UnsignedResponsePolicy,
    /// Upper bound for transfers batched into one job
    pub max_transfers_per_job: usize,
    /// Upper bound for messages sent in one dialog (guards endless attach points)
    pub max_messages_per_dialog: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider_name: "aqhbci".to_string(),
            unsigned_response_policy: UnsignedResponsePolicy::Ask,
            max_transfers_per_job: 16,
            max_messages_per_dialog: 64,
        }
    }
}
