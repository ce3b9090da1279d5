// Trust Prompt Port (Interface)
// Asks whoever drives the dialog whether to accept an unsigned response

use crate::domain::{TrustDecision, User};
use async_trait::async_trait;

#[async_trait]
pub trait TrustPrompt: Send + Sync {
    /// Called when the bank did not sign a response for `job_name`.
    ///
    /// The dialog waits for the answer before it touches any other job.
    async fn ask_unsigned(&self, user: &User, job_name: &str) -> TrustDecision;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Prompt with a fixed answer that counts how often it was asked
    pub struct MockTrustPrompt {
        answer: TrustDecision,
        asked: Arc<Mutex<Vec<String>>>,
    }

    impl MockTrustPrompt {
        pub fn new(answer: TrustDecision) -> Self {
            Self {
                answer,
                asked: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TrustPrompt for MockTrustPrompt {
        async fn ask_unsigned(&self, _user: &User, job_name: &str) -> TrustDecision {
            self.asked.lock().unwrap().push(job_name.to_string());
            self.answer
        }
    }
}
