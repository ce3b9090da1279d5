// Transport Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Request/response channel to the bank server.
///
/// One call per message; the dialog never has two messages in flight.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: Vec<u8>) -> Result<Vec<u8>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Transport that answers from a script and records requests
    pub struct MockTransport {
        responses: Arc<Mutex<VecDeque<Result<Vec<u8>>>>>,
        requests: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                responses: Arc::new(Mutex::new(VecDeque::new())),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn push_response(&self, raw: Vec<u8>) {
            self.responses.lock().unwrap().push_back(Ok(raw));
        }

        pub fn push_failure(&self, message: impl Into<String>) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(AppError::Transport(message.into())));
        }

        pub fn requests(&self) -> Vec<Vec<u8>> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn exchange(&self, request: Vec<u8>) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Transport("connection closed".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockTransport;
    use super::*;

    #[test]
    fn test_mock_replays_script_in_order() {
        let transport = MockTransport::new();
        transport.push_response(b"one".to_vec());
        transport.push_failure("reset");

        tokio_test::block_on(async {
            assert_eq!(transport.exchange(b"a".to_vec()).await.unwrap(), b"one".to_vec());
            assert!(transport.exchange(b"b".to_vec()).await.is_err());
            assert!(transport.exchange(b"c".to_vec()).await.is_err());
        });
        assert_eq!(transport.call_count(), 3);
    }
}
