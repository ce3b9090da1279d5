// Crypto Port (Interface)
// Signing and encryption primitives live outside the job layer

use crate::domain::{KeyId, SecurityInfo};
use crate::error::Result;
use async_trait::async_trait;

/// Message-level crypto collaborator
#[async_trait]
pub trait CryptoService: Send + Sync {
    /// Wrap `payload` in signatures of all `signers`
    async fn sign(&self, payload: Vec<u8>, signers: &[KeyId]) -> Result<Vec<u8>>;

    /// Encrypt `payload` for `crypter`
    async fn encrypt(&self, payload: Vec<u8>, crypter: &KeyId) -> Result<Vec<u8>>;

    /// Decrypt and verify an inbound message.
    ///
    /// Returns the plain message and who actually signed and encrypted it.
    /// Keys the service does not trust are reported with a `?` prefix,
    /// signatures that fail verification with a `!` prefix.
    async fn open(&self, raw: Vec<u8>) -> Result<(Vec<u8>, SecurityInfo)>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Pass-through crypto that reports a configurable security block
    pub struct MockCrypto {
        inbound: Arc<Mutex<SecurityInfo>>,
        signed_with: Arc<Mutex<Vec<Vec<KeyId>>>>,
        encrypted_for: Arc<Mutex<Vec<KeyId>>>,
    }

    impl MockCrypto {
        pub fn new(inbound: SecurityInfo) -> Self {
            Self {
                inbound: Arc::new(Mutex::new(inbound)),
                signed_with: Arc::new(Mutex::new(Vec::new())),
                encrypted_for: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn set_inbound(&self, inbound: SecurityInfo) {
            *self.inbound.lock().unwrap() = inbound;
        }

        pub fn signed_with(&self) -> Vec<Vec<KeyId>> {
            self.signed_with.lock().unwrap().clone()
        }

        pub fn encrypted_for(&self) -> Vec<KeyId> {
            self.encrypted_for.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CryptoService for MockCrypto {
        async fn sign(&self, payload: Vec<u8>, signers: &[KeyId]) -> Result<Vec<u8>> {
            self.signed_with.lock().unwrap().push(signers.to_vec());
            Ok(payload)
        }

        async fn encrypt(&self, payload: Vec<u8>, crypter: &KeyId) -> Result<Vec<u8>> {
            self.encrypted_for.lock().unwrap().push(crypter.clone());
            Ok(payload)
        }

        async fn open(&self, raw: Vec<u8>) -> Result<(Vec<u8>, SecurityInfo)> {
            Ok((raw, self.inbound.lock().unwrap().clone()))
        }
    }
}
