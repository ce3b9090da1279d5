// User Domain Model (owner of jobs)

use super::response::KeyId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type UserId = String;

/// Authentication / security medium of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptMode {
    /// Signature and encryption with DDV chip cards
    Ddv,
    /// Signature and encryption with RSA keys (files or cards)
    Rdh,
    Rah,
    /// PIN/TAN: no message-level signing
    Pintan,
}

impl CryptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptMode::Ddv => "DDV",
            CryptMode::Rdh => "RDH",
            CryptMode::Rah => "RAH",
            CryptMode::Pintan => "PINTAN",
        }
    }
}

/// Per-user flags the core reads (and, for `bank_doesnt_sign`, writes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFlags {
    /// Accept unsigned bank responses without asking
    #[serde(default)]
    pub bank_doesnt_sign: bool,
    #[serde(default)]
    pub bank_uses_sign_seq: bool,
}

impl UserFlags {
    pub fn union(self, other: UserFlags) -> UserFlags {
        UserFlags {
            bank_doesnt_sign: self.bank_doesnt_sign || other.bank_doesnt_sign,
            bank_uses_sign_seq: self.bank_uses_sign_seq || other.bank_uses_sign_seq,
        }
    }
}

/// A bank customer as seen by the job layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub customer_id: String,
    pub bank_code: String,
    /// Protocol version; 0 means "not yet negotiated"
    #[serde(default)]
    pub hbci_version: u32,
    pub crypt_mode: CryptMode,
    #[serde(default)]
    pub flags: UserFlags,
    /// SEPA format descriptors advertised by the bank for this user
    #[serde(default)]
    pub sepa_descriptors: Vec<String>,
    /// Key the bank is expected to sign with
    #[serde(default)]
    pub bank_sign_key: Option<KeyId>,
    /// Key the bank is expected to encrypt with (our own encryption key)
    #[serde(default)]
    pub bank_crypt_key: Option<KeyId>,
    /// Our own signing key
    #[serde(default)]
    pub sign_key: Option<KeyId>,
    /// Bank parameter data (one list of parameter groups per job)
    #[serde(default)]
    pub bpd: Option<Value>,
}

impl User {
    pub fn new(id: impl Into<String>, customer_id: impl Into<String>, crypt_mode: CryptMode) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            bank_code: String::new(),
            hbci_version: 0,
            crypt_mode,
            flags: UserFlags::default(),
            sepa_descriptors: Vec::new(),
            bank_sign_key: None,
            bank_crypt_key: None,
            sign_key: None,
            bpd: None,
        }
    }

    /// Protocol version to look job definitions up with (210 when unset)
    pub fn effective_hbci_version(&self) -> u32 {
        if self.hbci_version == 0 {
            210
        } else {
            self.hbci_version
        }
    }
}
