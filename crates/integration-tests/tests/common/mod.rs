//! Shared fixture: a scripted bank behind the local adapters.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use hbci_core::application::{
    DialogRunner, EngineSettings, JobFactory, SecurityVerifier, SepaProfileService,
};
use hbci_core::domain::{
    CryptMode, DecodedMessage, MessageDraft, ResponseGroup, SecurityInfo, User,
};
use hbci_core::port::crypto::mocks::MockCrypto;
use hbci_core::port::transport::mocks::MockTransport;
use hbci_core::port::{FixedTimeProvider, TrustPrompt, UserDirectory};
use hbci_infra_local::{JsonCodec, JsonGrammar, JsonUserDirectory, StaticProfileRegistry};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const DIALOG: &str = "dlg-1";
pub const IBAN: &str = "DE02120300000000202051";

pub const GRAMMAR: &str = r#"[
    {"hbci_version": 300, "jobs": [
        {"name": "JobGetBalance", "code": "HKSAL", "version": 6, "params": "SaldoParams",
         "response": "BalanceResponse"},
        {"name": "JobGetBalance", "code": "HKSAL", "version": 7, "params": "SaldoParams",
         "response": "BalanceResponse"},
        {"name": "JobGetTransactions", "code": "HKKAZ", "version": 7, "params": "KUmsZeitParams",
         "response": "TransactionsResponse"},
        {"name": "JobSepaTransferSingle", "code": "HKCCS", "version": 1,
         "params": "SepaTransferParams"},
        {"name": "JobSepaTransferMulti", "code": "HKCCM", "version": 1,
         "params": "SepaSammelParams"}
    ]}
]"#;

pub const PROFILES: &str = r#"{"xml": [
    {"name": "ccm_001_002_03", "sepaType": "001.002.03"},
    {"name": "ccm_001_003_03", "sepaType": "001.003.03"},
    {"name": "dd_008_003_02", "sepaType": "008.003.02"}
]}"#;

pub struct Bank {
    pub dir: TempDir,
    pub users: Arc<JsonUserDirectory>,
    pub crypto: Arc<MockCrypto>,
    pub transport: Arc<MockTransport>,
    pub factory: JobFactory,
    pub profiles: Arc<SepaProfileService>,
    pub settings: EngineSettings,
}

impl Bank {
    pub async fn new(user: User, settings: EngineSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let users = Arc::new(
            JsonUserDirectory::open(dir.path().join("users.json"))
                .await
                .unwrap(),
        );
        users.upsert(user).await.unwrap();

        let grammar = Arc::new(JsonGrammar::from_json(GRAMMAR).unwrap());
        let registry = Arc::new(StaticProfileRegistry::from_json(PROFILES).unwrap());
        Self {
            dir,
            users,
            crypto: Arc::new(MockCrypto::new(SecurityInfo::default())),
            transport: Arc::new(MockTransport::new()),
            factory: JobFactory::new(
                grammar,
                Arc::new(FixedTimeProvider::new(1_700_000_000)),
                settings.clone(),
            ),
            profiles: Arc::new(SepaProfileService::new(registry)),
            settings,
        }
    }

    pub fn users_path(&self) -> PathBuf {
        self.dir.path().join("users.json")
    }

    pub async fn user(&self, id: &str) -> User {
        self.users.find_user(id).await.unwrap().unwrap()
    }

    pub fn runner(&self, prompt: Option<Arc<dyn TrustPrompt>>) -> DialogRunner {
        let verifier = SecurityVerifier::new(
            self.settings.unsigned_response_policy,
            prompt,
            self.users.clone(),
        );
        DialogRunner::new(
            Arc::new(JsonCodec),
            self.crypto.clone(),
            self.transport.clone(),
            self.users.clone(),
            verifier,
            &self.settings,
        )
    }

    /// Script the bank's answer to message `msg_num`
    pub fn answer(&self, msg_num: u32, segments: Vec<ResponseGroup>) {
        let decoded = DecodedMessage {
            dialog_id: DIALOG.to_string(),
            msg_num,
            msg_ref: Some(msg_num),
            segments,
        };
        self.transport
            .push_response(serde_json::to_vec(&decoded).unwrap());
    }

    /// Messages the engine sent, in order
    pub fn sent(&self) -> Vec<MessageDraft> {
        self.transport
            .requests()
            .iter()
            .map(|raw| serde_json::from_slice(raw).unwrap())
            .collect()
    }
}

pub fn bpd() -> Value {
    json!({
        "SaldoParams": [{"version": 5}, {"version": 6}, {"version": 7}],
        "KUmsZeitParams": {"version": 7, "storagedays": 90},
        "SepaTransferParams": {"version": 1},
        "SepaSammelParams": {"version": 1, "maxtransfers": 2}
    })
}

pub fn pintan_user() -> User {
    let mut u = User::new("u1", "CUST1", CryptMode::Pintan);
    u.bank_code = "12030000".to_string();
    u.hbci_version = 300;
    u.bpd = Some(bpd());
    u.sepa_descriptors = vec![
        "urn:iso:std:iso:20022:tech:xsd:pain.001.002.03".to_string(),
        "urn:iso:std:iso:20022:tech:xsd:pain.008.003.02".to_string(),
    ];
    u
}

pub fn seg_result(reference: u32, code: &str, param: Option<&str>) -> ResponseGroup {
    let mut entry = json!({"resultcode": code, "text": "ok"});
    if let Some(p) = param {
        entry["param"] = json!(p);
    }
    ResponseGroup::new("SegResult", 3, json!({"SegResult": {"result": [entry]}}))
        .with_reference(reference)
}

pub fn msg_result(code: &str) -> ResponseGroup {
    ResponseGroup::new(
        "MsgResult",
        2,
        json!({"MsgResult": {"result": {"resultcode": code, "text": "Dialog"}}}),
    )
}
