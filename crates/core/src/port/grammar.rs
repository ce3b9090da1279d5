// Protocol Grammar Port (Interface)
// The grammar engine describes jobs and renders messages to wire bytes

use crate::domain::{DecodedMessage, JobDefinition, MessageDraft};
use crate::error::Result;
use serde_json::Value;

/// Declarative description of the protocol's jobs and bank parameter data
pub trait ProtocolGrammar: Send + Sync {
    /// Definition of job `name` for protocol version `hbci_version`.
    ///
    /// `segment_version` selects one segment version; `None` picks the highest
    /// one the grammar knows for that protocol version.
    fn find_job(
        &self,
        name: &str,
        hbci_version: u32,
        segment_version: Option<u32>,
    ) -> Option<JobDefinition>;

    /// All parameter groups named `params_name` in a bank parameter tree
    fn param_groups(&self, bpd: &Value, params_name: &str) -> Vec<Value> {
        match bpd.get(params_name) {
            Some(Value::Array(groups)) => groups.clone(),
            Some(group @ Value::Object(_)) => vec![group.clone()],
            _ => Vec::new(),
        }
    }

    /// Parameter group of `params_name` for one segment version
    fn find_params(&self, bpd: &Value, params_name: &str, segment_version: u32) -> Option<Value> {
        self.param_groups(bpd, params_name)
            .into_iter()
            .find(|g| group_version(g) == Some(segment_version))
    }
}

/// Renders drafts to wire bytes and parses responses back
pub trait MessageCodec: Send + Sync {
    fn encode(&self, draft: &MessageDraft) -> Result<Vec<u8>>;

    fn decode(&self, raw: &[u8]) -> Result<DecodedMessage>;
}

/// Segment version a parameter group applies to
pub fn group_version(group: &Value) -> Option<u32> {
    match group.get("version") {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    /// Grammar over a fixed list of definitions: (hbci_version, definition)
    #[derive(Default)]
    pub struct MockGrammar {
        definitions: Vec<(u32, JobDefinition)>,
    }

    impl MockGrammar {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_job(mut self, hbci_version: u32, definition: JobDefinition) -> Self {
            self.definitions.push((hbci_version, definition));
            self
        }
    }

    impl ProtocolGrammar for MockGrammar {
        fn find_job(
            &self,
            name: &str,
            hbci_version: u32,
            segment_version: Option<u32>,
        ) -> Option<JobDefinition> {
            self.definitions
                .iter()
                .filter(|(v, d)| *v == hbci_version && d.name == name)
                .filter(|(_, d)| segment_version.map_or(true, |sv| d.version == sv))
                .max_by_key(|(_, d)| d.version)
                .map(|(_, d)| d.clone())
        }
    }

    /// Codec that serializes drafts as JSON and replays scripted decodes
    pub struct MockCodec {
        decoded: Arc<Mutex<Vec<DecodedMessage>>>,
        encoded: Arc<Mutex<Vec<MessageDraft>>>,
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self {
                decoded: Arc::new(Mutex::new(Vec::new())),
                encoded: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Queue the result of the next `decode` call
        pub fn push_decoded(&self, msg: DecodedMessage) {
            self.decoded.lock().unwrap().push(msg);
        }

        pub fn encoded(&self) -> Vec<MessageDraft> {
            self.encoded.lock().unwrap().clone()
        }
    }

    impl Default for MockCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MessageCodec for MockCodec {
        fn encode(&self, draft: &MessageDraft) -> Result<Vec<u8>> {
            self.encoded.lock().unwrap().push(draft.clone());
            Ok(serde_json::to_vec(draft)?)
        }

        fn decode(&self, _raw: &[u8]) -> Result<DecodedMessage> {
            let mut queue = self.decoded.lock().unwrap();
            if queue.is_empty() {
                return Err(AppError::Codec("no scripted response".into()));
            }
            Ok(queue.remove(0))
        }
    }
}
