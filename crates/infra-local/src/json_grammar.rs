// JSON Protocol Grammar
// Job definitions per protocol version, loaded from a JSON document

use hbci_core::domain::JobDefinition;
use hbci_core::port::ProtocolGrammar;
use hbci_core::{AppError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One protocol version and the jobs it defines
#[derive(Debug, Deserialize)]
struct VersionEntry {
    hbci_version: u32,
    jobs: Vec<JobDefinition>,
}

/// Grammar backed by a JSON file of the form
/// `[{"hbci_version": 300, "jobs": [<JobDefinition>, ...]}, ...]`
#[derive(Debug, Default)]
pub struct JsonGrammar {
    jobs: BTreeMap<u32, Vec<JobDefinition>>,
}

impl JsonGrammar {
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<VersionEntry> = serde_json::from_str(text)
            .map_err(|e| AppError::Config(format!("invalid grammar: {}", e)))?;
        let mut jobs: BTreeMap<u32, Vec<JobDefinition>> = BTreeMap::new();
        for entry in entries {
            jobs.entry(entry.hbci_version).or_default().extend(entry.jobs);
        }
        info!(versions = jobs.len(), "Protocol grammar loaded");
        Ok(Self { jobs })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl ProtocolGrammar for JsonGrammar {
    fn find_job(
        &self,
        name: &str,
        hbci_version: u32,
        segment_version: Option<u32>,
    ) -> Option<JobDefinition> {
        self.jobs
            .get(&hbci_version)?
            .iter()
            .filter(|d| d.name == name)
            .filter(|d| segment_version.map_or(true, |v| d.version == v))
            .max_by_key(|d| d.version)
            .cloned()
    }
}
