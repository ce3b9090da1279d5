// Job Factory - creates jobs seeded with bank parameter data

use crate::application::settings::EngineSettings;
use crate::domain::{DomainError, Job, JobDefinition, User};
use crate::error::Result;
use crate::port::grammar::group_version;
use crate::port::{ProtocolGrammar, TimeProvider};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates jobs for a user from the protocol grammar and the user's BPD
pub struct JobFactory {
    grammar: Arc<dyn ProtocolGrammar>,
    time_provider: Arc<dyn TimeProvider>,
    settings: EngineSettings,
}

impl JobFactory {
    pub fn new(
        grammar: Arc<dyn ProtocolGrammar>,
        time_provider: Arc<dyn TimeProvider>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            grammar,
            time_provider,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Create job `name` for `user`.
    ///
    /// Jobs that need bank parameters use the highest segment version both
    /// the bank and the grammar support.
    ///
    /// # Errors
    /// - `DomainError::NotFound` if the grammar has no such job or the bank
    ///   does not offer any version of it
    /// - `DomainError::BadData` if the job needs parameters but the user has no BPD
    pub fn create(&self, name: &str, user: &User) -> Result<Job> {
        let hbci_version = user.effective_hbci_version();
        let latest = self.definition(name, hbci_version, None)?;

        let (definition, params) = match latest.params.clone() {
            None => (latest, Value::Null),
            Some(params_name) => {
                let versions = self.sample_bpd_versions(name, user)?;
                let (version, params) = versions.into_iter().next_back().ok_or_else(|| {
                    warn!(job = name, params = %params_name, "Job not supported by the bank");
                    DomainError::NotFound(format!("job \"{}\" not supported by the bank", name))
                })?;
                (self.definition(name, hbci_version, Some(version))?, params)
            }
        };

        info!(
            job = name,
            user_id = %user.id,
            hbci_version,
            segment_version = definition.version,
            "Creating job"
        );
        Ok(Job::new(
            definition,
            params,
            user,
            Arc::clone(&self.time_provider),
            &self.settings.provider_name,
        ))
    }

    /// Every BPD parameter group of job `name` for which a local definition exists.
    ///
    /// Empty if the job needs no parameters.
    pub fn sample_bpd_versions(&self, name: &str, user: &User) -> Result<BTreeMap<u32, Value>> {
        let hbci_version = user.effective_hbci_version();
        let definition = self.definition(name, hbci_version, None)?;
        let Some(params_name) = definition.params else {
            debug!(job = name, "Job needs no bank parameters");
            return Ok(BTreeMap::new());
        };
        let bpd = user.bpd.as_ref().ok_or_else(|| {
            DomainError::BadData(format!("no bank parameter data for user {}", user.id))
        })?;

        let mut versions = BTreeMap::new();
        for group in self.grammar.param_groups(bpd, &params_name) {
            let Some(version) = group_version(&group) else {
                debug!(job = name, "Parameter group without version");
                continue;
            };
            if self
                .grammar
                .find_job(name, hbci_version, Some(version))
                .is_some()
            {
                versions.insert(version, group);
            } else {
                debug!(job = name, version, "No local definition for BPD version");
            }
        }
        Ok(versions)
    }

    /// Highest supported segment version not above `max`
    pub fn max_version_up_until(&self, name: &str, user: &User, max: u32) -> Result<Option<u32>> {
        let versions = self.sample_bpd_versions(name, user)?;
        Ok(versions.into_keys().filter(|v| *v > 0 && *v <= max).max())
    }

    fn definition(
        &self,
        name: &str,
        hbci_version: u32,
        segment_version: Option<u32>,
    ) -> Result<JobDefinition> {
        self.grammar
            .find_job(name, hbci_version, segment_version)
            .ok_or_else(|| {
                warn!(job = name, hbci_version, ?segment_version, "Job definition not found");
                DomainError::NotFound(format!("job definition \"{}\"", name)).into()
            })
    }
}
