// SEPA Profile Service - selects and caches the export profile of a job

use crate::domain::sepa::PROFILE_FAMILY;
use crate::domain::{ExportProfile, Job, SepaProfileSelector, User};
use crate::error::Result;
use crate::port::ProfileRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SepaProfileService {
    registry: Arc<dyn ProfileRegistry>,
}

impl SepaProfileService {
    pub fn new(registry: Arc<dyn ProfileRegistry>) -> Self {
        Self { registry }
    }

    /// Find the export profile for `job`.
    ///
    /// Without `name` a cached profile matching `pattern` is reused, otherwise
    /// the highest-ranked registered profile the bank supports is chosen. With
    /// `name` that profile is looked up and validated. The result replaces
    /// the job's cached profile.
    ///
    /// The job's descriptor override wins over the user's descriptors.
    pub fn find_for_job(
        &self,
        job: &mut Job,
        user: &User,
        pattern: &str,
        name: Option<&str>,
    ) -> Result<ExportProfile> {
        if name.is_none() {
            if let Some(cached) = job.sepa_profile() {
                if cached.matches_type(pattern) {
                    debug!(job = %job.name(), profile = %cached.name, "Using cached SEPA profile");
                    return Ok(cached.clone());
                }
            }
        }

        let descriptors: Vec<String> = match job.sepa_descriptors() {
            Some(list) => list.to_vec(),
            None => user.sepa_descriptors.clone(),
        };
        let selector = SepaProfileSelector::new(&descriptors).map_err(|e| {
            warn!(job = %job.name(), user_id = %user.id, "No SEPA descriptors for user");
            e
        })?;

        let profile = match name {
            Some(name) => {
                let found = self.registry.profile(PROFILE_FAMILY, name)?;
                selector.validate_named(name, found, pattern)?
            }
            None => {
                let profiles = self.registry.profiles(PROFILE_FAMILY)?;
                selector.select_highest(profiles, pattern)?
            }
        };

        info!(
            job = %job.name(),
            profile = %profile.name,
            descriptor = ?profile.descriptor,
            "SEPA profile chosen"
        );
        job.set_sepa_profile(Some(profile.clone()));
        Ok(profile)
    }
}
