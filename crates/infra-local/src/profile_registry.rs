// Static Export Profile Registry

use hbci_core::domain::ExportProfile;
use hbci_core::port::ProfileRegistry;
use hbci_core::{AppError, Result};
use std::collections::HashMap;

/// Profiles grouped by format family, fixed at construction
#[derive(Debug, Default)]
pub struct StaticProfileRegistry {
    families: HashMap<String, Vec<ExportProfile>>,
}

impl StaticProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(mut self, family: &str, profiles: Vec<ExportProfile>) -> Self {
        self.families
            .entry(family.to_string())
            .or_default()
            .extend(profiles);
        self
    }

    /// `{"<family>": [<ExportProfile>, ...], ...}`
    pub fn from_json(text: &str) -> Result<Self> {
        let families = serde_json::from_str(text)
            .map_err(|e| AppError::Config(format!("invalid profile list: {}", e)))?;
        Ok(Self { families })
    }
}

impl ProfileRegistry for StaticProfileRegistry {
    fn profiles(&self, family: &str) -> Result<Vec<ExportProfile>> {
        self.families
            .get(family)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("profile family \"{}\"", family)))
    }
}
