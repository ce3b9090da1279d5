//! SEPA profile selection.
//!
//! Profiles declare a 10-character `sepaType` (e.g. `001.001.03` for
//! `pain.001.001.03`). The bank advertises format descriptors (usually full
//! URNs). A profile is supported when `*<sepaType>*` matches at least one
//! descriptor. Among all matching, supported profiles the one with the highest
//! `sepaType` wins, ties broken by the highest name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{debug, info};

/// Significant length of a sepaType; longer values are truncated for matching
pub const SEPA_TYPE_LEN: usize = 10;

/// Format family SEPA export profiles are registered under
pub const PROFILE_FAMILY: &str = "xml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SepaError {
    #[error("No SEPA descriptor available, account information needs an update")]
    NoDescriptors,

    #[error("Profile \"{0}\" not available")]
    ProfileNotFound(String),

    #[error("Profile \"{name}\" does not match type specification \"{pattern}\"")]
    TypeMismatch { name: String, pattern: String },

    #[error("Profile \"{0}\" not supported by bank server")]
    UnsupportedByBank(String),

    #[error("No matching profile found for \"{0}\"")]
    NoMatchingProfile(String),
}

/// A registered export profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProfile {
    pub name: String,
    #[serde(rename = "sepaType")]
    pub sepa_type: String,
    /// Bank descriptor that matched this profile, recorded during selection
    #[serde(default)]
    pub descriptor: Option<String>,
    /// Exporter parameters, opaque to the job layer
    #[serde(default)]
    pub params: Value,
}

impl ExportProfile {
    pub fn new(name: impl Into<String>, sepa_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sepa_type: sepa_type.into(),
            descriptor: None,
            params: Value::Null,
        }
    }

    pub fn matches_type(&self, pattern: &str) -> bool {
        wildcard_match(&self.sepa_type, pattern)
    }
}

/// Glob comparison supporting `*` (any run) and `?` (any single char), case-sensitive
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            pi = star_p + 1;
            ti = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// `*<first 10 chars of sepaType>*`
pub fn descriptor_pattern(sepa_type: &str) -> String {
    let core: String = sepa_type.chars().take(SEPA_TYPE_LEN).collect();
    format!("*{}*", core)
}

/// Check bank support and record the first matching descriptor on the profile
pub fn mark_if_supported(profile: &mut ExportProfile, descriptors: &[String]) -> bool {
    let pattern = descriptor_pattern(&profile.sepa_type);
    match descriptors.iter().find(|d| wildcard_match(d, &pattern)) {
        Some(d) => {
            profile.descriptor = Some(d.clone());
            true
        }
        None => false,
    }
}

/// Ordering of decreasing precedence: sepaType descending, then name descending
pub fn precedence(a: &ExportProfile, b: &ExportProfile) -> Ordering {
    b.sepa_type
        .cmp(&a.sepa_type)
        .then_with(|| b.name.cmp(&a.name))
}

/// Pure selection over already-loaded data
pub struct SepaProfileSelector<'a> {
    descriptors: &'a [String],
}

impl<'a> SepaProfileSelector<'a> {
    pub fn new(descriptors: &'a [String]) -> Result<Self, SepaError> {
        if descriptors.is_empty() {
            return Err(SepaError::NoDescriptors);
        }
        Ok(Self { descriptors })
    }

    /// Drop profiles not matching `pattern` or not supported by the bank
    pub fn filter(&self, profiles: Vec<ExportProfile>, pattern: &str) -> Vec<ExportProfile> {
        profiles
            .into_iter()
            .filter_map(|mut p| {
                if !p.matches_type(pattern) {
                    debug!(profile = %p.name, sepa_type = %p.sepa_type, pattern, "Profile does not match pattern");
                    return None;
                }
                if !mark_if_supported(&mut p, self.descriptors) {
                    debug!(profile = %p.name, sepa_type = %p.sepa_type, "Profile not supported by bank");
                    return None;
                }
                Some(p)
            })
            .collect()
    }

    /// Highest-ranked profile among those matching `pattern` and supported by the bank
    pub fn select_highest(
        &self,
        profiles: Vec<ExportProfile>,
        pattern: &str,
    ) -> Result<ExportProfile, SepaError> {
        let mut candidates = self.filter(profiles, pattern);
        candidates.sort_by(precedence);
        let winner = candidates
            .into_iter()
            .next()
            .ok_or_else(|| SepaError::NoMatchingProfile(pattern.to_string()))?;
        info!(profile = %winner.name, sepa_type = %winner.sepa_type, pattern, "Selected SEPA profile");
        Ok(winner)
    }

    /// Validate an explicitly named profile
    pub fn validate_named(
        &self,
        name: &str,
        profile: Option<ExportProfile>,
        pattern: &str,
    ) -> Result<ExportProfile, SepaError> {
        let mut profile = profile.ok_or_else(|| SepaError::ProfileNotFound(name.to_string()))?;
        if !profile.matches_type(pattern) {
            return Err(SepaError::TypeMismatch {
                name: name.to_string(),
                pattern: pattern.to_string(),
            });
        }
        if !mark_if_supported(&mut profile, self.descriptors) {
            return Err(SepaError::UnsupportedByBank(name.to_string()));
        }
        Ok(profile)
    }
}
