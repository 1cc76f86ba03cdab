//! Validated run configuration.
//!
//! These types are only ever built from configuration that already passed
//! [`crate::core::validator::validate_run_config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::profiles::Profile;

/// The person or organisation running the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name
    pub name: String,

    /// Institutional affiliation
    pub affiliation: String,

    /// ORCID (or other) identifier URL, used as the agent's entity id
    pub orcid_url: String,
}

/// User-supplied seed for the provenance graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Profile identifier (key into the profile registry)
    pub crate_profile: String,

    /// Agent responsible for the run
    pub agent: AgentConfig,

    /// Path to the workflow definition being run
    pub script_path: PathBuf,
}

impl RunConfiguration {
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

/// A run configuration paired with the profile it was validated against
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// The selected profile
    pub profile: &'static Profile,

    /// Coerced configuration values
    pub run: RunConfiguration,
}
