//! Profile registry for Workflow Run Crates.
//!
//! A profile names the structural contract the user-supplied run
//! configuration must satisfy, plus the conformance declarations the
//! generated crate asserts. The schemas here only cover the user space
//! input, not the full RO-Crate document.
//!
//! Profiles share shapes: all three built-in profiles currently accept the
//! same configuration layout, so they point at the same [`Shape`].

use std::fmt;

use crate::core::validator::ConfigError;

/// Declared type of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any scalar coercible to a string
    Text,

    /// Nested object with its own required fields
    Object(&'static [Field]),
}

/// A required key in a configuration shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Key name as it appears in the configuration file
    pub name: &'static str,

    /// Expected kind of the value
    pub kind: FieldKind,
}

impl Field {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn object(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            kind: FieldKind::Object(fields),
        }
    }
}

/// Declarative description of a configuration layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Top-level keys, all required
    pub fields: &'static [Field],
}

/// A well-known profile URI the crate declares conformance to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConformanceDeclaration {
    /// Profile URI, used as the entity identifier
    pub id: &'static str,

    /// Human-readable profile name
    pub name: &'static str,

    /// Profile version
    pub version: &'static str,
}

/// A registered crate profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    /// Identifier used in `crate_profile`
    pub id: &'static str,

    /// Shape the run configuration must match
    pub shape: &'static Shape,

    /// Profiles the generated crate claims to conform to
    pub declarations: &'static [ConformanceDeclaration],
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

const AGENT_FIELDS: &[Field] = &[
    Field::text("name"),
    Field::text("affiliation"),
    Field::text("orcid_url"),
];

/// Layout shared by every built-in profile
pub static RUN_CRATE_SHAPE: Shape = Shape {
    fields: &[
        Field::text("crate_profile"),
        Field::object("agent", AGENT_FIELDS),
        Field::text("script_path"),
    ],
};

pub const PROCESS_RUN_CRATE: ConformanceDeclaration = ConformanceDeclaration {
    id: "https://w3id.org/ro/wfrun/process/0.5",
    name: "Process Run Crate",
    version: "0.5",
};

pub const WORKFLOW_RUN_CRATE: ConformanceDeclaration = ConformanceDeclaration {
    id: "https://w3id.org/ro/wfrun/workflow/0.5",
    name: "Workflow Run Crate",
    version: "0.5",
};

pub const PROVENANCE_RUN_CRATE: ConformanceDeclaration = ConformanceDeclaration {
    id: "https://w3id.org/ro/wfrun/provenance/0.5",
    name: "Provenance Run Crate",
    version: "0.5",
};

pub const WORKFLOW_RO_CRATE: ConformanceDeclaration = ConformanceDeclaration {
    id: "https://w3id.org/workflowhub/workflow-ro-crate/1.0",
    name: "Workflow RO-Crate",
    version: "1.0",
};

static PROFILES: &[Profile] = &[
    Profile {
        id: "process-run",
        shape: &RUN_CRATE_SHAPE,
        declarations: &[PROCESS_RUN_CRATE, WORKFLOW_RO_CRATE],
    },
    Profile {
        id: "workflow-run",
        shape: &RUN_CRATE_SHAPE,
        declarations: &[PROCESS_RUN_CRATE, WORKFLOW_RUN_CRATE, WORKFLOW_RO_CRATE],
    },
    Profile {
        id: "provenance-run",
        shape: &RUN_CRATE_SHAPE,
        declarations: &[
            PROCESS_RUN_CRATE,
            WORKFLOW_RUN_CRATE,
            PROVENANCE_RUN_CRATE,
            WORKFLOW_RO_CRATE,
        ],
    },
];

/// All registered profiles, in registration order
pub fn profiles() -> impl Iterator<Item = &'static Profile> {
    PROFILES.iter()
}

/// Look up a profile by its identifier
pub fn lookup(profile_id: &str) -> Result<&'static Profile, ConfigError> {
    PROFILES
        .iter()
        .find(|p| p.id == profile_id)
        .ok_or_else(|| ConfigError::UnknownProfile {
            id: profile_id.to_string(),
            known: PROFILES.iter().map(|p| p.id).collect::<Vec<_>>().join(", "),
        })
}
