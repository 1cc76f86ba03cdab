//! The provenance graph of a run.
//!
//! Entities are keyed by identifier and kept in insertion order so the
//! serialized crate is reproducible. Task execution records live next to the
//! entities and become `CreateAction` nodes when the graph is serialized.
//!
//! The one invariant enforced here is referential closure: every reference
//! in the serialized document must name an entity in the same document.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Entity, Property, TaskExecutionRecord, TaskPhase, TaskStatus, ValidatedConfig};
use crate::error::ReportError;

use super::validator::ConfigError;

pub const RO_CRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";
pub const RO_CRATE_1_1: &str = "https://w3id.org/ro/crate/1.1";
pub const METADATA_ID: &str = "ro-crate-metadata.json";
pub const ROOT_ID: &str = "./";

const WORKFLOW_TYPES: &[&str] = &["File", "SoftwareSourceCode", "ComputationalWorkflow"];

/// A programming language a workflow script can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

const LANGUAGES: &[(&str, Language)] = &[
    ("py", Language { id: "#python", name: "Python", url: "https://www.python.org/" }),
    ("sh", Language { id: "#bash", name: "Bash", url: "https://www.gnu.org/software/bash/" }),
    ("bash", Language { id: "#bash", name: "Bash", url: "https://www.gnu.org/software/bash/" }),
    ("r", Language { id: "#r", name: "R", url: "https://www.r-project.org/" }),
    ("rs", Language { id: "#rust", name: "Rust", url: "https://www.rust-lang.org/" }),
    ("nf", Language { id: "#nextflow", name: "Nextflow", url: "https://www.nextflow.io/" }),
    ("smk", Language { id: "#snakemake", name: "Snakemake", url: "https://snakemake.readthedocs.io/" }),
    ("cwl", Language { id: "#cwl", name: "Common Workflow Language", url: "https://w3id.org/cwl/" }),
];

/// Guess the language of a script from its extension
pub fn language_for(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Identifier of the workflow entity: the script's file name
pub fn workflow_id(script_path: &Path) -> String {
    script_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| script_path.to_string_lossy().into_owned())
}

/// Entity identifier of a task's `CreateAction`
pub fn action_id(task_name: &str) -> String {
    format!("#task-{}", task_name)
}

/// Provenance graph for a single run
#[derive(Debug, Clone)]
pub struct ProvenanceGraph {
    /// Static entities (agent, workflow, profiles, ...)
    entities: IndexMap<String, Entity>,

    /// Per-task records, in first-selected order
    tasks: IndexMap<String, TaskExecutionRecord>,

    /// Identifier of the run agent
    agent_id: String,

    /// Identifier of the workflow entity
    workflow_id: String,

    /// Run identifier recorded on the root dataset
    run_id: Uuid,
}

impl ProvenanceGraph {
    /// Build the graph from validated configuration.
    ///
    /// Must be called once per run. Fails if two of the run's entities
    /// would share an identifier (e.g. an agent id equal to the script name).
    pub fn initialize(
        config: &ValidatedConfig,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let run = &config.run;
        let agent_id = run.agent.orcid_url.clone();
        let script_path = run.script_path();
        let workflow_id = workflow_id(script_path);
        let run_id = Uuid::new_v4();

        let mut graph = Self {
            entities: IndexMap::new(),
            tasks: IndexMap::new(),
            agent_id: agent_id.clone(),
            workflow_id: workflow_id.clone(),
            run_id,
        };

        graph.add_entity(
            Entity::new(METADATA_ID, &["CreativeWork"])
                .with_reference("about", ROOT_ID)
                .with_reference("conformsTo", RO_CRATE_1_1),
        )?;

        graph.add_entity(
            Entity::new(ROOT_ID, &["Dataset"])
                .with_literal("name", format!("Workflow run of {}", workflow_id))
                .with_literal("identifier", format!("urn:uuid:{}", run_id))
                .with_literal("datePublished", created_at.to_rfc3339())
                .with_references(
                    "conformsTo",
                    config.profile.declarations.iter().map(|d| d.id),
                )
                .with_reference("mainEntity", workflow_id.clone())
                .with_references("hasPart", [workflow_id.clone()]),
        )?;

        let mut workflow = Entity::new(workflow_id.clone(), WORKFLOW_TYPES)
            .with_literal("name", workflow_id.clone())
            .with_literal("url", source_url(script_path))
            .with_literal("main", true);

        let language = language_for(script_path);
        if let Some(lang) = language {
            workflow = workflow.with_reference("programmingLanguage", lang.id);
        }

        match std::fs::read(script_path) {
            Ok(content) => {
                workflow.set_literal("sha256", hex::encode(Sha256::digest(&content)));
                workflow.set_literal("contentSize", content.len().to_string());
            }
            Err(e) => {
                debug!(path = %script_path.display(), error = %e, "Workflow script not readable, skipping digest");
            }
        }

        graph.add_entity(
            workflow
                .with_reference("author", agent_id.clone())
                .with_reference("creator", agent_id.clone()),
        )?;

        if let Some(lang) = language {
            graph.add_entity(
                Entity::new(lang.id, &["ComputerLanguage"])
                    .with_literal("name", lang.name)
                    .with_literal("url", lang.url),
            )?;
        }

        graph.add_entity(
            Entity::new(agent_id, &["Person"])
                .with_literal("name", run.agent.name.clone())
                .with_literal("affiliation", run.agent.affiliation.clone()),
        )?;

        graph.add_entity(
            Entity::new(RO_CRATE_1_1, &["CreativeWork"])
                .with_literal("name", "RO-Crate")
                .with_literal("version", "1.1"),
        )?;

        for decl in config.profile.declarations {
            graph.add_entity(
                Entity::new(decl.id, &["CreativeWork"])
                    .with_literal("name", decl.name)
                    .with_literal("version", decl.version),
            )?;
        }

        debug!(
            profile = %config.profile,
            agent = %graph.agent_id,
            workflow = %graph.workflow_id,
            entities = graph.entities.len(),
            "Provenance graph initialized"
        );

        Ok(graph)
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Add an entity, refusing an identifier that is already taken
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), ConfigError> {
        match self.entities.entry(entity.id.clone()) {
            Entry::Occupied(entry) => Err(ConfigError::DuplicateIdentifier {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(entity);
                Ok(())
            }
        }
    }

    /// Remove an entity, keeping the order of the rest
    pub fn remove_entity(&mut self, id: &str) -> Option<Entity> {
        self.entities.shift_remove(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Get the record for a task, creating a pending one if absent
    pub fn upsert_task_record(&mut self, name: &str) -> &mut TaskExecutionRecord {
        self.tasks
            .entry(name.to_string())
            .or_insert_with(|| TaskExecutionRecord::new(name))
    }

    /// Replace the record for a task with a fresh pending one.
    ///
    /// A replaced record keeps its original position.
    pub fn reset_task_record(&mut self, name: &str) -> &mut TaskExecutionRecord {
        let fresh = TaskExecutionRecord::new(name);
        match self.tasks.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                warn!(task = name, "Task selected again, previous record overwritten");
                *entry.get_mut() = fresh;
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(fresh),
        }
    }

    pub fn task_record(&self, name: &str) -> Option<&TaskExecutionRecord> {
        self.tasks.get(name)
    }

    /// Task records in insertion order
    pub fn task_records(&self) -> impl Iterator<Item = &TaskExecutionRecord> {
        self.tasks.values()
    }

    fn action_entity(&self, record: &TaskExecutionRecord) -> Entity {
        let mut action = Entity::new(action_id(&record.name), &["CreateAction"])
            .with_literal("name", record.name.clone())
            .with_literal("description", record.status.as_str())
            .with_literal("actionStatus", action_status(record))
            .with_reference("instrument", self.workflow_id.clone())
            .with_reference("agent", self.agent_id.clone());

        if let Some(started) = record.started_at {
            action.set_literal("startTime", started.to_rfc3339());
        }
        if let Some(finished) = record.finished_at {
            action.set_literal("endTime", finished.to_rfc3339());
        }
        if let Some(ref error) = record.error_message {
            action.set_literal("error", error.clone());
        }

        action
    }

    /// All entities that would be serialized, task actions included
    pub fn nodes(&self) -> Vec<Entity> {
        let actions: Vec<Entity> = self
            .tasks
            .values()
            .map(|record| self.action_entity(record))
            .collect();

        let mut nodes: Vec<Entity> = self.entities.values().cloned().collect();
        if !actions.is_empty() {
            if let Some(root) = nodes.iter_mut().find(|e| e.id == ROOT_ID) {
                root.properties.insert(
                    "mentions".to_string(),
                    Property::References(actions.iter().map(|a| a.id.clone()).collect()),
                );
            }
        }
        nodes.extend(actions);
        nodes
    }

    /// Produce the JSON-LD document, failing on any dangling reference
    pub fn serialize(&self) -> Result<Value, ReportError> {
        let nodes = self.nodes();
        check_closure(&nodes)?;

        Ok(json!({
            "@context": RO_CRATE_CONTEXT,
            "@graph": nodes.iter().map(Entity::to_json).collect::<Vec<_>>(),
        }))
    }
}

/// Verify identifiers are unique and every reference resolves to one of `entities`
pub fn check_closure(entities: &[Entity]) -> Result<(), ReportError> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(entities.len());
    for entity in entities {
        if !ids.insert(entity.id.as_str()) {
            return Err(ReportError::DuplicateEntity {
                id: entity.id.clone(),
            });
        }
    }

    for entity in entities {
        for (property, target) in entity.references() {
            if !ids.contains(target) {
                return Err(ReportError::ReferentialIntegrity {
                    entity: entity.id.clone(),
                    property: property.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }

    Ok(())
}

fn action_status(record: &TaskExecutionRecord) -> &'static str {
    match (record.phase, record.status) {
        (_, TaskStatus::Fail) => "http://schema.org/FailedActionStatus",
        (_, TaskStatus::Success) | (_, TaskStatus::UpToDate) => {
            "http://schema.org/CompletedActionStatus"
        }
        (TaskPhase::Running, _) => "http://schema.org/ActiveActionStatus",
        _ => "http://schema.org/PotentialActionStatus",
    }
}

fn source_url(script_path: &Path) -> String {
    match script_path.canonicalize() {
        Ok(full) => format!("file://{}", full.display()),
        Err(_) => script_path.display().to_string(),
    }
}
