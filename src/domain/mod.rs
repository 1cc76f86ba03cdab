//! Domain types for the didit reporter.
//!
//! This module contains the core data structures:
//! - Config: Validated run configuration (agent, workflow script)
//! - Entity: Linked-data nodes of the provenance graph
//! - Events: Host scheduler callbacks as replayable data
//! - Task: Tasks and their execution records

pub mod config;
pub mod entity;
pub mod events;
pub mod task;

// Re-export commonly used types
pub use config::{AgentConfig, RunConfiguration, ValidatedConfig};
pub use entity::{Entity, Property};
pub use events::{load_event_log, parse_event_log, HostEvent};
pub use task::{
    ActionOutput, Task, TaskExecutionRecord, TaskPhase, TaskResult, TaskStatus,
    ACTION_OUTPUT_SEPARATOR,
};
