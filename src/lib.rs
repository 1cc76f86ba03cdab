//! didit - Workflow Run RO-Crate provenance for task runs
//!
//! A reporter a task scheduler calls while it runs a batch of tasks. It
//! records when each task started, how it ended and what it printed, and on
//! completion writes a Workflow Run RO-Crate (`ro-crate-metadata.json`)
//! describing the run, plus a JSON status document.
//!
//! # Architecture
//!
//! - Options are validated against the selected crate profile before
//!   anything is captured or recorded
//! - Standard streams are captured for the whole run and released exactly
//!   once, at completion or on drop
//! - Task events update a per-task state machine held by the provenance graph
//! - The graph is checked for referential closure before it is written
//!
//! # Modules
//!
//! - `profiles`: Crate profiles and their configuration shape
//! - `core`: Validation, graph, recorder, capture, finalization, reporter
//! - `domain`: Data structures (Task, TaskExecutionRecord, Entity, HostEvent)
//! - `config`: Options file discovery and loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Check an options file
//! didit validate --config .didit/config.yaml
//!
//! # Replay a recorded run into ./crate
//! didit replay --events run.jsonl --crate-dir crate
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod profiles;

// Re-export main types at crate root for convenience
pub use config::ReporterSettings;
pub use crate::core::{
    replay, CaptureScope, Clock, ConfigError, FinalizedArtifact, ManualClock, MemoryCapture,
    ProvenanceGraph, RunStatus, SharedBuffer, StreamCapture, SystemClock, TaskRecorder,
    TaskReporter, Violation, WorkflowRunReporter,
};
pub use domain::{ActionOutput, HostEvent, Task, TaskResult, TaskStatus, ValidatedConfig};
pub use error::ReportError;
pub use profiles::Profile;
