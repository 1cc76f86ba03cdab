//! Core reporting logic.
//!
//! This module contains:
//! - Validator: Run configuration validation against a profile shape
//! - Graph: The provenance graph and its closure check
//! - Recorder: Task lifecycle state machine
//! - Capture: Run-scoped stdout/stderr capture
//! - Finalizer: Crate and status document output
//! - Reporter: The host callback contract and its crate-writing implementation

pub mod capture;
pub mod clock;
pub mod finalizer;
pub mod graph;
pub mod recorder;
pub mod replay;
pub mod reporter;
pub mod validator;

// Re-export commonly used types
pub use capture::{
    CaptureError, CaptureScope, CapturedOutput, MemoryCapture, ProcessCapture, SharedBuffer,
    StreamCapture,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use finalizer::{finalize, FinalizedArtifact, RunStatus};
pub use graph::{check_closure, ProvenanceGraph};
pub use recorder::TaskRecorder;
pub use replay::replay;
pub use reporter::{TaskReporter, WorkflowRunReporter};
pub use validator::{validate, validate_run_config, ConfigError, Violation};
