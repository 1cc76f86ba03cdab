//! Task lifecycle recorder.
//!
//! Receives per-task events in whatever order the host emits them and keeps
//! the task records and run-level errors. Events for different tasks may
//! interleave freely; events are never delivered concurrently.

use tracing::{debug, info, warn};

use crate::domain::{Task, TaskExecutionRecord, TaskPhase, TaskStatus};

use super::clock::Clock;
use super::graph::ProvenanceGraph;

/// Separator between run-level errors when folded into stderr
const RUN_ERROR_SEPARATOR: &str = "\n";

/// Records task telemetry into a provenance graph
pub struct TaskRecorder {
    /// Graph holding the task records
    graph: ProvenanceGraph,

    /// Errors outside any task (cleanup, scheduler runtime)
    run_errors: Vec<String>,

    /// Time source
    clock: Box<dyn Clock>,
}

impl TaskRecorder {
    pub fn new(graph: ProvenanceGraph, clock: Box<dyn Clock>) -> Self {
        Self {
            graph,
            run_errors: Vec::new(),
            clock,
        }
    }

    pub fn graph(&self) -> &ProvenanceGraph {
        &self.graph
    }

    /// Run-level errors in the order they were reported
    pub fn run_errors(&self) -> &[String] {
        &self.run_errors
    }

    /// Run-level errors joined for the stderr channel (empty if none)
    pub fn joined_run_errors(&self) -> String {
        self.run_errors.join(RUN_ERROR_SEPARATOR)
    }

    pub fn record(&self, name: &str) -> Option<&TaskExecutionRecord> {
        self.graph.task_record(name)
    }

    /// Task selected (up-to-date check); starts a fresh record
    pub fn selected(&mut self, task: &Task) {
        debug!(task = %task.name, "Task selected");
        self.graph.reset_task_record(&task.name);
    }

    /// Task execution started
    pub fn started(&mut self, task: &Task) {
        let now = self.clock.now();
        let record = self.known_record(&task.name);

        if record.phase == TaskPhase::Terminal {
            warn!(task = %task.name, "Start reported after task finished, ignoring");
            return;
        }

        record.start(now);
        debug!(task = %task.name, "Task started");
    }

    pub fn succeeded(&mut self, task: &Task) {
        self.finish(task, TaskStatus::Success, None);
    }

    pub fn failed(&mut self, task: &Task, message: impl Into<String>) {
        self.finish(task, TaskStatus::Fail, Some(message.into()));
    }

    pub fn skipped_up_to_date(&mut self, task: &Task) {
        self.finish(task, TaskStatus::UpToDate, None);
    }

    pub fn skipped_ignored(&mut self, task: &Task) {
        self.finish(task, TaskStatus::Ignore, None);
    }

    /// Error during cleanup
    pub fn cleanup_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "Cleanup error");
        self.run_errors.push(message);
    }

    /// Error from the scheduler, not from a task
    pub fn runtime_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "Runtime error");
        self.run_errors.push(message);
    }

    fn finish(&mut self, task: &Task, status: TaskStatus, error: Option<String>) {
        let now = self.clock.now();
        let record = self.known_record(&task.name);

        if record.is_terminal() {
            warn!(
                task = %task.name,
                previous = record.status.as_str(),
                status = status.as_str(),
                "Task finished twice, last result wins"
            );
        }

        record.finish(status, task, error, now);

        match status {
            TaskStatus::Fail => info!(
                task = %task.name,
                error = record.error_message.as_deref().unwrap_or_default(),
                "Task failed"
            ),
            _ => info!(
                task = %task.name,
                status = status.as_str(),
                elapsed = ?record.elapsed_seconds(),
                "Task finished"
            ),
        }
    }

    /// Record for a task, creating one if the host skipped `selected`
    fn known_record(&mut self, name: &str) -> &mut TaskExecutionRecord {
        if self.graph.task_record(name).is_none() {
            warn!(task = name, "Event for a task that was never selected");
        }
        self.graph.upsert_task_record(name)
    }
}
