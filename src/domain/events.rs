//! Host scheduler callbacks as data.
//!
//! A run can be recorded as newline-delimited JSON (one [`HostEvent`] per
//! line) and replayed through any reporter later.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A single callback from the host scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Run starts; lists every known task and the selected ones
    Initialize {
        #[serde(default)]
        all_tasks: Vec<String>,
        #[serde(default)]
        selected_tasks: Vec<String>,
    },

    /// Task selected (up-to-date check)
    StatusChecked { task: Task },

    /// Task execution starts
    ExecuteTask { task: Task },

    /// Task finished successfully
    AddSuccess { task: Task },

    /// Task finished with a failure
    AddFailure { task: Task, error: String },

    /// Task skipped as up to date
    SkipUptodate { task: Task },

    /// Task skipped as ignored
    SkipIgnore { task: Task },

    /// Error during cleanup
    CleanupError { error: String },

    /// Error from the scheduler itself, not from a task
    RuntimeError { message: String },

    /// Teardown action of a task starts
    TeardownTask { task: Task },

    /// All tasks finished
    CompleteRun,
}

impl HostEvent {
    /// Task name the event refers to, if any
    pub fn task_name(&self) -> Option<&str> {
        match self {
            HostEvent::StatusChecked { task }
            | HostEvent::ExecuteTask { task }
            | HostEvent::AddSuccess { task }
            | HostEvent::AddFailure { task, .. }
            | HostEvent::SkipUptodate { task }
            | HostEvent::SkipIgnore { task }
            | HostEvent::TeardownTask { task } => Some(&task.name),
            _ => None,
        }
    }
}

/// Parse a JSONL event log
pub fn parse_event_log(content: &str) -> Result<Vec<HostEvent>> {
    let mut events = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: HostEvent = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse event on line {}: {}", line_no + 1, line))?;
        events.push(event);
    }

    Ok(events)
}

/// Read and parse a JSONL event log from disk
pub fn load_event_log(path: &Path) -> Result<Vec<HostEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log: {}", path.display()))?;

    parse_event_log(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_log() {
        let log = r#"
{"event":"status_checked","task":{"name":"build"}}
{"event":"execute_task","task":{"name":"build"}}

{"event":"add_failure","task":{"name":"build","actions":[{"out":"cc main.c"}]},"error":"compile error"}
{"event":"runtime_error","message":"scheduler crashed"}
{"event":"complete_run"}
"#;

        let events = parse_event_log(log).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].task_name(), Some("build"));
        match &events[2] {
            HostEvent::AddFailure { task, error } => {
                assert_eq!(error, "compile error");
                assert_eq!(task.actions[0].out.as_deref(), Some("cc main.c"));
                assert_eq!(task.actions[0].err, None);
            }
            other => panic!("Expected AddFailure, got {:?}", other),
        }
        assert_eq!(events[4], HostEvent::CompleteRun);
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_event_log("{\"event\":\"complete_run\"}\n{\"event\":\"nope\"}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
