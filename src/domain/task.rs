//! Task execution records.
//!
//! A record follows a single task through `selected -> [started] -> terminal`.
//! Terminal events may repeat; the last one wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator placed between the outputs of consecutive actions
pub const ACTION_OUTPUT_SEPARATOR: &str = "\n<------------------------------------------------>\n";

/// Format used for the `started` field of the status document
pub const STARTED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Output captured from one executed sub-step of a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Captured stdout, if the action captured any
    #[serde(default)]
    pub out: Option<String>,

    /// Captured stderr, if the action captured any
    #[serde(default)]
    pub err: Option<String>,
}

impl ActionOutput {
    pub fn new(out: Option<&str>, err: Option<&str>) -> Self {
        Self {
            out: out.map(str::to_string),
            err: err.map(str::to_string),
        }
    }
}

/// A task as reported by the host scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task name (unique within a run)
    pub name: String,

    /// Executed actions, in order
    #[serde(default)]
    pub actions: Vec<ActionOutput>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ActionOutput) -> Self {
        self.actions.push(action);
        self
    }

    /// Join non-empty action stdout with the action separator
    pub fn joined_out(&self) -> String {
        join_outputs(self.actions.iter().map(|a| a.out.as_deref()))
    }

    /// Join non-empty action stderr with the action separator
    pub fn joined_err(&self) -> String {
        join_outputs(self.actions.iter().map(|a| a.err.as_deref()))
    }
}

fn join_outputs<'a>(outputs: impl Iterator<Item = Option<&'a str>>) -> String {
    outputs
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(ACTION_OUTPUT_SEPARATOR)
}

/// Outcome of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// No terminal event seen yet
    #[default]
    Unknown,

    /// Executed successfully
    Success,

    /// Executed and failed
    Fail,

    /// Skipped because it was up to date
    UpToDate,

    /// Skipped because it was ignored
    Ignore,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unknown => "unknown",
            TaskStatus::Success => "success",
            TaskStatus::Fail => "fail",
            TaskStatus::UpToDate => "up-to-date",
            TaskStatus::Ignore => "ignore",
        }
    }
}

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Selected, not yet started
    Pending,

    /// Execution started
    Running,

    /// A terminal event was recorded
    Terminal,
}

/// Telemetry recorded for one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskExecutionRecord {
    /// Task name, also the record identity
    pub name: String,

    /// Lifecycle phase
    pub phase: TaskPhase,

    /// Outcome (unknown until terminal)
    pub status: TaskStatus,

    /// Joined action stdout (set at the terminal event)
    pub stdout: Option<String>,

    /// Joined action stderr (set at the terminal event)
    pub stderr: Option<String>,

    /// Failure message reported by the host
    pub error_message: Option<String>,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When the terminal event was recorded
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskExecutionRecord {
    /// Create a pending record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: TaskPhase::Pending,
            status: TaskStatus::Unknown,
            stdout: None,
            stderr: None,
            error_message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Record the start of execution
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.phase = TaskPhase::Running;
    }

    /// Record a terminal outcome, replacing any earlier one
    pub fn finish(
        &mut self,
        status: TaskStatus,
        task: &Task,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.finished_at = Some(now);
        self.status = status;
        self.stdout = Some(task.joined_out());
        self.stderr = Some(task.joined_err());
        self.error_message = error;
        self.phase = TaskPhase::Terminal;
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == TaskPhase::Terminal
    }

    /// Seconds between start and terminal event, absent unless both were seen
    pub fn elapsed_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        let micros = (finished - started).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0)
    }

    /// Convert to the status document entry
    pub fn to_result(&self) -> TaskResult {
        TaskResult {
            name: self.name.clone(),
            result: match self.status {
                TaskStatus::Unknown => None,
                status => Some(status),
            },
            out: self.stdout.clone(),
            err: self.stderr.clone(),
            error: self.error_message.clone(),
            started: self
                .started_at
                .map(|t| t.format(STARTED_FORMAT).to_string()),
            elapsed: self.elapsed_seconds(),
        }
    }
}

/// One task entry of the status document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub name: String,

    /// fail, success, up-to-date, ignore (null if never terminal)
    pub result: Option<TaskStatus>,

    /// stdout from the task's actions
    pub out: Option<String>,

    /// stderr from the task's actions
    pub err: Option<String>,

    /// error reported by the host
    pub error: Option<String>,

    /// when execution started
    pub started: Option<String>,

    /// time (in secs) taken to execute the task
    pub elapsed: Option<f64>,
}
