//! Host-facing reporter.
//!
//! [`TaskReporter`] is the callback contract a host scheduler drives.
//! [`WorkflowRunReporter`] implements it by validating its options up front,
//! capturing the standard streams for the whole run, recording task events
//! and writing a Workflow Run Crate when the run completes.

use std::fmt;
use std::io::Write;

use tracing::{debug, error, info};

use crate::config::ReporterSettings;
use crate::domain::{Task, ValidatedConfig};
use crate::error::ReportError;
use crate::profiles::Profile;

use super::capture::{CaptureScope, ProcessCapture, StreamCapture};
use super::clock::{Clock, SystemClock};
use super::finalizer::{finalize, FinalizedArtifact};
use super::graph::ProvenanceGraph;
use super::recorder::TaskRecorder;
use super::validator::validate_run_config;

/// Callbacks a host scheduler emits while running tasks
pub trait TaskReporter {
    /// Run starts
    fn initialize(&mut self, all_tasks: &[String], selected_tasks: &[String]);

    /// Task selected (check if up-to-date)
    fn status_checked(&mut self, task: &Task);

    /// Task execution starts
    fn execute_task(&mut self, task: &Task);

    /// Task finished successfully
    fn add_success(&mut self, task: &Task);

    /// Task finished with a failure
    fn add_failure(&mut self, task: &Task, error: &dyn fmt::Display);

    /// Task skipped, up to date
    fn skip_uptodate(&mut self, task: &Task);

    /// Task skipped, ignored
    fn skip_ignore(&mut self, task: &Task);

    /// Error during cleanup
    fn cleanup_error(&mut self, error: &dyn fmt::Display);

    /// Error from the scheduler (not from a task execution)
    fn runtime_error(&mut self, message: &str);

    /// Teardown action of a task starts
    fn teardown_task(&mut self, task: &Task);

    /// All tasks finished
    fn complete_run(&mut self) -> Result<FinalizedArtifact, ReportError>;
}

/// Reports a run as a Workflow Run RO-Crate
pub struct WorkflowRunReporter {
    /// Task and run-error state
    recorder: TaskRecorder,

    /// Standard stream capture for the whole run
    capture: CaptureScope,

    /// Output destination
    settings: ReporterSettings,

    /// Where the status document goes
    outstream: Box<dyn Write>,

    /// Profile the options were validated against
    profile: &'static Profile,

    /// Set once `complete_run` was called
    completed: bool,
}

impl WorkflowRunReporter {
    /// Validate `options` and start capturing the process's standard streams.
    ///
    /// Configuration errors are returned before any stream is redirected.
    pub fn new(
        options: &serde_json::Value,
        settings: ReporterSettings,
        outstream: Box<dyn Write>,
    ) -> Result<Self, ReportError> {
        let config = validate_run_config(options)?;
        let clock = SystemClock;
        let graph = ProvenanceGraph::initialize(&config, clock.now())?;
        let capture = ProcessCapture::acquire()?;

        Ok(Self::from_parts(
            &config,
            graph,
            settings,
            outstream,
            Box::new(capture),
            Box::new(clock),
        ))
    }

    /// Build from already validated configuration and an explicit capture
    pub fn with_capture(
        config: ValidatedConfig,
        settings: ReporterSettings,
        outstream: Box<dyn Write>,
        capture: Box<dyn StreamCapture>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ReportError> {
        let graph = ProvenanceGraph::initialize(&config, clock.now())?;
        Ok(Self::from_parts(&config, graph, settings, outstream, capture, clock))
    }

    fn from_parts(
        config: &ValidatedConfig,
        graph: ProvenanceGraph,
        settings: ReporterSettings,
        outstream: Box<dyn Write>,
        capture: Box<dyn StreamCapture>,
        clock: Box<dyn Clock>,
    ) -> Self {
        info!(
            profile = %config.profile,
            workflow = %graph.workflow_id(),
            run_id = %graph.run_id(),
            "Reporting workflow run"
        );

        Self {
            recorder: TaskRecorder::new(graph, clock),
            capture: CaptureScope::new(capture),
            settings,
            outstream,
            profile: config.profile,
            completed: false,
        }
    }

    pub fn recorder(&self) -> &TaskRecorder {
        &self.recorder
    }

    pub fn profile(&self) -> &'static Profile {
        self.profile
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    /// Whether the standard streams are still being captured
    pub fn is_capturing(&self) -> bool {
        self.capture.is_active()
    }
}

impl TaskReporter for WorkflowRunReporter {
    fn initialize(&mut self, all_tasks: &[String], selected_tasks: &[String]) {
        debug!(
            all = all_tasks.len(),
            selected = selected_tasks.len(),
            "Run initialized"
        );
    }

    fn status_checked(&mut self, task: &Task) {
        self.recorder.selected(task);
    }

    fn execute_task(&mut self, task: &Task) {
        self.recorder.started(task);
    }

    fn add_success(&mut self, task: &Task) {
        self.recorder.succeeded(task);
    }

    fn add_failure(&mut self, task: &Task, error: &dyn fmt::Display) {
        self.recorder.failed(task, error.to_string());
    }

    fn skip_uptodate(&mut self, task: &Task) {
        self.recorder.skipped_up_to_date(task);
    }

    fn skip_ignore(&mut self, task: &Task) {
        self.recorder.skipped_ignored(task);
    }

    fn cleanup_error(&mut self, error: &dyn fmt::Display) {
        self.recorder.cleanup_error(error.to_string());
    }

    fn runtime_error(&mut self, message: &str) {
        self.recorder.runtime_error(message);
    }

    fn teardown_task(&mut self, task: &Task) {
        debug!(task = %task.name, "Teardown started");
    }

    fn complete_run(&mut self) -> Result<FinalizedArtifact, ReportError> {
        if self.completed {
            return Err(ReportError::AlreadyCompleted);
        }
        self.completed = true;

        finalize(
            &self.recorder,
            &mut self.capture,
            &self.settings.crate_dir,
            &mut *self.outstream,
        )
        .map_err(|e| {
            error!(error = %e, "Failed to finalize workflow run crate");
            e
        })
    }
}
