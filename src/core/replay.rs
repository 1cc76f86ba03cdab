//! Replay recorded host events through a reporter.

use tracing::{debug, warn};

use crate::domain::HostEvent;
use crate::error::ReportError;

use super::finalizer::FinalizedArtifact;
use super::reporter::TaskReporter;

/// Drive `reporter` with `events` in order.
///
/// Returns the finalized artifact if the log contained `complete_run`.
/// Events after completion are skipped.
pub fn replay<R>(reporter: &mut R, events: &[HostEvent]) -> Result<Option<FinalizedArtifact>, ReportError>
where
    R: TaskReporter + ?Sized,
{
    let mut artifact = None;

    for (index, event) in events.iter().enumerate() {
        if artifact.is_some() {
            warn!(index, ?event, "Event after run completion, skipping");
            continue;
        }

        debug!(index, task = ?event.task_name(), "Replaying event");
        match event {
            HostEvent::Initialize {
                all_tasks,
                selected_tasks,
            } => reporter.initialize(all_tasks, selected_tasks),
            HostEvent::StatusChecked { task } => reporter.status_checked(task),
            HostEvent::ExecuteTask { task } => reporter.execute_task(task),
            HostEvent::AddSuccess { task } => reporter.add_success(task),
            HostEvent::AddFailure { task, error } => reporter.add_failure(task, error),
            HostEvent::SkipUptodate { task } => reporter.skip_uptodate(task),
            HostEvent::SkipIgnore { task } => reporter.skip_ignore(task),
            HostEvent::CleanupError { error } => reporter.cleanup_error(error),
            HostEvent::RuntimeError { message } => reporter.runtime_error(message),
            HostEvent::TeardownTask { task } => reporter.teardown_task(task),
            HostEvent::CompleteRun => artifact = Some(reporter.complete_run()?),
        }
    }

    Ok(artifact)
}
