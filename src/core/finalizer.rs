//! Crate finalization.
//!
//! Releases the output capture, folds run errors into stderr, serializes the
//! graph and writes both artifacts: the RO-Crate metadata file and the
//! status document.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::domain::TaskResult;
use crate::error::ReportError;

use super::capture::CaptureScope;
use super::graph::METADATA_ID;
use super::recorder::TaskRecorder;

/// Run summary written to the reporter's outstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Per-task results in first-selected order
    pub tasks: Vec<TaskResult>,

    /// Everything written to stdout during the run
    pub out: String,

    /// Everything written to stderr during the run, plus run errors
    pub err: String,
}

/// The outcome of a finalized run
#[derive(Debug, Clone)]
pub struct FinalizedArtifact {
    /// Path of the written `ro-crate-metadata.json`
    pub crate_path: PathBuf,

    /// The serialized provenance graph
    pub document: Value,

    /// The status document
    pub status: RunStatus,
}

/// Finalize a run.
///
/// The capture is released first so the original streams are back even if
/// serialization or writing fails afterwards.
#[instrument(skip_all, fields(crate_dir = %crate_dir.display()))]
pub fn finalize(
    recorder: &TaskRecorder,
    capture: &mut CaptureScope,
    crate_dir: &Path,
    outstream: &mut dyn Write,
) -> Result<FinalizedArtifact, ReportError> {
    let captured = capture.release()?;

    let mut err = captured.stderr;
    if !recorder.run_errors().is_empty() {
        err.push_str(&recorder.joined_run_errors());
    }

    let status = RunStatus {
        tasks: recorder
            .graph()
            .task_records()
            .map(|record| record.to_result())
            .collect(),
        out: captured.stdout,
        err,
    };

    // Nothing is written unless the graph is closed
    let document = recorder.graph().serialize()?;
    let crate_path = write_crate(crate_dir, &document)?;

    serde_json::to_writer(&mut *outstream, &status)?;
    outstream.flush().map_err(ReportError::Status)?;

    info!(
        crate_path = %crate_path.display(),
        tasks = status.tasks.len(),
        run_errors = recorder.run_errors().len(),
        "Workflow run crate written"
    );

    Ok(FinalizedArtifact {
        crate_path,
        document,
        status,
    })
}

/// Atomically write the metadata file into `crate_dir`
pub fn write_crate(crate_dir: &Path, document: &Value) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(crate_dir).map_err(write_error(crate_dir))?;

    let crate_path = crate_dir.join(METADATA_ID);
    let mut file = NamedTempFile::new_in(crate_dir).map_err(write_error(&crate_path))?;
    serde_json::to_writer_pretty(&mut file, document)?;
    file.flush().map_err(write_error(&crate_path))?;
    file.persist(&crate_path)
        .map_err(|e| e.error)
        .map_err(write_error(&crate_path))?;

    Ok(crate_path)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError {
    let path = path.to_path_buf();
    move |source| ReportError::Write { path, source }
}
