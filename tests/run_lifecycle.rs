//! Run Lifecycle Integration Tests
//!
//! Tests for driving a reporter through host callbacks and the artifacts it
//! writes on completion.

use std::io::Write;
use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use didit::core::{check_closure, validate_run_config};
use didit::domain::{parse_event_log, Entity};
use didit::{
    replay, ActionOutput, ManualClock, MemoryCapture, ReportError, ReporterSettings, RunStatus,
    SharedBuffer, Task, TaskReporter, TaskStatus, WorkflowRunReporter,
};
use serde_json::{json, Value};
use tempfile::TempDir;

struct Harness {
    reporter: WorkflowRunReporter,
    clock: ManualClock,
    capture: MemoryCapture,
    outstream: SharedBuffer,
}

fn harness(profile: &str, crate_dir: &Path, script_path: &Path) -> Harness {
    let config = validate_run_config(&json!({
        "crate_profile": profile,
        "agent": {
            "name": "John Doe",
            "affiliation": "University of Nowhere",
            "orcid_url": "https://orcid.org/0000-0002-1825-0097"
        },
        "script_path": script_path.to_string_lossy()
    }))
    .unwrap();

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    let capture = MemoryCapture::new();
    let outstream = SharedBuffer::new();

    let reporter = WorkflowRunReporter::with_capture(
        config,
        ReporterSettings::new(crate_dir),
        Box::new(outstream.clone()),
        Box::new(capture.clone()),
        Box::new(clock.clone()),
    )
    .unwrap();

    Harness {
        reporter,
        clock,
        capture,
        outstream,
    }
}

fn graph_nodes(document: &Value) -> &Vec<Value> {
    document["@graph"].as_array().unwrap()
}

fn nodes_of_type<'a>(document: &'a Value, ty: &str) -> Vec<&'a Value> {
    graph_nodes(document)
        .iter()
        .filter(|node| match &node["@type"] {
            Value::String(s) => s == ty,
            Value::Array(types) => types.iter().any(|t| t == ty),
            _ => false,
        })
        .collect()
}

#[test]
fn test_person_entity_for_agent() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("process-run", temp.path(), Path::new("dodo.py"));

    let artifact = h.reporter.complete_run().unwrap();

    let people = nodes_of_type(&artifact.document, "Person");
    assert_eq!(people.len(), 1);
    assert_eq!(people[0]["@id"], "https://orcid.org/0000-0002-1825-0097");
    assert_eq!(people[0]["name"], "John Doe");
    assert_eq!(people[0]["affiliation"], "University of Nowhere");

    let workflows = nodes_of_type(&artifact.document, "ComputationalWorkflow");
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0]["@id"], "dodo.py");
    assert_eq!(
        workflows[0]["author"]["@id"],
        "https://orcid.org/0000-0002-1825-0097"
    );
}

#[test]
fn test_failed_build_task() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("workflow-run", temp.path(), Path::new("dodo.py"));
    let build = Task::new("build").with_action(ActionOutput::new(Some("cc main.c"), Some("main.c:1: error")));

    h.reporter.initialize(&["build".to_string()], &["build".to_string()]);
    h.reporter.status_checked(&build);
    h.reporter.execute_task(&build);
    h.clock.advance(Duration::milliseconds(500));
    h.reporter.add_failure(&build, &"compile error");

    let artifact = h.reporter.complete_run().unwrap();
    let task = &artifact.status.tasks[0];

    assert_eq!(task.name, "build");
    assert_eq!(task.result, Some(TaskStatus::Fail));
    assert_eq!(task.error.as_deref(), Some("compile error"));
    assert_eq!(task.out.as_deref(), Some("cc main.c"));
    assert_eq!(task.err.as_deref(), Some("main.c:1: error"));
    assert_eq!(task.started.as_deref(), Some("2024-03-01 12:00:00.000000"));
    assert_eq!(task.elapsed, Some(0.5));

    let action = graph_nodes(&artifact.document)
        .iter()
        .find(|node| node["@id"] == "#task-build")
        .unwrap();
    assert_eq!(action["actionStatus"], "http://schema.org/FailedActionStatus");
    assert_eq!(action["error"], "compile error");
}

#[test]
fn test_clean_run_status_document() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("process-run", temp.path(), Path::new("dodo.py"));
    let names = ["create", "build", "test"];
    let tasks: Vec<Task> = names.iter().map(|n| Task::new(*n)).collect();

    let mut out = h.capture.stdout();
    h.reporter.status_checked(&tasks[0]);
    h.reporter.skip_uptodate(&tasks[0]);
    for task in &tasks[1..] {
        h.reporter.status_checked(task);
        h.reporter.execute_task(task);
        writeln!(out, ".  {}", task.name).unwrap();
        h.clock.advance(Duration::seconds(1));
        h.reporter.add_success(task);
    }

    let artifact = h.reporter.complete_run().unwrap();
    assert!(!h.reporter.is_capturing());

    let status: RunStatus = serde_json::from_str(&h.outstream.contents()).unwrap();
    assert_eq!(status, artifact.status);
    assert_eq!(status.err, "");
    assert_eq!(status.out, ".  build\n.  test\n");

    let order: Vec<_> = status.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(order, names);
    assert!(status.tasks.iter().all(|t| t.result.is_some()));
    assert_eq!(status.tasks[0].result, Some(TaskStatus::UpToDate));
    assert_eq!(status.tasks[0].elapsed, None);
    assert_eq!(status.tasks[2].elapsed, Some(1.0));
}

#[test]
fn test_run_errors_appended_to_stderr() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("process-run", temp.path(), Path::new("dodo.py"));

    writeln!(h.capture.stderr(), "warning: deprecated").unwrap();
    h.reporter.cleanup_error(&"failed to remove build/");
    h.reporter.runtime_error("dependency cycle detected");

    let artifact = h.reporter.complete_run().unwrap();
    assert_eq!(
        artifact.status.err,
        "warning: deprecated\nfailed to remove build/\ndependency cycle detected"
    );
}

#[test]
fn test_crate_written_to_directory() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("dodo.py");
    std::fs::write(&script, "def task_build():\n    pass\n").unwrap();
    let crate_dir = temp.path().join("out").join("crate");

    let mut h = harness("provenance-run", &crate_dir, &script);
    let artifact = h.reporter.complete_run().unwrap();

    assert_eq!(artifact.crate_path, crate_dir.join("ro-crate-metadata.json"));
    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&artifact.crate_path).unwrap()).unwrap();
    assert_eq!(written, artifact.document);
    assert_eq!(written["@context"], "https://w3id.org/ro/crate/1.1/context");

    let root = graph_nodes(&written)
        .iter()
        .find(|node| node["@id"] == "./")
        .unwrap();
    assert_eq!(root["mainEntity"]["@id"], "dodo.py");
    assert_eq!(root["conformsTo"].as_array().unwrap().len(), 4);

    let workflow = graph_nodes(&written)
        .iter()
        .find(|node| node["@id"] == "dodo.py")
        .unwrap();
    assert_eq!(workflow["contentSize"], "27");
    assert_eq!(workflow["programmingLanguage"]["@id"], "#python");
    assert_eq!(workflow["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_second_completion_rejected() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("process-run", temp.path(), Path::new("dodo.py"));

    h.reporter.complete_run().unwrap();
    assert!(matches!(
        h.reporter.complete_run(),
        Err(ReportError::AlreadyCompleted)
    ));
}

#[test]
fn test_dangling_reference_detected() {
    let entities = vec![
        Entity::new("dodo.py", &["File", "ComputationalWorkflow"])
            .with_reference("author", "https://orcid.org/0000-0002-1825-0097"),
    ];

    match check_closure(&entities) {
        Err(ReportError::ReferentialIntegrity {
            entity,
            property,
            target,
        }) => {
            assert_eq!(entity, "dodo.py");
            assert_eq!(property, "author");
            assert_eq!(target, "https://orcid.org/0000-0002-1825-0097");
        }
        other => panic!("Expected ReferentialIntegrity, got {:?}", other),
    }
}

#[test]
fn test_replay_event_log() {
    let temp = TempDir::new().unwrap();
    let mut h = harness("workflow-run", temp.path(), Path::new("dodo.py"));

    let events = parse_event_log(
        r#"{"event":"initialize","all_tasks":["lint","build"],"selected_tasks":["build"]}
{"event":"status_checked","task":{"name":"lint"}}
{"event":"skip_ignore","task":{"name":"lint"}}
{"event":"status_checked","task":{"name":"build"}}
{"event":"execute_task","task":{"name":"build"}}
{"event":"add_failure","task":{"name":"build"},"error":"compile error"}
{"event":"teardown_task","task":{"name":"build"}}
{"event":"complete_run"}
"#,
    )
    .unwrap();

    let artifact = replay(&mut h.reporter, &events).unwrap().unwrap();

    let results: Vec<_> = artifact
        .status
        .tasks
        .iter()
        .map(|t| (t.name.as_str(), t.result))
        .collect();
    assert_eq!(
        results,
        vec![("lint", Some(TaskStatus::Ignore)), ("build", Some(TaskStatus::Fail))]
    );
    assert_eq!(nodes_of_type(&artifact.document, "CreateAction").len(), 2);
}
