//! Configuration Validation Integration Tests
//!
//! Tests for option loading, profile selection and rejection before the run starts.

use didit::config::parse_options;
use didit::core::validate_run_config;
use didit::{profiles, ConfigError, ReportError, ReporterSettings, WorkflowRunReporter};
use serde_json::json;

fn john_doe(profile: &str) -> serde_json::Value {
    json!({
        "crate_profile": profile,
        "agent": {
            "name": "John Doe",
            "affiliation": "University of Nowhere",
            "orcid_url": "https://orcid.org/0000-0002-1825-0097"
        },
        "script_path": "dodo.py"
    })
}

#[test]
fn test_every_profile_accepts_the_same_options() {
    for profile in profiles::profiles() {
        let config = validate_run_config(&john_doe(profile.id)).unwrap();
        assert_eq!(config.profile.id, profile.id);
        assert_eq!(config.run.agent.name, "John Doe");
        assert_eq!(
            config.run.agent.orcid_url,
            "https://orcid.org/0000-0002-1825-0097"
        );
    }
}

#[test]
fn test_yaml_options_validate() {
    let options = parse_options(
        r#"
crate_profile: provenance-run
agent:
  name: John Doe
  affiliation: University of Nowhere
  orcid_url: https://orcid.org/0000-0002-1825-0097
script_path: workflows/dodo.py
"#,
    )
    .unwrap();

    let config = validate_run_config(&options).unwrap();
    assert_eq!(config.profile.id, "provenance-run");
    assert_eq!(config.run.script_path().to_str(), Some("workflows/dodo.py"));
}

#[test]
fn test_empty_agent_rejected_before_capture() {
    let mut options = john_doe("process-run");
    options["agent"] = json!({});

    // Never reaches stream redirection
    let result = WorkflowRunReporter::new(
        &options,
        ReporterSettings::default(),
        Box::new(std::io::sink()),
    );

    match result {
        Err(err) => {
            assert!(err.is_configuration());
            match err {
                ReportError::Config(ConfigError::Invalid(violations)) => {
                    assert_eq!(violations.len(), 3);
                }
                other => panic!("Expected validation failure, got {:?}", other),
            }
        }
        Ok(_) => panic!("Expected configuration error"),
    }
}

#[test]
fn test_invalid_profile_rejected() {
    let options = john_doe("invalid-profile");

    let result = WorkflowRunReporter::new(
        &options,
        ReporterSettings::default(),
        Box::new(std::io::sink()),
    );

    match result {
        Err(ReportError::Config(ConfigError::UnknownProfile { id, known })) => {
            assert_eq!(id, "invalid-profile");
            assert!(known.contains("process-run"));
            assert!(known.contains("workflow-run"));
            assert!(known.contains("provenance-run"));
        }
        Err(other) => panic!("Expected UnknownProfile, got {:?}", other),
        Ok(_) => panic!("Expected configuration error"),
    }
}

#[test]
fn test_missing_profile_key() {
    let mut options = john_doe("process-run");
    options.as_object_mut().unwrap().remove("crate_profile");

    let err = validate_run_config(&options).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].path(), "crate_profile");
}

#[test]
fn test_agent_sharing_workflow_id_rejected_before_capture() {
    let mut options = john_doe("workflow-run");
    options["agent"]["orcid_url"] = json!("dodo.py");

    let result = WorkflowRunReporter::new(
        &options,
        ReporterSettings::default(),
        Box::new(std::io::sink()),
    );

    match result {
        Err(ReportError::Config(ConfigError::DuplicateIdentifier { id })) => {
            assert_eq!(id, "dodo.py");
        }
        Err(other) => panic!("Expected DuplicateIdentifier, got {:?}", other),
        Ok(_) => panic!("Expected configuration error"),
    }
}
