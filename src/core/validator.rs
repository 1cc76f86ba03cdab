//! Run configuration validation.
//!
//! A single generic validator walks a [`Shape`] and the raw configuration
//! value side by side. Every violation is collected before failing so the
//! user sees all problems at once.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{RunConfiguration, ValidatedConfig};
use crate::profiles::{self, Field, FieldKind, Shape};

/// Key that selects the profile
pub const PROFILE_KEY: &str = "crate_profile";

/// A single structural problem in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("missing required key '{path}'")]
    Missing { path: String },

    #[error("key '{path}' must be text, found {found}")]
    NotText { path: String, found: &'static str },

    #[error("key '{path}' must be an object, found {found}")]
    NotObject { path: String, found: &'static str },

    #[error("unexpected key '{path}'")]
    Unexpected { path: String },
}

impl Violation {
    pub fn path(&self) -> &str {
        match self {
            Violation::Missing { path }
            | Violation::NotText { path, .. }
            | Violation::NotObject { path, .. }
            | Violation::Unexpected { path } => path,
        }
    }
}

/// Configuration errors, fatal before the run starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown crate profile '{id}' (known profiles: {known})")]
    UnknownProfile { id: String, known: String },

    #[error("Invalid run configuration: {}", describe(.0))]
    Invalid(Vec<Violation>),

    #[error("Failed to decode validated configuration: {0}")]
    Decode(#[from] serde_json::Error),

    /// Two run entities (agent, workflow, profiles, ...) would share an id
    #[error("Identifier '{id}' is used by more than one entity")]
    DuplicateIdentifier { id: String },
}

impl ConfigError {
    /// Violations, if this is a validation failure
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid(violations) => violations,
            _ => &[],
        }
    }
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a scalar to its string form
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn check_object(
    object: &Map<String, Value>,
    fields: &[Field],
    prefix: &str,
    violations: &mut Vec<Violation>,
) -> Map<String, Value> {
    let mut coerced = Map::new();

    for field in fields {
        let path = join_path(prefix, field.name);
        let Some(value) = object.get(field.name) else {
            violations.push(Violation::Missing { path });
            continue;
        };

        match field.kind {
            FieldKind::Text => match coerce_text(value) {
                Some(text) => {
                    coerced.insert(field.name.to_string(), Value::String(text));
                }
                None => violations.push(Violation::NotText {
                    path,
                    found: kind_name(value),
                }),
            },
            FieldKind::Object(nested) => match value {
                Value::Object(inner) => {
                    let inner = check_object(inner, nested, &path, violations);
                    coerced.insert(field.name.to_string(), Value::Object(inner));
                }
                other => violations.push(Violation::NotObject {
                    path,
                    found: kind_name(other),
                }),
            },
        }
    }

    for key in object.keys() {
        if !fields.iter().any(|f| f.name == key.as_str()) {
            violations.push(Violation::Unexpected {
                path: join_path(prefix, key),
            });
        }
    }

    coerced
}

/// Validate a configuration value against a shape.
///
/// Returns the value with every text field coerced to a string.
pub fn validate(config: &Value, shape: &Shape) -> Result<Value, ConfigError> {
    let Value::Object(object) = config else {
        return Err(not_an_object(config));
    };

    let mut violations = Vec::new();
    let coerced = check_object(object, shape.fields, "", &mut violations);

    if violations.is_empty() {
        Ok(Value::Object(coerced))
    } else {
        Err(ConfigError::Invalid(violations))
    }
}

fn not_an_object(config: &Value) -> ConfigError {
    ConfigError::Invalid(vec![Violation::NotObject {
        path: "<root>".to_string(),
        found: kind_name(config),
    }])
}

/// Select the profile named by `crate_profile` and validate against it
pub fn validate_run_config(config: &Value) -> Result<ValidatedConfig, ConfigError> {
    if !config.is_object() {
        return Err(not_an_object(config));
    }

    let profile_id = match config.get(PROFILE_KEY) {
        Some(value) => coerce_text(value).ok_or_else(|| {
            ConfigError::Invalid(vec![Violation::NotText {
                path: PROFILE_KEY.to_string(),
                found: kind_name(value),
            }])
        })?,
        None => {
            return Err(ConfigError::Invalid(vec![Violation::Missing {
                path: PROFILE_KEY.to_string(),
            }]))
        }
    };

    let profile = profiles::lookup(&profile_id)?;
    let coerced = validate(config, profile.shape)?;
    let run: RunConfiguration = serde_json::from_value(coerced)?;

    Ok(ValidatedConfig { profile, run })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_options() -> Value {
        json!({
            "crate_profile": "process-run",
            "agent": {
                "name": "John Doe",
                "affiliation": "University of Nowhere",
                "orcid_url": "https://orcid.org/0000-0002-1825-0097"
            },
            "script_path": "run.py"
        })
    }

    #[test]
    fn test_valid_configuration() {
        let config = validate_run_config(&valid_options()).unwrap();
        assert_eq!(config.profile.id, "process-run");
        assert_eq!(config.run.agent.name, "John Doe");
        assert_eq!(config.run.script_path.to_str(), Some("run.py"));
    }

    #[test]
    fn test_empty_agent_collects_every_missing_key() {
        let mut options = valid_options();
        options["agent"] = json!({});

        let err = validate_run_config(&options).unwrap_err();
        let paths: Vec<_> = err.violations().iter().map(|v| v.path()).collect();
        assert_eq!(
            paths,
            vec!["agent.name", "agent.affiliation", "agent.orcid_url"]
        );
    }

    #[test]
    fn test_missing_agent() {
        let mut options = valid_options();
        options.as_object_mut().unwrap().remove("agent");

        let err = validate_run_config(&options).unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::Missing {
                path: "agent".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_profile() {
        let mut options = valid_options();
        options["crate_profile"] = json!("invalid-profile");

        let err = validate_run_config(&options).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn test_scalars_coerce_to_text() {
        let mut options = valid_options();
        options["agent"]["affiliation"] = json!(42);

        let config = validate_run_config(&options).unwrap();
        assert_eq!(config.run.agent.affiliation, "42");
    }

    #[test]
    fn test_non_scalar_text_rejected() {
        let mut options = valid_options();
        options["script_path"] = json!(["a.py", "b.py"]);
        options["agent"]["name"] = Value::Null;

        let err = validate_run_config(&options).unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert!(err.violations().contains(&Violation::NotText {
            path: "script_path".to_string(),
            found: "array",
        }));
    }

    #[test]
    fn test_unexpected_key_rejected() {
        let mut options = valid_options();
        options["agent"]["email"] = json!("john@example.org");

        let err = validate_run_config(&options).unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::Unexpected {
                path: "agent.email".to_string()
            }]
        );
    }

    #[test]
    fn test_non_object_root() {
        let err = validate_run_config(&json!("process-run")).unwrap_err();
        assert!(matches!(
            err.violations(),
            [Violation::NotObject { found: "string", .. }]
        ));
    }
}
