//! Command-line interface for didit.
//!
//! Provides commands for listing crate profiles, validating reporter
//! options, and replaying recorded host event logs into a crate.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ReporterSettings, CONFIG_ENV, CRATE_DIR_ENV};
use crate::core::{
    replay, validate_run_config, ConfigError, MemoryCapture, SystemClock, WorkflowRunReporter,
};
use crate::domain::{load_event_log, ValidatedConfig};
use crate::profiles;

/// didit - Workflow Run RO-Crate provenance for task runs
#[derive(Parser, Debug)]
#[command(name = "didit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the supported crate profiles
    Profiles,

    /// Validate reporter options against their profile
    Validate {
        /// Options file (discovered from .didit/config.yaml if not provided)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,
    },

    /// Replay a recorded event log and write the crate
    Replay {
        /// Event log (one JSON event per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Options file (discovered from .didit/config.yaml if not provided)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,

        /// Directory receiving ro-crate-metadata.json
        #[arg(long, env = CRATE_DIR_ENV)]
        crate_dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Profiles => list_profiles(),
            Commands::Validate { config } => validate_options(config),
            Commands::Replay {
                events,
                config,
                crate_dir,
            } => replay_events(events, config, crate_dir),
        }
    }
}

/// Print each profile and what it conforms to
fn list_profiles() -> Result<()> {
    for profile in profiles::profiles() {
        println!("{}", profile.id);
        for declaration in profile.declarations {
            println!("  {} ({})", declaration.id, declaration.name);
        }
    }

    Ok(())
}

/// Validate the options file, reporting every violation
fn validate_options(config_path: Option<PathBuf>) -> Result<()> {
    let (path, _config) = load_validated(config_path)?;

    println!("{}: valid", path.display());
    Ok(())
}

/// Replay an event log through a crate-writing reporter
fn replay_events(
    events_path: PathBuf,
    config_path: Option<PathBuf>,
    crate_dir: Option<PathBuf>,
) -> Result<()> {
    let (_path, config) = load_validated(config_path)?;
    let events = load_event_log(&events_path)?;

    let settings = crate_dir
        .map(ReporterSettings::new)
        .unwrap_or_else(ReporterSettings::from_env);

    let mut reporter = WorkflowRunReporter::with_capture(
        config,
        settings,
        Box::new(io::stdout()),
        Box::new(MemoryCapture::new()),
        Box::new(SystemClock),
    )?;

    let artifact = replay(&mut reporter, &events)
        .with_context(|| format!("Failed to replay {}", events_path.display()))?;

    match artifact {
        Some(artifact) => {
            println!();
            eprintln!("[Crate written to {}]", artifact.crate_path.display());
            Ok(())
        }
        None => anyhow::bail!(
            "Event log {} ended without complete_run; no crate written",
            events_path.display()
        ),
    }
}

/// Load options and validate them, printing violations on failure
fn load_validated(config_path: Option<PathBuf>) -> Result<(PathBuf, ValidatedConfig)> {
    let (path, options) = config::resolve_options(config_path.as_deref())?;

    match validate_run_config(&options) {
        Ok(config) => Ok((path, config)),
        Err(ConfigError::Invalid(violations)) => {
            eprintln!("{}: {} violation(s)", path.display(), violations.len());
            for violation in &violations {
                eprintln!("  {}", violation);
            }
            anyhow::bail!("Invalid reporter options in {}", path.display())
        }
        Err(e) => {
            Err(anyhow::Error::new(e).context(format!("Invalid reporter options in {}", path.display())))
        }
    }
}
