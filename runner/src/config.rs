//! Host configuration — how and when to run the user program.
//!
//! Loaded from a `deviz.toml` in the project's working directory. The three
//! run modes mirror the host tool's triggers: rerun on every source edit,
//! compile then run, or rerun when a watched file changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "deviz.toml";

/// A command line plus extra environment for the child process.
///
/// The command is run through the platform shell, so pipes and quoting work
/// the way they do in a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// A spec with no extra environment.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: BTreeMap::new(),
        }
    }
}

/// When and how the user program is (re)run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunMode {
    /// Rerun the user program on every source edit.
    RunOnSourceEdit { run_command: CommandSpec },
    /// Compile first, then run. A failed compile skips the run and surfaces
    /// the compiler output instead.
    CompileOnSourceEdit {
        compile_command: CommandSpec,
        run_command: CommandSpec,
    },
    /// Rerun whenever the watched file changes.
    RunOnFileChange {
        watch_file: PathBuf,
        run_command: CommandSpec,
    },
}

impl RunMode {
    /// The command that produces pane output, whatever the trigger.
    #[must_use]
    pub fn run_command(&self) -> &CommandSpec {
        match self {
            Self::RunOnSourceEdit { run_command }
            | Self::CompileOnSourceEdit { run_command, .. }
            | Self::RunOnFileChange { run_command, .. } => run_command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevizConfig {
    pub mode: RunMode,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl DevizConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load `deviz.toml` from `working_dir`.
    pub fn load(working_dir: &Path) -> Result<Self, ConfigError> {
        let path = working_dir.join(CONFIG_FILE_NAME);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
