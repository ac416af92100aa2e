use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::types::PublishGroup;

/// Environment variable telling the make command whether it may prompt
pub const INTERACTIVE_ENV: &str = "COURIER_INTERACTIVE";

const STDERR_TAIL_LINES: usize = 20;

/// The make (build/packaging) stage, as seen by the dispatcher.
pub trait Maker {
    /// Produce the current build's artifact sets.
    fn make(&self, dir: &Path, interactive: bool) -> Result<PublishGroup>;
}

#[derive(Debug, thiserror::Error)]
pub enum MakeError {
    #[error("no make command configured; set [make] command in .courier.toml")]
    NoCommand,

    #[error("make command `{program}` exited with code {code:?}:\n{stderr_tail}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("make command `{program}` printed invalid artifact sets: {message}")]
    InvalidOutput { program: String, message: String },

    #[error("make command `{program}` produced no artifact sets")]
    EmptyOutput { program: String },
}

/// Runs an external command whose stdout is a JSON array of artifact sets.
#[derive(Debug, Clone)]
pub struct CommandMaker {
    command: Vec<String>,
}

impl CommandMaker {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Maker for CommandMaker {
    fn make(&self, dir: &Path, interactive: bool) -> Result<PublishGroup> {
        let (program, args) = self.command.split_first().ok_or(MakeError::NoCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .env(INTERACTIVE_ENV, if interactive { "1" } else { "0" })
            .stdout(Stdio::piped());
        if interactive {
            command.stdin(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdin(Stdio::null()).stderr(Stdio::piped());
        }

        let output = command
            .output()
            .with_context(|| format!("failed to run make command: {program} {args:?}"))?;

        if !output.status.success() {
            return Err(MakeError::CommandFailed {
                program: program.clone(),
                code: output.status.code(),
                stderr_tail: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES),
            }
            .into());
        }

        let group: PublishGroup =
            serde_json::from_slice(&output.stdout).map_err(|e| MakeError::InvalidOutput {
                program: program.clone(),
                message: e.to_string(),
            })?;

        if group.is_empty() {
            return Err(MakeError::EmptyOutput {
                program: program.clone(),
            }
            .into());
        }

        Ok(group)
    }
}

/// Returns a fixed group; for embedders that already hold make output.
#[derive(Debug, Clone, Default)]
pub struct StaticMaker {
    group: PublishGroup,
}

impl StaticMaker {
    pub fn new(group: PublishGroup) -> Self {
        Self { group }
    }
}

impl Maker for StaticMaker {
    fn make(&self, _dir: &Path, _interactive: bool) -> Result<PublishGroup> {
        Ok(self.group.clone())
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
