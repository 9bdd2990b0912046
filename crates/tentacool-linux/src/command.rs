//! External command execution
//!
//! Every command runs with `kill_on_drop`, so a reconciler timeout that
//! drops the future also kills the child.

use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure of an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

impl CommandError {
    /// Whether the program's stderr mentions `needle`
    pub fn stderr_contains(&self, needle: &str) -> bool {
        match self {
            CommandError::Failed { stderr, .. } => stderr.contains(needle),
            CommandError::Spawn { .. } => false,
        }
    }

    /// Convert into a system apply error of `adapter`
    pub fn into_apply_error(self, adapter: &str) -> tentacool_core::Error {
        tentacool_core::Error::system_apply(adapter, self.to_string())
    }
}

/// Run `program` with `args` and return its stdout
pub async fn run(program: &Path, args: &[String]) -> Result<String, CommandError> {
    debug!("Running {} {}", program.display(), args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.display().to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Build an argument vector from string slices
pub(crate) fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
