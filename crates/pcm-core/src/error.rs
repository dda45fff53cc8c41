use std::io;
use std::path::{Path, PathBuf};

use pcm_domain::{GraphError, MalformedArtifact, VersionConflicts};
use serde_json::{json, Value};

use crate::outcome::{CommandStatus, ExecutionOutcome};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Conflict(#[from] VersionConflicts),
    #[error("output of environment '{environment}' is truncated: {source}")]
    Malformed {
        environment: String,
        #[source]
        source: MalformedArtifact,
    },
    #[error("failed to pip-compile {} (exit code {code})", infile.display())]
    ResolverFailure {
        environment: String,
        infile: PathBuf,
        command: Vec<String>,
        code: i32,
        stdout: String,
        stderr: String,
    },
    #[error("failed to start resolver `{program}`: {message}")]
    ResolverSpawn { program: String, message: String },
    #[error("unknown environment '{name}': {} does not exist", infile.display())]
    UnknownEnvironment { name: String, infile: PathBuf },
    #[error("invalid compatible pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Conditions the user fixes by editing inputs or options map to
    /// [`CommandStatus::UserError`]; everything else is a failure.
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::Graph(_)
            | Self::Conflict(_)
            | Self::UnknownEnvironment { .. }
            | Self::InvalidPattern { .. } => CommandStatus::UserError,
            Self::Malformed { .. }
            | Self::ResolverFailure { .. }
            | Self::ResolverSpawn { .. }
            | Self::Io { .. } => CommandStatus::Failure,
        }
    }

    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Graph(GraphError::Cycle { environments }) => json!({
                "reason": "reference_cycle",
                "environments": environments,
            }),
            Self::Graph(GraphError::UnknownReferences { missing }) => json!({
                "reason": "unknown_reference",
                "missing": missing
                    .iter()
                    .map(|(env, reference)| json!({ "environment": env, "reference": reference }))
                    .collect::<Vec<_>>(),
            }),
            Self::Conflict(conflicts) => json!({
                "reason": "version_conflict",
                "conflicts": conflicts.conflicts,
                "hint": "Add constraints for the package versions listed above.",
            }),
            Self::Malformed {
                environment,
                source,
            } => json!({
                "reason": "malformed_artifact",
                "environment": environment,
                "pending": source.pending,
            }),
            Self::ResolverFailure {
                environment,
                command,
                code,
                stdout,
                stderr,
                ..
            } => json!({
                "reason": "resolver_failed",
                "environment": environment,
                "command": command,
                "code": code,
                "stdout": stdout,
                "stderr": stderr,
            }),
            Self::ResolverSpawn { program, .. } => json!({
                "reason": "resolver_unavailable",
                "program": program,
                "hint": "Install pip-tools or pass --pip-compile with the resolver path.",
            }),
            Self::UnknownEnvironment { name, .. } => json!({
                "reason": "unknown_environment",
                "environment": name,
            }),
            Self::InvalidPattern { pattern, .. } => json!({
                "reason": "invalid_pattern",
                "pattern": pattern,
            }),
            Self::Io { path, source, .. } => json!({
                "reason": "io",
                "path": path.display().to_string(),
                "error": source.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn into_outcome(self) -> ExecutionOutcome {
        let details = self.details();
        let message = self.to_string();
        match self.status() {
            CommandStatus::UserError => ExecutionOutcome::user_error(message, details),
            CommandStatus::Ok | CommandStatus::Failure => {
                ExecutionOutcome::failure(message, details)
            }
        }
    }
}
