//! The `{status, message, details}` envelope every command returns.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

/// How a command ended. Each status owns one process exit code.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CommandStatus {
    Ok,
    /// Bad input or a stale lock; the user can fix it.
    UserError,
    /// The resolver or the filesystem failed.
    #[serde(rename = "error")]
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserError => 1,
            Self::Failure => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    pub details: Value,
}

impl ExecutionOutcome {
    fn new(status: CommandStatus, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::Ok, message, details)
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::UserError, message, details)
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::Failure, message, details)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// JSON envelope printed by `--json`; a missing `details` becomes `{}`.
    #[must_use]
    pub fn to_json(&self, group: CommandGroup) -> Value {
        let details = if self.details.is_null() {
            json!({})
        } else {
            self.details.clone()
        };
        json!({
            "status": self.status,
            "message": group.status_line(&self.message),
            "details": details,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Lock,
    Verify,
}

impl CommandGroup {
    /// `pcm <group>: <message>`, or the bare prefix for an empty message.
    #[must_use]
    pub fn status_line(self, message: &str) -> String {
        if message.is_empty() {
            format!("pcm {self}")
        } else {
            format!("pcm {self}: {message}")
        }
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandGroup::Lock => "lock",
            CommandGroup::Verify => "verify",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_prefixes_the_group() {
        assert_eq!(CommandGroup::Lock.status_line(""), "pcm lock");
        assert_eq!(
            CommandGroup::Lock.status_line("locked 2 environments"),
            "pcm lock: locked 2 environments"
        );
    }

    #[test]
    fn statuses_map_to_distinct_exit_codes() {
        assert_eq!(ExecutionOutcome::success("", Value::Null).exit_code(), 0);
        assert_eq!(ExecutionOutcome::user_error("", Value::Null).exit_code(), 1);
        assert_eq!(ExecutionOutcome::failure("", Value::Null).exit_code(), 2);
    }

    #[test]
    fn json_envelope_uses_kebab_case_statuses() {
        let outcome = ExecutionOutcome::user_error("stale", json!({ "environments": ["base"] }));
        let payload = outcome.to_json(CommandGroup::Verify);
        assert_eq!(payload["status"], "user-error");
        assert_eq!(payload["message"], "pcm verify: stale");
        assert_eq!(payload["details"]["environments"][0], "base");

        let payload = ExecutionOutcome::failure("boom", Value::Null).to_json(CommandGroup::Lock);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["details"], json!({}));
    }
}
