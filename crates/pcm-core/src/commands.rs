//! Command entry points returning the `{status, message, details}` envelope.

use std::env;

use serde_json::json;

use crate::config::LockConfig;
use crate::error::LockError;
use crate::lock::lock_environments;
use crate::outcome::ExecutionOutcome;
use crate::resolver::{PipCompile, Resolver};
use crate::verify::verify_environments;

/// `pcm lock`, resolving through `pip-compile` in the current directory.
#[must_use]
pub fn lock(config: &LockConfig) -> ExecutionOutcome {
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(source) => {
            return LockError::Io {
                action: "resolve current directory",
                path: ".".into(),
                source,
            }
            .into_outcome()
        }
    };
    lock_with(config, &PipCompile::from_config(config, cwd))
}

#[must_use]
pub fn lock_with(config: &LockConfig, resolver: &dyn Resolver) -> ExecutionOutcome {
    match lock_environments(config, resolver) {
        Ok(summary) => {
            let message = match summary.len() {
                1 => "locked 1 environment".to_string(),
                n => format!("locked {n} environments"),
            };
            let environments: Vec<_> = summary
                .environments
                .iter()
                .map(|env| {
                    json!({
                        "name": env.name,
                        "infile": env.infile.display().to_string(),
                        "outfile": env.outfile.display().to_string(),
                        "references": env.references,
                        "packages": env.packages.len(),
                        "ignored": env.ignored,
                        "hashes": env.hashes,
                        "forbid_post": env.forbid_post,
                    })
                })
                .collect();
            ExecutionOutcome::success(message, json!({ "environments": environments }))
        }
        Err(err) => err.into_outcome(),
    }
}

/// `pcm verify`. Any mismatch is a user error listing the stale outputs.
#[must_use]
pub fn verify(config: &LockConfig) -> ExecutionOutcome {
    let report = match verify_environments(config.layout()) {
        Ok(report) => report,
        Err(err) => return err.into_outcome(),
    };
    let details = json!({ "environments": report.checks });
    if report.all_match() {
        let message = format!("{} environments up to date", report.checks.len());
        return ExecutionOutcome::success(message, details);
    }
    let stale: Vec<&str> = report.mismatched().map(|check| check.name.as_str()).collect();
    ExecutionOutcome::user_error(
        format!("outputs out of date for {}", stale.join(", ")),
        details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockOptions;
    use crate::outcome::CommandStatus;
    use crate::resolver::CompileRequest;
    use std::fs;
    use tempfile::tempdir;

    struct EchoResolver;

    impl Resolver for EchoResolver {
        fn compile(&self, request: &CompileRequest<'_>) -> Result<(), LockError> {
            let name = request.environment;
            fs::write(request.outfile, format!("{name}-pkg==1.0\n"))
                .map_err(|source| LockError::io("write", request.outfile, source))
        }
    }

    #[test]
    fn lock_then_verify_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("base.in"), "base-pkg\n")?;
        fs::write(dir.path().join("test.in"), "-r base.in\ntest-pkg\n")?;
        let config = LockConfig::from_options(&LockOptions {
            directory: dir.path().to_path_buf(),
            ..LockOptions::default()
        })?;

        let outcome = lock_with(&config, &EchoResolver);
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert_eq!(outcome.message, "locked 2 environments");
        assert_eq!(outcome.details["environments"][1]["references"][0], "base");

        let outcome = verify(&config);
        assert_eq!(outcome.status, CommandStatus::Ok, "{}", outcome.message);

        fs::write(dir.path().join("base.in"), "base-pkg\nrequests\n")?;
        let outcome = verify(&config);
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.message, "outputs out of date for base");
        assert_eq!(outcome.exit_code(), 1);
        Ok(())
    }

    #[test]
    fn conflicts_are_user_errors_with_details() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.in"), "x\n")?;
        fs::write(dir.path().join("b.in"), "-r a.in\n")?;
        struct Disagree;
        impl Resolver for Disagree {
            fn compile(&self, request: &CompileRequest<'_>) -> Result<(), LockError> {
                let version = if request.environment == "a" { "1.0" } else { "2.0" };
                fs::write(request.outfile, format!("six=={version}\n"))
                    .map_err(|source| LockError::io("write", request.outfile, source))
            }
        }
        let config = LockConfig::from_options(&LockOptions {
            directory: dir.path().to_path_buf(),
            ..LockOptions::default()
        })?;
        let outcome = lock_with(&config, &Disagree);
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["reason"], "version_conflict");
        assert_eq!(outcome.details["conflicts"][0]["package"], "six");
        assert_eq!(outcome.details["conflicts"][0]["version"], "2.0");
        assert_eq!(outcome.details["conflicts"][0]["other"], "1.0");
        Ok(())
    }
}
