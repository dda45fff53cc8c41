//! The external resolver that turns an input file into a fully pinned list.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::config::LockConfig;
use crate::error::LockError;
use crate::process::capture;

#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub environment: &'a str,
    pub infile: &'a Path,
    pub outfile: &'a Path,
    pub upgrade: bool,
    pub generate_hashes: bool,
}

/// Produces a pinned resolver output at `request.outfile`.
pub trait Resolver {
    /// # Errors
    ///
    /// Returns [`LockError::ResolverFailure`] when the resolver exits
    /// unsuccessfully.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), LockError>;
}

/// `pip-compile` from pip-tools, run as a subprocess.
#[derive(Debug, Clone)]
pub struct PipCompile {
    program: String,
    cwd: PathBuf,
}

impl PipCompile {
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cwd: cwd.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &LockConfig, cwd: impl Into<PathBuf>) -> Self {
        Self::new(config.resolver().program.clone(), cwd)
    }

    /// Arguments passed to the resolver, program excluded.
    #[must_use]
    pub fn arguments(&self, request: &CompileRequest<'_>) -> Vec<String> {
        let mut args = Vec::with_capacity(9);
        if request.generate_hashes {
            args.push("--generate-hashes".to_string());
        }
        args.push("--no-header".to_string());
        args.push("--verbose".to_string());
        if request.upgrade {
            args.push("--upgrade".to_string());
        }
        args.push("--rebuild".to_string());
        args.push("--no-index".to_string());
        args.push("--output-file".to_string());
        args.push(request.outfile.display().to_string());
        args.push(request.infile.display().to_string());
        args
    }
}

impl Resolver for PipCompile {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), LockError> {
        let args = self.arguments(request);
        debug!(program = %self.program, ?args, "running resolver");
        let output = capture(&self.program, &args, &self.cwd).map_err(|err| {
            LockError::ResolverSpawn {
                program: self.program.clone(),
                message: format!("{err:#}"),
            }
        })?;
        if output.succeeded() {
            return Ok(());
        }

        let mut command = Vec::with_capacity(args.len() + 1);
        command.push(self.program.clone());
        command.extend(args);
        error!("ERROR executing {}", command.join(" "));
        error!("Exit code: {}", output.code);
        error!("{}", output.stdout);
        error!("{}", output.stderr);
        Err(LockError::ResolverFailure {
            environment: request.environment.to_string(),
            infile: request.infile.to_path_buf(),
            command,
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
