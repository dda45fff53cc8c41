#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod artifact;
pub mod commands;
pub mod config;
mod discover;
pub mod error;
pub mod lock;
pub mod outcome;
pub mod process;
pub mod resolver;
pub mod verify;

pub use artifact::write_atomic;
pub use commands::{lock, lock_with, verify};
pub use config::{HeaderSource, Layout, LockConfig, LockOptions, ResolverCommand};
pub use discover::discover;
pub use error::LockError;
pub use lock::{lock_environments, LockSummary, LockedEnvironment};
pub use outcome::{CommandGroup, CommandStatus, ExecutionOutcome};
pub use resolver::{CompileRequest, PipCompile, Resolver};
pub use verify::{verify_digest, verify_environments, DigestCheck, VerifyReport};
