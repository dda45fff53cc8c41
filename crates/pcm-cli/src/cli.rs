use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use pcm_core::config::{DEFAULT_BASE_DIR, DEFAULT_IN_EXT, DEFAULT_OUT_EXT, DEFAULT_RESOLVER};
use pcm_core::LockOptions;

pub const PCM_ABOUT: &str =
    "Lock interdependent requirements files with pip-compile, one environment at a time.";

#[derive(Parser, Debug)]
#[command(
    name = "pcm",
    author,
    version,
    about = PCM_ABOUT,
    disable_help_subcommand = true,
    disable_help_flag = true,
    args_conflicts_with_subcommands = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct PcmCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Option<PcmCommand>,
    #[command(flatten)]
    pub lock: LockArgs,
}

#[derive(Subcommand, Debug)]
pub enum PcmCommand {
    #[command(
        about = "Resolve every environment and rewrite its locked output (the default).",
        disable_help_flag = true
    )]
    Lock(LockArgs),
    #[command(about = "Check that each output was locked from its current input.")]
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LockArgs {
    #[arg(
        short = 'c',
        long = "compatible",
        value_name = "PATTERN",
        help = "Glob of package names pinned with ~= instead of =="
    )]
    pub compatible: Vec<String>,
    #[arg(
        short = 'P',
        long = "forbid-post",
        value_name = "ENV",
        help = "Environment whose pins must not carry .postN releases"
    )]
    pub forbid_post: Vec<String>,
    #[arg(
        short = 'g',
        long = "generate-hashes",
        value_name = "ENV",
        help = "Environment resolved with --hash entries, along with every environment linked to it"
    )]
    pub generate_hashes: Vec<String>,
    #[command(flatten)]
    pub layout: LayoutArgs,
    #[arg(
        short = 'h',
        long = "header",
        value_name = "FILE",
        help = "File whose contents replace the default output header"
    )]
    pub header: Option<PathBuf>,
    #[arg(
        short = 'n',
        long = "only-name",
        value_name = "ENV",
        help = "Lock only this environment and the environments it references"
    )]
    pub only_name: Vec<String>,
    #[arg(long, overrides_with = "no_upgrade", hide = true)]
    pub upgrade: bool,
    #[arg(
        long = "no-upgrade",
        overrides_with = "upgrade",
        help = "Keep existing pins instead of upgrading to the newest allowed versions"
    )]
    pub no_upgrade: bool,
    #[arg(
        long = "pip-compile",
        value_name = "PROGRAM",
        env = "PCM_PIP_COMPILE",
        default_value = DEFAULT_RESOLVER,
        help = "Resolver executable"
    )]
    pub pip_compile: String,
    #[arg(long, action = ArgAction::Help, help = "Print help")]
    pub help: Option<bool>,
}

impl LockArgs {
    pub fn to_options(&self) -> LockOptions {
        LockOptions {
            directory: self.layout.directory.clone(),
            in_ext: self.layout.in_ext.clone(),
            out_ext: self.layout.out_ext.clone(),
            compatible: self.compatible.clone(),
            forbid_post: self.forbid_post.clone(),
            generate_hashes: self.generate_hashes.clone(),
            header: self.header.clone(),
            only_names: self.only_name.clone(),
            upgrade: !self.no_upgrade,
            resolver: self.pip_compile.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    #[arg(
        short = 'd',
        long,
        value_name = "DIR",
        default_value = DEFAULT_BASE_DIR,
        help = "Directory holding the requirements files"
    )]
    pub directory: PathBuf,
    #[arg(
        short = 'i',
        long,
        value_name = "EXT",
        default_value = DEFAULT_IN_EXT,
        help = "Extension of input files"
    )]
    pub in_ext: String,
    #[arg(
        short = 'o',
        long,
        value_name = "EXT",
        default_value = DEFAULT_OUT_EXT,
        help = "Extension of output files"
    )]
    pub out_ext: String,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,
}

impl VerifyArgs {
    pub fn to_options(&self) -> LockOptions {
        LockOptions {
            directory: self.layout.directory.clone(),
            in_ext: self.layout.in_ext.clone(),
            out_ext: self.layout.out_ext.clone(),
            ..LockOptions::default()
        }
    }
}
