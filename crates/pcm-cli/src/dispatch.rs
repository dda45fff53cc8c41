use pcm_core::{CommandGroup, ExecutionOutcome, LockConfig, LockOptions};

use crate::cli::{PcmCli, PcmCommand};

pub fn dispatch_command(cli: &PcmCli) -> (CommandGroup, ExecutionOutcome) {
    match &cli.command {
        None => lock(&cli.lock.to_options()),
        Some(PcmCommand::Lock(args)) => lock(&args.to_options()),
        Some(PcmCommand::Verify(args)) => {
            let outcome = with_config(&args.to_options(), pcm_core::verify);
            (CommandGroup::Verify, outcome)
        }
    }
}

fn lock(options: &LockOptions) -> (CommandGroup, ExecutionOutcome) {
    (CommandGroup::Lock, with_config(options, pcm_core::lock))
}

fn with_config(
    options: &LockOptions,
    run: impl FnOnce(&LockConfig) -> ExecutionOutcome,
) -> ExecutionOutcome {
    match LockConfig::from_options(options) {
        Ok(config) => run(&config),
        Err(err) => err.into_outcome(),
    }
}
