use atty::Stream;
use color_eyre::Result;
use pcm_core::{CommandGroup, ExecutionOutcome};
use serde_json::Value;

mod cli;
mod dispatch;
mod style;

use clap::Parser;
use cli::PcmCli;
use dispatch::dispatch_command;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PcmCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let (group, outcome) = dispatch_command(&cli);
    let code = emit_output(&cli, group, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("pcm={level},pcm_core={level},pcm_domain={level}");
    // stdout carries the status line or JSON envelope.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &PcmCli, group: CommandGroup, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = outcome.to_json(group);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet {
        let message = group.status_line(&outcome.message);
        println!("{}", style.status(outcome.status, &message));
        for line in stale_environments(&outcome.details) {
            println!("{}", style.dimmed(&line));
        }
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

// Verification rows whose digest did not match.
fn stale_environments(details: &Value) -> Vec<String> {
    let Some(rows) = details.get("environments").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter(|row| row.get("matches").and_then(Value::as_bool) == Some(false))
        .map(|row| {
            let field = |key: &str| row.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
            format!(
                "  {}: expected {}, found {}",
                field("name"),
                field("expected"),
                field("found")
            )
        })
        .collect()
}
