//! sperf binary entrypoint.
//!
//! This is the main entry point for the `sperf` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sperf_cli::cli::{Cli, Commands};
use sperf_cli::commands::SysbottleCommand;
use sperf_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Parse CLI arguments; usage errors exit with clap's code 2
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), sperf_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Sysbottle(args) => {
            let cmd = SysbottleCommand::new(args.config());
            cmd.execute(&mut stdout, &format, &args.file).await?;
        }
    }

    Ok(())
}
