use clap::Parser;
use std::process::ExitCode;
use sysmaint::cli::{Cli, run_cli};
use sysmaint::output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "sysmaint=debug" } else { "sysmaint=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
