/// Entry point for the jscloak CLI, a JavaScript obfuscator.
///
/// Parses command-line arguments, initializes logging and dispatches to the
/// `obfuscate`, `deobfuscate` and `defaults` subcommands.
use clap::Parser;
use jscloak_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Command-line interface for jscloak.
///
/// jscloak rewrites JavaScript source into a functionally equivalent but
/// harder to read program, or reformats it for reading.
#[derive(Parser)]
#[command(name = "jscloak")]
#[command(about = "jscloak: JavaScript obfuscator")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Program text may go to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
