//! Entry point: parse args, set up tracing, dispatch to a command.

mod cli;
mod commands;
mod config;
mod output;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.log_level);

    let exit_code = commands::dispatch(cli).await;
    std::process::exit(exit_code);
}

/// `RUST_LOG` takes priority over `--log-level`; both always write to
/// stderr so stdout stays clean for program output (§6/§7).
fn setup_tracing(level: cli::LogLevel) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(level))
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}
