use anyhow::{Context, Result};
use clap::Parser;
use sweeper::cli::{Cli, Command};
use sweeper::config::{self, Config};
use sweeper::orchestrator::{self, Orchestrator};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SWEEPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run { config, silent } => orchestrator::run_from_path(&config, silent),
        Command::EncodePassword { password } => {
            println!("{}", config::encode_password(&password));
            orchestrator::EXIT_OK
        }
        Command::Locate { config } => match locate(&config) {
            Ok(()) => orchestrator::EXIT_OK,
            Err(e) => {
                eprintln!("Error: {e:#}");
                orchestrator::EXIT_FAILURE
            }
        },
    };
    std::process::exit(code);
}

fn locate(path: &std::path::Path) -> Result<()> {
    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    Orchestrator::new(&config, false).locate();
    Ok(())
}
