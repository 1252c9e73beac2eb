mod config;
mod constants;
mod controller;
mod evictor;
mod logging;
mod model;
mod probe;
mod protect;
mod scanner;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the config file [default: /etc/diskreap/config.toml, then the user config dir]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Report what would be deleted without deleting anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Log every per-file decision
    #[arg(short, long)]
    verbose: bool,

    /// Validate the config and exit
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.unwrap_or_else(config::default_config_path);
    let config = Config::load(&path)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    logging::init(config.log_verbosity, cli.verbose);
    for note in &config.notes {
        warn!("{note}");
    }
    config.log_summary();

    if cli.check {
        return Ok(());
    }

    controller::run(&config, cli.dry_run).context("cleanup run failed")?;
    Ok(())
}
