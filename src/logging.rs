use crate::config::LogLevel;
use humansize::{BINARY, format_size};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. `--verbose` wins over `RUST_LOG`, which
/// wins over the configured level.
pub fn init(level: LogLevel, verbose: bool) {
    tracing_subscriber::registry()
        .with(filter(level, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn filter(level: LogLevel, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(LogLevel::Debug.name());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.name()))
}

pub fn format_bytes(n: u64) -> String {
    format_size(n, BINARY)
}
