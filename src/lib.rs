pub mod cli;
pub mod core;
mod render;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

const DEFAULT_LOG_FILTER: &str = "resume_screener_lib=info";

/// Logs go to stderr so command output on stdout stays pipeable. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    Cli::parse().execute().await
}
