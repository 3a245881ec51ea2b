use clap::Parser;
use tracing::{debug, error, Level};
use tracing_subscriber::EnvFilter;

use hireai_lib::cli::{self, Cli};
use hireai_lib::core::errors::CoreError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<Level>()
        .unwrap_or(Level::INFO)
        .as_str()
        .to_lowercase();
    // RUST_LOG wins; otherwise our crates at the chosen level, everything else at warn.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,hireai={level},hireai_lib={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("hireai v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(err) = cli::run(cli.command).await {
        let remote = err
            .downcast_ref::<CoreError>()
            .is_some_and(CoreError::is_remote);
        error!(remote, "command failed");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
