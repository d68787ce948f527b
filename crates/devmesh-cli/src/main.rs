//! CLI entry point - the composition root.
//!
//! Wires the console log sink and the terminal spinner into the supervisor,
//! then mirrors the proxy's exit code.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::style;
use devmesh_cli::{Cli, CliError, ConsoleLog, bootstrap};
use devmesh_core::{BundleIndicator, DevLogPort, Notice};
use devmesh_runtime::{CliIndicator, MeshSupervisor};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let context = bootstrap(&cli)?;
    debug!(config = ?context.config, binary = %context.binary.display(), "Starting forward proxy");

    let indicator = Arc::new(CliIndicator::new());
    let log = Arc::new(ConsoleLog::new(Arc::clone(&indicator)));

    let supervisor = MeshSupervisor::new(
        context.binary,
        Arc::clone(&log) as Arc<dyn DevLogPort>,
        indicator as Arc<dyn BundleIndicator>,
    );
    let handle = supervisor
        .start(&context.config)
        .await
        .map_err(CliError::from)?;

    if let Some(url) = handle.base_url() {
        log.emit(&Notice::info(format!("Forward proxy ready at {url}")));
    }

    let exit = handle
        .wait()
        .await
        .map_err(CliError::from)
        .context("Forward proxy supervision ended unexpectedly")?;
    debug!(code = exit.code, reason = ?exit.reason, "Forward proxy exited");
    Ok(exit.code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables before clap reads DEVMESH_* fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", style("◈").red());
            err.downcast_ref::<CliError>()
                .map_or(1, CliError::exit_code)
        }
    };

    std::process::exit(code);
}
