//! Turns parsed flags into a validated proxy configuration.
//!
//! This is the only place where paths from the command line are resolved
//! against the project directory.

use std::path::PathBuf;

use devmesh_core::{ProxyConfig, default_log_file};
use devmesh_runtime::resolve_mesh_binary;

use crate::error::CliError;
use crate::parser::Cli;

/// Everything `main` needs to start the supervisor.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: ProxyConfig,
    pub binary: PathBuf,
}

/// Build and validate the proxy configuration from parsed flags.
pub fn build_config(cli: &Cli) -> Result<ProxyConfig, CliError> {
    let project = std::path::absolute(&cli.project_dir)?;
    let log_file = cli
        .log_file
        .as_ref()
        .map_or_else(|| default_log_file(&project), |path| project.join(path));

    let config = ProxyConfig::new(
        cli.port,
        cli.framework_port,
        project.join(&cli.publish_dir),
        cli.bundler.clone(),
        log_file,
    )
    .with_functions_port(cli.functions_port)
    .with_debug(cli.debug);

    config.validate()?;
    Ok(config)
}

/// Resolve configuration and the forward-proxy binary.
pub fn bootstrap(cli: &Cli) -> Result<CliContext, CliError> {
    let config = build_config(cli)?;
    let binary = resolve_mesh_binary(cli.mesh_binary.as_deref())?;
    Ok(CliContext { config, binary })
}
