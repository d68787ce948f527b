//! Forward-proxy invocation builder.
//!
//! Turns a [`ProxyConfig`] into the argument vector the traffic mesh expects
//! and wraps it in a ready-to-spawn command.

use std::path::Path;
use std::process::Stdio;

use devmesh_core::ProxyConfig;
use tokio::process::Command;

/// Build the argument vector for `traffic-mesh start local`.
///
/// The fixed part is always present, in this order:
/// 1. `start local`
/// 2. `--port`, `--forward-proxy`, `--watch`, `--bundler`, `--log-file`
/// 3. `--progress` (enables the JSON status stream)
///
/// `--local-services-uri` follows only when a functions port is set, and
/// `--debug` last when debugging is enabled.
pub fn build_args(config: &ProxyConfig) -> Vec<String> {
    let mut args = vec![
        "start".to_string(),
        "local".to_string(),
        "--port".to_string(),
        config.listen_port.to_string(),
        "--forward-proxy".to_string(),
        config.forward_url(),
        "--watch".to_string(),
        config.publish_dir.to_string_lossy().into_owned(),
        "--bundler".to_string(),
        config.bundler_path.to_string_lossy().into_owned(),
        "--log-file".to_string(),
        config.log_file.to_string_lossy().into_owned(),
        "--progress".to_string(),
    ];

    if let Some(uri) = config.local_services_url() {
        args.push("--local-services-uri".to_string());
        args.push(uri);
    }

    if config.debug {
        args.push("--debug".to_string());
    }

    args
}

/// Build the forward-proxy command.
///
/// Standard input and output are inherited from the host; the diagnostic
/// stream (stderr) is piped so the supervisor can decode it.
pub fn mesh_command(binary: &Path, config: &ProxyConfig) -> Command {
    let mut cmd = Command::new(binary);
    cmd.args(build_args(config))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());
    cmd
}
