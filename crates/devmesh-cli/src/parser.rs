//! Main CLI parser.
//!
//! Every flag can also be supplied through a `DEVMESH_*` environment variable,
//! which is how the surrounding dev server passes its ports in.

use std::path::PathBuf;

use clap::Parser;

/// Command-line interface for the forward-proxy supervisor.
#[derive(Debug, Parser)]
#[command(name = "devmesh")]
#[command(about = "Run the local forward proxy and report edge-handler bundling")]
#[command(version)]
pub struct Cli {
    /// Port the forward proxy listens on
    #[arg(short = 'p', long = "port", env = "DEVMESH_PORT", default_value_t = 8888)]
    pub port: u16,

    /// Port of the framework dev server that receives forwarded traffic
    #[arg(long = "framework-port", env = "DEVMESH_FRAMEWORK_PORT")]
    pub framework_port: u16,

    /// Port of the local functions server (0 or unset means none)
    #[arg(long = "functions-port", env = "DEVMESH_FUNCTIONS_PORT")]
    pub functions_port: Option<u16>,

    /// Project root; relative paths below are resolved against it
    #[arg(long = "project-dir", env = "DEVMESH_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Directory the proxy watches for changes
    #[arg(long = "publish-dir", env = "DEVMESH_PUBLISH_DIR", default_value = ".")]
    pub publish_dir: PathBuf,

    /// Edge-handler bundler executable
    #[arg(long = "bundler", env = "DEVMESH_BUNDLER")]
    pub bundler: PathBuf,

    /// Proxy log file [default: <project>/.netlify/logs/traffic-mesh.log]
    #[arg(long = "log-file", env = "DEVMESH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Forward-proxy executable (falls back to `traffic-mesh` on PATH)
    #[arg(long = "mesh-binary", env = "DEVMESH_TRAFFIC_MESH_PATH")]
    pub mesh_binary: Option<PathBuf>,

    /// Ask the proxy for debug output
    #[arg(long = "debug", env = "DEVMESH_DEBUG")]
    pub debug: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", env = "DEVMESH_VERBOSE")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_and_default_args() {
        let cli = Cli::parse_from([
            "devmesh",
            "--framework-port",
            "3000",
            "--bundler",
            "/opt/bundler",
        ]);
        assert_eq!(cli.port, 8888);
        assert_eq!(cli.framework_port, 3000);
        assert_eq!(cli.functions_port, None);
        assert_eq!(cli.project_dir, PathBuf::from("."));
        assert_eq!(cli.bundler, PathBuf::from("/opt/bundler"));
        assert!(cli.log_file.is_none());
        assert!(!cli.debug);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_all_args() {
        let cli = Cli::parse_from([
            "devmesh",
            "-p",
            "9999",
            "--framework-port",
            "3000",
            "--functions-port",
            "34567",
            "--project-dir",
            "/work/site",
            "--publish-dir",
            "dist",
            "--bundler",
            "bundler",
            "--log-file",
            "/tmp/mesh.log",
            "--mesh-binary",
            "/usr/local/bin/traffic-mesh",
            "--debug",
            "-v",
        ]);
        assert_eq!(cli.port, 9999);
        assert_eq!(cli.functions_port, Some(34567));
        assert_eq!(cli.publish_dir, PathBuf::from("dist"));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/mesh.log")));
        assert_eq!(
            cli.mesh_binary,
            Some(PathBuf::from("/usr/local/bin/traffic-mesh"))
        );
        assert!(cli.debug);
        assert!(cli.verbose);
    }

    #[test]
    fn test_every_flag_has_env_fallback() {
        let command = Cli::command();
        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if matches!(id, "help" | "version") {
                continue;
            }
            let env = arg
                .get_env()
                .and_then(|e| e.to_str())
                .unwrap_or_else(|| panic!("--{id} has no env fallback"));
            assert!(env.starts_with("DEVMESH_"), "--{id} uses {env}");
        }
    }

    #[test]
    fn test_framework_port_is_required() {
        let result = Cli::try_parse_from(["devmesh", "--bundler", "bundler"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Cli::try_parse_from([
            "devmesh",
            "--framework-port",
            "70000",
            "--bundler",
            "bundler",
        ]);
        assert!(result.is_err());
    }
}
