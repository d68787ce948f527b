//! Forward-proxy configuration and its defaults.
//!
//! These are pure domain types with no infrastructure dependencies. The CLI
//! builds a [`ProxyConfig`] once at startup; nothing mutates it afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// How long to wait for the forward proxy to accept connections.
pub const PROXY_READY_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Grace period between a termination request and the forced kill.
pub const PROXY_EXIT_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Delay between two readiness probes.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Project-local directory holding dev-server state.
pub const PROJECT_STATE_DIR: &str = ".netlify";

/// Errors raised while validating a [`ProxyConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A port was left at zero.
    #[error("{name} port must be non-zero")]
    ZeroPort { name: &'static str },

    /// Two services were configured on the same port.
    #[error("{first} port and {second} port are both {port}")]
    PortConflict {
        first: &'static str,
        second: &'static str,
        port: u16,
    },

    /// A required path was empty.
    #[error("{name} must not be empty")]
    EmptyPath { name: &'static str },
}

/// Configuration for starting the forward proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Port the proxy listens on locally.
    pub listen_port: u16,
    /// Port of the framework dev server that traffic is forwarded to.
    pub framework_port: u16,
    /// Port of the local functions server, when one is running.
    pub functions_port: Option<u16>,
    /// Directory the proxy watches for edge handler changes.
    pub publish_dir: PathBuf,
    /// Path to the edge handlers bundler entry point.
    pub bundler_path: PathBuf,
    /// File the proxy writes its own log to.
    pub log_file: PathBuf,
    /// Pass `--debug` to the proxy.
    pub debug: bool,
}

impl ProxyConfig {
    /// Create a configuration with the required fields.
    #[must_use]
    pub fn new(
        listen_port: u16,
        framework_port: u16,
        publish_dir: impl Into<PathBuf>,
        bundler_path: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            listen_port,
            framework_port,
            functions_port: None,
            publish_dir: publish_dir.into(),
            bundler_path: bundler_path.into(),
            log_file: log_file.into(),
            debug: false,
        }
    }

    /// Set the functions server port. A zero port counts as "no functions server".
    #[must_use]
    pub fn with_functions_port(mut self, port: Option<u16>) -> Self {
        self.functions_port = port.filter(|p| *p != 0);
        self
    }

    /// Enable or disable proxy debug output.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// URL the proxy forwards framework traffic to.
    pub fn forward_url(&self) -> String {
        localhost_url(self.framework_port)
    }

    /// URL of the local functions server, if any.
    pub fn local_services_url(&self) -> Option<String> {
        self.functions_port.map(localhost_url)
    }

    /// Check the configuration for values the proxy cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ports = vec![("listen", self.listen_port), ("framework", self.framework_port)];
        if let Some(port) = self.functions_port {
            ports.push(("functions", port));
        }

        for (name, port) in &ports {
            if *port == 0 {
                return Err(ConfigError::ZeroPort { name: *name });
            }
        }

        for (i, (first, a)) in ports.iter().enumerate() {
            if let Some((second, _)) = ports[i + 1..].iter().find(|(_, b)| b == a) {
                return Err(ConfigError::PortConflict {
                    first: *first,
                    second: *second,
                    port: *a,
                });
            }
        }

        if self.publish_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath {
                name: "publish directory",
            });
        }
        if self.bundler_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath {
                name: "bundler path",
            });
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { name: "log file" });
        }

        Ok(())
    }
}

/// Default location of the proxy log inside a project.
pub fn default_log_file(project_dir: &Path) -> PathBuf {
    project_dir
        .join(PROJECT_STATE_DIR)
        .join("logs")
        .join("traffic-mesh.log")
}

/// `http://localhost:{port}`
pub fn localhost_url(port: u16) -> String {
    format!("http://localhost:{port}")
}

/// Base URL of a forward proxy that has been confirmed to accept connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Base URL for a proxy listening on `port`.
    pub fn for_port(port: u16) -> Self {
        Self(localhost_url(port))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProxyConfig {
        ProxyConfig::new(
            8888,
            3000,
            "public",
            "/opt/bundler/cli.js",
            "/tmp/site/.netlify/logs/traffic-mesh.log",
        )
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(sample().with_functions_port(Some(34567)).validate(), Ok(()));
    }

    #[test]
    fn test_zero_functions_port_is_absent() {
        let config = sample().with_functions_port(Some(0));
        assert_eq!(config.functions_port, None);
        assert_eq!(config.local_services_url(), None);
    }

    #[test]
    fn test_port_conflict_detected() {
        let mut config = sample().with_functions_port(Some(3000));
        assert_eq!(
            config.validate(),
            Err(ConfigError::PortConflict {
                first: "framework",
                second: "functions",
                port: 3000,
            })
        );

        config.functions_port = None;
        config.framework_port = 8888;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PortConflict { port: 8888, .. })
        ));
    }

    #[test]
    fn test_zero_listen_port_rejected() {
        let mut config = sample();
        config.listen_port = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroPort { name: "listen" })
        );
    }

    #[test]
    fn test_empty_publish_dir_rejected() {
        let mut config = sample();
        config.publish_dir = PathBuf::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyPath { .. })
        ));
    }

    #[test]
    fn test_default_log_file_location() {
        let path = default_log_file(Path::new("/work/site"));
        assert_eq!(
            path,
            PathBuf::from("/work/site/.netlify/logs/traffic-mesh.log")
        );
    }

    #[test]
    fn test_urls() {
        let config = sample().with_functions_port(Some(9999));
        assert_eq!(config.forward_url(), "http://localhost:3000");
        assert_eq!(
            config.local_services_url().as_deref(),
            Some("http://localhost:9999")
        );
        assert_eq!(BaseUrl::for_port(8888).to_string(), "http://localhost:8888");
    }
}
