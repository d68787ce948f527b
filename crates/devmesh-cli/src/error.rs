//! CLI-specific error types and exit-code mapping.

use devmesh_core::ConfigError;
use devmesh_runtime::{MeshBinaryError, SupervisorError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The flags do not describe a usable proxy configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The forward-proxy executable could not be located.
    #[error("{0}")]
    Binary(#[from] MeshBinaryError),

    /// Starting or supervising the proxy failed.
    #[error("Process error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// IO error (working directory lookup, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where a category fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,     // EX_CONFIG
            Self::Binary(_) => 69,     // EX_UNAVAILABLE
            Self::Supervisor(_) => 71, // EX_OSERR
            Self::Io(_) => 74,         // EX_IOERR
        }
    }
}
