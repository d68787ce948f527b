//! Forward-proxy binary resolution.
//!
//! Precedence:
//! 1. Explicit path from configuration (`--mesh-binary`)
//! 2. `DEVMESH_TRAFFIC_MESH_PATH` environment variable
//! 3. `traffic-mesh` on `PATH`
//!
//! Explicit and environment paths are validated to exist and be executable.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the forward-proxy binary.
pub const MESH_BINARY_ENV: &str = "DEVMESH_TRAFFIC_MESH_PATH";

/// Executable name looked up on `PATH`.
pub const MESH_BINARY_NAME: &str = "traffic-mesh";

/// Errors that can occur when resolving the forward-proxy binary.
#[derive(Debug, Error)]
pub enum MeshBinaryError {
    /// The binary was not found at the given location.
    #[error("traffic-mesh binary not found at: {path}")]
    NotFound { path: PathBuf },

    /// The binary exists but is not executable.
    #[error("traffic-mesh binary exists but is not executable: {path}")]
    NotExecutable { path: PathBuf },

    /// No binary was configured and none is on `PATH`.
    #[error(
        "Could not find '{name}' on PATH: {reason}\n\nPass --mesh-binary or set {env} to the forward proxy executable."
    )]
    NotOnPath {
        name: &'static str,
        env: &'static str,
        reason: String,
    },
}

/// Resolve the forward-proxy binary.
pub fn resolve_mesh_binary(explicit: Option<&Path>) -> Result<PathBuf, MeshBinaryError> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        debug!("Using traffic-mesh from configuration: {}", path.display());
        return validate_binary(path);
    }

    if let Some(env_path) = std::env::var_os(MESH_BINARY_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(env_path);
        debug!("Using traffic-mesh from {MESH_BINARY_ENV}: {}", path.display());
        return validate_binary(&path);
    }

    which::which(MESH_BINARY_NAME).map_err(|e| MeshBinaryError::NotOnPath {
        name: MESH_BINARY_NAME,
        env: MESH_BINARY_ENV,
        reason: e.to_string(),
    })
}

/// Validate that a binary exists and is executable.
pub fn validate_binary(path: &Path) -> Result<PathBuf, MeshBinaryError> {
    if !path.is_file() {
        return Err(MeshBinaryError::NotFound {
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let executable = std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if !executable {
            return Err(MeshBinaryError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(path.to_path_buf())
}
