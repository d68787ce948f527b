//! Forward-proxy process plumbing: binary lookup and command construction.

mod args;
mod binary;

pub use args::{build_args, mesh_command};
pub use binary::{
    MESH_BINARY_ENV, MESH_BINARY_NAME, MeshBinaryError, resolve_mesh_binary, validate_binary,
};
