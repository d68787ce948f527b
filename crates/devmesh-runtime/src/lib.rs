//! Process runtime for devmesh.
//!
//! Everything that touches the operating system lives here: spawning the
//! forward proxy, probing its port, reading its diagnostic stream, listening
//! for host signals, and terminating the child with a grace period. The
//! [`MeshSupervisor`] composes these around the pure dispatcher from
//! `devmesh-core`.

#![deny(unsafe_code)]

pub mod mesh;
pub mod progress;
pub mod readiness;
pub mod shutdown;
pub mod signals;
pub mod stream;
pub mod supervisor;

pub use mesh::{MeshBinaryError, build_args, mesh_command, resolve_mesh_binary};
pub use readiness::{ReadinessError, wait_for_port, wait_for_port_with_interval};
pub use shutdown::{TerminableChild, child_exit, terminate_with_grace};
pub use signals::HostSignals;
pub use stream::{StreamReader, spawn_stream_reader};
pub use supervisor::{
    MeshHandle, MeshSupervisor, SupervisorError, SupervisorOptions, apply_effect,
};

#[cfg(feature = "cli")]
pub use progress::cli_indicator::CliIndicator;
