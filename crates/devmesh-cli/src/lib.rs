//! Command-line front end for devmesh.
//!
//! Parses flags, builds the proxy configuration and renders notices. The
//! binary in `main.rs` wires these to the runtime supervisor.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use anyhow as _;
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod error;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, bootstrap, build_config};
pub use error::CliError;
pub use parser::Cli;
pub use presentation::{ConsoleLog, format_notice};
