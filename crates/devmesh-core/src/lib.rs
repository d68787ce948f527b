//! Core domain types and port definitions for devmesh.
//!
//! `devmesh` supervises a local forward proxy during development: it starts
//! the proxy, waits for its port, and turns the bundler progress the proxy
//! reports into a spinner. This crate holds the parts that do no I/O:
//!
//! - [`config`]: `ProxyConfig` and the timing constants
//! - [`events`]: decoding of the proxy's JSON status lines
//! - [`bundle`]: the bundling state machine
//! - [`dispatch`]: the inbound-message dispatcher driving a supervised proxy
//! - [`ports`]: traits for the log and indicator collaborators

#![deny(unused_crate_dependencies)]

pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod notice;
pub mod ports;

// Re-export commonly used types for convenience
pub use bundle::{BundleEffect, BundleSession, BundleState, IndicatorStop};
pub use config::{
    BaseUrl, ConfigError, PROXY_EXIT_TIMEOUT, PROXY_READY_TIMEOUT, ProxyConfig,
    READY_POLL_INTERVAL, default_log_file, localhost_url,
};
pub use dispatch::{
    ChildExit, Directive, ExitReason, HostSignal, Inbound, MeshDispatcher, MeshExit,
};
pub use events::{BundleId, DecodeError, StatusEvent, decode};
pub use notice::{Notice, NoticeLevel};
pub use ports::{BundleIndicator, DevLogPort, NoopIndicator, NoopLog};
