//! Port definitions for the collaborators the supervisor talks to.
//!
//! Adapters (CLI, tests) provide implementations; the runtime only ever
//! sees these traits.

mod indicator;
mod log;

pub use indicator::{BundleIndicator, NoopIndicator};
pub use log::{DevLogPort, NoopLog};
