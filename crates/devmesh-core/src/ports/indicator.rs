//! Progress indicator port.

/// A single progress indicator (spinner) shown while a bundle is running.
///
/// Implementors can draw a terminal spinner, update UI elements, or ignore
/// the calls entirely (`NoopIndicator`). The bundling session guarantees that
/// `start` is never called twice without a stop in between.
pub trait BundleIndicator: Send + Sync {
    /// Show the indicator with `text`.
    fn start(&self, text: &str);

    /// Stop with a success marker.
    fn succeed(&self, text: &str);

    /// Stop with a failure marker.
    fn fail(&self, text: &str);

    /// Remove the indicator without a marker.
    fn hide(&self);
}

/// An indicator that ignores all updates.
///
/// Use this when no terminal is attached or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl BundleIndicator for NoopIndicator {
    fn start(&self, _text: &str) {}
    fn succeed(&self, _text: &str) {}
    fn fail(&self, _text: &str) {}
    fn hide(&self) {}
}
