//! Logging collaborator port.

use crate::notice::Notice;

/// Destination for every user-visible message.
///
/// Any `Fn(&Notice)` closure is a valid sink, which keeps the collaborator a
/// single injected function for callers that do not need a dedicated type.
pub trait DevLogPort: Send + Sync {
    /// Emit one formatted message.
    fn emit(&self, notice: &Notice);
}

impl<F> DevLogPort for F
where
    F: Fn(&Notice) + Send + Sync,
{
    fn emit(&self, notice: &Notice) {
        self(notice);
    }
}

/// A log sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

impl DevLogPort for NoopLog {
    fn emit(&self, _notice: &Notice) {}
}
