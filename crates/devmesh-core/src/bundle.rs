//! Bundling state machine.
//!
//! Tracks which edge-handler bundle is in flight and turns decoded
//! [`StatusEvent`]s into indicator and log effects. The session never performs
//! I/O itself; callers apply the returned [`BundleEffect`]s in order.
//!
//! ```text
//! Idle --BundleStart(id)--> Bundling(id)
//! Bundling(id) --BundleSuccess(id) | BundleFail(id)--> Idle
//! Bundling(_) --stream closed / stream error--> Idle
//! ```
//!
//! Completion events whose id does not match the bundle in flight are stale
//! and ignored. A start event that arrives while a bundle is already in flight
//! takes over the current id but shares the running indicator.

use crate::events::{BundleId, StatusEvent};
use crate::notice::Notice;

/// Indicator text while a bundle is running.
pub const BUNDLING_TEXT: &str = "Bundling edge handlers...";
/// Indicator text for a successful bundle.
pub const BUNDLE_DONE_TEXT: &str = "Done.";
/// Indicator text for a failed bundle without a bundler message.
pub const BUNDLE_FAILED_TEXT: &str = "Failed bundling Edge Handlers";
/// Follow-up hint after a failed bundle.
pub const REBUNDLE_HINT: &str = "Change any project file to trigger a re-bundle";

/// Current bundling state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BundleState {
    /// No bundle in flight and no indicator visible.
    #[default]
    Idle,
    /// A bundle is in flight and the indicator is visible.
    Bundling { id: BundleId },
}

/// How a visible indicator is taken down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorStop {
    /// Success marker with text.
    Success(String),
    /// Failure marker with text.
    Failure(String),
    /// Removed without a marker.
    Hidden,
}

/// Observable side effect requested by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEffect {
    /// Show the progress indicator with the given text.
    StartIndicator(String),
    /// Take the progress indicator down.
    StopIndicator(IndicatorStop),
    /// Emit a log line.
    Notice(Notice),
}

/// The single bundling session owned by a supervisor.
#[derive(Debug, Clone, Default)]
pub struct BundleSession {
    state: BundleState,
}

impl BundleSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> &BundleState {
        &self.state
    }

    /// Id of the bundle in flight.
    pub fn current_id(&self) -> Option<&str> {
        match &self.state {
            BundleState::Idle => None,
            BundleState::Bundling { id } => Some(id.as_str()),
        }
    }

    /// Whether the indicator is currently visible.
    pub const fn spinner_active(&self) -> bool {
        matches!(self.state, BundleState::Bundling { .. })
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: StatusEvent) -> Vec<BundleEffect> {
        match event {
            StatusEvent::BundleStart { id } => {
                let effects = if self.spinner_active() {
                    Vec::new()
                } else {
                    vec![BundleEffect::StartIndicator(BUNDLING_TEXT.to_string())]
                };
                self.state = BundleState::Bundling { id };
                effects
            }
            StatusEvent::BundleSuccess { id } => {
                if !self.is_current(&id) {
                    return Vec::new();
                }
                self.state = BundleState::Idle;
                vec![BundleEffect::StopIndicator(IndicatorStop::Success(
                    BUNDLE_DONE_TEXT.to_string(),
                ))]
            }
            StatusEvent::BundleFail { id, error_message } => {
                if !self.is_current(&id) {
                    return Vec::new();
                }
                self.state = BundleState::Idle;
                vec![
                    BundleEffect::StopIndicator(IndicatorStop::Failure(
                        error_message.unwrap_or_else(|| BUNDLE_FAILED_TEXT.to_string()),
                    )),
                    BundleEffect::Notice(Notice::info(REBUNDLE_HINT)),
                ]
            }
            StatusEvent::Unknown { kind } => vec![BundleEffect::Notice(Notice::warn(format!(
                "Unknown mesh-forward event '{kind}'"
            )))],
        }
    }

    /// The diagnostic stream ended. Any bundle in flight is abandoned silently.
    pub fn stream_closed(&mut self) -> Vec<BundleEffect> {
        if std::mem::take(&mut self.state) == BundleState::Idle {
            return Vec::new();
        }
        vec![BundleEffect::StopIndicator(IndicatorStop::Hidden)]
    }

    /// Reading the diagnostic stream failed.
    pub fn stream_failed(&mut self, reason: &str) -> Vec<BundleEffect> {
        let text =
            format!("An error occurred while processing the messages from mesh-forward: {reason}");
        if std::mem::take(&mut self.state) == BundleState::Idle {
            return vec![BundleEffect::Notice(Notice::error(text))];
        }
        vec![BundleEffect::StopIndicator(IndicatorStop::Failure(text))]
    }

    fn is_current(&self, id: &BundleId) -> bool {
        matches!(&self.state, BundleState::Bundling { id: current } if current == id)
    }
}
