//! Terminal rendering of the bundling indicator.
//!
//! # Feature Flags
//!
//! - `cli`: Enables `CliIndicator` which uses `indicatif` for a terminal spinner.
//!   Without this feature, callers fall back to `devmesh_core::NoopIndicator`.

/// CLI indicator using an indicatif spinner.
///
/// This is only available with the `cli` feature flag.
#[cfg(feature = "cli")]
pub mod cli_indicator {
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use devmesh_core::BundleIndicator;
    use indicatif::{ProgressBar, ProgressStyle};

    const TICK: Duration = Duration::from_millis(120);

    /// Spinner shown while edge handlers are bundling.
    pub struct CliIndicator {
        bar: Mutex<Option<ProgressBar>>,
    }

    impl CliIndicator {
        pub fn new() -> Self {
            Self {
                bar: Mutex::new(None),
            }
        }

        fn spinner_style() -> ProgressStyle {
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        }

        fn marker_style(template: &str) -> ProgressStyle {
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        }

        fn take(&self) -> Option<ProgressBar> {
            self.bar
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        }

        /// Print a line without tearing an active spinner.
        pub fn println(&self, line: &str) {
            let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref pb) = *guard {
                pb.println(line);
            } else {
                println!("{line}");
            }
        }

        pub fn is_active(&self) -> bool {
            self.bar
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        }
    }

    impl Default for CliIndicator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl BundleIndicator for CliIndicator {
        fn start(&self, text: &str) {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.set_message(text.to_string());
            pb.enable_steady_tick(TICK);

            let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = guard.replace(pb) {
                previous.finish_and_clear();
            }
        }

        fn succeed(&self, text: &str) {
            if let Some(pb) = self.take() {
                pb.set_style(Self::marker_style("{prefix:.green} {msg}"));
                pb.set_prefix("✔");
                pb.finish_with_message(text.to_string());
            }
        }

        fn fail(&self, text: &str) {
            if let Some(pb) = self.take() {
                pb.set_style(Self::marker_style("{prefix:.red} {msg}"));
                pb.set_prefix("✖");
                pb.abandon_with_message(text.to_string());
            }
        }

        fn hide(&self) {
            if let Some(pb) = self.take() {
                pb.finish_and_clear();
            }
        }
    }

}

#[cfg(feature = "cli")]
pub use cli_indicator::CliIndicator;
