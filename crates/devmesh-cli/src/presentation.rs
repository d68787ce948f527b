//! Console rendering of developer-facing notices.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use console::style;
use devmesh_core::{DevLogPort, Notice, NoticeLevel};
use devmesh_runtime::CliIndicator;
use tracing::debug;

/// Prefix shared by every devmesh log line.
const PREFIX: &str = "◈";

/// Log sink that prints styled notices.
///
/// Notices go to stdout. While the bundling spinner is visible they are
/// printed above it instead, so the spinner line is not torn.
pub struct ConsoleLog<W = io::Stdout> {
    indicator: Arc<CliIndicator>,
    out: Mutex<W>,
}

impl ConsoleLog {
    pub fn new(indicator: Arc<CliIndicator>) -> Self {
        Self::with_writer(indicator, io::stdout())
    }
}

impl<W: Write + Send> ConsoleLog<W> {
    pub const fn with_writer(indicator: Arc<CliIndicator>, out: W) -> Self {
        Self {
            indicator,
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> DevLogPort for ConsoleLog<W> {
    fn emit(&self, notice: &Notice) {
        let line = format_notice(notice);
        if self.indicator.is_active() {
            self.indicator.println(&line);
            return;
        }

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}") {
            debug!("Failed to write notice: {e}");
        }
    }
}

/// Render a notice with its coloured prefix.
pub fn format_notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Info => style(PREFIX).cyan(),
        NoticeLevel::Warn => style(PREFIX).yellow(),
        NoticeLevel::Error => style(PREFIX).red(),
    };
    format!("{prefix} {}", notice.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_keeps_text() {
        let line = format_notice(&Notice::warn("Unknown mesh-forward event 'x'"));
        assert!(line.contains(PREFIX));
        assert!(line.ends_with("Unknown mesh-forward event 'x'"));
    }

    #[test]
    fn test_idle_notices_go_to_the_output_writer() {
        let log = ConsoleLog::with_writer(Arc::new(CliIndicator::new()), Vec::new());
        log.emit(&Notice::info("Forward proxy ready at http://localhost:8888"));
        log.emit(&Notice::error("Timed out"));

        let out = log.out.lock().unwrap();
        let text = String::from_utf8_lossy(&out);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Forward proxy ready at http://localhost:8888"));
        assert!(lines[1].ends_with("Timed out"));
    }
}
