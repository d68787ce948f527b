//! Host signal lifecycle.
//!
//! [`HostSignals`] owns the listeners for SIGINT, SIGTERM, SIGQUIT and SIGHUP
//! and forwards each delivery to a dispatcher inbox. Registration happens in
//! [`HostSignals::start`] and ends in [`HostSignals::stop`] (or on drop), so
//! every supervisor has its own listeners instead of process-wide handlers.
//!
//! Note: once tokio has installed a handler for a signal, the default action
//! for that signal stays replaced for the rest of the process, even after
//! `stop`.

use std::io;

use devmesh_core::{HostSignal, Inbound};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registered host signal listeners.
#[derive(Debug)]
pub struct HostSignals {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HostSignals {
    /// Register the listeners and start forwarding into `inbox`.
    #[cfg(unix)]
    pub fn start(inbox: UnboundedSender<Inbound>) -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        let mut hangup = signal(SignalKind::hangup())?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    () = token.cancelled() => break,
                    Some(()) = interrupt.recv() => HostSignal::Interrupt,
                    Some(()) = terminate.recv() => HostSignal::Terminate,
                    Some(()) = quit.recv() => HostSignal::Quit,
                    Some(()) = hangup.recv() => HostSignal::Hangup,
                };
                debug!(signal = received.name(), "Host signal received");
                if inbox.send(Inbound::Signal(received)).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            cancel,
            task: Some(task),
        })
    }

    /// Register the listeners and start forwarding into `inbox`.
    ///
    /// Only Ctrl-C is observable on this platform.
    #[cfg(not(unix))]
    pub fn start(inbox: UnboundedSender<Inbound>) -> io::Result<Self> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    result = tokio::signal::ctrl_c() => {
                        if result.is_err() || inbox.send(Inbound::Signal(HostSignal::Interrupt)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            cancel,
            task: Some(task),
        })
    }

    /// Deregister the listeners. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HostSignals {
    fn drop(&mut self) {
        self.stop();
    }
}
