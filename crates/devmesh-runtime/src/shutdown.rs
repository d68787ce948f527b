//! Child termination with a grace period and forced-kill fallback.
//!
//! # Strategy
//! 1. Forward the requested signal to the child
//! 2. Wait up to the grace period for it to exit
//! 3. If still running, force-kill it (SIGKILL) exactly once
//! 4. Wait for reaping (required to avoid zombies)

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use devmesh_core::{ChildExit, HostSignal};
use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Minimal control surface over a child process.
#[async_trait]
pub trait TerminableChild: Send {
    /// OS process id, while the child has not been reaped.
    fn pid(&self) -> Option<u32>;

    /// Deliver `signal` without waiting. A child that is already gone is not an error.
    fn send_signal(&mut self, signal: HostSignal) -> io::Result<()>;

    /// Wait for the child to exit and reap it.
    async fn wait_exit(&mut self) -> io::Result<ChildExit>;

    /// Kill the child unconditionally without waiting.
    async fn force_kill(&mut self) -> io::Result<()>;
}

/// Ask `child` to terminate with `signal`, escalating to a forced kill after `grace`.
///
/// The forced kill is an expected escalation, not an error.
pub async fn terminate_with_grace<C>(
    child: &mut C,
    signal: HostSignal,
    grace: Duration,
) -> io::Result<ChildExit>
where
    C: TerminableChild + ?Sized,
{
    debug!(pid = ?child.pid(), signal = signal.name(), "Requesting child termination");
    if let Err(e) = child.send_signal(signal) {
        warn!(signal = signal.name(), "Failed to signal child: {e}");
    }

    if let Ok(result) = timeout(grace, child.wait_exit()).await {
        return result;
    }

    warn!(
        pid = ?child.pid(),
        grace_ms = %grace.as_millis(),
        "Child did not exit within grace period, forcing kill"
    );
    child.force_kill().await?;
    child.wait_exit().await
}

/// Convert a platform exit status into a [`ChildExit`].
pub fn child_exit(status: ExitStatus) -> ChildExit {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ChildExit {
            code: status.code(),
            signal: status.signal(),
        }
    }

    #[cfg(not(unix))]
    {
        ChildExit {
            code: status.code(),
            signal: None,
        }
    }
}

#[cfg(unix)]
const fn to_nix(signal: HostSignal) -> Signal {
    match signal {
        HostSignal::Interrupt => Signal::SIGINT,
        HostSignal::Terminate => Signal::SIGTERM,
        HostSignal::Quit => Signal::SIGQUIT,
        HostSignal::Hangup => Signal::SIGHUP,
    }
}

#[async_trait]
impl TerminableChild for Child {
    fn pid(&self) -> Option<u32> {
        self.id()
    }

    #[cfg(unix)]
    fn send_signal(&mut self, signal: HostSignal) -> io::Result<()> {
        let Some(pid) = self.id() else {
            // Already reaped
            return Ok(());
        };
        let pid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        match signal::kill(Pid::from_raw(pid), to_nix(signal)) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    #[cfg(not(unix))]
    fn send_signal(&mut self, _signal: HostSignal) -> io::Result<()> {
        // Windows has no SIGTERM equivalent - terminate immediately
        self.start_kill()
    }

    async fn wait_exit(&mut self) -> io::Result<ChildExit> {
        self.wait().await.map(child_exit)
    }

    async fn force_kill(&mut self) -> io::Result<()> {
        match self.start_kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()), // already exited
            other => other,
        }
    }
}
