//! Inbound-message dispatcher for a supervised forward proxy.
//!
//! Everything that can happen to a running proxy arrives as one [`Inbound`]
//! message: a diagnostic line, the end of the diagnostic stream, a host
//! signal, the host shutting down, or the child exiting. The dispatcher turns
//! each message into [`Directive`]s that the runtime executes in order.
//! Because messages are handled one at a time, the bundling session is
//! mutated in strict arrival order.

use crate::bundle::{BundleEffect, BundleSession};
use crate::events::decode;
use crate::notice::Notice;

/// Host signals forwarded to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSignal {
    Interrupt,
    Terminate,
    Quit,
    Hangup,
}

impl HostSignal {
    /// Every signal the supervisor listens for.
    pub const ALL: [Self; 4] = [Self::Interrupt, Self::Terminate, Self::Quit, Self::Hangup];

    /// POSIX signal number.
    pub const fn number(self) -> i32 {
        match self {
            Self::Interrupt => 2,
            Self::Terminate => 15,
            Self::Quit => 3,
            Self::Hangup => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Quit => "SIGQUIT",
            Self::Hangup => "SIGHUP",
        }
    }
}

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    /// Exit code, when the child exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, when the child was killed.
    pub signal: Option<i32>,
}

impl ChildExit {
    pub const fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub const fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code the host should use to mirror this exit (`128 + n` for signals).
    pub const fn host_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Why a supervised proxy stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The child terminated on its own.
    ChildExited,
    /// The host received a signal and shut the child down.
    HostSignal(HostSignal),
    /// The host is exiting normally.
    HostExit,
}

/// Final outcome of a supervised proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshExit {
    /// Code the host process should exit with.
    pub code: i32,
    pub reason: ExitReason,
    pub child: ChildExit,
}

/// Messages delivered to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// One line of diagnostic output (without the trailing newline).
    Line(String),
    /// The diagnostic stream reached end of file.
    StreamClosed,
    /// Reading the diagnostic stream failed.
    StreamError(String),
    /// The host received a signal.
    Signal(HostSignal),
    /// The host is exiting normally.
    HostExit,
    /// The child process has been reaped.
    ChildExited(ChildExit),
}

/// Work the runtime must carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Apply an indicator or log effect.
    Bundle(BundleEffect),
    /// Stop reading the diagnostic stream and release the reader.
    ReleaseStream,
    /// Ask the child to terminate with this signal, force-killing it after the grace period.
    Terminate(HostSignal),
    /// The child is gone; report this outcome to the host.
    Finish(MeshExit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    ShuttingDown(ExitReason),
    Finished,
}

/// Single-owner dispatcher holding the bundling session.
#[derive(Debug)]
pub struct MeshDispatcher {
    session: BundleSession,
    stream_open: bool,
    phase: Phase,
}

impl Default for MeshDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshDispatcher {
    pub fn new() -> Self {
        Self {
            session: BundleSession::new(),
            stream_open: true,
            phase: Phase::Running,
        }
    }

    pub const fn session(&self) -> &BundleSession {
        &self.session
    }

    /// Whether shutdown has been requested or the child is gone.
    pub const fn is_stopping(&self) -> bool {
        !matches!(self.phase, Phase::Running)
    }

    /// Whether diagnostic lines are still being consumed.
    pub const fn stream_open(&self) -> bool {
        self.stream_open
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    /// Handle one inbound message.
    pub fn handle(&mut self, message: Inbound) -> Vec<Directive> {
        if self.is_finished() {
            return Vec::new();
        }

        match message {
            Inbound::Line(line) => {
                if !self.stream_open {
                    return Vec::new();
                }
                match decode(&line) {
                    Ok(event) => bundle(self.session.apply(event)),
                    Err(err) => vec![Directive::Bundle(BundleEffect::Notice(Notice::error(
                        err.to_string(),
                    )))],
                }
            }
            Inbound::StreamClosed => {
                if !self.stream_open {
                    return Vec::new();
                }
                self.stream_open = false;
                bundle(self.session.stream_closed())
            }
            Inbound::StreamError(reason) => {
                if !self.stream_open {
                    return Vec::new();
                }
                self.stream_open = false;
                bundle(self.session.stream_failed(&reason))
            }
            Inbound::Signal(signal) => self.shut_down(ExitReason::HostSignal(signal), signal),
            // An exit cannot be forwarded, so the child is asked to terminate instead.
            Inbound::HostExit => self.shut_down(ExitReason::HostExit, HostSignal::Terminate),
            Inbound::ChildExited(child) => {
                let mut directives = self.release_stream();
                let (reason, code) = match self.phase {
                    Phase::ShuttingDown(ExitReason::HostSignal(signal)) => {
                        (ExitReason::HostSignal(signal), 128 + signal.number())
                    }
                    Phase::ShuttingDown(ExitReason::HostExit) => (ExitReason::HostExit, 0),
                    _ => (ExitReason::ChildExited, child.host_code()),
                };
                self.phase = Phase::Finished;
                directives.push(Directive::Finish(MeshExit {
                    code,
                    reason,
                    child,
                }));
                directives
            }
        }
    }

    fn shut_down(&mut self, reason: ExitReason, signal: HostSignal) -> Vec<Directive> {
        if self.is_stopping() {
            return Vec::new();
        }
        self.phase = Phase::ShuttingDown(reason);
        let mut directives = self.release_stream();
        directives.push(Directive::Terminate(signal));
        directives
    }

    fn release_stream(&mut self) -> Vec<Directive> {
        if !self.stream_open {
            return Vec::new();
        }
        self.stream_open = false;
        let mut directives = vec![Directive::ReleaseStream];
        directives.extend(bundle(self.session.stream_closed()));
        directives
    }
}

fn bundle(effects: Vec<BundleEffect>) -> Vec<Directive> {
    effects.into_iter().map(Directive::Bundle).collect()
}
