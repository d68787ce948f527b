//! Forward-proxy supervisor.
//!
//! The `MeshSupervisor` spawns the forward proxy, wires its diagnostic stream
//! into the bundling dispatcher, and races the readiness probe against the
//! child's lifetime. A `MeshHandle` is returned to the caller; it reports the
//! confirmed base URL (if any) and resolves to a [`MeshExit`] once the child
//! is gone.
//!
//! Key design decisions:
//! - **One dispatcher task**: stream lines, host signals, host exit and child
//!   exit all arrive as `Inbound` messages on one channel and are handled in
//!   order by a single task that exclusively owns the child.
//! - **Release before terminate**: the stream reader is released before any
//!   termination request reaches the child.
//! - **Exit is reported, not performed**: the host decides when to call
//!   `std::process::exit` with the reported code.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use devmesh_core::{
    BaseUrl, BundleEffect, BundleIndicator, DevLogPort, Directive, ExitReason, HostSignal,
    Inbound, IndicatorStop, MeshDispatcher, MeshExit, Notice, PROXY_EXIT_TIMEOUT,
    PROXY_READY_TIMEOUT, ProxyConfig, READY_POLL_INTERVAL,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::mesh::mesh_command;
use crate::readiness::wait_for_port_with_interval;
use crate::shutdown::{TerminableChild, terminate_with_grace};
use crate::signals::HostSignals;
use crate::stream::{StreamReader, spawn_stream_reader};

/// How long buffered diagnostic lines are still consumed after the child exits.
const STREAM_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Error from supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The proxy log directory could not be created.
    #[error("Failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Host signal listeners could not be registered.
    #[error("Failed to register host signal handlers: {0}")]
    Signals(#[source] io::Error),

    /// The forward proxy could not be started.
    #[error("Failed to spawn forward proxy {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The child's diagnostic stream was not piped.
    #[error("Forward proxy diagnostic stream was not captured")]
    MissingStream,

    /// Waiting for or terminating the child failed.
    #[error("Failed to supervise forward proxy: {0}")]
    Io(#[from] io::Error),

    /// The supervising task panicked or was cancelled.
    #[error("Supervisor task failed: {0}")]
    Task(String),
}

/// Timing and signal options for a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// How long to wait for the proxy port to accept connections.
    pub ready_timeout: Duration,
    /// Grace period before a forced kill.
    pub exit_grace: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    /// Register SIGINT/SIGTERM/SIGQUIT/SIGHUP listeners for this supervisor.
    pub forward_host_signals: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            ready_timeout: PROXY_READY_TIMEOUT,
            exit_grace: PROXY_EXIT_TIMEOUT,
            poll_interval: READY_POLL_INTERVAL,
            forward_host_signals: true,
        }
    }
}

/// Supervisor for the forward proxy process.
///
/// # Example
///
/// ```ignore
/// let supervisor = MeshSupervisor::new(binary, log, indicator);
/// let handle = supervisor.start(&config).await?;
/// if let Some(url) = handle.base_url() {
///     println!("Proxy ready at {url}");
/// }
/// let exit = handle.wait().await?;
/// std::process::exit(exit.code);
/// ```
pub struct MeshSupervisor {
    binary: PathBuf,
    log: Arc<dyn DevLogPort>,
    indicator: Arc<dyn BundleIndicator>,
    options: SupervisorOptions,
}

impl MeshSupervisor {
    /// Create a supervisor for the forward-proxy executable at `binary`.
    pub fn new(
        binary: impl Into<PathBuf>,
        log: Arc<dyn DevLogPort>,
        indicator: Arc<dyn BundleIndicator>,
    ) -> Self {
        Self {
            binary: binary.into(),
            log,
            indicator,
            options: SupervisorOptions::default(),
        }
    }

    /// Override timing and signal options.
    #[must_use]
    pub fn with_options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    /// Start the forward proxy.
    ///
    /// Returns once the proxy accepts connections, the readiness probe times
    /// out, or the child exits, whichever comes first. A readiness timeout is
    /// reported through the log port and yields a handle without a base URL;
    /// the caller decides whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns error if the log directory, the signal listeners, or the child
    /// process cannot be set up.
    pub async fn start(&self, config: &ProxyConfig) -> Result<MeshHandle, SupervisorError> {
        prepare_log_dir(&config.log_file).await?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let signals = if self.options.forward_host_signals {
            Some(HostSignals::start(inbox_tx.clone()).map_err(SupervisorError::Signals)?)
        } else {
            None
        };

        let mut child =
            mesh_command(&self.binary, config)
                .spawn()
                .map_err(|source| SupervisorError::Spawn {
                    binary: self.binary.clone(),
                    source,
                })?;
        let pid = child.id();
        info!(
            pid = ?pid,
            port = %config.listen_port,
            binary = %self.binary.display(),
            "Forward proxy spawned"
        );

        let Some(stderr) = child.stderr.take() else {
            terminate_with_grace(&mut child, HostSignal::Terminate, self.options.exit_grace)
                .await?;
            return Err(SupervisorError::MissingStream);
        };
        let reader = spawn_stream_reader(stderr, inbox_tx.clone());

        let (exited_tx, exited_rx) = oneshot::channel();
        let driver = MeshDriver::new(
            child,
            inbox_rx,
            Arc::clone(&self.log),
            Arc::clone(&self.indicator),
            self.options.exit_grace,
        )
        .with_reader(reader)
        .with_signals(signals)
        .with_exit_notice(exited_tx);
        let task = tokio::spawn(driver.run());

        let base_url = tokio::select! {
            ready = wait_for_port_with_interval(
                config.listen_port,
                self.options.ready_timeout,
                self.options.poll_interval,
            ) => match ready {
                Ok(url) => Some(url),
                Err(e) => {
                    error!(port = %config.listen_port, "{e}");
                    self.log.emit(&Notice::error(e.to_string()));
                    None
                }
            },
            reason = exited_rx => {
                if let Ok(ExitReason::ChildExited) = reason {
                    let message = format!(
                        "Forward proxy exited before it became ready on port '{}'",
                        config.listen_port
                    );
                    warn!("{message}");
                    self.log.emit(&Notice::error(message));
                } else {
                    debug!(?reason, "Forward proxy stopped before it became ready");
                }
                None
            }
        };

        Ok(MeshHandle {
            base_url,
            pid,
            inbox: inbox_tx,
            task: Some(task),
        })
    }
}

impl fmt::Debug for MeshSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSupervisor")
            .field("binary", &self.binary)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Handle to a running forward proxy.
///
/// Dropping the handle while the proxy is running counts as a normal host
/// exit: the child is asked to terminate.
#[derive(Debug)]
pub struct MeshHandle {
    base_url: Option<BaseUrl>,
    pid: Option<u32>,
    inbox: mpsc::UnboundedSender<Inbound>,
    task: Option<JoinHandle<io::Result<MeshExit>>>,
}

impl MeshHandle {
    /// Base URL, if the proxy was confirmed ready.
    pub const fn base_url(&self) -> Option<&BaseUrl> {
        self.base_url.as_ref()
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Deliver a host signal as if the process had received it.
    pub fn forward_signal(&self, signal: HostSignal) {
        let _ = self.inbox.send(Inbound::Signal(signal));
    }

    /// Terminate the proxy as part of a normal host exit and wait for it.
    pub async fn shutdown(mut self) -> Result<MeshExit, SupervisorError> {
        let _ = self.inbox.send(Inbound::HostExit);
        self.join().await
    }

    /// Wait until the proxy is gone, however that happens.
    pub async fn wait(mut self) -> Result<MeshExit, SupervisorError> {
        self.join().await
    }

    async fn join(&mut self) -> Result<MeshExit, SupervisorError> {
        let Some(task) = self.task.take() else {
            return Err(SupervisorError::Task("supervisor already joined".into()));
        };
        match task.await {
            Ok(Ok(exit)) => Ok(exit),
            Ok(Err(e)) => Err(SupervisorError::Io(e)),
            Err(join_err) => Err(SupervisorError::Task(join_err.to_string())),
        }
    }
}

impl Drop for MeshHandle {
    fn drop(&mut self) {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            let _ = self.inbox.send(Inbound::HostExit);
        }
    }
}

/// Apply one bundling effect to the log and indicator collaborators.
pub fn apply_effect(effect: &BundleEffect, log: &dyn DevLogPort, indicator: &dyn BundleIndicator) {
    match effect {
        BundleEffect::StartIndicator(text) => indicator.start(text),
        BundleEffect::StopIndicator(IndicatorStop::Success(text)) => indicator.succeed(text),
        BundleEffect::StopIndicator(IndicatorStop::Failure(text)) => indicator.fail(text),
        BundleEffect::StopIndicator(IndicatorStop::Hidden) => indicator.hide(),
        BundleEffect::Notice(notice) => log.emit(notice),
    }
}

async fn prepare_log_dir(log_file: &Path) -> Result<(), SupervisorError> {
    let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SupervisorError::LogDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// What woke the driver loop.
enum Wake {
    Exited(io::Result<devmesh_core::ChildExit>),
    Message(Inbound),
}

/// Task body that owns the child and executes dispatcher directives.
pub(crate) struct MeshDriver<C> {
    child: C,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    dispatcher: MeshDispatcher,
    reader: Option<StreamReader>,
    signals: Option<HostSignals>,
    log: Arc<dyn DevLogPort>,
    indicator: Arc<dyn BundleIndicator>,
    grace: Duration,
    exit_notice: Option<oneshot::Sender<ExitReason>>,
}

impl<C: TerminableChild> MeshDriver<C> {
    pub(crate) fn new(
        child: C,
        inbox: mpsc::UnboundedReceiver<Inbound>,
        log: Arc<dyn DevLogPort>,
        indicator: Arc<dyn BundleIndicator>,
        grace: Duration,
    ) -> Self {
        Self {
            child,
            inbox,
            dispatcher: MeshDispatcher::new(),
            reader: None,
            signals: None,
            log,
            indicator,
            grace,
            exit_notice: None,
        }
    }

    fn with_reader(mut self, reader: StreamReader) -> Self {
        self.reader = Some(reader);
        self
    }

    fn with_signals(mut self, signals: Option<HostSignals>) -> Self {
        self.signals = signals;
        self
    }

    fn with_exit_notice(mut self, notice: oneshot::Sender<ExitReason>) -> Self {
        self.exit_notice = Some(notice);
        self
    }

    pub(crate) async fn run(mut self) -> io::Result<MeshExit> {
        loop {
            let wake = tokio::select! {
                exit = self.child.wait_exit() => Wake::Exited(exit),
                Some(message) = self.inbox.recv() => Wake::Message(message),
            };

            let message = match wake {
                Wake::Message(message) => message,
                Wake::Exited(exit) => {
                    let exit = exit?;
                    debug!(?exit, "Forward proxy exited on its own");
                    self.mark_exited(ExitReason::ChildExited);
                    self.drain_stream().await?;
                    Inbound::ChildExited(exit)
                }
            };

            let child_gone = matches!(message, Inbound::ChildExited(_));
            if let Some(exit) = self.dispatch(message).await? {
                return Ok(exit);
            }
            if child_gone {
                return Err(io::Error::other("forward proxy exited without an outcome"));
            }
        }
    }

    /// Consume lines the child wrote before exiting.
    async fn drain_stream(&mut self) -> io::Result<()> {
        while self.dispatcher.stream_open() {
            match timeout(STREAM_DRAIN_TIMEOUT, self.inbox.recv()).await {
                Ok(Some(
                    message @ (Inbound::Line(_) | Inbound::StreamClosed | Inbound::StreamError(_)),
                )) => {
                    self.dispatch(message).await?;
                }
                Ok(Some(other)) => debug!(?other, "Ignoring message after child exit"),
                Ok(None) | Err(_) => break,
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, message: Inbound) -> io::Result<Option<MeshExit>> {
        let mut queue: VecDeque<Directive> = self.dispatcher.handle(message).into();

        while let Some(directive) = queue.pop_front() {
            match directive {
                Directive::Bundle(effect) => {
                    apply_effect(&effect, self.log.as_ref(), self.indicator.as_ref());
                }
                Directive::ReleaseStream => {
                    if let Some(reader) = self.reader.take() {
                        reader.release();
                    }
                }
                Directive::Terminate(signal) => {
                    let exit = terminate_with_grace(&mut self.child, signal, self.grace).await?;
                    queue.extend(self.dispatcher.handle(Inbound::ChildExited(exit)));
                }
                Directive::Finish(exit) => {
                    self.mark_exited(exit.reason);
                    if let Some(mut signals) = self.signals.take() {
                        signals.stop();
                    }
                    info!(code = exit.code, reason = ?exit.reason, "Forward proxy stopped");
                    return Ok(Some(exit));
                }
            }
        }

        Ok(None)
    }

    /// Tell `start` the child is gone and why. Only the first call is delivered.
    fn mark_exited(&mut self, reason: ExitReason) {
        if let Some(notice) = self.exit_notice.take() {
            let _ = notice.send(reason);
        }
    }
}
