//! Diagnostic stream reader (non-UTF8-safe).
//!
//! The forward proxy's stderr is read line by line with lossy UTF-8 decoding
//! so a stray invalid byte never ends the stream. Each line, the end of the
//! stream, or a read failure is delivered to the dispatcher as an
//! [`Inbound`] message.

use devmesh_core::Inbound;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a running stream reader task.
#[derive(Debug)]
pub struct StreamReader {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamReader {
    /// Stop reading. No message is delivered after this returns.
    pub fn release(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.release();
    }
}

/// Spawn a task that forwards every line of `stream` to `inbox`.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    inbox: UnboundedSender<Inbound>,
) -> StreamReader {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let message = tokio::select! {
                biased;
                () = token.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => match read {
                    Ok(0) => Inbound::StreamClosed,
                    Ok(_) => {
                        // Trim trailing newline(s)
                        if buf.last() == Some(&b'\n') {
                            buf.pop();
                            if buf.last() == Some(&b'\r') {
                                buf.pop();
                            }
                        }
                        Inbound::Line(String::from_utf8_lossy(&buf).into_owned())
                    }
                    Err(e) => {
                        debug!(error = %e, "diagnostic stream reader exiting due to read error");
                        Inbound::StreamError(e.to_string())
                    }
                },
            };

            let last = !matches!(message, Inbound::Line(_));
            if token.is_cancelled() || inbox.send(message).is_err() || last {
                break;
            }
        }

        debug!("diagnostic stream reader task exiting");
    });

    StreamReader { cancel, task }
}
