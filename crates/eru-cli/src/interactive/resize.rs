//! Window-size forwarding.

use std::sync::Arc;

use eru_proto::attach::encode_resize_command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{FrameSender, TerminalControl};

/// Spawn the task that reports the local window size to the remote.
///
/// The current size is sent once at start and again on every
/// `SIGWINCH` until `cancel` fires.
pub fn spawn_resize_watcher<T, S>(
    terminal: Arc<T>,
    sender: S,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    T: TerminalControl,
    S: FrameSender,
{
    // Register before the initial report so no change is missed in between.
    let mut events = ResizeEvents::new();

    tokio::spawn(async move {
        send_window_size(terminal.as_ref(), &sender).await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("resize watcher stopped");
                    return;
                }
                () = events.next() => {
                    send_window_size(terminal.as_ref(), &sender).await;
                }
            }
        }
    })
}

async fn send_window_size<T: TerminalControl, S: FrameSender>(terminal: &T, sender: &S) {
    let size = match terminal.size() {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "failed to query terminal size");
            return;
        }
    };
    let command = match encode_resize_command(&size) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "failed to encode resize");
            return;
        }
    };
    debug!(rows = size.rows, cols = size.cols, "sending window size");
    if let Err(e) = sender.send(command).await {
        warn!(error = %e, "failed to send window size");
    }
}

/// Stream of window-change notifications.
struct ResizeEvents {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl ResizeEvents {
    #[cfg(unix)]
    fn new() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let signal = match signal(SignalKind::window_change()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!(error = %e, "failed to watch window changes");
                None
            }
        };
        Self { signal }
    }

    #[cfg(not(unix))]
    const fn new() -> Self {
        Self {}
    }

    /// Wait for the next change. Never resolves if changes cannot be observed.
    async fn next(&mut self) {
        #[cfg(unix)]
        if let Some(signal) = self.signal.as_mut() {
            if signal.recv().await.is_some() {
                return;
            }
            self.signal = None;
        }
        std::future::pending::<()>().await;
    }
}
