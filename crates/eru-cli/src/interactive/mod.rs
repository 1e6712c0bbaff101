//! Interactive attach sessions.
//!
//! [`StreamHandler`] drains an attach stream into local stdout/stderr and
//! turns exit notifications into a process exit code. In interactive mode
//! it also owns the local terminal: raw mode for the duration of the call,
//! a task forwarding keystrokes, and a task forwarding window resizes.
//!
//! ```text
//!  stdin ──► input pump ──┐
//!                         ├──► FrameSender ──► remote
//!  SIGWINCH ─► resize ────┘
//!
//!  remote ──► BidiChannel::recv ──► receive loop ──► stdout / stderr / exit code
//! ```
//!
//! The resize task is cancelled when the handler returns. The input pump
//! has no stop signal and is left behind; its pending stdin read ends with
//! the process.

pub mod input;
pub mod resize;
pub mod terminal;

#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::io::{Stderr, Stdout, Write};
use std::sync::Arc;

use eru_proto::Frame;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CliError;
use crate::output::{LineEnding, Output, OutputTemplate};

pub use terminal::{CrosstermTerminal, RawModeGuard, TerminalControl};

/// Exit code reported when the stream fails before completion.
pub const TRANSPORT_FAILURE_EXIT_CODE: i32 = -1;

/// Outbound half of an attach stream.
///
/// Clones share one underlying stream; `send` may be called from several
/// tasks at once.
pub trait FrameSender: Clone + Send + Sync + 'static {
    /// Send one keystroke unit or control command.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is gone.
    fn send(&self, data: Vec<u8>) -> impl Future<Output = Result<(), CliError>> + Send;
}

/// A connected attach stream.
pub trait BidiChannel: Send {
    /// Sender type handed to background tasks.
    type Sender: FrameSender;

    /// Get a sender for this stream.
    fn sender(&self) -> Self::Sender;

    /// Receive the next frame. `Ok(None)` is a clean end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Frame>, CliError>> + Send;
}

/// Run one attach session against the process's own terminal.
///
/// Returns the exit code carried by the sentinel that ended the session,
/// or `0` if the stream closed first.
///
/// # Errors
///
/// Returns an error if the transport fails; callers report it as
/// [`TRANSPORT_FAILURE_EXIT_CODE`].
pub async fn handle<C: BidiChannel>(
    interactive: bool,
    channel: &mut C,
    expected_exit_count: usize,
    show_source_id: bool,
) -> Result<i32, CliError> {
    let mut handler = StreamHandler::new(expected_exit_count, show_source_id);
    if interactive {
        handler
            .run_interactive(channel, Arc::new(CrosstermTerminal), tokio::io::stdin())
            .await
    } else {
        handler.run(channel).await
    }
}

/// Demultiplexes an attach stream.
#[derive(Debug)]
pub struct StreamHandler<O, E> {
    expected_exit_count: usize,
    template: OutputTemplate,
    line_ending: LineEnding,
    output: Output<O, E>,
}

impl StreamHandler<Stdout, Stderr> {
    /// Create a handler writing to the process's stdout and stderr.
    #[must_use]
    pub fn new(expected_exit_count: usize, show_source_id: bool) -> Self {
        Self::with_output(expected_exit_count, show_source_id, Output::std())
    }
}

impl<O: Write, E: Write> StreamHandler<O, E> {
    /// Create a handler writing to the given destinations.
    pub const fn with_output(
        expected_exit_count: usize,
        show_source_id: bool,
        output: Output<O, E>,
    ) -> Self {
        Self {
            expected_exit_count,
            template: OutputTemplate::new(show_source_id),
            line_ending: LineEnding::Lf,
            output,
        }
    }

    /// Consume the handler, returning its destinations.
    pub fn into_output(self) -> Output<O, E> {
        self.output
    }

    /// Run with the local terminal attached.
    ///
    /// Raw mode is entered before anything is read and restored before this
    /// returns, whichever way the session ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn run_interactive<C, T, R>(
        &mut self,
        channel: &mut C,
        terminal: Arc<T>,
        input: R,
    ) -> Result<i32, CliError>
    where
        C: BidiChannel,
        T: TerminalControl,
        R: AsyncRead + Unpin + Send + 'static,
    {
        let raw_mode = RawModeGuard::enter(Arc::clone(&terminal));
        self.line_ending = LineEnding::new(raw_mode.is_active());

        let cancel = CancellationToken::new();
        let _stop_resize = cancel.clone().drop_guard();
        resize::spawn_resize_watcher(terminal, channel.sender(), cancel);
        input::spawn_input_pump(input, channel.sender());

        let result = self.run(channel).await;
        self.line_ending = LineEnding::Lf;
        result
    }

    /// Run the receive loop only.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn run<C: BidiChannel>(&mut self, channel: &mut C) -> Result<i32, CliError> {
        let mut exits_seen = 0usize;

        loop {
            let Some(frame) = channel.recv().await? else {
                debug!(
                    exits_seen,
                    expected = self.expected_exit_count,
                    "attach stream closed"
                );
                return Ok(0);
            };

            match frame {
                Frame::RemoteError { source, message } => {
                    error!(
                        workload_id = %source,
                        "{}",
                        String::from_utf8_lossy(&message).trim_end()
                    );
                }
                Frame::WorkloadIdentifier { id } => {
                    info!(workload_id = %id, "attached to workload");
                }
                Frame::Exit { source, code } if code != 0 => {
                    debug!(workload_id = %source, code, "remote process failed");
                    return Ok(code);
                }
                Frame::Exit { source, .. } => {
                    exits_seen += 1;
                    debug!(
                        workload_id = %source,
                        exits_seen,
                        expected = self.expected_exit_count,
                        "remote process exited"
                    );
                    if exits_seen >= self.expected_exit_count {
                        return Ok(0);
                    }
                }
                Frame::Stdout { source, data } => {
                    if let Err(e) = self.template.render(
                        &mut self.output.stdout,
                        &source,
                        &data,
                        self.line_ending,
                    ) {
                        warn!(workload_id = %source, error = %e, "failed to write stdout");
                    }
                }
                Frame::Stderr { source, data } => {
                    if let Err(e) = self.template.render(
                        &mut self.output.stderr,
                        &source,
                        &data,
                        self.line_ending,
                    ) {
                        warn!(workload_id = %source, error = %e, "failed to write stderr");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeTerminal, ScriptedChannel};
    use super::*;
    use eru_proto::AttachMessage;

    type Captured = StreamHandler<Vec<u8>, Vec<u8>>;

    fn handler(expected: usize, show_source_id: bool) -> Captured {
        StreamHandler::with_output(expected, show_source_id, Output::new(Vec::new(), Vec::new()))
    }

    fn frame(msg: AttachMessage) -> Frame {
        Frame::from(msg)
    }

    fn stdout_of(handler: Captured) -> String {
        String::from_utf8(handler.into_output().stdout).expect("valid utf8")
    }

    #[tokio::test]
    async fn single_exec_success() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("w", "hello\n")),
            frame(AttachMessage::exit_sentinel("w", 0)),
        ]);
        let mut h = handler(1, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(stdout_of(h), "hello\n");
    }

    #[tokio::test]
    async fn nonzero_exit_returns_immediately() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::exit_sentinel("w", 17)),
            frame(AttachMessage::stdout("w", "never printed")),
            frame(AttachMessage::exit_sentinel("w", 0)),
        ]);
        let mut h = handler(1, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 17);
        assert_eq!(channel.remaining(), 2);
        assert_eq!(stdout_of(h), "");
    }

    #[tokio::test]
    async fn nonzero_exit_overrides_pending_count() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::exit_sentinel("a", 0)),
            frame(AttachMessage::exit_sentinel("b", 3)),
            frame(AttachMessage::exit_sentinel("c", 0)),
        ]);
        let mut h = handler(3, true);

        assert_eq!(h.run(&mut channel).await.unwrap(), 3);
        assert_eq!(channel.remaining(), 1);
    }

    #[tokio::test]
    async fn waits_for_every_zero_exit() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::exit_sentinel("a", 0)),
            frame(AttachMessage::remote_error("b", "image pull slow")),
            frame(AttachMessage::stdout("b", "working")),
            frame(AttachMessage::exit_sentinel("b", 0)),
            frame(AttachMessage::stdout("c", "late")),
            frame(AttachMessage::exit_sentinel("c", 0)),
            frame(AttachMessage::stdout("z", "after completion")),
        ]);
        let mut h = handler(3, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(channel.remaining(), 1);
        assert_eq!(stdout_of(h), "workinglate");
    }

    #[tokio::test]
    async fn three_targets_prefixed() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("a", "x")),
            frame(AttachMessage::exit_sentinel("c", 0)),
            frame(AttachMessage::stdout("b", "y")),
            frame(AttachMessage::exit_sentinel("a", 0)),
            frame(AttachMessage::exit_sentinel("b", 0)),
        ]);
        let mut h = handler(3, true);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(channel.remaining(), 0);
        assert_eq!(stdout_of(h), "[a] x\n[b] y\n");
    }

    #[tokio::test]
    async fn eof_without_sentinel_is_success() {
        let mut channel = ScriptedChannel::new(vec![frame(AttachMessage::stdout("w", "partial"))]);
        let mut h = handler(1, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(stdout_of(h), "partial");
    }

    #[tokio::test]
    async fn eof_before_all_exits_is_success() {
        let mut channel = ScriptedChannel::new(vec![frame(AttachMessage::exit_sentinel("a", 0))]);
        let mut h = handler(2, true);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_sentinel_is_output_and_not_counted() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("w", "[exitcode] abc")),
            frame(AttachMessage::exit_sentinel("w", 0)),
            frame(AttachMessage::exit_sentinel("w", 0)),
        ]);
        let mut h = handler(2, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(channel.remaining(), 0);
        assert_eq!(stdout_of(h), "[exitcode] abc");
    }

    #[tokio::test]
    async fn sentinel_with_trailing_newline_is_output() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("w", "[exitcode] 0\n")),
            frame(AttachMessage::exit_sentinel("w", 0)),
        ]);
        let mut h = handler(1, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        assert_eq!(channel.remaining(), 0);
        assert_eq!(stdout_of(h), "[exitcode] 0\n");
    }

    #[tokio::test]
    async fn stderr_goes_to_stderr() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stderr("w", "oops\n")),
            frame(AttachMessage::stdout("w", "fine\n")),
        ]);
        let mut h = handler(1, false);

        h.run(&mut channel).await.unwrap();
        let output = h.into_output();
        assert_eq!(output.stdout, b"fine\n");
        assert_eq!(output.stderr, b"oops\n");
    }

    #[tokio::test]
    async fn remote_error_and_identifier_are_not_printed() {
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::workload_id("w")),
            frame(AttachMessage::remote_error("w", "boom")),
            frame(AttachMessage::exit("w", 0)),
        ]);
        let mut h = handler(1, false);

        assert_eq!(h.run(&mut channel).await.unwrap(), 0);
        let output = h.into_output();
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn transport_error_aborts() {
        let mut channel = ScriptedChannel::from_results(vec![
            Ok(Some(frame(AttachMessage::stdout("w", "a")))),
            Err(CliError::Connection("reset by peer".into())),
            Ok(Some(frame(AttachMessage::exit_sentinel("w", 0)))),
        ]);
        let mut h = handler(1, false);

        let err = h.run(&mut channel).await.unwrap_err();
        assert!(matches!(err, CliError::Connection(_)));
        assert_eq!(channel.remaining(), 1);
    }

    #[tokio::test]
    async fn interactive_restores_terminal_on_success() {
        let terminal = Arc::new(FakeTerminal::new(24, 80));
        let mut channel = ScriptedChannel::new(vec![frame(AttachMessage::exit_sentinel("w", 0))]);
        let mut h = handler(1, false);

        let code = h
            .run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(terminal.enters(), 1);
        assert_eq!(terminal.restores(), 1);
        assert!(!terminal.is_raw());
    }

    #[tokio::test]
    async fn interactive_restores_terminal_on_failure_exit() {
        let terminal = Arc::new(FakeTerminal::new(24, 80));
        let mut channel = ScriptedChannel::new(vec![frame(AttachMessage::exit_sentinel("w", 9))]);
        let mut h = handler(1, false);

        let code = h
            .run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await
            .unwrap();

        assert_eq!(code, 9);
        assert_eq!(terminal.restores(), 1);
        assert!(!terminal.is_raw());
    }

    #[tokio::test]
    async fn interactive_restores_terminal_on_transport_error() {
        let terminal = Arc::new(FakeTerminal::new(24, 80));
        let mut channel =
            ScriptedChannel::from_results(vec![Err(CliError::Connection("gone".into()))]);
        let mut h = handler(1, false);

        let result = h
            .run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await;

        assert!(result.is_err());
        assert_eq!(terminal.enters(), 1);
        assert_eq!(terminal.restores(), 1);
        assert!(!terminal.is_raw());
    }

    #[tokio::test]
    async fn interactive_survives_raw_mode_failure() {
        let terminal = Arc::new(FakeTerminal::new(24, 80).failing_raw_mode());
        let mut channel = ScriptedChannel::new(vec![frame(AttachMessage::exit_sentinel("w", 4))]);
        let mut h = handler(1, false);

        let code = h
            .run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await
            .unwrap();

        assert_eq!(code, 4);
        assert_eq!(terminal.restores(), 0);
    }

    #[tokio::test]
    async fn interactive_prefixed_lines_use_crlf() {
        let terminal = Arc::new(FakeTerminal::new(24, 80));
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("a", "x\n")),
            frame(AttachMessage::stderr("b", "y")),
            frame(AttachMessage::exit_sentinel("a", 0)),
            frame(AttachMessage::exit_sentinel("b", 0)),
        ]);
        let mut h = handler(2, true);

        let code = h
            .run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await
            .unwrap();

        assert_eq!(code, 0);
        let output = h.into_output();
        assert_eq!(output.stdout, b"[a] x\r\n");
        assert_eq!(output.stderr, b"[b] y\r\n");
    }

    #[tokio::test]
    async fn cooked_fallback_keeps_lf() {
        let terminal = Arc::new(FakeTerminal::new(24, 80).failing_raw_mode());
        let mut channel = ScriptedChannel::new(vec![
            frame(AttachMessage::stdout("a", "x")),
            frame(AttachMessage::exit_sentinel("a", 0)),
            frame(AttachMessage::exit_sentinel("b", 0)),
        ]);
        let mut h = handler(2, true);

        h.run_interactive(&mut channel, Arc::clone(&terminal), tokio::io::empty())
            .await
            .unwrap();

        assert_eq!(stdout_of(h), "[a] x\n");
    }
}
