//! Test doubles for the attach session.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use eru_proto::{Frame, WindowSize};
use tokio::sync::mpsc;

use super::{BidiChannel, FrameSender, TerminalControl};
use crate::error::CliError;

/// Terminal that records mode switches.
#[derive(Debug, Default)]
pub struct FakeTerminal {
    rows: u16,
    cols: u16,
    fail_raw_mode: bool,
    fail_size: bool,
    raw: AtomicBool,
    enters: AtomicUsize,
    restores: AtomicUsize,
}

impl FakeTerminal {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    pub fn failing_raw_mode(mut self) -> Self {
        self.fail_raw_mode = true;
        self
    }

    pub fn failing_size(mut self) -> Self {
        self.fail_size = true;
        self
    }

    pub fn is_raw(&self) -> bool {
        self.raw.load(Ordering::SeqCst)
    }

    pub fn enters(&self) -> usize {
        self.enters.load(Ordering::SeqCst)
    }

    pub fn restores(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }
}

impl TerminalControl for FakeTerminal {
    fn enable_raw_mode(&self) -> io::Result<()> {
        if self.fail_raw_mode {
            return Err(io::Error::other("not a tty"));
        }
        self.enters.fetch_add(1, Ordering::SeqCst);
        self.raw.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.raw.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> io::Result<WindowSize> {
        if self.fail_size {
            return Err(io::Error::other("ioctl failed"));
        }
        Ok(WindowSize::new(self.rows, self.cols))
    }
}

/// Sender that forwards into an in-memory queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl QueueSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FrameSender for QueueSender {
    async fn send(&self, data: Vec<u8>) -> Result<(), CliError> {
        self.tx
            .send(data)
            .map_err(|_| CliError::Connection("queue closed".into()))
    }
}

/// Sender whose first `failures` sends are rejected.
#[derive(Debug, Clone)]
pub struct FlakySender {
    inner: QueueSender,
    failures: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl FlakySender {
    pub fn new(failures: usize) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (inner, rx) = QueueSender::new();
        let sender = Self {
            inner,
            failures: Arc::new(AtomicUsize::new(failures)),
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        (sender, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl FrameSender for FlakySender {
    async fn send(&self, data: Vec<u8>) -> Result<(), CliError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CliError::Connection("send rejected".into()));
        }
        self.inner.send(data).await
    }
}

/// Channel replaying a fixed script of receive results.
#[derive(Debug)]
pub struct ScriptedChannel {
    script: VecDeque<Result<Option<Frame>, CliError>>,
    sender: QueueSender,
    // Held so that sends from background tasks succeed.
    _sent: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl ScriptedChannel {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self::from_results(frames.into_iter().map(|f| Ok(Some(f))).collect())
    }

    pub fn from_results(script: Vec<Result<Option<Frame>, CliError>>) -> Self {
        let (sender, sent) = QueueSender::new();
        Self {
            script: script.into(),
            sender,
            _sent: sent,
        }
    }

    /// Script entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl BidiChannel for ScriptedChannel {
    type Sender = QueueSender;

    fn sender(&self) -> Self::Sender {
        self.sender.clone()
    }

    async fn recv(&mut self) -> Result<Option<Frame>, CliError> {
        self.script.pop_front().unwrap_or(Ok(None))
    }
}
