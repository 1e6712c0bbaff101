//! Local keystroke forwarding.
//!
//! Stdin is read in chunks and split into whole UTF-8 code points; each
//! code point goes out as its own frame. Bytes that do not form a valid
//! sequence are replaced with U+FFFD, which keeps every outbound unit
//! clear of the control byte.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::FrameSender;

const READ_BUFFER_SIZE: usize = 1024;

/// UTF-8 encoding of U+FFFD.
pub const REPLACEMENT: [u8; 3] = [0xEF, 0xBF, 0xBD];

/// Incremental splitter of a byte stream into code points.
#[derive(Debug, Default)]
pub struct RuneDecoder {
    pending: Vec<u8>,
    width: usize,
}

impl RuneDecoder {
    /// Feed one byte, returning the code points it completes.
    pub fn push(&mut self, byte: u8) -> Vec<Vec<u8>> {
        let mut out = Vec::new();

        if !self.pending.is_empty() {
            if byte & 0xC0 == 0x80 {
                self.pending.push(byte);
                if self.pending.len() == self.width {
                    out.push(self.take_pending());
                }
                return out;
            }
            // Truncated sequence; the new byte starts over.
            self.pending.clear();
            out.push(REPLACEMENT.to_vec());
        }

        match sequence_width(byte) {
            1 => out.push(vec![byte]),
            0 => out.push(REPLACEMENT.to_vec()),
            width => {
                self.pending.push(byte);
                self.width = width;
            }
        }
        out
    }

    /// Flush at end of input.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(REPLACEMENT.to_vec())
    }

    fn take_pending(&mut self) -> Vec<u8> {
        let unit = std::mem::take(&mut self.pending);
        // Catches overlong forms and surrogates.
        if std::str::from_utf8(&unit).is_ok() {
            unit
        } else {
            REPLACEMENT.to_vec()
        }
    }
}

const fn sequence_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Spawn the task that forwards `input` to the remote one code point at a time.
///
/// The task ends at end of input or on a read error. Send failures are
/// logged and skipped.
pub fn spawn_input_pump<R, S>(mut input: R, sender: S) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    S: FrameSender,
{
    tokio::spawn(async move {
        let mut decoder = RuneDecoder::default();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let n = match input.read(&mut buf).await {
                Ok(0) => {
                    if let Some(unit) = decoder.finish() {
                        forward(&sender, unit).await;
                    }
                    debug!("stdin closed");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    return;
                }
            };

            for &byte in &buf[..n] {
                for unit in decoder.push(byte) {
                    forward(&sender, unit).await;
                }
            }
        }
    })
}

async fn forward<S: FrameSender>(sender: &S, unit: Vec<u8>) {
    if let Err(e) = sender.send(unit).await {
        warn!(error = %e, "failed to send keystroke");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactive::fake::{FlakySender, QueueSender};
    use eru_proto::attach::CONTROL_BYTE;
    use proptest::prelude::*;

    fn decode_all(bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut decoder = RuneDecoder::default();
        let mut units: Vec<Vec<u8>> = bytes.iter().flat_map(|&b| decoder.push(b)).collect();
        units.extend(decoder.finish());
        units
    }

    #[test]
    fn ascii_is_one_unit_per_byte() {
        assert_eq!(decode_all(b"ls\r"), vec![b"l".to_vec(), b"s".to_vec(), b"\r".to_vec()]);
    }

    #[test]
    fn multibyte_is_kept_whole() {
        let units = decode_all("é€😀".as_bytes());
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], "é".as_bytes());
        assert_eq!(units[2], "😀".as_bytes());
    }

    #[test]
    fn stray_continuation_is_replaced() {
        assert_eq!(decode_all(&[0x80]), vec![REPLACEMENT.to_vec()]);
    }

    #[test]
    fn truncated_sequence_then_ascii() {
        assert_eq!(
            decode_all(&[0xE2, 0x82, b'a']),
            vec![REPLACEMENT.to_vec(), b"a".to_vec()]
        );
    }

    #[test]
    fn truncated_at_end_of_input() {
        assert_eq!(decode_all(&[0xF0, 0x9F]), vec![REPLACEMENT.to_vec()]);
    }

    #[test]
    fn surrogate_encoding_is_replaced() {
        assert_eq!(decode_all(&[0xED, 0xA0, 0x80]), vec![REPLACEMENT.to_vec()]);
    }

    proptest! {
        #[test]
        fn units_never_start_with_control_byte(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            for unit in decode_all(&bytes) {
                prop_assert_ne!(unit[0], CONTROL_BYTE);
                prop_assert!(std::str::from_utf8(&unit).is_ok());
            }
        }

        #[test]
        fn valid_text_is_preserved(text in ".{0,32}") {
            let units = decode_all(text.as_bytes());
            prop_assert_eq!(units.len(), text.chars().count());
            prop_assert_eq!(units.concat(), text.as_bytes().to_vec());
        }
    }

    #[tokio::test]
    async fn pump_forwards_code_points() {
        let (sender, mut rx) = QueueSender::new();
        let handle = spawn_input_pump(&b"l\xc3\xa9"[..], sender);
        handle.await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), b"l");
        assert_eq!(rx.recv().await.unwrap(), "é".as_bytes());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pump_ends_on_empty_input() {
        let (sender, mut rx) = QueueSender::new();
        spawn_input_pump(tokio::io::empty(), sender).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pump_keeps_reading_after_send_failure() {
        let (sender, mut rx) = FlakySender::new(1);
        spawn_input_pump(&b"abc"[..], sender.clone()).await.unwrap();

        assert_eq!(sender.attempts(), 3);
        assert_eq!(rx.recv().await.unwrap(), b"b");
        assert_eq!(rx.recv().await.unwrap(), b"c");
        assert!(rx.try_recv().is_err());
    }
}
