//! Rendering of attach output.
//!
//! A single-target session writes remote bytes through untouched so that
//! full-screen programs keep working. Multi-target sessions prefix every
//! line with the workload that produced it. Those prefixed lines end in
//! `\r\n` while the local terminal is raw, since output post-processing
//! is off and a bare `\n` would not return the cursor to column 0.

use std::io::Write;

use crate::error::CliError;

/// Terminator for lines written by [`OutputTemplate::SourcePrefixed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`, for a terminal in cooked mode or a redirected stream.
    #[default]
    Lf,
    /// `\r\n`, for a terminal in raw mode.
    CrLf,
}

impl LineEnding {
    /// Pick the terminator for the terminal state.
    #[must_use]
    pub const fn new(raw_terminal: bool) -> Self {
        if raw_terminal { Self::CrLf } else { Self::Lf }
    }

    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

/// How stream payloads are written to the local terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTemplate {
    /// Payload written verbatim.
    #[default]
    Raw,
    /// Each line written as `[<source>] <line>`.
    SourcePrefixed,
}

impl OutputTemplate {
    /// Pick the template for a session.
    #[must_use]
    pub const fn new(show_source_id: bool) -> Self {
        if show_source_id {
            Self::SourcePrefixed
        } else {
            Self::Raw
        }
    }

    /// Render one payload to `writer` and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn render<W: Write>(
        self,
        writer: &mut W,
        source: &str,
        data: &[u8],
        line_ending: LineEnding,
    ) -> Result<(), CliError> {
        match self {
            Self::Raw => writer.write_all(data)?,
            Self::SourcePrefixed => {
                for line in data.split_inclusive(|&b| b == b'\n') {
                    let mut text = line.strip_suffix(b"\n").unwrap_or(line);
                    if line_ending == LineEnding::CrLf {
                        text = text.strip_suffix(b"\r").unwrap_or(text);
                    }
                    write!(writer, "[{source}] ")?;
                    writer.write_all(text)?;
                    writer.write_all(line_ending.as_bytes())?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Pair of local destinations for remote stdout and stderr.
#[derive(Debug)]
pub struct Output<O, E> {
    /// Destination for remote stdout.
    pub stdout: O,
    /// Destination for remote stderr.
    pub stderr: E,
}

impl Output<std::io::Stdout, std::io::Stderr> {
    /// The process's own standard streams.
    #[must_use]
    pub fn std() -> Self {
        Self {
            stdout: std::io::stdout(),
            stderr: std::io::stderr(),
        }
    }
}

impl<O: Write, E: Write> Output<O, E> {
    /// Wrap two writers.
    pub const fn new(stdout: O, stderr: E) -> Self {
        Self { stdout, stderr }
    }
}
