//! Where `print` output goes.
//!
//! The evaluator writes into a [`Transcript`], which forwards each chunk to
//! an optional host [`OutputSink`] and, unless built forward-only, keeps
//! everything since the last `clear()` in a `BytesMut` buffer.

use std::io;

use bytes::BytesMut;
use log::debug;

/// Host‑provided destination for program output.
pub trait OutputSink {
    /// Accept a prefix of `chunk`, returning how many bytes were taken.
    fn write(&mut self, chunk: &str) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Adapts any `io::Write` (stdout, a file, a `Vec<u8>`) to [`OutputSink`].
pub struct WriterSink<W>(pub W);

impl<W: io::Write> OutputSink for WriterSink<W> {
    fn write(&mut self, chunk: &str) -> io::Result<usize> {
        self.0.write(chunk.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Accumulated output of one interpreter, plus the optional forwarding sink.
pub struct Transcript {
    buffer: BytesMut,
    keep: bool,
    sink: Option<Box<dyn OutputSink>>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            buffer: BytesMut::new(),
            keep: true,
            sink: None,
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Box<dyn OutputSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Whether written text is kept for [`contents`](Self::contents).
    /// Turning it off drops what was kept so far.
    pub fn keeping(mut self, keep: bool) -> Self {
        if !keep {
            self.buffer = BytesMut::new();
        }
        self.keep = keep;
        self
    }

    /// Append `text` to the buffer and hand all of it to the sink.
    pub fn write(&mut self, text: &str) -> io::Result<()> {
        if self.keep {
            self.buffer.extend_from_slice(text.as_bytes());
        }

        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };

        let mut rest = text;
        while !rest.is_empty() {
            let accepted = sink.write(rest)?;
            if accepted == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "output sink accepted no bytes",
                ));
            }

            rest = rest.get(accepted..).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "output sink split a character",
                )
            })?;
        }

        debug!("Wrote {} bytes to output sink", text.len());

        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    /// Everything written since the last [`clear`](Self::clear).
    pub fn contents(&self) -> String {
        // Only whole `&str` chunks are ever appended.
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
