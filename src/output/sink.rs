//! Output channel destinations

use std::io::{self, Write};

use tracing::warn;

/// Default write buffer size for a channel
pub const DEFAULT_BUFFER_BYTES: usize = 1024;

/// Line-oriented output with a bounded write buffer
pub trait LineSink {
    /// Bytes that can be written without exceeding the buffer
    fn available_for_write(&self) -> usize;

    /// Append one line (a newline is added)
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push buffered lines to the destination
    fn flush(&mut self) -> io::Result<()>;
}

/// Bounded line buffer in front of any writer
pub struct BufferedSink<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W: Write> BufferedSink<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Drop undeliverable lines so later sends are not blocked by them
    fn discard(&mut self, err: io::Error) -> io::Error {
        warn!("Output write failed, dropping {} buffered bytes: {}", self.buf.len(), err);
        self.buf.clear();
        err
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> LineSink for BufferedSink<W> {
    fn available_for_write(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if line.len() + 1 > self.available_for_write() {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "output buffer full",
            ));
        }
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(b'\n');
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        while !self.buf.is_empty() {
            match self.inner.write(&self.buf) {
                Ok(0) => {
                    return Err(self.discard(io::ErrorKind::WriteZero.into()));
                }
                Ok(n) => {
                    self.buf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.discard(e)),
            }
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_accounting() {
        let mut sink = BufferedSink::new(Vec::new(), 16);
        assert_eq!(sink.available_for_write(), 16);

        sink.write_line("hello").unwrap();
        assert_eq!(sink.available_for_write(), 10);

        let err = sink.write_line("too long line").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        sink.flush().unwrap();
        assert_eq!(sink.available_for_write(), 16);
        assert_eq!(sink.get_ref().as_slice(), b"hello\n");
    }

    /// Accepts at most `chunk` bytes per call, then fails once `fail_after` is reached
    struct Trickle {
        out: Vec<u8>,
        chunk: usize,
        fail_after: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.out.len() >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            let n = buf.len().min(self.chunk);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_writes_are_not_repeated() {
        let writer = Trickle {
            out: Vec::new(),
            chunk: 3,
            fail_after: usize::MAX,
        };
        let mut sink = BufferedSink::new(writer, 64);
        sink.write_line("first").unwrap();
        sink.write_line("second").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.get_ref().out.as_slice(), b"first\nsecond\n");
        assert_eq!(sink.available_for_write(), 64);
    }

    #[test]
    fn test_failed_write_frees_buffer() {
        let writer = Trickle {
            out: Vec::new(),
            chunk: 4,
            fail_after: 4,
        };
        let mut sink = BufferedSink::new(writer, 16);
        sink.write_line("abcdefgh").unwrap();

        let err = sink.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.available_for_write(), 16);
        assert_eq!(sink.get_ref().out.as_slice(), b"abcd");

        sink.write_line("next").unwrap();
        assert_eq!(sink.flush().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
