//! Output stream abstraction.
//!
//! The frame driver writes to anything implementing [`OutputStream`]:
//! real stdout (TTY detection and window size via termios ioctls) or an
//! in-memory stream for tests. The `id` is the key of the process-wide
//! stream-to-driver registry.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A writable terminal-ish stream the driver can own.
pub trait OutputStream: Write {
    /// Stable identity of the underlying stream (file descriptor for
    /// real terminals).
    fn id(&self) -> u64;

    /// Reported column/row size, if the stream can tell.
    fn size(&self) -> Option<(u16, u16)>;

    /// Whether the stream is an interactive terminal.
    fn is_tty(&self) -> bool;

    /// Reported column count.
    fn width(&self) -> Option<u16> {
        self.size().map(|(cols, _)| cols)
    }
}

/// Standard output as an [`OutputStream`].
pub struct StdoutStream {
    stdout: io::Stdout,
}

impl StdoutStream {
    /// Wrap the process stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdoutStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for StdoutStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

impl OutputStream for StdoutStream {
    fn id(&self) -> u64 {
        libc::STDOUT_FILENO as u64
    }

    #[allow(unsafe_code)]
    fn size(&self) -> Option<(u16, u16)> {
        let mut size: libc::winsize = unsafe { std::mem::zeroed() };
        // SAFETY: ioctl with TIOCGWINSZ is safe when passed a valid
        // winsize struct.
        let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
        if result == 0 && size.ws_col > 0 {
            Some((size.ws_col, size.ws_row))
        } else {
            None
        }
    }

    #[allow(unsafe_code)]
    fn is_tty(&self) -> bool {
        // SAFETY: isatty on a fixed valid descriptor.
        unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
    }
}

/// Memory streams get ids far above any plausible file descriptor.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1 << 32);

/// In-memory stream for driving the renderer in tests.
pub struct MemoryStream {
    id: u64,
    width: u16,
    tty: bool,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStream {
    /// A TTY-like stream with the given width.
    #[must_use]
    pub fn tty(width: u16) -> Self {
        Self::new(width, true)
    }

    /// A non-interactive (pipe-like) stream.
    #[must_use]
    pub fn pipe() -> Self {
        Self::new(0, false)
    }

    fn new(width: u16, tty: bool) -> Self {
        Self {
            id: NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed),
            width,
            tty,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the captured bytes; clones observe later writes.
    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.buffer)
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputStream for MemoryStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> Option<(u16, u16)> {
        (self.width > 0).then_some((self.width, 24))
    }

    fn is_tty(&self) -> bool {
        self.tty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stream_captures_writes() {
        let mut stream = MemoryStream::tty(80);
        let handle = stream.handle();
        stream.write_all(b"hello").unwrap();
        assert_eq!(&*handle.lock().unwrap(), b"hello");
        assert_eq!(stream.contents(), "hello");
    }

    #[test]
    fn test_memory_stream_identities_differ() {
        let a = MemoryStream::tty(80);
        let b = MemoryStream::tty(80);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_pipe_is_not_tty() {
        let stream = MemoryStream::pipe();
        assert!(!stream.is_tty());
        assert_eq!(stream.width(), None);
    }

    #[test]
    fn test_tty_reports_width() {
        let stream = MemoryStream::tty(120);
        assert!(stream.is_tty());
        assert_eq!(stream.width(), Some(120));
    }
}
