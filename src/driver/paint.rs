//! Frame painting: last-frame diff, in-place erase, static region.
//!
//! Each paint produces exactly one contiguous buffer: the erase
//! sequences for the previously painted region, any newly grown static
//! output, and the dynamic frame, written with a single `write_all`.
//! A frame byte-identical to the last emission writes nothing (unless
//! forced by the immediate path).
//!
//! Non-interactive streams get no cursor arithmetic: changed frames are
//! appended, which is the correct degraded behavior for pipes and CI
//! logs.

use crate::ansi::sequences::{cursor_down, cursor_up, CLEAR_LINE};
use crate::compose::Frame;
use crate::driver::stream::OutputStream;
use crate::error::Result;
use std::io::Write;
use tracing::trace;

/// Painter state for one output stream.
#[derive(Debug)]
pub struct Painter {
    interactive: bool,
    last_output: Option<String>,
    last_height: usize,
}

impl Painter {
    /// Create a painter. `interactive` selects the in-place update
    /// protocol; otherwise frames are appended.
    #[must_use]
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            last_output: None,
            last_height: 0,
        }
    }

    /// Forget the last emission so the next paint rewrites in full.
    /// Used after a resize, where the terminal may have rewrapped the
    /// previously painted region.
    pub fn invalidate(&mut self) {
        self.last_output = None;
    }

    /// Height of the currently painted dynamic region.
    #[must_use]
    pub fn last_height(&self) -> usize {
        self.last_height
    }

    /// Paint a frame. With `force` false, a byte-identical dynamic
    /// frame with no static growth is skipped entirely.
    pub fn paint(
        &mut self,
        stream: &mut dyn OutputStream,
        frame: &Frame,
        force: bool,
    ) -> Result<()> {
        let unchanged = self.last_output.as_deref() == Some(frame.output.as_str());
        if !force && unchanged && frame.static_output.is_none() {
            return Ok(());
        }

        let mut buffer = String::new();

        if self.interactive {
            buffer.push_str(&self.erase_sequence());
        }
        if let Some(static_output) = &frame.static_output {
            buffer.push_str(static_output);
            buffer.push('\n');
        }
        if self.interactive || !unchanged || frame.static_output.is_some() {
            if !frame.output.is_empty() {
                buffer.push_str(&frame.output);
                buffer.push('\n');
            }
        }

        // One contiguous write per emission; no partial escape sequences
        // can interleave.
        stream.write_all(buffer.as_bytes())?;
        stream.flush()?;
        trace!(bytes = buffer.len(), height = frame.height, "painted frame");

        self.last_output = Some(frame.output.clone());
        self.last_height = if frame.output.is_empty() {
            0
        } else {
            frame.height
        };
        Ok(())
    }

    /// The in-place erase protocol for the previously painted region:
    /// cursor up by its height, erase-line and cursor-down per line,
    /// cursor up back to the top.
    fn erase_sequence(&self) -> String {
        let height = self.last_height;
        if height == 0 {
            return String::new();
        }
        let mut out = cursor_up(height);
        for _ in 0..height {
            out.push_str(CLEAR_LINE);
            out.push_str(&cursor_down(1));
        }
        out.push_str(&cursor_up(height));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stream::MemoryStream;

    fn frame(output: &str, static_output: Option<&str>) -> Frame {
        Frame {
            output: output.to_string(),
            height: output.lines().count(),
            static_output: static_output.map(str::to_string),
        }
    }

    #[test]
    fn test_first_paint_writes_frame() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter.paint(&mut stream, &frame("hello", None), false).unwrap();
        assert_eq!(stream.contents(), "hello\n");
        assert_eq!(painter.last_height(), 1);
    }

    #[test]
    fn test_identical_frame_writes_nothing() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter.paint(&mut stream, &frame("same", None), false).unwrap();
        let after_first = stream.contents();
        painter.paint(&mut stream, &frame("same", None), false).unwrap();
        assert_eq!(stream.contents(), after_first);
    }

    #[test]
    fn test_changed_frame_erases_previous_region() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter.paint(&mut stream, &frame("one\ntwo", None), false).unwrap();
        painter.paint(&mut stream, &frame("three", None), false).unwrap();

        let output = stream.contents();
        // Erase protocol: up 2, then erase+down per line, then up 2.
        assert!(output.contains("\x1b[2A\x1b[2K\x1b[1B\x1b[2K\x1b[1B\x1b[2A"));
        assert!(output.ends_with("three\n"));
        assert_eq!(painter.last_height(), 1);
    }

    #[test]
    fn test_force_rewrites_identical_frame() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter.paint(&mut stream, &frame("x", None), false).unwrap();
        let first_len = stream.contents().len();
        painter.paint(&mut stream, &frame("x", None), true).unwrap();
        assert!(stream.contents().len() > first_len);
    }

    #[test]
    fn test_static_output_written_above_dynamic() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter
            .paint(&mut stream, &frame("dyn", Some("logged")), true)
            .unwrap();
        let output = stream.contents();
        let static_pos = output.find("logged").unwrap();
        let dynamic_pos = output.find("dyn").unwrap();
        assert!(static_pos < dynamic_pos);
    }

    #[test]
    fn test_non_interactive_appends_without_erase() {
        let mut painter = Painter::new(false);
        let mut stream = MemoryStream::pipe();
        painter.paint(&mut stream, &frame("a", None), false).unwrap();
        painter.paint(&mut stream, &frame("b", None), false).unwrap();
        let output = stream.contents();
        assert_eq!(output, "a\nb\n");
        assert!(!output.contains("\x1b[2K"));
    }

    #[test]
    fn test_invalidate_forces_full_rewrite() {
        let mut painter = Painter::new(true);
        let mut stream = MemoryStream::tty(80);
        painter.paint(&mut stream, &frame("keep", None), false).unwrap();
        painter.invalidate();
        let before = stream.contents().len();
        painter.paint(&mut stream, &frame("keep", None), false).unwrap();
        assert!(stream.contents().len() > before);
    }
}
