//! Word wrapping and truncation with ANSI continuity.

use crate::ansi::{slice, strip, visible_width};
use crate::text::WrapMode;
use unicode_segmentation::UnicodeSegmentation;

const ELLIPSIS: &str = "…";

/// Reflow `text` to fit `max_width` cells using the given mode.
///
/// The input is split on `\n` first and each line reflowed
/// independently; a trailing newline therefore yields a final empty
/// line. Wrapping breaks at spaces and hard-breaks words longer than
/// the budget; truncation replaces the out-of-budget region with `…`.
#[must_use]
pub fn wrap_text(text: &str, max_width: usize, mode: WrapMode) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.split('\n') {
        match mode {
            WrapMode::Wrap => wrap_line(line, max_width, &mut out),
            WrapMode::Truncate | WrapMode::TruncateEnd => {
                out.push(truncate_end(line, max_width));
            }
            WrapMode::TruncateStart => out.push(truncate_start(line, max_width)),
            WrapMode::TruncateMiddle => out.push(truncate_middle(line, max_width)),
        }
    }
    out
}

/// Visible-cell ranges of the words in a line (spaces excluded), plus
/// the cell positions at which a grapheme cluster ends. Hard breaks
/// must land on the latter so a wide glyph is never split.
fn scan_line(line: &str) -> (Vec<(usize, usize)>, Vec<usize>) {
    let stripped = strip(line);
    let mut ranges = Vec::new();
    let mut boundaries = Vec::new();
    let mut col = 0usize;
    let mut word_start: Option<usize> = None;

    for cluster in stripped.graphemes(true) {
        let width = crate::ansi::parse::cluster_width(cluster);
        if cluster == " " {
            if let Some(start) = word_start.take() {
                ranges.push((start, col));
            }
        } else if word_start.is_none() && width > 0 {
            word_start = Some(col);
        }
        col += width;
        if width > 0 {
            boundaries.push(col);
        }
    }
    if let Some(start) = word_start {
        ranges.push((start, col));
    }
    (ranges, boundaries)
}

fn wrap_line(line: &str, max_width: usize, out: &mut Vec<String>) {
    let total = visible_width(line);
    if total <= max_width {
        out.push(line.to_string());
        return;
    }
    if max_width == 0 {
        out.push(String::new());
        return;
    }

    let (words, boundaries) = scan_line(line);
    if words.is_empty() {
        // Nothing but spaces and escapes; keep the escapes, drop the overflow.
        out.push(slice(line, 0, max_width));
        return;
    }

    let mut current: Option<(usize, usize)> = None;
    let mut flush = |range: Option<(usize, usize)>, out: &mut Vec<String>| {
        if let Some((start, end)) = range {
            out.push(slice(line, start, end));
        }
    };

    for &(ws, we) in &words {
        let word_width = we - ws;

        if word_width > max_width {
            // Over-long word: flush what we have, then hard-break it at
            // the last cluster boundary that still fits.
            flush(current.take(), out);
            let mut pos = ws;
            while we - pos > max_width {
                let limit = pos + max_width;
                let end = boundaries
                    .iter()
                    .copied()
                    .take_while(|&b| b <= limit)
                    .filter(|&b| b > pos)
                    .last()
                    .unwrap_or(limit);
                out.push(slice(line, pos, end));
                pos = end;
            }
            current = Some((pos, we));
            continue;
        }

        match current {
            None => current = Some((ws, we)),
            Some((start, _)) if we - start <= max_width => {
                current = Some((start, we));
            }
            Some(range) => {
                flush(Some(range), out);
                current = Some((ws, we));
            }
        }
    }
    flush(current, out);
}

fn truncate_end(line: &str, max_width: usize) -> String {
    let total = visible_width(line);
    if total <= max_width {
        return line.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    format!("{}{ELLIPSIS}", slice(line, 0, max_width - 1))
}

fn truncate_start(line: &str, max_width: usize) -> String {
    let total = visible_width(line);
    if total <= max_width {
        return line.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    format!("{ELLIPSIS}{}", slice(line, total - (max_width - 1), total))
}

fn truncate_middle(line: &str, max_width: usize) -> String {
    let total = visible_width(line);
    if total <= max_width {
        return line.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let keep = max_width - 1;
    let left = keep.div_ceil(2);
    let right = keep - left;
    format!(
        "{}{ELLIPSIS}{}",
        slice(line, 0, left),
        slice(line, total - right, total)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_words() {
        let lines = wrap_text("alpha beta gamma", 7, WrapMode::Wrap);
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_wrap_fits() {
        let lines = wrap_text("short", 10, WrapMode::Wrap);
        assert_eq!(lines, vec!["short"]);
    }

    #[test]
    fn test_wrap_packs_words() {
        let lines = wrap_text("a bb ccc", 4, WrapMode::Wrap);
        assert_eq!(lines, vec!["a bb", "ccc"]);
    }

    #[test]
    fn test_wrap_hard_breaks_long_word() {
        let lines = wrap_text("abcdefghij", 4, WrapMode::Wrap);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_multiline_input() {
        let lines = wrap_text("one\ntwo three", 5, WrapMode::Wrap);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_wrap_trailing_newline_keeps_empty_line() {
        let lines = wrap_text("one\n", 10, WrapMode::Wrap);
        assert_eq!(lines, vec!["one", ""]);
    }

    #[test]
    fn test_wrap_preserves_style_continuity() {
        let styled = "\x1b[32malpha beta\x1b[39m";
        let lines = wrap_text(styled, 5, WrapMode::Wrap);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "\x1b[32malpha\x1b[39m");
        assert_eq!(lines[1], "\x1b[32mbeta\x1b[39m");
    }

    #[test]
    fn test_truncate_end() {
        let lines = wrap_text("Hello World", 8, WrapMode::TruncateEnd);
        assert_eq!(lines, vec!["Hello W…"]);
        assert_eq!(visible_width(&lines[0]), 8);
    }

    #[test]
    fn test_truncate_alias() {
        assert_eq!(
            wrap_text("Hello World", 8, WrapMode::Truncate),
            wrap_text("Hello World", 8, WrapMode::TruncateEnd)
        );
    }

    #[test]
    fn test_truncate_start() {
        let lines = wrap_text("Hello World", 8, WrapMode::TruncateStart);
        assert_eq!(lines, vec!["…o World"]);
        assert_eq!(visible_width(&lines[0]), 8);
    }

    #[test]
    fn test_truncate_middle() {
        let lines = wrap_text("Hello World", 8, WrapMode::TruncateMiddle);
        assert_eq!(lines, vec!["Hell…rld"]);
        assert_eq!(visible_width(&lines[0]), 8);
    }

    #[test]
    fn test_truncate_no_overflow_is_identity() {
        for mode in [
            WrapMode::TruncateEnd,
            WrapMode::TruncateStart,
            WrapMode::TruncateMiddle,
        ] {
            assert_eq!(wrap_text("fits", 10, mode), vec!["fits"]);
        }
    }

    #[test]
    fn test_truncate_tiny_budgets() {
        assert_eq!(wrap_text("hello", 1, WrapMode::TruncateEnd), vec!["…"]);
        assert_eq!(wrap_text("hello", 0, WrapMode::TruncateEnd), vec![""]);
    }

    #[test]
    fn test_wrap_wide_chars() {
        // Each ideograph is two cells; three fit in seven cells.
        let lines = wrap_text("漢字漢字漢", 7, WrapMode::Wrap);
        assert_eq!(lines[0], "漢字漢");
        assert_eq!(lines[1], "字漢");
    }
}
