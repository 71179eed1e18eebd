//! Escape-aware string inspection: width, stripping, and slicing.
//!
//! Terminal text arrives as UTF-8 interleaved with escape sequences. The
//! functions here account for that: [`visible_width`] counts cells while
//! skipping escapes, [`slice`] cuts by visible cell positions while
//! keeping the SGR state valid at both cut points, and [`SgrState`]
//! models the style a terminal would be tracking at any point in the
//! stream.
//!
//! Width accounting is per grapheme cluster: ZWJ emoji sequences count
//! 2 cells, combining marks and variation selectors 0, wide CJK 2,
//! control characters 0.

use crate::ansi::TextAttributes;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// A lexical token of terminal text: an escape sequence or a text run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    /// A complete escape sequence, including the leading `ESC`.
    Escape(&'a str),
    /// A run of printable text between escapes.
    Text(&'a str),
}

/// Iterator splitting a string into escape sequences and text runs.
pub struct Tokens<'a> {
    rest: &'a str,
}

/// Tokenize terminal text.
#[must_use]
pub fn tokens(s: &str) -> Tokens<'_> {
    Tokens { rest: s }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.starts_with('\x1b') {
            let len = escape_len(self.rest);
            let (esc, rest) = self.rest.split_at(len);
            self.rest = rest;
            return Some(Token::Escape(esc));
        }
        let end = self.rest.find('\x1b').unwrap_or(self.rest.len());
        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Token::Text(text))
    }
}

/// Length in bytes of the escape sequence starting at the beginning of
/// `s` (which must start with `ESC`). Unterminated sequences extend to
/// the end of the string.
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes[0], 0x1b);
    if bytes.len() == 1 {
        return 1;
    }
    match bytes[1] {
        b'[' => {
            // CSI: parameter bytes, intermediate bytes, one final byte.
            let mut i = 2;
            while i < bytes.len() && (0x30..=0x3f).contains(&bytes[i]) {
                i += 1;
            }
            while i < bytes.len() && (0x20..=0x2f).contains(&bytes[i]) {
                i += 1;
            }
            if i < bytes.len() && (0x40..=0x7e).contains(&bytes[i]) {
                i + 1
            } else {
                i
            }
        }
        b']' => {
            // OSC: terminated by BEL or ST (ESC \).
            let body = &s[2..];
            if let Some(bel) = body.find('\x07') {
                let st = body.find("\x1b\\");
                match st {
                    Some(st) if st < bel => 2 + st + 2,
                    _ => 2 + bel + 1,
                }
            } else if let Some(st) = body.find("\x1b\\") {
                2 + st + 2
            } else {
                s.len()
            }
        }
        b if b.is_ascii() => 2,
        _ => 1,
    }
}

/// If `esc` is an SGR sequence (`ESC [ ... m`), return its parameter
/// string.
#[must_use]
pub fn sgr_params(esc: &str) -> Option<&str> {
    let body = esc.strip_prefix("\x1b[")?.strip_suffix('m')?;
    if body.bytes().all(|b| b.is_ascii_digit() || b == b';') {
        Some(body)
    } else {
        None
    }
}

/// Display width of a single grapheme cluster in terminal cells.
#[must_use]
pub fn cluster_width(cluster: &str) -> usize {
    // ZWJ sequences render as a single two-cell emoji.
    if cluster.contains('\u{200d}') {
        return 2;
    }
    UnicodeWidthStr::width(cluster)
}

/// Visible width of a string in cells, ignoring escape sequences.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    let mut width = 0;
    for token in tokens(s) {
        if let Token::Text(text) = token {
            width += text.graphemes(true).map(cluster_width).sum::<usize>();
        }
    }
    width
}

/// Remove all escape sequences from a string.
#[must_use]
pub fn strip(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for token in tokens(s) {
        if let Token::Text(text) = token {
            out.push_str(text);
        }
    }
    out
}

/// The SGR style state a terminal tracks while consuming a stream.
///
/// Colors are stored as raw SGR parameter strings (`"34"`,
/// `"38;2;1;2;3"`) so that re-emission reproduces the original code
/// exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SgrState {
    /// Active foreground parameters, if any.
    pub fg: Option<String>,
    /// Active background parameters, if any.
    pub bg: Option<String>,
    /// Active attributes.
    pub attributes: TextAttributes,
}

impl SgrState {
    /// Apply one SGR sequence if `esc` is one; other escapes are ignored.
    pub fn apply_sequence(&mut self, esc: &str) {
        if let Some(params) = sgr_params(esc) {
            self.apply_params(params);
        }
    }

    /// Apply an SGR parameter string (the part between `ESC [` and `m`).
    pub fn apply_params(&mut self, params: &str) {
        let mut iter = params.split(';').map(|p| p.parse::<u16>().unwrap_or(0));
        while let Some(code) = iter.next() {
            match code {
                0 => *self = Self::default(),
                1 => self.attributes |= TextAttributes::BOLD,
                2 => self.attributes |= TextAttributes::DIM,
                3 => self.attributes |= TextAttributes::ITALIC,
                4 => self.attributes |= TextAttributes::UNDERLINE,
                7 => self.attributes |= TextAttributes::INVERSE,
                9 => self.attributes |= TextAttributes::STRIKETHROUGH,
                22 => self.attributes -= TextAttributes::BOLD | TextAttributes::DIM,
                23 => self.attributes -= TextAttributes::ITALIC,
                24 => self.attributes -= TextAttributes::UNDERLINE,
                27 => self.attributes -= TextAttributes::INVERSE,
                29 => self.attributes -= TextAttributes::STRIKETHROUGH,
                30..=37 | 90..=97 => self.fg = Some(code.to_string()),
                39 => self.fg = None,
                40..=47 | 100..=107 => self.bg = Some(code.to_string()),
                49 => self.bg = None,
                38 | 48 => {
                    // Extended color: consume `5;n` or `2;r;g;b`.
                    let mut parts = vec![code.to_string()];
                    match iter.next() {
                        Some(5) => {
                            parts.push("5".to_string());
                            if let Some(n) = iter.next() {
                                parts.push(n.to_string());
                            }
                        }
                        Some(2) => {
                            parts.push("2".to_string());
                            for _ in 0..3 {
                                if let Some(n) = iter.next() {
                                    parts.push(n.to_string());
                                }
                            }
                        }
                        _ => continue,
                    }
                    let joined = parts.join(";");
                    if code == 38 {
                        self.fg = Some(joined);
                    } else {
                        self.bg = Some(joined);
                    }
                }
                _ => {}
            }
        }
    }

    /// Check if no style dimension is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.attributes.is_empty()
    }

    /// Emit the open sequences reproducing this state from a default
    /// terminal, in the codec's fixed order.
    #[must_use]
    pub fn open_all(&self) -> String {
        Self::default().transition_to(self)
    }

    /// Emit the close sequences returning the terminal to its default
    /// state.
    #[must_use]
    pub fn close_all(&self) -> String {
        self.transition_to(&Self::default())
    }

    /// Minimal sequences that move a terminal from `self` to `target`.
    ///
    /// Removals come first (shared intensity reset deduplicated), then
    /// color changes, then additions in the fixed open order.
    #[must_use]
    pub fn transition_to(&self, target: &SgrState) -> String {
        let mut out = String::new();
        let mut current = self.attributes;

        let removed = self.attributes - target.attributes;
        if removed.intersects(TextAttributes::BOLD | TextAttributes::DIM) {
            out.push_str("\x1b[22m");
            current -= TextAttributes::BOLD | TextAttributes::DIM;
        }
        if removed.contains(TextAttributes::ITALIC) {
            out.push_str("\x1b[23m");
            current -= TextAttributes::ITALIC;
        }
        if removed.contains(TextAttributes::UNDERLINE) {
            out.push_str("\x1b[24m");
            current -= TextAttributes::UNDERLINE;
        }
        if removed.contains(TextAttributes::STRIKETHROUGH) {
            out.push_str("\x1b[29m");
            current -= TextAttributes::STRIKETHROUGH;
        }
        if removed.contains(TextAttributes::INVERSE) {
            out.push_str("\x1b[27m");
            current -= TextAttributes::INVERSE;
        }

        // Additions follow the codec's fixed order: dim before the
        // colors, the remaining attributes after them.
        let added = target.attributes - current;
        if added.contains(TextAttributes::DIM) {
            out.push_str("\x1b[2m");
        }

        if target.fg != self.fg {
            match &target.fg {
                Some(params) => {
                    out.push_str("\x1b[");
                    out.push_str(params);
                    out.push('m');
                }
                None => out.push_str("\x1b[39m"),
            }
        }
        if target.bg != self.bg {
            match &target.bg {
                Some(params) => {
                    out.push_str("\x1b[");
                    out.push_str(params);
                    out.push('m');
                }
                None => out.push_str("\x1b[49m"),
            }
        }

        if added.contains(TextAttributes::BOLD) {
            out.push_str("\x1b[1m");
        }
        if added.contains(TextAttributes::ITALIC) {
            out.push_str("\x1b[3m");
        }
        if added.contains(TextAttributes::UNDERLINE) {
            out.push_str("\x1b[4m");
        }
        if added.contains(TextAttributes::STRIKETHROUGH) {
            out.push_str("\x1b[9m");
        }
        if added.contains(TextAttributes::INVERSE) {
            out.push_str("\x1b[7m");
        }

        out
    }
}

/// Slice a styled string by visible cell positions.
///
/// The result renders the cells `[start, end)` of `s`: the SGR state
/// active at `start` is re-opened at the front, SGR and foreign escape
/// sequences inside the range pass through verbatim, and the state
/// active at `end` is closed at the back. A wide character straddling a
/// cut point is replaced by spaces for its in-range cells, so the result
/// always occupies exactly `min(end, visible_width(s)) - start` cells.
#[must_use]
pub fn slice(s: &str, start: usize, end: usize) -> String {
    if end <= start {
        return String::new();
    }

    let mut out = String::new();
    let mut state = SgrState::default();
    let mut col = 0usize;
    let mut entered = false;
    let mut include_last = false;

    'outer: for token in tokens(s) {
        match token {
            Token::Escape(esc) => {
                if entered && col >= end {
                    break 'outer;
                }
                state.apply_sequence(esc);
                if entered {
                    out.push_str(esc);
                }
            }
            Token::Text(text) => {
                for cluster in text.graphemes(true) {
                    let width = cluster_width(cluster);
                    if width == 0 {
                        // Combining marks travel with the cell before them.
                        if include_last {
                            out.push_str(cluster);
                        }
                        continue;
                    }
                    let c_start = col;
                    let c_end = col + width;
                    col = c_end;

                    if c_end <= start {
                        include_last = false;
                        continue;
                    }
                    if c_start >= end {
                        break 'outer;
                    }
                    if !entered {
                        out.push_str(&state.open_all());
                        entered = true;
                    }
                    if c_start >= start && c_end <= end {
                        out.push_str(cluster);
                        include_last = true;
                    } else {
                        // Wide character cut in half: pad its in-range cells.
                        let inside = c_end.min(end) - c_start.max(start);
                        for _ in 0..inside {
                            out.push(' ');
                        }
                        include_last = false;
                    }
                }
            }
        }
    }

    if entered {
        out.push_str(&state.close_all());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_width_plain() {
        assert_eq!(visible_width("hello"), 5);
        assert_eq!(visible_width(""), 0);
    }

    #[test]
    fn test_visible_width_ignores_escapes() {
        assert_eq!(visible_width("\x1b[32mhello\x1b[39m"), 5);
        assert_eq!(visible_width("\x1b[38;2;1;2;3m"), 0);
    }

    #[test]
    fn test_visible_width_wide_and_zero() {
        assert_eq!(visible_width("漢字"), 4);
        assert_eq!(visible_width("a\u{0301}"), 1); // combining acute
        assert_eq!(visible_width("👨‍👩‍👧"), 2); // ZWJ family
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("\x1b[1mbold\x1b[22m and plain"), "bold and plain");
    }

    #[test]
    fn test_tokens_roundtrip() {
        let s = "a\x1b[31mb\x1b]8;;http://x\x1b\\c";
        let rebuilt: String = tokens(s)
            .map(|t| match t {
                Token::Escape(e) => e,
                Token::Text(t) => t,
            })
            .collect();
        assert_eq!(rebuilt, s);
    }

    #[test]
    fn test_slice_plain() {
        assert_eq!(slice("hello world", 0, 5), "hello");
        assert_eq!(slice("hello world", 6, 11), "world");
        assert_eq!(slice("hello", 2, 2), "");
    }

    #[test]
    fn test_slice_reopens_active_style() {
        let s = "\x1b[32mhello world\x1b[39m";
        let cut = slice(s, 6, 11);
        assert_eq!(cut, "\x1b[32mworld\x1b[39m");
    }

    #[test]
    fn test_slice_closes_state_at_end() {
        let s = "ab\x1b[1mcd\x1b[22mef";
        // Cut ends inside the bold run: close must be emitted.
        assert_eq!(slice(s, 0, 3), "ab\x1b[1mc\x1b[22m");
    }

    #[test]
    fn test_slice_passes_foreign_escapes() {
        let s = "ab\x1b]8;;http://x\x1b\\cd";
        let cut = slice(s, 0, 4);
        assert!(cut.contains("\x1b]8;;http://x\x1b\\"));
        assert_eq!(strip(&cut), "abcd");
    }

    #[test]
    fn test_slice_wide_char_straddle_pads() {
        // "漢" occupies cells 0-1; cutting at 1 keeps the width contract.
        assert_eq!(visible_width(&slice("漢字", 1, 3)), 2);
        assert_eq!(slice("漢字", 1, 3), " 字");
    }

    #[test]
    fn test_slice_keeps_combining_mark() {
        let s = "xa\u{0301}y";
        assert_eq!(slice(s, 1, 2), "a\u{0301}");
    }

    #[test]
    fn test_sgr_state_apply() {
        let mut state = SgrState::default();
        state.apply_params("1;34");
        assert!(state.attributes.contains(TextAttributes::BOLD));
        assert_eq!(state.fg.as_deref(), Some("34"));

        state.apply_params("39");
        assert_eq!(state.fg, None);

        state.apply_params("38;2;10;20;30");
        assert_eq!(state.fg.as_deref(), Some("38;2;10;20;30"));

        state.apply_params("0");
        assert!(state.is_empty());
    }

    #[test]
    fn test_transition_minimal() {
        let mut blue = SgrState::default();
        blue.apply_params("34");
        let mut blue_bold = blue.clone();
        blue_bold.apply_params("1");

        assert_eq!(blue.transition_to(&blue_bold), "\x1b[1m");
        assert_eq!(blue_bold.transition_to(&blue), "\x1b[22m");
        assert_eq!(blue.close_all(), "\x1b[39m");
    }

    #[test]
    fn test_transition_intensity_reopen() {
        // Dropping dim while keeping bold requires reset + re-open.
        let mut both = SgrState::default();
        both.apply_params("1;2");
        let mut bold = SgrState::default();
        bold.apply_params("1");

        assert_eq!(both.transition_to(&bold), "\x1b[22m\x1b[1m");
    }

    #[test]
    fn test_line_of_only_escapes_has_zero_width() {
        assert_eq!(visible_width("\x1b[31m\x1b[1m\x1b[0m"), 0);
    }
}
