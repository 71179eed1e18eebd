//! Constant ANSI escape sequences and cursor-movement helpers.

/// Reset all attributes to default.
pub const RESET: &str = "\x1b[0m";

/// Clear entire line.
pub const CLEAR_LINE: &str = "\x1b[2K";

/// Hide cursor.
pub const CURSOR_HIDE: &str = "\x1b[?25l";

/// Show cursor.
pub const CURSOR_SHOW: &str = "\x1b[?25h";

/// Reset foreground to default.
pub const FG_DEFAULT: &str = "\x1b[39m";

/// Reset background to default.
pub const BG_DEFAULT: &str = "\x1b[49m";

/// Attribute reset codes, one per style dimension.
pub mod attr {
    /// Reset bold/dim.
    pub const RESET_INTENSITY: &str = "\x1b[22m";
    /// Reset italic.
    pub const RESET_ITALIC: &str = "\x1b[23m";
    /// Reset underline.
    pub const RESET_UNDERLINE: &str = "\x1b[24m";
    /// Reset inverse.
    pub const RESET_INVERSE: &str = "\x1b[27m";
    /// Reset strikethrough.
    pub const RESET_STRIKETHROUGH: &str = "\x1b[29m";
}

/// Move cursor up by `n` lines. Zero produces no output.
#[must_use]
pub fn cursor_up(n: usize) -> String {
    if n == 0 {
        String::new()
    } else {
        format!("\x1b[{n}A")
    }
}

/// Move cursor down by `n` lines. Zero produces no output.
#[must_use]
pub fn cursor_down(n: usize) -> String {
    if n == 0 {
        String::new()
    } else {
        format!("\x1b[{n}B")
    }
}
