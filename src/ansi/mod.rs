//! ANSI escape sequence generation with style-aware wrapping.
//!
//! The codec turns a [`TextStyle`] into its *open* and *close* SGR
//! sequences and wraps text so that nested styles compose
//! deterministically. Open codes are always emitted in a fixed order:
//!
//! ```text
//! dim -> foreground -> background -> bold -> italic -> underline
//!     -> strikethrough -> inverse
//! ```
//!
//! Close codes are the per-dimension resets (`39`, `49`, `22`, `23`,
//! `24`, `29`, `27`), emitted in reverse order, so wrapping restores the
//! prior state of each dimension independently.

pub mod parse;
pub mod sequences;

pub use parse::{slice, strip, visible_width, SgrState};

use crate::color::Color;
use bitflags::bitflags;
use std::fmt::Write as _;

bitflags! {
    /// Text rendering attributes.
    ///
    /// Attributes are represented as bitflags and can be combined using
    /// bitwise OR. Not all terminals support all attributes.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct TextAttributes: u8 {
        /// Dim/decreased intensity.
        const DIM           = 0x01;
        /// Bold/increased intensity.
        const BOLD          = 0x02;
        /// Italic (not widely supported).
        const ITALIC        = 0x04;
        /// Underlined text.
        const UNDERLINE     = 0x08;
        /// Strikethrough text.
        const STRIKETHROUGH = 0x10;
        /// Swapped foreground/background.
        const INVERSE       = 0x20;
    }
}

/// Color output mode, decided once per driver by the capability probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// 24-bit RGB emission (`38;2;r;g;b`).
    #[default]
    TrueColor,
    /// Nearest 256-color palette emission (`38;5;n`).
    Ansi256,
}

/// Resolved text style: colors plus attribute flags.
///
/// This is the ANSI-level style a [`crate::style::Style`] record reduces
/// to once its text fields are read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextStyle {
    /// Foreground color (None = terminal default).
    pub fg: Option<Color>,
    /// Background color (None = terminal default).
    pub bg: Option<Color>,
    /// Text rendering attributes.
    pub attributes: TextAttributes,
}

impl TextStyle {
    /// Empty style with no colors or attributes.
    pub const NONE: Self = Self {
        fg: None,
        bg: None,
        attributes: TextAttributes::empty(),
    };

    /// Check if this style has any non-default properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.attributes.is_empty()
    }
}

/// SGR parameter string for a foreground color (no CSI framing).
#[must_use]
pub fn fg_params(color: Color, mode: ColorMode) -> String {
    if let Some(code) = color.named_fg_code() {
        return code.to_string();
    }
    let Color::Rgb(r, g, b) = color else {
        unreachable!()
    };
    match mode {
        ColorMode::TrueColor => format!("38;2;{r};{g};{b}"),
        ColorMode::Ansi256 => format!("38;5;{}", Color::rgb_to_256(r, g, b)),
    }
}

/// SGR parameter string for a background color (no CSI framing).
#[must_use]
pub fn bg_params(color: Color, mode: ColorMode) -> String {
    if let Some(code) = color.named_bg_code() {
        return code.to_string();
    }
    let Color::Rgb(r, g, b) = color else {
        unreachable!()
    };
    match mode {
        ColorMode::TrueColor => format!("48;2;{r};{g};{b}"),
        ColorMode::Ansi256 => format!("48;5;{}", Color::rgb_to_256(r, g, b)),
    }
}

/// The open sequence for a style, codes in the fixed order.
#[must_use]
pub fn open_sequence(style: &TextStyle, mode: ColorMode) -> String {
    let mut out = String::new();
    let attrs = style.attributes;
    if attrs.contains(TextAttributes::DIM) {
        out.push_str("\x1b[2m");
    }
    if let Some(fg) = style.fg {
        let _ = write!(out, "\x1b[{}m", fg_params(fg, mode));
    }
    if let Some(bg) = style.bg {
        let _ = write!(out, "\x1b[{}m", bg_params(bg, mode));
    }
    if attrs.contains(TextAttributes::BOLD) {
        out.push_str("\x1b[1m");
    }
    if attrs.contains(TextAttributes::ITALIC) {
        out.push_str("\x1b[3m");
    }
    if attrs.contains(TextAttributes::UNDERLINE) {
        out.push_str("\x1b[4m");
    }
    if attrs.contains(TextAttributes::STRIKETHROUGH) {
        out.push_str("\x1b[9m");
    }
    if attrs.contains(TextAttributes::INVERSE) {
        out.push_str("\x1b[7m");
    }
    out
}

/// The close sequence for a style: per-dimension resets in reverse order.
///
/// Bold and dim share the intensity reset (`22`), emitted once.
#[must_use]
pub fn close_sequence(style: &TextStyle) -> String {
    let mut out = String::new();
    let attrs = style.attributes;
    if attrs.contains(TextAttributes::INVERSE) {
        out.push_str(sequences::attr::RESET_INVERSE);
    }
    if attrs.contains(TextAttributes::STRIKETHROUGH) {
        out.push_str(sequences::attr::RESET_STRIKETHROUGH);
    }
    if attrs.contains(TextAttributes::UNDERLINE) {
        out.push_str(sequences::attr::RESET_UNDERLINE);
    }
    if attrs.contains(TextAttributes::ITALIC) {
        out.push_str(sequences::attr::RESET_ITALIC);
    }
    if attrs.intersects(TextAttributes::BOLD | TextAttributes::DIM) {
        out.push_str(sequences::attr::RESET_INTENSITY);
    }
    if style.bg.is_some() {
        out.push_str(sequences::BG_DEFAULT);
    }
    if style.fg.is_some() {
        out.push_str(sequences::FG_DEFAULT);
    }
    out
}

/// Wrap `text` in the open and close sequences of `style`.
///
/// Nested styles compose: any close code inside `text` that would cancel
/// a dimension this style sets is replaced by this style's open code for
/// that dimension, so inner fragments restore the *enclosing* state
/// rather than the terminal default.
#[must_use]
pub fn style(text: &str, spec: &TextStyle, mode: ColorMode) -> String {
    if spec.is_empty() {
        return text.to_string();
    }

    let mut body = text.to_string();
    if let Some(fg) = spec.fg {
        let open = format!("\x1b[{}m", fg_params(fg, mode));
        body = body.replace(sequences::FG_DEFAULT, &open);
    }
    if let Some(bg) = spec.bg {
        let open = format!("\x1b[{}m", bg_params(bg, mode));
        body = body.replace(sequences::BG_DEFAULT, &open);
    }

    format!("{}{}{}", open_sequence(spec, mode), body, close_sequence(spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_single_color() {
        let green = TextStyle {
            fg: Some(Color::Green),
            ..TextStyle::NONE
        };
        assert_eq!(open_sequence(&green, ColorMode::TrueColor), "\x1b[32m");
        assert_eq!(close_sequence(&green), "\x1b[39m");
        assert_eq!(style("Hello", &green, ColorMode::TrueColor), "\x1b[32mHello\x1b[39m");
    }

    #[test]
    fn test_open_order_is_fixed() {
        let spec = TextStyle {
            fg: Some(Color::Red),
            bg: Some(Color::Blue),
            attributes: TextAttributes::DIM | TextAttributes::BOLD | TextAttributes::INVERSE,
        };
        let open = open_sequence(&spec, ColorMode::TrueColor);
        // dim, fg, bg, bold, ..., inverse
        assert_eq!(open, "\x1b[2m\x1b[31m\x1b[44m\x1b[1m\x1b[7m");
    }

    #[test]
    fn test_close_dedupes_intensity() {
        let spec = TextStyle {
            fg: None,
            bg: None,
            attributes: TextAttributes::DIM | TextAttributes::BOLD,
        };
        let close = close_sequence(&spec);
        assert_eq!(close, "\x1b[22m");
    }

    #[test]
    fn test_rgb_gated_on_mode() {
        let spec = TextStyle {
            fg: Some(Color::Rgb(255, 0, 0)),
            ..TextStyle::NONE
        };
        assert_eq!(open_sequence(&spec, ColorMode::TrueColor), "\x1b[38;2;255;0;0m");
        assert!(open_sequence(&spec, ColorMode::Ansi256).starts_with("\x1b[38;5;"));
    }

    #[test]
    fn test_named_colors_ignore_mode() {
        let spec = TextStyle {
            fg: Some(Color::BrightGreen),
            ..TextStyle::NONE
        };
        assert_eq!(open_sequence(&spec, ColorMode::Ansi256), "\x1b[92m");
    }

    #[test]
    fn test_nested_color_restores_outer() {
        let inner = TextStyle {
            fg: Some(Color::Red),
            ..TextStyle::NONE
        };
        let outer = TextStyle {
            fg: Some(Color::Blue),
            ..TextStyle::NONE
        };
        let mode = ColorMode::TrueColor;
        let body = format!("A {} C", style("B", &inner, mode));
        let wrapped = style(&body, &outer, mode);
        // Inner close (39) is rewritten to the outer open (34) so " C"
        // stays blue.
        assert_eq!(wrapped, "\x1b[34mA \x1b[31mB\x1b[34m C\x1b[39m");
    }

    #[test]
    fn test_nested_attribute_passthrough() {
        let inner = TextStyle {
            fg: None,
            bg: None,
            attributes: TextAttributes::BOLD,
        };
        let outer = TextStyle {
            fg: Some(Color::Blue),
            ..TextStyle::NONE
        };
        let mode = ColorMode::TrueColor;
        let body = format!("A {} C", style("B", &inner, mode));
        let wrapped = style(&body, &outer, mode);
        assert_eq!(wrapped, "\x1b[34mA \x1b[1mB\x1b[22m C\x1b[39m");
    }

    #[test]
    fn test_empty_style_is_identity() {
        assert_eq!(style("plain", &TextStyle::NONE, ColorMode::TrueColor), "plain");
    }
}
