//! Box-drawing borders.
//!
//! Each node edge can be enabled, colored, and dimmed independently; the
//! glyph set comes from a named style or a user-provided table. Corner
//! glyphs take the horizontal edge's color and dim flag, so partially
//! disabled borders stay unambiguous.

use crate::ansi::{self, ColorMode, TextAttributes, TextStyle};
use crate::compose::canvas::Canvas;
use crate::compose::clip::ClipStack;
use crate::style::{Edge, Style};

/// Glyph table for one border style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top: char,
    pub top_right: char,
    pub left: char,
    pub right: char,
    pub bottom_left: char,
    pub bottom: char,
    pub bottom_right: char,
}

/// Border glyph style: a named set or a custom table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderStyle {
    /// Single-line box drawing characters.
    Single,
    /// Double-line box drawing characters.
    Double,
    /// Rounded corners.
    Round,
    /// Heavy (bold) box drawing characters.
    Bold,
    /// User-provided glyph table.
    Custom(BorderChars),
}

impl BorderStyle {
    /// The glyph table for this style.
    #[must_use]
    pub const fn chars(&self) -> BorderChars {
        match self {
            Self::Single => BorderChars {
                top_left: '┌',
                top: '─',
                top_right: '┐',
                left: '│',
                right: '│',
                bottom_left: '└',
                bottom: '─',
                bottom_right: '┘',
            },
            Self::Double => BorderChars {
                top_left: '╔',
                top: '═',
                top_right: '╗',
                left: '║',
                right: '║',
                bottom_left: '╚',
                bottom: '═',
                bottom_right: '╝',
            },
            Self::Round => BorderChars {
                top_left: '╭',
                top: '─',
                top_right: '╮',
                left: '│',
                right: '│',
                bottom_left: '╰',
                bottom: '─',
                bottom_right: '╯',
            },
            Self::Bold => BorderChars {
                top_left: '┏',
                top: '━',
                top_right: '┓',
                left: '┃',
                right: '┃',
                bottom_left: '┗',
                bottom: '━',
                bottom_right: '┛',
            },
            Self::Custom(chars) => *chars,
        }
    }
}

/// Style applied to one edge's glyphs.
fn edge_style(style: &Style, edge: Edge) -> TextStyle {
    let mut attributes = TextAttributes::empty();
    if style.border_dim_edge(edge) {
        attributes |= TextAttributes::DIM;
    }
    TextStyle {
        fg: style.border_color_edge(edge),
        bg: None,
        attributes,
    }
}

/// Draw the enabled border edges of a node at its outer rectangle.
///
/// `x`/`y` are absolute canvas coordinates of the node's top-left
/// corner; `width`/`height` the node's outer size in cells.
pub fn render_border(
    canvas: &mut Canvas,
    clip: &ClipStack,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    style: &Style,
    mode: ColorMode,
) {
    let Some(border) = style.border_style else {
        return;
    };
    if width == 0 || height == 0 {
        return;
    }
    let chars = border.chars();

    let top = style.border_enabled(Edge::Top);
    let right = style.border_enabled(Edge::Right);
    let bottom = style.border_enabled(Edge::Bottom);
    let left = style.border_enabled(Edge::Left);

    let horizontal = |lead: Option<char>, mid: char, trail: Option<char>| -> String {
        let mut row = String::new();
        let corners = usize::from(lead.is_some()) + usize::from(trail.is_some());
        if let Some(c) = lead {
            row.push(c);
        }
        for _ in 0..(width as usize).saturating_sub(corners) {
            row.push(mid);
        }
        if let Some(c) = trail {
            row.push(c);
        }
        row
    };

    if top {
        // Corners follow the top edge's style even when the side edges
        // carry their own colors.
        let line = horizontal(
            left.then_some(chars.top_left),
            chars.top,
            right.then_some(chars.top_right),
        );
        let styled = ansi::style(&line, &edge_style(style, Edge::Top), mode);
        canvas.write_text(x, y, &styled, clip);
    }

    if bottom && height > 1 {
        let line = horizontal(
            left.then_some(chars.bottom_left),
            chars.bottom,
            right.then_some(chars.bottom_right),
        );
        let styled = ansi::style(&line, &edge_style(style, Edge::Bottom), mode);
        canvas.write_text(x, y + height as i32 - 1, &styled, clip);
    }

    let row_start = y + i32::from(top);
    let row_end = y + height as i32 - i32::from(bottom);

    if left {
        let styled = ansi::style(&chars.left.to_string(), &edge_style(style, Edge::Left), mode);
        for row in row_start..row_end {
            canvas.write_text(x, row, &styled, clip);
        }
    }

    if right && width > 1 {
        let styled = ansi::style(
            &chars.right.to_string(),
            &edge_style(style, Edge::Right),
            mode,
        );
        for row in row_start..row_end {
            canvas.write_text(x + width as i32 - 1, row, &styled, clip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_glyph_sets() {
        assert_eq!(BorderStyle::Single.chars().top_left, '┌');
        assert_eq!(BorderStyle::Double.chars().top, '═');
        assert_eq!(BorderStyle::Round.chars().top_left, '╭');
        assert_eq!(BorderStyle::Bold.chars().left, '┃');
    }

    #[test]
    fn test_custom_glyphs() {
        let chars = BorderChars {
            top_left: '+',
            top: '-',
            top_right: '+',
            left: '|',
            right: '|',
            bottom_left: '+',
            bottom: '-',
            bottom_right: '+',
        };
        assert_eq!(BorderStyle::Custom(chars).chars(), chars);
    }

    #[test]
    fn test_render_single_border() {
        let mut canvas = Canvas::new();
        let clip = ClipStack::new();
        let style = Style {
            border_style: Some(BorderStyle::Single),
            ..Style::default()
        };
        render_border(&mut canvas, &clip, 0, 0, 4, 3, &style, ColorMode::TrueColor);

        let (output, height) = canvas.serialize();
        assert_eq!(height, 3);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "┌──┐");
        assert_eq!(lines[1], "│  │");
        assert_eq!(lines[2], "└──┘");
    }

    #[test]
    fn test_render_border_disabled_top() {
        let mut canvas = Canvas::new();
        let clip = ClipStack::new();
        let style = Style {
            border_style: Some(BorderStyle::Single),
            border_top: Some(false),
            ..Style::default()
        };
        render_border(&mut canvas, &clip, 0, 0, 4, 3, &style, ColorMode::TrueColor);

        let (output, _) = canvas.serialize();
        let lines: Vec<&str> = output.lines().collect();
        // Side edges extend into the first row; no top corners appear.
        assert_eq!(lines[0], "│  │");
        assert_eq!(lines[2], "└──┘");
    }

    #[test]
    fn test_border_color_applies_to_glyphs() {
        let mut canvas = Canvas::new();
        let clip = ClipStack::new();
        let style = Style::builder()
            .border(BorderStyle::Single)
            .border_color("red")
            .build();
        render_border(&mut canvas, &clip, 0, 0, 3, 2, &style, ColorMode::TrueColor);

        let (output, _) = canvas.serialize();
        assert!(output.contains("\x1b[31m"));
        assert!(output.contains("\x1b[39m"));
    }
}
