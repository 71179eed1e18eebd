//! Declarative box-model and text styling.
//!
//! [`Style`] is the sparse record component authors attach to nodes: a
//! struct of optionals, so the reconciler's diff reduces to
//! field-by-field comparison and an unset field means "inherit the
//! default". [`StyleBuilder`] provides fluent construction.
//!
//! Color- and dimension-typed fields parse leniently from strings:
//! styles are user input via component props and must tolerate typos, so
//! a malformed value leaves the field untouched rather than failing.
//!
//! # Examples
//!
//! ```
//! use imprint::style::{Style, Dimension, FlexDirection};
//! use imprint::border::BorderStyle;
//!
//! let style = Style::builder()
//!     .width(20u32)
//!     .flex_direction(FlexDirection::Column)
//!     .border(BorderStyle::Round)
//!     .color("green")
//!     .bold()
//!     .build();
//!
//! assert_eq!(style.width, Some(Dimension::Cells(20)));
//! ```

use crate::ansi::{TextAttributes, TextStyle};
use crate::border::BorderStyle;
use crate::color::Color;
use crate::text::WrapMode;

/// A size specification for a box-model dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Dimension {
    /// Absolute size in cells.
    Cells(u32),
    /// Percentage of the parent's size (0-100).
    Percent(f32),
    /// Sized by content / solver.
    #[default]
    Auto,
}

impl Dimension {
    /// Parse a dimension: a bare number is cells, a `%`-suffixed number
    /// is a percentage, anything else resets to auto.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if let Some(pct) = spec.strip_suffix('%') {
            if let Ok(value) = pct.trim().parse::<f32>() {
                return Self::Percent(value);
            }
            return Self::Auto;
        }
        match spec.parse::<u32>() {
            Ok(cells) => Self::Cells(cells),
            Err(_) => Self::Auto,
        }
    }
}

impl From<u32> for Dimension {
    fn from(cells: u32) -> Self {
        Self::Cells(cells)
    }
}

impl From<&str> for Dimension {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

/// Main-axis direction of a flex container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlexDirection {
    #[default]
    Row,
    RowReverse,
    Column,
    ColumnReverse,
}

/// Main-axis distribution of free space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JustifyContent {
    FlexStart,
    FlexEnd,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Cross-axis alignment of children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignItems {
    FlexStart,
    FlexEnd,
    Center,
    Stretch,
}

/// Cross-axis alignment override for a single child.
pub type AlignSelf = AlignItems;

/// Positioning scheme for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    #[default]
    Relative,
    /// Taken out of flow; used by append-only static regions so they
    /// occupy no space in the dynamic layout.
    Absolute,
}

/// Content overflow behavior per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
}

/// Participation of a node in layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Flex,
    None,
}

/// One edge of a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Sparse declarative style record.
///
/// Every field is optional; `None` means "not set" and resolves to the
/// documented default at use sites. See the module docs for the overall
/// model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    // Box dimensions.
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,

    // Flex container / item.
    pub flex_direction: Option<FlexDirection>,
    pub flex_grow: Option<f32>,
    pub flex_shrink: Option<f32>,
    pub flex_basis: Option<Dimension>,
    pub justify_content: Option<JustifyContent>,
    pub align_items: Option<AlignItems>,
    pub align_self: Option<AlignSelf>,
    pub position: Option<Position>,

    // Gutters.
    pub gap: Option<u32>,
    pub column_gap: Option<u32>,
    pub row_gap: Option<u32>,

    // Padding: shorthand plus per-edge overrides.
    pub padding: Option<u32>,
    pub padding_top: Option<u32>,
    pub padding_right: Option<u32>,
    pub padding_bottom: Option<u32>,
    pub padding_left: Option<u32>,

    // Margin: shorthand plus per-edge overrides.
    pub margin: Option<u32>,
    pub margin_top: Option<u32>,
    pub margin_right: Option<u32>,
    pub margin_bottom: Option<u32>,
    pub margin_left: Option<u32>,

    // Border: style kind, per-edge enables, colors, dim flags.
    pub border_style: Option<BorderStyle>,
    pub border_top: Option<bool>,
    pub border_right: Option<bool>,
    pub border_bottom: Option<bool>,
    pub border_left: Option<bool>,
    pub border_color: Option<Color>,
    pub border_top_color: Option<Color>,
    pub border_right_color: Option<Color>,
    pub border_bottom_color: Option<Color>,
    pub border_left_color: Option<Color>,
    pub border_dim: Option<bool>,
    pub border_top_dim: Option<bool>,
    pub border_right_dim: Option<bool>,
    pub border_bottom_dim: Option<bool>,
    pub border_left_dim: Option<bool>,

    // Overflow and visibility.
    pub overflow: Option<Overflow>,
    pub overflow_x: Option<Overflow>,
    pub overflow_y: Option<Overflow>,
    pub display: Option<Display>,

    // Text.
    pub text_wrap: Option<WrapMode>,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub dim: Option<bool>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub inverse: Option<bool>,
}

macro_rules! merge_fields {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field.clone(); } )+
    };
}

impl Style {
    /// Create a new style builder.
    #[must_use]
    pub fn builder() -> StyleBuilder {
        StyleBuilder::default()
    }

    /// Shallow-merge `patch` into this style: fields set in the patch
    /// override, unset fields keep their current value.
    pub fn merge(&mut self, patch: &Style) {
        let dst = self;
        merge_fields!(
            dst, patch, width, height, min_width, min_height, max_width, max_height,
            flex_direction, flex_grow, flex_shrink, flex_basis, justify_content,
            align_items, align_self, position, gap, column_gap, row_gap, padding,
            padding_top, padding_right, padding_bottom, padding_left, margin,
            margin_top, margin_right, margin_bottom, margin_left, border_style,
            border_top, border_right, border_bottom, border_left, border_color,
            border_top_color, border_right_color, border_bottom_color,
            border_left_color, border_dim, border_top_dim, border_right_dim,
            border_bottom_dim, border_left_dim, overflow, overflow_x, overflow_y,
            display, text_wrap, color, background_color, dim, bold, italic,
            underline, strikethrough, inverse,
        );
    }

    /// Resolved display mode.
    #[must_use]
    pub fn display(&self) -> Display {
        self.display.unwrap_or_default()
    }

    /// Resolved wrap mode for text content.
    #[must_use]
    pub fn wrap_mode(&self) -> WrapMode {
        self.text_wrap.unwrap_or_default()
    }

    /// Resolved horizontal overflow (`overflow-x`, falling back to the
    /// `overflow` shorthand).
    #[must_use]
    pub fn overflow_x(&self) -> Overflow {
        self.overflow_x.or(self.overflow).unwrap_or_default()
    }

    /// Resolved vertical overflow.
    #[must_use]
    pub fn overflow_y(&self) -> Overflow {
        self.overflow_y.or(self.overflow).unwrap_or_default()
    }

    /// Resolved padding for one edge (per-edge overrides the shorthand).
    #[must_use]
    pub fn padding_edge(&self, edge: Edge) -> u32 {
        let specific = match edge {
            Edge::Top => self.padding_top,
            Edge::Right => self.padding_right,
            Edge::Bottom => self.padding_bottom,
            Edge::Left => self.padding_left,
        };
        specific.or(self.padding).unwrap_or(0)
    }

    /// Resolved margin for one edge.
    #[must_use]
    pub fn margin_edge(&self, edge: Edge) -> u32 {
        let specific = match edge {
            Edge::Top => self.margin_top,
            Edge::Right => self.margin_right,
            Edge::Bottom => self.margin_bottom,
            Edge::Left => self.margin_left,
        };
        specific.or(self.margin).unwrap_or(0)
    }

    /// Check whether an edge draws a border: a border style must be set
    /// and the edge must not be disabled.
    #[must_use]
    pub fn border_enabled(&self, edge: Edge) -> bool {
        if self.border_style.is_none() {
            return false;
        }
        let enabled = match edge {
            Edge::Top => self.border_top,
            Edge::Right => self.border_right,
            Edge::Bottom => self.border_bottom,
            Edge::Left => self.border_left,
        };
        enabled.unwrap_or(true)
    }

    /// Resolved border color for one edge.
    #[must_use]
    pub fn border_color_edge(&self, edge: Edge) -> Option<Color> {
        let specific = match edge {
            Edge::Top => self.border_top_color,
            Edge::Right => self.border_right_color,
            Edge::Bottom => self.border_bottom_color,
            Edge::Left => self.border_left_color,
        };
        specific.or(self.border_color)
    }

    /// Resolved border dim flag for one edge.
    #[must_use]
    pub fn border_dim_edge(&self, edge: Edge) -> bool {
        let specific = match edge {
            Edge::Top => self.border_top_dim,
            Edge::Right => self.border_right_dim,
            Edge::Bottom => self.border_bottom_dim,
            Edge::Left => self.border_left_dim,
        };
        specific.or(self.border_dim).unwrap_or(false)
    }

    /// Reduce the text fields of this record to an ANSI-level style.
    #[must_use]
    pub fn text_style(&self) -> TextStyle {
        let mut attributes = TextAttributes::empty();
        if self.dim == Some(true) {
            attributes |= TextAttributes::DIM;
        }
        if self.bold == Some(true) {
            attributes |= TextAttributes::BOLD;
        }
        if self.italic == Some(true) {
            attributes |= TextAttributes::ITALIC;
        }
        if self.underline == Some(true) {
            attributes |= TextAttributes::UNDERLINE;
        }
        if self.strikethrough == Some(true) {
            attributes |= TextAttributes::STRIKETHROUGH;
        }
        if self.inverse == Some(true) {
            attributes |= TextAttributes::INVERSE;
        }
        TextStyle {
            fg: self.color,
            bg: self.background_color,
            attributes,
        }
    }
}

/// Fluent builder for [`Style`].
#[derive(Clone, Debug, Default)]
pub struct StyleBuilder {
    style: Style,
}

impl StyleBuilder {
    /// Set width from cells, a percent string, or anything parseable.
    #[must_use]
    pub fn width(mut self, value: impl Into<Dimension>) -> Self {
        self.style.width = Some(value.into());
        self
    }

    /// Set height.
    #[must_use]
    pub fn height(mut self, value: impl Into<Dimension>) -> Self {
        self.style.height = Some(value.into());
        self
    }

    /// Set flex direction.
    #[must_use]
    pub fn flex_direction(mut self, value: FlexDirection) -> Self {
        self.style.flex_direction = Some(value);
        self
    }

    /// Set flex grow factor.
    #[must_use]
    pub fn flex_grow(mut self, value: f32) -> Self {
        self.style.flex_grow = Some(value);
        self
    }

    /// Set flex shrink factor.
    #[must_use]
    pub fn flex_shrink(mut self, value: f32) -> Self {
        self.style.flex_shrink = Some(value);
        self
    }

    /// Set flex basis.
    #[must_use]
    pub fn flex_basis(mut self, value: impl Into<Dimension>) -> Self {
        self.style.flex_basis = Some(value.into());
        self
    }

    /// Set main-axis distribution.
    #[must_use]
    pub fn justify_content(mut self, value: JustifyContent) -> Self {
        self.style.justify_content = Some(value);
        self
    }

    /// Set cross-axis alignment.
    #[must_use]
    pub fn align_items(mut self, value: AlignItems) -> Self {
        self.style.align_items = Some(value);
        self
    }

    /// Set positioning scheme.
    #[must_use]
    pub fn position(mut self, value: Position) -> Self {
        self.style.position = Some(value);
        self
    }

    /// Set both gutters.
    #[must_use]
    pub fn gap(mut self, cells: u32) -> Self {
        self.style.gap = Some(cells);
        self
    }

    /// Set the padding shorthand.
    #[must_use]
    pub fn padding(mut self, cells: u32) -> Self {
        self.style.padding = Some(cells);
        self
    }

    /// Set the margin shorthand.
    #[must_use]
    pub fn margin(mut self, cells: u32) -> Self {
        self.style.margin = Some(cells);
        self
    }

    /// Enable a border with the given glyph style.
    #[must_use]
    pub fn border(mut self, style: BorderStyle) -> Self {
        self.style.border_style = Some(style);
        self
    }

    /// Set the border color from a spec string; unparsable specs are
    /// ignored.
    #[must_use]
    pub fn border_color(mut self, spec: &str) -> Self {
        if let Some(color) = Color::parse(spec) {
            self.style.border_color = Some(color);
        }
        self
    }

    /// Set horizontal overflow.
    #[must_use]
    pub fn overflow_x(mut self, value: Overflow) -> Self {
        self.style.overflow_x = Some(value);
        self
    }

    /// Set vertical overflow.
    #[must_use]
    pub fn overflow_y(mut self, value: Overflow) -> Self {
        self.style.overflow_y = Some(value);
        self
    }

    /// Set display mode.
    #[must_use]
    pub fn display(mut self, value: Display) -> Self {
        self.style.display = Some(value);
        self
    }

    /// Set the text wrap mode.
    #[must_use]
    pub fn text_wrap(mut self, value: WrapMode) -> Self {
        self.style.text_wrap = Some(value);
        self
    }

    /// Set the foreground color from a spec string; unparsable specs are
    /// ignored.
    #[must_use]
    pub fn color(mut self, spec: &str) -> Self {
        if let Some(color) = Color::parse(spec) {
            self.style.color = Some(color);
        }
        self
    }

    /// Set the background color from a spec string; unparsable specs are
    /// ignored.
    #[must_use]
    pub fn background_color(mut self, spec: &str) -> Self {
        if let Some(color) = Color::parse(spec) {
            self.style.background_color = Some(color);
        }
        self
    }

    /// Add the dim attribute.
    #[must_use]
    pub fn dim(mut self) -> Self {
        self.style.dim = Some(true);
        self
    }

    /// Add the bold attribute.
    #[must_use]
    pub fn bold(mut self) -> Self {
        self.style.bold = Some(true);
        self
    }

    /// Add the italic attribute.
    #[must_use]
    pub fn italic(mut self) -> Self {
        self.style.italic = Some(true);
        self
    }

    /// Add the underline attribute.
    #[must_use]
    pub fn underline(mut self) -> Self {
        self.style.underline = Some(true);
        self
    }

    /// Add the strikethrough attribute.
    #[must_use]
    pub fn strikethrough(mut self) -> Self {
        self.style.strikethrough = Some(true);
        self
    }

    /// Add the inverse attribute.
    #[must_use]
    pub fn inverse(mut self) -> Self {
        self.style.inverse = Some(true);
        self
    }

    /// Build the final style.
    #[must_use]
    pub fn build(self) -> Style {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_parse() {
        assert_eq!(Dimension::parse("42"), Dimension::Cells(42));
        assert_eq!(Dimension::parse("50%"), Dimension::Percent(50.0));
        assert_eq!(Dimension::parse("12.5%"), Dimension::Percent(12.5));
        assert_eq!(Dimension::parse("auto"), Dimension::Auto);
        assert_eq!(Dimension::parse("banana"), Dimension::Auto);
        assert_eq!(Dimension::parse("-3"), Dimension::Auto);
    }

    #[test]
    fn test_builder() {
        let style = Style::builder()
            .width(10u32)
            .height("50%")
            .color("green")
            .bold()
            .build();
        assert_eq!(style.width, Some(Dimension::Cells(10)));
        assert_eq!(style.height, Some(Dimension::Percent(50.0)));
        assert_eq!(style.color, Some(Color::Green));
        assert_eq!(style.bold, Some(true));
    }

    #[test]
    fn test_builder_ignores_bad_color() {
        let style = Style::builder().color("not-a-color").build();
        assert_eq!(style.color, None);
    }

    #[test]
    fn test_merge_overrides_set_fields_only() {
        let mut base = Style::builder().width(10u32).color("red").build();
        let patch = Style::builder().color("blue").build();
        base.merge(&patch);
        assert_eq!(base.width, Some(Dimension::Cells(10)));
        assert_eq!(base.color, Some(Color::Blue));
    }

    #[test]
    fn test_padding_edge_resolution() {
        let style = Style {
            padding: Some(2),
            padding_left: Some(5),
            ..Style::default()
        };
        assert_eq!(style.padding_edge(Edge::Left), 5);
        assert_eq!(style.padding_edge(Edge::Top), 2);
        assert_eq!(Style::default().padding_edge(Edge::Right), 0);
    }

    #[test]
    fn test_border_edge_resolution() {
        let style = Style {
            border_style: Some(BorderStyle::Single),
            border_top: Some(false),
            border_color: Some(Color::Red),
            border_left_color: Some(Color::Blue),
            ..Style::default()
        };
        assert!(!style.border_enabled(Edge::Top));
        assert!(style.border_enabled(Edge::Left));
        assert_eq!(style.border_color_edge(Edge::Left), Some(Color::Blue));
        assert_eq!(style.border_color_edge(Edge::Right), Some(Color::Red));

        // No border style at all: every edge disabled.
        assert!(!Style::default().border_enabled(Edge::Bottom));
    }

    #[test]
    fn test_overflow_shorthand() {
        let style = Style {
            overflow: Some(Overflow::Hidden),
            ..Style::default()
        };
        assert_eq!(style.overflow_x(), Overflow::Hidden);
        assert_eq!(style.overflow_y(), Overflow::Hidden);

        let style = Style {
            overflow_x: Some(Overflow::Hidden),
            ..Style::default()
        };
        assert_eq!(style.overflow_x(), Overflow::Hidden);
        assert_eq!(style.overflow_y(), Overflow::Visible);
    }

    #[test]
    fn test_text_style_reduction() {
        let style = Style::builder().color("cyan").bold().dim().build();
        let text = style.text_style();
        assert_eq!(text.fg, Some(Color::Cyan));
        assert!(text.attributes.contains(TextAttributes::BOLD));
        assert!(text.attributes.contains(TextAttributes::DIM));
        assert!(!text.attributes.contains(TextAttributes::ITALIC));
    }
}
