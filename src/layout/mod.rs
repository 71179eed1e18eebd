//! Flexbox layout adapter.
//!
//! Wraps a [`taffy::TaffyTree`] behind the handle-based interface the
//! node tree uses: every layout-participating node owns one
//! [`LayoutHandle`], structural mutations mirror into the solver, and
//! declarative [`Style`] records translate to solver attributes on
//! commit.
//!
//! Text nodes install a *measure source*: a solver-side context naming
//! the DOM node whose squashed text must be measured. The actual
//! measurement closure is supplied to [`LayoutEngine::compute`] by the
//! caller, which owns the node arena; the solver memoises measure
//! results per pass, so the closure stays pure.

use crate::dom::NodeKey;
use crate::error::Result;
use crate::style::{
    AlignItems, Dimension, Display, FlexDirection, JustifyContent, Position, Style,
};
use taffy::prelude::{auto, length, percent, AvailableSpace, Size, TaffyTree};
use tracing::trace;

/// Opaque reference into the layout solver, owned 1:1 by a node.
pub type LayoutHandle = taffy::NodeId;

/// Solver-side context for a Text node's measure callback.
#[derive(Clone, Copy, Debug)]
pub struct MeasureSource {
    /// The DOM node whose descendant text is measured.
    pub node: NodeKey,
}

/// Integer-cell box geometry read back after a layout pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutBox {
    /// Offset from the parent's content origin.
    pub left: i32,
    pub top: i32,
    /// Outer size, borders and padding included.
    pub width: u32,
    pub height: u32,
    pub border: EdgeInsets,
    pub padding: EdgeInsets,
}

/// Per-edge inset sizes in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeInsets {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// The flexbox solver and the handle bookkeeping around it.
pub struct LayoutEngine {
    taffy: TaffyTree<MeasureSource>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    /// Create an empty layout engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            taffy: TaffyTree::new(),
        }
    }

    /// Allocate a fresh handle with solver defaults (`flex-direction:
    /// row`, `flex-wrap: nowrap`).
    pub fn create_handle(&mut self) -> Result<LayoutHandle> {
        let style = taffy::Style {
            flex_direction: taffy::FlexDirection::Row,
            flex_wrap: taffy::FlexWrap::NoWrap,
            ..taffy::Style::default()
        };
        Ok(self.taffy.new_leaf(style)?)
    }

    /// Install the measure source for a Text node's handle.
    pub fn set_measure_source(&mut self, handle: LayoutHandle, node: NodeKey) -> Result<()> {
        self.taffy.set_node_context(handle, Some(MeasureSource { node }))?;
        Ok(())
    }

    /// Remove a handle's measure source (done when the node detaches).
    pub fn clear_measure_source(&mut self, handle: LayoutHandle) -> Result<()> {
        self.taffy.set_node_context(handle, None)?;
        Ok(())
    }

    /// Append `child` to `parent` in the solver.
    pub fn add_child(&mut self, parent: LayoutHandle, child: LayoutHandle) -> Result<()> {
        self.taffy.add_child(parent, child)?;
        Ok(())
    }

    /// Insert `child` under `parent` at `index` in the solver.
    pub fn insert_child_at(
        &mut self,
        parent: LayoutHandle,
        index: usize,
        child: LayoutHandle,
    ) -> Result<()> {
        self.taffy.insert_child_at_index(parent, index, child)?;
        Ok(())
    }

    /// Unlink `child` from `parent` in the solver without freeing it.
    pub fn remove_child(&mut self, parent: LayoutHandle, child: LayoutHandle) -> Result<()> {
        self.taffy.remove_child(parent, child)?;
        Ok(())
    }

    /// Destroy a handle. Must be called exactly once per handle, after
    /// the owning node is detached for good.
    pub fn free(&mut self, handle: LayoutHandle) -> Result<()> {
        self.taffy.remove(handle)?;
        Ok(())
    }

    /// Invalidate cached measurements for a handle (text changed).
    pub fn mark_dirty(&mut self, handle: LayoutHandle) -> Result<()> {
        self.taffy.mark_dirty(handle)?;
        Ok(())
    }

    /// Translate a declarative style record onto a handle.
    pub fn apply_style(&mut self, handle: LayoutHandle, style: &Style) -> Result<()> {
        let taffy_style = translate(style);
        self.taffy.set_style(handle, taffy_style)?;
        Ok(())
    }

    /// Run one layout pass with the given outer width and unconstrained
    /// height. `measure` is invoked for every handle carrying a measure
    /// source, with the known dimensions and available space the solver
    /// offers.
    pub fn compute<F>(
        &mut self,
        root: LayoutHandle,
        available_width: u16,
        mut measure: F,
    ) -> Result<()>
    where
        F: FnMut(NodeKey, Size<Option<f32>>, Size<AvailableSpace>) -> Size<f32>,
    {
        trace!(available_width, "layout pass");

        // The pass is driven by the terminal width: pin the root box.
        let mut root_style = self.taffy.style(root)?.clone();
        root_style.size.width = length(f32::from(available_width));
        self.taffy.set_style(root, root_style)?;

        let available = Size {
            width: AvailableSpace::Definite(f32::from(available_width)),
            height: AvailableSpace::MaxContent,
        };
        self.taffy.compute_layout_with_measure(
            root,
            available,
            |known, space, _id, context, _style| match context {
                Some(source) => measure(source.node, known, space),
                None => Size::ZERO,
            },
        )?;
        Ok(())
    }

    /// Read back the computed geometry of a handle in integer cells.
    pub fn layout_of(&self, handle: LayoutHandle) -> Result<LayoutBox> {
        let layout = self.taffy.layout(handle)?;
        let round_u = |v: f32| v.round().max(0.0) as u32;
        Ok(LayoutBox {
            left: layout.location.x.round() as i32,
            top: layout.location.y.round() as i32,
            width: round_u(layout.size.width),
            height: round_u(layout.size.height),
            border: EdgeInsets {
                top: round_u(layout.border.top),
                right: round_u(layout.border.right),
                bottom: round_u(layout.border.bottom),
                left: round_u(layout.border.left),
            },
            padding: EdgeInsets {
                top: round_u(layout.padding.top),
                right: round_u(layout.padding.right),
                bottom: round_u(layout.padding.bottom),
                left: round_u(layout.padding.left),
            },
        })
    }
}

fn dimension(value: Option<Dimension>) -> taffy::Dimension {
    match value {
        Some(Dimension::Cells(cells)) => length(cells as f32),
        Some(Dimension::Percent(pct)) => percent(pct / 100.0),
        Some(Dimension::Auto) | None => auto(),
    }
}

fn translate(style: &Style) -> taffy::Style {
    use crate::style::Edge;

    let display = match style.display() {
        Display::Flex => taffy::Display::Flex,
        Display::None => taffy::Display::None,
    };

    let flex_direction = match style.flex_direction.unwrap_or_default() {
        FlexDirection::Row => taffy::FlexDirection::Row,
        FlexDirection::RowReverse => taffy::FlexDirection::RowReverse,
        FlexDirection::Column => taffy::FlexDirection::Column,
        FlexDirection::ColumnReverse => taffy::FlexDirection::ColumnReverse,
    };

    let justify_content = style.justify_content.map(|j| match j {
        JustifyContent::FlexStart => taffy::JustifyContent::FlexStart,
        JustifyContent::FlexEnd => taffy::JustifyContent::FlexEnd,
        JustifyContent::Center => taffy::JustifyContent::Center,
        JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
        JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
        JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
    });

    let align = |a: AlignItems| match a {
        AlignItems::FlexStart => taffy::AlignItems::FlexStart,
        AlignItems::FlexEnd => taffy::AlignItems::FlexEnd,
        AlignItems::Center => taffy::AlignItems::Center,
        AlignItems::Stretch => taffy::AlignItems::Stretch,
    };

    let position = match style.position.unwrap_or_default() {
        Position::Relative => taffy::Position::Relative,
        Position::Absolute => taffy::Position::Absolute,
    };

    // Border consumes one cell on each edge whose style is not disabled;
    // overflow is consumed by the compositor, not the solver.
    let border_width = |edge: Edge| {
        if style.border_enabled(edge) {
            length(1.0)
        } else {
            length(0.0)
        }
    };

    let column_gap = style.column_gap.or(style.gap).unwrap_or(0);
    let row_gap = style.row_gap.or(style.gap).unwrap_or(0);

    taffy::Style {
        display,
        position,
        flex_direction,
        flex_wrap: taffy::FlexWrap::NoWrap,
        flex_grow: style.flex_grow.unwrap_or(0.0),
        flex_shrink: style.flex_shrink.unwrap_or(1.0),
        flex_basis: dimension(style.flex_basis),
        justify_content,
        align_items: style.align_items.map(align),
        align_self: style.align_self.map(align),
        size: Size {
            width: dimension(style.width),
            height: dimension(style.height),
        },
        min_size: Size {
            width: dimension(style.min_width),
            height: dimension(style.min_height),
        },
        max_size: Size {
            width: dimension(style.max_width),
            height: dimension(style.max_height),
        },
        gap: Size {
            width: length(column_gap as f32),
            height: length(row_gap as f32),
        },
        padding: taffy::Rect {
            top: length(style.padding_edge(Edge::Top) as f32),
            right: length(style.padding_edge(Edge::Right) as f32),
            bottom: length(style.padding_edge(Edge::Bottom) as f32),
            left: length(style.padding_edge(Edge::Left) as f32),
        },
        margin: taffy::Rect {
            top: length(style.margin_edge(Edge::Top) as f32),
            right: length(style.margin_edge(Edge::Right) as f32),
            bottom: length(style.margin_edge(Edge::Bottom) as f32),
            left: length(style.margin_edge(Edge::Left) as f32),
        },
        border: taffy::Rect {
            top: border_width(Edge::Top),
            right: border_width(Edge::Right),
            bottom: border_width(Edge::Bottom),
            left: border_width(Edge::Left),
        },
        ..taffy::Style::default()
    }
}
