//! Output composition: laid-out tree to styled frame.
//!
//! Pre-order traversal of the node tree, accumulating ancestor offsets,
//! painting borders, pushing clip rectangles for hidden overflow, and
//! rasterising text subtrees onto the [`canvas::Canvas`].
//!
//! Text handling follows the squash model: a `Text` node's descendants
//! collapse into one styled string (each fragment styled by its own
//! record, transforms applied innermost-first), the node's wrap mode
//! reflows it to the computed inner width, and the node's own transform
//! runs once per output line with the zero-based line index.

pub mod canvas;
pub mod clip;

use crate::ansi::{self, ColorMode};
use crate::border::render_border;
use crate::dom::{NodeKey, NodeKind, Tree};
use crate::error::Result;
use crate::style::Overflow;
use crate::text::wrap_text;
use canvas::Canvas;
use clip::{ClipRect, ClipStack};
use tracing::trace;

/// Options for one composition pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComposeOptions {
    /// Skip subtrees carrying the static marker.
    pub skip_static: bool,
}

/// A composed frame, split into the diffed dynamic region and the
/// append-only static region.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Dynamic output (static subtrees skipped).
    pub output: String,
    /// Line count of the dynamic output.
    pub height: usize,
    /// Output of static subtrees grown this commit, if any.
    pub static_output: Option<String>,
}

/// Compose the laid-out tree into a single styled string and its line
/// count.
pub fn compose(tree: &Tree, mode: ColorMode, options: ComposeOptions) -> Result<(String, usize)> {
    let mut canvas = Canvas::new();
    let mut clip = ClipStack::new();
    render_node(
        tree,
        tree.root,
        0,
        0,
        &mut canvas,
        &mut clip,
        options.skip_static,
        mode,
    )?;
    let (output, height) = canvas.serialize();
    trace!(height, bytes = output.len(), "composed frame");
    Ok((output, height))
}

/// Compose the dynamic region and the static region separately, for the
/// frame driver.
pub fn compose_frame(tree: &Tree, mode: ColorMode) -> Result<Frame> {
    let (output, height) = compose(tree, mode, ComposeOptions { skip_static: true })?;

    let mut static_canvas = Canvas::new();
    let mut clip = ClipStack::new();
    render_static(tree, tree.root, 0, 0, &mut static_canvas, &mut clip, mode)?;
    let static_output = if static_canvas.is_empty() {
        None
    } else {
        Some(static_canvas.serialize().0)
    };

    Ok(Frame {
        output,
        height,
        static_output,
    })
}

/// Walk down to static-marked subtrees and compose them in full.
fn render_static(
    tree: &Tree,
    key: NodeKey,
    offset_x: i32,
    offset_y: i32,
    canvas: &mut Canvas,
    clip: &mut ClipStack,
    mode: ColorMode,
) -> Result<()> {
    let node = tree.node(key)?;
    if node.is_static() {
        return render_node(tree, key, offset_x, offset_y, canvas, clip, false, mode);
    }
    let Some(handle) = node.layout else {
        return Ok(());
    };
    let layout = tree.layout.layout_of(handle)?;
    let x = offset_x + layout.left;
    let y = offset_y + layout.top;
    for &child in &node.children {
        render_static(tree, child, x, y, canvas, clip, mode)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render_node(
    tree: &Tree,
    key: NodeKey,
    offset_x: i32,
    offset_y: i32,
    canvas: &mut Canvas,
    clip: &mut ClipStack,
    skip_static: bool,
    mode: ColorMode,
) -> Result<()> {
    let node = tree.node(key)?;

    if node.style.display() == crate::style::Display::None {
        return Ok(());
    }
    if skip_static && node.is_static() {
        return Ok(());
    }
    let Some(handle) = node.layout else {
        // Virtual text and leaves are composed by their Text ancestor.
        return Ok(());
    };

    let layout = tree.layout.layout_of(handle)?;
    let x = offset_x + layout.left;
    let y = offset_y + layout.top;

    render_border(canvas, clip, x, y, layout.width, layout.height, &node.style, mode);

    let inner_x = x + layout.border.left as i32 + layout.padding.left as i32;
    let inner_y = y + layout.border.top as i32 + layout.padding.top as i32;
    let inner_width = layout
        .width
        .saturating_sub(layout.border.left + layout.border.right)
        .saturating_sub(layout.padding.left + layout.padding.right);
    let inner_height = layout
        .height
        .saturating_sub(layout.border.top + layout.border.bottom)
        .saturating_sub(layout.padding.top + layout.padding.bottom);

    let mut pushed = 0;
    if node.style.overflow_x() == Overflow::Hidden {
        clip.push(ClipRect::columns(inner_x, inner_width));
        pushed += 1;
    }
    if node.style.overflow_y() == Overflow::Hidden {
        clip.push(ClipRect::rows(inner_y, inner_height));
        pushed += 1;
    }

    if node.kind == NodeKind::Text {
        let content = squash_children(tree, key, mode)?;
        let styled = ansi::style(&content, &node.style.text_style(), mode);
        let lines = wrap_text(&styled, inner_width as usize, node.style.wrap_mode());
        for (index, line) in lines.iter().enumerate() {
            let line = match &node.transform {
                Some(transform) => transform(line, index),
                None => line.clone(),
            };
            canvas.write_text(inner_x, inner_y + index as i32, &line, clip);
        }
    } else {
        for &child in &node.children {
            render_node(tree, child, x, y, canvas, clip, skip_static, mode)?;
        }
    }

    for _ in 0..pushed {
        clip.pop();
    }
    Ok(())
}

/// Concatenate the composed fragments of a Text node's children.
///
/// Each nested fragment is styled by its own record and then run through
/// its own transform, so transforms compose outward: the innermost runs
/// first and every enclosing transform sees the ANSI codes the inner
/// ones produced.
fn squash_children(tree: &Tree, key: NodeKey, mode: ColorMode) -> Result<String> {
    let node = tree.node(key)?;
    let mut out = String::new();
    for &child in &node.children {
        out.push_str(&squash_fragment(tree, child, mode)?);
    }
    Ok(out)
}

fn squash_fragment(tree: &Tree, key: NodeKey, mode: ColorMode) -> Result<String> {
    let node = tree.node(key)?;
    match node.kind {
        NodeKind::TextLeaf => Ok(node.text.clone()),
        NodeKind::Text | NodeKind::VirtualText => {
            let inner = squash_children(tree, key, mode)?;
            let mut styled = ansi::style(&inner, &node.style.text_style(), mode);
            if let Some(transform) = &node.transform {
                styled = transform(&styled, 0);
            }
            Ok(styled)
        }
        _ => Ok(String::new()),
    }
}
