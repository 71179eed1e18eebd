//! The host node tree.
//!
//! A mutable tree of element and text nodes, stored in an arena with
//! stable indices ([`NodeKey`]). Parent links are plain keys (the back
//! edge never owns), children are order-significant, and every
//! layout-participating node owns exactly one solver handle that the
//! structural primitives keep mirrored with the child list.
//!
//! Handle destruction is *deferred*: detaching a node unlinks it from
//! its parent and from the solver's child list but keeps the handle
//! alive, so a keyed reorder (detach then reinsert within one commit)
//! never frees or reallocates handles. The reconciler sweeps
//! still-detached nodes at the end of the commit.

use crate::error::{Error, Result};
use crate::layout::{LayoutEngine, LayoutHandle};
use crate::style::Style;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Stable arena index of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u32);

impl NodeKey {
    /// Build a key from a raw index. Intended for tests and solver
    /// contexts; the arena is the sole allocator of live keys.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// The kind of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Unique tree root, owned by the frame driver.
    Root,
    /// Generic flex container.
    Box,
    /// Inline text container with a measure callback.
    Text,
    /// Collapsed inline text fragment nested inside a `Text`.
    VirtualText,
    /// Raw string leaf; only valid under a `Text`/`VirtualText` chain.
    TextLeaf,
}

impl NodeKind {
    /// Short name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Box => "Box",
            Self::Text => "Text",
            Self::VirtualText => "VirtualText",
            Self::TextLeaf => "TextLeaf",
        }
    }

    /// Whether this kind may only exist inside a text context.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::VirtualText | Self::TextLeaf)
    }

    /// Whether this kind opens a text context for its descendants.
    #[must_use]
    pub const fn opens_text_context(self) -> bool {
        matches!(self, Self::Text | Self::VirtualText)
    }

    /// Whether nodes of this kind own a layout handle.
    #[must_use]
    pub const fn has_layout(self) -> bool {
        matches!(self, Self::Root | Self::Box | Self::Text)
    }
}

/// Opaque attribute value preserved across updates.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl AttributeValue {
    /// Truthiness for marker attributes such as `static`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Transform applied to a Text node's composed output, line by line.
pub type TextTransform = Rc<dyn Fn(&str, usize) -> String>;

/// The attribute key marking append-only static subtrees.
pub const STATIC_ATTR: &str = "static";

/// Attribute keys that collide with structural props and are rejected.
const RESERVED_ATTRS: [&str; 2] = ["style", "children"];

/// One node of the host tree.
pub struct Node {
    pub kind: NodeKind,
    pub style: Style,
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Solver handle; `None` for virtual text and text leaves.
    pub layout: Option<LayoutHandle>,
    /// Back edge to the parent; never owning.
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    /// Per-line output transform (Text nodes only).
    pub transform: Option<TextTransform>,
    /// Leaf text content (TextLeaf nodes only).
    pub text: String,
    /// Set on the root when a static subtree grows; cleared by the
    /// immediate-render path of the same commit.
    pub static_dirty: bool,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("layout", &self.layout.is_some())
            .field("transform", &self.transform.is_some())
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            style: Style::default(),
            attributes: BTreeMap::new(),
            layout: None,
            parent: None,
            children: Vec::new(),
            transform: None,
            text: String::new(),
            static_dirty: false,
        }
    }

    /// Whether this node carries the static marker attribute.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes
            .get(STATIC_ATTR)
            .is_some_and(AttributeValue::is_truthy)
    }
}

/// Slotted node storage with free-list reuse and stable keys.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
}

impl NodeArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node, reusing a free slot when available.
    pub fn insert(&mut self, node: Node) -> NodeKey {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(node);
            NodeKey(index)
        } else {
            self.slots.push(Some(node));
            NodeKey((self.slots.len() - 1) as u32)
        }
    }

    /// Borrow a node.
    pub fn get(&self, key: NodeKey) -> Result<&Node> {
        self.slots
            .get(key.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::NodeGone(key))
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.slots
            .get_mut(key.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::NodeGone(key))
    }

    /// Remove a node, freeing its slot.
    pub fn remove(&mut self, key: NodeKey) -> Result<Node> {
        let slot = self
            .slots
            .get_mut(key.0 as usize)
            .ok_or(Error::NodeGone(key))?;
        let node = slot.take().ok_or(Error::NodeGone(key))?;
        self.free.push(key.0);
        Ok(node)
    }

    /// Whether a key refers to a live node.
    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.slots
            .get(key.0 as usize)
            .is_some_and(Option::is_some)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The host tree: arena, layout engine, and the root node.
pub struct Tree {
    pub arena: NodeArena,
    pub layout: LayoutEngine,
    pub root: NodeKey,
}

impl Tree {
    /// Create a tree with a fresh root. The root stacks its children
    /// vertically, which is what a terminal surface wants.
    pub fn new() -> Result<Self> {
        let mut arena = NodeArena::new();
        let mut layout = LayoutEngine::new();

        let mut root = Node::new(NodeKind::Root);
        root.style.flex_direction = Some(crate::style::FlexDirection::Column);
        let handle = layout.create_handle()?;
        root.layout = Some(handle);
        let root_key = arena.insert(root);
        layout.apply_style(handle, &arena.get(root_key)?.style)?;

        Ok(Self {
            arena,
            layout,
            root: root_key,
        })
    }

    /// Allocate a node of the given kind, with a layout handle unless
    /// the kind is inline. Text nodes get their measure source
    /// installed immediately.
    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeKey> {
        let mut node = Node::new(kind);
        let handle = if kind.has_layout() {
            Some(self.layout.create_handle()?)
        } else {
            None
        };
        node.layout = handle;
        let key = self.arena.insert(node);
        if let Some(handle) = handle {
            if kind == NodeKind::Text {
                self.layout.set_measure_source(handle, key)?;
            }
        }
        Ok(key)
    }

    /// Borrow a node.
    pub fn node(&self, key: NodeKey) -> Result<&Node> {
        self.arena.get(key)
    }

    /// Append `child` as the last child of `parent`, detaching it from
    /// any current parent first.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.check_containment(parent, child)?;
        self.detach(child)?;

        self.arena.get_mut(parent)?.children.push(child);
        self.arena.get_mut(child)?.parent = Some(parent);
        self.mirror_insert(parent, child)?;

        self.after_structural_change(parent, child)?;
        Ok(())
    }

    /// Insert `child` into `parent` immediately before `anchor`.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        anchor: NodeKey,
    ) -> Result<()> {
        self.check_containment(parent, child)?;
        self.detach(child)?;

        let index = self
            .arena
            .get(parent)?
            .children
            .iter()
            .position(|&k| k == anchor)
            .ok_or(Error::NodeGone(anchor))?;
        self.arena.get_mut(parent)?.children.insert(index, child);
        self.arena.get_mut(child)?.parent = Some(parent);
        self.mirror_insert(parent, child)?;

        self.after_structural_change(parent, child)?;
        Ok(())
    }

    /// Detach `child` from `parent`.
    ///
    /// The layout handle stays alive: destruction happens at the end of
    /// the commit for nodes that were not reinserted.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        if self.arena.get(child)?.parent != Some(parent) {
            return Err(Error::NodeGone(child));
        }
        // A shrinking static region still has to repaint its remainder.
        self.note_static_mutation(parent, child)?;
        self.detach(child)?;
        self.mark_text_dirty(parent)?;
        Ok(())
    }

    /// Set or remove an attribute. `None` removes; `style` and
    /// `children` are reserved keys.
    pub fn set_attribute(
        &mut self,
        node: NodeKey,
        key: &str,
        value: Option<AttributeValue>,
    ) -> Result<()> {
        if RESERVED_ATTRS.contains(&key) {
            return Err(Error::ReservedAttribute(key.to_string()));
        }
        let is_static_marker = key == STATIC_ATTR;
        let entry = self.arena.get_mut(node)?;
        match value {
            Some(value) => {
                entry.attributes.insert(key.to_string(), value);
            }
            None => {
                entry.attributes.remove(key);
            }
        }
        if is_static_marker {
            self.arena.get_mut(self.root)?.static_dirty = true;
        }
        Ok(())
    }

    /// Shallow-merge a style patch into a node and push the result to
    /// the layout solver in one call.
    pub fn set_style(&mut self, node: NodeKey, patch: &Style) -> Result<()> {
        let entry = self.arena.get_mut(node)?;
        entry.style.merge(patch);
        self.push_style(node)
    }

    /// Replace a node's style record wholesale and push it to the
    /// solver. Used by the reconciler's commit, where the new props
    /// carry the complete style.
    pub fn replace_style(&mut self, node: NodeKey, style: Style) -> Result<()> {
        self.arena.get_mut(node)?.style = style;
        self.push_style(node)
    }

    fn push_style(&mut self, node: NodeKey) -> Result<()> {
        let entry = self.arena.get(node)?;
        if let Some(handle) = entry.layout {
            let style = entry.style.clone();
            self.layout.apply_style(handle, &style)?;
        } else {
            // Inline nodes have no handle; a text style change still
            // invalidates the containing Text measurement.
            self.mark_text_dirty(node)?;
        }
        Ok(())
    }

    /// Replace the content of a text leaf.
    pub fn set_text(&mut self, node: NodeKey, text: &str) -> Result<()> {
        let entry = self.arena.get_mut(node)?;
        if entry.kind != NodeKind::TextLeaf {
            return Err(Error::KindMismatch {
                expected: "TextLeaf",
                found: entry.kind.as_str(),
            });
        }
        entry.text = text.to_string();
        self.mark_text_dirty(node)?;
        if self.in_static_subtree(node)? {
            self.arena.get_mut(self.root)?.static_dirty = true;
        }
        Ok(())
    }

    /// Install or clear a Text node's output transform.
    pub fn set_transform(&mut self, node: NodeKey, transform: Option<TextTransform>) -> Result<()> {
        self.arena.get_mut(node)?.transform = transform;
        Ok(())
    }

    /// Whether the root's static-dirty flag is set.
    pub fn static_dirty(&self) -> Result<bool> {
        Ok(self.arena.get(self.root)?.static_dirty)
    }

    /// Clear the root's static-dirty flag.
    pub fn clear_static_dirty(&mut self) -> Result<()> {
        self.arena.get_mut(self.root)?.static_dirty = false;
        Ok(())
    }

    /// Concatenate the raw text of a subtree's leaves, without styling
    /// or transforms. This is what the measure callback sees.
    pub fn squash_plain(&self, key: NodeKey) -> Result<String> {
        Ok(squash_plain(&self.arena, key))
    }

    /// Run one layout pass with the given outer width. Text nodes are
    /// measured by squashing their descendant leaves and applying their
    /// wrap mode; the solver memoises results until the next mutation.
    pub fn compute_layout(&mut self, available_width: u16) -> Result<()> {
        let root_handle = self
            .arena
            .get(self.root)?
            .layout
            .ok_or(Error::NodeGone(self.root))?;

        let arena = &self.arena;
        self.layout
            .compute(root_handle, available_width, |key, known, space| {
                let text = squash_plain(arena, key);
                let mode = arena
                    .get(key)
                    .map(|node| node.style.wrap_mode())
                    .unwrap_or_default();
                let max_width = known.width.map_or_else(
                    || match space.width {
                        taffy::prelude::AvailableSpace::Definite(w) => w.floor() as usize,
                        _ => usize::MAX,
                    },
                    |w| w.floor() as usize,
                );
                let (width, height) = crate::text::measure(&text, max_width, mode);
                taffy::prelude::Size {
                    width: width as f32,
                    height: height as f32,
                }
            })
    }

    /// Recursively destroy a subtree: every layout handle exactly once,
    /// then the arena slots.
    pub fn free_subtree(&mut self, key: NodeKey) -> Result<()> {
        let children = self.arena.get(key)?.children.clone();
        for child in children {
            self.free_subtree(child)?;
        }
        let node = self.arena.remove(key)?;
        if let Some(handle) = node.layout {
            self.layout.free(handle)?;
        }
        Ok(())
    }

    /// Remove `child` from its current parent, if any, unlinking the
    /// solver mirror. The node itself stays alive.
    pub fn detach(&mut self, child: NodeKey) -> Result<()> {
        let Some(parent) = self.arena.get(child)?.parent else {
            return Ok(());
        };

        let child_handle = self.arena.get(child)?.layout;
        let parent_handle = self.arena.get(parent)?.layout;
        if let (Some(ph), Some(ch)) = (parent_handle, child_handle) {
            self.layout.remove_child(ph, ch)?;
        }

        let siblings = &mut self.arena.get_mut(parent)?.children;
        siblings.retain(|&k| k != child);
        self.arena.get_mut(child)?.parent = None;
        Ok(())
    }

    /// Text-kind containment: a text context admits only inline kinds,
    /// and leaves admit nothing.
    fn check_containment(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let parent_kind = self.arena.get(parent)?.kind;
        let child_kind = self.arena.get(child)?.kind;

        if parent_kind == NodeKind::TextLeaf {
            return Err(Error::KindMismatch {
                expected: "container",
                found: "TextLeaf",
            });
        }
        if parent_kind.opens_text_context()
            && !(child_kind.is_inline() || child_kind == NodeKind::Text)
        {
            return Err(Error::KindMismatch {
                expected: "inline text",
                found: child_kind.as_str(),
            });
        }
        if child_kind == NodeKind::TextLeaf && !parent_kind.opens_text_context() {
            return Err(Error::TextOutsideText);
        }
        Ok(())
    }

    /// Mirror an insertion into the solver at the layout index matching
    /// the child's position (siblings without handles are skipped).
    fn mirror_insert(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let child_handle = self.arena.get(child)?.layout;
        let parent_handle = self.arena.get(parent)?.layout;
        let (Some(ph), Some(ch)) = (parent_handle, child_handle) else {
            return Ok(());
        };

        let children = &self.arena.get(parent)?.children;
        let position = children
            .iter()
            .position(|&k| k == child)
            .ok_or(Error::NodeGone(child))?;
        let layout_index = children[..position]
            .iter()
            .filter(|&&k| {
                self.arena
                    .get(k)
                    .map(|n| n.layout.is_some())
                    .unwrap_or(false)
            })
            .count();

        self.layout.insert_child_at(ph, layout_index, ch)?;
        Ok(())
    }

    fn after_structural_change(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.note_static_mutation(parent, child)?;
        self.mark_text_dirty(parent)?;
        Ok(())
    }

    fn note_static_mutation(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        if self.in_static_subtree(parent)? || self.arena.get(child)?.is_static() {
            self.arena.get_mut(self.root)?.static_dirty = true;
        }
        Ok(())
    }

    /// Whether `key` or any of its ancestors carries the static marker.
    fn in_static_subtree(&self, key: NodeKey) -> Result<bool> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.arena.get(k)?;
            if node.is_static() {
                return Ok(true);
            }
            current = node.parent;
        }
        Ok(false)
    }

    /// Invalidate the measurement of the nearest enclosing Text node.
    fn mark_text_dirty(&mut self, from: NodeKey) -> Result<()> {
        let mut current = Some(from);
        while let Some(k) = current {
            let node = self.arena.get(k)?;
            if node.kind == NodeKind::Text {
                if let Some(handle) = node.layout {
                    self.layout.mark_dirty(handle)?;
                }
                return Ok(());
            }
            current = node.parent;
        }
        Ok(())
    }
}

/// Arena-level text squash, usable from inside the layout measure
/// closure where only the arena is borrowed.
#[must_use]
pub fn squash_plain(arena: &NodeArena, key: NodeKey) -> String {
    let Ok(node) = arena.get(key) else {
        return String::new();
    };
    if node.kind == NodeKind::TextLeaf {
        return node.text.clone();
    }
    let mut out = String::new();
    for &child in &node.children {
        out.push_str(&squash_plain(arena, child));
    }
    out
}
