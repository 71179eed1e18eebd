//! Host side of the retained-mode diffing runtime.
//!
//! The surrounding framework diffs element snapshots and delivers the
//! resulting mutations through the operations here: instance creation,
//! child list edits, prop diffs, and text updates. The reconciler owns
//! the node [`Tree`] and guarantees the commit invariants: text leaves
//! exist only inside text contexts, solver handles stay mirrored with
//! child lists, and a handle is destroyed exactly once, at the end of
//! the commit in which its node was detached for good.
//!
//! Mutations run during the commit phase; the frame driver's
//! `reset_after_commit` finishes each commit by sweeping detached
//! subtrees and driving one repaint.

use crate::dom::{AttributeValue, NodeKey, NodeKind, TextTransform, Tree};
use crate::error::{Error, Result};
use crate::style::Style;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Element types the host framework can instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    /// Generic flex container.
    Box,
    /// Inline text. Becomes virtual text when created inside a text
    /// context.
    Text,
}

/// Host context propagated down the element tree during renders.
///
/// Identity is value-based: the runtime skips re-propagation whenever
/// the flag does not change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostContext {
    /// Whether the nearest relevant ancestor is a text container.
    pub inside_text: bool,
}

/// Props delivered by the framework for one element.
#[derive(Clone, Default)]
pub struct Props {
    pub style: Style,
    pub transform: Option<TextTransform>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("style", &self.style)
            .field("transform", &self.transform.is_some())
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Props {
    /// Props with only a style.
    #[must_use]
    pub fn with_style(style: Style) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Add a transform.
    #[must_use]
    pub fn transform(mut self, transform: TextTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// The differing keys between two prop records.
#[derive(Clone, Default)]
pub struct UpdatePayload {
    /// Complete replacement style when any field differs, so layout can
    /// be patched in a single call.
    pub style: Option<Style>,
    /// Attribute edits; `None` removes a key present only in the old
    /// props.
    pub attributes: Vec<(String, Option<AttributeValue>)>,
    /// Transform change (outer `None` = unchanged).
    pub transform: Option<Option<TextTransform>>,
}

impl fmt::Debug for UpdatePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePayload")
            .field("style", &self.style.is_some())
            .field("attributes", &self.attributes)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Scheduling priority exposed to the host framework's scheduler.
///
/// These are a batching back-channel only; they do not affect the
/// correctness of commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdatePriority {
    /// Discrete user events (keypresses).
    Discrete,
    /// Continuous events (resize streams).
    Continuous,
    /// Everything else.
    #[default]
    Default,
}

thread_local! {
    static CURRENT_PRIORITY: Cell<Option<UpdatePriority>> = const { Cell::new(None) };
}

/// The current event priority, or the default when none is set.
#[must_use]
pub fn get_current_event_priority() -> UpdatePriority {
    CURRENT_PRIORITY.with(|slot| slot.get()).unwrap_or_default()
}

/// Resolve the priority for the update being scheduled.
#[must_use]
pub fn resolve_update_priority() -> UpdatePriority {
    get_current_event_priority()
}

/// Set or clear the current update priority.
pub fn set_current_update_priority(priority: Option<UpdatePriority>) {
    CURRENT_PRIORITY.with(|slot| slot.set(priority));
}

/// The reconciler: owns the node tree and applies mutations.
pub struct Reconciler {
    /// The host tree. Exclusively owned; only reconciler operations and
    /// the commit hook mutate it.
    pub tree: Tree,
    /// Nodes detached during the current commit, pending the sweep.
    detached: Vec<NodeKey>,
}

impl Reconciler {
    /// Create a reconciler with a fresh tree.
    pub fn new() -> Result<Self> {
        Ok(Self {
            tree: Tree::new()?,
            detached: Vec::new(),
        })
    }

    /// The container (root) node.
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.tree.root
    }

    /// The initial host context.
    #[must_use]
    pub fn get_root_host_context(&self) -> HostContext {
        HostContext { inside_text: false }
    }

    /// The context a child renders under. Entering a text element flips
    /// the flag; the value is otherwise preserved so the runtime can
    /// skip propagation.
    #[must_use]
    pub fn get_child_host_context(
        &self,
        _parent: HostContext,
        element: ElementType,
    ) -> HostContext {
        HostContext {
            inside_text: element == ElementType::Text,
        }
    }

    /// Allocate a node for an element and apply its initial props.
    ///
    /// Inside a text context, text elements collapse to virtual text so
    /// they do not participate in layout independently.
    pub fn create_instance(
        &mut self,
        element: ElementType,
        props: &Props,
        context: HostContext,
    ) -> Result<NodeKey> {
        let kind = match element {
            ElementType::Box => NodeKind::Box,
            ElementType::Text if context.inside_text => NodeKind::VirtualText,
            ElementType::Text => NodeKind::Text,
        };
        let key = self.tree.create_node(kind)?;
        trace!(?key, kind = kind.as_str(), "create instance");

        self.tree.replace_style(key, props.style.clone())?;
        if let Some(transform) = &props.transform {
            self.tree.set_transform(key, Some(Rc::clone(transform)))?;
        }
        for (attr, value) in &props.attributes {
            self.tree.set_attribute(key, attr, Some(value.clone()))?;
        }
        Ok(key)
    }

    /// Allocate a text leaf. Fatal outside a text context.
    pub fn create_text_instance(&mut self, text: &str, context: HostContext) -> Result<NodeKey> {
        if !context.inside_text {
            return Err(Error::TextOutsideText);
        }
        let key = self.tree.create_node(NodeKind::TextLeaf)?;
        self.tree.set_text(key, text)?;
        Ok(key)
    }

    /// Append a child during initial mounting.
    pub fn append_initial_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.append_child(parent, child)
    }

    /// Append a child, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.reattach(child);
        self.tree.append_child(parent, child)
    }

    /// Append a child directly to the root container.
    pub fn append_child_to_container(&mut self, child: NodeKey) -> Result<()> {
        let root = self.tree.root;
        self.append_child(root, child)
    }

    /// Insert `child` before `anchor`.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        anchor: NodeKey,
    ) -> Result<()> {
        self.reattach(child);
        self.tree.insert_before(parent, child, anchor)
    }

    /// Insert `child` before `anchor` at the root container.
    pub fn insert_in_container_before(&mut self, child: NodeKey, anchor: NodeKey) -> Result<()> {
        let root = self.tree.root;
        self.insert_before(root, child, anchor)
    }

    /// Detach a child. Its layout handles stay alive until the end of
    /// the commit, so a reinsertion (keyed reorder) keeps them.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.tree.remove_child(parent, child)?;
        self.detached.push(child);
        Ok(())
    }

    /// Detach a child of the root container.
    pub fn remove_child_from_container(&mut self, child: NodeKey) -> Result<()> {
        let root = self.tree.root;
        self.remove_child(root, child)
    }

    /// Diff two prop records.
    ///
    /// Identical references skip (the framework handles that); here,
    /// keys present only in the old props map to removals, keys whose
    /// value differs are included, and an empty diff returns `None`.
    /// The style is sub-diffed separately so layout is patched in one
    /// call.
    #[must_use]
    pub fn prepare_update(&self, old: &Props, new: &Props) -> Option<UpdatePayload> {
        let style = (old.style != new.style).then(|| new.style.clone());

        let mut attributes = Vec::new();
        for (key, old_value) in &old.attributes {
            match new.attributes.get(key) {
                None => attributes.push((key.clone(), None)),
                Some(new_value) if new_value != old_value => {
                    attributes.push((key.clone(), Some(new_value.clone())));
                }
                Some(_) => {}
            }
        }
        for (key, new_value) in &new.attributes {
            if !old.attributes.contains_key(key) {
                attributes.push((key.clone(), Some(new_value.clone())));
            }
        }

        let transform_unchanged = match (&old.transform, &new.transform) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        let transform = (!transform_unchanged).then(|| new.transform.clone());

        if style.is_none() && attributes.is_empty() && transform.is_none() {
            return None;
        }
        Some(UpdatePayload {
            style,
            attributes,
            transform,
        })
    }

    /// Apply a prepared payload to a node.
    pub fn commit_update(&mut self, node: NodeKey, payload: &UpdatePayload) -> Result<()> {
        if let Some(style) = &payload.style {
            self.tree.replace_style(node, style.clone())?;
        }
        for (key, value) in &payload.attributes {
            self.tree.set_attribute(node, key, value.clone())?;
        }
        if let Some(transform) = &payload.transform {
            self.tree.set_transform(node, transform.clone())?;
        }
        Ok(())
    }

    /// Clear a text leaf's content.
    pub fn reset_text_content(&mut self, node: NodeKey) -> Result<()> {
        self.tree.set_text(node, "")
    }

    /// Replace a text leaf's content.
    pub fn commit_text_update(&mut self, node: NodeKey, text: &str) -> Result<()> {
        self.tree.set_text(node, text)
    }

    /// Called before the framework applies a mutation batch. The tree
    /// needs no preparation, but the hook is part of the contract.
    pub fn prepare_for_commit(&mut self) {}

    /// Free every subtree detached this commit and not reattached.
    /// Handles are destroyed here and nowhere else, exactly once.
    pub fn sweep_detached(&mut self) -> Result<()> {
        let detached = std::mem::take(&mut self.detached);
        for key in detached {
            // May already be gone as part of an enclosing freed subtree.
            if !self.tree.arena.contains(key) {
                continue;
            }
            if self.tree.node(key)?.parent.is_none() {
                trace!(?key, "freeing detached subtree");
                self.tree.free_subtree(key)?;
            }
        }
        Ok(())
    }

    fn reattach(&mut self, child: NodeKey) {
        self.detached.retain(|&key| key != child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        Reconciler::new().unwrap()
    }

    fn text_with_leaf(r: &mut Reconciler, content: &str) -> (NodeKey, NodeKey) {
        let root_ctx = r.get_root_host_context();
        let text_ctx = r.get_child_host_context(root_ctx, ElementType::Text);
        let text = r
            .create_instance(ElementType::Text, &Props::default(), root_ctx)
            .unwrap();
        let leaf = r.create_text_instance(content, text_ctx).unwrap();
        r.append_initial_child(text, leaf).unwrap();
        (text, leaf)
    }

    #[test]
    fn test_create_text_inside_text_becomes_virtual() {
        let mut r = reconciler();
        let root_ctx = r.get_root_host_context();
        let text_ctx = r.get_child_host_context(root_ctx, ElementType::Text);

        let outer = r
            .create_instance(ElementType::Text, &Props::default(), root_ctx)
            .unwrap();
        let inner = r
            .create_instance(ElementType::Text, &Props::default(), text_ctx)
            .unwrap();

        assert_eq!(r.tree.node(outer).unwrap().kind, NodeKind::Text);
        assert_eq!(r.tree.node(inner).unwrap().kind, NodeKind::VirtualText);
    }

    #[test]
    fn test_text_leaf_outside_text_context_fails() {
        let mut r = reconciler();
        let ctx = r.get_root_host_context();
        assert!(matches!(
            r.create_text_instance("oops", ctx),
            Err(Error::TextOutsideText)
        ));
    }

    #[test]
    fn test_host_context_identity() {
        let r = reconciler();
        let root_ctx = r.get_root_host_context();
        let box_ctx = r.get_child_host_context(root_ctx, ElementType::Box);
        // Same value when the flag does not change, so propagation can
        // be skipped.
        assert_eq!(root_ctx, box_ctx);
        let text_ctx = r.get_child_host_context(root_ctx, ElementType::Text);
        assert_ne!(root_ctx, text_ctx);
    }

    #[test]
    fn test_prepare_update_equal_props_is_none() {
        let r = reconciler();
        let props = Props::with_style(Style::builder().color("red").build())
            .attribute("key", "a");
        assert!(r.prepare_update(&props, &props.clone()).is_none());
    }

    #[test]
    fn test_prepare_update_style_diff() {
        let r = reconciler();
        let old = Props::with_style(Style::builder().color("red").build());
        let new = Props::with_style(Style::builder().color("blue").build());
        let payload = r.prepare_update(&old, &new).unwrap();
        assert!(payload.style.is_some());
        assert!(payload.attributes.is_empty());
    }

    #[test]
    fn test_prepare_update_attribute_removal_and_add() {
        let r = reconciler();
        let old = Props::default().attribute("gone", 1i64).attribute("kept", "x");
        let new = Props::default().attribute("kept", "y").attribute("fresh", true);
        let payload = r.prepare_update(&old, &new).unwrap();

        let mut edits = payload.attributes.clone();
        edits.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            edits,
            vec![
                ("fresh".to_string(), Some(AttributeValue::Bool(true))),
                ("gone".to_string(), None),
                ("kept".to_string(), Some(AttributeValue::Str("y".into()))),
            ]
        );
    }

    #[test]
    fn test_prepare_update_transform_by_identity() {
        let r = reconciler();
        let f: TextTransform = Rc::new(|s: &str, _| s.to_string());
        let old = Props::default().transform(Rc::clone(&f));
        let same = Props::default().transform(Rc::clone(&f));
        assert!(r.prepare_update(&old, &same).is_none());

        let other = Props::default().transform(Rc::new(|s: &str, _| s.to_uppercase()));
        let payload = r.prepare_update(&old, &other).unwrap();
        assert!(payload.transform.is_some());
    }

    #[test]
    fn test_commit_update_applies_payload() {
        let mut r = reconciler();
        let ctx = r.get_root_host_context();
        let node = r
            .create_instance(
                ElementType::Box,
                &Props::with_style(Style::builder().width(5u32).build()),
                ctx,
            )
            .unwrap();
        r.append_child_to_container(node).unwrap();

        let payload = UpdatePayload {
            style: Some(Style::builder().width(9u32).build()),
            attributes: vec![("marker".to_string(), Some(AttributeValue::Bool(true)))],
            transform: None,
        };
        r.commit_update(node, &payload).unwrap();

        let n = r.tree.node(node).unwrap();
        assert_eq!(n.style.width, Some(crate::style::Dimension::Cells(9)));
        assert!(n.attributes.contains_key("marker"));
    }

    #[test]
    fn test_text_update() {
        let mut r = reconciler();
        let (text, leaf) = text_with_leaf(&mut r, "before");
        r.append_child_to_container(text).unwrap();

        r.commit_text_update(leaf, "after").unwrap();
        assert_eq!(r.tree.squash_plain(text).unwrap(), "after");

        r.reset_text_content(leaf).unwrap();
        assert_eq!(r.tree.squash_plain(text).unwrap(), "");
    }

    #[test]
    fn test_reorder_within_commit_keeps_handles() {
        let mut r = reconciler();
        let (a, _) = text_with_leaf(&mut r, "A");
        let (b, _) = text_with_leaf(&mut r, "B");
        r.append_child_to_container(a).unwrap();
        r.append_child_to_container(b).unwrap();

        let handle_a = r.tree.node(a).unwrap().layout;
        let handle_b = r.tree.node(b).unwrap().layout;

        // Keyed reorder: remove b, insert it before a, end the commit.
        r.remove_child_from_container(b).unwrap();
        r.insert_in_container_before(b, a).unwrap();
        r.sweep_detached().unwrap();

        assert!(r.tree.arena.contains(b));
        assert_eq!(r.tree.node(a).unwrap().layout, handle_a);
        assert_eq!(r.tree.node(b).unwrap().layout, handle_b);
        let root = r.root();
        assert_eq!(r.tree.node(root).unwrap().children, vec![b, a]);
    }

    #[test]
    fn test_sweep_frees_removed_subtrees() {
        let mut r = reconciler();
        let (text, leaf) = text_with_leaf(&mut r, "bye");
        r.append_child_to_container(text).unwrap();

        r.remove_child_from_container(text).unwrap();
        r.sweep_detached().unwrap();

        assert!(!r.tree.arena.contains(text));
        assert!(!r.tree.arena.contains(leaf));
    }

    #[test]
    fn test_priorities_default_and_roundtrip() {
        set_current_update_priority(None);
        assert_eq!(get_current_event_priority(), UpdatePriority::Default);

        set_current_update_priority(Some(UpdatePriority::Discrete));
        assert_eq!(get_current_event_priority(), UpdatePriority::Discrete);
        assert_eq!(resolve_update_priority(), UpdatePriority::Discrete);

        set_current_update_priority(None);
        assert_eq!(resolve_update_priority(), UpdatePriority::Default);
    }
}
