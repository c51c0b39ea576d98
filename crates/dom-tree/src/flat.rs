//! Flattened (composed) element tree.
//!
//! The flattened tree is what rules and statistics walk: a conforming shadow host shows its
//! shadow root's children instead of its light children, and each `<slot>` inside a shadow
//! tree is replaced by the host children assigned to it (or by its fallback content).
//! Only element nodes take part. Nodes are stored in pre-order, so every subtree is a
//! contiguous index range and containment is an interval test.

use std::collections::HashMap;

use crate::errors::{DomError, DomResult};
use crate::node::{Document, NodeId, SiblingInfo};
use crate::selector::{matches_list, MatchElement, SelectorList};
use crate::shadow::is_shadow_root;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct VNodeId(usize);

impl VNodeId {
    /// Pre-order position in the flattened tree.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct VNode {
    node: NodeId,
    parent: Option<VNodeId>,
    children: Vec<VNodeId>,
    /// Index of the last node in this subtree.
    last: usize,
}

#[derive(Debug)]
pub struct FlatTree<'d> {
    doc: &'d Document,
    nodes: Vec<VNode>,
    by_node: HashMap<NodeId, VNodeId>,
}

impl<'d> FlatTree<'d> {
    pub fn build(doc: &'d Document) -> DomResult<Self> {
        let root = doc
            .document_element()
            .ok_or(DomError::MissingDocumentElement)?;

        let mut nodes: Vec<VNode> = Vec::new();
        let mut by_node = HashMap::new();
        let mut stack = vec![(root, None::<VNodeId>)];

        while let Some((node, parent)) = stack.pop() {
            let id = VNodeId(nodes.len());
            nodes.push(VNode {
                node,
                parent,
                children: Vec::new(),
                last: id.0,
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            by_node.insert(node, id);
            for child in composed_children(doc, node).into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        for index in (0..nodes.len()).rev() {
            if let Some(last_child) = nodes[index].children.last() {
                nodes[index].last = nodes[last_child.0].last;
            }
        }

        tracing::debug!(elements = nodes.len(), "flattened tree built");
        Ok(Self {
            doc,
            nodes,
            by_node,
        })
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn root(&self) -> VNodeId {
        VNodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The actual tree node behind a virtual node.
    pub fn node_of(&self, id: VNodeId) -> NodeId {
        self.nodes[id.0].node
    }

    /// Virtual node for an actual node; `None` when the node is not part of the flattened
    /// tree (non-elements, unassigned light children of a shadow host).
    pub fn virtual_of(&self, node: NodeId) -> Option<VNodeId> {
        self.by_node.get(&node).copied()
    }

    pub fn parent(&self, id: VNodeId) -> Option<VNodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: VNodeId) -> &[VNodeId] {
        &self.nodes[id.0].children
    }

    /// Inclusive containment: `a` is `b` or a flattened ancestor of `b`.
    pub fn contains(&self, a: VNodeId, b: VNodeId) -> bool {
        a.0 <= b.0 && b.0 <= self.nodes[a.0].last
    }

    /// All virtual nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = VNodeId> {
        (0..self.nodes.len()).map(VNodeId)
    }

    /// Descendants of `id` (exclusive) in pre-order.
    pub fn descendants(&self, id: VNodeId) -> impl Iterator<Item = VNodeId> {
        (id.0 + 1..=self.nodes[id.0].last).map(VNodeId)
    }

    pub fn element(&self, id: VNodeId) -> VirtualRef<'_> {
        VirtualRef { tree: self, id }
    }

    pub fn matches(&self, id: VNodeId, selector: &SelectorList) -> bool {
        matches_list(selector, self.element(id))
    }

    /// Descendants of `root` (exclusive) that match `selector` and pass `filter`, in
    /// flattened pre-order.
    pub fn query_all_filter<F>(
        &self,
        root: VNodeId,
        selector: &SelectorList,
        mut filter: F,
    ) -> Vec<VNodeId>
    where
        F: FnMut(VNodeId) -> bool,
    {
        self.descendants(root)
            .filter(|id| self.matches(*id, selector) && filter(*id))
            .collect()
    }
}

/// Children of `element` in the composed tree, with slots already expanded.
fn composed_children(doc: &Document, element: NodeId) -> Vec<NodeId> {
    let base: Vec<NodeId> = match doc.shadow_root(element) {
        Some(shadow) if is_shadow_root(doc, element) => doc.element_children(shadow).collect(),
        _ => doc.element_children(element).collect(),
    };

    let mut out = Vec::with_capacity(base.len());
    let mut pending: Vec<NodeId> = base.into_iter().rev().collect();
    while let Some(node) = pending.pop() {
        match slot_content(doc, node) {
            Some(replacement) => pending.extend(replacement.into_iter().rev()),
            None => out.push(node),
        }
    }
    out
}

/// For a `<slot>` inside a conforming shadow tree, the nodes rendered in its place.
/// Only the first slot of a given name receives assigned nodes; later ones render their
/// fallback content.
fn slot_content(doc: &Document, node: NodeId) -> Option<Vec<NodeId>> {
    if doc.local_name(node) != Some("slot") {
        return None;
    }
    let shadow = doc.root_of(node);
    let host = doc.host(shadow)?;
    if !is_shadow_root(doc, host) {
        return None;
    }
    let name = doc.attribute(node, "name").unwrap_or_default();
    let first_slot = doc.descendants(shadow).into_iter().find(|candidate| {
        doc.local_name(*candidate) == Some("slot")
            && doc.attribute(*candidate, "name").unwrap_or_default() == name
    });
    if first_slot != Some(node) {
        return Some(doc.element_children(node).collect());
    }
    let assigned: Vec<NodeId> = doc
        .element_children(host)
        .filter(|child| doc.attribute(*child, "slot").unwrap_or_default() == name)
        .collect();
    if assigned.is_empty() {
        Some(doc.element_children(node).collect())
    } else {
        Some(assigned)
    }
}

/// Flattened-tree element handle; ancestry and siblings follow the composed tree.
#[derive(Clone, Copy, Debug)]
pub struct VirtualRef<'t> {
    tree: &'t FlatTree<'t>,
    id: VNodeId,
}

impl<'t> VirtualRef<'t> {
    pub fn id(&self) -> VNodeId {
        self.id
    }

    fn node(&self) -> NodeId {
        self.tree.node_of(self.id)
    }

    fn siblings(&self) -> Option<&'t [VNodeId]> {
        let parent = self.tree.parent(self.id)?;
        Some(self.tree.children(parent))
    }
}

impl MatchElement for VirtualRef<'_> {
    fn local_name(&self) -> &str {
        self.tree.doc.local_name(self.node()).unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.tree.doc.attribute(self.node(), name)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.tree.parent(self.id)?;
        Some(Self {
            tree: self.tree,
            id: parent,
        })
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let siblings = self.siblings()?;
        let position = siblings.iter().position(|s| *s == self.id)?;
        let previous = position.checked_sub(1)?;
        Some(Self {
            tree: self.tree,
            id: siblings[previous],
        })
    }

    fn sibling_info(&self) -> Option<SiblingInfo> {
        match self.siblings() {
            Some(siblings) => {
                let position = siblings.iter().position(|s| *s == self.id)?;
                Some(SiblingInfo {
                    position: position + 1,
                    count: siblings.len(),
                })
            }
            None => Some(SiblingInfo {
                position: 1,
                count: 1,
            }),
        }
    }

    fn is_root(&self) -> bool {
        self.tree.parent(self.id).is_none()
    }

    fn is_empty(&self) -> bool {
        self.tree.doc.is_empty_node(self.node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ShadowMode;

    #[test]
    fn test_shadow_children_replace_light_children() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let host = doc.create_element("my-card");
        let light = doc.create_element("b");
        let unassigned = doc.create_element("i");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, host).unwrap();
        doc.append_child(host, light).unwrap();
        doc.append_child(host, unassigned).unwrap();
        doc.set_attribute(light, "slot", "title").unwrap();
        doc.set_attribute(unassigned, "slot", "nowhere").unwrap();

        let shadow = doc.attach_shadow(host, ShadowMode::Open).unwrap();
        let header = doc.create_element("header");
        let slot = doc.create_element("slot");
        doc.append_child(shadow, header).unwrap();
        doc.append_child(header, slot).unwrap();
        doc.set_attribute(slot, "name", "title").unwrap();

        let tree = FlatTree::build(&doc).unwrap();
        let order: Vec<NodeId> = tree.iter().map(|v| tree.node_of(v)).collect();
        assert_eq!(order, vec![html, host, header, light]);

        let vlight = tree.virtual_of(light).unwrap();
        assert_eq!(tree.parent(vlight).map(|p| tree.node_of(p)), Some(header));
        assert!(tree.contains(tree.root(), vlight));
        assert!(tree.virtual_of(unassigned).is_none());
        assert!(tree.virtual_of(slot).is_none());
    }

    #[test]
    fn test_slot_fallback_and_ignored_attachment() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let host = doc.create_element("x-box");
        let input = doc.create_element("input");
        let light = doc.create_element("span");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, host).unwrap();
        doc.append_child(html, input).unwrap();
        doc.append_child(input, light).unwrap();

        let shadow = doc.attach_shadow(host, ShadowMode::Open).unwrap();
        let slot = doc.create_element("slot");
        let fallback = doc.create_element("em");
        doc.append_child(shadow, slot).unwrap();
        doc.append_child(slot, fallback).unwrap();
        // input cannot host a shadow root: its light children stay visible
        let ignored = doc.attach_shadow(input, ShadowMode::Open).unwrap();
        let hidden = doc.create_element("p");
        doc.append_child(ignored, hidden).unwrap();

        let tree = FlatTree::build(&doc).unwrap();
        let order: Vec<NodeId> = tree.iter().map(|v| tree.node_of(v)).collect();
        assert_eq!(order, vec![html, host, fallback, input, light]);
    }

    #[test]
    fn test_query_all_filter_uses_composed_ancestry() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let host = doc.create_element("div");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, host).unwrap();
        doc.set_attribute(host, "id", "outer").unwrap();
        let shadow = doc.attach_shadow(host, ShadowMode::Open).unwrap();
        let first = doc.create_element("p");
        let second = doc.create_element("p");
        doc.append_child(shadow, first).unwrap();
        doc.append_child(shadow, second).unwrap();

        let tree = FlatTree::build(&doc).unwrap();
        let selector = SelectorList::parse("#outer > p").unwrap();
        let all = tree.query_all_filter(tree.root(), &selector, |_| true);
        assert_eq!(all.len(), 2);

        let vsecond = tree.virtual_of(second).unwrap();
        let filtered = tree.query_all_filter(tree.root(), &selector, |v| v != vsecond);
        assert_eq!(filtered, vec![tree.virtual_of(first).unwrap()]);
    }

    #[test]
    fn test_only_first_slot_of_a_name_takes_assigned_nodes() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let host = doc.create_element("my-el");
        let light = doc.create_element("b");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, host).unwrap();
        doc.append_child(host, light).unwrap();

        let shadow = doc.attach_shadow(host, ShadowMode::Open).unwrap();
        let first = doc.create_element("slot");
        let second = doc.create_element("slot");
        let fallback = doc.create_element("em");
        doc.append_child(shadow, first).unwrap();
        doc.append_child(shadow, second).unwrap();
        doc.append_child(second, fallback).unwrap();

        let tree = FlatTree::build(&doc).unwrap();
        let order: Vec<NodeId> = tree.iter().map(|v| tree.node_of(v)).collect();
        assert_eq!(order, vec![html, host, light, fallback]);

        let bold = SelectorList::parse("b").unwrap();
        assert_eq!(tree.query_all_filter(tree.root(), &bold, |_| true).len(), 1);
    }

    #[test]
    fn test_missing_document_element() {
        let doc = Document::new();
        assert_eq!(
            FlatTree::build(&doc).unwrap_err(),
            DomError::MissingDocumentElement
        );
    }
}
