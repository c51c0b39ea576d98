//! Arena-backed markup tree.
//!
//! The [`Document`] owns every node; callers hold copyable [`NodeId`] handles. Shadow roots
//! are ordinary arena nodes that are *not* children of their host: they hang off the host's
//! [`ElementData::shadow_root`] and point back through [`NodeKind::ShadowRoot::host`], so
//! light-tree traversal never crosses a shadow boundary by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DomError, DomResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowMode {
    Open,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default)]
pub struct ElementData {
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Whitespace-separated class tokens, in authored order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    ShadowRoot { host: NodeId, mode: ShadowMode },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Sibling position of an element among its parent's element children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SiblingInfo {
    /// One-based position, as used by `:nth-child`.
    pub position: usize,
    pub count: usize,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document node itself (not the `<html>` element).
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, local_name: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            local_name: local_name.to_ascii_lowercase(),
            ..ElementData::default()
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    fn check(&self, id: NodeId) -> DomResult<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::hierarchy(format!("unknown node {id}")))
        }
    }

    /// Appends `child` under `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check(parent)?;
        self.check(child)?;
        match self.nodes[child.0].kind {
            NodeKind::Document | NodeKind::ShadowRoot { .. } => {
                return Err(DomError::hierarchy(format!(
                    "node {child} cannot be inserted as a child"
                )))
            }
            _ => {}
        }
        if matches!(
            self.nodes[parent.0].kind,
            NodeKind::Text(_) | NodeKind::Comment(_)
        ) {
            return Err(DomError::hierarchy(format!(
                "node {parent} cannot have children"
            )));
        }
        if self.contains(child, parent) {
            return Err(DomError::hierarchy(format!(
                "node {child} is an ancestor of {parent}"
            )));
        }
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Sets (or replaces) an attribute. Attribute names are case-insensitive.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.check(element)?;
        let name = name.to_ascii_lowercase();
        match &mut self.nodes[element.0].kind {
            NodeKind::Element(data) => {
                match data.attributes.iter_mut().find(|attr| attr.name == name) {
                    Some(attr) => attr.value = value.to_string(),
                    None => data.attributes.push(Attribute {
                        name,
                        value: value.to_string(),
                    }),
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(element)),
        }
    }

    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> DomResult<NodeId> {
        self.check(host)?;
        match &self.nodes[host.0].kind {
            NodeKind::Element(data) if data.shadow_root.is_some() => {
                return Err(DomError::ShadowAlreadyAttached(host))
            }
            NodeKind::Element(_) => {}
            _ => return Err(DomError::NotAnElement(host)),
        }
        let shadow = self.push(NodeKind::ShadowRoot { host, mode });
        if let NodeKind::Element(data) = &mut self.nodes[host.0].kind {
            data.shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_shadow_root_node(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::ShadowRoot { .. })
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.local_name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id)
            .map(|data| data.attributes.as_slice())
            .unwrap_or_default()
    }

    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.element(id)?.shadow_root
    }

    /// Host element of a shadow root.
    pub fn host(&self, shadow: NodeId) -> Option<NodeId> {
        match self.nodes.get(shadow.0)?.kind {
            NodeKind::ShadowRoot { host, .. } => Some(host),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parent when it is an element; `None` at a shadow root or the document.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// The document or shadow root that owns `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    /// Inclusive light-tree containment: `a` is `b` or an ancestor of `b`.
    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        let mut current = Some(b);
        while let Some(node) = current {
            if node == a {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Light-tree descendants of `root` in document order, excluding `root`.
    /// Shadow trees are not entered.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn sibling_info(&self, id: NodeId) -> Option<SiblingInfo> {
        let parent = self.parent(id)?;
        let mut position = None;
        let mut count = 0;
        for sibling in self.element_children(parent) {
            count += 1;
            if sibling == id {
                position = Some(count);
            }
        }
        position.map(|position| SiblingInfo { position, count })
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let mut previous = None;
        for sibling in self.element_children(parent) {
            if sibling == id {
                return previous;
            }
            previous = Some(sibling);
        }
        None
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Text(text) = &self.nodes[id.0].kind {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = &self.nodes[node.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// True when the node has no element children and no non-whitespace text.
    pub fn is_empty_node(&self, id: NodeId) -> bool {
        self.children(id).iter().all(|child| match &self.nodes[child.0].kind {
            NodeKind::Element(_) => false,
            NodeKind::Text(text) => text.trim().is_empty(),
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let html = doc.create_element("HTML");
        let body = doc.create_element("body");
        let div = doc.create_element("div");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, body).unwrap();
        doc.append_child(body, div).unwrap();
        (doc, html, body, div)
    }

    #[test]
    fn test_builder_lowercases_names() {
        let (mut doc, html, _, div) = fixture();
        doc.set_attribute(div, "ID", "main").unwrap();
        assert_eq!(doc.local_name(html), Some("html"));
        assert_eq!(doc.attribute(div, "id"), Some("main"));
        assert_eq!(doc.document_element(), Some(html));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let (mut doc, html, _, div) = fixture();
        assert!(doc.append_child(div, html).is_err());
    }

    #[test]
    fn test_shadow_root_is_not_a_child() {
        let (mut doc, _, body, div) = fixture();
        let shadow = doc.attach_shadow(div, ShadowMode::Open).unwrap();
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();

        assert!(doc.children(div).is_empty());
        assert_eq!(doc.root_of(inner), shadow);
        assert_eq!(doc.host(shadow), Some(div));
        assert_eq!(doc.parent_element(inner), None);
        assert!(!doc.contains(body, inner));
        assert!(doc.attach_shadow(div, ShadowMode::Open).is_err());
    }

    #[test]
    fn test_sibling_info_counts_elements_only() {
        let (mut doc, _, body, div) = fixture();
        let text = doc.create_text("  ");
        let second = doc.create_element("p");
        doc.append_child(body, text).unwrap();
        doc.append_child(body, second).unwrap();

        assert_eq!(
            doc.sibling_info(second),
            Some(SiblingInfo {
                position: 2,
                count: 2
            })
        );
        assert_eq!(doc.previous_element_sibling(second), Some(div));
    }
}
