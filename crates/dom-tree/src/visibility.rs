//! Hidden-state predicate.

use crate::flat::{FlatTree, VNodeId};
use crate::node::{Document, NodeId};

/// Decides whether a flattened-tree element is hidden from users.
pub trait VisibilityProbe: Send + Sync {
    fn is_hidden(&self, tree: &FlatTree<'_>, node: VNodeId) -> bool;
}

/// Elements that never render.
const NON_RENDERED: &[&str] = &["head", "script", "style", "template", "noscript"];

/// Visibility from markup alone: the `hidden` attribute, inline `display: none` or
/// `visibility: hidden`, and non-rendered elements, on the node or any flattened ancestor.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineVisibility;

impl InlineVisibility {
    fn hides_itself(doc: &Document, node: NodeId) -> bool {
        if doc.has_attribute(node, "hidden") {
            return true;
        }
        if doc
            .local_name(node)
            .is_some_and(|name| NON_RENDERED.contains(&name))
        {
            return true;
        }
        doc.attribute(node, "style").is_some_and(style_hides)
    }
}

impl VisibilityProbe for InlineVisibility {
    fn is_hidden(&self, tree: &FlatTree<'_>, node: VNodeId) -> bool {
        let doc = tree.document();
        let mut current = Some(node);
        while let Some(id) = current {
            if Self::hides_itself(doc, tree.node_of(id)) {
                return true;
            }
            current = tree.parent(id);
        }
        false
    }
}

fn style_hides(style: &str) -> bool {
    style.split(';').any(|declaration| {
        let Some((property, value)) = declaration.split_once(':') else {
            return false;
        };
        let value = value.trim().trim_end_matches("!important").trim();
        match property.trim().to_ascii_lowercase().as_str() {
            "display" => value.eq_ignore_ascii_case("none"),
            "visibility" => {
                value.eq_ignore_ascii_case("hidden") || value.eq_ignore_ascii_case("collapse")
            }
            _ => false,
        }
    })
}
