//! Shadow boundary classification.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Document, NodeId};

static CUSTOM_ELEMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_.-]*-[a-z0-9_.-]*$").expect("custom element pattern is valid")
});

/// Built-in elements allowed to host a shadow root.
const SHADOW_HOST_ELEMENTS: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "body",
    "div",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "main",
    "nav",
    "p",
    "section",
    "span",
];

/// True when `node` hosts a shadow root and may legitimately do so: a custom-element name
/// or one of the built-in hosts. Attachments on anything else are ignored when flattening.
pub fn is_shadow_root(doc: &Document, node: NodeId) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if element.shadow_root.is_none() {
        return false;
    }
    let name = element.local_name.as_str();
    CUSTOM_ELEMENT_NAME.is_match(name) || SHADOW_HOST_ELEMENTS.contains(&name)
}
