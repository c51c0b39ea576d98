//! HTML import (html5ever via `scraper`) and markup serialization.

use scraper::{Html, Node};

use crate::errors::DomResult;
use crate::node::{Document, NodeId, NodeKind, ShadowMode};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

impl Document {
    /// Parses a full HTML document.
    ///
    /// A `<template shadowrootmode="open|closed">` becomes the shadow root of its parent
    /// element (declarative shadow DOM); the template element itself is dropped.
    pub fn parse_html(source: &str) -> DomResult<Self> {
        let parsed = Html::parse_document(source);
        if !parsed.errors.is_empty() {
            tracing::debug!(errors = parsed.errors.len(), "html parsed with recoverable errors");
        }

        let mut doc = Document::new();
        let mut stack = vec![(parsed.tree.root(), doc.root())];

        while let Some((source_node, parent)) = stack.pop() {
            for child in source_node.children() {
                match child.value() {
                    Node::Element(element) => {
                        if element.name() == "template" {
                            if let Some(mode) = element.attr("shadowrootmode") {
                                if let Some(shadow) = doc.declarative_shadow(parent, mode)? {
                                    stack.push((child, shadow));
                                    continue;
                                }
                            }
                        }
                        let id = doc.create_element(element.name());
                        for (name, value) in element.attrs() {
                            doc.set_attribute(id, name, value)?;
                        }
                        doc.append_child(parent, id)?;
                        stack.push((child, id));
                    }
                    Node::Text(text) => {
                        let content: &str = text;
                        let id = doc.create_text(content);
                        doc.append_child(parent, id)?;
                    }
                    Node::Comment(comment) => {
                        let content: &str = comment;
                        let id = doc.create_comment(content);
                        doc.append_child(parent, id)?;
                    }
                    // template contents
                    Node::Fragment => stack.push((child, parent)),
                    _ => {}
                }
            }
        }
        Ok(doc)
    }

    /// Attaches a declarative shadow root to `host` when possible; `None` means the
    /// template is kept as an ordinary element.
    fn declarative_shadow(&mut self, host: NodeId, mode: &str) -> DomResult<Option<NodeId>> {
        let mode = match mode.to_ascii_lowercase().as_str() {
            "open" => ShadowMode::Open,
            "closed" => ShadowMode::Closed,
            _ => return Ok(None),
        };
        if !self.is_element(host) || self.shadow_root(host).is_some() {
            return Ok(None);
        }
        self.attach_shadow(host, mode).map(Some)
    }

    /// Light-tree markup of `node`, like the DOM `outerHTML`. Shadow trees are not included.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.local_name);
                for attr in &data.attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&attr.value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&data.local_name.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(&data.local_name);
                out.push('>');
            }
            NodeKind::Document | NodeKind::ShadowRoot { .. } => {
                for child in self.children(node) {
                    self.write_html(*child, out);
                }
            }
        }
    }

    /// Markup used to show a node in reports: the full outer HTML, or only the opening tag
    /// when that is longer than `max_len`.
    pub fn source_snippet(&self, node: NodeId, max_len: usize) -> String {
        let mut html = self.outer_html(node);
        if html.len() > max_len {
            if let Some(end) = html.find('>') {
                html.truncate(end + 1);
            }
        }
        html
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_builds_document_structure() {
        let doc = Document::parse_html(
            r#"<!doctype html><html lang="en"><body><p class="a">Hi &amp; bye</p><!-- note --></body></html>"#,
        )
        .unwrap();
        let html = doc.document_element().unwrap();
        assert_eq!(doc.local_name(html), Some("html"));
        assert_eq!(doc.attribute(html, "lang"), Some("en"));

        let p = doc
            .descendants(doc.root())
            .into_iter()
            .find(|n| doc.local_name(*n) == Some("p"))
            .unwrap();
        assert_eq!(doc.text_content(p), "Hi & bye");
        assert_eq!(doc.outer_html(p), r#"<p class="a">Hi &amp; bye</p>"#);
    }

    #[test]
    fn test_declarative_shadow_root() {
        let doc = Document::parse_html(
            r#"<html><body><my-el id="host"><template shadowrootmode="open"><span id="inner"></span></template><b>light</b></my-el></body></html>"#,
        )
        .unwrap();
        let host = doc
            .descendants(doc.root())
            .into_iter()
            .find(|n| doc.attribute(*n, "id") == Some("host"))
            .unwrap();
        let shadow = doc.shadow_root(host).unwrap();
        let inner: Vec<_> = doc.element_children(shadow).collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(doc.attribute(inner[0], "id"), Some("inner"));
        let light: Vec<_> = doc.element_children(host).collect();
        assert_eq!(light.len(), 1);
        assert_eq!(doc.local_name(light[0]), Some("b"));
    }

    #[test]
    fn test_source_snippet_truncates_to_opening_tag() {
        let doc = Document::parse_html(r#"<html><body><div id="long">0123456789</div></body></html>"#)
            .unwrap();
        let div = doc
            .descendants(doc.root())
            .into_iter()
            .find(|n| doc.local_name(*n) == Some("div"))
            .unwrap();
        assert_eq!(doc.source_snippet(div, 300), r#"<div id="long">0123456789</div>"#);
        assert_eq!(doc.source_snippet(div, 10), r#"<div id="long">"#);
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let source = r#"<html><body><div role="note" aria-label="x" title="t"></div></body></html>"#;
        for _ in 0..10 {
            let doc = Document::parse_html(source).unwrap();
            let div = doc
                .descendants(doc.root())
                .into_iter()
                .find(|n| doc.local_name(*n) == Some("div"))
                .unwrap();
            assert_eq!(
                doc.outer_html(div),
                r#"<div role="note" aria-label="x" title="t"></div>"#
            );
        }
    }

    #[test]
    fn test_shadow_root_keeps_nested_template_content() {
        let doc = Document::parse_html(
            r#"<div id="host"><template shadowrootmode="open"><p><i>y</i></p></template></div>"#,
        )
        .unwrap();
        let host = doc
            .descendants(doc.root())
            .into_iter()
            .find(|n| doc.attribute(*n, "id") == Some("host"))
            .unwrap();
        let shadow = doc.shadow_root(host).unwrap();
        assert_eq!(doc.outer_html(shadow), "<p><i>y</i></p>");
    }
}
