//! Unique locator synthesis.
//!
//! A locator is a selector that matches exactly one element inside the element's own root
//! (document or shadow root). For an element inside shadow trees the locator is a list:
//! one selector per root, outermost host first.
//!
//! Segments are built from the most recognisable features first: a unique id, then
//! uncommon classes, uncommon attributes and a file-name suffix of `href`/`src`, then a
//! positional `:nth-child`. "Uncommon" is judged against [`FeatureStatistics`], collected
//! once per run over the flattened tree.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use soul_a11y_dom::{escape_ident, escape_string, Document, FlatTree, NodeId, SelectorList};
use tracing::debug;

use crate::metrics;
use crate::run_context::RunContext;

/// Attributes never used as refinements.
const SKIPPED_ATTRIBUTES: &[&str] = &["class", "style", "id"];

/// Ids regenerated on every page load by embedded players.
const VOLATILE_ID_MARKER: &str = "player_uid_";

const FRIENDLY_URI_MAX_LEN: usize = 25;

/// Frequency of tag names, class tokens and attribute pairs across the flattened tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureStatistics {
    pub tags: BTreeMap<String, usize>,
    pub classes: BTreeMap<String, usize>,
    /// Keyed by `name="value"`, serialized the way it appears in a selector.
    pub attributes: BTreeMap<String, usize>,
    pub elements: usize,
}

impl FeatureStatistics {
    pub fn collect(tree: &FlatTree<'_>) -> Self {
        let doc = tree.document();
        let mut stats = Self::default();
        let mut stack = vec![tree.root()];

        while let Some(vnode) = stack.pop() {
            let node = tree.node_of(vnode);
            if let Some(element) = doc.element(node) {
                stats.elements += 1;
                *stats.tags.entry(element.local_name.clone()).or_default() += 1;
                for class in element.classes() {
                    *stats.classes.entry(class.to_string()).or_default() += 1;
                }
                for attr in element
                    .attributes
                    .iter()
                    .filter(|attr| is_refinable_attribute(&attr.name))
                {
                    *stats
                        .attributes
                        .entry(attribute_key(&attr.name, &attr.value))
                        .or_default() += 1;
                }
            }
            stack.extend(tree.children(vnode).iter().rev().copied());
        }
        stats
    }

    pub fn tag_count(&self, local_name: &str) -> usize {
        self.tags.get(local_name).copied().unwrap_or(0)
    }

    pub fn class_count(&self, class: &str) -> usize {
        self.classes.get(class).copied().unwrap_or(0)
    }

    pub fn attribute_count(&self, name: &str, value: &str) -> usize {
        self.attributes
            .get(&attribute_key(name, value))
            .copied()
            .unwrap_or(0)
    }
}

fn is_refinable_attribute(name: &str) -> bool {
    !SKIPPED_ATTRIBUTES.contains(&name) && !name.contains(':')
}

fn attribute_key(name: &str, value: &str) -> String {
    format!("{}={}", escape_ident(name), escape_string(value))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorOptions {
    /// Caller already knows the first segment is unique.
    pub is_unique: bool,
    /// Ancestor segments to include even when the selector is already unique.
    pub min_depth: usize,
    /// Build the full path up to the document or shadow root.
    pub to_root: bool,
}

/// A synthesized locator: a single selector, or one selector per root when the element
/// lives inside shadow trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Single(String),
    Shadow(Vec<String>),
}

impl Locator {
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Locator::Single(selector) => vec![selector.as_str()],
            Locator::Shadow(selectors) => selectors.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Single(selector) => write!(f, "{selector}"),
            Locator::Shadow(selectors) => write!(f, "{}", selectors.join(" >>> ")),
        }
    }
}

/// Builds the locator for `element`. Never fails: when nothing makes the selector unique
/// the best effort is returned, ending in `:root` for the document element.
pub fn get_selector(run: &RunContext<'_>, element: NodeId, options: &LocatorOptions) -> Locator {
    metrics::record_locator();
    let doc = run.document();
    if !doc.is_element(element) {
        return Locator::Single(String::new());
    }
    let stats = run.statistics();

    let mut chain = vec![element];
    let mut root = doc.root_of(element);
    while let Some(host) = doc.host(root) {
        chain.push(host);
        root = doc.root_of(host);
    }

    if chain.len() == 1 {
        return Locator::Single(generate_selector(doc, stats, element, options));
    }
    Locator::Shadow(
        chain
            .iter()
            .rev()
            .map(|node| generate_selector(doc, stats, *node, options))
            .collect(),
    )
}

/// Selector for `element` relative to its own root.
fn generate_selector(
    doc: &Document,
    stats: &FeatureStatistics,
    element: NodeId,
    options: &LocatorOptions,
) -> String {
    let scope = doc.root_of(element);
    // innermost first
    let mut parts: Vec<String> = Vec::new();
    let mut current = element;
    let mut min_depth = options.min_depth;
    let mut is_unique = options.is_unique;

    loop {
        let add_parent = match unique_id(doc, current, scope) {
            Some(id) => {
                parts.push(id);
                is_unique = true;
                min_depth > 0
            }
            None => {
                parts.push(element_segment(doc, stats, current));
                is_unique = is_unique || matches_once(doc, scope, &join_parts(&parts));
                if !is_unique && doc.parent(current) == Some(doc.root()) {
                    if let Some(segment) = parts.last_mut() {
                        segment.push_str(":root");
                    }
                }
                min_depth > 0 || !is_unique
            }
        };

        match doc.parent_element(current) {
            Some(parent) if options.to_root || add_parent => {
                current = parent;
                min_depth = min_depth.saturating_sub(1);
            }
            _ => break,
        }
    }

    let selector = join_parts(&parts);
    debug!(node = %element, %selector, unique = is_unique, "locator generated");
    selector
}

fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .rev()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" > ")
}

fn matches_once(doc: &Document, scope: NodeId, selector: &str) -> bool {
    match SelectorList::parse(selector) {
        Ok(parsed) => doc.query_all(scope, &parsed).len() == 1,
        Err(err) => {
            debug!(%selector, error = %err, "generated selector did not parse");
            false
        }
    }
}

/// `#id` when the id is stable and unique within `scope`.
fn unique_id(doc: &Document, element: NodeId, scope: NodeId) -> Option<String> {
    let id = doc.attribute(element, "id").filter(|id| !id.is_empty())?;
    let selector = format!("#{}", escape_ident(id));
    if selector.contains(VOLATILE_ID_MARKER) || !matches_once(doc, scope, &selector) {
        return None;
    }
    Some(selector)
}

/// Feature-based segment for an element that has no usable id.
fn element_segment(doc: &Document, stats: &FeatureStatistics, element: NodeId) -> String {
    let Some(data) = doc.element(element) else {
        return String::new();
    };
    let tag_total = stats.tag_count(&data.local_name);

    let mut classes: Vec<&str> = Vec::new();
    for class in data.classes() {
        if !classes.contains(&class) && stats.class_count(class) < tag_total {
            classes.push(class);
        }
    }
    let mut segment = if (1..=2).contains(&classes.len()) {
        classes
            .iter()
            .map(|class| format!(".{}", escape_ident(class)))
            .collect::<String>()
    } else {
        escape_ident(&data.local_name)
    };

    let file_ref = file_reference(doc, element);
    // a `$=` file-name refinement replaces the exact `href`/`src` match
    for attr in data.attributes.iter().filter(|attr| {
        is_refinable_attribute(&attr.name)
            && file_ref.as_ref().map_or(true, |(name, _)| *name != attr.name)
    }) {
        if stats.attribute_count(&attr.name, &attr.value) < tag_total {
            segment.push('[');
            segment.push_str(&attribute_key(&attr.name, &attr.value));
            segment.push(']');
        }
    }
    if let Some((_, refinement)) = file_ref {
        segment.push_str(&refinement);
    }

    segment.push_str(&nth_child(doc, element, &segment));
    segment
}

/// `:nth-child(n)` when a sibling also matches `segment`.
fn nth_child(doc: &Document, element: NodeId, segment: &str) -> String {
    let Some(parent) = doc.parent(element) else {
        return String::new();
    };
    let Ok(selector) = SelectorList::parse(segment) else {
        return String::new();
    };
    let shared = doc
        .element_children(parent)
        .any(|sibling| sibling != element && doc.matches(sibling, &selector));
    match doc.sibling_info(element) {
        Some(info) if shared => format!(":nth-child({})", info.position),
        _ => String::new(),
    }
}

/// `[href$="…"]` / `[src$="…"]` built from a readable end of the URL.
fn file_reference(doc: &Document, element: NodeId) -> Option<(&'static str, String)> {
    let (name, value) = match (doc.attribute(element, "href"), doc.attribute(element, "src")) {
        (Some(href), _) => ("href", href),
        (None, Some(src)) => ("src", src),
        (None, None) => return None,
    };
    let suffix = uri_suffix(value)?;
    Some((name, format!("[{name}$={}]", escape_string(&suffix))))
}

/// Readable end of a (possibly percent-encoded) URL, in the form it takes at the end of the
/// raw attribute value.
fn uri_suffix(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let end = friendly_uri_end(&decoded, FRIENDLY_URI_MAX_LEN)?;
    if raw.ends_with(&end) {
        return Some(end);
    }
    let encoded = urlencoding::encode(&end);
    raw.ends_with(&*encoded).then(|| encoded.into_owned())
}

struct UriParts<'a> {
    domain: &'a str,
    path: &'a str,
    hash: &'a str,
}

impl<'a> UriParts<'a> {
    fn parse(uri: &'a str) -> Self {
        let (mut url, hash) = match uri.find('#') {
            Some(index) => (&uri[..index], &uri[index..]),
            None => (uri, ""),
        };
        let mut domain = "";
        let authority = match url.find("://") {
            Some(index) => Some(&url[index + 3..]),
            None => url.strip_prefix("//"),
        };
        if let Some(rest) = authority {
            // without a path the whole remainder is treated as path
            if let Some(slash) = rest.find('/') {
                domain = &rest[..slash];
                url = &rest[slash..];
            } else {
                url = rest;
            }
        }
        domain = domain.strip_prefix("www.").unwrap_or(domain);
        if let Some(colon) = domain.find(':') {
            domain = &domain[..colon];
        }
        Self {
            domain,
            path: url,
            hash,
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn is_mostly_numbers(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    !value.is_empty() && digits * 2 >= char_len(value)
}

/// Short, human-recognisable end of a URL (file name, last path segment, fragment), or
/// `None` for URLs that have none (data/javascript URLs, query strings, ids, index pages).
pub fn friendly_uri_end(uri: &str, max_len: usize) -> Option<String> {
    if char_len(uri) <= 1
        || uri.starts_with("data:")
        || uri.starts_with("javascript:")
        || uri.contains('?')
    {
        return None;
    }
    let UriParts { domain, path, hash } = UriParts::parse(uri);

    // last '/' that still has at least two characters after it
    let head_end = path
        .char_indices()
        .rev()
        .nth(1)
        .map(|(index, _)| index)
        .unwrap_or(0);
    let start = path[..head_end].rfind('/').map_or(0, |index| index + 1);
    let path_end = &path[start..];

    if !hash.is_empty() {
        if !path_end.is_empty() && char_len(path_end) + char_len(hash) <= max_len {
            return Some(format!("{path_end}{hash}"));
        }
        if char_len(path_end) < 2 && char_len(hash) > 2 && char_len(hash) <= max_len {
            return Some(hash.to_string());
        }
        return None;
    }
    if !domain.is_empty() && char_len(domain) < max_len && char_len(path) <= 1 {
        return Some(format!("{domain}{path}"));
    }

    let last_dot = path_end.rfind('.');
    let readable_length = match last_dot {
        Some(dot) => dot > 1,
        None => char_len(path_end) > 2,
    };
    if readable_length
        && char_len(path_end) <= max_len
        && !path_end.contains("index")
        && !is_mostly_numbers(path_end)
    {
        return Some(path_end.to_string());
    }
    None
}
