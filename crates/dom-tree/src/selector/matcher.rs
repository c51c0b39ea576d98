//! Right-to-left selector matching.
//!
//! Matching is written against [`MatchElement`] so one selector can be evaluated over the
//! light tree ([`ElementRef`]) or over the flattened tree
//! ([`VirtualRef`](crate::flat::VirtualRef)); the two only differ in what "parent" and
//! "sibling" mean.

use super::types::{
    AttrSelector, Combinator, ComplexSelector, Compound, PseudoClass, SelectorList, TypeSelector,
};
use crate::node::{Document, NodeId, SiblingInfo};

/// Element view needed by the matcher.
pub trait MatchElement: Copy {
    fn local_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;
    fn prev_sibling_element(&self) -> Option<Self>;
    fn sibling_info(&self) -> Option<SiblingInfo>;
    /// True for the document element.
    fn is_root(&self) -> bool;
    fn is_empty(&self) -> bool;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }
}

pub fn matches_list<E: MatchElement>(list: &SelectorList, element: E) -> bool {
    list.0.iter().any(|complex| matches_complex(complex, element))
}

pub fn matches_complex<E: MatchElement>(complex: &ComplexSelector, element: E) -> bool {
    match complex.compounds.len() {
        0 => false,
        len => matches_from(complex, len - 1, element),
    }
}

fn matches_from<E: MatchElement>(complex: &ComplexSelector, index: usize, element: E) -> bool {
    if !matches_compound(&complex.compounds[index], element) {
        return false;
    }
    if index == 0 {
        return true;
    }
    let next = index - 1;
    match complex.combinators[next] {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| matches_from(complex, next, parent)),
        Combinator::Descendant => {
            let mut current = element.parent_element();
            while let Some(ancestor) = current {
                if matches_from(complex, next, ancestor) {
                    return true;
                }
                current = ancestor.parent_element();
            }
            false
        }
        Combinator::NextSibling => element
            .prev_sibling_element()
            .is_some_and(|sibling| matches_from(complex, next, sibling)),
        Combinator::SubsequentSibling => {
            let mut current = element.prev_sibling_element();
            while let Some(sibling) = current {
                if matches_from(complex, next, sibling) {
                    return true;
                }
                current = sibling.prev_sibling_element();
            }
            false
        }
    }
}

pub fn matches_compound<E: MatchElement>(compound: &Compound, element: E) -> bool {
    if let Some(TypeSelector::Named(name)) = &compound.type_selector {
        if element.local_name() != name {
            return false;
        }
    }
    if !compound
        .ids
        .iter()
        .all(|id| element.attribute("id") == Some(id.as_str()))
    {
        return false;
    }
    if !compound.classes.iter().all(|class| element.has_class(class)) {
        return false;
    }
    if !compound
        .attributes
        .iter()
        .all(|attr| matches_attribute(attr, element))
    {
        return false;
    }
    compound
        .pseudo_classes
        .iter()
        .all(|pseudo| matches_pseudo(pseudo, element))
}

fn matches_attribute<E: MatchElement>(attr: &AttrSelector, element: E) -> bool {
    match (element.attribute(&attr.name), &attr.operation) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(actual), Some((operator, expected))) => operator.matches(actual, expected),
    }
}

fn matches_pseudo<E: MatchElement>(pseudo: &PseudoClass, element: E) -> bool {
    match pseudo {
        PseudoClass::Root => element.is_root(),
        PseudoClass::Empty => element.is_empty(),
        PseudoClass::Not(inner) => !matches_list(inner, element),
        PseudoClass::FirstChild => element.sibling_info().is_some_and(|info| info.position == 1),
        PseudoClass::LastChild => element
            .sibling_info()
            .is_some_and(|info| info.position == info.count),
        PseudoClass::OnlyChild => element.sibling_info().is_some_and(|info| info.count == 1),
        PseudoClass::NthChild(expr) => element
            .sibling_info()
            .is_some_and(|info| expr.matches(info.position)),
    }
}

/// Light-tree element handle. Ancestry stops at the owning document or shadow root, which
/// gives selectors the same scoping a browser applies inside a shadow tree.
#[derive(Clone, Copy, Debug)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    /// `None` when `id` is not an element.
    pub fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        doc.is_element(id).then_some(Self { doc, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl MatchElement for ElementRef<'_> {
    fn local_name(&self) -> &str {
        self.doc.local_name(self.id).unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.id, name)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.doc.parent_element(self.id)?;
        Some(Self {
            doc: self.doc,
            id: parent,
        })
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let sibling = self.doc.previous_element_sibling(self.id)?;
        Some(Self {
            doc: self.doc,
            id: sibling,
        })
    }

    fn sibling_info(&self) -> Option<SiblingInfo> {
        self.doc.sibling_info(self.id)
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.id) == Some(self.doc.root())
    }

    fn is_empty(&self) -> bool {
        self.doc.is_empty_node(self.id)
    }
}

impl Document {
    /// Whether element `id` matches `selector`. Non-elements never match.
    pub fn matches(&self, id: NodeId, selector: &SelectorList) -> bool {
        ElementRef::new(self, id).is_some_and(|element| matches_list(selector, element))
    }

    /// Elements under `scope` (exclusive) matching `selector`, in document order. Does not
    /// descend into shadow trees; pass a shadow root as `scope` to query inside one.
    pub fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.matches(*node, selector))
            .collect()
    }
}
