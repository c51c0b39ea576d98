//! Selector engine: parsing (`cssparser` tokenizer) and right-to-left matching.

mod matcher;
mod parser;
mod types;

pub use matcher::{matches_compound, matches_complex, matches_list, ElementRef, MatchElement};
pub use types::{
    AttrOperator, AttrSelector, Combinator, ComplexSelector, Compound, NthExpr, PseudoClass,
    SelectorList, TypeSelector,
};

use crate::errors::DomResult;

impl SelectorList {
    pub fn parse(source: &str) -> DomResult<Self> {
        parser::parse_selector_list(source)
    }
}
