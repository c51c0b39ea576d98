//! Selector type definitions.

use std::fmt;

use crate::escape::{escape_ident, escape_string};

/// A comma-separated list of complex selectors; matches when any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, e.g. `main > div.item p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

impl ComplexSelector {
    pub fn subject(&self) -> Option<&Compound> {
        self.compounds.last()
    }
}

/// A sequence of simple selectors that all apply to one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    pub type_selector: Option<TypeSelector>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttrSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

impl Compound {
    pub fn is_empty(&self) -> bool {
        self.type_selector.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelector {
    Universal,
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    pub operation: Option<(AttrOperator, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

impl AttrOperator {
    pub fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            AttrOperator::Equals => actual == expected,
            AttrOperator::Includes => {
                !expected.is_empty() && actual.split_ascii_whitespace().any(|w| w == expected)
            }
            AttrOperator::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOperator::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AttrOperator::Equals => "=",
            AttrOperator::Includes => "~=",
            AttrOperator::DashMatch => "|=",
            AttrOperator::Prefix => "^=",
            AttrOperator::Suffix => "$=",
            AttrOperator::Substring => "*=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Root,
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    NthChild(NthExpr),
    Not(Box<SelectorList>),
}

/// `an+b` expression for `:nth-child()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpr {
    pub a: i32,
    pub b: i32,
}

impl NthExpr {
    pub fn index(b: i32) -> Self {
        Self { a: 0, b }
    }

    /// Whether the one-based `position` satisfies `an+b` for some `n >= 0`.
    pub fn matches(&self, position: usize) -> bool {
        let position = position as i64;
        let (a, b) = (i64::from(self.a), i64::from(self.b));
        if a == 0 {
            return position == b;
        }
        let diff = position - b;
        diff % a == 0 && diff / a >= 0
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{complex}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match self.combinators[i - 1] {
                    Combinator::Descendant => write!(f, " ")?,
                    Combinator::Child => write!(f, " > ")?,
                    Combinator::NextSibling => write!(f, " + ")?,
                    Combinator::SubsequentSibling => write!(f, " ~ ")?,
                }
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_selector {
            Some(TypeSelector::Universal) => write!(f, "*")?,
            Some(TypeSelector::Named(name)) => write!(f, "{}", escape_ident(name))?,
            None => {}
        }
        for id in &self.ids {
            write!(f, "#{}", escape_ident(id))?;
        }
        for class in &self.classes {
            write!(f, ".{}", escape_ident(class))?;
        }
        for attr in &self.attributes {
            match &attr.operation {
                Some((op, value)) => write!(
                    f,
                    "[{}{}{}]",
                    escape_ident(&attr.name),
                    op.as_str(),
                    escape_string(value)
                )?,
                None => write!(f, "[{}]", escape_ident(&attr.name))?,
            }
        }
        for pseudo in &self.pseudo_classes {
            match pseudo {
                PseudoClass::Root => write!(f, ":root")?,
                PseudoClass::FirstChild => write!(f, ":first-child")?,
                PseudoClass::LastChild => write!(f, ":last-child")?,
                PseudoClass::OnlyChild => write!(f, ":only-child")?,
                PseudoClass::Empty => write!(f, ":empty")?,
                PseudoClass::NthChild(expr) => match (expr.a, expr.b) {
                    (0, b) => write!(f, ":nth-child({b})")?,
                    (a, 0) => write!(f, ":nth-child({a}n)")?,
                    (a, b) if b < 0 => write!(f, ":nth-child({a}n{b})")?,
                    (a, b) => write!(f, ":nth-child({a}n+{b})")?,
                },
                PseudoClass::Not(inner) => write!(f, ":not({inner})")?,
            }
        }
        Ok(())
    }
}
