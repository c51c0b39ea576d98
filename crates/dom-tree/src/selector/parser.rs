//! Selector parsing on top of the `cssparser` tokenizer.
//!
//! Whitespace is significant (descendant combinator), so the loop pulls tokens with
//! `next_including_whitespace` and only turns pending whitespace into a combinator once the
//! next compound actually starts.

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};

use super::types::{
    AttrOperator, AttrSelector, Combinator, ComplexSelector, Compound, NthExpr, PseudoClass,
    SelectorList, TypeSelector,
};
use crate::errors::{DomError, DomResult};

type PResult<'i, T> = Result<T, ParseError<'i, &'static str>>;

pub(crate) fn parse_selector_list(source: &str) -> DomResult<SelectorList> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    parse_list(&mut parser).map_err(|err| DomError::invalid_selector(source, describe(&err)))
}

fn describe(err: &ParseError<'_, &'static str>) -> String {
    match &err.kind {
        ParseErrorKind::Custom(message) => (*message).to_string(),
        ParseErrorKind::Basic(kind) => format!("{kind:?}"),
    }
}

struct ComplexBuilder {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
    current: Compound,
    pending: Option<Combinator>,
}

impl ComplexBuilder {
    fn new() -> Self {
        Self {
            compounds: Vec::new(),
            combinators: Vec::new(),
            current: Compound::default(),
            pending: None,
        }
    }

    fn is_blank(&self) -> bool {
        self.compounds.is_empty() && self.current.is_empty()
    }

    /// Called before any simple selector is added; closes the previous compound when a
    /// combinator is pending.
    fn begin_simple(&mut self) {
        if let Some(combinator) = self.pending.take() {
            let finished = std::mem::take(&mut self.current);
            self.compounds.push(finished);
            self.combinators.push(combinator);
        }
    }

    fn whitespace(&mut self) {
        if !self.current.is_empty() && self.pending.is_none() {
            self.pending = Some(Combinator::Descendant);
        }
    }

    fn explicit(&mut self, combinator: Combinator) -> Result<(), &'static str> {
        if self.current.is_empty() {
            return Err("combinator without a preceding compound selector");
        }
        match self.pending {
            None | Some(Combinator::Descendant) => {
                self.pending = Some(combinator);
                Ok(())
            }
            Some(_) => Err("two consecutive combinators"),
        }
    }

    fn finish(mut self) -> Result<ComplexSelector, &'static str> {
        match self.pending {
            Some(Combinator::Descendant) | None => {}
            Some(_) => return Err("dangling combinator"),
        }
        if self.current.is_empty() {
            return Err("empty compound selector");
        }
        self.compounds.push(self.current);
        Ok(ComplexSelector {
            compounds: self.compounds,
            combinators: self.combinators,
        })
    }
}

fn parse_list<'i>(parser: &mut Parser<'i, '_>) -> PResult<'i, SelectorList> {
    let mut list = Vec::new();
    let mut builder = ComplexBuilder::new();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => builder.whitespace(),
            Token::Comma => {
                let finished = std::mem::replace(&mut builder, ComplexBuilder::new());
                list.push(finished.finish().map_err(|msg| parser.new_custom_error(msg))?);
            }
            Token::Delim('>') => builder
                .explicit(Combinator::Child)
                .map_err(|msg| parser.new_custom_error(msg))?,
            Token::Delim('+') => builder
                .explicit(Combinator::NextSibling)
                .map_err(|msg| parser.new_custom_error(msg))?,
            Token::Delim('~') => builder
                .explicit(Combinator::SubsequentSibling)
                .map_err(|msg| parser.new_custom_error(msg))?,
            Token::Ident(name) => {
                builder.begin_simple();
                if !builder.current.is_empty() {
                    return Err(parser.new_custom_error("type selector must come first"));
                }
                builder.current.type_selector =
                    Some(TypeSelector::Named(name.to_ascii_lowercase()));
            }
            Token::Delim('*') => {
                builder.begin_simple();
                if !builder.current.is_empty() {
                    return Err(parser.new_custom_error("universal selector must come first"));
                }
                builder.current.type_selector = Some(TypeSelector::Universal);
            }
            Token::IDHash(id) => {
                builder.begin_simple();
                builder.current.ids.push(id.to_string());
            }
            Token::Delim('.') => {
                builder.begin_simple();
                let next = parser.next_including_whitespace()?.clone();
                match next {
                    Token::Ident(class) => builder.current.classes.push(class.to_string()),
                    _ => return Err(parser.new_custom_error("expected class name after '.'")),
                }
            }
            Token::SquareBracketBlock => {
                builder.begin_simple();
                let attr = parser.parse_nested_block(|inner| parse_attribute(inner))?;
                builder.current.attributes.push(attr);
            }
            Token::Colon => {
                builder.begin_simple();
                let pseudo = parse_pseudo(parser)?;
                builder.current.pseudo_classes.push(pseudo);
            }
            _ => return Err(parser.new_custom_error("unexpected token in selector")),
        }
    }

    if builder.is_blank() && list.is_empty() {
        return Err(parser.new_custom_error("empty selector"));
    }
    list.push(builder.finish().map_err(|msg| parser.new_custom_error(msg))?);
    Ok(SelectorList(list))
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> PResult<'i, AttrSelector> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    parser.skip_whitespace();
    if parser.is_exhausted() {
        return Ok(AttrSelector {
            name,
            operation: None,
        });
    }

    let operator = match parser.next()?.clone() {
        Token::Delim('=') => AttrOperator::Equals,
        Token::IncludeMatch => AttrOperator::Includes,
        Token::DashMatch => AttrOperator::DashMatch,
        Token::PrefixMatch => AttrOperator::Prefix,
        Token::SuffixMatch => AttrOperator::Suffix,
        Token::SubstringMatch => AttrOperator::Substring,
        _ => return Err(parser.new_custom_error("unknown attribute operator")),
    };
    let value = parser.expect_ident_or_string()?.to_string();
    parser.skip_whitespace();
    parser.expect_exhausted()?;

    Ok(AttrSelector {
        name,
        operation: Some((operator, value)),
    })
}

fn parse_pseudo<'i>(parser: &mut Parser<'i, '_>) -> PResult<'i, PseudoClass> {
    let token = parser.next_including_whitespace()?.clone();
    match token {
        Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
            "root" => Ok(PseudoClass::Root),
            "first-child" => Ok(PseudoClass::FirstChild),
            "last-child" => Ok(PseudoClass::LastChild),
            "only-child" => Ok(PseudoClass::OnlyChild),
            "empty" => Ok(PseudoClass::Empty),
            _ => Err(parser.new_custom_error("unsupported pseudo-class")),
        },
        Token::Function(name) => match name.to_ascii_lowercase().as_str() {
            "nth-child" => parser.parse_nested_block(|inner| {
                let (a, b) = cssparser::parse_nth(inner)?;
                inner.skip_whitespace();
                inner.expect_exhausted()?;
                Ok(PseudoClass::NthChild(NthExpr { a, b }))
            }),
            "not" => parser.parse_nested_block(|inner| {
                inner.skip_whitespace();
                let list = parse_list(inner)?;
                Ok(PseudoClass::Not(Box::new(list)))
            }),
            _ => Err(parser.new_custom_error("unsupported functional pseudo-class")),
        },
        _ => Err(parser.new_custom_error("expected pseudo-class name after ':'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SelectorList {
        parse_selector_list(source).unwrap()
    }

    #[test]
    fn test_parse_combinators() {
        let list = parse("main > div.item  p + span ~ a");
        let complex = &list.0[0];
        assert_eq!(complex.compounds.len(), 5);
        assert_eq!(
            complex.combinators,
            vec![
                Combinator::Child,
                Combinator::Descendant,
                Combinator::NextSibling,
                Combinator::SubsequentSibling,
            ]
        );
        assert_eq!(complex.compounds[1].classes, vec!["item".to_string()]);
    }

    #[test]
    fn test_parse_attributes_and_pseudos() {
        let list = parse(r#"a[href$="about/"][data-x]:nth-child(2n+1):not(.skip)"#);
        let compound = &list.0[0].compounds[0];
        assert_eq!(
            compound.attributes[0].operation,
            Some((AttrOperator::Suffix, "about/".to_string()))
        );
        assert_eq!(compound.attributes[1].operation, None);
        assert_eq!(
            compound.pseudo_classes[0],
            PseudoClass::NthChild(NthExpr { a: 2, b: 1 })
        );
        assert!(matches!(compound.pseudo_classes[1], PseudoClass::Not(_)));
    }

    #[test]
    fn test_parse_escaped_identifiers() {
        let list = parse(r"#monkeys\#are\.animals\\ok, hx\:include");
        assert_eq!(list.0[0].compounds[0].ids, vec![r"monkeys#are.animals\ok".to_string()]);
        assert_eq!(
            list.0[1].compounds[0].type_selector,
            Some(TypeSelector::Named("hx:include".into()))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "div >", "> div", "div,", ".", "div::before", "div[", ":hover"] {
            assert!(parse_selector_list(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_display_round_trips_shape() {
        let source = r#"#fixture > div:nth-child(2) [role="menuitem"]"#;
        assert_eq!(parse(source).to_string(), source);
    }
}
