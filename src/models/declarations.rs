//! Element declaration content specs
//!
//! Parses the content-spec part of an element type declaration:
//!
//! ```text
//! contentspec ::= 'EMPTY' | 'ANY' | Mixed | children
//! Mixed       ::= '(' S? '#PCDATA' (S? '|' S? Name)* S? ')*'
//!               | '(' S? '#PCDATA' S? ')'
//! children    ::= (choice | seq) ('?' | '*' | '+')?
//! cp          ::= (Name | Wildcard | choice | seq) ('?' | '*' | '+')?
//! ```
//!
//! `Wildcard` extends the declaration syntax with `##any`, `##local`,
//! `##other` and `##targetNamespace`.

use super::builder::CompileOptions;
use super::dfa::ContentDfa;
use super::spec::ContentSpec;
use super::syntax::{ElementMatcher, RepeatKind};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::names::{is_name, is_name_start, is_space};
use crate::namespaces::NamespaceContext;
use crate::symbols::SymbolTable;

/// Name-resolution context for [`parse_content_spec`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext<'a> {
    /// Prefix bindings; when present, element names get a namespace
    pub namespaces: Option<&'a NamespaceContext>,
    /// Namespace bound to `##other` and `##targetNamespace`
    pub target_namespace: Option<&'a str>,
}

impl<'a> ParseContext<'a> {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve element names through these bindings
    pub fn with_namespaces(mut self, namespaces: &'a NamespaceContext) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    /// Set the target namespace
    pub fn with_target_namespace(mut self, namespace: &'a str) -> Self {
        self.target_namespace = Some(namespace);
        self
    }
}

/// A parsed content spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentModel {
    /// Grammar expression
    pub spec: ContentSpec,
    /// Whether character data is allowed between children
    pub mixed: bool,
}

impl ContentModel {
    /// Compile into an automaton
    pub fn compile(&self, limits: &Limits) -> Result<ContentDfa> {
        let options = CompileOptions::new()
            .with_mixed(self.mixed)
            .with_limits(limits.clone());
        self.spec.compile(&options)
    }
}

/// Parse a content spec such as `(head, (p | list)*, foot?)`
pub fn parse_content_spec(
    text: &str,
    symbols: &mut SymbolTable,
    context: &ParseContext<'_>,
) -> Result<ContentModel> {
    let mut parser = Parser {
        text,
        pos: 0,
        symbols,
        context,
    };
    let model = parser.parse_top()?;
    parser.skip_spaces();
    if parser.pos < text.len() {
        return Err(parser.error("unexpected text after content spec"));
    }
    Ok(model)
}

struct Parser<'t, 's, 'c> {
    text: &'t str,
    pos: usize,
    symbols: &'s mut SymbolTable,
    context: &'c ParseContext<'c>,
}

impl Parser<'_, '_, '_> {
    fn error(&self, message: &str) -> Error {
        ParseError::new(message)
            .with_location(format!("offset {}", self.pos))
            .with_source(self.text)
            .into()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.text[self.pos..].starts_with(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|c| is_space(c as u32)) {
            self.bump();
        }
    }

    fn parse_top(&mut self) -> Result<ContentModel> {
        self.skip_spaces();
        if self.eat_keyword("EMPTY") {
            return Ok(ContentModel {
                spec: ContentSpec::Empty,
                mixed: false,
            });
        }
        if self.eat_keyword("ANY") {
            return Ok(ContentModel {
                spec: ContentSpec::zero_or_more(ContentSpec::leaf(ElementMatcher::Any)),
                mixed: true,
            });
        }

        self.expect('(')?;
        self.skip_spaces();
        if self.eat_keyword("#PCDATA") {
            return self.parse_mixed();
        }
        let group = self.parse_group()?;
        Ok(ContentModel {
            spec: self.parse_suffix(group),
            mixed: false,
        })
    }

    // after "(#PCDATA"
    fn parse_mixed(&mut self) -> Result<ContentModel> {
        let mut names: Vec<ContentSpec> = Vec::new();
        loop {
            self.skip_spaces();
            if !self.eat('|') {
                break;
            }
            self.skip_spaces();
            let leaf = self.parse_name_leaf()?;
            if names.contains(&leaf) {
                return Err(self.error("duplicate name in mixed content"));
            }
            names.push(leaf);
        }
        self.expect(')')?;

        let spec = if names.is_empty() {
            self.eat('*');
            ContentSpec::Empty
        } else {
            if !self.eat('*') {
                return Err(self.error("mixed content with element names must end with ')*'"));
            }
            ContentSpec::zero_or_more(ContentSpec::Choice(names))
        };
        Ok(ContentModel { spec, mixed: true })
    }

    // after "(": cp ((',' cp)* | ('|' cp)*) ')'
    fn parse_group(&mut self) -> Result<ContentSpec> {
        let mut children = vec![self.parse_particle()?];
        let mut separator: Option<char> = None;
        loop {
            self.skip_spaces();
            if self.eat(')') {
                break;
            }
            let c = match self.peek() {
                Some(c @ (',' | '|')) => c,
                _ => return Err(self.error("expected ',', '|' or ')'")),
            };
            if separator.is_some_and(|s| s != c) {
                return Err(self.error("cannot mix ',' and '|' in one group"));
            }
            separator = Some(c);
            self.bump();
            children.push(self.parse_particle()?);
        }

        Ok(match separator {
            Some('|') => ContentSpec::Choice(children),
            _ => ContentSpec::Sequence(children),
        })
    }

    fn parse_particle(&mut self) -> Result<ContentSpec> {
        self.skip_spaces();
        let particle = if self.eat('(') {
            self.skip_spaces();
            if self.text[self.pos..].starts_with("#PCDATA") {
                return Err(self.error("#PCDATA is only allowed at the start of the outermost group"));
            }
            self.parse_group()?
        } else if self.eat_keyword("##") {
            self.parse_wildcard()?
        } else {
            self.parse_name_leaf()?
        };
        Ok(self.parse_suffix(particle))
    }

    fn parse_suffix(&mut self, spec: ContentSpec) -> ContentSpec {
        let kind = match self.peek() {
            Some('*') => RepeatKind::ZeroOrMore,
            Some('+') => RepeatKind::OneOrMore,
            Some('?') => RepeatKind::ZeroOrOne,
            _ => return spec,
        };
        self.bump();
        ContentSpec::Repeat(Box::new(spec), kind)
    }

    fn scan_name(&mut self) -> Option<&str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c as u32) => self.bump(),
            _ => return None,
        }
        while self.peek().is_some_and(|c| is_name(c as u32)) {
            self.bump();
        }
        Some(&self.text[start..self.pos])
    }

    fn parse_name_leaf(&mut self) -> Result<ContentSpec> {
        let text = self.text;
        let start = self.pos;
        if self.scan_name().is_none() {
            return Err(self.error("element name expected"));
        }
        let raw = &text[start..self.pos];

        let name = self.symbols.intern(raw);
        let namespace = match self.context.namespaces {
            Some(namespaces) => namespaces
                .resolve(raw)?
                .namespace
                .map(|uri| self.symbols.intern(&uri)),
            None => None,
        };
        Ok(ContentSpec::leaf(ElementMatcher::Name { name, namespace }))
    }

    // after "##"
    fn parse_wildcard(&mut self) -> Result<ContentSpec> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        let target = self.context.target_namespace.map(|ns| self.symbols.intern(ns));
        let matcher = match &self.text[start..self.pos] {
            "any" => ElementMatcher::Any,
            "local" => ElementMatcher::AnyLocal,
            "other" => ElementMatcher::AnyOther(target),
            "targetNamespace" => match target {
                Some(ns) => ElementMatcher::AnyInNamespace(ns),
                None => ElementMatcher::AnyLocal,
            },
            _ => return Err(self.error("unknown wildcard")),
        };
        Ok(ContentSpec::leaf(matcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dfa::{ChildSymbol, ValidationResult};

    fn parse(text: &str, symbols: &mut SymbolTable) -> Result<ContentModel> {
        parse_content_spec(text, symbols, &ParseContext::new())
    }

    #[test]
    fn test_parse_sequence_and_choice() {
        let mut symbols = SymbolTable::new();
        let model = parse("(head, (p | list)*, foot?)", &mut symbols).unwrap();
        assert!(!model.mixed);
        assert_eq!(model.spec.describe(&symbols), "(head,(p|list)*,foot?)");
    }

    #[test]
    fn test_parse_empty_and_any() {
        let mut symbols = SymbolTable::new();
        let empty = parse("EMPTY", &mut symbols).unwrap();
        assert_eq!(empty.spec, ContentSpec::Empty);
        assert!(!empty.mixed);

        let any = parse("ANY", &mut symbols).unwrap();
        assert!(any.mixed);
        assert_eq!(any.spec.describe(&symbols), "##any*");
    }

    #[test]
    fn test_parse_mixed() {
        let mut symbols = SymbolTable::new();
        let text_only = parse("( #PCDATA )", &mut symbols).unwrap();
        assert!(text_only.mixed);
        assert_eq!(text_only.spec, ContentSpec::Empty);

        let mixed = parse("(#PCDATA | em | strong)*", &mut symbols).unwrap();
        assert!(mixed.mixed);
        assert_eq!(mixed.spec.describe(&symbols), "(em|strong)*");

        assert!(parse("(#PCDATA | em)", &mut symbols).is_err());
        assert!(parse("(#PCDATA | em | em)*", &mut symbols).is_err());
        assert!(parse("(a, (#PCDATA))", &mut symbols).is_err());
    }

    #[test]
    fn test_parse_errors() {
        let mut symbols = SymbolTable::new();
        let err = parse("(a, b | c)", &mut symbols).unwrap_err();
        assert!(err.to_string().contains("cannot mix"));
        assert!(parse("(a", &mut symbols).is_err());
        assert!(parse("(1a)", &mut symbols).is_err());
        assert!(parse("(a) extra", &mut symbols).is_err());
        assert!(parse("a", &mut symbols).is_err());
        assert!(parse("(##bogus)", &mut symbols).is_err());
    }

    #[test]
    fn test_parse_wildcards() {
        let mut symbols = SymbolTable::new();
        let context = ParseContext::new().with_target_namespace("urn:t");
        let model = parse_content_spec(
            "(##any | ##local | ##other | ##targetNamespace)",
            &mut symbols,
            &context,
        )
        .unwrap();
        let tns = symbols.get("urn:t").unwrap();
        assert_eq!(
            model.spec,
            ContentSpec::Choice(vec![
                ContentSpec::leaf(ElementMatcher::Any),
                ContentSpec::leaf(ElementMatcher::AnyLocal),
                ContentSpec::leaf(ElementMatcher::AnyOther(Some(tns))),
                ContentSpec::leaf(ElementMatcher::AnyInNamespace(tns)),
            ])
        );
    }

    #[test]
    fn test_prefixed_names_resolve() {
        let mut symbols = SymbolTable::new();
        let mut namespaces = NamespaceContext::new();
        namespaces.add_prefix("bk", "urn:books");
        let context = ParseContext::new().with_namespaces(&namespaces);

        let model = parse_content_spec("(bk:title)", &mut symbols, &context).unwrap();
        let name = symbols.get("bk:title").unwrap();
        let ns = symbols.get("urn:books").unwrap();
        assert_eq!(model.spec, ContentSpec::leaf(ElementMatcher::qualified(name, ns)));

        assert!(parse_content_spec("(zz:title)", &mut symbols, &context).is_err());
    }

    #[test]
    fn test_compile_parsed_model() {
        let mut symbols = SymbolTable::new();
        let model = parse("(a, b+)", &mut symbols).unwrap();
        let dfa = model.compile(&Limits::default()).unwrap();
        let a = ChildSymbol::element(symbols.intern("a"));
        let b = ChildSymbol::element(symbols.intern("b"));
        assert_eq!(dfa.validate(&[a, b, b]), ValidationResult::Valid);
        assert_eq!(dfa.validate(&[a]), ValidationResult::IncompleteAt(1));
    }
}
