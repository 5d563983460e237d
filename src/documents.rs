//! XML document parsing and content validation
//!
//! [`Document::parse`] drives an [`XmlScanner`] over a whole document:
//! prolog, an optional DOCTYPE with its internal subset, the element tree
//! and trailing misc. Each `<!ELEMENT>` declaration is compiled once into a
//! [`ContentDfa`]; [`Document::validate`] checks every element instance's
//! children against the automaton of its type.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, Result, ValidationError};
use crate::limits::Limits;
use crate::models::{
    parse_content_spec, ChildSymbol, ContentDfa, ContentModel, ParseContext, Step,
    ValidationResult,
};
use crate::names::is_space;
use crate::namespaces::{NamespaceContext, QName};
use crate::scanner::{
    format_message, predefined_entity, CollectingReporter, ContentStop, DataStop, Diagnostic,
    Entity, EntityStore, ExternalId, LiteralStop, ScannerOptions, Severity, XmlDecl, XmlScanner,
    XmlString, XML_DOMAIN,
};
use crate::symbols::{Symbol, SymbolTable};

/// Document parsing options
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Validate element content while parsing and record the violations
    /// as diagnostics
    pub validate: bool,
    /// Resolve element and attribute prefixes
    pub namespaces: bool,
    /// Resource limits
    pub limits: Limits,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            validate: true,
            namespaces: false,
            limits: Limits::default(),
        }
    }
}

impl DocumentOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable validation during parsing
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Enable or disable namespace processing
    pub fn with_namespaces(mut self, namespaces: bool) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Node in the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element
    Element(Element),
    /// Character data, CDATA sections included
    Text(String),
    /// Comment
    Comment(String),
    /// Processing instruction
    ProcessingInstruction {
        /// Target
        target: String,
        /// Data, possibly empty
        data: String,
    },
}

/// XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Name as written, prefix included
    pub name: String,
    /// Resolved name; the local name is the raw name without namespaces
    pub qname: QName,
    /// Attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Children in document order
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String, qname: QName) -> Self {
        Self {
            name,
            qname,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Local part of the name
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Namespace URI, if any
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Attribute value by name as written
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Concatenated character data of the direct children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The document type declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    /// Declared root element type
    pub name: String,
    /// External subset identifiers (the external subset is not read)
    pub external_id: ExternalId,
}

/// Compiled `<!ELEMENT>` declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Element type
    pub name: Symbol,
    /// Content spec text as declared
    pub source: String,
    /// Parsed model
    pub model: ContentModel,
    /// Compiled automaton
    pub dfa: ContentDfa,
}

/// Element declarations of a document, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    elements: IndexMap<Symbol, ElementDecl>,
}

impl Grammar {
    /// Create an empty grammar
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. The first declaration of a type is kept;
    /// returns `false` if `decl.name` was already declared.
    pub fn declare(&mut self, decl: ElementDecl) -> bool {
        if self.elements.contains_key(&decl.name) {
            return false;
        }
        self.elements.insert(decl.name, decl);
        true
    }

    /// Declaration of an element type
    pub fn get(&self, name: Symbol) -> Option<&ElementDecl> {
        self.elements.get(&name)
    }

    /// Number of declared element types
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the declarations
    pub fn iter(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }
}

/// A parsed XML document
#[derive(Debug)]
pub struct Document {
    /// XML declaration, if present
    pub xml_decl: Option<XmlDecl>,
    /// Document type declaration, if present
    pub doctype: Option<Doctype>,
    /// Root element
    pub root: Element,
    diagnostics: Vec<Diagnostic>,
    grammar: Grammar,
    entities: EntityStore,
    symbols: SymbolTable,
}

struct Violation {
    key: &'static str,
    args: Vec<String>,
    error: ValidationError,
}

impl Document {
    /// Parse a document from text
    pub fn parse(text: &str, options: &DocumentOptions) -> Result<Self> {
        let scanner_options = ScannerOptions::new()
            .with_namespaces(options.namespaces)
            .with_limits(options.limits.clone());
        let scanner = XmlScanner::new(text, CollectingReporter::new(), EntityStore::new())
            .with_options(scanner_options);

        let mut parser = DocumentParser {
            scanner,
            options,
            symbols: SymbolTable::new(),
            grammar: Grammar::new(),
            namespaces: NamespaceContext::new(),
            text: XmlString::new(),
        };
        let (xml_decl, doctype, root) = parser.parse_document()?;

        let (reporter, entities) = parser.scanner.into_parts();
        let mut document = Document {
            xml_decl,
            doctype,
            root,
            diagnostics: reporter.into_diagnostics(),
            grammar: parser.grammar,
            entities,
            symbols: parser.symbols,
        };

        if options.validate {
            for violation in document.violations() {
                warn!(message = %violation.error, "content violation");
                document.diagnostics.push(Diagnostic {
                    domain: XML_DOMAIN.to_string(),
                    key: violation.key.to_string(),
                    args: violation.args,
                    severity: Severity::Error,
                });
            }
        }
        debug!(
            elements = document.grammar.len(),
            entities = document.entities.len(),
            diagnostics = document.diagnostics.len(),
            "parsed document"
        );
        Ok(document)
    }

    /// Read and parse a document file
    pub fn from_file(path: impl AsRef<Path>, options: &DocumentOptions) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, options)
    }

    /// Warnings and errors reported while parsing, plus content
    /// violations when validation was enabled
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Compiled element declarations
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Declared general entities
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Interned element names and namespaces
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Check every element against the declarations of the internal
    /// subset. Documents without a DOCTYPE are always valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        self.violations().into_iter().map(|v| v.error).collect()
    }

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Some(doctype) = &self.doctype else {
            return violations;
        };

        if doctype.name != self.root.name {
            let args = vec![doctype.name.clone(), self.root.name.clone()];
            let error = ValidationError::new(format_message(
                "RootElementTypeMustMatchDoctypedecl",
                &args,
            ))
            .with_path(format!("/{}", self.root.name));
            violations.push(Violation {
                key: "RootElementTypeMustMatchDoctypedecl",
                args,
                error,
            });
        }

        let mut stack = vec![(&self.root, format!("/{}", self.root.name))];
        while let Some((element, path)) = stack.pop() {
            self.check_element(element, &path, &mut violations);
            let children: Vec<_> = element.child_elements().collect();
            for child in children.into_iter().rev() {
                stack.push((child, format!("{}/{}", path, child.name)));
            }
        }
        violations
    }

    fn check_element(&self, element: &Element, path: &str, violations: &mut Vec<Violation>) {
        let decl = self
            .symbols
            .get(&element.name)
            .and_then(|name| self.grammar.get(name));
        let Some(decl) = decl else {
            let args = vec![element.name.clone()];
            let error = ValidationError::new(format_message("MSG_ELEMENT_NOT_DECLARED", &args))
                .with_path(path);
            violations.push(Violation {
                key: "MSG_ELEMENT_NOT_DECLARED",
                args,
                error,
            });
            return;
        };

        let children = self.child_symbols(element);
        let (key, index) = match decl.dfa.validate(&children) {
            ValidationResult::Valid => return,
            ValidationResult::InvalidAt(index) => ("MSG_CONTENT_INVALID", index),
            ValidationResult::IncompleteAt(index) => ("MSG_CONTENT_INCOMPLETE", index),
        };

        let args = vec![element.name.clone(), decl.source.clone()];
        let expected = self.expected_after(&decl.dfa, &children[..index]);
        let reason = match children.get(index) {
            Some(child) => format!(
                "{} is not allowed here; expected {}",
                self.describe_child(child),
                expected
            ),
            None => format!("content ended early; expected {}", expected),
        };
        let error = ValidationError::new(format_message(key, &args))
            .with_path(path)
            .with_declaration(format!("<!ELEMENT {} {}>", element.name, decl.source))
            .with_child_index(index)
            .with_reason(reason);
        violations.push(Violation { key, args, error });
    }

    // element children as automaton input; whitespace-only text is ignorable
    fn child_symbols(&self, element: &Element) -> Vec<ChildSymbol> {
        element
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Element(child) => {
                    let name = self.symbols.get(&child.name)?;
                    let namespace = child.namespace().and_then(|ns| self.symbols.get(ns));
                    Some(ChildSymbol::Element { name, namespace })
                }
                Node::Text(text) if !is_whitespace(text) => Some(ChildSymbol::Text),
                _ => None,
            })
            .collect()
    }

    fn expected_after(&self, dfa: &ContentDfa, prefix: &[ChildSymbol]) -> String {
        let mut cursor = dfa.start();
        for child in prefix {
            if dfa.step(&mut cursor, child) == Step::Rejected {
                return "nothing".to_string();
            }
        }
        let Some(state) = cursor.state() else {
            return "nothing".to_string();
        };
        let expected: Vec<String> = dfa
            .expected(state)
            .into_iter()
            .map(|matcher| matcher.describe(&self.symbols))
            .collect();
        if expected.is_empty() {
            "end of content".to_string()
        } else {
            expected.join(" | ")
        }
    }

    fn describe_child(&self, child: &ChildSymbol) -> String {
        match child {
            ChildSymbol::Element { name, .. } => format!("element '{}'", self.symbols.resolve(*name)),
            ChildSymbol::Text => "character data".to_string(),
        }
    }
}

fn is_whitespace(text: &str) -> bool {
    text.chars().all(|c| is_space(c as u32))
}

struct DocumentParser<'o> {
    scanner: XmlScanner,
    options: &'o DocumentOptions,
    symbols: SymbolTable,
    grammar: Grammar,
    namespaces: NamespaceContext,
    text: XmlString,
}

impl DocumentParser<'_> {
    fn fatal(&mut self, key: &str, args: Vec<String>) -> Error {
        self.scanner.fatal(key, args)
    }

    fn at_xml_decl(&mut self) -> bool {
        ["<?xml ", "<?xml\t", "<?xml\n", "<?xml\r"]
            .iter()
            .any(|prefix| self.scanner.peek_string(prefix))
    }

    fn parse_document(&mut self) -> Result<(Option<XmlDecl>, Option<Doctype>, Element)> {
        let mut xml_decl = None;
        if self.at_xml_decl() {
            self.scanner.skip_string("<?xml");
            xml_decl = Some(self.scanner.scan_xml_decl(false)?);
        }

        let mut doctype = None;
        loop {
            self.scanner.skip_spaces();
            if self.scanner.at_end() {
                return Err(self.fatal("RootElementRequired", Vec::new()));
            } else if self.scan_misc()? {
                continue;
            } else if self.scanner.skip_string("<!DOCTYPE") {
                if doctype.is_some() {
                    return Err(self.fatal("AlreadySeenDoctype", Vec::new()));
                }
                doctype = Some(self.scan_doctype()?);
            } else if self.scanner.peek_string("<!") {
                return Err(self.fatal("MarkupNotRecognizedInProlog", Vec::new()));
            } else if self.scanner.peek_string("<") {
                break;
            } else {
                return Err(self.fatal("ContentIllegalInProlog", Vec::new()));
            }
        }

        let root = self.scan_root()?;

        loop {
            self.scanner.skip_spaces();
            if self.scanner.at_end() {
                break;
            } else if self.scan_misc()? {
                continue;
            } else if self.scanner.peek_string("<!DOCTYPE") {
                return Err(self.fatal("DoctypeNotAllowed", Vec::new()));
            } else if self.scanner.peek_string("<") {
                return Err(self.fatal("MarkupNotRecognizedInMisc", Vec::new()));
            } else {
                return Err(self.fatal("ContentIllegalInTrailingMisc", Vec::new()));
            }
        }
        Ok((xml_decl, doctype, root))
    }

    // comment or processing instruction; the content is dropped
    fn scan_misc(&mut self) -> Result<bool> {
        if self.scanner.skip_string("<!--") {
            self.scanner.scan_comment(&mut self.text)?;
            Ok(true)
        } else if self.scanner.skip_string("<?") {
            self.scanner.scan_pi(&mut self.text)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ------------------------------------------------------------------
    // DOCTYPE

    fn scan_doctype(&mut self) -> Result<Doctype> {
        if !self.scanner.skip_spaces() {
            return Err(self.fatal(
                "MSG_SPACE_REQUIRED_BEFORE_ROOT_ELEMENT_TYPE_IN_DOCTYPEDECL",
                Vec::new(),
            ));
        }
        let Some(name) = self.scanner.scan_name() else {
            return Err(self.fatal("MSG_ROOT_ELEMENT_TYPE_REQUIRED", Vec::new()));
        };
        self.scanner.skip_spaces();
        let external_id = self.scanner.scan_external_id(false)?;
        self.scanner.skip_spaces();

        if self.scanner.skip_char('[') {
            self.scan_internal_subset(&name)?;
            self.scanner.skip_spaces();
        }
        if !self.scanner.skip_char('>') {
            return Err(self.fatal("DoctypedeclUnterminated", vec![name]));
        }
        debug!(root = %name, "doctype");
        Ok(Doctype { name, external_id })
    }

    fn scan_internal_subset(&mut self, doctype: &str) -> Result<()> {
        loop {
            self.scanner.skip_spaces();
            if self.scanner.skip_char(']') {
                return Ok(());
            } else if self.scanner.skip_string("<!ELEMENT") {
                self.scan_element_decl()?;
            } else if self.scanner.skip_string("<!ENTITY") {
                self.scan_entity_decl()?;
            } else if self.scanner.skip_string("<!ATTLIST") || self.scanner.skip_string("<!NOTATION")
            {
                self.skip_markup_decl()?;
            } else if self.scan_misc()? {
                continue;
            } else if self.scanner.skip_char('%') {
                let name = self.scan_reference_name()?;
                self.scanner
                    .report("ParameterEntityNotExpanded", vec![name], Severity::Warning);
            } else if self.scanner.at_end() {
                return Err(self.fatal("DoctypedeclUnterminated", vec![doctype.to_string()]));
            } else {
                return Err(self.fatal("MarkupNotRecognizedInDTD", Vec::new()));
            }
        }
    }

    fn scan_element_decl(&mut self) -> Result<()> {
        if !self.scanner.skip_spaces() {
            return Err(self.fatal("MSG_SPACE_REQUIRED_BEFORE_ELEMENT_TYPE_IN_ELEMENTDECL", Vec::new()));
        }
        let Some(name) = self.scanner.scan_name() else {
            return Err(self.fatal("MSG_ELEMENT_TYPE_REQUIRED_IN_ELEMENTDECL", Vec::new()));
        };
        if !self.scanner.skip_spaces() {
            return Err(self.fatal("MSG_SPACE_REQUIRED_BEFORE_CONTENTSPEC_IN_ELEMENTDECL", vec![name]));
        }

        let mut spec = XmlString::new();
        loop {
            match self.scanner.scan_data(">", &mut spec)? {
                DataStop::Delimiter => break,
                DataStop::Surrogate => self.scanner.scan_surrogates(&mut spec)?,
                DataStop::Invalid(c) => return Err(self.fatal("InvalidCharInDTD", vec![format!("{:x}", c)])),
                DataStop::EndOfInput => return Err(self.fatal("ElementDeclUnterminated", vec![name])),
            }
        }
        let source = spec.to_string_lossy().trim().to_string();

        let model = match parse_content_spec(&source, &mut self.symbols, &ParseContext::new()) {
            Ok(model) => model,
            Err(err) => return Err(self.fatal("MSG_CONTENTSPEC_INVALID", vec![name, err.to_string()])),
        };
        let symbol = self.symbols.intern(&name);
        if self.grammar.get(symbol).is_some() {
            self.scanner
                .report("MSG_ELEMENT_ALREADY_DECLARED", vec![name], Severity::Error);
            return Ok(());
        }

        let dfa = model.compile(&self.options.limits)?;
        debug!(element = %name, states = dfa.state_count(), "compiled element declaration");
        self.grammar.declare(ElementDecl {
            name: symbol,
            source,
            model,
            dfa,
        });
        Ok(())
    }

    fn scan_entity_decl(&mut self) -> Result<()> {
        if !self.scanner.skip_spaces() {
            return Err(self.fatal("MSG_SPACE_REQUIRED_BEFORE_ENTITY_NAME_IN_ENTITYDECL", Vec::new()));
        }
        if self.scanner.skip_char('%') {
            // parameter entities are never expanded
            return self.skip_markup_decl();
        }
        let Some(name) = self.scanner.scan_name() else {
            return Err(self.fatal("MSG_ENTITY_NAME_REQUIRED_IN_ENTITYDECL", Vec::new()));
        };
        if !self.scanner.skip_spaces() {
            return Err(self.fatal("MSG_SPACE_REQUIRED_AFTER_ENTITY_NAME_IN_ENTITYDECL", vec![name]));
        }

        let entity = match self.scanner.peek_char() {
            Some(q) if q == '"' as u16 || q == '\'' as u16 => {
                self.scanner.scan_char();
                let quote = if q == '"' as u16 { '"' } else { '\'' };
                Entity::internal(self.scan_entity_value(&name, quote)?)
            }
            _ => {
                let id = self.scanner.scan_external_id(false)?;
                let Some(system_id) = id.system_id else {
                    return Err(self.fatal("ExternalIDRequired", vec![name]));
                };
                let spaced = self.scanner.skip_spaces();
                let mut notation = None;
                if self.scanner.skip_string("NDATA") {
                    if !spaced {
                        return Err(self.fatal(
                            "MSG_SPACE_REQUIRED_BEFORE_NDATA_IN_UNPARSED_ENTITYDECL",
                            vec![name],
                        ));
                    }
                    self.scanner.skip_spaces();
                    match self.scanner.scan_name() {
                        Some(n) => notation = Some(n),
                        None => {
                            return Err(self.fatal(
                                "MSG_NOTATION_NAME_REQUIRED_FOR_UNPARSED_ENTITYDECL",
                                vec![name],
                            ));
                        }
                    }
                }
                Entity::External {
                    public_id: id.public_id,
                    system_id,
                    notation,
                }
            }
        };

        self.scanner.skip_spaces();
        if !self.scanner.skip_char('>') {
            return Err(self.fatal("EntityDeclUnterminated", vec![name]));
        }
        if !self.scanner.resolver_mut().declare(name.clone(), entity) {
            self.scanner
                .report("MSG_DUPLICATE_ENTITY_DEFINITION", vec![name], Severity::Warning);
        }
        Ok(())
    }

    // literal entity value, cursor after the opening quote; character
    // references are expanded, entity references are kept as written
    fn scan_entity_value(&mut self, name: &str, quote: char) -> Result<String> {
        let mut value = XmlString::new();
        loop {
            match self.scanner.scan_literal(quote, &mut value)? {
                LiteralStop::Quote => break,
                LiteralStop::Markup(c) if c == '&' as u16 && self.peek_char_ref() => {
                    self.scanner.scan_char();
                    self.scanner.scan_char_reference(&mut value)?;
                }
                LiteralStop::Markup(c) if c == '%' as u16 => {
                    self.scanner.scan_char();
                    let pe = self.scan_reference_name()?;
                    self.scanner
                        .report("ParameterEntityNotExpanded", vec![pe], Severity::Warning);
                }
                LiteralStop::Markup(c) => {
                    self.scanner.scan_char();
                    value.push(c);
                }
                LiteralStop::Surrogate => self.scanner.scan_surrogates(&mut value)?,
                LiteralStop::EntityEnd => self.scanner.end_entity(),
                LiteralStop::Invalid(c) => {
                    return Err(self.fatal("InvalidCharInEntityValue", vec![format!("{:x}", c)]));
                }
                LiteralStop::EndOfInput => {
                    return Err(self.fatal("EntityDeclUnterminated", vec![name.to_string()]));
                }
            }
        }
        self.scanner.skip_char(quote);
        Ok(value.to_string_lossy())
    }

    fn peek_char_ref(&mut self) -> bool {
        self.scanner.peek_string("&#")
    }

    // `Name ;` after '&' or '%'
    fn scan_reference_name(&mut self) -> Result<String> {
        let Some(name) = self.scanner.scan_name() else {
            return Err(self.fatal("NameRequiredInReference", Vec::new()));
        };
        if !self.scanner.skip_char(';') {
            return Err(self.fatal("SemicolonRequiredInReference", vec![name]));
        }
        Ok(name)
    }

    // up to the closing '>' outside quoted literals
    fn skip_markup_decl(&mut self) -> Result<()> {
        let mut quote = None;
        loop {
            let Some(c) = self.scanner.scan_char() else {
                return Err(self.fatal("MarkupDeclUnterminated", Vec::new()));
            };
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' as u16 || c == '\'' as u16 => quote = Some(c),
                None if c == '>' as u16 => return Ok(()),
                None => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // elements

    fn scan_root(&mut self) -> Result<Element> {
        self.scanner.skip_char('<');
        let (root, empty) = self.scan_start_tag()?;
        if empty {
            return Ok(root);
        }

        let mut stack = vec![root];
        self.text.clear();
        loop {
            match self.scanner.scan_content(&mut self.text)? {
                ContentStop::Markup(c) if c == '&' as u16 => {
                    self.scan_content_reference()?;
                }
                ContentStop::Markup(_) => {
                    if self.scanner.skip_string("<![CDATA[") {
                        self.scan_cdata()?;
                        continue;
                    }
                    flush_text(&mut self.text, &mut stack);

                    if self.scanner.skip_string("</") {
                        let element = self.scan_end_tag(&mut stack)?;
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Node::Element(element)),
                            None => return Ok(element),
                        }
                    } else if self.scanner.skip_string("<!--") {
                        let mut comment = XmlString::new();
                        self.scanner.scan_comment(&mut comment)?;
                        push_child(&mut stack, Node::Comment(comment.to_string_lossy()));
                    } else if self.scanner.skip_string("<?") {
                        let mut data = XmlString::new();
                        let target = self.scanner.scan_pi(&mut data)?;
                        push_child(
                            &mut stack,
                            Node::ProcessingInstruction {
                                target,
                                data: data.to_string_lossy(),
                            },
                        );
                    } else if self.scanner.peek_string("<!") {
                        return Err(self.fatal("MarkupNotRecognizedInContent", Vec::new()));
                    } else {
                        let limits = &self.options.limits;
                        if limits.check_element_depth(stack.len() + 1).is_err() {
                            let max = limits.max_element_depth.to_string();
                            return Err(self.fatal("ElementDepthLimit", vec![max]));
                        }
                        self.scanner.skip_char('<');
                        let (element, empty) = self.scan_start_tag()?;
                        if empty {
                            push_child(&mut stack, Node::Element(element));
                        } else {
                            stack.push(element);
                        }
                    }
                }
                ContentStop::CdataEnd => return Err(self.fatal("CDEndInContent", Vec::new())),
                ContentStop::Surrogate => self.scanner.scan_surrogates(&mut self.text)?,
                ContentStop::Invalid(c) => {
                    return Err(self.fatal("InvalidCharInContent", vec![format!("{:x}", c)]));
                }
                ContentStop::EndOfInput => {
                    let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
                    return Err(self.fatal("ETagRequired", vec![open]));
                }
            }
        }
    }

    // after '<'; returns the element and whether it was empty-element syntax
    fn scan_start_tag(&mut self) -> Result<(Element, bool)> {
        let Some(name) = self.scanner.scan_name() else {
            return Err(self.fatal("MarkupNotRecognizedInContent", Vec::new()));
        };
        self.symbols.intern(&name);

        let mut attributes = IndexMap::new();
        let empty = loop {
            let spaced = self.scanner.skip_spaces();
            if self.scanner.skip_char('>') {
                break false;
            }
            if self.scanner.skip_string("/>") {
                break true;
            }
            if !spaced {
                return Err(self.fatal("ElementUnterminated", vec![name]));
            }
            let Some(attribute) = self.scanner.scan_name() else {
                return Err(self.fatal("ElementUnterminated", vec![name]));
            };
            self.scanner.skip_spaces();
            if !self.scanner.skip_char('=') {
                return Err(self.fatal("EqRequiredInAttribute", vec![name, attribute]));
            }
            self.scanner.skip_spaces();
            let value = self.scanner.scan_attribute_value(&name, &attribute)?;
            if attributes.contains_key(&attribute) {
                return Err(self.fatal("AttributeNotUnique", vec![name, attribute]));
            }
            attributes.insert(attribute, value.value);
        };

        let qname = if self.options.namespaces {
            self.resolve_names(&name, &attributes)?
        } else {
            QName::local(name.as_str())
        };
        if let Some(namespace) = &qname.namespace {
            self.symbols.intern(namespace);
        }
        if empty && self.options.namespaces {
            self.namespaces.pop_scope();
        }

        let mut element = Element::new(name, qname);
        element.attributes = attributes;
        Ok((element, empty))
    }

    // opens the element's namespace scope
    fn resolve_names(&mut self, name: &str, attributes: &IndexMap<String, String>) -> Result<QName> {
        self.namespaces.push_scope();
        for (attribute, value) in attributes {
            if attribute == "xmlns" {
                self.namespaces.set_default_namespace(value.as_str());
            } else if let Some(prefix) = attribute.strip_prefix("xmlns:") {
                self.namespaces.add_prefix(prefix, value.as_str());
            }
        }

        let qname = match self.namespaces.resolve(name) {
            Ok(qname) => qname,
            Err(_) => {
                let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or_default();
                return Err(self.fatal("ElementPrefixUnbound", vec![name.to_string(), prefix.to_string()]));
            }
        };
        for attribute in attributes.keys() {
            let Some((prefix, _)) = attribute.split_once(':') else {
                continue;
            };
            if prefix != "xmlns" && self.namespaces.get_namespace(prefix).is_none() {
                let args = vec![name.to_string(), attribute.clone(), prefix.to_string()];
                return Err(self.fatal("AttributePrefixUnbound", args));
            }
        }
        Ok(qname)
    }

    // after "</"
    fn scan_end_tag(&mut self, stack: &mut Vec<Element>) -> Result<Element> {
        let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        let closes_open = matches!(self.scanner.scan_name(), Some(name) if name == open);
        if !closes_open {
            return Err(self.fatal("ETagRequired", vec![open]));
        }
        self.scanner.skip_spaces();
        if !self.scanner.skip_char('>') {
            return Err(self.fatal("ETagUnterminated", vec![open]));
        }
        if self.options.namespaces {
            self.namespaces.pop_scope();
        }
        match stack.pop() {
            Some(element) => Ok(element),
            None => Err(self.fatal("ETagRequired", vec![open])),
        }
    }

    // after '&' in content; expanded text lands in `self.text`
    fn scan_content_reference(&mut self) -> Result<()> {
        self.scanner.scan_char();
        if self.scanner.peek_string("#") {
            self.scanner.scan_char_reference(&mut self.text)?;
            return Ok(());
        }
        let name = self.scan_reference_name()?;
        match predefined_entity(&name) {
            Some(c) => self.text.push_char(c),
            None => {
                self.scanner.start_entity(&name)?;
            }
        }
        Ok(())
    }

    // after "<![CDATA["; the section joins the surrounding character data
    fn scan_cdata(&mut self) -> Result<()> {
        loop {
            match self.scanner.scan_data("]]>", &mut self.text)? {
                DataStop::Delimiter => return Ok(()),
                DataStop::Surrogate => self.scanner.scan_surrogates(&mut self.text)?,
                DataStop::Invalid(c) => {
                    return Err(self.fatal("InvalidCharInCDSect", vec![format!("{:x}", c)]));
                }
                DataStop::EndOfInput => return Err(self.fatal("CDSectUnterminated", Vec::new())),
            }
        }
    }
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn flush_text(text: &mut XmlString, stack: &mut [Element]) {
    if text.is_empty() {
        return;
    }
    let node = Node::Text(text.to_string_lossy());
    text.clear();
    push_child(stack, node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::EntityResolver;

    fn parse(text: &str) -> Document {
        Document::parse(text, &DocumentOptions::default()).unwrap()
    }

    fn fatal_key(text: &str) -> String {
        match Document::parse(text, &DocumentOptions::default()) {
            Err(Error::Scan(err)) => err.key,
            other => panic!("expected scan error, got {:?}", other.map(|d| d.root)),
        }
    }

    #[test]
    fn test_parse_simple_document() {
        let doc = parse("<?xml version=\"1.0\"?>\n<root a=\"1\"><child>text</child><!-- c --><?pi x?></root>");
        assert_eq!(doc.xml_decl.as_ref().and_then(|d| d.version.as_deref()), Some("1.0"));
        assert_eq!(doc.root.name, "root");
        assert_eq!(doc.root.get_attribute("a"), Some("1"));
        assert_eq!(doc.root.children.len(), 3);

        let child = doc.root.child_elements().next().unwrap();
        assert_eq!(child.text(), "text");
        assert!(matches!(&doc.root.children[1], Node::Comment(c) if c == " c "));
        assert!(matches!(
            &doc.root.children[2],
            Node::ProcessingInstruction { target, data } if target == "pi" && data == "x"
        ));
    }

    #[test]
    fn test_references_and_cdata() {
        let doc = parse("<r>a&lt;b&#x41;<![CDATA[<raw>]]>c</r>");
        assert_eq!(doc.root.text(), "a<bA<raw>c");
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn test_internal_entity_expansion() {
        let doc = parse(
            "<!DOCTYPE r [<!ELEMENT r (#PCDATA)><!ENTITY who \"world &#x41; co\">]><r>hello &who;</r>",
        );
        assert_eq!(doc.root.text(), "hello world A co");
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn test_entity_with_markup() {
        let doc = parse(
            "<!DOCTYPE r [<!ELEMENT r (b)><!ELEMENT b EMPTY><!ENTITY e \"<b/>\">]><r>&e;</r>",
        );
        assert_eq!(doc.root.child_elements().count(), 1);
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let doc = parse(
            "<!DOCTYPE book [\n\
               <!ELEMENT book (title, author+)>\n\
               <!ELEMENT title (#PCDATA)>\n\
               <!ELEMENT author (#PCDATA)>\n\
             ]>\n\
             <book><title>T</title></book>",
        );
        let errors = doc.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some("/book"));
        assert_eq!(errors[0].child_index, Some(1));
        assert!(errors[0].reason.as_deref().unwrap().contains("author"));
        assert!(doc
            .diagnostics()
            .iter()
            .any(|d| d.key == "MSG_CONTENT_INCOMPLETE" && d.severity == Severity::Error));
    }

    #[test]
    fn test_invalid_child_and_undeclared() {
        let doc = parse(
            "<!DOCTYPE a [<!ELEMENT a (b)*><!ELEMENT b EMPTY>]><a><b/>text<c/></a>",
        );
        let errors = doc.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].child_index, Some(1));
        assert!(errors[0].reason.as_deref().unwrap().contains("character data"));
        assert_eq!(errors[1].path.as_deref(), Some("/a/c"));
    }

    #[test]
    fn test_whitespace_is_ignorable() {
        let doc = parse("<!DOCTYPE a [<!ELEMENT a (b,b)><!ELEMENT b EMPTY>]><a>\n  <b/>\n  <b/>\n</a>");
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn test_root_must_match_doctype() {
        let doc = parse("<!DOCTYPE a [<!ELEMENT a EMPTY><!ELEMENT b EMPTY>]><b/>");
        let errors = doc.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must match DOCTYPE root"));
    }

    #[test]
    fn test_no_doctype_is_valid() {
        let doc = parse("<a><anything/></a>");
        assert!(doc.validate().is_empty());
        assert!(doc.grammar().is_empty());
    }

    #[test]
    fn test_duplicate_declarations() {
        let doc = parse(
            "<!DOCTYPE a [<!ELEMENT a EMPTY><!ELEMENT a ANY><!ENTITY e \"1\"><!ENTITY e \"2\">]><a/>",
        );
        assert_eq!(doc.grammar().len(), 1);
        let keys: Vec<_> = doc.diagnostics().iter().map(|d| d.key.as_str()).collect();
        assert!(keys.contains(&"MSG_ELEMENT_ALREADY_DECLARED"));
        assert!(keys.contains(&"MSG_DUPLICATE_ENTITY_DEFINITION"));
        assert_eq!(
            doc.entities().iter().next().map(|(_, e)| e.clone()),
            Some(Entity::internal("1"))
        );
    }

    #[test]
    fn test_skipped_declarations() {
        let doc = parse(
            "<!DOCTYPE a SYSTEM \"a.dtd\" [\n\
               <!ATTLIST a x CDATA \"a>b\">\n\
               <!NOTATION gif PUBLIC \"image/gif\">\n\
               <!ENTITY logo SYSTEM \"logo.gif\" NDATA gif>\n\
               %pe;\n\
               <!ELEMENT a EMPTY>\n\
             ]><a/>",
        );
        let doctype = doc.doctype.as_ref().unwrap();
        assert_eq!(doctype.external_id.system_id.as_deref(), Some("a.dtd"));
        assert!(doc.entities().resolve("logo").is_some_and(Entity::is_unparsed));
        assert!(doc
            .diagnostics()
            .iter()
            .any(|d| d.key == "ParameterEntityNotExpanded" && d.severity == Severity::Warning));
    }

    #[test]
    fn test_namespaces() {
        let options = DocumentOptions::new().with_namespaces(true);
        let doc = Document::parse(
            "<bk:book xmlns:bk=\"urn:books\" xmlns=\"urn:default\"><title/></bk:book>",
            &options,
        )
        .unwrap();
        assert_eq!(doc.root.namespace(), Some("urn:books"));
        assert_eq!(doc.root.local_name(), "book");
        let title = doc.root.child_elements().next().unwrap();
        assert_eq!(title.namespace(), Some("urn:default"));

        let err = Document::parse("<x:a/>", &options).unwrap_err();
        assert!(matches!(err, Error::Scan(e) if e.key == "ElementPrefixUnbound"));
    }

    #[test]
    fn test_well_formedness_errors() {
        assert_eq!(fatal_key(""), "RootElementRequired");
        assert_eq!(fatal_key("text<a/>"), "ContentIllegalInProlog");
        assert_eq!(fatal_key("<a></b>"), "ETagRequired");
        assert_eq!(fatal_key("<a>"), "ETagRequired");
        assert_eq!(fatal_key("<a x='1' x='2'/>"), "AttributeNotUnique");
        assert_eq!(fatal_key("<a x'1'/>"), "EqRequiredInAttribute");
        assert_eq!(fatal_key("<a>]]></a>"), "CDEndInContent");
        assert_eq!(fatal_key("<a/><b/>"), "MarkupNotRecognizedInMisc");
        assert_eq!(fatal_key("<a/>tail"), "ContentIllegalInTrailingMisc");
        assert_eq!(fatal_key("<a/><!DOCTYPE a>"), "DoctypeNotAllowed");
        assert_eq!(fatal_key("<!DOCTYPE a><!DOCTYPE a><a/>"), "AlreadySeenDoctype");
        assert_eq!(fatal_key("<a>&undefined;</a>"), "EntityNotDeclared");
        assert_eq!(fatal_key("<!DOCTYPE a [<!ELEMENT a (b,|c)>]><a/>"), "MSG_CONTENTSPEC_INVALID");
    }

    #[test]
    fn test_element_depth_limit() {
        let limits = Limits {
            max_element_depth: 2,
            ..Limits::default()
        };
        let options = DocumentOptions::new().with_limits(limits);
        assert!(Document::parse("<a><b/><b></b></a>", &options).is_ok());
        let err = Document::parse("<a><b><c/></b></a>", &options).unwrap_err();
        assert!(matches!(err, Error::Scan(e) if e.key == "ElementDepthLimit"));
    }

    #[test]
    fn test_validate_disabled_keeps_diagnostics_clean() {
        let options = DocumentOptions::new().with_validate(false);
        let doc = Document::parse("<!DOCTYPE a [<!ELEMENT a EMPTY>]><a><a/></a>", &options).unwrap();
        assert!(doc.diagnostics().is_empty());
        assert_eq!(doc.validate().len(), 1);
    }
}
