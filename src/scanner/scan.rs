//! Primitive scans over an entity input stack
//!
//! [`XmlScanner`] owns the cursor (an [`InputStack`]), the entity nesting
//! depth, a pool of reusable buffers and the two collaborators it talks to:
//! an [`ErrorReporter`] and an [`EntityResolver`]. Higher-level drivers call
//! the `scan_*` operations below; each consumes exactly the construct it
//! names or reports a fatal error and returns [`Error::Scan`].
//!
//! All text is handled as UTF-16 code units (see [`XmlString`]).

use tracing::trace;

use super::buffer::{BufferPool, XmlString};
use super::entities::{predefined_entity, Entity, EntityResolver, EntityStore};
use super::input::InputStack;
use super::reporter::{CollectingReporter, ErrorReporter, Severity, XML_DOMAIN};
use crate::error::{Error, Result, ScanError};
use crate::limits::Limits;
use crate::names::{
    is_char, is_content, is_high_surrogate, is_invalid, is_low_surrogate, is_name, is_name_start,
    is_pubid, is_space, is_valid_encoding_name, supplemental,
};

const VERSION: &str = "version";
const ENCODING: &str = "encoding";
const STANDALONE: &str = "standalone";

fn unit(c: char) -> u16 {
    c as u16
}

fn hex(c: u32) -> String {
    format!("{:x}", c)
}

/// Scanner settings
#[derive(Debug, Clone, Default)]
pub struct ScannerOptions {
    /// Namespace processing in the surrounding driver
    pub namespaces: bool,
    /// Remember the literal text of the last character reference in content
    pub notify_char_refs: bool,
    /// Also produce attribute values before whitespace normalization
    pub need_non_normalized_value: bool,
    /// Resource limits
    pub limits: Limits,
}

impl ScannerOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable namespace processing
    pub fn with_namespaces(mut self, namespaces: bool) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Record character reference literals
    pub fn with_notify_char_refs(mut self, notify: bool) -> Self {
        self.notify_char_refs = notify;
        self
    }

    /// Produce non-normalized attribute values
    pub fn with_non_normalized_value(mut self, need: bool) -> Self {
        self.need_non_normalized_value = need;
        self
    }

    /// Set resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Pseudo-attributes of an XML or text declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDecl {
    /// `version`
    pub version: Option<String>,
    /// `encoding`
    pub encoding: Option<String>,
    /// `standalone`
    pub standalone: Option<String>,
}

/// `PUBLIC`/`SYSTEM` identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalId {
    /// Public identifier, whitespace-normalized
    pub public_id: Option<String>,
    /// System identifier
    pub system_id: Option<String>,
}

/// A scanned attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    /// Normalized value
    pub value: String,
    /// Value before whitespace normalization, references kept as written
    pub non_normalized: Option<String>,
}

/// Why [`XmlScanner::scan_literal`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStop {
    /// At the closing quote (not consumed)
    Quote,
    /// At `&`, `<`, `%` or `]` (not consumed)
    Markup(u16),
    /// At a high surrogate (not consumed)
    Surrogate,
    /// At a character that may not appear in a literal (not consumed)
    Invalid(u32),
    /// An entity opened inside the literal ran out; the next call resumes
    /// in the entity below it
    EntityEnd,
    /// The document ended
    EndOfInput,
}

/// Why [`XmlScanner::scan_data`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStop {
    /// After the delimiter
    Delimiter,
    /// At a high surrogate (not consumed)
    Surrogate,
    /// At an invalid character (not consumed)
    Invalid(u32),
    /// The current entity ended before the delimiter
    EndOfInput,
}

/// Why [`XmlScanner::scan_content`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStop {
    /// At `<` or `&` (not consumed)
    Markup(u16),
    /// At `]]>` (not consumed)
    CdataEnd,
    /// At a high surrogate (not consumed)
    Surrogate,
    /// At an invalid character (not consumed)
    Invalid(u32),
    /// The document ended
    EndOfInput,
}

#[derive(Debug, Clone, Copy)]
struct LiteralState {
    quote: u16,
    depth: usize,
}

/// Stateful scanner for one document
pub struct XmlScanner<R: ErrorReporter = CollectingReporter, E: EntityResolver = EntityStore> {
    input: InputStack,
    reporter: R,
    resolver: E,
    options: ScannerOptions,
    pool: BufferPool,
    entity_depth: usize,
    literal: Option<LiteralState>,
    whitespace: Vec<usize>,
    scanning_attribute: bool,
    char_ref_literal: Option<String>,
    expansions: usize,
}

impl XmlScanner {
    /// Scanner with a collecting reporter and an empty entity store
    pub fn from_text(text: &str) -> Self {
        Self::new(text, CollectingReporter::new(), EntityStore::new())
    }
}

impl<R: ErrorReporter, E: EntityResolver> XmlScanner<R, E> {
    /// Create a scanner over `text`
    pub fn new(text: &str, reporter: R, resolver: E) -> Self {
        Self {
            input: InputStack::new(text),
            reporter,
            resolver,
            options: ScannerOptions::default(),
            pool: BufferPool::new(),
            entity_depth: 0,
            literal: None,
            whitespace: Vec::new(),
            scanning_attribute: false,
            char_ref_literal: None,
            expansions: 0,
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: ScannerOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    /// The error reporter
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// The error reporter, mutably
    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// The entity resolver
    pub fn resolver(&self) -> &E {
        &self.resolver
    }

    /// The entity resolver, mutably
    pub fn resolver_mut(&mut self) -> &mut E {
        &mut self.resolver
    }

    /// Give up the scanner, returning its collaborators
    pub fn into_parts(self) -> (R, E) {
        (self.reporter, self.resolver)
    }

    /// Current entity nesting depth
    pub fn entity_depth(&self) -> usize {
        self.entity_depth
    }

    /// Line and column of the cursor in the innermost entity
    pub fn location(&self) -> (usize, usize) {
        self.input.location()
    }

    /// Literal text (`#x41`, `#65`) of the last character reference
    /// scanned outside an attribute, when enabled in the options
    pub fn take_char_ref_literal(&mut self) -> Option<String> {
        self.char_ref_literal.take()
    }

    /// The buffer pool
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // reporting

    /// Deliver a diagnostic to the reporter
    pub fn report(&mut self, key: &str, args: Vec<String>, severity: Severity) {
        self.reporter.report(XML_DOMAIN, key, &args, severity);
    }

    /// Report a fatal error and build the error that unwinds the scan
    pub fn fatal(&mut self, key: &str, args: Vec<String>) -> Error {
        self.reporter.report(XML_DOMAIN, key, &args, Severity::Fatal);
        let (line, column) = self.input.location();
        ScanError::fatal(key, args).with_location(line, column).into()
    }

    fn check_limit(&mut self, check: Result<()>, key: &str, limit: usize) -> Result<()> {
        match check {
            Ok(()) => Ok(()),
            Err(_) => Err(self.fatal(key, vec![limit.to_string()])),
        }
    }

    // ------------------------------------------------------------------
    // entities

    /// Begin expanding the general entity `name`.
    ///
    /// Internal entities push their replacement text and increase the
    /// entity depth; returns `false` for external parsed entities, which
    /// are reported and skipped.
    pub fn start_entity(&mut self, name: &str) -> Result<bool> {
        let value = match self.resolver.resolve(name) {
            Some(Entity::Internal { value }) => value.clone(),
            Some(Entity::External { notation: Some(_), .. }) => {
                return Err(self.fatal("ReferenceToUnparsedEntity", vec![name.to_string()]));
            }
            Some(Entity::External { .. }) => {
                self.report("ExternalEntityNotExpanded", vec![name.to_string()], Severity::Warning);
                return Ok(false);
            }
            None => return Err(self.fatal("EntityNotDeclared", vec![name.to_string()])),
        };
        if self.input.contains(name) {
            return Err(self.fatal("RecursiveReference", vec![name.to_string()]));
        }

        self.expansions += 1;
        let limits = self.options.limits.clone();
        self.check_limit(
            limits.check_entity_expansions(self.expansions),
            "EntityExpansionLimit",
            limits.max_entity_expansions,
        )?;
        self.check_limit(
            limits.check_entity_depth(self.entity_depth + 1),
            "EntityDepthLimit",
            limits.max_entity_depth,
        )?;

        self.input.push(name, &value);
        self.entity_depth += 1;
        trace!(entity = name, depth = self.entity_depth, "start entity");
        Ok(true)
    }

    /// Stop reading the innermost entity. The depth never drops below 0.
    pub fn end_entity(&mut self) {
        if let Some(name) = self.input.pop() {
            trace!(entity = %name, depth = self.entity_depth, "end entity");
        }
        if self.entity_depth > 0 {
            self.entity_depth -= 1;
        }
    }

    // finish exhausted entities so the cursor sits on the next real unit
    fn fill(&mut self) {
        while self.input.at_entity_end() && self.input.depth() > 0 {
            self.end_entity();
        }
    }

    // ------------------------------------------------------------------
    // cursor

    /// Next code unit, crossing the end of finished entities
    pub fn peek_char(&mut self) -> Option<u16> {
        self.fill();
        self.input.peek()
    }

    /// Consume one code unit
    pub fn scan_char(&mut self) -> Option<u16> {
        self.fill();
        self.input.read()
    }

    /// Consume `c` if it is next
    pub fn skip_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(unit(c)) {
            self.input.read();
            true
        } else {
            false
        }
    }

    /// Consume `s` if the current entity continues with it
    pub fn skip_string(&mut self, s: &str) -> bool {
        self.fill();
        self.input.skip_str(s)
    }

    /// Check whether the current entity continues with `s`
    pub fn peek_string(&mut self, s: &str) -> bool {
        self.fill();
        self.input.starts_with(s)
    }

    /// Skip white space, returning whether any was found
    pub fn skip_spaces(&mut self) -> bool {
        let mut skipped = false;
        while self.peek_char().is_some_and(|c| is_space(c as u32)) {
            self.input.read();
            skipped = true;
        }
        skipped
    }

    /// Check whether the whole document has been consumed
    pub fn at_end(&mut self) -> bool {
        self.peek_char().is_none()
    }

    // code point at the cursor and the number of units it occupies
    fn peek_code_point(&self) -> Option<(u32, usize)> {
        let first = self.input.peek()?;
        if is_high_surrogate(first as u32) {
            if let Some(low) = self.input.peek_raw(1).filter(|&u| is_low_surrogate(u as u32)) {
                return Some((supplemental(first, low), 2));
            }
        }
        Some((first as u32, 1))
    }

    /// Scan an XML Name, or return `None` without consuming anything
    pub fn scan_name(&mut self) -> Option<String> {
        self.fill();
        let mut name = XmlString::new();
        match self.peek_code_point() {
            Some((c, _)) if is_name_start(c) => {}
            _ => return None,
        }
        while let Some((c, width)) = self.peek_code_point() {
            if !is_name(c) {
                break;
            }
            name.push_code_point(c);
            for _ in 0..width {
                self.input.read();
            }
        }
        Some(name.to_string_lossy())
    }

    /// Scan one of the pseudo-attribute names `version`, `encoding` or
    /// `standalone`, dispatching on the first character
    pub fn scan_pseudo_attribute_name(&mut self) -> Option<&'static str> {
        let candidate = match self.peek_char().and_then(|u| char::from_u32(u as u32)) {
            Some('v') => VERSION,
            Some('e') => ENCODING,
            Some('s') => STANDALONE,
            _ => return None,
        };
        self.input.skip_str(candidate).then_some(candidate)
    }

    // ------------------------------------------------------------------
    // literals

    /// Copy literal characters into `out` until the closing `quote`.
    ///
    /// The closing quote only counts at the entity depth the literal began
    /// at; a quote inside an expanded entity is data, and the scan stops
    /// with [`LiteralStop::EntityEnd`] when such an entity runs out. Tabs,
    /// line feeds and carriage returns (only left in entity text) are
    /// copied as-is and their offsets in `out` recorded for
    /// [`normalize_whitespace`](Self::normalize_whitespace).
    pub fn scan_literal(&mut self, quote: char, out: &mut XmlString) -> Result<LiteralStop> {
        let quote = unit(quote);
        let depth = match self.literal {
            Some(state) if state.quote == quote => state.depth,
            _ => {
                self.literal = Some(LiteralState {
                    quote,
                    depth: self.entity_depth,
                });
                self.entity_depth
            }
        };
        self.whitespace.clear();
        let max_length = self.options.limits.max_literal_length;

        loop {
            if self.entity_depth > depth && self.input.at_entity_end() {
                return Ok(LiteralStop::EntityEnd);
            }
            let Some(c) = self.peek_char() else {
                self.literal = None;
                return Ok(LiteralStop::EndOfInput);
            };
            if c == quote && self.entity_depth == depth {
                self.literal = None;
                return Ok(LiteralStop::Quote);
            }

            let code = c as u32;
            if c == unit('<') || c == unit('&') || c == unit('%') || c == unit(']') {
                return Ok(LiteralStop::Markup(c));
            }
            if is_high_surrogate(code) {
                return Ok(LiteralStop::Surrogate);
            }
            if !is_content(code) {
                return Ok(LiteralStop::Invalid(code));
            }

            if c == unit('\t') || c == unit('\n') || c == unit('\r') {
                self.whitespace.push(out.len());
            }
            out.push(c);
            self.input.read();
            if out.len() > max_length {
                return Err(self.fatal("LiteralLengthLimit", vec![max_length.to_string()]));
            }
        }
    }

    /// Rewrite the white space recorded by the last
    /// [`scan_literal`](Self::scan_literal) to `' '`
    pub fn normalize_whitespace(&self, value: &mut XmlString) {
        for &offset in &self.whitespace {
            if offset < value.len() {
                value.set(offset, unit(' '));
            }
        }
    }

    /// Scan an attribute value, cursor at the opening quote.
    ///
    /// Character and entity references are expanded; internal entities are
    /// read through the entity stack.
    pub fn scan_attribute_value(&mut self, element: &str, attribute: &str) -> Result<AttributeValue> {
        let quote = match self.peek_char() {
            Some(q) if q == unit('"') || q == unit('\'') => q,
            _ => {
                let args = vec![element.to_string(), attribute.to_string()];
                return Err(self.fatal("OpenQuoteExpected", args));
            }
        };
        self.input.read();
        self.literal = Some(LiteralState {
            quote,
            depth: self.entity_depth,
        });
        self.scanning_attribute = true;

        let mut value = self.pool.take();
        let mut raw = self
            .options
            .need_non_normalized_value
            .then(|| self.pool.take());
        let scanned = self.scan_attribute_segments(element, attribute, quote, &mut value, &mut raw);

        self.literal = None;
        self.scanning_attribute = false;
        let result = scanned.map(|()| AttributeValue {
            value: value.to_string_lossy(),
            non_normalized: raw.as_ref().map(XmlString::to_string_lossy),
        });
        self.pool.give_back(value);
        if let Some(raw) = raw {
            self.pool.give_back(raw);
        }
        result
    }

    // body of an attribute value up to and including the closing quote;
    // `raw` only receives text read at the attribute's own depth
    fn scan_attribute_segments(
        &mut self,
        element: &str,
        attribute: &str,
        quote: u16,
        value: &mut XmlString,
        raw: &mut Option<XmlString>,
    ) -> Result<()> {
        let args = || vec![element.to_string(), attribute.to_string()];
        let quote_char = if quote == unit('"') { '"' } else { '\'' };
        let depth = self.entity_depth;

        let mut segment = self.pool.take();
        let stop = loop {
            segment.clear();
            let stop = match self.scan_literal(quote_char, &mut segment) {
                Ok(stop) => stop,
                Err(err) => break Err(err),
            };
            let at_depth = self.entity_depth == depth;
            if let Some(raw) = raw.as_mut().filter(|_| at_depth) {
                raw.append(&segment);
            }
            self.normalize_whitespace(&mut segment);
            value.append(&segment);

            match stop {
                LiteralStop::Quote => break Ok(()),
                LiteralStop::EntityEnd => self.end_entity(),
                LiteralStop::Markup(c) if c == unit('&') => {
                    self.input.read();
                    let mut raw_here = raw.as_mut().filter(|_| at_depth);
                    if let Some(raw) = raw_here.as_deref_mut() {
                        raw.push(c);
                    }
                    let scanned = if self.skip_char('#') {
                        if let Some(raw) = raw_here.as_deref_mut() {
                            raw.push(unit('#'));
                        }
                        self.scan_char_reference_value(value, raw_here).map(|_| ())
                    } else {
                        self.scan_attribute_entity_reference(value, raw_here)
                    };
                    if let Err(err) = scanned {
                        break Err(err);
                    }
                }
                LiteralStop::Markup(c) if c == unit('<') => {
                    break Err(self.fatal("LessthanInAttValue", args()));
                }
                LiteralStop::Markup(c) => {
                    self.input.read();
                    value.push(c);
                    if let Some(raw) = raw.as_mut().filter(|_| at_depth) {
                        raw.push(c);
                    }
                }
                LiteralStop::Surrogate => {
                    let mut pair = self.pool.take();
                    let scanned = self.scan_surrogates(&mut pair);
                    value.append(&pair);
                    if let Some(raw) = raw.as_mut().filter(|_| at_depth) {
                        raw.append(&pair);
                    }
                    self.pool.give_back(pair);
                    if let Err(err) = scanned {
                        break Err(err);
                    }
                }
                LiteralStop::Invalid(c) => {
                    let mut args = args();
                    args.push(hex(c));
                    break Err(self.fatal("InvalidCharInAttValue", args));
                }
                LiteralStop::EndOfInput => {
                    break Err(self.fatal("CloseQuoteExpected", args()));
                }
            }
        };
        self.pool.give_back(segment);
        stop?;

        if !self.skip_char(quote_char) {
            return Err(self.fatal("CloseQuoteExpected", args()));
        }
        Ok(())
    }

    // after '&' inside an attribute value
    fn scan_attribute_entity_reference(
        &mut self,
        value: &mut XmlString,
        mut raw: Option<&mut XmlString>,
    ) -> Result<()> {
        let Some(name) = self.scan_name() else {
            return Err(self.fatal("NameRequiredInReference", Vec::new()));
        };
        if let Some(raw) = raw.as_deref_mut() {
            raw.push_str(&name);
        }
        if !self.skip_char(';') {
            return Err(self.fatal("SemicolonRequiredInReference", vec![name]));
        }
        if let Some(raw) = raw.as_deref_mut() {
            raw.push(unit(';'));
        }

        if let Some(c) = predefined_entity(&name) {
            value.push_char(c);
        } else if self.resolver.is_unparsed_entity(&name) {
            return Err(self.fatal("ReferenceToUnparsedEntity", vec![name]));
        } else if self.resolver.is_external_entity(&name) {
            return Err(self.fatal("ReferenceToExternalEntity", vec![name]));
        } else if !self.resolver.is_declared_entity(&name) {
            return Err(self.fatal("EntityNotDeclared", vec![name]));
        } else {
            self.start_entity(&name)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // references and surrogates

    /// Scan `#NNN;` or `#xHHH;` and append the referenced character to
    /// `out` (one unit, or a surrogate pair above U+FFFF). Returns the
    /// code point.
    pub fn scan_char_reference(&mut self, out: &mut XmlString) -> Result<u32> {
        if !self.skip_char('#') {
            return Err(self.fatal("DigitRequiredInCharRef", Vec::new()));
        }
        self.scan_char_reference_value(out, None)
    }

    // after "&#"
    fn scan_char_reference_value(
        &mut self,
        out: &mut XmlString,
        mut raw: Option<&mut XmlString>,
    ) -> Result<u32> {
        let is_hex = self.skip_char('x');
        if is_hex {
            if let Some(raw) = raw.as_deref_mut() {
                raw.push(unit('x'));
            }
        }

        let mut digits = String::new();
        while let Some(c) = self.peek_char().and_then(|u| char::from_u32(u as u32)) {
            let is_digit = if is_hex {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            };
            if !is_digit {
                break;
            }
            digits.push(c);
            self.input.read();
        }
        if let Some(raw) = raw.as_deref_mut() {
            raw.push_str(&digits);
        }
        if digits.is_empty() {
            let key = if is_hex {
                "HexdigitRequiredInCharRef"
            } else {
                "DigitRequiredInCharRef"
            };
            return Err(self.fatal(key, Vec::new()));
        }

        if !self.skip_char(';') {
            return Err(self.fatal("SemicolonRequiredInCharRef", Vec::new()));
        }
        if let Some(raw) = raw.as_deref_mut() {
            raw.push(unit(';'));
        }

        let literal = if is_hex {
            format!("x{}", digits)
        } else {
            digits.clone()
        };
        let value = match u32::from_str_radix(&digits, if is_hex { 16 } else { 10 }) {
            Ok(value) if is_char(value) => value,
            _ => return Err(self.fatal("InvalidCharRef", vec![literal])),
        };

        out.push_code_point(value);
        if self.options.notify_char_refs && !self.scanning_attribute {
            self.char_ref_literal = Some(format!("#{}", literal));
        }
        Ok(value)
    }

    /// Consume a surrogate pair, cursor at the high surrogate, and append
    /// both units to `out`
    pub fn scan_surrogates(&mut self, out: &mut XmlString) -> Result<()> {
        let Some(high) = self.scan_char() else {
            return Err(self.fatal("PrematureEOF", Vec::new()));
        };
        let low = match self.input.peek() {
            Some(low) if is_low_surrogate(low as u32) => low,
            _ => return Err(self.fatal("InvalidCharInContent", vec![hex(high as u32)])),
        };
        self.input.read();

        let c = supplemental(high, low);
        if is_invalid(c) {
            return Err(self.fatal("InvalidCharInContent", vec![hex(c)]));
        }
        out.push(high);
        out.push(low);
        Ok(())
    }

    // ------------------------------------------------------------------
    // delimited data

    /// Copy data into `out` up to and including `delimiter`, which is not
    /// copied. Data never crosses the end of the current entity.
    pub fn scan_data(&mut self, delimiter: &str, out: &mut XmlString) -> Result<DataStop> {
        let max_length = self.options.limits.max_literal_length;
        loop {
            if self.input.skip_str(delimiter) {
                return Ok(DataStop::Delimiter);
            }
            let Some(c) = self.input.peek() else {
                return Ok(DataStop::EndOfInput);
            };
            let code = c as u32;
            if is_high_surrogate(code) {
                return Ok(DataStop::Surrogate);
            }
            if is_invalid(code) || is_low_surrogate(code) {
                return Ok(DataStop::Invalid(code));
            }
            out.push(c);
            self.input.read();
            if out.len() > max_length {
                return Err(self.fatal("LiteralLengthLimit", vec![max_length.to_string()]));
            }
        }
    }

    /// Copy character data into `out` until markup, `]]>` or the end of
    /// the document. Finished entities are crossed transparently.
    pub fn scan_content(&mut self, out: &mut XmlString) -> Result<ContentStop> {
        let max_length = self.options.limits.max_literal_length;
        loop {
            let Some(c) = self.peek_char() else {
                return Ok(ContentStop::EndOfInput);
            };
            let code = c as u32;
            if c == unit('<') || c == unit('&') {
                return Ok(ContentStop::Markup(c));
            }
            if c == unit(']') && self.input.starts_with("]]>") {
                return Ok(ContentStop::CdataEnd);
            }
            if is_high_surrogate(code) {
                return Ok(ContentStop::Surrogate);
            }
            if is_invalid(code) || is_low_surrogate(code) {
                return Ok(ContentStop::Invalid(code));
            }
            out.push(c);
            self.input.read();
            if out.len() > max_length {
                return Err(self.fatal("LiteralLengthLimit", vec![max_length.to_string()]));
            }
        }
    }

    /// Scan a comment body, cursor after `<!--`
    pub fn scan_comment(&mut self, text: &mut XmlString) -> Result<()> {
        text.clear();
        loop {
            match self.scan_data("--", text)? {
                DataStop::Delimiter => break,
                DataStop::Surrogate => self.scan_surrogates(text)?,
                DataStop::Invalid(c) => return Err(self.fatal("InvalidCharInComment", vec![hex(c)])),
                DataStop::EndOfInput => return Err(self.fatal("CommentUnterminated", Vec::new())),
            }
        }
        if !self.skip_char('>') {
            return Err(self.fatal("DashDashInComment", Vec::new()));
        }
        Ok(())
    }

    /// Scan a processing instruction, cursor after `<?`. Returns the
    /// target; the data goes to `data`.
    pub fn scan_pi(&mut self, data: &mut XmlString) -> Result<String> {
        let Some(target) = self.scan_name() else {
            return Err(self.fatal("PITargetRequired", Vec::new()));
        };
        self.scan_pi_data(&target, data)?;
        Ok(target)
    }

    fn scan_pi_data(&mut self, target: &str, data: &mut XmlString) -> Result<()> {
        data.clear();
        if target.eq_ignore_ascii_case("xml") {
            return Err(self.fatal("ReservedPITarget", Vec::new()));
        }

        if !self.skip_spaces() {
            if self.skip_string("?>") {
                return Ok(());
            }
            return Err(self.fatal("SpaceRequiredInPI", Vec::new()));
        }

        loop {
            match self.scan_data("?>", data)? {
                DataStop::Delimiter => return Ok(()),
                DataStop::Surrogate => self.scan_surrogates(data)?,
                DataStop::Invalid(c) => return Err(self.fatal("InvalidCharInPI", vec![hex(c)])),
                DataStop::EndOfInput => return Err(self.fatal("PIUnterminated", Vec::new())),
            }
        }
    }

    // ------------------------------------------------------------------
    // declarations

    /// Scan an XML declaration (`text_decl == false`) or a text
    /// declaration, cursor after `<?xml`
    pub fn scan_xml_decl(&mut self, text_decl: bool) -> Result<XmlDecl> {
        #[derive(PartialEq)]
        enum State {
            Version,
            Encoding,
            Standalone,
            Done,
        }

        let mut decl = XmlDecl::default();
        let mut state = State::Version;
        let mut data_found = false;
        let mut saw_space = self.skip_spaces();

        let space_before_encoding = if text_decl {
            "SpaceRequiredBeforeEncodingInTextDecl"
        } else {
            "SpaceRequiredBeforeEncodingInXMLDecl"
        };

        while self.peek_char().is_some_and(|c| c != unit('?')) {
            data_found = true;
            let (name, value) = self.scan_pseudo_attribute(text_decl)?;
            match state {
                State::Version => {
                    if name == VERSION {
                        if !saw_space {
                            let key = if text_decl {
                                "SpaceRequiredBeforeVersionInTextDecl"
                            } else {
                                "SpaceRequiredBeforeVersionInXMLDecl"
                            };
                            return Err(self.fatal(key, Vec::new()));
                        }
                        if value != "1.0" && value != "1.1" {
                            return Err(self.fatal("VersionNotSupported", vec![value]));
                        }
                        decl.version = Some(value);
                        state = State::Encoding;
                    } else if name == ENCODING {
                        if !text_decl {
                            return Err(self.fatal("VersionInfoRequired", Vec::new()));
                        }
                        if !saw_space {
                            return Err(self.fatal(space_before_encoding, Vec::new()));
                        }
                        decl.encoding = Some(self.check_encoding(value)?);
                        state = State::Done;
                    } else {
                        let key = if text_decl {
                            "EncodingDeclRequired"
                        } else {
                            "VersionInfoRequired"
                        };
                        return Err(self.fatal(key, Vec::new()));
                    }
                }
                State::Encoding => {
                    if name == ENCODING {
                        if !saw_space {
                            return Err(self.fatal(space_before_encoding, Vec::new()));
                        }
                        decl.encoding = Some(self.check_encoding(value)?);
                        state = if text_decl { State::Done } else { State::Standalone };
                    } else if !text_decl && name == STANDALONE {
                        decl.standalone = Some(self.check_standalone(value, saw_space)?);
                        state = State::Done;
                    } else {
                        return Err(self.fatal("EncodingDeclRequired", Vec::new()));
                    }
                }
                State::Standalone => {
                    if name == STANDALONE {
                        decl.standalone = Some(self.check_standalone(value, saw_space)?);
                        state = State::Done;
                    } else {
                        return Err(self.fatal("SDDeclNameInvalid", Vec::new()));
                    }
                }
                State::Done => return Err(self.fatal("NoMorePseudoAttributes", Vec::new())),
            }
            saw_space = self.skip_spaces();
        }

        if text_decl && state != State::Done {
            return Err(self.fatal("MorePseudoAttributes", Vec::new()));
        }
        if text_decl {
            if !data_found || decl.encoding.is_none() {
                return Err(self.fatal("EncodingDeclRequired", Vec::new()));
            }
        } else if !data_found || decl.version.is_none() {
            return Err(self.fatal("VersionInfoRequired", Vec::new()));
        }

        if !self.skip_string("?>") {
            let key = if text_decl {
                "TextDeclUnterminated"
            } else {
                "XMLDeclUnterminated"
            };
            return Err(self.fatal(key, Vec::new()));
        }
        Ok(decl)
    }

    fn check_encoding(&mut self, value: String) -> Result<String> {
        if is_valid_encoding_name(&value) {
            Ok(value)
        } else {
            Err(self.fatal("EncodingDeclInvalid", vec![value]))
        }
    }

    fn check_standalone(&mut self, value: String, saw_space: bool) -> Result<String> {
        if !saw_space {
            return Err(self.fatal("SpaceRequiredBeforeStandalone", Vec::new()));
        }
        if value != "yes" && value != "no" {
            return Err(self.fatal("SDDeclInvalid", vec![value]));
        }
        Ok(value)
    }

    /// Scan `name S? = S? "value"` inside an XML or text declaration
    pub fn scan_pseudo_attribute(&mut self, text_decl: bool) -> Result<(&'static str, String)> {
        let keys = if text_decl {
            ["EqRequiredInTextDecl", "QuoteRequiredInTextDecl", "CloseQuoteMissingInTextDecl", "InvalidCharInTextDecl"]
        } else {
            ["EqRequiredInXMLDecl", "QuoteRequiredInXMLDecl", "CloseQuoteMissingInXMLDecl", "InvalidCharInXMLDecl"]
        };

        let Some(name) = self.scan_pseudo_attribute_name() else {
            return Err(self.fatal("PseudoAttrNameExpected", Vec::new()));
        };
        self.skip_spaces();
        if !self.skip_char('=') {
            return Err(self.fatal(keys[0], vec![name.to_string()]));
        }
        self.skip_spaces();
        let quote = match self.peek_char() {
            Some(q) if q == unit('"') => '"',
            Some(q) if q == unit('\'') => '\'',
            _ => return Err(self.fatal(keys[1], vec![name.to_string()])),
        };
        self.input.read();

        let mut value = self.pool.take();
        loop {
            match self.scan_literal(quote, &mut value)? {
                LiteralStop::Quote => break,
                LiteralStop::Markup(c) => {
                    self.input.read();
                    value.push(c);
                }
                LiteralStop::Surrogate => self.scan_surrogates(&mut value)?,
                LiteralStop::EntityEnd => self.end_entity(),
                LiteralStop::Invalid(c) => return Err(self.fatal(keys[3], vec![hex(c)])),
                LiteralStop::EndOfInput => return Err(self.fatal(keys[2], vec![name.to_string()])),
            }
        }
        if !self.skip_char(quote) {
            return Err(self.fatal(keys[2], vec![name.to_string()]));
        }

        let text = value.to_string_lossy();
        self.pool.give_back(value);
        Ok((name, text))
    }

    /// Scan a quoted public identifier, collapsing white space runs to a
    /// single space and trimming both ends
    pub fn scan_pubid_literal(&mut self) -> Result<String> {
        let quote = match self.scan_char() {
            Some(q) if q == unit('"') || q == unit('\'') => q,
            _ => return Err(self.fatal("QuoteRequiredInPublicID", Vec::new())),
        };

        let mut literal = String::new();
        let mut skip_space = true;
        loop {
            let Some(c) = self.scan_char() else {
                return Err(self.fatal("PublicIDUnterminated", Vec::new()));
            };
            let code = c as u32;
            if c == quote {
                if literal.ends_with(' ') {
                    literal.pop();
                }
                return Ok(literal);
            }
            if c == unit(' ') || c == unit('\n') {
                if !skip_space {
                    literal.push(' ');
                    skip_space = true;
                }
            } else if is_pubid(code) {
                if let Some(ch) = char::from_u32(code) {
                    literal.push(ch);
                }
                skip_space = false;
            } else {
                return Err(self.fatal("InvalidCharInPublicID", vec![hex(code)]));
            }
        }
    }

    /// Scan `SYSTEM "sys"` or `PUBLIC "pub" "sys"`. With
    /// `optional_system_id` (notation declarations) the system literal may
    /// be omitted after a public identifier. Returns an empty id when
    /// neither keyword is present.
    pub fn scan_external_id(&mut self, optional_system_id: bool) -> Result<ExternalId> {
        let mut id = ExternalId::default();

        if self.skip_string("PUBLIC") {
            if !self.skip_spaces() {
                return Err(self.fatal("SpaceRequiredAfterPUBLIC", Vec::new()));
            }
            id.public_id = Some(self.scan_pubid_literal()?);
            if !self.skip_spaces() && !optional_system_id {
                return Err(self.fatal("SpaceRequiredBetweenPublicAndSystem", Vec::new()));
            }
        }

        if id.public_id.is_some() || self.skip_string("SYSTEM") {
            if id.public_id.is_none() && !self.skip_spaces() {
                return Err(self.fatal("SpaceRequiredAfterSYSTEM", Vec::new()));
            }
            let quote = match self.peek_char() {
                Some(q) if q == unit('"') => '"',
                Some(q) if q == unit('\'') => '\'',
                _ if id.public_id.is_some() && optional_system_id => return Ok(id),
                _ => return Err(self.fatal("QuoteRequiredInSystemID", Vec::new())),
            };
            self.input.read();

            let mut ident = self.pool.take();
            loop {
                match self.scan_literal(quote, &mut ident)? {
                    LiteralStop::Quote => break,
                    LiteralStop::Markup(c) => {
                        self.input.read();
                        ident.push(c);
                    }
                    LiteralStop::Surrogate => self.scan_surrogates(&mut ident)?,
                    LiteralStop::EntityEnd => self.end_entity(),
                    LiteralStop::Invalid(c) => {
                        return Err(self.fatal("InvalidCharInSystemID", vec![hex(c)]));
                    }
                    LiteralStop::EndOfInput => {
                        return Err(self.fatal("SystemIDUnterminated", Vec::new()));
                    }
                }
            }
            if !self.skip_char(quote) {
                return Err(self.fatal("SystemIDUnterminated", Vec::new()));
            }
            id.system_id = Some(ident.to_string_lossy());
            self.pool.give_back(ident);
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(text: &str) -> XmlScanner {
        XmlScanner::from_text(text)
    }

    fn fatal_key(result: Result<impl std::fmt::Debug>) -> String {
        match result {
            Err(Error::Scan(err)) => err.key,
            other => panic!("expected scan error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_name() {
        let mut s = scanner("bk:title rest");
        assert_eq!(s.scan_name(), Some("bk:title".to_string()));
        assert_eq!(s.scan_name(), None);
        assert!(s.skip_spaces());
        assert_eq!(s.scan_name(), Some("rest".to_string()));
        assert!(s.at_end());
    }

    #[test]
    fn test_scan_name_supplementary() {
        let mut s = scanner("a\u{10000}b>");
        assert_eq!(s.scan_name(), Some("a\u{10000}b".to_string()));
        assert!(s.skip_char('>'));
    }

    #[test]
    fn test_pseudo_attribute_name() {
        let mut s = scanner("standalone");
        assert_eq!(s.scan_pseudo_attribute_name(), Some("standalone"));
        let mut s = scanner("versions");
        assert_eq!(s.scan_pseudo_attribute_name(), Some("version"));
        let mut s = scanner("vers");
        assert_eq!(s.scan_pseudo_attribute_name(), None);
        let mut s = scanner("other");
        assert_eq!(s.scan_pseudo_attribute_name(), None);
    }

    #[test]
    fn test_scan_literal_stops() {
        let mut s = scanner("a\tb&c'");
        let mut out = XmlString::new();
        assert_eq!(s.scan_literal('\'', &mut out).unwrap(), LiteralStop::Markup(unit('&')));
        assert_eq!(out.to_string(), "a\tb");
        s.normalize_whitespace(&mut out);
        assert_eq!(out.to_string(), "a b");

        assert!(s.skip_char('&'));
        let mut rest = XmlString::new();
        assert_eq!(s.scan_literal('\'', &mut rest).unwrap(), LiteralStop::Quote);
        assert_eq!(rest.to_string(), "c");
    }

    #[test]
    fn test_scan_literal_end_of_input() {
        let mut s = scanner("abc");
        let mut out = XmlString::new();
        assert_eq!(s.scan_literal('"', &mut out).unwrap(), LiteralStop::EndOfInput);
    }

    #[test]
    fn test_attribute_value_normalization() {
        let mut s = scanner("\"a\tb\nc\"");
        let value = s.scan_attribute_value("doc", "title").unwrap();
        assert_eq!(value.value, "a b c");
        assert_eq!(value.non_normalized, None);
    }

    #[test]
    fn test_attribute_value_references() {
        let mut s = scanner("'&lt;x&#x9;y&#65;&amp;'");
        let value = s.scan_attribute_value("doc", "v").unwrap();
        // character references are not normalized
        assert_eq!(value.value, "<x\tyA&");
    }

    #[test]
    fn test_attribute_value_non_normalized() {
        let options = ScannerOptions::new().with_non_normalized_value(true);
        let mut s = scanner("\"a\tb&amp;&#65;\"").with_options(options);
        let value = s.scan_attribute_value("doc", "v").unwrap();
        assert_eq!(value.value, "a b&A");
        assert_eq!(value.non_normalized.as_deref(), Some("a\tb&amp;&#65;"));
    }

    #[test]
    fn test_non_normalized_value_excludes_entity_text() {
        let mut store = EntityStore::new();
        store.declare("e", Entity::internal("X"));
        store.declare("outer", Entity::internal("[&e;]"));
        let options = ScannerOptions::new().with_non_normalized_value(true);
        let mut s = XmlScanner::new("\"a&e;b\" 'c&outer;d'", CollectingReporter::new(), store)
            .with_options(options);

        let value = s.scan_attribute_value("doc", "v").unwrap();
        assert_eq!(value.value, "aXb");
        assert_eq!(value.non_normalized.as_deref(), Some("a&e;b"));

        assert!(s.skip_spaces());
        let value = s.scan_attribute_value("doc", "w").unwrap();
        assert_eq!(value.value, "c[X]d");
        assert_eq!(value.non_normalized.as_deref(), Some("c&outer;d"));
    }

    #[test]
    fn test_literal_stops_at_entity_end() {
        let mut store = EntityStore::new();
        store.declare("e", Entity::internal("X"));
        let mut s = XmlScanner::new("'a&e;b'", CollectingReporter::new(), store);
        assert!(s.skip_char('\''));

        let mut out = XmlString::new();
        assert_eq!(s.scan_literal('\'', &mut out).unwrap(), LiteralStop::Markup(unit('&')));
        assert!(s.skip_char('&'));
        assert_eq!(s.scan_name().as_deref(), Some("e"));
        assert!(s.skip_char(';'));
        assert!(s.start_entity("e").unwrap());

        out.clear();
        assert_eq!(s.scan_literal('\'', &mut out).unwrap(), LiteralStop::EntityEnd);
        assert_eq!(out.to_string(), "X");
        assert_eq!(s.entity_depth(), 1);
        s.end_entity();

        out.clear();
        assert_eq!(s.scan_literal('\'', &mut out).unwrap(), LiteralStop::Quote);
        assert_eq!(out.to_string(), "b");
    }

    #[test]
    fn test_failed_attribute_value_resets_state() {
        let mut store = EntityStore::new();
        store.declare("bad", Entity::internal("x<y"));
        let mut s = XmlScanner::new("'&bad;'", CollectingReporter::new(), store);
        assert_eq!(fatal_key(s.scan_attribute_value("doc", "v")), "LessthanInAttValue");
        assert!(s.literal.is_none());
        assert!(!s.scanning_attribute);

        let options = ScannerOptions::new().with_notify_char_refs(true);
        let mut s = scanner("'a<'#x41;").with_options(options);
        assert_eq!(fatal_key(s.scan_attribute_value("doc", "v")), "LessthanInAttValue");
        assert!(s.skip_string("<'"));
        let mut out = XmlString::new();
        s.scan_char_reference(&mut out).unwrap();
        assert_eq!(s.take_char_ref_literal().as_deref(), Some("#x41"));
    }

    #[test]
    fn test_attribute_value_entity_quote_does_not_close() {
        let mut store = EntityStore::new();
        store.declare("q", Entity::internal("say \"hi\""));
        let mut s = XmlScanner::new("\"&q; there\"/>", CollectingReporter::new(), store);
        let value = s.scan_attribute_value("doc", "v").unwrap();
        assert_eq!(value.value, "say \"hi\" there");
        assert_eq!(s.entity_depth(), 0);
        assert!(s.skip_string("/>"));
    }

    #[test]
    fn test_attribute_value_errors() {
        assert_eq!(fatal_key(scanner("abc").scan_attribute_value("e", "a")), "OpenQuoteExpected");
        assert_eq!(fatal_key(scanner("\"a<b\"").scan_attribute_value("e", "a")), "LessthanInAttValue");
        assert_eq!(fatal_key(scanner("\"&nope;\"").scan_attribute_value("e", "a")), "EntityNotDeclared");
        assert_eq!(fatal_key(scanner("\"& x\"").scan_attribute_value("e", "a")), "NameRequiredInReference");
        assert_eq!(fatal_key(scanner("\"&amp x\"").scan_attribute_value("e", "a")), "SemicolonRequiredInReference");
        assert_eq!(fatal_key(scanner("\"abc").scan_attribute_value("e", "a")), "CloseQuoteExpected");
        assert_eq!(fatal_key(scanner("\"a\u{1}\"").scan_attribute_value("e", "a")), "InvalidCharInAttValue");
    }

    #[test]
    fn test_attribute_value_external_entity() {
        let mut store = EntityStore::new();
        store.declare(
            "ext",
            Entity::External {
                public_id: None,
                system_id: "ext.xml".to_string(),
                notation: None,
            },
        );
        let mut s = XmlScanner::new("\"&ext;\"", CollectingReporter::new(), store);
        assert_eq!(fatal_key(s.scan_attribute_value("e", "a")), "ReferenceToExternalEntity");
        assert!(s.reporter().has_fatal());
    }

    #[test]
    fn test_recursive_entity() {
        let mut store = EntityStore::new();
        store.declare("a", Entity::internal("x&b;"));
        store.declare("b", Entity::internal("&a;"));
        let mut s = XmlScanner::new("\"&a;\"", CollectingReporter::new(), store);
        assert_eq!(fatal_key(s.scan_attribute_value("e", "v")), "RecursiveReference");
    }

    #[test]
    fn test_char_reference() {
        let mut s = scanner("#x1F600;#65;");
        let mut out = XmlString::new();
        assert_eq!(s.scan_char_reference(&mut out).unwrap(), 0x1F600);
        assert_eq!(out.as_units(), &[0xD83D, 0xDE00]);
        assert_eq!(s.scan_char_reference(&mut out).unwrap(), 65);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_char_reference_errors() {
        let mut out = XmlString::new();
        assert_eq!(fatal_key(scanner("#x;").scan_char_reference(&mut out)), "HexdigitRequiredInCharRef");
        assert_eq!(fatal_key(scanner("#;").scan_char_reference(&mut out)), "DigitRequiredInCharRef");
        assert_eq!(fatal_key(scanner("#65").scan_char_reference(&mut out)), "SemicolonRequiredInCharRef");
        assert_eq!(fatal_key(scanner("#0;").scan_char_reference(&mut out)), "InvalidCharRef");
        assert_eq!(fatal_key(scanner("#xD800;").scan_char_reference(&mut out)), "InvalidCharRef");
        assert_eq!(fatal_key(scanner("#99999999999;").scan_char_reference(&mut out)), "InvalidCharRef");
    }

    #[test]
    fn test_char_ref_literal() {
        let options = ScannerOptions::new().with_notify_char_refs(true);
        let mut s = scanner("#x41;").with_options(options);
        let mut out = XmlString::new();
        s.scan_char_reference(&mut out).unwrap();
        assert_eq!(s.take_char_ref_literal().as_deref(), Some("#x41"));
        assert_eq!(s.take_char_ref_literal(), None);
    }

    #[test]
    fn test_comment() {
        let mut s = scanner(" note -->rest");
        let mut text = XmlString::new();
        s.scan_comment(&mut text).unwrap();
        assert_eq!(text.to_string(), " note ");
        assert!(s.skip_string("rest"));

        assert_eq!(fatal_key(scanner("a -- b-->").scan_comment(&mut text)), "DashDashInComment");
        assert_eq!(fatal_key(scanner("a\u{1}-->").scan_comment(&mut text)), "InvalidCharInComment");
        assert_eq!(fatal_key(scanner("open").scan_comment(&mut text)), "CommentUnterminated");
    }

    #[test]
    fn test_processing_instruction() {
        let mut s = scanner("style href='a.css'?>");
        let mut data = XmlString::new();
        assert_eq!(s.scan_pi(&mut data).unwrap(), "style");
        assert_eq!(data.to_string(), "href='a.css'");

        let mut s = scanner("empty?>");
        assert_eq!(s.scan_pi(&mut data).unwrap(), "empty");
        assert!(data.is_empty());

        assert_eq!(fatal_key(scanner("XmL data?>").scan_pi(&mut data)), "ReservedPITarget");
        assert_eq!(fatal_key(scanner("?>").scan_pi(&mut data)), "PITargetRequired");
        assert_eq!(fatal_key(scanner("t!data?>").scan_pi(&mut data)), "SpaceRequiredInPI");
        assert_eq!(fatal_key(scanner("t data").scan_pi(&mut data)), "PIUnterminated");
    }

    #[test]
    fn test_xml_decl() {
        let mut s = scanner(" version=\"1.0\" encoding='UTF-8' standalone=\"yes\"?><doc/>");
        let decl = s.scan_xml_decl(false).unwrap();
        assert_eq!(decl.version.as_deref(), Some("1.0"));
        assert_eq!(decl.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(decl.standalone.as_deref(), Some("yes"));
        assert!(s.skip_string("<doc/>"));
    }

    #[test]
    fn test_xml_decl_errors() {
        let key = |text: &str| fatal_key(scanner(text).scan_xml_decl(false));
        assert_eq!(key("version=\"1.0\"?>"), "SpaceRequiredBeforeVersionInXMLDecl");
        assert_eq!(key(" version=\"2.0\"?>"), "VersionNotSupported");
        assert_eq!(key(" encoding=\"UTF-8\"?>"), "VersionInfoRequired");
        assert_eq!(key(" version=\"1.0\" standalone=\"maybe\"?>"), "SDDeclInvalid");
        assert_eq!(key(" version=\"1.0\" encoding=\"UTF-8\" encoding=\"x\"?>"), "SDDeclNameInvalid");
        assert_eq!(key(" version=\"1.0\" standalone=\"no\" encoding=\"x\"?>"), "NoMorePseudoAttributes");
        assert_eq!(key(" version \"1.0\"?>"), "EqRequiredInXMLDecl");
        assert_eq!(key(" version=1.0?>"), "QuoteRequiredInXMLDecl");
        assert_eq!(key(" version=\"1.0"), "CloseQuoteMissingInXMLDecl");
        assert_eq!(key(" bogus=\"1\"?>"), "PseudoAttrNameExpected");
        assert_eq!(key(" version=\"1.0\"?"), "XMLDeclUnterminated");
        assert_eq!(key(" ?>"), "VersionInfoRequired");
    }

    #[test]
    fn test_text_decl() {
        let mut s = scanner(" encoding=\"ISO-8859-1\"?>");
        let decl = s.scan_xml_decl(true).unwrap();
        assert_eq!(decl.version, None);
        assert_eq!(decl.encoding.as_deref(), Some("ISO-8859-1"));

        let key = |text: &str| fatal_key(scanner(text).scan_xml_decl(true));
        assert_eq!(key(" version=\"1.0\"?>"), "MorePseudoAttributes");
        assert_eq!(key(" standalone=\"yes\"?>"), "EncodingDeclRequired");
    }

    #[test]
    fn test_pubid_literal() {
        let mut s = scanner("\"  -//W3C//DTD  XHTML\n1.0//EN  \"");
        assert_eq!(s.scan_pubid_literal().unwrap(), "-//W3C//DTD XHTML 1.0//EN");

        assert_eq!(fatal_key(scanner("-//x").scan_pubid_literal()), "QuoteRequiredInPublicID");
        assert_eq!(fatal_key(scanner("\"a{b\"").scan_pubid_literal()), "InvalidCharInPublicID");
        assert_eq!(fatal_key(scanner("\"abc").scan_pubid_literal()), "PublicIDUnterminated");
    }

    #[test]
    fn test_external_id() {
        let mut s = scanner("SYSTEM \"doc.dtd\"");
        let id = s.scan_external_id(false).unwrap();
        assert_eq!(id.system_id.as_deref(), Some("doc.dtd"));
        assert_eq!(id.public_id, None);

        let mut s = scanner("PUBLIC \"-//A//B\" 'b.dtd'");
        let id = s.scan_external_id(false).unwrap();
        assert_eq!(id.public_id.as_deref(), Some("-//A//B"));
        assert_eq!(id.system_id.as_deref(), Some("b.dtd"));

        let mut s = scanner("PUBLIC \"-//A//B\">");
        let id = s.scan_external_id(true).unwrap();
        assert_eq!(id.system_id, None);

        let key = |text: &str| fatal_key(scanner(text).scan_external_id(false));
        assert_eq!(key("SYSTEM\"a\""), "SpaceRequiredAfterSYSTEM");
        assert_eq!(key("PUBLIC\"a\""), "SpaceRequiredAfterPUBLIC");
        assert_eq!(key("PUBLIC \"a\"\"b\""), "SpaceRequiredBetweenPublicAndSystem");
        assert_eq!(key("SYSTEM a"), "QuoteRequiredInSystemID");
        assert_eq!(key("SYSTEM \"a"), "SystemIDUnterminated");
    }

    #[test]
    fn test_surrogates() {
        let mut s = scanner("\u{1F600}x");
        let mut out = XmlString::new();
        s.scan_surrogates(&mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert!(s.skip_char('x'));
    }

    #[test]
    fn test_scan_content() {
        let mut s = scanner("text &amp; ]]> <");
        let mut out = XmlString::new();
        assert_eq!(s.scan_content(&mut out).unwrap(), ContentStop::Markup(unit('&')));
        assert_eq!(out.to_string(), "text ");
        assert!(s.skip_string("&amp;"));
        assert_eq!(s.scan_content(&mut out).unwrap(), ContentStop::CdataEnd);
    }

    #[test]
    fn test_entity_depth_never_negative() {
        let mut s = scanner("x");
        s.end_entity();
        assert_eq!(s.entity_depth(), 0);
    }

    #[test]
    fn test_entity_expansion_limit() {
        let mut store = EntityStore::new();
        store.declare("e", Entity::internal("x"));
        let limits = Limits {
            max_entity_expansions: 2,
            ..Limits::default()
        };
        let mut s = XmlScanner::new("\"&e;&e;&e;\"", CollectingReporter::new(), store)
            .with_options(ScannerOptions::new().with_limits(limits));
        assert_eq!(fatal_key(s.scan_attribute_value("e", "a")), "EntityExpansionLimit");
    }

    #[test]
    fn test_fatal_carries_location() {
        let mut s = scanner("\n  \"a<\"");
        s.skip_spaces();
        match s.scan_attribute_value("e", "a") {
            Err(Error::Scan(err)) => assert_eq!(err.location, Some((2, 5))),
            other => panic!("unexpected {:?}", other),
        }
    }
}
