//! Error reporting for the scanner
//!
//! The scanner never decides how diagnostics are presented: every problem is
//! delivered to an [`ErrorReporter`] as a message key plus arguments.
//! [`format_message`] renders a key through the built-in message catalogue.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Message domain of well-formedness diagnostics
pub const XML_DOMAIN: &str = "http://www.w3.org/TR/1998/REC-xml-19980210";

/// How serious a reported problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational; processing continues unchanged
    Warning,
    /// Validity error; processing continues
    Error,
    /// Well-formedness error; the current scan is aborted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Receiver of scanner diagnostics
pub trait ErrorReporter {
    /// Deliver one diagnostic
    fn report(&mut self, domain: &str, key: &str, args: &[String], severity: Severity);
}

impl<F> ErrorReporter for F
where
    F: FnMut(&str, &[String], Severity),
{
    fn report(&mut self, _domain: &str, key: &str, args: &[String], severity: Severity) {
        self(key, args, severity)
    }
}

/// A recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Message domain
    pub domain: String,
    /// Message key
    pub key: String,
    /// Message arguments
    pub args: Vec<String>,
    /// Severity
    pub severity: Severity,
}

impl Diagnostic {
    /// The formatted message text
    pub fn message(&self) -> String {
        format_message(&self.key, &self.args)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message())
    }
}

/// Reporter that keeps every diagnostic and logs it through `tracing`
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Every diagnostic received so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the reporter, returning its diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Check whether any fatal error was reported
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Fatal)
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&mut self, domain: &str, key: &str, args: &[String], severity: Severity) {
        match severity {
            Severity::Warning => warn!(key, message = %format_message(key, args), "scanner warning"),
            Severity::Error | Severity::Fatal => {
                debug!(key, %severity, message = %format_message(key, args), "scanner error")
            }
        }
        self.diagnostics.push(Diagnostic {
            domain: domain.to_string(),
            key: key.to_string(),
            args: args.to_vec(),
            severity,
        });
    }
}

static MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // XML and text declarations
        ("SpaceRequiredBeforeVersionInXMLDecl", "White space is required before the version pseudo attribute in the XML declaration."),
        ("SpaceRequiredBeforeVersionInTextDecl", "White space is required before the version pseudo attribute in the text declaration."),
        ("SpaceRequiredBeforeEncodingInXMLDecl", "White space is required before the encoding pseudo attribute in the XML declaration."),
        ("SpaceRequiredBeforeEncodingInTextDecl", "White space is required before the encoding pseudo attribute in the text declaration."),
        ("SpaceRequiredBeforeStandalone", "White space is required before the encoding pseudo attribute in the XML declaration."),
        ("VersionNotSupported", "XML version \"{0}\" is not supported, only XML 1.0 and 1.1 are supported."),
        ("VersionInfoRequired", "The version is required in the XML declaration."),
        ("EncodingDeclRequired", "The encoding declaration is required in the text declaration."),
        ("EncodingDeclInvalid", "Invalid encoding name \"{0}\"."),
        ("SDDeclInvalid", "The standalone document declaration value must be \"yes\" or \"no\", not \"{0}\"."),
        ("SDDeclNameInvalid", "The standalone name in XML declaration may be misspelled."),
        ("NoMorePseudoAttributes", "No more pseudo attributes are allowed."),
        ("MorePseudoAttributes", "More pseudo attributes are expected."),
        ("PseudoAttrNameExpected", "A pseudo attribute name is expected."),
        ("XMLDeclUnterminated", "The XML declaration must end with \"?>\"."),
        ("TextDeclUnterminated", "The text declaration must end with \"?>\"."),
        ("EqRequiredInXMLDecl", "The ''='' character must follow \"{0}\" in the XML declaration."),
        ("EqRequiredInTextDecl", "The ''='' character must follow \"{0}\" in the text declaration."),
        ("QuoteRequiredInXMLDecl", "The value following \"{0}\" in the XML declaration must be a quoted string."),
        ("QuoteRequiredInTextDecl", "The value following \"{0}\" in the text declaration must be a quoted string."),
        ("CloseQuoteMissingInXMLDecl", "closing quote in the value following \"{0}\" in the XML declaration is missing."),
        ("CloseQuoteMissingInTextDecl", "closing quote in the value following \"{0}\" in the text declaration is missing."),
        ("InvalidCharInXMLDecl", "An invalid XML character (Unicode: 0x{0}) was found in the XML declaration."),
        ("InvalidCharInTextDecl", "An invalid XML character (Unicode: 0x{0}) was found in the text declaration."),
        // processing instructions and comments
        ("PITargetRequired", "The processing instruction must begin with the name of the target."),
        ("ReservedPITarget", "The processing instruction target matching \"[xX][mM][lL]\" is not allowed."),
        ("SpaceRequiredInPI", "White space is required between the processing instruction target and data."),
        ("InvalidCharInPI", "An invalid XML character (Unicode: 0x{0}) was found in the processing instruction."),
        ("PIUnterminated", "The processing instruction must end with ''?>''."),
        ("InvalidCharInComment", "An invalid XML character (Unicode: 0x{0}) was found in the comment."),
        ("DashDashInComment", "The string \"--\" is not permitted within comments."),
        ("CommentUnterminated", "The comment must end with \"-->\"."),
        ("CDSectUnterminated", "The CDATA section must end with \"]]>\"."),
        ("InvalidCharInCDSect", "An invalid XML character (Unicode: 0x{0}) was found in the CDATA section."),
        // attribute values and references
        ("OpenQuoteExpected", "Open quote is expected for attribute \"{1}\" associated with an element type \"{0}\"."),
        ("CloseQuoteExpected", "Close quote is expected for attribute \"{1}\" associated with an element type \"{0}\"."),
        ("LessthanInAttValue", "The value of attribute \"{1}\" associated with an element type \"{0}\" must not contain the ''<'' character."),
        ("InvalidCharInAttValue", "An invalid XML character (Unicode: 0x{2}) was found in the value of attribute \"{1}\" and element is \"{0}\"."),
        ("NameRequiredInReference", "The entity name must immediately follow the '&' in the entity reference."),
        ("SemicolonRequiredInReference", "The reference to entity \"{0}\" must end with the '';'' delimiter."),
        ("ReferenceToExternalEntity", "The external entity reference \"&{0};\" is not permitted in an attribute value."),
        ("ReferenceToUnparsedEntity", "The unparsed entity reference \"&{0};\" is not permitted."),
        ("ExternalEntityNotExpanded", "The external entity \"{0}\" was not expanded."),
        ("EntityNotDeclared", "The entity \"{0}\" was referenced, but not declared."),
        ("RecursiveReference", "Recursive entity reference \"{0}\"."),
        ("HexdigitRequiredInCharRef", "A hexadecimal representation must immediately follow the \"&#x\" in a character reference."),
        ("DigitRequiredInCharRef", "A decimal representation must immediately follow the \"&#\" in a character reference."),
        ("SemicolonRequiredInCharRef", "The character reference must end with the ';' delimiter."),
        ("InvalidCharRef", "Character reference \"&#{0}\" is an invalid XML character."),
        ("InvalidCharInContent", "An invalid XML character (Unicode: 0x{0}) was found in the element content of the document."),
        // external identifiers
        ("SpaceRequiredAfterPUBLIC", "White spaces are required after keyword PUBLIC."),
        ("SpaceRequiredAfterSYSTEM", "White space is required after keyword SYSTEM."),
        ("SpaceRequiredBetweenPublicAndSystem", "White spaces are required between publicId and systemId."),
        ("QuoteRequiredInPublicID", "The public identifier must begin with either a single or double quote character."),
        ("QuoteRequiredInSystemID", "The system identifier must begin with either a single or double quote character."),
        ("PublicIDUnterminated", "The public identifier must end with the matching quote character."),
        ("SystemIDUnterminated", "The system identifier must end with the matching quote character."),
        ("InvalidCharInPublicID", "An invalid character (Unicode: 0x{0}) was found in the public identifier."),
        ("InvalidCharInSystemID", "An invalid character (Unicode: 0x{0}) was found in the system identifier."),
        // document structure
        ("RootElementRequired", "The root element is required in a well-formed document."),
        ("MarkupNotRecognizedInProlog", "The markup in the document preceding the root element must be well-formed."),
        ("MarkupNotRecognizedInMisc", "The markup in the document following the root element must be well-formed."),
        ("MarkupNotRecognizedInContent", "The content of elements must consist of well-formed character data or markup."),
        ("MarkupNotRecognizedInDTD", "The markup declarations contained or pointed to by the document type declaration must be well-formed."),
        ("ContentIllegalInProlog", "Content is not allowed in prolog."),
        ("ContentIllegalInTrailingMisc", "Content is not allowed in trailing section."),
        ("AlreadySeenDoctype", "Already seen doctype."),
        ("DoctypeNotAllowed", "The document type declaration must precede the root element."),
        ("MSG_ROOT_ELEMENT_TYPE_REQUIRED", "The root element type must appear after \"<!DOCTYPE\" in the document type declaration."),
        ("DoctypedeclUnterminated", "The document type declaration for root element type \"{0}\" must end with ''>''."),
        ("ElementUnterminated", "Element type \"{0}\" must be followed by either attribute specifications, \">\" or \"/>\"."),
        ("EqRequiredInAttribute", "Attribute name \"{1}\" associated with an element type \"{0}\" must be followed by the '' = '' character."),
        ("AttributeNotUnique", "Attribute \"{1}\" was already specified for element \"{0}\"."),
        ("ETagRequired", "The element type \"{0}\" must be terminated by the matching end-tag \"</{0}>\"."),
        ("ETagUnterminated", "The end-tag for element type \"{0}\" must end with a ''>'' delimiter."),
        ("CDEndInContent", "The character sequence \"]]>\" must not appear in content unless used to mark the end of a CDATA section."),
        ("PrematureEOF", "Premature end of file."),
        ("ElementPrefixUnbound", "The prefix \"{1}\" for element \"{0}\" is not bound."),
        ("AttributePrefixUnbound", "The prefix \"{2}\" for attribute \"{1}\" associated with an element type \"{0}\" is not bound."),
        // markup declarations
        ("MSG_SPACE_REQUIRED_BEFORE_ELEMENT_TYPE_IN_ELEMENTDECL", "White space is required after \"<!ELEMENT\" in the element type declaration."),
        ("MSG_ELEMENT_TYPE_REQUIRED_IN_ELEMENTDECL", "The element type is required in the element type declaration."),
        ("MSG_SPACE_REQUIRED_BEFORE_CONTENTSPEC_IN_ELEMENTDECL", "White space is required after the element type \"{0}\" in the element type declaration."),
        ("MSG_CONTENTSPEC_INVALID", "The content specification for element type \"{0}\" is invalid: {1}"),
        ("ElementDeclUnterminated", "The declaration for element type \"{0}\" must end with ''>''."),
        ("MSG_ELEMENT_ALREADY_DECLARED", "Element type \"{0}\" must not be declared more than once."),
        ("MSG_SPACE_REQUIRED_BEFORE_ENTITY_NAME_IN_ENTITYDECL", "White space is required between \"<!ENTITY\" and the entity name in the entity declaration."),
        ("MSG_ENTITY_NAME_REQUIRED_IN_ENTITYDECL", "The entity name is required in the entity declaration."),
        ("MSG_SPACE_REQUIRED_AFTER_ENTITY_NAME_IN_ENTITYDECL", "White space is required between the entity name \"{0}\" and the definition in the entity declaration."),
        ("MSG_SPACE_REQUIRED_BEFORE_NDATA_IN_UNPARSED_ENTITYDECL", "White space is required before \"NDATA\" in the declaration for the entity \"{0}\"."),
        ("MSG_NOTATION_NAME_REQUIRED_FOR_UNPARSED_ENTITYDECL", "The notation name is required after \"NDATA\" in the declaration for the entity \"{0}\"."),
        ("EntityDeclUnterminated", "The declaration for the entity \"{0}\" must end with ''>''."),
        ("MarkupDeclUnterminated", "The markup declaration must end with ''>''."),
        ("ParameterEntityNotExpanded", "The parameter entity reference \"%{0};\" was not expanded."),
        ("MSG_SPACE_REQUIRED_BEFORE_ROOT_ELEMENT_TYPE_IN_DOCTYPEDECL", "White space is required after \"<!DOCTYPE\" in the document type declaration."),
        ("MSG_DUPLICATE_ENTITY_DEFINITION", "Entity \"{0}\" is declared more than once."),
        ("ExternalIDRequired", "The external entity declaration for \"{0}\" must include a system identifier."),
        ("InvalidCharInEntityValue", "An invalid XML character (Unicode: 0x{0}) was found in the literal entity value."),
        ("InvalidCharInDTD", "An invalid XML character (Unicode: 0x{0}) was found in the DTD."),
        // validity
        ("MSG_ELEMENT_NOT_DECLARED", "Element type \"{0}\" must be declared."),
        ("RootElementTypeMustMatchDoctypedecl", "Document root element \"{1}\", must match DOCTYPE root \"{0}\"."),
        ("MSG_CONTENT_INVALID", "The content of element type \"{0}\" must match \"{1}\"."),
        ("MSG_CONTENT_INCOMPLETE", "The content of element type \"{0}\" is incomplete, it must match \"{1}\"."),
        // limits
        ("EntityExpansionLimit", "The parser has encountered more than \"{0}\" entity expansions in this document."),
        ("EntityDepthLimit", "Entity references are nested more than \"{0}\" levels deep."),
        ("LiteralLengthLimit", "A literal is longer than the limit of \"{0}\" characters."),
        ("ElementDepthLimit", "Elements are nested more than \"{0}\" levels deep."),
    ])
});

/// Render a message key with its arguments.
///
/// `{n}` is replaced by argument `n` and `''` by a single quote. Unknown keys
/// render as the key followed by the arguments.
pub fn format_message(key: &str, args: &[String]) -> String {
    let Some(template) = MESSAGES.get(key) else {
        return if args.is_empty() {
            key.to_string()
        } else {
            format!("{}: {}", key, args.join(", "))
        };
    };

    let mut message = template.replace("''", "'");
    for (index, arg) in args.iter().enumerate() {
        message = message.replace(&format!("{{{}}}", index), arg);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_known_message() {
        let msg = format_message("InvalidCharRef", &["x0".to_string()]);
        assert_eq!(msg, "Character reference \"&#x0\" is an invalid XML character.");

        let msg = format_message(
            "LessthanInAttValue",
            &["doc".to_string(), "title".to_string()],
        );
        assert_eq!(
            msg,
            "The value of attribute \"title\" associated with an element type \"doc\" must not contain the '<' character."
        );
    }

    #[test]
    fn test_format_unknown_message() {
        assert_eq!(format_message("Mystery", &[]), "Mystery");
        assert_eq!(format_message("Mystery", &["a".to_string()]), "Mystery: a");
    }

    #[test]
    fn test_collecting_reporter() {
        let mut reporter = CollectingReporter::new();
        reporter.report(XML_DOMAIN, "PITargetRequired", &[], Severity::Fatal);
        reporter.report(XML_DOMAIN, "ExternalEntityNotExpanded", &["e".to_string()], Severity::Warning);
        assert_eq!(reporter.diagnostics().len(), 2);
        assert!(reporter.has_fatal());
        assert_eq!(
            reporter.diagnostics()[1].to_string(),
            "[warning] The external entity \"e\" was not expanded."
        );
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |key: &str, _args: &[String], severity: Severity| {
                seen.push((key.to_string(), severity));
            };
            reporter.report(XML_DOMAIN, "DashDashInComment", &[], Severity::Fatal);
        }
        assert_eq!(seen, vec![("DashDashInComment".to_string(), Severity::Fatal)]);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
    }
}
