//! Streaming XML character scanner
//!
//! The scanner reads a document as UTF-16 code units through a stack of
//! entity inputs and offers the primitive scans a parser is built from:
//! names, literals, attribute values, character references, comments,
//! processing instructions and the XML/text declaration.
//!
//! Problems are delivered to an [`ErrorReporter`]; fatal ones also abort
//! the scan with [`Error::Scan`](crate::Error::Scan).

pub mod buffer;
pub mod entities;
pub mod input;
pub mod reporter;
pub mod scan;

pub use buffer::{BufferPool, XmlString};
pub use entities::{predefined_entity, Entity, EntityResolver, EntityStore};
pub use input::InputStack;
pub use reporter::{
    format_message, CollectingReporter, Diagnostic, ErrorReporter, Severity, XML_DOMAIN,
};
pub use scan::{
    AttributeValue, ContentStop, DataStop, ExternalId, LiteralStop, ScannerOptions, XmlDecl,
    XmlScanner,
};
