//! # xmlmodel
//!
//! Deterministic content-model automata and a streaming XML character
//! scanner.
//!
//! ## Features
//!
//! - Content models (`(a, (b | c)*, d?)`, mixed content, wildcards) compiled
//!   into DFAs through first/last/follow position sets
//! - Validation of child sequences, batch or incremental
//! - Character-level scanning: names, literals, attribute values,
//!   character and entity references, comments, PIs, XML declarations
//! - A document driver validating element content against the internal
//!   DTD subset
//! - Resource limits against entity and nesting attacks
//!
//! ## Example
//!
//! ```rust
//! use xmlmodel::models::{parse_content_spec, ChildSymbol, ParseContext, ValidationResult};
//! use xmlmodel::{Limits, SymbolTable};
//!
//! let mut symbols = SymbolTable::new();
//! let model = parse_content_spec("(head, (p | list)*, foot?)", &mut symbols, &ParseContext::new())?;
//! let dfa = model.compile(&Limits::default())?;
//!
//! let head = ChildSymbol::element(symbols.intern("head"));
//! let p = ChildSymbol::element(symbols.intern("p"));
//! assert_eq!(dfa.validate(&[head, p, p]), ValidationResult::Valid);
//! assert_eq!(dfa.validate(&[p]), ValidationResult::InvalidAt(0));
//! # Ok::<(), xmlmodel::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;
pub mod symbols;

// Content models
pub mod models;

// Character scanning
pub mod scanner;

// Document driver
pub mod documents;

// Re-exports for convenience
pub use documents::{Document, DocumentOptions};
pub use error::{Error, Result};
pub use limits::Limits;
pub use models::{ContentDfa, ContentSpec, ValidationResult};
pub use scanner::XmlScanner;
pub use symbols::{Symbol, SymbolTable};

/// Version of the xmlmodel library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
