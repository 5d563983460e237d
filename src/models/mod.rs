//! Content models
//!
//! This module turns element content grammars into deterministic automata
//! and validates child sequences against them:
//!
//! - [`declarations`]: textual content specs to [`ContentSpec`]
//! - [`spec`]: [`ContentSpec`] to a position-labeled [`SyntaxNode`] tree
//! - [`builder`]: follow sets and subset construction ([`compile`])
//! - [`dfa`]: the compiled [`ContentDfa`]

pub mod builder;
pub mod declarations;
pub mod dfa;
pub mod element_map;
pub mod positions;
pub mod spec;
pub mod syntax;

pub use builder::{compile, CompileOptions};
pub use declarations::{parse_content_spec, ContentModel, ParseContext};
pub use dfa::{ChildSymbol, ContentDfa, DfaCursor, Step, ValidationResult};
pub use element_map::ElementMap;
pub use positions::PositionSet;
pub use spec::{ContentSpec, SyntaxTree};
pub use syntax::{ElementMatcher, NodeInfo, NodeKind, RepeatKind, SyntaxNode};
