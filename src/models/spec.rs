//! Declarative content specifications
//!
//! [`ContentSpec`] is the n-ary grammar expression produced by the
//! declaration parser (or built by hand). [`ContentSpec::to_syntax_tree`]
//! turns it into a binary, position-labeled [`SyntaxNode`] tree ready for
//! the DFA builder.

use serde::{Deserialize, Serialize};

use super::builder::{compile, CompileOptions};
use super::dfa::ContentDfa;
use super::syntax::{ElementMatcher, RepeatKind, SyntaxNode};
use crate::error::Result;
use crate::symbols::SymbolTable;

/// Content grammar expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSpec {
    /// Matches only the empty sequence
    Empty,
    /// A single element or wildcard
    Leaf(ElementMatcher),
    /// Children in order
    Sequence(Vec<ContentSpec>),
    /// Exactly one of the children
    Choice(Vec<ContentSpec>),
    /// Repetition of a child
    Repeat(Box<ContentSpec>, RepeatKind),
}

/// A syntax tree together with its number of leaf positions
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// Root node
    pub root: SyntaxNode,
    /// Number of non-epsilon leaves; positions are `0..leaf_count`
    pub leaf_count: usize,
}

impl ContentSpec {
    /// Shorthand for a leaf
    pub fn leaf(matcher: ElementMatcher) -> Self {
        Self::Leaf(matcher)
    }

    /// Shorthand for `child*`
    pub fn zero_or_more(child: ContentSpec) -> Self {
        Self::Repeat(Box::new(child), RepeatKind::ZeroOrMore)
    }

    /// Shorthand for `child+`
    pub fn one_or_more(child: ContentSpec) -> Self {
        Self::Repeat(Box::new(child), RepeatKind::OneOrMore)
    }

    /// Shorthand for `child?`
    pub fn optional(child: ContentSpec) -> Self {
        Self::Repeat(Box::new(child), RepeatKind::ZeroOrOne)
    }

    /// Build the binary syntax tree, numbering leaves left to right
    pub fn to_syntax_tree(&self) -> SyntaxTree {
        let mut next_position = 0;
        let root = self.build(&mut next_position);
        SyntaxTree {
            root,
            leaf_count: next_position,
        }
    }

    fn build(&self, next_position: &mut usize) -> SyntaxNode {
        match self {
            Self::Empty => SyntaxNode::empty(),
            Self::Leaf(matcher) => {
                let position = *next_position;
                *next_position += 1;
                SyntaxNode::leaf(position, matcher.clone())
            }
            Self::Sequence(children) => {
                Self::fold(children, next_position, SyntaxNode::sequence)
            }
            Self::Choice(children) => Self::fold(children, next_position, SyntaxNode::choice),
            Self::Repeat(child, kind) => SyntaxNode::repeat(child.build(next_position), *kind),
        }
    }

    // n-ary groups become left-leaning binary chains: (a,b,c) => ((a,b),c)
    fn fold(
        children: &[ContentSpec],
        next_position: &mut usize,
        join: fn(SyntaxNode, SyntaxNode) -> SyntaxNode,
    ) -> SyntaxNode {
        let mut nodes = children.iter().map(|child| child.build(next_position));
        let Some(first) = nodes.next() else {
            return SyntaxNode::empty();
        };
        nodes.fold(first, join)
    }

    /// Compile the expression into a [`ContentDfa`]
    pub fn compile(&self, options: &CompileOptions) -> Result<ContentDfa> {
        let tree = self.to_syntax_tree();
        compile(tree.root, tree.leaf_count, options)
    }

    /// Render the expression using the names in `symbols`
    pub fn describe(&self, symbols: &SymbolTable) -> String {
        match self {
            Self::Empty => "EMPTY".to_string(),
            Self::Leaf(matcher) => matcher.describe(symbols),
            Self::Sequence(children) => Self::describe_group(children, ",", symbols),
            Self::Choice(children) => Self::describe_group(children, "|", symbols),
            Self::Repeat(child, kind) => format!("{}{}", child.describe(symbols), kind.symbol()),
        }
    }

    fn describe_group(children: &[ContentSpec], separator: &str, symbols: &SymbolTable) -> String {
        let parts: Vec<String> = children.iter().map(|c| c.describe(symbols)).collect();
        format!("({})", parts.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::syntax::NodeKind;

    #[test]
    fn test_positions_are_dense_left_to_right() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern("a");
        let b = symbols.intern("b");
        let c = symbols.intern("c");
        let spec = ContentSpec::Sequence(vec![
            ContentSpec::leaf(ElementMatcher::name(a)),
            ContentSpec::zero_or_more(ContentSpec::Choice(vec![
                ContentSpec::leaf(ElementMatcher::name(b)),
                ContentSpec::leaf(ElementMatcher::name(c)),
            ])),
            ContentSpec::Empty,
        ]);

        let tree = spec.to_syntax_tree();
        assert_eq!(tree.leaf_count, 3);

        let mut seen = Vec::new();
        tree.root.for_each_leaf(&mut |position, matcher| {
            seen.push((position, matcher.describe(&symbols)));
        });
        assert_eq!(
            seen,
            vec![(0, "a".to_string()), (1, "b".to_string()), (2, "c".to_string())]
        );
    }

    #[test]
    fn test_single_child_group_collapses() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern("a");
        let spec = ContentSpec::Sequence(vec![ContentSpec::leaf(ElementMatcher::name(a))]);
        let tree = spec.to_syntax_tree();
        assert!(matches!(tree.root.kind(), NodeKind::Leaf { position: 0, .. }));
    }

    #[test]
    fn test_empty_group_is_epsilon() {
        let tree = ContentSpec::Choice(vec![]).to_syntax_tree();
        assert_eq!(tree.leaf_count, 0);
        assert!(matches!(tree.root.kind(), NodeKind::Empty));
    }

    #[test]
    fn test_describe() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern("a");
        let b = symbols.intern("b");
        let spec = ContentSpec::Sequence(vec![
            ContentSpec::leaf(ElementMatcher::name(a)),
            ContentSpec::optional(ContentSpec::leaf(ElementMatcher::name(b))),
        ]);
        assert_eq!(spec.describe(&symbols), "(a,b?)");
    }
}
