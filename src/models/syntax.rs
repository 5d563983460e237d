//! Position-labeled syntax trees
//!
//! A content model is represented as a binary tree of sequence/choice nodes
//! and unary repetition nodes over leaf positions. Every non-epsilon leaf
//! carries a unique position in `[0, leaf_count)` and an [`ElementMatcher`].
//!
//! Each node lazily computes and caches its [`NodeInfo`] (nullable, first
//! and last position sets) the first time it is asked for it.

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::positions::PositionSet;
use crate::symbols::{Symbol, SymbolTable};

/// What a leaf position accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElementMatcher {
    /// An element with exactly this (raw, possibly prefixed) name
    Name {
        /// Interned raw name
        name: Symbol,
        /// Interned namespace URI, when namespaces are in use
        namespace: Option<Symbol>,
    },
    /// Any element in any namespace (`##any`)
    Any,
    /// Any element in the given namespace
    AnyInNamespace(Symbol),
    /// Any element in no namespace (`##local`)
    AnyLocal,
    /// Any element whose namespace differs from the bound one (`##other`)
    AnyOther(Option<Symbol>),
    /// The synthetic end-of-content marker
    EndOfContent,
}

impl ElementMatcher {
    /// Exact-name matcher without a namespace
    pub fn name(name: Symbol) -> Self {
        Self::Name { name, namespace: None }
    }

    /// Exact-name matcher with a namespace
    pub fn qualified(name: Symbol, namespace: Symbol) -> Self {
        Self::Name {
            name,
            namespace: Some(namespace),
        }
    }

    /// Check if this matcher is one of the wildcard classes
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self,
            Self::Any | Self::AnyInNamespace(_) | Self::AnyLocal | Self::AnyOther(_)
        )
    }

    /// Check whether an element child is accepted by this matcher
    pub fn accepts(&self, name: Symbol, namespace: Option<Symbol>) -> bool {
        match self {
            Self::Name { name: expected, .. } => *expected == name,
            Self::Any => true,
            Self::AnyInNamespace(ns) => namespace == Some(*ns),
            Self::AnyLocal => namespace.is_none(),
            Self::AnyOther(ns) => namespace != *ns,
            Self::EndOfContent => false,
        }
    }

    /// Check whether some element could be accepted by both matchers
    pub fn overlaps(&self, other: &ElementMatcher) -> bool {
        use ElementMatcher::*;
        match (self, other) {
            (EndOfContent, _) | (_, EndOfContent) => false,
            (Name { name: a, .. }, Name { name: b, .. }) => a == b,
            (Name { name, namespace }, wildcard) | (wildcard, Name { name, namespace }) => {
                wildcard.accepts(*name, *namespace)
            }
            (Any, _) | (_, Any) => true,
            (AnyInNamespace(a), AnyInNamespace(b)) => a == b,
            (AnyInNamespace(_), AnyLocal) | (AnyLocal, AnyInNamespace(_)) => false,
            (AnyInNamespace(a), AnyOther(o)) | (AnyOther(o), AnyInNamespace(a)) => Some(*a) != *o,
            (AnyLocal, AnyLocal) => true,
            (AnyLocal, AnyOther(o)) | (AnyOther(o), AnyLocal) => o.is_some(),
            (AnyOther(_), AnyOther(_)) => true,
        }
    }

    /// Render the matcher using the names in `symbols`
    pub fn describe(&self, symbols: &SymbolTable) -> String {
        match self {
            Self::Name { name, .. } => symbols.resolve(*name).to_string(),
            Self::Any => "##any".to_string(),
            Self::AnyInNamespace(ns) => format!("##{{{}}}", symbols.resolve(*ns)),
            Self::AnyLocal => "##local".to_string(),
            Self::AnyOther(Some(ns)) => format!("##other{{{}}}", symbols.resolve(*ns)),
            Self::AnyOther(None) => "##other".to_string(),
            Self::EndOfContent => "<<EOC>>".to_string(),
        }
    }
}

// Identity of a matcher: exact names compare by interned name only,
// wildcards by class and bound namespace.
impl PartialEq for ElementMatcher {
    fn eq(&self, other: &Self) -> bool {
        use ElementMatcher::*;
        match (self, other) {
            (Name { name: a, .. }, Name { name: b, .. }) => a == b,
            (Any, Any) | (AnyLocal, AnyLocal) | (EndOfContent, EndOfContent) => true,
            (AnyInNamespace(a), AnyInNamespace(b)) => a == b,
            (AnyOther(a), AnyOther(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ElementMatcher {}

impl Hash for ElementMatcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Name { name, .. } => name.hash(state),
            Self::AnyInNamespace(ns) => ns.hash(state),
            Self::AnyOther(ns) => ns.hash(state),
            Self::Any | Self::AnyLocal | Self::EndOfContent => {}
        }
    }
}

/// Repetition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepeatKind {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
}

impl RepeatKind {
    /// The suffix operator character
    pub fn symbol(self) -> char {
        match self {
            Self::ZeroOrMore => '*',
            Self::OneOrMore => '+',
            Self::ZeroOrOne => '?',
        }
    }
}

/// Cached per-node facts used by the follow-set computation
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Whether the subtree can match the empty sequence
    pub nullable: bool,
    /// Positions that can match first
    pub first: PositionSet,
    /// Positions that can match last
    pub last: PositionSet,
}

/// The shape of a syntax node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A non-epsilon leaf
    Leaf {
        /// Unique position of the leaf
        position: usize,
        /// What the leaf accepts
        matcher: ElementMatcher,
    },
    /// An epsilon leaf: matches the empty sequence and owns no position
    Empty,
    /// `left , right`
    Sequence(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `left | right`
    Choice(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `child*`, `child+` or `child?`
    Repeat(Box<SyntaxNode>, RepeatKind),
}

/// A node of a position-labeled syntax tree
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    kind: NodeKind,
    info: OnceCell<NodeInfo>,
}

impl SyntaxNode {
    fn from_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            info: OnceCell::new(),
        }
    }

    /// A leaf at `position` accepting `matcher`
    pub fn leaf(position: usize, matcher: ElementMatcher) -> Self {
        Self::from_kind(NodeKind::Leaf { position, matcher })
    }

    /// An epsilon leaf
    pub fn empty() -> Self {
        Self::from_kind(NodeKind::Empty)
    }

    /// `left , right`
    pub fn sequence(left: SyntaxNode, right: SyntaxNode) -> Self {
        Self::from_kind(NodeKind::Sequence(Box::new(left), Box::new(right)))
    }

    /// `left | right`
    pub fn choice(left: SyntaxNode, right: SyntaxNode) -> Self {
        Self::from_kind(NodeKind::Choice(Box::new(left), Box::new(right)))
    }

    /// `child` under a repetition operator
    pub fn repeat(child: SyntaxNode, kind: RepeatKind) -> Self {
        Self::from_kind(NodeKind::Repeat(Box::new(child), kind))
    }

    /// The node's shape
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Number of non-epsilon leaves in the subtree
    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf { .. } => 1,
            NodeKind::Empty => 0,
            NodeKind::Sequence(left, right) | NodeKind::Choice(left, right) => {
                left.leaf_count() + right.leaf_count()
            }
            NodeKind::Repeat(child, _) => child.leaf_count(),
        }
    }

    /// Visit the non-epsilon leaves left to right
    pub fn for_each_leaf<'a>(&'a self, visit: &mut impl FnMut(usize, &'a ElementMatcher)) {
        match &self.kind {
            NodeKind::Leaf { position, matcher } => visit(*position, matcher),
            NodeKind::Empty => {}
            NodeKind::Sequence(left, right) | NodeKind::Choice(left, right) => {
                left.for_each_leaf(visit);
                right.for_each_leaf(visit);
            }
            NodeKind::Repeat(child, _) => child.for_each_leaf(visit),
        }
    }

    /// Nullable/first/last for this node, computed bottom-up on first use
    /// with position sets of the given capacity.
    pub fn info(&self, capacity: usize) -> &NodeInfo {
        self.info.get_or_init(|| self.compute_info(capacity))
    }

    /// Whether the subtree can match the empty sequence
    pub fn is_nullable(&self, capacity: usize) -> bool {
        self.info(capacity).nullable
    }

    /// Drop every cached [`NodeInfo`] in the subtree
    pub fn clear_info(&mut self) {
        self.info.take();
        match &mut self.kind {
            NodeKind::Leaf { .. } | NodeKind::Empty => {}
            NodeKind::Sequence(left, right) | NodeKind::Choice(left, right) => {
                left.clear_info();
                right.clear_info();
            }
            NodeKind::Repeat(child, _) => child.clear_info(),
        }
    }

    fn compute_info(&self, capacity: usize) -> NodeInfo {
        match &self.kind {
            NodeKind::Leaf { position, .. } => NodeInfo {
                nullable: false,
                first: PositionSet::singleton(capacity, *position),
                last: PositionSet::singleton(capacity, *position),
            },
            NodeKind::Empty => NodeInfo {
                nullable: true,
                first: PositionSet::new(capacity),
                last: PositionSet::new(capacity),
            },
            NodeKind::Sequence(left, right) => {
                let (l, r) = (left.info(capacity), right.info(capacity));
                let mut first = l.first.clone();
                if l.nullable {
                    first.union_with(&r.first);
                }
                let mut last = r.last.clone();
                if r.nullable {
                    last.union_with(&l.last);
                }
                NodeInfo {
                    nullable: l.nullable && r.nullable,
                    first,
                    last,
                }
            }
            NodeKind::Choice(left, right) => {
                let (l, r) = (left.info(capacity), right.info(capacity));
                let mut first = l.first.clone();
                first.union_with(&r.first);
                let mut last = l.last.clone();
                last.union_with(&r.last);
                NodeInfo {
                    nullable: l.nullable || r.nullable,
                    first,
                    last,
                }
            }
            NodeKind::Repeat(child, kind) => {
                let c = child.info(capacity);
                NodeInfo {
                    nullable: match kind {
                        RepeatKind::OneOrMore => c.nullable,
                        RepeatKind::ZeroOrMore | RepeatKind::ZeroOrOne => true,
                    },
                    first: c.first.clone(),
                    last: c.last.clone(),
                }
            }
        }
    }

    /// Render the tree as a content-model expression
    pub fn describe(&self, symbols: &SymbolTable) -> String {
        match &self.kind {
            NodeKind::Leaf { matcher, .. } => matcher.describe(symbols),
            NodeKind::Empty => "EMPTY".to_string(),
            NodeKind::Sequence(left, right) => {
                format!("({},{})", left.describe(symbols), right.describe(symbols))
            }
            NodeKind::Choice(left, right) => {
                format!("({}|{})", left.describe(symbols), right.describe(symbols))
            }
            NodeKind::Repeat(child, kind) => format!("{}{}", child.describe(symbols), kind.symbol()),
        }
    }
}
