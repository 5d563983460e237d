//! Content DFA construction
//!
//! The builder wraps a syntax tree as `(tree, <<EOC>>)`, computes a follow
//! set for every leaf position in one post-order walk, groups leaves into
//! element-map columns, and runs the subset construction:
//!
//! 1. state 0 is `first(root)`;
//! 2. states are processed in discovery order; for each column `c` the
//!    target set is the union of `follow[p]` over the positions `p` of the
//!    state that belong to column `c`;
//! 3. non-empty targets are deduplicated through a map keyed by position
//!    set, so equal sets always collapse into one state.
//!
//! A state is final iff it contains the end-of-content position.

use std::collections::HashMap;
use tracing::{debug, trace};

use super::dfa::ContentDfa;
use super::element_map::ElementMap;
use super::positions::PositionSet;
use super::syntax::{ElementMatcher, NodeKind, RepeatKind, SyntaxNode};
use crate::error::{Error, Result};
use crate::limits::Limits;

/// Options for [`compile`]
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Whether non-element data may be interleaved with children
    pub mixed: bool,
    /// Resource limits
    pub limits: Limits,
}

impl CompileOptions {
    /// Create default options (element-only content, default limits)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set mixed content
    pub fn with_mixed(mut self, mixed: bool) -> Self {
        self.mixed = mixed;
        self
    }

    /// Set resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Compile a position-labeled syntax tree into a [`ContentDfa`].
///
/// `leaf_count` is the number of non-epsilon leaves in `root`; their
/// positions must be exactly `0..leaf_count`. A tree violating this is
/// rejected with [`Error::Grammar`].
pub fn compile(root: SyntaxNode, leaf_count: usize, options: &CompileOptions) -> Result<ContentDfa> {
    let limits = &options.limits;
    let eoc_position = leaf_count;
    let total = leaf_count + 1;
    limits.check_leaf_positions(total)?;

    let mut head = SyntaxNode::sequence(root, SyntaxNode::leaf(eoc_position, ElementMatcher::EndOfContent));
    head.clear_info();

    let leaves = collect_leaves(&head, total)?;

    let mut follow = vec![PositionSet::new(total); total];
    calc_follow(&head, total, &mut follow);

    let element_map = ElementMap::from_leaves(leaves.iter().copied());
    let column_count = element_map.len();

    // leaves pre-grouped by column
    let mut sorter: Vec<Vec<usize>> = vec![Vec::new(); column_count];
    for (position, matcher) in leaves.iter().enumerate() {
        let column = element_map
            .column_of(matcher)
            .ok_or_else(|| Error::Grammar(format!("leaf {} has no column", position)))?;
        sorter[column].push(position);
    }

    let NodeKind::Sequence(content, _) = head.kind() else {
        return Err(Error::Grammar("content wrapper is not a sequence".to_string()));
    };
    let empty_content_is_valid = content.is_nullable(total);

    let mut states: Vec<PositionSet> = vec![head.info(total).first.clone()];
    let mut state_table: HashMap<PositionSet, u32> = HashMap::new();
    state_table.insert(states[0].clone(), 0);
    let mut transitions: Vec<Option<u32>> = Vec::new();
    let mut final_states: Vec<bool> = Vec::new();

    let mut unmarked = 0;
    while unmarked < states.len() {
        let set = states[unmarked].clone();
        let is_final = set.contains(eoc_position);
        trace!(state = unmarked, positions = ?set, is_final, "processing DFA state");
        final_states.push(is_final);

        for positions in &sorter {
            let mut next = PositionSet::new(total);
            for &position in positions {
                if set.contains(position) {
                    next.union_with(&follow[position]);
                }
            }

            if next.is_empty() {
                transitions.push(None);
                continue;
            }

            let target = match state_table.get(&next) {
                Some(&index) => index,
                None => {
                    let index = states.len();
                    limits.check_dfa_states(index + 1)?;
                    states.push(next.clone());
                    state_table.insert(next, index as u32);
                    index as u32
                }
            };
            transitions.push(Some(target));
        }
        unmarked += 1;
    }

    debug!(
        leaf_count,
        columns = column_count,
        states = states.len(),
        empty_content_is_valid,
        mixed = options.mixed,
        "compiled content model"
    );

    Ok(ContentDfa::from_parts(
        element_map,
        transitions,
        final_states,
        empty_content_is_valid,
        options.mixed,
    ))
}

/// Dense leaf list indexed by position
fn collect_leaves(head: &SyntaxNode, total: usize) -> Result<Vec<&ElementMatcher>> {
    let mut slots: Vec<Option<&ElementMatcher>> = vec![None; total];
    let mut problem = None;
    head.for_each_leaf(&mut |position, matcher| {
        if problem.is_some() {
            return;
        }
        match slots.get_mut(position) {
            None => problem = Some(format!("leaf position {} out of range 0..{}", position, total)),
            Some(Some(_)) => problem = Some(format!("duplicate leaf position {}", position)),
            Some(slot) => *slot = Some(matcher),
        }
    });
    if let Some(message) = problem {
        return Err(Error::Grammar(message));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| Error::Grammar(format!("no leaf at position {}", position)))
        })
        .collect()
}

fn calc_follow(node: &SyntaxNode, total: usize, follow: &mut [PositionSet]) {
    match node.kind() {
        NodeKind::Leaf { .. } | NodeKind::Empty => {}
        NodeKind::Choice(left, right) => {
            calc_follow(left, total, follow);
            calc_follow(right, total, follow);
        }
        NodeKind::Sequence(left, right) => {
            calc_follow(left, total, follow);
            calc_follow(right, total, follow);
            let first = &right.info(total).first;
            for position in left.info(total).last.iter() {
                follow[position].union_with(first);
            }
        }
        NodeKind::Repeat(child, kind) => {
            calc_follow(child, total, follow);
            if matches!(kind, RepeatKind::ZeroOrMore | RepeatKind::OneOrMore) {
                let info = node.info(total);
                for position in info.last.iter() {
                    follow[position].union_with(&info.first);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dfa::{ChildSymbol, ValidationResult};
    use crate::symbols::SymbolTable;

    fn leaf(position: usize, symbols: &mut SymbolTable, name: &str) -> SyntaxNode {
        SyntaxNode::leaf(position, ElementMatcher::name(symbols.intern(name)))
    }

    #[test]
    fn test_compile_sequence() {
        let mut symbols = SymbolTable::new();
        let tree = SyntaxNode::sequence(leaf(0, &mut symbols, "a"), leaf(1, &mut symbols, "b"));
        let dfa = compile(tree, 2, &CompileOptions::new()).unwrap();

        // a, b, <<EOC>>
        assert_eq!(dfa.column_count(), 3);
        assert_eq!(dfa.state_count(), 3);
        assert!(!dfa.empty_content_is_valid());
        assert!(!dfa.is_final_state(0));
        assert!(dfa.is_final_state(2));
        assert_eq!(dfa.transition(0, 0), Some(1));
        assert_eq!(dfa.transition(0, 1), None);
    }

    #[test]
    fn test_equal_position_sets_share_a_state() {
        let mut symbols = SymbolTable::new();
        // (a|a)* : both leaves share a column and loop back to the same set
        let tree = SyntaxNode::repeat(
            SyntaxNode::choice(leaf(0, &mut symbols, "a"), leaf(1, &mut symbols, "a")),
            RepeatKind::ZeroOrMore,
        );
        let dfa = compile(tree, 2, &CompileOptions::new()).unwrap();
        assert_eq!(dfa.column_count(), 2);
        assert_eq!(dfa.state_count(), 1);
        let a = ChildSymbol::element(symbols.intern("a"));
        assert_eq!(dfa.validate(&[a, a, a]), ValidationResult::Valid);
    }

    #[test]
    fn test_rejects_duplicate_positions() {
        let mut symbols = SymbolTable::new();
        let tree = SyntaxNode::sequence(leaf(0, &mut symbols, "a"), leaf(0, &mut symbols, "b"));
        let err = compile(tree, 2, &CompileOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Grammar(_)));
    }

    #[test]
    fn test_rejects_sparse_positions() {
        let mut symbols = SymbolTable::new();
        let tree = SyntaxNode::sequence(leaf(0, &mut symbols, "a"), leaf(2, &mut symbols, "b"));
        assert!(matches!(
            compile(tree, 3, &CompileOptions::new()),
            Err(Error::Grammar(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_positions() {
        let mut symbols = SymbolTable::new();
        let tree = leaf(5, &mut symbols, "a");
        assert!(matches!(
            compile(tree, 1, &CompileOptions::new()),
            Err(Error::Grammar(_))
        ));
    }

    #[test]
    fn test_state_limit() {
        let mut symbols = SymbolTable::new();
        let tree = SyntaxNode::sequence(
            leaf(0, &mut symbols, "a"),
            SyntaxNode::sequence(leaf(1, &mut symbols, "b"), leaf(2, &mut symbols, "c")),
        );
        let mut limits = Limits::default();
        limits.max_dfa_states = 2;
        let options = CompileOptions::new().with_limits(limits);
        assert!(matches!(compile(tree, 3, &options), Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_epsilon_root() {
        let dfa = compile(SyntaxNode::empty(), 0, &CompileOptions::new()).unwrap();
        assert!(dfa.empty_content_is_valid());
        assert_eq!(dfa.state_count(), 1);
        assert!(dfa.is_final_state(0));
    }

    #[test]
    fn test_precomputed_info_is_discarded() {
        let mut symbols = SymbolTable::new();
        let tree = leaf(0, &mut symbols, "a");
        // cached with the wrong capacity before compiling
        let _ = tree.info(1);
        let dfa = compile(tree, 1, &CompileOptions::new()).unwrap();
        assert!(dfa.is_final_state(1));
    }
}
