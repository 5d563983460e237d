//! Element map: the column table of a content DFA
//!
//! Leaves that share a matcher share a column. Columns are numbered in the
//! order their first leaf appears.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::dfa::ChildSymbol;
use super::syntax::ElementMatcher;

/// Distinct matchers of a content model, one per transition-table column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementMap {
    columns: IndexSet<ElementMatcher>,
}

impl ElementMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from leaf matchers in position order
    pub fn from_leaves<'a>(leaves: impl IntoIterator<Item = &'a ElementMatcher>) -> Self {
        let mut map = Self::new();
        for matcher in leaves {
            map.insert(matcher);
        }
        map
    }

    /// Return the column of `matcher`, appending a new column if unseen
    pub fn insert(&mut self, matcher: &ElementMatcher) -> usize {
        match self.columns.get_index_of(matcher) {
            Some(column) => column,
            None => self.columns.insert_full(matcher.clone()).0,
        }
    }

    /// Column of a matcher, by matcher identity
    pub fn column_of(&self, matcher: &ElementMatcher) -> Option<usize> {
        self.columns.get_index_of(matcher)
    }

    /// First column, in column order, whose matcher accepts the child.
    /// Data markers never match a column.
    pub fn find_column(&self, child: &ChildSymbol) -> Option<usize> {
        let ChildSymbol::Element { name, namespace } = *child else {
            return None;
        };
        self.columns
            .iter()
            .position(|matcher| matcher.accepts(name, namespace))
    }

    /// Matcher of a column
    pub fn get(&self, column: usize) -> Option<&ElementMatcher> {
        self.columns.get_index(column)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the map has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over the matchers in column order
    pub fn iter(&self) -> impl Iterator<Item = &ElementMatcher> {
        self.columns.iter()
    }
}
