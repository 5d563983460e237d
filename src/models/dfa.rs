//! Compiled content automata
//!
//! A [`ContentDfa`] is immutable once built and can be shared between
//! threads; every validation call only reads it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::element_map::ElementMap;
use super::syntax::ElementMatcher;
use crate::error::Result;
use crate::symbols::Symbol;

/// One observed child of an element instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildSymbol {
    /// A child element
    Element {
        /// Interned raw name
        name: Symbol,
        /// Interned namespace URI
        namespace: Option<Symbol>,
    },
    /// Non-element character data
    Text,
}

impl ChildSymbol {
    /// A child element in no namespace
    pub fn element(name: Symbol) -> Self {
        Self::Element {
            name,
            namespace: None,
        }
    }

    /// A child element in a namespace
    pub fn qualified(name: Symbol, namespace: Symbol) -> Self {
        Self::Element {
            name,
            namespace: Some(namespace),
        }
    }
}

/// Outcome of validating a child sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationResult {
    /// The sequence is accepted
    Valid,
    /// The child at this index is not allowed where it appears
    InvalidAt(usize),
    /// Every child was accepted but required content is missing; the index
    /// is the number of children
    IncompleteAt(usize),
}

impl ValidationResult {
    /// Check if the sequence was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Result of feeding one child to a [`DfaCursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The child was consumed; the cursor moved to this state
    Accepted(u32),
    /// Data in mixed content; the state did not change
    Skipped,
    /// The child is not allowed here; the cursor is now dead
    Rejected,
}

/// Position of an incremental validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfaCursor {
    state: Option<u32>,
    consumed: usize,
}

impl DfaCursor {
    /// Current state, `None` once a child has been rejected
    pub fn state(&self) -> Option<u32> {
        self.state
    }

    /// Number of children fed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Deterministic automaton for one content model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDfa {
    element_map: ElementMap,
    /// Row-major `state * column_count + column`
    transitions: Vec<Option<u32>>,
    final_states: Vec<bool>,
    empty_content_is_valid: bool,
    mixed: bool,
}

impl ContentDfa {
    pub(crate) fn from_parts(
        element_map: ElementMap,
        transitions: Vec<Option<u32>>,
        final_states: Vec<bool>,
        empty_content_is_valid: bool,
        mixed: bool,
    ) -> Self {
        Self {
            element_map,
            transitions,
            final_states,
            empty_content_is_valid,
            mixed,
        }
    }

    /// Validate a complete child sequence
    pub fn validate(&self, children: &[ChildSymbol]) -> ValidationResult {
        if children.is_empty() {
            return if self.empty_content_is_valid {
                ValidationResult::Valid
            } else {
                ValidationResult::IncompleteAt(0)
            };
        }

        let mut state = 0;
        for (index, child) in children.iter().enumerate() {
            if self.mixed && *child == ChildSymbol::Text {
                continue;
            }

            let Some(column) = self.element_map.find_column(child) else {
                trace!(index, ?child, "no column accepts child");
                return ValidationResult::InvalidAt(index);
            };
            match self.transition(state, column) {
                Some(next) => state = next,
                None => {
                    trace!(index, state, column, "no transition for child");
                    return ValidationResult::InvalidAt(index);
                }
            }
        }

        if self.is_final_state(state) {
            ValidationResult::Valid
        } else {
            trace!(state, "content ended in a non-final state");
            ValidationResult::IncompleteAt(children.len())
        }
    }

    /// Begin an incremental validation
    pub fn start(&self) -> DfaCursor {
        DfaCursor {
            state: Some(0),
            consumed: 0,
        }
    }

    /// Feed one child to the cursor
    pub fn step(&self, cursor: &mut DfaCursor, child: &ChildSymbol) -> Step {
        cursor.consumed += 1;
        let Some(state) = cursor.state else {
            return Step::Rejected;
        };
        if self.mixed && *child == ChildSymbol::Text {
            return Step::Skipped;
        }

        let next = self
            .element_map
            .find_column(child)
            .and_then(|column| self.transition(state, column));
        cursor.state = next;
        match next {
            Some(next) => Step::Accepted(next),
            None => Step::Rejected,
        }
    }

    /// Check whether the children fed so far form complete content
    pub fn end(&self, cursor: &DfaCursor) -> bool {
        cursor.state.is_some_and(|state| self.is_final_state(state))
    }

    /// Matchers that have a transition out of `state`
    pub fn expected(&self, state: u32) -> Vec<&ElementMatcher> {
        (0..self.column_count())
            .filter(|&column| self.transition(state, column).is_some())
            .filter_map(|column| self.element_map.get(column))
            .filter(|matcher| !matches!(matcher, ElementMatcher::EndOfContent))
            .collect()
    }

    /// Look for two columns that can accept the same element and are both
    /// enabled from a common state. Returns the first such pair of columns.
    pub fn check_ambiguity(&self) -> std::result::Result<(), (usize, usize)> {
        let columns = self.column_count();
        for state in 0..self.state_count() as u32 {
            for j in 0..columns {
                if self.transition(state, j).is_none() {
                    continue;
                }
                for k in (j + 1)..columns {
                    if self.transition(state, k).is_none() {
                        continue;
                    }
                    if let (Some(a), Some(b)) = (self.element_map.get(j), self.element_map.get(k)) {
                        if a.overlaps(b) {
                            return Err((j, k));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Target of the transition from `state` on `column`
    pub fn transition(&self, state: u32, column: usize) -> Option<u32> {
        let columns = self.column_count();
        if column >= columns {
            return None;
        }
        self.transitions
            .get(state as usize * columns + column)
            .copied()
            .flatten()
    }

    /// Check whether a state accepts
    pub fn is_final_state(&self, state: u32) -> bool {
        self.final_states.get(state as usize).copied().unwrap_or(false)
    }

    /// Number of states
    pub fn state_count(&self) -> usize {
        self.final_states.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.element_map.len()
    }

    /// The column table
    pub fn element_map(&self) -> &ElementMap {
        &self.element_map
    }

    /// Whether zero children are accepted
    pub fn empty_content_is_valid(&self) -> bool {
        self.empty_content_is_valid
    }

    /// Whether character data may be interleaved with children
    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    /// Serialize the automaton as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load an automaton from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
