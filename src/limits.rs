//! Limits and constraints for content-model compilation and scanning
//!
//! This module defines various limits to prevent resource exhaustion
//! and protect against XML attacks (e.g., billion laughs, state explosion
//! in pathological content models).

use crate::error::{Error, Result};

/// Resource limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of leaf positions in one content model
    pub max_leaf_positions: usize,

    /// Maximum number of DFA states built for one content model
    pub max_dfa_states: usize,

    /// Maximum entity nesting depth
    pub max_entity_depth: usize,

    /// Maximum number of entity expansions per document
    pub max_entity_expansions: usize,

    /// Maximum length of a single literal, in UTF-16 code units
    pub max_literal_length: usize,

    /// Maximum element nesting depth
    pub max_element_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_leaf_positions: 10_000,
            max_dfa_states: 100_000,
            max_entity_depth: 64,
            max_entity_expansions: 10_000,
            max_literal_length: 10 * 1024 * 1024, // 10M code units
            max_element_depth: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_leaf_positions: 1000,
            max_dfa_states: 10_000,
            max_entity_depth: 8,
            max_entity_expansions: 1000,
            max_literal_length: 1024 * 1024, // 1M code units
            max_element_depth: 100,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_leaf_positions: 1_000_000,
            max_dfa_states: 10_000_000,
            max_entity_depth: 1024,
            max_entity_expansions: 1_000_000,
            max_literal_length: 1024 * 1024 * 1024,
            max_element_depth: 10_000,
        }
    }

    /// Check if the number of leaf positions is within limits
    pub fn check_leaf_positions(&self, count: usize) -> Result<()> {
        if count > self.max_leaf_positions {
            Err(Error::LimitExceeded(format!(
                "Leaf position count {} exceeds maximum {}",
                count, self.max_leaf_positions
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of DFA states is within limits
    pub fn check_dfa_states(&self, count: usize) -> Result<()> {
        if count > self.max_dfa_states {
            Err(Error::LimitExceeded(format!(
                "DFA state count {} exceeds maximum {}",
                count, self.max_dfa_states
            )))
        } else {
            Ok(())
        }
    }

    /// Check if entity nesting depth is within limits
    pub fn check_entity_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_entity_depth {
            Err(Error::LimitExceeded(format!(
                "Entity depth {} exceeds maximum {}",
                depth, self.max_entity_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if entity expansions are within limits
    pub fn check_entity_expansions(&self, count: usize) -> Result<()> {
        if count > self.max_entity_expansions {
            Err(Error::LimitExceeded(format!(
                "Entity expansions {} exceeds maximum {}",
                count, self.max_entity_expansions
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a literal length is within limits
    pub fn check_literal_length(&self, len: usize) -> Result<()> {
        if len > self.max_literal_length {
            Err(Error::LimitExceeded(format!(
                "Literal length {} exceeds maximum {}",
                len, self.max_literal_length
            )))
        } else {
            Ok(())
        }
    }

    /// Check if element depth is within limits
    pub fn check_element_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_element_depth {
            Err(Error::LimitExceeded(format!(
                "Element depth {} exceeds maximum {}",
                depth, self.max_element_depth
            )))
        } else {
            Ok(())
        }
    }
}
