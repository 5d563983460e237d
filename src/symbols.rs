//! String interning
//!
//! Names that are compared frequently (element names, namespace URIs) are
//! interned into a [`SymbolTable`] and compared as small integer
//! [`Symbol`]s. A table is an explicit value owned by the caller, typically
//! one per grammar or per document.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned string handle. Two symbols from the same table are equal iff
/// their strings are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    /// Index of the symbol in its table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interning table mapping strings to [`Symbol`]s
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: IndexSet<String>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its symbol
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(index) = self.strings.get_index_of(s) {
            return Symbol(index as u32);
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        Symbol(index as u32)
    }

    /// Look up a string without interning it
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.strings.get_index_of(s).map(|index| Symbol(index as u32))
    }

    /// Resolve a symbol back to its string.
    ///
    /// Symbols from another table resolve to `"?"`.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.strings
            .get_index(symbol.index())
            .map(|s| s.as_str())
            .unwrap_or("?")
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("title");
        let b = table.intern("author");
        assert_ne!(a, b);
        assert_eq!(table.intern("title"), a);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_and_get() {
        let mut table = SymbolTable::new();
        let sym = table.intern("bk:chapter");
        assert_eq!(table.resolve(sym), "bk:chapter");
        assert_eq!(table.get("bk:chapter"), Some(sym));
        assert_eq!(table.get("missing"), None);
        assert!(!table.is_empty());
    }
}
