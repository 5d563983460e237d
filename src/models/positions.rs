//! Leaf-position sets
//!
//! A [`PositionSet`] is a fixed-width bitset over the leaf positions of one
//! syntax tree. It is the coordinate system of the first/last/follow
//! computation and doubles as the identity of a DFA state: two sets are
//! equal (and hash equally) iff they contain exactly the same positions.

use std::fmt;

const WORD_BITS: usize = 64;

/// Set of leaf positions in `[0, capacity)`
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PositionSet {
    words: Vec<u64>,
    capacity: usize,
}

impl PositionSet {
    /// Create an empty set able to hold positions below `capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Create a set holding exactly one position
    pub fn singleton(capacity: usize, position: usize) -> Self {
        let mut set = Self::new(capacity);
        set.insert(position);
        set
    }

    /// Number of positions the set can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a position
    pub fn insert(&mut self, position: usize) {
        debug_assert!(position < self.capacity, "position {} out of range", position);
        self.words[position / WORD_BITS] |= 1 << (position % WORD_BITS);
    }

    /// Check whether a position is in the set
    pub fn contains(&self, position: usize) -> bool {
        position < self.capacity && self.words[position / WORD_BITS] & (1 << (position % WORD_BITS)) != 0
    }

    /// Add every position of `other` to this set
    pub fn union_with(&mut self, other: &PositionSet) {
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            *word |= *theirs;
        }
    }

    /// Remove all positions
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    /// Check whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Number of positions in the set
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterate over the positions in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(index * WORD_BITS + bit)
            })
        })
    }
}

impl fmt::Debug for PositionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_insert_and_contains() {
        let mut set = PositionSet::new(130);
        set.insert(0);
        set.insert(64);
        set.insert(129);
        assert!(set.contains(0));
        assert!(set.contains(64));
        assert!(set.contains(129));
        assert!(!set.contains(1));
        assert!(!set.contains(500));
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
    }

    #[test]
    fn test_union_and_clear() {
        let mut a = PositionSet::singleton(10, 1);
        let b = PositionSet::singleton(10, 7);
        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 7]);

        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn test_value_equality_as_map_key() {
        let mut a = PositionSet::new(8);
        a.insert(2);
        a.insert(5);
        let mut b = PositionSet::new(8);
        b.insert(5);
        b.insert(2);

        let mut table = HashMap::new();
        table.insert(a, 0usize);
        assert_eq!(table.get(&b), Some(&0));
    }

    #[test]
    fn test_debug_format() {
        let mut set = PositionSet::new(4);
        set.insert(3);
        set.insert(1);
        assert_eq!(format!("{:?}", set), "{1, 3}");
    }
}
