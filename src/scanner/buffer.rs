//! UTF-16 text buffers
//!
//! Scanned text is kept as UTF-16 code units so that supplementary
//! characters occupy two units, exactly as they do in the character stream.

use std::fmt;

use crate::names::{high_surrogate, is_supplemental, low_surrogate};

/// Growable buffer of UTF-16 code units
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct XmlString {
    units: Vec<u16>,
}

impl XmlString {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding the UTF-16 encoding of `s`
    pub fn from_text(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }

    /// Remove all content, keeping the allocation
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Append one code unit
    pub fn push(&mut self, unit: u16) {
        self.units.push(unit);
    }

    /// Append a character
    pub fn push_char(&mut self, c: char) {
        let mut units = [0u16; 2];
        self.units.extend_from_slice(c.encode_utf16(&mut units));
    }

    /// Append a code point: one unit, or a surrogate pair above U+FFFF
    pub fn push_code_point(&mut self, c: u32) {
        if is_supplemental(c) {
            self.units.push(high_surrogate(c));
            self.units.push(low_surrogate(c));
        } else {
            self.units.push(c as u16);
        }
    }

    /// Append a string
    pub fn push_str(&mut self, s: &str) {
        self.units.extend(s.encode_utf16());
    }

    /// Append the content of another buffer
    pub fn append(&mut self, other: &XmlString) {
        self.units.extend_from_slice(&other.units);
    }

    /// Number of code units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The code units
    pub fn as_units(&self) -> &[u16] {
        &self.units
    }

    /// Overwrite the unit at `index`; out-of-range indexes are ignored
    pub fn set(&mut self, index: usize, unit: u16) {
        if let Some(slot) = self.units.get_mut(index) {
            *slot = unit;
        }
    }

    /// Decode into a `String`, replacing unpaired surrogates
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}

impl fmt::Display for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

impl fmt::Debug for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl From<&str> for XmlString {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

const INITIAL_POOL_SIZE: usize = 6;

/// Pool of reusable buffers.
///
/// [`take`](Self::take) hands out a cleared buffer and
/// [`give_back`](Self::give_back) returns it for reuse.
#[derive(Debug, Clone)]
pub struct BufferPool {
    free: Vec<XmlString>,
    created: usize,
}

impl BufferPool {
    /// Create a pool with a few preallocated buffers
    pub fn new() -> Self {
        Self {
            free: (0..INITIAL_POOL_SIZE).map(|_| XmlString::new()).collect(),
            created: INITIAL_POOL_SIZE,
        }
    }

    /// Take a cleared buffer, allocating one if the pool is empty
    pub fn take(&mut self) -> XmlString {
        match self.free.pop() {
            Some(mut buffer) => {
                buffer.clear();
                buffer
            }
            None => {
                self.created += 1;
                XmlString::new()
            }
        }
    }

    /// Return a buffer to the pool
    pub fn give_back(&mut self, buffer: XmlString) {
        self.free.push(buffer);
    }

    /// Number of buffers waiting in the pool
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of buffers ever created by the pool
    pub fn created(&self) -> usize {
        self.created
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
