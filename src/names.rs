//! XML character classes and name validation
//!
//! Character predicates follow the XML 1.0 (Fifth Edition) productions and
//! operate on Unicode code points (`u32`) so that the scanner can classify
//! both single UTF-16 code units and decoded surrogate pairs.
//! Name predicates operate on `&str`.

use crate::error::{Error, Result};

/// `[2] Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
pub fn is_char(c: u32) -> bool {
    matches!(c, 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

/// The negation of [`is_char`]: code points that may never appear in a document
pub fn is_invalid(c: u32) -> bool {
    !is_char(c)
}

/// `[3] S ::= (#x20 | #x9 | #xD | #xA)+`
pub fn is_space(c: u32) -> bool {
    matches!(c, 0x20 | 0x9 | 0xD | 0xA)
}

/// Characters that start markup inside literals and content
pub fn is_markup(c: u32) -> bool {
    c == '<' as u32 || c == '&' as u32 || c == '%' as u32
}

/// Characters that can be copied verbatim from a literal: valid characters
/// that are neither markup, `]`, nor surrogate code units.
pub fn is_content(c: u32) -> bool {
    is_char(c) && !is_markup(c) && c != ']' as u32 && !(0xD800..=0xDFFF).contains(&c)
}

/// `[4] NameStartChar`
pub fn is_name_start(c: u32) -> bool {
    matches!(c,
        0x3A /* ':' */ | 0x41..=0x5A | 0x5F /* '_' */ | 0x61..=0x7A
        | 0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0x2FF | 0x370..=0x37D
        | 0x37F..=0x1FFF | 0x200C..=0x200D | 0x2070..=0x218F
        | 0x2C00..=0x2FEF | 0x3001..=0xD7FF | 0xF900..=0xFDCF
        | 0xFDF0..=0xFFFD | 0x10000..=0xEFFFF)
}

/// `[4a] NameChar`
pub fn is_name(c: u32) -> bool {
    is_name_start(c)
        || matches!(c,
            0x2D /* '-' */ | 0x2E /* '.' */ | 0x30..=0x39 | 0xB7
            | 0x300..=0x36F | 0x203F..=0x2040)
}

/// NameStartChar without the colon
pub fn is_ncname_start(c: u32) -> bool {
    c != ':' as u32 && is_name_start(c)
}

/// NameChar without the colon
pub fn is_ncname(c: u32) -> bool {
    c != ':' as u32 && is_name(c)
}

/// `[13] PubidChar ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]`
pub fn is_pubid(c: u32) -> bool {
    match char::from_u32(c) {
        Some(ch) if ch.is_ascii_alphanumeric() => true,
        Some(ch) => " \r\n-'()+,./:=?;!*#@$_%".contains(ch),
        None => false,
    }
}

/// `[81] EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
pub fn is_valid_encoding_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Check if a UTF-16 code unit is a high (leading) surrogate
pub fn is_high_surrogate(unit: u32) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// Check if a UTF-16 code unit is a low (trailing) surrogate
pub fn is_low_surrogate(unit: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Check if a code point lies outside the Basic Multilingual Plane
pub fn is_supplemental(c: u32) -> bool {
    (0x10000..=0x10FFFF).contains(&c)
}

/// Combine a surrogate pair into its code point
pub fn supplemental(high: u16, low: u16) -> u32 {
    (((high as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00) + 0x10000
}

/// Leading surrogate of a supplemental code point
pub fn high_surrogate(c: u32) -> u16 {
    (((c - 0x10000) >> 10) + 0xD800) as u16
}

/// Trailing surrogate of a supplemental code point
pub fn low_surrogate(c: u32) -> u16 {
    (((c - 0x10000) & 0x3FF) + 0xDC00) as u16
}

/// Check if a string is a valid XML Name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first as u32) => chars.all(|c| is_name(c as u32)),
        _ => false,
    }
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_ncname_start(first as u32) => chars.all(|c| is_ncname(c as u32)),
        _ => false,
    }
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    // QName can be "prefix:localName" or just "localName"
    if let Some((prefix, local)) = name.split_once(':') {
        is_valid_ncname(prefix) && is_valid_ncname(local)
    } else {
        is_valid_ncname(name)
    }
}

/// Validate an XML Name and return an error if invalid
pub fn validate_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid XML Name: '{}'", name)))
    }
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid NCName: '{}'", name)))
    }
}

/// Validate a QName and return an error if invalid
pub fn validate_qname(name: &str) -> Result<()> {
    if is_valid_qname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid QName: '{}'", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}
