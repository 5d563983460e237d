//! Entity input stack
//!
//! The document text is the bottom entry; each expanded internal entity
//! pushes its replacement text on top. Reads come from the top entry only.
//! Line ends in the document are normalized on the fly: `\r\n` and a lone
//! `\r` read as `\n`. Replacement text is read verbatim, so a `&#13;` stored
//! in an entity value stays a carriage return.

const CR: u16 = 0x0D;
const LF: u16 = 0x0A;

#[derive(Debug, Clone)]
struct EntityInput {
    name: Option<String>,
    units: Vec<u16>,
    pos: usize,
    line: usize,
    column: usize,
    normalize_line_ends: bool,
}

impl EntityInput {
    fn new(name: Option<String>, text: &str) -> Self {
        Self {
            normalize_line_ends: name.is_none(),
            name,
            units: text.encode_utf16().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Stack of entity texts being read
#[derive(Debug, Clone)]
pub struct InputStack {
    inputs: Vec<EntityInput>,
}

impl InputStack {
    /// Start reading a document
    pub fn new(document: &str) -> Self {
        Self {
            inputs: vec![EntityInput::new(None, document)],
        }
    }

    fn top(&self) -> &EntityInput {
        // the document entry is never popped
        &self.inputs[self.inputs.len() - 1]
    }

    fn top_mut(&mut self) -> &mut EntityInput {
        let last = self.inputs.len() - 1;
        &mut self.inputs[last]
    }

    /// Begin reading the replacement text of entity `name`
    pub fn push(&mut self, name: &str, text: &str) {
        self.inputs.push(EntityInput::new(Some(name.to_string()), text));
    }

    /// Stop reading the innermost entity, returning its name.
    /// The document entry is never removed.
    pub fn pop(&mut self) -> Option<String> {
        if self.inputs.len() > 1 {
            self.inputs.pop().and_then(|input| input.name)
        } else {
            None
        }
    }

    /// Number of entities stacked on top of the document
    pub fn depth(&self) -> usize {
        self.inputs.len() - 1
    }

    /// Check whether entity `name` is currently being read
    pub fn contains(&self, name: &str) -> bool {
        self.inputs.iter().any(|input| input.name.as_deref() == Some(name))
    }

    /// Name of the innermost entity, `None` for the document
    pub fn current_name(&self) -> Option<&str> {
        self.top().name.as_deref()
    }

    /// Check whether the innermost entry is exhausted
    pub fn at_entity_end(&self) -> bool {
        let top = self.top();
        top.pos >= top.units.len()
    }

    /// Next unit of the innermost entry, with a document `\r` read as `\n`
    pub fn peek(&self) -> Option<u16> {
        let normalize = self.top().normalize_line_ends;
        self.peek_raw(0)
            .map(|unit| if normalize && unit == CR { LF } else { unit })
    }

    /// Unit `offset` places ahead in the innermost entry, unnormalized
    pub fn peek_raw(&self, offset: usize) -> Option<u16> {
        let top = self.top();
        top.units.get(top.pos + offset).copied()
    }

    /// Consume one unit (a document `\r\n` pair counts as one `\n`)
    pub fn read(&mut self) -> Option<u16> {
        let top = self.top_mut();
        let unit = *top.units.get(top.pos)?;
        top.pos += 1;
        let unit = if unit == CR && top.normalize_line_ends {
            if top.units.get(top.pos) == Some(&LF) {
                top.pos += 1;
            }
            LF
        } else {
            unit
        };
        if unit == LF {
            top.line += 1;
            top.column = 1;
        } else {
            top.column += 1;
        }
        Some(unit)
    }

    /// Check whether the innermost entry continues with `s`
    pub fn starts_with(&self, s: &str) -> bool {
        s.encode_utf16()
            .enumerate()
            .all(|(offset, unit)| self.peek_raw(offset) == Some(unit))
    }

    /// Consume `s` if the innermost entry continues with it
    pub fn skip_str(&mut self, s: &str) -> bool {
        if !self.starts_with(s) {
            return false;
        }
        for _ in s.encode_utf16() {
            self.read();
        }
        true
    }

    /// Line and column of the innermost entry's cursor
    pub fn location(&self) -> (usize, usize) {
        let top = self.top();
        (top.line, top.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_end_normalization() {
        let mut input = InputStack::new("a\r\nb\rc");
        assert_eq!(input.read(), Some('a' as u16));
        assert_eq!(input.peek(), Some(LF));
        assert_eq!(input.read(), Some(LF));
        assert_eq!(input.read(), Some('b' as u16));
        assert_eq!(input.read(), Some(LF));
        assert_eq!(input.location(), (3, 1));
        assert_eq!(input.read(), Some('c' as u16));
        assert_eq!(input.read(), None);
        assert!(input.at_entity_end());
    }

    #[test]
    fn test_entity_text_keeps_carriage_returns() {
        let mut input = InputStack::new("\r\n");
        input.push("e", "x\ry");
        assert_eq!(input.read(), Some('x' as u16));
        assert_eq!(input.peek(), Some(CR));
        assert_eq!(input.read(), Some(CR));
        assert_eq!(input.read(), Some('y' as u16));

        input.pop();
        assert_eq!(input.read(), Some(LF));
        assert_eq!(input.read(), None);
    }

    #[test]
    fn test_entity_stack() {
        let mut input = InputStack::new("<doc/>");
        input.push("e", "xy");
        assert_eq!(input.depth(), 1);
        assert!(input.contains("e"));
        assert_eq!(input.current_name(), Some("e"));
        assert!(input.skip_str("xy"));
        assert!(input.at_entity_end());

        assert_eq!(input.pop(), Some("e".to_string()));
        assert_eq!(input.pop(), None);
        assert_eq!(input.depth(), 0);
        assert!(input.starts_with("<doc"));
    }

    #[test]
    fn test_skip_str_is_all_or_nothing() {
        let mut input = InputStack::new("<!DOCTYPE");
        assert!(!input.skip_str("<!ENTITY"));
        assert_eq!(input.peek(), Some('<' as u16));
        assert!(input.skip_str("<!DOC"));
        assert_eq!(input.location(), (1, 6));
    }
}
