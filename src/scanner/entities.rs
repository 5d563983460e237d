//! General entities
//!
//! The scanner asks an [`EntityResolver`] about every entity reference it
//! meets. [`EntityStore`] is the resolver filled from `<!ENTITY>`
//! declarations by the document driver.

use indexmap::IndexMap;

/// Declared entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Entity with literal replacement text
    Internal {
        /// Replacement text
        value: String,
    },
    /// Entity whose content lives elsewhere
    External {
        /// Public identifier
        public_id: Option<String>,
        /// System identifier
        system_id: String,
        /// Notation of an unparsed entity
        notation: Option<String>,
    },
}

impl Entity {
    /// Create an internal entity
    pub fn internal(value: impl Into<String>) -> Self {
        Self::Internal {
            value: value.into(),
        }
    }

    /// Check if this entity is external
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    /// Check if this entity is unparsed (external with a notation)
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Self::External { notation: Some(_), .. })
    }
}

/// Entity lookups needed by the scanner
pub trait EntityResolver {
    /// Check if `name` is an external entity
    fn is_external_entity(&self, name: &str) -> bool;

    /// Check if `name` is an unparsed entity
    fn is_unparsed_entity(&self, name: &str) -> bool;

    /// Check if `name` is declared
    fn is_declared_entity(&self, name: &str) -> bool;

    /// Replacement text or location of `name`
    fn resolve(&self, name: &str) -> Option<&Entity>;
}

/// Replacement character of the five predefined entities
pub fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Declared general entities, in declaration order
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: IndexMap<String, Entity>,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity. The first declaration of a name is binding;
    /// returns `false` if `name` was already declared.
    pub fn declare(&mut self, name: impl Into<String>, entity: Entity) -> bool {
        let name = name.into();
        if self.entities.contains_key(&name) {
            return false;
        }
        self.entities.insert(name, entity);
        true
    }

    /// Number of declared entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entity is declared
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over the declarations
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entities.iter().map(|(name, entity)| (name.as_str(), entity))
    }
}

impl EntityResolver for EntityStore {
    fn is_external_entity(&self, name: &str) -> bool {
        self.entities.get(name).is_some_and(Entity::is_external)
    }

    fn is_unparsed_entity(&self, name: &str) -> bool {
        self.entities.get(name).is_some_and(Entity::is_unparsed)
    }

    fn is_declared_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    fn resolve(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }
}
