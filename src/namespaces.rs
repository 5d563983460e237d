//! XML namespace handling
//!
//! This module provides utilities for working with XML namespaces,
//! qualified names (QNames), and scoped namespace prefix mappings.

use crate::error::{Error, Result};
use crate::XML_NAMESPACE;
use std::collections::HashMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// One element's worth of namespace declarations
#[derive(Debug, Clone, Default)]
struct Scope {
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// `Some(None)` records an explicit `xmlns=""` undeclaration
    default_namespace: Option<Option<NamespaceUri>>,
}

/// Namespace context for resolving prefixes
///
/// Bindings are scoped: [`push_scope`](Self::push_scope) opens a scope for
/// an element's declarations and [`pop_scope`](Self::pop_scope) discards
/// them when the element ends.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    scopes: Vec<Scope>,
}

impl NamespaceContext {
    /// Create a new namespace context with only the `xml` prefix bound
    pub fn new() -> Self {
        let mut root = Scope::default();
        root.prefixes.insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self { scopes: vec![root] }
    }

    /// Open a new scope
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Close the innermost scope. The root scope is never removed.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Current nesting depth of scopes
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Add a namespace prefix mapping in the innermost scope
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.prefixes.insert(prefix.into(), namespace.into());
        }
    }

    /// Set the default namespace in the innermost scope.
    /// An empty URI undeclares the default namespace.
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if let Some(scope) = self.scopes.last_mut() {
            scope.default_namespace = Some(if namespace.is_empty() {
                None
            } else {
                Some(namespace)
            });
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.prefixes.get(prefix))
            .map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.default_namespace.as_ref())
            .and_then(|ns| ns.as_deref())
    }

    /// Resolve a prefixed element name to a QName.
    /// Unprefixed names take the default namespace.
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.get_default_namespace(), prefixed_name))
        }
    }

    /// Resolve a prefixed attribute name to a QName.
    /// Unprefixed attributes are in no namespace.
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        if prefixed_name.contains(':') {
            self.resolve(prefixed_name)
        } else {
            Ok(QName::local(prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
    }

    #[test]
    fn test_qname_to_string() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("bk", "http://example.com/book");
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("bk"), Some("http://example.com/book"));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("bk", "http://example.com/book");

        let qname = ctx.resolve("bk:title").unwrap();
        assert_eq!(qname.namespace, Some("http://example.com/book".to_string()));
        assert_eq!(qname.local_name, "title");

        assert!(ctx.resolve("zz:title").is_err());
    }

    #[test]
    fn test_scopes() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:outer");

        ctx.push_scope();
        ctx.set_default_namespace("");
        ctx.add_prefix("a", "urn:a");
        assert_eq!(ctx.get_default_namespace(), None);
        assert_eq!(ctx.resolve("x").unwrap(), QName::local("x"));
        assert_eq!(ctx.depth(), 1);

        ctx.pop_scope();
        assert_eq!(ctx.get_default_namespace(), Some("urn:outer"));
        assert_eq!(ctx.get_namespace("a"), None);

        // the root scope survives extra pops
        ctx.pop_scope();
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_attributes_ignore_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:d");
        assert_eq!(ctx.resolve_attribute("id").unwrap(), QName::local("id"));
        assert_eq!(
            ctx.resolve_attribute("xml:lang").unwrap(),
            QName::namespaced(XML_NAMESPACE, "lang")
        );
    }
}
