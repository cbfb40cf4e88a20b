//! XML namespace handling
//!
//! Qualified names and prefix→URI contexts used to resolve QName-valued
//! lexical content. Namespace URIs are plain strings; the empty string
//! means "no namespace".

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace, bound to the predefined and immutable `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Qualified name: namespace URI plus local name.
///
/// The zero QName (both fields empty) is the "unresolved" sentinel and
/// never names a real component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI; empty for no namespace
    pub namespace: String,
    /// Local name
    pub local: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Create a QName in no namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            local: local.into(),
        }
    }

    /// Create a QName in the XSD namespace
    pub fn xsd(local: impl Into<String>) -> Self {
        Self {
            namespace: XSD_NAMESPACE.to_string(),
            local: local.into(),
        }
    }

    /// The zero QName: the "unresolved" sentinel
    pub fn zero() -> Self {
        Self {
            namespace: String::new(),
            local: String::new(),
        }
    }

    /// Whether this is the zero QName
    pub fn is_zero(&self) -> bool {
        self.namespace.is_empty() && self.local.is_empty()
    }

    /// Whether this name lives in the XSD namespace
    pub fn is_xsd(&self) -> bool {
        self.namespace == XSD_NAMESPACE
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Namespace context: prefix → URI mapping in scope at some point of the
/// source schema, used to resolve QName-valued lexical content such as
/// enumeration values of `xs:QName` type.
///
/// The `xml` prefix is predefined and cannot be rebound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceContext {
    prefixes: HashMap<String, String>,
    default_namespace: String,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix binding. Binding `xml` is ignored: the prefix is
    /// predefined and immutable.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        if prefix == "xml" {
            return;
        }
        self.prefixes.insert(prefix, namespace.into());
    }

    /// Set the default (unprefixed) namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = namespace.into();
    }

    /// Look up a prefix; the `xml` prefix always resolves.
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Resolve a lexical `prefix:local` (or bare `local`) form to a QName.
    ///
    /// Unprefixed names resolve to the default namespace, which may be
    /// empty (no namespace).
    pub fn resolve(&self, lexical: &str) -> Result<QName> {
        if let Some((prefix, local)) = lexical.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::UndeclaredPrefix(prefix.to_string()))?;
            Ok(QName::new(namespace, local))
        } else {
            Ok(QName::new(self.default_namespace.clone(), lexical))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        assert_eq!(QName::new("urn:ex", "val").to_string(), "{urn:ex}val");
        assert_eq!(QName::local("val").to_string(), "val");
    }

    #[test]
    fn test_zero_qname() {
        assert!(QName::zero().is_zero());
        assert!(!QName::local("x").is_zero());
        assert!(!QName::new("urn:ex", "").is_zero());
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("tns", "urn:ex");

        let q = ctx.resolve("tns:val").unwrap();
        assert_eq!(q, QName::new("urn:ex", "val"));

        assert!(matches!(
            ctx.resolve("missing:val"),
            Err(Error::UndeclaredPrefix(_))
        ));
    }

    #[test]
    fn test_resolve_unprefixed_uses_default() {
        let mut ctx = NamespaceContext::new();
        assert_eq!(ctx.resolve("val").unwrap(), QName::local("val"));

        ctx.set_default_namespace("urn:ex");
        assert_eq!(ctx.resolve("val").unwrap(), QName::new("urn:ex", "val"));
    }

    #[test]
    fn test_xml_prefix_is_predefined_and_immutable() {
        let mut ctx = NamespaceContext::new();
        assert_eq!(ctx.resolve("xml:lang").unwrap().namespace, XML_NAMESPACE);

        ctx.add_prefix("xml", "urn:bogus");
        assert_eq!(ctx.resolve("xml:lang").unwrap().namespace, XML_NAMESPACE);
    }
}
