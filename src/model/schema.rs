//! The parsed schema component graph
//!
//! The compiler front-end hands over a [`Schema`]: one ordered table per
//! declaration kind plus the `global_decls` list, which fixes the
//! deterministic traversal order used by ID assignment, reference
//! resolution and compilation. Components are `Arc`-shared and never
//! mutated after construction; IDs and resolved links live in side
//! tables (see [`crate::analysis`] and [`crate::resolver`]).

use crate::model::types::{DerivationSet, TypeDef};
use crate::model::wildcards::Wildcard;
use crate::model::{ModelGroup, SimpleType};
use crate::namespaces::{NamespaceContext, QName};
use indexmap::IndexMap;
use std::sync::Arc;

/// An element declaration, global or local.
#[derive(Debug)]
pub struct ElementDecl {
    /// Element QName
    pub name: QName,
    /// Declared type QName; zero when the type is inline or absent
    pub type_name: QName,
    /// Inline anonymous type, if the declaration nested one
    pub inline_type: Option<TypeDef>,
    /// `ref=` target for a local reference to a global element
    pub reference: Option<QName>,
    /// Substitution-group head, if the element is a member
    pub substitution_group: Option<QName>,
    /// `default=` value constraint
    pub default: Option<String>,
    /// `fixed=` value constraint
    pub fixed: Option<String>,
    /// Prefix bindings in scope at the declaration site; QName-typed
    /// defaults resolve against these
    pub context: NamespaceContext,
    /// Whether the element is nillable
    pub nillable: bool,
    /// Whether the element is abstract
    pub abstract_: bool,
    /// `block` derivation set
    pub block_set: DerivationSet,
}

impl ElementDecl {
    /// Create an element declaration with the given name and type
    /// reference; remaining fields take their defaults.
    pub fn new(name: QName, type_name: QName) -> Self {
        Self {
            name,
            type_name,
            inline_type: None,
            reference: None,
            substitution_group: None,
            default: None,
            fixed: None,
            context: NamespaceContext::new(),
            nillable: false,
            abstract_: false,
            block_set: DerivationSet::EMPTY,
        }
    }

    /// Whether this declaration is a `ref=` to a global element.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// An attribute declaration, global or local.
#[derive(Debug)]
pub struct AttributeDecl {
    /// Attribute QName
    pub name: QName,
    /// Declared simple type QName; zero when inline or absent
    /// (absent means xs:anySimpleType)
    pub type_name: QName,
    /// Inline anonymous simple type
    pub inline_type: Option<Arc<SimpleType>>,
    /// `ref=` target for a use referencing a global attribute
    pub reference: Option<QName>,
    /// `default=` value constraint
    pub default: Option<String>,
    /// `fixed=` value constraint
    pub fixed: Option<String>,
    /// Prefix bindings in scope at the declaration site
    pub context: NamespaceContext,
}

impl AttributeDecl {
    /// Create an attribute declaration with the given name and type
    /// reference.
    pub fn new(name: QName, type_name: QName) -> Self {
        Self {
            name,
            type_name,
            inline_type: None,
            reference: None,
            default: None,
            fixed: None,
            context: NamespaceContext::new(),
        }
    }

    /// Whether this declaration is a `ref=` to a global attribute.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// `use=` of an attribute use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Use {
    /// The attribute may appear
    #[default]
    Optional,
    /// The attribute must appear
    Required,
    /// The attribute must not appear; a prohibition removes an
    /// inherited use during restriction
    Prohibited,
}

/// An attribute declaration together with its `use=` at one site.
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// The declaration (shared when the use is a `ref=`)
    pub decl: Arc<AttributeDecl>,
    /// Occurrence requirement
    pub use_: Use,
    /// `default=` declared on the use itself, overriding the decl's
    pub default: Option<String>,
    /// `fixed=` declared on the use itself
    pub fixed: Option<String>,
}

impl AttributeUse {
    /// An optional use of `decl` with no use-site value constraints.
    pub fn optional(decl: Arc<AttributeDecl>) -> Self {
        Self {
            decl,
            use_: Use::Optional,
            default: None,
            fixed: None,
        }
    }

    /// The effective QName of this use: the referenced global's name
    /// when the decl is a `ref=`, else the decl's own name.
    pub fn effective_name(&self) -> &QName {
        self.decl.reference.as_ref().unwrap_or(&self.decl.name)
    }

    /// The effective default, use-site first.
    pub fn effective_default(&self) -> Option<&str> {
        self.default.as_deref().or(self.decl.default.as_deref())
    }

    /// The effective fixed value, use-site first.
    pub fn effective_fixed(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.decl.fixed.as_deref())
    }
}

/// A named model-group definition (`xs:group`).
#[derive(Debug)]
pub struct ModelGroupDef {
    /// Group QName
    pub name: QName,
    /// The defined group
    pub group: ModelGroup,
}

/// A named attribute-group definition (`xs:attributeGroup`).
#[derive(Debug)]
pub struct AttributeGroupDef {
    /// Attribute-group QName
    pub name: QName,
    /// Directly declared attribute uses, in declaration order
    pub attributes: Vec<AttributeUse>,
    /// Nested attribute-group references, in declaration order
    pub attribute_groups: Vec<QName>,
    /// Attribute wildcard, if the group declares one
    pub wildcard: Option<Wildcard>,
}

impl AttributeGroupDef {
    /// Create an empty attribute group.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            wildcard: None,
        }
    }
}

/// One entry of the deterministic global-declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalDecl {
    /// A global type definition
    Type(QName),
    /// A global element declaration
    Element(QName),
    /// A global attribute declaration
    Attribute(QName),
    /// A named model group
    Group(QName),
    /// A named attribute group
    AttributeGroup(QName),
}

impl GlobalDecl {
    /// The declared QName.
    pub fn name(&self) -> &QName {
        match self {
            Self::Type(q)
            | Self::Element(q)
            | Self::Attribute(q)
            | Self::Group(q)
            | Self::AttributeGroup(q) => q,
        }
    }
}

/// A parsed schema: per-kind declaration tables plus the ordered
/// `global_decls` list driving every deterministic traversal.
#[derive(Debug, Default)]
pub struct Schema {
    /// Target namespace; empty for no namespace
    pub target_namespace: String,
    /// Global type definitions
    pub types: IndexMap<QName, TypeDef>,
    /// Global element declarations
    pub elements: IndexMap<QName, Arc<ElementDecl>>,
    /// Global attribute declarations
    pub attributes: IndexMap<QName, Arc<AttributeDecl>>,
    /// Named model groups
    pub groups: IndexMap<QName, Arc<ModelGroupDef>>,
    /// Named attribute groups
    pub attribute_groups: IndexMap<QName, Arc<AttributeGroupDef>>,
    /// Declaration order; drives ID assignment, resolution and
    /// compilation
    pub global_decls: Vec<GlobalDecl>,
}

impl Schema {
    /// Create an empty schema with the given target namespace.
    pub fn new(target_namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            ..Default::default()
        }
    }

    /// Add a global type and record it in declaration order.
    pub fn add_type(&mut self, type_def: TypeDef) {
        let name = type_def.name();
        self.types.insert(name.clone(), type_def);
        self.global_decls.push(GlobalDecl::Type(name));
    }

    /// Add a global element and record it in declaration order.
    pub fn add_element(&mut self, decl: ElementDecl) {
        let name = decl.name.clone();
        self.elements.insert(name.clone(), Arc::new(decl));
        self.global_decls.push(GlobalDecl::Element(name));
    }

    /// Add a global attribute and record it in declaration order.
    pub fn add_attribute(&mut self, decl: AttributeDecl) {
        let name = decl.name.clone();
        self.attributes.insert(name.clone(), Arc::new(decl));
        self.global_decls.push(GlobalDecl::Attribute(name));
    }

    /// Add a named model group and record it in declaration order.
    pub fn add_group(&mut self, def: ModelGroupDef) {
        let name = def.name.clone();
        self.groups.insert(name.clone(), Arc::new(def));
        self.global_decls.push(GlobalDecl::Group(name));
    }

    /// Add a named attribute group and record it in declaration order.
    pub fn add_attribute_group(&mut self, def: AttributeGroupDef) {
        let name = def.name.clone();
        self.attribute_groups.insert(name.clone(), Arc::new(def));
        self.global_decls.push(GlobalDecl::AttributeGroup(name));
    }

    /// Look up a global type by QName.
    pub fn type_def(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Look up a global simple type by QName; `None` for complex or
    /// absent types.
    pub fn simple_type(&self, name: &QName) -> Option<Arc<SimpleType>> {
        match self.types.get(name) {
            Some(TypeDef::Simple(st)) => Some(st.clone()),
            Some(TypeDef::Builtin(b)) => Some(b.simple_type()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{SimpleDerivation, SimpleType};

    fn named_simple(ns: &str, local: &str) -> TypeDef {
        TypeDef::Simple(Arc::new(SimpleType::new(
            QName::new(ns, local),
            SimpleDerivation::Restriction {
                base: QName::xsd("string"),
                inline_base: None,
                facets: vec![],
            },
        )))
    }

    #[test]
    fn test_global_decl_order_preserved() {
        let mut schema = Schema::new("urn:test");
        schema.add_type(named_simple("urn:test", "b"));
        schema.add_element(ElementDecl::new(
            QName::new("urn:test", "a"),
            QName::new("urn:test", "b"),
        ));
        schema.add_type(named_simple("urn:test", "c"));

        let names: Vec<_> = schema
            .global_decls
            .iter()
            .map(|d| d.name().local.clone())
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_simple_type_lookup_covers_builtins_in_table() {
        let mut schema = Schema::new("urn:test");
        schema.add_type(named_simple("urn:test", "code"));

        assert!(schema.simple_type(&QName::new("urn:test", "code")).is_some());
        assert!(schema.simple_type(&QName::new("urn:test", "missing")).is_none());
    }

    #[test]
    fn test_attribute_use_effective_values() {
        let mut decl = AttributeDecl::new(QName::local("lang"), QName::xsd("language"));
        decl.default = Some("en".to_string());
        let decl = Arc::new(decl);

        let plain = AttributeUse::optional(decl.clone());
        assert_eq!(plain.effective_default(), Some("en"));

        let overridden = AttributeUse {
            decl,
            use_: Use::Optional,
            default: Some("fr".to_string()),
            fixed: None,
        };
        assert_eq!(overridden.effective_default(), Some("fr"));
    }

    #[test]
    fn test_attribute_use_effective_name_follows_ref() {
        let mut decl = AttributeDecl::new(QName::zero(), QName::zero());
        decl.reference = Some(QName::new("urn:test", "id"));
        let use_ = AttributeUse::optional(Arc::new(decl));
        assert_eq!(use_.effective_name(), &QName::new("urn:test", "id"));
    }
}
