//! XSD type definitions
//!
//! The type hierarchy is a tagged variant: built-in (registry-owned),
//! user simple type, user complex type. Simple types cache a few
//! chain-derived properties (primitive link, fundamental facets,
//! QName-or-NOTATION flag) behind one-shot [`PropertyCache`] cells so
//! concurrent compilations share a single base-chain walk.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Type_Definition_Hierarchy

use crate::model::builtins::{self, BuiltinType, Cardinality, FundamentalFacets, Ordered, PrimitiveKind};
use crate::model::cache::PropertyCache;
use crate::model::facets::{Facet, RangeOp, WhiteSpace};
use crate::model::particles::Particle;
use crate::model::schema::AttributeUse;
use crate::model::wildcards::Wildcard;
use crate::namespaces::QName;
use std::sync::Arc;

// =============================================================================
// Derivation sets
// =============================================================================

/// A set drawn from {restriction, extension, list, union}. Used for
/// `final` and `block` attributes and as the cumulative derivation mask
/// along an ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationSet(u8);

impl DerivationSet {
    /// The empty set
    pub const EMPTY: Self = Self(0);
    /// Derivation by restriction
    pub const RESTRICTION: Self = Self(1);
    /// Derivation by extension
    pub const EXTENSION: Self = Self(2);
    /// Derivation by list
    pub const LIST: Self = Self(4);
    /// Derivation by union
    pub const UNION: Self = Self(8);
    /// `#all`
    pub const ALL: Self = Self(15);

    /// Whether every member of `other` is in this set.
    pub fn contains(&self, other: DerivationSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set union.
    pub fn union(&self, other: DerivationSet) -> DerivationSet {
        DerivationSet(self.0 | other.0)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Method of a single derivation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Derivation by restriction
    Restriction,
    /// Derivation by extension
    Extension,
}

impl DerivationMethod {
    /// The corresponding singleton [`DerivationSet`].
    pub fn as_set(&self) -> DerivationSet {
        match self {
            Self::Restriction => DerivationSet::RESTRICTION,
            Self::Extension => DerivationSet::EXTENSION,
        }
    }
}

// =============================================================================
// Simple types
// =============================================================================

/// Variety of a simple type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variety {
    /// Atomic value space
    Atomic,
    /// Whitespace-separated list
    List,
    /// Union of member types
    Union,
}

/// How a simple type is derived from its base.
#[derive(Debug, Clone)]
pub enum SimpleDerivation {
    /// Restriction of a base type by facets
    Restriction {
        /// Base type QName (zero when the base is inline)
        base: QName,
        /// Inline anonymous base, if the schema nested one
        inline_base: Option<Arc<SimpleType>>,
        /// Constraining facets declared at this step
        facets: Vec<Facet>,
    },
    /// List with an item type
    List {
        /// Item type QName (zero when inline)
        item: QName,
        /// Inline anonymous item type
        inline_item: Option<Arc<SimpleType>>,
    },
    /// Union of member types
    Union {
        /// Member QNames in declaration order
        members: Vec<QName>,
        /// Inline anonymous members, appended after the named ones
        inline_members: Vec<Arc<SimpleType>>,
    },
}

/// Resolves a QName to a simple type during chain walks. Callers hand
/// in the schema's lookup; built-ins are handled internally.
pub type SimpleTypeLookup<'a> = &'a dyn Fn(&QName) -> Option<Arc<SimpleType>>;

/// A user-defined simple type (or a built-in's façade).
#[derive(Debug)]
pub struct SimpleType {
    /// Type QName; zero for anonymous types
    pub name: QName,
    /// Set when this instance is a built-in's façade
    pub builtin: Option<&'static BuiltinType>,
    /// Explicitly declared whiteSpace facet, if any
    pub white_space: Option<WhiteSpace>,
    /// The derivation defining this type
    pub derivation: SimpleDerivation,
    /// `final` derivation set
    pub final_set: DerivationSet,
    primitive_cache: PropertyCache<Option<&'static BuiltinType>>,
    fundamental_cache: PropertyCache<FundamentalFacets>,
    qname_cache: PropertyCache<bool>,
}

impl SimpleType {
    /// Create a user-defined simple type.
    pub fn new(name: QName, derivation: SimpleDerivation) -> Self {
        Self {
            name,
            builtin: None,
            white_space: None,
            derivation,
            final_set: DerivationSet::EMPTY,
            primitive_cache: PropertyCache::new(),
            fundamental_cache: PropertyCache::new(),
            qname_cache: PropertyCache::new(),
        }
    }

    /// The façade published by a built-in registry entry.
    pub(crate) fn builtin_facade(builtin: &'static BuiltinType) -> Self {
        let derivation = if let Some(item) = builtin.item_type {
            SimpleDerivation::List {
                item: QName::xsd(item),
                inline_item: None,
            }
        } else {
            SimpleDerivation::Restriction {
                base: builtin
                    .base
                    .map(QName::xsd)
                    .unwrap_or_else(QName::zero),
                inline_base: None,
                facets: Vec::new(),
            }
        };
        Self {
            name: builtin.qname(),
            builtin: Some(builtin),
            white_space: Some(builtin.white_space),
            derivation,
            final_set: DerivationSet::EMPTY,
            primitive_cache: PropertyCache::new(),
            fundamental_cache: PropertyCache::new(),
            qname_cache: PropertyCache::new(),
        }
    }

    /// Whether the type has no name.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_zero()
    }

    /// Facets declared at this derivation step (empty for lists and
    /// unions, which admit none directly).
    pub fn step_facets(&self) -> &[Facet] {
        match &self.derivation {
            SimpleDerivation::Restriction { facets, .. } => facets,
            _ => &[],
        }
    }

    fn base_type(&self, lookup: SimpleTypeLookup<'_>) -> Option<Arc<SimpleType>> {
        match &self.derivation {
            SimpleDerivation::Restriction {
                base, inline_base, ..
            } => inline_base.clone().or_else(|| resolve(base, lookup)),
            _ => None,
        }
    }

    /// Variety per XSD 1.0: list if a list definition is present, union
    /// if a union definition is present, otherwise atomic. List-ness
    /// flows through restriction of a list base.
    pub fn variety(&self, lookup: SimpleTypeLookup<'_>) -> Variety {
        if let Some(builtin) = self.builtin {
            return if builtin.is_list() {
                Variety::List
            } else {
                Variety::Atomic
            };
        }
        match &self.derivation {
            SimpleDerivation::List { .. } => Variety::List,
            SimpleDerivation::Union { .. } => Variety::Union,
            SimpleDerivation::Restriction { .. } => self
                .base_type(lookup)
                .map(|base| base.variety(lookup))
                .unwrap_or(Variety::Atomic),
        }
    }

    /// The primitive built-in this type derives from, walking the base
    /// chain once and caching the link. `None` for lists and unions.
    pub fn primitive(&self, lookup: SimpleTypeLookup<'_>) -> Option<&'static BuiltinType> {
        self.primitive_cache.get_or_init(|| {
            if let Some(builtin) = self.builtin {
                if builtin.is_list() {
                    return None;
                }
                return builtins::get(builtin.primitive);
            }
            match &self.derivation {
                SimpleDerivation::Restriction { .. } => self
                    .base_type(lookup)
                    .and_then(|base| base.primitive(lookup)),
                SimpleDerivation::List { .. } | SimpleDerivation::Union { .. } => None,
            }
        })
    }

    /// Fundamental facets, derived on first use. Atomic restrictions
    /// inherit from the primitive, tightening `bounded` when both ends
    /// of the value space are constrained at this step or below.
    pub fn fundamental_facets(&self, lookup: SimpleTypeLookup<'_>) -> FundamentalFacets {
        self.fundamental_cache.get_or_init(|| {
            if let Some(builtin) = self.builtin {
                return builtin.fundamental;
            }
            match &self.derivation {
                SimpleDerivation::Restriction { facets, .. } => {
                    let mut inherited = self
                        .base_type(lookup)
                        .map(|base| base.fundamental_facets(lookup))
                        .unwrap_or(UNORDERED_FACETS);
                    let mut lower = false;
                    let mut upper = false;
                    for facet in facets {
                        if let Facet::Range(range) = facet {
                            match range.op {
                                RangeOp::MinInclusive | RangeOp::MinExclusive => lower = true,
                                RangeOp::MaxInclusive | RangeOp::MaxExclusive => upper = true,
                            }
                        }
                    }
                    if lower && upper {
                        inherited.bounded = true;
                    }
                    inherited
                }
                SimpleDerivation::List { .. } | SimpleDerivation::Union { .. } => UNORDERED_FACETS,
            }
        })
    }

    /// Whether values of this type are QNames or NOTATIONs, which makes
    /// length facets inapplicable and canonical keys context-dependent.
    pub fn is_qname_or_notation(&self, lookup: SimpleTypeLookup<'_>) -> bool {
        self.qname_cache.get_or_init(|| {
            matches!(
                self.primitive(lookup).map(|p| p.kind),
                Some(PrimitiveKind::QName | PrimitiveKind::Notation)
            )
        })
    }

    /// Effective whitespace mode: the nearest explicit declaration up
    /// the chain; lists and unions always collapse.
    pub fn effective_white_space(&self, lookup: SimpleTypeLookup<'_>) -> WhiteSpace {
        if let Some(ws) = self.white_space {
            return ws;
        }
        match self.variety(lookup) {
            Variety::List | Variety::Union => WhiteSpace::Collapse,
            Variety::Atomic => self
                .base_type(lookup)
                .map(|base| base.effective_white_space(lookup))
                .unwrap_or(WhiteSpace::Preserve),
        }
    }
}

const UNORDERED_FACETS: FundamentalFacets = FundamentalFacets {
    ordered: Ordered::None,
    bounded: false,
    cardinality: Cardinality::CountablyInfinite,
    numeric: false,
};

fn resolve(name: &QName, lookup: SimpleTypeLookup<'_>) -> Option<Arc<SimpleType>> {
    if name.is_zero() {
        return None;
    }
    if let Some(builtin) = builtins::get_ns(&name.namespace, &name.local) {
        return Some(builtin.simple_type());
    }
    lookup(name)
}

// =============================================================================
// Complex types
// =============================================================================

/// Content model of a complex type.
#[derive(Debug, Clone)]
pub enum ContentType {
    /// No character or element content
    Empty,
    /// `<simpleContent>`: character content of a simple type
    Simple {
        /// Simple base QName (zero when inline)
        base: QName,
        /// Inline anonymous simple type
        inline: Option<Arc<SimpleType>>,
    },
    /// Element-only content
    ElementOnly(Particle),
    /// Mixed content
    Mixed(Particle),
}

/// A user-defined complex type.
#[derive(Debug)]
pub struct ComplexType {
    /// Type QName; zero for anonymous types
    pub name: QName,
    /// Base type QName; defaults to xs:anyType when the schema gave
    /// no explicit derivation
    pub base: QName,
    /// Derivation method of the step from `base`
    pub derivation: DerivationMethod,
    /// Content model
    pub content: ContentType,
    /// Locally declared attribute uses, in declaration order
    pub attributes: Vec<AttributeUse>,
    /// Referenced named attribute groups, in declaration order
    pub attribute_groups: Vec<QName>,
    /// Complete attribute wildcard, if any
    pub wildcard: Option<Wildcard>,
    /// `final` derivation set
    pub final_set: DerivationSet,
    /// `block` derivation set
    pub block_set: DerivationSet,
    /// Whether the type is abstract
    pub abstract_: bool,
}

impl ComplexType {
    /// Create a complex type deriving from xs:anyType by restriction
    /// with empty content. Callers fill the remaining fields.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            base: QName::xsd("anyType"),
            derivation: DerivationMethod::Restriction,
            content: ContentType::Empty,
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            wildcard: None,
            final_set: DerivationSet::EMPTY,
            block_set: DerivationSet::EMPTY,
            abstract_: false,
        }
    }

    /// Whether the type has no name.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_zero()
    }

    /// Whether the content model is mixed.
    pub fn is_mixed(&self) -> bool {
        matches!(self.content, ContentType::Mixed(_))
    }

    /// Whether the content model is `<simpleContent>`.
    pub fn has_simple_content(&self) -> bool {
        matches!(self.content, ContentType::Simple { .. })
    }

    /// Whether this type's base is the ur-type, i.e. the chain stops
    /// here.
    pub fn derives_from_any_type(&self) -> bool {
        self.base.namespace == crate::namespaces::XSD_NAMESPACE && self.base.local == "anyType"
    }
}

// =============================================================================
// Tagged type variant
// =============================================================================

/// A type definition: built-in, simple, or complex.
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// One of the 46 built-ins
    Builtin(&'static BuiltinType),
    /// A user-defined simple type
    Simple(Arc<SimpleType>),
    /// A user-defined complex type
    Complex(Arc<ComplexType>),
}

impl TypeDef {
    /// The type's QName (zero for anonymous types).
    pub fn name(&self) -> QName {
        match self {
            Self::Builtin(b) => b.qname(),
            Self::Simple(s) => s.name.clone(),
            Self::Complex(c) => c.name.clone(),
        }
    }

    /// Whether the definition has simple (character-only) content.
    pub fn is_simple(&self) -> bool {
        match self {
            Self::Builtin(_) | Self::Simple(_) => true,
            Self::Complex(c) => c.has_simple_content(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facets::RangeFacet;

    fn no_user_types(_: &QName) -> Option<Arc<SimpleType>> {
        None
    }

    fn restriction_of(base: QName, facets: Vec<Facet>) -> SimpleType {
        SimpleType::new(
            QName::new("urn:test", "t"),
            SimpleDerivation::Restriction {
                base,
                inline_base: None,
                facets,
            },
        )
    }

    #[test]
    fn test_derivation_set_ops() {
        let set = DerivationSet::RESTRICTION.union(DerivationSet::LIST);
        assert!(set.contains(DerivationSet::RESTRICTION));
        assert!(set.contains(DerivationSet::LIST));
        assert!(!set.contains(DerivationSet::EXTENSION));
        assert!(DerivationSet::ALL.contains(set));
        assert!(DerivationSet::EMPTY.is_empty());
        assert!(set.contains(DerivationSet::EMPTY));
    }

    #[test]
    fn test_variety_atomic_restriction() {
        let ty = restriction_of(QName::xsd("token"), vec![]);
        assert_eq!(ty.variety(&no_user_types), Variety::Atomic);
    }

    #[test]
    fn test_variety_list_flows_through_restriction() {
        let list = Arc::new(SimpleType::new(
            QName::new("urn:test", "codes"),
            SimpleDerivation::List {
                item: QName::xsd("NCName"),
                inline_item: None,
            },
        ));
        let restricted = SimpleType::new(
            QName::new("urn:test", "short-codes"),
            SimpleDerivation::Restriction {
                base: QName::new("urn:test", "codes"),
                inline_base: Some(list),
                facets: vec![Facet::MaxLength(3)],
            },
        );
        assert_eq!(restricted.variety(&no_user_types), Variety::List);
    }

    #[test]
    fn test_primitive_link_walks_chain() {
        let ty = restriction_of(QName::xsd("unsignedByte"), vec![]);
        let primitive = ty.primitive(&no_user_types).unwrap();
        assert_eq!(primitive.name, "decimal");
        // Cached: the second call returns the identical pointer.
        assert!(std::ptr::eq(primitive, ty.primitive(&no_user_types).unwrap()));
    }

    #[test]
    fn test_primitive_link_via_user_base() {
        let mid = Arc::new(restriction_of(QName::xsd("int"), vec![]));
        let mid_name = QName::new("urn:test", "t");
        let lookup = move |q: &QName| (q == &mid_name).then(|| mid.clone());
        let leaf = restriction_of(QName::new("urn:test", "t"), vec![]);
        assert_eq!(leaf.primitive(&lookup).unwrap().name, "decimal");
    }

    #[test]
    fn test_fundamental_facets_bounded_tightening() {
        let ty = restriction_of(
            QName::xsd("integer"),
            vec![
                Facet::Range(RangeFacet::new(RangeOp::MinInclusive, "0")),
                Facet::Range(RangeFacet::new(RangeOp::MaxExclusive, "100")),
            ],
        );
        let facets = ty.fundamental_facets(&no_user_types);
        assert_eq!(facets.ordered, Ordered::Total);
        assert!(facets.numeric);
        assert!(facets.bounded);

        let open = restriction_of(
            QName::xsd("integer"),
            vec![Facet::Range(RangeFacet::new(RangeOp::MinInclusive, "0"))],
        );
        assert!(!open.fundamental_facets(&no_user_types).bounded);
    }

    #[test]
    fn test_qname_or_notation_flag() {
        assert!(restriction_of(QName::xsd("QName"), vec![])
            .is_qname_or_notation(&no_user_types));
        assert!(restriction_of(QName::xsd("NOTATION"), vec![])
            .is_qname_or_notation(&no_user_types));
        assert!(!restriction_of(QName::xsd("string"), vec![])
            .is_qname_or_notation(&no_user_types));
    }

    #[test]
    fn test_effective_white_space() {
        // token collapses; a restriction without an explicit facet
        // inherits that.
        let ty = restriction_of(QName::xsd("token"), vec![]);
        assert_eq!(
            ty.effective_white_space(&no_user_types),
            WhiteSpace::Collapse
        );

        let mut explicit = restriction_of(QName::xsd("string"), vec![]);
        explicit.white_space = Some(WhiteSpace::Replace);
        assert_eq!(
            explicit.effective_white_space(&no_user_types),
            WhiteSpace::Replace
        );

        let list = SimpleType::new(
            QName::zero(),
            SimpleDerivation::List {
                item: QName::xsd("string"),
                inline_item: None,
            },
        );
        assert_eq!(
            list.effective_white_space(&no_user_types),
            WhiteSpace::Collapse
        );
    }

    #[test]
    fn test_builtin_facade_properties() {
        let facade = builtins::get("token").unwrap().simple_type();
        assert_eq!(facade.variety(&no_user_types), Variety::Atomic);
        assert_eq!(facade.primitive(&no_user_types).unwrap().name, "string");

        let list_facade = builtins::get("IDREFS").unwrap().simple_type();
        assert_eq!(list_facade.variety(&no_user_types), Variety::List);
        assert!(list_facade.primitive(&no_user_types).is_none());
    }

    #[test]
    fn test_complex_type_defaults() {
        let ct = ComplexType::new(QName::new("urn:test", "ct"));
        assert!(ct.derives_from_any_type());
        assert!(!ct.is_mixed());
        assert!(!ct.has_simple_content());
        assert!(matches!(ct.content, ContentType::Empty));
    }
}
