//! Error types for the schema compiler
//!
//! All schema-level problems are reported by value through the [`Error`]
//! enum; the compiler never panics on malformed component graphs. Each
//! pipeline phase is fail-fast: the first error aborts the phase and is
//! returned to the caller.

use crate::namespaces::QName;
use thiserror::Error;

/// Result type alias using the compiler [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of component a reference points at, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Element declaration
    Element,
    /// Attribute declaration
    Attribute,
    /// Simple or complex type definition
    Type,
    /// Model group definition
    Group,
    /// Attribute group definition
    AttributeGroup,
    /// Substitution group head
    SubstitutionGroup,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element => write!(f, "element"),
            Self::Attribute => write!(f, "attribute"),
            Self::Type => write!(f, "type"),
            Self::Group => write!(f, "group"),
            Self::AttributeGroup => write!(f, "attributeGroup"),
            Self::SubstitutionGroup => write!(f, "substitutionGroup"),
        }
    }
}

/// Main error type for schema compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // -- Structural -----------------------------------------------------

    /// The input schema value is missing a declaration listed in
    /// `GlobalDecls`.
    #[error("missing global declaration: {kind} {name}")]
    MissingGlobalDecl {
        /// Declaration kind
        kind: ComponentKind,
        /// Declared name
        name: QName,
    },

    /// Internal ID assignment produced an inconsistent registry.
    #[error("invalid ID assignment: {0}")]
    InvalidIdAssignment(String),

    // -- Reference ------------------------------------------------------

    /// A QName reference has no referent in the schema tables.
    #[error("dangling {kind} reference: {name}")]
    DanglingRef {
        /// Referenced component kind
        kind: ComponentKind,
        /// Referenced name
        name: QName,
    },

    // -- Cycle ----------------------------------------------------------

    /// Circular type derivation, closing at the named type.
    #[error("circular type derivation at {0}")]
    TypeCycle(QName),

    /// Circular model group reference, closing at the named group.
    #[error("circular group reference at {0}")]
    GroupCycle(QName),

    /// Circular attribute group reference, closing at the named group.
    #[error("circular attributeGroup reference at {0}")]
    AttributeGroupCycle(QName),

    /// Circular substitution group, closing at the named element.
    #[error("circular substitution group at {0}")]
    SubstitutionGroupCycle(QName),

    // -- Derivation -----------------------------------------------------

    /// A facet is not applicable to the base type being restricted.
    #[error("facet {facet} not applicable to type {base}")]
    FacetNotApplicable {
        /// Facet name as written in the schema
        facet: &'static str,
        /// Base type name
        base: QName,
    },

    /// A restriction introduces an attribute wildcard absent from its base.
    #[error("restriction of {0} adds an attribute wildcard")]
    RestrictionAddsWildcard(QName),

    /// A restricted wildcard is not a subset of the base wildcard.
    #[error("wildcard restriction of {0} not expressible: derived set is not a subset of the base")]
    RestrictionNotExpressible(QName),

    /// A restricted wildcard denotes the empty namespace set.
    #[error("wildcard restriction of {0} is empty")]
    RestrictionEmpty(QName),

    /// A restricted wildcard weakens the base's process-contents mode.
    #[error("wildcard restriction of {0} is weaker than its base")]
    RestrictionWeakerThanBase(QName),

    /// Intersection of attribute wildcards has no XSD 1.0 expression.
    #[error("attribute wildcard intersection not expressible for {0}")]
    IntersectionNotExpressible(QName),

    /// Intersection of attribute wildcards is the empty set.
    #[error("attribute wildcard intersection empty for {0}")]
    IntersectionEmpty(QName),

    /// Union of attribute wildcards has no XSD 1.0 expression.
    #[error("attribute wildcard union not expressible for {0}")]
    UnionNotExpressible(QName),

    /// A whiteSpace facet loosens the inherited mode.
    #[error("whiteSpace facet on {0} is weaker than its base")]
    WhiteSpaceWeakened(QName),

    // -- Facet parse ----------------------------------------------------

    /// XSD pattern with invalid syntax.
    #[error("pattern syntax error in '{pattern}': {reason}")]
    PatternSyntax {
        /// Pattern source text
        pattern: String,
        /// What went wrong
        reason: String,
    },

    /// XSD pattern that is valid but not supported by the target engine.
    #[error("unsupported pattern construct in '{pattern}': {reason}")]
    PatternUnsupported {
        /// Pattern source text
        pattern: String,
        /// Offending construct
        reason: String,
    },

    /// Lexical value is not valid for the primitive kind it is typed as.
    #[error("invalid {kind} value: '{value}'")]
    InvalidValue {
        /// Primitive kind name
        kind: &'static str,
        /// Offending lexical form
        value: String,
    },

    /// Integer value outside the range of its derived integer kind.
    #[error("integer value '{value}' out of range for {kind}")]
    IntegerOutOfRange {
        /// Derived integer kind name
        kind: &'static str,
        /// Offending lexical form
        value: String,
    },

    /// A facet value itself does not parse (e.g. non-numeric length).
    #[error("invalid value '{value}' for facet {facet}")]
    InvalidFacetValue {
        /// Facet name
        facet: &'static str,
        /// Offending lexical form
        value: String,
    },

    // -- Value ----------------------------------------------------------

    /// An enumeration value fails the facet program of its own type.
    #[error("enumeration value '{value}' violates the facets of {type_name}")]
    EnumViolatesFacets {
        /// Offending lexical form
        value: String,
        /// Type the enumeration belongs to
        type_name: QName,
    },

    /// A default or fixed value fails its own type's facet program.
    #[error("default/fixed value '{value}' is not valid for {type_name}")]
    DefaultValueInvalid {
        /// Offending lexical form
        value: String,
        /// Declaring component's type
        type_name: QName,
    },

    /// No member of a union accepts a lexical value.
    #[error("value '{value}' matches no member of union {type_name}")]
    NoUnionMemberMatches {
        /// Offending lexical form
        value: String,
        /// Union type name
        type_name: QName,
    },

    // -- Namespace ------------------------------------------------------

    /// A QName-valued lexical form uses an undeclared prefix.
    #[error("undeclared namespace prefix '{0}'")]
    UndeclaredPrefix(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_ref_display() {
        let err = Error::DanglingRef {
            kind: ComponentKind::AttributeGroup,
            name: QName::new("urn:ex", "AG"),
        };
        assert_eq!(
            err.to_string(),
            "dangling attributeGroup reference: {urn:ex}AG"
        );
    }

    #[test]
    fn test_cycle_error_is_deterministic() {
        let a = Error::TypeCycle(QName::new("urn:ex", "T"));
        let b = Error::TypeCycle(QName::new("urn:ex", "T"));
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_facet_error_display() {
        let err = Error::FacetNotApplicable {
            facet: "minInclusive",
            base: QName::new("http://www.w3.org/2001/XMLSchema", "string"),
        };
        assert!(err.to_string().contains("minInclusive"));
        assert!(err.to_string().contains("string"));
    }
}
