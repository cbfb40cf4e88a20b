//! Schema component model
//!
//! The in-memory representation of a parsed schema: types, particles,
//! facets, wildcards and declarations, plus the built-in type registry.
//! Components are immutable after parsing; everything the compiler
//! derives from them lives in side tables or one-shot caches.

pub mod builtins;
pub mod cache;
pub mod facets;
pub mod particles;
pub mod schema;
pub mod types;
pub mod wildcards;

pub use builtins::{BuiltinType, Cardinality, FundamentalFacets, Ordered, PrimitiveKind};
pub use cache::PropertyCache;
pub use facets::{EnumerationFacet, Facet, RangeFacet, RangeOp, WhiteSpace};
pub use particles::{Compositor, ModelGroup, Occurs, Particle, Term};
pub use schema::{
    AttributeDecl, AttributeGroupDef, AttributeUse, ElementDecl, GlobalDecl, ModelGroupDef, Schema,
    Use,
};
pub use types::{
    ComplexType, ContentType, DerivationMethod, DerivationSet, SimpleDerivation, SimpleType,
    SimpleTypeLookup, TypeDef, Variety,
};
pub use wildcards::{AnyElement, Intersection, NsConstraint, ProcessContents, RestrictionCheck, Wildcard};
