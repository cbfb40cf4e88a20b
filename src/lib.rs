//! # xsdc
//!
//! An XSD 1.0 schema compiler: takes a parsed schema component graph
//! and produces a compact, immutable validator bundle for streaming
//! validation.
//!
//! The pipeline has three entry points, invoked in order:
//!
//! 1. [`assign_ids`] — dense u32 IDs for every type, element and
//!    attribute, plus derivation-ancestor caches and cycle detection;
//! 2. [`resolve_references`] — QName-to-ID maps for every `ref=`,
//!    `type=`, group and substitution-group reference;
//! 3. [`compile`] — one validator per distinct simple type, flat facet
//!    instruction programs, canonical value-space keys for every
//!    enumeration, default and fixed value, and per-complex-type
//!    validation plans, all packed into a [`CompiledSchema`].
//!
//! The parser that builds the [`Schema`] component graph and the
//! runtime that executes the bundle live outside this crate; the bundle
//! holds indices, never pointers, so it is safe to share across
//! concurrent validation sessions without synchronization.
//!
//! ## Example
//!
//! ```rust
//! use xsdc::model::{Facet, SimpleDerivation, SimpleType, TypeDef};
//! use xsdc::{assign_ids, compile, QName, Schema};
//! use std::sync::Arc;
//!
//! let mut schema = Schema::new("urn:example");
//! schema.add_type(TypeDef::Simple(Arc::new(SimpleType::new(
//!     QName::new("urn:example", "short-name"),
//!     SimpleDerivation::Restriction {
//!         base: QName::xsd("token"),
//!         inline_base: None,
//!         facets: vec![Facet::MaxLength(8)],
//!     },
//! ))));
//!
//! let registry = assign_ids(&schema)?;
//! let compiled = compile(&schema, &registry)?;
//! let vid = compiled.validator_for_type(registry.type_id(&QName::new("urn:example", "short-name")));
//! assert_ne!(vid, 0);
//! # Ok::<(), xsdc::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod attribute_uses;
pub mod compiler;
pub mod error;
pub mod model;
pub mod namespaces;
pub mod pattern;
pub mod resolver;

pub use analysis::{assign_ids, AttrId, ElemId, Registry, TypeId};
pub use attribute_uses::{collect_attribute_uses, AttributeUseAssembler};
pub use compiler::{compile, CompiledSchema, ValidatorId};
pub use error::{Error, Result};
pub use model::Schema;
pub use namespaces::{NamespaceContext, QName};
pub use resolver::{resolve_references, ResolvedReferences};
