//! Validator metadata and facet programs
//!
//! One validator is compiled per distinct type. The metadata carries
//! everything the runtime needs to validate a lexical value without
//! touching the component graph: the atomic/list/union kind, the
//! whitespace mode, the string-kind and integer-kind refinements, and a
//! `{off, len}` range into the flat facet instruction table.
//!
//! Facet collection walks the derivation chain base-to-leaf, appending
//! each step's facets in order. Patterns declared at one step coalesce
//! into a pattern set (OR); patterns of different steps stay separate
//! instructions (AND). Applicability is checked against the base type's
//! fundamental facets before anything is emitted.

use crate::error::{Error, Result};
use crate::model::{
    builtins, Facet, FundamentalFacets, PrimitiveKind, SimpleDerivation, SimpleType,
    SimpleTypeLookup, Variety, WhiteSpace,
};
use crate::namespaces::QName;
use std::sync::Arc;

use super::bundle::ValueRef;

/// Dense validator ID; 0 means "no validator".
pub type ValidatorId = u32;
/// Index into the compiled pattern table.
pub type PatternId = u32;
/// Index into the enum table.
pub type EnumId = u32;

/// Shape of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// Single atomic value
    Atomic,
    /// Whitespace-separated list of items
    List,
    /// First-match union of members
    Union,
}

/// Refinement of string-primitive validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Plain xs:string
    Any,
    /// xs:normalizedString
    Normalized,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName
    NcName,
    /// xs:ID
    Id,
    /// xs:IDREF
    Idref,
    /// xs:ENTITY
    Entity,
    /// xs:NMTOKEN
    NmToken,
}

impl StringKind {
    /// The refinement for a built-in local name; `Any` for names
    /// outside the string family.
    pub fn for_builtin(local: &str) -> Self {
        match local {
            "normalizedString" => Self::Normalized,
            "token" => Self::Token,
            "language" => Self::Language,
            "Name" => Self::Name,
            "NCName" => Self::NcName,
            "ID" => Self::Id,
            "IDREF" => Self::Idref,
            "ENTITY" => Self::Entity,
            "NMTOKEN" => Self::NmToken,
            _ => Self::Any,
        }
    }

    fn builtin_name(&self) -> &'static str {
        match self {
            Self::Any => "string",
            Self::Normalized => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NcName => "NCName",
            Self::Id => "ID",
            Self::Idref => "IDREF",
            Self::Entity => "ENTITY",
            Self::NmToken => "NMTOKEN",
        }
    }

    /// Validate a whitespace-normalized lexical against this kind.
    pub fn check(&self, lexical: &str) -> Result<()> {
        builtins::get(self.builtin_name())
            .expect("string builtin is registered")
            .validate_bytes(lexical.as_bytes())
    }
}

/// Range policy refinement of integer validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    /// Unbounded xs:integer
    Any,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:nonNegativeInteger
    NonNegative,
    /// xs:nonPositiveInteger
    NonPositive,
    /// xs:positiveInteger
    Positive,
    /// xs:negativeInteger
    Negative,
}

impl IntegerKind {
    /// The refinement for a built-in local name; `Any` for names
    /// outside the bounded-integer family.
    pub fn for_builtin(local: &str) -> Self {
        match local {
            "long" => Self::Long,
            "int" => Self::Int,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "unsignedLong" => Self::UnsignedLong,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedByte" => Self::UnsignedByte,
            "nonNegativeInteger" => Self::NonNegative,
            "nonPositiveInteger" => Self::NonPositive,
            "positiveInteger" => Self::Positive,
            "negativeInteger" => Self::Negative,
            _ => Self::Any,
        }
    }

    fn builtin_name(&self) -> &'static str {
        match self {
            Self::Any => "integer",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::NonNegative => "nonNegativeInteger",
            Self::NonPositive => "nonPositiveInteger",
            Self::Positive => "positiveInteger",
            Self::Negative => "negativeInteger",
        }
    }

    /// Validate a whitespace-normalized lexical against this range
    /// policy.
    pub fn check(&self, lexical: &str) -> Result<()> {
        builtins::get(self.builtin_name())
            .expect("integer builtin is registered")
            .validate_bytes(lexical.as_bytes())
    }
}

/// `{off, len}` range into the facet instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FacetProgramRef {
    /// First instruction
    pub off: u32,
    /// Instruction count
    pub len: u32,
}

impl FacetProgramRef {
    /// Whether the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One facet instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetOp {
    /// Exact length in characters, octets or items
    Length(u32),
    /// Minimum length
    MinLength(u32),
    /// Maximum length
    MaxLength(u32),
    /// Maximum significant decimal digits
    TotalDigits(u32),
    /// Maximum fraction digits
    FractionDigits(u32),
    /// Match one pattern
    Pattern(PatternId),
    /// Match at least one pattern of a contiguous pattern-table range
    PatternSet {
        /// First pattern
        off: u32,
        /// Pattern count
        len: u32,
    },
    /// Membership in an enum-table entry
    Enum(EnumId),
    /// Compare against an interned bound
    Range {
        /// Which of the four range facets
        op: crate::model::RangeOp,
        /// Canonical key bytes of the bound
        bound: ValueRef,
    },
}

/// Compiled validator metadata.
#[derive(Debug, Clone)]
pub struct Validator {
    /// Atomic, list or union
    pub kind: ValidatorKind,
    /// Primitive kind for atomic validators
    pub primitive: Option<PrimitiveKind>,
    /// Whitespace mode applied before everything else
    pub white_space: WhiteSpace,
    /// String-family refinement
    pub string_kind: StringKind,
    /// Integer-range refinement
    pub integer_kind: IntegerKind,
    /// Facet program of this validator
    pub facets: FacetProgramRef,
    /// Item validator for lists; 0 otherwise
    pub item: ValidatorId,
    /// Member validators for unions, in declared order
    pub members: Vec<ValidatorId>,
}

// =============================================================================
// Facet applicability
// =============================================================================

/// What to do with a collected facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Emit an instruction
    Emit,
    /// Legal but meaningless here; drop it
    Skip,
}

/// Check one facet against the restricted type's shape. `base_name` is
/// only used in the error.
pub fn check_applicability(
    facet: &Facet,
    variety: Variety,
    primitive: Option<PrimitiveKind>,
    fundamental: &FundamentalFacets,
    base_name: &QName,
) -> Result<Applicability> {
    let not_applicable = || Error::FacetNotApplicable {
        facet: facet.name(),
        base: base_name.clone(),
    };

    match variety {
        Variety::Union => match facet {
            Facet::Pattern(_) | Facet::PatternSet(_) | Facet::Enumeration(_) => {
                Ok(Applicability::Emit)
            }
            _ => Err(not_applicable()),
        },
        Variety::List => match facet {
            // Lengths count items for lists.
            Facet::Length(_)
            | Facet::MinLength(_)
            | Facet::MaxLength(_)
            | Facet::Pattern(_)
            | Facet::PatternSet(_)
            | Facet::Enumeration(_)
            | Facet::WhiteSpace(_) => Ok(Applicability::Emit),
            Facet::TotalDigits(_) | Facet::FractionDigits(_) | Facet::Range(_) => {
                Err(not_applicable())
            }
        },
        Variety::Atomic => match facet {
            Facet::Range(_) => {
                if fundamental.ordered.supports_ranges() {
                    Ok(Applicability::Emit)
                } else {
                    Err(not_applicable())
                }
            }
            Facet::TotalDigits(_) | Facet::FractionDigits(_) => {
                if fundamental.numeric {
                    Ok(Applicability::Emit)
                } else {
                    Err(not_applicable())
                }
            }
            Facet::Length(_) | Facet::MinLength(_) | Facet::MaxLength(_) => match primitive {
                Some(p) if p.is_numeric() || p.is_temporal() => Err(not_applicable()),
                Some(PrimitiveKind::Boolean | PrimitiveKind::Duration) => Err(not_applicable()),
                // Length on QName/NOTATION is legal but checked
                // nowhere at validation time (W3C errata).
                Some(PrimitiveKind::QName | PrimitiveKind::Notation) => Ok(Applicability::Skip),
                _ => Ok(Applicability::Emit),
            },
            Facet::Pattern(_)
            | Facet::PatternSet(_)
            | Facet::Enumeration(_)
            | Facet::WhiteSpace(_) => Ok(Applicability::Emit),
        },
    }
}

// =============================================================================
// Facet collection
// =============================================================================

/// Facets of one derivation step, base-most step first in the output of
/// [`collect_facet_steps`].
#[derive(Debug, Clone)]
pub struct FacetStep {
    /// Name of the type declaring the step (zero for anonymous)
    pub owner: QName,
    /// Step facets with same-step patterns coalesced
    pub facets: Vec<Facet>,
}

/// Walk the derivation chain base-to-leaf and collect every step's
/// facets. Patterns within one step merge into a [`Facet::PatternSet`];
/// a whiteSpace facet that loosens the inherited mode is an error. A
/// chain rooted in a list built-in picks up its implicit `minLength=1`.
pub fn collect_facet_steps(
    st: &Arc<SimpleType>,
    lookup: SimpleTypeLookup<'_>,
) -> Result<Vec<FacetStep>> {
    let mut steps = Vec::new();
    gather(st, lookup, &mut steps)?;
    steps.reverse();

    // Whitespace may only tighten along the chain.
    let mut inherited: Option<WhiteSpace> = None;
    for step in &steps {
        for facet in &step.facets {
            if let Facet::WhiteSpace(ws) = facet {
                if let Some(base_ws) = inherited {
                    if !ws.can_restrict(base_ws) {
                        return Err(Error::WhiteSpaceWeakened(step.owner.clone()));
                    }
                }
                inherited = Some(*ws);
            }
        }
    }
    Ok(steps)
}

fn gather(
    st: &Arc<SimpleType>,
    lookup: SimpleTypeLookup<'_>,
    out: &mut Vec<FacetStep>,
) -> Result<()> {
    if let Some(builtin) = st.builtin {
        if builtin.is_list() {
            // NMTOKENS, IDREFS and ENTITIES are non-empty sequences.
            out.push(FacetStep {
                owner: st.name.clone(),
                facets: vec![Facet::MinLength(1)],
            });
        }
        return Ok(());
    }

    let mut facets = Vec::new();
    let mut rest = Vec::new();
    let mut patterns = Vec::new();
    if let Some(ws) = st.white_space {
        facets.push(Facet::WhiteSpace(ws));
    }
    for facet in st.step_facets() {
        match facet {
            Facet::Pattern(p) => patterns.push(p.clone()),
            Facet::PatternSet(set) => patterns.extend(set.iter().cloned()),
            other => rest.push(other.clone()),
        }
    }
    // Patterns go first so instructions emitted after them, enumeration
    // membership in particular, are screened against them.
    match patterns.len() {
        0 => {}
        1 => facets.push(Facet::Pattern(patterns.pop().expect("one pattern"))),
        _ => facets.push(Facet::PatternSet(patterns)),
    }
    facets.extend(rest);
    out.push(FacetStep {
        owner: st.name.clone(),
        facets,
    });

    if let SimpleDerivation::Restriction {
        base, inline_base, ..
    } = &st.derivation
    {
        if let Some(inline) = inline_base {
            gather(inline, lookup, out)?;
        } else if !base.is_zero() {
            if let Some(builtin) = builtins::get_ns(&base.namespace, &base.local) {
                gather(&builtin.simple_type(), lookup, out)?;
            } else if let Some(base_type) = lookup(base) {
                gather(&base_type, lookup, out)?;
            }
        }
    }
    Ok(())
}
