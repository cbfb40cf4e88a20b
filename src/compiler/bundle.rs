//! Compiled schema bundle
//!
//! The read-only aggregate produced by compilation. Validators and
//! facet instructions hold `{off, len}` indices into flat tables, never
//! pointers; canonical value bytes are interned first-seen-wins into a
//! shared blob so the layout is byte-identical across runs on the same
//! input. Component-keyed lookups (complex-type plans, attribute-use
//! defaults) use pointer identity, matching the ID assignment phase.

use regex::Regex;
use rustc_hash::FxHashMap;
use rustc_hash::FxHasher;
use std::hash::Hasher;
use std::sync::Arc;

use crate::analysis::{AttrId, ElemId, TypeId};
use crate::model::{AttributeDecl, AttributeUse, ComplexType, Particle, SimpleType, Wildcard};

use super::canonical::{hash_key, KeyKind, ValueKey};
use super::validators::{EnumId, FacetOp, PatternId, Validator, ValidatorId};

fn ptr_key<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as usize
}

/// `{off, len}` range into the value blob. `present` distinguishes an
/// absent value from an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueRef {
    /// First byte
    pub off: u32,
    /// Byte count
    pub len: u32,
    /// Whether a value is recorded at all
    pub present: bool,
}

impl ValueRef {
    /// The absent reference.
    pub const NONE: ValueRef = ValueRef {
        off: 0,
        len: 0,
        present: false,
    };
}

/// Interned blob of canonical value bytes. Interning is first-seen-wins
/// so offsets depend only on insertion order.
#[derive(Debug, Default)]
pub struct ValueBlob {
    bytes: Vec<u8>,
    seen: FxHashMap<u64, Vec<ValueRef>>,
}

impl ValueBlob {
    /// Intern a byte string, returning the existing reference when the
    /// exact bytes were seen before.
    pub fn intern(&mut self, bytes: &[u8]) -> ValueRef {
        let mut hasher = FxHasher::default();
        hasher.write(bytes);
        let hash = hasher.finish();

        let slots = self.seen.entry(hash).or_default();
        for slot in slots.iter() {
            let start = slot.off as usize;
            if &self.bytes[start..start + slot.len as usize] == bytes {
                return *slot;
            }
        }
        let slot = ValueRef {
            off: self.bytes.len() as u32,
            len: bytes.len() as u32,
            present: true,
        };
        self.bytes.extend_from_slice(bytes);
        slots.push(slot);
        slot
    }

    /// Read the bytes behind a reference; empty for the absent ref.
    pub fn get(&self, r: ValueRef) -> &[u8] {
        if !r.present {
            return &[];
        }
        &self.bytes[r.off as usize..(r.off + r.len) as usize]
    }

    /// Total blob size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The whole blob, for layout comparisons.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A compiled pattern with its XSD source kept for diagnostics.
#[derive(Debug)]
pub struct CompiledPattern {
    /// XSD pattern text as written in the schema
    pub source: String,
    /// Anchored engine pattern
    pub regex: Regex,
}

/// One enumeration key: kind tag, 64-bit hash, interned key bytes.
#[derive(Debug, Clone, Copy)]
pub struct EnumKey {
    /// Value-space kind of the key
    pub kind: KeyKind,
    /// Seedless hash of (kind, bytes) for O(1) membership
    pub hash: u64,
    /// Key bytes in the value blob
    pub bytes: ValueRef,
}

/// Enumeration table: flat key list plus per-enum `{off, len}` spans.
#[derive(Debug, Default)]
pub struct EnumTable {
    keys: Vec<EnumKey>,
    spans: Vec<(u32, u32)>,
}

impl EnumTable {
    /// Record an enumeration from its member keys, interning the bytes.
    /// Returns the new enum's ID.
    pub fn push(&mut self, keys: &[ValueKey], blob: &mut ValueBlob) -> EnumId {
        let off = self.keys.len() as u32;
        for key in keys {
            self.keys.push(EnumKey {
                kind: key.kind,
                hash: key.hash_key(),
                bytes: blob.intern(&key.bytes),
            });
        }
        self.spans.push((off, keys.len() as u32));
        self.spans.len() as EnumId
    }

    /// The keys of one enumeration.
    pub fn keys(&self, id: EnumId) -> &[EnumKey] {
        let (off, len) = self.spans[id as usize - 1];
        &self.keys[off as usize..(off + len) as usize]
    }

    /// Membership test by hash, confirmed by byte comparison.
    pub fn contains(&self, id: EnumId, key: &ValueKey, blob: &ValueBlob) -> bool {
        let hash = key.hash_key();
        self.keys(id).iter().any(|entry| {
            entry.hash == hash && entry.kind == key.kind && blob.get(entry.bytes) == key.bytes
        })
    }
}

/// Compiled default or fixed value: the value-space key, the canonical
/// lexical bytes, and the selected union member (0 outside unions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueBinding {
    /// Value-space key bytes
    pub key: ValueRef,
    /// Canonical lexical bytes
    pub lexical: ValueRef,
    /// Union member validator that accepted the value
    pub member: ValidatorId,
}

impl ValueBinding {
    /// The absent binding.
    pub const NONE: ValueBinding = ValueBinding {
        key: ValueRef::NONE,
        lexical: ValueRef::NONE,
        member: 0,
    };

    /// Whether a value is recorded.
    pub fn is_present(&self) -> bool {
        self.key.present
    }
}

/// Per-complex-type validation plan: effective attribute uses sorted by
/// QName, the merged wildcard, and the content particle.
#[derive(Debug, Clone)]
pub struct ComplexTypePlan {
    /// Effective attribute uses after derivation-chain merging
    pub attributes: Vec<AttributeUse>,
    /// Merged attribute wildcard, if any
    pub wildcard: Option<Wildcard>,
    /// Content model particle; `None` for empty or simple content
    pub content: Option<Particle>,
}

/// The compiled schema bundle. All tables are immutable after
/// [`compile`](super::compile) returns.
#[derive(Debug, Default)]
pub struct CompiledSchema {
    pub(crate) validators: Vec<Validator>,
    pub(crate) facet_ops: Vec<FacetOp>,
    pub(crate) patterns: Vec<CompiledPattern>,
    pub(crate) enums: EnumTable,
    pub(crate) values: ValueBlob,
    pub(crate) type_validators: Vec<ValidatorId>,
    pub(crate) element_defaults: Vec<ValueBinding>,
    pub(crate) element_fixed: Vec<ValueBinding>,
    pub(crate) attribute_defaults: Vec<ValueBinding>,
    pub(crate) attribute_fixed: Vec<ValueBinding>,
    pub(crate) attr_use_defaults: FxHashMap<usize, ValueBinding>,
    pub(crate) attr_use_fixed: FxHashMap<usize, ValueBinding>,
    pub(crate) simple_content_types: FxHashMap<usize, Arc<SimpleType>>,
    pub(crate) complex_types: FxHashMap<usize, ComplexTypePlan>,
}

impl CompiledSchema {
    /// Validator metadata behind an ID.
    pub fn validator(&self, id: ValidatorId) -> &Validator {
        &self.validators[id as usize - 1]
    }

    /// Number of compiled validators.
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Facet instructions of one program.
    pub fn facet_program(&self, r: super::validators::FacetProgramRef) -> &[FacetOp] {
        &self.facet_ops[r.off as usize..(r.off + r.len) as usize]
    }

    /// Compiled pattern behind an ID.
    pub fn pattern(&self, id: PatternId) -> &CompiledPattern {
        &self.patterns[id as usize - 1]
    }

    /// The enum table.
    pub fn enums(&self) -> &EnumTable {
        &self.enums
    }

    /// The interned value blob.
    pub fn values(&self) -> &ValueBlob {
        &self.values
    }

    /// Root validator for a registered type; 0 when the type has no
    /// simple-type validator (pure complex content).
    pub fn validator_for_type(&self, id: TypeId) -> ValidatorId {
        if id == 0 {
            return 0;
        }
        self.type_validators
            .get(id as usize - 1)
            .copied()
            .unwrap_or(0)
    }

    fn dense(table: &[ValueBinding], id: u32) -> Option<&ValueBinding> {
        if id == 0 {
            return None;
        }
        table
            .get(id as usize - 1)
            .filter(|binding| binding.is_present())
    }

    /// Compiled default of a global or local element declaration.
    pub fn element_default(&self, id: ElemId) -> Option<&ValueBinding> {
        Self::dense(&self.element_defaults, id)
    }

    /// Compiled fixed value of an element declaration.
    pub fn element_fixed(&self, id: ElemId) -> Option<&ValueBinding> {
        Self::dense(&self.element_fixed, id)
    }

    /// Compiled default of an attribute declaration.
    pub fn attribute_default(&self, id: AttrId) -> Option<&ValueBinding> {
        Self::dense(&self.attribute_defaults, id)
    }

    /// Compiled fixed value of an attribute declaration.
    pub fn attribute_fixed(&self, id: AttrId) -> Option<&ValueBinding> {
        Self::dense(&self.attribute_fixed, id)
    }

    /// Use-site default of an attribute use, keyed by declaration
    /// identity.
    pub fn attr_use_default(&self, decl: &Arc<AttributeDecl>) -> Option<&ValueBinding> {
        self.attr_use_defaults.get(&ptr_key(decl))
    }

    /// Use-site fixed value of an attribute use.
    pub fn attr_use_fixed(&self, decl: &Arc<AttributeDecl>) -> Option<&ValueBinding> {
        self.attr_use_fixed.get(&ptr_key(decl))
    }

    /// Simple base type recorded for a `<simpleContent>` complex type.
    pub fn simple_content_type(&self, ct: &Arc<ComplexType>) -> Option<&Arc<SimpleType>> {
        self.simple_content_types.get(&ptr_key(ct))
    }

    /// Effective attribute uses of a complex type.
    pub fn attribute_uses(&self, ct: &Arc<ComplexType>) -> &[AttributeUse] {
        self.complex_types
            .get(&ptr_key(ct))
            .map(|plan| plan.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Merged attribute wildcard of a complex type.
    pub fn attribute_wildcard(&self, ct: &Arc<ComplexType>) -> Option<&Wildcard> {
        self.complex_types
            .get(&ptr_key(ct))
            .and_then(|plan| plan.wildcard.as_ref())
    }

    /// Content particle of a complex type, if it has element content.
    pub fn content(&self, ct: &Arc<ComplexType>) -> Option<&Particle> {
        self.complex_types
            .get(&ptr_key(ct))
            .and_then(|plan| plan.content.as_ref())
    }

    pub(crate) fn record_attr_use_default(&mut self, decl: &Arc<AttributeDecl>, b: ValueBinding) {
        self.attr_use_defaults.insert(ptr_key(decl), b);
    }

    pub(crate) fn record_attr_use_fixed(&mut self, decl: &Arc<AttributeDecl>, b: ValueBinding) {
        self.attr_use_fixed.insert(ptr_key(decl), b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_interning_is_first_seen_wins() {
        let mut blob = ValueBlob::default();
        let a = blob.intern(b"alpha");
        let b = blob.intern(b"beta");
        let a2 = blob.intern(b"alpha");
        assert_eq!(a, a2);
        assert_eq!(a.off, 0);
        assert_eq!(b.off, 5);
        assert_eq!(blob.len(), 9);
        assert_eq!(blob.get(a), b"alpha");
        assert_eq!(blob.get(b), b"beta");
    }

    #[test]
    fn test_blob_absent_ref_reads_empty() {
        let blob = ValueBlob::default();
        assert_eq!(blob.get(ValueRef::NONE), b"");
    }

    #[test]
    fn test_blob_offsets_depend_only_on_insertion_order() {
        let build = || {
            let mut blob = ValueBlob::default();
            [
                blob.intern(b"one"),
                blob.intern(b"two"),
                blob.intern(b"one"),
                blob.intern(b"three"),
            ]
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_enum_membership() {
        let mut blob = ValueBlob::default();
        let mut enums = EnumTable::default();
        let keys = vec![
            ValueKey {
                kind: KeyKind::String,
                bytes: b"red".to_vec(),
            },
            ValueKey {
                kind: KeyKind::String,
                bytes: b"green".to_vec(),
            },
        ];
        let id = enums.push(&keys, &mut blob);
        assert_eq!(id, 1);
        assert_eq!(enums.keys(id).len(), 2);

        let probe = ValueKey {
            kind: KeyKind::String,
            bytes: b"green".to_vec(),
        };
        assert!(enums.contains(id, &probe, &blob));
        let miss = ValueKey {
            kind: KeyKind::String,
            bytes: b"blue".to_vec(),
        };
        assert!(!enums.contains(id, &miss, &blob));
        // Same bytes under a different kind do not match.
        let wrong_kind = ValueKey {
            kind: KeyKind::AnyUri,
            bytes: b"green".to_vec(),
        };
        assert!(!enums.contains(id, &wrong_kind, &blob));
    }

    #[test]
    fn test_enum_keys_share_the_blob() {
        let mut blob = ValueBlob::default();
        let mut enums = EnumTable::default();
        let keys = vec![ValueKey {
            kind: KeyKind::String,
            bytes: b"dup".to_vec(),
        }];
        let first = enums.push(&keys, &mut blob);
        let second = enums.push(&keys, &mut blob);
        assert_eq!(
            enums.keys(first)[0].bytes,
            enums.keys(second)[0].bytes,
            "identical keys intern to one blob slot"
        );
    }

    #[test]
    fn test_binding_presence() {
        assert!(!ValueBinding::NONE.is_present());
        let mut blob = ValueBlob::default();
        let binding = ValueBinding {
            key: blob.intern(b""),
            lexical: blob.intern(b""),
            member: 0,
        };
        // An empty value is still a value.
        assert!(binding.is_present());
    }

    #[test]
    fn test_dense_lookups_skip_absent_slots() {
        let mut schema = CompiledSchema::default();
        let mut blob = ValueBlob::default();
        let bound = ValueBinding {
            key: blob.intern(b"k"),
            lexical: blob.intern(b"v"),
            member: 0,
        };
        schema.values = blob;
        schema.element_defaults = vec![ValueBinding::NONE, bound];
        assert!(schema.element_default(0).is_none());
        assert!(schema.element_default(1).is_none());
        assert_eq!(schema.element_default(2), Some(&bound));
        assert!(schema.element_default(99).is_none());
    }
}
