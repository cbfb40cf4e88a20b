//! Validator compiler
//!
//! Turns a resolved, ID-assigned schema into a [`CompiledSchema`]: one
//! validator per distinct simple type, flat facet instruction programs,
//! canonical value-space keys for every enumeration, default and fixed
//! value, and per-complex-type validation plans. Compilation walks
//! `global_decls` in declaration order, so two runs over the same
//! schema produce byte-identical tables.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::analysis::{AttrId, ElemId, Registry};
use crate::attribute_uses::collect_attribute_uses;
use crate::error::{ComponentKind, Error, Result};
use crate::model::{
    builtins, AttributeDecl, AttributeUse, BuiltinType, ComplexType, ContentType, ElementDecl,
    Facet, GlobalDecl, ModelGroup, Particle, PrimitiveKind, Schema, SimpleDerivation, SimpleType,
    SimpleTypeLookup, Term, TypeDef, Variety,
};
use crate::namespaces::{NamespaceContext, QName};
use crate::pattern::XsdPattern;

pub mod bundle;
pub mod canonical;
pub mod validators;

pub use bundle::{
    CompiledPattern, CompiledSchema, ComplexTypePlan, EnumKey, EnumTable, ValueBinding, ValueBlob,
    ValueRef,
};
pub use canonical::{canonicalize, canonicalize_items, hash_key, KeyKind, ValueKey};
pub use validators::{
    check_applicability, collect_facet_steps, Applicability, EnumId, FacetOp, FacetProgramRef,
    IntegerKind, PatternId, StringKind, Validator, ValidatorId, ValidatorKind,
};

fn ptr_key<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as usize
}

fn missing(kind: ComponentKind, name: &QName) -> Error {
    Error::MissingGlobalDecl {
        kind,
        name: name.clone(),
    }
}

/// Compile a resolved schema against its ID registry.
pub fn compile(schema: &Schema, registry: &Registry) -> Result<CompiledSchema> {
    let mut compiler = Compiler {
        schema,
        registry,
        out: CompiledSchema::default(),
        memo: FxHashMap::default(),
        complex_in_progress: FxHashSet::default(),
    };
    compiler.out.type_validators = vec![0; registry.type_count() as usize];
    let elems = registry.element_count() as usize;
    compiler.out.element_defaults = vec![ValueBinding::NONE; elems];
    compiler.out.element_fixed = vec![ValueBinding::NONE; elems];
    let attrs = registry.attribute_count() as usize;
    compiler.out.attribute_defaults = vec![ValueBinding::NONE; attrs];
    compiler.out.attribute_fixed = vec![ValueBinding::NONE; attrs];
    compiler.run()?;
    Ok(compiler.out)
}

struct Compiler<'a> {
    schema: &'a Schema,
    registry: &'a Registry,
    out: CompiledSchema,
    // Validator ID per simple-type instance.
    memo: FxHashMap<usize, ValidatorId>,
    complex_in_progress: FxHashSet<usize>,
}

impl<'a> Compiler<'a> {
    fn run(&mut self) -> Result<()> {
        for decl in self.schema.global_decls.clone() {
            match decl {
                GlobalDecl::Type(name) => {
                    let td = self
                        .schema
                        .type_def(&name)
                        .cloned()
                        .ok_or_else(|| missing(ComponentKind::Type, &name))?;
                    self.compile_type_def(&td)?;
                }
                GlobalDecl::Element(name) => {
                    let decl = self
                        .schema
                        .elements
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| missing(ComponentKind::Element, &name))?;
                    let id = self.registry.element_id(&name);
                    self.compile_element_decl(&decl, id)?;
                }
                GlobalDecl::Attribute(name) => {
                    let decl = self
                        .schema
                        .attributes
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| missing(ComponentKind::Attribute, &name))?;
                    let id = self.registry.attribute_id(&name);
                    self.compile_attribute_decl(&decl, id)?;
                }
                GlobalDecl::Group(name) => {
                    let def = self
                        .schema
                        .groups
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| missing(ComponentKind::Group, &name))?;
                    self.walk_group(&def.group)?;
                }
                GlobalDecl::AttributeGroup(name) => {
                    let def = self
                        .schema
                        .attribute_groups
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| missing(ComponentKind::AttributeGroup, &name))?;
                    for use_ in &def.attributes {
                        self.compile_attribute_use(use_)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_type_def(&mut self, td: &TypeDef) -> Result<()> {
        match td {
            TypeDef::Builtin(_) => Ok(()),
            TypeDef::Simple(st) => self.compile_simple(st).map(|_| ()),
            TypeDef::Complex(ct) => self.compile_complex(ct),
        }
    }

    // =========================================================================
    // Simple types
    // =========================================================================

    fn compile_simple(&mut self, st: &Arc<SimpleType>) -> Result<ValidatorId> {
        let key = ptr_key(st);
        if let Some(&vid) = self.memo.get(&key) {
            return Ok(vid);
        }

        let schema = self.schema;
        let lookup = move |q: &QName| schema.simple_type(q);
        let variety = st.variety(&lookup);
        let white_space = st.effective_white_space(&lookup);
        let fundamental = st.fundamental_facets(&lookup);

        let mut validator = Validator {
            kind: ValidatorKind::Atomic,
            primitive: None,
            white_space,
            string_kind: StringKind::Any,
            integer_kind: IntegerKind::Any,
            facets: FacetProgramRef::default(),
            item: 0,
            members: Vec::new(),
        };
        match variety {
            Variety::Atomic => {
                let nearest = nearest_builtin(st, &lookup);
                validator.primitive = match nearest {
                    // The integer family keeps its own kind so lexical
                    // screening can reject fractions; its value space
                    // still keys as decimal.
                    Some(b) if b.kind == PrimitiveKind::Integer => Some(PrimitiveKind::Integer),
                    _ => st.primitive(&lookup).map(|b| b.kind),
                };
                if let Some(b) = nearest {
                    match b.kind {
                        PrimitiveKind::String => {
                            validator.string_kind = StringKind::for_builtin(b.name)
                        }
                        PrimitiveKind::Integer => {
                            validator.integer_kind = IntegerKind::for_builtin(b.name)
                        }
                        _ => {}
                    }
                }
            }
            Variety::List => {
                let item_type = item_simple_type(st, &lookup)
                    .ok_or_else(|| missing(ComponentKind::Type, &st.name))?;
                validator.kind = ValidatorKind::List;
                validator.item = self.compile_simple(&item_type)?;
            }
            Variety::Union => {
                let member_types = member_simple_types(st, &lookup)
                    .ok_or_else(|| missing(ComponentKind::Type, &st.name))?;
                validator.kind = ValidatorKind::Union;
                validator.members = Vec::with_capacity(member_types.len());
                for member in &member_types {
                    let vid = self.compile_simple(member)?;
                    validator.members.push(vid);
                }
            }
        }

        // Applicability errors name the built-in base when one exists.
        let error_base = nearest_builtin(st, &lookup)
            .map(|b| b.qname())
            .unwrap_or_else(|| st.name.clone());

        let steps = collect_facet_steps(st, &lookup)?;
        let mut ops: Vec<FacetOp> = Vec::new();
        for step in &steps {
            for facet in &step.facets {
                match check_applicability(
                    facet,
                    variety,
                    validator.primitive,
                    &fundamental,
                    &error_base,
                )? {
                    Applicability::Skip => continue,
                    Applicability::Emit => {}
                }
                self.emit_facet(facet, &validator, &mut ops, &st.name)?;
            }
        }
        validator.facets = FacetProgramRef {
            off: self.out.facet_ops.len() as u32,
            len: ops.len() as u32,
        };
        self.out.facet_ops.extend(ops);

        self.out.validators.push(validator);
        let vid = self.out.validators.len() as ValidatorId;
        self.memo.insert(key, vid);

        let id = self.registry.simple_type_id(st);
        if id != 0 {
            self.out.type_validators[id as usize - 1] = vid;
        }
        Ok(vid)
    }

    fn emit_facet(
        &mut self,
        facet: &Facet,
        validator: &Validator,
        ops: &mut Vec<FacetOp>,
        type_name: &QName,
    ) -> Result<()> {
        match facet {
            // Carried on the validator itself.
            Facet::WhiteSpace(_) => {}
            Facet::Length(n) => ops.push(FacetOp::Length(*n)),
            Facet::MinLength(n) => ops.push(FacetOp::MinLength(*n)),
            Facet::MaxLength(n) => ops.push(FacetOp::MaxLength(*n)),
            Facet::TotalDigits(n) => ops.push(FacetOp::TotalDigits(*n)),
            Facet::FractionDigits(n) => ops.push(FacetOp::FractionDigits(*n)),
            Facet::Pattern(p) => {
                let pid = self.push_pattern(p);
                ops.push(FacetOp::Pattern(pid));
            }
            Facet::PatternSet(set) => {
                let off = self.out.patterns.len() as u32;
                for p in set {
                    self.push_pattern(p);
                }
                ops.push(FacetOp::PatternSet {
                    off,
                    len: set.len() as u32,
                });
            }
            Facet::Range(range) => {
                let kind = validator.primitive.unwrap_or(PrimitiveKind::String);
                let normalized = validator.white_space.normalize(&range.lexical);
                let key = canonical::canonicalize(kind, &normalized, &NamespaceContext::new())
                    .map_err(|_| Error::InvalidFacetValue {
                        facet: range.op.facet_name(),
                        value: range.lexical.clone(),
                    })?;
                let bound = self.out.values.intern(&key.bytes);
                ops.push(FacetOp::Range {
                    op: range.op,
                    bound,
                });
            }
            Facet::Enumeration(enumeration) => {
                let mut keys = Vec::with_capacity(enumeration.values.len());
                for value in &enumeration.values {
                    if validator.kind == ValidatorKind::Union {
                        // Every member that accepts the value contributes
                        // its key, so an instance value validated through
                        // any member can match the enumeration.
                        let before = keys.len();
                        let mut canonicalized = false;
                        for &member in &validator.members {
                            let Ok((key, lexical, _)) = self.compile_value(
                                member,
                                value,
                                &enumeration.context,
                                type_name,
                            ) else {
                                continue;
                            };
                            canonicalized = true;
                            if self.ops_accept(ops, &lexical, &key) {
                                keys.push(key);
                            }
                        }
                        if keys.len() == before {
                            return Err(if canonicalized {
                                Error::EnumViolatesFacets {
                                    value: value.clone(),
                                    type_name: type_name.clone(),
                                }
                            } else {
                                Error::NoUnionMemberMatches {
                                    value: value.clone(),
                                    type_name: type_name.clone(),
                                }
                            });
                        }
                    } else {
                        let (key, _, _) = self.value_against(
                            validator,
                            ops,
                            value,
                            &enumeration.context,
                            type_name,
                        )?;
                        keys.push(key);
                    }
                }
                let eid = self.out.enums.push(&keys, &mut self.out.values);
                ops.push(FacetOp::Enum(eid));
            }
        }
        Ok(())
    }

    fn push_pattern(&mut self, pattern: &XsdPattern) -> PatternId {
        self.out.patterns.push(CompiledPattern {
            source: pattern.source.clone(),
            regex: pattern.regex().clone(),
        });
        self.out.patterns.len() as PatternId
    }

    // =========================================================================
    // Value compilation
    // =========================================================================

    /// Normalize, screen and canonicalize one lexical value against a
    /// compiled validator. Returns the value-space key, the normalized
    /// lexical, and the accepting union member (0 outside unions).
    fn compile_value(
        &self,
        vid: ValidatorId,
        raw: &str,
        context: &NamespaceContext,
        type_name: &QName,
    ) -> Result<(ValueKey, String, ValidatorId)> {
        let validator = self.out.validator(vid).clone();
        let ops = self.out.facet_program(validator.facets).to_vec();
        self.value_against(&validator, &ops, raw, context, type_name)
    }

    fn value_against(
        &self,
        validator: &Validator,
        ops: &[FacetOp],
        raw: &str,
        context: &NamespaceContext,
        type_name: &QName,
    ) -> Result<(ValueKey, String, ValidatorId)> {
        let normalized = validator.white_space.normalize(raw);
        match validator.kind {
            ValidatorKind::Atomic => {
                if validator.string_kind != StringKind::Any {
                    validator.string_kind.check(&normalized)?;
                }
                if validator.primitive == Some(PrimitiveKind::Integer) {
                    validator.integer_kind.check(&normalized)?;
                }
                let kind = validator.primitive.unwrap_or(PrimitiveKind::String);
                let key = canonical::canonicalize(kind, &normalized, context)?;
                if !self.ops_accept(ops, &normalized, &key) {
                    return Err(Error::EnumViolatesFacets {
                        value: raw.to_string(),
                        type_name: type_name.clone(),
                    });
                }
                Ok((key, normalized, 0))
            }
            ValidatorKind::List => {
                let mut keys = Vec::new();
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    let (item_key, _, _) =
                        self.compile_value(validator.item, token, context, type_name)?;
                    keys.push(item_key);
                }
                let key = canonical::canonicalize_items(&keys);
                if !self.ops_accept(ops, &normalized, &key) {
                    return Err(Error::EnumViolatesFacets {
                        value: raw.to_string(),
                        type_name: type_name.clone(),
                    });
                }
                Ok((key, normalized, 0))
            }
            ValidatorKind::Union => {
                // Members are tried in declared order; the first whose
                // normalization, facet program and canonicalization all
                // succeed wins.
                for &member in &validator.members {
                    let Ok((key, lexical, _)) =
                        self.compile_value(member, raw, context, type_name)
                    else {
                        continue;
                    };
                    if self.ops_accept(ops, &lexical, &key) {
                        return Ok((key, lexical, member));
                    }
                }
                Err(Error::NoUnionMemberMatches {
                    value: raw.to_string(),
                    type_name: type_name.clone(),
                })
            }
        }
    }

    fn ops_accept(&self, ops: &[FacetOp], lexical: &str, key: &ValueKey) -> bool {
        ops.iter().all(|op| match op {
            FacetOp::Length(n) => value_length(key, lexical) == u64::from(*n),
            FacetOp::MinLength(n) => value_length(key, lexical) >= u64::from(*n),
            FacetOp::MaxLength(n) => value_length(key, lexical) <= u64::from(*n),
            FacetOp::TotalDigits(n) => total_digits(lexical) <= u64::from(*n),
            FacetOp::FractionDigits(n) => fraction_digits(lexical) <= u64::from(*n),
            FacetOp::Pattern(pid) => self.out.pattern(*pid).regex.is_match(lexical),
            FacetOp::PatternSet { off, len } => self.out.patterns
                [*off as usize..(*off + *len) as usize]
                .iter()
                .any(|p| p.regex.is_match(lexical)),
            FacetOp::Enum(eid) => self.out.enums.contains(*eid, key, &self.out.values),
            FacetOp::Range { op, bound } => {
                match compare_keys(key.kind, &key.bytes, self.out.values.get(*bound)) {
                    Some(ordering) => op.satisfied(ordering),
                    // Kinds the compiler does not order are left to the
                    // runtime.
                    None => true,
                }
            }
        })
    }

    fn binding(
        &mut self,
        vid: ValidatorId,
        raw: &str,
        context: &NamespaceContext,
        type_name: &QName,
    ) -> Result<ValueBinding> {
        if vid == 0 {
            // Untyped content keeps its lexical form as the key.
            let key = self.out.values.intern(raw.as_bytes());
            return Ok(ValueBinding {
                key,
                lexical: key,
                member: 0,
            });
        }
        let (key, lexical, member) = self
            .compile_value(vid, raw, context, type_name)
            .map_err(|err| match err {
                Error::NoUnionMemberMatches { .. } | Error::UndeclaredPrefix(_) => err,
                _ => Error::DefaultValueInvalid {
                    value: raw.to_string(),
                    type_name: type_name.clone(),
                },
            })?;
        Ok(ValueBinding {
            key: self.out.values.intern(&key.bytes),
            lexical: self.out.values.intern(lexical.as_bytes()),
            member,
        })
    }

    // =========================================================================
    // Complex types and declarations
    // =========================================================================

    fn compile_complex(&mut self, ct: &Arc<ComplexType>) -> Result<()> {
        let key = ptr_key(ct);
        if self.out.complex_types.contains_key(&key) || !self.complex_in_progress.insert(key) {
            return Ok(());
        }

        let (attributes, wildcard) = collect_attribute_uses(self.schema, ct)?;
        for use_ in &attributes {
            self.compile_attribute_use(use_)?;
        }

        let content = match &ct.content {
            ContentType::ElementOnly(p) | ContentType::Mixed(p) => Some(p.clone()),
            ContentType::Empty | ContentType::Simple { .. } => None,
        };
        if let Some(particle) = &content {
            self.walk_particle(particle)?;
        }

        let mut vid = 0;
        if let Some(st) = self.simple_content_of(ct)? {
            vid = self.compile_simple(&st)?;
            self.out.simple_content_types.insert(key, st);
        }
        let id = self.registry.complex_type_id(ct);
        if id != 0 && vid != 0 {
            self.out.type_validators[id as usize - 1] = vid;
        }

        self.out.complex_types.insert(
            key,
            ComplexTypePlan {
                attributes,
                wildcard,
                content,
            },
        );
        self.complex_in_progress.remove(&key);
        Ok(())
    }

    /// The simple type carrying a complex type's character content,
    /// following `<simpleContent>` bases through complex ancestors.
    fn simple_content_of(&mut self, ct: &Arc<ComplexType>) -> Result<Option<Arc<SimpleType>>> {
        let (base, inline) = match &ct.content {
            ContentType::Simple { base, inline } => (base.clone(), inline.clone()),
            _ => return Ok(None),
        };
        if let Some(st) = inline {
            return Ok(Some(st));
        }
        if base.is_zero() {
            return Ok(None);
        }
        if let Some(b) = builtins::get_ns(&base.namespace, &base.local) {
            return Ok(Some(b.simple_type()));
        }
        match self.schema.type_def(&base).cloned() {
            Some(TypeDef::Simple(st)) => Ok(Some(st)),
            Some(TypeDef::Builtin(b)) => Ok(Some(b.simple_type())),
            Some(TypeDef::Complex(inner)) => self.simple_content_of(&inner),
            // Dangling bases are the resolver's to report.
            None => Ok(None),
        }
    }

    fn walk_particle(&mut self, particle: &Particle) -> Result<()> {
        match &particle.term {
            Term::Element(decl) => {
                if decl.is_reference() {
                    return Ok(());
                }
                let decl = decl.clone();
                let id = self.registry.local_element_id(&decl);
                self.compile_element_decl(&decl, id)
            }
            Term::Group(group) => self.walk_group(&group.clone()),
            Term::GroupRef(_) | Term::Wildcard(_) => Ok(()),
        }
    }

    fn walk_group(&mut self, group: &ModelGroup) -> Result<()> {
        for particle in &group.particles {
            self.walk_particle(particle)?;
        }
        Ok(())
    }

    fn compile_element_decl(&mut self, decl: &Arc<ElementDecl>, id: ElemId) -> Result<()> {
        if let Some(td) = decl.inline_type.clone() {
            self.compile_type_def(&td)?;
        }
        let vid = self.element_validator(decl)?;
        let type_name = element_type_name(decl);
        if id != 0 {
            if let Some(raw) = decl.default.clone() {
                let b = self.binding(vid, &raw, &decl.context, &type_name)?;
                self.out.element_defaults[id as usize - 1] = b;
            }
            if let Some(raw) = decl.fixed.clone() {
                let b = self.binding(vid, &raw, &decl.context, &type_name)?;
                self.out.element_fixed[id as usize - 1] = b;
            }
        }
        Ok(())
    }

    /// The simple-content validator of an element's type; 0 for pure
    /// complex content.
    fn element_validator(&mut self, decl: &Arc<ElementDecl>) -> Result<ValidatorId> {
        if let Some(td) = decl.inline_type.clone() {
            return self.type_def_validator(&td);
        }
        if decl.type_name.is_zero() {
            return Ok(0);
        }
        self.named_type_validator(&decl.type_name)
    }

    fn named_type_validator(&mut self, name: &QName) -> Result<ValidatorId> {
        if let Some(b) = builtins::get_ns(&name.namespace, &name.local) {
            return self.compile_simple(&b.simple_type());
        }
        match self.schema.type_def(name).cloned() {
            Some(td) => self.type_def_validator(&td),
            None => Ok(0),
        }
    }

    fn type_def_validator(&mut self, td: &TypeDef) -> Result<ValidatorId> {
        match td {
            TypeDef::Builtin(b) => self.compile_simple(&b.simple_type()),
            TypeDef::Simple(st) => self.compile_simple(st),
            TypeDef::Complex(ct) => {
                self.compile_complex(ct)?;
                match self.simple_content_of(ct)? {
                    Some(st) => self.compile_simple(&st),
                    None => Ok(0),
                }
            }
        }
    }

    fn compile_attribute_use(&mut self, use_: &AttributeUse) -> Result<()> {
        let decl = use_.decl.clone();
        if !decl.is_reference() {
            let id = self.attribute_decl_id(&decl);
            self.compile_attribute_decl(&decl, id)?;
        }
        let vid = self.attribute_validator(&decl)?;
        let type_name = attribute_type_name(&decl);
        if let Some(raw) = use_.default.clone() {
            let b = self.binding(vid, &raw, &decl.context, &type_name)?;
            self.out.record_attr_use_default(&decl, b);
        }
        if let Some(raw) = use_.fixed.clone() {
            let b = self.binding(vid, &raw, &decl.context, &type_name)?;
            self.out.record_attr_use_fixed(&decl, b);
        }
        Ok(())
    }

    fn attribute_decl_id(&self, decl: &Arc<AttributeDecl>) -> AttrId {
        let local = self.registry.local_attribute_id(decl);
        if local != 0 {
            return local;
        }
        match self.schema.attributes.get(&decl.name) {
            Some(global) if Arc::ptr_eq(global, decl) => self.registry.attribute_id(&decl.name),
            _ => 0,
        }
    }

    fn compile_attribute_decl(&mut self, decl: &Arc<AttributeDecl>, id: AttrId) -> Result<()> {
        let vid = self.attribute_validator(decl)?;
        let type_name = attribute_type_name(decl);
        if id != 0 {
            if let Some(raw) = decl.default.clone() {
                let b = self.binding(vid, &raw, &decl.context, &type_name)?;
                self.out.attribute_defaults[id as usize - 1] = b;
            }
            if let Some(raw) = decl.fixed.clone() {
                let b = self.binding(vid, &raw, &decl.context, &type_name)?;
                self.out.attribute_fixed[id as usize - 1] = b;
            }
        }
        Ok(())
    }

    fn attribute_validator(&mut self, decl: &Arc<AttributeDecl>) -> Result<ValidatorId> {
        if let Some(target) = decl.reference.clone() {
            let global = self
                .schema
                .attributes
                .get(&target)
                .cloned()
                .ok_or_else(|| missing(ComponentKind::Attribute, &target))?;
            return self.attribute_validator(&global);
        }
        if let Some(st) = decl.inline_type.clone() {
            return self.compile_simple(&st);
        }
        if decl.type_name.is_zero() {
            // Absent type means xs:anySimpleType.
            let facade = builtins::get("anySimpleType")
                .expect("anySimpleType is registered")
                .simple_type();
            return self.compile_simple(&facade);
        }
        if let Some(b) = builtins::get_ns(&decl.type_name.namespace, &decl.type_name.local) {
            return self.compile_simple(&b.simple_type());
        }
        match self.schema.simple_type(&decl.type_name) {
            Some(st) => self.compile_simple(&st),
            None => Ok(0),
        }
    }
}

fn element_type_name(decl: &Arc<ElementDecl>) -> QName {
    if !decl.type_name.is_zero() {
        decl.type_name.clone()
    } else if let Some(td) = &decl.inline_type {
        td.name()
    } else {
        QName::zero()
    }
}

fn attribute_type_name(decl: &Arc<AttributeDecl>) -> QName {
    if !decl.type_name.is_zero() {
        decl.type_name.clone()
    } else if let Some(st) = &decl.inline_type {
        st.name.clone()
    } else {
        QName::xsd("anySimpleType")
    }
}

// =============================================================================
// Chain walks
// =============================================================================

fn resolve_simple(name: &QName, lookup: SimpleTypeLookup<'_>) -> Option<Arc<SimpleType>> {
    if name.is_zero() {
        return None;
    }
    if let Some(b) = builtins::get_ns(&name.namespace, &name.local) {
        return Some(b.simple_type());
    }
    lookup(name)
}

/// The nearest built-in up the restriction chain; carries the
/// string-kind / integer-kind refinement.
fn nearest_builtin(
    st: &Arc<SimpleType>,
    lookup: SimpleTypeLookup<'_>,
) -> Option<&'static BuiltinType> {
    if let Some(b) = st.builtin {
        return Some(b);
    }
    match &st.derivation {
        SimpleDerivation::Restriction {
            base, inline_base, ..
        } => {
            let base_type = inline_base.clone().or_else(|| resolve_simple(base, lookup))?;
            nearest_builtin(&base_type, lookup)
        }
        _ => None,
    }
}

/// Item type of a list, found through restriction steps.
fn item_simple_type(st: &Arc<SimpleType>, lookup: SimpleTypeLookup<'_>) -> Option<Arc<SimpleType>> {
    if let Some(b) = st.builtin {
        let item = b.item_type?;
        return builtins::get(item).map(|entry| entry.simple_type());
    }
    match &st.derivation {
        SimpleDerivation::List { item, inline_item } => {
            inline_item.clone().or_else(|| resolve_simple(item, lookup))
        }
        SimpleDerivation::Restriction {
            base, inline_base, ..
        } => {
            let base_type = inline_base.clone().or_else(|| resolve_simple(base, lookup))?;
            item_simple_type(&base_type, lookup)
        }
        SimpleDerivation::Union { .. } => None,
    }
}

/// Member types of a union in declared order, named members first,
/// found through restriction steps.
fn member_simple_types(
    st: &Arc<SimpleType>,
    lookup: SimpleTypeLookup<'_>,
) -> Option<Vec<Arc<SimpleType>>> {
    if st.builtin.is_some() {
        return None;
    }
    match &st.derivation {
        SimpleDerivation::Union {
            members,
            inline_members,
        } => {
            let mut result = Vec::with_capacity(members.len() + inline_members.len());
            for name in members {
                result.push(resolve_simple(name, lookup)?);
            }
            result.extend(inline_members.iter().cloned());
            Some(result)
        }
        SimpleDerivation::Restriction {
            base, inline_base, ..
        } => {
            let base_type = inline_base.clone().or_else(|| resolve_simple(base, lookup))?;
            member_simple_types(&base_type, lookup)
        }
        SimpleDerivation::List { .. } => None,
    }
}

// =============================================================================
// Value measurement and ordering
// =============================================================================

/// Facet length of a value: items for lists, octets for the binary
/// kinds, characters otherwise.
fn value_length(key: &ValueKey, lexical: &str) -> u64 {
    match key.kind {
        KeyKind::List => canonical::read_varint(&key.bytes).0,
        // Hex keys hold uppercased hex characters, two per octet.
        KeyKind::HexBinary => key.bytes.len() as u64 / 2,
        KeyKind::Base64Binary => key.bytes.len() as u64,
        _ => lexical.chars().count() as u64,
    }
}

fn total_digits(lexical: &str) -> u64 {
    let body = lexical.trim_start_matches(['+', '-']);
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let int_digits = int_part.trim_start_matches('0').len();
    let frac_digits = frac_part.trim_end_matches('0').len();
    (int_digits + frac_digits).max(1) as u64
}

fn fraction_digits(lexical: &str) -> u64 {
    match lexical.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u64,
        None => 0,
    }
}

/// Order two canonical keys of the same kind. `None` for kinds the
/// compiler does not compare; the runtime owns those.
fn compare_keys(kind: KeyKind, a: &[u8], b: &[u8]) -> Option<Ordering> {
    match kind {
        KeyKind::Decimal => Some(compare_decimal_keys(a, b)),
        KeyKind::Float | KeyKind::Double => {
            let x = parse_canonical_float(a)?;
            let y = parse_canonical_float(b)?;
            x.partial_cmp(&y)
        }
        _ => None,
    }
}

fn parse_canonical_float(bytes: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(bytes).ok()?;
    match s {
        "NaN" => None,
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        _ => s.parse().ok(),
    }
}

fn decode_decimal_key(bytes: &[u8]) -> (bool, u64, &[u8]) {
    let negative = bytes.first().copied() == Some(1);
    let (scale, used) = canonical::read_varint(&bytes[1..]);
    (negative, scale, &bytes[1 + used..])
}

fn compare_decimal_keys(a: &[u8], b: &[u8]) -> Ordering {
    let (a_neg, a_scale, a_digits) = decode_decimal_key(a);
    let (b_neg, b_scale, b_digits) = decode_decimal_key(b);
    // Zero encodes with an empty coefficient.
    let sign = |neg: bool, digits: &[u8]| -> i8 {
        if digits.is_empty() {
            0
        } else if neg {
            -1
        } else {
            1
        }
    };
    let a_sign = sign(a_neg, a_digits);
    let b_sign = sign(b_neg, b_digits);
    if a_sign != b_sign {
        return a_sign.cmp(&b_sign);
    }
    if a_sign == 0 {
        return Ordering::Equal;
    }
    let magnitude = compare_magnitudes(a_digits, a_scale, b_digits, b_scale);
    if a_sign < 0 {
        magnitude.reverse()
    } else {
        magnitude
    }
}

fn compare_magnitudes(a_digits: &[u8], a_scale: u64, b_digits: &[u8], b_scale: u64) -> Ordering {
    // Coefficients carry no leading zeros, so the digit count left of
    // the point orders magnitudes first.
    let a_int = a_digits.len() as i64 - a_scale as i64;
    let b_int = b_digits.len() as i64 - b_scale as i64;
    if a_int != b_int {
        return a_int.cmp(&b_int);
    }
    let max = a_digits.len().max(b_digits.len());
    for i in 0..max {
        let x = a_digits.get(i).copied().unwrap_or(b'0');
        let y = b_digits.get(i).copied().unwrap_or(b'0');
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}
