//! ID assignment, ancestor index and cycle detection
//!
//! [`assign_ids`] walks `global_decls` in declaration order, descending
//! depth-first into anonymous types, local elements and local
//! attributes, and produces a [`Registry`]: three dense ID spaces (each
//! starting at 1, with 0 reserved for "none"), pointer-keyed tables for
//! the locals, and a per-type ancestor index. The source schema is
//! never mutated.
//!
//! Cycle detection runs before the ancestor index is built, one
//! white/gray/black pass per reference graph: type derivation, model
//! groups, attribute groups, substitution groups. Each cycle error
//! names the component where the cycle closes, so the report is stable
//! across runs.

use crate::error::{ComponentKind, Error, Result};
use crate::model::{
    ComplexType, ContentType, DerivationMethod, DerivationSet, GlobalDecl, ModelGroup, Schema,
    SimpleDerivation, SimpleType, Term, TypeDef,
};
use crate::namespaces::QName;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Dense type ID; 0 means "no type".
pub type TypeId = u32;
/// Dense element ID; 0 means "no element".
pub type ElemId = u32;
/// Dense attribute ID; 0 means "no attribute".
pub type AttrId = u32;

fn ptr_key<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as usize
}

fn missing(kind: ComponentKind, name: &QName) -> Error {
    Error::MissingGlobalDecl {
        kind,
        name: name.clone(),
    }
}

/// One ancestor entry: the ancestor's type ID and the union of the
/// derivation methods on the path from the type up to that ancestor.
pub type Ancestor = (TypeId, DerivationSet);

/// The ID registry produced by [`assign_ids`].
#[derive(Debug, Default)]
pub struct Registry {
    named_types: FxHashMap<QName, TypeId>,
    anon_types: FxHashMap<usize, TypeId>,
    global_elements: FxHashMap<QName, ElemId>,
    local_elements: FxHashMap<usize, ElemId>,
    global_attributes: FxHashMap<QName, AttrId>,
    local_attributes: FxHashMap<usize, AttrId>,
    // Flat ancestor storage: one contiguous span per type ID.
    ancestors: Vec<Ancestor>,
    ancestor_spans: Vec<(u32, u32)>,
    type_count: u32,
    elem_count: u32,
    attr_count: u32,
}

impl Registry {
    /// Number of assigned type IDs.
    pub fn type_count(&self) -> u32 {
        self.type_count
    }

    /// Number of assigned element IDs.
    pub fn element_count(&self) -> u32 {
        self.elem_count
    }

    /// Number of assigned attribute IDs.
    pub fn attribute_count(&self) -> u32 {
        self.attr_count
    }

    /// ID of a named type; 0 if unknown.
    pub fn type_id(&self, name: &QName) -> TypeId {
        self.named_types.get(name).copied().unwrap_or(0)
    }

    /// ID of a type definition, anonymous or named; 0 for built-ins
    /// and unknowns.
    pub fn type_id_of(&self, type_def: &TypeDef) -> TypeId {
        match type_def {
            TypeDef::Builtin(_) => 0,
            TypeDef::Simple(st) => self.simple_type_id(st),
            TypeDef::Complex(ct) => self.complex_type_id(ct),
        }
    }

    /// ID of a simple type instance.
    pub fn simple_type_id(&self, st: &Arc<SimpleType>) -> TypeId {
        if st.is_anonymous() || st.builtin.is_some() {
            self.anon_types.get(&ptr_key(st)).copied().unwrap_or(0)
        } else {
            self.type_id(&st.name)
        }
    }

    /// ID of a complex type instance.
    pub fn complex_type_id(&self, ct: &Arc<ComplexType>) -> TypeId {
        if ct.is_anonymous() {
            self.anon_types.get(&ptr_key(ct)).copied().unwrap_or(0)
        } else {
            self.type_id(&ct.name)
        }
    }

    /// ID of a global element; 0 if unknown.
    pub fn element_id(&self, name: &QName) -> ElemId {
        self.global_elements.get(name).copied().unwrap_or(0)
    }

    /// ID of a local element declaration; 0 if unknown.
    pub fn local_element_id(&self, decl: &Arc<crate::model::ElementDecl>) -> ElemId {
        self.local_elements.get(&ptr_key(decl)).copied().unwrap_or(0)
    }

    /// ID of a global attribute; 0 if unknown.
    pub fn attribute_id(&self, name: &QName) -> AttrId {
        self.global_attributes.get(name).copied().unwrap_or(0)
    }

    /// ID of a local attribute declaration; 0 if unknown.
    pub fn local_attribute_id(&self, decl: &Arc<crate::model::AttributeDecl>) -> AttrId {
        self.local_attributes.get(&ptr_key(decl)).copied().unwrap_or(0)
    }

    /// Ancestor slice for a type ID, from the parent up the chain.
    /// Chains stop before the XSD namespace: built-in bases are not
    /// recorded.
    pub fn ancestors(&self, id: TypeId) -> &[Ancestor] {
        match self.ancestor_spans.get(id as usize) {
            Some(&(off, len)) => &self.ancestors[off as usize..(off + len) as usize],
            None => &[],
        }
    }

    fn alloc_type(&mut self) -> TypeId {
        self.type_count += 1;
        self.type_count
    }

    fn alloc_elem(&mut self) -> ElemId {
        self.elem_count += 1;
        self.elem_count
    }

    fn alloc_attr(&mut self) -> AttrId {
        self.attr_count += 1;
        self.attr_count
    }
}

/// Assign dense IDs in declaration order, verify the reference graphs
/// are acyclic, and build the ancestor index.
pub fn assign_ids(schema: &Schema) -> Result<Registry> {
    let mut walker = IdWalker {
        registry: Registry::default(),
        types_in_order: Vec::new(),
    };

    for decl in &schema.global_decls {
        match decl {
            GlobalDecl::Type(name) => {
                let type_def = schema
                    .types
                    .get(name)
                    .ok_or_else(|| missing(ComponentKind::Type, name))?;
                walker.visit_type(type_def)?;
            }
            GlobalDecl::Element(name) => {
                let decl = schema
                    .elements
                    .get(name)
                    .ok_or_else(|| missing(ComponentKind::Element, name))?;
                let id = walker.registry.alloc_elem();
                if walker
                    .registry
                    .global_elements
                    .insert(name.clone(), id)
                    .is_some()
                {
                    return Err(Error::InvalidIdAssignment(format!("duplicate declaration {name}")));
                }
                if let Some(inline) = &decl.inline_type {
                    walker.visit_type(inline)?;
                }
            }
            GlobalDecl::Attribute(name) => {
                let decl = schema
                    .attributes
                    .get(name)
                    .ok_or_else(|| missing(ComponentKind::Attribute, name))?;
                let id = walker.registry.alloc_attr();
                if walker
                    .registry
                    .global_attributes
                    .insert(name.clone(), id)
                    .is_some()
                {
                    return Err(Error::InvalidIdAssignment(format!("duplicate declaration {name}")));
                }
                if let Some(inline) = &decl.inline_type {
                    walker.visit_simple(inline)?;
                }
            }
            GlobalDecl::Group(name) => {
                let def = schema
                    .groups
                    .get(name)
                    .ok_or_else(|| missing(ComponentKind::Group, name))?;
                walker.visit_group(&def.group)?;
            }
            GlobalDecl::AttributeGroup(name) => {
                let def = schema
                    .attribute_groups
                    .get(name)
                    .ok_or_else(|| missing(ComponentKind::AttributeGroup, name))?;
                for use_ in &def.attributes {
                    walker.visit_attribute_use(use_)?;
                }
            }
        }
    }

    detect_type_cycles(schema)?;
    detect_group_cycles(schema)?;
    detect_attribute_group_cycles(schema)?;
    detect_substitution_cycles(schema)?;

    let mut registry = walker.registry;
    build_ancestor_index(schema, &mut registry, &walker.types_in_order);
    Ok(registry)
}

struct IdWalker {
    registry: Registry,
    // Types in ID order, for the ancestor-index pass.
    types_in_order: Vec<TypeDef>,
}

impl IdWalker {
    fn visit_type(&mut self, type_def: &TypeDef) -> Result<()> {
        match type_def {
            TypeDef::Builtin(_) => Ok(()),
            TypeDef::Simple(st) => self.visit_simple(st),
            TypeDef::Complex(ct) => self.visit_complex(ct),
        }
    }

    fn visit_simple(&mut self, st: &Arc<SimpleType>) -> Result<()> {
        let id = self.registry.alloc_type();
        if st.is_anonymous() {
            self.registry.anon_types.insert(ptr_key(st), id);
        } else if self
            .registry
            .named_types
            .insert(st.name.clone(), id)
            .is_some()
        {
            return Err(Error::InvalidIdAssignment(format!("duplicate type {}", st.name)));
        }
        self.types_in_order.push(TypeDef::Simple(st.clone()));

        match &st.derivation {
            SimpleDerivation::Restriction { inline_base, .. } => {
                if let Some(base) = inline_base {
                    self.visit_simple(base)?;
                }
            }
            SimpleDerivation::List { inline_item, .. } => {
                if let Some(item) = inline_item {
                    self.visit_simple(item)?;
                }
            }
            SimpleDerivation::Union { inline_members, .. } => {
                for member in inline_members {
                    self.visit_simple(member)?;
                }
            }
        }
        Ok(())
    }

    fn visit_complex(&mut self, ct: &Arc<ComplexType>) -> Result<()> {
        let id = self.registry.alloc_type();
        if ct.is_anonymous() {
            self.registry.anon_types.insert(ptr_key(ct), id);
        } else if self
            .registry
            .named_types
            .insert(ct.name.clone(), id)
            .is_some()
        {
            return Err(Error::InvalidIdAssignment(format!("duplicate type {}", ct.name)));
        }
        self.types_in_order.push(TypeDef::Complex(ct.clone()));

        match &ct.content {
            ContentType::Simple {
                inline: Some(st), ..
            } => self.visit_simple(st)?,
            ContentType::ElementOnly(particle) | ContentType::Mixed(particle) => {
                self.visit_particle_term(&particle.term)?;
            }
            _ => {}
        }
        for use_ in &ct.attributes {
            self.visit_attribute_use(use_)?;
        }
        Ok(())
    }

    fn visit_particle_term(&mut self, term: &Term) -> Result<()> {
        match term {
            Term::Element(decl) => {
                if !decl.is_reference() {
                    let id = self.registry.alloc_elem();
                    self.registry.local_elements.insert(ptr_key(decl), id);
                    if let Some(inline) = &decl.inline_type {
                        self.visit_type(inline)?;
                    }
                }
                Ok(())
            }
            Term::Group(group) => self.visit_group(group),
            Term::GroupRef(_) | Term::Wildcard(_) => Ok(()),
        }
    }

    fn visit_group(&mut self, group: &ModelGroup) -> Result<()> {
        for particle in &group.particles {
            self.visit_particle_term(&particle.term)?;
        }
        Ok(())
    }

    fn visit_attribute_use(&mut self, use_: &crate::model::AttributeUse) -> Result<()> {
        if !use_.decl.is_reference() {
            let id = self.registry.alloc_attr();
            self.registry.local_attributes.insert(ptr_key(&use_.decl), id);
            if let Some(inline) = &use_.decl.inline_type {
                self.visit_simple(inline)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Cycle detection
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Coloring {
    colors: FxHashMap<QName, Color>,
}

impl Coloring {
    fn new() -> Self {
        Self {
            colors: FxHashMap::default(),
        }
    }

    fn color(&self, name: &QName) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::White)
    }
}

/// The derivation step targets of a type: the names a cycle could
/// thread through. Inline anonymous types are traversed in place.
fn derivation_targets(type_def: &TypeDef, out: &mut Vec<QName>) {
    match type_def {
        TypeDef::Builtin(_) => {}
        TypeDef::Simple(st) => simple_targets(st, out),
        TypeDef::Complex(ct) => {
            if !ct.base.is_xsd() {
                out.push(ct.base.clone());
            }
            if let ContentType::Simple { base, inline } = &ct.content {
                if !base.is_zero() && !base.is_xsd() {
                    out.push(base.clone());
                }
                if let Some(st) = inline {
                    simple_targets(st, out);
                }
            }
        }
    }
}

fn simple_targets(st: &Arc<SimpleType>, out: &mut Vec<QName>) {
    match &st.derivation {
        SimpleDerivation::Restriction {
            base, inline_base, ..
        } => {
            if !base.is_zero() && !base.is_xsd() {
                out.push(base.clone());
            }
            if let Some(inline) = inline_base {
                simple_targets(inline, out);
            }
        }
        SimpleDerivation::List { item, inline_item } => {
            if !item.is_zero() && !item.is_xsd() {
                out.push(item.clone());
            }
            if let Some(inline) = inline_item {
                simple_targets(inline, out);
            }
        }
        SimpleDerivation::Union {
            members,
            inline_members,
        } => {
            for member in members {
                if !member.is_xsd() {
                    out.push(member.clone());
                }
            }
            for inline in inline_members {
                simple_targets(inline, out);
            }
        }
    }
}

fn detect_type_cycles(schema: &Schema) -> Result<()> {
    let mut coloring = Coloring::new();
    for name in schema.types.keys() {
        visit_type_node(schema, name, &mut coloring)?;
    }
    Ok(())
}

fn visit_type_node(schema: &Schema, name: &QName, coloring: &mut Coloring) -> Result<()> {
    match coloring.color(name) {
        Color::Black => return Ok(()),
        Color::Gray => return Err(Error::TypeCycle(name.clone())),
        Color::White => {}
    }
    let Some(type_def) = schema.types.get(name) else {
        // Dangling bases are the resolver's problem; they cannot close
        // a cycle.
        return Ok(());
    };
    coloring.colors.insert(name.clone(), Color::Gray);
    let mut targets = Vec::new();
    derivation_targets(type_def, &mut targets);
    for target in &targets {
        visit_type_node(schema, target, coloring)?;
    }
    coloring.colors.insert(name.clone(), Color::Black);
    Ok(())
}

fn group_refs(group: &ModelGroup, out: &mut Vec<QName>) {
    for particle in &group.particles {
        match &particle.term {
            Term::GroupRef(name) => out.push(name.clone()),
            Term::Group(nested) => group_refs(nested, out),
            Term::Element(_) | Term::Wildcard(_) => {}
        }
    }
}

fn detect_group_cycles(schema: &Schema) -> Result<()> {
    let mut coloring = Coloring::new();
    for name in schema.groups.keys() {
        visit_group_node(schema, name, &mut coloring)?;
    }
    Ok(())
}

fn visit_group_node(schema: &Schema, name: &QName, coloring: &mut Coloring) -> Result<()> {
    match coloring.color(name) {
        Color::Black => return Ok(()),
        Color::Gray => return Err(Error::GroupCycle(name.clone())),
        Color::White => {}
    }
    let Some(def) = schema.groups.get(name) else {
        return Ok(());
    };
    coloring.colors.insert(name.clone(), Color::Gray);
    let mut refs = Vec::new();
    group_refs(&def.group, &mut refs);
    for target in &refs {
        visit_group_node(schema, target, coloring)?;
    }
    coloring.colors.insert(name.clone(), Color::Black);
    Ok(())
}

fn detect_attribute_group_cycles(schema: &Schema) -> Result<()> {
    let mut coloring = Coloring::new();
    for name in schema.attribute_groups.keys() {
        visit_attribute_group_node(schema, name, &mut coloring)?;
    }
    Ok(())
}

fn visit_attribute_group_node(schema: &Schema, name: &QName, coloring: &mut Coloring) -> Result<()> {
    match coloring.color(name) {
        Color::Black => return Ok(()),
        Color::Gray => return Err(Error::AttributeGroupCycle(name.clone())),
        Color::White => {}
    }
    let Some(def) = schema.attribute_groups.get(name) else {
        return Ok(());
    };
    coloring.colors.insert(name.clone(), Color::Gray);
    for target in &def.attribute_groups {
        visit_attribute_group_node(schema, target, coloring)?;
    }
    coloring.colors.insert(name.clone(), Color::Black);
    Ok(())
}

fn detect_substitution_cycles(schema: &Schema) -> Result<()> {
    let mut coloring = Coloring::new();
    for name in schema.elements.keys() {
        visit_substitution_node(schema, name, &mut coloring)?;
    }
    Ok(())
}

fn visit_substitution_node(schema: &Schema, name: &QName, coloring: &mut Coloring) -> Result<()> {
    match coloring.color(name) {
        Color::Black => return Ok(()),
        Color::Gray => return Err(Error::SubstitutionGroupCycle(name.clone())),
        Color::White => {}
    }
    let Some(decl) = schema.elements.get(name) else {
        return Ok(());
    };
    coloring.colors.insert(name.clone(), Color::Gray);
    if let Some(head) = &decl.substitution_group {
        visit_substitution_node(schema, head, coloring)?;
    }
    coloring.colors.insert(name.clone(), Color::Black);
    Ok(())
}

// =============================================================================
// Ancestor index
// =============================================================================

/// One derivation step: the base the chain continues through plus the
/// method bit it contributes to the cumulative mask.
fn base_step(schema: &Schema, type_def: &TypeDef) -> Option<(TypeDef, DerivationSet)> {
    match type_def {
        TypeDef::Builtin(_) => None,
        TypeDef::Simple(st) => {
            let (name, inline, method) = match &st.derivation {
                SimpleDerivation::Restriction {
                    base, inline_base, ..
                } => (base, inline_base, DerivationSet::RESTRICTION),
                SimpleDerivation::List { item, inline_item } => {
                    (item, inline_item, DerivationSet::LIST)
                }
                SimpleDerivation::Union {
                    members,
                    inline_members,
                } => {
                    // The chain continues through the first member.
                    if let Some(first) = members.first() {
                        return resolve_base(schema, first).map(|t| (t, DerivationSet::UNION));
                    }
                    return inline_members
                        .first()
                        .map(|st| (TypeDef::Simple(st.clone()), DerivationSet::UNION));
                }
            };
            if let Some(inline) = inline {
                return Some((TypeDef::Simple(inline.clone()), method));
            }
            resolve_base(schema, name).map(|t| (t, method))
        }
        TypeDef::Complex(ct) => {
            let method = ct.derivation.as_set();
            if let ContentType::Simple {
                base,
                inline: Some(st),
            } = &ct.content
            {
                if base.is_zero() {
                    return Some((TypeDef::Simple(st.clone()), method));
                }
            }
            if let ContentType::Simple { base, inline: None } = &ct.content {
                if !base.is_zero() {
                    return resolve_base(schema, base).map(|t| (t, method));
                }
            }
            resolve_base(schema, &ct.base).map(|t| (t, method))
        }
    }
}

fn resolve_base(schema: &Schema, name: &QName) -> Option<TypeDef> {
    // The XSD namespace terminates a chain: built-in bases are not
    // recorded as ancestors.
    if name.is_zero() || name.is_xsd() {
        return None;
    }
    schema.types.get(name).cloned()
}

fn build_ancestor_index(schema: &Schema, registry: &mut Registry, types_in_order: &[TypeDef]) {
    let count = registry.type_count as usize;
    let mut spans = vec![(0u32, 0u32); count + 1];
    let mut flat = Vec::new();

    for type_def in types_in_order {
        let id = registry.type_id_of(type_def);
        let off = flat.len() as u32;
        let mut mask = DerivationSet::EMPTY;
        let mut current = type_def.clone();
        while let Some((base, method)) = base_step(schema, &current) {
            mask = mask.union(method);
            let base_id = registry.type_id_of(&base);
            if base_id == 0 {
                break;
            }
            flat.push((base_id, mask));
            current = base;
        }
        spans[id as usize] = (off, flat.len() as u32 - off);
    }

    registry.ancestors = flat;
    registry.ancestor_spans = spans;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::ElementDecl;
    use crate::model::ModelGroupDef;
    use crate::model::{AttributeGroupDef, Compositor, Occurs, Particle};

    fn simple(ns: &str, local: &str, base: QName) -> TypeDef {
        TypeDef::Simple(Arc::new(SimpleType::new(
            QName::new(ns, local),
            SimpleDerivation::Restriction {
                base,
                inline_base: None,
                facets: vec![],
            },
        )))
    }

    #[test]
    fn test_ids_dense_from_one_in_declaration_order() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::xsd("string")));
        schema.add_type(simple("urn:t", "b", QName::new("urn:t", "a")));
        schema.add_element(ElementDecl::new(
            QName::new("urn:t", "e"),
            QName::new("urn:t", "a"),
        ));

        let registry = assign_ids(&schema).unwrap();
        assert_eq!(registry.type_id(&QName::new("urn:t", "a")), 1);
        assert_eq!(registry.type_id(&QName::new("urn:t", "b")), 2);
        assert_eq!(registry.element_id(&QName::new("urn:t", "e")), 1);
        assert_eq!(registry.type_count(), 2);
        assert_eq!(registry.type_id(&QName::new("urn:t", "missing")), 0);
    }

    #[test]
    fn test_missing_global_decl() {
        let mut schema = Schema::new("urn:t");
        schema
            .global_decls
            .push(GlobalDecl::Type(QName::new("urn:t", "ghost")));
        assert!(matches!(
            assign_ids(&schema),
            Err(Error::MissingGlobalDecl { .. })
        ));
    }

    #[test]
    fn test_anonymous_inline_base_gets_id() {
        let inline = Arc::new(SimpleType::new(
            QName::zero(),
            SimpleDerivation::Restriction {
                base: QName::xsd("token"),
                inline_base: None,
                facets: vec![],
            },
        ));
        let outer = Arc::new(SimpleType::new(
            QName::new("urn:t", "outer"),
            SimpleDerivation::Restriction {
                base: QName::zero(),
                inline_base: Some(inline.clone()),
                facets: vec![],
            },
        ));
        let mut schema = Schema::new("urn:t");
        schema.add_type(TypeDef::Simple(outer));

        let registry = assign_ids(&schema).unwrap();
        assert_eq!(registry.type_id(&QName::new("urn:t", "outer")), 1);
        assert_eq!(registry.simple_type_id(&inline), 2);
    }

    #[test]
    fn test_local_elements_and_attributes_in_visit_order() {
        let child = Arc::new(ElementDecl::new(
            QName::local("child"),
            QName::xsd("string"),
        ));
        let mut ct = ComplexType::new(QName::new("urn:t", "ct"));
        ct.content = ContentType::ElementOnly(Particle::new(
            crate::model::Term::Group(ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![Particle::new(
                    crate::model::Term::Element(child.clone()),
                    Occurs::once(),
                )],
            }),
            Occurs::once(),
        ));
        let mut schema = Schema::new("urn:t");
        schema.add_type(TypeDef::Complex(Arc::new(ct)));

        let registry = assign_ids(&schema).unwrap();
        assert_eq!(registry.local_element_id(&child), 1);
    }

    #[test]
    fn test_type_cycle_detected() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::new("urn:t", "b")));
        schema.add_type(simple("urn:t", "b", QName::new("urn:t", "a")));

        match assign_ids(&schema) {
            Err(Error::TypeCycle(name)) => assert_eq!(name.namespace, "urn:t"),
            other => panic!("expected type cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_derivation_is_a_cycle() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::new("urn:t", "a")));
        assert!(matches!(assign_ids(&schema), Err(Error::TypeCycle(_))));
    }

    #[test]
    fn test_group_cycle_detected() {
        let mut schema = Schema::new("urn:t");
        schema.add_group(ModelGroupDef {
            name: QName::new("urn:t", "g1"),
            group: ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![Particle::new(
                    crate::model::Term::GroupRef(QName::new("urn:t", "g2")),
                    Occurs::once(),
                )],
            },
        });
        schema.add_group(ModelGroupDef {
            name: QName::new("urn:t", "g2"),
            group: ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![Particle::new(
                    crate::model::Term::GroupRef(QName::new("urn:t", "g1")),
                    Occurs::once(),
                )],
            },
        });
        assert!(matches!(assign_ids(&schema), Err(Error::GroupCycle(_))));
    }

    #[test]
    fn test_attribute_group_cycle_detected() {
        let mut g1 = AttributeGroupDef::new(QName::new("urn:t", "ag1"));
        g1.attribute_groups.push(QName::new("urn:t", "ag2"));
        let mut g2 = AttributeGroupDef::new(QName::new("urn:t", "ag2"));
        g2.attribute_groups.push(QName::new("urn:t", "ag1"));

        let mut schema = Schema::new("urn:t");
        schema.add_attribute_group(g1);
        schema.add_attribute_group(g2);
        assert!(matches!(
            assign_ids(&schema),
            Err(Error::AttributeGroupCycle(_))
        ));
    }

    #[test]
    fn test_substitution_cycle_detected() {
        let mut e1 = ElementDecl::new(QName::new("urn:t", "e1"), QName::xsd("string"));
        e1.substitution_group = Some(QName::new("urn:t", "e2"));
        let mut e2 = ElementDecl::new(QName::new("urn:t", "e2"), QName::xsd("string"));
        e2.substitution_group = Some(QName::new("urn:t", "e1"));

        let mut schema = Schema::new("urn:t");
        schema.add_element(e1);
        schema.add_element(e2);
        assert!(matches!(
            assign_ids(&schema),
            Err(Error::SubstitutionGroupCycle(_))
        ));
    }

    #[test]
    fn test_ancestor_chain_with_cumulative_mask() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::xsd("token")));
        schema.add_type(simple("urn:t", "b", QName::new("urn:t", "a")));
        schema.add_type(simple("urn:t", "c", QName::new("urn:t", "b")));

        let registry = assign_ids(&schema).unwrap();
        let c = registry.type_id(&QName::new("urn:t", "c"));
        let chain = registry.ancestors(c);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].0, registry.type_id(&QName::new("urn:t", "b")));
        assert_eq!(chain[1].0, registry.type_id(&QName::new("urn:t", "a")));
        for (_, mask) in chain {
            assert!(mask.contains(DerivationSet::RESTRICTION));
        }
        // The chain stops before xs:token.
        assert!(registry
            .ancestors(registry.type_id(&QName::new("urn:t", "a")))
            .is_empty());
    }

    #[test]
    fn test_ancestor_mask_accumulates_list() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "item", QName::xsd("NCName")));
        schema.add_type(TypeDef::Simple(Arc::new(SimpleType::new(
            QName::new("urn:t", "items"),
            SimpleDerivation::List {
                item: QName::new("urn:t", "item"),
                inline_item: None,
            },
        ))));
        schema.add_type(simple("urn:t", "short-items", QName::new("urn:t", "items")));

        let registry = assign_ids(&schema).unwrap();
        let leaf = registry.type_id(&QName::new("urn:t", "short-items"));
        let chain = registry.ancestors(leaf);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].1, DerivationSet::RESTRICTION);
        assert_eq!(
            chain[1].1,
            DerivationSet::RESTRICTION.union(DerivationSet::LIST)
        );
    }
}
