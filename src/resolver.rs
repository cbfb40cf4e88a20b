//! Reference resolution
//!
//! [`resolve_references`] walks `global_decls` once and verifies that
//! every QName reference in the schema has a referent: type references
//! (built-in or global), element and attribute `ref=`s, model-group and
//! attribute-group references, and substitution-group heads. The walk
//! keeps per-component `{unseen, resolving, done}` state so a component
//! referenced transitively is processed exactly once, and it records
//! QName→ID maps for downstream consumers without mutating the schema.
//!
//! The first dangling reference aborts the phase.

use crate::analysis::{AttrId, ElemId, Registry, TypeId};
use crate::error::{ComponentKind, Error, Result};
use crate::model::{
    builtins, ContentType, GlobalDecl, ModelGroup, Schema, SimpleDerivation, SimpleType, Term,
    TypeDef,
};
use crate::namespaces::QName;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Dense model-group ID, following declaration order; 0 means "none".
pub type GroupId = u32;

fn missing(kind: ComponentKind, name: &QName) -> Error {
    Error::MissingGlobalDecl {
        kind,
        name: name.clone(),
    }
}

/// Reference maps produced by [`resolve_references`].
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    element_refs: FxHashMap<QName, ElemId>,
    attribute_refs: FxHashMap<QName, AttrId>,
    group_refs: FxHashMap<QName, GroupId>,
    type_refs: FxHashMap<QName, TypeId>,
}

impl ResolvedReferences {
    /// ID of a referenced global element; `None` if the name was never
    /// referenced.
    pub fn element_ref(&self, name: &QName) -> Option<ElemId> {
        self.element_refs.get(name).copied()
    }

    /// ID of a referenced global attribute.
    pub fn attribute_ref(&self, name: &QName) -> Option<AttrId> {
        self.attribute_refs.get(name).copied()
    }

    /// ID of a referenced named model group.
    pub fn group_ref(&self, name: &QName) -> Option<GroupId> {
        self.group_refs.get(name).copied()
    }

    /// ID of a referenced named type.
    pub fn type_ref(&self, name: &QName) -> Option<TypeId> {
        self.type_refs.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Resolving,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Type(QName),
    Element(QName),
    Attribute(QName),
    Group(QName),
    AttributeGroup(QName),
}

struct Resolver<'a> {
    schema: &'a Schema,
    registry: &'a Registry,
    states: FxHashMap<Key, State>,
    refs: ResolvedReferences,
}

/// Resolve every QName reference reachable from `global_decls`.
pub fn resolve_references(schema: &Schema, registry: &Registry) -> Result<ResolvedReferences> {
    let mut resolver = Resolver {
        schema,
        registry,
        states: FxHashMap::default(),
        refs: ResolvedReferences::default(),
    };

    for decl in &schema.global_decls {
        match decl {
            GlobalDecl::Type(name) => resolver.resolve_type_decl(name)?,
            GlobalDecl::Element(name) => resolver.resolve_element_decl(name)?,
            GlobalDecl::Attribute(name) => resolver.resolve_attribute_decl(name)?,
            GlobalDecl::Group(name) => resolver.resolve_group_decl(name)?,
            GlobalDecl::AttributeGroup(name) => resolver.resolve_attribute_group_decl(name)?,
        }
    }
    Ok(resolver.refs)
}

impl<'a> Resolver<'a> {
    /// Mark a component as entered; `false` means it is already being
    /// or has been processed.
    fn enter(&mut self, key: Key) -> bool {
        match self.states.get(&key) {
            Some(_) => false,
            None => {
                self.states.insert(key, State::Resolving);
                true
            }
        }
    }

    fn finish(&mut self, key: Key) {
        self.states.insert(key, State::Done);
    }

    /// A type reference: zero means inline/absent, the XSD namespace
    /// must name a built-in, anything else must be a global type.
    fn resolve_type_ref(&mut self, name: &QName) -> Result<()> {
        if name.is_zero() {
            return Ok(());
        }
        if name.is_xsd() {
            if builtins::get(&name.local).is_none() {
                return Err(Error::DanglingRef {
                    kind: ComponentKind::Type,
                    name: name.clone(),
                });
            }
            return Ok(());
        }
        if !self.schema.types.contains_key(name) {
            return Err(Error::DanglingRef {
                kind: ComponentKind::Type,
                name: name.clone(),
            });
        }
        let id = self.registry.type_id(name);
        self.refs.type_refs.insert(name.clone(), id);
        self.resolve_type_decl(name)
    }

    fn resolve_type_decl(&mut self, name: &QName) -> Result<()> {
        let key = Key::Type(name.clone());
        if !self.enter(key.clone()) {
            return Ok(());
        }
        let type_def = self
            .schema
            .types
            .get(name)
            .ok_or_else(|| missing(ComponentKind::Type, name))?;
        self.resolve_type_body(type_def)?;
        self.finish(key);
        Ok(())
    }

    fn resolve_type_body(&mut self, type_def: &TypeDef) -> Result<()> {
        match type_def {
            TypeDef::Builtin(_) => Ok(()),
            TypeDef::Simple(st) => self.resolve_simple_body(st),
            TypeDef::Complex(ct) => {
                self.resolve_type_ref(&ct.base)?;
                match &ct.content {
                    ContentType::Simple { base, inline } => {
                        self.resolve_type_ref(base)?;
                        if let Some(st) = inline {
                            self.resolve_simple_body(st)?;
                        }
                    }
                    ContentType::ElementOnly(particle) | ContentType::Mixed(particle) => {
                        self.resolve_term(&particle.term)?;
                    }
                    ContentType::Empty => {}
                }
                for use_ in &ct.attributes {
                    self.resolve_attribute_use(use_)?;
                }
                for group in &ct.attribute_groups {
                    self.resolve_attribute_group_ref(group)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_simple_body(&mut self, st: &Arc<SimpleType>) -> Result<()> {
        match &st.derivation {
            SimpleDerivation::Restriction {
                base, inline_base, ..
            } => {
                self.resolve_type_ref(base)?;
                if let Some(inline) = inline_base {
                    self.resolve_simple_body(inline)?;
                }
            }
            SimpleDerivation::List { item, inline_item } => {
                self.resolve_type_ref(item)?;
                if let Some(inline) = inline_item {
                    self.resolve_simple_body(inline)?;
                }
            }
            SimpleDerivation::Union {
                members,
                inline_members,
            } => {
                for member in members {
                    self.resolve_type_ref(member)?;
                }
                for inline in inline_members {
                    self.resolve_simple_body(inline)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_element_decl(&mut self, name: &QName) -> Result<()> {
        let key = Key::Element(name.clone());
        if !self.enter(key.clone()) {
            return Ok(());
        }
        let decl = self
            .schema
            .elements
            .get(name)
            .ok_or_else(|| missing(ComponentKind::Element, name))?
            .clone();
        self.resolve_type_ref(&decl.type_name)?;
        if let Some(inline) = &decl.inline_type {
            self.resolve_type_body(inline)?;
        }
        if let Some(head) = &decl.substitution_group {
            if !self.schema.elements.contains_key(head) {
                return Err(Error::DanglingRef {
                    kind: ComponentKind::SubstitutionGroup,
                    name: head.clone(),
                });
            }
            self.resolve_element_ref(head)?;
        }
        self.finish(key);
        Ok(())
    }

    fn resolve_element_ref(&mut self, name: &QName) -> Result<()> {
        if !self.schema.elements.contains_key(name) {
            return Err(Error::DanglingRef {
                kind: ComponentKind::Element,
                name: name.clone(),
            });
        }
        let id = self.registry.element_id(name);
        self.refs.element_refs.insert(name.clone(), id);
        self.resolve_element_decl(name)
    }

    fn resolve_attribute_decl(&mut self, name: &QName) -> Result<()> {
        let key = Key::Attribute(name.clone());
        if !self.enter(key.clone()) {
            return Ok(());
        }
        let decl = self
            .schema
            .attributes
            .get(name)
            .ok_or_else(|| missing(ComponentKind::Attribute, name))?
            .clone();
        self.resolve_type_ref(&decl.type_name)?;
        if let Some(inline) = &decl.inline_type {
            self.resolve_simple_body(inline)?;
        }
        self.finish(key);
        Ok(())
    }

    fn resolve_attribute_ref(&mut self, name: &QName) -> Result<()> {
        if !self.schema.attributes.contains_key(name) {
            return Err(Error::DanglingRef {
                kind: ComponentKind::Attribute,
                name: name.clone(),
            });
        }
        let id = self.registry.attribute_id(name);
        self.refs.attribute_refs.insert(name.clone(), id);
        self.resolve_attribute_decl(name)
    }

    fn resolve_attribute_use(&mut self, use_: &crate::model::AttributeUse) -> Result<()> {
        if let Some(target) = &use_.decl.reference {
            self.resolve_attribute_ref(target)
        } else {
            self.resolve_type_ref(&use_.decl.type_name)?;
            if let Some(inline) = &use_.decl.inline_type {
                self.resolve_simple_body(inline)?;
            }
            Ok(())
        }
    }

    fn resolve_group_decl(&mut self, name: &QName) -> Result<()> {
        let key = Key::Group(name.clone());
        if !self.enter(key.clone()) {
            return Ok(());
        }
        let def = self
            .schema
            .groups
            .get(name)
            .ok_or_else(|| missing(ComponentKind::Group, name))?
            .clone();
        self.resolve_group_body(&def.group)?;
        self.finish(key);
        Ok(())
    }

    fn resolve_group_ref(&mut self, name: &QName) -> Result<()> {
        let Some(index) = self.schema.groups.get_index_of(name) else {
            return Err(Error::DanglingRef {
                kind: ComponentKind::Group,
                name: name.clone(),
            });
        };
        self.refs.group_refs.insert(name.clone(), index as GroupId + 1);
        self.resolve_group_decl(name)
    }

    fn resolve_group_body(&mut self, group: &ModelGroup) -> Result<()> {
        for particle in &group.particles {
            self.resolve_term(&particle.term)?;
        }
        Ok(())
    }

    fn resolve_term(&mut self, term: &Term) -> Result<()> {
        match term {
            Term::Element(decl) => {
                if let Some(target) = &decl.reference {
                    self.resolve_element_ref(target)
                } else {
                    self.resolve_type_ref(&decl.type_name)?;
                    if let Some(inline) = &decl.inline_type {
                        self.resolve_type_body(inline)?;
                    }
                    Ok(())
                }
            }
            Term::Group(group) => self.resolve_group_body(group),
            Term::GroupRef(name) => self.resolve_group_ref(name),
            Term::Wildcard(_) => Ok(()),
        }
    }

    fn resolve_attribute_group_decl(&mut self, name: &QName) -> Result<()> {
        let key = Key::AttributeGroup(name.clone());
        if !self.enter(key.clone()) {
            return Ok(());
        }
        let def = self
            .schema
            .attribute_groups
            .get(name)
            .ok_or_else(|| missing(ComponentKind::AttributeGroup, name))?
            .clone();
        for use_ in &def.attributes {
            self.resolve_attribute_use(use_)?;
        }
        for nested in &def.attribute_groups {
            self.resolve_attribute_group_ref(nested)?;
        }
        self.finish(key);
        Ok(())
    }

    fn resolve_attribute_group_ref(&mut self, name: &QName) -> Result<()> {
        if !self.schema.attribute_groups.contains_key(name) {
            return Err(Error::DanglingRef {
                kind: ComponentKind::AttributeGroup,
                name: name.clone(),
            });
        }
        self.resolve_attribute_group_decl(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assign_ids;
    use crate::model::schema::{AttributeDecl, AttributeGroupDef, AttributeUse, ElementDecl};
    use crate::model::{ComplexType, Compositor, Occurs, Particle};

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

    fn resolve(schema: &Schema) -> Result<ResolvedReferences> {
        let registry = assign_ids(schema)?;
        resolve_references(schema, &registry)
    }

    #[test]
    fn test_resolves_builtin_and_user_bases() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::xsd("token")));
        schema.add_type(simple("urn:t", "b", QName::new("urn:t", "a")));

        let refs = resolve(&schema).unwrap();
        assert_eq!(
            refs.type_ref(&QName::new("urn:t", "a")),
            Some(1),
        );
    }

    #[test]
    fn test_dangling_type_base() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::new("urn:t", "missing")));

        match resolve(&schema) {
            Err(Error::DanglingRef { kind, name }) => {
                assert_eq!(kind, ComponentKind::Type);
                assert_eq!(name, QName::new("urn:t", "missing"));
            }
            other => panic!("expected dangling ref, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_builtin_name_is_dangling() {
        let mut schema = Schema::new("urn:t");
        schema.add_type(simple("urn:t", "a", QName::xsd("notAType")));
        assert!(matches!(
            resolve(&schema),
            Err(Error::DanglingRef {
                kind: ComponentKind::Type,
                ..
            })
        ));
    }

    #[test]
    fn test_element_ref_recorded() {
        let mut schema = Schema::new("urn:t");
        schema.add_element(ElementDecl::new(
            QName::new("urn:t", "head"),
            QName::xsd("string"),
        ));

        let mut referring = ElementDecl::new(QName::zero(), QName::zero());
        referring.reference = Some(QName::new("urn:t", "head"));
        let mut ct = ComplexType::new(QName::new("urn:t", "ct"));
        ct.content = ContentType::ElementOnly(Particle::new(
            Term::Group(crate::model::ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![Particle::new(
                    Term::Element(Arc::new(referring)),
                    Occurs::once(),
                )],
            }),
            Occurs::once(),
        ));
        schema.add_type(TypeDef::Complex(Arc::new(ct)));

        let refs = resolve(&schema).unwrap();
        assert_eq!(refs.element_ref(&QName::new("urn:t", "head")), Some(1));
    }

    #[test]
    fn test_dangling_substitution_group_head() {
        let mut decl = ElementDecl::new(QName::new("urn:t", "member"), QName::xsd("string"));
        decl.substitution_group = Some(QName::new("urn:t", "ghost"));
        let mut schema = Schema::new("urn:t");
        schema.add_element(decl);

        assert!(matches!(
            resolve(&schema),
            Err(Error::DanglingRef {
                kind: ComponentKind::SubstitutionGroup,
                ..
            })
        ));
    }

    #[test]
    fn test_dangling_attribute_group() {
        let mut ct = ComplexType::new(QName::new("urn:t", "ct"));
        ct.attribute_groups.push(QName::new("urn:t", "ghost"));
        let mut schema = Schema::new("urn:t");
        schema.add_type(TypeDef::Complex(Arc::new(ct)));

        assert!(matches!(
            resolve(&schema),
            Err(Error::DanglingRef {
                kind: ComponentKind::AttributeGroup,
                ..
            })
        ));
    }

    #[test]
    fn test_attribute_ref_recorded_through_group() {
        let mut schema = Schema::new("urn:t");
        schema.add_attribute(AttributeDecl::new(
            QName::new("urn:t", "id"),
            QName::xsd("ID"),
        ));

        let mut referring = AttributeDecl::new(QName::zero(), QName::zero());
        referring.reference = Some(QName::new("urn:t", "id"));
        let mut group = AttributeGroupDef::new(QName::new("urn:t", "common"));
        group
            .attributes
            .push(AttributeUse::optional(Arc::new(referring)));
        schema.add_attribute_group(group);

        let refs = resolve(&schema).unwrap();
        assert_eq!(refs.attribute_ref(&QName::new("urn:t", "id")), Some(1));
    }

    #[test]
    fn test_group_ref_ids_follow_declaration_order() {
        let mut schema = Schema::new("urn:t");
        let empty = crate::model::ModelGroup {
            compositor: Compositor::Sequence,
            particles: vec![],
        };
        schema.add_group(crate::model::ModelGroupDef {
            name: QName::new("urn:t", "g1"),
            group: empty.clone(),
        });
        schema.add_group(crate::model::ModelGroupDef {
            name: QName::new("urn:t", "g2"),
            group: crate::model::ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![Particle::new(
                    Term::GroupRef(QName::new("urn:t", "g1")),
                    Occurs::once(),
                )],
            },
        });

        let refs = resolve(&schema).unwrap();
        assert_eq!(refs.group_ref(&QName::new("urn:t", "g1")), Some(1));
        assert_eq!(refs.group_ref(&QName::new("urn:t", "g2")), None);
    }
}
