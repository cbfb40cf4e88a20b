//! Effective attribute uses of complex types
//!
//! Assembles, for one complex type, the complete attribute-use list and
//! effective attribute wildcard. The derivation chain is replayed from
//! base to leaf; at each step the local declarations merge with the
//! transitive closure of named attribute-group references (memoized,
//! with prohibited uses from groups dropped per the W3C errata), and the
//! step's wildcards intersect. Across steps, extension unions wildcards
//! while restriction must stay within the base's wildcard.
//!
//! The final list is sorted by effective QName, namespace before local,
//! so emission order is deterministic.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cos-aw-intersect

use crate::error::{Error, ComponentKind, Result};
use crate::model::{
    AttributeUse, ComplexType, DerivationMethod, Intersection, RestrictionCheck, Schema, TypeDef,
    Use, Wildcard,
};
use crate::namespaces::QName;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// The flattened content of a named attribute group: its own uses plus
/// everything reached through nested group references.
#[derive(Debug, Clone)]
pub struct GroupClosure {
    /// Attribute uses in traversal order, prohibitions dropped
    pub attributes: Vec<AttributeUse>,
    /// Intersection of the wildcards declared anywhere in the closure
    pub wildcard: Option<Wildcard>,
}

/// Assembler with a memoized attribute-group closure table, reusable
/// across the complex types of one schema.
pub struct AttributeUseAssembler<'a> {
    schema: &'a Schema,
    closures: IndexMap<QName, Arc<GroupClosure>>,
    in_progress: FxHashSet<QName>,
}

/// One-shot convenience around [`AttributeUseAssembler`].
pub fn collect_attribute_uses(
    schema: &Schema,
    ct: &Arc<ComplexType>,
) -> Result<(Vec<AttributeUse>, Option<Wildcard>)> {
    AttributeUseAssembler::new(schema).collect(ct)
}

impl<'a> AttributeUseAssembler<'a> {
    /// Create an assembler for `schema`.
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            closures: IndexMap::new(),
            in_progress: FxHashSet::default(),
        }
    }

    /// The effective attribute uses and wildcard of `ct`.
    pub fn collect(
        &mut self,
        ct: &Arc<ComplexType>,
    ) -> Result<(Vec<AttributeUse>, Option<Wildcard>)> {
        let chain = self.derivation_chain(ct)?;

        let mut acc: IndexMap<QName, AttributeUse> = IndexMap::new();
        let mut acc_wildcard: Option<Wildcard> = None;

        for (index, step) in chain.iter().enumerate() {
            let (step_uses, step_wildcard) = self.assemble_step(step)?;

            if index == 0 {
                for use_ in step_uses {
                    acc.insert(use_.effective_name().clone(), use_);
                }
                acc_wildcard = step_wildcard;
                continue;
            }

            for use_ in step_uses {
                let name = use_.effective_name().clone();
                if use_.use_ == Use::Prohibited {
                    acc.shift_remove(&name);
                } else {
                    acc.insert(name, use_);
                }
            }

            acc_wildcard = match step.derivation {
                DerivationMethod::Extension => match (acc_wildcard, step_wildcard) {
                    (None, w) | (w, None) => w,
                    (Some(base), Some(local)) => Some(
                        base.union(&local)
                            .ok_or_else(|| Error::UnionNotExpressible(step.name.clone()))?,
                    ),
                },
                DerivationMethod::Restriction => match (acc_wildcard, step_wildcard) {
                    (None, Some(_)) => {
                        return Err(Error::RestrictionAddsWildcard(step.name.clone()))
                    }
                    (base, None) => base,
                    (Some(base), Some(derived)) => {
                        match derived.check_restriction_of(&base) {
                            RestrictionCheck::Ok => Some(derived),
                            RestrictionCheck::Weaker => {
                                return Err(Error::RestrictionWeakerThanBase(step.name.clone()))
                            }
                            RestrictionCheck::Empty => {
                                return Err(Error::RestrictionEmpty(step.name.clone()))
                            }
                            RestrictionCheck::NotExpressible => {
                                return Err(Error::RestrictionNotExpressible(step.name.clone()))
                            }
                        }
                    }
                },
            };
        }

        let mut uses: Vec<AttributeUse> = acc
            .into_values()
            .filter(|u| u.use_ != Use::Prohibited)
            .collect();
        uses.sort_by(|a, b| {
            let a = a.effective_name();
            let b = b.effective_name();
            (&a.namespace, &a.local).cmp(&(&b.namespace, &b.local))
        });
        Ok((uses, acc_wildcard))
    }

    /// The complex-type chain from base-most to `ct`. A base outside
    /// the complex-type table (built-in or simple) terminates it.
    fn derivation_chain(&self, ct: &Arc<ComplexType>) -> Result<Vec<Arc<ComplexType>>> {
        let mut chain = vec![ct.clone()];
        let mut seen: FxHashSet<QName> = FxHashSet::default();
        if !ct.is_anonymous() {
            seen.insert(ct.name.clone());
        }
        let mut current = ct.clone();
        while !current.base.is_xsd() && !current.base.is_zero() {
            if !seen.insert(current.base.clone()) {
                return Err(Error::TypeCycle(current.base.clone()));
            }
            match self.schema.types.get(&current.base) {
                Some(TypeDef::Complex(base)) => {
                    chain.push(base.clone());
                    current = base.clone();
                }
                _ => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// One chain step: local uses first, then group-contributed ones,
    /// with all wildcards of the step intersected.
    fn assemble_step(
        &mut self,
        ct: &Arc<ComplexType>,
    ) -> Result<(Vec<AttributeUse>, Option<Wildcard>)> {
        let mut uses: IndexMap<QName, AttributeUse> = IndexMap::new();
        for use_ in &ct.attributes {
            // Local declarations win over group-contributed duplicates.
            uses.entry(use_.effective_name().clone())
                .or_insert_with(|| use_.clone());
        }

        let mut wildcard = ct.wildcard.clone();
        for group_name in &ct.attribute_groups {
            let closure = self.group_closure(group_name)?;
            for use_ in &closure.attributes {
                uses.entry(use_.effective_name().clone())
                    .or_insert_with(|| use_.clone());
            }
            if let Some(group_wildcard) = &closure.wildcard {
                wildcard = Some(intersect_step(wildcard, group_wildcard, &ct.name)?);
            }
        }
        Ok((uses.into_values().collect(), wildcard))
    }

    /// Memoized transitive closure of a named attribute group.
    fn group_closure(&mut self, name: &QName) -> Result<Arc<GroupClosure>> {
        if let Some(closure) = self.closures.get(name) {
            return Ok(closure.clone());
        }
        if !self.in_progress.insert(name.clone()) {
            return Err(Error::AttributeGroupCycle(name.clone()));
        }
        let def = self
            .schema
            .attribute_groups
            .get(name)
            .ok_or_else(|| Error::DanglingRef {
                kind: ComponentKind::AttributeGroup,
                name: name.clone(),
            })?
            .clone();

        let mut attributes: Vec<AttributeUse> = def
            .attributes
            .iter()
            // Prohibited uses inside attribute groups are meaningless
            // and dropped (W3C errata E1-16).
            .filter(|u| u.use_ != Use::Prohibited)
            .cloned()
            .collect();
        let mut wildcard = def.wildcard.clone();

        for nested in &def.attribute_groups {
            let closure = self.group_closure(nested)?;
            attributes.extend(closure.attributes.iter().cloned());
            if let Some(nested_wildcard) = &closure.wildcard {
                wildcard = Some(intersect_step(wildcard, nested_wildcard, name)?);
            }
        }

        self.in_progress.remove(name);
        let closure = Arc::new(GroupClosure {
            attributes,
            wildcard,
        });
        self.closures.insert(name.clone(), closure.clone());
        Ok(closure)
    }
}

fn intersect_step(current: Option<Wildcard>, next: &Wildcard, owner: &QName) -> Result<Wildcard> {
    let Some(current) = current else {
        return Ok(next.clone());
    };
    match current.intersect(next) {
        Intersection::Expressible(w) => Ok(w),
        Intersection::Empty => Err(Error::IntersectionEmpty(owner.clone())),
        Intersection::NotExpressible => Err(Error::IntersectionNotExpressible(owner.clone())),
    }
}
