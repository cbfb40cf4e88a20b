//! XSD wildcards and the attribute-wildcard algebra
//!
//! Element wildcards (`xs:any`) carry occurrence bounds; attribute
//! wildcards (`xs:anyAttribute`) do not. The namespace-constraint
//! algebra implements the XSD 1.0 `cos-aw-intersect`, `cos-aw-union`
//! and `cos-ns-subset` rules, including the `notAbsent` constraint that
//! leaks into extension chains and the `##targetNamespace` placeholder
//! substituted with the wildcard's declared target namespace.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use crate::model::particles::Occurs;
use std::collections::BTreeSet;

/// Placeholder URI allowed inside a namespace list; stands for the
/// wildcard's declared target namespace.
pub const TARGET_NAMESPACE_SENTINEL: &str = "##targetNamespace";

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly: a declaration must be found
    #[default]
    Strict,
    /// Validate when a declaration is found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from the attribute's lexical value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Check if this mode is at least as strict as another
    /// (strict > lax > skip).
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Self::Strict, _) => true,
            (Self::Lax, Self::Skip) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint of a wildcard.
///
/// `List` constraints carry their members in the wildcard's
/// `namespaces` field; the members may include the empty string (no
/// namespace) and the `##targetNamespace` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsConstraint {
    /// Any namespace, including absent (`##any`)
    Any,
    /// Any namespace except the target namespace and absent (`##other`)
    Other,
    /// Exactly the target namespace
    TargetNamespace,
    /// Exactly the absent namespace (`##local`)
    Local,
    /// An explicit namespace list
    List,
    /// Any namespace except absent; arises from unions of `##other`
    /// wildcards with distinct targets
    NotAbsent,
}

/// A wildcard: constraint, namespace list, process-contents and the
/// declaring schema's target namespace. Attribute wildcards are exactly
/// this; element wildcards add occurrence bounds ([`AnyElement`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Wildcard {
    /// Namespace constraint variant
    pub constraint: NsConstraint,
    /// Namespace list for [`NsConstraint::List`]; empty string means no
    /// namespace, and [`TARGET_NAMESPACE_SENTINEL`] is substituted on use
    pub namespaces: Vec<String>,
    /// Process contents mode
    pub process_contents: ProcessContents,
    /// Target namespace of the declaring schema (empty for none)
    pub target_namespace: String,
}

/// Element wildcard: a [`Wildcard`] with occurrence bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyElement {
    /// The underlying wildcard
    pub wildcard: Wildcard,
    /// Occurrence bounds
    pub occurs: Occurs,
}

/// Outcome of a wildcard intersection. Emptiness is distinct from
/// inexpressibility: an empty intersection still has a meaning (no
/// namespace is allowed), while an inexpressible one has no XSD 1.0
/// constraint form at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    /// The intersection, expressed as a wildcard
    Expressible(Wildcard),
    /// The intersection allows no namespace
    Empty,
    /// The intersection has no XSD 1.0 expression
    NotExpressible,
}

/// Outcome of checking a derived wildcard against its base under
/// restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionCheck {
    /// The derived wildcard is a valid restriction
    Ok,
    /// The derived process-contents is weaker than the base's
    Weaker,
    /// The derived set reduces to the empty set against the base
    Empty,
    /// The derived set is not a subset of the base and the difference
    /// has no XSD 1.0 expression
    NotExpressible,
}

/// Semantic namespace set of a constraint: either everything, the
/// complement of a finite set, or a finite set. The empty string member
/// denotes the absent namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NsSet {
    Any,
    Not(BTreeSet<String>),
    Set(BTreeSet<String>),
}

impl Wildcard {
    /// Create a `##any` wildcard
    pub fn any(process_contents: ProcessContents, target_namespace: impl Into<String>) -> Self {
        Self {
            constraint: NsConstraint::Any,
            namespaces: Vec::new(),
            process_contents,
            target_namespace: target_namespace.into(),
        }
    }

    /// Create a `##other` wildcard
    pub fn other(process_contents: ProcessContents, target_namespace: impl Into<String>) -> Self {
        Self {
            constraint: NsConstraint::Other,
            namespaces: Vec::new(),
            process_contents,
            target_namespace: target_namespace.into(),
        }
    }

    /// Create an explicit-list wildcard
    pub fn list(
        namespaces: Vec<String>,
        process_contents: ProcessContents,
        target_namespace: impl Into<String>,
    ) -> Self {
        Self {
            constraint: NsConstraint::List,
            namespaces,
            process_contents,
            target_namespace: target_namespace.into(),
        }
    }

    /// The semantic namespace set, with the `##targetNamespace`
    /// placeholder substituted.
    fn ns_set(&self) -> NsSet {
        match self.constraint {
            NsConstraint::Any => NsSet::Any,
            NsConstraint::NotAbsent => NsSet::Not([String::new()].into_iter().collect()),
            NsConstraint::Other => NsSet::Not(
                [self.target_namespace.clone(), String::new()]
                    .into_iter()
                    .collect(),
            ),
            NsConstraint::TargetNamespace => {
                NsSet::Set([self.target_namespace.clone()].into_iter().collect())
            }
            NsConstraint::Local => NsSet::Set([String::new()].into_iter().collect()),
            NsConstraint::List => NsSet::Set(
                self.namespaces
                    .iter()
                    .map(|ns| {
                        if ns == TARGET_NAMESPACE_SENTINEL {
                            self.target_namespace.clone()
                        } else {
                            ns.clone()
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// Check whether a namespace URI (empty = absent) is allowed.
    pub fn allows(&self, namespace: &str) -> bool {
        match self.ns_set() {
            NsSet::Any => true,
            NsSet::Not(excluded) => !excluded.contains(namespace),
            NsSet::Set(allowed) => allowed.contains(namespace),
        }
    }

    /// Rebuild a wildcard around a computed namespace set, if the set
    /// has an XSD 1.0 expression. Complements are expressible only as
    /// `notAbsent` ({absent}) or `other` ({uri, absent}).
    fn from_ns_set(
        &self,
        set: NsSet,
        process_contents: ProcessContents,
    ) -> Option<Wildcard> {
        let mut result = Wildcard {
            constraint: NsConstraint::Any,
            namespaces: Vec::new(),
            process_contents,
            target_namespace: self.target_namespace.clone(),
        };
        match set {
            NsSet::Any => {}
            NsSet::Not(excluded) => {
                if excluded.len() == 1 && excluded.contains("") {
                    result.constraint = NsConstraint::NotAbsent;
                } else if excluded.len() == 2 && excluded.contains("") {
                    let uri = excluded.iter().find(|ns| !ns.is_empty()).cloned()?;
                    result.constraint = NsConstraint::Other;
                    result.target_namespace = uri;
                } else {
                    return None;
                }
            }
            NsSet::Set(members) => {
                result.constraint = NsConstraint::List;
                result.namespaces = members.into_iter().collect();
            }
        }
        Some(result)
    }

    /// Intersection per `cos-aw-intersect`. The result takes `self`'s
    /// process-contents (the effective wildcard of the declaring step).
    pub fn intersect(&self, other: &Wildcard) -> Intersection {
        let set = match (self.ns_set(), other.ns_set()) {
            (NsSet::Any, x) | (x, NsSet::Any) => x,
            (NsSet::Set(a), NsSet::Set(b)) => {
                NsSet::Set(a.intersection(&b).cloned().collect())
            }
            (NsSet::Not(excluded), NsSet::Set(s)) | (NsSet::Set(s), NsSet::Not(excluded)) => {
                NsSet::Set(s.difference(&excluded).cloned().collect())
            }
            (NsSet::Not(a), NsSet::Not(b)) => NsSet::Not(a.union(&b).cloned().collect()),
        };
        if let NsSet::Set(members) = &set {
            if members.is_empty() {
                return Intersection::Empty;
            }
        }
        match self.from_ns_set(set, self.process_contents) {
            Some(wildcard) => Intersection::Expressible(wildcard),
            None => Intersection::NotExpressible,
        }
    }

    /// Union per `cos-aw-union`. The result takes `self`'s
    /// process-contents. `None` means the union has no XSD 1.0
    /// expression.
    pub fn union(&self, other: &Wildcard) -> Option<Wildcard> {
        let set = match (self.ns_set(), other.ns_set()) {
            (NsSet::Any, _) | (_, NsSet::Any) => NsSet::Any,
            (NsSet::Set(a), NsSet::Set(b)) => NsSet::Set(a.union(&b).cloned().collect()),
            (NsSet::Not(excluded), NsSet::Set(s)) | (NsSet::Set(s), NsSet::Not(excluded)) => {
                let remaining: BTreeSet<String> =
                    excluded.difference(&s).cloned().collect();
                if remaining.is_empty() {
                    NsSet::Any
                } else {
                    NsSet::Not(remaining)
                }
            }
            (NsSet::Not(a), NsSet::Not(b)) => {
                let common: BTreeSet<String> = a.intersection(&b).cloned().collect();
                if common.is_empty() {
                    NsSet::Any
                } else {
                    NsSet::Not(common)
                }
            }
        };
        self.from_ns_set(set, self.process_contents)
    }

    /// Check `self` (derived) against `base` under restriction, per
    /// `cos-ns-subset` plus the process-contents ordering. On `Ok` the
    /// effective wildcard is `self` unchanged.
    pub fn check_restriction_of(&self, base: &Wildcard) -> RestrictionCheck {
        if !self.process_contents.is_restriction_of(&base.process_contents) {
            return RestrictionCheck::Weaker;
        }
        match (self.ns_set(), base.ns_set()) {
            (_, NsSet::Any) => RestrictionCheck::Ok,
            (NsSet::Set(d), NsSet::Set(b)) => {
                if d.is_subset(&b) {
                    RestrictionCheck::Ok
                } else if d.is_disjoint(&b) {
                    RestrictionCheck::Empty
                } else {
                    RestrictionCheck::NotExpressible
                }
            }
            (NsSet::Set(d), NsSet::Not(excluded)) => {
                if d.is_disjoint(&excluded) {
                    RestrictionCheck::Ok
                } else if d.is_subset(&excluded) {
                    // e.g. restricting ##other by ##local
                    RestrictionCheck::Empty
                } else {
                    RestrictionCheck::NotExpressible
                }
            }
            (NsSet::Not(d), NsSet::Not(b)) => {
                if b.is_subset(&d) {
                    RestrictionCheck::Ok
                } else {
                    RestrictionCheck::NotExpressible
                }
            }
            // An infinite derived set can never fit a finite base.
            (NsSet::Any, _) | (NsSet::Not(_), NsSet::Set(_)) => {
                RestrictionCheck::NotExpressible
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(namespaces: &[&str]) -> Wildcard {
        Wildcard::list(
            namespaces.iter().map(|s| s.to_string()).collect(),
            ProcessContents::Lax,
            "urn:tns",
        )
    }

    fn local() -> Wildcard {
        Wildcard {
            constraint: NsConstraint::Local,
            namespaces: Vec::new(),
            process_contents: ProcessContents::Lax,
            target_namespace: "urn:tns".into(),
        }
    }

    fn not_absent() -> Wildcard {
        Wildcard {
            constraint: NsConstraint::NotAbsent,
            namespaces: Vec::new(),
            process_contents: ProcessContents::Lax,
            target_namespace: "urn:tns".into(),
        }
    }

    #[test]
    fn test_process_contents_ordering() {
        assert!(ProcessContents::Strict.is_restriction_of(&ProcessContents::Lax));
        assert!(ProcessContents::Strict.is_restriction_of(&ProcessContents::Skip));
        assert!(ProcessContents::Lax.is_restriction_of(&ProcessContents::Skip));
        assert!(!ProcessContents::Lax.is_restriction_of(&ProcessContents::Strict));
        assert!(!ProcessContents::Skip.is_restriction_of(&ProcessContents::Lax));
    }

    #[test]
    fn test_allows() {
        let any = Wildcard::any(ProcessContents::Lax, "urn:tns");
        assert!(any.allows("urn:x"));
        assert!(any.allows(""));

        let other = Wildcard::other(ProcessContents::Lax, "urn:tns");
        assert!(other.allows("urn:x"));
        assert!(!other.allows("urn:tns"));
        assert!(!other.allows(""));

        let l = list(&["urn:a", ""]);
        assert!(l.allows("urn:a"));
        assert!(l.allows(""));
        assert!(!l.allows("urn:b"));
    }

    #[test]
    fn test_target_namespace_sentinel_substitution() {
        let l = list(&[TARGET_NAMESPACE_SENTINEL, "urn:a"]);
        assert!(l.allows("urn:tns"));
        assert!(l.allows("urn:a"));
        assert!(!l.allows("urn:b"));
    }

    #[test]
    fn test_intersect_any_is_identity() {
        let any = Wildcard::any(ProcessContents::Strict, "urn:tns");
        let l = list(&["urn:a"]);
        match any.intersect(&l) {
            Intersection::Expressible(w) => {
                assert_eq!(w.constraint, NsConstraint::List);
                assert_eq!(w.namespaces, vec!["urn:a".to_string()]);
                // Process contents comes from the left operand.
                assert_eq!(w.process_contents, ProcessContents::Strict);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_intersect_other_with_list_drops_target_and_absent() {
        let other = Wildcard::other(ProcessContents::Lax, "urn:tns");
        let l = list(&["urn:a", "urn:tns", ""]);
        match other.intersect(&l) {
            Intersection::Expressible(w) => {
                assert_eq!(w.namespaces, vec!["urn:a".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_intersect_disjoint_lists_is_empty() {
        assert_eq!(
            list(&["urn:a"]).intersect(&list(&["urn:b"])),
            Intersection::Empty
        );
    }

    #[test]
    fn test_intersect_two_others_distinct_targets_not_expressible() {
        let a = Wildcard::other(ProcessContents::Lax, "urn:a");
        let b = Wildcard::other(ProcessContents::Lax, "urn:b");
        assert_eq!(a.intersect(&b), Intersection::NotExpressible);
    }

    #[test]
    fn test_intersect_not_absent_with_local_is_empty() {
        // Preserved source behavior: notAbsent ∩ local is empty, not an
        // error about expressibility.
        assert_eq!(not_absent().intersect(&local()), Intersection::Empty);
    }

    #[test]
    fn test_union_two_others_distinct_targets_is_not_absent() {
        let a = Wildcard::other(ProcessContents::Lax, "urn:a");
        let b = Wildcard::other(ProcessContents::Lax, "urn:b");
        let u = a.union(&b).unwrap();
        assert_eq!(u.constraint, NsConstraint::NotAbsent);
    }

    #[test]
    fn test_union_other_with_list_containing_target() {
        let other = Wildcard::other(ProcessContents::Lax, "urn:tns");
        // List covers the target but not absent: union is notAbsent.
        let u = other.union(&list(&["urn:tns"])).unwrap();
        assert_eq!(u.constraint, NsConstraint::NotAbsent);

        // List covers both target and absent: union is any.
        let u = other.union(&list(&["urn:tns", ""])).unwrap();
        assert_eq!(u.constraint, NsConstraint::Any);
    }

    #[test]
    fn test_union_other_with_list_containing_absent_only_not_expressible() {
        let other = Wildcard::other(ProcessContents::Lax, "urn:tns");
        assert!(other.union(&list(&[""])).is_none());
    }

    #[test]
    fn test_union_of_lists() {
        let u = list(&["urn:a"]).union(&list(&["urn:b"])).unwrap();
        assert_eq!(u.constraint, NsConstraint::List);
        assert_eq!(
            u.namespaces,
            vec!["urn:a".to_string(), "urn:b".to_string()]
        );
    }

    #[test]
    fn test_restriction_list_under_any() {
        // Base {any, lax}, derived {list urn:a, strict}: valid.
        let base = Wildcard::any(ProcessContents::Lax, "urn:tns");
        let derived = Wildcard::list(
            vec!["urn:a".into()],
            ProcessContents::Strict,
            "urn:tns",
        );
        assert_eq!(derived.check_restriction_of(&base), RestrictionCheck::Ok);
    }

    #[test]
    fn test_restriction_any_under_list_rejected() {
        // Base {list urn:a, lax}, derived {any, lax}: not a subset.
        let base = list(&["urn:a"]);
        let derived = Wildcard::any(ProcessContents::Lax, "urn:tns");
        assert_eq!(
            derived.check_restriction_of(&base),
            RestrictionCheck::NotExpressible
        );
    }

    #[test]
    fn test_restriction_weaker_process_contents() {
        let base = Wildcard::any(ProcessContents::Strict, "urn:tns");
        let derived = Wildcard::any(ProcessContents::Lax, "urn:tns");
        assert_eq!(
            derived.check_restriction_of(&base),
            RestrictionCheck::Weaker
        );
    }

    #[test]
    fn test_restriction_of_other_by_local_is_empty() {
        let base = Wildcard::other(ProcessContents::Lax, "urn:tns");
        assert_eq!(local().check_restriction_of(&base), RestrictionCheck::Empty);
    }

    #[test]
    fn test_restriction_other_under_other() {
        let base = Wildcard::other(ProcessContents::Lax, "urn:tns");
        let same = Wildcard::other(ProcessContents::Strict, "urn:tns");
        assert_eq!(same.check_restriction_of(&base), RestrictionCheck::Ok);

        let different = Wildcard::other(ProcessContents::Strict, "urn:x");
        assert_eq!(
            different.check_restriction_of(&base),
            RestrictionCheck::NotExpressible
        );
    }

    #[test]
    fn test_restriction_list_subset() {
        let base = list(&["urn:a", "urn:b"]);
        assert_eq!(
            list(&["urn:a"]).check_restriction_of(&base),
            RestrictionCheck::Ok
        );
        assert_eq!(
            list(&["urn:c"]).check_restriction_of(&base),
            RestrictionCheck::Empty
        );
        assert_eq!(
            list(&["urn:a", "urn:c"]).check_restriction_of(&base),
            RestrictionCheck::NotExpressible
        );
    }
}
