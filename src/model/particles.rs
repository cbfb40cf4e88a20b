//! XSD particles and content models
//!
//! A particle is an element declaration, a model group, a group
//! reference or an element wildcard, together with its occurrence
//! bounds. All-groups carry the XSD 1.0 constraints: `minOccurs` in
//! {0,1}, `maxOccurs` = 1, and every child with `maxOccurs` <= 1.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cParticles

use crate::model::wildcards::AnyElement;
use crate::namespaces::QName;
use std::sync::Arc;

use super::schema::ElementDecl;

/// Occurrence bounds for a particle (minOccurs, maxOccurs).
/// `None` for `max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this particle can be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if this particle has valid occurs restriction compared to
    /// another (derived range inside the base range).
    pub fn has_occurs_restriction(&self, base: &Occurs) -> bool {
        if self.min < base.min {
            return false;
        }
        if self.max == Some(0) {
            return true;
        }
        match (self.max, base.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a <= b,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Compositor of a model group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    /// `xs:sequence`
    Sequence,
    /// `xs:choice`
    Choice,
    /// `xs:all`
    All,
}

/// A model group: compositor plus child particles in declaration order.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Group compositor
    pub compositor: Compositor,
    /// Child particles in declaration order
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Validate the all-group constraints for this group when its
    /// enclosing particle has occurrence `occurs`.
    pub fn all_group_valid(&self, occurs: Occurs) -> bool {
        if self.compositor != Compositor::All {
            return true;
        }
        if occurs.min > 1 || occurs.max != Some(1) {
            return false;
        }
        self.particles
            .iter()
            .all(|p| matches!(p.occurs.max, Some(0) | Some(1)))
    }
}

/// The term of a particle.
#[derive(Debug, Clone)]
pub enum Term {
    /// A (local or referenced) element declaration
    Element(Arc<ElementDecl>),
    /// An inline model group
    Group(ModelGroup),
    /// A reference to a named model group definition
    GroupRef(QName),
    /// An element wildcard (`xs:any`)
    Wildcard(AnyElement),
}

/// A particle: a term with occurrence bounds.
#[derive(Debug, Clone)]
pub struct Particle {
    /// The particle's term
    pub term: Term,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl Particle {
    /// Create a particle
    pub fn new(term: Term, occurs: Occurs) -> Self {
        Self { term, occurs }
    }
}
