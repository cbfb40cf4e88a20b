//! XSD constraining facets
//!
//! The facet representation carried on simple-type restrictions. A
//! pattern facet keeps both its XSD source and the eagerly translated
//! engine form (see [`crate::pattern`]); the four range facets share one
//! representation. Facet programs compiled from these live in
//! [`crate::compiler`].

use crate::namespaces::NamespaceContext;
use crate::pattern::XsdPattern;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs, newlines and carriage returns with spaces
    Replace,
    /// Replace, then collapse runs and trim
    Collapse,
}

impl WhiteSpace {
    /// Parse from the facet's lexical value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => {
                let replaced = s.replace(['\t', '\n', '\r'], " ");
                let mut result = String::new();
                let mut prev_space = true; // true to trim leading spaces
                for c in replaced.chars() {
                    if c == ' ' {
                        if !prev_space {
                            result.push(' ');
                            prev_space = true;
                        }
                    } else {
                        result.push(c);
                        prev_space = false;
                    }
                }
                result.trim_end().to_string()
            }
        }
    }

    /// Whether this mode may replace `base` along a restriction chain.
    /// Restrictions may only tighten: preserve -> replace -> collapse.
    pub fn can_restrict(&self, base: WhiteSpace) -> bool {
        *self >= base
    }
}

/// Operator of a range facet. The four range facets share one
/// representation; the operator distinguishes them and supplies the
/// symbol used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `minInclusive`: value >= bound
    MinInclusive,
    /// `maxInclusive`: value <= bound
    MaxInclusive,
    /// `minExclusive`: value > bound
    MinExclusive,
    /// `maxExclusive`: value < bound
    MaxExclusive,
}

impl RangeOp {
    /// Facet name as written in a schema
    pub fn facet_name(&self) -> &'static str {
        match self {
            Self::MinInclusive => "minInclusive",
            Self::MaxInclusive => "maxInclusive",
            Self::MinExclusive => "minExclusive",
            Self::MaxExclusive => "maxExclusive",
        }
    }

    /// Operator symbol for diagnostics
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::MinInclusive => ">=",
            Self::MaxInclusive => "<=",
            Self::MinExclusive => ">",
            Self::MaxExclusive => "<",
        }
    }

    /// Whether a comparison result against the bound satisfies the facet.
    /// `ordering` is `value.cmp(bound)`.
    pub fn satisfied(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::MinInclusive => ordering != Less,
            Self::MaxInclusive => ordering != Greater,
            Self::MinExclusive => ordering == Greater,
            Self::MaxExclusive => ordering == Less,
        }
    }
}

/// One of the four range facets: the lexical bound and its operator.
/// The comparable value is produced at compile time against the base
/// type's primitive kind.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFacet {
    /// Lexical form of the bound as written in the schema
    pub lexical: String,
    /// Which of the four range facets this is
    pub op: RangeOp,
}

impl RangeFacet {
    /// Create a range facet
    pub fn new(op: RangeOp, lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            op,
        }
    }
}

/// Enumeration facet: the lexical values plus the namespace context in
/// scope where they were written. QName-typed enumerations resolve
/// their prefixes against that context.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationFacet {
    /// Allowed lexical values, in declaration order
    pub values: Vec<String>,
    /// Prefix bindings in scope at the declaration site
    pub context: NamespaceContext,
}

impl EnumerationFacet {
    /// Create an enumeration facet with an empty namespace context
    pub fn new(values: Vec<String>) -> Self {
        Self {
            values,
            context: NamespaceContext::new(),
        }
    }

    /// Create an enumeration facet with the given namespace context
    pub fn with_context(values: Vec<String>, context: NamespaceContext) -> Self {
        Self { values, context }
    }
}

/// A constraining facet on a simple type restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// A single pattern
    Pattern(XsdPattern),
    /// OR of the patterns declared at one restriction step
    PatternSet(Vec<XsdPattern>),
    /// Enumeration of allowed values
    Enumeration(EnumerationFacet),
    /// Exact length (characters, octets or list items by primitive kind)
    Length(u32),
    /// Minimum length
    MinLength(u32),
    /// Maximum length
    MaxLength(u32),
    /// Maximum number of significant decimal digits
    TotalDigits(u32),
    /// Maximum number of fraction digits
    FractionDigits(u32),
    /// One of the four range facets
    Range(RangeFacet),
    /// Explicit white space mode
    WhiteSpace(WhiteSpace),
}

impl Facet {
    /// The facet name as written in a schema, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pattern(_) | Self::PatternSet(_) => "pattern",
            Self::Enumeration(_) => "enumeration",
            Self::Length(_) => "length",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::TotalDigits(_) => "totalDigits",
            Self::FractionDigits(_) => "fractionDigits",
            Self::Range(r) => r.op.facet_name(),
            Self::WhiteSpace(_) => "whiteSpace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_parse() {
        assert_eq!(WhiteSpace::parse("preserve"), Some(WhiteSpace::Preserve));
        assert_eq!(WhiteSpace::parse("replace"), Some(WhiteSpace::Replace));
        assert_eq!(WhiteSpace::parse("collapse"), Some(WhiteSpace::Collapse));
        assert_eq!(WhiteSpace::parse("trim"), None);
    }

    #[test]
    fn test_whitespace_normalize() {
        let text = "  hello\t\nworld  ";
        assert_eq!(WhiteSpace::Preserve.normalize(text), text);
        assert_eq!(WhiteSpace::Replace.normalize(text), "  hello  world  ");
        assert_eq!(WhiteSpace::Collapse.normalize(text), "hello world");
    }

    #[test]
    fn test_whitespace_restriction_only_tightens() {
        assert!(WhiteSpace::Collapse.can_restrict(WhiteSpace::Preserve));
        assert!(WhiteSpace::Collapse.can_restrict(WhiteSpace::Replace));
        assert!(WhiteSpace::Replace.can_restrict(WhiteSpace::Preserve));
        assert!(WhiteSpace::Collapse.can_restrict(WhiteSpace::Collapse));

        assert!(!WhiteSpace::Preserve.can_restrict(WhiteSpace::Replace));
        assert!(!WhiteSpace::Replace.can_restrict(WhiteSpace::Collapse));
    }

    #[test]
    fn test_range_op_satisfied() {
        use std::cmp::Ordering::*;
        assert!(RangeOp::MinInclusive.satisfied(Equal));
        assert!(RangeOp::MinInclusive.satisfied(Greater));
        assert!(!RangeOp::MinInclusive.satisfied(Less));

        assert!(!RangeOp::MinExclusive.satisfied(Equal));
        assert!(RangeOp::MinExclusive.satisfied(Greater));

        assert!(RangeOp::MaxInclusive.satisfied(Equal));
        assert!(!RangeOp::MaxInclusive.satisfied(Greater));

        assert!(!RangeOp::MaxExclusive.satisfied(Equal));
        assert!(RangeOp::MaxExclusive.satisfied(Less));
    }

    #[test]
    fn test_range_symbols() {
        assert_eq!(RangeOp::MinInclusive.symbol(), ">=");
        assert_eq!(RangeOp::MaxExclusive.symbol(), "<");
    }

    #[test]
    fn test_facet_names() {
        assert_eq!(Facet::Length(3).name(), "length");
        assert_eq!(
            Facet::Range(RangeFacet::new(RangeOp::MaxInclusive, "10")).name(),
            "maxInclusive"
        );
        assert_eq!(Facet::WhiteSpace(WhiteSpace::Collapse).name(), "whiteSpace");
    }
}
