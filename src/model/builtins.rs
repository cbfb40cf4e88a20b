//! XSD built-in types
//!
//! A process-wide, read-only registry of the 46 XSD 1.0 built-in types:
//! the two ur-types, the 19 atomic primitives and the 25 derived
//! built-ins. Each record carries its primitive link, whitespace mode,
//! fundamental facets, an atomic validator over byte slices and a
//! lazily published [`SimpleType`] façade. The registry is immutable
//! once constructed; `get` and `get_ns` return the same `&'static`
//! reference for the process lifetime.
//!
//! Reference: https://www.w3.org/TR/xmlschema-2/#built-in-datatypes

use crate::error::{Error, Result};
use crate::model::facets::WhiteSpace;
use crate::model::types::SimpleType;
use crate::namespaces::{QName, XSD_NAMESPACE};
use base64::Engine;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Fundamental facets
// =============================================================================

/// The `ordered` fundamental facet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordered {
    /// No order defined
    None,
    /// Partial order (float, double, temporal kinds, duration)
    Partial,
    /// Total order (decimal and the integer family)
    Total,
}

impl Ordered {
    /// Whether range facets are applicable (partial or total order).
    pub fn supports_ranges(&self) -> bool {
        !matches!(self, Ordered::None)
    }
}

/// The `cardinality` fundamental facet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Finitely many values
    Finite,
    /// Countably infinite value space
    CountablyInfinite,
    /// Uncountable value space
    Uncountable,
}

/// Fundamental facets of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundamentalFacets {
    /// Order relation of the value space
    pub ordered: Ordered,
    /// Whether the value space has both an upper and a lower bound
    pub bounded: bool,
    /// Cardinality of the value space
    pub cardinality: Cardinality,
    /// Whether the values are numeric
    pub numeric: bool,
}

impl FundamentalFacets {
    const fn new(ordered: Ordered, bounded: bool, cardinality: Cardinality, numeric: bool) -> Self {
        Self {
            ordered,
            bounded,
            cardinality,
            numeric,
        }
    }
}

// =============================================================================
// Primitive kinds
// =============================================================================

/// Value-space kind of an atomic validator. `Integer` is the
/// decimal-derived refinement: its values canonicalize as decimal keys
/// but parse through the integer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// xs:string and its derived string kinds
    String,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer and its derived kinds (decimal-keyed)
    Integer,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
}

impl PrimitiveKind {
    /// Whether this kind is a temporal (date/time family) kind.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::DateTime
                | Self::Time
                | Self::Date
                | Self::GYearMonth
                | Self::GYear
                | Self::GMonthDay
                | Self::GDay
                | Self::GMonth
        )
    }

    /// Whether this kind is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Integer | Self::Float | Self::Double
        )
    }
}

// =============================================================================
// Builtin type record
// =============================================================================

/// One built-in type record. Immutable after registry construction.
pub struct BuiltinType {
    /// Local name in the XSD namespace
    pub name: &'static str,
    /// Base type local name (`None` only for xs:anyType)
    pub base: Option<&'static str>,
    /// Local name of the primitive this type derives from (self for
    /// primitives and the ur-types)
    pub primitive: &'static str,
    /// Value-space kind used by the validator compiler
    pub kind: PrimitiveKind,
    /// Whitespace mode applied before validation
    pub white_space: WhiteSpace,
    /// Fundamental facets; filled for every entry during registry
    /// construction by walking the derived-to-primitive map
    pub fundamental: FundamentalFacets,
    /// Item type local name for the three list-form built-ins
    /// (NMTOKENS, IDREFS, ENTITIES)
    pub item_type: Option<&'static str>,
    validator: fn(&[u8]) -> Result<()>,
    facade: OnceCell<Arc<SimpleType>>,
}

impl std::fmt::Debug for BuiltinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinType")
            .field("name", &self.name)
            .field("primitive", &self.primitive)
            .field("kind", &self.kind)
            .finish()
    }
}

impl BuiltinType {
    /// QName of this built-in.
    pub fn qname(&self) -> QName {
        QName::xsd(self.name)
    }

    /// Whether this is one of the three whitespace-separated list
    /// built-ins.
    pub fn is_list(&self) -> bool {
        self.item_type.is_some()
    }

    /// The `ordered` flag of this type.
    pub fn ordered(&self) -> Ordered {
        self.fundamental.ordered
    }

    /// Validate a whitespace-normalized lexical value as bytes.
    pub fn validate_bytes(&self, lexical: &[u8]) -> Result<()> {
        if let Some(item) = self.item_type {
            // List built-ins: non-empty sequence of the item type, with
            // an implicit minLength of 1.
            let item_type = get(item).expect("item type is registered");
            let text = as_utf8(lexical, self.name)?;
            let mut items = 0usize;
            for piece in text.split_ascii_whitespace() {
                item_type.validate_bytes(piece.as_bytes())?;
                items += 1;
            }
            if items == 0 {
                return Err(Error::InvalidValue {
                    kind: self.name,
                    value: text.to_string(),
                });
            }
            return Ok(());
        }
        (self.validator)(lexical)
    }

    /// Normalize per the type's whitespace mode, then validate.
    pub fn validate(&self, lexical: &str) -> Result<()> {
        let normalized = self.white_space.normalize(lexical);
        self.validate_bytes(normalized.as_bytes())
    }

    /// The lazily published [`SimpleType`] façade for this built-in.
    pub fn simple_type(&'static self) -> Arc<SimpleType> {
        self.facade
            .get_or_init(|| Arc::new(SimpleType::builtin_facade(self)))
            .clone()
    }
}

// =============================================================================
// Shared lexical helpers
// =============================================================================

fn as_utf8<'a>(lexical: &'a [u8], kind: &'static str) -> Result<&'a str> {
    std::str::from_utf8(lexical).map_err(|_| Error::InvalidValue {
        kind,
        value: String::from_utf8_lossy(lexical).into_owned(),
    })
}

fn invalid(kind: &'static str, lexical: &[u8]) -> Error {
    Error::InvalidValue {
        kind,
        value: String::from_utf8_lossy(lexical).into_owned(),
    }
}

/// Character class used by the shared name validator.
#[derive(Clone, Copy, PartialEq, Eq)]
enum NameClass {
    /// XML Name: colon allowed anywhere
    Name,
    /// NCName: no colons
    NcName,
    /// NMTOKEN: any NameChar, no start-char restriction
    NmToken,
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// One helper serves the whole token class: Name, NCName and NMTOKEN.
fn validate_name_class(lexical: &[u8], class: NameClass, kind: &'static str) -> Result<()> {
    let text = as_utf8(lexical, kind)?;
    if text.is_empty() {
        return Err(invalid(kind, lexical));
    }
    let mut chars = text.chars();
    let first = chars.next().expect("non-empty");
    let first_ok = match class {
        NameClass::Name => is_name_start_char(first),
        NameClass::NcName => is_name_start_char(first) && first != ':',
        NameClass::NmToken => is_name_char(first),
    };
    if !first_ok {
        return Err(invalid(kind, lexical));
    }
    for c in chars {
        let ok = match class {
            NameClass::Name => is_name_char(c),
            NameClass::NcName => is_name_char(c) && c != ':',
            NameClass::NmToken => is_name_char(c),
        };
        if !ok {
            return Err(invalid(kind, lexical));
        }
    }
    Ok(())
}

fn parse_integer(lexical: &[u8], kind: &'static str) -> Result<i128> {
    let text = as_utf8(lexical, kind)?;
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return Err(invalid(kind, lexical));
    }
    let body = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(kind, lexical));
    }
    trimmed
        .parse::<i128>()
        .map_err(|_| invalid(kind, lexical))
}

fn integer_range_validator(
    lexical: &[u8],
    kind: &'static str,
    min: i128,
    max: i128,
) -> Result<()> {
    let value = parse_integer(lexical, kind)?;
    if value < min || value > max {
        return Err(Error::IntegerOutOfRange {
            kind,
            value: String::from_utf8_lossy(lexical).into_owned(),
        });
    }
    Ok(())
}

// =============================================================================
// Atomic validators
// =============================================================================

fn validate_string(_lexical: &[u8]) -> Result<()> {
    Ok(())
}

fn validate_any_simple_type(_lexical: &[u8]) -> Result<()> {
    Ok(())
}

fn validate_normalized_string(lexical: &[u8]) -> Result<()> {
    if lexical.iter().any(|b| matches!(b, b'\r' | b'\n' | b'\t')) {
        return Err(invalid("normalizedString", lexical));
    }
    Ok(())
}

fn validate_token(lexical: &[u8]) -> Result<()> {
    if lexical.first() == Some(&b' ')
        || lexical.last() == Some(&b' ')
        || lexical.windows(2).any(|w| w == b"  ")
    {
        return Err(invalid("token", lexical));
    }
    validate_normalized_string(lexical).map_err(|_| invalid("token", lexical))
}

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap());

fn validate_language(lexical: &[u8]) -> Result<()> {
    let text = as_utf8(lexical, "language")?;
    if !LANGUAGE_RE.is_match(text) {
        return Err(invalid("language", lexical));
    }
    Ok(())
}

fn validate_name(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::Name, "Name")
}

fn validate_ncname(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::NcName, "NCName")
}

fn validate_id(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::NcName, "ID")
}

fn validate_idref(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::NcName, "IDREF")
}

fn validate_entity(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::NcName, "ENTITY")
}

fn validate_nmtoken(lexical: &[u8]) -> Result<()> {
    validate_name_class(lexical, NameClass::NmToken, "NMTOKEN")
}

fn validate_boolean(lexical: &[u8]) -> Result<()> {
    match lexical {
        b"true" | b"false" | b"1" | b"0" => Ok(()),
        _ => Err(invalid("boolean", lexical)),
    }
}

fn validate_decimal(lexical: &[u8]) -> Result<()> {
    let text = as_utf8(lexical, "decimal")?;
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let body = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if body.is_empty() {
        return Err(invalid("decimal", lexical));
    }
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("decimal", lexical));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("decimal", lexical));
    }
    Ok(())
}

fn validate_integer(lexical: &[u8]) -> Result<()> {
    parse_integer(lexical, "integer").map(|_| ())
}

fn validate_long(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "long", i64::MIN as i128, i64::MAX as i128)
}

fn validate_int(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "int", i32::MIN as i128, i32::MAX as i128)
}

fn validate_short(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "short", -32768, 32767)
}

fn validate_byte(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "byte", -128, 127)
}

fn validate_non_negative_integer(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "nonNegativeInteger", 0, i128::MAX)
}

fn validate_positive_integer(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "positiveInteger", 1, i128::MAX)
}

fn validate_unsigned_long(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "unsignedLong", 0, u64::MAX as i128)
}

fn validate_unsigned_int(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "unsignedInt", 0, u32::MAX as i128)
}

fn validate_unsigned_short(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "unsignedShort", 0, 65535)
}

fn validate_unsigned_byte(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "unsignedByte", 0, 255)
}

fn validate_non_positive_integer(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "nonPositiveInteger", i128::MIN, 0)
}

fn validate_negative_integer(lexical: &[u8]) -> Result<()> {
    integer_range_validator(lexical, "negativeInteger", i128::MIN, -1)
}

fn validate_float_lexical(lexical: &[u8], kind: &'static str) -> Result<()> {
    let text = as_utf8(lexical, kind)?;
    match text {
        "NaN" | "INF" | "-INF" => Ok(()),
        _ => {
            // Rust's float parser also accepts forms XSD forbids
            // ("inf", "nan", hex); the shape check screens those out.
            let body = text.strip_prefix(['+', '-']).unwrap_or(text);
            if body.is_empty()
                || !body
                    .bytes()
                    .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
            {
                return Err(invalid(kind, lexical));
            }
            text.parse::<f64>().map_err(|_| invalid(kind, lexical))?;
            Ok(())
        }
    }
}

fn validate_float(lexical: &[u8]) -> Result<()> {
    validate_float_lexical(lexical, "float")
}

fn validate_double(lexical: &[u8]) -> Result<()> {
    validate_float_lexical(lexical, "double")
}

fn validate_hex_binary(lexical: &[u8]) -> Result<()> {
    if lexical.len() % 2 != 0 || !lexical.iter().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid("hexBinary", lexical));
    }
    Ok(())
}

fn validate_base64_binary(lexical: &[u8]) -> Result<()> {
    let text = as_utf8(lexical, "base64Binary")?;
    // The canonical lexical space allows single interior spaces.
    let compact: String = text.chars().filter(|c| *c != ' ').collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(|_| ())
        .map_err(|_| invalid("base64Binary", lexical))
}

fn validate_any_uri(lexical: &[u8]) -> Result<()> {
    if lexical.iter().any(|b| matches!(b, b'\n' | b'\r' | b'\t')) {
        return Err(invalid("anyURI", lexical));
    }
    as_utf8(lexical, "anyURI").map(|_| ())
}

fn validate_qname(lexical: &[u8]) -> Result<()> {
    let text = as_utf8(lexical, "QName")?;
    if let Some((prefix, local)) = text.split_once(':') {
        validate_ncname(prefix.as_bytes()).map_err(|_| invalid("QName", lexical))?;
        validate_ncname(local.as_bytes()).map_err(|_| invalid("QName", lexical))
    } else {
        validate_ncname(text.as_bytes()).map_err(|_| invalid("QName", lexical))
    }
}

fn validate_notation(lexical: &[u8]) -> Result<()> {
    validate_qname(lexical).map_err(|_| invalid("NOTATION", lexical))
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").unwrap()
});

fn validate_duration(lexical: &[u8]) -> Result<()> {
    let text = as_utf8(lexical, "duration")?;
    if !DURATION_RE.is_match(text) || text.ends_with('P') || text.ends_with('T') {
        return Err(invalid("duration", lexical));
    }
    Ok(())
}

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}-\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GYEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GYEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GMONTH_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--\d{2}-\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());

fn regex_validator(lexical: &[u8], re: &Regex, kind: &'static str) -> Result<()> {
    let text = as_utf8(lexical, kind)?;
    if !re.is_match(text) {
        return Err(invalid(kind, lexical));
    }
    Ok(())
}

fn validate_datetime(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &DATETIME_RE, "dateTime")
}

fn validate_date(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &DATE_RE, "date")
}

fn validate_time(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &TIME_RE, "time")
}

fn validate_gyear_month(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &GYEAR_MONTH_RE, "gYearMonth")
}

fn validate_gyear(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &GYEAR_RE, "gYear")
}

fn validate_gmonth_day(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &GMONTH_DAY_RE, "gMonthDay")
}

fn validate_gday(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &GDAY_RE, "gDay")
}

fn validate_gmonth(lexical: &[u8]) -> Result<()> {
    regex_validator(lexical, &GMONTH_RE, "gMonth")
}

// =============================================================================
// Registry construction
// =============================================================================

const F_NONE: FundamentalFacets = FundamentalFacets::new(
    Ordered::None,
    false,
    Cardinality::CountablyInfinite,
    false,
);
const F_TOTAL_NUMERIC: FundamentalFacets = FundamentalFacets::new(
    Ordered::Total,
    false,
    Cardinality::CountablyInfinite,
    true,
);
const F_FLOAT: FundamentalFacets =
    FundamentalFacets::new(Ordered::Partial, true, Cardinality::Finite, true);
const F_PARTIAL: FundamentalFacets = FundamentalFacets::new(
    Ordered::Partial,
    false,
    Cardinality::CountablyInfinite,
    false,
);
const F_BOOLEAN: FundamentalFacets =
    FundamentalFacets::new(Ordered::None, false, Cardinality::Finite, false);
const F_BOUNDED_INT: FundamentalFacets =
    FundamentalFacets::new(Ordered::Total, true, Cardinality::Finite, true);

struct Entry {
    name: &'static str,
    base: Option<&'static str>,
    kind: PrimitiveKind,
    white_space: WhiteSpace,
    primitive_facets: Option<FundamentalFacets>,
    item_type: Option<&'static str>,
    validator: fn(&[u8]) -> Result<()>,
}

const fn entry(
    name: &'static str,
    base: Option<&'static str>,
    kind: PrimitiveKind,
    white_space: WhiteSpace,
    primitive_facets: Option<FundamentalFacets>,
    validator: fn(&[u8]) -> Result<()>,
) -> Entry {
    Entry {
        name,
        base,
        kind,
        white_space,
        primitive_facets,
        item_type: None,
        validator,
    }
}

const fn list_entry(
    name: &'static str,
    item_type: &'static str,
    validator: fn(&[u8]) -> Result<()>,
) -> Entry {
    Entry {
        name,
        base: Some("anySimpleType"),
        kind: PrimitiveKind::String,
        white_space: WhiteSpace::Collapse,
        primitive_facets: None,
        item_type: Some(item_type),
        validator,
    }
}

/// Declaration table in the registry's deterministic order: ur-types,
/// then primitives, then derived built-ins.
static ENTRIES: &[Entry] = &[
    entry("anyType", None, PrimitiveKind::String, WhiteSpace::Preserve, Some(F_NONE), validate_string),
    entry("anySimpleType", Some("anyType"), PrimitiveKind::String, WhiteSpace::Preserve, Some(F_NONE), validate_any_simple_type),
    // Primitives
    entry("string", Some("anySimpleType"), PrimitiveKind::String, WhiteSpace::Preserve, Some(F_NONE), validate_string),
    entry("boolean", Some("anySimpleType"), PrimitiveKind::Boolean, WhiteSpace::Collapse, Some(F_BOOLEAN), validate_boolean),
    entry("decimal", Some("anySimpleType"), PrimitiveKind::Decimal, WhiteSpace::Collapse, Some(F_TOTAL_NUMERIC), validate_decimal),
    entry("float", Some("anySimpleType"), PrimitiveKind::Float, WhiteSpace::Collapse, Some(F_FLOAT), validate_float),
    entry("double", Some("anySimpleType"), PrimitiveKind::Double, WhiteSpace::Collapse, Some(F_FLOAT), validate_double),
    entry("duration", Some("anySimpleType"), PrimitiveKind::Duration, WhiteSpace::Collapse, Some(F_PARTIAL), validate_duration),
    entry("dateTime", Some("anySimpleType"), PrimitiveKind::DateTime, WhiteSpace::Collapse, Some(F_PARTIAL), validate_datetime),
    entry("time", Some("anySimpleType"), PrimitiveKind::Time, WhiteSpace::Collapse, Some(F_PARTIAL), validate_time),
    entry("date", Some("anySimpleType"), PrimitiveKind::Date, WhiteSpace::Collapse, Some(F_PARTIAL), validate_date),
    entry("gYearMonth", Some("anySimpleType"), PrimitiveKind::GYearMonth, WhiteSpace::Collapse, Some(F_PARTIAL), validate_gyear_month),
    entry("gYear", Some("anySimpleType"), PrimitiveKind::GYear, WhiteSpace::Collapse, Some(F_PARTIAL), validate_gyear),
    entry("gMonthDay", Some("anySimpleType"), PrimitiveKind::GMonthDay, WhiteSpace::Collapse, Some(F_PARTIAL), validate_gmonth_day),
    entry("gDay", Some("anySimpleType"), PrimitiveKind::GDay, WhiteSpace::Collapse, Some(F_PARTIAL), validate_gday),
    entry("gMonth", Some("anySimpleType"), PrimitiveKind::GMonth, WhiteSpace::Collapse, Some(F_PARTIAL), validate_gmonth),
    entry("hexBinary", Some("anySimpleType"), PrimitiveKind::HexBinary, WhiteSpace::Collapse, Some(F_NONE), validate_hex_binary),
    entry("base64Binary", Some("anySimpleType"), PrimitiveKind::Base64Binary, WhiteSpace::Collapse, Some(F_NONE), validate_base64_binary),
    entry("anyURI", Some("anySimpleType"), PrimitiveKind::AnyUri, WhiteSpace::Collapse, Some(F_NONE), validate_any_uri),
    entry("QName", Some("anySimpleType"), PrimitiveKind::QName, WhiteSpace::Collapse, Some(F_NONE), validate_qname),
    entry("NOTATION", Some("anySimpleType"), PrimitiveKind::Notation, WhiteSpace::Collapse, Some(F_NONE), validate_notation),
    // Derived string types
    entry("normalizedString", Some("string"), PrimitiveKind::String, WhiteSpace::Replace, None, validate_normalized_string),
    entry("token", Some("normalizedString"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_token),
    entry("language", Some("token"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_language),
    entry("NMTOKEN", Some("token"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_nmtoken),
    entry("Name", Some("token"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_name),
    entry("NCName", Some("Name"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_ncname),
    entry("ID", Some("NCName"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_id),
    entry("IDREF", Some("NCName"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_idref),
    entry("ENTITY", Some("NCName"), PrimitiveKind::String, WhiteSpace::Collapse, None, validate_entity),
    // List-form built-ins
    list_entry("NMTOKENS", "NMTOKEN", validate_string),
    list_entry("IDREFS", "IDREF", validate_string),
    list_entry("ENTITIES", "ENTITY", validate_string),
    // Derived numeric types
    entry("integer", Some("decimal"), PrimitiveKind::Integer, WhiteSpace::Collapse, None, validate_integer),
    entry("nonPositiveInteger", Some("integer"), PrimitiveKind::Integer, WhiteSpace::Collapse, None, validate_non_positive_integer),
    entry("negativeInteger", Some("nonPositiveInteger"), PrimitiveKind::Integer, WhiteSpace::Collapse, None, validate_negative_integer),
    entry("long", Some("integer"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_long),
    entry("int", Some("long"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_int),
    entry("short", Some("int"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_short),
    entry("byte", Some("short"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_byte),
    entry("nonNegativeInteger", Some("integer"), PrimitiveKind::Integer, WhiteSpace::Collapse, None, validate_non_negative_integer),
    entry("unsignedLong", Some("nonNegativeInteger"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_unsigned_long),
    entry("unsignedInt", Some("unsignedLong"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_unsigned_int),
    entry("unsignedShort", Some("unsignedInt"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_unsigned_short),
    entry("unsignedByte", Some("unsignedShort"), PrimitiveKind::Integer, WhiteSpace::Collapse, Some(F_BOUNDED_INT), validate_unsigned_byte),
    entry("positiveInteger", Some("nonNegativeInteger"), PrimitiveKind::Integer, WhiteSpace::Collapse, None, validate_positive_integer),
];

struct Registry {
    types: Vec<BuiltinType>,
    by_name: HashMap<&'static str, usize>,
}

/// Build the registry: resolve every entry's primitive link and fill
/// every `fundamental` field by walking the derived-to-primitive map.
/// This constructor is the only site that writes builtin state.
fn build_registry() -> Registry {
    let index: HashMap<&'static str, usize> = ENTRIES
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name, i))
        .collect();

    // A primitive is a direct child of anySimpleType; the ur-types and
    // list built-ins are their own primitive.
    fn primitive_of(index: &HashMap<&'static str, usize>, start: usize) -> &'static Entry {
        let mut current = &ENTRIES[start];
        while let Some(base) = current.base {
            if base == "anySimpleType" || base == "anyType" {
                break;
            }
            current = &ENTRIES[index[base]];
        }
        current
    }

    let types = ENTRIES
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let primitive = primitive_of(&index, i);
            let fundamental = e
                .primitive_facets
                .unwrap_or_else(|| primitive.primitive_facets.unwrap_or(F_NONE));
            BuiltinType {
                name: e.name,
                base: e.base,
                primitive: primitive.name,
                kind: e.kind,
                white_space: e.white_space,
                fundamental,
                item_type: e.item_type,
                validator: e.validator,
                facade: OnceCell::new(),
            }
        })
        .collect();

    Registry { types, by_name: index }
}

static REGISTRY: Lazy<Registry> = Lazy::new(build_registry);

/// Number of built-in types in the registry.
pub const BUILTIN_COUNT: usize = 46;

/// Look up a built-in by local name.
pub fn get(local: &str) -> Option<&'static BuiltinType> {
    REGISTRY
        .by_name
        .get(local)
        .map(|&i| &REGISTRY.types[i])
}

/// Look up a built-in by namespace and local name; any namespace other
/// than the XSD namespace yields `None`.
pub fn get_ns(namespace: &str, local: &str) -> Option<&'static BuiltinType> {
    if namespace != XSD_NAMESPACE {
        return None;
    }
    get(local)
}

/// Iterate all built-ins in the registry's deterministic order.
pub fn all() -> impl Iterator<Item = &'static BuiltinType> {
    REGISTRY.types.iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_registry_has_46_types() {
        assert_eq!(all().count(), BUILTIN_COUNT);
    }

    #[test]
    fn test_get_pointer_stability() {
        for builtin in all() {
            let a = get(builtin.name).unwrap();
            let b = get_ns(XSD_NAMESPACE, builtin.name).unwrap();
            assert!(std::ptr::eq(a, b), "{}", builtin.name);
            assert!(std::ptr::eq(a, get(builtin.name).unwrap()));
        }
    }

    #[test]
    fn test_get_ns_rejects_other_namespaces() {
        assert!(get_ns("urn:other", "string").is_none());
        assert!(get_ns("", "string").is_none());
        assert!(get_ns(XSD_NAMESPACE, "string").is_some());
    }

    #[test]
    fn test_primitive_links() {
        assert_eq!(get("string").unwrap().primitive, "string");
        assert_eq!(get("token").unwrap().primitive, "string");
        assert_eq!(get("NCName").unwrap().primitive, "string");
        assert_eq!(get("integer").unwrap().primitive, "decimal");
        assert_eq!(get("unsignedByte").unwrap().primitive, "decimal");
        assert_eq!(get("dateTime").unwrap().primitive, "dateTime");
    }

    #[test]
    fn test_fundamental_facets_filled_for_all() {
        for builtin in all() {
            // Every entry has a usable ordered flag after construction.
            let _ = builtin.fundamental.ordered;
        }
        assert_eq!(get("integer").unwrap().fundamental.ordered, Ordered::Total);
        assert!(get("integer").unwrap().fundamental.numeric);
        assert_eq!(get("string").unwrap().fundamental.ordered, Ordered::None);
        assert!(get("byte").unwrap().fundamental.bounded);
        assert!(!get("integer").unwrap().fundamental.bounded);
        assert_eq!(get("float").unwrap().fundamental.ordered, Ordered::Partial);
    }

    #[test]
    fn test_string_validators() {
        assert!(get("string").unwrap().validate("anything\tat all").is_ok());
        assert!(get("NCName").unwrap().validate("valid-name").is_ok());
        assert!(get("NCName").unwrap().validate("invalid:name").is_err());
        assert!(get("Name").unwrap().validate(":scoped").is_ok());
        assert!(get("NMTOKEN").unwrap().validate("1two3").is_ok());
        assert!(get("NMTOKEN").unwrap().validate("with space").is_err());
        assert!(get("language").unwrap().validate("zh-Hans-CN").is_ok());
        assert!(get("language").unwrap().validate("123").is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(get("integer").unwrap().validate("0042").is_ok());
        assert!(get("integer").unwrap().validate("4.2").is_err());
        assert!(get("byte").unwrap().validate("127").is_ok());
        assert!(matches!(
            get("byte").unwrap().validate("128"),
            Err(Error::IntegerOutOfRange { kind: "byte", .. })
        ));
        assert!(get("unsignedByte").unwrap().validate("-1").is_err());
        assert!(get("positiveInteger").unwrap().validate("0").is_err());
        assert!(get("negativeInteger").unwrap().validate("-1").is_ok());
        assert!(get("decimal").unwrap().validate("-1.50").is_ok());
        assert!(get("decimal").unwrap().validate("1e2").is_err());
        assert!(get("float").unwrap().validate("1e2").is_ok());
        assert!(get("float").unwrap().validate("NaN").is_ok());
        assert!(get("double").unwrap().validate("-INF").is_ok());
        assert!(get("double").unwrap().validate("inf").is_err());
    }

    #[test]
    fn test_binary_validators() {
        assert!(get("hexBinary").unwrap().validate("0FB7").is_ok());
        assert!(get("hexBinary").unwrap().validate("0FB").is_err());
        assert!(get("base64Binary").unwrap().validate("SGVsbG8=").is_ok());
        assert!(get("base64Binary").unwrap().validate("%%%").is_err());
    }

    #[test]
    fn test_temporal_validators() {
        assert!(get("dateTime").unwrap().validate("2001-10-26T21:32:52Z").is_ok());
        assert!(get("dateTime").unwrap().validate("2001-10-26").is_err());
        assert!(get("date").unwrap().validate("2001-10-26+02:00").is_ok());
        assert!(get("time").unwrap().validate("21:32:52.126").is_ok());
        assert!(get("gMonthDay").unwrap().validate("--11-01").is_ok());
        assert!(get("gDay").unwrap().validate("---01").is_ok());
        assert!(get("duration").unwrap().validate("P1Y2M3DT4H5M6S").is_ok());
        assert!(get("duration").unwrap().validate("P").is_err());
        assert!(get("duration").unwrap().validate("P1YT").is_err());
    }

    #[test]
    fn test_list_builtins() {
        let nmtokens = get("NMTOKENS").unwrap();
        assert!(nmtokens.is_list());
        assert_eq!(nmtokens.item_type, Some("NMTOKEN"));
        assert!(nmtokens.validate("one two three").is_ok());
        // Implicit minLength=1: the empty sequence is invalid.
        assert!(nmtokens.validate("   ").is_err());
        assert!(nmtokens.validate("ok bad token!").is_err());
    }

    #[test]
    fn test_whitespace_applied_before_validation() {
        // token collapses before validating, so raw tabs are fine.
        assert!(get("token").unwrap().validate("  a\tb  ").is_ok());
        // normalizedString only replaces, so the result has no tabs.
        assert!(get("normalizedString").unwrap().validate("a\tb").is_ok());
    }

    #[test]
    fn test_simple_type_facade_is_published_once() {
        let builtin = get("token").unwrap();
        let a = builtin.simple_type();
        let b = builtin.simple_type();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name, QName::xsd("token"));
    }

    #[test]
    fn test_decimal_parses_via_rust_decimal() {
        // The lexical space accepted here parses with the comparison
        // library used at facet-compile time.
        for lexical in ["1.23", "-0.5", "+7", ".5", "5."] {
            assert!(get("decimal").unwrap().validate(lexical).is_ok());
            assert!(lexical.trim_start_matches('+').parse::<Decimal>().is_ok());
        }
    }
}
