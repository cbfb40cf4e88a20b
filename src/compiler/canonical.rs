//! Canonical value-space keys
//!
//! Every enumeration, default and fixed value is reduced at compile
//! time to a canonical byte key in its value space: two values are
//! equal iff their key kind and bytes are equal. Keys are deterministic
//! across runs and processes, so bundle emission is byte-reproducible.
//!
//! Encodings per primitive kind:
//! - strings and anyURI keep their whitespace-normalized UTF-8 bytes;
//! - boolean is one byte;
//! - decimal (and the integer family, which shares the decimal key) is
//!   a sign byte, a varint scale and the coefficient digits with
//!   leading/trailing zeros removed, so `1`, `01` and `1.00` coincide;
//! - float/double use the canonical scientific form with `-0`
//!   collapsed to `0`;
//! - durations normalize months into years and seconds into
//!   hours/minutes before encoding;
//! - temporals normalize to UTC, roll `24:00:00` into the next day and
//!   carry a leap-second flag;
//! - QName/NOTATION keys are length-prefixed `(namespace, local)`
//!   pairs resolved against the declaration-site prefix context;
//! - hexBinary uppercases, base64Binary decodes to octets;
//! - lists frame their item keys with a varint count.

use crate::error::{Error, Result};
use crate::model::PrimitiveKind;
use crate::namespaces::NamespaceContext;
use base64::Engine;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Kind tag of a canonical key. Integer-derived types share the
/// decimal kind: their value spaces coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyKind {
    /// UTF-8 string bytes
    String = 1,
    /// Single 0/1 byte
    Boolean = 2,
    /// Sign + scale + coefficient digits
    Decimal = 3,
    /// Canonical scientific form
    Float = 4,
    /// Canonical scientific form
    Double = 5,
    /// Normalized seven-field record
    Duration = 6,
    /// UTC-normalized instant
    DateTime = 7,
    /// UTC-normalized time of day
    Time = 8,
    /// Date with optional timezone
    Date = 9,
    /// Year and month
    GYearMonth = 10,
    /// Year
    GYear = 11,
    /// Month and day
    GMonthDay = 12,
    /// Day
    GDay = 13,
    /// Month
    GMonth = 14,
    /// UTF-8 URI bytes
    AnyUri = 15,
    /// Length-prefixed (namespace, local)
    QName = 16,
    /// Length-prefixed (namespace, local)
    Notation = 17,
    /// Uppercase hex digits
    HexBinary = 18,
    /// Decoded octets
    Base64Binary = 19,
    /// Varint count + framed item keys
    List = 20,
}

impl KeyKind {
    /// The key kind used for an atomic primitive.
    pub fn for_primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::String => Self::String,
            PrimitiveKind::Boolean => Self::Boolean,
            // Integer-derived values share the decimal value space.
            PrimitiveKind::Decimal | PrimitiveKind::Integer => Self::Decimal,
            PrimitiveKind::Float => Self::Float,
            PrimitiveKind::Double => Self::Double,
            PrimitiveKind::Duration => Self::Duration,
            PrimitiveKind::DateTime => Self::DateTime,
            PrimitiveKind::Time => Self::Time,
            PrimitiveKind::Date => Self::Date,
            PrimitiveKind::GYearMonth => Self::GYearMonth,
            PrimitiveKind::GYear => Self::GYear,
            PrimitiveKind::GMonthDay => Self::GMonthDay,
            PrimitiveKind::GDay => Self::GDay,
            PrimitiveKind::GMonth => Self::GMonth,
            PrimitiveKind::AnyUri => Self::AnyUri,
            PrimitiveKind::QName => Self::QName,
            PrimitiveKind::Notation => Self::Notation,
            PrimitiveKind::HexBinary => Self::HexBinary,
            PrimitiveKind::Base64Binary => Self::Base64Binary,
        }
    }
}

/// A canonical value-space key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKey {
    /// Kind tag
    pub kind: KeyKind,
    /// Canonical bytes
    pub bytes: Vec<u8>,
}

impl ValueKey {
    /// Stable 64-bit hash of `(kind, bytes)`. The hasher is seedless,
    /// so the hash is identical across processes.
    pub fn hash_key(&self) -> u64 {
        hash_key(self.kind, &self.bytes)
    }
}

/// Hash a key's kind tag and bytes.
pub fn hash_key(kind: KeyKind, bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u8(kind as u8);
    hasher.write(bytes);
    hasher.finish()
}

/// Append an unsigned LEB128 varint.
pub fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 varint; returns the value and the bytes
/// consumed.
pub fn read_varint(bytes: &[u8]) -> (u64, usize) {
    let mut value = 0u64;
    let mut shift = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return (value, i + 1);
        }
        shift += 7;
    }
    (value, bytes.len())
}

fn push_signed(out: &mut Vec<u8>, value: i64) {
    // Zigzag, so small negatives stay small.
    push_varint(out, ((value << 1) ^ (value >> 63)) as u64);
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    push_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

/// Canonicalize one atomic lexical value. The lexical is expected to be
/// whitespace-normalized already; temporal and QName kinds trim XML
/// whitespace themselves regardless.
pub fn canonicalize(
    kind: PrimitiveKind,
    lexical: &str,
    context: &NamespaceContext,
) -> Result<ValueKey> {
    let key_kind = KeyKind::for_primitive(kind);
    let bytes = match kind {
        PrimitiveKind::String | PrimitiveKind::AnyUri => lexical.as_bytes().to_vec(),
        PrimitiveKind::Boolean => match lexical {
            "true" | "1" => vec![1],
            "false" | "0" => vec![0],
            _ => return Err(invalid("boolean", lexical)),
        },
        PrimitiveKind::Decimal | PrimitiveKind::Integer => canonical_decimal(lexical)?,
        PrimitiveKind::Float => canonical_float(lexical, true)?,
        PrimitiveKind::Double => canonical_float(lexical, false)?,
        PrimitiveKind::Duration => canonical_duration(lexical)?,
        PrimitiveKind::DateTime => canonical_date_time(lexical)?,
        PrimitiveKind::Time => canonical_time(lexical)?,
        PrimitiveKind::Date => canonical_date(lexical)?,
        PrimitiveKind::GYearMonth
        | PrimitiveKind::GYear
        | PrimitiveKind::GMonthDay
        | PrimitiveKind::GDay
        | PrimitiveKind::GMonth => canonical_gregorian(kind, lexical)?,
        PrimitiveKind::QName | PrimitiveKind::Notation => {
            let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
            let qname = context.resolve(trimmed)?;
            let mut out = Vec::new();
            push_str(&mut out, &qname.namespace);
            push_str(&mut out, &qname.local);
            out
        }
        PrimitiveKind::HexBinary => {
            if lexical.len() % 2 != 0 || !lexical.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid("hexBinary", lexical));
            }
            lexical.bytes().map(|b| b.to_ascii_uppercase()).collect()
        }
        PrimitiveKind::Base64Binary => {
            let compact: String = lexical.chars().filter(|c| *c != ' ').collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|_| invalid("base64Binary", lexical))?
        }
    };
    Ok(ValueKey {
        kind: key_kind,
        bytes,
    })
}

/// Frame the item keys of a list value: varint count, then per item a
/// kind byte and a length-prefixed key.
pub fn canonicalize_items(items: &[ValueKey]) -> ValueKey {
    let mut bytes = Vec::new();
    push_varint(&mut bytes, items.len() as u64);
    for item in items {
        bytes.push(item.kind as u8);
        push_varint(&mut bytes, item.bytes.len() as u64);
        bytes.extend_from_slice(&item.bytes);
    }
    ValueKey {
        kind: KeyKind::List,
        bytes,
    }
}

fn invalid(kind: &'static str, lexical: &str) -> Error {
    Error::InvalidValue {
        kind,
        value: lexical.to_string(),
    }
}

// =============================================================================
// Numerics
// =============================================================================

/// Sign byte, varint scale, coefficient digits. `-0` collapses to `0`.
fn canonical_decimal(lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if (int_part.is_empty() && frac_part.is_empty())
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("decimal", lexical));
    }

    let frac = frac_part.trim_end_matches('0');
    let int = int_part.trim_start_matches('0');
    let mut coefficient = String::with_capacity(int.len() + frac.len());
    coefficient.push_str(int);
    coefficient.push_str(frac);
    let coefficient = coefficient.trim_start_matches('0');
    let scale = frac.len() as u64;

    let mut out = Vec::new();
    if coefficient.is_empty() {
        // Zero: one canonical form regardless of sign and scale.
        out.push(0);
        push_varint(&mut out, 0);
    } else {
        out.push(u8::from(negative));
        push_varint(&mut out, scale);
        out.extend_from_slice(coefficient.as_bytes());
    }
    Ok(out)
}

fn canonical_float(lexical: &str, single: bool) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let canonical = match trimmed {
        "NaN" => "NaN".to_string(),
        "INF" => "INF".to_string(),
        "-INF" => "-INF".to_string(),
        _ => {
            let value: f64 = trimmed.parse().map_err(|_| invalid("double", lexical))?;
            let value = if single { value as f32 as f64 } else { value };
            // -0 collapses to 0 in the value space.
            let value = if value == 0.0 { 0.0 } else { value };
            let mut formatted = format!("{value:E}");
            // Canonical form keeps a fractional digit: 1E2 -> 1.0E2.
            if let Some(e) = formatted.find('E') {
                if !formatted[..e].contains('.') {
                    formatted.insert_str(e, ".0");
                }
            }
            formatted
        }
    };
    Ok(canonical.into_bytes())
}

// =============================================================================
// Duration
// =============================================================================

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

/// Normalized seven-field record: sign, years, months, days, hours,
/// minutes, seconds-as-decimal. Months carry into years and seconds
/// into hours/minutes; days are left alone (month lengths vary).
fn canonical_duration(lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.ends_with('P') || trimmed.ends_with('T') {
        return Err(invalid("duration", lexical));
    }
    let captures = DURATION_RE
        .captures(trimmed)
        .ok_or_else(|| invalid("duration", lexical))?;

    let field = |i: usize| -> Result<u64> {
        captures
            .get(i)
            .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid("duration", lexical)))
            .unwrap_or(Ok(0))
    };
    let negative = captures.get(1).is_some();
    let months_total = field(2)? * 12 + field(3)?;
    let days = field(4)?;

    let (seconds_str, frac) = match captures.get(7) {
        Some(m) => match m.as_str().split_once('.') {
            Some((whole, frac)) => (whole.parse::<u64>().unwrap_or(0), frac.to_string()),
            None => (m.as_str().parse::<u64>().unwrap_or(0), String::new()),
        },
        None => (0, String::new()),
    };
    let seconds_total = field(5)? * 3600 + field(6)? * 60 + seconds_str;
    let frac = frac.trim_end_matches('0');

    let mut out = Vec::new();
    out.push(u8::from(negative));
    push_varint(&mut out, months_total / 12);
    push_varint(&mut out, months_total % 12);
    push_varint(&mut out, days);
    push_varint(&mut out, seconds_total / 3600);
    push_varint(&mut out, (seconds_total % 3600) / 60);
    push_varint(&mut out, seconds_total % 60);
    push_str(&mut out, frac);
    Ok(out)
}

// =============================================================================
// Temporals
// =============================================================================

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .unwrap()
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());
static GREGORIAN_RES: Lazy<[(PrimitiveKind, Regex); 5]> = Lazy::new(|| {
    [
        (
            PrimitiveKind::GYearMonth,
            Regex::new(r"^(-?\d{4,})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap(),
        ),
        (
            PrimitiveKind::GYear,
            Regex::new(r"^(-?\d{4,})(Z|[+-]\d{2}:\d{2})?$").unwrap(),
        ),
        (
            PrimitiveKind::GMonthDay,
            Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap(),
        ),
        (
            PrimitiveKind::GDay,
            Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap(),
        ),
        (
            PrimitiveKind::GMonth,
            Regex::new(r"^--(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap(),
        ),
    ]
});

/// Timezone offset in minutes; `None` when absent.
fn parse_tz(tz: Option<&str>) -> Result<Option<i64>> {
    match tz {
        None => Ok(None),
        Some("Z") => Ok(Some(0)),
        Some(s) => {
            let negative = s.starts_with('-');
            let (h, m) = s[1..].split_once(':').ok_or_else(|| invalid("timezone", s))?;
            let h: i64 = h.parse().map_err(|_| invalid("timezone", s))?;
            let m: i64 = m.parse().map_err(|_| invalid("timezone", s))?;
            if h > 14 || m > 59 {
                return Err(invalid("timezone", s));
            }
            let total = h * 60 + m;
            Ok(Some(if negative { -total } else { total }))
        }
    }
}

fn parse_fraction_nanos(frac: Option<&str>) -> u32 {
    match frac {
        Some(f) => {
            let digits = &f[1..]; // skip the dot
            let mut nanos = 0u32;
            for (i, b) in digits.bytes().take(9).enumerate() {
                nanos += (b - b'0') as u32 * 10u32.pow(8 - i as u32);
            }
            nanos
        }
        None => 0,
    }
}

fn push_tz(out: &mut Vec<u8>, tz: Option<i64>) {
    match tz {
        None => out.push(0),
        Some(offset) => {
            out.push(1);
            push_signed(out, offset);
        }
    }
}

/// UTC-normalized dateTime. `24:00:00` rolls into the following day; a
/// declared leap second (`:60`) keeps its flag and is stored as `:59`.
fn canonical_date_time(lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let captures = DATETIME_RE
        .captures(trimmed)
        .ok_or_else(|| invalid("dateTime", lexical))?;

    let year: i32 = captures[1].parse().map_err(|_| invalid("dateTime", lexical))?;
    let month: u32 = captures[2].parse().unwrap();
    let day: u32 = captures[3].parse().unwrap();
    let hour: u32 = captures[4].parse().unwrap();
    let minute: u32 = captures[5].parse().unwrap();
    let second: u32 = captures[6].parse().unwrap();
    let nanos = parse_fraction_nanos(captures.get(7).map(|m| m.as_str()));
    let tz = parse_tz(captures.get(8).map(|m| m.as_str()))?;

    let leap = second == 60;
    let second = if leap { 59 } else { second };
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid("dateTime", lexical))?;

    // 24:00:00 is the first instant of the next day.
    let mut datetime = if hour == 24 {
        if minute != 0 || second != 0 || nanos != 0 {
            return Err(invalid("dateTime", lexical));
        }
        date.succ_opt()
            .ok_or_else(|| invalid("dateTime", lexical))?
            .and_hms_opt(0, 0, 0)
            .unwrap()
    } else {
        date.and_hms_nano_opt(hour, minute, second, nanos)
            .ok_or_else(|| invalid("dateTime", lexical))?
    };
    if let Some(offset) = tz {
        datetime = datetime - ChronoDuration::minutes(offset);
    }

    let mut out = Vec::new();
    push_datetime_fields(&mut out, &datetime);
    out.push(u8::from(tz.is_some()));
    out.push(u8::from(leap));
    Ok(out)
}

fn push_datetime_fields(out: &mut Vec<u8>, dt: &NaiveDateTime) {
    use chrono::Datelike;
    push_signed(out, dt.year() as i64);
    push_varint(out, dt.month() as u64);
    push_varint(out, dt.day() as u64);
    push_varint(out, dt.hour() as u64);
    push_varint(out, dt.minute() as u64);
    push_varint(out, dt.second() as u64);
    push_varint(out, dt.nanosecond() as u64);
}

fn canonical_time(lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let captures = TIME_RE
        .captures(trimmed)
        .ok_or_else(|| invalid("time", lexical))?;

    let hour: u32 = captures[1].parse().unwrap();
    let minute: u32 = captures[2].parse().unwrap();
    let second: u32 = captures[3].parse().unwrap();
    let nanos = parse_fraction_nanos(captures.get(4).map(|m| m.as_str()));
    let tz = parse_tz(captures.get(5).map(|m| m.as_str()))?;

    let leap = second == 60;
    let second = if leap { 59 } else { second };
    // 24:00:00 wraps to 00:00:00 within the day cycle.
    let hour = if hour == 24 {
        if minute != 0 || second != 0 || nanos != 0 {
            return Err(invalid("time", lexical));
        }
        0
    } else {
        hour
    };
    let mut time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| invalid("time", lexical))?;
    if let Some(offset) = tz {
        time = time
            .overflowing_sub_signed(ChronoDuration::minutes(offset))
            .0;
    }

    let mut out = Vec::new();
    push_varint(&mut out, time.hour() as u64);
    push_varint(&mut out, time.minute() as u64);
    push_varint(&mut out, time.second() as u64);
    push_varint(&mut out, time.nanosecond() as u64);
    out.push(u8::from(tz.is_some()));
    out.push(u8::from(leap));
    Ok(out)
}

fn canonical_date(lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let captures = DATE_RE
        .captures(trimmed)
        .ok_or_else(|| invalid("date", lexical))?;

    let year: i64 = captures[1].parse().map_err(|_| invalid("date", lexical))?;
    let month: u64 = captures[2].parse().unwrap();
    let day: u64 = captures[3].parse().unwrap();
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid("date", lexical));
    }
    let tz = parse_tz(captures.get(4).map(|m| m.as_str()))?;

    // Dates keep their timezone offset: a date with a timezone denotes
    // a different interval than the same date without one.
    let mut out = Vec::new();
    push_signed(&mut out, year);
    push_varint(&mut out, month);
    push_varint(&mut out, day);
    push_tz(&mut out, tz);
    Ok(out)
}

fn canonical_gregorian(kind: PrimitiveKind, lexical: &str) -> Result<Vec<u8>> {
    let trimmed = lexical.trim_matches(|c: char| c.is_ascii_whitespace());
    let regex = &GREGORIAN_RES
        .iter()
        .find(|(k, _)| *k == kind)
        .expect("gregorian kind")
        .1;
    let captures = regex
        .captures(trimmed)
        .ok_or_else(|| invalid("gregorian", lexical))?;

    let mut out = Vec::new();
    let field_count = captures.len() - 2; // minus whole match and tz
    for i in 1..=field_count {
        let value: i64 = captures[i].parse().map_err(|_| invalid("gregorian", lexical))?;
        push_signed(&mut out, value);
    }
    let tz = parse_tz(captures.get(field_count + 1).map(|m| m.as_str()))?;
    push_tz(&mut out, tz);
    Ok(out)
}
