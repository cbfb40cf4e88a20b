//! Property tests for canonical value-space keys: idempotence and
//! lexical-variant collapse.

use proptest::prelude::*;
use xsdc::compiler::{canonical, KeyKind};
use xsdc::model::PrimitiveKind;
use xsdc::NamespaceContext;

fn key(kind: PrimitiveKind, lexical: &str) -> canonical::ValueKey {
    canonical::canonicalize(kind, lexical, &NamespaceContext::new()).unwrap()
}

proptest! {
    #[test]
    fn integer_keys_ignore_leading_zeros(value in any::<i64>(), pad in 0usize..4) {
        let plain = value.to_string();
        let padded = if value < 0 {
            format!("-{}{}", "0".repeat(pad), value.unsigned_abs())
        } else {
            format!("{}{}", "0".repeat(pad), value)
        };
        prop_assert_eq!(
            key(PrimitiveKind::Integer, &padded),
            key(PrimitiveKind::Integer, &plain)
        );
    }

    #[test]
    fn decimal_keys_ignore_trailing_zeros(
        int_part in 0u64..1_000_000,
        frac in 0u32..10_000,
        zeros in 0usize..4,
    ) {
        let plain = format!("{int_part}.{frac}");
        let padded = format!("{plain}{}", "0".repeat(zeros));
        prop_assert_eq!(
            key(PrimitiveKind::Decimal, &padded),
            key(PrimitiveKind::Decimal, &plain)
        );
    }

    #[test]
    fn decimal_sign_distinguishes_nonzero(value in 1u64..1_000_000) {
        let positive = key(PrimitiveKind::Decimal, &value.to_string());
        let negative = key(PrimitiveKind::Decimal, &format!("-{value}"));
        prop_assert_ne!(positive, negative);
    }

    #[test]
    fn double_canonicalization_is_idempotent(value in prop::num::f64::NORMAL) {
        let first = key(PrimitiveKind::Double, &format!("{value}"));
        let canonical_lexical = String::from_utf8(first.bytes.clone()).unwrap();
        let second = key(PrimitiveKind::Double, &canonical_lexical);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn string_keys_are_the_lexical_bytes(s in "[a-zA-Z0-9 ]{0,24}") {
        let k = key(PrimitiveKind::String, &s);
        prop_assert_eq!(k.kind, KeyKind::String);
        prop_assert_eq!(k.bytes, s.into_bytes());
    }

    #[test]
    fn list_framing_counts_items(items in prop::collection::vec(1u32..1000, 0..8)) {
        let keys: Vec<_> = items
            .iter()
            .map(|n| key(PrimitiveKind::Integer, &n.to_string()))
            .collect();
        let framed = canonical::canonicalize_items(&keys);
        prop_assert_eq!(framed.kind, KeyKind::List);
        let (count, _) = canonical::read_varint(&framed.bytes);
        prop_assert_eq!(count, items.len() as u64);
    }

    #[test]
    fn equal_keys_hash_equal(value in any::<i32>()) {
        let a = key(PrimitiveKind::Integer, &value.to_string());
        let b = key(PrimitiveKind::Integer, &format!("{value:+}"));
        prop_assert_eq!(a.hash_key(), b.hash_key());
        prop_assert_eq!(a, b);
    }
}

#[test]
fn datetime_lexical_variants_share_a_key() {
    let a = key(PrimitiveKind::DateTime, "2001-10-26T24:00:00Z");
    let b = key(PrimitiveKind::DateTime, "2001-10-27T00:00:00Z");
    assert_eq!(a, b);
    // Offsets normalize to UTC.
    let c = key(PrimitiveKind::DateTime, "2001-10-27T02:00:00+02:00");
    assert_eq!(a, c);
}

#[test]
fn duration_components_normalize() {
    assert_eq!(key(PrimitiveKind::Duration, "P14M"), key(PrimitiveKind::Duration, "P1Y2M"));
    assert_eq!(
        key(PrimitiveKind::Duration, "PT90M"),
        key(PrimitiveKind::Duration, "PT1H30M")
    );
}
