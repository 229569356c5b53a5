//! Sanitization of source values into warehouse-safe scalars.
//!
//! The source conflates "absent", "false" and "empty" in ways the
//! destination's typed columns cannot tolerate, so sanitization trades
//! fidelity for write-safety. The conversion is total and deterministic:
//! it never fails, and re-sanitizing its own output is a no-op.
//!
//! Rules, first match wins:
//! 1. null -> null
//! 2. empty list/object -> null
//! 3. non-empty list/object -> JSON-encoded string
//! 4. boolean -> the literal string "true"/"false"
//! 5. whitespace-only string -> null
//! 6. everything else passes through unchanged

use crate::{Record, SanitizedRecord, Scalar};
use serde_json::Value;

/// Sanitize a single dynamic value into a scalar.
pub fn sanitize_value(value: &Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Array(items) if items.is_empty() => Scalar::Null,
        Value::Object(fields) if fields.is_empty() => Scalar::Null,
        Value::Array(_) | Value::Object(_) => {
            // Serialization of a plain Value cannot fail.
            Scalar::Text(value.to_string())
        }
        Value::Bool(b) => Scalar::Text(if *b { "true" } else { "false" }.to_string()),
        Value::String(s) if s.trim().is_empty() => Scalar::Null,
        Value::String(s) => Scalar::Text(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            // u64 overflow and true floats both land here; the destination
            // integer column is int64 so this is the only safe widening.
            None => Scalar::Float(n.as_f64().unwrap_or_default()),
        },
    }
}

/// Sanitize every field of a record, producing a fresh map.
pub fn sanitize_record(record: &Record) -> SanitizedRecord {
    SanitizedRecord {
        fields: record
            .iter()
            .map(|(name, value)| (name.clone(), sanitize_value(value)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn null_stays_null() {
        assert_eq!(sanitize_value(&Value::Null), Scalar::Null);
    }

    #[test]
    fn empty_collections_become_null() {
        assert_eq!(sanitize_value(&json!([])), Scalar::Null);
        assert_eq!(sanitize_value(&json!({})), Scalar::Null);
    }

    #[test]
    fn collections_become_json_strings() {
        assert_eq!(
            sanitize_value(&json!([1, 2])),
            Scalar::Text("[1,2]".to_string())
        );
        assert_eq!(
            sanitize_value(&json!({"a": 1})),
            Scalar::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn booleans_become_strings() {
        assert_eq!(sanitize_value(&json!(true)), Scalar::Text("true".into()));
        assert_eq!(sanitize_value(&json!(false)), Scalar::Text("false".into()));
    }

    #[test]
    fn blank_strings_become_null() {
        assert_eq!(sanitize_value(&json!("")), Scalar::Null);
        assert_eq!(sanitize_value(&json!("  ")), Scalar::Null);
        assert_eq!(sanitize_value(&json!("\t\n")), Scalar::Null);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize_value(&json!(42)), Scalar::Int(42));
        assert_eq!(sanitize_value(&json!(-7)), Scalar::Int(-7));
        assert_eq!(sanitize_value(&json!(99.5)), Scalar::Float(99.5));
        assert_eq!(
            sanitize_value(&json!("SO0042")),
            Scalar::Text("SO0042".into())
        );
    }

    #[test]
    fn record_sanitizes_every_field() {
        let record = Record::new([
            ("id".to_string(), json!(5)),
            ("active".to_string(), json!(false)),
            ("tags".to_string(), json!([])),
            ("lines".to_string(), json!([{"qty": 2}])),
            ("note".to_string(), json!("  ")),
        ]);
        let sanitized = sanitize_record(&record);
        assert_eq!(sanitized.get("id"), Some(&Scalar::Int(5)));
        assert_eq!(sanitized.get("active"), Some(&Scalar::Text("false".into())));
        assert_eq!(sanitized.get("tags"), Some(&Scalar::Null));
        assert_eq!(
            sanitized.get("lines"),
            Some(&Scalar::Text("[{\"qty\":2}]".into()))
        );
        assert_eq!(sanitized.get("note"), Some(&Scalar::Null));
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(Value::from),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(value in value_strategy()) {
            let once = sanitize_value(&value);
            let twice = sanitize_value(&once.clone().into_value());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn sanitize_never_yields_forbidden_shapes(value in value_strategy()) {
            let json = serde_json::to_value(sanitize_value(&value)).unwrap();
            prop_assert!(!json.is_boolean());
            prop_assert!(!json.is_array());
            prop_assert!(!json.is_object());
        }
    }
}
