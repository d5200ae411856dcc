//! Canonical JSON comparison.
//!
//! Values are serialized as pretty JSON with object keys sorted, so two
//! states compare equal exactly when their serialized forms do, independent
//! of map iteration order.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Serialize `value` as canonical pretty JSON (sorted keys, trailing newline).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let value = canonicalize_value(value);
    let mut s = serde_json::to_string_pretty(&value).context("Failed to format snapshot JSON")?;
    s.push('\n');
    Ok(s)
}

/// Assert that two values serialize to the same canonical JSON.
///
/// On mismatch the error names the first differing line.
pub fn assert_json_eq<A: Serialize, B: Serialize>(expected: &A, actual: &B) -> Result<()> {
    let expected = canonical_json(expected)?;
    let actual = canonical_json(actual)?;
    if expected == actual {
        return Ok(());
    }

    let (line, want, got) = expected
        .lines()
        .zip(actual.lines())
        .enumerate()
        .find(|(_, (a, b))| a != b)
        .map(|(i, (a, b))| (i + 1, a.to_string(), b.to_string()))
        .unwrap_or_else(|| {
            (
                expected.lines().count().min(actual.lines().count()) + 1,
                "<end of input>".to_string(),
                "<end of input>".to_string(),
            )
        });
    anyhow::bail!("JSON mismatch at line {line}: expected `{want}`, got `{got}`")
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, canonicalize_value(v));
            }
            Value::Object(out)
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn key_order_does_not_matter() {
        let a: HashMap<&str, i32> = HashMap::from([("b", 2), ("a", 1), ("c", 3)]);
        let b: HashMap<&str, i32> = HashMap::from([("c", 3), ("a", 1), ("b", 2)]);
        assert_json_eq(&a, &b).unwrap();
        assert!(canonical_json(&a).unwrap().find("\"a\"") < canonical_json(&a).unwrap().find("\"b\""));
    }

    #[test]
    fn mismatch_names_the_line() {
        let err = assert_json_eq(&vec![1, 2, 3], &vec![1, 5, 3]).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }
}
