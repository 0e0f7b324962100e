// Election references were written by several generations of the admin tools.
// Depending on the record, the reference is a plain id string, an embedded
// reference object carrying an `id`, or some other scalar. All of them are
// accepted here and none of them raises an error.

use serde_json::Value as JSValue;

/// Returns the id a stored reference points to, if it can be read as one.
///
/// * a string is trimmed
/// * an object yields its `id` field, verbatim, when that field is a non-empty string
/// * numbers, booleans and arrays are coerced to their textual form
///
/// Falsy values (null, false, 0, "") never resolve.
pub fn canonical_reference(raw: &JSValue) -> Option<String> {
    if is_falsy(raw) {
        return None;
    }
    match raw {
        JSValue::String(s) => Some(s.trim().to_string()),
        JSValue::Object(fields) => match fields.get("id") {
            Some(JSValue::String(id)) if !id.is_empty() => Some(id.clone()),
            // A reference object without a usable id has no textual identity.
            _ => None,
        },
        other => coerce_to_string(other),
    }
}

/// True if the stored election reference `raw` designates `target_id`.
///
/// This is deliberately permissive: any shape that reads as the target id matches,
/// including a one-element array holding it. Unrecognized shapes do not match.
pub fn matches_election_id(raw: &JSValue, target_id: &str) -> bool {
    match canonical_reference(raw) {
        Some(id) => id == target_id,
        None => false,
    }
}

/// Same as `matches_election_id` for an optional field.
pub fn matches_election_ref(raw: Option<&JSValue>, target_id: &str) -> bool {
    raw.map(|v| matches_election_id(v, target_id))
        .unwrap_or(false)
}

fn is_falsy(v: &JSValue) -> bool {
    match v {
        JSValue::Null => true,
        JSValue::Bool(b) => !b,
        JSValue::String(s) => s.is_empty(),
        JSValue::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        _ => false,
    }
}

/// Textual form of a loosely typed scalar, the way a browser would print it.
///
/// Objects have no meaningful textual form and return `None`.
pub fn coerce_to_string(v: &JSValue) -> Option<String> {
    match v {
        JSValue::Null => None,
        JSValue::Bool(b) => Some(b.to_string()),
        JSValue::String(s) => Some(s.clone()),
        JSValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                // f64 Display prints 2.0 as "2".
                n.as_f64().map(|f| f.to_string())
            }
        }
        JSValue::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    JSValue::Object(_) => "[object Object]".to_string(),
                    other => coerce_to_string(other).unwrap_or_default(),
                })
                .collect();
            Some(parts.join(","))
        }
        JSValue::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_references_are_trimmed() {
        assert!(matches_election_id(&json!("E1 "), "E1"));
        assert!(matches_election_id(&json!("  E1"), "E1"));
        assert!(!matches_election_id(&json!("e1"), "E1"));
    }

    #[test]
    fn embedded_reference_uses_id_verbatim() {
        assert!(matches_election_id(&json!({"id": "E1"}), "E1"));
        assert!(matches_election_id(
            &json!({"id": "E1", "path": "elections/E1"}),
            "E1"
        ));
        // ids are exact-match
        assert!(!matches_election_id(&json!({"id": "E1 "}), "E1"));
        assert!(!matches_election_id(&json!({"id": 1}), "1"));
        assert!(!matches_election_id(&json!({"path": "elections/E1"}), "E1"));
    }

    #[test]
    fn falsy_references_never_match() {
        assert!(!matches_election_id(&JSValue::Null, "E1"));
        assert!(!matches_election_id(&json!(""), ""));
        assert!(!matches_election_id(&json!(false), "false"));
        assert!(!matches_election_id(&json!(0), "0"));
        assert!(!matches_election_ref(None, "E1"));
    }

    #[test]
    fn scalars_are_coerced() {
        assert!(matches_election_id(&json!(42), "42"));
        assert!(matches_election_id(&json!(true), "true"));
        assert!(matches_election_id(&json!(2.5), "2.5"));
        // Coincidental textual equality is accepted.
        assert!(matches_election_id(&json!(["E1"]), "E1"));
        assert!(!matches_election_id(&json!(["E1", "E2"]), "E1"));
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(canonical_reference(&json!(" E7 ")), Some("E7".to_string()));
        assert_eq!(canonical_reference(&json!({"id": "E7"})), Some("E7".to_string()));
        assert_eq!(canonical_reference(&json!({"id": ""})), None);
        assert_eq!(canonical_reference(&json!(7)), Some("7".to_string()));
        assert_eq!(coerce_to_string(&json!([1, null, "a"])), Some("1,,a".to_string()));
    }
}
