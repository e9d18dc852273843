//! Canonical, order-independent rendering of JSON values.
//!
//! Two clients may send the same logical payload with keys or list elements
//! in a different order. Both must hash to the same signature, so the
//! pre-image is built from a rendering that sorts everything:
//!
//! - mapping → `key=value` pairs, keys sorted, joined with no separator
//! - list → `[a,b,c]`, elements rendered first, then the renderings sorted
//! - string → the raw text, without quotes
//! - number → its JSON text (`12`, `1.5`)
//! - bool, null → `True`, `False`, `None`, the spelling deployed clients
//!   already sign with
//!
//! An empty list renders as `[]` and an empty mapping as the empty string.

use serde_json::Value;

/// Renders `value` canonically. Pure and deterministic.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    render(value, &mut out);
    out
}

fn render(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            // serde_json's default map is a BTreeMap, but with the
            // `preserve_order` feature it keeps insertion order. Sort
            // explicitly so the result never depends on that feature.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                out.push_str(key);
                out.push('=');
                render(&map[key], out);
            }
        }
        Value::Array(items) => {
            let mut rendered: Vec<String> =
                items.iter().map(canonical_string).collect();
            rendered.sort();
            out.push('[');
            out.push_str(&rendered.join(","));
            out.push(']');
        }
        Value::String(s) => out.push_str(s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "True" } else { "False" }),
        Value::Null => out.push_str("None"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_canonical_map_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();

        assert_eq!(canonical_string(&a), canonical_string(&b));
        assert_eq!(canonical_string(&a), "a=1b=2");
    }

    #[test]
    fn test_canonical_list_order_does_not_matter() {
        assert_eq!(
            canonical_string(&json!([1, 2])),
            canonical_string(&json!([2, 1]))
        );
        assert_eq!(canonical_string(&json!([2, 1])), "[1,2]");
    }

    #[test]
    fn test_canonical_empty_collections() {
        assert_eq!(canonical_string(&json!([])), "[]");
        assert_eq!(canonical_string(&json!({})), "");
    }

    #[test]
    fn test_canonical_scalars_render_plain() {
        assert_eq!(canonical_string(&json!("coins")), "coins");
        assert_eq!(canonical_string(&json!(42)), "42");
        assert_eq!(canonical_string(&json!(true)), "True");
        assert_eq!(canonical_string(&json!(false)), "False");
        assert_eq!(canonical_string(&json!(null)), "None");
    }

    #[test]
    fn test_canonical_nested_structure() {
        let body = json!({
            "r": ["lives", "coins"],
            "0": ["level"],
            "c": {"cape": true, "boots": false},
        });

        assert_eq!(
            canonical_string(&body),
            "0=[level]c=boots=Falsecape=Truer=[coins,lives]"
        );
    }

    #[test]
    fn test_canonical_reply_with_costumes_matches_known_rendering() {
        let reply = json!({
            "x": null,
            "isSuccess": 1,
            "c": {"neon": false, "cape": true},
        });

        assert_eq!(
            canonical_string(&reply),
            "c=cape=Trueneon=FalseisSuccess=1x=None"
        );
    }

    #[test]
    fn test_canonical_list_of_maps_sorted_by_rendering() {
        let a = json!([{"name": "b", "count": 1}, {"name": "a", "count": 2}]);
        let b = json!([{"count": 2, "name": "a"}, {"count": 1, "name": "b"}]);

        assert_eq!(canonical_string(&a), canonical_string(&b));
        assert_eq!(canonical_string(&a), "[count=1name=b,count=2name=a]");
    }
}
