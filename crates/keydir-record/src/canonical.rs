use serde_json::Value;

/// Produce a deterministic canonical JSON representation.
///
/// Rules:
/// - Object keys sorted lexicographically
/// - No unnecessary whitespace (compact format)
/// - Numbers in their canonical form
/// - Null values included
///
/// Every payload the signing authority covers passes through this form, so
/// two distinct logical payloads never serialize to the same bytes.
pub fn canonicalize(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(canonicalize).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let pairs: Vec<String> = keys
                .iter()
                .map(|k| {
                    let key = serde_json::to_string(*k).unwrap();
                    let val = canonicalize(map.get(*k).unwrap());
                    format!("{key}:{val}")
                })
                .collect();
            format!("{{{}}}", pairs.join(","))
        }
    }
}
