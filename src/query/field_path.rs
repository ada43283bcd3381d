use serde_json::Value;

/// Resolve a dotted path against a JSON value. Unknown segments resolve to
/// "no value", never an error. Array segments accept numeric indexes.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(part)?,
            Value::Array(items) => {
                let index: usize = part.parse().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// String representation used for substring matching. Strings are used
/// as-is; everything else falls back to its JSON rendering.
pub fn as_search_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
