//! `{{ key }}` template interpolation over the execution namespace.
//!
//! Placeholders are scanned manually (no regex pass over user data).
//! Keys use dot notation into the namespace object; unmatched placeholders
//! are left literal, which makes interpolation idempotent on templates
//! whose keys never resolve.

use serde_json::Value;

/// Interpolate `{{ key }}` placeholders in `template` against `namespace`.
///
/// `namespace` is a JSON object (variables at the top level, node outputs
/// under their node ids). String values are inserted raw; other values are
/// rendered as compact JSON. An unmatched key leaves the placeholder
/// untouched.
pub fn interpolate(template: &str, namespace: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = after_open[..end].trim();
                match resolve_path(namespace, key) {
                    Some(value) => out.push_str(&render_value(value)),
                    None => {
                        // Unmatched placeholder stays literal.
                        out.push_str(&rest[start..start + 2 + end + 2]);
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated opener; emit the remainder as-is.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolve a dot-notation path (`a.b.c`) into a JSON value.
///
/// Numeric segments index into arrays. Returns `None` when any segment is
/// missing.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Interpolate every string leaf of a JSON value in place of a single
/// template. Used for configured request bodies and webhook payloads.
pub fn interpolate_value(value: &Value, namespace: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, namespace)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, namespace))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, namespace)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
