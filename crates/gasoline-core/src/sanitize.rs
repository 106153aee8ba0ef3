use regex::Regex;
use std::sync::OnceLock;

/// Header names stripped entirely before any storage, beyond the
/// key-presence-only set kept on [`gasoline_types::NetworkBody`].
pub const SENSITIVE_HEADER_NAMES: &[&str] = &["authorization", "cookie", "x-api-key"];

fn secret_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)token|secret|password|passwd|api[_-]?key").expect("valid regex")
    })
}

/// True when a header name looks like it carries a credential, by name
/// pattern rather than an explicit list (covers `X-Auth-Token`, custom
/// `*-secret` headers, etc).
pub fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_HEADER_NAMES.contains(&lower.as_str()) || secret_pattern().is_match(&lower)
}

/// Strip sensitive headers from a header map-like iterator, returning only
/// the headers that survived.
pub fn strip_sensitive_headers<I>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    headers
        .into_iter()
        .filter(|(name, _)| !is_sensitive_header(name))
        .collect()
}

/// Depth-bounded, cycle-detecting JSON flattener used at the capture
/// boundary for extension-supplied payloads (`_actions`, `_aiContext`,
/// `interact` arguments) where a cyclic object graph could otherwise hang
/// serialization. Gasoline never attempts to re-hydrate the flattened form
/// server-side (design note, spec.md §9).
pub fn flatten_bounded(value: &serde_json::Value, max_depth: usize) -> serde_json::Value {
    flatten_inner(value, max_depth, &mut Vec::new())
}

fn flatten_inner(
    value: &serde_json::Value,
    depth_remaining: usize,
    seen: &mut Vec<*const serde_json::Value>,
) -> serde_json::Value {
    if depth_remaining == 0 {
        return serde_json::Value::String("[depth-limit]".to_string());
    }
    let ptr = value as *const serde_json::Value;
    if seen.contains(&ptr) {
        return serde_json::Value::String("[cycle]".to_string());
    }
    seen.push(ptr);
    let out = match value {
        serde_json::Value::Object(map) => {
            let mut new_map = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                new_map.insert(k.clone(), flatten_inner(v, depth_remaining - 1, seen));
            }
            serde_json::Value::Object(new_map)
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|v| flatten_inner(v, depth_remaining - 1, seen))
                .collect(),
        ),
        other => other.clone(),
    };
    seen.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_sensitive_headers() {
        assert!(is_sensitive_header("Authorization"));
        assert!(is_sensitive_header("Cookie"));
        assert!(is_sensitive_header("X-Api-Key"));
        assert!(is_sensitive_header("X-Auth-Token"));
        assert!(!is_sensitive_header("Content-Type"));
    }

    #[test]
    fn flatten_respects_depth_cap() {
        let deep = serde_json::json!({"a": {"b": {"c": {"d": "x"}}}});
        let flat = flatten_bounded(&deep, 2);
        assert_eq!(flat["a"]["b"], serde_json::json!("[depth-limit]"));
    }
}
