//! Per-endpoint API schema inference from observed [`NetworkBody`] traffic,
//! plus a deterministic OpenAPI 3.0 YAML stub.

use std::collections::HashMap;
use std::sync::OnceLock;

use gasoline_types::NetworkBody;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const MAX_ENDPOINTS: usize = 200;
const MAX_PATHS_PER_ENDPOINT: usize = 20;
const MAX_PARAM_VALUES: usize = 10;
const MAX_RESPONSE_SHAPES: usize = 10;
const MAX_LATENCY_SAMPLES: usize = 100;
/// A query param observed in >90% of calls is treated as required.
const REQUIRED_PARAM_THRESHOLD: f64 = 0.90;

fn uuid_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .unwrap()
    })
}

fn digit_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").unwrap())
}

fn hex_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{16,}$").unwrap())
}

fn email_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn iso_datetime() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap())
}

/// Replace dynamic path segments with placeholders, matching spec.md §4.6.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.is_empty() {
                segment.to_string()
            } else if uuid_segment().is_match(segment) {
                "{uuid}".to_string()
            } else if digit_segment().is_match(segment) {
                "{id}".to_string()
            } else if hex_segment().is_match(segment) {
                "{hash}".to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_of(url: &str) -> (String, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((path, query)) => {
            let params = query
                .split('&')
                .filter_map(|kv| kv.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (path.to_string(), params)
        }
        None => (url.to_string(), Vec::new()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

fn infer_value_type(value: &Value) -> FieldType {
    match value {
        Value::Null => FieldType::Null,
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.trunc() == f {
                    FieldType::Integer
                } else {
                    FieldType::Number
                }
            } else {
                FieldType::Number
            }
        }
        Value::String(_) => FieldType::String,
        Value::Array(_) => FieldType::Array,
        Value::Object(_) => FieldType::Object,
    }
}

/// String-format hint layered on top of [`FieldType::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    Uuid,
    DateTime,
    Email,
    Url,
    Plain,
}

pub fn infer_string_format(s: &str) -> StringFormat {
    if uuid_segment().is_match(s) {
        StringFormat::Uuid
    } else if iso_datetime().is_match(s) {
        StringFormat::DateTime
    } else if email_chars().is_match(s) {
        StringFormat::Email
    } else if s.starts_with("http://") || s.starts_with("https://") {
        StringFormat::Url
    } else {
        StringFormat::Plain
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldStats {
    pub occurrences: u32,
    pub types_seen: Vec<FieldType>,
    pub string_formats: Vec<StringFormat>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParamStats {
    pub occurrences: u32,
    pub sample_values: Vec<String>,
}

/// Everything learned about one "METHOD /normalized/path" endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointSchema {
    pub method: String,
    pub normalized_path: String,
    pub observed_paths: Vec<String>,
    pub total_calls: u32,
    pub query_params: HashMap<String, ParamStats>,
    pub request_fields: HashMap<String, FieldStats>,
    pub response_shapes: HashMap<u16, Vec<Value>>,
    pub latency_samples: Vec<f64>,
}

impl EndpointSchema {
    fn record_paths(&mut self, path: &str) {
        if !self.observed_paths.iter().any(|p| p == path) {
            if self.observed_paths.len() < MAX_PATHS_PER_ENDPOINT {
                self.observed_paths.push(path.to_string());
            }
        }
    }

    fn record_query_params(&mut self, params: &[(String, String)]) {
        for (key, value) in params {
            let stats = self.query_params.entry(key.clone()).or_default();
            stats.occurrences += 1;
            if stats.sample_values.len() < MAX_PARAM_VALUES && !stats.sample_values.contains(value) {
                stats.sample_values.push(value.clone());
            }
        }
    }

    fn record_request_body(&mut self, body: &str) {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
            return;
        };
        for (key, value) in map {
            let stats = self.request_fields.entry(key).or_default();
            stats.occurrences += 1;
            let ty = infer_value_type(&value);
            if !stats.types_seen.contains(&ty) {
                stats.types_seen.push(ty);
            }
            if let Value::String(s) = &value {
                let format = infer_string_format(s);
                if !stats.string_formats.contains(&format) {
                    stats.string_formats.push(format);
                }
            }
        }
    }

    fn record_response(&mut self, status: u16, body: &str) {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return;
        };
        let shapes = self.response_shapes.entry(status).or_default();
        if shapes.len() < MAX_RESPONSE_SHAPES {
            shapes.push(value);
        }
    }

    fn record_latency(&mut self, duration_ms: f64) {
        if self.latency_samples.len() < MAX_LATENCY_SAMPLES {
            self.latency_samples.push(duration_ms);
        }
    }

    /// Query params seen in more than [`REQUIRED_PARAM_THRESHOLD`] of calls.
    pub fn required_query_params(&self) -> Vec<&str> {
        if self.total_calls == 0 {
            return Vec::new();
        }
        self.query_params
            .iter()
            .filter(|(_, stats)| {
                (stats.occurrences as f64 / self.total_calls as f64) >= REQUIRED_PARAM_THRESHOLD
            })
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// True when this endpoint looks like an auth surface: path contains
    /// /auth, /login, /token, or any response shape carries status 401.
    pub fn is_auth_endpoint(&self) -> bool {
        let path_hint = self.normalized_path.contains("/auth")
            || self.normalized_path.contains("/login")
            || self.normalized_path.contains("/token");
        path_hint || self.response_shapes.contains_key(&401)
    }
}

/// Accumulates [`EndpointSchema`]s across ingested network bodies.
#[derive(Debug, Default)]
pub struct SchemaStore {
    endpoints: HashMap<String, EndpointSchema>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_key(method: &str, normalized_path: &str) -> String {
        format!("{} {}", method.to_ascii_uppercase(), normalized_path)
    }

    pub fn observe(&mut self, body: &NetworkBody) {
        let (path, params) = path_of(&body.url);
        let normalized_path = normalize_path(&path);
        let key = Self::endpoint_key(&body.method, &normalized_path);

        if !self.endpoints.contains_key(&key) && self.endpoints.len() >= MAX_ENDPOINTS {
            return;
        }

        let endpoint = self.endpoints.entry(key).or_insert_with(|| EndpointSchema {
            method: body.method.to_ascii_uppercase(),
            normalized_path: normalized_path.clone(),
            ..Default::default()
        });

        endpoint.total_calls += 1;
        endpoint.record_paths(&path);
        endpoint.record_query_params(&params);
        if let Some(req) = &body.request_body {
            endpoint.record_request_body(req);
        }
        if let Some(resp) = &body.response_body {
            endpoint.record_response(body.status, resp);
        }
        endpoint.record_latency(body.duration_ms);
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointSchema> {
        self.endpoints.values()
    }

    pub fn endpoint(&self, method: &str, normalized_path: &str) -> Option<&EndpointSchema> {
        self.endpoints.get(&Self::endpoint_key(method, normalized_path))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Deterministic OpenAPI 3.0 YAML stub: endpoints and methods sorted so
    /// repeated calls over the same data produce byte-identical output.
    pub fn openapi_stub(&self) -> String {
        let mut paths: Vec<&EndpointSchema> = self.endpoints.values().collect();
        paths.sort_by(|a, b| {
            a.normalized_path
                .cmp(&b.normalized_path)
                .then_with(|| a.method.cmp(&b.method))
        });

        let mut by_path: HashMap<&str, Vec<&EndpointSchema>> = HashMap::new();
        for schema in &paths {
            by_path.entry(schema.normalized_path.as_str()).or_default().push(schema);
        }
        let mut path_keys: Vec<&str> = by_path.keys().copied().collect();
        path_keys.sort();

        let has_auth_endpoint = paths.iter().any(|schema| schema.is_auth_endpoint());

        let mut out = String::from("openapi: 3.0.0\ninfo:\n  title: gasoline inferred API\n  version: \"0.1.0\"\npaths:\n");
        for path in path_keys {
            out.push_str(&format!("  {}:\n", path));
            let mut methods = by_path[path].clone();
            methods.sort_by(|a, b| a.method.cmp(&b.method));
            for schema in methods {
                out.push_str(&format!("    {}:\n", schema.method.to_ascii_lowercase()));
                if schema.is_auth_endpoint() {
                    out.push_str("      security:\n        - bearerAuth: []\n");
                }
                out.push_str("      responses:\n");
                let mut statuses: Vec<&u16> = schema.response_shapes.keys().collect();
                statuses.sort();
                for status in statuses {
                    out.push_str(&format!("        '{}':\n          description: observed response\n", status));
                }
                let mut params: Vec<&str> = schema.query_params.keys().map(String::as_str).collect();
                params.sort();
                if !params.is_empty() {
                    out.push_str("      parameters:\n");
                    let required = schema.required_query_params();
                    for param in params {
                        out.push_str(&format!(
                            "        - name: {}\n          in: query\n          required: {}\n          schema:\n            type: string\n",
                            param,
                            required.contains(&param)
                        ));
                    }
                }
            }
        }
        if has_auth_endpoint {
            out.push_str("components:\n  securitySchemes:\n    bearerAuth:\n      type: http\n      scheme: bearer\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn body(method: &str, url: &str, status: u16) -> NetworkBody {
        NetworkBody {
            tab_id: 1,
            url: url.to_string(),
            method: method.to_string(),
            status,
            duration_ms: 42.0,
            request_body: None,
            response_body: Some(r#"{"id": 1, "name": "a"}"#.to_string()),
            content_type: Some("application/json".to_string()),
            response_headers: Default::default(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn normalizes_uuid_and_numeric_segments() {
        assert_eq!(
            normalize_path("/users/550e8400-e29b-41d4-a716-446655440000"),
            "/users/{uuid}"
        );
        assert_eq!(normalize_path("/users/42/posts/7"), "/users/{id}/posts/{id}");
    }

    #[test]
    fn groups_by_normalized_endpoint() {
        let mut store = SchemaStore::new();
        store.observe(&body("GET", "/users/1", 200));
        store.observe(&body("GET", "/users/2", 200));
        assert_eq!(store.len(), 1);
        let endpoint = store.endpoint("GET", "/users/{id}").unwrap();
        assert_eq!(endpoint.total_calls, 2);
    }

    #[test]
    fn detects_auth_endpoint_by_status() {
        let mut store = SchemaStore::new();
        store.observe(&body("POST", "/session", 401));
        let endpoint = store.endpoint("POST", "/session").unwrap();
        assert!(endpoint.is_auth_endpoint());
    }

    #[test]
    fn openapi_stub_is_deterministic() {
        let mut store = SchemaStore::new();
        store.observe(&body("GET", "/users/1", 200));
        store.observe(&body("POST", "/users/1", 201));
        assert_eq!(store.openapi_stub(), store.openapi_stub());
    }

    #[test]
    fn openapi_stub_marks_auth_endpoints_with_bearer_security() {
        let mut store = SchemaStore::new();
        store.observe(&body("POST", "/login", 200));
        let stub = store.openapi_stub();
        assert!(stub.contains("security:\n        - bearerAuth: []"));
        assert!(stub.contains("securitySchemes:\n    bearerAuth:"));
    }
}
