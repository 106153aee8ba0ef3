//! API contract validation: learn an established response shape per
//! endpoint, then flag departures from it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gasoline_types::NetworkBody;
use serde::Serialize;
use serde_json::Value;

/// Successful observations required before a shape is "established".
pub const DEFAULT_MIN_CALLS_TO_ESTABLISH_SHAPE: u32 = 3;
/// Recursive shape extraction stops at this depth.
const SHAPE_DEPTH_CAP: usize = 3;
/// Violations per endpoint beyond this are not recorded as new entries;
/// matching existing violations still bump their occurrence counter.
const MAX_VIOLATIONS_PER_ENDPOINT: usize = 10;
/// Recent response statuses kept per endpoint for error-spike detection.
const STATUS_HISTORY_CAP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    ShapeChange,
    NewField,
    TypeChange,
    NullField,
    ErrorSpike,
}

impl ViolationKind {
    pub fn severity(&self) -> ViolationSeverity {
        match self {
            ViolationKind::ErrorSpike => ViolationSeverity::Critical,
            ViolationKind::ShapeChange | ViolationKind::TypeChange => ViolationSeverity::High,
            ViolationKind::NullField => ViolationSeverity::Medium,
            ViolationKind::NewField => ViolationSeverity::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: ViolationSeverity,
    pub field: Option<String>,
    pub occurrences: u32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Violation {
    fn key(&self) -> (ViolationKind, Option<String>) {
        (self.kind.clone(), self.field.clone())
    }
}

/// Type-only recursive shape: leaves are type names, objects keep field
/// names, arrays wrap their element shape in `$array`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Leaf(String),
    Array(Box<Shape>),
    Object(HashMap<String, Shape>),
}

pub fn extract_shape(value: &Value, depth: usize) -> Shape {
    if depth >= SHAPE_DEPTH_CAP {
        return Shape::Leaf("truncated".to_string());
    }
    match value {
        Value::Null => Shape::Leaf("null".to_string()),
        Value::Bool(_) => Shape::Leaf("boolean".to_string()),
        Value::Number(n) => {
            if n.as_f64().map(|f| f.trunc() == f).unwrap_or(false) {
                Shape::Leaf("integer".to_string())
            } else {
                Shape::Leaf("number".to_string())
            }
        }
        Value::String(_) => Shape::Leaf("string".to_string()),
        Value::Array(items) => {
            let element = items
                .first()
                .map(|v| extract_shape(v, depth + 1))
                .unwrap_or(Shape::Leaf("unknown".to_string()));
            Shape::Array(Box::new(element))
        }
        Value::Object(map) => Shape::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), extract_shape(v, depth + 1)))
                .collect(),
        ),
    }
}

fn merge_shapes(a: &Shape, b: &Shape) -> Shape {
    match (a, b) {
        (Shape::Object(left), Shape::Object(right)) => {
            let mut merged = left.clone();
            for (k, v) in right {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
            Shape::Object(merged)
        }
        (Shape::Array(left), Shape::Array(right)) => {
            Shape::Array(Box::new(merge_shapes(left, right)))
        }
        (existing, _) => existing.clone(),
    }
}

struct EndpointState {
    min_calls_to_establish_shape: u32,
    success_count: u32,
    established: Option<Shape>,
    pending_shape: Option<Shape>,
    recent_statuses: Vec<u16>,
    violations: Vec<Violation>,
}

impl EndpointState {
    fn new(min_calls_to_establish_shape: u32) -> Self {
        Self {
            min_calls_to_establish_shape,
            success_count: 0,
            established: None,
            pending_shape: None,
            recent_statuses: Vec::new(),
            violations: Vec::new(),
        }
    }

    fn record_status(&mut self, status: u16) {
        self.recent_statuses.push(status);
        if self.recent_statuses.len() > STATUS_HISTORY_CAP {
            self.recent_statuses.remove(0);
        }
    }

    fn error_spike(&self) -> bool {
        let len = self.recent_statuses.len();
        if len < 4 {
            return false;
        }
        let tail = &self.recent_statuses[len - 2..];
        let head = &self.recent_statuses[..len - 2];
        let prior_successes = head.iter().rev().take(4).filter(|s| (200..300).contains(*s)).count();
        tail.iter().all(|s| *s >= 500) && prior_successes >= 2
    }

    fn record_violation(&mut self, kind: ViolationKind, field: Option<String>, now: DateTime<Utc>) {
        let severity = kind.severity();
        if let Some(existing) = self
            .violations
            .iter_mut()
            .find(|v| v.key() == (kind.clone(), field.clone()))
        {
            existing.occurrences += 1;
            existing.last_seen_at = now;
            return;
        }
        if self.violations.len() >= MAX_VIOLATIONS_PER_ENDPOINT {
            return;
        }
        self.violations.push(Violation {
            kind,
            severity,
            field,
            occurrences: 1,
            first_seen_at: now,
            last_seen_at: now,
        });
    }

    fn diff_against_established(&mut self, observed: &Shape, now: DateTime<Utc>) {
        let Some(established) = self.established.clone() else {
            return;
        };
        let (Shape::Object(est_fields), Shape::Object(obs_fields)) = (&established, observed) else {
            return;
        };
        for (field, shape) in est_fields {
            match obs_fields.get(field) {
                None => self.record_violation(ViolationKind::ShapeChange, Some(field.clone()), now),
                Some(Shape::Leaf(t)) if t == "null" && !matches!(shape, Shape::Leaf(t2) if t2 == "null") => {
                    self.record_violation(ViolationKind::NullField, Some(field.clone()), now)
                }
                Some(observed_shape) if observed_shape != shape && !is_null_leaf(observed_shape) => {
                    self.record_violation(ViolationKind::TypeChange, Some(field.clone()), now)
                }
                _ => {}
            }
        }
        for field in obs_fields.keys() {
            if !est_fields.contains_key(field) {
                self.record_violation(ViolationKind::NewField, Some(field.clone()), now);
            }
        }
    }
}

fn is_null_leaf(shape: &Shape) -> bool {
    matches!(shape, Shape::Leaf(t) if t == "null")
}

/// Learns and checks per-endpoint response shapes across ingested
/// network bodies, keyed the same way as [`crate::schema::SchemaStore`].
#[derive(Default)]
pub struct ContractValidator {
    endpoints: HashMap<String, EndpointState>,
    min_calls_to_establish_shape: u32,
}

impl ContractValidator {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            min_calls_to_establish_shape: DEFAULT_MIN_CALLS_TO_ESTABLISH_SHAPE,
        }
    }

    pub fn with_min_calls_to_establish_shape(min_calls: u32) -> Self {
        Self {
            endpoints: HashMap::new(),
            min_calls_to_establish_shape: min_calls,
        }
    }

    pub fn observe(&mut self, key: &str, body: &NetworkBody) {
        let min_calls = self.min_calls_to_establish_shape;
        let state = self
            .endpoints
            .entry(key.to_string())
            .or_insert_with(|| EndpointState::new(min_calls));
        state.record_status(body.status);

        let now = body.captured_at;
        if state.error_spike() {
            state.record_violation(ViolationKind::ErrorSpike, None, now);
        }

        if !(200..300).contains(&body.status) {
            return;
        }
        let Some(response) = body.response_body.as_deref().and_then(|s| serde_json::from_str::<Value>(s).ok())
        else {
            return;
        };
        let observed = extract_shape(&response, 0);

        match &state.established {
            None => {
                state.success_count += 1;
                state.pending_shape = Some(match state.pending_shape.take() {
                    Some(prev) => merge_shapes(&prev, &observed),
                    None => observed,
                });
                if state.success_count >= state.min_calls_to_establish_shape {
                    state.established = state.pending_shape.take();
                }
            }
            Some(_) => state.diff_against_established(&observed, now),
        }
    }

    pub fn violations(&self, key: &str) -> &[Violation] {
        self.endpoints.get(key).map(|s| s.violations.as_slice()).unwrap_or(&[])
    }

    pub fn is_established(&self, key: &str) -> bool {
        self.endpoints.get(key).map(|s| s.established.is_some() && s.success_count >= s.min_calls_to_establish_shape).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn body(status: u16, response: &str) -> NetworkBody {
        NetworkBody {
            tab_id: 1,
            url: "/users/1".to_string(),
            method: "GET".to_string(),
            status,
            duration_ms: 10.0,
            request_body: None,
            response_body: Some(response.to_string()),
            content_type: Some("application/json".to_string()),
            response_headers: Default::default(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn establishes_shape_after_min_calls() {
        let mut validator = ContractValidator::new();
        let key = "GET /users/{id}";
        for _ in 0..3 {
            validator.observe(key, &body(200, r#"{"id":1,"name":"a"}"#));
        }
        assert!(validator.is_established(key));
    }

    #[test]
    fn flags_new_field_as_low_severity() {
        let mut validator = ContractValidator::new();
        let key = "GET /users/{id}";
        for _ in 0..3 {
            validator.observe(key, &body(200, r#"{"id":1,"name":"a"}"#));
        }
        validator.observe(key, &body(200, r#"{"id":1,"name":"a","extra":true}"#));
        let violations = validator.violations(key);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::NewField);
        assert_eq!(violations[0].severity, ViolationSeverity::Low);
    }

    #[test]
    fn flags_type_change_as_high_severity() {
        let mut validator = ContractValidator::new();
        let key = "GET /users/{id}";
        for _ in 0..3 {
            validator.observe(key, &body(200, r#"{"id":1,"name":"a"}"#));
        }
        validator.observe(key, &body(200, r#"{"id":"not-a-number","name":"a"}"#));
        let violations = validator.violations(key);
        assert!(violations.iter().any(|v| v.kind == ViolationKind::TypeChange));
    }

    #[test]
    fn repeated_violation_bumps_occurrence_not_duplicate() {
        let mut validator = ContractValidator::new();
        let key = "GET /users/{id}";
        for _ in 0..3 {
            validator.observe(key, &body(200, r#"{"id":1,"name":"a"}"#));
        }
        validator.observe(key, &body(200, r#"{"id":1,"name":"a","extra":true}"#));
        validator.observe(key, &body(200, r#"{"id":1,"name":"a","extra":true}"#));
        let violations = validator.violations(key);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].occurrences, 2);
    }
}
