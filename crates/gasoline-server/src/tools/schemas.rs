//! Static JSON Schema definitions for `tools/list`. Kept separate from the
//! handlers so the wire-visible surface (names, discriminators) is easy to
//! diff against spec.md §4.3 in one place.

use gasoline_types::Tool;

pub fn all_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "observe".to_string(),
            description: "Read captured browser telemetry: errors, logs, network, websocket, actions, page state, or accessibility data.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "what": {
                        "type": "string",
                        "enum": ["errors", "logs", "network", "websocket", "websocket_status", "actions", "page", "accessibility", "a11y_tree"]
                    },
                    "selector": {"type": "string"},
                    "limit": {"type": "integer"}
                },
                "required": ["what"]
            }),
        },
        Tool {
            name: "analyze".to_string(),
            description: "Run an analysis over captured telemetry: performance regressions, API schema/contract, accessibility, checkpoint diffs, error clusters, or recorded history.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "enum": ["performance", "api", "accessibility", "changes", "errors", "history"]
                    },
                    "query": {"type": "object"}
                },
                "required": ["target"]
            }),
        },
        Tool {
            name: "generate".to_string(),
            description: "Produce a derived artifact from captured data: HAR, SARIF, a reproduction script, an OpenAPI stub, CSP directives, or a test skeleton.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["har", "sarif", "reproduction", "openapi_stub", "csp", "test"]
                    },
                    "options": {"type": "object"}
                },
                "required": ["type"]
            }),
        },
        Tool {
            name: "configure".to_string(),
            description: "Mutate capture settings, manage noise rules, or read/write project-local key/value state.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["capture", "store", "load", "list", "noise_rule", "dismiss_noise", "record_event", "reset"]
                    }
                },
                "required": ["action"],
                "additionalProperties": true
            }),
        },
        Tool {
            name: "interact".to_string(),
            description: "Perform a browser action through the paired extension (click, type, navigate, execute JavaScript, ...). Gated by the AI Web Pilot toggle.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["highlight_element", "manage_state", "execute_javascript", "click", "type", "navigate", "scroll", "fill_form"]
                    }
                },
                "required": ["action"],
                "additionalProperties": true
            }),
        },
    ]
}
