use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::TabId;

/// Request-body capture cap (8 KiB).
pub const REQUEST_BODY_CAP: usize = 8 * 1024;
/// Response-body capture cap (16 KiB).
pub const RESPONSE_BODY_CAP: usize = 16 * 1024;
/// WebSocket payload-preview cap (4 KiB).
pub const WS_PAYLOAD_PREVIEW_CAP: usize = 4 * 1024;

/// Headers that are stripped (or reduced to key-presence) before storage.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

/// A full request/response pair captured by the extension's network
/// interception, with bodies truncated to the caps above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBody {
    pub tab_id: TabId,
    pub url: String,
    pub method: String,
    pub status: u16,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Sanitized: sensitive headers are reduced to key presence (empty value).
    #[serde(default)]
    pub response_headers: HashMap<String, String>,
    pub captured_at: DateTime<Utc>,
}

impl NetworkBody {
    /// Truncate bodies and strip sensitive header values in place. Called at
    /// ingest before the entry is ever stored.
    pub fn sanitize(&mut self) {
        if let Some(body) = &mut self.request_body {
            truncate_in_place(body, REQUEST_BODY_CAP);
        }
        if let Some(body) = &mut self.response_body {
            truncate_in_place(body, RESPONSE_BODY_CAP);
        }
        for (name, value) in self.response_headers.iter_mut() {
            if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                value.clear();
            }
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.request_body.as_ref().map_or(0, |s| s.len())
            + self.response_body.as_ref().map_or(0, |s| s.len())
            + self.url.len()
    }
}

fn truncate_in_place(s: &mut String, cap: usize) {
    if s.len() > cap {
        let mut idx = cap;
        while !s.is_char_boundary(idx) {
            idx -= 1;
        }
        s.truncate(idx);
    }
}

/// WebSocket lifecycle event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebSocketEventKind {
    Open,
    Close,
    Message,
}

/// Message direction relative to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebSocketDirection {
    Incoming,
    Outgoing,
}

/// One observed WebSocket lifecycle or message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketEvent {
    pub connection_id: String,
    pub url: String,
    pub event: WebSocketEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<WebSocketDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_preview: Option<String>,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl WebSocketEvent {
    pub fn sanitize(&mut self) {
        if let Some(preview) = &mut self.payload_preview {
            truncate_in_place(preview, WS_PAYLOAD_PREVIEW_CAP);
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.payload_preview.as_ref().map_or(0, |s| s.len())
    }
}

/// User-action type captured by the extension's action recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Input,
    Select,
    Keypress,
    Navigate,
    Scroll,
}

/// Multi-strategy element selector, tried in priority order:
/// testId > ariaLabel > role+name > id > cssPath.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_path: Option<String>,
}

impl Selectors {
    /// Best available selector per the documented priority order.
    pub fn best(&self) -> Option<&str> {
        self.test_id
            .as_deref()
            .or(self.aria_label.as_deref())
            .or_else(|| match (&self.role, &self.name) {
                (Some(_), Some(n)) => Some(n.as_str()),
                _ => None,
            })
            .or(self.id.as_deref())
            .or(self.css_path.as_deref())
    }
}

/// One recorded user action, kept in a ring buffer capped at 50.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub selectors: Selectors,
    /// Redacted to `"[redacted]"` when `kind == Input` and the field is a
    /// password input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EnhancedAction {
    pub fn redact_if_password(&mut self, is_password: bool) {
        if is_password && self.kind == ActionKind::Input {
            self.value = Some("[redacted]".to_string());
        }
    }
}
