use gasoline_types::WebSocketDirection;

/// Shared query filter across `/logs`, `/network-bodies`, and
/// `/websocket-events` reads.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub url_contains: Option<String>,
    pub method: Option<String>,
    pub status_min: Option<u16>,
    pub status_max: Option<u16>,
    pub direction: Option<WebSocketDirection>,
    pub limit: Option<usize>,
}

impl QueryFilter {
    pub fn matches_url(&self, url: &str) -> bool {
        self.url_contains
            .as_ref()
            .is_none_or(|needle| url.contains(needle.as_str()))
    }

    pub fn matches_method(&self, method: &str) -> bool {
        self.method
            .as_ref()
            .is_none_or(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn matches_status(&self, status: u16) -> bool {
        self.status_min.is_none_or(|min| status >= min)
            && self.status_max.is_none_or(|max| status <= max)
    }

    pub fn matches_direction(&self, direction: Option<WebSocketDirection>) -> bool {
        match (self.direction, direction) {
            (None, _) => true,
            (Some(want), Some(have)) => want == have,
            (Some(_), None) => false,
        }
    }

    pub fn apply_limit<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(limit) = self.limit {
            if items.len() > limit {
                let drop = items.len() - limit;
                items.drain(0..drop);
            }
        }
        items
    }
}
