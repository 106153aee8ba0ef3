use gasoline_types::TabId;
use parking_lot::RwLock;

/// Process-wide "which tab is tracked" state. While a tab is tracked, the
/// capture store rejects telemetry whose `tab_id` doesn't match.
#[derive(Debug, Default)]
pub struct TrackedTabState {
    inner: RwLock<Option<TrackedTab>>,
}

#[derive(Debug, Clone)]
struct TrackedTab {
    id: TabId,
    url: Option<String>,
}

impl TrackedTabState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, id: TabId, url: Option<String>) {
        *self.inner.write() = Some(TrackedTab { id, url });
    }

    /// Cleared on a browser-restart signal from the extension.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn current(&self) -> Option<TabId> {
        self.inner.read().as_ref().map(|t| t.id)
    }

    pub fn current_url(&self) -> Option<String> {
        self.inner.read().as_ref().and_then(|t| t.url.clone())
    }

    /// True when tracking is inactive (accept everything) or `tab_id`
    /// matches the tracked tab.
    pub fn accepts(&self, tab_id: TabId) -> bool {
        match self.inner.read().as_ref() {
            Some(tracked) => tracked.id == tab_id,
            None => true,
        }
    }
}
