use gasoline_types::{EnhancedAction, NetworkBody, PerformanceSnapshot, TelemetryEntry, WebSocketEvent};

use crate::ring::EstimateBytes;

impl EstimateBytes for TelemetryEntry {
    fn estimated_bytes(&self) -> usize {
        TelemetryEntry::estimated_bytes(self)
    }
}

impl EstimateBytes for WebSocketEvent {
    fn estimated_bytes(&self) -> usize {
        WebSocketEvent::estimated_bytes(self)
    }
}

impl EstimateBytes for NetworkBody {
    fn estimated_bytes(&self) -> usize {
        NetworkBody::estimated_bytes(self)
    }
}

impl EstimateBytes for EnhancedAction {
    fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.value.as_ref().map_or(0, |v| v.len())
    }
}

impl EstimateBytes for PerformanceSnapshot {
    fn estimated_bytes(&self) -> usize {
        PerformanceSnapshot::estimated_bytes(self)
    }
}
