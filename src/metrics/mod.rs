use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct SessionMetrics {
    events: u64,
    tiles_upserted: u64,
    tiles_removed: u64,
    stale_events_dropped: u64,
    completions_dropped: u64,
    notifications_enqueued: u64,
    phase_changes: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_upsert(&mut self) {
        self.tiles_upserted = self.tiles_upserted.saturating_add(1);
    }

    pub fn record_removals(&mut self, count: usize) {
        if count > 0 {
            self.tiles_removed = self.tiles_removed.saturating_add(count as u64);
        }
    }

    pub fn record_stale_event(&mut self) {
        self.stale_events_dropped = self.stale_events_dropped.saturating_add(1);
    }

    pub fn record_dropped_completion(&mut self) {
        self.completions_dropped = self.completions_dropped.saturating_add(1);
    }

    pub fn record_notification(&mut self) {
        self.notifications_enqueued = self.notifications_enqueued.saturating_add(1);
    }

    pub fn record_phase_change(&mut self) {
        self.phase_changes = self.phase_changes.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            tiles_upserted: self.tiles_upserted,
            tiles_removed: self.tiles_removed,
            stale_events_dropped: self.stale_events_dropped,
            completions_dropped: self.completions_dropped,
            notifications_enqueued: self.notifications_enqueued,
            phase_changes: self.phase_changes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub tiles_upserted: u64,
    pub tiles_removed: u64,
    pub stale_events_dropped: u64,
    pub completions_dropped: u64,
    pub notifications_enqueued: u64,
    pub phase_changes: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "session_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("events".to_string(), json!(self.events));
        map.insert("tiles_upserted".to_string(), json!(self.tiles_upserted));
        map.insert("tiles_removed".to_string(), json!(self.tiles_removed));
        map.insert(
            "stale_events_dropped".to_string(),
            json!(self.stale_events_dropped),
        );
        map.insert(
            "completions_dropped".to_string(),
            json!(self.completions_dropped),
        );
        map.insert(
            "notifications_enqueued".to_string(),
            json!(self.notifications_enqueued),
        );
        map.insert("phase_changes".to_string(), json!(self.phase_changes));
        map
    }
}
