use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::PageSizes;
use crate::logging::Logger;
use crate::metrics::SessionMetrics;

use super::audit::{NullSessionAudit, SessionAudit};

/// Policy knobs, loadable from JSON. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub session_id: String,
    pub skip_preview: bool,
    pub portrait_page_size: usize,
    pub landscape_page_size: usize,
    pub notification_auto_dismiss_ms: u64,
    pub max_queued_notifications: usize,
    pub auto_start_streaming: bool,
    /// Roles for which streaming auto-starts. Empty means any role.
    pub auto_start_streaming_roles: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_id: "default".to_string(),
            skip_preview: false,
            portrait_page_size: 4,
            landscape_page_size: 2,
            notification_auto_dismiss_ms: 5_000,
            max_queued_notifications: 16,
            auto_start_streaming: false,
            auto_start_streaming_roles: Vec::new(),
        }
    }
}

impl SessionSettings {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn page_sizes(&self) -> PageSizes {
        PageSizes {
            portrait: self.portrait_page_size,
            landscape: self.landscape_page_size,
        }
    }

    pub fn auto_dismiss(&self) -> Duration {
        Duration::from_millis(self.notification_auto_dismiss_ms)
    }

    /// Whether auto-start applies to `role`. Unknown roles never qualify.
    pub fn streams_for_role(&self, role: Option<&str>) -> bool {
        match role {
            None => false,
            Some(_) if self.auto_start_streaming_roles.is_empty() => true,
            Some(role) => self.auto_start_streaming_roles.iter().any(|r| r == role),
        }
    }
}

/// Runtime wiring for a session: policy plus optional observability handles.
#[derive(Clone)]
pub struct SessionConfig {
    pub settings: SessionSettings,
    /// Optional structured logger used by the session.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the host.
    pub metrics: Option<Arc<Mutex<SessionMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    pub audit: Arc<dyn SessionAudit>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settings: SessionSettings::default(),
            logger: None,
            metrics: None,
            metrics_target: "room_session::session.metrics".to_string(),
            audit: Arc::new(NullSessionAudit),
        }
    }
}

impl SessionConfig {
    pub fn with_settings(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(SessionMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<SessionMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("settings", &self.settings)
            .field("logger", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("metrics_target", &self.metrics_target)
            .finish_non_exhaustive()
    }
}
