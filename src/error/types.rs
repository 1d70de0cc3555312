use thiserror::Error;

use crate::session::SessionPhase;

/// Unified result type for the session core.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by UI-driven commands and settings loading.
///
/// Inbound SDK events never produce these; stale events are dropped instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },
    #[error("session has ended")]
    SessionEnded,
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
