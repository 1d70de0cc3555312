//! Session reconciliation core.
//!
//! [`SessionContext`] owns every piece of session state. The SDK adapter
//! feeds it [`SessionEvent`]s and drains [`SessionEffect`]s; the UI calls the
//! command methods and reads layout, PIP and notifications back out.

pub mod audit;
mod config;
mod context;
mod events;
mod lifecycle;
mod shared_state;

pub use self::config::{SessionConfig, SessionSettings};
pub use self::context::{
    LOCAL_SCREENSHARE_NOTIFICATION, RECONNECTING_NOTIFICATION, STREAMING_FAILED_NOTIFICATION,
    SessionContext, TERMINAL_ERROR_NOTIFICATION,
};
pub use self::events::{CallTicket, PreviewSettings, SessionEffect, SessionEvent, SessionFailure};
pub use self::lifecycle::SessionPhase;
pub use self::shared_state::SharedStore;
