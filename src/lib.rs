//! Room session state core for a video-conferencing client.
//!
//! The crate reconciles SDK events into an authoritative tile registry,
//! derives spotlight/screenshare/paged layouts and a picture-in-picture tile
//! from it, runs the session lifecycle and keeps a bounded notification queue.
//! It performs no IO of its own: an adapter translates SDK callbacks into
//! [`SessionEvent`]s and carries out the [`SessionEffect`]s the core requests.

pub mod error;
pub mod identity;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod notifications;
pub mod peer;
pub mod pip;
pub mod registry;
pub mod session;
pub mod spotlight;

pub use error::{Result, SessionError};
pub use identity::{TileIdentity, identity_of};
pub use layout::{Orientation, PageSizes, TileLayout, partition};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, SessionMetrics};
pub use notifications::{
    DismissPolicy, NotificationEntry, NotificationKind, NotificationQueue, VISIBLE_SLOTS,
};
pub use peer::{Capability, Peer, PeerId, Permission, Role, TrackKind, TrackRef, TrackSource};
pub use pip::PipSelector;
pub use registry::{Tile, TileChange, TileRegistry};
pub use session::audit::{
    BufferedSessionAudit, NullSessionAudit, SessionAudit, SessionAuditEvent,
    SessionAuditEventBuilder, SessionAuditStage,
};
pub use session::{
    CallTicket, PreviewSettings, SessionConfig, SessionContext, SessionEffect, SessionEvent,
    SessionFailure, SessionPhase, SessionSettings, SharedStore,
};
pub use spotlight::{SPOTLIGHT_KEY, SpotlightSelector};
