use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::peer::{Peer, PeerId, TrackRef};

/// Handle for an in-flight async call issued by the session.
///
/// Completions are matched against the issuing session id and call id, so a
/// late answer for a torn-down session can never be applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallTicket {
    pub session_id: String,
    pub call_id: u64,
}

/// Blocking failure shown before the meeting starts. Acknowledging it ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub code: u32,
    pub message: String,
}

/// Device and identity choices staged on the preview screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub audio_muted: bool,
    pub video_muted: bool,
    pub display_name: Option<String>,
}

/// Inbound event translated from an SDK callback by the adapter layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PreviewReady { local_peer: Peer },
    JoinSucceeded { local_peer: Peer },
    LocalPeerUpdated(Peer),
    PeerJoined(Peer),
    PeerLeft(PeerId),
    PeerUpdated(Peer),
    TrackAdded { peer_id: PeerId, track: TrackRef },
    TrackRemoved { peer_id: PeerId, track_id: String },
    /// Mute, unmute or resolution change on a known track.
    TrackUpdated { peer_id: PeerId, track: TrackRef },
    TrackDegraded { peer_id: PeerId, track_id: String },
    TrackRestored { peer_id: PeerId, track_id: String },
    ActiveSpeakerChanged(Option<PeerId>),
    /// `terminal` is the externally supplied classification.
    Error { code: u32, message: String, terminal: bool },
    Reconnecting,
    Reconnected,
    RoleChangeDeclined { peer_id: PeerId },
    PollStarted { poll_id: String, title: String },
    StreamingStateChanged { running: bool },
    StreamingStartFinished {
        ticket: CallTicket,
        result: Result<(), String>,
    },
    SharedValueChanged { key: String, value: Option<String> },
    Tick { elapsed: Duration },
}

impl SessionEvent {
    pub fn describe(&self) -> &'static str {
        match self {
            SessionEvent::PreviewReady { .. } => "preview_ready",
            SessionEvent::JoinSucceeded { .. } => "join_succeeded",
            SessionEvent::LocalPeerUpdated(_) => "local_peer_updated",
            SessionEvent::PeerJoined(_) => "peer_joined",
            SessionEvent::PeerLeft(_) => "peer_left",
            SessionEvent::PeerUpdated(_) => "peer_updated",
            SessionEvent::TrackAdded { .. } => "track_added",
            SessionEvent::TrackRemoved { .. } => "track_removed",
            SessionEvent::TrackUpdated { .. } => "track_updated",
            SessionEvent::TrackDegraded { .. } => "track_degraded",
            SessionEvent::TrackRestored { .. } => "track_restored",
            SessionEvent::ActiveSpeakerChanged(_) => "active_speaker_changed",
            SessionEvent::Error { .. } => "error",
            SessionEvent::Reconnecting => "reconnecting",
            SessionEvent::Reconnected => "reconnected",
            SessionEvent::RoleChangeDeclined { .. } => "role_change_declined",
            SessionEvent::PollStarted { .. } => "poll_started",
            SessionEvent::StreamingStateChanged { .. } => "streaming_state_changed",
            SessionEvent::StreamingStartFinished { .. } => "streaming_start_finished",
            SessionEvent::SharedValueChanged { .. } => "shared_value_changed",
            SessionEvent::Tick { .. } => "tick",
        }
    }
}

/// Side effect requested by the core. The adapter drains these after each batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    RequestPreview,
    RequestJoin,
    StartStreaming { ticket: CallTicket },
    ApplyPreviewSettings(PreviewSettings),
    ShowBlockingError(SessionFailure),
    Leave,
}
