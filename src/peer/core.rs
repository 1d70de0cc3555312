use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque peer identifier assigned by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a track originates on the publishing side.
///
/// Unknown sources reported by the SDK are kept verbatim in `Other` so two
/// different unknown sources never collapse into the same tile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Regular,
    Screen,
    Plugin,
    Other(String),
}

impl TrackSource {
    pub fn is_regular(&self) -> bool {
        matches!(self, TrackSource::Regular)
    }

    pub fn label(&self) -> &str {
        match self {
            TrackSource::Regular => "regular",
            TrackSource::Screen => "screen",
            TrackSource::Plugin => "plugin",
            TrackSource::Other(name) => name,
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Snapshot of a single published track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub muted: bool,
}

impl TrackRef {
    pub fn video(id: impl Into<String>, source: TrackSource) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Video,
            source,
            muted: false,
        }
    }

    pub fn audio(id: impl Into<String>, source: TrackSource) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Audio,
            source,
            muted: false,
        }
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    HlsStreaming,
    ScreenShare,
    ChangeRole,
    EndRoom,
    Mute,
    Unmute,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }
}

/// Answer to a permission query. `Unknown` means no role has been assigned yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Granted,
    Denied,
    Unknown,
}

impl Capability {
    pub fn is_granted(self) -> bool {
        self == Capability::Granted
    }
}

/// Last known attributes of a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub audio_track: Option<TrackRef>,
    #[serde(default)]
    pub video_track: Option<TrackRef>,
    #[serde(default)]
    pub auxiliary_tracks: Vec<TrackRef>,
    #[serde(default)]
    pub hand_raised: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Peer {
    pub fn new(id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_local: false,
            role: None,
            audio_track: None,
            video_track: None,
            auxiliary_tracks: Vec::new(),
            hand_raised: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn local(id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            is_local: true,
            ..Self::new(id, name)
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_hand_raised(mut self, raised: bool) -> Self {
        self.hand_raised = raised;
        self
    }

    /// Returns a snapshot with `track` installed in the slot matching its kind and source.
    pub fn with_track(mut self, track: TrackRef) -> Self {
        match (track.kind, track.source.is_regular()) {
            (TrackKind::Audio, true) => self.audio_track = Some(track),
            (TrackKind::Video, true) => self.video_track = Some(track),
            (_, false) => {
                self.auxiliary_tracks
                    .retain(|t| t.id != track.id && !(t.kind == track.kind && t.source == track.source));
                self.auxiliary_tracks.push(track);
            }
        }
        self
    }

    /// Returns a snapshot with the track named `track_id` removed from every slot.
    pub fn without_track(mut self, track_id: &str) -> Self {
        if self.audio_track.as_ref().is_some_and(|t| t.id == track_id) {
            self.audio_track = None;
        }
        if self.video_track.as_ref().is_some_and(|t| t.id == track_id) {
            self.video_track = None;
        }
        self.auxiliary_tracks.retain(|t| t.id != track_id);
        self
    }

    pub fn track(&self, track_id: &str) -> Option<&TrackRef> {
        self.audio_track
            .iter()
            .chain(self.video_track.iter())
            .chain(self.auxiliary_tracks.iter())
            .find(|t| t.id == track_id)
    }

    pub fn video_for(&self, source: &TrackSource) -> Option<&TrackRef> {
        if source.is_regular() {
            return self.video_track.as_ref();
        }
        self.auxiliary_tracks
            .iter()
            .find(|t| t.is_video() && &t.source == source)
    }

    /// Audio track published alongside the video of the given source.
    pub fn companion_audio(&self, source: &TrackSource) -> Option<&TrackRef> {
        if source.is_regular() {
            return self.audio_track.as_ref();
        }
        self.auxiliary_tracks
            .iter()
            .find(|t| t.is_audio() && &t.source == source)
    }

    pub fn audio_muted(&self) -> bool {
        self.audio_track.as_ref().is_none_or(|t| t.muted)
    }

    pub fn capability(&self, permission: &Permission) -> Capability {
        match &self.role {
            None => Capability::Unknown,
            Some(role) if role.permissions.contains(permission) => Capability::Granted,
            Some(_) => Capability::Denied,
        }
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|role| role.name.as_str())
    }
}
