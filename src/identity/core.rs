use std::fmt;

use serde::{Deserialize, Serialize};

use crate::peer::{Peer, PeerId, TrackRef, TrackSource};

/// Composite key naming one tile: a peer plus the source of the video it shows.
///
/// Equality is field-wise on `(peer_id, source)`. A peer publishing a camera
/// and a screenshare therefore owns two identities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileIdentity {
    pub peer_id: PeerId,
    pub source: TrackSource,
}

impl TileIdentity {
    pub fn new(peer_id: impl Into<PeerId>, source: TrackSource) -> Self {
        Self {
            peer_id: peer_id.into(),
            source,
        }
    }

    pub fn regular(peer_id: impl Into<PeerId>) -> Self {
        Self::new(peer_id, TrackSource::Regular)
    }

    pub fn is_regular(&self) -> bool {
        self.source.is_regular()
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.peer_id, self.source)
    }
}

/// Resolve the tile a `(peer, track)` pair belongs to.
///
/// Audio tracks and a missing track map onto the peer's regular tile.
pub fn identity_of(peer: &Peer, track: Option<&TrackRef>) -> TileIdentity {
    let source = match track {
        Some(track) if track.is_video() => track.source.clone(),
        _ => TrackSource::Regular,
    };
    TileIdentity::new(peer.id.clone(), source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_audio_track_is_regular() {
        let peer = Peer::new("p1", "Ada");
        assert_eq!(identity_of(&peer, None), TileIdentity::regular("p1"));

        let screen_audio = TrackRef::audio("a", TrackSource::Screen);
        assert_eq!(
            identity_of(&peer, Some(&screen_audio)),
            TileIdentity::regular("p1")
        );
    }

    #[test]
    fn each_video_source_is_distinct() {
        let peer = Peer::new("p1", "Ada");
        let camera = identity_of(&peer, Some(&TrackRef::video("cam", TrackSource::Regular)));
        let screen = identity_of(&peer, Some(&TrackRef::video("scr", TrackSource::Screen)));
        let plugin = identity_of(&peer, Some(&TrackRef::video("wb", TrackSource::Plugin)));

        assert_eq!(camera, TileIdentity::regular("p1"));
        assert_ne!(camera, screen);
        assert_ne!(screen, plugin);
        assert_eq!(screen.peer_id, plugin.peer_id);
        assert_eq!(screen.to_string(), "p1/screen");
    }

    #[test]
    fn identity_ignores_track_id() {
        let peer = Peer::new("p1", "Ada");
        let first = identity_of(&peer, Some(&TrackRef::video("scr-1", TrackSource::Screen)));
        let second = identity_of(&peer, Some(&TrackRef::video("scr-2", TrackSource::Screen)));
        assert_eq!(first, second);
    }
}
