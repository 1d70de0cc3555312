use crate::registry::Tile;

/// Shared key-value entry carrying the spotlighted track id.
pub const SPOTLIGHT_KEY: &str = "spotlight";

/// Holds the single session-wide spotlight key.
///
/// The key is a track id, either the video or the companion audio track of
/// whichever tile was spotlighted upstream. Last write wins.
#[derive(Debug, Default, Clone)]
pub struct SpotlightSelector {
    key: Option<String>,
}

impl SpotlightSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the stored key actually changed. Empty ids clear the spotlight.
    pub fn set_spotlight(&mut self, track_id: Option<String>) -> bool {
        let next = track_id.filter(|id| !id.trim().is_empty());
        if next == self.key {
            return false;
        }
        self.key = next;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.set_spotlight(None)
    }

    pub fn current(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_spotlighted(&self, tile: &Tile) -> bool {
        matches_key(self.current(), tile)
    }
}

/// Whether `tile` is spotlighted under `key` via its video or companion audio track.
pub(crate) fn matches_key(key: Option<&str>, tile: &Tile) -> bool {
    let Some(key) = key else {
        return false;
    };
    tile.video_track_id() == Some(key) || tile.audio_track_id() == Some(key)
}
