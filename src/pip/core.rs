use crate::peer::PeerId;
use crate::registry::Tile;

/// Picks the single tile shown in the picture-in-picture surface.
///
/// The last observed active speaker is sticky: a silent gap (`None`) keeps
/// the previous speaker until a different one is observed.
#[derive(Debug, Default, Clone)]
pub struct PipSelector {
    last_active_speaker: Option<PeerId>,
}

impl PipSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_active_speaker(&mut self, speaker: Option<PeerId>) {
        if let Some(speaker) = speaker {
            self.last_active_speaker = Some(speaker);
        }
    }

    pub fn last_active_speaker(&self) -> Option<&PeerId> {
        self.last_active_speaker.as_ref()
    }

    /// Observe `active_speaker` and select in one step.
    pub fn select_for_pip<'a>(
        &mut self,
        tiles: &'a [Tile],
        active_speaker: Option<PeerId>,
    ) -> Option<&'a Tile> {
        self.observe_active_speaker(active_speaker);
        self.select(tiles)
    }

    /// Speaker's regular tile, else any tile of the speaker, else the first tile.
    pub fn select<'a>(&self, tiles: &'a [Tile]) -> Option<&'a Tile> {
        self.last_active_speaker
            .as_ref()
            .and_then(|speaker| {
                let mut owned = tiles.iter().filter(|tile| &tile.id.peer_id == speaker);
                let first_owned = owned.next()?;
                if first_owned.id.is_regular() {
                    return Some(first_owned);
                }
                owned
                    .find(|tile| tile.id.is_regular())
                    .or(Some(first_owned))
            })
            .or_else(|| tiles.first())
    }

    pub fn reset(&mut self) {
        self.last_active_speaker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{Peer, TrackRef, TrackSource};
    use crate::registry::TileRegistry;

    fn roster() -> TileRegistry {
        let mut registry = TileRegistry::new();
        for id in ["p1", "p2", "p3"] {
            registry.upsert(Peer::new(id, id.to_uppercase()), None);
        }
        registry
    }

    fn picked(tile: Option<&Tile>) -> Option<&str> {
        tile.map(|t| t.id.peer_id.as_str())
    }

    #[test]
    fn sticky_speaker_survives_silence() {
        let registry = roster();
        let tiles = registry.tiles();
        let mut pip = PipSelector::new();

        let sequence = [Some("p2"), None, None, Some("p3")];
        let picks: Vec<Option<&str>> = sequence
            .into_iter()
            .map(|speaker| picked(pip.select_for_pip(tiles, speaker.map(PeerId::from))))
            .collect();

        assert_eq!(picks, vec![Some("p2"), Some("p2"), Some("p2"), Some("p3")]);
    }

    #[test]
    fn falls_back_to_first_tile_without_speaker() {
        let registry = roster();
        let pip = PipSelector::new();
        assert_eq!(picked(pip.select(registry.tiles())), Some("p1"));
        assert!(pip.select(&[]).is_none());
    }

    #[test]
    fn departed_speaker_falls_back_but_stays_sticky() {
        let mut registry = roster();
        let mut pip = PipSelector::new();
        pip.observe_active_speaker(Some(PeerId::new("p3")));

        registry.remove_peer(&PeerId::new("p3"));
        assert_eq!(picked(pip.select(registry.tiles())), Some("p1"));
        assert_eq!(pip.last_active_speaker(), Some(&PeerId::new("p3")));

        registry.upsert(Peer::new("p3", "P3"), None);
        assert_eq!(picked(pip.select(registry.tiles())), Some("p3"));
    }

    #[test]
    fn prefers_regular_tile_of_speaker() {
        let mut registry = TileRegistry::new();
        registry.upsert(Peer::new("p1", "P1"), None);
        registry.upsert(
            Peer::new("p2", "P2"),
            Some(TrackRef::video("scr", TrackSource::Screen)),
        );
        registry.upsert(Peer::new("p2", "P2"), None);

        let mut pip = PipSelector::new();
        pip.observe_active_speaker(Some(PeerId::new("p2")));
        let tile = pip.select(registry.tiles()).unwrap();
        assert_eq!(tile.id.peer_id.as_str(), "p2");
        assert!(tile.id.is_regular());
    }
}
