use std::collections::{BTreeMap, HashMap};

use blake3::Hash;
use serde::Serialize;

use crate::identity::{TileIdentity, identity_of};
use crate::peer::{Peer, PeerId, TrackRef};

/// One renderable unit: a peer's single video source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub id: TileIdentity,
    pub peer: Peer,
    pub track: Option<TrackRef>,
    pub degraded: bool,
}

impl Tile {
    fn new(id: TileIdentity, peer: Peer, track: Option<TrackRef>) -> Self {
        Self {
            id,
            peer,
            track,
            degraded: false,
        }
    }

    /// Id of the companion audio track for this tile's source, if published.
    pub fn audio_track_id(&self) -> Option<&str> {
        self.peer
            .companion_audio(&self.id.source)
            .map(|track| track.id.as_str())
    }

    pub fn video_track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|track| track.id.as_str())
    }

    pub fn is_local(&self) -> bool {
        self.peer.is_local
    }
}

/// A change recorded since the last [`TileRegistry::take_changed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileChange {
    Updated(Tile),
    Removed(TileIdentity),
}

impl TileChange {
    pub fn identity(&self) -> &TileIdentity {
        match self {
            TileChange::Updated(tile) => &tile.id,
            TileChange::Removed(id) => id,
        }
    }
}

/// Ordered, deduplicated collection of tiles.
///
/// Iteration order is insertion order. Each tile keeps a digest of its content
/// so no-op updates do not bump the generation or mark the tile changed.
#[derive(Debug, Default)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
    digests: HashMap<TileIdentity, Option<Hash>>,
    changed: BTreeMap<TileIdentity, bool>,
    local_peer: Option<PeerId>,
    generation: u64,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or fully replace the tile for `identity_of(peer, track)`.
    ///
    /// `degraded` survives replacement.
    pub fn upsert(&mut self, peer: Peer, track: Option<TrackRef>) -> TileIdentity {
        let id = identity_of(&peer, track.as_ref());
        match self.tiles.iter_mut().find(|tile| tile.id == id) {
            Some(tile) => {
                tile.peer = peer;
                tile.track = track;
            }
            None => self.tiles.push(Tile::new(id.clone(), peer, track)),
        }
        self.touch(&id);
        id
    }

    /// Upsert for the local participant.
    ///
    /// When the local peer id changes (preview and meeting ids can differ) the
    /// existing local tiles are rekeyed where they stand instead of being
    /// duplicated.
    pub fn upsert_local(&mut self, peer: Peer, track: Option<TrackRef>) -> TileIdentity {
        if let Some(previous) = self.local_peer.clone() {
            if previous != peer.id {
                self.rekey_peer(&previous, &peer.id);
            }
        }
        self.local_peer = Some(peer.id.clone());
        self.upsert(peer, track)
    }

    pub fn local_peer(&self) -> Option<&PeerId> {
        self.local_peer.as_ref()
    }

    /// Delete the tile if present. Absent identities are a no-op.
    pub fn remove(&mut self, identity: &TileIdentity) -> bool {
        let before = self.tiles.len();
        self.tiles.retain(|tile| &tile.id != identity);
        if self.tiles.len() == before {
            return false;
        }
        self.forget(identity);
        true
    }

    /// Remove every tile owned by `peer_id`, returning the removed identities.
    pub fn remove_peer(&mut self, peer_id: &PeerId) -> Vec<TileIdentity> {
        let removed: Vec<TileIdentity> = self
            .tiles
            .iter()
            .filter(|tile| &tile.id.peer_id == peer_id)
            .map(|tile| tile.id.clone())
            .collect();
        if removed.is_empty() {
            return removed;
        }
        self.tiles.retain(|tile| &tile.id.peer_id != peer_id);
        for id in &removed {
            self.forget(id);
        }
        removed
    }

    /// Flip the quality flag. Signals for absent tiles are dropped.
    pub fn set_degraded(&mut self, identity: &TileIdentity, value: bool) -> bool {
        let Some(tile) = self.tiles.iter_mut().find(|tile| &tile.id == identity) else {
            return false;
        };
        tile.degraded = value;
        self.touch(identity);
        true
    }

    /// Swap only the track of an existing tile, keeping its peer snapshot.
    pub fn replace_track(&mut self, identity: &TileIdentity, track: Option<TrackRef>) -> bool {
        let Some(tile) = self.tiles.iter_mut().find(|tile| &tile.id == identity) else {
            return false;
        };
        tile.track = track;
        self.touch(identity);
        true
    }

    /// Replace the peer snapshot on every tile `peer` owns. Returns how many tiles were hit.
    pub fn refresh_peer(&mut self, peer: &Peer) -> usize {
        let ids: Vec<TileIdentity> = self
            .tiles
            .iter_mut()
            .filter(|tile| tile.id.peer_id == peer.id)
            .map(|tile| {
                tile.peer = peer.clone();
                tile.id.clone()
            })
            .collect();
        for id in &ids {
            self.touch(id);
        }
        ids.len()
    }

    pub fn get(&self, identity: &TileIdentity) -> Option<&Tile> {
        self.tiles.iter().find(|tile| &tile.id == identity)
    }

    pub fn contains(&self, identity: &TileIdentity) -> bool {
        self.get(identity).is_some()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_of<'a>(&'a self, peer_id: &PeerId) -> impl Iterator<Item = &'a Tile> + use<'a> {
        let peer_id = peer_id.clone();
        self.tiles
            .iter()
            .filter(move |tile| tile.id.peer_id == peer_id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Monotonic counter bumped on every content change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Drain the changes recorded since the previous call, ordered by identity.
    pub fn take_changed(&mut self) -> Vec<TileChange> {
        let changed = std::mem::take(&mut self.changed);
        changed
            .into_iter()
            .map(|(id, present)| match (present, self.get(&id)) {
                (true, Some(tile)) => TileChange::Updated(tile.clone()),
                _ => TileChange::Removed(id),
            })
            .collect()
    }

    /// Empty the registry, recording every tile as removed.
    pub fn clear(&mut self) {
        let ids: Vec<TileIdentity> = self.tiles.drain(..).map(|tile| tile.id).collect();
        for id in &ids {
            self.forget(id);
        }
        self.local_peer = None;
    }

    fn rekey_peer(&mut self, from: &PeerId, to: &PeerId) {
        let targets: Vec<TileIdentity> = self
            .tiles
            .iter()
            .filter(|tile| &tile.id.peer_id == from)
            .map(|tile| TileIdentity::new(to.clone(), tile.id.source.clone()))
            .collect();
        // Entries already stored under a target id are stale; the rekeyed tile wins.
        self.tiles.retain(|tile| !targets.contains(&tile.id));

        let mut moved = Vec::new();
        for tile in self.tiles.iter_mut().filter(|tile| &tile.id.peer_id == from) {
            let new_id = TileIdentity::new(to.clone(), tile.id.source.clone());
            moved.push((tile.id.clone(), new_id.clone()));
            tile.id = new_id;
        }
        for (old_id, new_id) in moved {
            self.digests.remove(&old_id);
            self.changed.insert(old_id, false);
            self.digests.remove(&new_id);
            self.touch(&new_id);
        }
    }

    fn touch(&mut self, identity: &TileIdentity) {
        let digest = self.get(identity).and_then(digest_of);
        let previous = self.digests.insert(identity.clone(), digest);
        let unchanged = matches!((previous, digest), (Some(Some(old)), Some(new)) if old == new);
        if !unchanged {
            self.generation = self.generation.wrapping_add(1);
            self.changed.insert(identity.clone(), true);
        }
    }

    fn forget(&mut self, identity: &TileIdentity) {
        self.digests.remove(identity);
        self.changed.insert(identity.clone(), false);
        self.generation = self.generation.wrapping_add(1);
    }
}

fn digest_of(tile: &Tile) -> Option<Hash> {
    serde_json::to_vec(tile)
        .ok()
        .map(|bytes| blake3::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::TrackSource;

    fn peer(id: &str, name: &str) -> Peer {
        Peer::new(id, name)
    }

    fn camera(id: &str) -> TrackRef {
        TrackRef::video(id, TrackSource::Regular)
    }

    #[test]
    fn repeated_upsert_keeps_single_tile_with_latest_fields() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("p1", "Ada"), None);
        registry.upsert(peer("p1", "Ada L."), Some(camera("cam-1")));
        let id = registry.upsert(peer("p1", "Ada Lovelace"), Some(camera("cam-2")));

        assert_eq!(registry.len(), 1);
        let tile = registry.get(&id).unwrap();
        assert_eq!(tile.peer.name, "Ada Lovelace");
        assert_eq!(tile.video_track_id(), Some("cam-2"));
    }

    #[test]
    fn upsert_preserves_degraded_flag() {
        let mut registry = TileRegistry::new();
        let id = registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        assert!(registry.set_degraded(&id, true));
        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        assert!(registry.get(&id).unwrap().degraded);
    }

    #[test]
    fn remove_then_upsert_recreates_fresh_tile() {
        let mut registry = TileRegistry::new();
        let id = registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        registry.set_degraded(&id, true);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());

        registry.upsert(peer("p1", "Ada"), None);
        let tile = registry.get(&id).unwrap();
        assert!(!tile.degraded);
        assert!(tile.track.is_none());
    }

    #[test]
    fn degrade_for_missing_tile_is_dropped() {
        let mut registry = TileRegistry::new();
        let id = TileIdentity::regular("ghost");
        assert!(!registry.set_degraded(&id, true));
        registry.upsert(peer("ghost", "Ghost"), None);
        assert!(!registry.get(&id).unwrap().degraded);
    }

    #[test]
    fn replace_track_only_touches_existing_tiles() {
        let mut registry = TileRegistry::new();
        let id = registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        assert!(registry.replace_track(&id, Some(camera("cam").with_muted(true))));
        assert!(registry.get(&id).unwrap().track.as_ref().unwrap().muted);
        assert_eq!(registry.get(&id).unwrap().peer.name, "Ada");

        assert!(!registry.replace_track(&TileIdentity::regular("p2"), None));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn one_peer_can_own_camera_and_screen_tiles() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        registry.upsert(
            peer("p1", "Ada"),
            Some(TrackRef::video("scr", TrackSource::Screen)),
        );
        registry.upsert(peer("p2", "Bob"), None);
        assert_eq!(registry.len(), 3);

        let removed = registry.remove_peer(&PeerId::new("p1"));
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_peer(&PeerId::new("p1")).is_empty());
    }

    #[test]
    fn identical_upsert_does_not_bump_generation() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        registry.take_changed();
        let generation = registry.generation();

        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        assert_eq!(registry.generation(), generation);
        assert!(!registry.has_changes());

        registry.upsert(peer("p1", "Ada"), Some(camera("cam").with_muted(true)));
        assert!(registry.generation() > generation);
        assert_eq!(registry.take_changed().len(), 1);
    }

    #[test]
    fn take_changed_reports_removals() {
        let mut registry = TileRegistry::new();
        let id = registry.upsert(peer("p1", "Ada"), None);
        registry.take_changed();
        registry.remove(&id);

        let changes = registry.take_changed();
        assert_eq!(changes, vec![TileChange::Removed(id)]);
        assert!(registry.take_changed().is_empty());
    }

    #[test]
    fn local_upsert_updates_preview_entry_in_place() {
        let mut registry = TileRegistry::new();
        registry.upsert_local(Peer::local("local", "Me"), None);
        registry.upsert(peer("p1", "Ada"), None);
        registry.upsert_local(Peer::local("local", "Me"), Some(camera("cam")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tiles()[0].id, TileIdentity::regular("local"));
        assert_eq!(registry.tiles()[0].video_track_id(), Some("cam"));
    }

    #[test]
    fn local_upsert_rekeys_when_peer_id_changes() {
        let mut registry = TileRegistry::new();
        registry.upsert_local(Peer::local("preview-id", "Me"), None);
        registry.upsert(peer("p1", "Ada"), None);
        registry.take_changed();

        let id = registry.upsert_local(Peer::local("meeting-id", "Me"), Some(camera("cam")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tiles()[0].id, id);
        assert!(!registry.contains(&TileIdentity::regular("preview-id")));
        assert_eq!(registry.local_peer(), Some(&PeerId::new("meeting-id")));

        let changes = registry.take_changed();
        assert!(changes.contains(&TileChange::Removed(TileIdentity::regular("preview-id"))));
        assert!(changes.iter().any(|c| c.identity() == &id));
    }

    #[test]
    fn rekey_keeps_local_tile_over_stale_entry() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("meeting-id", "Ghost"), None);
        registry.upsert_local(Peer::local("preview-id", "Me"), Some(camera("cam")));
        registry.set_degraded(&TileIdentity::regular("preview-id"), true);

        let id = registry.upsert_local(Peer::local("meeting-id", "Me"), Some(camera("cam")));

        assert_eq!(registry.len(), 1);
        let tile = registry.get(&id).unwrap();
        assert!(tile.is_local());
        assert!(tile.degraded);
        assert_eq!(tile.peer.name, "Me");
    }

    #[test]
    fn tiles_of_accepts_a_temporary_id() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        registry.upsert(peer("p2", "Grace"), None);

        let owned: Vec<&Tile> = registry.tiles_of(&PeerId::from("p1")).collect();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].video_track_id(), Some("cam"));
    }

    #[test]
    fn refresh_peer_replaces_snapshot_on_all_tiles() {
        let mut registry = TileRegistry::new();
        registry.upsert(peer("p1", "Ada"), Some(camera("cam")));
        registry.upsert(
            peer("p1", "Ada"),
            Some(TrackRef::video("scr", TrackSource::Screen)),
        );

        let renamed = peer("p1", "Countess");
        assert_eq!(registry.refresh_peer(&renamed), 2);
        assert!(registry.tiles().iter().all(|t| t.peer.name == "Countess"));
        assert_eq!(registry.tiles()[0].video_track_id(), Some("cam"));
    }
}
