//! Peer and track snapshots as delivered by the SDK adapter.
//!
//! Everything here is a plain value. Tiles hold clones of these snapshots and
//! replace them wholesale whenever the peer changes.

mod core;

pub use self::core::{Capability, Peer, PeerId, Permission, Role, TrackKind, TrackRef, TrackSource};
