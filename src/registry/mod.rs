//! Authoritative tile store.
//!
//! All mutations are keyed by [`TileIdentity`](crate::identity::TileIdentity)
//! and idempotent; nothing here remembers positions between calls.

mod core;

pub use self::core::{Tile, TileChange, TileRegistry};
