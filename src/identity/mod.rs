mod core;

pub use self::core::{TileIdentity, identity_of};
