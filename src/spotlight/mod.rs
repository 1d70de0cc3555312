mod core;

pub use self::core::{SPOTLIGHT_KEY, SpotlightSelector};
pub(crate) use self::core::matches_key;
