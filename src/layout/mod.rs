//! Layout module orchestrator.
//!
//! Layout is expressed as data: tiles bucketed into spotlight, screenshare and
//! paged regular groups. Pixels are the renderer's business.

mod partition;

pub use self::partition::{Orientation, PageSizes, TileLayout, partition};
