//! Bounded banner queue with a fixed kind precedence.

mod core;

pub use self::core::{
    DismissPolicy, NotificationEntry, NotificationKind, NotificationQueue, VISIBLE_SLOTS,
};
