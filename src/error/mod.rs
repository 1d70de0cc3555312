mod types;

pub use types::{Result, SessionError};
