mod core;

pub use self::core::PipSelector;
