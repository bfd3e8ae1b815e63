mod core;
mod select;
mod tx;

pub use self::core::Connection;
