//! Advisory cache implementations for the Taut link engine.

pub mod invalidate;
pub mod moka;
pub mod redis;

pub use invalidate::{invalidate_link, spawn_invalidate};
pub use self::moka::MokaLinkCache;
pub use self::redis::RedisLinkCache;
