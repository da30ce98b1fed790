//! Authoritative store implementations for the Taut link engine.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryLinkStore;
pub use mysql::MySqlLinkStore;
