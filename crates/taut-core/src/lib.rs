//! Core types and traits for the Taut link engine.
//!
//! This crate provides the domain model, the store and cache contracts,
//! and the configuration value shared by the resolver and the sweeper.

pub mod cache;
pub mod config;
pub mod error;
pub mod link;
pub mod store;
pub mod time;

pub use cache::{CacheKey, LinkCache};
pub use config::LinkConfig;
pub use error::{CacheError, StoreError};
pub use link::{Caller, Link, LinkChange, NewLink};
pub use store::LinkStore;
pub use time::minute_floor;
