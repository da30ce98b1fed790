//! Link resolver for the Taut link engine.
//!
//! This crate provides the code generator, the resolver service that
//! orchestrates mutations against the authoritative store, and the
//! cache-backed redirect read path.

pub mod error;
pub mod generator;
pub mod redirect;
pub mod service;

pub use error::LinkError;
pub use generator::{CodeGenerator, HashCodeGenerator};
pub use redirect::Redirector;
pub use service::{CreateLink, LinkService, UpdateLink};
