//! Background expiry sweep for the Taut link engine.

pub mod sweeper;

pub use sweeper::Sweeper;
