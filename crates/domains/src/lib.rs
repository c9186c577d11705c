//! # domains
//!
//! Entities, business rules and port traits for storyweave. Nothing in
//! this crate performs I/O.

pub mod error;
pub mod models;
pub mod ports;
pub mod ranking;
pub mod rules;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
