//! Repository implementations for the ports in `domains`.
//!
//! `memory` is always compiled. `postgres` needs the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::InMemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
