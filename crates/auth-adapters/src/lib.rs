//! # auth-adapters
//!
//! Argon2 password hashing, plus HS256 bearer tokens behind `auth-jwt`.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokens;
