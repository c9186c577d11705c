//! # services
//!
//! Application services for storyweave. They own the ordering of checks
//! (existence, permissions, validation, rules) and talk to storage and
//! auth only through the ports defined in `domains`.

pub mod accounts;
pub mod permissions;
pub mod stories;

pub use accounts::{AccountService, Login, ProfileUpdate, Registration, Session};
pub use permissions::{AccessPolicy, Capability, Operation, Subject};
pub use stories::{StoryPolicy, StoryService};
