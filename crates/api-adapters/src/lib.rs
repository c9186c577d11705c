//! # api-adapters
//!
//! The HTTP surface of storyweave. `views` and `metrics` are framework
//! agnostic; the axum router lives in `web` behind the `web-axum` feature.

pub mod metrics;
pub mod views;

#[cfg(feature = "web-axum")]
pub mod web;

pub use metrics::Metrics;
