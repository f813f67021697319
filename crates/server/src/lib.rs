//! HTTP API server for edgepush.
//!
//! This crate provides the HTTP surface around the deployment pipeline:
//! - Multipart site uploads that deploy to a bucket and purge the CDN
//! - Bucket and CDN alias domain listings
//! - Health and Prometheus metrics endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
