//! CDN backend implementations.

pub mod cloudfront;
pub mod fixed;
