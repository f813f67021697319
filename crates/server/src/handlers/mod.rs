//! HTTP request handlers.

pub mod deploy;
pub mod health;
pub mod listing;

pub use deploy::*;
pub use health::*;
pub use listing::*;
