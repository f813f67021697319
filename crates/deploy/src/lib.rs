//! Static site deployment pipeline.
//!
//! A [`Deployer`] takes a zip archive, a bucket name and a public domain, and:
//!
//! 1. extracts and validates the archive,
//! 2. resolves the CDN distribution serving the domain and checks that it
//!    fronts the bucket,
//! 3. replaces the bucket contents with the archive contents,
//! 4. invalidates the distribution's cache.
//!
//! Storage and CDN access go through [`edgepush_storage::ObjectStore`] and
//! [`edgepush_cdn::CdnClient`], so the pipeline runs unchanged against AWS,
//! a local filesystem, or test doubles.

pub(crate) mod deadline;
pub mod error;
pub mod invalidator;
pub mod orchestrator;
pub mod resolver;
pub mod synchronizer;

pub use error::{DeployError, ResolveError, SyncError};
pub use invalidator::CacheInvalidator;
pub use orchestrator::{Deployer, DeployerOptions};
pub use resolver::DistributionResolver;
pub use synchronizer::BucketSynchronizer;
