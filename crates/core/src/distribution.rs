//! CDN distributions as seen by the resolver.

use serde::{Deserialize, Serialize};

/// A CDN distribution: its id, the public domains it serves, and the origin
/// hosts it fetches from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub origin_hosts: Vec<String>,
}

impl Distribution {
    pub fn new(
        id: impl Into<String>,
        aliases: impl IntoIterator<Item = impl Into<String>>,
        origin_hosts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            origin_hosts: origin_hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `domain` is one of this distribution's aliases.
    ///
    /// DNS names are case-insensitive, so the comparison is too.
    pub fn serves(&self, domain: &str) -> bool {
        self.aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(domain))
    }

    /// Whether any configured origin is exactly `host`.
    pub fn has_origin(&self, host: &str) -> bool {
        self.origin_hosts
            .iter()
            .any(|origin| origin.eq_ignore_ascii_case(host))
    }
}

/// Expected origin host for a bucket, e.g. `site.s3.ap-south-1.amazonaws.com`.
pub fn bucket_origin_host(bucket: &str, storage_host: &str) -> String {
    format!("{bucket}.{storage_host}")
}
