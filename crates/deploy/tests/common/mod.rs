pub mod archive;
pub mod cdn;
pub mod store;

#[allow(unused_imports)]
pub use archive::build_zip;
#[allow(unused_imports)]
pub use cdn::FakeCdn;
#[allow(unused_imports)]
pub use store::MemoryStore;

use edgepush_core::Distribution;

#[allow(dead_code)]
pub const STORAGE_HOST: &str = "s3.ap-south-1.amazonaws.com";

/// Distribution `E1` serving `www.example.com` from bucket `site`.
#[allow(dead_code)]
pub fn site_distribution() -> Distribution {
    Distribution::new(
        "E1",
        ["www.example.com"],
        ["site.s3.ap-south-1.amazonaws.com"],
    )
}
