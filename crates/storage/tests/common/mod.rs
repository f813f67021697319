pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{all_keys, seeded_bytes};
#[allow(unused_imports)]
pub use mocks::MockPagedBackend;
