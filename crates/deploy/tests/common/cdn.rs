use async_trait::async_trait;
use edgepush_cdn::{CdnClient, CdnError, CdnResult};
use edgepush_core::Distribution;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// CDN double with call counters and failure toggles.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeCdn {
    distributions: Vec<Distribution>,
    pub fail_list: AtomicBool,
    pub fail_invalidation: AtomicBool,
    pub list_calls: AtomicUsize,
    pub invalidations: Mutex<Vec<(String, Vec<String>, String)>>,
}

#[allow(dead_code)]
impl FakeCdn {
    pub fn new(distributions: Vec<Distribution>) -> Self {
        Self {
            distributions,
            ..Default::default()
        }
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.lock().unwrap().len()
    }
}

#[async_trait]
impl CdnClient for FakeCdn {
    async fn list_distributions(&self) -> CdnResult<Vec<Distribution>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(CdnError::CloudFront("injected list failure".into()));
        }
        Ok(self.distributions.clone())
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> CdnResult<String> {
        if self.fail_invalidation.load(Ordering::SeqCst) {
            return Err(CdnError::CloudFront("injected invalidation failure".into()));
        }
        let mut invalidations = self.invalidations.lock().unwrap();
        invalidations.push((
            distribution_id.to_string(),
            paths.to_vec(),
            caller_reference.to_string(),
        ));
        Ok(format!("I{}", invalidations.len()))
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
