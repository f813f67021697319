//! Application state shared across handlers.

use edgepush_cdn::CdnClient;
use edgepush_core::config::AppConfig;
use edgepush_deploy::{Deployer, DeployerOptions};
use edgepush_storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared application state.
///
/// Backend clients are built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub deployer: Arc<Deployer>,
    /// Cancelled on shutdown; every deployment runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        cdn: Arc<dyn CdnClient>,
    ) -> Self {
        let deployer = Deployer::new(
            Arc::clone(&storage),
            cdn,
            DeployerOptions::from_config(&config),
        );
        Self {
            config: Arc::new(config),
            storage,
            deployer: Arc::new(deployer),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        self.config.deploy.backend_timeout()
    }
}
