use std::sync::Arc;

use assetsync_core::{Config, SanitizedConfig, ServiceStatus, Settings, SyncService};
use sha2::{Digest, Sha256};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<SyncService>,
    config_hash: String,
}

impl AppState {
    pub fn new(config: Config, service: Arc<SyncService>) -> Self {
        let config_hash = config_hash(&config);
        Self {
            config,
            service,
            config_hash,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    pub fn service(&self) -> &SyncService {
        self.service.as_ref()
    }

    pub fn status(&self) -> ServiceStatus {
        self.service.status()
    }

    /// Short hash of the effective (sanitized) configuration.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }
}

fn config_hash(config: &Config) -> String {
    let json = serde_json::to_string(&SanitizedConfig::from(config)).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(json.as_bytes()));
    digest[..16].to_string()
}
