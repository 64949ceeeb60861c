use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Tenant id and at least one import language are set
/// - Upstream base URL is set and at least one attempt is allowed
/// - Chunk size and sync interval are not 0
/// - Server port is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.settings.tenant_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "settings.tenant_id cannot be empty".to_string(),
        ));
    }

    if config.settings.import_languages.is_empty() {
        return Err(ConfigError::ValidationError(
            "settings.import_languages needs at least one locale".to_string(),
        ));
    }

    if config.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.base_url cannot be empty".to_string(),
        ));
    }

    if config.upstream.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "upstream.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.sync.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "sync.chunk_size cannot be 0".to_string(),
        ));
    }

    if config.sync.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.interval_secs cannot be 0".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
