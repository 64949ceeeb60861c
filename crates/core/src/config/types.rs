use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::sync::SyncConfig;
use crate::target::FsTargetConfig;
use crate::upstream::UpstreamConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub settings: Settings,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub target: FsTargetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tenant level settings consumed by the sync engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Tenant identifier on the upstream marketplace.
    pub tenant_id: String,
    /// Locales to import, first one is the primary language.
    #[serde(default = "default_import_languages")]
    pub import_languages: Vec<String>,
    /// Channel id push notifications must carry. Unset accepts any channel.
    #[serde(default)]
    pub push_channel_id: Option<String>,
    pub oauth: OAuthClientConfig,
}

fn default_import_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Settings {
    /// The primary import language.
    pub fn primary_language(&self) -> &str {
        self.import_languages
            .first()
            .map(String::as_str)
            .unwrap_or("en")
    }
}

/// OAuth client credentials used for token refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Token endpoint (e.g., "https://auth.example.com/oauth/token")
    pub token_url: String,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("assetsync.db")
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
    /// Default filter when RUST_LOG is not set (e.g., "info,assetsync_core=debug").
    #[serde(default)]
    pub filter: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub settings: SanitizedSettings,
    pub upstream: UpstreamConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub target: FsTargetConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSettings {
    pub tenant_id: String,
    pub import_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_channel_id: Option<String>,
    pub oauth: SanitizedOAuthConfig,
}

/// Sanitized OAuth config (client secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOAuthConfig {
    pub client_id: String,
    pub client_secret_configured: bool,
    pub token_url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            settings: SanitizedSettings {
                tenant_id: config.settings.tenant_id.clone(),
                import_languages: config.settings.import_languages.clone(),
                push_channel_id: config.settings.push_channel_id.clone(),
                oauth: SanitizedOAuthConfig {
                    client_id: config.settings.oauth.client_id.clone(),
                    client_secret_configured: !config.settings.oauth.client_secret.is_empty(),
                    token_url: config.settings.oauth.token_url.clone(),
                },
            },
            upstream: config.upstream.clone(),
            sync: config.sync.clone(),
            server: config.server.clone(),
            database: config.database.clone(),
            target: config.target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[settings]
tenant_id = "acme"

[settings.oauth]
client_id = "client"
client_secret = "secret"
token_url = "https://auth.example.com/oauth/token"

[upstream]
base_url = "https://api.example.com/v1"
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.settings.tenant_id, "acme");
        assert_eq!(config.settings.import_languages, vec!["en".to_string()]);
        assert_eq!(config.settings.primary_language(), "en");
        assert!(config.settings.push_channel_id.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "assetsync.db");
        assert_eq!(config.sync.chunk_size, 10);
        assert_eq!(config.upstream.max_attempts, 5);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_deserialize_missing_settings_fails() {
        let toml = r#"
[upstream]
base_url = "https://api.example.com/v1"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_languages_and_channel() {
        let toml = format!(
            "{}\n{}",
            MINIMAL.replace(
                "tenant_id = \"acme\"",
                "tenant_id = \"acme\"\nimport_languages = [\"de\", \"en\"]\npush_channel_id = \"chan-1\""
            ),
            "[server]\nport = 9000\n"
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.settings.primary_language(), "de");
        assert_eq!(config.settings.push_channel_id.as_deref(), Some("chan-1"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_sanitized_config_hides_secret() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.settings.oauth.client_secret_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("\"secret\""));
        assert!(json.contains("acme"));
    }
}
