//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the upstream, the target and
//! the authenticator, so whole sync runs can be exercised without a network
//! or a real downstream system.
//!
//! # Example
//!
//! ```rust,ignore
//! use assetsync_core::testing::{fixtures, MockAuthenticator, MockTarget, MockUpstream};
//!
//! let upstream = MockUpstream::new();
//! let target = MockTarget::new();
//!
//! // Configure mock responses
//! upstream.push_transactions(vec![fixtures::transaction("tx-1", 1)]).await;
//! target.decline_at("before_assets_sync").await;
//!
//! // Use in SyncCollaborators...
//! ```

mod mock_authenticator;
mod mock_target;
mod mock_upstream;

pub use mock_authenticator::MockAuthenticator;
pub use mock_target::MockTarget;
pub use mock_upstream::MockUpstream;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::auth::AuthToken;
    use crate::config::{OAuthClientConfig, Settings};
    use crate::model::{AssetRecord, BinaryRecord, LocalizedText, MappedKey};
    use crate::upstream::{
        PurchaseTransaction, UpstreamBinary, UpstreamLicense, UpstreamRelease,
    };

    /// Tenant settings importing English and German.
    pub fn settings() -> Settings {
        Settings {
            tenant_id: "acme".to_string(),
            import_languages: vec!["en".to_string(), "de".to_string()],
            push_channel_id: Some("channel-1".to_string()),
            oauth: OAuthClientConfig {
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string(),
                token_url: "https://auth.example.com/oauth/token".to_string(),
            },
        }
    }

    /// A valid token that expires in an hour.
    pub fn valid_token() -> AuthToken {
        AuthToken::bearer(
            "initial-token",
            Some("initial-refresh".to_string()),
            Some(3600),
        )
    }

    fn text(locale: &str, value: &str) -> LocalizedText {
        let mut text = LocalizedText::new();
        text.insert(locale.to_string(), value.to_string());
        text
    }

    /// A purchase with `binaries` files named `bin-1`..`bin-n`, all at version 1.
    pub fn transaction(transaction_id: &str, binaries: usize) -> PurchaseTransaction {
        PurchaseTransaction {
            transaction_id: transaction_id.to_string(),
            asset_id: format!("asset-{}", transaction_id),
            content_type: "photo".to_string(),
            categories: vec!["nature".to_string()],
            provider: Some("studio-one".to_string()),
            name: text("en", &format!("Asset {}", transaction_id)),
            description: LocalizedText::new(),
            keywords: Default::default(),
            license: UpstreamLicense {
                license_type: Some("standard".to_string()),
                usages: vec!["web".to_string()],
                ..Default::default()
            },
            release: UpstreamRelease {
                state: Some("released".to_string()),
                ..Default::default()
            },
            compound: None,
            binaries: (1..=binaries)
                .map(|n| UpstreamBinary {
                    binary_id: format!("bin-{}", n),
                    content_type: "image/jpeg".to_string(),
                    binary_type: Some("original".to_string()),
                    version: 1,
                    download_url: format!(
                        "https://cdn.example.com/{}/bin-{}",
                        transaction_id, n
                    ),
                    usage_text: LocalizedText::new(),
                })
                .collect(),
        }
    }

    fn binary(transaction_id: &str, binary_id: &str, version: u32) -> BinaryRecord {
        BinaryRecord {
            binary_id: binary_id.to_string(),
            transaction_id: transaction_id.to_string(),
            content_type: "image/jpeg".to_string(),
            binary_type: None,
            version,
            locator: format!("https://cdn.example.com/{}/{}", transaction_id, binary_id),
            usage_text: LocalizedText::new(),
        }
    }

    /// A simple asset whose single binary `bin-1` has the given version.
    pub fn simple_asset(transaction_id: &str, version: u32) -> AssetRecord {
        let mut asset = AssetRecord::new(
            format!("asset-{}", transaction_id),
            transaction_id,
            MappedKey::new("photo", Some("t-photo".to_string())),
        );
        asset.name = text("en", &format!("Asset {}", transaction_id));
        asset.binaries.push(binary(transaction_id, "bin-1", version));
        asset
    }

    /// A compound asset with binaries `bin-1`..`bin-n` at version 1.
    pub fn compound_asset(transaction_id: &str, binaries: usize) -> AssetRecord {
        let mut asset = simple_asset(transaction_id, 1);
        asset.binaries = (1..=binaries)
            .map(|n| binary(transaction_id, &format!("bin-{}", n), 1))
            .collect();
        asset.set_compound(true);
        asset
    }
}
