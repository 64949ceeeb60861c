//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with a sync service wired to mock collaborators, so the HTTP surface can
//! be exercised without an upstream or a real target.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use assetsync_core::{
    testing::{MockAuthenticator, MockTarget, MockUpstream},
    Config, DatabaseConfig, FsTargetConfig, LoggingConfig, MemoryContinuationStorage,
    MemoryTokenStorage, RetryPolicy, RunKind, ServerConfig, SyncCollaborators, SyncConfig,
    SyncOrchestrator, SyncService, UpstreamConfig,
};
use assetsync_server::state::AppState;

/// Re-export fixtures for test convenience
pub use assetsync_core::testing::fixtures;

/// Test fixture holding the router and the mocks behind it.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_push() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/push", json!({
///         "channel_id": "channel-1"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock upstream - configure purchases and metadata
    pub upstream: Arc<MockUpstream>,
    /// Mock target - inspect delivered assets and hook calls
    pub target: Arc<MockTarget>,
    pub service: Arc<SyncService>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture whose settings expect push channel `channel-1`.
    pub fn new() -> Self {
        Self::with_push_channel(Some("channel-1"))
    }

    pub fn with_push_channel(channel: Option<&str>) -> Self {
        let mut settings = fixtures::settings();
        settings.push_channel_id = channel.map(str::to_string);

        let config = Config {
            settings: settings.clone(),
            upstream: UpstreamConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                ..Default::default()
            },
            sync: SyncConfig::default(),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig::default(),
            target: FsTargetConfig::default(),
            logging: LoggingConfig::default(),
        };

        let upstream = Arc::new(MockUpstream::new());
        let target = Arc::new(MockTarget::new());

        let collaborators = SyncCollaborators {
            settings,
            upstream: Arc::clone(&upstream) as _,
            authenticator: Arc::new(MockAuthenticator::new()),
            token_storage: Arc::new(MemoryTokenStorage::with_token(fixtures::valid_token())),
            target: Arc::clone(&target) as _,
            continuation: Arc::new(MemoryContinuationStorage::new()),
        };
        let orchestrator = SyncOrchestrator::new(
            collaborators,
            config.sync.clone(),
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::from_millis(5),
            },
        );
        let service = Arc::new(SyncService::new(orchestrator));

        let state = Arc::new(AppState::new(config, Arc::clone(&service)));
        let router = assetsync_server::api::create_router(state);

        Self {
            router,
            upstream,
            target,
            service,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Wait until the target saw `count` runs.
    pub async fn wait_for_runs(&self, count: usize) -> Vec<RunKind> {
        let start = Instant::now();
        loop {
            let runs = self.target.runs().await;
            if runs.len() >= count {
                return runs;
            }
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "timed out waiting for {} runs",
                count
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
