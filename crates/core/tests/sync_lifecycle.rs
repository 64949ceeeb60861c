//! Sync run integration tests.
//!
//! These tests drive whole runs through the orchestrator against the mock
//! upstream and mock target:
//! before sync -> metadata phase -> assets phase -> after sync

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use assetsync_core::{
    testing::{fixtures, MockAuthenticator, MockTarget, MockUpstream},
    upstream::{MetadataEntry, UpstreamError},
    AuthTokenStorage, ContinuationStorage, MemoryContinuationStorage, MemoryTokenStorage,
    MetadataCategory, RetryPolicy, RunKind, SqliteStateStore, SyncCollaborators, SyncConfig,
    SyncOrchestrator, SyncOutcome, SyncPhase, SyncTarget, SyncTargetCapabilities, TargetError,
};

/// Test helper holding the mocks behind one orchestrator.
struct TestHarness {
    upstream: Arc<MockUpstream>,
    target: Arc<MockTarget>,
    authenticator: Arc<MockAuthenticator>,
    token_storage: Arc<MemoryTokenStorage>,
    continuation: Arc<dyn ContinuationStorage>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_target(MockTarget::new())
    }

    fn with_target(target: MockTarget) -> Self {
        Self {
            upstream: Arc::new(MockUpstream::new()),
            target: Arc::new(target),
            authenticator: Arc::new(MockAuthenticator::new()),
            token_storage: Arc::new(MemoryTokenStorage::with_token(fixtures::valid_token())),
            continuation: Arc::new(MemoryContinuationStorage::new()),
        }
    }

    fn orchestrator(&self, config: SyncConfig) -> SyncOrchestrator {
        let collaborators = SyncCollaborators {
            settings: fixtures::settings(),
            upstream: Arc::clone(&self.upstream) as _,
            authenticator: Arc::clone(&self.authenticator) as _,
            token_storage: Arc::clone(&self.token_storage) as _,
            target: Arc::clone(&self.target) as Arc<dyn SyncTarget>,
            continuation: Arc::clone(&self.continuation),
        };

        let retry = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(5),
        };
        SyncOrchestrator::new(collaborators, config, retry)
    }

    fn chunked(chunk_size: usize, max_chunks_per_run: usize) -> SyncConfig {
        SyncConfig {
            chunk_size,
            max_chunks_per_run,
            ..Default::default()
        }
    }

    async fn push(&self, ids: &[&str]) {
        self.upstream
            .push_transactions(ids.iter().map(|id| fixtures::transaction(id, 1)).collect())
            .await;
    }
}

#[tokio::test]
async fn test_scheduled_run_resolves_metadata_keys() {
    let harness = TestHarness::new();
    harness
        .upstream
        .set_metadata(
            MetadataCategory::ContentTypes,
            "en",
            vec![MetadataEntry::new("photo", "Photo"), MetadataEntry::new("video", "Video")],
        )
        .await;
    harness
        .upstream
        .set_metadata(
            MetadataCategory::ContentTypes,
            "de",
            vec![MetadataEntry::new("photo", "Foto")],
        )
        .await;
    harness.push(&["tx-1"]).await;

    let orchestrator = harness.orchestrator(SyncConfig::default());
    let report = orchestrator.run(RunKind::Scheduled).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.phase, SyncPhase::Idle);

    // Every category is requested once per import language
    let calls = harness.upstream.metadata_calls().await;
    assert_eq!(calls.len(), MetadataCategory::ALL.len() * 2);

    // Locales are merged into one element per upstream key
    let imported = harness.target.imported_metadata().await;
    let (_, content_types) = imported
        .iter()
        .find(|(category, _)| *category == MetadataCategory::ContentTypes)
        .expect("content types imported");
    assert_eq!(content_types.len(), 2);
    assert_eq!(content_types[0].upstream_key(), "photo");
    assert_eq!(content_types[0].values.get("de").map(String::as_str), Some("Foto"));
    assert_eq!(report.metadata_elements, 2);

    // Delivered assets carry the keys the target assigned during the metadata phase
    let assets = harness.target.new_assets().await;
    assert_eq!(assets.len(), 1);
    assert_eq!(
        assets[0].content_type.target.as_deref(),
        Some("t-content_types-photo")
    );
    assert!(!assets[0].categories[0].is_resolved());

    // Mappings do not outlive the run
    assert_eq!(orchestrator.mapping_count(), 0);
    assert_eq!(harness.target.cache_clears().await, 1);
}

#[tokio::test]
async fn test_push_run_skips_metadata_phase() {
    let harness = TestHarness::new();
    harness.push(&["tx-1", "tx-2"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert!(report.is_completed());
    assert_eq!(report.new_assets, 2);
    assert!(harness.upstream.metadata_calls().await.is_empty());
    assert_eq!(harness.target.call_count("before_generic_metadata_sync").await, 0);

    let calls = harness.target.calls().await;
    assert_eq!(calls.first().map(String::as_str), Some("before_sync"));
    assert!(calls.contains(&"after_sync".to_string()));
}

#[tokio::test]
async fn test_resume_never_redelivers() {
    let harness = TestHarness::new();
    harness.push(&["tx-1", "tx-2", "tx-3", "tx-4", "tx-5"]).await;

    // Two chunks of two per run
    let orchestrator = harness.orchestrator(TestHarness::chunked(2, 2));

    let first = orchestrator.run(RunKind::Push).await;
    assert!(first.is_completed());
    assert_eq!(first.chunks, 2);
    assert_eq!(
        orchestrator.continuation().unwrap().unwrap().as_str(),
        "4"
    );

    let second = orchestrator.run(RunKind::Push).await;
    assert!(second.is_completed());
    assert_eq!(second.new_assets, 1);

    // New purchases show up on a later run, older ones are not fetched again
    harness.push(&["tx-6"]).await;
    let third = orchestrator.run(RunKind::Push).await;
    assert_eq!(third.new_assets, 1);

    assert_eq!(
        harness.target.delivered_transactions().await,
        vec!["tx-1", "tx-2", "tx-3", "tx-4", "tx-5", "tx-6"]
    );
}

#[tokio::test]
async fn test_resume_from_persisted_cursor() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("state.db");

    let mut harness = TestHarness::new();
    harness.push(&["tx-1", "tx-2", "tx-3"]).await;

    {
        harness.continuation = Arc::new(SqliteStateStore::new(&db_path).unwrap());
        let report = harness
            .orchestrator(TestHarness::chunked(2, 1))
            .run(RunKind::Push)
            .await;
        assert_eq!(report.new_assets, 2);
    }

    // A fresh store on the same file picks up where the last run stopped
    harness.continuation = Arc::new(SqliteStateStore::new(&db_path).unwrap());
    let report = harness
        .orchestrator(TestHarness::chunked(2, 0))
        .run(RunKind::Push)
        .await;
    assert_eq!(report.new_assets, 1);

    let calls = harness.upstream.transaction_calls().await;
    assert_eq!(calls[0], None);
    assert_eq!(calls[1].as_ref().map(|c| c.as_str()), Some("2"));
}

#[tokio::test]
async fn test_known_assets_are_updated() {
    let harness = TestHarness::new();
    harness.target.add_known_asset("tx-1", "uuid-1").await;
    harness.target.add_known_binary("tx-3:bin-2", "uuid-3-2").await;
    harness
        .upstream
        .push_transactions(vec![
            fixtures::transaction("tx-1", 1),
            fixtures::transaction("tx-2", 1),
            fixtures::transaction("tx-3", 2),
            fixtures::transaction("tx-4", 3),
        ])
        .await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert_eq!(report.updated_assets, 1);
    assert_eq!(report.new_assets, 1);
    assert_eq!(report.updated_compound_assets, 1);
    assert_eq!(report.new_compound_assets, 1);
    assert_eq!(report.delivered(), 4);

    assert_eq!(harness.target.updated_assets().await[0].transaction_id, "tx-1");
    assert_eq!(
        harness.target.updated_compound_assets().await[0].transaction_id,
        "tx-3"
    );
    assert_eq!(
        harness.target.new_compound_assets().await[0].transaction_id,
        "tx-4"
    );
}

#[tokio::test]
async fn test_compound_asset_rejected_without_capability() {
    let harness = TestHarness::with_target(MockTarget::with_capabilities(
        SyncTargetCapabilities {
            compound_assets: false,
            ..SyncTargetCapabilities::all()
        },
    ));
    harness
        .upstream
        .push_transactions(vec![
            fixtures::transaction("tx-1", 1),
            fixtures::transaction("tx-2", 2),
        ])
        .await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    match &report.outcome {
        SyncOutcome::Failed {
            phase,
            authentication,
            error,
        } => {
            assert_eq!(*phase, SyncPhase::AssetsPhase);
            assert!(!authentication);
            assert!(error.contains("tx-2"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(report.phase, SyncPhase::Aborted);

    // Nothing from the offending chunk reaches the target
    assert!(harness.target.delivered_transactions().await.is_empty());
    assert_eq!(harness.target.job_errors().await.len(), 1);
    assert!(harness.target.authenticator_errors().await.is_empty());
    assert!(harness.continuation.load().unwrap().is_none());
}

#[tokio::test]
async fn test_binary_update_rejected_without_capability() {
    let harness = TestHarness::with_target(MockTarget::with_capabilities(
        SyncTargetCapabilities {
            binary_updates: false,
            ..SyncTargetCapabilities::all()
        },
    ));
    let mut tx = fixtures::transaction("tx-1", 1);
    tx.binaries[0].version = 2;
    harness.upstream.push_transactions(vec![tx]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert_eq!(report.outcome.label(), "failed");
    assert_eq!(harness.target.call_count("import_new_assets").await, 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let harness = TestHarness::new();
    for _ in 0..4 {
        harness.upstream.push_error(UpstreamError::Timeout).await;
    }
    harness.push(&["tx-1"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert!(report.is_completed());
    assert_eq!(report.new_assets, 1);
    // Four failures, the fifth attempt delivers, then the closing empty chunk
    assert_eq!(harness.upstream.transaction_calls().await.len(), 6);
    assert_eq!(harness.authenticator.refresh_count().await, 0);
}

#[tokio::test]
async fn test_retries_exhausted_fails_run() {
    let harness = TestHarness::new();
    for _ in 0..5 {
        harness
            .upstream
            .push_error(UpstreamError::Http {
                status: 503,
                body: "maintenance".to_string(),
            })
            .await;
    }

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert_eq!(harness.upstream.transaction_calls().await.len(), 5);
    assert!(matches!(
        report.outcome,
        SyncOutcome::Failed {
            authentication: false,
            ..
        }
    ));
    assert_eq!(harness.target.job_errors().await.len(), 1);
    assert_eq!(harness.target.cache_clears().await, 1);
}

#[tokio::test]
async fn test_expired_token_refreshed_once() {
    let harness = TestHarness::new();
    harness
        .upstream
        .set_accepted_token(Some("refreshed-1"))
        .await;
    harness.push(&["tx-1"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Push)
        .await;

    assert!(report.is_completed());
    assert_eq!(harness.authenticator.refresh_count().await, 1);
    assert_eq!(harness.token_storage.get().access_token, "refreshed-1");
}

#[tokio::test]
async fn test_authentication_failure_calls_auth_hook() {
    let harness = TestHarness::new();
    harness.authenticator.set_fail_refresh(true).await;
    harness
        .upstream
        .set_accepted_token(Some("never-issued"))
        .await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Scheduled)
        .await;

    match report.outcome {
        SyncOutcome::Failed {
            phase,
            authentication,
            ..
        } => {
            assert_eq!(phase, SyncPhase::MetadataPhase);
            assert!(authentication);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    // One call, one refresh, no retries
    assert_eq!(harness.upstream.metadata_calls().await.len(), 1);
    assert_eq!(harness.authenticator.refresh_count().await, 1);
    assert_eq!(harness.target.authenticator_errors().await.len(), 1);
    assert!(harness.target.job_errors().await.is_empty());
    assert_eq!(harness.target.cache_clears().await, 1);
}

#[tokio::test]
async fn test_declined_before_sync_aborts() {
    let harness = TestHarness::new();
    harness.target.decline_at("before_sync").await;
    harness.push(&["tx-1"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Scheduled)
        .await;

    assert_eq!(
        report.outcome,
        SyncOutcome::Aborted {
            phase: SyncPhase::BeforeSync
        }
    );
    assert!(harness.upstream.metadata_calls().await.is_empty());
    assert!(harness.upstream.transaction_calls().await.is_empty());
    assert_eq!(harness.target.cache_clears().await, 0);
}

#[tokio::test]
async fn test_failing_before_sync_still_clears_caches() {
    let harness = TestHarness::new();
    harness
        .target
        .fail_at("before_sync", TargetError::rejected("before_sync", "index locked"))
        .await;
    harness.push(&["tx-1"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Scheduled)
        .await;

    match report.outcome {
        SyncOutcome::Failed {
            phase,
            authentication,
            ..
        } => {
            assert_eq!(phase, SyncPhase::BeforeSync);
            assert!(!authentication);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.upstream.transaction_calls().await.is_empty());
    assert_eq!(harness.target.job_errors().await.len(), 1);
    assert_eq!(harness.target.cache_clears().await, 1);
}

#[tokio::test]
async fn test_declined_assets_phase_keeps_metadata() {
    let harness = TestHarness::new();
    harness.target.decline_at("before_assets_sync").await;
    harness.push(&["tx-1"]).await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Scheduled)
        .await;

    assert_eq!(
        report.outcome,
        SyncOutcome::Aborted {
            phase: SyncPhase::AssetsPhase
        }
    );
    assert_eq!(harness.target.call_count("after_generic_metadata_sync").await, 1);
    assert!(harness.upstream.transaction_calls().await.is_empty());
    assert_eq!(harness.target.call_count("after_sync").await, 0);
    assert_eq!(harness.target.cache_clears().await, 1);
}

#[tokio::test]
async fn test_target_failure_stops_before_cursor_moves() {
    let harness = TestHarness::new();
    harness
        .target
        .fail_at("import_new_assets", TargetError::rejected("assets", "disk full"))
        .await;
    harness.push(&["tx-1", "tx-2"]).await;

    let orchestrator = harness.orchestrator(SyncConfig::default());
    let report = orchestrator.run(RunKind::Push).await;

    assert_eq!(report.outcome.label(), "failed");
    assert_eq!(harness.target.job_errors().await.len(), 1);
    assert!(orchestrator.continuation().unwrap().is_none());

    // The failure was one-shot; the next run delivers the same chunk
    let retry = orchestrator.run(RunKind::Push).await;
    assert!(retry.is_completed());
    assert_eq!(retry.new_assets, 2);
}

#[tokio::test]
async fn test_missing_target_key_fails_run() {
    let harness = TestHarness::new();
    harness.target.set_skip_target_keys(true).await;
    harness
        .upstream
        .set_metadata(
            MetadataCategory::ContentProviders,
            "en",
            vec![MetadataEntry::new("studio-one", "Studio One")],
        )
        .await;

    let report = harness
        .orchestrator(SyncConfig::default())
        .run(RunKind::Scheduled)
        .await;

    match report.outcome {
        SyncOutcome::Failed { phase, error, .. } => {
            assert_eq!(phase, SyncPhase::MetadataPhase);
            assert!(error.contains("studio-one"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(harness.target.job_errors().await.len(), 1);
}

#[tokio::test]
async fn test_reset_continuation_restarts_stream() {
    let harness = TestHarness::new();
    harness.push(&["tx-1"]).await;

    let orchestrator = harness.orchestrator(SyncConfig::default());
    orchestrator.run(RunKind::Push).await;
    assert!(orchestrator.continuation().unwrap().is_some());

    tokio_test::assert_ok!(orchestrator.reset_continuation());
    let report = orchestrator.run(RunKind::Push).await;

    // Same purchase again, now known to the target
    assert_eq!(report.updated_assets, 1);
    assert_eq!(report.new_assets, 0);
}
